//! Testing utilities for the Forge workspace
//!
//! Install-input fixtures, deterministic collaborators and store helpers.

#![allow(missing_docs)]

use std::path::Path;
use std::sync::Arc;

use forge_asset::Services;
use forge_ignition::tls::Subject;
use forge_ignition::{registry, CertIssuer, CertKey, InstallInputs, IssueError, ReleaseResolver, StaticReleaseResolver};
use forge_store::{Store, StoreConfig, StoreError};

pub const SSH_KEY: &str = "ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAIForgeTestKey core@example.com";
pub const PULL_SECRET: &str = r#"{"auths":{"quay.io":{"auth":"Zm9yZ2U6dGVzdA=="}}}"#;
pub const RELEASE_IMAGE: &str = "quay.io/forge/release:test";

/// One control plane, no compute, installation disk set
pub fn single_node_inputs() -> InstallInputs {
    InstallInputs {
        cluster_name: "sno".to_string(),
        base_domain: "example.com".to_string(),
        ssh_key: SSH_KEY.to_string(),
        pull_secret: PULL_SECRET.to_string(),
        control_plane_replicas: Some(1),
        compute_replicas: Some(0),
        installation_disk: Some("/dev/sda".to_string()),
        aws_region: None,
    }
}

/// Three control-plane replicas, otherwise single node
pub fn three_replica_inputs() -> InstallInputs {
    InstallInputs {
        control_plane_replicas: Some(3),
        ..single_node_inputs()
    }
}

/// Install config YAML for a single-node cluster
pub fn single_node_install_config_yaml() -> String {
    format!(
        "apiVersion: v1\n\
         metadata:\n  name: sno\n\
         baseDomain: example.com\n\
         controlPlane:\n  name: master\n  replicas: 1\n\
         compute:\n- name: worker\n  replicas: 0\n\
         platform:\n  none: {{}}\n\
         bootstrapInPlace:\n  installationDisk: /dev/sda\n\
         pullSecret: '{PULL_SECRET}'\n\
         sshKey: {SSH_KEY}\n"
    )
}

/// Issuer whose output depends only on its inputs
#[derive(Debug, Clone, Copy, Default)]
pub struct FakeIssuer;

fn pem(label: &str, body: &str) -> String {
    format!("-----BEGIN {label}-----\n{body}\n-----END {label}-----\n")
}

impl CertIssuer for FakeIssuer {
    fn self_signed(&self, subject: &Subject) -> Result<CertKey, IssueError> {
        Ok(CertKey {
            cert_pem: pem("CERTIFICATE", &format!("ca {}", subject.common_name)),
            key_pem: pem("PRIVATE KEY", &format!("key {}", subject.common_name)),
        })
    }

    fn signed_client(&self, subject: &Subject, signer: &CertKey) -> Result<CertKey, IssueError> {
        if !signer.cert_pem.contains("BEGIN CERTIFICATE") {
            return Err(IssueError::Signer("not a certificate".to_string()));
        }
        Ok(CertKey {
            cert_pem: pem("CERTIFICATE", &format!("client {}", subject.common_name)),
            key_pem: pem("PRIVATE KEY", &format!("key {}", subject.common_name)),
        })
    }
}

/// Deterministic services around `inputs`
pub fn test_services(inputs: Option<InstallInputs>) -> Services {
    let mut services = Services::new()
        .with::<Arc<dyn ReleaseResolver>>(Arc::new(StaticReleaseResolver::new(RELEASE_IMAGE)))
        .with::<Arc<dyn CertIssuer>>(Arc::new(FakeIssuer));
    if let Some(inputs) = inputs {
        services.insert(inputs);
    }
    services
}

/// Store over `dir` with the full cluster registry
pub fn open_store(dir: &Path, inputs: Option<InstallInputs>) -> Result<Store, StoreError> {
    Store::open(
        dir,
        Arc::new(registry()),
        test_services(inputs),
        StoreConfig::default(),
    )
}

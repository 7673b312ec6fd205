//! Install-config document and user inputs
//!
//! [`InstallConfigSpec`] mirrors `install-config.yaml` (camelCase keys).
//! [`InstallInputs`] is the flat set of answers a caller provides when no
//! install config exists yet.

use serde::{Deserialize, Serialize};

/// Default control-plane replica count
pub const DEFAULT_CONTROL_PLANE_REPLICAS: i64 = 3;

/// Default cluster network
pub const DEFAULT_CLUSTER_NETWORK: &str = "10.128.0.0/14";

/// Default per-node prefix inside the cluster network
pub const DEFAULT_HOST_PREFIX: u8 = 23;

/// Default machine network
pub const DEFAULT_MACHINE_NETWORK: &str = "10.0.0.0/16";

/// Default service network
pub const DEFAULT_SERVICE_NETWORK: &str = "172.30.0.0/16";

/// Default network plugin
pub const DEFAULT_NETWORK_TYPE: &str = "OVNKubernetes";

/// Parsed `install-config.yaml`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallConfigSpec {
    /// Document version
    #[serde(default = "default_api_version")]
    pub api_version: String,
    /// Cluster name
    pub metadata: ObjectMeta,
    /// Base DNS domain
    pub base_domain: String,
    /// Public key authorised for the `core` user
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ssh_key: String,
    /// Registry credentials as a JSON document
    #[serde(default)]
    pub pull_secret: String,
    /// Cluster networking
    #[serde(default)]
    pub networking: Networking,
    /// Control-plane machine pool
    #[serde(default = "MachinePool::control_plane")]
    pub control_plane: MachinePool,
    /// Compute machine pools
    #[serde(default)]
    pub compute: Vec<MachinePool>,
    /// Target platform
    #[serde(default)]
    pub platform: Platform,
    /// Single-node bootstrap-in-place settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bootstrap_in_place: Option<BootstrapInPlace>,
}

fn default_api_version() -> String {
    "v1".to_string()
}

impl Default for InstallConfigSpec {
    fn default() -> Self {
        Self {
            api_version: default_api_version(),
            metadata: ObjectMeta::default(),
            base_domain: String::new(),
            ssh_key: String::new(),
            pull_secret: String::new(),
            networking: Networking::default(),
            control_plane: MachinePool::control_plane(),
            compute: Vec::new(),
            platform: Platform::default(),
            bootstrap_in_place: None,
        }
    }
}

impl InstallConfigSpec {
    /// Fully qualified cluster domain
    #[must_use]
    pub fn cluster_domain(&self) -> String {
        format!("{}.{}", self.metadata.name, self.base_domain)
    }

    /// Control-plane replica count with the default applied
    #[must_use]
    pub fn control_plane_replicas(&self) -> i64 {
        self.control_plane
            .replicas
            .unwrap_or(DEFAULT_CONTROL_PLANE_REPLICAS)
    }

    /// Fill unset optional fields with their defaults
    pub fn apply_defaults(&mut self) {
        if self.control_plane.replicas.is_none() {
            self.control_plane.replicas = Some(DEFAULT_CONTROL_PLANE_REPLICAS);
        }
        if self.control_plane.name.is_empty() {
            self.control_plane.name = "master".to_string();
        }
        self.networking.apply_defaults();
        if self.platform.is_unset() {
            self.platform.none = Some(NonePlatform {});
        }
    }
}

/// Object metadata
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMeta {
    /// Object name
    #[serde(default)]
    pub name: String,
}

/// Cluster networking
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Networking {
    /// Network plugin
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub network_type: String,
    /// Pod networks
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cluster_network: Vec<ClusterNetworkEntry>,
    /// Host networks
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub machine_network: Vec<MachineNetworkEntry>,
    /// Service networks
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub service_network: Vec<String>,
}

impl Networking {
    fn apply_defaults(&mut self) {
        if self.network_type.is_empty() {
            self.network_type = DEFAULT_NETWORK_TYPE.to_string();
        }
        if self.cluster_network.is_empty() {
            self.cluster_network.push(ClusterNetworkEntry {
                cidr: DEFAULT_CLUSTER_NETWORK.to_string(),
                host_prefix: DEFAULT_HOST_PREFIX,
            });
        }
        if self.machine_network.is_empty() {
            self.machine_network.push(MachineNetworkEntry {
                cidr: DEFAULT_MACHINE_NETWORK.to_string(),
            });
        }
        if self.service_network.is_empty() {
            self.service_network.push(DEFAULT_SERVICE_NETWORK.to_string());
        }
    }
}

/// Pod network block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterNetworkEntry {
    /// Network CIDR
    pub cidr: String,
    /// Prefix handed to each node
    pub host_prefix: u8,
}

/// Host network block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineNetworkEntry {
    /// Network CIDR
    pub cidr: String,
}

/// Machine pool
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachinePool {
    /// Pool name
    #[serde(default)]
    pub name: String,
    /// Replica count; unset means the pool default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i64>,
}

impl MachinePool {
    /// Control-plane pool with default replicas
    #[must_use]
    pub fn control_plane() -> Self {
        Self {
            name: "master".to_string(),
            replicas: Some(DEFAULT_CONTROL_PLANE_REPLICAS),
        }
    }

    /// Compute pool with the given replicas
    #[must_use]
    pub fn worker(replicas: i64) -> Self {
        Self {
            name: "worker".to_string(),
            replicas: Some(replicas),
        }
    }
}

/// Target platform; exactly one field is set
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Platform {
    /// No platform integration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub none: Option<NonePlatform>,
    /// Amazon Web Services
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aws: Option<AwsPlatform>,
}

impl Platform {
    /// Platform name as written to cluster metadata
    #[must_use]
    pub fn name(&self) -> &'static str {
        if self.aws.is_some() {
            "aws"
        } else {
            "none"
        }
    }

    fn is_unset(&self) -> bool {
        self.none.is_none() && self.aws.is_none()
    }
}

/// Marker for the `none` platform
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NonePlatform {}

/// AWS platform settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwsPlatform {
    /// Region
    pub region: String,
}

/// Single-node bootstrap-in-place settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BootstrapInPlace {
    /// Disk the live ISO installs onto
    #[serde(default)]
    pub installation_disk: String,
}

/// Answers used to generate an install config when none exists on disk
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallInputs {
    /// Cluster name
    pub cluster_name: String,
    /// Base DNS domain
    pub base_domain: String,
    /// Public SSH key for the `core` user
    pub ssh_key: String,
    /// Pull secret JSON
    pub pull_secret: String,
    /// Control-plane replicas; default 3
    pub control_plane_replicas: Option<i64>,
    /// Compute replicas; no compute pool when unset
    pub compute_replicas: Option<i64>,
    /// Installation disk for bootstrap-in-place
    pub installation_disk: Option<String>,
    /// AWS region; the `none` platform when unset
    pub aws_region: Option<String>,
}

impl InstallInputs {
    /// Build the install-config document, defaults applied
    #[must_use]
    pub fn to_spec(&self) -> InstallConfigSpec {
        let mut spec = InstallConfigSpec {
            metadata: ObjectMeta {
                name: self.cluster_name.clone(),
            },
            base_domain: self.base_domain.clone(),
            ssh_key: self.ssh_key.trim().to_string(),
            pull_secret: self.pull_secret.trim().to_string(),
            control_plane: MachinePool {
                name: "master".to_string(),
                replicas: self.control_plane_replicas,
            },
            compute: self.compute_replicas.map(MachinePool::worker).into_iter().collect(),
            platform: Platform {
                none: None,
                aws: self.aws_region.clone().map(|region| AwsPlatform { region }),
            },
            bootstrap_in_place: self
                .installation_disk
                .clone()
                .map(|installation_disk| BootstrapInPlace { installation_disk }),
            ..InstallConfigSpec::default()
        };
        spec.apply_defaults();
        spec
    }
}

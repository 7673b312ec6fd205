//! Single-node topology checks

use forge_asset::ValidationError;
use tracing::warn;

use crate::types::InstallConfigSpec;

/// Verify an install config describes a single-node bootstrap-in-place cluster
///
/// Requires exactly one control-plane replica, a `bootstrapInPlace` section
/// and a non-empty installation disk.
///
/// # Errors
/// Returns a [`ValidationError`] naming the first violated constraint.
pub fn verify_bootstrap_in_place(config: &InstallConfigSpec) -> Result<(), ValidationError> {
    let replicas = config.control_plane_replicas();
    if replicas != 1 {
        return Err(ValidationError::new(
            "controlPlane.replicas",
            format!(
                "bootstrap in place requires a single control plane replica, current value: {replicas}"
            ),
        ));
    }
    let Some(bootstrap) = &config.bootstrap_in_place else {
        return Err(ValidationError::new(
            "bootstrapInPlace",
            "missing bootstrap in place configuration",
        ));
    };
    if bootstrap.installation_disk.trim().is_empty() {
        return Err(ValidationError::new(
            "bootstrapInPlace.installationDisk",
            "bootstrap in place requires installation disk configuration",
        ));
    }
    warn!("Creating single node bootstrap in place configuration");
    Ok(())
}

/// Verify an install config describes an all-in-one cluster
///
/// One control-plane replica, and every compute pool that sets replicas
/// sets zero.
///
/// # Errors
/// Returns a [`ValidationError`] naming the first violated constraint.
pub fn verify_all_in_one(config: &InstallConfigSpec) -> Result<(), ValidationError> {
    if config.control_plane_replicas() != 1 {
        return Err(ValidationError::new(
            "controlPlane.replicas",
            "all-in-one configurations must use a single control plane replica",
        ));
    }
    for (i, pool) in config.compute.iter().enumerate() {
        if pool.replicas.is_some_and(|r| r != 0) {
            return Err(ValidationError::new(
                format!("compute[{i}].replicas"),
                "all-in-one configurations do not support compute replicas",
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BootstrapInPlace, InstallInputs, MachinePool};

    fn single_node() -> InstallConfigSpec {
        InstallInputs {
            cluster_name: "sno".to_string(),
            base_domain: "example.com".to_string(),
            control_plane_replicas: Some(1),
            compute_replicas: Some(0),
            installation_disk: Some("/dev/sda".to_string()),
            ..InstallInputs::default()
        }
        .to_spec()
    }

    #[test]
    fn accepts_single_node() {
        assert!(verify_bootstrap_in_place(&single_node()).is_ok());
        assert!(verify_all_in_one(&single_node()).is_ok());
    }

    #[test]
    fn rejects_three_replicas() {
        let mut config = single_node();
        config.control_plane.replicas = Some(3);

        let err = verify_bootstrap_in_place(&config).unwrap_err();
        assert_eq!(err.field, "controlPlane.replicas");
        assert!(err.message.contains("current value: 3"));

        let err = verify_all_in_one(&config).unwrap_err();
        assert_eq!(err.field, "controlPlane.replicas");
    }

    #[test]
    fn requires_bootstrap_section() {
        let mut config = single_node();
        config.bootstrap_in_place = None;
        assert_eq!(
            verify_bootstrap_in_place(&config).unwrap_err().field,
            "bootstrapInPlace"
        );
    }

    #[test]
    fn requires_installation_disk() {
        let mut config = single_node();
        config.bootstrap_in_place = Some(BootstrapInPlace {
            installation_disk: "  ".to_string(),
        });
        assert_eq!(
            verify_bootstrap_in_place(&config).unwrap_err().field,
            "bootstrapInPlace.installationDisk"
        );
    }

    #[test]
    fn all_in_one_rejects_compute_replicas() {
        let mut config = single_node();
        config.compute.push(MachinePool::worker(2));
        assert_eq!(verify_all_in_one(&config).unwrap_err().field, "compute[1].replicas");

        config.compute[1].replicas = None;
        assert!(verify_all_in_one(&config).is_ok());
    }
}

//! End-to-end runs of the `forge` command line

use clap::Parser;
use forge_cli::{Cli, Command, Target};
use forge_test_utils::{single_node_install_config_yaml, PULL_SECRET, RELEASE_IMAGE, SSH_KEY};
use tokio_util::sync::CancellationToken;

fn cli(args: &[&str]) -> Cli {
    Cli::try_parse_from(std::iter::once("forge").chain(args.iter().copied())).unwrap()
}

fn write_config(dir: &std::path::Path) -> std::path::PathBuf {
    let path = dir.join("forge.toml");
    let toml = format!(
        "release_image = \"{RELEASE_IMAGE}\"\n\n\
         [install]\n\
         cluster_name = \"sno\"\n\
         base_domain = \"example.com\"\n\
         ssh_key = \"{SSH_KEY}\"\n\
         pull_secret = '{PULL_SECRET}'\n\
         control_plane_replicas = 1\n\
         compute_replicas = 0\n\
         installation_disk = \"/dev/sda\"\n"
    );
    std::fs::write(&path, toml).unwrap();
    path
}

#[test]
fn test_parses_targets_and_global_flags() {
    let parsed = cli(&["--concurrent", "--log-level", "debug", "create", "aio-config"]);
    assert!(parsed.concurrent);
    assert_eq!(parsed.log_level, "debug");
    assert!(matches!(parsed.command, Command::Create { target: Target::AioConfig }));

    let parsed = cli(&["graph", "single-node-ignition-config", "--dir", "/tmp/x"]);
    assert_eq!(parsed.dir, std::path::PathBuf::from("/tmp/x"));
    assert!(matches!(
        parsed.command,
        Command::Graph { target: Target::SingleNodeIgnitionConfig }
    ));
}

#[test]
fn test_rejects_unknown_target() {
    assert!(Cli::try_parse_from(["forge", "create", "bootstrap"]).is_err());
}

#[tokio::test]
async fn test_create_single_node_config_then_destroy_state() {
    let work = tempfile::tempdir().unwrap();
    let config = write_config(work.path());
    let out = work.path().join("cluster");
    let out_str = out.to_str().unwrap();
    let config_str = config.to_str().unwrap();

    cli(&["--dir", out_str, "--config", config_str, "create", "single-node-ignition-config"])
        .execute(CancellationToken::new())
        .await
        .unwrap();
    assert!(out.join("bootstrap-in-place-for-live-iso.ign").exists());
    assert!(out.join("metadata.json").exists());
    assert!(out.join("auth/kubeadmin-password").exists());
    assert!(out.join(".forge_state.json").exists());

    cli(&["--dir", out_str, "destroy-state"])
        .execute(CancellationToken::new())
        .await
        .unwrap();
    assert!(!out.join(".forge_state.json").exists());
}

#[tokio::test]
async fn test_create_with_user_install_config_and_no_inputs() {
    let work = tempfile::tempdir().unwrap();
    std::fs::write(work.path().join("install-config.yaml"), single_node_install_config_yaml()).unwrap();
    let dir = work.path().to_str().unwrap();

    cli(&["--dir", dir, "--concurrent", "create", "aio-config"])
        .execute(CancellationToken::new())
        .await
        .unwrap();
    assert!(work.path().join("aio.ign").exists());
}

#[tokio::test]
async fn test_create_fails_without_inputs() {
    let work = tempfile::tempdir().unwrap();
    let dir = work.path().to_str().unwrap();
    let err = cli(&["--dir", dir, "create", "install-config"])
        .execute(CancellationToken::new())
        .await
        .unwrap_err();
    assert!(format!("{err:#}").contains("service not available"));
}

#[tokio::test]
async fn test_cancelled_run_reports_cancellation() {
    let work = tempfile::tempdir().unwrap();
    let config = write_config(work.path());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = cli(&["--dir", work.path().to_str().unwrap(), "--config", config.to_str().unwrap(), "create", "aio-config"])
        .execute(cancel)
        .await
        .unwrap_err();
    let store_err = err.downcast_ref::<forge_store::StoreError>().unwrap();
    assert!(store_err.is_cancelled());
}

//! Fatal startup surface of the `devnode` binary

use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn devnode(binary: &Path, extra: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_devnode"))
        .env_remove("ACALA_BINARY")
        .env_remove("ACALA_BUILD")
        .env_remove("ACALA_LOG")
        .env_remove("ACALA_DISPLAY_LOG")
        .env_remove("RUST_LOG")
        .arg("--binary")
        .arg(binary)
        .args(["--port", "19941", "--rpc-port", "19942", "--ws-port", "19943"])
        .args(extra)
        .output()
        .unwrap()
}

#[test]
fn test_missing_binary_exits_with_build_hint() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("target/debug/acala");

    let output = devnode(&missing, &[]);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert_eq!(output.status.code(), Some(1), "stderr: {}", stderr);
    assert!(stderr.contains("Missing node binary"), "stderr: {}", stderr);
    assert!(stderr.contains(&missing.display().to_string()));
    assert!(!stderr.contains("Command:"));
    assert!(!stderr.contains("Logs:"));
}

#[test]
fn test_startup_timeout_exits_with_command_and_logs() {
    let dir = TempDir::new().unwrap();
    let binary = dir.path().join("acala-silent");
    std::fs::write(&binary, "#!/bin/sh\necho \"still booting\"\nexec sleep 30\n").unwrap();
    std::fs::set_permissions(&binary, std::fs::Permissions::from_mode(0o755)).unwrap();

    let output = devnode(&binary, &["--startup-timeout", "1s"]);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert_eq!(output.status.code(), Some(1), "stderr: {}", stderr);
    assert!(stderr.contains("Command: "), "stderr: {}", stderr);
    assert!(stderr.contains("--instant-sealing"));
    assert!(stderr.contains("Logs:\nstill booting"), "stderr: {}", stderr);
    assert!(output.stdout.is_empty());
}

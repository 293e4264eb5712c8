//! Shared helpers for harness integration tests
//!
//! Fake node binaries are small shell scripts in a temp directory. The
//! WebSocket side of the node is a [`MockNode`] bound on the port the
//! harness will connect to.

#![allow(dead_code)]

use devnode_core::{HarnessConfig, HarnessConfigBuilder};
use devnode_rpc::mock::{MockNode, MockReply};
use serde_json::{json, Value};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

pub const READY_LINE: &str = "Listening for new connections on 127.0.0.1:19931.";

/// Write an executable `#!/bin/sh` script and return its path
pub fn fake_node(dir: &TempDir, name: &str, body: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Node that logs a little, prints the marker on stderr and keeps running
pub fn ready_node(dir: &TempDir) -> PathBuf {
    fake_node(
        dir,
        "acala-ready",
        &format!(
            "echo \"Acala Node\"\necho \"starting up\"\necho \"{}\" 1>&2\nexec sleep 30",
            READY_LINE
        ),
    )
}

/// Node that never prints the marker
pub fn silent_node(dir: &TempDir) -> PathBuf {
    fake_node(dir, "acala-silent", "echo \"still booting\"\nexec sleep 30")
}

/// Node that records its arguments to `args.txt` next to itself
pub fn recording_node(dir: &TempDir) -> PathBuf {
    let args = dir.path().join("args.txt");
    fake_node(
        dir,
        "acala-recording",
        &format!(
            "echo \"$@\" > \"{}\"\necho \"{}\"\nexec sleep 30",
            args.display(),
            READY_LINE
        ),
    )
}

pub fn recorded_args(dir: &Path) -> String {
    std::fs::read_to_string(dir.join("args.txt"))
        .unwrap()
        .trim_end()
        .to_string()
}

/// Harness config pointing at `binary` and the mock's WebSocket port
pub fn config_for(binary: &Path, ws_port: u16) -> HarnessConfig {
    HarnessConfigBuilder::new()
        .binary(binary)
        .ports(19931, 19932, ws_port)
        .startup_timeout(Duration::from_secs(10))
        .request_timeout(Duration::from_secs(5))
        .build()
}

/// Mock node answering the priming call
pub async fn mock_node() -> MockNode {
    MockNode::dev_chain(0, "Acala Mandala Dev").await.unwrap()
}

/// 32-byte hash filled with `byte`
pub fn hash(byte: u8) -> String {
    format!("0x{}", hex_byte(byte).repeat(32))
}

fn hex_byte(byte: u8) -> String {
    format!("{:02x}", byte)
}

/// Header JSON for block `number`
pub fn header(number: u64) -> Value {
    json!({
        "parentHash": hash(0x11),
        "number": format!("0x{:x}", number),
        "stateRoot": hash(0x22),
        "extrinsicsRoot": hash(0x33),
        "digest": {"logs": []}
    })
}

/// Mock chain with instant sealing: each submitted extrinsic authors one block
pub async fn sealing_chain(start: u64) -> (MockNode, Arc<AtomicU64>) {
    let best = Arc::new(AtomicU64::new(start));
    let chain = best.clone();
    let node = MockNode::bind(0, move |method, _params| match method {
        "system_chain" => MockReply::Result(json!("Acala Mandala Dev")),
        "chain_getHeader" => MockReply::Result(header(chain.load(Ordering::SeqCst))),
        "author_submitAndWatchExtrinsic" => {
            let number = chain.fetch_add(1, Ordering::SeqCst) + 1;
            MockReply::Subscription {
                id: json!(format!("watch-{}", number)),
                notifications: vec![
                    ("author_extrinsicUpdate".into(), json!("ready")),
                    (
                        "author_extrinsicUpdate".into(),
                        json!({"inBlock": hash(number as u8)}),
                    ),
                    (
                        "author_extrinsicUpdate".into(),
                        json!({"finalized": hash(number as u8)}),
                    ),
                ],
            }
        }
        "author_unwatchExtrinsic" => MockReply::Result(json!(true)),
        _ => MockReply::Result(Value::Null),
    })
    .await
    .unwrap();
    (node, best)
}

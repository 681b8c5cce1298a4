//! Ctrl+C at an interactive prompt ends the process.
#![cfg(unix)]

use std::process::Stdio;
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, ChildStdout, Command};

const BIN: &str = env!("CARGO_BIN_EXE_mcp-probe");

/// Spawn `mcp-probe` with stdin held open and an empty config.
fn spawn_probe(config_dir: &TempDir, args: &[&str]) -> Child {
    Command::new(BIN)
        .arg("-c")
        .arg(config_dir.path().join("config.toml"))
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .unwrap()
}

async fn wait_for_output(stdout: &mut ChildStdout, marker: &str) -> String {
    let mut seen = String::new();
    let mut buf = [0u8; 4096];
    while !seen.contains(marker) {
        let n = stdout.read(&mut buf).await.unwrap();
        assert!(n > 0, "stdout closed before {marker:?}, got:\n{seen}");
        seen.push_str(&String::from_utf8_lossy(&buf[..n]));
    }
    seen
}

async fn interrupt_at(args: &[&str], marker: &str) {
    let config_dir = TempDir::new().unwrap();
    let mut child = spawn_probe(&config_dir, args);
    let _stdin = child.stdin.take().unwrap();
    let mut stdout = child.stdout.take().unwrap();

    tokio::time::timeout(Duration::from_secs(20), wait_for_output(&mut stdout, marker))
        .await
        .expect("prompt never appeared");

    // Let the prompt start listening for Ctrl+C.
    tokio::time::sleep(Duration::from_millis(300)).await;
    let pid = child.id().unwrap().to_string();
    let sent = std::process::Command::new("kill")
        .args(["-INT", &pid])
        .status()
        .unwrap();
    assert!(sent.success());

    let status = tokio::time::timeout(Duration::from_secs(10), child.wait())
        .await
        .expect("process kept running after Ctrl+C")
        .unwrap();
    assert_eq!(status.code(), Some(130));
}

#[tokio::test]
async fn test_interrupt_at_continue_prompt_exits() {
    interrupt_at(
        &["run", "--no-delay", "--no-docs", "--", BIN, "echo-server"],
        "Choose (1/2):",
    )
    .await;
}

#[tokio::test]
async fn test_interrupt_at_command_prompt_exits() {
    interrupt_at(&["run", "--no-delay"], "Enter command:").await;
}

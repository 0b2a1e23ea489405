#![cfg(all(unix, feature = "cli"))]

use std::path::{Path, PathBuf};
use std::process::{Child, Command, Output, Stdio};
use std::thread;
use std::time::{Duration, Instant};

fn unique_temp_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "twcli-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
    dir
}

fn tagwire() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_tagwire"));
    cmd.env_remove("TAGWIRE_LOG")
        .arg("--log-level")
        .arg("error")
        .arg("--format")
        .arg("json");
    cmd
}

fn wait_for_socket(path: &Path, timeout: Duration) {
    let start = Instant::now();
    while !path.exists() {
        if start.elapsed() >= timeout {
            panic!("socket {} never appeared", path.display());
        }
        thread::sleep(Duration::from_millis(25));
    }
}

fn wait_with_deadline(mut child: Child, timeout: Duration) -> Output {
    let start = Instant::now();
    loop {
        match child.try_wait().expect("child status should be readable") {
            Some(_) => return child.wait_with_output().expect("child output"),
            None if start.elapsed() >= timeout => {
                let _ = child.kill();
                panic!("child did not exit within {timeout:?}");
            }
            None => thread::sleep(Duration::from_millis(25)),
        }
    }
}

#[test]
fn version_prints_package_version() {
    let output = tagwire().arg("version").output().expect("version should run");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.trim(), format!("tagwire {}", env!("CARGO_PKG_VERSION")));
}

#[test]
fn listen_prints_sent_text() {
    let dir = unique_temp_dir("listen");
    let listen_path = dir.join("listen.sock");
    let send_path = dir.join("send.sock");

    let listener = tagwire()
        .arg("listen")
        .arg(&listen_path)
        .arg("--count")
        .arg("1")
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("listen should start");
    wait_for_socket(&listen_path, Duration::from_secs(3));

    let sent = tagwire()
        .arg("send")
        .arg(&listen_path)
        .arg("--from")
        .arg(&send_path)
        .arg("--text")
        .arg("hello over tagwire")
        .output()
        .expect("send should run");
    assert!(
        sent.status.success(),
        "send failed: {}",
        String::from_utf8_lossy(&sent.stderr)
    );

    let output = wait_with_deadline(listener, Duration::from_secs(5));
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains(r#""kind":"text""#), "stdout: {stdout}");
    assert!(stdout.contains("hello over tagwire"), "stdout: {stdout}");

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn send_wait_receives_echo() {
    let dir = unique_temp_dir("echo");
    let echo_path = dir.join("echo.sock");
    let send_path = dir.join("send.sock");

    let mut echo = tagwire()
        .arg("echo")
        .arg(&echo_path)
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .expect("echo should start");
    wait_for_socket(&echo_path, Duration::from_secs(3));

    let output = tagwire()
        .arg("send")
        .arg(&echo_path)
        .arg("--from")
        .arg(&send_path)
        .arg("--ping")
        .arg("7")
        .arg("--wait")
        .output()
        .expect("send should run");

    let _ = echo.kill();
    let _ = echo.wait();

    assert!(
        output.status.success(),
        "send failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains(r#""kind":"ping","seq":7"#), "stdout: {stdout}");

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn send_to_missing_socket_returns_transport_error() {
    let dir = unique_temp_dir("missing");
    let output = tagwire()
        .arg("send")
        .arg(dir.join("nobody.sock"))
        .arg("--text")
        .arg("anyone?")
        .output()
        .expect("send should run");

    assert_eq!(output.status.code(), Some(3));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("does not exist"), "stderr: {stderr}");

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn wait_without_reply_times_out() {
    let dir = unique_temp_dir("noreply");
    let listen_path = dir.join("listen.sock");
    let send_path = dir.join("send.sock");

    let mut listener = tagwire()
        .arg("listen")
        .arg(&listen_path)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .expect("listen should start");
    wait_for_socket(&listen_path, Duration::from_secs(3));

    let output = tagwire()
        .arg("send")
        .arg(&listen_path)
        .arg("--from")
        .arg(&send_path)
        .arg("--ping")
        .arg("1")
        .arg("--wait")
        .arg("--wait-timeout")
        .arg("300ms")
        .output()
        .expect("send should run");

    let _ = listener.kill();
    let _ = listener.wait();

    assert_eq!(output.status.code(), Some(124));
    let _ = std::fs::remove_dir_all(&dir);
}

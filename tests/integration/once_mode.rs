use std::{
    fs,
    io::Read,
    net::TcpListener,
    process::Stdio,
    sync::mpsc,
    thread,
    time::{Duration, Instant},
};

use anyhow::{Context, Result};

use crate::common::{chat_command, fixture, process_exists, BINARY_PATH};

#[test]
fn arithmetic_is_answered_locally() -> Result<()> {
    let output = chat_command()
        .arg("--config")
        .arg(fixture("tests/fixtures/config_offline.toml"))
        .args(["--once", "12+7"])
        .output()?;

    assert!(output.status.success(), "{output:?}");
    assert_eq!(String::from_utf8(output.stdout)?.trim(), "19");
    Ok(())
}

#[test]
fn greeting_falls_back_offline_and_exits_zero() -> Result<()> {
    let output = chat_command()
        .arg("--config")
        .arg(fixture("tests/fixtures/config_offline.toml"))
        .args(["--once", "hello"])
        .output()?;

    assert!(output.status.success(), "{output:?}");
    assert_eq!(
        String::from_utf8(output.stdout)?.trim(),
        "Hello! (offline mode)"
    );
    assert!(String::from_utf8(output.stderr)?.contains("[warning] Model call failed"));
    Ok(())
}

#[test]
fn division_by_zero_prints_fallback() -> Result<()> {
    let output = chat_command()
        .arg("--config")
        .arg(fixture("tests/fixtures/config_offline.toml"))
        .args(["--once", "10/0"])
        .output()?;

    assert!(output.status.success(), "{output:?}");
    assert!(String::from_utf8(output.stdout)?.starts_with("Offline mode:"));
    Ok(())
}

#[test]
fn missing_api_key_exits_non_zero_with_diagnostic() -> Result<()> {
    let output = chat_command()
        .arg("--config")
        .arg(fixture("tests/fixtures/config_missing_api_key.toml"))
        .args(["--once", "hello"])
        .output()?;

    assert!(!output.status.success(), "{output:?}");
    let stderr = String::from_utf8(output.stderr)?;
    assert!(stderr.contains("completion.api_key"), "stderr: {stderr}");
    Ok(())
}

#[test]
fn environment_supplies_missing_api_key() -> Result<()> {
    let output = chat_command()
        .arg("--config")
        .arg(fixture("tests/fixtures/config_missing_api_key.toml"))
        .env("ANTHROPIC_BASE_URL", "http://127.0.0.1:9")
        .env("ANTHROPIC_API_KEY", "from-env")
        .args(["--once", "2*3"])
        .output()?;

    assert!(output.status.success(), "{output:?}");
    assert_eq!(String::from_utf8(output.stdout)?.trim(), "6");
    Ok(())
}

#[test]
fn unlaunchable_server_command_exits_non_zero() -> Result<()> {
    let output = chat_command()
        .arg("--config")
        .arg(fixture("tests/fixtures/config_offline.toml"))
        .args(["--once", "12+7", "/nonexistent/mcp-server --flag"])
        .output()?;

    assert!(!output.status.success(), "{output:?}");
    let stderr = String::from_utf8(output.stderr)?;
    assert!(stderr.contains("client_0_/nonexistent/mcp-server --flag"), "stderr: {stderr}");
    Ok(())
}

#[test]
fn terminate_signal_shuts_servers_down() -> Result<()> {
    let temp = tempfile::tempdir()?;
    let pid_file = temp.path().join("server.pid");
    let config_path = temp.path().join("stalled.toml");

    // Accepts the completion request and never answers it.
    let listener = TcpListener::bind("127.0.0.1:0")?;
    let port = listener.local_addr()?.port();
    let (accepted_tx, accepted_rx) = mpsc::channel();
    thread::spawn(move || {
        if let Ok((mut stream, _)) = listener.accept() {
            let _ = accepted_tx.send(());
            let mut sink = Vec::new();
            let _ = stream.read_to_end(&mut sink);
        }
    });

    fs::write(
        &config_path,
        format!(
            r#"[completion]
model = "claude-sonnet-4-5"
api_key = "stalled-test-key"
endpoint = "http://127.0.0.1:{port}"
timeout_secs = 120

[connection]
handshake_timeout_secs = 20
request_timeout_secs = 20
shutdown_grace_secs = 2

[[servers]]
id = "recorded"
command = "sh"
args = ["-c", "echo $$ > '{pid}'; exec '{bin}' serve"]
"#,
            pid = pid_file.display(),
            bin = BINARY_PATH,
        ),
    )?;

    let mut child = chat_command()
        .arg("--config")
        .arg(&config_path)
        .args(["--once", "hello"])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;
    accepted_rx
        .recv_timeout(Duration::from_secs(30))
        .context("completion request never arrived")?;

    // SAFETY: the pid belongs to the child spawned above.
    let signalled = unsafe { libc::kill(child.id() as libc::pid_t, libc::SIGTERM) };
    assert_eq!(signalled, 0);

    let deadline = Instant::now() + Duration::from_secs(15);
    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if Instant::now() > deadline {
            let _ = child.kill();
            anyhow::bail!("chat client ignored SIGTERM");
        }
        thread::sleep(Duration::from_millis(50));
    };

    assert!(status.success(), "{status:?}");
    let server_pid: u32 = fs::read_to_string(&pid_file)?.trim().parse()?;
    assert!(
        !process_exists(server_pid),
        "server {server_pid} survived the signal"
    );
    Ok(())
}

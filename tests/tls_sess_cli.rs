use std::{
    fs,
    path::{Path, PathBuf},
    process::{Command, Output},
};

fn write_valid_config(dir: &Path, file_name: &str) -> PathBuf {
    let config_path = dir.join(file_name);
    fs::write(
        &config_path,
        format!(
            r#"
name = "tls-sess-cli-test"
env = "dev"

[bind]
auth = "127.0.0.1:39443"
protected = "127.0.0.1:39444"

[ca]
key_path = "{key}"
cert_path = "{cert}"
user_cert_ttl_secs = 3600

[auth]
username = "cli"
password = "cli-test-secret"

[observability]
filter_level = "info"

[observability.log]
output = "console"
"#,
            key = dir.join("certs/ca_key.pem").display(),
            cert = dir.join("certs/ca_cert.pem").display(),
        ),
    )
    .expect("write valid config");

    config_path
}

fn write_warning_only_config(dir: &Path, file_name: &str) -> PathBuf {
    let config_path = dir.join(file_name);
    // 演示口令与生产环境控制台日志只产生警告
    fs::write(
        &config_path,
        r#"
name = "tls-sess-cli-warning-test"
env = "prod"

[observability.log]
output = "console"
"#,
    )
    .expect("write warning-only config");

    config_path
}

fn write_validation_error_config(dir: &Path, file_name: &str) -> PathBuf {
    let config_path = dir.join(file_name);
    fs::write(
        &config_path,
        r#"
name = "not a dns name"
env = "dev"

[bind]
auth = "127.0.0.1:39445"
protected = "127.0.0.1:39445"

[ca]
user_cert_ttl_secs = 0
"#,
    )
    .expect("write validation-error config");

    config_path
}

fn run_tls_sess(args: &[&str], current_dir: Option<&Path>) -> Output {
    let mut cmd = Command::new(PathBuf::from(env!("CARGO_BIN_EXE_tls-sess")));
    cmd.args(args);
    cmd.env_remove("RUST_LOG");
    if let Some(dir) = current_dir {
        cmd.current_dir(dir);
    }
    cmd.output().expect("run tls-sess command")
}

#[test]
fn test_command_accepts_explicit_valid_config() {
    let temp = tempfile::tempdir().expect("temp dir");
    let config_path = write_valid_config(temp.path(), "valid.toml");
    let output = run_tls_sess(&["test", config_path.to_str().expect("utf8 path")], None);

    assert!(
        output.status.success(),
        "command should succeed, stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    // test 只做校验，不生成 CA 材料
    assert!(!temp.path().join("certs").exists());
}

#[test]
fn test_command_finds_default_config_in_current_directory() {
    let temp = tempfile::tempdir().expect("temp dir");
    write_valid_config(temp.path(), "config.toml");
    let output = run_tls_sess(&["test"], Some(temp.path()));

    assert!(
        output.status.success(),
        "command should succeed, stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

#[test]
fn test_command_fails_for_missing_custom_config_path() {
    let temp = tempfile::tempdir().expect("temp dir");
    let missing_path = temp.path().join("missing.toml");
    let output = run_tls_sess(&["test", missing_path.to_str().expect("utf8 path")], None);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success(), "command should fail");
    assert!(
        stderr.contains("Config file not found"),
        "unexpected stderr: {stderr}"
    );
}

#[test]
fn test_command_fails_when_no_default_config_exists() {
    let temp = tempfile::tempdir().expect("temp dir");
    let output = run_tls_sess(&["test"], Some(temp.path()));
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success(), "command should fail");
    assert!(
        stderr.contains("No configuration file found"),
        "unexpected stderr: {stderr}"
    );
}

#[test]
fn test_command_fails_for_invalid_config_content() {
    let temp = tempfile::tempdir().expect("temp dir");
    let bad_path = temp.path().join("bad.toml");
    fs::write(&bad_path, "name = \"broken\"\n[bind\n").expect("write invalid toml");

    let output = run_tls_sess(&["test", bad_path.to_str().expect("utf8 path")], None);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success(), "command should fail");
    assert!(
        stderr.contains("配置解析失败"),
        "unexpected stderr: {stderr}"
    );
}

#[test]
fn test_command_fails_for_validation_errors() {
    let temp = tempfile::tempdir().expect("temp dir");
    let config_path = write_validation_error_config(temp.path(), "validation-error.toml");
    let output = run_tls_sess(&["test", config_path.to_str().expect("utf8 path")], None);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success(), "command should fail");
    assert!(stderr.contains("配置验证失败"), "unexpected stderr: {stderr}");
    assert!(stderr.contains("must differ"), "unexpected stderr: {stderr}");
}

#[test]
fn test_command_succeeds_with_warning_only_config() {
    let temp = tempfile::tempdir().expect("temp dir");
    let config_path = write_warning_only_config(temp.path(), "warning.toml");
    let output = run_tls_sess(&["test", config_path.to_str().expect("utf8 path")], None);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(
        output.status.success(),
        "warning-only config should succeed, stderr: {stderr}"
    );
    assert!(stderr.contains("demo password"), "unexpected stderr: {stderr}");
}

#[test]
fn serve_fails_for_missing_custom_config_flag() {
    let temp = tempfile::tempdir().expect("temp dir");
    let missing_path = temp.path().join("missing-run.toml");
    let output = run_tls_sess(
        &["--config", missing_path.to_str().expect("utf8 path"), "serve"],
        None,
    );
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success(), "serve should fail");
    assert!(
        stderr.contains("Config file not found"),
        "unexpected stderr: {stderr}"
    );
}

#[test]
fn serve_fails_for_invalid_config_content() {
    let temp = tempfile::tempdir().expect("temp dir");
    let bad_path = temp.path().join("bad-run.toml");
    fs::write(&bad_path, "name = \"broken\"\n[bind\n").expect("write invalid toml");
    let output = run_tls_sess(&["--config", bad_path.to_str().expect("utf8 path")], None);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success(), "serve should fail");
    assert!(stderr.contains("配置加载失败"), "unexpected stderr: {stderr}");
}

#[test]
fn serve_fails_for_validation_errors_before_touching_ca_files() {
    let temp = tempfile::tempdir().expect("temp dir");
    let config_path = write_validation_error_config(temp.path(), "run-validation-error.toml");
    let output = run_tls_sess(
        &["--config", config_path.to_str().expect("utf8 path")],
        Some(temp.path()),
    );
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success(), "serve should fail");
    assert!(stderr.contains("配置验证失败"), "unexpected stderr: {stderr}");
    assert!(!temp.path().join("certs").exists());
}

#[test]
fn login_reports_unreachable_auth_service() {
    let temp = tempfile::tempdir().expect("temp dir");
    let key_path = temp.path().join("client_key.pem");
    let output = Command::new(PathBuf::from(env!("CARGO_BIN_EXE_tls-sess")))
        .args([
            "login",
            "--connect",
            "127.0.0.1:1",
            "--username",
            "demo",
            "--key",
            key_path.to_str().expect("utf8 path"),
        ])
        .env("TLS_SESS_PASSWORD", "password123")
        .current_dir(temp.path())
        .output()
        .expect("run tls-sess login");

    assert!(!output.status.success(), "login should fail");
    // 私钥在连接之前已生成，便于下次重试复用
    assert!(key_path.exists());
    assert!(!temp.path().join("certs/client_cert.pem").exists());
}

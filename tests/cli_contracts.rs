use serde_json::Value;
use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::tempdir;

fn run_specgate(cwd: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_specgate"))
        .current_dir(cwd)
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("failed to run specgate {:?}: {}", args, e))
}

fn error_body(output: &Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let line = stdout.lines().next().unwrap_or_default();
    let json: Value = serde_json::from_str(line)
        .unwrap_or_else(|e| panic!("expected one JSON line, got {:?}: {}", stdout, e));
    json["error"]
        .as_str()
        .unwrap_or_else(|| panic!("no error field in {}", json))
        .to_string()
}

#[test]
fn wrong_arity_is_usage_error() {
    let tmp = tempdir().unwrap();
    for args in [
        vec![],
        vec!["verify"],
        vec!["verify", "contract.json"],
        vec!["verify", "contract.json", ".", "extra"],
        vec!["ground", "spec.md"],
        vec!["frobnicate", "a", "b"],
    ] {
        let out = run_specgate(tmp.path(), &args);
        assert_eq!(out.status.code(), Some(2), "args {:?}", args);
        assert!(
            error_body(&out).starts_with("Usage: "),
            "args {:?}",
            args
        );
    }
}

#[test]
fn help_and_version_exit_zero() {
    let tmp = tempdir().unwrap();
    let help = run_specgate(tmp.path(), &["--help"]);
    assert_eq!(help.status.code(), Some(0));
    let text = String::from_utf8_lossy(&help.stdout);
    for command in ["verify", "verify-legacy", "ground"] {
        assert!(text.contains(command), "help missing {}", command);
    }

    let version = run_specgate(tmp.path(), &["--version"]);
    assert_eq!(version.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&version.stdout).contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn malformed_contract_exits_two() {
    let tmp = tempdir().unwrap();
    fs::write(tmp.path().join("contract.json"), "{\"entities\": [").unwrap();
    for sub in ["verify", "verify-legacy"] {
        let out = run_specgate(tmp.path(), &[sub, "contract.json", "."]);
        assert_eq!(out.status.code(), Some(2));
        assert!(error_body(&out).contains("invalid contract JSON"));
    }
}

#[test]
fn missing_project_root_exits_two() {
    let tmp = tempdir().unwrap();
    fs::write(tmp.path().join("contract.json"), "{\"entities\": []}").unwrap();
    let out = run_specgate(tmp.path(), &["verify", "contract.json", "no-such-dir"]);
    assert_eq!(out.status.code(), Some(2));
    assert!(error_body(&out).contains("not a directory"));
}

#[test]
fn invalid_config_exits_two() {
    let tmp = tempdir().unwrap();
    fs::write(tmp.path().join("contract.json"), "{\"entities\": []}").unwrap();
    fs::write(tmp.path().join("specgate.toml"), "model_dirz = [\"x\"]\n").unwrap();
    let out = run_specgate(tmp.path(), &["verify", "contract.json", "."]);
    assert_eq!(out.status.code(), Some(2));
    assert!(error_body(&out).starts_with("Config error"));
}

#[test]
fn text_format_renders_verdict() {
    let tmp = tempdir().unwrap();
    fs::write(
        tmp.path().join("contract.json"),
        "{\"entities\": [{\"table\": \"users\"}]}",
    )
    .unwrap();
    let out = Command::new(env!("CARGO_BIN_EXE_specgate"))
        .current_dir(tmp.path())
        .args(["verify", "contract.json", ".", "--format", "text"])
        .env("NO_COLOR", "1")
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(1));
    let text = String::from_utf8_lossy(&out.stdout);
    assert!(text.contains("FAIL Table exists: users"));
    assert!(text.contains("FAILED total=1 passed=0 failed=1"));
}

#[test]
fn positional_binaries_take_two_arguments() {
    let tmp = tempdir().unwrap();
    fs::write(tmp.path().join("contract.json"), "{\"entities\": []}").unwrap();
    fs::write(tmp.path().join("spec.md"), "# Empty\n").unwrap();

    let run = |bin: &str, args: &[&str]| {
        Command::new(bin)
            .current_dir(tmp.path())
            .args(args)
            .env_remove("SPECGATE_CONTEXT_TOKENS")
            .output()
            .unwrap()
    };

    let verify = run(env!("CARGO_BIN_EXE_specgate-verify"), &["contract.json", "."]);
    assert_eq!(verify.status.code(), Some(0));
    let legacy = run(env!("CARGO_BIN_EXE_specgate-verify-legacy"), &["contract.json", "."]);
    assert_eq!(legacy.status.code(), Some(1));
    let ground = run(env!("CARGO_BIN_EXE_specgate-ground"), &["spec.md", "."]);
    assert_eq!(ground.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&ground.stdout);
    assert!(stdout.contains("\"codebase_context\""));

    let short = run(env!("CARGO_BIN_EXE_specgate-verify"), &["contract.json"]);
    assert_eq!(short.status.code(), Some(2));
    assert!(error_body(&short).starts_with("Usage: "));
}

use serde_json::Value;
use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::tempdir;

fn run_ground(cwd: &Path, budget: Option<&str>) -> Output {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_specgate"));
    cmd.current_dir(cwd)
        .args(["ground", "spec.md", "."])
        .env_remove("SPECGATE_TRACE");
    match budget {
        Some(b) => cmd.env("SPECGATE_CONTEXT_TOKENS", b),
        None => cmd.env_remove("SPECGATE_CONTEXT_TOKENS"),
    };
    cmd.output().expect("failed to run specgate ground")
}

fn extract_json(output: &Output) -> Value {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let json_start = stdout
        .find('{')
        .unwrap_or_else(|| panic!("expected JSON output, got: {}", stdout));
    serde_json::from_str(&stdout[json_start..])
        .unwrap_or_else(|e| panic!("failed to parse JSON output: {}\n{}", e, stdout))
}

fn write(root: &Path, rel: &str, body: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, body).unwrap();
}

fn modern_codebase() -> tempfile::TempDir {
    let tmp = tempdir().unwrap();
    write(
        tmp.path(),
        "app/models/user.py",
        r#"
from sqlalchemy.orm import Mapped, mapped_column

class User(Base):
    __tablename__ = "users"
    id: Mapped[int] = mapped_column(primary_key=True)
    email: Mapped[str] = mapped_column(String(255))
    display_name: Mapped[str] = mapped_column(String(80))
"#,
    );
    write(
        tmp.path(),
        "app/services/users.py",
        "async def get_user(user_id: int):\n    ...\n",
    );
    tmp
}

fn warnings_of(json: &Value) -> &Vec<Value> {
    json["warnings"].as_array().expect("warnings array")
}

#[test]
fn legacy_spec_code_yields_single_error() {
    let tmp = modern_codebase();
    write(
        tmp.path(),
        "spec.md",
        "# Profiles\n\n```python\nclass Profile(Base):\n    bio = Column(Text)\n```\n",
    );
    let out = run_ground(tmp.path(), None);
    let json = extract_json(&out);
    assert_eq!(out.status.code(), Some(0));

    let errors: Vec<&Value> = warnings_of(&json)
        .iter()
        .filter(|w| w["severity"] == "error")
        .collect();
    assert_eq!(errors.len(), 1, "{}", json["warnings"]);
    assert_eq!(errors[0]["kind"], "convention_mismatch");
    assert_eq!(json["stats"]["error"], 1);
}

#[test]
fn spec_tables_and_paths_are_grounded() {
    let tmp = modern_codebase();
    write(
        tmp.path(),
        "spec.md",
        r#"# Profiles

### `users`

| Column | Type |
|--------|------|
| `email` | String |
| `avatar_url` | String |

### `profiles`

| Column | Type |
|--------|------|
| `bio` | Text |

Files: `app/models/user.py`, `app/models/profile.py`.
"#,
    );
    let out = run_ground(tmp.path(), None);
    let json = extract_json(&out);
    assert_eq!(out.status.code(), Some(0));

    let kinds: Vec<&str> = warnings_of(&json)
        .iter()
        .map(|w| w["kind"].as_str().unwrap())
        .collect();
    assert_eq!(
        kinds,
        vec!["columns_to_add", "undocumented_columns", "new_table", "missing_path"]
    );
    assert_eq!(json["warnings"][0]["columns"][0], "avatar_url");
    assert_eq!(json["warnings"][1]["columns"][0], "display_name");
    assert_eq!(json["warnings"][3]["path"], "app/models/profile.py");
    assert_eq!(json["stats"]["spec_tables"], 2);

    let context = json["codebase_context"].as_str().unwrap();
    assert!(context.starts_with("## Codebase conventions"));
    assert!(context.contains("### users (User, app/models/user.py)"));
    assert!(context.contains("- email: String"));
    assert!(context.contains("### app/services/users.py\nasync def get_user(user_id: int):"));
}

#[test]
fn tiny_budget_degrades_structure_to_file_names() {
    let tmp = modern_codebase();
    write(tmp.path(), "spec.md", "Nothing declared.\n");
    let out = run_ground(tmp.path(), Some("1"));
    let json = extract_json(&out);
    assert_eq!(out.status.code(), Some(0));
    let context = json["codebase_context"].as_str().unwrap();
    assert!(context.contains("- app/models/user.py (omitted: token budget)"));
    assert!(context.contains("- app/services/users.py (omitted: token budget)"));
    assert_eq!(json["stats"]["context"]["budget_tokens"], 1);
}

#[test]
fn malformed_budget_falls_back_to_default() {
    let tmp = modern_codebase();
    write(tmp.path(), "spec.md", "Nothing declared.\n");
    let json = extract_json(&run_ground(tmp.path(), Some("lots")));
    assert_eq!(json["stats"]["context"]["budget_tokens"], 8000);
    assert_eq!(json["stats"]["context"]["included_files"], 2);
}

#[test]
fn missing_spec_file_is_input_error() {
    let tmp = tempdir().unwrap();
    let out = run_ground(tmp.path(), None);
    assert_eq!(out.status.code(), Some(2));
    let json = extract_json(&out);
    assert!(json["error"].as_str().unwrap().contains("spec.md"));
}

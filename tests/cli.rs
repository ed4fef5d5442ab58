use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use tempfile::tempdir;

fn write_file(path: &Path, contents: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn declmap(cwd: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_declmap"))
        .current_dir(cwd)
        .env("HOME", cwd)
        .env("XDG_CONFIG_HOME", cwd.join(".config"))
        .env_remove("DECLMAP_LOG")
        .env_remove("DECLMAP_EXTRACT__SELF_NAME")
        .args(args)
        .output()
        .unwrap()
}

fn json(output: &Output) -> serde_json::Value {
    let stdout = String::from_utf8(output.stdout.clone()).unwrap();
    serde_json::from_str(&stdout).unwrap()
}

const MODELS: &str = "\
class A(Base):
    x = 1
    def __init__(self):
        self.y = 2
    class B:
        pass

@cache
async def fetch(url):
    \"\"\"Fetch a page.\"\"\"
    pass
";

#[test]
fn cli_report_json_lists_classes_and_functions() {
    let dir = tempdir().unwrap();
    write_file(&dir.path().join("models.py"), MODELS);

    let output = declmap(dir.path(), &["report", "models.py", "--json"]);
    assert!(output.status.success());

    let v = json(&output);
    let file = &v["files"][0];
    assert!(file["path"].as_str().unwrap().ends_with("models.py"));
    assert_eq!(file["lines"], 11);

    let class = &file["classes"][0];
    assert_eq!(class["name"], "A");
    assert_eq!(class["base_classes"], "(Base)");
    assert_eq!(class["attributes"], serde_json::json!(["x"]));
    assert_eq!(class["instance_attributes"], serde_json::json!(["y"]));
    assert_eq!(class["methods"], serde_json::json!(["__init__"]));
    assert_eq!(class["inner_classes"][0]["name"], "B");
    assert_eq!(class["inner_classes"][0]["parent_class"], "A");
    assert_eq!(file["classes"].as_array().unwrap().len(), 1);

    let functions = file["functions"].as_array().unwrap();
    assert_eq!(functions.len(), 2);
    assert_eq!(functions[0]["type"], "method");
    assert_eq!(functions[0]["enclosing_class"], "A");
    assert_eq!(functions[1]["type"], "async_function");
    assert_eq!(functions[1]["decorators"], serde_json::json!(["@cache"]));
    assert_eq!(functions[1]["docstring"], "\"\"\"Fetch a page.\"\"\"");

    assert_eq!(v["summary"]["files"], 1);
    assert_eq!(v["summary"]["classes"], 2);
    assert_eq!(v["summary"]["functions"], 2);
    assert_eq!(v["summary"]["methods"], 1);
}

#[test]
fn cli_functions_and_classes_text_output() {
    let dir = tempdir().unwrap();
    write_file(&dir.path().join("models.py"), MODELS);

    let output = declmap(dir.path(), &["functions", "models.py"]);
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("Type: method\nClass: A\nFunction: __init__"));
    assert!(stdout.contains("Function: fetch\nParameters: (url)"));
    assert!(!stdout.contains("Class attributes:"));

    let output = declmap(dir.path(), &["classes", "models.py", "--no-text"]);
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("Class: A\nBase classes: (Base)"));
    assert!(stdout.contains("Class: B\nParent class: A"));
    assert!(!stdout.contains("Function:"));
    assert!(!stdout.contains("Code:"));
}

#[test]
fn cli_respects_declmapignore_and_hidden() {
    let dir = tempdir().unwrap();

    write_file(&dir.path().join("a.py"), "def a():\n    pass\n");
    write_file(&dir.path().join("ignored.py"), "def ignored():\n    pass\n");
    write_file(&dir.path().join(".hidden/b.py"), "def hidden():\n    pass\n");
    write_file(&dir.path().join("notes.txt"), "def text():\n    pass\n");
    write_file(&dir.path().join(".declmapignore"), "ignored.py\n");

    let output = declmap(dir.path(), &["functions", ".", "--json"]);
    assert!(output.status.success());

    let v = json(&output);
    let paths: Vec<String> = v["files"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["path"].as_str().unwrap().to_string())
        .collect();

    assert_eq!(paths.len(), 1);
    assert!(paths[0].ends_with("a.py"));

    let output = declmap(dir.path(), &["functions", ".", "--json", "--include-hidden"]);
    assert!(output.status.success());
    let v = json(&output);
    assert_eq!(v["files"].as_array().unwrap().len(), 2);
}

#[test]
fn cli_exclude_and_self_name() {
    let dir = tempdir().unwrap();

    write_file(
        &dir.path().join("pkg/user.py"),
        "class User:\n    def __init__(me):\n        me.name = ''\n",
    );
    write_file(&dir.path().join("tests/test_user.py"), "def test_user():\n    pass\n");

    let output = declmap(
        dir.path(),
        &["classes", ".", "--json", "--exclude", "tests/**", "--self-name", "me"],
    );
    assert!(output.status.success());

    let v = json(&output);
    let files = v["files"].as_array().unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(
        files[0]["classes"][0]["instance_attributes"],
        serde_json::json!(["name"])
    );
}

#[test]
fn cli_self_name_from_project_config() {
    let dir = tempdir().unwrap();

    write_file(
        &dir.path().join("user.py"),
        "class User:\n    def __init__(this):\n        this.name = ''\n",
    );
    write_file(&dir.path().join("declmap.toml"), "[extract]\nself_name = \"this\"\n");

    let output = declmap(dir.path(), &["classes", "user.py", "--json", "--no-text"]);
    assert!(output.status.success());

    let v = json(&output);
    let class = &v["files"][0]["classes"][0];
    assert_eq!(class["instance_attributes"], serde_json::json!(["name"]));
    assert!(class.get("text").is_none());
}

#[test]
fn cli_json_errors_are_valid_json() {
    let dir = tempdir().unwrap();

    let output = declmap(dir.path(), &["report", "missing\"quote.py", "--json"]);
    assert_eq!(output.status.code(), Some(3));

    let stderr = String::from_utf8(output.stderr).unwrap();
    let v: serde_json::Value = serde_json::from_str(stderr.trim()).unwrap();
    let msg = v.get("error").unwrap().as_str().unwrap();
    assert!(msg.contains("missing\"quote.py"));
}

#[test]
fn cli_no_python_files() {
    let dir = tempdir().unwrap();
    write_file(&dir.path().join("readme.md"), "# nothing\n");

    let output = declmap(dir.path(), &["report", "."]);
    assert_eq!(output.status.code(), Some(5));

    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("no python files found"));
}

#[test]
fn cli_syntax_errors_still_report() {
    let dir = tempdir().unwrap();
    write_file(&dir.path().join("broken.py"), "def ok():\n    pass\n\ndef broken(:\n");

    let output = declmap(dir.path(), &["functions", "broken.py", "--json"]);
    assert!(output.status.success());

    let v = json(&output);
    let functions = v["files"][0]["functions"].as_array().unwrap();
    assert!(functions.iter().any(|f| f["name"] == "ok"));
}

#[test]
fn cli_deep_expression_does_not_abort_batch() {
    let dir = tempdir().unwrap();
    let deep = format!("TOTAL = 1{}\n\ndef after():\n    pass\n", " + 1".repeat(5000));
    write_file(&dir.path().join("deep.py"), &deep);
    write_file(&dir.path().join("plain.py"), "class Plain:\n    pass\n");

    let output = declmap(dir.path(), &["report", ".", "--json", "--no-text"]);
    assert!(output.status.success());

    let v = json(&output);
    assert_eq!(v["summary"]["files"], 2);
    assert_eq!(v["summary"]["functions"], 1);
    assert_eq!(v["summary"]["classes"], 1);
}

#[test]
fn cli_missing_config_file_is_an_error() {
    let dir = tempdir().unwrap();
    write_file(&dir.path().join("a.py"), "def a():\n    pass\n");

    let output = declmap(dir.path(), &["--config", "absent.toml", "functions", "a.py"]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("config error"));
}

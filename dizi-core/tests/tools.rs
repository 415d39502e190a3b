use std::fs;
use std::path::Path;
use std::sync::Arc;

use dizi_core::file::ignore::IgnoreCache;
use dizi_core::{ProjectFilesystem, ProjectTools, ToolOutput};
use serde_json::json;

fn setup(root: &Path) -> ProjectTools {
    let fs = ProjectFilesystem::new(root)
        .unwrap()
        .with_ignore_cache(Arc::new(IgnoreCache::new()));
    ProjectTools::new(fs)
}

fn write(root: &Path, name: &str, content: &str) {
    let path = root.join(name);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn assert_ok(output: &ToolOutput) {
    assert!(!output.is_error, "unexpected error: {}", output.content);
}

#[tokio::test]
async fn test_read_modify_write_session() {
    let temp = tempfile::tempdir().unwrap();
    write(temp.path(), "src/main.rs", "fn main() {\n    println!(\"hi\");\n}\n");
    let tools = setup(temp.path());

    let output = tools
        .call("write_project_file", json!({ "path": "src/main.rs", "content": "" }))
        .await;
    assert!(output.is_error);
    assert!(output.content.contains("has not been read yet"));

    let output = tools
        .call(
            "read_project_file",
            json!({ "path": "src/main.rs", "line_offset": 1, "count": 1 }),
        )
        .await;
    assert_ok(&output);
    assert_eq!(output.content, "    println!(\"hi\");");

    let output = tools
        .call(
            "edit_project_file",
            json!({ "path": "src/main.rs", "old_string": "\"hi\"", "new_string": "\"hello\"" }),
        )
        .await;
    assert_ok(&output);

    let output = tools
        .call("read_project_file", json!({ "path": "src/main.rs" }))
        .await;
    assert_eq!(output.content, "fn main() {\n    println!(\"hello\");\n}\n");
}

#[tokio::test]
async fn test_unknown_tool_and_bad_arguments_are_error_outputs() {
    let temp = tempfile::tempdir().unwrap();
    let tools = setup(temp.path());

    let output = tools.call("delete_project_file", json!({})).await;
    assert!(output.is_error);
    assert!(output.content.contains("Unknown tool"));

    let output = tools.call("write_project_file", json!({ "path": 7 })).await;
    assert!(output.is_error);
    assert!(output.content.contains("write_project_file"));
}

#[tokio::test]
async fn test_list_and_grep_honor_ignore_file() {
    let temp = tempfile::tempdir().unwrap();
    write(temp.path(), ".gitignore", "# build output\ntarget/\n*.log\n");
    write(temp.path(), "src/lib.rs", "pub fn answer() -> u32 { 42 }\n");
    write(temp.path(), "target/debug/out.rs", "pub fn answer() {}\n");
    write(temp.path(), "run.log", "answer\n");
    let tools = setup(temp.path());

    let output = tools.call("list_project_files", json!({})).await;
    assert_eq!(output.content, ".gitignore\nsrc/lib.rs");

    let output = tools
        .call("list_project_files", json!({ "include_ignored": true }))
        .await;
    assert_eq!(
        output.content,
        ".gitignore\nrun.log\nsrc/lib.rs\ntarget/debug/out.rs"
    );

    let output = tools
        .call("grep_project_files", json!({ "pattern": r"fn answer\(" }))
        .await;
    assert_eq!(
        output.structured,
        Some(json!([{ "path": "src/lib.rs", "line": 1, "content": "pub fn answer() -> u32 { 42 }" }]))
    );

    let output = tools
        .call(
            "grep_project_files",
            json!({ "pattern": "answer", "glob": "**/*.log" }),
        )
        .await;
    assert_eq!(
        output.structured,
        Some(json!([{ "path": "run.log", "line": 1, "content": "answer" }]))
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_calls_share_read_tracking() {
    let temp = tempfile::tempdir().unwrap();
    for i in 0..16 {
        write(temp.path(), &format!("file{i}.txt"), &format!("value {i}\n"));
    }
    let tools = setup(temp.path());

    let mut reads = tokio::task::JoinSet::new();
    for i in 0..16 {
        let tools = tools.clone();
        reads.spawn(async move {
            tools
                .call("read_project_file", json!({ "path": format!("file{i}.txt") }))
                .await
        });
    }
    while let Some(result) = reads.join_next().await {
        assert_ok(&result.unwrap());
    }

    let mut edits = tokio::task::JoinSet::new();
    for i in 0..16 {
        let tools = tools.clone();
        edits.spawn(async move {
            tools
                .call(
                    "edit_project_file",
                    json!({
                        "path": format!("file{i}.txt"),
                        "old_string": format!("value {i}"),
                        "new_string": format!("edited {i}"),
                    }),
                )
                .await
        });
    }
    while let Some(result) = edits.join_next().await {
        assert_ok(&result.unwrap());
    }

    for i in 0..16 {
        let content = fs::read_to_string(temp.path().join(format!("file{i}.txt"))).unwrap();
        assert_eq!(content, format!("edited {i}\n"));
    }
}

#[tokio::test]
async fn test_sandbox_holds_for_every_tool() {
    let outer = tempfile::tempdir().unwrap();
    let root = outer.path().join("project");
    fs::create_dir(&root).unwrap();
    write(outer.path(), "secret.txt", "top secret");
    let tools = setup(&root);

    for (name, args) in [
        ("read_project_file", json!({ "path": "../secret.txt" })),
        ("write_project_file", json!({ "path": "../secret.txt", "content": "x" })),
        (
            "edit_project_file",
            json!({ "path": "../secret.txt", "old_string": "top", "new_string": "x" }),
        ),
    ] {
        let output = tools.call(name, args).await;
        assert!(output.is_error, "{name} escaped the sandbox");
        assert!(output.content.contains("outside project directory"));
    }

    assert_eq!(
        fs::read_to_string(outer.path().join("secret.txt")).unwrap(),
        "top secret"
    );
}

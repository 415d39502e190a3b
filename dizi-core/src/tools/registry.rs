use std::sync::Arc;

use serde_json::Value;
use strum::VariantArray;
use tracing::{debug, error};

use super::call::{
    input_schema, EditProjectFileArgs, GrepProjectFilesArgs, ListProjectFilesArgs,
    ReadProjectFileArgs, ToolCall, WriteProjectFileArgs,
};
use super::{ToolDefinition, ToolName, ToolOutput};
use crate::file::access::ProjectFilesystem;
use crate::file::search::search_files::GrepQuery;

/// Runs tool calls against one project. Clones share the same filesystem
/// state, so read tracking carries across them.
#[derive(Debug, Clone)]
pub struct ProjectTools {
    fs: Arc<ProjectFilesystem>,
}

impl ProjectTools {
    pub fn new(fs: ProjectFilesystem) -> Self {
        Self { fs: Arc::new(fs) }
    }

    pub fn definitions() -> Vec<ToolDefinition> {
        ToolName::VARIANTS
            .iter()
            .map(|tool| ToolDefinition {
                name: tool.to_string(),
                description: tool.description().to_string(),
                input_schema: input_schema(*tool),
            })
            .collect()
    }

    /// Parses and runs a call by name. Never fails: bad names and arguments
    /// come back as error outputs.
    pub async fn call(&self, name: &str, arguments: Value) -> ToolOutput {
        match ToolCall::parse(name, arguments) {
            Ok(call) => self.execute(call).await,
            Err(e) => {
                error!(?e, tool_name = name, "Rejected tool call");
                ToolOutput::error(format!("{e:#}"))
            }
        }
    }

    /// Runs `call` on the blocking pool.
    pub async fn execute(&self, call: ToolCall) -> ToolOutput {
        let tools = self.clone();
        let name = call.name();
        match tokio::task::spawn_blocking(move || tools.execute_blocking(call)).await {
            Ok(output) => output,
            Err(e) => {
                error!(?e, tool_name = %name, "Tool task failed");
                ToolOutput::error(format!("Failed to run {name}: {e}"))
            }
        }
    }

    pub fn execute_blocking(&self, call: ToolCall) -> ToolOutput {
        debug!(tool_name = %call.name(), "Executing tool");
        match call {
            ToolCall::ListProjectFiles(args) => self.list(args),
            ToolCall::ReadProjectFile(args) => self.read(args),
            ToolCall::WriteProjectFile(args) => self.write(args),
            ToolCall::EditProjectFile(args) => self.edit(args),
            ToolCall::GrepProjectFiles(args) => self.grep(args),
        }
    }

    fn list(&self, args: ListProjectFilesArgs) -> ToolOutput {
        match self
            .fs
            .list_files(args.glob_pattern.as_deref(), args.include_ignored.unwrap_or(false))
        {
            Ok(files) if files.is_empty() => ToolOutput::text("No files found."),
            Ok(files) => ToolOutput::text(files.join("\n")),
            Err(e) => ToolOutput::error(format!("Failed to list files: {e}")),
        }
    }

    fn read(&self, args: ReadProjectFileArgs) -> ToolOutput {
        match self.fs.read_file(&args.path, args.line_offset.unwrap_or(0), args.count) {
            Ok(content) => ToolOutput::text(content),
            Err(e) => ToolOutput::error(format!("Failed to read file: {e}")),
        }
    }

    fn write(&self, args: WriteProjectFileArgs) -> ToolOutput {
        match self.fs.write_file(&args.path, &args.content) {
            Ok(path) => ToolOutput::text(format!(
                "Success! Wrote {} bytes to {}",
                args.content.len(),
                self.fs.display_path(&path)
            )),
            Err(e) => ToolOutput::error(format!("Failed to write file: {e}")),
        }
    }

    fn edit(&self, args: EditProjectFileArgs) -> ToolOutput {
        match self
            .fs
            .edit_file(&args.path, &args.old_string, &args.new_string)
        {
            Ok(path) => ToolOutput::text(format!("Success! Edited {}", self.fs.display_path(&path))),
            Err(e) => ToolOutput::error(format!("Failed to edit file: {e}")),
        }
    }

    fn grep(&self, args: GrepProjectFilesArgs) -> ToolOutput {
        let mut query = GrepQuery::new(args.pattern)
            .case_sensitive(args.case_sensitive.unwrap_or(false))
            .max_results(
                args.max_results
                    .unwrap_or(self.fs.settings().default_max_results),
            );
        query.glob = args.glob;

        let results = match self.fs.grep(&query) {
            Ok(results) => results,
            Err(e) => return ToolOutput::error(format!("Failed to search files: {e}")),
        };

        let structured = match serde_json::to_value(&results) {
            Ok(value) => value,
            Err(e) => return ToolOutput::error(format!("Failed to encode results: {e}")),
        };
        let content = serde_json::to_string_pretty(&structured).unwrap_or_else(|_| "[]".into());
        ToolOutput::text(content).with_structured(structured)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::ignore::IgnoreCache;
    use serde_json::json;
    use std::fs;

    fn project_tools(files: &[(&str, &str)]) -> (tempfile::TempDir, ProjectTools) {
        let temp = tempfile::tempdir().unwrap();
        for (name, content) in files {
            let path = temp.path().join(name);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }
        let fs = ProjectFilesystem::new(temp.path())
            .unwrap()
            .with_ignore_cache(Arc::new(IgnoreCache::new()));
        (temp, ProjectTools::new(fs))
    }

    fn run(tools: &ProjectTools, name: &str, arguments: Value) -> ToolOutput {
        let call = ToolCall::parse(name, arguments).unwrap();
        tools.execute_blocking(call)
    }

    #[test]
    fn test_definitions_cover_every_tool() {
        let names: Vec<String> = ProjectTools::definitions()
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(names.len(), 5);
        assert!(names.contains(&"grep_project_files".to_string()));
    }

    #[test]
    fn test_list_output() {
        let (_temp, tools) = project_tools(&[]);
        let output = run(&tools, "list_project_files", json!({}));
        assert_eq!(output, ToolOutput::text("No files found."));

        let (_temp, tools) = project_tools(&[("b.txt", ""), ("a/c.txt", "")]);
        let output = run(&tools, "list_project_files", json!({}));
        assert_eq!(output.content, "a/c.txt\nb.txt");
        assert!(!output.is_error);
    }

    #[test]
    fn test_write_and_edit_messages() {
        let (_temp, tools) = project_tools(&[]);

        let output = run(
            &tools,
            "write_project_file",
            json!({ "path": "notes/todo.md", "content": "- one\n- two\n" }),
        );
        assert_eq!(output.content, "Success! Wrote 12 bytes to notes/todo.md");

        let output = run(
            &tools,
            "edit_project_file",
            json!({ "path": "notes/todo.md", "old_string": "- two", "new_string": "- 2" }),
        );
        assert_eq!(output.content, "Success! Edited notes/todo.md");

        let output = run(
            &tools,
            "edit_project_file",
            json!({ "path": "notes/todo.md", "old_string": "- ", "new_string": "* " }),
        );
        assert!(output.is_error);
        assert!(output.content.starts_with("Failed to edit file: "));
        assert!(output.content.contains("2 times"));
    }

    #[test]
    fn test_read_failure_is_an_error_output() {
        let (_temp, tools) = project_tools(&[]);
        let output = run(&tools, "read_project_file", json!({ "path": "../secret" }));
        assert!(output.is_error);
        assert!(output.content.starts_with("Failed to read file: access denied"));
    }

    #[test]
    fn test_null_optionals_use_defaults() {
        let (_temp, tools) = project_tools(&[
            ("a.txt", "one\ntwo"),
            ("b.txt", "one"),
            (".gitignore", "b.txt\n"),
        ]);

        let output = run(
            &tools,
            "read_project_file",
            json!({ "path": "a.txt", "line_offset": null, "count": null }),
        );
        assert_eq!(output, ToolOutput::text("one\ntwo"));

        let output = run(
            &tools,
            "list_project_files",
            json!({ "glob_pattern": null, "include_ignored": null }),
        );
        assert_eq!(output.content, ".gitignore\na.txt");

        let output = run(
            &tools,
            "grep_project_files",
            json!({ "pattern": "ONE", "case_sensitive": null, "max_results": null }),
        );
        assert_eq!(
            output.structured,
            Some(json!([{ "path": "a.txt", "line": 1, "content": "one" }]))
        );
    }

    #[test]
    fn test_grep_returns_structured_results() {
        let (_temp, tools) = project_tools(&[("main.go", "package main\n// todo: fix\n")]);

        let output = run(&tools, "grep_project_files", json!({ "pattern": "TODO" }));
        let expected = json!([{ "path": "main.go", "line": 2, "content": "// todo: fix" }]);
        assert_eq!(output.structured, Some(expected.clone()));
        let parsed: Value = serde_json::from_str(&output.content).unwrap();
        assert_eq!(parsed, expected);

        let output = run(
            &tools,
            "grep_project_files",
            json!({ "pattern": "TODO", "case_sensitive": true }),
        );
        assert_eq!(output.structured, Some(json!([])));
    }
}

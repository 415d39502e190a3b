use std::str::FromStr;

use anyhow::{anyhow, Context, Result};
use schemars::{schema_for, JsonSchema};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use super::ToolName;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, JsonSchema)]
pub struct ListProjectFilesArgs {
    /// Glob to filter by, e.g. `**/*.rs`. A pattern without `/` (other than
    /// a bare `**`) only matches files in the project root.
    #[serde(default)]
    pub glob_pattern: Option<String>,
    /// Also list files matched by .gitignore.
    #[serde(default)]
    pub include_ignored: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, JsonSchema)]
pub struct ReadProjectFileArgs {
    /// Path relative to the project root.
    pub path: String,
    /// Zero based line to start from.
    #[serde(default)]
    pub line_offset: Option<usize>,
    /// Number of lines to return. Omit (or pass 0) to read to the end.
    #[serde(default)]
    pub count: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, JsonSchema)]
pub struct WriteProjectFileArgs {
    /// Path relative to the project root.
    pub path: String,
    /// The complete new contents of the file.
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, JsonSchema)]
pub struct EditProjectFileArgs {
    /// Path relative to the project root.
    pub path: String,
    /// Exact text to replace. Must occur exactly once in the file.
    pub old_string: String,
    /// Replacement text.
    pub new_string: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, JsonSchema)]
pub struct GrepProjectFilesArgs {
    /// Regular expression (or plain text) to look for.
    pub pattern: String,
    /// Only search files matching this glob. Disables .gitignore filtering.
    #[serde(default)]
    pub glob: Option<String>,
    #[serde(default)]
    pub case_sensitive: Option<bool>,
    /// Stop after this many matching lines. Defaults to 100.
    #[serde(default)]
    pub max_results: Option<usize>,
}

/// A parsed invocation of one of the five tools.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolCall {
    ListProjectFiles(ListProjectFilesArgs),
    ReadProjectFile(ReadProjectFileArgs),
    WriteProjectFile(WriteProjectFileArgs),
    EditProjectFile(EditProjectFileArgs),
    GrepProjectFiles(GrepProjectFilesArgs),
}

impl ToolCall {
    /// Parses a named call. `null` arguments count as an empty object.
    pub fn parse(name: &str, arguments: Value) -> Result<Self> {
        let tool = ToolName::from_str(name).map_err(|_| anyhow!("Unknown tool: {name}"))?;
        let arguments = match arguments {
            Value::Null => json!({}),
            other => other,
        };

        Ok(match tool {
            ToolName::ListProjectFiles => Self::ListProjectFiles(decode(tool, arguments)?),
            ToolName::ReadProjectFile => Self::ReadProjectFile(decode(tool, arguments)?),
            ToolName::WriteProjectFile => Self::WriteProjectFile(decode(tool, arguments)?),
            ToolName::EditProjectFile => Self::EditProjectFile(decode(tool, arguments)?),
            ToolName::GrepProjectFiles => Self::GrepProjectFiles(decode(tool, arguments)?),
        })
    }

    pub fn name(&self) -> ToolName {
        match self {
            Self::ListProjectFiles(_) => ToolName::ListProjectFiles,
            Self::ReadProjectFile(_) => ToolName::ReadProjectFile,
            Self::WriteProjectFile(_) => ToolName::WriteProjectFile,
            Self::EditProjectFile(_) => ToolName::EditProjectFile,
            Self::GrepProjectFiles(_) => ToolName::GrepProjectFiles,
        }
    }
}

fn decode<T: DeserializeOwned>(tool: ToolName, arguments: Value) -> Result<T> {
    serde_json::from_value(arguments).with_context(|| format!("Invalid arguments for {tool}"))
}

/// JSON schema of the arguments `tool` accepts.
pub fn input_schema(tool: ToolName) -> Value {
    let schema = match tool {
        ToolName::ListProjectFiles => schema_for!(ListProjectFilesArgs),
        ToolName::ReadProjectFile => schema_for!(ReadProjectFileArgs),
        ToolName::WriteProjectFile => schema_for!(WriteProjectFileArgs),
        ToolName::EditProjectFile => schema_for!(EditProjectFileArgs),
        ToolName::GrepProjectFiles => schema_for!(GrepProjectFilesArgs),
    };

    let mut value = serde_json::to_value(schema).unwrap_or_else(|_| json!({ "type": "object" }));
    if let Some(object) = value.as_object_mut() {
        object.remove("$schema");
        object.remove("title");
    }
    value
}

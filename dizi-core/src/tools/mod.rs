//! The five project file operations as callable tools.
//!
//! Operations form a closed set: [`ToolName`] names them, [`ToolCall`] carries
//! typed arguments for each one and [`ProjectTools`] runs them.

pub mod call;
pub mod registry;

use serde::Serialize;
use serde_json::Value;

pub use call::{
    EditProjectFileArgs, GrepProjectFilesArgs, ListProjectFilesArgs, ReadProjectFileArgs,
    ToolCall, WriteProjectFileArgs,
};
pub use registry::ProjectTools;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
    strum::VariantArray,
)]
#[strum(serialize_all = "snake_case")]
pub enum ToolName {
    ListProjectFiles,
    ReadProjectFile,
    WriteProjectFile,
    EditProjectFile,
    GrepProjectFiles,
}

impl ToolName {
    pub fn description(self) -> &'static str {
        match self {
            Self::ListProjectFiles => {
                "List files in the project directory. Files matched by the project's \
                 .gitignore are hidden unless include_ignored is set."
            }
            Self::ReadProjectFile => {
                "Read a text file from the project directory. Optionally return only \
                 `count` lines starting at the zero based `line_offset`. A file must be \
                 read before it can be overwritten or edited."
            }
            Self::WriteProjectFile => {
                "Write a file in the project directory, replacing its contents and \
                 creating parent directories as needed. Existing files must be read \
                 first and must not have changed since."
            }
            Self::EditProjectFile => {
                "Replace one exact occurrence of old_string with new_string in a file \
                 that has been read. Fails if old_string is missing or appears more than \
                 once; include surrounding lines to make it unique."
            }
            Self::GrepProjectFiles => {
                "Search project files line by line. The pattern is a regular expression \
                 (falling back to a plain substring if it does not compile) and is case \
                 insensitive by default. Passing glob replaces .gitignore filtering."
            }
        }
    }
}

/// A tool as advertised to callers.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// What a tool call produced. Failures are outputs too, flagged by
/// `is_error`.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutput {
    pub content: String,
    pub is_error: bool,
    pub structured: Option<Value>,
}

impl ToolOutput {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: false,
            structured: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: message.into(),
            is_error: true,
            structured: None,
        }
    }

    pub fn with_structured(mut self, value: Value) -> Self {
        self.structured = Some(value);
        self
    }
}

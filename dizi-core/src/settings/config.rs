use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

fn default_server_name() -> String {
    "dizi".to_string()
}

fn default_server_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_server_description() -> String {
    "Sandboxed project file tools".to_string()
}

fn default_max_file_size() -> u64 {
    256 * 1024
}

fn default_max_line_length() -> usize {
    200
}

fn default_max_results() -> usize {
    100
}

fn default_ignore_file() -> String {
    ".gitignore".to_string()
}

fn default_max_search_file_size() -> u64 {
    10 * 1024 * 1024
}

/// Identity reported to clients during the protocol handshake.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Server {
    #[serde(default = "default_server_name")]
    pub name: String,

    #[serde(default = "default_server_version")]
    pub version: String,

    #[serde(default = "default_server_description")]
    pub description: String,
}

impl Default for Server {
    fn default() -> Self {
        Self {
            name: default_server_name(),
            version: default_server_version(),
            description: default_server_description(),
        }
    }
}

/// Limits and inputs for the project file tools.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Filesystem {
    /// Files larger than this many bytes are refused by read_project_file.
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,

    /// Grep result lines longer than this many characters are truncated.
    #[serde(default = "default_max_line_length")]
    pub max_line_length: usize,

    /// Result cap used by grep_project_files when the caller gives none.
    #[serde(default = "default_max_results")]
    pub default_max_results: usize,

    /// Name of the ignore list, relative to the project root.
    #[serde(default = "default_ignore_file")]
    pub ignore_file: String,

    /// Files larger than this are skipped by grep instead of being loaded.
    #[serde(default = "default_max_search_file_size")]
    pub max_search_file_size: u64,
}

impl Default for Filesystem {
    fn default() -> Self {
        Self {
            max_file_size: default_max_file_size(),
            max_line_length: default_max_line_length(),
            default_max_results: default_max_results(),
            ignore_file: default_ignore_file(),
            max_search_file_size: default_max_search_file_size(),
        }
    }
}

/// Top level settings file (`dizi.toml`).
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Settings {
    #[serde(default)]
    pub server: Server,

    #[serde(default)]
    pub filesystem: Filesystem,
}

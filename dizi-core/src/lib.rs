pub mod error;
pub mod file;
pub mod settings;
pub mod tools;

// Public library API. Frontends should only need these.
pub use error::FsError;
pub use file::access::ProjectFilesystem;
pub use file::search::search_files::{GrepQuery, GrepResult};
pub use settings::Settings;
pub use tools::{ProjectTools, ToolCall, ToolDefinition, ToolName, ToolOutput};

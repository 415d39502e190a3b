//! Content rewriting for edits.

pub mod replace_in_file;

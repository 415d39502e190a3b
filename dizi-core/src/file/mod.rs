//! The file module is the sandboxed interface to one project directory.
//!
//! ## Architecture
//!
//! ### resolver.rs
//! Maps caller paths onto the project root and refuses anything outside it,
//! including symlinks whose targets leave the tree. Nothing touches the disk
//! before a path has been resolved here.
//!
//! ### ignore.rs
//! Translates `.gitignore` style lines into glob matchers. Translated sets are
//! cached per root for the life of the process; edits to the ignore file are
//! not picked up. Negation (`!pattern`) is not supported.
//!
//! ### search/
//! Walks the tree for listing (`list_files.rs`) and line search
//! (`search_files.rs`).
//!
//! ### tracker.rs / modify/
//! Read-before-write protection and single occurrence replacement.
//!
//! ### access.rs
//! Ties everything together behind [`access::ProjectFilesystem`].

pub mod access;
pub mod ignore;
pub mod modify;
pub mod resolver;
pub mod search;
pub mod tracker;

//! Virtual file system for live code blocks.
//!
//! Code blocks on a page are analyzed as if they were files on disk, but nothing
//! ever touches a real filesystem. This crate provides the two leaf layers:
//!
//! * [`store`]: a flat, in-memory path → text map with per-file versions
//! * [`host`]: the query surface an analysis engine expects of its environment
//!   (file lookup, default library, current directory, script versions)
//!
//! Both are single-threaded and synchronous; sharing across tasks is the
//! caller's business.

pub mod host;
pub mod store;

pub use host::{CURRENT_DIRECTORY, CompilerHost, DEFAULT_LIB_FILE, NEW_LINE};
pub use store::{ROOT_DIR, VirtualFile, VirtualFileStore};

//! Error types for analysis sessions.

use thiserror::Error;

/// Errors returned by [`AnalysisSession`](crate::AnalysisSession) operations.
#[derive(Debug, Error)]
pub enum AnalysisError {
	/// `create_file` was called for a path the session already knows.
	#[error("file already exists: {0}")]
	AlreadyExists(String),

	/// The path was never registered with the session.
	#[error("file not found: {0}")]
	FileNotFound(String),

	/// A replacement span does not fit the current text of the file.
	#[error("span {start}..{end} is out of bounds for {path} ({len} bytes)")]
	SpanOutOfBounds {
		/// File the edit targeted.
		path: String,
		/// First replaced byte.
		start: usize,
		/// One past the last replaced byte.
		end: usize,
		/// Current length of the file text.
		len: usize,
	},

	/// An extra library name that the library set does not provide.
	#[error("unknown library: {0}")]
	UnknownLibrary(String),

	/// The session was torn down.
	#[error("analysis session has been disposed")]
	Disposed,
}

/// Result type for analysis operations.
pub type Result<T> = std::result::Result<T, AnalysisError>;

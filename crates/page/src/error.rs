//! Error types for page configuration and live pages.

use quill_analysis::AnalysisError;
use quill_tokenize::TokenizeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PageError {
	/// Page configuration JSON did not deserialize.
	#[error("invalid page configuration: {0}")]
	InvalidConfig(#[from] serde_json::Error),

	/// A code block id that the page does not define.
	#[error("unknown code block: {0}")]
	UnknownBlock(String),

	/// A code block names a source file the page does not define.
	#[error("code block {block} belongs to unknown source file {file}")]
	UnknownSourceFile { block: String, file: String },

	/// A source file name that the page does not define.
	#[error("unknown source file: {0}")]
	UnknownFile(String),

	/// A source file lists a fragment whose block does not point back at it.
	#[error("source file {file} lists block {block}, which is not one of its fragments")]
	FragmentMismatch { file: String, block: String },

	#[error(transparent)]
	Tokenize(#[from] TokenizeError),

	#[error(transparent)]
	Analysis(#[from] AnalysisError),
}

pub type Result<T> = std::result::Result<T, PageError>;

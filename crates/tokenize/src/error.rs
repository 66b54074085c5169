//! Error types for grammar loading and tokenization.

use quill_analysis::AnalysisError;
use thiserror::Error;

/// Errors raised while building tokenizers.
#[derive(Debug, Error)]
pub enum TokenizeError {
	/// No registered grammar answers to this language tag.
	#[error("unknown language: {0}")]
	UnknownLanguage(String),

	/// Grammar JSON did not deserialize.
	#[error("invalid grammar definition: {0}")]
	InvalidGrammar(#[from] serde_json::Error),

	/// A `match`, `begin` or `end` pattern failed to compile.
	#[error("invalid pattern in grammar {grammar}: {pattern:?}")]
	InvalidPattern {
		grammar: String,
		pattern: String,
		#[source]
		source: Box<regex::Error>,
	},

	/// An `include` names a repository entry or grammar that does not exist.
	#[error("grammar {grammar} includes unknown rule {include:?}")]
	UnknownInclude { grammar: String, include: String },

	/// A rule has neither `match`, `begin`, `include` nor `patterns`.
	#[error("grammar {grammar} has an empty rule")]
	EmptyRule { grammar: String },

	/// A `begin` rule without an `end` pattern.
	#[error("grammar {grammar} has a begin rule without an end")]
	MissingEnd { grammar: String },

	#[error(transparent)]
	Analysis(#[from] AnalysisError),
}

/// Result type for tokenizer construction.
pub type Result<T> = std::result::Result<T, TokenizeError>;

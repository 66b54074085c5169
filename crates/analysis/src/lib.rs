//! Incremental language analysis over an in-memory file system.
//!
//! An [`AnalysisSession`] owns a [`CompilerHost`](quill_vfs::CompilerHost)
//! and a [`LanguageEngine`]. Edits are applied as span replacements; queries
//! for classifications, diagnostics and hover information are delegated to the
//! engine, which caches by file and project version.
//!
//! [`ScriptEngine`] is the built-in engine for a TypeScript-like subset.

mod engine;
mod error;
mod libs;
mod script;
mod session;
mod types;

pub use engine::{EngineContext, LanguageEngine};
pub use error::{AnalysisError, Result};
pub use libs::{ExtraLibrary, Libraries, LibraryFile};
pub use script::ScriptEngine;
pub use session::{AnalysisSession, ProjectVersion, SessionConfig};
pub use types::{
	ClassificationKind, ClassifiedSpan, Diagnostic, DiagnosticCategory, DisplayPart, DisplayPartKind, QuickInfo,
	ScriptElementKind, TextChange, TextSpan,
};

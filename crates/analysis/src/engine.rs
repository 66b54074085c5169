//! The seam between a session and the analyzer behind it.

use quill_vfs::CompilerHost;

use crate::types::{ClassifiedSpan, Diagnostic, QuickInfo, TextChange, TextSpan};

/// What an engine sees of the session on every query.
#[derive(Debug, Clone, Copy)]
pub struct EngineContext<'a> {
	pub host: &'a CompilerHost,
	/// Bumped once per accepted edit or file creation. Any cached result
	/// computed under an older value may depend on stale text.
	pub project_version: u64,
}

/// Language analysis backend driven by an [`AnalysisSession`].
///
/// Every query receives the current host; the engine decides what it may reuse
/// by comparing file and project versions against what it has cached. Results
/// are returned as-is by the session.
///
/// [`AnalysisSession`]: crate::AnalysisSession
pub trait LanguageEngine: Send {
	/// A library file was registered. `module` names the import specifier that
	/// exposes it, if it is only visible through an import.
	fn library_added(&mut self, _path: &str, _module: Option<&str>) {}

	/// A root file was created.
	fn file_added(&mut self, _cx: EngineContext<'_>, _path: &str) {}

	/// `path` changed; the host already holds the new text.
	fn file_changed(&mut self, cx: EngineContext<'_>, path: &str, change: &TextChange);

	fn quick_info(&mut self, cx: EngineContext<'_>, path: &str, position: usize) -> Option<QuickInfo>;

	fn syntactic_classifications(
		&mut self,
		cx: EngineContext<'_>,
		path: &str,
		span: TextSpan,
	) -> Vec<ClassifiedSpan>;

	fn semantic_classifications(
		&mut self,
		cx: EngineContext<'_>,
		path: &str,
		span: TextSpan,
	) -> Vec<ClassifiedSpan>;

	fn syntactic_diagnostics(&mut self, cx: EngineContext<'_>, path: &str) -> Vec<Diagnostic>;

	fn semantic_diagnostics(&mut self, cx: EngineContext<'_>, path: &str) -> Vec<Diagnostic>;

	/// Releases cached state. Called once by the owning session.
	fn dispose(&mut self) {}
}

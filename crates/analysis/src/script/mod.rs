//! Built-in engine for a TypeScript-like subset.
//!
//! Files are parsed once per file version. The cross-file [`Program`] and the
//! per-file semantic results are rebuilt lazily whenever the project version
//! moves, since any edit can change what a name in another file resolves to.

mod display;
mod infer;
mod lexer;
mod parse;
mod program;

use std::sync::Arc;

use indexmap::IndexMap;
use quill_vfs::CompilerHost;
use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use self::parse::Parsed;
use self::program::{Checked, Program, classify_syntax};
use crate::engine::{EngineContext, LanguageEngine};
use crate::types::{ClassifiedSpan, Diagnostic, QuickInfo, TextChange, TextSpan};

/// Extensions whose files may contain JSX.
const JSX_EXTENSIONS: &[&str] = &[".tsx", ".jsx"];

/// The default [`LanguageEngine`].
#[derive(Debug, Default)]
pub struct ScriptEngine {
	parsed: FxHashMap<String, Arc<Parsed>>,
	/// Import specifier to library path.
	modules: IndexMap<String, String>,
	program: Option<(u64, Program)>,
	checked: FxHashMap<String, Arc<Checked>>,
}

impl ScriptEngine {
	pub fn new() -> Self {
		Self::default()
	}

	/// Parse of the current version of `path`, reusing the cached one when
	/// the version is unchanged.
	fn parsed(&mut self, host: &CompilerHost, path: &str) -> Option<Arc<Parsed>> {
		let file = host.source_file(path)?;
		if let Some(parsed) = self.parsed.get(path)
			&& parsed.version == file.version()
		{
			return Some(Arc::clone(parsed));
		}
		let jsx = JSX_EXTENSIONS.iter().any(|ext| path.ends_with(ext));
		let parsed = Arc::new(Parsed::parse(file.shared_text(), file.version(), jsx));
		trace!(
			path,
			version = file.version(),
			decls = parsed.decls.len(),
			refs = parsed.refs.len(),
			"script.parse"
		);
		self.parsed.insert(path.to_owned(), Arc::clone(&parsed));
		Some(parsed)
	}

	fn program(&mut self, cx: EngineContext<'_>) -> &Program {
		let program = match self.program.take() {
			Some((version, program)) if version == cx.project_version => program,
			_ => self.build_program(cx),
		};
		&self.program.insert((cx.project_version, program)).1
	}

	fn build_program(&mut self, cx: EngineContext<'_>) -> Program {
		let names: Vec<String> = cx.host.script_file_names().map(str::to_owned).collect();
		let files = names
			.iter()
			.filter_map(|path| Some((Arc::from(path.as_str()), self.parsed(cx.host, path)?)))
			.collect();
		debug!(
			project_version = cx.project_version,
			files = names.len(),
			"script.program rebuilt"
		);
		self.checked.clear();
		Program::new(files, &self.modules)
	}

	fn checked(&mut self, cx: EngineContext<'_>, path: &str) -> Option<Arc<Checked>> {
		self.program(cx);
		if let Some(checked) = self.checked.get(path) {
			return Some(Arc::clone(checked));
		}
		let (_, program) = self.program.as_ref()?;
		let checked = Arc::new(program.check(&Arc::from(path))?);
		trace!(
			path,
			project_version = cx.project_version,
			diagnostics = checked.diagnostics.len(),
			"script.check"
		);
		self.checked.insert(path.to_owned(), Arc::clone(&checked));
		Some(checked)
	}
}

impl LanguageEngine for ScriptEngine {
	fn library_added(&mut self, path: &str, module: Option<&str>) {
		if let Some(module) = module {
			self.modules.insert(module.to_owned(), path.to_owned());
		}
	}

	fn file_changed(&mut self, cx: EngineContext<'_>, path: &str, change: &TextChange) {
		trace!(
			path,
			start = change.span.start,
			removed = change.span.length,
			inserted = change.new_length,
			project_version = cx.project_version,
			"script.file_changed"
		);
		self.parsed.remove(path);
	}

	fn quick_info(&mut self, cx: EngineContext<'_>, path: &str, position: usize) -> Option<QuickInfo> {
		let program = self.program(cx);
		display::quick_info(program, &Arc::from(path), position)
	}

	fn syntactic_classifications(
		&mut self,
		cx: EngineContext<'_>,
		path: &str,
		span: TextSpan,
	) -> Vec<ClassifiedSpan> {
		let Some(parsed) = self.parsed(cx.host, path) else {
			return Vec::new();
		};
		classify_syntax(&parsed)
			.into_iter()
			.filter(|classified| span.intersects(&classified.span))
			.collect()
	}

	fn semantic_classifications(
		&mut self,
		cx: EngineContext<'_>,
		path: &str,
		span: TextSpan,
	) -> Vec<ClassifiedSpan> {
		self.checked(cx, path).map_or_else(Vec::new, |checked| {
			checked
				.classifications
				.iter()
				.filter(|classified| span.intersects(&classified.span))
				.copied()
				.collect()
		})
	}

	fn syntactic_diagnostics(&mut self, cx: EngineContext<'_>, path: &str) -> Vec<Diagnostic> {
		self.parsed(cx.host, path)
			.map_or_else(Vec::new, |parsed| parsed.diagnostics.clone())
	}

	fn semantic_diagnostics(&mut self, cx: EngineContext<'_>, path: &str) -> Vec<Diagnostic> {
		self.checked(cx, path)
			.map_or_else(Vec::new, |checked| checked.diagnostics.clone())
	}

	fn dispose(&mut self) {
		debug!(files = self.parsed.len(), "script.dispose");
		self.parsed.clear();
		self.modules.clear();
		self.program = None;
		self.checked.clear();
	}
}

#[cfg(test)]
mod tests;

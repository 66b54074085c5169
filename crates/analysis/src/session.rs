//! Incremental analysis session.
//!
//! A session owns a [`CompilerHost`], the project version counter and one
//! [`LanguageEngine`]. Every accepted edit or file creation bumps the project
//! version exactly once; the engine compares it against what it cached.

use quill_vfs::CompilerHost;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::engine::{EngineContext, LanguageEngine};
use crate::error::{AnalysisError, Result};
use crate::libs::Libraries;
use crate::script::ScriptEngine;
use crate::types::{ClassifiedSpan, Diagnostic, QuickInfo, TextChange, TextSpan};

/// Library selection for a session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
	/// Names of extra libraries to load after the core files, in order.
	pub extra_libs: Vec<String>,
}

/// Monotonic per-session counter. Never reused.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProjectVersion(u64);

impl ProjectVersion {
	pub fn get(self) -> u64 {
		self.0
	}

	fn bump(&mut self) -> u64 {
		self.0 += 1;
		self.0
	}
}

/// An analysis environment over in-memory files.
///
/// Teardown happens once, either through [`dispose`](Self::dispose) or on
/// drop. Queries after teardown fail with [`AnalysisError::Disposed`].
#[derive(Debug)]
pub struct AnalysisSession<E: LanguageEngine = ScriptEngine> {
	host: CompilerHost,
	project_version: ProjectVersion,
	engine: Option<E>,
}

impl AnalysisSession<ScriptEngine> {
	/// Creates a session backed by the built-in [`ScriptEngine`].
	pub fn new(config: &SessionConfig, libraries: &Libraries) -> Result<Self> {
		Self::with_engine(ScriptEngine::new(), config, libraries)
	}
}

impl<E: LanguageEngine> AnalysisSession<E> {
	/// Creates a session around `engine`, loading the core library files and
	/// then every extra library named in `config`.
	pub fn with_engine(mut engine: E, config: &SessionConfig, libraries: &Libraries) -> Result<Self> {
		let extras = libraries.resolve(&config.extra_libs)?;
		let mut host = CompilerHost::default();
		for file in libraries.core() {
			host.add_library(&file.path, file.text.clone());
			engine.library_added(&file.path, None);
		}
		for library in extras {
			for (i, file) in library.files.iter().enumerate() {
				host.add_library(&file.path, file.text.clone());
				let module = if i == 0 { library.module.as_deref() } else { None };
				engine.library_added(&file.path, module);
			}
		}
		debug!(
			libraries = host.library_file_names().count(),
			extra = config.extra_libs.len(),
			"session.new"
		);
		Ok(Self {
			host,
			project_version: ProjectVersion::default(),
			engine: Some(engine),
		})
	}

	pub fn host(&self) -> &CompilerHost {
		&self.host
	}

	pub fn project_version(&self) -> ProjectVersion {
		self.project_version
	}

	/// Current text of `path`.
	pub fn text(&self, path: &str) -> Option<&str> {
		self.host.read_file(path)
	}

	pub fn engine(&self) -> Option<&E> {
		self.engine.as_ref()
	}

	pub fn is_disposed(&self) -> bool {
		self.engine.is_none()
	}

	/// Registers `path` as a new root file at version 0.
	pub fn create_file(&mut self, path: &str, text: &str) -> Result<()> {
		let engine = self.engine.as_mut().ok_or(AnalysisError::Disposed)?;
		if self.host.file_exists(path) {
			return Err(AnalysisError::AlreadyExists(path.to_owned()));
		}
		self.host.add_root(path, text);
		let project_version = self.project_version.bump();
		debug!(path, project_version, len = text.len(), "session.create_file");
		let cx = EngineContext {
			host: &self.host,
			project_version,
		};
		engine.file_added(cx, path);
		Ok(())
	}

	/// Replaces the bytes `replaced` of the previous text of `path` with
	/// `new_text` and returns the new file version.
	///
	/// A span past the end of the text or splitting a UTF-8 sequence is
	/// rejected and nothing changes.
	pub fn update_file(&mut self, path: &str, new_text: &str, replaced: TextSpan) -> Result<u64> {
		let engine = self.engine.as_mut().ok_or(AnalysisError::Disposed)?;
		let prev = self
			.host
			.read_file(path)
			.ok_or_else(|| AnalysisError::FileNotFound(path.to_owned()))?;
		let start = replaced.start;
		let end = start.checked_add(replaced.length).unwrap_or(usize::MAX);
		if end > prev.len() || !prev.is_char_boundary(start) || !prev.is_char_boundary(end) {
			return Err(AnalysisError::SpanOutOfBounds {
				path: path.to_owned(),
				start,
				end,
				len: prev.len(),
			});
		}
		let mut text = String::with_capacity(prev.len() - replaced.length + new_text.len());
		text.push_str(&prev[..start]);
		text.push_str(new_text);
		text.push_str(&prev[end..]);

		let version = self.host.replace(path, text);
		let project_version = self.project_version.bump();
		debug!(
			path,
			version,
			project_version,
			start,
			removed = replaced.length,
			inserted = new_text.len(),
			"session.update_file"
		);
		let change = TextChange {
			span: replaced,
			new_length: new_text.len(),
		};
		let cx = EngineContext {
			host: &self.host,
			project_version,
		};
		engine.file_changed(cx, path, &change);
		Ok(version)
	}

	fn query(&mut self, path: &str) -> Result<(&mut E, EngineContext<'_>)> {
		let engine = self.engine.as_mut().ok_or(AnalysisError::Disposed)?;
		if !self.host.file_exists(path) {
			return Err(AnalysisError::FileNotFound(path.to_owned()));
		}
		let cx = EngineContext {
			host: &self.host,
			project_version: self.project_version.get(),
		};
		Ok((engine, cx))
	}

	pub fn quick_info(&mut self, path: &str, position: usize) -> Result<Option<QuickInfo>> {
		let (engine, cx) = self.query(path)?;
		Ok(engine.quick_info(cx, path, position))
	}

	pub fn syntactic_classifications(&mut self, path: &str, span: TextSpan) -> Result<Vec<ClassifiedSpan>> {
		let (engine, cx) = self.query(path)?;
		Ok(engine.syntactic_classifications(cx, path, span))
	}

	pub fn semantic_classifications(&mut self, path: &str, span: TextSpan) -> Result<Vec<ClassifiedSpan>> {
		let (engine, cx) = self.query(path)?;
		Ok(engine.semantic_classifications(cx, path, span))
	}

	pub fn syntactic_diagnostics(&mut self, path: &str) -> Result<Vec<Diagnostic>> {
		let (engine, cx) = self.query(path)?;
		Ok(engine.syntactic_diagnostics(cx, path))
	}

	pub fn semantic_diagnostics(&mut self, path: &str) -> Result<Vec<Diagnostic>> {
		let (engine, cx) = self.query(path)?;
		Ok(engine.semantic_diagnostics(cx, path))
	}

	/// Releases the engine. Later calls are no-ops.
	pub fn dispose(&mut self) {
		if let Some(mut engine) = self.engine.take() {
			engine.dispose();
			debug!(project_version = self.project_version.get(), "session.dispose");
		}
	}
}

impl<E: LanguageEngine> Drop for AnalysisSession<E> {
	fn drop(&mut self) {
		self.dispose();
	}
}

#[cfg(test)]
mod tests;

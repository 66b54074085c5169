//! Compiler host over a [`VirtualFileStore`].
//!
//! An analysis engine asks its environment a fixed set of questions: does a
//! file exist, what is its text, which file is the default library, what is the
//! current directory. [`CompilerHost`] answers them from the store and tracks
//! which files are analysis roots and which are ambient libraries.

use std::sync::Arc;

use indexmap::IndexSet;
use tracing::debug;

use crate::store::{ROOT_DIR, VirtualFile, VirtualFileStore};

/// Default "standard library" file every analysis sees.
pub const DEFAULT_LIB_FILE: &str = "/lib.core.d.ts";
/// Current directory reported to the engine.
pub const CURRENT_DIRECTORY: &str = "/";
/// Newline convention reported to the engine.
pub const NEW_LINE: &str = "\n";

/// Environment adapter handed to a language engine.
///
/// [`source_file`](Self::source_file) returns the same `Arc` for the same
/// `(path, version)`; a new object only appears after a write.
#[derive(Debug, Default, Clone)]
pub struct CompilerHost {
	store: VirtualFileStore,
	roots: IndexSet<String>,
	libraries: IndexSet<String>,
}

impl CompilerHost {
	/// Wraps an existing store. Nothing in it is a root or library yet.
	pub fn new(store: VirtualFileStore) -> Self {
		Self {
			store,
			roots: IndexSet::new(),
			libraries: IndexSet::new(),
		}
	}

	pub fn store(&self) -> &VirtualFileStore {
		&self.store
	}

	/// Registers `path` as an ambient library file and stores its text.
	pub fn add_library(&mut self, path: &str, text: impl Into<Arc<str>>) {
		self.store.write(path, text);
		self.libraries.insert(path.to_owned());
		debug!(path, "host.add_library");
	}

	/// Registers `path` as an analysis root and stores its text.
	///
	/// Returns the file version written.
	pub fn add_root(&mut self, path: &str, text: impl Into<Arc<str>>) -> u64 {
		let version = self.store.write(path, text);
		self.roots.insert(path.to_owned());
		version
	}

	/// Replaces the text of an existing file and returns its new version.
	pub fn replace(&mut self, path: &str, text: impl Into<Arc<str>>) -> u64 {
		self.store.write(path, text)
	}

	pub fn file_exists(&self, path: &str) -> bool {
		self.store.exists(path)
	}

	/// Text of `path`, or `None` so the engine can apply its own fallback.
	pub fn read_file(&self, path: &str) -> Option<&str> {
		self.store.read(path)
	}

	/// Current snapshot of `path`.
	pub fn source_file(&self, path: &str) -> Option<Arc<VirtualFile>> {
		self.store.file(path).cloned()
	}

	/// Paths are already canonical; this is the identity.
	pub fn canonical_file_name<'a>(&self, path: &'a str) -> &'a str {
		path
	}

	pub fn default_lib_file_name(&self) -> &'static str {
		DEFAULT_LIB_FILE
	}

	pub fn current_directory(&self) -> &'static str {
		CURRENT_DIRECTORY
	}

	pub fn new_line(&self) -> &'static str {
		NEW_LINE
	}

	pub fn use_case_sensitive_file_names(&self) -> bool {
		true
	}

	/// Flat directory listing: every path for the root, nothing elsewhere.
	pub fn read_directory(&self, dir: &str) -> Vec<&str> {
		self.store.list(dir)
	}

	/// No real directory tree is modeled.
	pub fn directories(&self, _dir: &str) -> Vec<&str> {
		Vec::new()
	}

	/// Engine-side writes (emit output) are discarded.
	pub fn write_file(&self, path: &str, _text: &str) {
		debug!(path, "host.write_file ignored");
	}

	/// Root files first, then library files, each in registration order.
	pub fn script_file_names(&self) -> impl Iterator<Item = &str> {
		self.roots.iter().chain(self.libraries.iter()).map(String::as_str)
	}

	pub fn root_file_names(&self) -> impl Iterator<Item = &str> {
		self.roots.iter().map(String::as_str)
	}

	pub fn library_file_names(&self) -> impl Iterator<Item = &str> {
		self.libraries.iter().map(String::as_str)
	}

	pub fn is_root(&self, path: &str) -> bool {
		self.roots.contains(path)
	}

	pub fn is_library(&self, path: &str) -> bool {
		self.libraries.contains(path)
	}

	/// Version of the current snapshot of `path`.
	pub fn script_version(&self, path: &str) -> Option<u64> {
		self.store.file(path).map(|file| file.version())
	}

	/// True if the store holds anything under the root.
	pub fn root_exists(&self) -> bool {
		self.store.directory_exists(ROOT_DIR)
	}
}

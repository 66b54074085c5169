//! Flat in-memory file store.

use std::sync::Arc;

use indexmap::IndexMap;
use tracing::trace;

/// The only directory the store models.
pub const ROOT_DIR: &str = "/";

/// One file held by a [`VirtualFileStore`].
///
/// Records are immutable; a write replaces the record with a new one carrying
/// the next version. Holding an `Arc<VirtualFile>` therefore pins a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualFile {
	path: Arc<str>,
	text: Arc<str>,
	version: u64,
}

impl VirtualFile {
	fn new(path: &str, text: Arc<str>, version: u64) -> Self {
		Self {
			path: path.into(),
			text,
			version,
		}
	}

	/// Path of the file; unique within its store.
	pub fn path(&self) -> &str {
		&self.path
	}

	/// Full text of this snapshot.
	pub fn text(&self) -> &str {
		&self.text
	}

	/// Shared handle to the text, for callers that outlive the borrow.
	pub fn shared_text(&self) -> Arc<str> {
		Arc::clone(&self.text)
	}

	/// Number of writes since the file was created (0 on creation).
	pub fn version(&self) -> u64 {
		self.version
	}

	/// Length of the text in bytes.
	pub fn len(&self) -> usize {
		self.text.len()
	}

	pub fn is_empty(&self) -> bool {
		self.text.is_empty()
	}
}

/// In-memory mapping from path to file text.
///
/// The namespace is flat: [`list`](Self::list) only answers for [`ROOT_DIR`]
/// and paths are compared verbatim (case-sensitive, no normalization). There
/// is no delete operation; files live as long as the store.
#[derive(Debug, Default, Clone)]
pub struct VirtualFileStore {
	files: IndexMap<String, Arc<VirtualFile>>,
}

impl VirtualFileStore {
	/// Creates an empty store.
	pub fn new() -> Self {
		Self::default()
	}

	/// Creates a store seeded with `files`, each at version 0.
	pub fn from_files<P, T>(files: impl IntoIterator<Item = (P, T)>) -> Self
	where
		P: Into<String>,
		T: Into<Arc<str>>,
	{
		let mut store = Self::new();
		for (path, text) in files {
			store.write(path, text);
		}
		store
	}

	pub fn exists(&self, path: &str) -> bool {
		self.files.contains_key(path)
	}

	/// Returns the current text of `path`, or `None` if it was never written.
	pub fn read(&self, path: &str) -> Option<&str> {
		self.files.get(path).map(|file| file.text())
	}

	/// Returns the current snapshot of `path`.
	pub fn file(&self, path: &str) -> Option<&Arc<VirtualFile>> {
		self.files.get(path)
	}

	/// Writes `text` to `path`, creating the file if needed.
	///
	/// Returns the version of the new snapshot: 0 for a new file, the previous
	/// version plus one otherwise.
	pub fn write(&mut self, path: impl Into<String>, text: impl Into<Arc<str>>) -> u64 {
		let path = path.into();
		let text = text.into();
		let version = self.files.get(&path).map_or(0, |prev| prev.version + 1);
		trace!(path = %path, version, bytes = text.len(), "vfs.write");
		let file = Arc::new(VirtualFile::new(&path, text, version));
		self.files.insert(path, file);
		version
	}

	/// Lists every known path when `dir` is the root; nothing otherwise.
	pub fn list(&self, dir: &str) -> Vec<&str> {
		if dir != ROOT_DIR {
			return Vec::new();
		}
		self.files.keys().map(String::as_str).collect()
	}

	/// True when any stored path lives under `dir`.
	pub fn directory_exists(&self, dir: &str) -> bool {
		self.files.keys().any(|path| path.starts_with(dir))
	}

	/// Iterates paths in insertion order.
	pub fn paths(&self) -> impl Iterator<Item = &str> {
		self.files.keys().map(String::as_str)
	}

	pub fn len(&self) -> usize {
		self.files.len()
	}

	pub fn is_empty(&self) -> bool {
		self.files.is_empty()
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;

	#[test]
	fn test_write_creates_then_bumps_version() {
		let mut store = VirtualFileStore::new();
		assert!(!store.exists("/a.ts"));

		assert_eq!(store.write("/a.ts", "let a = 1;"), 0);
		assert_eq!(store.write("/a.ts", "let a = 2;"), 1);

		assert!(store.exists("/a.ts"));
		assert_eq!(store.read("/a.ts"), Some("let a = 2;"));
		assert_eq!(store.file("/a.ts").map(|f| f.version()), Some(1));
	}

	#[test]
	fn test_read_missing_is_none() {
		let store = VirtualFileStore::new();
		assert_eq!(store.read("/missing.ts"), None);
	}

	#[test]
	fn test_list_only_answers_for_root() {
		let store = VirtualFileStore::from_files([("/a.ts", "a"), ("/lib/b.d.ts", "b")]);

		assert_eq!(store.list("/"), vec!["/a.ts", "/lib/b.d.ts"]);
		assert!(store.list("/lib").is_empty());
		assert!(store.directory_exists("/lib"));
		assert!(!store.directory_exists("/node_modules"));
	}

	#[test]
	fn test_snapshot_survives_write() {
		let mut store = VirtualFileStore::from_files([("/a.ts", "old")]);
		let snapshot = Arc::clone(store.file("/a.ts").unwrap());

		store.write("/a.ts", "new");

		assert_eq!(snapshot.text(), "old");
		assert_eq!(snapshot.version(), 0);
		assert_eq!(store.read("/a.ts"), Some("new"));
	}
}

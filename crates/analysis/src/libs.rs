//! Library declaration files available to a session.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::error::{AnalysisError, Result};

/// One declaration file.
#[derive(Debug, Clone)]
pub struct LibraryFile {
	pub path: String,
	pub text: Arc<str>,
}

impl LibraryFile {
	pub fn new(path: impl Into<String>, text: impl Into<Arc<str>>) -> Self {
		Self {
			path: path.into(),
			text: text.into(),
		}
	}
}

/// An opt-in library, selected by name.
#[derive(Debug, Clone)]
pub struct ExtraLibrary {
	pub name: String,
	/// Import specifier exposing the library. When set, the first file is
	/// reachable only through `import ... from "<module>"`; the remaining
	/// files stay ambient.
	pub module: Option<String>,
	pub files: Vec<LibraryFile>,
}

/// The core library files every session loads, plus named extras.
#[derive(Debug, Clone, Default)]
pub struct Libraries {
	core: Vec<LibraryFile>,
	extras: IndexMap<String, ExtraLibrary>,
}

impl Libraries {
	/// A library set with only the given core files.
	pub fn new(core: Vec<LibraryFile>) -> Self {
		Self {
			core,
			extras: IndexMap::new(),
		}
	}

	/// The declaration files shipped with the crate: the core library, `dom`
	/// and `react`.
	pub fn bundled() -> Self {
		let mut libraries = Self::new(vec![LibraryFile::new(
			quill_vfs::DEFAULT_LIB_FILE,
			include_str!("../lib/lib.core.d.ts"),
		)]);
		libraries.register(ExtraLibrary {
			name: "dom".into(),
			module: None,
			files: vec![LibraryFile::new("/lib.dom.d.ts", include_str!("../lib/lib.dom.d.ts"))],
		});
		libraries.register(ExtraLibrary {
			name: "react".into(),
			module: Some("react".into()),
			files: vec![
				LibraryFile::new(
					"/node_modules/@types/react/index.d.ts",
					include_str!("../lib/react/index.d.ts"),
				),
				LibraryFile::new(
					"/node_modules/@types/react/global.d.ts",
					include_str!("../lib/react/global.d.ts"),
				),
			],
		});
		libraries
	}

	/// Adds or replaces an extra library.
	pub fn register(&mut self, library: ExtraLibrary) {
		self.extras.insert(library.name.clone(), library);
	}

	pub fn core(&self) -> &[LibraryFile] {
		&self.core
	}

	pub fn get(&self, name: &str) -> Option<&ExtraLibrary> {
		self.extras.get(name)
	}

	pub fn names(&self) -> impl Iterator<Item = &str> {
		self.extras.keys().map(String::as_str)
	}

	/// Looks up every name in order; the first unknown one is an error.
	pub fn resolve<'a>(&'a self, names: &[String]) -> Result<Vec<&'a ExtraLibrary>> {
		names
			.iter()
			.map(|name| self.get(name).ok_or_else(|| AnalysisError::UnknownLibrary(name.clone())))
			.collect()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_bundled_libraries() {
		let libraries = Libraries::bundled();
		assert_eq!(libraries.core()[0].path, quill_vfs::DEFAULT_LIB_FILE);
		assert_eq!(libraries.names().collect::<Vec<_>>(), vec!["dom", "react"]);
		let react = libraries.get("react").unwrap();
		assert_eq!(react.module.as_deref(), Some("react"));
		assert!(react.files[0].text.contains("export default React"));
	}

	#[test]
	fn test_resolve_rejects_unknown_names() {
		let libraries = Libraries::bundled();
		let resolved = libraries.resolve(&["react".into(), "dom".into()]).unwrap();
		assert_eq!(resolved[0].name, "react");
		let err = libraries.resolve(&["dom".into(), "vue".into()]).unwrap_err();
		assert!(matches!(err, AnalysisError::UnknownLibrary(name) if name == "vue"));
	}
}

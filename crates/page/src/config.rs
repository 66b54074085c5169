//! Page configuration handed over by the site build.

use std::time::Duration;

use indexmap::IndexMap;
use quill_analysis::SessionConfig;
use serde::{Deserialize, Serialize};

use crate::error::{PageError, Result};

const DEFAULT_DEBOUNCE_MS: u64 = 500;

/// Code blocks of one page and the analyzed files they form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PageConfig {
	/// Blocks by id, in page order.
	pub code_blocks: IndexMap<String, CodeBlock>,
	/// Analyzed files by path.
	pub source_files: IndexMap<String, SourceFile>,
	/// Extra libraries loaded into the analysis session, e.g. `"dom"`.
	pub lib: Vec<String>,
	/// Quiet period before semantic tokens are recomputed after an edit.
	pub debounce_ms: u64,
}

impl Default for PageConfig {
	fn default() -> Self {
		Self {
			code_blocks: IndexMap::new(),
			source_files: IndexMap::new(),
			lib: Vec::new(),
			debounce_ms: DEFAULT_DEBOUNCE_MS,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeBlock {
	pub text: String,
	/// Analyzed file this block is a fragment of.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub file_name: Option<String>,
	/// Grammar tag, e.g. `"ts"`.
	pub lang: String,
}

/// A file assembled from an invisible preamble and visible fragments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceFile {
	pub preamble: String,
	/// Block ids in file order.
	pub fragments: Vec<String>,
}

impl PageConfig {
	/// Parses and validates a configuration.
	pub fn from_json(json: &str) -> Result<Self> {
		let config: Self = serde_json::from_str(json)?;
		config.validate()?;
		Ok(config)
	}

	/// Checks that blocks and source files agree on which block belongs where.
	pub fn validate(&self) -> Result<()> {
		for (file, source) in &self.source_files {
			for id in &source.fragments {
				let block = self
					.code_blocks
					.get(id)
					.ok_or_else(|| PageError::UnknownBlock(id.clone()))?;
				if block.file_name.as_deref() != Some(file.as_str()) {
					return Err(PageError::FragmentMismatch {
						file: file.clone(),
						block: id.clone(),
					});
				}
			}
		}
		for (id, block) in &self.code_blocks {
			let Some(file) = &block.file_name else { continue };
			let source = self.source_files.get(file).ok_or_else(|| PageError::UnknownSourceFile {
				block: id.clone(),
				file: file.clone(),
			})?;
			if !source.fragments.contains(id) {
				return Err(PageError::FragmentMismatch {
					file: file.clone(),
					block: id.clone(),
				});
			}
		}
		Ok(())
	}

	pub fn session_config(&self) -> SessionConfig {
		SessionConfig {
			extra_libs: self.lib.clone(),
		}
	}

	pub fn debounce(&self) -> Duration {
		Duration::from_millis(self.debounce_ms)
	}

	/// Full text of `file`: its preamble followed by its fragments joined
	/// with newlines.
	pub fn full_text(&self, file: &str) -> Option<String> {
		let source = self.source_files.get(file)?;
		let fragments: Vec<&str> = source
			.fragments
			.iter()
			.filter_map(|id| self.code_blocks.get(id))
			.map(|block| block.text.as_str())
			.collect();
		Some(format!("{}{}", source.preamble, fragments.join("\n")))
	}
}

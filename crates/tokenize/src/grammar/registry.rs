use std::sync::Arc;

use rustc_hash::FxHashMap;
use tracing::debug;

use super::Grammar;
use crate::error::{Result, TokenizeError};

const BUILTIN: &[&str] = &[
	include_str!("../../grammars/typescript.json"),
	include_str!("../../grammars/markdown.json"),
	include_str!("../../grammars/json.json"),
	include_str!("../../grammars/shell.json"),
	include_str!("../../grammars/yaml.json"),
];

/// Grammars by language tag.
///
/// Tags are matched case-insensitively against each grammar's name and
/// aliases. A later registration wins for a tag both grammars claim.
#[derive(Debug, Default, Clone)]
pub struct GrammarRegistry {
	grammars: Vec<Arc<Grammar>>,
	by_tag: FxHashMap<String, usize>,
}

impl GrammarRegistry {
	/// An empty registry.
	pub fn new() -> Self {
		Self::default()
	}

	/// A registry holding the bundled grammars: `typescript` (`ts`, `tsx`),
	/// `markdown` (`md`), `json`, `shell` (`sh`, `bash`) and `yaml`.
	pub fn with_builtin() -> Result<Self> {
		let mut registry = Self::new();
		for json in BUILTIN {
			registry.register_json(json)?;
		}
		Ok(registry)
	}

	pub fn register_json(&mut self, json: &str) -> Result<Arc<Grammar>> {
		Ok(self.register(Grammar::from_json(json)?))
	}

	pub fn register(&mut self, grammar: Grammar) -> Arc<Grammar> {
		let grammar = Arc::new(grammar);
		let index = self.grammars.len();
		let tags = std::iter::once(grammar.name()).chain(grammar.aliases().iter().map(String::as_str));
		for tag in tags {
			self.by_tag.insert(tag.to_ascii_lowercase(), index);
		}
		debug!(grammar = grammar.name(), scope = grammar.scope_name(), "grammar.register");
		self.grammars.push(Arc::clone(&grammar));
		grammar
	}

	pub fn get(&self, tag: &str) -> Result<Arc<Grammar>> {
		self.by_tag
			.get(&tag.to_ascii_lowercase())
			.map(|&index| Arc::clone(&self.grammars[index]))
			.ok_or_else(|| TokenizeError::UnknownLanguage(tag.to_owned()))
	}

	pub fn contains(&self, tag: &str) -> bool {
		self.by_tag.contains_key(&tag.to_ascii_lowercase())
	}

	pub fn tags(&self) -> impl Iterator<Item = &str> {
		self.by_tag.keys().map(String::as_str)
	}
}

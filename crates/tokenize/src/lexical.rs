//! Grammar-driven tokenizer with a per-line cache.
//!
//! A line's tokens depend on its text and on the grammar state left by the
//! line above, so the cache is keyed by both. A document pass moves every hit
//! from the previous generation into a fresh one; whatever the pass did not
//! touch is dropped when it finishes.

use std::mem;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::grammar::{Grammar, GrammarState};
use crate::token::{LineTokens, Token, lines};
use crate::tokenizer::{Capabilities, Tokenizer};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct LineKey {
	text: String,
	state: GrammarState,
}

#[derive(Debug, Clone)]
struct CachedLine {
	tokens: Arc<LineTokens>,
	next: GrammarState,
}

/// Tokenized lines keyed by text and incoming state, in two generations.
#[derive(Debug, Default)]
pub struct LineCache {
	old: FxHashMap<LineKey, CachedLine>,
	fresh: FxHashMap<LineKey, CachedLine>,
}

impl LineCache {
	pub fn new() -> Self {
		Self::default()
	}

	/// Looks up a line, promoting an old entry into the current generation.
	fn get(&mut self, key: &LineKey) -> Option<CachedLine> {
		if let Some(hit) = self.fresh.get(key) {
			return Some(hit.clone());
		}
		let hit = self.old.remove(key)?;
		self.fresh.insert(key.clone(), hit.clone());
		Some(hit)
	}

	fn insert(&mut self, key: LineKey, line: CachedLine) {
		self.fresh.insert(key, line);
	}

	/// Ends a pass: entries it did not touch are evicted. Returns how many.
	fn sync(&mut self) -> usize {
		let evicted = self.old.len();
		self.old = mem::take(&mut self.fresh);
		evicted
	}

	/// Entries retained by the last pass.
	pub fn len(&self) -> usize {
		self.old.len() + self.fresh.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn clear(&mut self) {
		self.old.clear();
		self.fresh.clear();
	}
}

/// Tokenizes documents with one grammar.
#[derive(Debug)]
pub struct LexicalTokenizer {
	grammar: Arc<Grammar>,
	cache: LineCache,
}

impl LexicalTokenizer {
	pub fn new(grammar: Arc<Grammar>) -> Self {
		Self {
			grammar,
			cache: LineCache::new(),
		}
	}

	pub fn grammar(&self) -> &Arc<Grammar> {
		&self.grammar
	}

	pub fn cache(&self) -> &LineCache {
		&self.cache
	}

	/// Tokenizes one line from `state`, bypassing the cache. Returns the
	/// line's tokens and the state for the next line.
	pub fn tokenize_line_from(&self, line: &str, state: &GrammarState) -> (LineTokens, GrammarState) {
		let (ranges, next) = self.grammar.tokenize_line(line, state);
		let tokens = ranges
			.into_iter()
			.map(|range| Token::Lexical {
				start: range.start,
				end: range.end,
				scopes: range.scopes,
			})
			.collect();
		(tokens, next)
	}

	/// Tokenizes every line of `text`, carrying grammar state forward.
	///
	/// A line whose text and incoming state match a cached entry returns the
	/// cached `Arc` unchanged.
	pub fn tokenize_document(&mut self, text: &str) -> Vec<Arc<LineTokens>> {
		let mut state = GrammarState::initial();
		let mut out = Vec::new();
		let mut cached = 0usize;
		for line in lines(text) {
			let key = LineKey {
				text: line.to_owned(),
				state,
			};
			let entry = match self.cache.get(&key) {
				Some(hit) => {
					cached += 1;
					hit
				}
				None => {
					let (tokens, next) = self.tokenize_line_from(line, &key.state);
					let entry = CachedLine {
						tokens: Arc::new(tokens),
						next,
					};
					self.cache.insert(key, entry.clone());
					entry
				}
			};
			out.push(entry.tokens);
			state = entry.next;
		}
		let evicted = self.cache.sync();
		debug!(
			grammar = self.grammar.name(),
			lines = out.len(),
			cached,
			evicted,
			"lexical.document"
		);
		out
	}
}

impl Tokenizer for LexicalTokenizer {
	fn capabilities(&self) -> Capabilities {
		Capabilities::DOCUMENT | Capabilities::LINE | Capabilities::DISPOSE
	}

	fn tokenize_document(&mut self, text: &str) -> Option<Vec<Arc<LineTokens>>> {
		Some(LexicalTokenizer::tokenize_document(self, text))
	}

	fn tokenize_line(&mut self, text: &str, line: usize) -> Option<Arc<LineTokens>> {
		LexicalTokenizer::tokenize_document(self, text).into_iter().nth(line)
	}

	fn dispose(&mut self) {
		self.cache.clear();
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;
	use crate::compose::ComposedTokenizer;
	use crate::grammar::GrammarRegistry;

	fn tokenizer() -> LexicalTokenizer {
		LexicalTokenizer::new(GrammarRegistry::with_builtin().unwrap().get("ts").unwrap())
	}

	#[test]
	fn test_document_is_idempotent() {
		let mut lexical = tokenizer();
		let text = "let a = 1;\n/* x\ny */ const b = `t`;";
		let first = lexical.tokenize_document(text);
		let second = lexical.tokenize_document(text);
		assert_eq!(first, second);
		assert_eq!(first.len(), 3);
		for (a, b) in first.iter().zip(&second) {
			assert!(Arc::ptr_eq(a, b));
		}
	}

	#[test]
	fn test_unchanged_lines_reuse_cache() {
		let mut lexical = tokenizer();
		let before = lexical.tokenize_document("let a = 1;\nlet b = 2;\nlet c = 3;");
		let after = lexical.tokenize_document("let a = 1;\nlet b = 22;\nlet c = 3;");
		assert!(Arc::ptr_eq(&before[0], &after[0]));
		assert!(!Arc::ptr_eq(&before[1], &after[1]));
		assert!(Arc::ptr_eq(&before[2], &after[2]));
		assert_eq!(lexical.cache().len(), 3);
	}

	#[test]
	fn test_state_change_retokenizes_downstream() {
		let mut lexical = tokenizer();
		let before = lexical.tokenize_document("let a;\nconst b = 1;\nlet c;");
		let after = lexical.tokenize_document("let a; /*\nconst b = 1;\nlet c;");
		assert!(!Arc::ptr_eq(&before[1], &after[1]));
		assert!(!Arc::ptr_eq(&before[2], &after[2]));
		let Token::Lexical { scopes, .. } = &after[1].tokens[0] else {
			panic!("expected a lexical token");
		};
		assert_eq!(scopes, &vec!["source.ts".to_owned(), "comment.block.ts".to_owned()]);
		assert_eq!(after[1].tokens.len(), 1);

		let restored = lexical.tokenize_document("let a;\nconst b = 1;\nlet c;");
		assert_eq!(restored[1], before[1]);
		assert!(!Arc::ptr_eq(&restored[1], &before[1]));
	}

	#[test]
	fn test_untouched_entries_are_evicted() {
		let mut lexical = tokenizer();
		lexical.tokenize_document("a\nb\nc\nd");
		assert_eq!(lexical.cache().len(), 4);
		lexical.tokenize_document("a\nb");
		assert_eq!(lexical.cache().len(), 2);
	}

	#[test]
	fn test_dispose_clears_cache() {
		let mut lexical = tokenizer();
		assert!(lexical.capabilities().contains(Capabilities::DISPOSE));
		lexical.tokenize_document("let a = 1;\nlet b = 2;");
		assert_eq!(lexical.cache().len(), 2);
		Tokenizer::dispose(&mut lexical);
		assert!(lexical.cache().is_empty());

		let composed = ComposedTokenizer::new(vec![Box::new(tokenizer())]);
		assert!(composed.capabilities().contains(Capabilities::DISPOSE));
	}

	#[test]
	fn test_repeated_lines_share_tokens() {
		let mut lexical = tokenizer();
		let lines = lexical.tokenize_document("x;\nx;\nx;");
		assert!(Arc::ptr_eq(&lines[0], &lines[2]));
		assert_eq!(lexical.cache().len(), 1);
	}

	#[test]
	fn test_hash_folds_scopes_and_offsets() {
		let lexical = tokenizer();
		let (line, _) = lexical.tokenize_line_from("x;", &GrammarState::initial());
		assert_eq!(
			line.hash,
			":source.ts variable.other.readwrite.ts.0.1:source.ts punctuation.separator.ts.1.2"
		);
	}

	#[test]
	fn test_line_query_uses_document_state() {
		let mut lexical = tokenizer();
		let line = Tokenizer::tokenize_line(&mut lexical, "`a\nb`", 1).unwrap();
		let Token::Lexical { scopes, .. } = &line.tokens[0] else {
			panic!("expected a lexical token");
		};
		assert_eq!(scopes[1], "string.template.ts");
		assert!(Tokenizer::tokenize_line(&mut lexical, "a", 3).is_none());
	}
}

//! Layers several tokenizers over the same document.

use std::sync::Arc;

use tracing::trace;

use crate::token::LineTokens;
use crate::tokenizer::{Capabilities, Listener, Tokenizer};

const QUERY: Capabilities = Capabilities::DOCUMENT.union(Capabilities::LINE);

/// Concatenates the per-line output of its parts in the order given.
///
/// Document and line queries are offered only when every part offers them.
/// Subscriptions and disposal reach every part that supports them.
pub struct ComposedTokenizer {
	parts: Vec<Box<dyn Tokenizer>>,
	capabilities: Capabilities,
}

impl ComposedTokenizer {
	pub fn new(parts: Vec<Box<dyn Tokenizer>>) -> Self {
		let shared = parts
			.iter()
			.fold(QUERY, |shared, part| shared & part.capabilities());
		let forwarded = parts
			.iter()
			.fold(Capabilities::empty(), |any, part| any | (part.capabilities() - QUERY));
		Self {
			capabilities: shared | forwarded,
			parts,
		}
	}

	pub fn len(&self) -> usize {
		self.parts.len()
	}

	pub fn is_empty(&self) -> bool {
		self.parts.is_empty()
	}
}

impl std::fmt::Debug for ComposedTokenizer {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ComposedTokenizer")
			.field("parts", &self.parts.len())
			.field("capabilities", &self.capabilities)
			.finish()
	}
}

/// Joins one line of every part. A part without the line contributes nothing
/// but still takes its slot in the hash.
fn join(lines: &[Option<&Arc<LineTokens>>]) -> Arc<LineTokens> {
	if let [Some(only)] = lines {
		return Arc::clone(only);
	}
	let mut joined = LineTokens::new();
	for (index, line) in lines.iter().enumerate() {
		if index > 0 {
			joined.hash.push('|');
		}
		if let Some(line) = line {
			joined.hash.push_str(&line.hash);
			joined.tokens.extend(line.tokens.iter().cloned());
		}
	}
	Arc::new(joined)
}

impl Tokenizer for ComposedTokenizer {
	fn capabilities(&self) -> Capabilities {
		self.capabilities
	}

	fn tokenize_document(&mut self, text: &str) -> Option<Vec<Arc<LineTokens>>> {
		if !self.capabilities.contains(Capabilities::DOCUMENT) {
			return None;
		}
		let documents = self
			.parts
			.iter_mut()
			.map(|part| part.tokenize_document(text))
			.collect::<Option<Vec<_>>>()?;
		let count = documents.iter().map(Vec::len).max().unwrap_or(0);
		trace!(parts = documents.len(), lines = count, "compose.document");
		let lines = (0..count)
			.map(|index| {
				let row: Vec<_> = documents.iter().map(|document| document.get(index)).collect();
				join(&row)
			})
			.collect();
		Some(lines)
	}

	fn tokenize_line(&mut self, text: &str, line: usize) -> Option<Arc<LineTokens>> {
		if !self.capabilities.contains(Capabilities::LINE) {
			return None;
		}
		let lines: Vec<_> = self.parts.iter_mut().map(|part| part.tokenize_line(text, line)).collect();
		if lines.iter().all(Option::is_none) {
			return None;
		}
		let row: Vec<_> = lines.iter().map(Option::as_ref).collect();
		Some(join(&row))
	}

	fn subscribe(&mut self, listener: Listener) {
		for part in &mut self.parts {
			if part.capabilities().contains(Capabilities::SUBSCRIBE) {
				part.subscribe(Arc::clone(&listener));
			}
		}
	}

	fn dispose(&mut self) {
		for part in &mut self.parts {
			if part.capabilities().contains(Capabilities::DISPOSE) {
				part.dispose();
			}
		}
	}
}

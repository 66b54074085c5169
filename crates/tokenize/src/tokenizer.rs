//! The tokenizer seam shared by lexical, semantic, composed and static
//! token sources.

use std::sync::Arc;

use bitflags::bitflags;

use crate::token::LineTokens;

bitflags! {
	/// What a [`Tokenizer`] supports.
	#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
	pub struct Capabilities: u8 {
		/// [`Tokenizer::tokenize_document`] returns results.
		const DOCUMENT = 1 << 0;
		/// [`Tokenizer::tokenize_line`] returns results.
		const LINE = 1 << 1;
		/// Results can change without new input; listeners are told when.
		const SUBSCRIBE = 1 << 2;
		/// Holds resources released by [`Tokenizer::dispose`].
		const DISPOSE = 1 << 3;
	}
}

/// Called when a tokenizer has new results for the text it last saw.
pub type Listener = Arc<dyn Fn() + Send + Sync>;

/// A source of per-line tokens for a document.
///
/// Methods a tokenizer does not declare in [`Tokenizer::capabilities`] keep
/// their default bodies.
pub trait Tokenizer: Send {
	fn capabilities(&self) -> Capabilities;

	/// Tokens for every line of `text`, split with [`crate::lines`].
	fn tokenize_document(&mut self, _text: &str) -> Option<Vec<Arc<LineTokens>>> {
		None
	}

	/// Tokens for line `line` of `text`.
	fn tokenize_line(&mut self, _text: &str, _line: usize) -> Option<Arc<LineTokens>> {
		None
	}

	fn subscribe(&mut self, _listener: Listener) {}

	fn dispose(&mut self) {}
}

impl<T: Tokenizer + ?Sized> Tokenizer for Box<T> {
	fn capabilities(&self) -> Capabilities {
		(**self).capabilities()
	}

	fn tokenize_document(&mut self, text: &str) -> Option<Vec<Arc<LineTokens>>> {
		(**self).tokenize_document(text)
	}

	fn tokenize_line(&mut self, text: &str, line: usize) -> Option<Arc<LineTokens>> {
		(**self).tokenize_line(text, line)
	}

	fn subscribe(&mut self, listener: Listener) {
		(**self).subscribe(listener);
	}

	fn dispose(&mut self) {
		(**self).dispose();
	}
}

/// Pre-rendered tokens, returned regardless of the text asked about.
#[derive(Debug, Clone, Default)]
pub struct StaticTokenizer {
	lines: Vec<Arc<LineTokens>>,
}

impl StaticTokenizer {
	pub fn new(lines: Vec<Arc<LineTokens>>) -> Self {
		Self { lines }
	}

	pub fn lines(&self) -> &[Arc<LineTokens>] {
		&self.lines
	}
}

impl FromIterator<LineTokens> for StaticTokenizer {
	fn from_iter<I: IntoIterator<Item = LineTokens>>(iter: I) -> Self {
		Self::new(iter.into_iter().map(Arc::new).collect())
	}
}

impl Tokenizer for StaticTokenizer {
	fn capabilities(&self) -> Capabilities {
		Capabilities::DOCUMENT | Capabilities::LINE
	}

	fn tokenize_document(&mut self, _text: &str) -> Option<Vec<Arc<LineTokens>>> {
		Some(self.lines.clone())
	}

	fn tokenize_line(&mut self, _text: &str, line: usize) -> Option<Arc<LineTokens>> {
		self.lines.get(line).cloned()
	}
}

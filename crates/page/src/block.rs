//! Tokenizer of one code block across its static and interactive lives.

use std::sync::Arc;

use quill_tokenize::{Capabilities, ComposedTokenizer, LineTokens, Listener, StaticTokenizer, Tokenizer};
use serde::Serialize;
use tracing::{debug, warn};

/// Lifecycle stage of a [`BlockTokenizer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Stage {
	/// Pre-rendered tokens only.
	Static,
	/// Analysis is ready; the interactive tokenizer is built on next use.
	Loading,
	/// Lexical and semantic tokens computed from the current text.
	Interactive,
}

enum Inner {
	Static,
	Loading,
	Interactive(ComposedTokenizer),
}

/// Tokens for one block. Starts from pre-rendered lines and keeps them as
/// the fallback for every pass the interactive tokenizer cannot answer.
pub struct BlockTokenizer {
	id: String,
	text: String,
	fallback: StaticTokenizer,
	inner: Inner,
	pending: Vec<Listener>,
	disposed: bool,
}

impl std::fmt::Debug for BlockTokenizer {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("BlockTokenizer")
			.field("id", &self.id)
			.field("stage", &self.stage())
			.field("lines", &self.fallback.lines().len())
			.finish_non_exhaustive()
	}
}

impl BlockTokenizer {
	pub fn new(id: impl Into<String>, text: impl Into<String>, fallback: Vec<Arc<LineTokens>>) -> Self {
		Self {
			id: id.into(),
			text: text.into(),
			fallback: StaticTokenizer::new(fallback),
			inner: Inner::Static,
			pending: Vec::new(),
			disposed: false,
		}
	}

	pub fn id(&self) -> &str {
		&self.id
	}

	pub fn text(&self) -> &str {
		&self.text
	}

	pub fn set_text(&mut self, text: impl Into<String>) {
		self.text = text.into();
	}

	pub fn stage(&self) -> Stage {
		match self.inner {
			Inner::Static => Stage::Static,
			Inner::Loading => Stage::Loading,
			Inner::Interactive(_) => Stage::Interactive,
		}
	}

	pub fn fallback(&self) -> &[Arc<LineTokens>] {
		self.fallback.lines()
	}

	/// Moves a static block to [`Stage::Loading`]. Other stages are kept.
	pub fn mark_loading(&mut self) {
		if !self.disposed && matches!(self.inner, Inner::Static) {
			self.inner = Inner::Loading;
		}
	}

	/// Switches to `tokenizer`, handing it every listener registered so far.
	pub fn activate(&mut self, mut tokenizer: ComposedTokenizer) {
		if self.disposed {
			tokenizer.dispose();
			return;
		}
		if let Inner::Interactive(previous) = &mut self.inner {
			previous.dispose();
		}
		if tokenizer.capabilities().contains(Capabilities::SUBSCRIBE) {
			for listener in &self.pending {
				tokenizer.subscribe(Arc::clone(listener));
			}
		}
		debug!(block = %self.id, parts = tokenizer.len(), "block.activate");
		self.inner = Inner::Interactive(tokenizer);
	}

	/// Tokens for the current text.
	pub fn tokens(&mut self) -> Vec<Arc<LineTokens>> {
		let text = std::mem::take(&mut self.text);
		let lines = self.tokenize_document(&text).unwrap_or_default();
		self.text = text;
		lines
	}

	pub fn is_disposed(&self) -> bool {
		self.disposed
	}
}

impl Tokenizer for BlockTokenizer {
	fn capabilities(&self) -> Capabilities {
		Capabilities::all()
	}

	fn tokenize_document(&mut self, text: &str) -> Option<Vec<Arc<LineTokens>>> {
		if self.disposed {
			return None;
		}
		if let Inner::Interactive(tokenizer) = &mut self.inner {
			match tokenizer.tokenize_document(text) {
				Some(lines) => return Some(lines),
				None => warn!(block = %self.id, "block.interactive_failed"),
			}
		}
		self.fallback.tokenize_document(text)
	}

	fn tokenize_line(&mut self, text: &str, line: usize) -> Option<Arc<LineTokens>> {
		if let Inner::Interactive(tokenizer) = &mut self.inner
			&& let Some(tokens) = tokenizer.tokenize_line(text, line)
		{
			return Some(tokens);
		}
		self.fallback.tokenize_line(text, line)
	}

	fn subscribe(&mut self, listener: Listener) {
		if self.disposed {
			return;
		}
		if let Inner::Interactive(tokenizer) = &mut self.inner
			&& tokenizer.capabilities().contains(Capabilities::SUBSCRIBE)
		{
			tokenizer.subscribe(Arc::clone(&listener));
		}
		self.pending.push(listener);
	}

	fn dispose(&mut self) {
		if let Inner::Interactive(tokenizer) = &mut self.inner {
			tokenizer.dispose();
		}
		self.inner = Inner::Static;
		self.pending.clear();
		self.fallback = StaticTokenizer::default();
		self.disposed = true;
		debug!(block = %self.id, "block.dispose");
	}
}

//! A page whose code blocks can be edited in place.

use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;
use quill_analysis::{AnalysisError, AnalysisSession, Libraries, QuickInfo};
use quill_tokenize::{
	ComposedTokenizer, Grammar, GrammarRegistry, LexicalTokenizer, LineTokens, Listener, SemanticTokenizer,
	SharedSession, Tokenizer,
};
use tracing::{debug, info};

use crate::block::{BlockTokenizer, Stage};
use crate::config::PageConfig;
use crate::error::{PageError, Result};
use crate::layout::FileLayout;

struct LiveBlock {
	tokenizer: BlockTokenizer,
	grammar: Arc<Grammar>,
	file: Option<String>,
}

/// Live state of one page.
///
/// Blocks start out showing lexical tokens. The first edit to a block of an
/// analyzed file creates the analysis session if needed, loads the file's
/// full text into it and moves every block of that file to
/// [`Stage::Loading`]; each block builds its interactive tokenizer the next
/// time its tokens are read. Dropping the page tears everything down.
pub struct LivePage {
	config: PageConfig,
	libraries: Libraries,
	blocks: IndexMap<String, LiveBlock>,
	layouts: IndexMap<String, FileLayout>,
	session: Option<SharedSession>,
	disposed: bool,
}

impl std::fmt::Debug for LivePage {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("LivePage")
			.field("blocks", &self.blocks.keys().collect::<Vec<_>>())
			.field("files", &self.layouts.keys().collect::<Vec<_>>())
			.field("session", &self.session.is_some())
			.field("disposed", &self.disposed)
			.finish()
	}
}

impl LivePage {
	/// Validates `config` and renders the lexical fallback of every block.
	///
	/// Unknown language tags and library names are reported here rather than
	/// on first edit.
	pub fn new(config: PageConfig, registry: &GrammarRegistry, libraries: Libraries) -> Result<Self> {
		config.validate()?;
		libraries.resolve(&config.lib)?;

		let mut blocks = IndexMap::with_capacity(config.code_blocks.len());
		for (id, block) in &config.code_blocks {
			let grammar = registry.get(&block.lang)?;
			let fallback = LexicalTokenizer::new(Arc::clone(&grammar)).tokenize_document(&block.text);
			blocks.insert(
				id.clone(),
				LiveBlock {
					tokenizer: BlockTokenizer::new(id.as_str(), block.text.as_str(), fallback),
					grammar,
					file: block.file_name.clone(),
				},
			);
		}
		let layouts = config
			.source_files
			.keys()
			.filter_map(|file| Some((file.clone(), FileLayout::from_config(&config, file)?)))
			.collect();
		debug!(blocks = blocks.len(), files = config.source_files.len(), "page.new");

		Ok(Self {
			config,
			libraries,
			blocks,
			layouts,
			session: None,
			disposed: false,
		})
	}

	pub fn config(&self) -> &PageConfig {
		&self.config
	}

	/// The analysis session, once some file entered edit mode.
	pub fn session(&self) -> Option<&SharedSession> {
		self.session.as_ref()
	}

	pub fn layout(&self, file: &str) -> Option<&FileLayout> {
		self.layouts.get(file)
	}

	pub fn state(&self, block: &str) -> Result<Stage> {
		Ok(self.block(block)?.tokenizer.stage())
	}

	pub fn text(&self, block: &str) -> Result<&str> {
		Ok(self.block(block)?.tokenizer.text())
	}

	/// True once `file` was loaded into the session.
	pub fn is_editing(&self, file: &str) -> bool {
		self.session
			.as_ref()
			.is_some_and(|session| session.lock().text(file).is_some())
	}

	fn block(&self, id: &str) -> Result<&LiveBlock> {
		self.blocks.get(id).ok_or_else(|| PageError::UnknownBlock(id.to_owned()))
	}

	fn ensure_session(&mut self) -> Result<SharedSession> {
		if self.disposed {
			return Err(AnalysisError::Disposed.into());
		}
		if let Some(session) = &self.session {
			return Ok(Arc::clone(session));
		}
		let session = AnalysisSession::new(&self.config.session_config(), &self.libraries)?;
		info!(libs = ?self.config.lib, "page.session_start");
		let session = Arc::new(Mutex::new(session));
		self.session = Some(Arc::clone(&session));
		Ok(session)
	}

	/// Loads `file` into the analysis session. Calling it again is a no-op.
	pub fn start_editing(&mut self, file: &str) -> Result<()> {
		let text = self
			.config
			.full_text(file)
			.ok_or_else(|| PageError::UnknownFile(file.to_owned()))?;
		let session = self.ensure_session()?;
		{
			let mut session = session.lock();
			if session.text(file).is_some() {
				return Ok(());
			}
			session.create_file(file, &text)?;
		}
		for block in self.blocks.values_mut() {
			if block.file.as_deref() == Some(file) {
				block.tokenizer.mark_loading();
			}
		}
		info!(file, len = text.len(), "page.start_editing");
		Ok(())
	}

	/// Replaces the text of `block`, applying the change to the analyzed
	/// file it belongs to. Edits are applied in call order.
	pub fn edit(&mut self, block: &str, new_text: &str) -> Result<()> {
		let live = self.block(block)?;
		if live.tokenizer.text() == new_text {
			return Ok(());
		}
		match live.file.clone() {
			Some(file) => {
				self.start_editing(&file)?;
				let replaced = self
					.layouts
					.get(&file)
					.and_then(|layout| layout.span(block))
					.ok_or_else(|| PageError::FragmentMismatch {
						file: file.clone(),
						block: block.to_owned(),
					})?;
				let version = self.ensure_session()?.lock().update_file(&file, new_text, replaced)?;
				if let Some(layout) = self.layouts.get_mut(&file) {
					layout.resize(block, new_text.len());
				}
				debug!(block, file = %file, version, start = replaced.start, "page.edit");
			}
			None => {
				if self.disposed {
					return Err(AnalysisError::Disposed.into());
				}
				debug!(block, "page.edit");
			}
		}

		if let Some(code) = self.config.code_blocks.get_mut(block) {
			code.text = new_text.to_owned();
		}
		if let Some(live) = self.blocks.get_mut(block) {
			live.tokenizer.set_text(new_text);
			live.tokenizer.mark_loading();
		}
		Ok(())
	}

	/// Current tokens of `block`, building its interactive tokenizer first
	/// if it is loading.
	pub fn tokens(&mut self, block: &str) -> Result<Vec<Arc<LineTokens>>> {
		if self.state(block)? == Stage::Loading {
			self.activate(block);
		}
		let live = self
			.blocks
			.get_mut(block)
			.ok_or_else(|| PageError::UnknownBlock(block.to_owned()))?;
		Ok(live.tokenizer.tokens())
	}

	fn activate(&mut self, id: &str) {
		let Some(live) = self.blocks.get_mut(id) else {
			return;
		};
		let mut parts: Vec<Box<dyn Tokenizer>> = vec![Box::new(LexicalTokenizer::new(Arc::clone(&live.grammar)))];
		if let Some(file) = &live.file
			&& let Some(session) = &self.session
			&& let Some(region) = self.layouts.get(file).and_then(|layout| layout.region(id))
		{
			let semantic = SemanticTokenizer::new(Arc::clone(session), file.as_str(), region.clone())
				.with_delay(self.config.debounce());
			parts.push(Box::new(semantic));
		}
		live.tokenizer.activate(ComposedTokenizer::new(parts));
	}

	/// Registers `listener` to run whenever `block` has new tokens.
	pub fn subscribe(&mut self, block: &str, listener: Listener) -> Result<()> {
		let live = self
			.blocks
			.get_mut(block)
			.ok_or_else(|| PageError::UnknownBlock(block.to_owned()))?;
		live.tokenizer.subscribe(listener);
		Ok(())
	}

	/// Hover information at an absolute offset of `file`. `None` until the
	/// file is in edit mode.
	pub fn quick_info(&self, file: &str, position: usize) -> Result<Option<QuickInfo>> {
		let Some(session) = &self.session else {
			return Ok(None);
		};
		let mut session = session.lock();
		if session.text(file).is_none() {
			return Ok(None);
		}
		Ok(session.quick_info(file, position)?)
	}

	pub fn is_disposed(&self) -> bool {
		self.disposed
	}

	/// Cancels pending work, drops every tokenizer and releases the engine.
	pub fn dispose(&mut self) {
		if self.disposed {
			return;
		}
		self.disposed = true;
		for block in self.blocks.values_mut() {
			block.tokenizer.dispose();
		}
		if let Some(session) = self.session.take() {
			session.lock().dispose();
		}
		debug!(blocks = self.blocks.len(), "page.dispose");
	}
}

impl Drop for LivePage {
	fn drop(&mut self) {
		self.dispose();
	}
}

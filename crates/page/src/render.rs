//! Build-time rendering of a page's code blocks.

use std::collections::BTreeMap;
use std::sync::Arc;

use indexmap::IndexMap;
use quill_analysis::{AnalysisSession, Libraries, QuickInfo, TextSpan};
use quill_tokenize::{
	ComposedTokenizer, GrammarRegistry, LexicalTokenizer, LineTokens, StaticTokenizer, Token, Tokenizer,
	compute_lines,
};
use serde::Serialize;
use tracing::{debug, info};

use crate::config::PageConfig;
use crate::error::Result;
use crate::layout::FileLayout;

/// Pre-rendered tokens of one block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedBlock {
	pub lang: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub file_name: Option<String>,
	/// Where the block sits in its analyzed file.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub span: Option<TextSpan>,
	pub lines: Vec<LineTokens>,
	/// Hover information keyed by the absolute offset identifier tokens
	/// carry as their source position.
	#[serde(skip_serializing_if = "BTreeMap::is_empty")]
	pub quick_info: BTreeMap<usize, QuickInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RenderedPage {
	pub blocks: IndexMap<String, RenderedBlock>,
}

/// Tokenizes every block of `config` once.
///
/// Blocks of an analyzed file get the lexical tokens followed by the
/// identifier and diagnostic tokens of their region, plus hover information
/// for each identifier. Other blocks get lexical tokens only.
pub fn render_static(config: &PageConfig, registry: &GrammarRegistry, libraries: &Libraries) -> Result<RenderedPage> {
	config.validate()?;
	libraries.resolve(&config.lib)?;

	let mut session = None;
	let mut layouts = IndexMap::new();
	if !config.source_files.is_empty() {
		let mut analysis = AnalysisSession::new(&config.session_config(), libraries)?;
		for file in config.source_files.keys() {
			let (Some(text), Some(layout)) = (config.full_text(file), FileLayout::from_config(config, file)) else {
				continue;
			};
			analysis.create_file(file, &text)?;
			layouts.insert(file.clone(), layout);
		}
		session = Some(analysis);
	}

	let mut page = RenderedPage::default();
	let mut hovers = 0;
	for (id, block) in &config.code_blocks {
		let grammar = registry.get(&block.lang)?;
		let lexical = LexicalTokenizer::new(grammar).tokenize_document(&block.text);

		let analyzed = match (block.file_name.as_deref(), session.as_mut()) {
			(Some(file), Some(session)) => layouts
				.get(file)
				.and_then(|layout| layout.span(id))
				.map(|span| (file, span, session)),
			_ => None,
		};
		let (lines, span, quick_info) = match analyzed {
			Some((file, span, session)) => {
				let semantic = compute_lines(session, file, span)?;
				let mut composed = ComposedTokenizer::new(vec![
					Box::new(StaticTokenizer::new(lexical.clone())),
					Box::new(StaticTokenizer::from_iter(semantic)),
				]);
				let lines = composed.tokenize_document(&block.text).unwrap_or(lexical);
				let mut quick_info = BTreeMap::new();
				for position in source_positions(&lines) {
					if let Some(info) = session.quick_info(file, position)? {
						quick_info.insert(position, info);
					}
				}
				hovers += quick_info.len();
				(lines, Some(span), quick_info)
			}
			None => (lexical, None, BTreeMap::new()),
		};
		debug!(block = %id, lang = %block.lang, lines = lines.len(), hovers = quick_info.len(), "render.block");

		page.blocks.insert(
			id.clone(),
			RenderedBlock {
				lang: block.lang.clone(),
				file_name: block.file_name.clone(),
				span,
				lines: lines.iter().map(|line| LineTokens::clone(line)).collect(),
				quick_info,
			},
		);
	}

	info!(blocks = page.blocks.len(), files = layouts.len(), hovers, "render.page");
	Ok(page)
}

fn source_positions(lines: &[Arc<LineTokens>]) -> impl Iterator<Item = usize> + '_ {
	lines.iter().flat_map(|line| &line.tokens).filter_map(|token| match token {
		Token::Identifier { source_position, .. } => Some(*source_position),
		_ => None,
	})
}

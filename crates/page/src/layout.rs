//! Where each visible fragment sits inside its analyzed file.

use quill_analysis::TextSpan;
use quill_tokenize::VisibleRegion;

use crate::config::PageConfig;

#[derive(Debug, Clone)]
struct Fragment {
	block: String,
	len: usize,
	region: VisibleRegion,
}

/// Byte layout of one analyzed file: the preamble, then every fragment,
/// separated by single newlines.
///
/// Fragment starts are derived from the lengths before them each time they
/// are asked for. The shared [`VisibleRegion`] of every fragment is moved
/// whenever a length changes.
#[derive(Debug, Clone)]
pub struct FileLayout {
	path: String,
	preamble_len: usize,
	fragments: Vec<Fragment>,
}

impl FileLayout {
	pub fn new<'a>(
		path: impl Into<String>,
		preamble: &str,
		fragments: impl IntoIterator<Item = (&'a str, &'a str)>,
	) -> Self {
		let layout = Self {
			path: path.into(),
			preamble_len: preamble.len(),
			fragments: fragments
				.into_iter()
				.map(|(block, text)| Fragment {
					block: block.to_owned(),
					len: text.len(),
					region: VisibleRegion::default(),
				})
				.collect(),
		};
		layout.sync_regions();
		layout
	}

	/// Layout of `file` as `config` describes it.
	pub fn from_config(config: &PageConfig, file: &str) -> Option<Self> {
		let source = config.source_files.get(file)?;
		let fragments = source
			.fragments
			.iter()
			.filter_map(|id| Some((id.as_str(), config.code_blocks.get(id)?.text.as_str())));
		Some(Self::new(file, &source.preamble, fragments))
	}

	pub fn path(&self) -> &str {
		&self.path
	}

	/// Total byte length of the file.
	pub fn len(&self) -> usize {
		let separators = self.fragments.len().saturating_sub(1);
		self.preamble_len + separators + self.fragments.iter().map(|fragment| fragment.len).sum::<usize>()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn blocks(&self) -> impl Iterator<Item = &str> {
		self.fragments.iter().map(|fragment| fragment.block.as_str())
	}

	fn spans(&self) -> impl Iterator<Item = (&Fragment, TextSpan)> {
		let mut start = self.preamble_len;
		self.fragments.iter().map(move |fragment| {
			let span = TextSpan::new(start, fragment.len);
			start = span.end() + 1;
			(fragment, span)
		})
	}

	/// Current span of `block` in the file.
	pub fn span(&self, block: &str) -> Option<TextSpan> {
		self.spans()
			.find(|(fragment, _)| fragment.block == block)
			.map(|(_, span)| span)
	}

	pub fn region(&self, block: &str) -> Option<&VisibleRegion> {
		self.fragments
			.iter()
			.find(|fragment| fragment.block == block)
			.map(|fragment| &fragment.region)
	}

	/// Records that `block` now holds `new_len` bytes and returns the span its
	/// previous text occupied. Every later fragment moves by the difference.
	pub fn resize(&mut self, block: &str, new_len: usize) -> Option<TextSpan> {
		let replaced = self.span(block)?;
		let fragment = self.fragments.iter_mut().find(|fragment| fragment.block == block)?;
		fragment.len = new_len;
		self.sync_regions();
		Some(replaced)
	}

	fn sync_regions(&self) {
		for (fragment, span) in self.spans() {
			fragment.region.set(span);
		}
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;

	fn layout() -> FileLayout {
		FileLayout::new("/post.ts", "// p\n", [("a", "ab"), ("b", "cde"), ("c", "")])
	}

	#[test]
	fn test_spans_follow_preamble_and_separators() {
		let layout = layout();
		assert_eq!(layout.span("a"), Some(TextSpan::new(5, 2)));
		assert_eq!(layout.span("b"), Some(TextSpan::new(8, 3)));
		assert_eq!(layout.span("c"), Some(TextSpan::new(12, 0)));
		assert_eq!(layout.span("z"), None);
		assert_eq!(layout.len(), "// p\nab\ncde\n".len());
		assert_eq!(layout.blocks().collect::<Vec<_>>(), ["a", "b", "c"]);
	}

	#[test]
	fn test_resize_shifts_later_fragments() {
		let mut layout = layout();
		let b = layout.region("b").unwrap().clone();

		assert_eq!(layout.resize("a", 4), Some(TextSpan::new(5, 2)));
		assert_eq!(layout.span("a"), Some(TextSpan::new(5, 4)));
		assert_eq!(b.get(), TextSpan::new(10, 3));
		assert_eq!(layout.region("c").unwrap().get(), TextSpan::new(14, 0));

		assert_eq!(layout.resize("b", 0), Some(TextSpan::new(10, 3)));
		assert_eq!(b.get(), TextSpan::new(10, 0));
		assert_eq!(layout.span("c"), Some(TextSpan::new(11, 0)));
		assert_eq!(layout.resize("z", 1), None);
	}

	#[test]
	fn test_from_config_matches_full_text() {
		let config = PageConfig::from_json(
			r#"{
				"codeBlocks": {
					"one": { "text": "let a = 1;", "fileName": "/f.ts", "lang": "ts" },
					"two": { "text": "a;", "fileName": "/f.ts", "lang": "ts" }
				},
				"sourceFiles": { "/f.ts": { "preamble": "declare const p: number;\n", "fragments": ["one", "two"] } }
			}"#,
		)
		.unwrap();
		let layout = FileLayout::from_config(&config, "/f.ts").unwrap();
		let text = config.full_text("/f.ts").unwrap();
		assert_eq!(layout.len(), text.len());
		for id in ["one", "two"] {
			let span = layout.span(id).unwrap();
			assert_eq!(&text[span.range()], config.code_blocks[id].text);
		}
		assert!(FileLayout::from_config(&config, "/g.ts").is_none());
	}
}

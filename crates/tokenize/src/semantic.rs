//! Identifier and diagnostic tokens read from an analysis session.
//!
//! The session analyzes a file whose text may start with an invisible
//! preamble and hold several visible regions. Engine offsets are absolute in
//! that file; emitted tokens are relative to the lines of one visible region.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use quill_analysis::{
	AnalysisError, AnalysisSession, ClassificationKind, ClassifiedSpan, Diagnostic, LanguageEngine, ScriptEngine,
	TextSpan,
};
use tracing::{debug, warn};

use crate::debounce::{self, Debouncer, Subscribers};
use crate::error::Result;
use crate::token::{LineTokens, Token, lines};
use crate::tokenizer::{Capabilities, Listener, Tokenizer};

/// Module-format mismatch between snippet and library; meaningless for
/// standalone examples.
const MODULE_FORMAT_MISMATCH: u32 = 1479;

const IDENTIFIER_KINDS: &[ClassificationKind] = &[
	ClassificationKind::ClassName,
	ClassificationKind::EnumName,
	ClassificationKind::InterfaceName,
	ClassificationKind::ParameterName,
	ClassificationKind::TypeAliasName,
	ClassificationKind::TypeParameterName,
	ClassificationKind::Identifier,
	ClassificationKind::JsxAttribute,
];

/// A session shared by a page and the tokenizers reading from it.
pub type SharedSession<E = ScriptEngine> = Arc<Mutex<AnalysisSession<E>>>;

/// Live location of a visible region inside the analyzed file.
///
/// Cloned handles share one span, so whoever edits the file can move the
/// region and every tokenizer reading it sees the update.
#[derive(Debug, Clone, Default)]
pub struct VisibleRegion(Arc<Mutex<TextSpan>>);

impl VisibleRegion {
	pub fn new(span: TextSpan) -> Self {
		Self(Arc::new(Mutex::new(span)))
	}

	pub fn get(&self) -> TextSpan {
		*self.0.lock()
	}

	pub fn set(&self, span: TextSpan) {
		*self.0.lock() = span;
	}
}

fn is_identifier(kind: ClassificationKind) -> bool {
	IDENTIFIER_KINDS.contains(&kind)
}

fn is_suppressed(diagnostic: &Diagnostic) -> bool {
	diagnostic.reports_unnecessary || diagnostic.code == MODULE_FORMAT_MISMATCH
}

/// Identifier-like syntactic spans, each taking the kind of a semantic span
/// starting at the same offset.
fn merge_identifiers(syntactic: &[ClassifiedSpan], semantic: &[ClassifiedSpan]) -> Vec<ClassifiedSpan> {
	let mut semantic = semantic.iter().filter(|span| is_identifier(span.kind)).peekable();
	syntactic
		.iter()
		.filter(|span| is_identifier(span.kind))
		.map(|span| {
			while semantic.next_if(|next| next.span.start < span.span.start).is_some() {}
			match semantic.next_if(|next| next.span.start == span.span.start) {
				Some(winner) => ClassifiedSpan::new(span.span, winner.kind),
				None => *span,
			}
		})
		.collect()
}

/// Line starts of a visible region, relative to the region.
struct Layout {
	origin: usize,
	len: usize,
	starts: Vec<usize>,
	lens: Vec<usize>,
}

impl Layout {
	fn new(text: &str, origin: usize) -> Self {
		let mut starts = Vec::new();
		let mut lens = Vec::new();
		let mut at = 0;
		for line in lines(text) {
			starts.push(at);
			lens.push(line.len());
			at += line.len() + 1;
		}
		Self {
			origin,
			len: text.len(),
			starts,
			lens,
		}
	}

	fn line_of(&self, offset: usize) -> usize {
		self.starts.partition_point(|&start| start <= offset).saturating_sub(1)
	}

	/// `span` relative to the region, clipped to it. `None` when no part of
	/// the span is visible.
	fn clip(&self, span: TextSpan) -> Option<(usize, usize)> {
		let end = self.origin + self.len;
		let outside = if span.is_empty() {
			span.start < self.origin || span.start > end
		} else {
			span.end() <= self.origin || span.start >= end
		};
		if outside {
			return None;
		}
		Some((span.start.max(self.origin) - self.origin, span.end().min(end) - self.origin))
	}

	/// Pushes one token per line the relative range `start..end` touches.
	fn split(&self, start: usize, end: usize, rows: &mut [Vec<Token>], make: impl Fn(usize, usize) -> Token) {
		let first = self.line_of(start);
		let last = if end > start { self.line_of(end - 1) } else { first };
		for line in first..=last {
			let base = self.starts[line];
			let len = self.lens[line];
			let from = if line == first { (start - base).min(len) } else { 0 };
			let to = if line == last { (end - base).min(len) } else { len };
			if from == to && end > start {
				continue;
			}
			rows[line].push(make(from, to.max(from)));
		}
	}
}

/// Computes the identifier and diagnostic tokens of the `visible` region of
/// `path`, one entry per line of the region's current text.
///
/// Diagnostics flagged as unnecessary and module-format mismatches are
/// dropped. Within a line, tokens are ordered by start offset.
pub fn compute_lines<E: LanguageEngine>(
	session: &mut AnalysisSession<E>,
	path: &str,
	visible: TextSpan,
) -> Result<Vec<LineTokens>> {
	let full = session
		.text(path)
		.ok_or_else(|| AnalysisError::FileNotFound(path.to_owned()))?;
	let end = visible.end().min(full.len());
	let start = visible.start.min(end);
	let text = full
		.get(start..end)
		.ok_or_else(|| AnalysisError::SpanOutOfBounds {
			path: path.to_owned(),
			start,
			end,
			len: full.len(),
		})?
		.to_owned();
	let visible = TextSpan::from_range(start..end);
	let layout = Layout::new(&text, start);

	let syntactic = session.syntactic_classifications(path, visible)?;
	let semantic = session.semantic_classifications(path, visible)?;
	let mut diagnostics = session.syntactic_diagnostics(path)?;
	diagnostics.extend(session.semantic_diagnostics(path)?);

	let mut rows = vec![Vec::new(); layout.starts.len()];
	let identifiers = merge_identifiers(&syntactic, &semantic);
	for identifier in &identifiers {
		let Some((from, to)) = layout.clip(identifier.span) else {
			continue;
		};
		layout.split(from, to, &mut rows, |start, end| Token::Identifier {
			start,
			end,
			classification: identifier.kind,
			source_position: identifier.span.start,
		});
	}

	let mut suppressed = 0usize;
	for diagnostic in &diagnostics {
		if is_suppressed(diagnostic) {
			suppressed += 1;
			continue;
		}
		let Some((from, to)) = layout.clip(diagnostic.span) else {
			continue;
		};
		layout.split(from, to, &mut rows, |start, end| Token::Diagnostic {
			start,
			end,
			message: diagnostic.message.clone(),
			code: diagnostic.code,
			category: diagnostic.category,
		});
	}

	debug!(
		path,
		lines = rows.len(),
		identifiers = identifiers.len(),
		diagnostics = diagnostics.len(),
		suppressed,
		"semantic.compute"
	);
	Ok(rows
		.into_iter()
		.map(|mut tokens| {
			tokens.sort_by_key(Token::start);
			tokens.into_iter().collect()
		})
		.collect())
}

#[derive(Debug, Clone)]
struct Computed {
	input: String,
	region: TextSpan,
	lines: Vec<Arc<LineTokens>>,
}

struct Shared<E: LanguageEngine> {
	session: SharedSession<E>,
	path: String,
	region: VisibleRegion,
	latest: Mutex<Option<Computed>>,
	subscribers: Mutex<Subscribers>,
}

impl<E: LanguageEngine> Shared<E> {
	/// Recomputes from the live session and stores the result under `input`.
	/// Lines equal to the previous result keep their `Arc`.
	fn compute(&self, input: String) -> Option<Vec<Arc<LineTokens>>> {
		let region = self.region.get();
		let computed = compute_lines(&mut self.session.lock(), &self.path, region);
		let lines = match computed {
			Ok(lines) => lines,
			Err(err) => {
				warn!(path = %self.path, %err, "semantic.compute_failed");
				return None;
			}
		};

		let mut latest = self.latest.lock();
		let previous = latest.as_ref().map(|computed| computed.lines.as_slice()).unwrap_or_default();
		let lines: Vec<_> = lines
			.into_iter()
			.enumerate()
			.map(|(index, line)| match previous.get(index) {
				Some(old) if **old == line => Arc::clone(old),
				_ => Arc::new(line),
			})
			.collect();
		*latest = Some(Computed {
			input,
			region,
			lines: lines.clone(),
		});
		Some(lines)
	}
}

/// Debounced semantic tokens for one visible region of an analyzed file.
///
/// Every call returns the latest result at once. When the text or the
/// region's position differs from those of that result, a recomputation is
/// scheduled for after the quiet period, counted from the most recent call;
/// it reads the session as it is when the timer fires and then notifies
/// subscribers. Only the very first call computes synchronously.
pub struct SemanticTokenizer<E: LanguageEngine + 'static = ScriptEngine> {
	shared: Arc<Shared<E>>,
	debouncer: Debouncer,
	disposed: bool,
}

impl<E: LanguageEngine + 'static> std::fmt::Debug for SemanticTokenizer<E> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SemanticTokenizer")
			.field("path", &self.shared.path)
			.field("region", &self.shared.region.get())
			.field("debouncer", &self.debouncer)
			.field("disposed", &self.disposed)
			.finish()
	}
}

impl<E: LanguageEngine + 'static> SemanticTokenizer<E> {
	pub fn new(session: SharedSession<E>, path: impl Into<String>, region: VisibleRegion) -> Self {
		Self {
			shared: Arc::new(Shared {
				session,
				path: path.into(),
				region,
				latest: Mutex::new(None),
				subscribers: Mutex::new(Subscribers::new()),
			}),
			debouncer: Debouncer::default(),
			disposed: false,
		}
	}

	/// Sets the quiet period before a recomputation.
	pub fn with_delay(mut self, delay: Duration) -> Self {
		self.debouncer = Debouncer::new(delay);
		self
	}

	pub fn path(&self) -> &str {
		&self.shared.path
	}

	pub fn region(&self) -> &VisibleRegion {
		&self.shared.region
	}

	/// The most recent result, if any.
	pub fn latest(&self) -> Option<Vec<Arc<LineTokens>>> {
		self.shared.latest.lock().as_ref().map(|computed| computed.lines.clone())
	}

	/// True while a recomputation waits for its quiet period.
	pub fn is_pending(&self) -> bool {
		self.debouncer.is_pending()
	}

	pub fn is_disposed(&self) -> bool {
		self.disposed
	}
}

impl<E: LanguageEngine + 'static> Tokenizer for SemanticTokenizer<E> {
	fn capabilities(&self) -> Capabilities {
		Capabilities::all()
	}

	fn tokenize_document(&mut self, text: &str) -> Option<Vec<Arc<LineTokens>>> {
		if self.disposed {
			return None;
		}
		let region = self.shared.region.get();
		let stale = {
			let latest = self.shared.latest.lock();
			latest
				.as_ref()
				.map(|computed| (computed.input != text || computed.region != region, computed.lines.clone()))
		};
		let Some((changed, lines)) = stale else {
			return self.shared.compute(text.to_owned());
		};
		if changed {
			let shared = Arc::clone(&self.shared);
			let input = text.to_owned();
			self.debouncer.schedule(move || {
				if shared.compute(input).is_some() {
					debounce::notify(&shared.subscribers);
				}
			});
		}
		Some(lines)
	}

	fn tokenize_line(&mut self, text: &str, line: usize) -> Option<Arc<LineTokens>> {
		let lines = self.tokenize_document(text)?;
		Some(lines.get(line).cloned().unwrap_or_default())
	}

	fn subscribe(&mut self, listener: Listener) {
		if !self.disposed {
			self.shared.subscribers.lock().subscribe(listener);
		}
	}

	fn dispose(&mut self) {
		if self.disposed {
			return;
		}
		self.disposed = true;
		self.debouncer.cancel();
		*self.shared.latest.lock() = None;
		self.shared.subscribers.lock().clear();
		debug!(path = %self.shared.path, "semantic.dispose");
	}
}

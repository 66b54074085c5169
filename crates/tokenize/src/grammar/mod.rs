//! TextMate-style grammars compiled onto the `regex` crate.
//!
//! Patterns use `regex` syntax, so lookaround is unavailable; `\b`, `^` and
//! `$` behave as in a single-line match. `end` patterns may refer to `begin`
//! captures with `\1`..`\9`; those are resolved when the rule is entered.

mod raw;
mod registry;

use std::sync::Arc;

use parking_lot::Mutex;
use regex::Regex;
use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;
use tracing::warn;

pub use self::raw::{RawCapture, RawCaptures, RawGrammar, RawRule};
pub use self::registry::GrammarRegistry;
use crate::error::{Result, TokenizeError};

/// Lines longer than this are emitted as one unscoped token.
pub const MAX_LINE_LENGTH: usize = 4000;

type RuleId = usize;

/// Capture group index to scope, ascending by index.
type Captures = Vec<(usize, String)>;

#[derive(Debug)]
enum Rule {
	Match {
		regex: Regex,
		name: Option<String>,
		captures: Captures,
	},
	BeginEnd {
		begin: Regex,
		end: EndPattern,
		name: Option<String>,
		content_name: Option<String>,
		begin_captures: Captures,
		end_captures: Captures,
		patterns: Vec<RuleId>,
	},
	Group {
		patterns: Vec<RuleId>,
	},
}

#[derive(Debug)]
struct EndPattern {
	source: Arc<str>,
	/// `None` when the pattern refers to `begin` captures.
	regex: Option<Arc<Regex>>,
}

/// Scope stack carried from one line to the next.
///
/// The initial state is empty. Two states compare equal exactly when the same
/// rules are open with the same resolved `end` patterns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct GrammarState {
	stack: Vec<Frame>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Frame {
	rule: RuleId,
	end: Arc<str>,
}

impl GrammarState {
	pub fn initial() -> Self {
		Self::default()
	}

	/// Number of open `begin`/`end` rules.
	pub fn depth(&self) -> usize {
		self.stack.len()
	}
}

/// A grammar's native token: a byte range of the line and its scopes,
/// outermost first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopedRange {
	pub start: usize,
	pub end: usize,
	pub scopes: Vec<String>,
}

/// A compiled grammar.
#[derive(Debug)]
pub struct Grammar {
	name: String,
	scope_name: String,
	aliases: Vec<String>,
	rules: Vec<Rule>,
	/// Per rule, its `patterns` with groups and includes expanded.
	candidates: Vec<Vec<RuleId>>,
	root: RuleId,
	resolved_ends: Mutex<FxHashMap<Arc<str>, Option<Arc<Regex>>>>,
}

impl Grammar {
	pub fn from_json(json: &str) -> Result<Self> {
		let raw: RawGrammar = serde_json::from_str(json)?;
		Self::compile(raw)
	}

	pub fn compile(raw: RawGrammar) -> Result<Self> {
		let name = raw.name.clone().unwrap_or_else(|| raw.scope_name.clone());
		let mut compiler = Compiler {
			grammar: name.clone(),
			rules: Vec::new(),
			repository: FxHashMap::default(),
		};
		let root = compiler.reserve();
		for key in raw.repository.keys() {
			let id = compiler.reserve();
			compiler.repository.insert(key.clone(), id);
		}
		for (key, rule) in &raw.repository {
			let compiled = compiler.rule(rule)?;
			let id = compiler.repository[key.as_str()];
			compiler.rules[id] = Some(compiled);
		}
		let patterns = compiler.patterns(&raw.patterns)?;
		compiler.rules[root] = Some(Rule::Group { patterns });

		let rules: Vec<Rule> = compiler
			.rules
			.into_iter()
			.map(|rule| rule.unwrap_or(Rule::Group { patterns: Vec::new() }))
			.collect();
		let candidates = (0..rules.len()).map(|id| expand(&rules, id)).collect();
		Ok(Self {
			name,
			scope_name: raw.scope_name,
			aliases: raw.aliases,
			rules,
			candidates,
			root,
			resolved_ends: Mutex::default(),
		})
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn scope_name(&self) -> &str {
		&self.scope_name
	}

	pub fn aliases(&self) -> &[String] {
		&self.aliases
	}

	/// Tokenizes one line (without its newline) starting from `state`.
	/// Returns the ranges covering the line and the state for the next line.
	pub fn tokenize_line(&self, line: &str, state: &GrammarState) -> (Vec<ScopedRange>, GrammarState) {
		if line.len() > MAX_LINE_LENGTH {
			let range = ScopedRange {
				start: 0,
				end: line.len(),
				scopes: vec![self.scope_name.clone()],
			};
			return (vec![range], state.clone());
		}

		let mut stack = state.stack.clone();
		let mut out = Vec::new();
		let mut pos = 0;
		let mut budget = line.len() * 4 + 64;
		loop {
			let scopes = self.scopes(&stack);
			if budget == 0 {
				push_range(&mut out, pos, line.len(), &scopes);
				break;
			}
			budget -= 1;

			let (candidates, end) = match stack.last() {
				Some(frame) => (&self.candidates[frame.rule], self.end_regex(frame)),
				None => (&self.candidates[self.root], None),
			};
			let end_match = end.as_ref().and_then(|re| re.captures_at(line, pos));
			let best = if pos < line.len() {
				self.best_match(candidates, line, pos)
			} else {
				None
			};

			let end_first = match (&end_match, &best) {
				(Some(end), Some((_, found))) => whole(end).start() <= whole(found).start(),
				(Some(_), None) => true,
				_ => false,
			};
			if end_first && let Some(caps) = end_match {
				let matched = whole(&caps);
				push_range(&mut out, pos, matched.start(), &scopes);
				let Some(frame) = stack.pop() else { break };
				if let Rule::BeginEnd {
					name, end_captures, ..
				} = &self.rules[frame.rule]
				{
					let mut outer = self.scopes(&stack);
					outer.extend(name.iter().cloned());
					emit_captures(&mut out, &caps, &outer, end_captures);
				}
				pos = matched.end();
				continue;
			}

			let Some((rule_id, caps)) = best else {
				push_range(&mut out, pos, line.len(), &scopes);
				break;
			};
			let matched = whole(&caps);
			push_range(&mut out, pos, matched.start(), &scopes);
			match &self.rules[rule_id] {
				Rule::Match { name, captures, .. } => {
					let mut inner = scopes.clone();
					inner.extend(name.iter().cloned());
					emit_captures(&mut out, &caps, &inner, captures);
					pos = matched.end();
					if matched.is_empty() {
						let next = next_boundary(line, pos);
						push_range(&mut out, pos, next, &scopes);
						pos = next;
					}
				}
				Rule::BeginEnd {
					end,
					name,
					begin_captures,
					..
				} => {
					let mut inner = scopes.clone();
					inner.extend(name.iter().cloned());
					emit_captures(&mut out, &caps, &inner, begin_captures);
					let end = match &end.regex {
						Some(_) => Arc::clone(&end.source),
						None => substitute_backrefs(&end.source, &caps).into(),
					};
					stack.push(Frame { rule: rule_id, end });
					pos = matched.end();
				}
				Rule::Group { .. } => {
					pos = next_boundary(line, pos);
				}
			}
		}
		(out, GrammarState { stack })
	}

	/// Scopes in effect inside every frame of `stack`.
	fn scopes(&self, stack: &[Frame]) -> Vec<String> {
		let mut scopes = vec![self.scope_name.clone()];
		for frame in stack {
			if let Rule::BeginEnd {
				name, content_name, ..
			} = &self.rules[frame.rule]
			{
				scopes.extend(name.iter().cloned());
				scopes.extend(content_name.iter().cloned());
			}
		}
		scopes
	}

	fn best_match<'h>(&self, candidates: &[RuleId], line: &'h str, pos: usize) -> Option<(RuleId, regex::Captures<'h>)> {
		let mut best: Option<(RuleId, regex::Captures<'h>)> = None;
		for &id in candidates {
			let regex = match &self.rules[id] {
				Rule::Match { regex, .. } => regex,
				Rule::BeginEnd { begin, .. } => begin,
				Rule::Group { .. } => continue,
			};
			let Some(caps) = regex.captures_at(line, pos) else { continue };
			let start = whole(&caps).start();
			if best.as_ref().is_none_or(|(_, found)| start < whole(found).start()) {
				let at_pos = start == pos;
				best = Some((id, caps));
				if at_pos {
					break;
				}
			}
		}
		best
	}

	fn end_regex(&self, frame: &Frame) -> Option<Arc<Regex>> {
		let Rule::BeginEnd { end, .. } = &self.rules[frame.rule] else {
			return None;
		};
		if let Some(regex) = &end.regex {
			return Some(Arc::clone(regex));
		}
		let mut resolved = self.resolved_ends.lock();
		resolved
			.entry(Arc::clone(&frame.end))
			.or_insert_with(|| match Regex::new(&frame.end) {
				Ok(regex) => Some(Arc::new(regex)),
				Err(err) => {
					warn!(grammar = %self.name, pattern = %frame.end, %err, "grammar.end_pattern");
					None
				}
			})
			.clone()
	}
}

fn whole<'h>(caps: &regex::Captures<'h>) -> regex::Match<'h> {
	caps.get_match()
}

fn next_boundary(line: &str, pos: usize) -> usize {
	line[pos..].chars().next().map_or(line.len(), |c| pos + c.len_utf8())
}

fn push_range(out: &mut Vec<ScopedRange>, start: usize, end: usize, scopes: &[String]) {
	if start < end {
		out.push(ScopedRange {
			start,
			end,
			scopes: scopes.to_vec(),
		});
	}
}

/// Splits a match into ranges at every capture boundary, layering the scope
/// of each capture that covers a piece.
fn emit_captures(out: &mut Vec<ScopedRange>, caps: &regex::Captures<'_>, base: &[String], captures: &Captures) {
	let matched = whole(caps);
	if captures.is_empty() {
		push_range(out, matched.start(), matched.end(), base);
		return;
	}
	let mut bounds: SmallVec<[usize; 8]> = SmallVec::new();
	bounds.push(matched.start());
	bounds.push(matched.end());
	for (index, _) in captures {
		if let Some(group) = caps.get(*index) {
			bounds.push(group.start());
			bounds.push(group.end());
		}
	}
	bounds.sort_unstable();
	bounds.dedup();
	for pair in bounds.windows(2) {
		let (start, end) = (pair[0], pair[1]);
		let mut scopes = base.to_vec();
		for (index, scope) in captures {
			if let Some(group) = caps.get(*index)
				&& group.start() <= start
				&& end <= group.end()
			{
				scopes.push(scope.clone());
			}
		}
		push_range(out, start, end, &scopes);
	}
}

fn has_backrefs(pattern: &str) -> bool {
	let bytes = pattern.as_bytes();
	let mut i = 0;
	while i + 1 < bytes.len() {
		if bytes[i] == b'\\' {
			if matches!(bytes[i + 1], b'1'..=b'9') {
				return true;
			}
			i += 2;
		} else {
			i += 1;
		}
	}
	false
}

/// Replaces `\N` in `pattern` with the escaped text of capture `N`.
fn substitute_backrefs(pattern: &str, caps: &regex::Captures<'_>) -> String {
	let mut out = String::with_capacity(pattern.len());
	let mut chars = pattern.chars();
	while let Some(c) = chars.next() {
		if c != '\\' {
			out.push(c);
			continue;
		}
		match chars.next() {
			Some(d @ '1'..='9') => {
				let index = d as usize - '0' as usize;
				if let Some(group) = caps.get(index) {
					out.push_str(&regex::escape(group.as_str()));
				}
			}
			Some(other) => {
				out.push('\\');
				out.push(other);
			}
			None => out.push('\\'),
		}
	}
	out
}

/// Flattens the patterns of `id`, following groups and includes.
fn expand(rules: &[Rule], id: RuleId) -> Vec<RuleId> {
	let patterns = match &rules[id] {
		Rule::BeginEnd { patterns, .. } | Rule::Group { patterns } => patterns,
		Rule::Match { .. } => return Vec::new(),
	};
	let mut out = Vec::new();
	let mut seen = FxHashSet::default();
	seen.insert(id);
	let mut work: Vec<RuleId> = patterns.iter().rev().copied().collect();
	while let Some(next) = work.pop() {
		match &rules[next] {
			Rule::Group { patterns } => {
				if seen.insert(next) {
					work.extend(patterns.iter().rev().copied());
				}
			}
			_ => out.push(next),
		}
	}
	out
}

struct Compiler {
	grammar: String,
	rules: Vec<Option<Rule>>,
	repository: FxHashMap<String, RuleId>,
}

impl Compiler {
	fn reserve(&mut self) -> RuleId {
		self.rules.push(None);
		self.rules.len() - 1
	}

	fn include(&self, include: &str) -> Result<RuleId> {
		match include {
			"$self" | "$base" => Ok(0),
			_ => include
				.strip_prefix('#')
				.and_then(|key| self.repository.get(key).copied())
				.ok_or_else(|| TokenizeError::UnknownInclude {
					grammar: self.grammar.clone(),
					include: include.to_owned(),
				}),
		}
	}

	fn patterns(&mut self, raw: &[RawRule]) -> Result<Vec<RuleId>> {
		raw.iter()
			.map(|rule| match &rule.include {
				Some(include) => self.include(include),
				None => {
					let compiled = self.rule(rule)?;
					let id = self.reserve();
					self.rules[id] = Some(compiled);
					Ok(id)
				}
			})
			.collect()
	}

	fn rule(&mut self, raw: &RawRule) -> Result<Rule> {
		if let Some(include) = &raw.include {
			return Ok(Rule::Group {
				patterns: vec![self.include(include)?],
			});
		}
		if let Some(pattern) = &raw.match_ {
			return Ok(Rule::Match {
				regex: self.regex(pattern)?,
				name: raw.name.clone(),
				captures: captures(raw.captures.as_ref()),
			});
		}
		if let Some(begin) = &raw.begin {
			let end = raw.end.as_deref().ok_or_else(|| TokenizeError::MissingEnd {
				grammar: self.grammar.clone(),
			})?;
			let end = EndPattern {
				source: end.into(),
				regex: if has_backrefs(end) {
					None
				} else {
					Some(Arc::new(self.regex(end)?))
				},
			};
			let begin_captures = captures(raw.begin_captures.as_ref().or(raw.captures.as_ref()));
			let end_captures = captures(raw.end_captures.as_ref().or(raw.captures.as_ref()));
			return Ok(Rule::BeginEnd {
				begin: self.regex(begin)?,
				end,
				name: raw.name.clone(),
				content_name: raw.content_name.clone(),
				begin_captures,
				end_captures,
				patterns: self.patterns(&raw.patterns)?,
			});
		}
		if !raw.patterns.is_empty() {
			return Ok(Rule::Group {
				patterns: self.patterns(&raw.patterns)?,
			});
		}
		Err(TokenizeError::EmptyRule {
			grammar: self.grammar.clone(),
		})
	}

	fn regex(&self, pattern: &str) -> Result<Regex> {
		Regex::new(pattern).map_err(|source| TokenizeError::InvalidPattern {
			grammar: self.grammar.clone(),
			pattern: pattern.to_owned(),
			source: Box::new(source),
		})
	}
}

fn captures(raw: Option<&RawCaptures>) -> Captures {
	let mut out: Captures = raw
		.into_iter()
		.flatten()
		.filter_map(|(key, capture)| Some((key.parse().ok()?, capture.name.clone()?)))
		.collect();
	out.sort_by_key(|(index, _)| *index);
	out
}

#[cfg(test)]
mod tests;

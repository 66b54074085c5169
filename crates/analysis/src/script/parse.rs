//! Declaration and reference collection.
//!
//! This is not a full parser. It walks the significant tokens once, tracking
//! bracket nesting and a small amount of context (declaration heads, member
//! lists, arrow functions), and records:
//!
//! * a scope tree, one scope per block or function-like construct
//! * every declaration with its name span and, where present, the byte range
//!   of its annotation and the token range of its initializer
//! * every identifier that reads or writes a binding
//!
//! Anything it does not understand is skipped token by token.

use std::ops::Range;
use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};

use super::lexer::{LexKind, Lexeme, lex};
use crate::types::{Diagnostic, TextSpan};

pub(crate) type ScopeId = usize;

/// The file-level scope.
pub(crate) const TOP_SCOPE: ScopeId = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum VarKind {
	Let,
	Const,
	Var,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ImportName {
	Default,
	Named(String),
	Namespace,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum DeclKind {
	Variable(VarKind),
	/// `annotation` holds the return type.
	Function,
	Parameter,
	Class,
	Interface,
	/// `annotation` holds the aliased type.
	TypeAlias,
	Enum,
	TypeParameter,
	Import { module: String, imported: ImportName },
}

#[derive(Debug, Clone)]
pub(crate) struct Decl {
	pub name: String,
	pub span: Range<usize>,
	pub kind: DeclKind,
	pub scope: ScopeId,
	/// Byte range of the type annotation.
	pub annotation: Option<Range<usize>>,
	/// Range of significant-token indices making up the initializer.
	pub init: Option<Range<usize>>,
	/// Token indices of the parentheses around the parameter list.
	pub params: Option<(usize, usize)>,
	/// Byte range of the type parameter list, angle brackets included.
	pub type_params: Option<Range<usize>>,
	/// Token range of the first `return` expression of a function body.
	pub returns: Option<Range<usize>>,
	pub optional: bool,
	pub exported: bool,
	pub doc: Option<String>,
}

#[derive(Debug, Clone)]
pub(crate) struct Ref {
	pub name: String,
	pub span: Range<usize>,
	pub scope: ScopeId,
	pub write: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct Import {
	pub module: String,
	/// Span of the module specifier, quotes included.
	pub span: Range<usize>,
}

/// Result of parsing one file version.
#[derive(Debug)]
pub(crate) struct Parsed {
	pub text: Arc<str>,
	pub version: u64,
	pub lexemes: Vec<Lexeme>,
	/// Indices into `lexemes` of every non-comment token.
	pub code: Vec<usize>,
	pub scope_parents: Vec<Option<ScopeId>>,
	pub decls: Vec<Decl>,
	pub refs: Vec<Ref>,
	pub imports: Vec<Import>,
	pub default_export: Option<String>,
	pub is_module: bool,
	pub diagnostics: Vec<Diagnostic>,
	bindings: FxHashMap<(ScopeId, String), usize>,
	decl_at: FxHashMap<usize, usize>,
	ref_at: FxHashMap<usize, usize>,
}

impl Parsed {
	pub fn parse(text: Arc<str>, version: u64, jsx: bool) -> Self {
		let lexed = lex(&text, jsx);
		let code: Vec<usize> = lexed
			.lexemes
			.iter()
			.enumerate()
			.filter(|(_, l)| l.kind != LexKind::Comment)
			.map(|(i, _)| i)
			.collect();
		let mut parser = Parser::new(&text, &lexed.lexemes, code);
		parser.run();
		let Parser {
			code,
			mut out,
			..
		} = parser;
		for decl in &mut out.decls {
			if decl.scope == TOP_SCOPE && out.local_exports.contains(&decl.name) {
				decl.exported = true;
			}
		}
		let mut diagnostics = lexed.errors;
		diagnostics.extend(out.diagnostics);
		diagnostics.sort_by_key(|d| d.span.start);

		let decl_at = out.decls.iter().enumerate().map(|(i, d)| (d.span.start, i)).collect();
		let ref_at = out.refs.iter().enumerate().map(|(i, r)| (r.span.start, i)).collect();
		Self {
			version,
			lexemes: lexed.lexemes,
			code,
			scope_parents: out.scope_parents,
			decls: out.decls,
			refs: out.refs,
			imports: out.imports,
			default_export: out.default_export,
			is_module: out.is_module,
			diagnostics,
			bindings: out.bindings,
			decl_at,
			ref_at,
			text,
		}
	}

	/// Finds the declaration `name` is bound to from `scope`, walking outwards.
	pub fn lookup(&self, scope: ScopeId, name: &str) -> Option<usize> {
		let mut current = Some(scope);
		while let Some(id) = current {
			if let Some(&decl) = self.bindings.get(&(id, name.to_owned())) {
				return Some(decl);
			}
			current = self.scope_parents.get(id).copied().flatten();
		}
		None
	}

	pub fn top_level(&self, name: &str) -> Option<usize> {
		self.bindings.get(&(TOP_SCOPE, name.to_owned())).copied()
	}

	/// Declaration whose name starts at byte `start`.
	pub fn decl_at(&self, start: usize) -> Option<usize> {
		self.decl_at.get(&start).copied()
	}

	/// Reference whose identifier starts at byte `start`.
	pub fn ref_at(&self, start: usize) -> Option<usize> {
		self.ref_at.get(&start).copied()
	}

	/// The `i`th significant token.
	pub fn token(&self, i: usize) -> Option<&Lexeme> {
		self.code.get(i).map(|&index| &self.lexemes[index])
	}

	pub fn token_text(&self, i: usize) -> &str {
		self.token(i).map_or("", |l| l.text(&self.text))
	}

	/// Token under byte `pos`; a position at the end of a token also hits it.
	pub fn lexeme_at(&self, pos: usize) -> Option<&Lexeme> {
		let index = self.lexemes.partition_point(|l| l.end < pos);
		self.lexemes[index..]
			.iter()
			.take(2)
			.filter(|l| l.start <= pos && pos <= l.end)
			.max_by_key(|l| l.start)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FuncSlot {
	Decl(usize),
	Anonymous,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HeadKind {
	Function(FuncSlot),
	Class,
	Interface,
	Enum,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameKind {
	Block { func: Option<FuncSlot> },
	ClassBody,
	TypeMembers,
	EnumBody,
	Members,
	Paren,
	Bracket,
	/// Declaration header waiting for its `{`.
	Head(HeadKind),
	/// Ends once the cursor reaches the token index.
	Until(usize),
}

impl FrameKind {
	fn is_virtual(self) -> bool {
		matches!(self, Self::Head(_) | Self::Until(_))
	}

	fn closer(self) -> Option<&'static str> {
		match self {
			Self::Paren => Some(")"),
			Self::Bracket => Some("]"),
			Self::Head(_) | Self::Until(_) => None,
			_ => Some("}"),
		}
	}
}

#[derive(Debug, Clone, Copy)]
struct Frame {
	kind: FrameKind,
	scope_before: ScopeId,
}

#[derive(Debug, Default)]
struct Output {
	scope_parents: Vec<Option<ScopeId>>,
	decls: Vec<Decl>,
	refs: Vec<Ref>,
	imports: Vec<Import>,
	default_export: Option<String>,
	/// Local names listed in `export { .. }` clauses.
	local_exports: FxHashSet<String>,
	is_module: bool,
	diagnostics: Vec<Diagnostic>,
	bindings: FxHashMap<(ScopeId, String), usize>,
}

const VAR_TYPE_END: &[&str] = &["=", ";", ",", ")", "in", "of"];
const PARAM_TYPE_END: &[&str] = &[",", ")", "="];
const RETURN_TYPE_END: &[&str] = &["{", ";"];
const ARROW_RETURN_END: &[&str] = &["=>", ";"];
const ALIAS_TYPE_END: &[&str] = &[";"];

/// Tokens after which `{` opens an object or type literal rather than a block.
const LITERAL_CONTEXT: &[&str] = &[
	"=", "(", ",", ":", "[", "?", "return", "...", "??", "||", "&&", "|", "&", "<", "as", "satisfies", "yield",
];

const ASSIGNMENT_OPERATORS: &[&str] = &[
	"=", "+=", "-=", "*=", "/=", "%=", "**=", "<<=", ">>=", ">>>=", "&=", "|=", "^=", "&&=", "||=", "??=", "++", "--",
];

const MEMBER_MODIFIERS: &[&str] = &[
	"static", "readonly", "public", "private", "protected", "async", "abstract", "declare", "get", "set", "*",
];

struct Parser<'a> {
	src: &'a str,
	lexemes: &'a [Lexeme],
	code: Vec<usize>,
	newline_before: Vec<bool>,
	pos: usize,
	scope: ScopeId,
	frames: Vec<Frame>,
	declared: FxHashSet<usize>,
	skip: FxHashSet<usize>,
	head_parens: FxHashSet<usize>,
	declarator_comma: Option<(usize, VarKind)>,
	out: Output,
}

impl<'a> Parser<'a> {
	fn new(src: &'a str, lexemes: &'a [Lexeme], code: Vec<usize>) -> Self {
		let mut newline_before = Vec::with_capacity(code.len());
		let mut previous_end = 0;
		for &index in &code {
			let lexeme = &lexemes[index];
			newline_before.push(src[previous_end..lexeme.start].contains('\n'));
			previous_end = lexeme.end;
		}
		let out = Output {
			scope_parents: vec![None],
			..Output::default()
		};
		Self {
			src,
			lexemes,
			code,
			newline_before,
			pos: 0,
			scope: TOP_SCOPE,
			frames: Vec::new(),
			declared: FxHashSet::default(),
			skip: FxHashSet::default(),
			head_parens: FxHashSet::default(),
			declarator_comma: None,
			out,
		}
	}

	fn lexeme(&self, i: usize) -> Option<&'a Lexeme> {
		self.code.get(i).map(|&index| &self.lexemes[index])
	}

	fn kind(&self, i: usize) -> Option<LexKind> {
		self.lexeme(i).map(|l| l.kind)
	}

	fn text(&self, i: usize) -> &'a str {
		self.lexeme(i).map_or("", |l| l.text(self.src))
	}

	/// Text of an operator, punctuation or keyword token; empty otherwise.
	fn op(&self, i: usize) -> &'a str {
		match self.lexeme(i) {
			Some(l) if matches!(l.kind, LexKind::Punct | LexKind::Operator | LexKind::Keyword) => l.text(self.src),
			_ => "",
		}
	}

	fn prev_op(&self, i: usize) -> &'a str {
		if i == 0 { "" } else { self.op(i - 1) }
	}

	fn is_ident(&self, i: usize) -> bool {
		self.kind(i) == Some(LexKind::Ident)
	}

	fn byte_range(&self, from: usize, to: usize) -> Option<Range<usize>> {
		let first = self.lexeme(from)?;
		let last = self.lexeme(to.checked_sub(1)?)?;
		(to > from).then(|| first.start..last.end)
	}

	fn new_scope(&mut self) -> ScopeId {
		self.out.scope_parents.push(Some(self.scope));
		self.out.scope_parents.len() - 1
	}

	fn push_frame(&mut self, kind: FrameKind) {
		self.frames.push(Frame {
			kind,
			scope_before: self.scope,
		});
	}

	fn pop_frame(&mut self) -> Option<Frame> {
		let frame = self.frames.pop()?;
		self.scope = frame.scope_before;
		Some(frame)
	}

	fn top_kind(&self) -> Option<FrameKind> {
		self.frames.last().map(|f| f.kind)
	}

	fn run(&mut self) {
		while self.pos < self.code.len() {
			while let Some(FrameKind::Until(end)) = self.top_kind()
				&& self.pos >= end
			{
				self.pop_frame();
			}
			self.step();
		}
		self.finish();
	}

	fn finish(&mut self) {
		let unclosed = self.frames.iter().rev().find_map(|f| f.kind.closer());
		if let Some(closer) = unclosed {
			let span = TextSpan::new(self.src.len(), 0);
			self.out.diagnostics.push(Diagnostic::error(span, 1005, format!("'{closer}' expected.")));
		}
	}

	fn step(&mut self) {
		let Some(lexeme) = self.lexeme(self.pos) else {
			self.pos += 1;
			return;
		};
		let text = lexeme.text(self.src);
		match lexeme.kind {
			LexKind::Keyword => self.keyword(text),
			LexKind::Ident => self.identifier(),
			LexKind::JsxTagName => {
				let component = text.chars().next().is_some_and(|c| c.is_ascii_uppercase())
					&& !text.contains(['.', '-', ':']);
				if component {
					self.push_ref(self.pos, false);
				}
				self.pos += 1;
			}
			LexKind::Punct | LexKind::Operator => self.punct(text),
			_ => self.pos += 1,
		}
	}

	fn keyword(&mut self, text: &str) {
		match text {
			"let" | "const" | "var" if self.op(self.pos + 1) != "enum" => {
				let kind = match text {
					"let" => VarKind::Let,
					"const" => VarKind::Const,
					_ => VarKind::Var,
				};
				self.declarator(self.pos + 1, kind);
				self.pos += 1;
			}
			"function" => self.function(),
			"class" => self.class_like(HeadKind::Class),
			"interface" if self.is_ident(self.pos + 1) => self.class_like(HeadKind::Interface),
			"enum" if self.is_ident(self.pos + 1) => self.enumeration(),
			"type" if self.is_ident(self.pos + 1) && matches!(self.op(self.pos + 2), "=" | "<") => {
				self.type_alias()
			}
			"import" if !matches!(self.op(self.pos + 1), "(" | ".") => self.import(),
			"export" => self.export(),
			"return" => {
				self.capture_return();
				self.pos += 1;
			}
			_ => self.pos += 1,
		}
	}

	fn punct(&mut self, text: &str) {
		match text {
			"(" => {
				if !self.head_parens.contains(&self.pos) {
					self.maybe_arrow();
				}
				self.push_frame(FrameKind::Paren);
			}
			"[" => self.push_frame(FrameKind::Bracket),
			"{" => self.open_brace(),
			")" | "]" | "}" => self.close(text),
			";" => {
				if let Some(FrameKind::Head(_)) = self.top_kind() {
					self.pop_frame();
				}
			}
			"," => {
				if let Some((comma, kind)) = self.declarator_comma
					&& comma == self.pos
				{
					self.declarator_comma = None;
					self.declarator(self.pos + 1, kind);
				}
			}
			_ => {}
		}
		self.pos += 1;
	}

	fn open_brace(&mut self) {
		if let Some(FrameKind::Head(head)) = self.top_kind()
			&& let Some(frame) = self.frames.last_mut()
		{
			frame.kind = match head {
				HeadKind::Function(slot) => FrameKind::Block { func: Some(slot) },
				HeadKind::Class => FrameKind::ClassBody,
				HeadKind::Interface => FrameKind::TypeMembers,
				HeadKind::Enum => FrameKind::EnumBody,
			};
			return;
		}
		if LITERAL_CONTEXT.contains(&self.prev_op(self.pos)) {
			self.push_frame(FrameKind::Members);
		} else {
			self.push_frame(FrameKind::Block { func: None });
			self.scope = self.new_scope();
		}
	}

	fn close(&mut self, closer: &str) {
		let matched = self
			.frames
			.iter()
			.rposition(|f| f.kind.closer() == Some(closer));
		let Some(depth) = matched else {
			let span = self.lexeme(self.pos).map(Lexeme::span).unwrap_or_default();
			self.out
				.diagnostics
				.push(Diagnostic::error(span, 1128, "Declaration or statement expected."));
			return;
		};
		let missing = self.frames[depth + 1..].iter().rev().find_map(|f| f.kind.closer());
		if let Some(expected) = missing {
			let span = self.lexeme(self.pos).map(Lexeme::span).unwrap_or_default();
			self.out
				.diagnostics
				.push(Diagnostic::error(span, 1005, format!("'{expected}' expected.")));
		}
		while self.frames.len() > depth {
			self.pop_frame();
		}
	}

	fn identifier(&mut self) {
		let pos = self.pos;
		self.pos += 1;
		if self.declared.contains(&pos) || self.skip.contains(&pos) {
			return;
		}
		let prev = self.prev_op(pos);
		let next = self.op(pos + 1);
		if matches!(prev, "." | "?.") {
			return;
		}
		let text = self.text(pos);
		let frame = self.frames.iter().rev().find(|f| !f.kind.is_virtual()).map(|f| f.kind);
		let after_modifier = MEMBER_MODIFIERS.contains(&prev) || (pos > 0 && matches!(self.text(pos - 1), "get" | "set"));
		match frame {
			Some(FrameKind::Members) | Some(FrameKind::ClassBody) | Some(FrameKind::TypeMembers)
				if matches!(text, "get" | "set") && self.is_ident(pos + 1) =>
			{
				return;
			}
			Some(FrameKind::Members) => {
				if matches!(prev, "{" | ",") || after_modifier {
					if matches!(next, "(" | "<") {
						self.method_head(pos + 1);
						return;
					}
					if next == ":" {
						return;
					}
				}
			}
			Some(FrameKind::ClassBody) => {
				let at_member = matches!(prev, "{" | ";" | "}") || after_modifier || self.newline_before[pos];
				if at_member {
					if matches!(next, "(" | "<") {
						self.method_head(pos + 1);
						return;
					}
					if matches!(next, ":" | "=" | ";" | "?" | "!" | "}") || self.lexeme(pos + 1).is_none() {
						return;
					}
				}
			}
			Some(FrameKind::TypeMembers) => {
				let at_member = matches!(prev, "{" | ";" | "," | "}") || after_modifier || self.newline_before[pos];
				if at_member {
					if matches!(next, "(" | "<") {
						self.method_head(pos + 1);
						return;
					}
					if matches!(next, ":" | "?" | ";" | "," | "}") {
						return;
					}
				}
			}
			Some(FrameKind::EnumBody) => {
				if matches!(prev, "{" | ",") {
					return;
				}
			}
			_ => {}
		}
		if next == ":"
			&& matches!(prev, "" | ";" | "{" | "}")
			&& matches!(frame, None | Some(FrameKind::Block { .. }))
		{
			return;
		}
		if next == "=>" {
			self.single_param_arrow(pos);
			return;
		}
		let write = ASSIGNMENT_OPERATORS.contains(&next) || matches!(prev, "++" | "--");
		self.push_ref(pos, write);
	}

	fn push_ref(&mut self, pos: usize, write: bool) {
		let Some(lexeme) = self.lexeme(pos) else { return };
		self.out.refs.push(Ref {
			name: lexeme.text(self.src).to_owned(),
			span: lexeme.start..lexeme.end,
			scope: self.scope,
			write,
		});
	}

	fn declare(&mut self, name_pos: usize, kind: DeclKind, scope: ScopeId) -> Option<usize> {
		let lexeme = self.lexeme(name_pos)?;
		let name = lexeme.text(self.src).to_owned();
		let index = self.out.decls.len();
		let start = self.statement_start(name_pos);
		let exported = (start..name_pos).any(|i| self.op(i) == "export");
		let doc = match kind {
			DeclKind::Parameter | DeclKind::TypeParameter | DeclKind::Import { .. } => None,
			_ => self.doc_comment(start),
		};
		self.out
			.bindings
			.entry((scope, name.clone()))
			.or_insert(index);
		self.out.decls.push(Decl {
			name,
			span: lexeme.start..lexeme.end,
			kind,
			scope,
			annotation: None,
			init: None,
			params: None,
			type_params: None,
			returns: None,
			optional: false,
			exported,
			doc,
		});
		self.declared.insert(name_pos);
		Some(index)
	}

	/// First token of the statement containing the declaration keyword or
	/// name at `pos`.
	fn statement_start(&self, pos: usize) -> usize {
		let mut start = pos;
		if start > 0
			&& matches!(
				self.op(start - 1),
				"let" | "const" | "var" | "function" | "class" | "interface" | "type" | "enum"
			) {
			start -= 1;
		}
		while start > 0
			&& matches!(
				self.op(start - 1),
				"export" | "declare" | "default" | "abstract" | "async"
			) {
			start -= 1;
		}
		start
	}

	fn doc_comment(&self, pos: usize) -> Option<String> {
		let index = *self.code.get(pos)?;
		let comment = self.lexemes.get(index.checked_sub(1)?)?;
		let text = comment.text(self.src);
		if comment.kind != LexKind::Comment || !text.starts_with("/**") {
			return None;
		}
		let body = text.trim_start_matches("/**").trim_end_matches("*/");
		let lines: Vec<&str> = body
			.lines()
			.map(|line| line.trim().trim_start_matches('*').trim())
			.filter(|line| !line.is_empty())
			.collect();
		(!lines.is_empty()).then(|| lines.join("\n"))
	}

	fn scan_type_end(&self, from: usize, terminators: &[&str]) -> usize {
		let mut depth = 0usize;
		let mut i = from;
		while self.lexeme(i).is_some() {
			let text = self.op(i);
			if depth == 0 {
				if terminators.contains(&text) && !(text == "{" && i == from) {
					break;
				}
				if i > from && self.newline_before[i] && !continues_type(self.op(i - 1)) && !matches!(text, "|" | "&") {
					break;
				}
			}
			match text {
				"(" | "[" | "{" | "<" => depth += 1,
				")" | "]" | "}" | ">" => {
					if depth == 0 {
						break;
					}
					depth -= 1;
				}
				">>" => {
					if depth == 0 {
						break;
					}
					depth = depth.saturating_sub(2);
				}
				";" if depth == 0 => break,
				_ => {}
			}
			i += 1;
		}
		i
	}

	fn scan_expr_end(&self, from: usize) -> usize {
		let mut depth = 0usize;
		let mut i = from;
		while let Some(lexeme) = self.lexeme(i) {
			let text = self.op(i);
			if depth == 0 {
				if matches!(text, ";" | ",") && lexeme.kind == LexKind::Punct {
					break;
				}
				if i > from && self.newline_before[i] && self.ends_expression(i - 1) && self.starts_statement(i) {
					break;
				}
			}
			match text {
				"(" | "[" | "{" => depth += 1,
				")" | "]" | "}" => {
					if depth == 0 {
						break;
					}
					depth -= 1;
				}
				_ => {}
			}
			i += 1;
		}
		i
	}

	fn ends_expression(&self, i: usize) -> bool {
		match self.kind(i) {
			Some(LexKind::Ident | LexKind::Number | LexKind::String | LexKind::Template) => true,
			Some(LexKind::Keyword) => matches!(self.text(i), "true" | "false" | "null" | "this" | "undefined"),
			Some(LexKind::Punct) => matches!(self.text(i), ")" | "]" | "}"),
			_ => false,
		}
	}

	fn starts_statement(&self, i: usize) -> bool {
		match self.kind(i) {
			Some(LexKind::Ident | LexKind::Number | LexKind::String | LexKind::Template) => true,
			Some(LexKind::Keyword) => !matches!(self.text(i), "instanceof" | "in" | "as" | "satisfies" | "of"),
			_ => false,
		}
	}

	/// Index of the bracket closing the one at `open`.
	fn matching(&self, open: usize) -> Option<usize> {
		let mut depth = 0usize;
		let mut i = open;
		while self.lexeme(i).is_some() {
			match self.op(i) {
				"(" | "[" | "{" => depth += 1,
				")" | "]" | "}" => {
					depth = depth.checked_sub(1)?;
					if depth == 0 {
						return Some(i);
					}
				}
				_ => {}
			}
			i += 1;
		}
		None
	}

	/// Declares the names bound by the pattern at `pos` and returns the index
	/// after it.
	fn binding(&mut self, pos: usize, kind: &DeclKind, out: &mut Vec<usize>) -> usize {
		if self.is_ident(pos) {
			if let Some(decl) = self.declare(pos, kind.clone(), self.scope) {
				out.push(decl);
			}
			return pos + 1;
		}
		let close = match self.op(pos) {
			"{" => "}",
			"[" => "]",
			_ => return pos,
		};
		let object = close == "}";
		let mut i = pos + 1;
		while self.lexeme(i).is_some() {
			let text = self.op(i);
			if text == close {
				return i + 1;
			}
			if matches!(text, "," | "...") {
				i += 1;
				continue;
			}
			let start = i;
			if object && self.is_ident(i) && self.op(i + 1) == ":" {
				self.skip.insert(i);
				i = self.binding(i + 2, kind, out);
			} else {
				i = self.binding(i, kind, out);
			}
			if self.op(i) == "=" {
				i = self.scan_expr_end(i + 1);
			}
			if i == start {
				i += 1;
			}
		}
		i
	}

	fn declarator(&mut self, pos: usize, kind: VarKind) {
		let mut decls = Vec::new();
		let mut i = self.binding(pos, &DeclKind::Variable(kind), &mut decls);
		let mut annotation = None;
		if self.op(i) == ":" {
			let end = self.scan_type_end(i + 1, VAR_TYPE_END);
			annotation = self.byte_range(i + 1, end);
			i = end;
		}
		let mut init = None;
		if self.op(i) == "=" {
			let end = self.scan_expr_end(i + 1);
			init = Some(i + 1..end);
			i = end;
		}
		if let [decl] = decls[..] {
			self.out.decls[decl].annotation = annotation;
			self.out.decls[decl].init = init;
		}
		if self.op(i) == "," {
			self.declarator_comma = Some((i, kind));
		}
	}

	/// Declares the parameters in the list opening at `open` in the current
	/// scope. Returns the index of the closing parenthesis.
	fn params(&mut self, open: usize) -> usize {
		self.head_parens.insert(open);
		let mut i = open + 1;
		while self.lexeme(i).is_some() {
			let text = self.op(i);
			if text == ")" {
				return i;
			}
			if matches!(text, "," | "..." | "public" | "private" | "protected" | "readonly") {
				i += 1;
				continue;
			}
			if text == "this" && self.op(i + 1) == ":" {
				i = self.scan_type_end(i + 2, PARAM_TYPE_END);
				continue;
			}
			let start = i;
			let mut decls = Vec::new();
			i = self.binding(i, &DeclKind::Parameter, &mut decls);
			if i == start {
				i += 1;
				continue;
			}
			let optional = self.op(i) == "?";
			if optional {
				i += 1;
			}
			let mut annotation = None;
			if self.op(i) == ":" {
				let end = self.scan_type_end(i + 1, PARAM_TYPE_END);
				annotation = self.byte_range(i + 1, end);
				i = end;
			}
			let mut init = None;
			if self.op(i) == "=" {
				let end = self.scan_expr_end(i + 1);
				init = Some(i + 1..end);
				i = end;
			}
			if let [decl] = decls[..] {
				let decl = &mut self.out.decls[decl];
				decl.annotation = annotation;
				decl.init = init;
				decl.optional = optional;
			}
		}
		i
	}

	/// Declares the type parameters in the list opening at `open`. Returns the
	/// index of the closing `>`.
	fn type_params(&mut self, open: usize) -> usize {
		let mut depth = 0usize;
		let mut i = open;
		while self.lexeme(i).is_some() {
			match self.op(i) {
				"<" | "(" | "[" | "{" => depth += 1,
				">" | ")" | "]" | "}" => {
					depth = depth.saturating_sub(1);
					if depth == 0 {
						return i;
					}
				}
				">>" => {
					depth = depth.saturating_sub(2);
					if depth == 0 {
						return i;
					}
				}
				_ => {
					if depth == 1 && self.is_ident(i) && matches!(self.op(i - 1), "<" | ",") {
						self.declare(i, DeclKind::TypeParameter, self.scope);
					}
				}
			}
			i += 1;
		}
		i
	}

	fn function(&mut self) {
		let mut i = self.pos + 1;
		if self.op(i) == "*" {
			i += 1;
		}
		let decl = if self.is_ident(i) {
			let decl = self.declare(i, DeclKind::Function, self.scope);
			i += 1;
			decl
		} else {
			None
		};
		let slot = decl.map_or(FuncSlot::Anonymous, FuncSlot::Decl);
		self.push_frame(FrameKind::Head(HeadKind::Function(slot)));
		self.scope = self.new_scope();
		self.pos += 1;
		self.signature(i, decl);
	}

	/// Type parameters, parameters and return type starting at `i`. Returns
	/// the index after the signature.
	fn signature(&mut self, mut i: usize, decl: Option<usize>) -> usize {
		if self.op(i) == "<" {
			let close = self.type_params(i);
			if let Some(decl) = decl {
				self.out.decls[decl].type_params = self.byte_range(i, close + 1);
			}
			i = close + 1;
		}
		if self.op(i) == "(" {
			let close = self.params(i);
			if let Some(decl) = decl {
				self.out.decls[decl].params = Some((i, close));
			}
			i = close + 1;
		}
		if self.op(i) == ":" {
			let end = self.scan_type_end(i + 1, RETURN_TYPE_END);
			if let Some(decl) = decl {
				self.out.decls[decl].annotation = self.byte_range(i + 1, end);
			}
			i = end;
		}
		i
	}

	/// Method with a body, or a signature-only member of an interface or
	/// type literal.
	fn method_head(&mut self, at: usize) {
		let signature_only = matches!(
			self.frames.iter().rev().find(|f| !f.kind.is_virtual()).map(|f| f.kind),
			Some(FrameKind::TypeMembers)
		);
		self.push_frame(FrameKind::Head(HeadKind::Function(FuncSlot::Anonymous)));
		self.scope = self.new_scope();
		let end = self.signature(at, None);
		if signature_only && let Some(frame) = self.frames.last_mut() {
			frame.kind = FrameKind::Until(end);
		}
	}

	fn class_like(&mut self, head: HeadKind) {
		let name = self.pos + 1;
		let kind = match head {
			HeadKind::Interface => DeclKind::Interface,
			_ => DeclKind::Class,
		};
		let decl = if self.is_ident(name) {
			self.declare(name, kind, self.scope)
		} else {
			None
		};
		self.push_frame(FrameKind::Head(head));
		self.scope = self.new_scope();
		let after = if decl.is_some() { name + 1 } else { name };
		if self.op(after) == "<" {
			let close = self.type_params(after);
			if let Some(decl) = decl {
				self.out.decls[decl].type_params = self.byte_range(after, close + 1);
			}
		}
		self.pos = after;
	}

	fn enumeration(&mut self) {
		self.declare(self.pos + 1, DeclKind::Enum, self.scope);
		self.push_frame(FrameKind::Head(HeadKind::Enum));
		self.pos += 2;
	}

	fn type_alias(&mut self) {
		let name = self.pos + 1;
		let decl = self.declare(name, DeclKind::TypeAlias, self.scope);
		let before = self.scope;
		let alias_scope = self.new_scope();
		self.scope = alias_scope;
		let mut i = name + 1;
		if self.op(i) == "<" {
			let close = self.type_params(i);
			if let Some(decl) = decl {
				self.out.decls[decl].type_params = self.byte_range(i, close + 1);
			}
			i = close + 1;
		}
		let mut end = i;
		if self.op(i) == "=" {
			end = self.scan_type_end(i + 1, ALIAS_TYPE_END);
			if let Some(decl) = decl {
				self.out.decls[decl].annotation = self.byte_range(i + 1, end);
			}
		}
		self.frames.push(Frame {
			kind: FrameKind::Until(end),
			scope_before: before,
		});
		self.pos = name + 1;
	}

	fn maybe_arrow(&mut self) {
		let Some(close) = self.matching(self.pos) else { return };
		let mut arrow = close + 1;
		if self.op(arrow) == ":" {
			arrow = self.scan_type_end(arrow + 1, ARROW_RETURN_END);
		}
		if self.op(arrow) != "=>" {
			return;
		}
		let end = self.arrow_body_end(arrow + 1);
		self.push_frame(FrameKind::Until(end));
		self.scope = self.new_scope();
		self.params(self.pos);
		self.head_parens.remove(&self.pos);
	}

	fn single_param_arrow(&mut self, pos: usize) {
		let end = self.arrow_body_end(pos + 2);
		self.push_frame(FrameKind::Until(end));
		self.scope = self.new_scope();
		self.declare(pos, DeclKind::Parameter, self.scope);
	}

	fn arrow_body_end(&self, body: usize) -> usize {
		if self.op(body) == "{" {
			self.matching(body).map_or(self.code.len(), |close| close + 1)
		} else {
			self.scan_expr_end(body)
		}
	}

	fn capture_return(&mut self) {
		let slot = self.frames.iter().rev().find_map(|f| match f.kind {
			FrameKind::Block { func: Some(slot) } => Some(slot),
			FrameKind::Until(_) => Some(FuncSlot::Anonymous),
			_ => None,
		});
		let Some(FuncSlot::Decl(decl)) = slot else { return };
		let start = self.pos + 1;
		if self.out.decls[decl].returns.is_some()
			|| self.lexeme(start).is_none()
			|| matches!(self.op(start), ";" | "}")
		{
			return;
		}
		let end = self.scan_expr_end(start);
		self.out.decls[decl].returns = Some(start..end);
	}

	fn import(&mut self) {
		self.out.is_module = true;
		let mut i = self.pos + 1;
		if self.text(i) == "type" && (self.is_ident(i + 1) || self.op(i + 1) == "{") {
			i += 1;
		}
		let mut bindings: Vec<(usize, ImportName)> = Vec::new();
		if self.is_ident(i) {
			bindings.push((i, ImportName::Default));
			i += 1;
			if self.op(i) == "," {
				i += 1;
			}
		}
		if self.op(i) == "*" && self.op(i + 1) == "as" && self.is_ident(i + 2) {
			bindings.push((i + 2, ImportName::Namespace));
			i += 3;
		}
		if self.op(i) == "{" {
			i += 1;
			while self.lexeme(i).is_some() && self.op(i) != "}" {
				if self.text(i) == "type" && self.is_ident(i + 1) {
					i += 1;
				}
				if self.is_ident(i) || self.kind(i) == Some(LexKind::Keyword) {
					let imported = self.text(i).to_owned();
					if self.op(i + 1) == "as" && self.is_ident(i + 2) {
						self.skip.insert(i);
						bindings.push((i + 2, ImportName::Named(imported)));
						i += 3;
					} else {
						bindings.push((i, ImportName::Named(imported)));
						i += 1;
					}
				} else {
					i += 1;
				}
			}
			i += 1;
		}
		if self.op(i) == "from" {
			i += 1;
		}
		let Some(specifier) = self.lexeme(i).filter(|l| l.kind == LexKind::String) else {
			self.pos = i;
			return;
		};
		let raw = specifier.text(self.src);
		let module = raw.trim_matches(['"', '\'']).to_owned();
		self.out.imports.push(Import {
			module: module.clone(),
			span: specifier.start..specifier.end,
		});
		for (name, imported) in bindings {
			let kind = DeclKind::Import {
				module: module.clone(),
				imported,
			};
			self.declare(name, kind, TOP_SCOPE);
		}
		self.pos = i + 1;
	}

	fn export(&mut self) {
		self.out.is_module = true;
		let next = self.pos + 1;
		match self.op(next) {
			"default" => {
				if self.is_ident(next + 1) && matches!(self.op(next + 2), ";" | "") {
					self.out.default_export = Some(self.text(next + 1).to_owned());
				}
				self.pos = next + 1;
			}
			"{" => {
				let Some(close) = self.matching(next) else {
					self.pos = next;
					return;
				};
				let reexport = self.op(close + 1) == "from";
				for i in next + 1..close {
					if self.is_ident(i) && self.op(i - 1) != "as" && !reexport {
						self.push_ref(i, false);
						self.out.local_exports.insert(self.text(i).to_owned());
					}
				}
				self.pos = if reexport { close + 3 } else { close + 1 };
			}
			"*" => {
				self.pos = next + 1;
				while let Some(lexeme) = self.lexeme(self.pos) {
					self.pos += 1;
					if lexeme.kind == LexKind::String {
						break;
					}
				}
			}
			_ => self.pos = next,
		}
	}
}

fn continues_type(prev: &str) -> bool {
	matches!(
		prev,
		"|" | "&" | ":" | "=" | "," | "=>" | "<" | "(" | "[" | "{" | "?" | "keyof" | "typeof" | "extends"
	)
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;

	fn parse(src: &str) -> Parsed {
		Parsed::parse(src.into(), 0, false)
	}

	fn decl_names(parsed: &Parsed) -> Vec<(&str, &DeclKind)> {
		parsed.decls.iter().map(|d| (d.name.as_str(), &d.kind)).collect()
	}

	fn ref_names(parsed: &Parsed) -> Vec<&str> {
		parsed.refs.iter().map(|r| r.name.as_str()).collect()
	}

	#[test]
	fn test_variable_declarations() {
		let parsed = parse("let a = 1, b: string = a;\nconst c = b;");
		assert_eq!(
			decl_names(&parsed),
			vec![
				("a", &DeclKind::Variable(VarKind::Let)),
				("b", &DeclKind::Variable(VarKind::Let)),
				("c", &DeclKind::Variable(VarKind::Const)),
			]
		);
		assert_eq!(ref_names(&parsed), vec!["a", "b"]);
		let b = &parsed.decls[1];
		assert_eq!(b.annotation.clone().map(|r| &parsed.text[r]), Some("string"));
		assert_eq!(b.init.clone().map(|r| parsed.token_text(r.start)), Some("a"));
	}

	#[test]
	fn test_parameters_are_scoped_to_their_function() {
		let parsed = parse("function add(x: number, y = 2): number {\n  return x + y;\n}\nx;");
		let names = decl_names(&parsed);
		assert_eq!(names[0], ("add", &DeclKind::Function));
		assert_eq!(names[1], ("x", &DeclKind::Parameter));
		assert_eq!(names[2], ("y", &DeclKind::Parameter));

		let add = &parsed.decls[0];
		let (open, close) = add.params.unwrap();
		let start = parsed.token(open).unwrap().start;
		let end = parsed.token(close).unwrap().end;
		assert_eq!(&parsed.text[start..end], "(x: number, y = 2)");
		assert_eq!(add.annotation.clone().map(|r| &parsed.text[r]), Some("number"));
		assert!(add.returns.is_some());

		let outer = parsed.refs.last().unwrap();
		assert_eq!(outer.name, "x");
		assert_eq!(parsed.lookup(outer.scope, "x"), None);
		let inner = &parsed.refs[0];
		assert_eq!(parsed.lookup(inner.scope, "x"), Some(1));
	}

	#[test]
	fn test_object_keys_and_properties_are_not_references() {
		let parsed = parse("const o = { a: 1, b };\no.a;\nlabel: for (;;) {}");
		assert_eq!(ref_names(&parsed), vec!["b", "o"]);
	}

	#[test]
	fn test_class_and_interface_members() {
		let src = "interface Shape<T> { area(): T; name?: string }\nclass Box implements Shape<number> {\n  width = 1;\n  area() { return this.width; }\n}";
		let parsed = parse(src);
		let names = decl_names(&parsed);
		assert_eq!(names[0], ("Shape", &DeclKind::Interface));
		assert_eq!(names[1], ("T", &DeclKind::TypeParameter));
		assert_eq!(names[2], ("Box", &DeclKind::Class));
		assert_eq!(ref_names(&parsed), vec!["T", "Shape"]);
		assert!(parsed.diagnostics.is_empty());
	}

	#[test]
	fn test_arrow_parameters() {
		let parsed = parse("const f = (a: number) => a * 2;\nconst g = b => b;\na;");
		let params: Vec<_> = parsed
			.decls
			.iter()
			.filter(|d| d.kind == DeclKind::Parameter)
			.map(|d| d.name.as_str())
			.collect();
		assert_eq!(params, vec!["a", "b"]);
		let last = parsed.refs.last().unwrap();
		assert_eq!(parsed.lookup(last.scope, "a"), None);
	}

	#[test]
	fn test_imports_bind_at_top_level() {
		let parsed = parse("import React, { useState as use } from \"react\";\nuse(1);");
		assert!(parsed.is_module);
		assert_eq!(parsed.imports[0].module, "react");
		assert_eq!(
			decl_names(&parsed),
			vec![
				(
					"React",
					&DeclKind::Import {
						module: "react".into(),
						imported: ImportName::Default
					}
				),
				(
					"use",
					&DeclKind::Import {
						module: "react".into(),
						imported: ImportName::Named("useState".into())
					}
				),
			]
		);
		assert_eq!(ref_names(&parsed), vec!["use"]);
	}

	#[test]
	fn test_assignment_marks_write() {
		let parsed = parse("let n = 0;\nn = 1;\nn++;\nn + 1;");
		let writes: Vec<bool> = parsed.refs.iter().map(|r| r.write).collect();
		assert_eq!(writes, vec![true, true, false]);
	}

	#[test]
	fn test_bracket_errors() {
		let parsed = parse("function f() {\n  let a = 1;\n");
		assert_eq!(parsed.diagnostics.len(), 1);
		assert_eq!(parsed.diagnostics[0].code, 1005);
		assert_eq!(parsed.diagnostics[0].message, "'}' expected.");

		let parsed = parse("let a = 1;\n}");
		assert_eq!(parsed.diagnostics[0].code, 1128);
		assert_eq!(parsed.diagnostics[0].span, TextSpan::new(11, 1));
	}

	#[test]
	fn test_doc_comment_attaches_to_declaration() {
		let parsed = parse("/** The answer. */\nexport const answer = 42;");
		assert_eq!(parsed.decls[0].doc.as_deref(), Some("The answer."));
		assert!(parsed.decls[0].exported);
	}

	#[test]
	fn test_export_clause_marks_local_declarations() {
		let parsed = parse("const a = 1;
const b = 2;
function f() { const a = 3; }
export { a, f as g };");
		let exported: Vec<_> = parsed
			.decls
			.iter()
			.filter(|d| d.exported)
			.map(|d| (d.name.as_str(), d.scope))
			.collect();
		assert_eq!(exported, vec![("a", TOP_SCOPE), ("f", TOP_SCOPE)]);
		assert!(parsed.is_module);
	}

	#[test]
	fn test_lexeme_at_prefers_token_starting_at_position() {
		let parsed = parse("a+b");
		assert_eq!(parsed.lexeme_at(1).map(|l| l.kind), Some(LexKind::Operator));
		assert_eq!(parsed.lexeme_at(3).map(|l| l.text(&parsed.text)), Some("b"));
	}
}

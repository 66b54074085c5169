//! Lexer for the script subset understood by [`ScriptEngine`].
//!
//! Produces every token including comments; whitespace is dropped. JSX is only
//! recognized when enabled (`.tsx`/`.jsx` files), and only where an expression
//! may start.
//!
//! [`ScriptEngine`]: super::ScriptEngine

use crate::types::{Diagnostic, TextSpan};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LexKind {
	Ident,
	Keyword,
	Number,
	String,
	Template,
	Comment,
	Punct,
	Operator,
	JsxText,
	JsxTagName,
	JsxAttribute,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Lexeme {
	pub kind: LexKind,
	pub start: usize,
	pub end: usize,
}

impl Lexeme {
	pub fn text<'a>(&self, src: &'a str) -> &'a str {
		&src[self.start..self.end]
	}

	pub fn span(&self) -> TextSpan {
		TextSpan::new(self.start, self.end - self.start)
	}
}

#[derive(Debug, Default)]
pub(crate) struct Lexed {
	pub lexemes: Vec<Lexeme>,
	pub errors: Vec<Diagnostic>,
}

pub(crate) fn is_keyword(word: &str) -> bool {
	matches!(
		word,
		"abstract"
			| "any" | "as"
			| "async" | "await"
			| "bigint" | "boolean"
			| "break" | "case"
			| "catch" | "class"
			| "const" | "continue"
			| "debugger" | "declare"
			| "default" | "delete"
			| "do" | "else"
			| "enum" | "export"
			| "extends" | "false"
			| "finally" | "for"
			| "from" | "function"
			| "if" | "implements"
			| "import" | "in"
			| "infer" | "instanceof"
			| "interface" | "is"
			| "keyof" | "let"
			| "module" | "namespace"
			| "never" | "new"
			| "null" | "number"
			| "object" | "of"
			| "private" | "protected"
			| "public" | "readonly"
			| "return" | "satisfies"
			| "static" | "string"
			| "super" | "switch"
			| "symbol" | "this"
			| "throw" | "true"
			| "try" | "type"
			| "typeof" | "undefined"
			| "unique" | "unknown"
			| "var" | "void"
			| "while" | "with"
			| "yield"
	)
}

const OPERATORS: &[&str] = &[
	">>>=", "...", "===", "!==", "**=", "<<=", ">>=", ">>>", "&&=", "||=", "??=", "=>", "==", "!=", "<=",
	">=", "&&", "||", "??", "?.", "++", "--", "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=", "**", "<<",
	">>",
];

fn is_punctuation(op: &str) -> bool {
	matches!(op, "{" | "}" | "(" | ")" | "[" | "]" | ";" | "," | "." | ":" | "..." | "?." | "=>")
}

fn is_ident_start(b: u8) -> bool {
	b.is_ascii_alphabetic() || b == b'_' || b == b'$' || b >= 0x80
}

fn is_ident_part(b: u8) -> bool {
	is_ident_start(b) || b.is_ascii_digit()
}

#[derive(Debug, Clone, Copy)]
enum Mode {
	Code { braces: usize },
	Tag { closing: bool, expect_name: bool },
	Children,
}

struct Lexer<'a> {
	src: &'a str,
	bytes: &'a [u8],
	pos: usize,
	jsx: bool,
	modes: Vec<Mode>,
	out: Lexed,
}

/// Lexes `src`. With `jsx` set, `<Tag ...>` in expression position starts an
/// element.
pub(crate) fn lex(src: &str, jsx: bool) -> Lexed {
	let mut lexer = Lexer {
		src,
		bytes: src.as_bytes(),
		pos: 0,
		jsx,
		modes: vec![Mode::Code { braces: 0 }],
		out: Lexed::default(),
	};
	while lexer.pos < lexer.bytes.len() {
		match lexer.modes.last().copied() {
			Some(Mode::Tag { closing, expect_name }) => lexer.tag(closing, expect_name),
			Some(Mode::Children) => lexer.children(),
			_ => lexer.code(),
		}
	}
	lexer.out
}

impl Lexer<'_> {
	fn peek(&self, offset: usize) -> Option<u8> {
		self.bytes.get(self.pos + offset).copied()
	}

	fn push(&mut self, kind: LexKind, start: usize) {
		self.out.lexemes.push(Lexeme {
			kind,
			start,
			end: self.pos,
		});
	}

	fn error(&mut self, span: TextSpan, code: u32, message: &str) {
		self.out.errors.push(Diagnostic::error(span, code, message));
	}

	fn skip_whitespace(&mut self) -> bool {
		let start = self.pos;
		while let Some(b) = self.peek(0)
			&& b.is_ascii_whitespace()
		{
			self.pos += 1;
		}
		self.pos > start
	}

	fn code(&mut self) {
		if self.skip_whitespace() {
			return;
		}
		let start = self.pos;
		let Some(b) = self.peek(0) else { return };
		match b {
			b'/' if self.peek(1) == Some(b'/') => {
				while let Some(b) = self.peek(0)
					&& b != b'\n'
				{
					self.pos += 1;
				}
				self.push(LexKind::Comment, start);
			}
			b'/' if self.peek(1) == Some(b'*') => self.block_comment(start),
			b'"' | b'\'' => self.string(b, true),
			b'`' => self.template(),
			b'0'..=b'9' => self.number(),
			b'.' if self.peek(1).is_some_and(|b| b.is_ascii_digit()) => self.number(),
			b if is_ident_start(b) => {
				self.ident();
				let kind = if is_keyword(&self.src[start..self.pos]) {
					LexKind::Keyword
				} else {
					LexKind::Ident
				};
				self.push(kind, start);
			}
			b'<' if self.jsx && self.jsx_may_start() => {
				self.pos += 1;
				self.push(LexKind::Punct, start);
				self.modes.push(Mode::Tag {
					closing: false,
					expect_name: true,
				});
			}
			b'{' => {
				self.pos += 1;
				self.push(LexKind::Punct, start);
				if let Some(Mode::Code { braces }) = self.modes.last_mut() {
					*braces += 1;
				}
			}
			b'}' => {
				self.pos += 1;
				self.push(LexKind::Punct, start);
				let nested = self.modes.len() > 1;
				if let Some(Mode::Code { braces }) = self.modes.last_mut() {
					if *braces == 0 && nested {
						self.modes.pop();
					} else {
						*braces = braces.saturating_sub(1);
					}
				}
			}
			_ => self.operator(),
		}
	}

	fn operator(&mut self) {
		let start = self.pos;
		let rest = &self.src[start..];
		let len = OPERATORS
			.iter()
			.find(|op| rest.starts_with(**op))
			.map_or(1, |op| op.len());
		self.pos += len;
		let text = &self.src[start..self.pos];
		let kind = if is_punctuation(text) || !b"+-*/%=<>!&|^~?".contains(&self.bytes[start]) {
			LexKind::Punct
		} else {
			LexKind::Operator
		};
		self.push(kind, start);
	}

	fn ident(&mut self) {
		while let Some(b) = self.peek(0)
			&& is_ident_part(b)
		{
			self.pos += 1;
		}
	}

	fn number(&mut self) {
		let start = self.pos;
		while let Some(b) = self.peek(0)
			&& (b.is_ascii_alphanumeric() || b == b'_' || b == b'.')
		{
			self.pos += 1;
		}
		self.push(LexKind::Number, start);
	}

	fn block_comment(&mut self, start: usize) {
		self.pos += 2;
		match self.src[self.pos..].find("*/") {
			Some(offset) => self.pos += offset + 2,
			None => {
				self.pos = self.bytes.len();
				self.error(TextSpan::new(self.pos, 0), 1010, "'*/' expected.");
			}
		}
		self.push(LexKind::Comment, start);
	}

	fn string(&mut self, quote: u8, single_line: bool) {
		let start = self.pos;
		self.pos += 1;
		loop {
			match self.peek(0) {
				Some(b) if b == quote => {
					self.pos += 1;
					break;
				}
				Some(b'\\') => self.pos = (self.pos + 2).min(self.bytes.len()),
				Some(b'\n') if single_line => {
					self.unterminated_string(start);
					break;
				}
				Some(_) => self.pos += 1,
				None => {
					self.unterminated_string(start);
					break;
				}
			}
		}
		self.align_to_char_boundary();
		self.push(LexKind::String, start);
	}

	fn unterminated_string(&mut self, start: usize) {
		self.align_to_char_boundary();
		let span = TextSpan::new(start, self.pos - start);
		self.error(span, 1002, "Unterminated string literal.");
	}

	fn template(&mut self) {
		let start = self.pos;
		self.pos += 1;
		let mut depth = 0usize;
		loop {
			match self.peek(0) {
				Some(b'`') if depth == 0 => {
					self.pos += 1;
					break;
				}
				Some(b'\\') => self.pos = (self.pos + 2).min(self.bytes.len()),
				Some(b'$') if self.peek(1) == Some(b'{') => {
					depth += 1;
					self.pos += 2;
				}
				Some(b'{') if depth > 0 => {
					depth += 1;
					self.pos += 1;
				}
				Some(b'}') if depth > 0 => {
					depth -= 1;
					self.pos += 1;
				}
				Some(_) => self.pos += 1,
				None => {
					let span = TextSpan::new(start, self.pos - start);
					self.error(span, 1160, "Unterminated template literal.");
					break;
				}
			}
		}
		self.align_to_char_boundary();
		self.push(LexKind::Template, start);
	}

	/// Escapes may step into the middle of a multi-byte character.
	fn align_to_char_boundary(&mut self) {
		while !self.src.is_char_boundary(self.pos) {
			self.pos += 1;
		}
	}

	fn jsx_may_start(&self) -> bool {
		if !self.peek(1).is_some_and(|b| b.is_ascii_alphabetic() || b == b'>') {
			return false;
		}
		let previous = self.out.lexemes.iter().rev().find(|l| l.kind != LexKind::Comment);
		match previous {
			None => true,
			Some(lexeme) => {
				let text = lexeme.text(self.src);
				match lexeme.kind {
					LexKind::Keyword => matches!(text, "return" | "yield" | "default"),
					LexKind::Punct => matches!(text, "(" | "," | ":" | "[" | "{" | "}" | ";" | "=>"),
					LexKind::Operator => matches!(text, "=" | "?" | "&&" | "||" | "??"),
					_ => false,
				}
			}
		}
	}

	fn tag(&mut self, closing: bool, expect_name: bool) {
		if self.skip_whitespace() {
			return;
		}
		let start = self.pos;
		let Some(b) = self.peek(0) else { return };
		match b {
			b'>' => {
				self.pos += 1;
				self.push(LexKind::Punct, start);
				self.modes.pop();
				if closing {
					if matches!(self.modes.last(), Some(Mode::Children)) {
						self.modes.pop();
					}
				} else {
					self.modes.push(Mode::Children);
				}
			}
			b'/' if self.peek(1) == Some(b'>') => {
				self.pos += 2;
				self.push(LexKind::Punct, start);
				self.modes.pop();
			}
			b'{' => {
				self.pos += 1;
				self.push(LexKind::Punct, start);
				self.modes.push(Mode::Code { braces: 0 });
			}
			b'"' | b'\'' => self.string(b, false),
			b'=' => {
				self.pos += 1;
				self.push(LexKind::Operator, start);
			}
			b if is_ident_start(b) => {
				while let Some(b) = self.peek(0)
					&& (is_ident_part(b) || matches!(b, b'-' | b'.' | b':'))
				{
					self.pos += 1;
				}
				if expect_name {
					self.push(LexKind::JsxTagName, start);
					if let Some(Mode::Tag { expect_name, .. }) = self.modes.last_mut() {
						*expect_name = false;
					}
				} else {
					self.push(LexKind::JsxAttribute, start);
				}
			}
			_ => {
				self.pos += 1;
				self.align_to_char_boundary();
				self.push(LexKind::Punct, start);
			}
		}
	}

	fn children(&mut self) {
		let start = self.pos;
		match self.peek(0) {
			Some(b'<') => {
				self.pos += 1;
				self.push(LexKind::Punct, start);
				let closing = self.peek(0) == Some(b'/');
				self.modes.push(Mode::Tag {
					closing,
					expect_name: true,
				});
			}
			Some(b'{') => {
				self.pos += 1;
				self.push(LexKind::Punct, start);
				self.modes.push(Mode::Code { braces: 0 });
			}
			Some(_) => {
				while let Some(b) = self.peek(0)
					&& b != b'<'
					&& b != b'{'
				{
					self.pos += 1;
				}
				if !self.src[start..self.pos].trim().is_empty() {
					self.push(LexKind::JsxText, start);
				}
			}
			None => {}
		}
	}
}

//! Types and expression inference.

use std::fmt;
use std::ops::Range;

use super::lexer::LexKind;
use super::parse::Parsed;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Ty {
	Any,
	Void,
	Number,
	String,
	Boolean,
	BigInt,
	Null,
	Undefined,
	NumberLit(String),
	StringLit(String),
	BoolLit(bool),
	Array(Box<Ty>),
	Object(Vec<(String, Ty)>),
	Function { params: String, ret: Box<Ty> },
	Union(Vec<Ty>),
	Named(String),
}

impl Ty {
	/// Literal types become their primitive; containers widen their members.
	pub fn widen(&self) -> Ty {
		match self {
			Self::NumberLit(_) => Self::Number,
			Self::StringLit(_) => Self::String,
			Self::BoolLit(_) => Self::Boolean,
			Self::Array(elem) => Self::Array(Box::new(elem.widen())),
			Self::Object(fields) => Self::Object(fields.iter().map(|(k, v)| (k.clone(), v.widen())).collect()),
			Self::Union(members) => members.iter().map(Ty::widen).fold(Ty::Union(Vec::new()), Ty::union),
			other => other.clone(),
		}
	}

	pub fn is_string_like(&self) -> bool {
		matches!(self, Self::String | Self::StringLit(_))
	}

	pub fn is_number_like(&self) -> bool {
		matches!(self, Self::Number | Self::NumberLit(_))
	}

	pub fn is_literal(&self) -> bool {
		matches!(self, Self::NumberLit(_) | Self::StringLit(_) | Self::BoolLit(_))
	}

	/// Primitive or primitive literal, the only types assignability is
	/// checked for.
	pub fn is_primitive(&self) -> bool {
		matches!(
			self,
			Self::Number | Self::String | Self::Boolean | Self::BigInt | Self::NumberLit(_) | Self::StringLit(_) | Self::BoolLit(_)
		)
	}

	/// Whether a value of `self` may be stored in `target`. Only primitive
	/// pairs are decided; everything else is accepted.
	pub fn assignable_to(&self, target: &Ty) -> bool {
		if !self.is_primitive() || !target.is_primitive() {
			return true;
		}
		if target.is_literal() {
			return self == target;
		}
		self.widen() == *target
	}

	/// Union of two types, flattening nested unions and dropping duplicates.
	pub fn union(self, other: Ty) -> Ty {
		let mut members = Vec::new();
		for ty in [self, other] {
			match ty {
				Ty::Union(inner) => members.extend(inner),
				ty => members.push(ty),
			}
		}
		let mut unique: Vec<Ty> = Vec::with_capacity(members.len());
		for ty in members {
			if !unique.contains(&ty) {
				unique.push(ty);
			}
		}
		match unique.len() {
			1 => unique.pop().unwrap_or(Ty::Any),
			_ if unique.contains(&Ty::Any) => Ty::Any,
			_ => Ty::Union(unique),
		}
	}

	/// Interprets the text of a type annotation.
	pub fn from_annotation(text: &str) -> Ty {
		let text = normalize_whitespace(text);
		let text = text.trim();
		let parts = split_top_level(text, '|');
		if parts.len() > 1 {
			return parts
				.iter()
				.map(|part| Ty::from_annotation(part))
				.fold(Ty::Union(Vec::new()), Ty::union);
		}
		if let Some(inner) = text.strip_suffix("[]") {
			return Ty::Array(Box::new(Ty::from_annotation(inner)));
		}
		if let Some(inner) = text.strip_prefix('(').and_then(|t| t.strip_suffix(')'))
			&& balanced(inner)
		{
			return Ty::from_annotation(inner);
		}
		match text {
			"any" | "unknown" => Ty::Any,
			"void" => Ty::Void,
			"number" => Ty::Number,
			"string" => Ty::String,
			"boolean" => Ty::Boolean,
			"bigint" => Ty::BigInt,
			"null" => Ty::Null,
			"undefined" => Ty::Undefined,
			"true" => Ty::BoolLit(true),
			"false" => Ty::BoolLit(false),
			_ if text.len() >= 2 && (text.starts_with('"') || text.starts_with('\'')) => {
				Ty::StringLit(text.get(1..text.len() - 1).unwrap_or_default().to_owned())
			}
			_ if text.starts_with(|c: char| c.is_ascii_digit() || c == '-') && text.parse::<f64>().is_ok() => {
				Ty::NumberLit(text.to_owned())
			}
			_ => Ty::Named(text.to_owned()),
		}
	}
}

impl fmt::Display for Ty {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Any => f.write_str("any"),
			Self::Void => f.write_str("void"),
			Self::Number => f.write_str("number"),
			Self::String => f.write_str("string"),
			Self::Boolean => f.write_str("boolean"),
			Self::BigInt => f.write_str("bigint"),
			Self::Null => f.write_str("null"),
			Self::Undefined => f.write_str("undefined"),
			Self::NumberLit(n) => f.write_str(n),
			Self::StringLit(s) => write!(f, "\"{s}\""),
			Self::BoolLit(b) => write!(f, "{b}"),
			Self::Array(elem) => match **elem {
				Ty::Union(_) | Ty::Function { .. } => write!(f, "({elem})[]"),
				_ => write!(f, "{elem}[]"),
			},
			Self::Object(fields) if fields.is_empty() => f.write_str("{}"),
			Self::Object(fields) => {
				f.write_str("{ ")?;
				for (name, ty) in fields {
					write!(f, "{name}: {ty}; ")?;
				}
				f.write_str("}")
			}
			Self::Function { params, ret } => write!(f, "{params} => {ret}"),
			Self::Union(members) if members.is_empty() => f.write_str("never"),
			Self::Union(members) => {
				for (i, member) in members.iter().enumerate() {
					if i > 0 {
						f.write_str(" | ")?;
					}
					write!(f, "{member}")?;
				}
				Ok(())
			}
			Self::Named(name) => f.write_str(name),
		}
	}
}

/// Collapses every whitespace run to a single space.
pub(crate) fn normalize_whitespace(text: &str) -> String {
	text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn split_top_level(text: &str, separator: char) -> Vec<&str> {
	let mut parts = Vec::new();
	let mut depth = 0i32;
	let mut start = 0;
	let mut previous = ' ';
	for (i, c) in text.char_indices() {
		let arrow = previous == '=';
		previous = c;
		match c {
			'(' | '[' | '{' | '<' => depth += 1,
			'>' if arrow => {}
			')' | ']' | '}' | '>' => depth -= 1,
			c if c == separator && depth == 0 => {
				let part = text[start..i].trim();
				if !part.is_empty() {
					parts.push(part);
				}
				start = i + c.len_utf8();
			}
			_ => {}
		}
	}
	let last = text[start..].trim();
	if !last.is_empty() {
		parts.push(last);
	}
	parts
}

fn balanced(text: &str) -> bool {
	let mut depth = 0i32;
	for c in text.chars() {
		match c {
			'(' => depth += 1,
			')' => {
				depth -= 1;
				if depth < 0 {
					return false;
				}
			}
			_ => {}
		}
	}
	depth == 0
}

/// Resolves identifiers met during evaluation.
pub(crate) trait NameTypes {
	/// Type of the identifier reference starting at byte `start`.
	fn ident_type(&self, start: usize) -> Ty;
}

/// Evaluates the expression in the token range `range` of `parsed`.
pub(crate) fn expression_type(parsed: &Parsed, range: Range<usize>, names: &dyn NameTypes) -> Ty {
	let mut eval = Eval {
		parsed,
		names,
		pos: range.start,
		end: range.end.min(parsed.code.len()),
	};
	eval.assignment()
}

/// Display form of the parameter list between the parentheses at `open` and
/// `close`, e.g. `(a: number, b?: string)`.
pub(crate) fn params_display(parsed: &Parsed, open: usize, close: usize, names: &dyn NameTypes) -> String {
	let mut params = Vec::new();
	let mut segment_start = open + 1;
	let mut depth = 0usize;
	for i in open + 1..=close {
		let text = if i == close { "," } else { parsed.token_text(i) };
		match text {
			"(" | "[" | "{" | "<" => depth += 1,
			")" | "]" | "}" | ">" => depth = depth.saturating_sub(1),
			"," if depth == 0 => {
				if i > segment_start {
					params.push(param_display(parsed, segment_start..i, names));
				}
				segment_start = i + 1;
			}
			_ => {}
		}
	}
	format!("({})", params.join(", "))
}

fn param_display(parsed: &Parsed, range: Range<usize>, names: &dyn NameTypes) -> String {
	let text = |i: usize| parsed.token_text(i);
	let mut i = range.start;
	while i < range.end && matches!(text(i), "public" | "private" | "protected" | "readonly") {
		i += 1;
	}
	let mut name = String::new();
	while i < range.end && !matches!(text(i), ":" | "=" | "?") {
		name.push_str(text(i));
		i += 1;
	}
	let optional = text(i) == "?";
	if optional {
		i += 1;
	}
	if text(i) == ":" {
		let type_end = (i + 1..range.end).find(|&j| text(j) == "=").unwrap_or(range.end);
		let ty = span_text(parsed, i + 1..type_end).map_or_else(|| "any".to_owned(), normalize_whitespace);
		let marker = if optional { "?" } else { "" };
		return format!("{name}{marker}: {ty}");
	}
	if text(i) == "=" {
		let ty = expression_type(parsed, i + 1..range.end, names).widen();
		return format!("{name}?: {ty}");
	}
	let marker = if optional { "?" } else { "" };
	let ty = if name.starts_with("...") { "any[]" } else { "any" };
	format!("{name}{marker}: {ty}")
}

/// Source text covered by a token range.
pub(crate) fn span_text(parsed: &Parsed, range: Range<usize>) -> Option<&str> {
	if range.is_empty() {
		return None;
	}
	let first = parsed.token(range.start)?;
	let last = parsed.token(range.end - 1)?;
	parsed.text.get(first.start..last.end)
}

struct Eval<'a> {
	parsed: &'a Parsed,
	names: &'a dyn NameTypes,
	pos: usize,
	end: usize,
}

fn binary_precedence(op: &str) -> Option<u8> {
	Some(match op {
		"??" => 1,
		"||" => 2,
		"&&" => 3,
		"|" => 4,
		"^" => 5,
		"&" => 6,
		"==" | "!=" | "===" | "!==" => 7,
		"<" | ">" | "<=" | ">=" | "instanceof" | "in" | "as" | "satisfies" => 8,
		"<<" | ">>" | ">>>" => 9,
		"+" | "-" => 10,
		"*" | "/" | "%" => 11,
		"**" => 12,
		_ => return None,
	})
}

impl<'a> Eval<'a> {
	fn text(&self, i: usize) -> &'a str {
		if i < self.end { self.parsed.token_text(i) } else { "" }
	}

	fn kind(&self, i: usize) -> Option<LexKind> {
		if i < self.end {
			self.parsed.token(i).map(|l| l.kind)
		} else {
			None
		}
	}

	/// Operator-like text of the current token.
	fn op(&self) -> &str {
		match self.kind(self.pos) {
			Some(LexKind::Punct | LexKind::Operator | LexKind::Keyword) => self.text(self.pos),
			_ => "",
		}
	}

	/// Index of the bracket closing the one at `open`, bounded by the range.
	fn matching(&self, open: usize) -> Option<usize> {
		let mut depth = 0usize;
		for i in open..self.end {
			match self.text(i) {
				"(" | "[" | "{" => depth += 1,
				")" | "]" | "}" => {
					depth = depth.checked_sub(1)?;
					if depth == 0 {
						return Some(i);
					}
				}
				_ => {}
			}
		}
		None
	}

	fn assignment(&mut self) -> Ty {
		let start = self.pos;
		let ty = self.conditional();
		if matches!(self.op(), "=" | "+=" | "-=" | "*=" | "/=" | "??=" | "||=" | "&&=") && self.pos > start {
			self.pos += 1;
			return self.assignment();
		}
		ty
	}

	fn conditional(&mut self) -> Ty {
		let condition = self.binary(0);
		if self.op() != "?" {
			return condition;
		}
		self.pos += 1;
		let then = self.assignment();
		if self.op() == ":" {
			self.pos += 1;
		}
		let otherwise = self.assignment();
		then.union(otherwise)
	}

	fn binary(&mut self, min: u8) -> Ty {
		let mut left = self.unary();
		while let Some(prec) = binary_precedence(self.op())
			&& prec > min
		{
			let op = self.op().to_owned();
			self.pos += 1;
			if matches!(op.as_str(), "as" | "satisfies") {
				let ty = self.type_until_operator();
				if op == "as" {
					left = ty;
				}
				continue;
			}
			let right = if op == "**" { self.binary(prec - 1) } else { self.binary(prec) };
			left = combine(&op, left, right);
		}
		left
	}

	/// Reads a type operand of `as`/`satisfies`.
	fn type_until_operator(&mut self) -> Ty {
		let start = self.pos;
		let mut depth = 0usize;
		while self.pos < self.end {
			match self.text(self.pos) {
				"(" | "[" | "{" | "<" => depth += 1,
				")" | "]" | "}" | ">" if depth == 0 => break,
				")" | "]" | "}" | ">" => depth -= 1,
				"," | ";" | "?" | "&&" | "||" | "??" | "+" | "-" | "*" | "/" if depth == 0 => break,
				_ => {}
			}
			self.pos += 1;
		}
		span_text(self.parsed, start..self.pos).map_or(Ty::Any, Ty::from_annotation)
	}

	fn unary(&mut self) -> Ty {
		match self.op() {
			"!" | "delete" => {
				self.pos += 1;
				self.unary();
				Ty::Boolean
			}
			"-" => {
				self.pos += 1;
				match self.unary() {
					Ty::NumberLit(n) => Ty::NumberLit(format!("-{n}")),
					Ty::BigInt => Ty::BigInt,
					_ => Ty::Number,
				}
			}
			"+" | "~" | "++" | "--" => {
				self.pos += 1;
				self.unary();
				Ty::Number
			}
			"typeof" => {
				self.pos += 1;
				self.unary();
				Ty::String
			}
			"void" => {
				self.pos += 1;
				self.unary();
				Ty::Undefined
			}
			"await" => {
				self.pos += 1;
				self.unary()
			}
			"new" => {
				self.pos += 1;
				let ty = self.construct();
				self.postfix(ty)
			}
			_ => {
				let ty = self.primary();
				self.postfix(ty)
			}
		}
	}

	fn construct(&mut self) -> Ty {
		if self.kind(self.pos) != Some(LexKind::Ident) {
			return Ty::Any;
		}
		let mut name = self.text(self.pos).to_owned();
		self.pos += 1;
		while self.op() == "." && self.kind(self.pos + 1) == Some(LexKind::Ident) {
			name.push('.');
			name.push_str(self.text(self.pos + 1));
			self.pos += 2;
		}
		if self.op() == "<" {
			let start = self.pos;
			let mut depth = 0usize;
			while self.pos < self.end {
				match self.text(self.pos) {
					"<" => depth += 1,
					">" => depth -= 1,
					">>" => depth = depth.saturating_sub(2),
					_ => {}
				}
				self.pos += 1;
				if depth == 0 {
					break;
				}
			}
			if let Some(args) = span_text(self.parsed, start..self.pos) {
				name.push_str(&normalize_whitespace(args));
			}
		}
		if self.op() == "("
			&& let Some(close) = self.matching(self.pos)
		{
			self.pos = close + 1;
		}
		Ty::Named(name)
	}

	fn postfix(&mut self, mut ty: Ty) -> Ty {
		loop {
			match self.op() {
				"." | "?." if self.kind(self.pos + 1) == Some(LexKind::Ident) || self.kind(self.pos + 1) == Some(LexKind::Keyword) => {
					let name = self.text(self.pos + 1).to_owned();
					self.pos += 2;
					ty = member_type(&ty, &name);
				}
				"(" => {
					let Some(close) = self.matching(self.pos) else { return Ty::Any };
					self.pos = close + 1;
					ty = match ty {
						Ty::Function { ret, .. } => *ret,
						_ => Ty::Any,
					};
				}
				"[" => {
					let Some(close) = self.matching(self.pos) else { return Ty::Any };
					self.pos = close + 1;
					ty = match ty {
						Ty::Array(elem) => *elem,
						Ty::String | Ty::StringLit(_) => Ty::String,
						_ => Ty::Any,
					};
				}
				"!" if !matches!(self.text(self.pos + 1), "=" | "==") => self.pos += 1,
				"++" | "--" => {
					self.pos += 1;
					ty = Ty::Number;
				}
				_ => {
					if self.kind(self.pos) == Some(LexKind::Template) {
						self.pos += 1;
						ty = Ty::String;
						continue;
					}
					return ty;
				}
			}
		}
	}

	fn primary(&mut self) -> Ty {
		let Some(kind) = self.kind(self.pos) else { return Ty::Any };
		let text = self.text(self.pos);
		match kind {
			LexKind::Number => {
				self.pos += 1;
				if text.ends_with('n') && !text.starts_with("0x") {
					Ty::BigInt
				} else {
					Ty::NumberLit(text.to_owned())
				}
			}
			LexKind::String => {
				self.pos += 1;
				let inner = text.get(1..text.len().saturating_sub(1)).unwrap_or("");
				Ty::StringLit(inner.to_owned())
			}
			LexKind::Template => {
				self.pos += 1;
				Ty::String
			}
			LexKind::Ident => {
				if self.text(self.pos + 1) == "=>" {
					let param = format!("({text}: any)");
					self.pos += 2;
					return self.arrow_body(param, None);
				}
				let start = self.parsed.token(self.pos).map_or(0, |l| l.start);
				self.pos += 1;
				self.names.ident_type(start)
			}
			LexKind::Keyword => match text {
				"true" => self.advance(Ty::BoolLit(true)),
				"false" => self.advance(Ty::BoolLit(false)),
				"null" => self.advance(Ty::Null),
				"undefined" => self.advance(Ty::Undefined),
				"function" => self.function_expression(),
				"async" => {
					self.pos += 1;
					self.primary()
				}
				_ => self.advance(Ty::Any),
			},
			LexKind::Punct | LexKind::Operator => match text {
				"(" => self.parenthesized(),
				"[" => self.array(),
				"{" => self.object(),
				"<" => {
					self.pos = self.end;
					Ty::Named("JSX.Element".to_owned())
				}
				_ => self.advance(Ty::Any),
			},
			_ => self.advance(Ty::Any),
		}
	}

	fn advance(&mut self, ty: Ty) -> Ty {
		self.pos += 1;
		ty
	}

	fn parenthesized(&mut self) -> Ty {
		let open = self.pos;
		let Some(close) = self.matching(open) else {
			self.pos = self.end;
			return Ty::Any;
		};
		let mut after = close + 1;
		let mut annotated = None;
		if self.text(after) == ":" {
			let start = after + 1;
			let mut i = start;
			while i < self.end && self.text(i) != "=>" {
				i += 1;
			}
			annotated = span_text(self.parsed, start..i).map(Ty::from_annotation);
			after = i;
		}
		if self.text(after) == "=>" {
			let params = params_display(self.parsed, open, close, self.names);
			self.pos = after + 1;
			return self.arrow_body(params, annotated);
		}
		self.pos = open + 1;
		let inner = Eval {
			parsed: self.parsed,
			names: self.names,
			pos: open + 1,
			end: close,
		}
		.assignment();
		self.pos = close + 1;
		inner
	}

	fn arrow_body(&mut self, params: String, annotated: Option<Ty>) -> Ty {
		let ret = if self.op() == "{" {
			let close = self.matching(self.pos).unwrap_or(self.end);
			let ret = self.block_return(self.pos, close);
			self.pos = (close + 1).min(self.end);
			ret
		} else {
			let start = self.pos;
			let mut depth = 0usize;
			while self.pos < self.end {
				match self.text(self.pos) {
					"(" | "[" | "{" => depth += 1,
					")" | "]" | "}" if depth == 0 => break,
					")" | "]" | "}" => depth -= 1,
					"," | ";" if depth == 0 => break,
					_ => {}
				}
				self.pos += 1;
			}
			expression_type(self.parsed, start..self.pos, self.names).widen()
		};
		Ty::Function {
			params,
			ret: Box::new(annotated.unwrap_or(ret)),
		}
	}

	/// Type of the first `return` directly inside the block `open..=close`.
	fn block_return(&self, open: usize, close: usize) -> Ty {
		let mut depth = 0usize;
		for i in open..close {
			match self.text(i) {
				"(" | "[" | "{" => depth += 1,
				")" | "]" | "}" => depth = depth.saturating_sub(1),
				"return" if depth == 1 => {
					let start = i + 1;
					let mut end = start;
					let mut inner = 0usize;
					while end < close {
						match self.text(end) {
							"(" | "[" | "{" => inner += 1,
							")" | "]" | "}" if inner == 0 => break,
							")" | "]" | "}" => inner -= 1,
							";" if inner == 0 => break,
							_ => {}
						}
						end += 1;
					}
					if end == start {
						return Ty::Void;
					}
					return expression_type(self.parsed, start..end, self.names).widen();
				}
				_ => {}
			}
		}
		Ty::Void
	}

	fn function_expression(&mut self) -> Ty {
		self.pos += 1;
		if self.op() == "*" {
			self.pos += 1;
		}
		if self.kind(self.pos) == Some(LexKind::Ident) {
			self.pos += 1;
		}
		if self.op() != "(" {
			return Ty::Any;
		}
		let open = self.pos;
		let Some(close) = self.matching(open) else { return Ty::Any };
		let params = params_display(self.parsed, open, close, self.names);
		self.pos = close + 1;
		let mut annotated = None;
		if self.op() == ":" {
			let start = self.pos + 1;
			let mut i = start;
			while i < self.end && self.text(i) != "{" {
				i += 1;
			}
			annotated = span_text(self.parsed, start..i).map(Ty::from_annotation);
			self.pos = i;
		}
		if self.op() != "{" {
			return Ty::Any;
		}
		let close = self.matching(self.pos).unwrap_or(self.end);
		let ret = annotated.unwrap_or_else(|| self.block_return(self.pos, close));
		self.pos = (close + 1).min(self.end);
		Ty::Function {
			params,
			ret: Box::new(ret),
		}
	}

	fn array(&mut self) -> Ty {
		let open = self.pos;
		let close = self.matching(open).unwrap_or(self.end);
		let mut elem: Option<Ty> = None;
		let mut start = open + 1;
		let mut depth = 0usize;
		for i in open + 1..=close {
			let text = if i == close { "," } else { self.text(i) };
			match text {
				"(" | "[" | "{" => depth += 1,
				")" | "]" | "}" => depth = depth.saturating_sub(1),
				"," if depth == 0 => {
					if i > start {
						let ty = if self.text(start) == "..." {
							match expression_type(self.parsed, start + 1..i, self.names) {
								Ty::Array(inner) => *inner,
								_ => Ty::Any,
							}
						} else {
							expression_type(self.parsed, start..i, self.names)
						};
						let ty = ty.widen();
						elem = Some(match elem {
							Some(prev) => prev.union(ty),
							None => ty,
						});
					}
					start = i + 1;
				}
				_ => {}
			}
		}
		self.pos = (close + 1).min(self.end);
		Ty::Array(Box::new(elem.unwrap_or(Ty::Any)))
	}

	fn object(&mut self) -> Ty {
		let open = self.pos;
		let close = self.matching(open).unwrap_or(self.end);
		let mut fields: Vec<(String, Ty)> = Vec::new();
		let mut start = open + 1;
		let mut depth = 0usize;
		for i in open + 1..=close {
			let text = if i == close { "," } else { self.text(i) };
			match text {
				"(" | "[" | "{" => depth += 1,
				")" | "]" | "}" => depth = depth.saturating_sub(1),
				"," if depth == 0 => {
					if i > start
						&& let Some(field) = self.object_field(start..i)
					{
						fields.retain(|(name, _)| *name != field.0);
						fields.push(field);
					}
					start = i + 1;
				}
				_ => {}
			}
		}
		self.pos = (close + 1).min(self.end);
		Ty::Object(fields)
	}

	fn object_field(&self, range: Range<usize>) -> Option<(String, Ty)> {
		let key_kind = self.kind(range.start)?;
		let raw = self.text(range.start);
		let key = match key_kind {
			LexKind::String => raw.get(1..raw.len().saturating_sub(1))?.to_owned(),
			LexKind::Ident | LexKind::Keyword | LexKind::Number => raw.to_owned(),
			_ => return None,
		};
		match self.text(range.start + 1) {
			":" => {
				let ty = expression_type(self.parsed, range.start + 2..range.end, self.names);
				Some((key, ty.widen()))
			}
			"(" => {
				let close = (range.start + 1..range.end).find(|&i| self.text(i) == ")")?;
				let params = params_display(self.parsed, range.start + 1, close, self.names);
				let body = (close..range.end).find(|&i| self.text(i) == "{")?;
				let end = self.matching(body).unwrap_or(range.end);
				let ret = self.block_return(body, end);
				Some((
					key,
					Ty::Function {
						params,
						ret: Box::new(ret),
					},
				))
			}
			"" if range.len() == 1 && key_kind == LexKind::Ident => {
				let start = self.parsed.token(range.start).map_or(0, |l| l.start);
				Some((key, self.names.ident_type(start).widen()))
			}
			_ => None,
		}
	}
}

fn combine(op: &str, left: Ty, right: Ty) -> Ty {
	match op {
		"+" => {
			if left.is_string_like() || right.is_string_like() {
				Ty::String
			} else if left.is_number_like() && right.is_number_like() {
				Ty::Number
			} else if left == Ty::BigInt && right == Ty::BigInt {
				Ty::BigInt
			} else {
				Ty::Any
			}
		}
		"-" | "*" | "/" | "%" | "**" | "<<" | ">>" | ">>>" | "&" | "|" | "^" => {
			if left == Ty::BigInt && right == Ty::BigInt {
				Ty::BigInt
			} else {
				Ty::Number
			}
		}
		"==" | "!=" | "===" | "!==" | "<" | ">" | "<=" | ">=" | "instanceof" | "in" => Ty::Boolean,
		"&&" => right,
		"||" | "??" => left.union(right),
		_ => Ty::Any,
	}
}

fn member_type(ty: &Ty, name: &str) -> Ty {
	match ty {
		Ty::Object(fields) => fields
			.iter()
			.find(|(field, _)| field == name)
			.map_or(Ty::Any, |(_, ty)| ty.clone()),
		Ty::Array(_) | Ty::String | Ty::StringLit(_) if name == "length" => Ty::Number,
		_ => Ty::Any,
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;

	struct NoNames;

	impl NameTypes for NoNames {
		fn ident_type(&self, _start: usize) -> Ty {
			Ty::Any
		}
	}

	fn infer(src: &str) -> String {
		let parsed = Parsed::parse(src.into(), 0, false);
		expression_type(&parsed, 0..parsed.code.len(), &NoNames).to_string()
	}

	#[test]
	fn test_literals() {
		assert_eq!(infer("1"), "1");
		assert_eq!(infer("'abc'"), "\"abc\"");
		assert_eq!(infer("`t`"), "string");
		assert_eq!(infer("true"), "true");
		assert_eq!(infer("null"), "null");
		assert_eq!(infer("-5"), "-5");
	}

	#[test]
	fn test_operators() {
		assert_eq!(infer("1 + 2"), "number");
		assert_eq!(infer("'a' + 1"), "string");
		assert_eq!(infer("3 * 4 - 1"), "number");
		assert_eq!(infer("1 < 2"), "boolean");
		assert_eq!(infer("!0"), "boolean");
		assert_eq!(infer("typeof 1"), "string");
		assert_eq!(infer("1 > 0 ? 'y' : 'n'"), "\"y\" | \"n\"");
	}

	#[test]
	fn test_containers() {
		assert_eq!(infer("[1, 2, 3]"), "number[]");
		assert_eq!(infer("[1, 'a']"), "(number | string)[]");
		assert_eq!(infer("{ a: 1, b: 'x' }"), "{ a: number; b: string; }");
		assert_eq!(infer("{ a: 1 }.a"), "number");
		assert_eq!(infer("[1].length"), "number");
	}

	#[test]
	fn test_functions() {
		assert_eq!(infer("(a: number, b) => a"), "(a: number, b: any) => any");
		assert_eq!(infer("(n = 1): string => 'x'"), "(n?: number) => string");
		assert_eq!(infer("function (x: string) { return 1; }"), "(x: string) => number");
		assert_eq!(infer("(() => 'x')()"), "string");
		assert_eq!(infer("new Map<string, number>()"), "Map<string, number>");
	}

	#[test]
	fn test_annotations() {
		assert_eq!(Ty::from_annotation("number"), Ty::Number);
		assert_eq!(Ty::from_annotation("string[]"), Ty::Array(Box::new(Ty::String)));
		assert_eq!(
			Ty::from_annotation("'a' | 'b'"),
			Ty::Union(vec![Ty::StringLit("a".into()), Ty::StringLit("b".into())])
		);
		assert_eq!(Ty::from_annotation("Record<string,\n number>").to_string(), "Record<string, number>");
	}

	#[test]
	fn test_assignability() {
		assert!(Ty::NumberLit("1".into()).assignable_to(&Ty::Number));
		assert!(!Ty::StringLit("a".into()).assignable_to(&Ty::Number));
		assert!(!Ty::NumberLit("2".into()).assignable_to(&Ty::NumberLit("1".into())));
		assert!(Ty::Named("Foo".into()).assignable_to(&Ty::Number));
	}
}

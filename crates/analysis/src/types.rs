//! Engine-native result types.
//!
//! Offsets are byte offsets into the full text of the analyzed file.

use std::ops::Range;

use serde::{Deserialize, Serialize};

/// A half-open byte range `[start, start + length)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TextSpan {
	pub start: usize,
	pub length: usize,
}

impl TextSpan {
	pub const fn new(start: usize, length: usize) -> Self {
		Self { start, length }
	}

	/// Span covering `range`; an inverted range yields an empty span at `start`.
	pub fn from_range(range: Range<usize>) -> Self {
		Self::new(range.start, range.end.saturating_sub(range.start))
	}

	pub const fn end(&self) -> usize {
		self.start + self.length
	}

	pub fn range(&self) -> Range<usize> {
		self.start..self.end()
	}

	pub const fn is_empty(&self) -> bool {
		self.length == 0
	}

	pub const fn contains(&self, pos: usize) -> bool {
		pos >= self.start && pos < self.end()
	}

	/// True when the spans share at least one byte, or when an empty span sits
	/// inside `self`.
	pub const fn intersects(&self, other: &TextSpan) -> bool {
		if other.length == 0 {
			return other.start >= self.start && other.start <= self.end();
		}
		other.start < self.end() && self.start < other.end()
	}
}

/// Incremental change handed to an engine after an edit.
///
/// `span` is the replaced range in the previous text; `new_length` is the
/// byte length of the inserted text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextChange {
	pub span: TextSpan,
	pub new_length: usize,
}

/// Kind of a classified span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ClassificationKind {
	Comment,
	Identifier,
	Keyword,
	NumericLiteral,
	Operator,
	StringLiteral,
	Punctuation,
	Text,
	ClassName,
	EnumName,
	InterfaceName,
	TypeAliasName,
	TypeParameterName,
	ParameterName,
	JsxOpenTagName,
	JsxAttribute,
	JsxText,
}

impl ClassificationKind {
	/// Name used in rendered output and style class names.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Comment => "comment",
			Self::Identifier => "identifier",
			Self::Keyword => "keyword",
			Self::NumericLiteral => "numericLiteral",
			Self::Operator => "operator",
			Self::StringLiteral => "stringLiteral",
			Self::Punctuation => "punctuation",
			Self::Text => "text",
			Self::ClassName => "className",
			Self::EnumName => "enumName",
			Self::InterfaceName => "interfaceName",
			Self::TypeAliasName => "typeAliasName",
			Self::TypeParameterName => "typeParameterName",
			Self::ParameterName => "parameterName",
			Self::JsxOpenTagName => "jsxOpenTagName",
			Self::JsxAttribute => "jsxAttribute",
			Self::JsxText => "jsxText",
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedSpan {
	pub span: TextSpan,
	pub kind: ClassificationKind,
}

impl ClassifiedSpan {
	pub const fn new(span: TextSpan, kind: ClassificationKind) -> Self {
		Self { span, kind }
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DiagnosticCategory {
	Warning,
	Error,
	Suggestion,
	Message,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
	pub span: TextSpan,
	pub message: String,
	pub code: u32,
	pub category: DiagnosticCategory,
	/// Marks "unused" style findings that editors render faded rather than
	/// underlined.
	pub reports_unnecessary: bool,
}

impl Diagnostic {
	pub fn error(span: TextSpan, code: u32, message: impl Into<String>) -> Self {
		Self {
			span,
			message: message.into(),
			code,
			category: DiagnosticCategory::Error,
			reports_unnecessary: false,
		}
	}

	pub fn unnecessary(span: TextSpan, code: u32, message: impl Into<String>) -> Self {
		Self {
			span,
			message: message.into(),
			code,
			category: DiagnosticCategory::Suggestion,
			reports_unnecessary: true,
		}
	}
}

/// What kind of declaration a quick-info result describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScriptElementKind {
	#[serde(rename = "let")]
	Let,
	#[serde(rename = "const")]
	Const,
	#[serde(rename = "var")]
	Var,
	#[serde(rename = "function")]
	Function,
	#[serde(rename = "parameter")]
	Parameter,
	#[serde(rename = "class")]
	Class,
	#[serde(rename = "interface")]
	Interface,
	#[serde(rename = "type")]
	TypeAlias,
	#[serde(rename = "enum")]
	Enum,
	#[serde(rename = "type parameter")]
	TypeParameter,
	#[serde(rename = "alias")]
	Alias,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DisplayPartKind {
	Keyword,
	Space,
	Punctuation,
	Operator,
	Text,
	LocalName,
	FunctionName,
	ParameterName,
	ClassName,
	InterfaceName,
	EnumName,
	AliasName,
	TypeParameterName,
	NumericLiteral,
	StringLiteral,
	LineBreak,
}

/// One styled fragment of a quick-info display string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayPart {
	pub text: String,
	pub kind: DisplayPartKind,
}

impl DisplayPart {
	pub fn new(text: impl Into<String>, kind: DisplayPartKind) -> Self {
		Self {
			text: text.into(),
			kind,
		}
	}

	pub fn space() -> Self {
		Self::new(" ", DisplayPartKind::Space)
	}
}

/// Hover information for the identifier under a position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickInfo {
	pub kind: ScriptElementKind,
	/// Span of the identifier the position hit.
	pub span: TextSpan,
	pub display_parts: Vec<DisplayPart>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub documentation: Vec<DisplayPart>,
}

impl QuickInfo {
	/// Display parts concatenated into plain text.
	pub fn display_string(&self) -> String {
		self.display_parts.iter().map(|part| part.text.as_str()).collect()
	}

	pub fn documentation_string(&self) -> String {
		self.documentation.iter().map(|part| part.text.as_str()).collect()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_span_intersection() {
		let span = TextSpan::new(10, 5);
		assert!(span.intersects(&TextSpan::new(14, 3)));
		assert!(!span.intersects(&TextSpan::new(15, 3)));
		assert!(span.intersects(&TextSpan::new(12, 0)));
		assert!(!span.intersects(&TextSpan::new(2, 8)));
		assert!(span.contains(10));
		assert!(!span.contains(15));
	}

	#[test]
	fn test_inverted_range_is_empty() {
		let span = TextSpan::from_range(8..3);
		assert_eq!(span, TextSpan::new(8, 0));
		assert!(span.is_empty());
	}
}

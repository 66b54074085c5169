//! Line tokens.

use std::fmt::Write as _;

use quill_analysis::{ClassificationKind, DiagnosticCategory};
use serde::{Deserialize, Serialize};

/// One styled range of a line. Offsets are line relative and half open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Token {
	/// Grammar scopes, outermost first.
	Lexical {
		start: usize,
		end: usize,
		scopes: Vec<String>,
	},
	/// An identifier the analysis engine classified.
	#[serde(rename_all = "camelCase")]
	Identifier {
		start: usize,
		end: usize,
		classification: ClassificationKind,
		/// Absolute offset of the identifier in the analyzed file, used for
		/// hover lookups.
		source_position: usize,
	},
	Diagnostic {
		start: usize,
		end: usize,
		message: String,
		code: u32,
		category: DiagnosticCategory,
	},
}

impl Token {
	pub fn start(&self) -> usize {
		match self {
			Self::Lexical { start, .. } | Self::Identifier { start, .. } | Self::Diagnostic { start, .. } => *start,
		}
	}

	pub fn end(&self) -> usize {
		match self {
			Self::Lexical { end, .. } | Self::Identifier { end, .. } | Self::Diagnostic { end, .. } => *end,
		}
	}

	/// Appends this token's identity, `kind.start.end`, to `out`.
	fn write_hash(&self, out: &mut String) {
		let _ = match self {
			Self::Lexical { start, end, scopes } => write!(out, "{}.{start}.{end}", scopes.join(" ")),
			Self::Identifier {
				start,
				end,
				classification,
				..
			} => write!(out, "{}.{start}.{end}", classification.as_str()),
			Self::Diagnostic {
				start, end, code, ..
			} => write!(out, "diagnostic-{code}.{start}.{end}"),
		};
	}
}

/// Splits a document into lines the way every tokenizer indexes them: on
/// `'\n'`, keeping a trailing empty line.
pub fn lines(text: &str) -> std::str::Split<'_, char> {
	text.split('\n')
}

/// Tokens of one line plus a hash identifying how the line renders.
///
/// Two lines render identically exactly when their hashes are equal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineTokens {
	pub hash: String,
	pub tokens: Vec<Token>,
}

impl LineTokens {
	pub fn new() -> Self {
		Self::default()
	}

	/// Appends `token` and folds it into the hash.
	pub fn push(&mut self, token: Token) {
		self.hash.push(':');
		token.write_hash(&mut self.hash);
		self.tokens.push(token);
	}

	pub fn is_empty(&self) -> bool {
		self.tokens.is_empty()
	}
}

impl FromIterator<Token> for LineTokens {
	fn from_iter<I: IntoIterator<Item = Token>>(iter: I) -> Self {
		let mut line = Self::new();
		for token in iter {
			line.push(token);
		}
		line
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;

	fn lexical(start: usize, end: usize, scope: &str) -> Token {
		Token::Lexical {
			start,
			end,
			scopes: vec!["source.ts".into(), scope.into()],
		}
	}

	#[test]
	fn test_hash_is_order_and_content_sensitive() {
		let a: LineTokens = [lexical(0, 5, "keyword"), lexical(5, 6, "punctuation")].into_iter().collect();
		let b: LineTokens = [lexical(5, 6, "punctuation"), lexical(0, 5, "keyword")].into_iter().collect();
		let c: LineTokens = [lexical(0, 5, "keyword"), lexical(5, 7, "punctuation")].into_iter().collect();
		assert_eq!(a.hash, ":source.ts keyword.0.5:source.ts punctuation.5.6");
		assert_ne!(a.hash, b.hash);
		assert_ne!(a.hash, c.hash);
	}

	#[test]
	fn test_token_serializes_with_type_tag() {
		let token = Token::Identifier {
			start: 0,
			end: 1,
			classification: ClassificationKind::ParameterName,
			source_position: 12,
		};
		let json = serde_json::to_value(&token).unwrap();
		assert_eq!(
			json,
			serde_json::json!({
				"type": "identifier",
				"start": 0,
				"end": 1,
				"classification": "parameterName",
				"sourcePosition": 12,
			})
		);
	}
}

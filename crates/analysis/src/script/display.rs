//! Quick-info rendering.

use std::sync::Arc;

use super::infer::{Ty, normalize_whitespace};
use super::lexer::LexKind;
use super::parse::{DeclKind, VarKind};
use super::program::{Program, SymbolRef};
use crate::types::{DisplayPart, DisplayPartKind, QuickInfo, ScriptElementKind};

/// Hover information for the identifier at byte `position` of `path`.
pub(crate) fn quick_info(program: &Program, path: &Arc<str>, position: usize) -> Option<QuickInfo> {
	let parsed = program.file(path)?;
	let lexeme = parsed.lexeme_at(position)?;
	if lexeme.kind != LexKind::Ident {
		return None;
	}
	let sym = program.symbol_at(path, lexeme.start)?;
	let (kind, display_parts) = symbol_parts(program, &sym)?;
	let documentation = program
		.import_target(&sym)
		.and_then(|target| program.decl(&target)?.1.doc.clone())
		.map(|doc| vec![DisplayPart::new(doc, DisplayPartKind::Text)])
		.unwrap_or_default();
	Some(QuickInfo {
		kind,
		span: lexeme.span(),
		display_parts,
		documentation,
	})
}

fn symbol_parts(program: &Program, sym: &SymbolRef) -> Option<(ScriptElementKind, Vec<DisplayPart>)> {
	let (parsed, decl) = program.decl(sym)?;
	let mut parts = Parts::default();
	let kind = match &decl.kind {
		DeclKind::Variable(var) => {
			let (keyword, kind) = match var {
				VarKind::Let => ("let", ScriptElementKind::Let),
				VarKind::Const => ("const", ScriptElementKind::Const),
				VarKind::Var => ("var", ScriptElementKind::Var),
			};
			parts.keyword(keyword).space().push(&decl.name, DisplayPartKind::LocalName);
			parts.annotation(&program.symbol_type(sym));
			kind
		}
		DeclKind::Parameter => {
			parts
				.tag("parameter")
				.push(&decl.name, DisplayPartKind::ParameterName);
			parts.annotation(&program.symbol_type(sym));
			ScriptElementKind::Parameter
		}
		DeclKind::Function => {
			parts.keyword("function").space().push(&decl.name, DisplayPartKind::FunctionName);
			if let Some(type_params) = decl.type_params.clone().and_then(|range| parsed.text.get(range)) {
				parts.type_text(&normalize_whitespace(type_params));
			}
			match program.symbol_type(sym) {
				Ty::Function { params, ret } => {
					parts.type_text(&params);
					parts.annotation(&ret);
				}
				other => {
					parts.annotation(&other);
				}
			}
			ScriptElementKind::Function
		}
		DeclKind::Class => {
			parts.keyword("class").space().push(&decl.name, DisplayPartKind::ClassName);
			ScriptElementKind::Class
		}
		DeclKind::Interface => {
			parts.keyword("interface").space().push(&decl.name, DisplayPartKind::InterfaceName);
			ScriptElementKind::Interface
		}
		DeclKind::Enum => {
			parts.keyword("enum").space().push(&decl.name, DisplayPartKind::EnumName);
			ScriptElementKind::Enum
		}
		DeclKind::TypeAlias => {
			parts.keyword("type").space().push(&decl.name, DisplayPartKind::AliasName);
			if let Some(type_params) = decl.type_params.clone().and_then(|range| parsed.text.get(range)) {
				parts.type_text(&normalize_whitespace(type_params));
			}
			if let Some(aliased) = decl.annotation.clone().and_then(|range| parsed.text.get(range)) {
				parts.space().push("=", DisplayPartKind::Operator).space();
				parts.type_text(&normalize_whitespace(aliased));
			}
			ScriptElementKind::TypeAlias
		}
		DeclKind::TypeParameter => {
			parts
				.tag("type parameter")
				.push(&decl.name, DisplayPartKind::TypeParameterName);
			ScriptElementKind::TypeParameter
		}
		DeclKind::Import { .. } => {
			parts.tag("alias");
			let target = program.import_target(sym).filter(|target| target != sym);
			if let Some((_, inner)) = target.as_ref().and_then(|target| symbol_parts(program, target)) {
				parts.0.extend(inner);
				parts.push("\n", DisplayPartKind::LineBreak);
			}
			parts.keyword("import").space().push(&decl.name, DisplayPartKind::AliasName);
			ScriptElementKind::Alias
		}
	};
	Some((kind, parts.0))
}

#[derive(Default)]
struct Parts(Vec<DisplayPart>);

impl Parts {
	fn push(&mut self, text: &str, kind: DisplayPartKind) -> &mut Self {
		self.0.push(DisplayPart::new(text, kind));
		self
	}

	fn keyword(&mut self, text: &str) -> &mut Self {
		self.push(text, DisplayPartKind::Keyword)
	}

	fn space(&mut self) -> &mut Self {
		self.0.push(DisplayPart::space());
		self
	}

	/// `(label) `
	fn tag(&mut self, label: &str) -> &mut Self {
		self.push("(", DisplayPartKind::Punctuation)
			.push(label, DisplayPartKind::Text)
			.push(")", DisplayPartKind::Punctuation)
			.space()
	}

	/// `: T`
	fn annotation(&mut self, ty: &Ty) -> &mut Self {
		self.push(":", DisplayPartKind::Punctuation).space();
		self.type_text(&ty.to_string())
	}

	fn type_text(&mut self, text: &str) -> &mut Self {
		self.0.extend(type_parts(text));
		self
	}
}

const TYPE_KEYWORDS: &[&str] = &[
	"any", "bigint", "boolean", "false", "keyof", "never", "null", "number", "object", "readonly", "string",
	"symbol", "true", "typeof", "undefined", "unknown", "void",
];

/// Splits a rendered type into display parts.
pub(crate) fn type_parts(text: &str) -> Vec<DisplayPart> {
	let bytes = text.as_bytes();
	let mut parts = Vec::new();
	let mut i = 0;
	while i < bytes.len() {
		let start = i;
		let b = bytes[i];
		let kind = if b.is_ascii_whitespace() {
			while i < bytes.len() && bytes[i].is_ascii_whitespace() {
				i += 1;
			}
			DisplayPartKind::Space
		} else if b == b'"' || b == b'\'' || b == b'`' {
			i += 1;
			while i < bytes.len() && bytes[i] != b {
				i += if bytes[i] == b'\\' { 2 } else { 1 };
			}
			i = (i + 1).min(bytes.len());
			DisplayPartKind::StringLiteral
		} else if b.is_ascii_digit() || (b == b'-' && bytes.get(i + 1).is_some_and(u8::is_ascii_digit)) {
			i += 1;
			while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'.' || bytes[i] == b'_') {
				i += 1;
			}
			DisplayPartKind::NumericLiteral
		} else if b.is_ascii_alphabetic() || b == b'_' || b == b'$' || (b == b'.' && text[i..].starts_with("...")) {
			if b == b'.' {
				i += 3;
			}
			while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_' || bytes[i] == b'$') {
				i += 1;
			}
			let word = &text[start..i];
			let rest = text[i..].trim_start();
			if TYPE_KEYWORDS.contains(&word) {
				DisplayPartKind::Keyword
			} else if rest.starts_with(':') || rest.starts_with("?:") {
				DisplayPartKind::ParameterName
			} else {
				DisplayPartKind::Text
			}
		} else if text[i..].starts_with("=>") {
			i += 2;
			DisplayPartKind::Operator
		} else if !b.is_ascii() {
			i += text[i..].chars().next().map_or(1, char::len_utf8);
			DisplayPartKind::Text
		} else {
			i += 1;
			match b {
				b'|' | b'&' | b'=' => DisplayPartKind::Operator,
				_ => DisplayPartKind::Punctuation,
			}
		};
		i = i.min(bytes.len());
		let Some(slice) = text.get(start..i) else { break };
		parts.push(DisplayPart::new(slice, kind));
	}
	parts
}

#[cfg(test)]
mod tests {
	use indexmap::IndexMap;
	use pretty_assertions::assert_eq;

	use super::*;
	use crate::script::parse::Parsed;

	fn hover(files: &[(&str, &str)], modules: &[(&str, &str)], needle: &str) -> Option<QuickInfo> {
		let parsed: Vec<_> = files
			.iter()
			.map(|(path, text)| (Arc::from(*path), Arc::new(Parsed::parse((*text).into(), 0, false))))
			.collect();
		let modules: IndexMap<String, String> = modules
			.iter()
			.map(|(name, path)| ((*name).to_owned(), (*path).to_owned()))
			.collect();
		let program = Program::new(parsed, &modules);
		let position = files[0].1.find(needle)?;
		quick_info(&program, &Arc::from(files[0].0), position)
	}

	fn display(src: &str, needle: &str) -> String {
		hover(&[("/a.ts", src)], &[], needle).map(|info| info.display_string()).unwrap_or_default()
	}

	#[test]
	fn test_declaration_displays() {
		let src = "let x = 1;\nconst one = 1;\n/** Doubles. */\nfunction twice(a: number, b = 'x'): number { return a * 2; }\nclass Box<T> {}\ninterface Shape {}\ntype Id = string | number;\nenum Mode { A }";
		assert_eq!(display(src, "x ="), "let x: number");
		assert_eq!(display(src, "one"), "const one: 1");
		assert_eq!(display(src, "twice"), "function twice(a: number, b?: string): number");
		assert_eq!(display(src, "a:"), "(parameter) a: number");
		assert_eq!(display(src, "Box"), "class Box");
		assert_eq!(display(src, "T>"), "(type parameter) T");
		assert_eq!(display(src, "Shape"), "interface Shape");
		assert_eq!(display(src, "Id"), "type Id = string | number");
		assert_eq!(display(src, "Mode"), "enum Mode");
	}

	#[test]
	fn test_reference_shows_declaration_and_docs() {
		let src = "/** Doubles. */\nfunction twice(a: number) { return a * 2; }\ntwice(2);";
		let info = hover(&[("/a.ts", src)], &[], "twice(2").unwrap();
		assert_eq!(info.kind, ScriptElementKind::Function);
		assert_eq!(info.display_string(), "function twice(a: number): number");
		assert_eq!(info.documentation_string(), "Doubles.");
		assert_eq!(info.span.length, "twice".len());
	}

	#[test]
	fn test_alias_display() {
		let files = [
			("/a.ts", "import { greet, gone } from 'lib';\ngreet();"),
			("/lib.d.ts", "export declare function greet(): string;"),
		];
		let info = hover(&files, &[("lib", "/lib.d.ts")], "greet()").unwrap();
		assert_eq!(info.kind, ScriptElementKind::Alias);
		assert_eq!(info.display_string(), "(alias) function greet(): string\nimport greet");
		let info = hover(&files, &[("lib", "/lib.d.ts")], "gone").unwrap();
		assert_eq!(info.display_string(), "(alias) import gone");
	}

	#[test]
	fn test_non_identifiers_have_no_info() {
		assert_eq!(hover(&[("/a.ts", "let x = 1;")], &[], "1"), None);
		assert_eq!(hover(&[("/a.ts", "let x = 1;")], &[], "let"), None);
	}

	#[test]
	fn test_type_parts_kinds() {
		let kinds: Vec<_> = type_parts("(a: number) => \"s\"")
			.into_iter()
			.map(|part| (part.text, part.kind))
			.collect();
		assert_eq!(
			kinds,
			vec![
				("(".to_owned(), DisplayPartKind::Punctuation),
				("a".to_owned(), DisplayPartKind::ParameterName),
				(":".to_owned(), DisplayPartKind::Punctuation),
				(" ".to_owned(), DisplayPartKind::Space),
				("number".to_owned(), DisplayPartKind::Keyword),
				(")".to_owned(), DisplayPartKind::Punctuation),
				(" ".to_owned(), DisplayPartKind::Space),
				("=>".to_owned(), DisplayPartKind::Operator),
				(" ".to_owned(), DisplayPartKind::Space),
				("\"s\"".to_owned(), DisplayPartKind::StringLiteral),
			]
		);
	}
}

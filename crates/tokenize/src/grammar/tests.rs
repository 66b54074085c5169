use pretty_assertions::assert_eq;
use proptest::prelude::*;

use super::*;

fn typescript() -> Arc<Grammar> {
	GrammarRegistry::with_builtin().unwrap().get("ts").unwrap()
}

fn markdown() -> Arc<Grammar> {
	GrammarRegistry::with_builtin().unwrap().get("md").unwrap()
}

/// `(start, end, innermost scope)` per range.
fn summary(ranges: &[ScopedRange]) -> Vec<(usize, usize, &str)> {
	ranges
		.iter()
		.map(|range| (range.start, range.end, range.scopes.last().map_or("", String::as_str)))
		.collect()
}

#[test]
fn test_declaration_keyword_scopes() {
	let (ranges, state) = typescript().tokenize_line("const x = 1;", &GrammarState::initial());
	assert_eq!(
		summary(&ranges),
		vec![
			(0, 5, "keyword.declaration.ts"),
			(5, 6, "source.ts"),
			(6, 7, "variable.other.readwrite.ts"),
			(7, 8, "source.ts"),
			(8, 9, "keyword.operator.ts"),
			(9, 10, "source.ts"),
			(10, 11, "constant.numeric.ts"),
			(11, 12, "punctuation.separator.ts"),
		]
	);
	assert_eq!(ranges[0].scopes, vec!["source.ts", "keyword.declaration.ts"]);
	assert_eq!(state, GrammarState::initial());
}

#[test]
fn test_block_comment_carries_state() {
	let grammar = typescript();
	let (first, state) = grammar.tokenize_line("let a; /* open", &GrammarState::initial());
	assert_eq!(state.depth(), 1);
	assert_eq!(
		summary(&first)[first.len() - 2..],
		[(7, 9, "punctuation.definition.comment.ts"), (9, 14, "comment.block.ts")]
	);

	let (second, state) = grammar.tokenize_line("still */ let b;", &state);
	assert_eq!(state.depth(), 0);
	assert_eq!(
		summary(&second)[..4],
		[
			(0, 6, "comment.block.ts"),
			(6, 8, "punctuation.definition.comment.ts"),
			(8, 9, "source.ts"),
			(9, 12, "keyword.declaration.ts"),
		]
	);
	assert_eq!(second[1].scopes, vec!["source.ts", "comment.block.ts", "punctuation.definition.comment.ts"]);

	let (fresh, _) = grammar.tokenize_line("still */ let b;", &GrammarState::initial());
	assert_eq!(summary(&fresh)[0], (0, 5, "variable.other.readwrite.ts"));
}

#[test]
fn test_end_pattern_backreference() {
	let grammar = markdown();
	let (open, state) = grammar.tokenize_line("````ts", &GrammarState::initial());
	assert_eq!(
		summary(&open),
		vec![
			(0, 4, "punctuation.definition.markdown"),
			(4, 6, "fenced_code.block.language.markdown"),
		]
	);
	let (_, shorter) = grammar.tokenize_line("```ts", &GrammarState::initial());
	assert_ne!(state, shorter);

	let (body, state) = grammar.tokenize_line("```", &state);
	assert_eq!(state.depth(), 1);
	assert_eq!(
		body[0].scopes,
		vec!["text.html.markdown", "markup.fenced_code.block.markdown", "markup.raw.block.markdown"]
	);

	let (close, state) = grammar.tokenize_line("````", &state);
	assert_eq!(state.depth(), 0);
	assert_eq!(summary(&close), vec![(0, 4, "punctuation.definition.markdown")]);
}

#[test]
fn test_overlong_line_is_unscoped() {
	let grammar = typescript();
	let (_, open) = grammar.tokenize_line("/*", &GrammarState::initial());
	let line = "a".repeat(MAX_LINE_LENGTH + 1);
	let (ranges, state) = grammar.tokenize_line(&line, &open);
	assert_eq!(
		ranges,
		vec![ScopedRange {
			start: 0,
			end: line.len(),
			scopes: vec!["source.ts".into()],
		}]
	);
	assert_eq!(state, open);
}

#[test]
fn test_compile_errors() {
	let err = Grammar::from_json(r##"{"scopeName":"source.x","patterns":[{"include":"#missing"}]}"##).unwrap_err();
	assert!(matches!(err, TokenizeError::UnknownInclude { include, .. } if include == "#missing"));

	let err = Grammar::from_json(r#"{"scopeName":"source.x","patterns":[{"match":"("}]}"#).unwrap_err();
	assert!(matches!(err, TokenizeError::InvalidPattern { pattern, .. } if pattern == "("));

	let err = Grammar::from_json(r#"{"scopeName":"source.x","patterns":[{"begin":"a"}]}"#).unwrap_err();
	assert!(matches!(err, TokenizeError::MissingEnd { .. }));

	let err = Grammar::from_json(r#"{"scopeName":"source.x","patterns":[{}]}"#).unwrap_err();
	assert!(matches!(err, TokenizeError::EmptyRule { grammar } if grammar == "source.x"));

	let err = Grammar::from_json("[").unwrap_err();
	assert!(matches!(err, TokenizeError::InvalidGrammar(_)));
}

#[test]
fn test_registry_tags() {
	let registry = GrammarRegistry::with_builtin().unwrap();
	assert_eq!(registry.get("TSX").unwrap().name(), "typescript");
	assert_eq!(registry.get("bash").unwrap().scope_name(), "source.shell");
	assert!(registry.contains("yml"));
	assert!(matches!(registry.get("cobol"), Err(TokenizeError::UnknownLanguage(tag)) if tag == "cobol"));

	let mut registry = registry;
	registry
		.register_json(r#"{"name":"plain","scopeName":"text.plain","aliases":["md"]}"#)
		.unwrap();
	assert_eq!(registry.get("md").unwrap().name(), "plain");
	assert_eq!(registry.get("markdown").unwrap().name(), "markdown");
}

proptest! {
	#[test]
	fn prop_ranges_tile_the_line(line in "[ -~é]{0,80}") {
		let (ranges, _) = typescript().tokenize_line(&line, &GrammarState::initial());
		let mut pos = 0;
		for range in &ranges {
			prop_assert_eq!(range.start, pos);
			prop_assert!(range.start < range.end);
			pos = range.end;
		}
		prop_assert_eq!(pos, line.len());
	}
}

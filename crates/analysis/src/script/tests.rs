use pretty_assertions::assert_eq;
use quill_vfs::{CompilerHost, DEFAULT_LIB_FILE};

use super::*;
use crate::types::ClassificationKind;

const CORE: &str = "declare var console: { log(...args: any[]): void };";

fn host(source: &str) -> CompilerHost {
	let mut host = CompilerHost::default();
	host.add_library(DEFAULT_LIB_FILE, CORE);
	host.add_root("/index.ts", source);
	host
}

fn cx(host: &CompilerHost, project_version: u64) -> EngineContext<'_> {
	EngineContext { host, project_version }
}

#[test]
fn test_parse_cache_follows_file_version() {
	let mut engine = ScriptEngine::new();
	let mut host = host("let a = 1;");
	let first = engine.parsed(&host, "/index.ts").unwrap();
	let again = engine.parsed(&host, "/index.ts").unwrap();
	assert!(Arc::ptr_eq(&first, &again));

	host.replace("/index.ts", "let a = 2;");
	let changed = engine.parsed(&host, "/index.ts").unwrap();
	assert!(!Arc::ptr_eq(&first, &changed));
	assert_eq!(changed.version, 1);
}

#[test]
fn test_semantic_results_track_project_version() {
	let mut engine = ScriptEngine::new();
	let mut host = host("console.log(missing);");
	let diagnostics = engine.semantic_diagnostics(cx(&host, 1), "/index.ts");
	assert_eq!(diagnostics.iter().map(|d| d.code).collect::<Vec<_>>(), vec![2304]);

	host.replace("/index.ts", "let missing = 1;\nconsole.log(missing);");
	let change = TextChange {
		span: TextSpan::new(0, 0),
		new_length: 17,
	};
	engine.file_changed(cx(&host, 2), "/index.ts", &change);
	assert_eq!(engine.semantic_diagnostics(cx(&host, 2), "/index.ts"), Vec::new());
}

#[test]
fn test_classifications_are_filtered_by_span() {
	let mut engine = ScriptEngine::new();
	let host = host("function f(p: number) {}\nf(1);");
	let all = engine.syntactic_classifications(cx(&host, 1), "/index.ts", TextSpan::new(0, 100));
	assert_eq!(all[0].kind, ClassificationKind::Keyword);
	let tail = engine.syntactic_classifications(cx(&host, 1), "/index.ts", TextSpan::new(25, 5));
	assert!(tail.iter().all(|c| c.span.end() >= 25));

	let semantic = engine.semantic_classifications(cx(&host, 1), "/index.ts", TextSpan::new(0, 100));
	assert_eq!(semantic, vec![ClassifiedSpan::new(TextSpan::new(11, 1), ClassificationKind::ParameterName)]);
}

#[test]
fn test_module_library_only_visible_through_import() {
	let mut engine = ScriptEngine::new();
	let mut host = host("import { version } from 'pkg';\nlet v = version;\nlet w = hidden;");
	host.add_library("/node_modules/pkg/index.d.ts", "export declare const version: string;\ndeclare const hidden: number;");
	engine.library_added("/node_modules/pkg/index.d.ts", Some("pkg"));

	let codes: Vec<_> = engine
		.semantic_diagnostics(cx(&host, 1), "/index.ts")
		.into_iter()
		.map(|d| d.code)
		.collect();
	assert_eq!(codes, vec![2304]);
	let info = engine.quick_info(cx(&host, 1), "/index.ts", 35).unwrap();
	assert_eq!(info.display_string(), "let v: string");
}

#[test]
fn test_unknown_path_yields_nothing() {
	let mut engine = ScriptEngine::new();
	let host = host("");
	assert!(engine.syntactic_diagnostics(cx(&host, 1), "/nope.ts").is_empty());
	assert!(engine.semantic_diagnostics(cx(&host, 1), "/nope.ts").is_empty());
	assert_eq!(engine.quick_info(cx(&host, 1), "/nope.ts", 0), None);
}

#[test]
fn test_jsx_only_in_jsx_files() {
	let mut engine = ScriptEngine::new();
	let mut host = host("");
	host.add_root("/view.tsx", "const el = <div className=\"x\">hi</div>;");
	let kinds: Vec<_> = engine
		.syntactic_classifications(cx(&host, 1), "/view.tsx", TextSpan::new(0, 100))
		.into_iter()
		.map(|c| c.kind)
		.collect();
	assert!(kinds.contains(&ClassificationKind::JsxAttribute));
	assert!(kinds.contains(&ClassificationKind::JsxText));
}

#[test]
fn test_dispose_clears_caches() {
	let mut engine = ScriptEngine::new();
	let host = host("let a = 1;");
	engine.semantic_diagnostics(cx(&host, 1), "/index.ts");
	engine.dispose();
	assert!(engine.parsed.is_empty());
	assert!(engine.program.is_none());
	assert!(engine.checked.is_empty());
}

use pretty_assertions::assert_eq;
use proptest::prelude::*;

use super::*;
use crate::libs::{ExtraLibrary, LibraryFile};
use crate::types::ScriptElementKind;

/// Records every engine callback.
#[derive(Debug, Default)]
struct RecordingEngine {
	calls: Vec<String>,
	disposed: usize,
}

impl LanguageEngine for RecordingEngine {
	fn library_added(&mut self, path: &str, module: Option<&str>) {
		self.calls.push(format!("lib {path} {module:?}"));
	}

	fn file_added(&mut self, cx: EngineContext<'_>, path: &str) {
		self.calls.push(format!("add {path} @{}", cx.project_version));
	}

	fn file_changed(&mut self, cx: EngineContext<'_>, path: &str, change: &TextChange) {
		let text = cx.host.read_file(path).unwrap_or_default();
		self.calls.push(format!(
			"change {path} {}+{}->{} @{} {text:?}",
			change.span.start, change.span.length, change.new_length, cx.project_version
		));
	}

	fn quick_info(&mut self, _cx: EngineContext<'_>, _path: &str, _position: usize) -> Option<QuickInfo> {
		None
	}

	fn syntactic_classifications(&mut self, _cx: EngineContext<'_>, _path: &str, _span: TextSpan) -> Vec<ClassifiedSpan> {
		Vec::new()
	}

	fn semantic_classifications(&mut self, _cx: EngineContext<'_>, _path: &str, _span: TextSpan) -> Vec<ClassifiedSpan> {
		Vec::new()
	}

	fn syntactic_diagnostics(&mut self, cx: EngineContext<'_>, path: &str) -> Vec<Diagnostic> {
		self.calls.push(format!("syntactic {path} @{}", cx.project_version));
		Vec::new()
	}

	fn semantic_diagnostics(&mut self, _cx: EngineContext<'_>, _path: &str) -> Vec<Diagnostic> {
		Vec::new()
	}

	fn dispose(&mut self) {
		self.disposed += 1;
	}
}

fn libraries() -> Libraries {
	let mut libraries = Libraries::new(vec![LibraryFile::new("/lib.core.d.ts", "declare var NaN: number;")]);
	libraries.register(ExtraLibrary {
		name: "pkg".into(),
		module: Some("pkg".into()),
		files: vec![
			LibraryFile::new("/node_modules/pkg/index.d.ts", "export declare const v: number;"),
			LibraryFile::new("/node_modules/pkg/global.d.ts", "declare var g: number;"),
		],
	});
	libraries
}

fn recording(extra: &[&str]) -> AnalysisSession<RecordingEngine> {
	let config = SessionConfig {
		extra_libs: extra.iter().map(|name| (*name).to_owned()).collect(),
	};
	AnalysisSession::with_engine(RecordingEngine::default(), &config, &libraries()).unwrap()
}

fn calls(session: &AnalysisSession<RecordingEngine>) -> Vec<String> {
	session.engine().unwrap().calls.clone()
}

#[test]
fn test_libraries_are_registered_in_order() {
	let session = recording(&["pkg"]);
	assert_eq!(
		calls(&session),
		vec![
			"lib /lib.core.d.ts None",
			"lib /node_modules/pkg/index.d.ts Some(\"pkg\")",
			"lib /node_modules/pkg/global.d.ts None",
		]
	);
	assert_eq!(
		session.host().script_file_names().collect::<Vec<_>>(),
		vec!["/lib.core.d.ts", "/node_modules/pkg/index.d.ts", "/node_modules/pkg/global.d.ts"]
	);
	assert_eq!(session.project_version().get(), 0);
}

#[test]
fn test_unknown_library_is_rejected() {
	let config = SessionConfig {
		extra_libs: vec!["nope".into()],
	};
	let err = AnalysisSession::with_engine(RecordingEngine::default(), &config, &libraries()).unwrap_err();
	assert!(matches!(err, AnalysisError::UnknownLibrary(name) if name == "nope"));
}

#[test]
fn test_config_defaults_when_empty() {
	let config: SessionConfig = serde_json::from_str("{}").unwrap();
	assert_eq!(config, SessionConfig::default());
}

#[test]
fn test_create_and_update_bump_versions_once() {
	let mut session = recording(&[]);
	session.create_file("/index.ts", "let x = 1;").unwrap();
	assert_eq!(session.project_version().get(), 1);

	let version = session.update_file("/index.ts", "42", TextSpan::new(8, 1)).unwrap();
	assert_eq!(version, 1);
	assert_eq!(session.project_version().get(), 2);
	assert_eq!(session.text("/index.ts"), Some("let x = 42;"));
	assert_eq!(
		calls(&session)[1..],
		["add /index.ts @1", "change /index.ts 8+1->2 @2 \"let x = 42;\""]
	);
}

#[test]
fn test_create_existing_file_fails() {
	let mut session = recording(&[]);
	session.create_file("/index.ts", "").unwrap();
	let err = session.create_file("/index.ts", "again").unwrap_err();
	assert!(matches!(err, AnalysisError::AlreadyExists(_)));
	let err = session.create_file("/lib.core.d.ts", "").unwrap_err();
	assert!(matches!(err, AnalysisError::AlreadyExists(_)));
	assert_eq!(session.project_version().get(), 1);
}

#[test]
fn test_update_unknown_file_fails() {
	let mut session = recording(&[]);
	let err = session.update_file("/missing.ts", "x", TextSpan::new(0, 0)).unwrap_err();
	assert!(matches!(err, AnalysisError::FileNotFound(_)));
	assert_eq!(session.project_version().get(), 0);
}

#[test]
fn test_bad_spans_mutate_nothing() {
	let mut session = recording(&[]);
	session.create_file("/index.ts", "let é = 1;").unwrap();
	for span in [TextSpan::new(5, 1), TextSpan::new(11, 2), TextSpan::new(usize::MAX, 2)] {
		let err = session.update_file("/index.ts", "x", span).unwrap_err();
		assert!(matches!(err, AnalysisError::SpanOutOfBounds { .. }), "{span:?}");
	}
	assert_eq!(session.text("/index.ts"), Some("let é = 1;"));
	assert_eq!(session.project_version().get(), 1);
	assert_eq!(session.host().script_version("/index.ts"), Some(0));
}

#[test]
fn test_queries_require_known_file() {
	let mut session = recording(&[]);
	let err = session.syntactic_diagnostics("/index.ts").unwrap_err();
	assert!(matches!(err, AnalysisError::FileNotFound(_)));
	session.create_file("/index.ts", "").unwrap();
	assert_eq!(session.syntactic_diagnostics("/index.ts").unwrap(), Vec::new());
	assert_eq!(calls(&session).last().map(String::as_str), Some("syntactic /index.ts @1"));
}

#[test]
fn test_dispose_runs_once_and_blocks_queries() {
	let mut session = recording(&[]);
	session.create_file("/index.ts", "").unwrap();
	session.dispose();
	session.dispose();
	assert!(session.is_disposed());
	assert!(matches!(session.quick_info("/index.ts", 0), Err(AnalysisError::Disposed)));
	assert!(matches!(session.create_file("/b.ts", ""), Err(AnalysisError::Disposed)));
	assert!(matches!(
		session.update_file("/index.ts", "", TextSpan::new(0, 0)),
		Err(AnalysisError::Disposed)
	));
}

#[test]
fn test_script_session_end_to_end() {
	let config = SessionConfig {
		extra_libs: vec!["react".into()],
	};
	let mut session = AnalysisSession::new(&config, &Libraries::bundled()).unwrap();
	session
		.create_file("/index.tsx", "import { useState } from 'react';\nconst [n, setN] = useState(0);\nlet label = 'count';")
		.unwrap();
	assert_eq!(session.syntactic_diagnostics("/index.tsx").unwrap(), Vec::new());
	assert_eq!(session.semantic_diagnostics("/index.tsx").unwrap(), Vec::new());

	let text = session.text("/index.tsx").unwrap().to_owned();
	let at = text.find("label").unwrap();
	let info = session.quick_info("/index.tsx", at).unwrap().unwrap();
	assert_eq!(info.kind, ScriptElementKind::Let);
	assert_eq!(info.display_string(), "let label: string");

	let quote = text.find("'count'").unwrap();
	session.update_file("/index.tsx", "1", TextSpan::new(quote, 7)).unwrap();
	let info = session.quick_info("/index.tsx", at).unwrap().unwrap();
	assert_eq!(info.display_string(), "let label: number");
}

proptest! {
	#[test]
	fn prop_update_splices_previous_text(
		text in "[a-z \n]{0,40}",
		insert in "[a-z;{}]{0,8}",
		a in 0usize..=40,
		b in 0usize..=40,
	) {
		let mut session = recording(&[]);
		session.create_file("/index.ts", &text).unwrap();
		let (start, end) = (a.min(b).min(text.len()), a.max(b).min(text.len()));
		let span = TextSpan::new(start, end - start);
		session.update_file("/index.ts", &insert, span).unwrap();

		let expected = format!("{}{}{}", &text[..start], insert, &text[end..]);
		prop_assert_eq!(session.text("/index.ts"), Some(expected.as_str()));
		prop_assert_eq!(session.project_version().get(), 2);
	}

	#[test]
	fn prop_out_of_range_span_is_rejected(text in "[a-z]{0,20}", over in 1usize..10) {
		let mut session = recording(&[]);
		session.create_file("/index.ts", &text).unwrap();
		let span = TextSpan::new(text.len(), over);
		prop_assert!(session.update_file("/index.ts", "x", span).is_err());
		prop_assert_eq!(session.text("/index.ts"), Some(text.as_str()));
	}
}

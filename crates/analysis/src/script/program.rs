//! Cross-file view of one project version: name resolution, symbol types and
//! semantic checks.

use std::cell::RefCell;
use std::sync::Arc;

use indexmap::IndexMap;
use rustc_hash::{FxHashMap, FxHashSet};

use super::infer::{NameTypes, Ty, expression_type, params_display};
use super::lexer::LexKind;
use super::parse::{Decl, DeclKind, ImportName, Parsed, ScopeId, TOP_SCOPE, VarKind};
use crate::types::{ClassificationKind, ClassifiedSpan, Diagnostic, TextSpan};

/// A declaration in a specific file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct SymbolRef {
	pub file: Arc<str>,
	pub decl: usize,
}

/// Semantic results for one file, valid for the program they came from.
#[derive(Debug, Default)]
pub(crate) struct Checked {
	pub classifications: Vec<ClassifiedSpan>,
	pub diagnostics: Vec<Diagnostic>,
}

/// Import chains longer than this are treated as unresolved.
const MAX_IMPORT_HOPS: usize = 8;

#[derive(Debug)]
pub(crate) struct Program {
	files: FxHashMap<Arc<str>, Arc<Parsed>>,
	globals: FxHashMap<String, SymbolRef>,
	modules: FxHashMap<String, Arc<str>>,
	types: RefCell<FxHashMap<SymbolRef, Ty>>,
	resolving: RefCell<FxHashSet<SymbolRef>>,
}

impl Program {
	/// Builds the program from `files` in script order. Top-level
	/// declarations of non-module files are global; files registered in
	/// `modules` are only reachable through imports.
	pub fn new(files: Vec<(Arc<str>, Arc<Parsed>)>, modules: &IndexMap<String, String>) -> Self {
		let module_paths: FxHashSet<&str> = modules.values().map(String::as_str).collect();
		let mut globals = FxHashMap::default();
		for (path, parsed) in &files {
			if parsed.is_module || module_paths.contains(&**path) {
				continue;
			}
			for (index, decl) in parsed.decls.iter().enumerate() {
				if decl.scope == TOP_SCOPE && !matches!(decl.kind, DeclKind::Import { .. }) {
					globals.entry(decl.name.clone()).or_insert_with(|| SymbolRef {
						file: Arc::clone(path),
						decl: index,
					});
				}
			}
		}
		let modules = modules
			.iter()
			.map(|(name, path)| (name.clone(), Arc::from(path.as_str())))
			.collect();
		Self {
			files: files.into_iter().collect(),
			globals,
			modules,
			types: RefCell::default(),
			resolving: RefCell::default(),
		}
	}

	pub fn file(&self, path: &str) -> Option<&Arc<Parsed>> {
		self.files.get(path)
	}

	pub fn decl(&self, sym: &SymbolRef) -> Option<(&Arc<Parsed>, &Decl)> {
		let parsed = self.files.get(&sym.file)?;
		Some((parsed, parsed.decls.get(sym.decl)?))
	}

	pub fn resolve(&self, path: &Arc<str>, parsed: &Parsed, scope: ScopeId, name: &str) -> Option<SymbolRef> {
		if let Some(decl) = parsed.lookup(scope, name) {
			return Some(SymbolRef {
				file: Arc::clone(path),
				decl,
			});
		}
		self.globals.get(name).cloned()
	}

	fn resolve_ref(&self, path: &Arc<str>, parsed: &Parsed, index: usize) -> Option<SymbolRef> {
		let reference = parsed.refs.get(index)?;
		self.resolve(path, parsed, reference.scope, &reference.name)
	}

	/// Resolves the identifier starting at byte `start` in `path`, whether it
	/// names a declaration or references one.
	pub fn symbol_at(&self, path: &Arc<str>, start: usize) -> Option<SymbolRef> {
		let parsed = self.files.get(path)?;
		if let Some(decl) = parsed.decl_at(start) {
			return Some(SymbolRef {
				file: Arc::clone(path),
				decl,
			});
		}
		self.resolve_ref(path, parsed, parsed.ref_at(start)?)
	}

	/// Follows import bindings to the declaration they import.
	pub fn import_target(&self, sym: &SymbolRef) -> Option<SymbolRef> {
		let mut current = sym.clone();
		for _ in 0..MAX_IMPORT_HOPS {
			let (_, decl) = self.decl(&current)?;
			let DeclKind::Import { module, imported } = &decl.kind else {
				return Some(current);
			};
			let path = self.modules.get(module)?;
			let target = self.files.get(path)?;
			let decl = match imported {
				ImportName::Named(name) => {
					let decl = target.top_level(name)?;
					if target.is_module && !target.decls[decl].exported {
						return None;
					}
					decl
				}
				ImportName::Default => target.top_level(target.default_export.as_deref()?)?,
				ImportName::Namespace => return None,
			};
			current = SymbolRef {
				file: Arc::clone(path),
				decl,
			};
		}
		None
	}

	pub fn symbol_type(&self, sym: &SymbolRef) -> Ty {
		if let Some(ty) = self.types.borrow().get(sym) {
			return ty.clone();
		}
		if !self.resolving.borrow_mut().insert(sym.clone()) {
			return Ty::Any;
		}
		let ty = self.compute_type(sym);
		self.resolving.borrow_mut().remove(sym);
		self.types.borrow_mut().insert(sym.clone(), ty.clone());
		ty
	}

	fn compute_type(&self, sym: &SymbolRef) -> Ty {
		let Some((parsed, decl)) = self.decl(sym) else {
			return Ty::Any;
		};
		let names = FileNames {
			program: self,
			path: &sym.file,
			parsed,
		};
		let annotation = decl
			.annotation
			.clone()
			.and_then(|range| parsed.text.get(range))
			.map(Ty::from_annotation);
		match &decl.kind {
			DeclKind::Variable(kind) => match (annotation, decl.init.clone()) {
				(Some(ty), _) => ty,
				(None, Some(init)) => {
					let ty = expression_type(parsed, init, &names);
					if *kind == VarKind::Const { ty } else { ty.widen() }
				}
				(None, None) => Ty::Any,
			},
			DeclKind::Parameter => match (annotation, decl.init.clone()) {
				(Some(ty), _) => ty,
				(None, Some(init)) => expression_type(parsed, init, &names).widen(),
				(None, None) => Ty::Any,
			},
			DeclKind::Function => {
				let params = decl.params.map_or_else(
					|| "()".to_owned(),
					|(open, close)| params_display(parsed, open, close, &names),
				);
				let ret = match (annotation, decl.returns.clone()) {
					(Some(ty), _) => ty,
					(None, Some(returns)) => expression_type(parsed, returns, &names).widen(),
					(None, None) => Ty::Void,
				};
				Ty::Function {
					params,
					ret: Box::new(ret),
				}
			}
			DeclKind::Class | DeclKind::Enum => Ty::Named(format!("typeof {}", decl.name)),
			DeclKind::Interface | DeclKind::TypeAlias | DeclKind::TypeParameter => Ty::Named(decl.name.clone()),
			DeclKind::Import { .. } => self
				.import_target(sym)
				.filter(|target| target != sym)
				.map_or(Ty::Any, |target| self.symbol_type(&target)),
		}
	}

	/// Specific classification for the symbol, following imports.
	fn classification(&self, sym: &SymbolRef) -> Option<ClassificationKind> {
		let target = self.import_target(sym)?;
		let (_, decl) = self.decl(&target)?;
		declaration_classification(&decl.kind)
	}

	pub fn has_module(&self, name: &str) -> bool {
		self.modules.contains_key(name)
	}

	pub fn check(&self, path: &Arc<str>) -> Option<Checked> {
		let parsed = self.files.get(path)?;
		let names = FileNames {
			program: self,
			path,
			parsed,
		};
		let mut checked = Checked::default();
		let mut used_imports = FxHashSet::default();

		for (index, reference) in parsed.refs.iter().enumerate() {
			let span = TextSpan::from_range(reference.span.clone());
			let Some(sym) = self.resolve_ref(path, parsed, index) else {
				checked.diagnostics.push(Diagnostic::error(
					span,
					2304,
					format!("Cannot find name '{}'.", reference.name),
				));
				continue;
			};
			let Some((_, decl)) = self.decl(&sym) else { continue };
			if sym.file == *path && matches!(decl.kind, DeclKind::Import { .. }) {
				used_imports.insert(sym.decl);
			}
			if reference.write && decl.kind == DeclKind::Variable(VarKind::Const) {
				checked.diagnostics.push(Diagnostic::error(
					span,
					2588,
					format!("Cannot assign to '{}' because it is a constant.", reference.name),
				));
			}
			if let Some(kind) = self.classification(&sym) {
				checked.classifications.push(ClassifiedSpan::new(span, kind));
			}
		}

		for (index, decl) in parsed.decls.iter().enumerate() {
			let span = TextSpan::from_range(decl.span.clone());
			let sym = SymbolRef {
				file: Arc::clone(path),
				decl: index,
			};
			if let Some(kind) = self.classification(&sym) {
				checked.classifications.push(ClassifiedSpan::new(span, kind));
			}
			match &decl.kind {
				DeclKind::Variable(_) | DeclKind::Parameter => {
					if let Some(diagnostic) = self.check_initializer(parsed, decl, &names) {
						checked.diagnostics.push(diagnostic);
					}
				}
				DeclKind::Import { .. } if !used_imports.contains(&index) => {
					checked.diagnostics.push(Diagnostic::unnecessary(
						span,
						6133,
						format!("'{}' is declared but its value is never read.", decl.name),
					));
				}
				_ => {}
			}
		}

		for import in &parsed.imports {
			if !self.has_module(&import.module) {
				checked.diagnostics.push(Diagnostic::error(
					TextSpan::from_range(import.span.clone()),
					2307,
					format!(
						"Cannot find module '{}' or its corresponding type declarations.",
						import.module
					),
				));
			}
		}

		checked.classifications.sort_by_key(|c| c.span.start);
		checked.classifications.dedup();
		checked.diagnostics.sort_by_key(|d| d.span.start);
		Some(checked)
	}

	fn check_initializer(&self, parsed: &Parsed, decl: &Decl, names: &FileNames<'_>) -> Option<Diagnostic> {
		let annotation = parsed.text.get(decl.annotation.clone()?)?;
		let target = Ty::from_annotation(annotation);
		let source = expression_type(parsed, decl.init.clone()?, names);
		if source.assignable_to(&target) {
			return None;
		}
		let shown = if target.is_literal() { source } else { source.widen() };
		Some(Diagnostic::error(
			TextSpan::from_range(decl.span.clone()),
			2322,
			format!("Type '{shown}' is not assignable to type '{target}'."),
		))
	}
}

struct FileNames<'a> {
	program: &'a Program,
	path: &'a Arc<str>,
	parsed: &'a Parsed,
}

impl NameTypes for FileNames<'_> {
	fn ident_type(&self, start: usize) -> Ty {
		self.parsed
			.ref_at(start)
			.and_then(|index| self.program.resolve_ref(self.path, self.parsed, index))
			.map_or(Ty::Any, |sym| self.program.symbol_type(&sym))
	}
}

pub(crate) fn declaration_classification(kind: &DeclKind) -> Option<ClassificationKind> {
	match kind {
		DeclKind::Class => Some(ClassificationKind::ClassName),
		DeclKind::Interface => Some(ClassificationKind::InterfaceName),
		DeclKind::Enum => Some(ClassificationKind::EnumName),
		DeclKind::TypeAlias => Some(ClassificationKind::TypeAliasName),
		DeclKind::TypeParameter => Some(ClassificationKind::TypeParameterName),
		DeclKind::Parameter => Some(ClassificationKind::ParameterName),
		_ => None,
	}
}

/// Token-level classification of a file. Declaration names get their
/// declaration's kind; every other identifier is `identifier`.
pub(crate) fn classify_syntax(parsed: &Parsed) -> Vec<ClassifiedSpan> {
	parsed
		.lexemes
		.iter()
		.map(|lexeme| {
			let kind = match lexeme.kind {
				LexKind::Ident => parsed
					.decl_at(lexeme.start)
					.and_then(|decl| declaration_classification(&parsed.decls[decl].kind))
					.unwrap_or(ClassificationKind::Identifier),
				LexKind::Keyword => ClassificationKind::Keyword,
				LexKind::Number => ClassificationKind::NumericLiteral,
				LexKind::String | LexKind::Template => ClassificationKind::StringLiteral,
				LexKind::Comment => ClassificationKind::Comment,
				LexKind::Punct => ClassificationKind::Punctuation,
				LexKind::Operator => ClassificationKind::Operator,
				LexKind::JsxText => ClassificationKind::JsxText,
				LexKind::JsxTagName => ClassificationKind::JsxOpenTagName,
				LexKind::JsxAttribute => ClassificationKind::JsxAttribute,
			};
			ClassifiedSpan::new(lexeme.span(), kind)
		})
		.collect()
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;

	fn program(files: &[(&str, &str)], modules: &[(&str, &str)]) -> Program {
		let files = files
			.iter()
			.map(|(path, text)| (Arc::from(*path), Arc::new(Parsed::parse((*text).into(), 0, false))))
			.collect();
		let modules = modules
			.iter()
			.map(|(name, path)| ((*name).to_owned(), (*path).to_owned()))
			.collect();
		Program::new(files, &modules)
	}

	fn type_at(program: &Program, path: &str, needle: &str) -> String {
		let path: Arc<str> = path.into();
		let parsed = program.file(&path).unwrap();
		let start = parsed.text.find(needle).unwrap();
		let sym = program.symbol_at(&path, start).unwrap();
		program.symbol_type(&sym).to_string()
	}

	fn codes(checked: &Checked) -> Vec<u32> {
		checked.diagnostics.iter().map(|d| d.code).collect()
	}

	#[test]
	fn test_declared_types() {
		let program = program(
			&[(
				"/a.ts",
				"let n = 1;\nconst c = 'x';\nconst s = n + 1;\nfunction f(a: number) { return a > 0; }\nconst r = f(1);",
			)],
			&[],
		);
		assert_eq!(type_at(&program, "/a.ts", "n ="), "number");
		assert_eq!(type_at(&program, "/a.ts", "c ="), "\"x\"");
		assert_eq!(type_at(&program, "/a.ts", "s ="), "number");
		assert_eq!(type_at(&program, "/a.ts", "f("), "(a: number) => boolean");
		assert_eq!(type_at(&program, "/a.ts", "r ="), "boolean");
	}

	#[test]
	fn test_globals_cross_script_files() {
		let program = program(
			&[("/a.ts", "let total = count * 2;"), ("/lib.d.ts", "declare var count: number;")],
			&[],
		);
		assert_eq!(type_at(&program, "/a.ts", "total"), "number");
		let checked = program.check(&Arc::from("/a.ts")).unwrap();
		assert!(checked.diagnostics.is_empty());
	}

	#[test]
	fn test_semantic_diagnostics() {
		let src = "const k = 1;\nk = 2;\nlet s: number = 'no';\nmissing;\nimport { x } from 'nowhere';";
		let program = program(&[("/a.ts", src)], &[]);
		let checked = program.check(&Arc::from("/a.ts")).unwrap();
		assert_eq!(codes(&checked), vec![2588, 2322, 2304, 6133, 2307]);
		assert_eq!(checked.diagnostics[1].message, "Type 'string' is not assignable to type 'number'.");
		assert!(checked.diagnostics[3].reports_unnecessary);
	}

	#[test]
	fn test_module_imports_resolve() {
		let program = program(
			&[
				("/a.ts", "import { useThing } from 'lib';\nconst v = useThing();"),
				("/lib/index.d.ts", "export function useThing(): string;"),
			],
			&[("lib", "/lib/index.d.ts")],
		);
		assert_eq!(type_at(&program, "/a.ts", "v ="), "string");
		let checked = program.check(&Arc::from("/a.ts")).unwrap();
		assert!(checked.diagnostics.is_empty());
	}

	#[test]
	fn test_named_imports_need_an_export() {
		let program = program(
			&[
				(
					"/a.ts",
					"import { shown, listed, kept } from 'lib';
const x = shown;
const y = listed;
const z = kept;",
				),
				(
					"/lib/index.d.ts",
					"export declare const shown: string;
declare const listed: number;
declare const kept: boolean;
export { listed };",
				),
			],
			&[("lib", "/lib/index.d.ts")],
		);
		assert_eq!(type_at(&program, "/a.ts", "x ="), "string");
		assert_eq!(type_at(&program, "/a.ts", "y ="), "number");
		assert_eq!(type_at(&program, "/a.ts", "z ="), "any");
		let kept = program.symbol_at(&Arc::from("/a.ts"), "import { shown, listed, ".len()).unwrap();
		assert_eq!(program.import_target(&kept), None);
	}

	#[test]
	fn test_semantic_classifications() {
		let src = "interface Point { x: number }\nfunction len(p: Point) { return p.x; }";
		let program = program(&[("/a.ts", src)], &[]);
		let checked = program.check(&Arc::from("/a.ts")).unwrap();
		let kinds: Vec<_> = checked.classifications.iter().map(|c| c.kind).collect();
		assert_eq!(
			kinds,
			vec![
				ClassificationKind::InterfaceName,
				ClassificationKind::ParameterName,
				ClassificationKind::InterfaceName,
				ClassificationKind::ParameterName,
			]
		);
	}
}

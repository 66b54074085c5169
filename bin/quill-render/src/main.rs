//! Renders the live code blocks of one page at build time.
//!
//! Reads a page configuration, tokenizes every block and writes the
//! resulting tokens and hover information as JSON.

use std::io::Write as _;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::Parser;
use quill_analysis::Libraries;
use quill_page::{PageConfig, render_static};
use quill_tokenize::GrammarRegistry;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "quill-render")]
#[command(about = "Pre-render the live code blocks of a page")]
struct Args {
	/// Page configuration JSON
	#[arg(value_name = "PAGE")]
	page: PathBuf,

	/// Write to this file instead of stdout
	#[arg(short, long, value_name = "FILE")]
	out: Option<PathBuf>,

	/// Indent the output
	#[arg(long)]
	pretty: bool,

	/// Verbose logging
	#[arg(short, long)]
	verbose: bool,
}

fn main() -> anyhow::Result<()> {
	let args = Args::parse();

	let subscriber = tracing_subscriber::fmt()
		.with_max_level(if args.verbose {
			tracing::Level::DEBUG
		} else {
			tracing::Level::INFO
		})
		.with_writer(std::io::stderr)
		.finish();
	tracing::subscriber::set_global_default(subscriber)?;

	let json = render(&args.page, args.pretty)?;
	match &args.out {
		Some(out) => {
			std::fs::write(out, &json).with_context(|| format!("writing {}", out.display()))?;
			info!(out = %out.display(), bytes = json.len(), "render.written");
		}
		None => {
			let mut stdout = std::io::stdout().lock();
			stdout.write_all(json.as_bytes())?;
			stdout.write_all(b"\n")?;
		}
	}
	Ok(())
}

fn render(page: &Path, pretty: bool) -> anyhow::Result<String> {
	let source = std::fs::read_to_string(page).with_context(|| format!("reading {}", page.display()))?;
	let config = PageConfig::from_json(&source).with_context(|| format!("loading {}", page.display()))?;
	let registry = GrammarRegistry::with_builtin().context("loading built-in grammars")?;
	let rendered = render_static(&config, &registry, &Libraries::bundled())
		.with_context(|| format!("rendering {}", page.display()))?;
	info!(page = %page.display(), blocks = rendered.blocks.len(), "render.done");

	Ok(if pretty {
		serde_json::to_string_pretty(&rendered)?
	} else {
		serde_json::to_string(&rendered)?
	})
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;

	fn write_page(dir: &tempfile::TempDir, json: &str) -> PathBuf {
		let path = dir.path().join("page.json");
		std::fs::write(&path, json).unwrap();
		path
	}

	#[test]
	fn test_render_page_file() {
		let dir = tempfile::tempdir().unwrap();
		let path = write_page(
			&dir,
			r#"{
				"codeBlocks": {
					"code-0": { "text": "let n = 1;\nn;", "fileName": "/index.ts", "lang": "ts" }
				},
				"sourceFiles": { "/index.ts": { "fragments": ["code-0"] } }
			}"#,
		);

		let compact = render(&path, false).unwrap();
		assert!(!compact.contains('\n'));
		let pretty = render(&path, true).unwrap();
		assert!(pretty.contains('\n'));

		let value: serde_json::Value = serde_json::from_str(&compact).unwrap();
		assert_eq!(value, serde_json::from_str::<serde_json::Value>(&pretty).unwrap());
		let block = &value["blocks"]["code-0"];
		assert_eq!(block["lines"].as_array().unwrap().len(), 2);
		assert_eq!(block["quickInfo"]["4"]["kind"], "let");
	}

	#[test]
	fn test_errors_name_the_page() {
		let dir = tempfile::tempdir().unwrap();
		let missing = dir.path().join("missing.json");
		let err = render(&missing, false).unwrap_err();
		assert!(err.to_string().contains("missing.json"));

		let path = write_page(&dir, r#"{ "codeBlocks": { "a": { "text": "", "fileName": "/x.ts", "lang": "ts" } } }"#);
		let err = render(&path, false).unwrap_err();
		assert!(err.to_string().starts_with("loading"));
		assert!(format!("{err:#}").contains("unknown source file /x.ts"));
	}

	#[test]
	fn test_args_parse() {
		let args = Args::try_parse_from(["quill-render", "page.json", "--out", "out.json", "--pretty", "-v"]).unwrap();
		assert_eq!(args.page, PathBuf::from("page.json"));
		assert_eq!(args.out, Some(PathBuf::from("out.json")));
		assert!(args.pretty && args.verbose);
		assert!(Args::try_parse_from(["quill-render"]).is_err());
	}
}

//! TextMate-shaped grammar JSON.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawGrammar {
	pub scope_name: String,
	#[serde(default)]
	pub name: Option<String>,
	/// Language tags that select this grammar, besides `name`.
	#[serde(default)]
	pub aliases: Vec<String>,
	#[serde(default)]
	pub patterns: Vec<RawRule>,
	#[serde(default)]
	pub repository: IndexMap<String, RawRule>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawRule {
	pub include: Option<String>,
	#[serde(rename = "match")]
	pub match_: Option<String>,
	pub name: Option<String>,
	pub content_name: Option<String>,
	pub begin: Option<String>,
	pub end: Option<String>,
	pub captures: Option<RawCaptures>,
	pub begin_captures: Option<RawCaptures>,
	pub end_captures: Option<RawCaptures>,
	pub patterns: Vec<RawRule>,
}

/// Capture group number (as a string key) to scope.
pub type RawCaptures = BTreeMap<String, RawCapture>;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawCapture {
	pub name: Option<String>,
}

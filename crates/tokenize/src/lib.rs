//! Line tokenizers for live code blocks.
//!
//! * [`lexical`]: TextMate-style grammars with a per-line cache keyed by line
//!   text and incoming grammar state
//! * [`semantic`]: identifier and diagnostic tokens read from an
//!   [`AnalysisSession`](quill_analysis::AnalysisSession), debounced
//! * [`compose`]: several tokenizers layered over one document
//!
//! All of them produce [`LineTokens`]: per-line token lists with a hash that
//! changes exactly when the line renders differently.

pub mod compose;
pub mod debounce;
mod error;
pub mod grammar;
pub mod lexical;
pub mod semantic;
mod token;
mod tokenizer;

pub use compose::ComposedTokenizer;
pub use debounce::{DEFAULT_DELAY, Debouncer, Subscribers};
pub use error::{Result, TokenizeError};
pub use grammar::{Grammar, GrammarRegistry, GrammarState};
pub use lexical::{LexicalTokenizer, LineCache};
pub use semantic::{SemanticTokenizer, SharedSession, VisibleRegion, compute_lines};
pub use token::{LineTokens, Token, lines};
pub use tokenizer::{Capabilities, Listener, StaticTokenizer, Tokenizer};

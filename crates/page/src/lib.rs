//! Live code blocks of one page.
//!
//! A [`PageConfig`] lists the page's code blocks and the analyzed files
//! they are fragments of. [`render_static`] tokenizes everything once at
//! build time; a [`LivePage`] keeps the blocks editable, moving each from
//! its pre-rendered tokens to lexical and semantic tokens computed from the
//! current text.

mod block;
mod config;
mod error;
mod layout;
mod live;
mod render;

pub use block::{BlockTokenizer, Stage};
pub use config::{CodeBlock, PageConfig, SourceFile};
pub use error::{PageError, Result};
pub use layout::FileLayout;
pub use live::LivePage;
pub use render::{RenderedBlock, RenderedPage, render_static};

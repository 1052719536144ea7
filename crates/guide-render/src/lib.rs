//! Guide Render: turn a finished `Guide` into a document
//!
//! ```ignore
//! use guide_render::{GuideRenderer, MarkdownRenderer};
//!
//! let markdown = MarkdownRenderer::new()?.render(&guide)?;
//! ```

pub mod markdown;
pub mod templates;

pub use markdown::{MarkdownRenderer, DEFAULT_TEMPLATE};
pub use templates::{Template, TemplateSet};

use guide_core::Guide;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("RENDER/TEMPLATE: {0}")]
    Template(String),
    #[error("RENDER/UNKNOWN_TEMPLATE: {0}")]
    UnknownTemplate(String),
    #[error("RENDER/FAILED: {0}")]
    Render(String),
}

/// Anything that can turn a guide into a text document
pub trait GuideRenderer: Send + Sync {
    fn render(&self, guide: &Guide) -> Result<String, RenderError>;
}

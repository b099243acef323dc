//! Annotation errors.
//!
//! Raised while attaching controls to one anchor. A pass catches them, clears
//! the anchor's processed marker and moves on.

use thiserror::Error;
use xblock_dom::DomError;

#[derive(Debug, Error)]
pub enum AnnotateError {
    #[error("DOM error: {0}")]
    Dom(#[from] DomError),

    #[error("Missing structure: {0}")]
    MissingStructure(&'static str),
}

pub type Result<T> = std::result::Result<T, AnnotateError>;

use std::path::PathBuf;

use thiserror::Error;

use crate::blocks::BlockKind;
use crate::tfconfig::Diagnostics;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("terraform config problem: {0}")]
    Config(Diagnostics),

    #[error("could not extract text from {kind}: {source}")]
    Build {
        kind: BlockKind,
        #[source]
        source: BlockError,
    },

    #[error("could not parse {collection}: {source}")]
    Collection {
        collection: &'static str,
        #[source]
        source: Box<ExtractError>,
    },

    #[error("Parse error: {0}")]
    Parse(String),
}

/// Failures while slicing a declaration's text out of its file.
#[derive(Error, Debug)]
pub enum BlockError {
    #[error("invalid start line {line} in {}", file.display())]
    InvalidStart { file: PathBuf, line: usize },
}

pub type Result<T> = std::result::Result<T, ExtractError>;

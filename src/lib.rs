pub mod blocks;
pub mod error;
pub mod tfconfig;

use std::path::Path;

pub use blocks::{
    block_text, find_closing_bracket, scrape_attributes, Block, BlockBuilder, BlockKind, Blocks,
    ExtractOptions, SourceCache, TargetNames, DEFAULT_TARGETS,
};
pub use error::{BlockError, ExtractError, Result};
pub use tfconfig::{load_module, Diagnostic, Diagnostics, Module, Severity, SourcePos};

/// Extracts every declaration block of the Terraform module at `path`,
/// scraping the default target attributes from resources.
pub fn extract(path: impl AsRef<Path>) -> Result<Blocks> {
    extract_with(path, &ExtractOptions::default())
}

/// Like [`extract`], with caller-chosen target names and scraping scope.
pub fn extract_with(path: impl AsRef<Path>, options: &ExtractOptions) -> Result<Blocks> {
    let path = path.as_ref();
    let (module, diagnostics) = load_module(path);

    for warning in diagnostics.warnings() {
        tracing::warn!("{}", warning);
    }
    if diagnostics.has_errors() {
        return Err(ExtractError::Config(diagnostics));
    }

    BlockBuilder::new(options.clone()).assemble(&module)
}

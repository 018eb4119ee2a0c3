use once_cell::sync::OnceCell;
use tree_sitter::Query;

use crate::error::{ExtractError, Result};

pub struct HclGrammar;

static HCL_DECLARATIONS_QUERY: OnceCell<Query> = OnceCell::new();

impl HclGrammar {
    pub fn name(&self) -> &'static str {
        "hcl"
    }

    pub fn file_extensions(&self) -> &[&'static str] {
        &["tf"]
    }

    pub fn language(&self) -> tree_sitter::Language {
        tree_sitter_hcl::LANGUAGE.into()
    }

    /// Top-level blocks only; nested blocks belong to their parent's text.
    pub fn declarations_query(&self) -> &str {
        r#"
        (config_file
            (body
                (block) @block
            )
        )
        "#
    }

    /// Declarations query, compiled once per process.
    pub fn cached_declarations_query(&self) -> Result<&'static Query> {
        HCL_DECLARATIONS_QUERY.get_or_try_init(|| {
            Query::new(&self.language(), self.declarations_query())
                .map_err(|e| ExtractError::Parse(format!("Invalid declarations query: {}", e)))
        })
    }
}

//! Declaration blocks recovered from Terraform sources.
//!
//! A [`Block`] pairs what the configuration loader knows about a declaration
//! (name, type, kind, position) with the verbatim text of the declaration and
//! a handful of attribute values scraped from that text.

pub mod builder;
pub mod scrape;
pub mod text;

pub use builder::{BlockBuilder, ExtractOptions};
pub use scrape::{scrape_attributes, TargetNames, DEFAULT_TARGETS};
pub use text::{block_text, find_closing_bracket, SourceCache};

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::tfconfig::ResourceMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockKind {
    Managed,
    Data,
    Variable,
    Module,
}

impl BlockKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockKind::Managed => "managed",
            BlockKind::Data => "data",
            BlockKind::Variable => "variable",
            BlockKind::Module => "module",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "managed" | "resource" => Some(BlockKind::Managed),
            "data" => Some(BlockKind::Data),
            "variable" | "var" => Some(BlockKind::Variable),
            "module" => Some(BlockKind::Module),
            _ => None,
        }
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<ResourceMode> for BlockKind {
    fn from(mode: ResourceMode) -> Self {
        match mode {
            ResourceMode::Managed => BlockKind::Managed,
            ResourceMode::Data => BlockKind::Data,
        }
    }
}

/// One declaration: a resource, data source, variable or module call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Block {
    pub name: String,
    /// Verbatim source of the declaration.
    pub text: String,
    pub kind: BlockKind,
    /// Resource type, module source or variable type expression.
    #[serde(rename = "type")]
    pub type_name: String,
    /// Literal right-hand sides of scraped attributes, as written.
    pub attr: BTreeMap<String, String>,
    /// Version constraint of a module call, when given as a literal.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip)]
    pub(crate) file: PathBuf,
    #[serde(skip)]
    pub(crate) start: usize,
}

impl Block {
    pub fn file(&self) -> &Path {
        &self.file
    }

    /// 1-based line of the declaration header.
    pub fn start_line(&self) -> usize {
        self.start
    }

    /// Terraform address, e.g. `google_compute_instance.web` or `var.region`.
    pub fn address(&self) -> String {
        match self.kind {
            BlockKind::Managed => format!("{}.{}", self.type_name, self.name),
            BlockKind::Data => format!("data.{}.{}", self.type_name, self.name),
            BlockKind::Variable => format!("var.{}", self.name),
            BlockKind::Module => format!("module.{}", self.name),
        }
    }
}

/// Blocks of a module ordered by their start line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Blocks(Vec<Block>);

impl Blocks {
    pub(crate) fn from_unsorted(mut blocks: Vec<Block>) -> Self {
        blocks.sort_by_key(|b| b.start);
        Self(blocks)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Block> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[Block] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<Block> {
        self.0
    }

    pub fn find(&self, address: &str) -> Option<&Block> {
        self.0.iter().find(|b| b.address() == address)
    }

    pub fn of_kind(&self, kind: BlockKind) -> impl Iterator<Item = &Block> {
        self.0.iter().filter(move |b| b.kind == kind)
    }

    /// Blocks whose type contains any of `filter`'s entries, ignoring case.
    pub fn matching_type<'a>(&'a self, filter: &'a TargetNames) -> impl Iterator<Item = &'a Block> {
        self.0.iter().filter(move |b| filter.matches(&b.type_name))
    }
}

impl IntoIterator for Blocks {
    type Item = Block;
    type IntoIter = std::vec::IntoIter<Block>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Blocks {
    type Item = &'a Block;
    type IntoIter = std::slice::Iter<'a, Block>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

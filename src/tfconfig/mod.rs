//! Minimal Terraform module inspector.
//!
//! Loads the `.tf` files of one directory with tree-sitter and reports the
//! module calls, resources, data sources and variables it declares, each
//! with the file and line of its header. Anything that keeps a declaration
//! from being identified is reported as a [`Diagnostic`].

pub mod grammar;
pub mod loader;
pub mod walker;

pub use grammar::HclGrammar;
pub use loader::load_module;
pub use walker::FileWalker;

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

/// File and 1-based line of a declaration header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourcePos {
    pub filename: PathBuf,
    pub line: usize,
}

impl SourcePos {
    pub fn new(filename: impl Into<PathBuf>, line: usize) -> Self {
        Self {
            filename: filename.into(),
            line,
        }
    }
}

impl fmt::Display for SourcePos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.filename.display(), self.line)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceMode {
    Managed,
    Data,
}

impl fmt::Display for ResourceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceMode::Managed => f.write_str("managed"),
            ResourceMode::Data => f.write_str("data"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resource {
    pub mode: ResourceMode,
    pub resource_type: String,
    pub name: String,
    pub pos: SourcePos,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Variable {
    pub name: String,
    /// Type constraint as written; empty when the variable declares none.
    pub type_expr: String,
    pub pos: SourcePos,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleCall {
    pub name: String,
    pub source: String,
    pub version: Option<String>,
    pub pos: SourcePos,
}

/// Declarations of one module directory, each list in load order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Module {
    pub path: PathBuf,
    pub module_calls: Vec<ModuleCall>,
    pub managed_resources: Vec<Resource>,
    pub data_resources: Vec<Resource>,
    pub variables: Vec<Variable>,
}

impl Module {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            ..Default::default()
        }
    }

    pub fn declaration_count(&self) -> usize {
        self.module_calls.len()
            + self.managed_resources.len()
            + self.data_resources.len()
            + self.variables.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub summary: String,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pos: Option<SourcePos>,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(pos) = &self.pos {
            write!(f, "{}: ", pos)?;
        }
        write!(f, "{}", self.summary)?;
        if !self.detail.is_empty() {
            write!(f, "; {}", self.detail)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.0.push(diagnostic);
    }

    pub fn error(&mut self, summary: impl Into<String>, detail: impl Into<String>, pos: Option<SourcePos>) {
        self.push(Diagnostic {
            severity: Severity::Error,
            summary: summary.into(),
            detail: detail.into(),
            pos,
        });
    }

    pub fn warning(&mut self, summary: impl Into<String>, detail: impl Into<String>, pos: Option<SourcePos>) {
        self.push(Diagnostic {
            severity: Severity::Warning,
            summary: summary.into(),
            detail: detail.into(),
            pos,
        });
    }

    pub fn has_errors(&self) -> bool {
        self.0.iter().any(|d| d.severity == Severity::Error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter().filter(|d| d.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter().filter(|d| d.severity == Severity::Warning)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Lists the error diagnostics, separated by `; `.
impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let errors: Vec<String> = self.errors().map(|d| d.to_string()).collect();
        f.write_str(&errors.join("; "))
    }
}

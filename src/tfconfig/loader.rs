use std::collections::HashMap;
use std::fs;
use std::path::Path;

use tree_sitter::{Node, StreamingIterator};

use super::{
    Diagnostics, FileWalker, HclGrammar, Module, ModuleCall, Resource, ResourceMode, SourcePos,
    Variable,
};

/// Reads the Terraform module in `dir`.
///
/// Never fails outright: problems are reported through the returned
/// diagnostics, and the module holds whatever could be identified.
pub fn load_module(dir: &Path) -> (Module, Diagnostics) {
    let mut loader = ModuleLoader::new(dir);

    if !dir.is_dir() {
        loader.diags.error(
            "Failed to read module directory",
            format!("Module directory {} does not exist or cannot be read.", dir.display()),
            None,
        );
        return loader.finish();
    }

    let walker = FileWalker::new();
    for file in walker.walk(dir) {
        if walker.is_json(&file) {
            loader.diags.warning(
                "JSON configuration not supported",
                format!("{} was skipped; only native syntax files are read.", file.display()),
                None,
            );
            continue;
        }
        loader.load_file(&file);
    }

    tracing::debug!(
        "Loaded {} declarations from {}",
        loader.module.declaration_count(),
        dir.display()
    );
    loader.finish()
}

struct ModuleLoader {
    module: Module,
    diags: Diagnostics,
    // Address of every declaration seen so far, for duplicate detection.
    declared: HashMap<String, SourcePos>,
}

impl ModuleLoader {
    fn new(dir: &Path) -> Self {
        Self {
            module: Module::new(dir),
            diags: Diagnostics::new(),
            declared: HashMap::new(),
        }
    }

    fn finish(self) -> (Module, Diagnostics) {
        (self.module, self.diags)
    }

    fn load_file(&mut self, path: &Path) {
        let source = match fs::read(path) {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) => {
                self.diags.error(
                    "Failed to read file",
                    format!("The configuration file {} could not be read: {}", path.display(), e),
                    None,
                );
                return;
            }
        };
        tracing::debug!("Parsing {}", path.display());

        let grammar = HclGrammar;
        let mut parser = tree_sitter::Parser::new();
        if let Err(e) = parser.set_language(&grammar.language()) {
            self.diags.error("Failed to load HCL grammar", e.to_string(), None);
            return;
        }
        let query = match grammar.cached_declarations_query() {
            Ok(query) => query,
            Err(e) => {
                self.diags.error("Failed to load HCL grammar", e.to_string(), None);
                return;
            }
        };

        let Some(tree) = parser.parse(&source, None) else {
            self.diags.error(
                "Failed to parse file",
                format!("{} could not be parsed.", path.display()),
                None,
            );
            return;
        };

        let root = tree.root_node();
        if root.has_error() {
            let (line, detail) = match first_error(root) {
                Some(node) if node.is_missing() => (
                    node.start_position().row + 1,
                    format!("Expected \"{}\".", node.kind()),
                ),
                Some(node) => (
                    node.start_position().row + 1,
                    format!("Unexpected \"{}\".", node_text(&node, &source).trim()),
                ),
                None => (1, String::new()),
            };
            self.diags
                .error("Invalid HCL syntax", detail, Some(SourcePos::new(path, line)));
            return;
        }

        let mut cursor = tree_sitter::QueryCursor::new();
        let mut matches = cursor.matches(query, root, source.as_bytes());
        let mut blocks = Vec::new();
        while let Some(m) = matches.next() {
            for capture in m.captures {
                blocks.push(capture.node);
            }
        }

        for block in blocks {
            self.decode_block(block, &source, path);
        }
    }

    fn decode_block(&mut self, node: Node, source: &str, path: &Path) {
        let mut cursor = node.walk();
        let children: Vec<Node> = node
            .named_children(&mut cursor)
            .filter(|c| c.kind() != "comment")
            .collect();

        let Some(block_type) = children.first().map(|c| node_text(c, source)) else {
            return;
        };
        let labels: Vec<String> = children
            .iter()
            .skip(1)
            .take_while(|c| matches!(c.kind(), "string_lit" | "identifier"))
            .map(|c| label_text(c, source))
            .collect();
        let body = children.iter().find(|c| c.kind() == "body").copied();
        let pos = SourcePos::new(path, node.start_position().row + 1);

        match block_type {
            "resource" | "data" => {
                if !self.check_labels(block_type, &labels, &["type", "name"], &pos) {
                    return;
                }
                let mode = if block_type == "data" {
                    ResourceMode::Data
                } else {
                    ResourceMode::Managed
                };
                let resource = Resource {
                    mode,
                    resource_type: labels[0].clone(),
                    name: labels[1].clone(),
                    pos,
                };
                let address = match mode {
                    ResourceMode::Managed => format!("{}.{}", resource.resource_type, resource.name),
                    ResourceMode::Data => format!("data.{}.{}", resource.resource_type, resource.name),
                };
                if !self.declare(address, &format!("{} resource", mode), &resource.pos) {
                    return;
                }
                match mode {
                    ResourceMode::Managed => self.module.managed_resources.push(resource),
                    ResourceMode::Data => self.module.data_resources.push(resource),
                }
            }
            "variable" => {
                if !self.check_labels(block_type, &labels, &["name"], &pos) {
                    return;
                }
                let name = labels[0].clone();
                if !self.declare(format!("var.{}", name), "variable", &pos) {
                    return;
                }
                let type_expr = attribute_expr(body, "type", source)
                    .map(|expr| {
                        let raw = node_text(&expr, source).trim();
                        string_literal(raw).unwrap_or_else(|| raw.to_string())
                    })
                    .unwrap_or_default();
                self.module.variables.push(Variable {
                    name,
                    type_expr,
                    pos,
                });
            }
            "module" => {
                if !self.check_labels(block_type, &labels, &["name"], &pos) {
                    return;
                }
                let name = labels[0].clone();
                let source_attr = attribute_expr(body, "source", source)
                    .map(|expr| node_text(&expr, source).trim().to_string());
                let module_source = match source_attr.as_deref().map(string_literal) {
                    Some(Some(value)) => value,
                    Some(None) => {
                        self.diags.error(
                            "Invalid module source",
                            format!("The source address of module \"{}\" must be a literal string.", name),
                            Some(pos),
                        );
                        return;
                    }
                    None => {
                        self.diags.error(
                            "Missing required argument",
                            format!("The argument \"source\" is required in module \"{}\".", name),
                            Some(pos),
                        );
                        return;
                    }
                };
                if !self.declare(format!("module.{}", name), "module call", &pos) {
                    return;
                }
                let version = attribute_expr(body, "version", source)
                    .and_then(|expr| string_literal(node_text(&expr, source).trim()));
                self.module.module_calls.push(ModuleCall {
                    name,
                    source: module_source,
                    version,
                    pos,
                });
            }
            _ => {}
        }
    }

    fn check_labels(
        &mut self,
        block_type: &str,
        labels: &[String],
        expected: &[&str],
        pos: &SourcePos,
    ) -> bool {
        if labels.len() == expected.len() {
            return true;
        }
        let summary = if labels.len() < expected.len() {
            format!("Missing name for {}", block_type)
        } else {
            format!("Extraneous label for {}", block_type)
        };
        self.diags.error(
            summary,
            format!(
                "All {} blocks must have {} labels ({}).",
                block_type,
                expected.len(),
                expected.join(", ")
            ),
            Some(pos.clone()),
        );
        false
    }

    /// Records `address`; false (with a diagnostic) if it was already taken.
    fn declare(&mut self, address: String, what: &str, pos: &SourcePos) -> bool {
        if let Some(previous) = self.declared.get(&address) {
            self.diags.error(
                format!("Duplicate {} declaration", what),
                format!("{} was already declared at {}.", address, previous),
                Some(pos.clone()),
            );
            return false;
        }
        self.declared.insert(address, pos.clone());
        true
    }
}

fn node_text<'a>(node: &Node, source: &'a str) -> &'a str {
    node.utf8_text(source.as_bytes()).unwrap_or("")
}

fn label_text(node: &Node, source: &str) -> String {
    let text = node_text(node, source);
    if node.kind() == "string_lit" {
        string_literal(text).unwrap_or_else(|| text.trim_matches('"').to_string())
    } else {
        text.to_string()
    }
}

/// Expression node of the attribute `name` in a block body.
fn attribute_expr<'tree>(body: Option<Node<'tree>>, name: &str, source: &str) -> Option<Node<'tree>> {
    let body = body?;
    let mut cursor = body.walk();
    let found = body
        .named_children(&mut cursor)
        .filter(|c| c.kind() == "attribute")
        .find(|attr| {
            attr.named_child(0)
                .is_some_and(|ident| node_text(&ident, source) == name)
        })?;

    let mut cursor = found.walk();
    let expr = found
        .named_children(&mut cursor)
        .skip(1)
        .find(|c| c.kind() != "comment");
    expr
}

/// Value of a plain quoted string without interpolation, unescaped.
fn string_literal(raw: &str) -> Option<String> {
    let inner = raw.strip_prefix('"')?.strip_suffix('"')?;
    if inner.contains("${") || inner.contains("%{") {
        return None;
    }

    let mut value = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next()? {
                'n' => value.push('\n'),
                't' => value.push('\t'),
                'r' => value.push('\r'),
                other => value.push(other),
            },
            '"' => return None,
            _ => value.push(c),
        }
    }
    Some(value)
}

fn first_error(node: Node) -> Option<Node> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    if !node.has_error() {
        return None;
    }
    let mut cursor = node.walk();
    let children: Vec<Node> = node.children(&mut cursor).collect();
    children.into_iter().find_map(first_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tfconfig::Severity;
    use std::fs::File;
    use std::io::Write;
    use tempfile::TempDir;

    fn create_file(dir: &Path, name: &str, content: &str) {
        let mut file = File::create(dir.join(name)).unwrap();
        file.write_all(content.as_bytes()).unwrap();
    }

    fn load(files: &[(&str, &str)]) -> (Module, Diagnostics, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        for (name, content) in files {
            create_file(temp_dir.path(), name, content);
        }
        let (module, diags) = load_module(temp_dir.path());
        (module, diags, temp_dir)
    }

    #[test]
    fn test_load_resources_and_data() {
        let (module, diags, temp_dir) = load(&[(
            "main.tf",
            r#"provider "google" {
  project = var.project
}

resource "google_compute_instance" "web" {
  name = "web-1"
}

data "google_project" "current" {}
"#,
        )]);

        assert!(diags.is_empty(), "{}", diags);
        assert_eq!(module.managed_resources.len(), 1);
        assert_eq!(module.data_resources.len(), 1);

        let web = &module.managed_resources[0];
        assert_eq!(web.mode, ResourceMode::Managed);
        assert_eq!(web.resource_type, "google_compute_instance");
        assert_eq!(web.name, "web");
        assert_eq!(web.pos, SourcePos::new(temp_dir.path().join("main.tf"), 5));

        let project = &module.data_resources[0];
        assert_eq!(project.mode, ResourceMode::Data);
        assert_eq!(project.pos.line, 9);
    }

    #[test]
    fn test_load_variables() {
        let (module, diags, _temp_dir) = load(&[(
            "variables.tf",
            r#"variable "region" {
  type    = string
  default = "us-central1"
}

variable "legacy" {
  type = "string"
}

variable "zones" {
  type = list(string)
}

variable "untyped" {}
"#,
        )]);

        assert!(diags.is_empty(), "{}", diags);
        let types: Vec<(&str, &str)> = module
            .variables
            .iter()
            .map(|v| (v.name.as_str(), v.type_expr.as_str()))
            .collect();
        assert_eq!(
            types,
            vec![
                ("region", "string"),
                ("legacy", "string"),
                ("zones", "list(string)"),
                ("untyped", ""),
            ]
        );
        assert_eq!(module.variables[3].pos.line, 14);
    }

    #[test]
    fn test_load_module_calls() {
        let (module, diags, _temp_dir) = load(&[(
            "main.tf",
            r#"module "network" {
  source  = "terraform-google-modules/network/google"
  version = "~> 9.0"
}

module "local" {
  source = "./modules/local"
}
"#,
        )]);

        assert!(diags.is_empty(), "{}", diags);
        assert_eq!(module.module_calls.len(), 2);
        assert_eq!(module.module_calls[0].source, "terraform-google-modules/network/google");
        assert_eq!(module.module_calls[0].version.as_deref(), Some("~> 9.0"));
        assert_eq!(module.module_calls[1].source, "./modules/local");
        assert_eq!(module.module_calls[1].version, None);
        assert_eq!(module.module_calls[1].pos.line, 6);
    }

    #[test]
    fn test_load_ignores_nested_and_other_blocks() {
        let (module, diags, _temp_dir) = load(&[(
            "main.tf",
            r#"terraform {
  required_version = ">= 1.3"
}

locals {
  zone = "a"
}

output "ip" {
  value = "1.2.3.4"
}

resource "google_compute_instance" "vm" {
  dynamic "disk" {
    for_each = []
    content {}
  }
}
"#,
        )]);

        assert!(diags.is_empty(), "{}", diags);
        assert_eq!(module.declaration_count(), 1);
    }

    #[test]
    fn test_load_across_files_in_name_order() {
        let (module, diags, _temp_dir) = load(&[
            ("b.tf", "variable \"second\" {}\n"),
            ("a.tf", "variable \"first\" {}\n"),
        ]);

        assert!(diags.is_empty(), "{}", diags);
        let names: Vec<&str> = module.variables.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["first", "second"]);
    }

    #[test]
    fn test_duplicate_declaration_is_error() {
        let (module, diags, _temp_dir) = load(&[
            ("a.tf", "variable \"region\" {}\n"),
            ("b.tf", "\nvariable \"region\" {}\n"),
        ]);

        assert!(diags.has_errors());
        let error = diags.errors().next().unwrap();
        assert_eq!(error.summary, "Duplicate variable declaration");
        assert_eq!(error.pos.as_ref().map(|p| p.line), Some(2));
        assert_eq!(module.variables.len(), 1);
    }

    #[test]
    fn test_data_and_managed_share_no_namespace() {
        let (module, diags, _temp_dir) = load(&[(
            "main.tf",
            "resource \"google_project\" \"p\" {}\ndata \"google_project\" \"p\" {}\n",
        )]);

        assert!(diags.is_empty(), "{}", diags);
        assert_eq!(module.declaration_count(), 2);
    }

    #[test]
    fn test_missing_label_is_error() {
        let (_module, diags, _temp_dir) = load(&[("main.tf", "resource \"google_compute_instance\" {}\n")]);

        assert!(diags.has_errors());
        assert_eq!(
            diags.errors().next().unwrap().summary,
            "Missing name for resource"
        );
    }

    #[test]
    fn test_module_without_source_is_error() {
        let (module, diags, _temp_dir) = load(&[("main.tf", "module \"m\" {\n  version = \"1.0\"\n}\n")]);

        assert!(diags.has_errors());
        assert_eq!(
            diags.errors().next().unwrap().summary,
            "Missing required argument"
        );
        assert!(module.module_calls.is_empty());
    }

    #[test]
    fn test_module_with_interpolated_source_is_error() {
        let (_module, diags, _temp_dir) = load(&[(
            "main.tf",
            "module \"m\" {\n  source = \"./${var.dir}\"\n}\n",
        )]);

        assert!(diags.has_errors());
        assert_eq!(diags.errors().next().unwrap().summary, "Invalid module source");
    }

    #[test]
    fn test_syntax_error_is_reported() {
        let (_module, diags, temp_dir) = load(&[(
            "main.tf",
            "variable \"ok\" {}\n\nresource \"a\" \"b\" {\n  name = \n",
        )]);

        assert!(diags.has_errors());
        let error = diags.errors().next().unwrap();
        assert_eq!(error.summary, "Invalid HCL syntax");
        assert_eq!(
            error.pos.as_ref().map(|p| p.filename.clone()),
            Some(temp_dir.path().join("main.tf"))
        );
    }

    #[test]
    fn test_json_config_is_warning() {
        let (module, diags, _temp_dir) = load(&[
            ("main.tf", "variable \"region\" {}\n"),
            ("extra.tf.json", "{\"variable\": {\"zone\": {}}}"),
        ]);

        assert!(!diags.has_errors());
        assert_eq!(diags.len(), 1);
        assert_eq!(diags.iter().next().unwrap().severity, Severity::Warning);
        assert_eq!(module.variables.len(), 1);
    }

    #[test]
    fn test_missing_directory_is_error() {
        let (module, diags) = load_module(Path::new("/nonexistent/terraform/module"));

        assert!(diags.has_errors());
        assert_eq!(
            diags.errors().next().unwrap().summary,
            "Failed to read module directory"
        );
        assert_eq!(module.declaration_count(), 0);
    }

    #[test]
    fn test_empty_directory_has_no_declarations() {
        let (module, diags, _temp_dir) = load(&[]);
        assert!(diags.is_empty());
        assert_eq!(module.declaration_count(), 0);
    }

    #[test]
    fn test_string_literal() {
        assert_eq!(string_literal("\"./net\"").as_deref(), Some("./net"));
        assert_eq!(string_literal("\"a\\\"b\"").as_deref(), Some("a\"b"));
        assert_eq!(string_literal("\"\"").as_deref(), Some(""));
        assert_eq!(string_literal("\"${var.x}\""), None);
        assert_eq!(string_literal("\"a\" == \"b\""), None);
        assert_eq!(string_literal("string"), None);
    }
}

use std::collections::BTreeMap;

use crate::blocks::{scrape_attributes, Block, BlockKind, Blocks, SourceCache, TargetNames};
use crate::error::{ExtractError, Result};
use crate::tfconfig::{Module, ModuleCall, Resource, SourcePos, Variable};

/// Settings for turning a loaded module into [`Blocks`].
#[derive(Debug, Clone, Default)]
pub struct ExtractOptions {
    /// Attribute names scraped from block text.
    pub targets: TargetNames,
    /// Also scrape variables and module calls; only resources are scraped
    /// otherwise.
    pub scrape_all_kinds: bool,
}

impl ExtractOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_targets(mut self, targets: TargetNames) -> Self {
        self.targets = targets;
        self
    }

    pub fn with_scrape_all_kinds(mut self, scrape_all_kinds: bool) -> Self {
        self.scrape_all_kinds = scrape_all_kinds;
        self
    }
}

/// Converts loader declarations into blocks.
pub struct BlockBuilder {
    options: ExtractOptions,
}

impl BlockBuilder {
    pub fn new(options: ExtractOptions) -> Self {
        Self { options }
    }

    pub fn resource(&self, resource: &Resource, cache: &mut SourceCache) -> Result<Block> {
        self.build(
            &resource.name,
            &resource.resource_type,
            resource.mode.into(),
            &resource.pos,
            true,
            cache,
        )
    }

    pub fn variable(&self, variable: &Variable, cache: &mut SourceCache) -> Result<Block> {
        self.build(
            &variable.name,
            &variable.type_expr,
            BlockKind::Variable,
            &variable.pos,
            self.options.scrape_all_kinds,
            cache,
        )
    }

    pub fn module_call(&self, call: &ModuleCall, cache: &mut SourceCache) -> Result<Block> {
        let mut block = self.build(
            &call.name,
            &call.source,
            BlockKind::Module,
            &call.pos,
            self.options.scrape_all_kinds,
            cache,
        )?;
        block.version = call.version.clone();
        Ok(block)
    }

    fn build(
        &self,
        name: &str,
        type_name: &str,
        kind: BlockKind,
        pos: &SourcePos,
        scrape: bool,
        cache: &mut SourceCache,
    ) -> Result<Block> {
        let text = cache
            .block_text(&pos.filename, pos.line)
            .map_err(|source| ExtractError::Build { kind, source })?;

        let attr = if scrape {
            scrape_attributes(&text, &self.options.targets)
        } else {
            BTreeMap::new()
        };

        Ok(Block {
            name: name.to_string(),
            text,
            kind,
            type_name: type_name.to_string(),
            attr,
            version: None,
            file: pos.filename.clone(),
            start: pos.line,
        })
    }

    /// Builds every declaration of `module` and orders the result by start
    /// line. The first declaration that fails aborts the whole module.
    pub fn assemble(&self, module: &Module) -> Result<Blocks> {
        let mut cache = SourceCache::new();
        let mut result = Vec::with_capacity(module.declaration_count());

        for call in &module.module_calls {
            let block = self
                .module_call(call, &mut cache)
                .map_err(|e| in_collection("module calls", e))?;
            result.push(block);
        }

        for resource in &module.managed_resources {
            let block = self
                .resource(resource, &mut cache)
                .map_err(|e| in_collection("managed resources", e))?;
            result.push(block);
        }

        for resource in &module.data_resources {
            let block = self
                .resource(resource, &mut cache)
                .map_err(|e| in_collection("data resources", e))?;
            result.push(block);
        }

        for variable in &module.variables {
            let block = self
                .variable(variable, &mut cache)
                .map_err(|e| in_collection("variables", e))?;
            result.push(block);
        }

        tracing::debug!(
            "Assembled {} blocks from {} files",
            result.len(),
            cache.cached_files()
        );

        Ok(Blocks::from_unsorted(result))
    }
}

impl Default for BlockBuilder {
    fn default() -> Self {
        Self::new(ExtractOptions::default())
    }
}

fn in_collection(collection: &'static str, error: ExtractError) -> ExtractError {
    ExtractError::Collection {
        collection,
        source: Box::new(error),
    }
}

// Copyright (c) The testrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Module attribution for parsed test cases.
//!
//! A [`ModuleDetectionChain`] evaluates strategies in a fixed order and
//! returns the first match. The per-module strategy runs before the aggregate
//! one: a per-module build context yields unambiguous attribution and must
//! take priority over the coarser aggregate-build inference.

use crate::build_meta::ModuleRoot;
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use testrelay_metadata::BuildToolKind;

/// The capability "given a candidate path, produce a module name or decline".
///
/// Strategies are stateless beyond the build context captured at
/// construction.
pub trait ModuleDetection {
    /// Returns the owning module name for `path`, or `None` to decline.
    fn module_for(&self, path: &Utf8Path) -> Option<String>;
}

/// Per-module build detection: matches the module roots captured from the
/// build, longest root first so nested modules win over their parents.
#[derive(Debug)]
pub struct ModuleBuildDetection {
    roots: Vec<ModuleRoot>,
}

impl ModuleBuildDetection {
    /// Creates a detection over the given module roots.
    pub fn new(mut roots: Vec<ModuleRoot>) -> Self {
        roots.sort_by_key(|r| std::cmp::Reverse(r.root.as_str().len()));
        Self { roots }
    }
}

impl ModuleDetection for ModuleBuildDetection {
    fn module_for(&self, path: &Utf8Path) -> Option<String> {
        self.roots
            .iter()
            .find(|r| path.starts_with(&r.root))
            .map(|r| r.name.clone())
    }
}

/// Aggregate build detection: attributes a path to the first directory
/// segment below the workspace root.
///
/// Declines for paths directly under the root (those belong to the aggregate
/// project itself, not a module).
#[derive(Debug)]
pub struct AggregateBuildDetection {
    workspace_root: Option<Utf8PathBuf>,
}

impl AggregateBuildDetection {
    /// Creates a detection rooted at the given workspace root, if one was
    /// resolved.
    pub fn new(workspace_root: Option<Utf8PathBuf>) -> Self {
        Self { workspace_root }
    }
}

impl ModuleDetection for AggregateBuildDetection {
    fn module_for(&self, path: &Utf8Path) -> Option<String> {
        let root = self.workspace_root.as_deref()?;
        let relative = path.strip_prefix(root).ok()?;
        let mut components = relative.components();
        let first = components.next()?.as_str().to_owned();
        // A path with no further components is a file directly under the
        // workspace root.
        components.next()?;
        Some(first)
    }
}

/// The always-declining default strategy, terminating the chain.
#[derive(Debug)]
pub struct DefaultDetection;

impl ModuleDetection for DefaultDetection {
    fn module_for(&self, _path: &Utf8Path) -> Option<String> {
        None
    }
}

/// The serializable inputs the chain is built from.
///
/// The chain itself holds no live handles; it is constructed on the
/// controller, shipped inside the collection request, and rebuilt on the
/// worker.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ModuleDetectionConfig {
    /// The module roots known to the build.
    #[serde(default)]
    pub module_roots: Vec<ModuleRoot>,

    /// The workspace root, when resolved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace_root: Option<Utf8PathBuf>,

    /// The build-tool kind the chain is being built for.
    pub tool_kind: BuildToolKind,
}

impl ModuleDetectionConfig {
    /// Builds the detection chain for this configuration.
    pub fn build_chain(&self) -> ModuleDetectionChain {
        let aggregate_root = matches!(
            self.tool_kind,
            BuildToolKind::MavenModule | BuildToolKind::MavenAggregate
        )
        .then(|| self.workspace_root.clone())
        .flatten();

        ModuleDetectionChain {
            strategies: vec![
                Box::new(ModuleBuildDetection::new(self.module_roots.clone())),
                Box::new(AggregateBuildDetection::new(aggregate_root)),
                Box::new(DefaultDetection),
            ],
        }
    }
}

/// An ordered list of strategies, evaluated first-match-wins.
pub struct ModuleDetectionChain {
    strategies: Vec<Box<dyn ModuleDetection + Send + Sync>>,
}

impl ModuleDetectionChain {
    /// Returns the first non-declined module name for `path`.
    pub fn detect(&self, path: &Utf8Path) -> Option<String> {
        self.strategies.iter().find_map(|s| s.module_for(path))
    }
}

impl std::fmt::Debug for ModuleDetectionChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleDetectionChain")
            .field("strategies", &self.strategies.len())
            .finish()
    }
}

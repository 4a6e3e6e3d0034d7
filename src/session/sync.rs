use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::compile::compiler::{CompileOpts, compile_layers};
use crate::compile::lookup::ImageLookup;
use crate::compile::patch::{PatchReport, patch_values};
use crate::compile::signature::{compute_signature, needs_full_rebuild};
use crate::foundation::core::{Canvas, LayerId};
use crate::foundation::error::{PsdGraphError, PsdGraphResult};
use crate::graph::model::CompositeGraph;
use crate::layer::document::DocumentTree;
use crate::layer::model::{LayerList, LayerRecord, VisibilityOverride};
use crate::session::context::SyncContext;

/// Freshly read document contents.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DocumentSnapshot {
    /// Flattened records, top first. Clip bases need not be resolved.
    pub records: Vec<LayerRecord>,
    /// Canvas size.
    pub canvas: Canvas,
}

/// Reads the layered document behind a session.
pub trait DocumentSource {
    /// Read the document at `path`.
    fn read_document(&mut self, path: &Path) -> anyhow::Result<DocumentSnapshot>;

    /// Cheap change marker for polling, such as a modification time.
    fn revision(&self, _path: &Path) -> Option<u64> {
        None
    }
}

/// [`DocumentSource`] reading [`DocumentTree`] JSON snapshots from disk.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonDocumentSource;

impl DocumentSource for JsonDocumentSource {
    fn read_document(&mut self, path: &Path) -> anyhow::Result<DocumentSnapshot> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read document {}", path.display()))?;
        let tree = DocumentTree::from_json(&text)
            .with_context(|| format!("parse document {}", path.display()))?;
        Ok(tree.into())
    }

    fn revision(&self, path: &Path) -> Option<u64> {
        let modified = std::fs::metadata(path).ok()?.modified().ok()?;
        let since = modified.duration_since(std::time::UNIX_EPOCH).ok()?;
        u64::try_from(since.as_nanos()).ok()
    }
}

/// An in-memory tree is its own source; the path is ignored.
impl DocumentSource for DocumentTree {
    fn read_document(&mut self, _path: &Path) -> anyhow::Result<DocumentSnapshot> {
        Ok(self.clone().into())
    }
}

impl From<DocumentTree> for DocumentSnapshot {
    fn from(tree: DocumentTree) -> Self {
        Self {
            records: tree.flatten(),
            canvas: tree.canvas,
        }
    }
}

/// Options controlling a [`SyncSession`].
#[derive(Clone, Debug, PartialEq)]
pub struct SyncSessionOpts {
    /// Options for full rebuilds.
    pub compile: CompileOpts,
    /// Rebuild instead of patching while the current graph still has placeholder content.
    pub rebuild_on_placeholders: bool,
}

impl Default for SyncSessionOpts {
    fn default() -> Self {
        Self {
            compile: CompileOpts::default(),
            rebuild_on_placeholders: true,
        }
    }
}

/// Where a session is in its sync cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPhase {
    /// No sync running.
    #[default]
    Idle,
    /// The new list is read and its signature computed.
    SignatureComputed,
    /// Patching values of the current graph.
    PatchInPlace,
    /// Building a replacement graph.
    FullRebuild,
}

/// Result of a successful sync.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncOutcome {
    /// The graph was replaced.
    Rebuilt {
        /// Node count of the new graph.
        nodes: usize,
    },
    /// The graph was patched in place.
    Patched(PatchReport),
}

/// Keeps one generated graph in sync with one layered document.
///
/// The session owns the current layer list and graph. Visibility overrides and the selected
/// layer survive syncs by layer id. A failed sync leaves both untouched.
#[derive(Debug)]
pub struct SyncSession {
    path: PathBuf,
    opts: SyncSessionOpts,
    phase: SyncPhase,
    layers: LayerList,
    canvas: Canvas,
    graph: Option<CompositeGraph>,
    selection: Option<LayerId>,
    context: SyncContext,
}

impl SyncSession {
    /// Session for the document at `path`. Nothing is read until the first sync.
    pub fn new(path: impl Into<PathBuf>, opts: SyncSessionOpts) -> Self {
        let mut context = SyncContext::default();
        context.init();
        Self {
            path: path.into(),
            opts,
            phase: SyncPhase::Idle,
            layers: LayerList::default(),
            canvas: Canvas::default(),
            graph: None,
            selection: None,
            context,
        }
    }

    /// Document path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current phase; `Idle` outside of [`SyncSession::sync`].
    pub fn phase(&self) -> SyncPhase {
        self.phase
    }

    /// Layer list of the last successful sync.
    pub fn layers(&self) -> &LayerList {
        &self.layers
    }

    /// Canvas of the last successful sync.
    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    /// Current graph, if any sync has succeeded.
    pub fn graph(&self) -> Option<&CompositeGraph> {
        self.graph.as_ref()
    }

    /// Sync bookkeeping.
    pub fn context(&self) -> &SyncContext {
        &self.context
    }

    /// Read the document and bring the graph up to date.
    ///
    /// Rebuilds when there is no graph yet, when the structural signature changed, or (with
    /// `rebuild_on_placeholders`) when the graph still holds placeholders. Otherwise patches
    /// values in place. The replacement graph is swapped in only once complete.
    #[tracing::instrument(skip(self, source, lookup), fields(path = %self.path.display()))]
    pub fn sync(
        &mut self,
        source: &mut dyn DocumentSource,
        lookup: &dyn ImageLookup,
    ) -> PsdGraphResult<SyncOutcome> {
        if self.phase != SyncPhase::Idle {
            return Err(PsdGraphError::sync(format!(
                "sync requested while in phase {:?}",
                self.phase
            )));
        }

        let snapshot = source
            .read_document(&self.path)
            .map_err(|e| PsdGraphError::document(format!("{}: {e:#}", self.path.display())))?;
        if snapshot.records.is_empty() {
            return Err(PsdGraphError::document(format!(
                "{}: document has no layers",
                self.path.display()
            )));
        }
        let mut layers = LayerList::new(snapshot.records)?;
        layers.carry_overrides_from(&self.layers);

        self.phase = SyncPhase::SignatureComputed;
        let signature = compute_signature(&layers);
        let rebuild = match &self.graph {
            None => true,
            Some(g) => {
                g.signature()
                    .is_none_or(|old| needs_full_rebuild(old, &signature))
                    || (self.opts.rebuild_on_placeholders && g.placeholder_count() > 0)
            }
        };

        let outcome = if !rebuild && let Some(graph) = self.graph.as_mut() {
            self.phase = SyncPhase::PatchInPlace;
            SyncOutcome::Patched(patch_values(graph, &layers))
        } else {
            self.phase = SyncPhase::FullRebuild;
            let graph = compile_layers(&layers, lookup, &self.opts.compile);
            let nodes = graph.len();
            self.graph = Some(graph);
            SyncOutcome::Rebuilt { nodes }
        };

        self.layers = layers;
        self.canvas = snapshot.canvas;
        if let Some(id) = self.selection
            && self.layers.position_of(id).is_none()
        {
            self.selection = None;
        }
        self.phase = SyncPhase::Idle;
        tracing::info!(?outcome, records = self.layers.len(), "sync finished");
        Ok(outcome)
    }

    /// Patch the current graph from the current layer list.
    ///
    /// Use after changing overrides; warns (and still patches) on a signature mismatch.
    pub fn update_values(&mut self) -> PsdGraphResult<PatchReport> {
        let graph = self
            .graph
            .as_mut()
            .ok_or_else(|| PsdGraphError::sync("no graph to update; sync first"))?;
        Ok(patch_values(graph, &self.layers))
    }

    /// Override the visibility of the layer with `id`. Returns `false` for unknown ids.
    pub fn set_visibility_override(&mut self, id: LayerId, value: VisibilityOverride) -> bool {
        self.layers.set_visibility_override(id, value)
    }

    /// Select the layer with `id`. Returns `false` for unknown ids.
    pub fn select(&mut self, id: LayerId) -> bool {
        let found = self.layers.position_of(id).is_some();
        if found {
            self.selection = Some(id);
        }
        found
    }

    /// Selected layer with its current list position.
    pub fn selected(&self) -> Option<(usize, &LayerRecord)> {
        let index = self.layers.position_of(self.selection?)?;
        Some((index, self.layers.get(index)?))
    }

    /// Ask for a sync on the next [`SyncSession::tick`].
    pub fn request_sync(&mut self) {
        self.context.request();
    }

    /// Poll `source` for a new revision; a change requests a sync.
    pub fn poll(&mut self, source: &dyn DocumentSource) -> bool {
        match source.revision(&self.path) {
            Some(rev) => self.context.observe_revision(rev),
            None => false,
        }
    }

    /// Run one sync if one is pending; `Ok(None)` otherwise.
    pub fn tick(
        &mut self,
        source: &mut dyn DocumentSource,
        lookup: &dyn ImageLookup,
    ) -> PsdGraphResult<Option<SyncOutcome>> {
        if !self.context.take_request() {
            return Ok(None);
        }
        self.sync(source, lookup).map(Some)
    }

    /// End the session's sync lifecycle; later requests are ignored.
    pub fn close(&mut self) {
        self.context.clear();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/sync.rs"]
mod tests;

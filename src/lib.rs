//! psdgraph compiles layered PSD-style documents into shader node graphs.
//!
//! A document is flattened into a [`LayerList`] (top-to-bottom records, nesting encoded by
//! indent). [`compile_layers`] turns the list into a [`CompositeGraph`] whose output node
//! reproduces the document's compositing: blend modes, opacity, masks, clipping masks, and
//! passthrough as well as isolated groups.
//!
//! Long-lived editing goes through a [`SyncSession`]:
//!
//! - Read the document through a [`DocumentSource`]
//! - Rebuild the graph when the [`StructuralSignature`] changes
//! - Otherwise patch opacity, blend and label values in place
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;

pub(crate) mod compile;
pub(crate) mod graph;
pub(crate) mod layer;
pub(crate) mod session;

pub use crate::foundation::core::{Canvas, LayerId, Point, Rgba};
pub use crate::foundation::error::{PsdGraphError, PsdGraphResult};

pub use crate::layer::document::{DocumentNode, DocumentTree};
pub use crate::layer::model::{BlendMode, LayerKind, LayerList, LayerRecord, VisibilityOverride};
pub use crate::layer::walk::{
    Children, GroupMode, Unit, children_of, effective_gate, group_mode, parent_of, units_of,
};

pub use crate::graph::blend::mix as mix_colors;
pub use crate::graph::eval::{EvaluatedOutput, SampleSource, evaluate};
pub use crate::graph::model::{
    CompositeGraph, ImageKey, InputSocket, MathOp, MixBlend, Node, NodeId, NodeKind, NodeRole,
    OutputRef, SocketDomain, SocketValue,
};

pub use crate::compile::compiler::{CompileOpts, compile_layers};
pub use crate::compile::lookup::{ImageLookup, NamedImageLookup, TextureRef};
pub use crate::compile::patch::{PatchReport, patch_values};
pub use crate::compile::signature::{StructuralSignature, compute_signature, needs_full_rebuild};

pub use crate::session::context::SyncContext;
pub use crate::session::sync::{
    DocumentSnapshot, DocumentSource, JsonDocumentSource, SyncOutcome, SyncPhase, SyncSession,
    SyncSessionOpts,
};

use std::collections::HashMap;

use crate::compile::signature::{compute_signature, needs_full_rebuild};
use crate::foundation::core::LayerId;
use crate::graph::emit::mix_label;
use crate::graph::model::{CompositeGraph, Node, NodeKind, NodeRole, SocketValue};
use crate::layer::model::{LayerList, LayerRecord};
use crate::layer::walk::effective_gate;

/// Outcome of a value patch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct PatchReport {
    /// Nodes whose values actually changed.
    pub changed: usize,
    /// The graph was built for a structurally different list.
    pub signature_mismatch: bool,
}

/// Bring the values of `graph` in line with `list` without touching its wiring.
///
/// Opacity gates, mix blend types and frame labels are rewritten from the record whose id
/// tags the node. A signature mismatch is logged and patching proceeds best-effort.
#[tracing::instrument(skip(graph, list), fields(nodes = graph.len(), records = list.len()))]
pub fn patch_values(graph: &mut CompositeGraph, list: &LayerList) -> PatchReport {
    let signature = compute_signature(list);
    let signature_mismatch = graph
        .signature()
        .is_none_or(|old| needs_full_rebuild(old, &signature));
    if signature_mismatch {
        tracing::warn!("layer structure differs from the graph; patching values best-effort");
    }

    let by_id: HashMap<LayerId, usize> = list
        .iter()
        .enumerate()
        .filter(|(_, r)| r.id.is_assigned())
        .map(|(i, r)| (r.id, i))
        .collect();

    let mut changed = 0;
    for node in &mut graph.nodes {
        let Some(&index) = node.source_layer.and_then(|id| by_id.get(&id)) else {
            continue;
        };
        if patch_node(node, list.records(), index) {
            changed += 1;
        }
    }

    tracing::debug!(changed, "patched node values");
    PatchReport {
        changed,
        signature_mismatch,
    }
}

fn patch_node(node: &mut Node, records: &[LayerRecord], index: usize) -> bool {
    let record = &records[index];
    match node.role {
        NodeRole::OpacityGate => {
            let gate = effective_gate(records, index);
            match node.inputs.get_mut(1).map(|s| &mut s.default) {
                Some(SocketValue::Scalar(v)) if *v != gate => {
                    *v = gate;
                    true
                }
                _ => false,
            }
        }
        NodeRole::ColorMix => {
            let blend = record.blend_mode.mix_blend();
            match &mut node.kind {
                NodeKind::Mix { blend: current } if *current != blend => {
                    *current = blend;
                    node.label = mix_label(blend);
                    true
                }
                _ => false,
            }
        }
        NodeRole::FrameLabel if node.label != record.name => {
            node.label.clone_from(&record.name);
            true
        }
        _ => false,
    }
}

#[cfg(test)]
#[path = "../../tests/unit/compile/patch.rs"]
mod tests;

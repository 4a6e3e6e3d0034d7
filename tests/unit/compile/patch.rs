use super::*;
use crate::compile::compiler::{CompileOpts, compile_layers};
use crate::compile::lookup::TextureRef;
use crate::graph::model::MixBlend;
use crate::layer::model::{BlendMode, VisibilityOverride};

fn by_id(_index: usize, r: &LayerRecord, mask: bool) -> Option<TextureRef> {
    Some(TextureRef::new(format!("{}{}", if mask { "m" } else { "c" }, r.id)))
}

fn records() -> Vec<LayerRecord> {
    vec![
        LayerRecord::layer(3, "clip", 0).clipping(),
        LayerRecord::layer(2, "top", 0),
        LayerRecord::group(1, "folder", 0, BlendMode::Passthrough).with_opacity(0.5),
        LayerRecord::layer(4, "inside", 1),
        LayerRecord::layer(5, "bottom", 0),
    ]
}

fn build(records: Vec<LayerRecord>) -> (LayerList, CompositeGraph) {
    let list = LayerList::new(records).unwrap();
    let graph = compile_layers(&list, &by_id, &CompileOpts::default());
    (list, graph)
}

fn gate_of(graph: &CompositeGraph, id: u32) -> Option<f32> {
    graph
        .nodes_for_layer(LayerId(id))
        .find(|(_, n)| n.role == NodeRole::OpacityGate)
        .and_then(|(_, n)| n.scalar_default(1))
}

#[test]
fn fresh_graph_needs_no_patch() {
    let (list, mut graph) = build(records());
    let before = graph.clone();
    let report = patch_values(&mut graph, &list);
    assert_eq!(
        report,
        PatchReport {
            changed: 0,
            signature_mismatch: false
        }
    );
    assert_eq!(graph, before);
}

#[test]
fn second_patch_changes_nothing() {
    let (_, mut graph) = build(records());

    let mut edited = records();
    edited[1].opacity = 0.25;
    edited[1].blend_mode = BlendMode::Multiply;
    edited[1].name = "renamed".into();
    edited[4].visibility_override = VisibilityOverride::ForceHide;
    let edited = LayerList::new(edited).unwrap();

    let first = patch_values(&mut graph, &edited);
    assert!(!first.signature_mismatch);
    // gate of 2, gate of 5, mix of 2, frame of 2
    assert_eq!(first.changed, 4);
    assert_eq!(gate_of(&graph, 2), Some(0.25));
    assert_eq!(gate_of(&graph, 5), Some(0.0));

    let second = patch_values(&mut graph, &edited);
    assert_eq!(second.changed, 0);
}

#[test]
fn patched_graph_equals_rebuilt_graph() {
    let (_, mut graph) = build(records());

    let mut edited = records();
    edited[0].blend_mode = BlendMode::Screen;
    edited[0].opacity = 0.7;
    edited[2].opacity = 0.2;
    edited[2].name = "renamed folder".into();
    let (edited, rebuilt) = build(edited);

    patch_values(&mut graph, &edited);
    assert_eq!(graph, rebuilt);
}

#[test]
fn passthrough_opacity_reaches_descendant_gate() {
    let (_, mut graph) = build(records());
    assert_eq!(gate_of(&graph, 4), Some(0.5));

    let mut edited = records();
    edited[2].is_visible = false;
    let edited = LayerList::new(edited).unwrap();
    patch_values(&mut graph, &edited);
    assert_eq!(gate_of(&graph, 4), Some(0.0));
}

#[test]
fn relabels_blend_mix_nodes() {
    let (_, mut graph) = build(records());
    let mut edited = records();
    edited[0].blend_mode = BlendMode::LinearDodge;
    patch_values(&mut graph, &LayerList::new(edited).unwrap());

    let (_, mix) = graph
        .nodes_for_layer(LayerId(3))
        .find(|(_, n)| n.role == NodeRole::ColorMix)
        .unwrap();
    assert_eq!(mix.kind, NodeKind::Mix { blend: MixBlend::Add });
    assert_eq!(mix.label, "Mix (ADD)");
}

#[test]
fn structural_mismatch_still_patches_known_ids() {
    let (_, mut graph) = build(records());

    let mut edited = records();
    edited.remove(0);
    edited[0].opacity = 0.1;
    let edited = LayerList::new(edited).unwrap();

    let report = patch_values(&mut graph, &edited);
    assert!(report.signature_mismatch);
    assert!(report.changed >= 1);
    assert_eq!(gate_of(&graph, 2), Some(0.1));
    // The removed clip's nodes are left alone.
    assert!(graph.nodes_for_layer(LayerId(3)).count() > 0);
}

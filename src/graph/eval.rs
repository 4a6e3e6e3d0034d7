//! Single-sample evaluation of a generated graph.
//!
//! Every texture is treated as a constant color, so evaluating a graph answers "what does
//! the graph produce at one pixel". Used by the CLI `eval` command and by tests comparing
//! generated graphs against a reference compositor.

use std::collections::{BTreeMap, HashMap};

use crate::foundation::core::Rgba;
use crate::foundation::error::{PsdGraphError, PsdGraphResult};
use crate::graph::blend;
use crate::graph::model::{CompositeGraph, ImageKey, InputSocket, NodeKind, OutputRef, SocketValue};

/// Per-texture sample values.
pub trait SampleSource {
    /// Sample of `image`, or `None` when unknown.
    fn sample(&self, image: &ImageKey) -> Option<Rgba>;
}

impl SampleSource for HashMap<ImageKey, Rgba> {
    fn sample(&self, image: &ImageKey) -> Option<Rgba> {
        self.get(image).copied()
    }
}

impl SampleSource for BTreeMap<ImageKey, Rgba> {
    fn sample(&self, image: &ImageKey) -> Option<Rgba> {
        self.get(image).copied()
    }
}

/// Values reaching the graph output.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct EvaluatedOutput {
    /// `OutColor`.
    pub color: Rgba,
    /// `OutAlpha`.
    pub alpha: f32,
}

#[derive(Clone, Copy, Debug)]
enum Outputs {
    None,
    Scalar(f32),
    Color(Rgba),
    ColorAlpha(Rgba, f32),
}

/// Evaluate `graph` at one sample.
///
/// Textures missing from `samples` are an error: the result would be meaningless.
#[tracing::instrument(skip(graph, samples), fields(nodes = graph.len()))]
pub fn evaluate(
    graph: &CompositeGraph,
    samples: &dyn SampleSource,
) -> PsdGraphResult<EvaluatedOutput> {
    let output_id = graph
        .output()
        .ok_or_else(|| PsdGraphError::evaluation("graph has no output node"))?;

    // Arena order is topological, so one forward pass suffices.
    let mut values: Vec<Outputs> = Vec::with_capacity(graph.len());
    for (id, node) in graph.iter() {
        let v = match &node.kind {
            NodeKind::Texture { image, .. } => {
                let c = samples.sample(image).ok_or_else(|| {
                    PsdGraphError::evaluation(format!("no sample for texture '{image}'"))
                })?;
                Outputs::ColorAlpha(c, c.a)
            }
            NodeKind::Rgb { value } => Outputs::Color(*value),
            NodeKind::Value { value } => Outputs::Scalar(*value),
            NodeKind::ColorToValue => Outputs::Scalar(color_in(&values, &node.inputs[0])?.luminance()),
            NodeKind::Math { op } => Outputs::Scalar(op.apply(
                scalar_in(&values, &node.inputs[0])?,
                scalar_in(&values, &node.inputs[1])?,
            )),
            NodeKind::Mix { blend } => Outputs::Color(blend::mix(
                *blend,
                scalar_in(&values, &node.inputs[0])?,
                color_in(&values, &node.inputs[1])?,
                color_in(&values, &node.inputs[2])?,
            )),
            NodeKind::Frame => Outputs::None,
            NodeKind::GroupOutput if id == output_id => {
                return Ok(EvaluatedOutput {
                    color: color_in(&values, &node.inputs[0])?,
                    alpha: scalar_in(&values, &node.inputs[1])?,
                });
            }
            NodeKind::GroupOutput => Outputs::None,
        };
        values.push(v);
    }

    Err(PsdGraphError::evaluation(format!(
        "output node {} is not in the graph",
        output_id.0
    )))
}

fn scalar_in(values: &[Outputs], socket: &InputSocket) -> PsdGraphResult<f32> {
    match socket.link {
        None => match socket.default {
            SocketValue::Scalar(v) => Ok(v),
            SocketValue::Color(c) => Ok(c.luminance()),
        },
        Some(l) => match (lookup(values, l)?, l.socket) {
            (Outputs::Scalar(v), 0) | (Outputs::ColorAlpha(_, v), 1) => Ok(v),
            _ => Err(dangling(l)),
        },
    }
}

fn color_in(values: &[Outputs], socket: &InputSocket) -> PsdGraphResult<Rgba> {
    match socket.link {
        None => match socket.default {
            SocketValue::Color(c) => Ok(c),
            SocketValue::Scalar(v) => Ok(Rgba::new(v, v, v, 1.0)),
        },
        Some(l) => match (lookup(values, l)?, l.socket) {
            (Outputs::Color(c), 0) | (Outputs::ColorAlpha(c, _), 0) => Ok(c),
            _ => Err(dangling(l)),
        },
    }
}

fn lookup(values: &[Outputs], l: OutputRef) -> PsdGraphResult<Outputs> {
    values.get(l.node.index()).copied().ok_or_else(|| dangling(l))
}

fn dangling(l: OutputRef) -> PsdGraphError {
    PsdGraphError::evaluation(format!(
        "input linked to unavailable output {}.{}",
        l.node.0, l.socket
    ))
}

#[cfg(test)]
#[path = "../../tests/unit/graph/eval.rs"]
mod tests;

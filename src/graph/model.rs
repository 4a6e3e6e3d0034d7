//! Generated node graph.
//!
//! Nodes live in an index arena. Every input link references a node created earlier, so
//! arena order is also a valid evaluation order.

use std::collections::HashMap;
use std::fmt::Write as _;

use smallvec::SmallVec;

use crate::compile::signature::StructuralSignature;
use crate::foundation::core::{LayerId, Point, Rgba};

/// Index of a node in a [`CompositeGraph`].
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl NodeId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// Reference to one output socket of a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize)]
pub struct OutputRef {
    /// Producing node.
    pub node: NodeId,
    /// Output socket index on that node.
    pub socket: u8,
}

/// Value domain of a socket.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SocketDomain {
    /// Single float.
    Scalar,
    /// RGBA color.
    Color,
}

/// Unlinked value of an input socket.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SocketValue {
    /// Float default.
    Scalar(f32),
    /// Color default.
    Color(Rgba),
}

impl SocketValue {
    /// Domain of the value.
    pub fn domain(self) -> SocketDomain {
        match self {
            Self::Scalar(_) => SocketDomain::Scalar,
            Self::Color(_) => SocketDomain::Color,
        }
    }
}

/// Input socket of a node: a default value, optionally overridden by a link.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct InputSocket {
    /// Socket name as shown by the host.
    pub name: &'static str,
    /// Default used when `link` is `None`.
    pub default: SocketValue,
    /// Upstream output feeding this socket.
    pub link: Option<OutputRef>,
}

impl InputSocket {
    pub(crate) fn scalar(name: &'static str, v: f32) -> Self {
        Self {
            name,
            default: SocketValue::Scalar(v),
            link: None,
        }
    }

    pub(crate) fn color(name: &'static str, c: Rgba) -> Self {
        Self {
            name,
            default: SocketValue::Color(c),
            link: None,
        }
    }

    /// Domain of the socket.
    pub fn domain(&self) -> SocketDomain {
        self.default.domain()
    }
}

/// Identity of a texture resource in the host.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct ImageKey(pub String);

impl ImageKey {
    /// Build a key from any string-like value.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ImageKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Scalar arithmetic performed by a math node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MathOp {
    /// `a + b`
    Add,
    /// `a - b`
    Subtract,
    /// `a * b`
    Multiply,
}

impl MathOp {
    /// Apply the operation.
    pub fn apply(self, a: f32, b: f32) -> f32 {
        match self {
            Self::Add => a + b,
            Self::Subtract => a - b,
            Self::Multiply => a * b,
        }
    }
}

/// Blend type of a host color mix node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[allow(missing_docs)]
pub enum MixBlend {
    Mix,
    Multiply,
    Screen,
    Overlay,
    Darken,
    Lighten,
    Dodge,
    Burn,
    LinearBurn,
    Add,
    SoftLight,
    LinearLight,
    Difference,
    Exclusion,
    Subtract,
    Divide,
    Hue,
    Saturation,
    Color,
    Value,
}

impl MixBlend {
    /// Host identifier of the blend type.
    pub fn host_name(self) -> &'static str {
        match self {
            Self::Mix => "MIX",
            Self::Multiply => "MULTIPLY",
            Self::Screen => "SCREEN",
            Self::Overlay => "OVERLAY",
            Self::Darken => "DARKEN",
            Self::Lighten => "LIGHTEN",
            Self::Dodge => "DODGE",
            Self::Burn => "BURN",
            Self::LinearBurn => "LINEAR_BURN",
            Self::Add => "ADD",
            Self::SoftLight => "SOFT_LIGHT",
            Self::LinearLight => "LINEAR_LIGHT",
            Self::Difference => "DIFFERENCE",
            Self::Exclusion => "EXCLUSION",
            Self::Subtract => "SUBTRACT",
            Self::Divide => "DIVIDE",
            Self::Hue => "HUE",
            Self::Saturation => "SATURATION",
            Self::Color => "COLOR",
            Self::Value => "VALUE",
        }
    }
}

/// Elementary operation of a node.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeKind {
    /// Texture sample. Outputs: `Color`, `Alpha`.
    Texture {
        /// Sampled image.
        image: ImageKey,
        /// Sample as non-color data (masks).
        non_color: bool,
    },
    /// Color to scalar conversion (luminance). Output: `Value`.
    ColorToValue,
    /// Constant color. Output: `Color`.
    Rgb {
        /// The constant.
        value: Rgba,
    },
    /// Constant scalar. Output: `Value`.
    Value {
        /// The constant.
        value: f32,
    },
    /// Scalar arithmetic on inputs `A`, `B`. Output: `Value`.
    Math {
        /// Operation.
        op: MathOp,
    },
    /// Color mix of `A` and `B` by `Factor`. Output: `Result`.
    Mix {
        /// Blend type.
        blend: MixBlend,
    },
    /// Cosmetic container; no sockets.
    Frame,
    /// Graph output with inputs `OutColor`, `OutAlpha`.
    GroupOutput,
}

impl NodeKind {
    /// Domain of output socket `socket`, or `None` when the node has no such output.
    pub fn output_domain(&self, socket: u8) -> Option<SocketDomain> {
        match (self, socket) {
            (Self::Texture { .. }, 0) => Some(SocketDomain::Color),
            (Self::Texture { .. }, 1) => Some(SocketDomain::Scalar),
            (Self::Rgb { .. } | Self::Mix { .. }, 0) => Some(SocketDomain::Color),
            (Self::ColorToValue | Self::Value { .. } | Self::Math { .. }, 0) => {
                Some(SocketDomain::Scalar)
            }
            _ => None,
        }
    }

    fn canonical(&self) -> String {
        match self {
            Self::Texture { image, non_color } => {
                format!("texture({image}{})", if *non_color { ", non-color" } else { "" })
            }
            Self::ColorToValue => "color_to_value".to_string(),
            Self::Rgb { value: c } => format!("rgb({}, {}, {}, {})", c.r, c.g, c.b, c.a),
            Self::Value { value } => format!("value({value})"),
            Self::Math { op } => format!("math({op:?})"),
            Self::Mix { blend } => format!("mix({})", blend.host_name()),
            Self::Frame => "frame".to_string(),
            Self::GroupOutput => "output".to_string(),
        }
    }
}

/// What a generated node is for. The patcher dispatches on this.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeRole {
    /// Frame labelled with the layer name.
    FrameLabel,
    /// Color/alpha texture of a layer.
    LayerTexture,
    /// Mask texture of a layer or group.
    MaskTexture,
    /// Mask converted to a scalar.
    MaskValue,
    /// Stand-in color for content that is not loaded yet.
    PlaceholderColor,
    /// Stand-in alpha for content that is not loaded yet.
    PlaceholderAlpha,
    /// Stand-in mask for a mask that is not loaded yet.
    PlaceholderMask,
    /// `alpha × own mask`.
    MaskGate,
    /// `× inherited passthrough mask`.
    InheritedMaskGate,
    /// `× base factor` for clipping layers.
    ClipGate,
    /// `× opacity × visibility`; constant operand in input 1.
    OpacityGate,
    /// `1 - factor`.
    InvertFactor,
    /// `below alpha × (1 - factor)`.
    BelowAlphaScale,
    /// `factor + scaled below alpha`.
    AlphaOver,
    /// Blend-mode color mix of a unit onto the stack below.
    ColorMix,
    /// Transparent color of an empty document.
    EmptyColor,
    /// Zero alpha of an empty document.
    EmptyAlpha,
    /// Graph output.
    Output,
}

/// One generated node.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct Node {
    /// Operation.
    pub kind: NodeKind,
    /// Purpose of the node.
    pub role: NodeRole,
    /// Layer that produced the node, when it has a stable id.
    pub source_layer: Option<LayerId>,
    /// Display label.
    pub label: String,
    /// Cosmetic layout position.
    pub location: Point,
    /// Enclosing frame.
    pub parent: Option<NodeId>,
    /// Input sockets.
    pub inputs: SmallVec<[InputSocket; 3]>,
}

impl Node {
    /// Scalar default of input `i`, if it is a scalar input.
    pub fn scalar_default(&self, i: usize) -> Option<f32> {
        match self.inputs.get(i)?.default {
            SocketValue::Scalar(v) => Some(v),
            SocketValue::Color(_) => None,
        }
    }
}

/// Node graph produced by the compiler.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize)]
pub struct CompositeGraph {
    pub(crate) nodes: Vec<Node>,
    pub(crate) output: Option<NodeId>,
    pub(crate) signature: Option<StructuralSignature>,
}

impl CompositeGraph {
    /// All nodes in arena order.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Node by id.
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.index())
    }

    /// Number of nodes, frames included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Return `true` when the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The output node.
    pub fn output(&self) -> Option<NodeId> {
        self.output
    }

    /// Structural signature of the layer list this graph was built from.
    pub fn signature(&self) -> Option<&StructuralSignature> {
        self.signature.as_ref()
    }

    /// Iterate `(id, node)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (NodeId(i as u32), n))
    }

    /// Nodes tagged with `layer`.
    pub fn nodes_for_layer(&self, layer: LayerId) -> impl Iterator<Item = (NodeId, &Node)> {
        self.iter()
            .filter(move |(_, n)| n.source_layer == Some(layer))
    }

    /// Number of nodes with `role`.
    pub fn count_role(&self, role: NodeRole) -> usize {
        self.nodes.iter().filter(|n| n.role == role).count()
    }

    /// Number of placeholder nodes standing in for content that was not found.
    pub fn placeholder_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| {
                matches!(
                    n.role,
                    NodeRole::PlaceholderColor
                        | NodeRole::PlaceholderAlpha
                        | NodeRole::PlaceholderMask
                )
            })
            .count()
    }

    /// Every link as `(from, to_node, to_input)`.
    pub fn links(&self) -> impl Iterator<Item = (OutputRef, NodeId, usize)> + '_ {
        self.iter().flat_map(|(id, n)| {
            n.inputs
                .iter()
                .enumerate()
                .filter_map(move |(i, s)| s.link.map(|l| (l, id, i)))
        })
    }

    /// Deterministic text rendering of the wiring reachable from the output.
    ///
    /// Nodes are numbered in post-order from the output sockets, so two graphs with the same
    /// wiring render identically whatever their arena layout. Frames, labels, layer tags and
    /// locations are not part of the rendering.
    pub fn canonical_wiring(&self) -> String {
        let mut out = String::new();
        let Some(output) = self.output.and_then(|id| self.node(id)) else {
            return out;
        };

        let mut numbering: HashMap<NodeId, usize> = HashMap::new();
        let mut lines: Vec<String> = Vec::new();
        let ins: Vec<String> = output
            .inputs
            .iter()
            .map(|s| self.render_input(s, &mut numbering, &mut lines))
            .collect();

        for line in &lines {
            let _ = writeln!(out, "{line}");
        }
        let _ = writeln!(out, "out = ({})", ins.join(", "));
        out
    }

    fn render_input(
        &self,
        socket: &InputSocket,
        numbering: &mut HashMap<NodeId, usize>,
        lines: &mut Vec<String>,
    ) -> String {
        match socket.link {
            Some(l) => {
                let n = self.render_node(l.node, numbering, lines);
                format!("n{n}.{}", l.socket)
            }
            None => match socket.default {
                SocketValue::Scalar(v) => format!("{v}"),
                SocketValue::Color(c) => format!("[{}, {}, {}, {}]", c.r, c.g, c.b, c.a),
            },
        }
    }

    fn render_node(
        &self,
        id: NodeId,
        numbering: &mut HashMap<NodeId, usize>,
        lines: &mut Vec<String>,
    ) -> usize {
        if let Some(&n) = numbering.get(&id) {
            return n;
        }
        let Some(node) = self.node(id) else {
            panic!("link to missing node {}", id.0);
        };
        let ins: Vec<String> = node
            .inputs
            .iter()
            .map(|s| self.render_input(s, numbering, lines))
            .collect();
        let n = lines.len();
        lines.push(format!("n{n} = {}[{}]", node.kind.canonical(), ins.join(", ")));
        numbering.insert(id, n);
        n
    }
}

#[cfg(test)]
#[path = "../../tests/unit/graph/model.rs"]
mod tests;

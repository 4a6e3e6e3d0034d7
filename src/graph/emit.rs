//! Node factory and linker used by the compiler.
//!
//! Handles are typed by domain, so the compiler cannot wire a color into a scalar input. The
//! untyped [`Emitter::link`] still checks domains and panics on a mismatch.

use smallvec::{SmallVec, smallvec};

use crate::foundation::core::{LayerId, Point, Rgba};
use crate::graph::model::{
    CompositeGraph, ImageKey, InputSocket, MathOp, MixBlend, Node, NodeId, NodeKind, NodeRole,
    OutputRef,
};

/// Scalar output socket.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScalarSocket(pub(crate) OutputRef);

/// Color output socket.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ColorSocket(pub(crate) OutputRef);

/// Scalar operand: a constant written into the input, or a link.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Scalar {
    /// Constant default.
    Const(f32),
    /// Linked output.
    Socket(ScalarSocket),
}

impl Scalar {
    /// The constant one.
    pub const ONE: Scalar = Scalar::Const(1.0);
}

impl From<ScalarSocket> for Scalar {
    fn from(s: ScalarSocket) -> Self {
        Self::Socket(s)
    }
}

/// Color operand: a constant written into the input, or a link.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Color {
    /// Constant default.
    Const(Rgba),
    /// Linked output.
    Socket(ColorSocket),
}

impl From<ColorSocket> for Color {
    fn from(s: ColorSocket) -> Self {
        Self::Socket(s)
    }
}

/// Provenance attached to every emitted node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tag {
    /// Node role.
    pub role: NodeRole,
    /// Producing layer; unassigned ids are not recorded.
    pub layer: LayerId,
}

impl Tag {
    /// Tag for `role` on behalf of `layer`.
    pub fn new(role: NodeRole, layer: LayerId) -> Self {
        Self { role, layer }
    }

    /// Tag not tied to any layer.
    pub fn untagged(role: NodeRole) -> Self {
        Self::new(role, LayerId::NONE)
    }
}

/// Saved emitter state; see [`Emitter::rollback`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Checkpoint {
    nodes: usize,
    frames: usize,
    column: u32,
    row: u32,
}

/// Deterministic node factory over a [`CompositeGraph`].
#[derive(Debug)]
pub struct Emitter {
    graph: CompositeGraph,
    frames: Vec<NodeId>,
    column: u32,
    row: u32,
    spacing: f64,
}

impl Emitter {
    /// Empty emitter placing nodes `spacing` units apart.
    pub fn new(spacing: f64) -> Self {
        Self {
            graph: CompositeGraph::default(),
            frames: Vec::new(),
            column: 0,
            row: 0,
            spacing,
        }
    }

    /// Move the layout cursor to a fresh column to the right.
    pub fn next_column(&mut self) {
        self.column += 1;
        self.row = 0;
    }

    /// Open a frame; nodes emitted until [`Emitter::pop_frame`] are placed inside it.
    pub fn push_frame(&mut self, label: &str, layer: LayerId) -> NodeId {
        let id = self.push_node(
            NodeKind::Frame,
            Tag::new(NodeRole::FrameLabel, layer),
            label.to_string(),
            SmallVec::new(),
        );
        self.frames.push(id);
        id
    }

    /// Close the innermost frame.
    pub fn pop_frame(&mut self) {
        self.frames.pop();
    }

    /// Texture sample. Returns the color and alpha outputs.
    pub fn texture(
        &mut self,
        image: ImageKey,
        non_color: bool,
        tag: Tag,
    ) -> (ColorSocket, ScalarSocket) {
        let label = image.to_string();
        let id = self.push_node(
            NodeKind::Texture { image, non_color },
            tag,
            label,
            SmallVec::new(),
        );
        (
            ColorSocket(OutputRef { node: id, socket: 0 }),
            ScalarSocket(OutputRef { node: id, socket: 1 }),
        )
    }

    /// Constant color node.
    pub fn rgb(&mut self, value: Rgba, tag: Tag) -> ColorSocket {
        let id = self.push_node(NodeKind::Rgb { value }, tag, "RGB".into(), SmallVec::new());
        ColorSocket(OutputRef { node: id, socket: 0 })
    }

    /// Constant scalar node.
    pub fn value(&mut self, value: f32, tag: Tag) -> ScalarSocket {
        let id = self.push_node(NodeKind::Value { value }, tag, "Value".into(), SmallVec::new());
        ScalarSocket(OutputRef { node: id, socket: 0 })
    }

    /// Luminance of a color.
    pub fn color_to_value(&mut self, color: ColorSocket, tag: Tag) -> ScalarSocket {
        let id = self.push_node(
            NodeKind::ColorToValue,
            tag,
            "Color to Value".into(),
            smallvec![InputSocket::color("Color", Rgba::TRANSPARENT)],
        );
        self.link(id, 0, color.0);
        ScalarSocket(OutputRef { node: id, socket: 0 })
    }

    /// Scalar arithmetic `a op b`.
    pub fn math(&mut self, op: MathOp, a: Scalar, b: Scalar, tag: Tag) -> ScalarSocket {
        let id = self.push_node(
            NodeKind::Math { op },
            tag,
            format!("{op:?}"),
            smallvec![
                InputSocket::scalar("A", 0.0),
                InputSocket::scalar("B", 0.0)
            ],
        );
        self.bind_scalar(id, 0, a);
        self.bind_scalar(id, 1, b);
        ScalarSocket(OutputRef { node: id, socket: 0 })
    }

    /// Color mix of `a` (below) and `b` (above) by `factor` using `blend`.
    pub fn mix(
        &mut self,
        blend: MixBlend,
        factor: Scalar,
        a: Color,
        b: Color,
        tag: Tag,
    ) -> ColorSocket {
        let id = self.push_node(
            NodeKind::Mix { blend },
            tag,
            mix_label(blend),
            smallvec![
                InputSocket::scalar("Factor", 0.5),
                InputSocket::color("A", Rgba::TRANSPARENT),
                InputSocket::color("B", Rgba::TRANSPARENT)
            ],
        );
        self.bind_scalar(id, 0, factor);
        self.bind_color(id, 1, a);
        self.bind_color(id, 2, b);
        ColorSocket(OutputRef { node: id, socket: 0 })
    }

    /// Graph output node; replaces any previous output.
    pub fn output(&mut self, color: Color, alpha: Scalar) -> NodeId {
        let id = self.push_node(
            NodeKind::GroupOutput,
            Tag::untagged(NodeRole::Output),
            "Group Output".into(),
            smallvec![
                InputSocket::color("OutColor", Rgba::TRANSPARENT),
                InputSocket::scalar("OutAlpha", 0.0)
            ],
        );
        self.bind_color(id, 0, color);
        self.bind_scalar(id, 1, alpha);
        self.graph.output = Some(id);
        id
    }

    /// Link `from` into input `input` of node `to`.
    ///
    /// # Panics
    ///
    /// When either endpoint does not exist, when `from` does not precede `to`, or when the
    /// socket domains differ. These are wiring defects in the caller.
    pub fn link(&mut self, to: NodeId, input: usize, from: OutputRef) {
        assert!(
            from.node < to,
            "link from node {} into earlier node {}",
            from.node.0,
            to.0
        );
        let Some(from_domain) = self
            .graph
            .node(from.node)
            .and_then(|n| n.kind.output_domain(from.socket))
        else {
            panic!("node {} has no output socket {}", from.node.0, from.socket);
        };
        let Some(socket) = self
            .graph
            .node_mut(to)
            .and_then(|n| n.inputs.get_mut(input))
        else {
            panic!("node {} has no input socket {input}", to.0);
        };
        assert_eq!(
            socket.domain(),
            from_domain,
            "cannot link {from_domain:?} output into {:?} input '{}'",
            socket.domain(),
            socket.name
        );
        socket.link = Some(from);
    }

    /// Save the current state.
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            nodes: self.graph.nodes.len(),
            frames: self.frames.len(),
            column: self.column,
            row: self.row,
        }
    }

    /// Drop everything emitted since `cp`, restoring the layout cursor and frame stack.
    pub fn rollback(&mut self, cp: Checkpoint) {
        self.graph.nodes.truncate(cp.nodes);
        self.frames.truncate(cp.frames);
        self.column = cp.column;
        self.row = cp.row;
        if self.graph.output.is_some_and(|o| o.index() >= cp.nodes) {
            self.graph.output = None;
        }
    }

    /// Number of nodes emitted so far.
    pub fn len(&self) -> usize {
        self.graph.nodes.len()
    }

    /// Return `true` when nothing has been emitted.
    pub fn is_empty(&self) -> bool {
        self.graph.nodes.is_empty()
    }

    /// Finish and return the graph.
    pub fn into_graph(self) -> CompositeGraph {
        self.graph
    }

    fn bind_scalar(&mut self, node: NodeId, input: usize, v: Scalar) {
        match v {
            Scalar::Const(c) => self.set_default(node, input, InputSocket::scalar("", c)),
            Scalar::Socket(s) => self.link(node, input, s.0),
        }
    }

    fn bind_color(&mut self, node: NodeId, input: usize, v: Color) {
        match v {
            Color::Const(c) => self.set_default(node, input, InputSocket::color("", c)),
            Color::Socket(s) => self.link(node, input, s.0),
        }
    }

    fn set_default(&mut self, node: NodeId, input: usize, value: InputSocket) {
        let Some(socket) = self
            .graph
            .node_mut(node)
            .and_then(|n| n.inputs.get_mut(input))
        else {
            panic!("node {} has no input socket {input}", node.0);
        };
        assert_eq!(socket.domain(), value.domain(), "constant of wrong domain");
        socket.default = value.default;
    }

    fn push_node(
        &mut self,
        kind: NodeKind,
        tag: Tag,
        label: String,
        inputs: SmallVec<[InputSocket; 3]>,
    ) -> NodeId {
        let id = NodeId(self.graph.nodes.len() as u32);
        let location = Point::new(
            f64::from(self.column) * self.spacing,
            -f64::from(self.row) * self.spacing * 0.5,
        );
        self.row += 1;
        self.graph.nodes.push(Node {
            kind,
            role: tag.role,
            source_layer: tag.layer.is_assigned().then_some(tag.layer),
            label,
            location,
            parent: self.frames.last().copied(),
            inputs,
        });
        id
    }
}

/// Display label of a color mix node.
pub(crate) fn mix_label(blend: MixBlend) -> String {
    format!("Mix ({})", blend.host_name())
}

#[cfg(test)]
#[path = "../../tests/unit/graph/emit.rs"]
mod tests;

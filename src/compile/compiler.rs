//! Layer list to node graph compiler.
//!
//! Each level's children are composited bottom-to-top as units (a base plus its clipping
//! layers). A unit resolves its content, gates the content alpha into a factor, mixes its
//! clips onto the isolated base result and finally mixes that onto the stack below with the
//! base's blend mode. Running state is threaded through return values; the only shared
//! mutable state is the emitter.

use crate::compile::lookup::ImageLookup;
use crate::compile::signature::compute_signature;
use crate::foundation::core::Rgba;
use crate::graph::emit::{Color, Emitter, Scalar, ScalarSocket, Tag};
use crate::graph::model::{CompositeGraph, MathOp, NodeRole};
use crate::layer::model::{LayerList, LayerRecord};
use crate::layer::walk::{GroupMode, Unit, effective_gate, group_mode, units_of};

/// Options controlling graph generation.
#[derive(Clone, Debug, PartialEq)]
pub struct CompileOpts {
    /// Wrap each unit's nodes in a frame labelled with the layer name.
    pub emit_frames: bool,
    /// Distance between generated node columns.
    pub node_spacing: f64,
    /// Color substituted for layer content that is not loaded.
    pub placeholder_color: Rgba,
}

impl Default for CompileOpts {
    fn default() -> Self {
        Self {
            emit_frames: true,
            node_spacing: 200.0,
            placeholder_color: Rgba::WHITE,
        }
    }
}

/// Build the composite graph for `list`.
///
/// Never fails: missing textures become placeholder content and empty units are skipped. The
/// returned graph carries the list's structural signature.
#[tracing::instrument(skip(list, lookup, opts), fields(records = list.len()))]
pub fn compile_layers(
    list: &LayerList,
    lookup: &dyn ImageLookup,
    opts: &CompileOpts,
) -> CompositeGraph {
    let mut c = Compiler {
        records: list.records(),
        lookup,
        opts,
        em: Emitter::new(opts.node_spacing),
    };

    let top = c.composite(None, None, None);
    c.em.next_column();
    match top {
        Some(stack) => {
            c.em.output(stack.color, stack.alpha);
        }
        None => {
            let color = c.em.rgb(Rgba::TRANSPARENT, Tag::untagged(NodeRole::EmptyColor));
            let alpha = c.em.value(0.0, Tag::untagged(NodeRole::EmptyAlpha));
            c.em.output(color.into(), alpha.into());
        }
    }

    let mut graph = c.em.into_graph();
    graph.signature = Some(compute_signature(list));
    tracing::debug!(
        nodes = graph.len(),
        placeholders = graph.placeholder_count(),
        "compiled layer list"
    );
    graph
}

/// Running composite: straight color plus coverage.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Stack {
    color: Color,
    alpha: Scalar,
}

struct Content {
    color: Color,
    alpha: Scalar,
    mask: Option<ScalarSocket>,
}

struct Compiler<'a> {
    records: &'a [LayerRecord],
    lookup: &'a dyn ImageLookup,
    opts: &'a CompileOpts,
    em: Emitter,
}

impl Compiler<'_> {
    /// Composite the children of `parent` onto `below`.
    ///
    /// `inherited` is the product of enclosing passthrough masks.
    fn composite(
        &mut self,
        parent: Option<usize>,
        below: Option<Stack>,
        inherited: Option<ScalarSocket>,
    ) -> Option<Stack> {
        let mut stack = below;
        for unit in units_of(self.records, parent) {
            let cp = self.em.checkpoint();
            self.em.next_column();
            match self.unit(&unit, stack, inherited) {
                Some(next) => stack = Some(next),
                None => {
                    self.em.rollback(cp);
                    let r = &self.records[unit.base];
                    tracing::debug!(layer = %r.id, name = %r.name, "skipped empty unit");
                }
            }
        }
        stack
    }

    /// Composite one unit; `None` when it contributes nothing.
    fn unit(
        &mut self,
        unit: &Unit,
        below: Option<Stack>,
        inherited: Option<ScalarSocket>,
    ) -> Option<Stack> {
        let records = self.records;
        let framed = self.open_frame(&records[unit.base]);
        let out = match group_mode(records, unit.base) {
            GroupMode::Passthrough => self.passthrough(unit.base, below, inherited),
            GroupMode::Isolated => self.isolated(unit, below, inherited),
        };
        if framed {
            self.em.pop_frame();
        }
        out
    }

    fn passthrough(
        &mut self,
        index: usize,
        below: Option<Stack>,
        inherited: Option<ScalarSocket>,
    ) -> Option<Stack> {
        let tag = Tag::new(NodeRole::InheritedMaskGate, self.records[index].id);
        let inherited = match (inherited, self.mask(index)) {
            (Some(i), Some(m)) => Some(self.em.math(MathOp::Multiply, i.into(), m.into(), tag)),
            (i, m) => i.or(m),
        };
        let out = self.composite(Some(index), below, inherited);
        (out != below).then_some(out).flatten()
    }

    fn isolated(
        &mut self,
        unit: &Unit,
        below: Option<Stack>,
        inherited: Option<ScalarSocket>,
    ) -> Option<Stack> {
        let records = self.records;
        let content = self.content(unit.base)?;
        let factor = self.gate(unit.base, &content, inherited, None);
        let mut acc = Stack {
            color: content.color,
            alpha: factor.into(),
        };

        for &clip in &unit.clips {
            let cp = self.em.checkpoint();
            let record = &records[clip];
            let framed = self.open_frame(record);
            let Some(c) = self.content(clip) else {
                self.em.rollback(cp);
                continue;
            };
            let f = self.gate(clip, &c, None, Some(factor));
            acc.color = self
                .em
                .mix(
                    record.blend_mode.mix_blend(),
                    f.into(),
                    acc.color,
                    c.color,
                    Tag::new(NodeRole::ColorMix, record.id),
                )
                .into();
            if framed {
                self.em.pop_frame();
            }
        }

        Some(match below {
            None => acc,
            Some(below) => self.over(&records[unit.base], below, acc),
        })
    }

    /// Alpha-composite `top` onto `below`; the blend mode only affects color.
    fn over(&mut self, record: &LayerRecord, below: Stack, top: Stack) -> Stack {
        let t = |role| Tag::new(role, record.id);
        let inv = self
            .em
            .math(MathOp::Subtract, Scalar::ONE, top.alpha, t(NodeRole::InvertFactor));
        let scaled = self.em.math(
            MathOp::Multiply,
            below.alpha,
            inv.into(),
            t(NodeRole::BelowAlphaScale),
        );
        let alpha = self
            .em
            .math(MathOp::Add, top.alpha, scaled.into(), t(NodeRole::AlphaOver));
        let color = self.em.mix(
            record.blend_mode.mix_blend(),
            top.alpha,
            below.color,
            top.color,
            t(NodeRole::ColorMix),
        );
        Stack {
            color: color.into(),
            alpha: alpha.into(),
        }
    }

    /// `alpha × mask × inherited × clip base × gate`; only the last factor is always present.
    fn gate(
        &mut self,
        index: usize,
        content: &Content,
        inherited: Option<ScalarSocket>,
        clip_base: Option<ScalarSocket>,
    ) -> ScalarSocket {
        let id = self.records[index].id;
        let mut f = content.alpha;
        for (operand, role) in [
            (content.mask, NodeRole::MaskGate),
            (inherited, NodeRole::InheritedMaskGate),
            (clip_base, NodeRole::ClipGate),
        ] {
            if let Some(s) = operand {
                f = self
                    .em
                    .math(MathOp::Multiply, f, s.into(), Tag::new(role, id))
                    .into();
            }
        }
        let gate = effective_gate(self.records, index);
        self.em.math(
            MathOp::Multiply,
            f,
            Scalar::Const(gate),
            Tag::new(NodeRole::OpacityGate, id),
        )
    }

    /// Color, alpha and mask of a record; `None` for a group with nothing to show.
    fn content(&mut self, index: usize) -> Option<Content> {
        let records = self.records;
        let record = &records[index];
        let (color, alpha) = if record.kind.is_group() {
            let inner = self.composite(Some(index), None, None)?;
            (inner.color, inner.alpha)
        } else {
            match self.lookup.find_content(index, record, false) {
                Some(tex) => {
                    let (c, a) = self.em.texture(
                        tex.image,
                        false,
                        Tag::new(NodeRole::LayerTexture, record.id),
                    );
                    let alpha = if tex.has_alpha { a.into() } else { Scalar::ONE };
                    (c.into(), alpha)
                }
                None => {
                    tracing::debug!(layer = %record.id, name = %record.name, "placeholder content");
                    let c = self.em.rgb(
                        self.opts.placeholder_color,
                        Tag::new(NodeRole::PlaceholderColor, record.id),
                    );
                    let a = self
                        .em
                        .value(1.0, Tag::new(NodeRole::PlaceholderAlpha, record.id));
                    (c.into(), a.into())
                }
            }
        };
        Some(Content {
            color,
            alpha,
            mask: self.mask(index),
        })
    }

    /// Scalar mask of a record, when it has one.
    fn mask(&mut self, index: usize) -> Option<ScalarSocket> {
        let records = self.records;
        let record = &records[index];
        if !record.has_mask {
            return None;
        }
        Some(match self.lookup.find_content(index, record, true) {
            Some(tex) => {
                let (c, _) = self
                    .em
                    .texture(tex.image, true, Tag::new(NodeRole::MaskTexture, record.id));
                self.em
                    .color_to_value(c, Tag::new(NodeRole::MaskValue, record.id))
            }
            None => {
                tracing::debug!(layer = %record.id, name = %record.name, "placeholder mask");
                self.em
                    .value(1.0, Tag::new(NodeRole::PlaceholderMask, record.id))
            }
        })
    }

    fn open_frame(&mut self, record: &LayerRecord) -> bool {
        if self.opts.emit_frames {
            self.em.push_frame(&record.name, record.id);
        }
        self.opts.emit_frames
    }
}

#[cfg(test)]
#[path = "../../tests/unit/compile/compiler.rs"]
mod tests;

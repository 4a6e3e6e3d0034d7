//! Hierarchy queries over the flattened, indented layer list.
//!
//! No tree is materialized: every query is a scan over the list, which acts as the arena
//! while `indent` encodes structure.

use smallvec::SmallVec;

use crate::layer::model::LayerRecord;

/// Iterator over the direct children of a record (or of the root).
///
/// Created by [`children_of`].
#[derive(Debug, Clone)]
pub struct Children<'a> {
    records: &'a [LayerRecord],
    next: usize,
    target_indent: u32,
    // Exclusive boundary: a record with indent <= this ends the scan.
    parent_indent: Option<u32>,
}

impl<'a> Iterator for Children<'a> {
    type Item = (usize, &'a LayerRecord);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(r) = self.records.get(self.next) {
            let i = self.next;
            if let Some(p) = self.parent_indent
                && r.indent <= p
            {
                self.next = self.records.len();
                return None;
            }
            self.next += 1;
            if r.indent == self.target_indent {
                return Some((i, r));
            }
        }
        None
    }
}

/// Direct children of `parent` in display order (top first).
///
/// `None` addresses the root: every record with indent 0. For `Some(p)` the scan starts at
/// `p + 1` and stops at the first record whose indent is not deeper than `p`'s.
pub fn children_of(records: &[LayerRecord], parent: Option<usize>) -> Children<'_> {
    match parent {
        None => Children {
            records,
            next: 0,
            target_indent: 0,
            parent_indent: None,
        },
        Some(p) => {
            let indent = records[p].indent;
            Children {
                records,
                next: p + 1,
                target_indent: indent + 1,
                parent_indent: Some(indent),
            }
        }
    }
}

/// Index of the group containing `index`, or `None` for root records.
pub fn parent_of(records: &[LayerRecord], index: usize) -> Option<usize> {
    let indent = records[index].indent;
    if indent == 0 {
        return None;
    }
    (0..index).rev().find(|&i| records[i].indent < indent)
}

/// A base record plus the clipping records attached to it.
///
/// The atomic item the compositing pass mixes onto the running stack.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Unit {
    /// List index of the base record.
    pub base: usize,
    /// List indices of the clipping records, nearest to the base first.
    pub clips: SmallVec<[usize; 2]>,
}

/// Compositing units among the children of `parent`, bottom-most first.
///
/// Children are taken bottom-to-top; each non-clipping record starts a unit and the run of
/// clipping records directly above it joins that unit. A clipping record without a base
/// starts its own unit and composites as a normal layer.
pub fn units_of(records: &[LayerRecord], parent: Option<usize>) -> Vec<Unit> {
    let children: Vec<usize> = children_of(records, parent).map(|(i, _)| i).collect();

    let mut units: Vec<Unit> = Vec::with_capacity(children.len());
    for &i in children.iter().rev() {
        let r = &records[i];
        if let (true, Some(base)) = (r.is_clipping_mask, r.clip_base_index)
            && let Some(unit) = units.last_mut()
            && unit.base == base
        {
            unit.clips.push(i);
            continue;
        }
        units.push(Unit {
            base: i,
            clips: SmallVec::new(),
        });
    }
    units
}

/// How a record's content reaches its parent's stack.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GroupMode {
    /// Children composite directly into the parent stack.
    Passthrough,
    /// Content is composited on its own and then mixed as a unit.
    Isolated,
}

/// Compositing mode of the record at `index`.
///
/// Only passthrough groups composite through. A passthrough group attached as a clip, or one
/// that is the base of clipping records, composites isolated: a clip's content is resolved on
/// its own, and a base's content alpha gates its clips.
pub fn group_mode(records: &[LayerRecord], index: usize) -> GroupMode {
    let record = &records[index];
    if !record.is_passthrough_group()
        || record.clip_base_index.is_some()
        || is_clip_base(records, index)
    {
        return GroupMode::Isolated;
    }
    GroupMode::Passthrough
}

/// Return `true` when clipping records are attached to the record at `index`.
///
/// Attached clips sit directly above their base, so only the nearest sibling above is checked.
fn is_clip_base(records: &[LayerRecord], index: usize) -> bool {
    let record = &records[index];
    if record.is_clipping_mask {
        return false;
    }
    records[..index]
        .iter()
        .rev()
        .find(|r| r.indent <= record.indent)
        .is_some_and(|r| r.indent == record.indent && r.is_clipping_mask)
}

/// Constant opacity gate applied to the record at `index`.
///
/// The record's own `opacity × visibility`, times that of every enclosing passthrough group
/// up to the first isolated ancestor. Attached clipping records take their own gate only:
/// inherited values already reach them through the base factor.
pub fn effective_gate(records: &[LayerRecord], index: usize) -> f32 {
    let record = &records[index];
    let mut gate = record.visible_opacity();
    if record.clip_base_index.is_some() {
        return gate;
    }

    let mut cursor = parent_of(records, index);
    while let Some(p) = cursor {
        if group_mode(records, p) != GroupMode::Passthrough {
            break;
        }
        gate *= records[p].visible_opacity();
        cursor = parent_of(records, p);
    }
    gate
}

#[cfg(test)]
#[path = "../../tests/unit/layer/walk.rs"]
mod tests;

use crate::foundation::core::{Canvas, LayerId};
use crate::foundation::error::{PsdGraphError, PsdGraphResult};
use crate::layer::model::{BlendMode, LayerKind, LayerList, LayerRecord, VisibilityOverride};

/// Nested layer tree as produced by a document reader.
///
/// This is the JSON snapshot format read by the CLI and by
/// [`JsonDocumentSource`](crate::JsonDocumentSource). Nodes are listed top-to-bottom.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DocumentTree {
    /// Canvas size of the document.
    #[serde(default)]
    pub canvas: Canvas,
    /// Root-level nodes, topmost first.
    #[serde(default)]
    pub layers: Vec<DocumentNode>,
}

/// One layer or group of a [`DocumentTree`].
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DocumentNode {
    /// Stable id, `0` when the reader has none.
    #[serde(default)]
    pub id: u32,
    /// Display name.
    pub name: String,
    /// Kind name as written by the reader (`"GROUP"`, `"LAYER"`, ...).
    #[serde(default, alias = "type")]
    pub kind: Option<String>,
    /// Blend mode display name or four-character key.
    #[serde(default)]
    pub blend_mode: Option<String>,
    /// Opacity in `[0, 1]`.
    #[serde(default = "default_opacity")]
    pub opacity: f32,
    /// Visibility flag.
    #[serde(default = "default_true")]
    pub visible: bool,
    /// The node carries a layer mask.
    #[serde(default)]
    pub has_mask: bool,
    /// The node is a clipping mask.
    #[serde(default)]
    pub clipping: bool,
    /// Child nodes, topmost first.
    #[serde(default)]
    pub children: Vec<DocumentNode>,
}

fn default_opacity() -> f32 {
    1.0
}

fn default_true() -> bool {
    true
}

impl DocumentTree {
    /// Parse a tree from its JSON snapshot.
    pub fn from_json(text: &str) -> PsdGraphResult<Self> {
        serde_json::from_str(text).map_err(|e| PsdGraphError::serde(e.to_string()))
    }

    /// Flatten into display-ordered records (pre-order, topmost first).
    ///
    /// `clip_base_index` is left unresolved; [`DocumentTree::to_layer_list`] resolves it.
    pub fn flatten(&self) -> Vec<LayerRecord> {
        let mut out = Vec::new();
        for node in &self.layers {
            flatten_node(node, 0, "", false, &mut out);
        }
        out
    }

    /// Flatten and validate into a [`LayerList`].
    pub fn to_layer_list(&self) -> PsdGraphResult<LayerList> {
        LayerList::new(self.flatten())
    }
}

fn flatten_node(
    node: &DocumentNode,
    depth: u32,
    parent_path: &str,
    parent_hidden: bool,
    out: &mut Vec<LayerRecord>,
) {
    let path_hint = if parent_path.is_empty() {
        node.name.clone()
    } else {
        format!("{parent_path}/{}", node.name)
    };

    let kind = match &node.kind {
        Some(k) => LayerKind::from_psd_name(k),
        None => LayerKind::Layer,
    };
    // Only groups nest, so a node with children is a group whatever its kind says.
    let kind = if !kind.is_group() && !node.children.is_empty() {
        if node.kind.is_some() {
            tracing::warn!(
                layer = node.id,
                name = %node.name,
                kind = ?kind,
                "node with children treated as a group"
            );
        }
        LayerKind::Group
    } else {
        kind
    };
    let blend_mode = match (&node.blend_mode, kind) {
        (Some(b), _) => BlendMode::from_psd_name(b),
        (None, LayerKind::Group) => BlendMode::Passthrough,
        (None, _) => BlendMode::Normal,
    };

    out.push(LayerRecord {
        id: LayerId(node.id),
        name: node.name.clone(),
        path_hint: path_hint.clone(),
        kind,
        indent: depth,
        blend_mode,
        opacity: node.opacity,
        is_visible: node.visible,
        visibility_override: VisibilityOverride::FollowSource,
        hidden_by_parent_chain: parent_hidden,
        has_mask: node.has_mask,
        is_clipping_mask: node.clipping,
        clip_base_index: None,
    });

    let hidden = parent_hidden || !node.visible;
    for child in &node.children {
        flatten_node(child, depth + 1, &path_hint, hidden, out);
    }
}

#[cfg(test)]
#[path = "../../tests/unit/layer/document.rs"]
mod tests;

use crate::foundation::core::LayerId;
use crate::foundation::error::{PsdGraphError, PsdGraphResult};
use crate::graph::model::MixBlend;

/// Kind of a layer record in the flattened document.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerKind {
    /// Raster pixel layer.
    #[default]
    Layer,
    /// Group (folder) of layers.
    Group,
    /// Smart object; treated as raster content.
    SmartObject,
    /// Adjustment or fill layer; treated as raster content.
    Adjustment,
    /// Anything else the document reader could not classify.
    Unknown,
}

impl LayerKind {
    /// Parse a kind name as written by document readers.
    ///
    /// Matching ignores case, spaces, dashes and underscores. Unrecognized names map to
    /// [`LayerKind::Unknown`].
    pub fn from_psd_name(name: &str) -> Self {
        match normalize_name(name).as_str() {
            "layer" | "pixel" | "raster" | "pixellayer" => Self::Layer,
            "group" | "folder" | "grouplayer" => Self::Group,
            "smart" | "smartobject" | "smartobjectlayer" => Self::SmartObject,
            "adjustment" | "adjustmentlayer" | "fill" | "filllayer" => Self::Adjustment,
            _ => Self::Unknown,
        }
    }

    /// Return `true` for [`LayerKind::Group`].
    pub fn is_group(self) -> bool {
        matches!(self, Self::Group)
    }

    pub(crate) fn code(self) -> u8 {
        match self {
            Self::Layer => 0,
            Self::Group => 1,
            Self::SmartObject => 2,
            Self::Adjustment => 3,
            Self::Unknown => 4,
        }
    }
}

/// Document-side blend mode of a layer or group.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum BlendMode {
    #[default]
    Normal,
    /// Group-only: children composite straight into the parent stack.
    Passthrough,
    Dissolve,
    Darken,
    Multiply,
    ColorBurn,
    LinearBurn,
    DarkerColor,
    Lighten,
    Screen,
    ColorDodge,
    LinearDodge,
    LighterColor,
    Overlay,
    SoftLight,
    HardLight,
    VividLight,
    LinearLight,
    PinLight,
    HardMix,
    Difference,
    Exclusion,
    Subtract,
    Divide,
    Hue,
    Saturation,
    Color,
    Luminosity,
}

impl BlendMode {
    /// Parse a blend mode from a display name or a four-character PSD blend key.
    ///
    /// Display names are matched ignoring case, spaces, dashes and underscores, so
    /// `"Linear Dodge"`, `"linear_dodge"` and `"LINEARDODGE"` are equivalent. Unrecognized
    /// names map to [`BlendMode::Normal`].
    pub fn from_psd_name(name: &str) -> Self {
        if let Some(mode) = Self::from_psd_key(name) {
            return mode;
        }
        match normalize_name(name).as_str() {
            "passthrough" | "passthru" => Self::Passthrough,
            "dissolve" => Self::Dissolve,
            "darken" => Self::Darken,
            "multiply" => Self::Multiply,
            "colorburn" | "burn" => Self::ColorBurn,
            "linearburn" => Self::LinearBurn,
            "darkercolor" => Self::DarkerColor,
            "lighten" => Self::Lighten,
            "screen" => Self::Screen,
            "colordodge" | "dodge" => Self::ColorDodge,
            "lineardodge" | "add" => Self::LinearDodge,
            "lightercolor" => Self::LighterColor,
            "overlay" => Self::Overlay,
            "softlight" => Self::SoftLight,
            "hardlight" => Self::HardLight,
            "vividlight" => Self::VividLight,
            "linearlight" => Self::LinearLight,
            "pinlight" => Self::PinLight,
            "hardmix" => Self::HardMix,
            "difference" => Self::Difference,
            "exclusion" => Self::Exclusion,
            "subtract" => Self::Subtract,
            "divide" => Self::Divide,
            "hue" => Self::Hue,
            "saturation" => Self::Saturation,
            "color" => Self::Color,
            "luminosity" => Self::Luminosity,
            _ => Self::Normal,
        }
    }

    fn from_psd_key(key: &str) -> Option<Self> {
        // Keys are case-sensitive and may carry a trailing space (`"mul "`).
        Some(match key {
            "pass" => Self::Passthrough,
            "norm" => Self::Normal,
            "diss" => Self::Dissolve,
            "dark" => Self::Darken,
            "mul " => Self::Multiply,
            "idiv" => Self::ColorBurn,
            "lbrn" => Self::LinearBurn,
            "dkCl" => Self::DarkerColor,
            "lite" => Self::Lighten,
            "scrn" => Self::Screen,
            "div " => Self::ColorDodge,
            "lddg" => Self::LinearDodge,
            "lgCl" => Self::LighterColor,
            "over" => Self::Overlay,
            "sLit" => Self::SoftLight,
            "hLit" => Self::HardLight,
            "vLit" => Self::VividLight,
            "lLit" => Self::LinearLight,
            "pLit" => Self::PinLight,
            "hMix" => Self::HardMix,
            "diff" => Self::Difference,
            "smud" => Self::Exclusion,
            "fsub" => Self::Subtract,
            "fdiv" => Self::Divide,
            "hue " => Self::Hue,
            "sat " => Self::Saturation,
            "colr" => Self::Color,
            "lum " => Self::Luminosity,
            _ => return None,
        })
    }

    /// Host mix blend used to realize this mode in the generated graph.
    ///
    /// Modes the host cannot express map to [`MixBlend::Mix`].
    pub fn mix_blend(self) -> MixBlend {
        match self {
            Self::Normal | Self::Passthrough => MixBlend::Mix,
            Self::Multiply => MixBlend::Multiply,
            Self::Screen => MixBlend::Screen,
            Self::Overlay => MixBlend::Overlay,
            Self::Darken => MixBlend::Darken,
            Self::Lighten => MixBlend::Lighten,
            Self::ColorDodge => MixBlend::Dodge,
            Self::ColorBurn => MixBlend::Burn,
            Self::LinearBurn => MixBlend::LinearBurn,
            Self::LinearDodge => MixBlend::Add,
            Self::SoftLight => MixBlend::SoftLight,
            Self::LinearLight => MixBlend::LinearLight,
            Self::Difference => MixBlend::Difference,
            Self::Exclusion => MixBlend::Exclusion,
            Self::Subtract => MixBlend::Subtract,
            Self::Divide => MixBlend::Divide,
            Self::Hue => MixBlend::Hue,
            Self::Saturation => MixBlend::Saturation,
            Self::Color => MixBlend::Color,
            Self::Luminosity => MixBlend::Value,
            Self::Dissolve
            | Self::DarkerColor
            | Self::LighterColor
            | Self::HardLight
            | Self::VividLight
            | Self::PinLight
            | Self::HardMix => MixBlend::Mix,
        }
    }

    pub(crate) fn code(self) -> u8 {
        self as u8
    }
}

/// User override of a layer's visibility, kept across syncs by layer id.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisibilityOverride {
    /// Use the document's own visibility flag.
    #[default]
    FollowSource,
    /// Always visible.
    ForceShow,
    /// Always hidden.
    ForceHide,
}

/// One element of the flattened layer list.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LayerRecord {
    /// Stable identity; `0` means unassigned.
    #[serde(default)]
    pub id: LayerId,
    /// Display name.
    pub name: String,
    /// Locator into the backing document, used only to re-fetch pixel data.
    #[serde(default)]
    pub path_hint: String,
    /// Record kind.
    #[serde(default)]
    pub kind: LayerKind,
    /// Nesting depth; root records have indent 0.
    #[serde(default)]
    pub indent: u32,
    /// Blend mode; [`BlendMode::Passthrough`] is only meaningful on groups.
    #[serde(default)]
    pub blend_mode: BlendMode,
    /// Opacity in `[0, 1]`.
    #[serde(default = "default_opacity")]
    pub opacity: f32,
    /// Intrinsic visibility flag from the document.
    #[serde(default = "default_true")]
    pub is_visible: bool,
    /// User visibility override.
    #[serde(default)]
    pub visibility_override: VisibilityOverride,
    /// Informational: some ancestor is hidden. Not used for compositing.
    #[serde(default)]
    pub hidden_by_parent_chain: bool,
    /// The record carries a layer mask.
    #[serde(default)]
    pub has_mask: bool,
    /// The record clips to the nearest non-clipping sibling beneath it.
    #[serde(default)]
    pub is_clipping_mask: bool,
    /// Resolved list index of the clip base, filled in by [`LayerList::new`].
    #[serde(default)]
    pub clip_base_index: Option<usize>,
}

fn default_opacity() -> f32 {
    1.0
}

fn default_true() -> bool {
    true
}

impl LayerRecord {
    /// A visible, fully opaque raster layer with `Normal` blending.
    pub fn layer(id: u32, name: impl Into<String>, indent: u32) -> Self {
        Self {
            id: LayerId(id),
            name: name.into(),
            path_hint: String::new(),
            kind: LayerKind::Layer,
            indent,
            blend_mode: BlendMode::Normal,
            opacity: 1.0,
            is_visible: true,
            visibility_override: VisibilityOverride::FollowSource,
            hidden_by_parent_chain: false,
            has_mask: false,
            is_clipping_mask: false,
            clip_base_index: None,
        }
    }

    /// A visible, fully opaque group with the given blend mode.
    pub fn group(id: u32, name: impl Into<String>, indent: u32, blend_mode: BlendMode) -> Self {
        Self {
            kind: LayerKind::Group,
            blend_mode,
            ..Self::layer(id, name, indent)
        }
    }

    /// Replace the kind.
    pub fn with_kind(mut self, kind: LayerKind) -> Self {
        self.kind = kind;
        self
    }

    /// Replace the blend mode.
    pub fn with_blend(mut self, blend_mode: BlendMode) -> Self {
        self.blend_mode = blend_mode;
        self
    }

    /// Replace the opacity.
    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity;
        self
    }

    /// Replace the intrinsic visibility flag.
    pub fn with_visible(mut self, visible: bool) -> Self {
        self.is_visible = visible;
        self
    }

    /// Mark the record as carrying a mask.
    pub fn with_mask(mut self) -> Self {
        self.has_mask = true;
        self
    }

    /// Mark the record as a clipping mask.
    pub fn clipping(mut self) -> Self {
        self.is_clipping_mask = true;
        self
    }

    /// Visibility after applying the user override.
    pub fn resolved_visibility(&self) -> bool {
        match self.visibility_override {
            VisibilityOverride::ForceShow => true,
            VisibilityOverride::ForceHide => false,
            VisibilityOverride::FollowSource => self.is_visible,
        }
    }

    /// `opacity` when visible, otherwise `0`.
    pub fn visible_opacity(&self) -> f32 {
        if self.resolved_visibility() {
            self.opacity
        } else {
            0.0
        }
    }

    /// Return `true` for a group whose blend mode is passthrough.
    pub fn is_passthrough_group(&self) -> bool {
        self.kind.is_group() && self.blend_mode == BlendMode::Passthrough
    }
}

/// Validated, flattened layer list with resolved clip bases.
///
/// Records are ordered top-to-bottom as displayed by the document; nesting is encoded by
/// `indent` only.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize)]
pub struct LayerList {
    records: Vec<LayerRecord>,
}

impl LayerList {
    /// Validate `records` and resolve every `clip_base_index`.
    ///
    /// Rejects lists whose first record is indented, whose indent jumps by more than one
    /// level, or whose opacity values fall outside `[0, 1]`.
    pub fn new(mut records: Vec<LayerRecord>) -> PsdGraphResult<Self> {
        let mut prev_indent: Option<u32> = None;
        for (i, r) in records.iter().enumerate() {
            let max_indent = prev_indent.map_or(0, |p| p + 1);
            if r.indent > max_indent {
                return Err(PsdGraphError::validation(format!(
                    "record {i} ('{}') has indent {} but at most {max_indent} is allowed",
                    r.name, r.indent
                )));
            }
            if !(0.0..=1.0).contains(&r.opacity) {
                return Err(PsdGraphError::validation(format!(
                    "record {i} ('{}') has opacity {} outside [0, 1]",
                    r.name, r.opacity
                )));
            }
            prev_indent = Some(r.indent);
        }

        resolve_clip_bases(&mut records);
        Ok(Self { records })
    }

    /// All records in display order.
    pub fn records(&self) -> &[LayerRecord] {
        &self.records
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Return `true` when the list has no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Record at `index`.
    pub fn get(&self, index: usize) -> Option<&LayerRecord> {
        self.records.get(index)
    }

    /// Index of the record with the given assigned id.
    pub fn position_of(&self, id: LayerId) -> Option<usize> {
        if !id.is_assigned() {
            return None;
        }
        self.records.iter().position(|r| r.id == id)
    }

    /// Iterate records in display order.
    pub fn iter(&self) -> std::slice::Iter<'_, LayerRecord> {
        self.records.iter()
    }

    /// Replace the visibility override of the record with `id`.
    ///
    /// Returns `false` when no record carries that id.
    pub fn set_visibility_override(&mut self, id: LayerId, value: VisibilityOverride) -> bool {
        match self.position_of(id) {
            Some(i) => {
                self.records[i].visibility_override = value;
                true
            }
            None => false,
        }
    }

    /// Copy visibility overrides from `previous` onto records with matching ids.
    pub fn carry_overrides_from(&mut self, previous: &LayerList) {
        for r in &mut self.records {
            if !r.id.is_assigned() {
                continue;
            }
            if let Some(old) = previous.records.iter().find(|o| o.id == r.id) {
                r.visibility_override = old.visibility_override;
            }
        }
    }
}

impl<'a> IntoIterator for &'a LayerList {
    type Item = &'a LayerRecord;
    type IntoIter = std::slice::Iter<'a, LayerRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Resolve `clip_base_index` for every record.
///
/// Scans bottom-to-top tracking the most recent non-clipping index per indent level. A
/// record at indent `d` closes every deeper level, so clips never resolve across a group
/// boundary.
pub(crate) fn resolve_clip_bases(records: &mut [LayerRecord]) {
    let mut last_base: Vec<Option<usize>> = Vec::new();
    for i in (0..records.len()).rev() {
        let depth = records[i].indent as usize;
        last_base.resize(depth + 1, None);
        if records[i].is_clipping_mask {
            records[i].clip_base_index = last_base[depth];
        } else {
            records[i].clip_base_index = None;
            last_base[depth] = Some(i);
        }
    }
}

fn normalize_name(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, ' ' | '_' | '-'))
        .flat_map(char::to_lowercase)
        .collect()
}

#[cfg(test)]
#[path = "../../tests/unit/layer/model.rs"]
mod tests;

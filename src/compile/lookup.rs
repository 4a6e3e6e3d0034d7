use std::collections::BTreeSet;

use crate::graph::model::ImageKey;
use crate::layer::model::LayerRecord;

/// Texture resolved for a layer's color or mask.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextureRef {
    /// Host image to sample.
    pub image: ImageKey,
    /// `false` when the image has no alpha socket; alpha is then the constant 1.
    pub has_alpha: bool,
}

impl TextureRef {
    /// Texture with an alpha channel.
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            image: ImageKey::new(image),
            has_alpha: true,
        }
    }

    /// Texture without an alpha channel.
    pub fn opaque(image: impl Into<String>) -> Self {
        Self {
            has_alpha: false,
            ..Self::new(image)
        }
    }
}

/// Finds the host texture holding a layer's pixels or mask.
///
/// `None` is a miss (not loaded yet): the compiler substitutes placeholder content and keeps
/// going.
pub trait ImageLookup {
    /// Texture for the record at list position `index`, or for its mask when `want_mask`.
    fn find_content(&self, index: usize, record: &LayerRecord, want_mask: bool)
    -> Option<TextureRef>;
}

impl<F> ImageLookup for F
where
    F: Fn(usize, &LayerRecord, bool) -> Option<TextureRef>,
{
    fn find_content(
        &self,
        index: usize,
        record: &LayerRecord,
        want_mask: bool,
    ) -> Option<TextureRef> {
        self(index, record, want_mask)
    }
}

/// Lookup naming textures after the document and the layer path.
///
/// Color textures are named `"<document>/<path>"`, masks `"<document>/<path>_MASK"`. With a
/// set of loaded names, anything outside the set is a miss; without one every name hits.
#[derive(Clone, Debug, Default)]
pub struct NamedImageLookup {
    document: String,
    loaded: Option<BTreeSet<ImageKey>>,
}

impl NamedImageLookup {
    /// Lookup for `document` that assumes every texture is loaded.
    pub fn new(document: impl Into<String>) -> Self {
        Self {
            document: document.into(),
            loaded: None,
        }
    }

    /// Restrict hits to the given loaded texture names.
    pub fn with_loaded<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.loaded = Some(names.into_iter().map(ImageKey::new).collect());
        self
    }

    /// Texture name for `record`.
    pub fn image_name(&self, record: &LayerRecord, mask: bool) -> ImageKey {
        let path = if record.path_hint.is_empty() {
            record.name.as_str()
        } else {
            record.path_hint.as_str()
        };
        let suffix = if mask { "_MASK" } else { "" };
        ImageKey::new(format!("{}/{path}{suffix}", self.document))
    }
}

impl ImageLookup for NamedImageLookup {
    fn find_content(
        &self,
        _index: usize,
        record: &LayerRecord,
        want_mask: bool,
    ) -> Option<TextureRef> {
        let image = self.image_name(record, want_mask);
        if let Some(loaded) = &self.loaded
            && !loaded.contains(&image)
        {
            return None;
        }
        Some(TextureRef {
            image,
            has_alpha: !want_mask,
        })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/compile/lookup.rs"]
mod tests;

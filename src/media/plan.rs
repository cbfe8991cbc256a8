//! Derivative width policy.

use super::types::ImageKind;

/// Widest `shared` derivative kept for png/jpeg sources.
pub const SHARED_MAX_WIDTH: u32 = 1024;
/// Width of the static thumbnail cut from a gif.
pub const GIF_THUMB_WIDTH: u32 = 430;

const BREAKPOINTS: [Variant; 4] = [
    Variant::new("800", "shared_800", 800),
    Variant::new("480", "shared_480", 480),
    Variant::new("thumb", "shared_thumb", 430),
    Variant::new("320", "shared_320", 320),
];

/// One derivative to produce. `width == 0` keeps the natural size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Variant {
    pub name: &'static str,
    pub folder: &'static str,
    pub width: u32,
}

impl Variant {
    const fn new(name: &'static str, folder: &'static str, width: u32) -> Self {
        Self {
            name,
            folder,
            width,
        }
    }

    const fn shared(width: u32) -> Self {
        Self::new("shared", "shared", width)
    }

    pub fn is_original_size(&self) -> bool {
        self.width == 0
    }
}

/// Ordered derivatives for one source image; `shared` always comes first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantPlan(Vec<Variant>);

impl VariantPlan {
    pub fn iter(&self) -> impl Iterator<Item = &Variant> {
        self.0.iter()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.0.iter().map(|variant| variant.name).collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl IntoIterator for VariantPlan {
    type Item = Variant;
    type IntoIter = std::vec::IntoIter<Variant>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

pub fn plan_variants(kind: &ImageKind, natural_width: u32) -> VariantPlan {
    let mut variants = Vec::with_capacity(1 + BREAKPOINTS.len());

    if *kind == ImageKind::Gif {
        variants.push(Variant::shared(0));
        if natural_width > GIF_THUMB_WIDTH {
            variants.push(Variant::new("thumb", "shared_thumb", GIF_THUMB_WIDTH));
        }
        return VariantPlan(variants);
    }

    if natural_width > SHARED_MAX_WIDTH {
        variants.push(Variant::shared(SHARED_MAX_WIDTH));
    } else {
        variants.push(Variant::shared(0));
    }
    variants.extend(
        BREAKPOINTS
            .iter()
            .copied()
            .filter(|breakpoint| natural_width > breakpoint.width),
    );

    VariantPlan(variants)
}

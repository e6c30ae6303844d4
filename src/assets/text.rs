use std::borrow::Cow;

use crate::foundation::error::{GridsheetError, GridsheetResult};

/// Shaped single-line label ready for `vello_cpu` glyph runs.
#[derive(Clone, Debug)]
pub(crate) struct LabelLayout {
    pub(crate) glyphs: Vec<vello_cpu::Glyph>,
    pub(crate) font_size: f32,
    /// Advance width of the line.
    pub(crate) width: f32,
    /// Line box height.
    pub(crate) height: f32,
    /// Baseline offset from the top of the line box.
    pub(crate) baseline: f32,
}

/// Font loaded once per run and reused for every number label.
pub(crate) struct LabelFont {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<()>,
    stack: String,
    font: vello_cpu::peniko::FontData,
}

impl LabelFont {
    /// Register `bytes` and build a family stack preferring `preferred_family`.
    pub(crate) fn from_bytes(bytes: Vec<u8>, preferred_family: &str) -> GridsheetResult<Self> {
        Self::from_face(bytes, 0, None, preferred_family)
    }

    /// Load a face found by [`find_system_font`].
    pub(crate) fn from_system(face: SystemFace, preferred_family: &str) -> GridsheetResult<Self> {
        Self::from_face(face.bytes, face.index, Some(&face.family), preferred_family)
    }

    fn from_face(
        bytes: Vec<u8>,
        index: u32,
        family: Option<&str>,
        preferred_family: &str,
    ) -> GridsheetResult<Self> {
        let mut font_ctx = parley::FontContext::default();
        let families = font_ctx
            .collection
            .register_fonts(parley::fontique::Blob::from(bytes.clone()), None);
        let names: Vec<String> = families
            .iter()
            .filter_map(|(id, _)| font_ctx.collection.family_name(*id).map(str::to_string))
            .collect();
        let family_name = match family {
            Some(f) if names.iter().any(|n| n.eq_ignore_ascii_case(f)) => f.to_string(),
            _ => names.into_iter().next().ok_or_else(|| {
                GridsheetError::validation("no font families registered from font bytes")
            })?,
        };

        let preferred = preferred_family.trim();
        let stack = if preferred.is_empty() || preferred.eq_ignore_ascii_case(&family_name) {
            format!("\"{family_name}\"")
        } else {
            format!("{preferred}, \"{family_name}\"")
        };

        Ok(Self {
            font_ctx,
            layout_ctx: parley::LayoutContext::new(),
            stack,
            font: vello_cpu::peniko::FontData::new(vello_cpu::peniko::Blob::from(bytes), index),
        })
    }

    /// CSS-style family list used for shaping.
    pub(crate) fn stack(&self) -> &str {
        &self.stack
    }

    pub(crate) fn font(&self) -> &vello_cpu::peniko::FontData {
        &self.font
    }

    /// Shape `text` on a single unbroken line.
    pub(crate) fn layout(
        &mut self,
        text: &str,
        size_px: f32,
        weight: u16,
    ) -> GridsheetResult<LabelLayout> {
        if !size_px.is_finite() || size_px <= 0.0 {
            return Err(GridsheetError::validation(
                "label size must be finite and > 0",
            ));
        }

        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(Cow::Owned(self.stack.clone())),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(size_px));
        builder.push_default(parley::style::StyleProperty::FontWeight(
            parley::style::FontWeight::new(f32::from(weight)),
        ));

        let mut layout: parley::Layout<()> = builder.build(text);
        layout.break_all_lines(None);

        let mut glyphs = Vec::new();
        let mut baseline = 0.0f32;
        let mut font_size = size_px;
        for (i, line) in layout.lines().enumerate() {
            if i == 0 {
                baseline = line.metrics().baseline;
            }
            for item in line.items() {
                let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                    continue;
                };
                font_size = run.run().font_size();
                glyphs.extend(run.glyphs().map(|g| vello_cpu::Glyph {
                    id: g.id,
                    x: g.x,
                    y: g.y,
                }));
            }
        }

        Ok(LabelLayout {
            glyphs,
            font_size,
            width: layout.width(),
            height: layout.height(),
            baseline,
        })
    }
}

/// An installed font face picked for the numbering style.
pub(crate) struct SystemFace {
    pub(crate) bytes: Vec<u8>,
    pub(crate) index: u32,
    pub(crate) family: String,
}

/// Find the installed face that best matches a CSS-style `families` list and `weight`.
///
/// Falls back to the closest-weight upright sans face when nothing in the list is installed.
/// Returns `None` only when the system has no usable fonts at all.
pub(crate) fn find_system_font(families: &str, weight: u16) -> Option<SystemFace> {
    use usvg::fontdb::{Database, Family, Query, Stretch, Style, Weight};

    let mut db = Database::new();
    db.load_system_fonts();

    let names: Vec<&str> = families
        .split(',')
        .map(|f| f.trim().trim_matches(|c: char| c == '"' || c == '\''))
        .filter(|f| !f.is_empty())
        .collect();
    let mut wanted: Vec<Family<'_>> = names
        .iter()
        .map(|name| match name.to_ascii_lowercase().as_str() {
            "serif" => Family::Serif,
            "sans-serif" => Family::SansSerif,
            "monospace" => Family::Monospace,
            "cursive" => Family::Cursive,
            "fantasy" => Family::Fantasy,
            _ => Family::Name(name),
        })
        .collect();
    wanted.push(Family::SansSerif);

    let query = Query {
        families: &wanted,
        weight: Weight(weight),
        stretch: Stretch::Normal,
        style: Style::Normal,
    };
    let id = db.query(&query).or_else(|| {
        db.faces()
            .filter(|f| f.style == Style::Normal && !f.families.is_empty())
            .min_by_key(|f| {
                let name = &f.families[0].0;
                let sans = name.contains("Sans") && !name.contains("Mono");
                (!sans, f.weight.0.abs_diff(weight))
            })
            .map(|f| f.id)
    })?;

    let family = db.face(id)?.families.first()?.0.clone();
    let (bytes, index) = db.with_face_data(id, |data, index| (data.to_vec(), index))?;
    tracing::debug!(%family, index, "resolved system font");
    Some(SystemFace {
        bytes,
        index,
        family,
    })
}

#[cfg(test)]
#[path = "../../tests/unit/assets/text.rs"]
mod tests;

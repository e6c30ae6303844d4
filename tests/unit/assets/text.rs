use super::*;

#[test]
fn garbage_font_bytes_are_rejected() {
    assert!(LabelFont::from_bytes(b"not a font".to_vec(), "sans-serif").is_err());
}

fn system_font() -> Option<Vec<u8>> {
    [
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/TTF/DejaVuSans.ttf",
        "/System/Library/Fonts/Supplemental/Arial.ttf",
    ]
    .iter()
    .find_map(|p| std::fs::read(p).ok())
}

#[test]
fn digits_shape_into_glyphs_when_a_font_is_available() {
    let Some(bytes) = system_font() else {
        return;
    };
    let mut font = LabelFont::from_bytes(bytes, "sans-serif").unwrap();
    assert!(font.stack().starts_with("sans-serif, \""));

    let layout = font.layout("128", 40.0, 700).unwrap();
    assert_eq!(layout.glyphs.len(), 3);
    assert!(layout.width > 0.0);
    assert!(layout.baseline > 0.0 && layout.baseline <= layout.height);
    assert!(font.layout("1", 0.0, 400).is_err());
}

#[test]
fn system_lookup_resolves_families_and_falls_back() {
    if system_font().is_none() {
        return;
    }
    let face = find_system_font("sans-serif", 700).unwrap();
    assert!(!face.family.is_empty());
    let mut font = LabelFont::from_system(face, "sans-serif").unwrap();
    assert!(font.stack().starts_with("sans-serif, \""));
    assert_eq!(font.layout("42", 30.0, 700).unwrap().glyphs.len(), 2);

    let fallback = find_system_font("\"No Such Family\", 'Nor This'", 400).unwrap();
    assert!(!fallback.bytes.is_empty());
}

use super::*;

#[test]
fn defaults_validate() {
    SheetConfig::default().validate().unwrap();
}

#[test]
fn json_uses_defaults_for_missing_fields() {
    let cfg = SheetConfig::from_json_str(
        r##"{
            "aspect_ratio": "0.75",
            "grid": { "cols": 4 },
            "numbering": { "position": "top-right", "stroke": { "enabled": false } },
            "overlay": { "source": "paper.png", "blend_mode": "multiply" },
            "redaction": { "mode": "sticker", "targets": "1-3", "line_style": "slash",
                           "sticker": { "source": "s.svg", "size_pct": 40 } }
        }"##,
    )
    .unwrap();

    assert_eq!(cfg.grid.cols, 4);
    assert_eq!(cfg.grid.rows_per_sheet, 3);
    assert_eq!(cfg.numbering.position, LabelAnchor::TopRight);
    assert!(!cfg.numbering.stroke.enabled);
    let overlay = cfg.overlay.as_ref().unwrap();
    assert_eq!(overlay.blend_mode, BlendMode::Multiply);
    assert!((overlay.opacity - 0.3).abs() < 1e-6);
    assert_eq!(cfg.redaction.mode, RedactionMode::Sticker);
    assert_eq!(cfg.redaction.line_style, LineStyle::Slash);
    let sticker = cfg.redaction.sticker.as_ref().unwrap();
    assert_eq!(sticker.size_pct, 40.0);
    assert_eq!(sticker.x_pct, 50.0);
    assert_eq!(cfg.mask().iter().collect::<Vec<_>>(), vec![1, 2, 3]);
}

#[test]
fn unknown_fields_are_rejected() {
    let err = SheetConfig::from_json_str(r#"{ "colums": 3 }"#).unwrap_err();
    assert!(matches!(err, GridsheetError::Serde(_)));
}

#[test]
fn validation_rejects_bad_preconditions() {
    let mut cfg = SheetConfig::default();
    cfg.export.quality = 0;
    assert!(cfg.validate().unwrap_err().is_precondition());

    let mut cfg = SheetConfig::default();
    cfg.grid.cols = 0;
    assert!(cfg.validate().is_err());

    let mut cfg = SheetConfig::default();
    cfg.aspect_ratio = "wide".to_string();
    assert!(cfg.validate().is_err());

    let mut cfg = SheetConfig::default();
    cfg.overlay = Some(OverlayConfig {
        source: "x.png".to_string(),
        blend_mode: BlendMode::Normal,
        opacity: 1.5,
    });
    assert!(cfg.validate().is_err());

    let mut cfg = SheetConfig::default();
    cfg.numbering.size = 0.0;
    assert!(cfg.validate().is_err());
    cfg.numbering.enabled = false;
    cfg.validate().unwrap();
}

#[test]
fn config_round_trips_through_json() {
    let mut cfg = SheetConfig::default();
    cfg.redaction.targets = "2,4".to_string();
    cfg.numbering.position = LabelAnchor::Center;
    let s = serde_json::to_string(&cfg).unwrap();
    let back = SheetConfig::from_json_str(&s).unwrap();
    assert_eq!(back.redaction.targets, "2,4");
    assert_eq!(back.numbering.position, LabelAnchor::Center);
    assert_eq!(back.background.to_rgba8(), Rgba8::WHITE);
}

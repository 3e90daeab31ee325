// Configuration file unit tests
// Load YAML configurations the way the CLI does

use sukashi::config::*;
use sukashi::watermark::{TextAlign, TileMode, WatermarkConfig};

#[test]
fn test_can_deserialize_camel_case_watermark_options() {
    let yaml = r##"
watermark:
  text: "CONFIDENTIAL"
  isAlign: false
  textAlign: center
  color: "#00000026"
  fontSize: 20
  fontType: "Helvetica, sans-serif"
  degree: -30
  rowGap: 80
  columnGap: 120
"##;
    let config = Config::from_yaml_with_env(yaml).expect("Failed to parse YAML");
    let watermark = &config.watermark;

    assert_eq!(watermark.text, "CONFIDENTIAL");
    assert_eq!(watermark.tile_mode(), TileMode::Free);
    assert_eq!(watermark.text_align, TextAlign::Center);
    assert_eq!(watermark.color, "#00000026");
    assert_eq!(watermark.font_size, 20.0);
    assert_eq!(watermark.font_type, "Helvetica, sans-serif");
    assert_eq!(watermark.degree, -30.0);
    assert_eq!(watermark.row_gap, 80.0);
    assert_eq!(watermark.column_gap, 120.0);
    assert!(config.validate().is_ok());
}

#[test]
fn test_can_deserialize_snake_case_watermark_options() {
    let yaml = r##"
watermark:
  text: "DRAFT"
  is_align: true
  font_size: 14
  row_gap: 10
  column_gap: 20
"##;
    let config = Config::from_yaml_with_env(yaml).expect("Failed to parse YAML");
    assert!(config.watermark.is_align);
    assert_eq!(config.watermark.font_size, 14.0);
    assert_eq!(config.watermark.row_gap, 10.0);
    assert_eq!(config.watermark.column_gap, 20.0);
}

#[test]
fn test_watermark_defaults() {
    let config = Config::from_yaml_with_env("watermark: {}").expect("Failed to parse YAML");
    assert_eq!(config.watermark, WatermarkConfig::default());
    assert!(config.watermark.is_inert());
    assert!(config.watermark.is_align);
    assert_eq!(config.watermark.color, "rgba(255, 255, 255, 0.2)");
    assert_eq!(config.watermark.font_size, 25.0);
    assert_eq!(config.watermark.font_type, "Arial");
    assert_eq!(config.watermark.degree, 45.0);
    assert_eq!(config.watermark.row_gap, 100.0);
    assert_eq!(config.watermark.column_gap, 100.0);
}

#[test]
fn test_unknown_text_align_is_rejected() {
    let yaml = "watermark:\n  text: x\n  textAlign: justify\n";
    assert!(Config::from_yaml_with_env(yaml).is_err());
}

#[test]
fn test_validate_rejects_bad_color() {
    let yaml = "watermark:\n  text: x\n  color: \"rgba(1, 2)\"\n";
    let config = Config::from_yaml_with_env(yaml).expect("Failed to parse YAML");
    let err = config.validate().unwrap_err();
    assert!(err.contains("color"), "unexpected error: {}", err);
}

#[test]
fn test_validate_rejects_negative_gap() {
    let yaml = "watermark:\n  text: x\n  rowGap: -5\n";
    let config = Config::from_yaml_with_env(yaml).expect("Failed to parse YAML");
    assert!(config.validate().unwrap_err().contains("row_gap"));
}

#[test]
fn test_validate_rejects_nan_viewport() {
    let mut config = Config::from_yaml_with_env("watermark:\n  text: x\n").unwrap();
    config.viewport.width = f64::NAN;
    assert!(config.validate().unwrap_err().contains("viewport.width"));
}

#[test]
fn test_env_substitution_in_color() {
    std::env::set_var("SUKASHI_UNIT_WATERMARK_COLOR", "#ff000080");
    let yaml = "watermark:\n  text: x\n  color: \"${SUKASHI_UNIT_WATERMARK_COLOR}\"\n";
    let config = Config::from_yaml_with_env(yaml).unwrap();
    assert_eq!(config.watermark.color, "#ff000080");
    assert!(config.validate().is_ok());
}

#[test]
fn test_unparseable_fallback_font_fails_to_load() {
    let dir = tempfile::tempdir().unwrap();
    let font_path = dir.path().join("broken.ttf");
    std::fs::write(&font_path, b"not a font").unwrap();

    let yaml = format!(
        "watermark:\n  text: x\nfonts:\n  fallback: {}\n",
        font_path.display()
    );
    let config = Config::from_yaml_with_env(&yaml).unwrap();
    // The file exists, so validation passes, but parsing it fails
    assert!(config.validate().is_ok());
    assert!(config.fonts.font_book().is_err());
}

#[test]
fn test_config_round_trips_through_yaml() {
    let config = Config::from_yaml_with_env("watermark:\n  text: SECRET\n").unwrap();
    let yaml = serde_yaml::to_string(&config).unwrap();
    let reparsed = Config::from_yaml_with_env(&yaml).unwrap();
    assert_eq!(reparsed.watermark, config.watermark);
    assert_eq!(reparsed.container, config.container);
    assert_eq!(reparsed.viewport, config.viewport);
}

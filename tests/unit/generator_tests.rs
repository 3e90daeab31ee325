// Tile generator tests
// Render through the software rasterizer and inspect the PNG output

use sukashi::watermark::{
    render_aligned_tile, render_free_tile, render_tile, CanvasSize, RasterSurfaceFactory,
    TextAlign, TileMode, WatermarkConfig, WatermarkError, EMPTY_DATA_URL,
};

fn decode(tile: &sukashi::watermark::TileImage) -> image::RgbaImage {
    let bytes = tile.png_bytes().expect("tile is not a PNG data URL");
    image::load_from_memory(&bytes)
        .expect("invalid PNG")
        .to_rgba8()
}

fn painted_pixels(image: &image::RgbaImage) -> usize {
    image.pixels().filter(|p| p[3] > 0).count()
}

#[test]
fn test_aligned_tile_is_deterministic() {
    let config = WatermarkConfig::new("SECRET")
        .with_font_size(20.0)
        .with_degree(45.0);
    let surfaces = RasterSurfaceFactory::new();

    let first = render_aligned_tile(&config, &surfaces).unwrap();
    let second = render_aligned_tile(&config, &surfaces).unwrap();
    let fresh = render_aligned_tile(&config, &RasterSurfaceFactory::new()).unwrap();

    assert_eq!(first, second);
    assert_eq!(first, fresh);
    assert!(first.data_url.starts_with("data:image/png;base64,"));
}

#[test]
fn test_aligned_tile_grows_with_gaps() {
    let surfaces = RasterSurfaceFactory::new();
    let base = render_aligned_tile(&WatermarkConfig::new("SECRET"), &surfaces).unwrap();
    let wide = render_aligned_tile(
        &WatermarkConfig::new("SECRET").with_gaps(100.0, 160.0),
        &surfaces,
    )
    .unwrap();

    assert_eq!(wide.width, base.width + 60);
    assert_eq!(wide.height, base.height);
    // Both sides start from the same text width
    assert_eq!(base.width, base.height);
}

#[test]
fn test_aligned_tile_has_translucent_ink() {
    let config = WatermarkConfig::new("SECRET").with_color("rgba(255, 0, 0, 0.5)");
    let tile = render_aligned_tile(&config, &RasterSurfaceFactory::new()).unwrap();
    let image = decode(&tile);

    assert_eq!((image.width(), image.height()), (tile.width, tile.height));
    assert!(painted_pixels(&image) > 0);
    assert!(image.pixels().all(|p| p[3] <= 128));
    assert!(image
        .pixels()
        .filter(|p| p[3] > 0)
        .all(|p| p[1] == 0 && p[2] == 0));
}

#[test]
fn test_text_align_changes_output() {
    let surfaces = RasterSurfaceFactory::new();
    let start = render_aligned_tile(&WatermarkConfig::new("SECRET"), &surfaces).unwrap();
    let end = render_aligned_tile(
        &WatermarkConfig::new("SECRET").with_text_align(TextAlign::End),
        &surfaces,
    )
    .unwrap();

    assert_eq!((start.width, start.height), (end.width, end.height));
    assert_ne!(start.data_url, end.data_url);
}

#[test]
fn test_free_image_matches_canvas() {
    let config = WatermarkConfig::new("SECRET").with_align(false);
    let tile = render_free_tile(
        &config,
        CanvasSize::new(800.0, 300.0),
        1280.0,
        &RasterSurfaceFactory::new(),
    )
    .unwrap();

    let image = decode(&tile);
    assert_eq!((image.width(), image.height()), (800, 300));
    assert!(painted_pixels(&image) > 0);
}

#[test]
fn test_free_image_truncates_fractional_canvas() {
    let config = WatermarkConfig::new("SECRET").with_align(false);
    let tile = render_free_tile(
        &config,
        CanvasSize::new(320.9, 200.5),
        640.0,
        &RasterSurfaceFactory::new(),
    )
    .unwrap();
    assert_eq!((tile.width, tile.height), (320, 200));
}

#[test]
fn test_free_image_of_empty_container() {
    let config = WatermarkConfig::new("SECRET").with_align(false);
    let tile = render_free_tile(
        &config,
        CanvasSize::new(0.0, 300.0),
        1280.0,
        &RasterSurfaceFactory::new(),
    )
    .unwrap();
    assert_eq!(tile.data_url, EMPTY_DATA_URL);
    assert!(tile.png_bytes().is_err());
}

#[test]
fn test_render_tile_follows_mode() {
    let surfaces = RasterSurfaceFactory::new();
    let canvas = CanvasSize::new(640.0, 480.0);

    let aligned = WatermarkConfig::new("SECRET");
    assert_eq!(aligned.tile_mode(), TileMode::Aligned);
    assert_eq!(
        render_tile(&aligned, canvas, 1280.0, &surfaces).unwrap(),
        render_aligned_tile(&aligned, &surfaces).unwrap()
    );

    let free = aligned.with_align(false);
    let tile = render_tile(&free, canvas, 1280.0, &surfaces).unwrap();
    assert_eq!((tile.width, tile.height), (640, 480));
}

#[test]
fn test_bad_color_fails_before_drawing() {
    let config = WatermarkConfig::new("SECRET").with_color("chartreuse-ish");
    let err = render_aligned_tile(&config, &RasterSurfaceFactory::new()).unwrap_err();
    assert!(matches!(err, WatermarkError::ColorError(_)));
}

#[test]
fn test_free_image_of_short_text_on_wide_viewport() {
    // Several million grid positions at 12px with no gaps
    let config = WatermarkConfig::new(".")
        .with_align(false)
        .with_font_size(12.0)
        .with_color("rgba(0, 0, 0, 1)")
        .with_gaps(0.0, 0.0);
    let tile = render_free_tile(
        &config,
        CanvasSize::new(200.0, 100.0),
        3840.0,
        &RasterSurfaceFactory::new(),
    )
    .unwrap();

    let image = decode(&tile);
    assert_eq!((image.width(), image.height()), (200, 100));
    assert!(painted_pixels(&image) > 0);
}

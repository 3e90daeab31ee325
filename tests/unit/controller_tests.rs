// Watermark controller tests
// Drive the controller through the in-memory host

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::rc::Rc;
use sukashi::controller::attach;
use sukashi::host::{Element, ElementRef, MemoryHost, BACKGROUND_IMAGE, BACKGROUND_REPEAT};
use sukashi::reactive::Observable;
use sukashi::watermark::{
    render_aligned_tile, CanvasSize, RasterSurfaceFactory, Result, Surface, SurfaceFactory,
    WatermarkConfig, WatermarkError,
};

struct FailingFactory;

impl SurfaceFactory for FailingFactory {
    fn create_surface(&self, width: u32, height: u32) -> Result<Box<dyn Surface>> {
        Err(WatermarkError::SurfaceUnavailable(format!(
            "no 2d context for {}x{}",
            width, height
        )))
    }
}

fn secret_config() -> WatermarkConfig {
    WatermarkConfig::new("SECRET")
        .with_font_size(20.0)
        .with_degree(45.0)
        .with_color("rgba(0, 0, 0, 0.2)")
}

/// Decode the PNG carried by a `url(data:image/png;base64,...)` value.
fn decode_background(value: &str) -> image::DynamicImage {
    let payload = value
        .strip_prefix("url(data:image/png;base64,")
        .and_then(|rest| rest.strip_suffix(')'))
        .expect("background is not a PNG data URL");
    let bytes = STANDARD.decode(payload).expect("invalid base64 payload");
    image::load_from_memory(&bytes).expect("invalid PNG")
}

// Test: aligned watermark applies the cached tile with repeat
#[test]
fn test_aligned_watermark_applied_on_first_flush() {
    let host = Rc::new(MemoryHost::new());
    let container = Observable::new(None);
    let handle = attach(secret_config(), host.clone(), &container);
    assert!(!handle.is_observing());

    let element = host.create_element(500.0, 500.0);
    container.set(Some(element.clone() as ElementRef));
    assert!(handle.is_observing());
    host.flush();

    let expected = render_aligned_tile(&secret_config(), &RasterSurfaceFactory::new()).unwrap();
    assert_eq!(
        element.style_property(BACKGROUND_IMAGE),
        Some(expected.css_url())
    );
    assert_eq!(
        element.style_property(BACKGROUND_REPEAT).as_deref(),
        Some("repeat")
    );

    let image = decode_background(&expected.css_url());
    assert_eq!(image.width(), expected.width);
    assert_eq!(image.height(), expected.height);
}

// Test: empty text never observes anything
#[test]
fn test_empty_text_is_inert() {
    let host = Rc::new(MemoryHost::new());
    let container = Observable::new(None);
    let handle = attach(WatermarkConfig::new(""), host.clone(), &container);

    let element = host.create_element(500.0, 500.0);
    container.set(Some(element.clone() as ElementRef));
    host.flush();

    assert!(!handle.is_observing());
    assert_eq!(host.active_resize_observers(), 0);
    assert_eq!(host.active_mutation_observers(), 0);
    assert_eq!(element.style_text(), "");
    assert!(handle.applied_background().is_none());
}

// Test: free mode follows the container size and disables repetition
#[test]
fn test_free_mode_resize_regenerates_image() {
    let host = Rc::new(MemoryHost::new().with_viewport_width(1000.0));
    let element = host.create_element(500.0, 500.0);
    let container = Observable::new(Some(element.clone() as ElementRef));
    let handle = attach(
        secret_config().with_align(false),
        host.clone(),
        &container,
    );
    host.flush();

    let first = element.style_property(BACKGROUND_IMAGE).unwrap();
    let image = decode_background(&first);
    assert_eq!((image.width(), image.height()), (500, 500));
    assert_eq!(
        element.style_property(BACKGROUND_REPEAT).as_deref(),
        Some("no-repeat")
    );

    element.set_content_size(800.0, 300.0);
    host.flush();

    assert_eq!(handle.canvas_size(), CanvasSize::new(800.0, 300.0));
    let second = element.style_property(BACKGROUND_IMAGE).unwrap();
    assert_ne!(first, second);
    let image = decode_background(&second);
    assert_eq!((image.width(), image.height()), (800, 300));
    assert_eq!(
        element.style_property(BACKGROUND_REPEAT).as_deref(),
        Some("no-repeat")
    );
}

// Test: an external style overwrite is repaired and delivery settles
#[test]
fn test_external_overwrite_is_repaired() {
    let host = Rc::new(MemoryHost::new());
    let element = host.create_element(500.0, 500.0);
    let container = Observable::new(Some(element.clone() as ElementRef));
    let handle = attach(secret_config(), host.clone(), &container);
    host.flush();
    let applied = handle.applied_background().unwrap();

    element.replace_style("color: red");
    let rounds = host.flush();

    assert!(rounds <= 2, "delivery took {} rounds", rounds);
    assert_eq!(host.pending_notifications(), 0);
    assert_eq!(element.style_property("color").as_deref(), Some("red"));
    assert_eq!(element.style_property(BACKGROUND_IMAGE), Some(applied.image));
    assert_eq!(
        element.style_property(BACKGROUND_REPEAT).as_deref(),
        Some("repeat")
    );
}

// Test: overwriting only the repeat mode is repaired
#[test]
fn test_repeat_overwrite_is_repaired() {
    let host = Rc::new(MemoryHost::new());
    let element = host.create_element(500.0, 500.0);
    let container = Observable::new(Some(element.clone() as ElementRef));
    let _handle = attach(secret_config(), host.clone(), &container);
    host.flush();

    element.set_style_property(BACKGROUND_REPEAT, "no-repeat");
    host.flush();

    assert_eq!(
        element.style_property(BACKGROUND_REPEAT).as_deref(),
        Some("repeat")
    );
}

// Test: unrelated style writes are not answered with a rewrite
#[test]
fn test_unrelated_style_write_settles_in_one_round() {
    let host = Rc::new(MemoryHost::new());
    let element = host.create_element(500.0, 500.0);
    let container = Observable::new(Some(element.clone() as ElementRef));
    let _handle = attach(secret_config(), host.clone(), &container);
    host.flush();

    element.set_style_property("border", "1px solid red");
    assert_eq!(host.flush(), 1);
    assert_eq!(host.pending_notifications(), 0);
}

// Test: teardown before the container is populated
#[test]
fn test_teardown_before_start() {
    let host = Rc::new(MemoryHost::new());
    let container = Observable::new(None);
    let handle = attach(secret_config(), host.clone(), &container);

    handle.teardown();
    handle.teardown();

    let element = host.create_element(500.0, 500.0);
    container.set(Some(element.clone() as ElementRef));
    host.flush();

    assert!(handle.is_torn_down());
    assert!(!handle.is_observing());
    assert_eq!(host.active_resize_observers(), 0);
    assert_eq!(container.subscriber_count(), 0);
    assert!(element.style_property(BACKGROUND_IMAGE).is_none());
}

// Test: after teardown the element is left alone
#[test]
fn test_teardown_stops_repairs() {
    let host = Rc::new(MemoryHost::new());
    let element = host.create_element(500.0, 500.0);
    let container = Observable::new(Some(element.clone() as ElementRef));
    let handle = attach(secret_config(), host.clone(), &container);
    host.flush();
    assert!(element.style_property(BACKGROUND_IMAGE).is_some());

    handle.teardown();
    element.replace_style("");
    element.set_content_size(10.0, 10.0);
    assert_eq!(host.flush(), 0);
    assert_eq!(element.style_text(), "");
}

// Test: a host without geometry observation leaves the watermark off
#[test]
fn test_missing_resize_capability() {
    let host = Rc::new(MemoryHost::new().without_resize_observer());
    let element = host.create_element(500.0, 500.0);
    let container = Observable::new(Some(element.clone() as ElementRef));
    let handle = attach(secret_config(), host.clone(), &container);
    host.flush();

    assert!(!handle.is_observing());
    assert_eq!(host.active_mutation_observers(), 0);
    assert!(element.style_property(BACKGROUND_IMAGE).is_none());

    // Teardown still succeeds
    handle.teardown();
    assert!(handle.is_torn_down());
}

// Test: a surface failure leaves the style untouched but keeps observing
#[test]
fn test_surface_unavailable_leaves_style_untouched() {
    let host = Rc::new(MemoryHost::new().with_surfaces(Box::new(FailingFactory)));
    let element = host.create_element(500.0, 500.0);
    element.set_style_property("color", "blue");
    let container = Observable::new(Some(element.clone() as ElementRef));
    let handle = attach(secret_config(), host.clone(), &container);
    host.flush();

    assert!(handle.is_observing());
    assert!(handle.applied_background().is_none());
    assert_eq!(element.style_text(), "color: blue");

    element.replace_style("color: green");
    host.flush();
    assert_eq!(element.style_text(), "color: green");
}

// Test: a font too large to rasterize degrades like a missing surface
#[test]
fn test_huge_font_leaves_style_untouched() {
    for is_align in [true, false] {
        let host = Rc::new(MemoryHost::new());
        let element = host.create_element(500.0, 500.0);
        element.set_style_property("color", "blue");
        let container = Observable::new(Some(element.clone() as ElementRef));
        let config = secret_config()
            .with_font_size(200_000.0)
            .with_align(is_align);
        let handle = attach(config, host.clone(), &container);
        host.flush();

        assert!(handle.is_observing(), "is_align = {}", is_align);
        assert!(handle.applied_background().is_none());
        assert_eq!(element.style_text(), "color: blue");

        element.set_content_size(640.0, 480.0);
        host.flush();
        assert_eq!(element.style_text(), "color: blue");
        handle.teardown();
    }
}

// Test: two watermarks on different elements do not interfere
#[test]
fn test_independent_controllers() {
    let host = Rc::new(MemoryHost::new());
    let first = host.create_element(300.0, 300.0);
    let second = host.create_element(400.0, 200.0);
    let first_container = Observable::new(Some(first.clone() as ElementRef));
    let second_container = Observable::new(Some(second.clone() as ElementRef));

    let first_handle = attach(secret_config(), host.clone(), &first_container);
    let _second_handle = attach(
        WatermarkConfig::new("DRAFT").with_align(false),
        host.clone(),
        &second_container,
    );
    host.flush();

    assert_eq!(
        first.style_property(BACKGROUND_REPEAT).as_deref(),
        Some("repeat")
    );
    assert_eq!(
        second.style_property(BACKGROUND_REPEAT).as_deref(),
        Some("no-repeat")
    );

    first_handle.teardown();
    second.replace_style("");
    host.flush();
    assert!(second.style_property(BACKGROUND_IMAGE).is_some());
    assert_eq!(host.active_resize_observers(), 1);
}

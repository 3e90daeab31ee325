// In-memory host unit tests

use std::cell::RefCell;
use std::rc::Rc;
use sukashi::host::{
    ContentRect, Element, ElementRef, Host, MemoryHost, MutationObserver, ObserveOptions,
    DEFAULT_MAX_ROUNDS, DEFAULT_VIEWPORT_WIDTH,
};

type Log<T> = Rc<RefCell<Vec<T>>>;

fn style_log(host: &MemoryHost, target: &ElementRef) -> (Box<dyn MutationObserver>, Log<String>) {
    let log: Log<String> = Rc::new(RefCell::new(Vec::new()));
    let sink = log.clone();
    let observer = host.create_mutation_observer(Box::new(move |records| {
        for record in records {
            sink.borrow_mut()
                .push(record.attribute_name.clone().unwrap_or_default());
        }
    }));
    observer.observe(target, ObserveOptions::style_only());
    (observer, log)
}

#[test]
fn test_host_defaults() {
    let host = MemoryHost::new();
    assert_eq!(host.viewport_width(), DEFAULT_VIEWPORT_WIDTH);
    assert_eq!(host.pending_notifications(), 0);
    assert_eq!(host.flush(), 0);
    assert_eq!(DEFAULT_MAX_ROUNDS, 64);

    host.set_viewport_width(1920.0);
    assert_eq!(host.viewport_width(), 1920.0);
}

#[test]
fn test_every_style_write_is_reported() {
    let host = MemoryHost::new();
    let element = host.create_element(100.0, 100.0);
    let target: ElementRef = element.clone();
    let (_observer, log) = style_log(&host, &target);

    element.set_style_property("color", "red");
    element.set_style_property("color", "red");
    element.replace_style("color: red");
    assert_eq!(host.pending_notifications(), 3);

    assert_eq!(host.flush(), 1);
    assert_eq!(*log.borrow(), vec!["style", "style", "style"]);
}

#[test]
fn test_unobserved_elements_are_silent() {
    let host = MemoryHost::new();
    let watched: ElementRef = host.create_element(100.0, 100.0);
    let other = host.create_element(100.0, 100.0);
    let (_observer, log) = style_log(&host, &watched);

    other.set_style_property("color", "red");
    assert_eq!(host.flush(), 0);
    assert!(log.borrow().is_empty());
}

#[test]
fn test_replace_style_parses_declarations() {
    let host = MemoryHost::new();
    let element = host.create_element(10.0, 10.0);
    element.replace_style("Color: red;  background-repeat : no-repeat ; bogus; ");

    assert_eq!(element.style_property("color").as_deref(), Some("red"));
    assert_eq!(
        element.style_property("background-repeat").as_deref(),
        Some("no-repeat")
    );
    assert_eq!(element.style_text(), "background-repeat: no-repeat; color: red");

    element.replace_style("");
    assert_eq!(element.style_text(), "");
}

#[test]
fn test_observe_reports_initial_size_and_coalesces() {
    let host = MemoryHost::new();
    let element = host.create_element(500.0, 500.0);
    let target: ElementRef = element.clone();

    let sizes: Log<ContentRect> = Rc::new(RefCell::new(Vec::new()));
    let sink = sizes.clone();
    let observer = host
        .create_resize_observer(Box::new(move |entries| {
            sink.borrow_mut()
                .extend(entries.iter().map(|e| e.content_rect));
        }))
        .expect("resize observation supported");

    observer.observe(&target);
    observer.observe(&target);
    element.set_content_size(640.0, 480.0);
    element.set_content_size(800.0, 300.0);
    assert_eq!(host.pending_notifications(), 1);

    host.flush();
    assert_eq!(*sizes.borrow(), vec![ContentRect::new(800.0, 300.0)]);
    assert_eq!(host.active_resize_observers(), 1);

    observer.unobserve(&target);
    element.set_content_size(10.0, 10.0);
    assert_eq!(host.flush(), 0);
    assert_eq!(host.active_resize_observers(), 0);
}

#[test]
fn test_missing_resize_capability() {
    let host = MemoryHost::new().without_resize_observer();
    assert!(host.create_resize_observer(Box::new(|_| {})).is_none());
}

#[test]
fn test_dropped_observer_is_forgotten() {
    let host = MemoryHost::new();
    let element = host.create_element(10.0, 10.0);
    let target: ElementRef = element.clone();
    let (observer, log) = style_log(&host, &target);
    assert_eq!(host.active_mutation_observers(), 1);

    drop(observer);
    element.set_style_property("color", "red");
    assert_eq!(host.active_mutation_observers(), 0);
    assert_eq!(host.flush(), 0);
    assert!(log.borrow().is_empty());
}

#[test]
fn test_disconnect_drops_pending_records() {
    let host = MemoryHost::new();
    let element = host.create_element(10.0, 10.0);
    let target: ElementRef = element.clone();
    let (observer, log) = style_log(&host, &target);

    element.set_style_property("color", "red");
    observer.disconnect();
    assert_eq!(host.pending_notifications(), 0);
    assert_eq!(host.flush(), 0);
    assert!(log.borrow().is_empty());
}

#[test]
fn test_writes_from_callbacks_go_to_next_round() {
    let host = MemoryHost::new();
    let element = host.create_element(10.0, 10.0);
    let target: ElementRef = element.clone();

    let writer = element.clone();
    let remaining = Rc::new(RefCell::new(3));
    let counter = remaining.clone();
    let observer = host.create_mutation_observer(Box::new(move |_| {
        let mut left = counter.borrow_mut();
        if *left > 0 {
            *left -= 1;
            writer.set_style_property("color", "red");
        }
    }));
    observer.observe(&target, ObserveOptions::style_only());

    element.set_style_property("color", "blue");
    assert_eq!(host.flush(), 4);
    assert_eq!(*remaining.borrow(), 0);
    assert_eq!(host.pending_notifications(), 0);
}

#[test]
fn test_flush_stops_at_round_limit() {
    let host = MemoryHost::new().with_max_rounds(5);
    let element = host.create_element(10.0, 10.0);
    let target: ElementRef = element.clone();

    // Rewrites the style on every notification, so delivery never settles
    let writer = element.clone();
    let observer = host.create_mutation_observer(Box::new(move |_| {
        writer.set_style_property("color", "red");
    }));
    observer.observe(&target, ObserveOptions::style_only());

    element.set_style_property("color", "blue");
    assert_eq!(host.flush(), 5);
    assert_eq!(host.pending_notifications(), 0);
}

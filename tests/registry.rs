use std::cell::Cell;
use std::rc::Rc;

use cadbridge_viewer::config::ViewerConfig;
use cadbridge_viewer::mesh::sample;
use cadbridge_viewer::registry::ViewportRegistry;
use cadbridge_viewer::viewport::surface::{ContainerSlot, RecordingSurface, SurfaceSize};
use cadbridge_viewer::viewport::ViewportState;
use cadbridge_viewer::ViewportError;

fn slot() -> Rc<ContainerSlot> {
    Rc::new(ContainerSlot::new(SurfaceSize::new(400, 300)))
}

#[test]
fn get_or_create_returns_the_same_instance() {
    let mut registry = ViewportRegistry::new(ViewerConfig::default());
    let built = Cell::new(0);
    let make = || {
        built.set(built.get() + 1);
        Ok(RecordingSurface::new())
    };

    let a = registry.get_or_create("main", slot(), make).unwrap();
    let b = registry.get_or_create("main", slot(), || {
        built.set(built.get() + 1);
        Ok(RecordingSurface::new())
    })
    .unwrap();

    assert!(a.ptr_eq(&b));
    assert_eq!(built.get(), 1);
    assert_eq!(registry.len(), 1);

    a.try_with(|vp| vp.load(sample::cube(1.0))).unwrap();
    assert_eq!(b.with(|vp| vp.state()).unwrap(), ViewportState::Loaded);
}

#[test]
fn names_are_independent() {
    let mut registry = ViewportRegistry::new(ViewerConfig::default());
    let stl = registry.get_or_create("stl", slot(), || Ok(RecordingSurface::new())).unwrap();
    let step = registry.get_or_create("step", slot(), || Ok(RecordingSurface::new())).unwrap();
    assert!(!stl.ptr_eq(&step));
    assert_eq!(registry.names().collect::<Vec<_>>(), ["step", "stl"]);
}

#[test]
fn failed_creation_registers_nothing() {
    let mut registry = ViewportRegistry::<RecordingSurface>::new(ViewerConfig::default());
    let err = registry
        .get_or_create("main", Rc::new(ContainerSlot::unresolved()), || Ok(RecordingSurface::new()))
        .err();
    assert!(matches!(err, Some(ViewportError::Container(_))));
    assert!(!registry.contains("main"));

    let err = registry.get_or_create("main", slot(), || Err(ViewportError::Container("no gl".into()))).err();
    assert_eq!(err, Some(ViewportError::Container("no gl".into())));
    assert!(registry.is_empty());

    registry.get_or_create("main", slot(), || Ok(RecordingSurface::new())).unwrap();
    assert!(registry.contains("main"));
}

#[test]
fn dispose_unregisters_and_next_call_rebuilds() {
    let mut registry = ViewportRegistry::new(ViewerConfig::default());
    let first = registry.get_or_create("main", slot(), || Ok(RecordingSurface::new())).unwrap();
    first.try_with(|vp| vp.load(sample::cube(1.0))).unwrap();

    assert_eq!(registry.dispose("main"), Ok(true));
    assert_eq!(registry.dispose("main"), Ok(false));
    first
        .with(|vp| {
            assert_eq!(vp.state(), ViewportState::Disposed);
            assert_eq!(vp.surface().live_meshes(), 0);
        })
        .unwrap();

    let second = registry.get_or_create("main", slot(), || Ok(RecordingSurface::new())).unwrap();
    assert!(!first.ptr_eq(&second));
    assert_eq!(second.with(|vp| vp.state()).unwrap(), ViewportState::Empty);
}

#[test]
fn reentrant_calls_report_busy() {
    let mut registry = ViewportRegistry::new(ViewerConfig::default());
    let handle = registry.get_or_create("main", slot(), || Ok(RecordingSurface::new())).unwrap();
    let inner = handle.clone();

    let nested = handle.with(|_vp| inner.with(|vp| vp.state())).unwrap();
    assert_eq!(nested, Err(ViewportError::Busy));

    // Disposing while an operation holds the viewport keeps it registered.
    let result = handle.with(|_vp| registry.dispose("main")).unwrap();
    assert_eq!(result, Err(ViewportError::Busy));
    assert!(registry.contains("main"));
    assert_eq!(registry.dispose("main"), Ok(true));
}

#[test]
fn dropping_the_registry_disposes_its_viewports() {
    let mut registry = ViewportRegistry::new(ViewerConfig::default());
    let handle = registry.get_or_create("main", slot(), || Ok(RecordingSurface::new())).unwrap();
    drop(registry);
    assert_eq!(handle.with(|vp| vp.state()).unwrap(), ViewportState::Disposed);
}

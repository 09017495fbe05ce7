use approx::assert_relative_eq;
use cadbridge_viewer::viewport::input::{InputController, PointerEvent, PointerSample};
use glam::Vec2;

#[test]
fn up_or_leave_always_ends_a_drag() {
    for end in [PointerEvent::Up, PointerEvent::Leave] {
        let mut input = InputController::new(0.01, 0.0005);
        input.pointer(PointerEvent::Down { x: 5.0, y: 5.0 });
        input.pointer(PointerEvent::Move { x: 6.0, y: 5.0 });
        assert!(input.is_dragging());

        input.pointer(end);
        assert!(!input.is_dragging());
        assert_eq!(input.pointer(PointerEvent::Move { x: 50.0, y: 50.0 }), None);
    }
}

#[test]
fn each_move_reports_the_step_since_the_last() {
    let mut input = InputController::new(0.02, 0.0005);
    input.pointer(PointerEvent::Down { x: 0.0, y: 0.0 });
    let a = input.pointer(PointerEvent::Move { x: 10.0, y: 0.0 }).unwrap();
    let b = input.pointer(PointerEvent::Move { x: 10.0, y: 25.0 }).unwrap();
    assert_relative_eq!(a.yaw, 0.2, epsilon = 1e-6);
    assert_relative_eq!(a.pitch, 0.0, epsilon = 1e-6);
    assert_relative_eq!(b.yaw, 0.0, epsilon = 1e-6);
    assert_relative_eq!(b.pitch, 0.5, epsilon = 1e-6);
}

#[test]
fn wheel_factor_follows_delta_sign() {
    let mut input = InputController::new(0.01, 0.001);
    let out = input.wheel(100.0);
    let back = input.wheel(-100.0);
    assert_relative_eq!(out.zoom_factor, 1.1, epsilon = 1e-6);
    assert_relative_eq!(back.zoom_factor, 0.9, epsilon = 1e-6);
    assert!(out.prevent_default && back.prevent_default);
    assert_relative_eq!(input.wheel(0.0).zoom_factor, 1.0);
}

#[test]
fn leaving_mid_drag_ends_it_while_the_button_is_held() {
    let mut input = InputController::new(0.01, 0.0005);
    let held = |x: f32, inside: bool| PointerSample { pos: Some(Vec2::new(x, 5.0)), inside, dragged: true, ..Default::default() };
    let feed = |sample: PointerSample, input: &mut InputController| {
        let event = sample.to_event(input.is_dragging());
        if let Some(e) = event {
            input.pointer(e);
        }
        event
    };

    let press = PointerSample { drag_started: true, ..held(5.0, true) };
    assert_eq!(feed(press, &mut input), Some(PointerEvent::Down { x: 5.0, y: 5.0 }));
    assert!(matches!(feed(held(20.0, true), &mut input), Some(PointerEvent::Move { .. })));

    // The host still reports a drag once the pointer is outside.
    assert_eq!(feed(held(900.0, false), &mut input), Some(PointerEvent::Leave));
    assert!(!input.is_dragging());
    assert_eq!(feed(held(950.0, false), &mut input), None);
    assert_eq!(feed(held(30.0, true), &mut input), None);
    assert!(!input.is_dragging());

    let release = PointerSample { pos: None, inside: true, drag_stopped: true, ..Default::default() };
    assert_eq!(feed(release, &mut input), Some(PointerEvent::Up));
}

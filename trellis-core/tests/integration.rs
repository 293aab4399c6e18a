//! Integration Tests for the Reactive System
//!
//! These tests verify that signals, effects, computed values and text
//! bindings work together correctly.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use trellis_core::bind::{assemble, bind_text, Slot};
use trellis_core::config::RuntimeConfig;
use trellis_core::dom::Node;
use trellis_core::reactive::{
    notify_depth, on_cleanup, Computed, Effect, EffectOptions, ReactiveContext, Runtime, Signal,
    SubscriberId,
};
use trellis_core::ReactiveError;

/// Test that writing an equal value notifies nobody.
#[test]
fn equal_writes_are_suppressed() {
    let signal = Signal::new("same".to_string());
    let calls = Rc::new(Cell::new(0));

    let counter = calls.clone();
    signal.on(move |_| counter.set(counter.get() + 1));
    let runs = Rc::new(Cell::new(0));
    let run_counter = runs.clone();
    let _effect = Effect::new(move || run_counter.set(run_counter.get() + 1), &[&signal]);

    signal.set("same".to_string());
    signal.set("same".to_string());

    // Only the initial calls.
    assert_eq!(calls.get(), 1);
    assert_eq!(runs.get(), 1);
}

/// Test that an always-unequal signal notifies on every write.
#[test]
fn forced_updates_notify_every_time() {
    let items = Signal::always(vec![1, 2, 3]);
    let calls = Rc::new(Cell::new(0));
    let runs = Rc::new(Cell::new(0));

    let counter = calls.clone();
    items.on(move |_| counter.set(counter.get() + 1));
    let run_counter = runs.clone();
    let _effect = Effect::new(move || run_counter.set(run_counter.get() + 1), &[&items]);

    let same = items.get();
    items.set(same.clone());
    items.set(same);

    assert_eq!(calls.get(), 3);
    assert_eq!(runs.get(), 3);
}

/// Test the ordering of a single write: the previous cleanup sees the old
/// value, and plain subscribers run before dependent effects.
#[test]
fn write_ordering() {
    let signal = Signal::new(1);
    let log = Rc::new(RefCell::new(Vec::<String>::new()));

    let (reader, effect_log) = (signal.clone(), log.clone());
    let _effect = Effect::new(
        move || {
            effect_log.borrow_mut().push(format!("run {}", reader.get()));
            let (reader, cleanup_log) = (reader.clone(), effect_log.clone());
            on_cleanup(move || cleanup_log.borrow_mut().push(format!("cleanup {}", reader.get())));
        },
        &[&signal],
    );

    let subscriber_log = log.clone();
    signal.on(move |value| subscriber_log.borrow_mut().push(format!("subscriber {value}")));

    log.borrow_mut().clear();
    signal.set(2);

    assert_eq!(
        *log.borrow(),
        vec!["cleanup 1", "subscriber 2", "run 2"]
    );
}

/// Test that a subscriber whose condition fails is never called again and
/// is dropped at the next write.
#[test]
fn dead_subscribers_are_compacted() {
    let signal = Signal::new(0);
    let alive = Rc::new(Cell::new(true));
    let calls = Rc::new(Cell::new(0));

    let (flag, counter) = (alive.clone(), calls.clone());
    signal.on_while(move |_| counter.set(counter.get() + 1), move || flag.get());
    signal.on(|_| {});
    assert_eq!(signal.subscriber_count(), 2);

    alive.set(false);
    signal.set(1);
    assert_eq!(signal.subscriber_count(), 1);

    signal.set(2);
    assert_eq!(calls.get(), 1);
    assert_eq!(signal.subscriber_count(), 1);
}

/// Test that releasing twice is harmless and detaches after the first call.
#[test]
fn release_is_idempotent() {
    let a = Signal::new(0);
    let b = Signal::new(0);
    let effect = Effect::new(|| {}, &[&a, &b]);
    assert_eq!(effect.dependency_count(), 2);

    effect.release();
    assert_eq!(a.dependent_count(), 0);
    assert_eq!(b.dependent_count(), 0);

    effect.release();
    a.set(1);
    assert_eq!(effect.run_count(), 1);
}

/// Test that a subscriber can detach itself during a notification pass
/// without disturbing the others.
#[test]
fn subscriber_detaches_itself_mid_pass() {
    let signal = Signal::new(0);
    let seen = Rc::new(RefCell::new(Vec::new()));
    let own_id: Rc<Cell<Option<SubscriberId>>> = Rc::new(Cell::new(None));

    let (handle, id_slot, log) = (signal.clone(), own_id.clone(), seen.clone());
    let id = signal.on(move |value| {
        log.borrow_mut().push(("first", *value));
        if *value > 0 {
            if let Some(id) = id_slot.get() {
                handle.off(id);
            }
        }
    });
    own_id.set(Some(id));

    let log = seen.clone();
    signal.on(move |value| log.borrow_mut().push(("second", *value)));

    seen.borrow_mut().clear();
    signal.set(1);
    signal.set(2);

    assert_eq!(
        *seen.borrow(),
        vec![("first", 1), ("second", 1), ("second", 2)]
    );
}

/// Test that a cycle is cut off by the depth guard instead of overflowing
/// the stack.
#[test]
fn cycles_hit_the_depth_guard() {
    Runtime::configure(RuntimeConfig {
        max_depth: 8,
        ..RuntimeConfig::default()
    });

    let ping = Signal::new(0).named("ping");
    let pong = Signal::new(0).named("pong");

    let (source, target) = (ping.clone(), pong.clone());
    let _forward = Effect::new(move || { target.set(source.get() + 1); }, &[&ping]);
    let (source, target) = (pong.clone(), ping.clone());
    let _back = Effect::new(move || { target.set(source.get() + 1); }, &[&pong]);

    ping.set(100);
    assert_eq!(notify_depth(), 0);
    assert!(ping.get() > 100);

    // At the limit a nested write is refused.
    let refused = Rc::new(RefCell::new(None));
    let deep = Signal::new(0);
    let (writer, result) = (deep.clone(), refused.clone());
    deep.on(move |value| {
        if *value > 0 && result.borrow().is_none() {
            if let Err(error) = writer.try_set(value + 1) {
                *result.borrow_mut() = Some(error);
            }
        }
    });
    deep.set(1);
    assert!(matches!(
        *refused.borrow(),
        Some(ReactiveError::DepthExceeded { depth: 8, .. })
    ));

    Runtime::configure(RuntimeConfig::default());
}

/// Test that a subscriber writing back to its own signal leaves every
/// binding showing the final value.
#[test]
fn nested_write_reaches_earlier_subscribers() {
    let value = Signal::new(0);
    let label = Node::element("span");
    label.append_child(&bind_text(&value)).unwrap();

    let writer = value.clone();
    value.on(move |v| {
        if *v < 0 {
            writer.set(0);
        }
    });

    value.set(-3);
    assert_eq!(value.get(), 0);
    assert_eq!(label.text_content(), "0");
    assert_eq!(value.subscriber_count(), 2);
}

/// Test a computed chain rendered into the DOM.
#[test]
fn computed_chain_renders() {
    let first = Signal::new("Ada".to_string());
    let last = Signal::new("Lovelace".to_string());

    let (f, l) = (first.clone(), last.clone());
    let full = Computed::new(move |out| { out.set(format!("{} {}", f.get(), l.get())); }, &[&first, &last]);
    let len = Computed::from_signal(&first, |name| name.len());

    let root = assemble([
        Slot::Open(Node::element("p")),
        Slot::from(full.clone()),
        " (".into(),
        Slot::from(len.clone()),
        ")".into(),
        Slot::Close,
    ]);
    let host = Node::element("main");
    host.append_child(&root).unwrap();
    assert_eq!(host.to_html(), "<main><p>Ada Lovelace (3)</p></main>");

    first.set("Grace".to_string());
    last.set("Hopper".to_string());
    assert_eq!(host.text_content(), "Grace Hopper (5)");
}

/// Test that an effect stops once its condition fails and a bound text
/// node stops updating once it is dropped.
#[test]
fn liveness_ends_bindings() {
    let signal = Signal::new(1);
    let node = Node::element("span");
    let weak = node.downgrade();

    let (source, target) = (signal.clone(), weak.clone());
    let effect = Effect::with_options(
        move || {
            if let Some(node) = target.upgrade() {
                node.set_attribute("data-value", source.get().to_string());
            }
        },
        &[&signal],
        EffectOptions::default()
            .name("attribute")
            .condition(move || weak.is_alive()),
    );
    node.append_child(&bind_text(&signal)).unwrap();

    signal.set(2);
    assert_eq!(node.to_html(), r#"<span data-value="2">2</span>"#);

    drop(node);
    signal.set(3);
    assert!(effect.is_released());
    assert_eq!(signal.subscriber_count(), 0);
    assert_eq!(signal.dependent_count(), 0);
}

/// Test that effects run inside a reactive context.
#[test]
fn effects_run_inside_a_context() {
    let observed = Rc::new(Cell::new(None));
    assert!(!ReactiveContext::is_active());

    let sink = observed.clone();
    let effect = Effect::new(move || sink.set(ReactiveContext::current_subscriber()), &[]);

    assert_eq!(observed.get(), Some(effect.subscriber_id()));
    assert!(!ReactiveContext::is_active());
}

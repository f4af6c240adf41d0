use super::*;
use std::{cell::Cell, rc::Rc};

#[test]
fn test_round_trip() {
    let mut bb = Blackboard::new();
    bb.set("distance", 12.5);
    bb.set("onRight", true);
    bb.set("label", "tank");

    assert_eq!(bb.get("distance"), Some(&BlackboardValue::Number(12.5)));
    assert_eq!(bb.get("onRight"), Some(&BlackboardValue::Bool(true)));
    assert_eq!(bb.get("label"), Some(&BlackboardValue::Text("tank".to_owned())));
    assert_eq!(bb.get_number("distance"), 12.5);
    assert!(bb.get_bool("onRight"));
    assert_eq!(bb.get_text("label"), Some("tank"));
    assert_eq!(bb.len(), 3);
}

#[test]
fn test_unset_key_defaults() {
    let bb = Blackboard::new();
    assert_eq!(bb.get("nothing"), None);
    assert!(!bb.contains("nothing"));
    assert_eq!(bb.get_number("nothing"), 0.);
    assert!(!bb.get_bool("nothing"));
    assert_eq!(bb.get_text("nothing"), None);
}

#[test]
fn test_wrong_kind_defaults() {
    let mut bb = Blackboard::new();
    bb.set("flag", true);
    assert_eq!(bb.get_number("flag"), 0.);
    bb.set("count", 3);
    assert!(!bb.get_bool("count"));
}

#[test]
fn test_overwrite_in_place() {
    let mut bb = Blackboard::new();
    assert!(bb.set("a", 1));
    assert!(bb.set("a", false));
    assert_eq!(bb.get("a"), Some(&BlackboardValue::Bool(false)));
    assert_eq!(bb.len(), 1);
}

#[test]
fn test_observers_in_registration_order() {
    let log = Rc::new(RefCell::new(vec![]));
    let mut bb = Blackboard::new();

    let first = log.clone();
    bb.subscribe("a", move |change| {
        first
            .borrow_mut()
            .push(("first", change.new.cloned(), change.old.cloned()))
    });
    let second = log.clone();
    bb.subscribe("a", move |change| {
        second
            .borrow_mut()
            .push(("second", change.new.cloned(), change.old.cloned()))
    });
    let other = log.clone();
    bb.subscribe("b", move |_| other.borrow_mut().push(("other", None, None)));

    bb.set("a", 1);

    assert_eq!(
        *log.borrow(),
        vec![
            ("first", Some(BlackboardValue::Number(1.)), None),
            ("second", Some(BlackboardValue::Number(1.)), None),
        ]
    );
}

#[test]
fn test_notify_only_on_change() {
    let count = Rc::new(Cell::new(0));
    let mut bb = Blackboard::new();
    let counter = count.clone();
    bb.subscribe("a", move |_| counter.set(counter.get() + 1));

    assert!(bb.set("a", 0.5));
    assert!(!bb.set("a", 0.5));
    assert!(bb.set("a", 0.6));
    assert_eq!(count.get(), 2);

    assert_eq!(bb.remove("a"), Some(BlackboardValue::Number(0.6)));
    assert_eq!(count.get(), 3);
    assert_eq!(bb.remove("a"), None);
    assert_eq!(count.get(), 3);
}

#[test]
fn test_unsubscribe_idempotent() {
    let count = Rc::new(Cell::new(0));
    let mut bb = Blackboard::new();
    let counter = count.clone();
    let id = bb.subscribe("a", move |_| counter.set(counter.get() + 1));

    assert!(bb.unsubscribe(id));
    assert!(!bb.unsubscribe(id));
    bb.set("a", true);
    assert_eq!(count.get(), 0);
    assert_eq!(bb.num_observers(), 0);
}

#[test]
fn test_clear() {
    let mut bb = Blackboard::new();
    bb.subscribe("a", |_| panic!("observers must not be notified by clear"));
    bb.set("b", 1);
    bb.clear();
    assert!(bb.is_empty());
    assert_eq!(bb.num_observers(), 0);
    bb.set("a", 1);
}

#[test]
fn test_parse_literal() {
    assert_eq!(BlackboardValue::parse_literal("true"), BlackboardValue::Bool(true));
    assert_eq!(BlackboardValue::parse_literal("0.1"), BlackboardValue::Number(0.1));
    assert_eq!(BlackboardValue::parse_literal("-3"), BlackboardValue::Number(-3.));
    assert_eq!(
        BlackboardValue::parse_literal("left"),
        BlackboardValue::Text("left".to_owned())
    );
}

use super::*;
use crate::{error::AddChildError, BuildError, Root, Status};
use std::time::Duration;

type Log = Vec<String>;

fn registry() -> Registry<Log> {
    let mut registry = Registry::default();
    registry.register_action("Say", &["word"], |args| {
        let word = args.required("word")?.to_owned();
        Ok(move |log: &mut Log| log.push(word.clone()))
    });
    registry.register_service("count", |log: &mut Log, bb| {
        log.push("service".to_owned());
        let n = bb.get_number("count");
        bb.set("count", n + 1.);
    });
    registry
}

fn load_str(src: &str, name: &str) -> Result<Box<dyn BehaviorNode<Log>>, LoadError> {
    let source = TreeSource::parse(src)?;
    load(&source, &registry(), name)
}

#[test]
fn test_subtree() {
    let tree = r#"
tree main = Sequence {
    sub
    Say (word <- world)
}

tree sub = Selector {
    Say (word <- hello)
}
    "#;

    let mut root = Root::new(load_str(tree, "main").unwrap()).unwrap();
    let mut log = Log::new();
    root.start(&mut log);
    root.tick(&mut log);
    assert_eq!(log, vec!["hello", "world"]);
    assert_eq!(root.status(), Status::Succeeded);
}

#[test]
fn test_missing_tree() {
    assert!(matches!(
        load_str("tree main = Sequence", "other"),
        Err(LoadError::MissingTree(name)) if name == "other"
    ));
}

#[test]
fn test_missing_node() {
    assert!(matches!(
        load_str("tree main = Sequence { Dance }", "main"),
        Err(LoadError::MissingNode(name)) if name == "Dance"
    ));
}

#[test]
fn test_infinite_recursion() {
    let tree = r#"
tree main = Sequence {
    sub
}

tree sub = Selector {
    main
}
"#;
    assert!(matches!(
        load_str(tree, "main"),
        Err(LoadError::InfiniteRecursion { node }) if node == "main"
    ));
}

#[test]
fn test_repeated_subtree_is_not_recursion() {
    let tree = r#"
tree main = Sequence {
    greet
    greet
}

tree greet = Say (word <- hi)
"#;
    let mut root = Root::new(load_str(tree, "main").unwrap()).unwrap();
    let mut log = Log::new();
    root.start(&mut log);
    root.tick(&mut log);
    assert_eq!(log, vec!["hi", "hi"]);
}

#[test]
fn test_subtree_with_children() {
    let tree = r#"
tree main = sub { Say (word <- hi) }
tree sub = Sequence
"#;
    assert!(matches!(
        load_str(tree, "main"),
        Err(LoadError::SubtreeWithChildren { .. })
    ));
}

#[test]
fn test_unknown_argument() {
    assert!(matches!(
        load_str(r#"tree main = Wait (duration <- "1", durration <- "2")"#, "main"),
        Err(LoadError::UnknownArgument { arg, .. }) if arg == "durration"
    ));
}

#[test]
fn test_bad_argument() {
    assert!(matches!(
        load_str(r#"tree main = Wait (duration <- soon)"#, "main"),
        Err(LoadError::BadArgument { value, .. }) if value == "soon"
    ));
}

#[test]
fn test_decorator_children() {
    let too_many = r#"
tree main = Condition (key <- k, value <- "true") {
    Say (word <- a)
    Say (word <- b)
}
"#;
    assert!(matches!(
        load_str(too_many, "main"),
        Err(LoadError::AddChildError(AddChildError::TooManyNodes, _))
    ));

    assert!(matches!(
        load_str(r#"tree main = Condition (key <- k, value <- "true")"#, "main"),
        Err(LoadError::Build(BuildError::MissingChild { .. }))
    ));

    assert!(matches!(
        load_str("tree main = Say (word <- a) { Say (word <- b) }", "main"),
        Err(LoadError::AddChildError(AddChildError::TooManyNodes, _))
    ));
}

#[test]
fn test_missing_service() {
    let tree = r#"tree main = Service (interval <- "0.2", callback <- radar) { Say (word <- a) }"#;
    assert!(matches!(
        load_str(tree, "main"),
        Err(LoadError::MissingService { service, .. }) if service == "radar"
    ));
}

#[test]
fn test_service_and_condition() {
    let tree = r#"
tree main = Service (interval <- "0.5", callback <- count) {
    Selector {
        Condition (key <- count, op <- ">=", value <- "3", restart <- immediate_restart) {
            Say (word <- done)
        }
        Wait (duration <- "10")
    }
}
"#;
    let mut root = Root::new(load_str(tree, "main").unwrap()).unwrap();
    let mut log = Log::new();
    root.start(&mut log);
    root.tick(&mut log);
    assert_eq!(log, vec!["service"]);

    root.update(&mut log, Duration::from_millis(600));
    assert_eq!(root.blackboard().get_number("count"), 2.);
    assert!(!log.contains(&"done".to_owned()));

    root.update(&mut log, Duration::from_millis(500));
    assert_eq!(root.blackboard().get_number("count"), 3.);
    assert_eq!(log.last().map(String::as_str), Some("done"));
}

#[test]
fn test_preemption_outside_selector_is_rejected() {
    let tree = r#"
tree main = Sequence {
    Condition (key <- k, value <- "true", restart <- lower_priority) {
        Say (word <- a)
    }
}
"#;
    let node = load_str(tree, "main").unwrap();
    assert!(matches!(
        Root::new(node),
        Err(BuildError::PreemptionOutsideSelector { .. })
    ));
}

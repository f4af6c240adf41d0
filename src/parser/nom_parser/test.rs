use super::*;

impl<'src> TreeDef<'src> {
    fn new(ty: &'src str) -> Self {
        Self {
            ty,
            args: vec![],
            children: vec![],
        }
    }

    fn new_with_children(ty: &'src str, children: Vec<TreeDef<'src>>) -> Self {
        Self {
            ty,
            args: vec![],
            children,
        }
    }

    fn new_with_args(ty: &'src str, args: Vec<ArgDef<'src>>) -> Self {
        Self {
            ty,
            args,
            children: vec![],
        }
    }
}

fn literal<'src>(name: &'src str, value: &str) -> ArgDef<'src> {
    ArgDef {
        name,
        value: ArgValue::Literal(value.to_owned()),
    }
}

fn bare<'src>(name: &'src str, value: &'src str) -> ArgDef<'src> {
    ArgDef {
        name,
        value: ArgValue::Bare(value),
    }
}

#[test]
fn test_trees() {
    assert_eq!(
        parse_tree(
            "tree main = Sequence {
        }"
        ),
        Ok((
            "",
            TreeRootDef {
                name: "main",
                root: TreeDef::new("Sequence")
            }
        ))
    );

    assert_eq!(
        parse_tree(
            "tree main = Selector {
                    Spin
                    Idle
        }"
        ),
        Ok((
            "",
            TreeRootDef {
                name: "main",
                root: TreeDef::new_with_children(
                    "Selector",
                    vec![TreeDef::new("Spin"), TreeDef::new("Idle")]
                )
            }
        ))
    );
}

#[test]
fn test_args() {
    assert_eq!(
        parse_tree_node(r#"Condition (key <- targetOffCentre, op <- "<=", value <- "0.1")"#),
        Ok((
            "",
            TreeDef::new_with_args(
                "Condition",
                vec![
                    bare("key", "targetOffCentre"),
                    literal("op", "<="),
                    literal("value", "0.1"),
                ]
            )
        ))
    );

    assert_eq!(
        parse_tree_node("Turn(amount <- -1)"),
        Ok(("", TreeDef::new_with_args("Turn", vec![bare("amount", "-1")])))
    );
}

#[test]
fn test_multiline_args() {
    assert_eq!(
        parse_tree_node(
            r#"Service (
                interval <- "0.2",
                callback <- perception
            ) {
                Idle
            }"#
        ),
        Ok((
            "",
            TreeDef {
                ty: "Service",
                args: vec![literal("interval", "0.2"), bare("callback", "perception")],
                children: vec![TreeDef::new("Idle")],
            }
        ))
    );
}

#[test]
fn test_siblings_on_one_line() {
    assert_eq!(
        parse_tree_node(r#"Sequence { Turn (amount <- "0")  Wait (duration <- "2")  Fire }"#),
        Ok((
            "",
            TreeDef::new_with_children(
                "Sequence",
                vec![
                    TreeDef::new_with_args("Turn", vec![literal("amount", "0")]),
                    TreeDef::new_with_args("Wait", vec![literal("duration", "2")]),
                    TreeDef::new("Fire"),
                ]
            )
        ))
    );
}

#[test]
fn test_str_literal() {
    assert_eq!(
        str_literal(r#""hello\nworld""#),
        Ok(("", ArgValue::Literal("hello\nworld".to_owned())))
    );
}

#[test]
fn test_comments() {
    let src = r#"
# A comment before the tree
tree main = Sequence { # trailing comment
    # A comment between children
    Spin
    Fire # after a child
}
# A comment at the end"#;
    assert_eq!(
        TreeSource::parse(src).unwrap(),
        TreeSource {
            tree_defs: vec![TreeRootDef {
                name: "main",
                root: TreeDef::new_with_children(
                    "Sequence",
                    vec![TreeDef::new("Spin"), TreeDef::new("Fire")]
                )
            }]
        }
    );
}

#[test]
fn test_multiple_trees() {
    let src = "
tree main = Selector {
    sub
}

tree sub = Idle
";
    let source = TreeSource::parse(src).unwrap();
    assert_eq!(source.tree_defs.len(), 2);
    assert_eq!(source.tree("sub").unwrap().root(), &TreeDef::new("Idle"));
    assert!(source.tree("missing").is_none());
}

#[test]
fn test_parse_error_line() {
    let src = "tree main = Sequence {
    Spin
}
tree broken Sequence {
}
";
    match TreeSource::parse(src) {
        Err(LoadError::Parse { line, snippet }) => {
            assert_eq!(line, 4);
            assert!(snippet.starts_with("tree broken"));
        }
        res => panic!("unexpected {:?}", res),
    }
}

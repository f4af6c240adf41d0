use nom::{
    branch::alt,
    bytes::complete::{is_not, tag},
    character::complete::{alpha1, alphanumeric1, char, multispace0, none_of, one_of, space0},
    combinator::{opt, recognize, value},
    multi::{many0, many1},
    sequence::{delimited, pair, preceded, terminated, tuple},
    IResult,
};

use crate::error::LoadError;

/// A node in a tree source: its type, its arguments and its children.
#[derive(Debug, PartialEq, Eq)]
pub struct TreeDef<'src> {
    pub(crate) ty: &'src str,
    pub(crate) args: Vec<ArgDef<'src>>,
    pub(crate) children: Vec<TreeDef<'src>>,
}

impl<'src> TreeDef<'src> {
    pub fn ty(&self) -> &'src str {
        self.ty
    }

    pub fn args(&self) -> &[ArgDef<'src>] {
        &self.args
    }

    pub fn children(&self) -> &[TreeDef<'src>] {
        &self.children
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct ArgDef<'src> {
    pub(crate) name: &'src str,
    pub(crate) value: ArgValue<'src>,
}

#[derive(Debug, PartialEq, Eq)]
pub enum ArgValue<'src> {
    /// Quoted literal. Escapes are decoded, so it is an owned string.
    Literal(String),
    Bare(&'src str),
}

impl<'src> ArgValue<'src> {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Literal(s) => s,
            Self::Bare(s) => s,
        }
    }
}

#[derive(Debug, PartialEq)]
pub struct TreeRootDef<'src> {
    pub(crate) name: &'src str,
    pub(crate) root: TreeDef<'src>,
}

impl<'src> TreeRootDef<'src> {
    pub fn name(&self) -> &'src str {
        self.name
    }

    pub fn root(&self) -> &TreeDef<'src> {
        &self.root
    }
}

#[derive(Debug, PartialEq, Default)]
pub struct TreeSource<'src> {
    pub tree_defs: Vec<TreeRootDef<'src>>,
}

impl<'src> TreeSource<'src> {
    /// Parses a whole source, failing with the line where parsing stopped if any
    /// input is left over.
    pub fn parse(src: &'src str) -> Result<Self, LoadError> {
        let rest = match parse_file(src) {
            Ok(("", source)) => return Ok(source),
            Ok((rest, _)) => rest,
            Err(nom::Err::Error(e) | nom::Err::Failure(e)) => e.input,
            Err(nom::Err::Incomplete(_)) => "",
        };
        let consumed = &src[..src.len() - rest.len()];
        Err(LoadError::Parse {
            line: consumed.matches('\n').count() + 1,
            snippet: rest.lines().next().unwrap_or("").chars().take(40).collect(),
        })
    }

    pub fn tree(&self, name: &str) -> Option<&TreeRootDef<'src>> {
        self.tree_defs.iter().find(|tree| tree.name == name)
    }
}

fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        alt((alpha1, tag("_"))),
        many0(alt((alphanumeric1, tag("_")))),
    ))(input)
}

fn newlines(i: &str) -> IResult<&str, ()> {
    value((), delimited(space0, many1(one_of("\r\n")), space0))(i)
}

fn open_paren(i: &str) -> IResult<&str, ()> {
    value((), delimited(space0, char('('), space0))(i)
}

fn close_paren(i: &str) -> IResult<&str, ()> {
    value((), delimited(multispace0, char(')'), space0))(i)
}

fn open_brace(i: &str) -> IResult<&str, ()> {
    value((), delimited(space0, char('{'), space0))(i)
}

fn close_brace(i: &str) -> IResult<&str, ()> {
    value((), delimited(space0, char('}'), space0))(i)
}

fn line_comment<T>(i: &str) -> IResult<&str, Option<T>> {
    let (i, _) = tuple((space0, char('#'), opt(is_not("\n\r"))))(i)?;

    Ok((i, None))
}

fn some<I, R>(f: impl Fn(I) -> IResult<I, R>) -> impl Fn(I) -> IResult<I, Option<R>> {
    move |i| {
        let (i, res) = f(i)?;
        Ok((i, Some(res)))
    }
}

fn parse_tree(i: &str) -> IResult<&str, TreeRootDef> {
    let (i, _) = delimited(multispace0, tag("tree"), space0)(i)?;

    let (i, name) = delimited(space0, identifier, space0)(i)?;

    let (i, _) = delimited(space0, char('='), space0)(i)?;

    let (i, root) = parse_tree_node(i)?;

    Ok((i, TreeRootDef { name, root }))
}

fn tree_children(i: &str) -> IResult<&str, Vec<TreeDef>> {
    let (i, _) = many0(newlines)(i)?;

    let (i, v) = many0(delimited(
        space0,
        alt((line_comment, some(parse_tree_node))),
        many0(newlines),
    ))(i)?;

    Ok((i, v.into_iter().flatten().collect()))
}

fn parse_tree_node(i: &str) -> IResult<&str, TreeDef> {
    let (i, ty) = delimited(space0, identifier, space0)(i)?;

    let (i, args) = opt(delimited(open_paren, arg_defs, close_paren))(i)?;

    let (i, children) = opt(delimited(open_brace, tree_children, close_brace))(i)?;

    let (i, _) = opt(line_comment::<()>)(i)?;

    Ok((
        i,
        TreeDef {
            ty,
            args: args.unwrap_or_default(),
            children: children.unwrap_or_default(),
        },
    ))
}

fn arg_defs(i: &str) -> IResult<&str, Vec<ArgDef>> {
    many0(delimited(
        multispace0,
        arg_def,
        many0(pair(multispace0, char(','))),
    ))(i)
}

fn arg_def(i: &str) -> IResult<&str, ArgDef> {
    let (i, name) = delimited(space0, identifier, space0)(i)?;

    let (i, _) = delimited(space0, tag("<-"), space0)(i)?;

    let (i, value) = delimited(space0, alt((str_literal, bare_value)), space0)(i)?;

    Ok((i, ArgDef { name, value }))
}

/// An unquoted value such as a callback name, `true` or `-0.5`.
fn bare_value(i: &str) -> IResult<&str, ArgValue> {
    let (i, s) = is_not(" \t\r\n,(){}\"#")(i)?;
    Ok((i, ArgValue::Bare(s)))
}

fn str_literal(input: &str) -> IResult<&str, ArgValue> {
    let (r, val) = delimited(
        preceded(multispace0, char('\"')),
        many0(none_of("\"")),
        terminated(char('"'), multispace0),
    )(input)?;
    Ok((
        r,
        ArgValue::Literal(
            val.iter()
                .collect::<String>()
                .replace("\\\\", "\\")
                .replace("\\n", "\n"),
        ),
    ))
}

/// Parses as many tree definitions as possible. Use [`TreeSource::parse`] to
/// also reject trailing garbage.
pub fn parse_file(i: &str) -> IResult<&str, TreeSource> {
    let (i, trees) = many0(alt((
        delimited(multispace0, line_comment, multispace0),
        some(parse_tree),
    )))(i)?;

    // Eat up trailing newlines to indicate that the input was thoroughly consumed
    let (i, _) = multispace0(i)?;

    Ok((
        i,
        TreeSource {
            tree_defs: trees.into_iter().flatten().collect(),
        },
    ))
}

#[cfg(test)]
mod test;

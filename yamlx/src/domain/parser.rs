//! Expression grammar
//!
//! ```text
//! expression := term (("+" | "-") term)*
//! term       := signed (("**" | "*" | "//" | "/" | "%") signed)*
//! signed     := ("+" | "-") signed | factor
//! factor     := variable | number
//! variable   := "${" ident ("." ident)* "}"
//! ident      := [A-Za-z0-9_-]+
//! number     := \d+(\.\d*)?([eE][+-]?\d+)?
//! ```
//!
//! Binary levels associate to the left, signs to the right. There are no
//! parentheses. Whitespace may surround any token.
//!
//! Tree depth is bounded: at most [`MAX_SIGNS`] signs in front of one
//! operand and [`MAX_CHAIN`] operators per precedence level. Longer input
//! is a syntax error, so evaluating or dropping a parsed tree never runs
//! out of stack.

use nom::branch::alt;
use nom::bytes::complete::{tag, take_while1};
use nom::character::complete::{char, digit0, digit1, multispace0, one_of};
use nom::combinator::{all_consuming, cut, map, map_opt, map_res, opt, recognize};
use nom::error::{Error, ErrorKind};
use nom::multi::{many0, separated_list1};
use nom::sequence::{delimited, preceded, terminated};
use nom::{IResult, Parser};
use tracing::{instrument, trace};

use crate::domain::ast::{BinaryOp, Expr, UnaryOp, VarPath};
use crate::domain::error::{DomainError, DomainResult};

/// Sign symbols accepted by the grammar.
pub const UNARY_SYMBOLS: &[&str] = &["+", "-"];

/// Multiplicative symbols, longest first so `**` wins over `*`.
pub const MULTIPLICATIVE_SYMBOLS: &[&str] = &["**", "*", "//", "/", "%"];

/// Additive symbols.
pub const ADDITIVE_SYMBOLS: &[&str] = &["+", "-"];

/// Longest run of signs in front of one operand.
pub const MAX_SIGNS: usize = 64;

/// Most binary operators in one chain at one precedence level.
pub const MAX_CHAIN: usize = 1024;

/// Parse one expression. The whole input must be consumed.
#[instrument(level = "trace")]
pub fn parse(text: &str) -> DomainResult<Expr> {
    match all_consuming(ws(expression)).parse(text) {
        Ok((_, expr)) => {
            trace!("parsed: {}", expr);
            Ok(expr)
        }
        Err(nom::Err::Error(e) | nom::Err::Failure(e)) => {
            Err(syntax_error(text, e.input, e.code))
        }
        Err(nom::Err::Incomplete(_)) => Err(syntax_error(text, "", ErrorKind::Eof)),
    }
}

fn syntax_error(text: &str, rest: &str, kind: ErrorKind) -> DomainError {
    let offset = text.len() - rest.len();
    let message = match rest.chars().next() {
        _ if kind == ErrorKind::TooLarge => format!(
            "expression nested too deeply (limits: {MAX_SIGNS} signs per operand, \
             {MAX_CHAIN} operators per level)"
        ),
        None => "unexpected end of expression".to_string(),
        Some(c) => format!("unexpected `{c}`"),
    };
    DomainError::Syntax {
        input: text.to_string(),
        offset,
        message,
    }
}

/// Consumes leading and trailing whitespace around `inner`.
fn ws<'a, O, F>(inner: F) -> impl Parser<&'a str, Output = O, Error = Error<&'a str>>
where
    F: Parser<&'a str, Output = O, Error = Error<&'a str>>,
{
    delimited(multispace0, inner, multispace0)
}

/// Matches the first of `symbols` that prefixes the input.
fn symbol<'a>(symbols: &'static [&'static str]) -> impl Fn(&'a str) -> IResult<&'a str, &'a str> {
    move |input: &'a str| {
        symbols
            .iter()
            .find(|s| input.starts_with(**s))
            .map(|s| (&input[s.len()..], &input[..s.len()]))
            .ok_or_else(|| nom::Err::Error(Error::new(input, ErrorKind::Tag)))
    }
}

fn too_large(input: &str) -> nom::Err<Error<&str>> {
    nom::Err::Failure(Error::new(input, ErrorKind::TooLarge))
}

fn expression(input: &str) -> IResult<&str, Expr> {
    let (rest, first) = term(input)?;
    let (rest, chain) = many0((ws(additive_op), term)).parse(rest)?;
    if chain.len() > MAX_CHAIN {
        return Err(too_large(input));
    }
    Ok((rest, fold_left(first, chain)))
}

fn term(input: &str) -> IResult<&str, Expr> {
    let (rest, first) = signed(input)?;
    let (rest, chain) = many0((ws(multiplicative_op), signed)).parse(rest)?;
    if chain.len() > MAX_CHAIN {
        return Err(too_large(input));
    }
    Ok((rest, fold_left(first, chain)))
}

fn fold_left(first: Expr, rest: Vec<(BinaryOp, Expr)>) -> Expr {
    rest.into_iter()
        .fold(first, |lhs, (op, rhs)| Expr::binary(op, lhs, rhs))
}

/// Signs are collected in a loop and folded from the right.
fn signed(input: &str) -> IResult<&str, Expr> {
    let (rest, signs) = many0(ws(unary_op)).parse(input)?;
    if signs.len() > MAX_SIGNS {
        return Err(too_large(input));
    }
    let (rest, operand) = ws(factor).parse(rest)?;
    let expr = signs
        .into_iter()
        .rev()
        .fold(operand, |operand, op| Expr::unary(op, operand));
    Ok((rest, expr))
}

fn factor(input: &str) -> IResult<&str, Expr> {
    alt((map(variable, Expr::Variable), map(number, Expr::Number))).parse(input)
}

fn unary_op(input: &str) -> IResult<&str, UnaryOp> {
    map_opt(symbol(UNARY_SYMBOLS), UnaryOp::from_symbol).parse(input)
}

fn multiplicative_op(input: &str) -> IResult<&str, BinaryOp> {
    map_opt(symbol(MULTIPLICATIVE_SYMBOLS), BinaryOp::from_symbol).parse(input)
}

fn additive_op(input: &str) -> IResult<&str, BinaryOp> {
    map_opt(symbol(ADDITIVE_SYMBOLS), BinaryOp::from_symbol).parse(input)
}

/// `${a.b.c}`; once `${` is seen the rest must follow.
fn variable(input: &str) -> IResult<&str, VarPath> {
    map(
        preceded(
            tag("${"),
            cut(terminated(separated_list1(char('.'), identifier), char('}'))),
        ),
        VarPath::new,
    )
    .parse(input)
}

fn identifier(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_ascii_alphanumeric() || c == '-' || c == '_').parse(input)
}

fn number(input: &str) -> IResult<&str, f64> {
    map_res(
        recognize((
            digit1,
            opt((char('.'), digit0)),
            opt((one_of("eE"), opt(one_of("+-")), digit1)),
        )),
        str::parse::<f64>,
    )
    .parse(input)
}

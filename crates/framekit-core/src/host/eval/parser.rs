//! Fused-expression parser implementation using pest.

use pest::iterators::Pair;
use pest::Parser as PestParser;
use pest_derive::Parser;

use super::error::{ParseError, ParseErrorKind};
use crate::host::ArithOp;

#[derive(Parser)]
#[grammar = "host/eval/grammar.pest"]
struct ExprParser;

/// Parsed arithmetic expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Numeric literal.
    Number(f64),
    /// Placeholder identifier, resolved through the binding environment.
    Ident(String),
    /// Binary arithmetic node.
    Binary {
        /// Operator.
        op: ArithOp,
        /// Left operand.
        lhs: Box<Expr>,
        /// Right operand.
        rhs: Box<Expr>,
    },
}

/// Parses a fused arithmetic expression into an [`Expr`] tree.
///
/// # Errors
///
/// Returns a [`ParseError`] if the input does not match the grammar.
pub fn parse(input: &str) -> Result<Expr, ParseError> {
    let mut pairs = ExprParser::parse(Rule::expression, input).map_err(|e| {
        let position = match e.location {
            pest::error::InputLocation::Pos(p) => p,
            pest::error::InputLocation::Span((s, _)) => s,
        };
        ParseError::new(
            ParseErrorKind::SyntaxError,
            position,
            input.chars().take(50).collect::<String>(),
            e.to_string(),
        )
    })?;

    let expression = pairs
        .next()
        .ok_or_else(|| ParseError::syntax(0, input, "Empty expression"))?;

    let add = expression
        .into_inner()
        .find(|p| p.as_rule() == Rule::add_expr)
        .ok_or_else(|| ParseError::syntax(0, input, "Expected expression body"))?;

    parse_add(add)
}

fn parse_add(pair: Pair<'_, Rule>) -> Result<Expr, ParseError> {
    let mut inner = pair.into_inner();
    let first = inner
        .next()
        .ok_or_else(|| ParseError::syntax(0, "", "Expected operand"))?;
    let mut expr = parse_mul(first)?;

    while let Some(op_pair) = inner.next() {
        let op = match op_pair.as_str() {
            "+" => ArithOp::Add,
            "-" => ArithOp::Sub,
            other => {
                return Err(ParseError::syntax(
                    op_pair.as_span().start(),
                    other,
                    "Expected '+' or '-'",
                ))
            }
        };
        let rhs_pair = inner
            .next()
            .ok_or_else(|| ParseError::syntax(0, "", "Dangling operator"))?;
        expr = Expr::Binary {
            op,
            lhs: Box::new(expr),
            rhs: Box::new(parse_mul(rhs_pair)?),
        };
    }
    Ok(expr)
}

fn parse_mul(pair: Pair<'_, Rule>) -> Result<Expr, ParseError> {
    let mut inner = pair.into_inner();
    let first = inner
        .next()
        .ok_or_else(|| ParseError::syntax(0, "", "Expected operand"))?;
    let mut expr = parse_pow(first)?;

    while let Some(op_pair) = inner.next() {
        let op = match op_pair.as_str() {
            "*" => ArithOp::Mul,
            "/" => ArithOp::Div,
            other => {
                return Err(ParseError::syntax(
                    op_pair.as_span().start(),
                    other,
                    "Expected '*' or '/'",
                ))
            }
        };
        let rhs_pair = inner
            .next()
            .ok_or_else(|| ParseError::syntax(0, "", "Dangling operator"))?;
        expr = Expr::Binary {
            op,
            lhs: Box::new(expr),
            rhs: Box::new(parse_pow(rhs_pair)?),
        };
    }
    Ok(expr)
}

/// `**` is right-associative: `a ** b ** c` is `a ** (b ** c)`.
fn parse_pow(pair: Pair<'_, Rule>) -> Result<Expr, ParseError> {
    let mut operands = Vec::new();
    for p in pair.into_inner() {
        if p.as_rule() == Rule::pow_op {
            continue;
        }
        operands.push(parse_primary(p)?);
    }

    let mut expr = operands
        .pop()
        .ok_or_else(|| ParseError::syntax(0, "", "Expected operand"))?;
    while let Some(lhs) = operands.pop() {
        expr = Expr::Binary {
            op: ArithOp::Pow,
            lhs: Box::new(lhs),
            rhs: Box::new(expr),
        };
    }
    Ok(expr)
}

fn parse_primary(pair: Pair<'_, Rule>) -> Result<Expr, ParseError> {
    match pair.as_rule() {
        Rule::number => {
            let position = pair.as_span().start();
            let text = pair.as_str();
            text.parse::<f64>()
                .map(Expr::Number)
                .map_err(|_| ParseError::invalid_number(position, text))
        }
        Rule::ident => Ok(Expr::Ident(pair.as_str().to_string())),
        Rule::add_expr => parse_add(pair),
        other => Err(ParseError::syntax(
            pair.as_span().start(),
            pair.as_str(),
            format!("Unexpected rule {other:?}"),
        )),
    }
}

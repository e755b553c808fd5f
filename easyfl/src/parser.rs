//! Source text to call trees.
//!
//! Two grammars share the call syntax: a bare expression, and a source of `def` lines
//!
//! ```text
//! // comment
//! def name(arity) = body      arity is 0..=15 or "..."
//!     continued body
//! ```
//!
//! All whitespace inside an expression is insignificant and stripped before parsing.
use std::fmt;

use chumsky::prelude::*;

use crate::{bytecode::MAX_CALL_ARGS, error::ParseError, library::Arity};

/// A call tree node: a symbol and its (possibly empty) argument list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParsedExpr {
    pub symbol: String,
    pub args: Vec<ParsedExpr>,
}

impl ParsedExpr {
    pub fn new(symbol: impl Into<String>, args: Vec<ParsedExpr>) -> Self {
        Self {
            symbol: symbol.into(),
            args,
        }
    }

    /// Literals, argument references and zero argument calls.
    pub fn is_terminal(&self) -> bool {
        self.args.is_empty()
    }
}

impl fmt::Display for ParsedExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol)?;
        if self.args.is_empty() {
            return Ok(());
        }
        write!(f, "(")?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", arg)?;
        }
        write!(f, ")")
    }
}

/// One `def` of a multi-definition source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionSource {
    pub symbol: String,
    pub arity: Arity,
    /// Body with whitespace and comments removed.
    pub body: String,
    /// Line of the `def` header, 1-based.
    pub line: usize,
}

pub fn strip_whitespace(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

fn strip_comment(line: &str) -> &str {
    match line.find("//") {
        Some(pos) => &line[..pos],
        None => line,
    }
}

fn check_parentheses(text: &str, line: usize) -> Result<(), ParseError> {
    let mut depth = 0usize;
    for c in text.chars() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth = depth
                    .checked_sub(1)
                    .ok_or(ParseError::UnbalancedParentheses { line })?
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(ParseError::UnbalancedParentheses { line });
    }
    Ok(())
}

fn whitespace<'src>() -> impl Parser<'src, &'src str, (), extra::Err<Rich<'src, char>>> + Clone {
    any()
        .filter(|c: &char| c.is_whitespace())
        .repeated()
        .at_least(1)
        .ignored()
        .labelled("whitespace")
}

pub fn expression_parser<'src>()
-> impl Parser<'src, &'src str, ParsedExpr, extra::Err<Rich<'src, char>>> + Clone {
    recursive(|expr| {
        let symbol = none_of("(),")
            .repeated()
            .at_least(1)
            .to_slice()
            .map(|s: &str| s.to_string())
            .labelled("symbol");

        let args = expr
            .separated_by(just(','))
            .collect::<Vec<_>>()
            .delimited_by(just('('), just(')'))
            .labelled("argument list");

        symbol
            .then(args.or_not())
            .map(|(symbol, args)| ParsedExpr {
                symbol,
                args: args.unwrap_or_default(),
            })
    })
}

pub fn header_parser<'src>()
-> impl Parser<'src, &'src str, (String, Arity), extra::Err<Rich<'src, char>>> + Clone {
    let name = none_of("(),=")
        .filter(|c: &char| !c.is_whitespace())
        .repeated()
        .at_least(1)
        .to_slice()
        .map(|s: &str| s.to_string())
        .labelled("function name");

    let arity = choice((
        just("...").to(Arity::Variadic),
        text::int(10).try_map(|digits: &str, span| match digits.parse::<u8>() {
            Ok(n) if n as usize <= MAX_CALL_ARGS => Ok(Arity::Fixed(n)),
            _ => Err(Rich::custom(
                span,
                format!("arity must be 0-{} or '...', got {}", MAX_CALL_ARGS, digits),
            )),
        }),
    ))
    .padded()
    .delimited_by(just('('), just(')'))
    .labelled("arity");

    just("def")
        .ignore_then(whitespace())
        .ignore_then(name)
        .then(arity.padded())
        .then_ignore(end())
}

/// Parse a single call expression.
pub fn parse_expression(source: &str) -> Result<ParsedExpr, ParseError> {
    parse_expression_at(source, 1)
}

/// Parse a call expression found at `line` of a larger source.
pub fn parse_expression_at(source: &str, line: usize) -> Result<ParsedExpr, ParseError> {
    let stripped = strip_whitespace(source);
    if stripped.is_empty() {
        return Err(ParseError::EmptyExpression { line });
    }
    check_parentheses(&stripped, line)?;

    expression_parser()
        .then_ignore(end())
        .parse(stripped.as_str())
        .into_result()
        .map_err(|errs| ParseError::Syntax {
            line,
            message: join_errors(&errs),
        })
}

fn join_errors(errs: &[Rich<'_, char>]) -> String {
    errs.iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

fn is_definition_start(text: &str) -> bool {
    text.strip_prefix("def")
        .is_some_and(|rest| rest.starts_with(char::is_whitespace))
}

fn finish(def: FunctionSource) -> Result<FunctionSource, ParseError> {
    if def.body.is_empty() {
        return Err(ParseError::EmptyExpression { line: def.line });
    }
    check_parentheses(&def.body, def.line)?;
    Ok(def)
}

/// Split a multi-definition source into its `def`s, in source order.
///
/// Bodies are only checked for balanced parentheses here; they are parsed when compiled
/// so that errors can name the definition.
pub fn parse_definitions(source: &str) -> Result<Vec<FunctionSource>, ParseError> {
    let mut definitions = Vec::new();
    let mut current: Option<FunctionSource> = None;

    for (idx, raw) in source.lines().enumerate() {
        let line = idx + 1;
        let text = strip_comment(raw).trim();
        if text.is_empty() {
            continue;
        }

        if is_definition_start(text) {
            if let Some(def) = current.take() {
                definitions.push(finish(def)?);
            }
            let (head, body) = text
                .split_once('=')
                .ok_or(ParseError::MissingEquals { line })?;
            let (symbol, arity) = header_parser()
                .parse(head.trim())
                .into_result()
                .map_err(|errs| ParseError::InvalidHeader {
                    line,
                    message: join_errors(&errs),
                })?;
            current = Some(FunctionSource {
                symbol,
                arity,
                body: strip_whitespace(body),
                line,
            });
        } else if let Some(def) = current.as_mut() {
            def.body.push_str(&strip_whitespace(text));
        } else {
            return Err(ParseError::ExpectedDefinition { line });
        }
    }

    if let Some(def) = current.take() {
        definitions.push(finish(def)?);
    }
    Ok(definitions)
}

use easyfl::parser::{ParsedExpr, parse_definitions, parse_expression};
use easyfl::{Arity, ParseError};

fn leaf(symbol: &str) -> ParsedExpr {
    ParsedExpr::new(symbol, vec![])
}

#[test]
fn whitespace_is_insignificant() {
    let parsed = parse_expression("sum8( 125 ,\n\t 6 )").unwrap();
    assert_eq!(
        parsed,
        ParsedExpr::new("sum8", vec![leaf("125"), leaf("6")])
    );
}

#[test]
fn empty_parentheses_are_a_zero_argument_call() {
    assert_eq!(parse_expression("true()").unwrap(), leaf("true"));
    assert_eq!(parse_expression("true").unwrap(), leaf("true"));
}

#[test]
fn only_top_level_commas_split_arguments() {
    let parsed = parse_expression("concat(slice($0,0,1),concat($1,$2),nil)").unwrap();
    assert_eq!(parsed.args.len(), 3);
    assert_eq!(parsed.args[0].args.len(), 3);
    assert_eq!(parsed.args[1].args.len(), 2);
    assert!(parsed.args[2].is_terminal());
    assert_eq!(parsed.to_string(), "concat(slice($0,0,1),concat($1,$2),nil)");
}

#[test]
fn malformed_expressions() {
    assert_eq!(
        parse_expression("sum8(1,2"),
        Err(ParseError::UnbalancedParentheses { line: 1 })
    );
    assert_eq!(
        parse_expression("sum8(1,2))"),
        Err(ParseError::UnbalancedParentheses { line: 1 })
    );
    assert_eq!(
        parse_expression("  \n "),
        Err(ParseError::EmptyExpression { line: 1 })
    );
    assert!(parse_expression("sum8(1,)").unwrap_err().is_syntax());
    assert!(parse_expression("sum8(1)(2)").unwrap_err().is_syntax());
    assert!(parse_expression("(1)").unwrap_err().is_syntax());
}

#[test]
fn definitions_with_comments_and_continuations() {
    let source = "\
// leading comment

def pair(2) = concat($0, // first
    $1)                  // second
def yes(0) = 0xff
def any(...) = or($0)
";
    let defs = parse_definitions(source).unwrap();
    assert_eq!(defs.len(), 3);

    assert_eq!(defs[0].symbol, "pair");
    assert_eq!(defs[0].arity, Arity::Fixed(2));
    assert_eq!(defs[0].body, "concat($0,$1)");
    assert_eq!(defs[0].line, 3);

    assert_eq!(defs[1].symbol, "yes");
    assert_eq!(defs[1].line, 5);

    assert_eq!(defs[2].arity, Arity::Variadic);
}

#[test]
fn definition_errors_carry_their_line() {
    assert_eq!(
        parse_definitions("def a(0) = 1\ndef b(1) $0"),
        Err(ParseError::MissingEquals { line: 2 })
    );
    assert_eq!(
        parse_definitions("\n\nx = 1"),
        Err(ParseError::ExpectedDefinition { line: 3 })
    );
    assert_eq!(
        parse_definitions("def a(0) =\n// nothing\n"),
        Err(ParseError::EmptyExpression { line: 1 })
    );
    assert_eq!(
        parse_definitions("def a(1) = not($0\n\ndef b(0) = 1"),
        Err(ParseError::UnbalancedParentheses { line: 1 })
    );

    let err = parse_definitions("def a(0) = 1\ndef b(16) = 1").unwrap_err();
    assert!(err.is_invalid_header());
    assert_eq!(err.line(), 2);

    let err = parse_definitions("def b = 1").unwrap_err();
    assert!(err.is_invalid_header());
}

use easyfl::bytecode::{CodeSpace, FIRST_EXTENDED};
use easyfl::compiler::{compile_expression, compile_parsed};
use easyfl::parser::parse_expression;
use easyfl::{Arity, CompileError, Error, Library};

fn lib() -> Library {
    Library::base().unwrap()
}

fn code_of(lib: &Library, symbol: &str) -> u16 {
    lib.function_by_name(symbol).unwrap().1.code
}

fn compile_err(lib: &Library, source: &str) -> CompileError {
    match compile_expression(lib, source) {
        Err(Error::Compile(err)) => err,
        other => panic!("expected a compile error for `{source}`, got {other:?}"),
    }
}

#[test]
fn literals_compile_to_inline_data() {
    let lib = lib();
    assert_eq!(compile_expression(&lib, "125").unwrap().bytecode, vec![0x81, 125]);
    assert_eq!(compile_expression(&lib, "nil").unwrap().bytecode, vec![0x80]);
    assert_eq!(compile_expression(&lib, "false").unwrap().bytecode, vec![0x80]);
    assert_eq!(
        compile_expression(&lib, "0x0102ff").unwrap().bytecode,
        vec![0x83, 0x01, 0x02, 0xff]
    );

    let max = format!("0x{}", "ab".repeat(127));
    let compiled = compile_expression(&lib, &max).unwrap();
    assert_eq!(compiled.bytecode.len(), 128);
    assert_eq!(compiled.bytecode[0], 0xff);
}

#[test]
fn short_functions_take_one_byte() {
    let lib = lib();
    let sum8 = code_of(&lib, "sum8");
    assert!(sum8 < 64);
    let compiled = compile_expression(&lib, "sum8(125, 6)").unwrap();
    assert_eq!(compiled.bytecode, vec![sum8 as u8, 0x81, 125, 0x81, 6]);
    assert_eq!(compiled.num_args, 0);
}

#[test]
fn argument_references_use_the_lowest_short_codes() {
    let lib = lib();
    let compiled = compile_expression(&lib, "concat($0, $1)").unwrap();
    assert_eq!(code_of(&lib, "concat"), 64);
    // 01 0010 0001000000: long call, two arguments, code 64
    assert_eq!(compiled.bytecode, vec![0x48, 0x40, 0x00, 0x01]);
    assert_eq!(compiled.num_args, 2);

    let compiled = compile_expression(&lib, "not($15)").unwrap();
    assert_eq!(compiled.bytecode[1], 0x0f);
    assert_eq!(compiled.num_args, 16);
}

#[test]
fn extended_functions_use_long_calls() {
    let lib = lib();
    assert_eq!(code_of(&lib, "true"), FIRST_EXTENDED);
    assert_eq!(compile_expression(&lib, "true").unwrap().bytecode, vec![0x41, 0x00]);

    let (_, min) = lib.function_by_name("min").unwrap();
    assert_eq!(min.code_space(), CodeSpace::Extended);
    let bytecode = compile_expression(&lib, "min(1, 2)").unwrap().bytecode;
    let header = u16::from_be_bytes([bytecode[0], bytecode[1]]);
    assert_eq!(header >> 14, 0b01);
    assert_eq!((header >> 10) & 0x0f, 2);
    assert_eq!(header & 0x3ff, min.code);
}

#[test]
fn symbol_and_arity_errors() {
    let lib = lib();
    assert_eq!(
        compile_err(&lib, "noSuchFunction(1)"),
        CompileError::UnknownSymbol {
            symbol: "noSuchFunction".to_string()
        }
    );
    assert_eq!(
        compile_err(&lib, "sum8(1)"),
        CompileError::ArityMismatch {
            symbol: "sum8".to_string(),
            expected: Arity::Fixed(2),
            found: 1
        }
    );
    let sixteen = vec!["1"; 16].join(",");
    assert_eq!(
        compile_err(&lib, &format!("concat({sixteen})")),
        CompileError::TooManyArguments {
            symbol: "concat".to_string(),
            count: 16
        }
    );
}

#[test]
fn literal_errors() {
    let lib = lib();
    assert!(compile_err(&lib, "256").is_literal_out_of_range());
    assert!(compile_err(&lib, "0x123").is_invalid_hex());
    assert!(compile_err(&lib, "0xzz").is_invalid_hex());
    assert_eq!(
        compile_err(&lib, &format!("0x{}", "00".repeat(128))),
        CompileError::HexTooLong { len: 128 }
    );
    assert!(compile_err(&lib, "7(1)").is_literal_with_arguments());
    assert!(compile_err(&lib, "$0(1)").is_literal_with_arguments());
    assert!(compile_err(&lib, "$16").is_invalid_argument_reference());
}

#[test]
fn definition_bodies_check_argument_references() {
    let lib = lib();
    let expr = parse_expression("concat($0, $2)").unwrap();
    assert_eq!(
        compile_parsed(&lib, &expr, Some(2)),
        Err(CompileError::ArgumentOutOfRange { index: 2, arity: 2 })
    );
    assert!(compile_parsed(&lib, &expr, Some(3)).is_ok());
    assert!(compile_parsed(&lib, &expr, None).is_ok());
}

#[test]
fn parse_errors_pass_through() {
    let lib = lib();
    assert!(matches!(
        compile_expression(&lib, "sum8(1,"),
        Err(Error::Parse(_))
    ));
}

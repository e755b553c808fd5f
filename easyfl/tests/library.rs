use std::path::PathBuf;

use easyfl::bytecode::{CodeSpace, FIRST_EMBEDDED_LONG, FIRST_EMBEDDED_SHORT, FIRST_EXTENDED};
use easyfl::{
    Arity, CompileError, Error, FaultKind, Library, LibraryConfig, ParseError, RegistryError,
};

const NO_ARGS: &[&[u8]] = &[];
const TRUE: &[u8] = &[0xff];

fn registry_err<T: std::fmt::Debug>(result: Result<T, RegistryError>) -> RegistryError {
    result.unwrap_err()
}

#[test]
fn base_library_layout() {
    let lib = Library::base().unwrap();
    let summary = lib.summary();
    assert_eq!(summary.embedded_short, 30);
    assert_eq!(summary.embedded_long, 17);
    assert_eq!(summary.extended, 13);
    assert_eq!(summary.total(), lib.len());

    assert_eq!(lib.function_by_name("fail").unwrap().1.code, FIRST_EMBEDDED_SHORT);
    assert_eq!(lib.function_by_name("concat").unwrap().1.code, FIRST_EMBEDDED_LONG);
    assert_eq!(lib.function_by_name("true").unwrap().1.code, FIRST_EXTENDED);

    let (id, by_code) = lib.function_by_code(FIRST_EMBEDDED_LONG).unwrap();
    assert_eq!(by_code.symbol, "concat");
    assert_eq!(by_code.arity, Arity::Variadic);
    assert!(lib.descriptor(id).kind.is_embedded_long());
}

#[test]
fn library_is_shareable() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Library>();
}

#[test]
fn registration_rules() {
    let mut lib = Library::embedded().unwrap();
    assert_eq!(
        registry_err(lib.embed_short("not", 1, |_| Ok(vec![]))),
        RegistryError::DuplicateSymbol {
            symbol: "not".to_string()
        }
    );
    for reserved in ["nil", "false", "42", "0xab", "$3", "two words", "f(x)", ""] {
        assert!(
            registry_err(lib.embed_short(reserved, 0, |_| Ok(vec![]))).is_reserved_symbol(),
            "`{reserved}` should be reserved"
        );
    }
    assert_eq!(
        registry_err(lib.embed_long("wide", Arity::Fixed(16), |_| Ok(vec![]))),
        RegistryError::ArityTooLarge {
            symbol: "wide".to_string(),
            arity: 16
        }
    );
    assert!(
        lib.embed_long("anyOf", Arity::Variadic, |_| Ok(vec![]))
            .is_ok()
    );
}

#[test]
fn short_code_space_is_bounded() {
    let mut lib = Library::embedded().unwrap();
    let free = CodeSpace::EmbeddedShort.capacity() - lib.summary().embedded_short;
    for i in 0..free {
        let id = lib.embed_short(&format!("extra{i}"), 0, |_| Ok(vec![])).unwrap();
        assert!(lib.descriptor(id).code <= 63);
    }
    assert_eq!(
        registry_err(lib.embed_short("oneTooMany", 0, |_| Ok(vec![]))),
        RegistryError::CodeSpaceExhausted {
            space: CodeSpace::EmbeddedShort
        }
    );
}

#[test]
fn extend_derives_arity_from_the_body() {
    let mut lib = Library::base().unwrap();
    let pair = lib.extend("pair", "concat($1, $0)").unwrap();
    assert_eq!(lib.descriptor(pair).arity, Arity::Fixed(2));
    assert_eq!(lib.descriptor(pair).source.as_deref(), Some("concat($1,$0)"));
    assert_eq!(
        lib.eval_source("pair(1, 2)", NO_ARGS).unwrap(),
        vec![2, 1]
    );

    let constant = lib.extend("seven", "7").unwrap();
    assert_eq!(lib.descriptor(constant).arity, Arity::Fixed(0));
    assert!(lib.descriptor(constant).kind.is_extended());
}

#[test]
fn extend_with_declared_arity() {
    let mut lib = Library::base().unwrap();
    lib.extend_with_arity("second", Arity::Fixed(3), "$1").unwrap();
    assert_eq!(
        lib.eval_source("second(1, 2, 3)", NO_ARGS).unwrap(),
        vec![2]
    );

    let err = lib
        .extend_with_arity("bad", Arity::Fixed(1), "concat($0, $1)")
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Compile(CompileError::ArgumentOutOfRange { index: 1, arity: 1 })
    ));
    let err = lib
        .extend_with_arity("many", Arity::Variadic, "concat($0)")
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Compile(CompileError::VariadicDefinition { .. })
    ));
    // Failed registrations leave nothing behind.
    assert!(lib.function_by_name("bad").is_none());
    assert!(lib.function_by_name("many").is_none());
}

#[test]
fn extend_many_registers_in_order() {
    let mut lib = Library::base().unwrap();
    let ids = lib
        .extend_many(
            "\
// amounts are 8 byte big-endian integers
def amount(1) = mustSize($0, 8)
def enough(2) = greaterOrEqualThan(amount($0), amount($1))
",
        )
        .unwrap();
    assert_eq!(ids.len(), 2);
    assert!(lib.descriptor(ids[0]).code < lib.descriptor(ids[1]).code);

    let ten = 10u64.to_be_bytes();
    let five = 5u64.to_be_bytes();
    assert_eq!(lib.eval_source("enough($0, $1)", &[ten, five]).unwrap(), TRUE);
    assert!(lib.eval_source("enough($0, $1)", &[five, ten]).unwrap().is_empty());

    let err = lib.eval_source("enough($0, $1)", &[vec![1u8], vec![2]]).unwrap_err();
    let fault = err.as_fault().unwrap();
    assert_eq!(
        fault.kind,
        FaultKind::Failed {
            message: "wrong size".to_string()
        }
    );
}

#[test]
fn extend_many_names_the_failing_definition() {
    let mut lib = Library::base().unwrap();
    let err = lib
        .extend_many("def ok(1) = not($0)\n\ndef broken(1) = noSuchThing($0)\n")
        .unwrap_err();
    match err {
        Error::InDefinition {
            symbol,
            line,
            source,
        } => {
            assert_eq!(symbol, "broken");
            assert_eq!(line, 3);
            assert!(matches!(
                *source,
                Error::Compile(CompileError::UnknownSymbol { .. })
            ));
        }
        other => panic!("unexpected error {other:?}"),
    }
    // Definitions before the failing one stay registered.
    assert!(lib.function_by_name("ok").is_some());

    let err = lib.extend_many("def ok(1) = $0").unwrap_err();
    match err {
        Error::InDefinition { source, .. } => assert!(matches!(
            *source,
            Error::Registry(RegistryError::DuplicateSymbol { .. })
        )),
        other => panic!("unexpected error {other:?}"),
    }

    let err = lib.extend_many("def x(1) = not($0\n").unwrap_err();
    assert!(matches!(
        err,
        Error::Parse(ParseError::UnbalancedParentheses { line: 1 })
    ));
}

#[test]
fn base_definitions() {
    let lib = Library::base().unwrap();
    let cases: &[(&str, &[u8])] = &[
        ("true", TRUE),
        ("equiv(nil, false)", TRUE),
        ("equiv(1, nil)", b""),
        ("lessOrEqualThan(3, 3)", TRUE),
        ("greaterThan(4, 3)", TRUE),
        ("greaterThan(3, 3)", b""),
        ("greaterOrEqualThan(3, 3)", TRUE),
        ("min(9, 4)", &[4]),
        ("max(9, 4)", &[9]),
        ("first(0x0102)", &[1]),
        ("last(0x0102)", &[2]),
        ("mustSize(0x0102, 2)", &[1, 2]),
        ("isEmpty(nil)", TRUE),
        ("require(1, 0x00)", TRUE),
    ];
    for (source, expected) in cases {
        assert_eq!(lib.eval_source(source, NO_ARGS).unwrap(), *expected, "{source}");
    }

    let err = lib.eval_source("require(nil, 0x6e6f)", NO_ARGS).unwrap_err();
    assert_eq!(
        err.as_fault().unwrap().kind,
        FaultKind::Failed {
            message: "no".to_string()
        }
    );
}

#[test]
fn library_from_config() {
    let dir = std::env::temp_dir().join(format!("easyfl-config-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("locks.easyfl"), "def lockedTo(1) = equal(@, $0)\n").unwrap();
    std::fs::write(
        dir.join("library.toml"),
        "max_call_depth = 32\nextensions = [\"locks.easyfl\"]\n",
    )
    .unwrap();

    let config = LibraryConfig::from_path(&dir.join("library.toml")).unwrap();
    assert_eq!(config.extensions, vec![dir.join("locks.easyfl")]);

    let lib = Library::from_config(&config).unwrap();
    assert_eq!(lib.max_call_depth(), 32);
    assert!(lib.function_by_name("lockedTo").is_some());
    assert!(lib.function_by_name("min").is_some());

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn config_errors() {
    let missing = PathBuf::from("/nonexistent/easyfl/library.toml");
    assert!(matches!(
        LibraryConfig::from_path(&missing),
        Err(Error::Io { .. })
    ));

    let config = LibraryConfig {
        include_base: false,
        extensions: vec![PathBuf::from("/nonexistent/defs.easyfl")],
        ..LibraryConfig::default()
    };
    assert!(matches!(Library::from_config(&config), Err(Error::Io { .. })));

    let config = LibraryConfig {
        include_base: false,
        ..LibraryConfig::default()
    };
    let lib = Library::from_config(&config).unwrap();
    assert!(lib.function_by_name("true").is_none());
}

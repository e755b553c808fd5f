use std::{ops::Range, path::PathBuf, process::ExitCode};

use ariadne::{ColorGenerator, Label, Report, ReportKind, Source};
use clap::{Parser as ClapParser, Subcommand};
use easyfl::{Error, Library, LibraryConfig};
use log::{LevelFilter, debug};
use termcolor::ColorChoice;

mod logger;

#[derive(ClapParser)]
#[command(name = "easyfl", version, about = "Compile, inspect and evaluate EasyFL expressions")]
pub struct Arguments {
    /// Library configuration file (TOML). The base library is used when absent.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compile an expression and print its bytecode as hex
    Compile { expression: String },
    /// Print the source form of hex bytecode
    Decompile { bytecode: String },
    /// Evaluate an expression, or hex bytecode with --bytecode
    Eval {
        input: String,
        /// Treat the input as hex bytecode
        #[arg(long)]
        bytecode: bool,
        /// Hex value bound to the next argument reference ($0, $1, ...)
        #[arg(long = "arg", value_name = "HEX")]
        args: Vec<String>,
    },
    /// Compile a definition file against the library and report errors
    Check { file: PathBuf },
    /// List the functions of the library
    List,
}

fn load_library(config: Option<&PathBuf>) -> easyfl::Result<Library> {
    match config {
        Some(path) => Library::from_config(&LibraryConfig::from_path(path)?),
        None => Library::base(),
    }
}

fn decode_hex(text: &str) -> Result<Vec<u8>, String> {
    let digits = text.strip_prefix("0x").unwrap_or(text);
    hex::decode(digits).map_err(|err| format!("invalid hex `{}`: {}", text, err))
}

fn show_bytes(bytes: &[u8]) -> String {
    if bytes.is_empty() {
        "nil".to_string()
    } else {
        format!("0x{}", hex::encode(bytes))
    }
}

/// Byte range of the 1-based `line` in `source`.
fn line_span(source: &str, line: usize) -> Range<usize> {
    let mut start = 0;
    for (i, text) in source.split_inclusive('\n').enumerate() {
        if i + 1 == line {
            return start..start + text.trim_end().len();
        }
        start += text.len();
    }
    source.len()..source.len()
}

fn report_definition_error(file: &str, source: &str, error: &Error) {
    let line = match error {
        Error::Parse(err) => Some(err.line()),
        Error::InDefinition { line, .. } => Some(*line),
        _ => None,
    };
    let Some(line) = line else {
        eprintln!("Error: {}", error);
        return;
    };

    let mut colors = ColorGenerator::new();
    let span = (file.to_string(), line_span(source, line));
    let printed = Report::build(ReportKind::Error, span.clone())
        .with_message(error.to_string())
        .with_label(
            Label::new(span)
                .with_message("in this definition")
                .with_color(colors.next()),
        )
        .finish()
        .eprint((file.to_string(), Source::from(source)));
    if printed.is_err() {
        eprintln!("Error: {}", error);
    }
}

fn run(args: Arguments) -> Result<(), String> {
    let mut lib = load_library(args.config.as_ref()).map_err(|err| err.to_string())?;
    debug!("Using library with {}", lib.summary());

    match args.command {
        Command::Compile { expression } => {
            let compiled = lib.compile(&expression).map_err(|err| err.to_string())?;
            println!("{}", hex::encode(&compiled.bytecode));
            println!("arguments: {}", compiled.num_args);
        }
        Command::Decompile { bytecode } => {
            let bytecode = decode_hex(&bytecode)?;
            println!("{}", lib.decompile(&bytecode).map_err(|err| err.to_string())?);
        }
        Command::Eval {
            input,
            bytecode,
            args,
        } => {
            let values = args
                .iter()
                .map(|arg| decode_hex(arg))
                .collect::<Result<Vec<_>, _>>()?;
            let code = if bytecode {
                decode_hex(&input)?
            } else {
                lib.compile(&input).map_err(|err| err.to_string())?.bytecode
            };
            let result = lib
                .evaluate_bytecode(&code, &(), &values)
                .map_err(|err| err.to_string())?;
            println!("{}", show_bytes(&result));
        }
        Command::Check { file } => {
            let name = file.display().to_string();
            let source = std::fs::read_to_string(&file)
                .map_err(|err| format!("cannot read '{}': {}", name, err))?;
            match lib.extend_many(&source) {
                Ok(ids) => println!("{}: {} definitions compiled", name, ids.len()),
                Err(error) => {
                    report_definition_error(&name, &source, &error);
                    return Err(format!("{} has errors", name));
                }
            }
        }
        Command::List => {
            for function in lib.functions() {
                match &function.source {
                    Some(source) => println!(
                        "{:>4}  {}({})  {} = {}",
                        function.code,
                        function.symbol,
                        function.arity,
                        function.code_space(),
                        source
                    ),
                    None => println!(
                        "{:>4}  {}({})  {}",
                        function.code,
                        function.symbol,
                        function.arity,
                        function.code_space()
                    ),
                }
            }
            println!("{}", lib.summary());
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let args = Arguments::parse();
    let level = match args.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    logger::StderrLogger::install(level, ColorChoice::Auto);

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("Error: {}", message);
            ExitCode::FAILURE
        }
    }
}

//! Node board compiler CLI.
//!
//! Provides the `nodecode` binary with subcommands for working with boards
//! saved by the editor as a JSON node list:
//!
//! - `compile` lowers the board's functions and prints TypeScript, the AST,
//!   or the AST as JSON
//! - `check` validates edge links and reports compile diagnostics
//! - `functions` lists the function signatures found on the board
//!
//! Uses the same `nodecode_codegen::compile()` pipeline as the editor.

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use nodecode_codegen::ast::Program;
use nodecode_codegen::error::CodegenError;
use nodecode_codegen::{compile, compile_function, Diagnostic, EmitOptions, TsWriter};
use nodecode_core::node::NodeKind;
use nodecode_core::{scope, NodeTable};

/// Node board compiler and tools.
#[derive(Parser)]
#[command(name = "nodecode", about = "Node board compiler and tools")]
struct Cli {
    /// Log verbosity (-v debug, -vv trace). Overridden by RUST_LOG.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Compile a board to TypeScript.
    Compile {
        /// Path to the board JSON file.
        board: PathBuf,

        /// Only compile the function with this name.
        #[arg(short, long)]
        function: Option<String>,

        /// Output format: ts, ast, json.
        #[arg(long, default_value = "ts")]
        format: String,

        /// Spaces per indentation level.
        #[arg(long, default_value_t = 4)]
        indent: usize,

        /// Omit return type annotations.
        #[arg(long)]
        no_return_types: bool,
    },

    /// Validate a board without printing output.
    Check {
        /// Path to the board JSON file.
        board: PathBuf,
    },

    /// List the functions on a board.
    Functions {
        /// Path to the board JSON file.
        board: PathBuf,
    },
}

/// Output format of the compile subcommand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    TypeScript,
    Ast,
    Json,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let exit_code = match cli.command {
        Commands::Compile {
            board,
            function,
            format,
            indent,
            no_return_types,
        } => {
            let options = EmitOptions {
                indent_width: indent,
                return_types: !no_return_types,
            };
            run_compile(&board, function.as_deref(), &format, &options)
        }
        Commands::Check { board } => run_check(&board),
        Commands::Functions { board } => run_functions(&board),
    };
    process::exit(exit_code);
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Execute the compile subcommand.
///
/// Returns exit code: 0 = success, 1 = compile diagnostics,
/// 2 = invalid board or arguments, 3 = I/O error.
fn run_compile(board: &Path, function: Option<&str>, format: &str, options: &EmitOptions) -> i32 {
    let format = match parse_format(format) {
        Ok(format) => format,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            return 2;
        }
    };

    match load_board(board).and_then(|table| render(&table, function, format, options)) {
        Ok(output) => {
            print!("{}", output);
            0
        }
        Err(e) => report(board, e),
    }
}

/// Execute the check subcommand.
fn run_check(board: &Path) -> i32 {
    let result = load_board(board).and_then(|table| {
        table.validate_links()?;
        compile(&table)?;
        Ok(table.len())
    });
    match result {
        Ok(nodes) => {
            println!("{}: ok ({} nodes)", board.display(), nodes);
            0
        }
        Err(e) => report(board, e),
    }
}

/// Execute the functions subcommand.
fn run_functions(board: &Path) -> i32 {
    match load_board(board) {
        Ok(table) => {
            for line in signatures(&table) {
                println!("{}", line);
            }
            0
        }
        Err(e) => report(board, e),
    }
}

/// Print an error and map it to an exit code.
fn report(board: &Path, error: CodegenError) -> i32 {
    match error {
        CodegenError::CompileFailed(diagnostics) => {
            eprintln!(
                "{}: compile failed with {} diagnostic(s):",
                board.display(),
                diagnostics.len()
            );
            for diagnostic in &diagnostics {
                eprintln!("  - {}", diagnostic);
            }
            1
        }
        CodegenError::Io(e) => {
            eprintln!("I/O error: failed to read '{}': {}", board.display(), e);
            3
        }
        e => {
            eprintln!("Error: {}", e);
            2
        }
    }
}

/// Load a board saved as a JSON node list.
fn load_board(path: &Path) -> Result<NodeTable, CodegenError> {
    let text = std::fs::read_to_string(path)?;
    let table: NodeTable = serde_json::from_str(&text)?;
    tracing::debug!("loaded {} nodes from {}", table.len(), path.display());
    Ok(table)
}

/// Compile `table` (or one named function of it) and format the result.
fn render(
    table: &NodeTable,
    function: Option<&str>,
    format: Format,
    options: &EmitOptions,
) -> Result<String, CodegenError> {
    let program = match function {
        Some(name) => {
            let node = scope::functions(table)
                .into_iter()
                .find(|node| matches!(&node.kind, NodeKind::FunctionDeclaration(f) if f.name == name))
                .ok_or_else(|| CodegenError::UnknownFunction(name.to_string()))?;
            Program {
                functions: vec![compile_function(table, node).map_err(single)?],
            }
        }
        None => compile(table)?,
    };

    let output = match format {
        Format::TypeScript => TsWriter::emit_with(&program, options),
        Format::Ast => format!("{:#?}\n", program),
        Format::Json => format!("{}\n", serde_json::to_string_pretty(&program)?),
    };
    Ok(output)
}

fn single(diagnostic: Diagnostic) -> CodegenError {
    CodegenError::CompileFailed(vec![diagnostic])
}

/// One `name(param: type, ...)` line per function, in board order.
fn signatures(table: &NodeTable) -> Vec<String> {
    scope::functions(table)
        .into_iter()
        .filter_map(|function| {
            let NodeKind::FunctionDeclaration(decl) = &function.kind else {
                return None;
            };
            let scoped = scope::nodes_in_function(table, function);
            let params: Vec<String> = scope::parameters_of(&scoped)
                .into_iter()
                .filter_map(|node| match &node.kind {
                    NodeKind::Parameter(p) => Some(format!(
                        "{}: {}{}",
                        p.name,
                        p.value_type,
                        if p.array { "[]" } else { "" }
                    )),
                    _ => None,
                })
                .collect();
            Some(format!("{}({})", decl.name, params.join(", ")))
        })
        .collect()
}

/// Parse an output format string to `Format`.
fn parse_format(s: &str) -> Result<Format, String> {
    match s {
        "ts" | "typescript" => Ok(Format::TypeScript),
        "ast" => Ok(Format::Ast),
        "json" => Ok(Format::Json),
        _ => Err(format!("invalid format '{}', expected ts/ast/json", s)),
    }
}

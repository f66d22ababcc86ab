//! Rill command-line driver
//!
//! Runs the fixed pipeline (lexer, parser, semantic analysis, IR,
//! object code, VM) over a source file, with flags to print any
//! intermediate phase. Also hosts the embedded compile test suite and
//! an interactive REPL.

use clap::{CommandFactory, Parser as ClapParser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use rillc::{Compilation, Warning};
use rill_vm::Vm;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process;

mod repl;

#[derive(ClapParser)]
#[command(name = "rill")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Rill compiler and stack-machine runner", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Pipeline phases that can be printed alongside a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Phase {
    Tokens,
    Ast,
    Symbols,
    Ir,
    Asm,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a .rill file and execute it on the virtual machine
    Run {
        /// Input source file
        input: PathBuf,

        /// Phases to print before execution (comma-separated)
        #[arg(long, value_delimiter = ',')]
        show: Vec<Phase>,
    },

    /// Lex, parse, and semantically check a file without running it
    Check {
        /// Input source file
        input: PathBuf,
    },

    /// Compile a file to its assembly listing
    Build {
        /// Input source file
        input: PathBuf,

        /// Output path for the listing (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run the embedded compile test suite
    Test {
        /// Only run cases whose name contains this substring
        #[arg(short, long)]
        filter: Option<String>,
    },

    /// Start an interactive read-compile-run loop
    Repl,

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::level_filters::LevelFilter::WARN.into()),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run { input, show } => cmd_run(&input, &show),
        Commands::Check { input } => cmd_check(&input),
        Commands::Build { input, output } => cmd_build(&input, output.as_deref()),
        Commands::Test { filter } => cmd_test(filter.as_deref()),
        Commands::Repl => repl::run(),
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "rill", &mut io::stdout());
            Ok(())
        }
    };

    if let Err(message) = result {
        eprintln!("error: {}", message);
        process::exit(1);
    }
}

fn read_source(path: &Path) -> Result<String, String> {
    fs::read_to_string(path).map_err(|e| format!("cannot read {}: {}", path.display(), e))
}

fn compile_file(path: &Path) -> Result<Compilation, String> {
    let source = read_source(path)?;
    let compilation = rillc::compile(&source).map_err(|e| e.to_string())?;
    emit_warnings(&compilation.analysis.warnings);
    Ok(compilation)
}

fn emit_warnings(warnings: &[Warning]) {
    for warning in warnings {
        tracing::warn!("{}", warning);
    }
}

fn cmd_run(input: &Path, show: &[Phase]) -> Result<(), String> {
    let compilation = compile_file(input)?;
    print_phases(&compilation, show);

    let mut vm = Vm::new();
    vm.load(&compilation.assembly).map_err(|e| e.to_string())?;
    vm.run().map_err(|e| e.to_string())?;

    match vm.final_top() {
        Some(value) => println!(">> stack top: {}", value),
        None => println!(">> stack top: (empty)"),
    }
    let mut entries: Vec<(&String, &rill_vm::Value)> = vm.memory().iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));
    println!(">> memory:");
    for (name, value) in entries {
        println!("   {} = {}", name, value);
    }
    Ok(())
}

fn print_phases(compilation: &Compilation, show: &[Phase]) {
    if show.contains(&Phase::Tokens) {
        println!("--- tokens ({}) ---", compilation.tokens.len());
        for token in &compilation.tokens {
            println!(
                "  {}:{} {:?} '{}'",
                token.line, token.column, token.kind, token.lexeme
            );
        }
    }
    if show.contains(&Phase::Ast) {
        println!("--- ast ---");
        for stmt in &compilation.ast {
            println!("  {:?}", stmt);
        }
    }
    if show.contains(&Phase::Symbols) {
        println!("--- symbol table ---");
        for scope in &compilation.analysis.symbols.scopes {
            println!("  scope {}:", scope.name);
            for (name, info) in &scope.entries {
                println!(
                    "    {}: {} const={} initialized={} used={}",
                    name, info.ty, info.is_const, info.initialized, info.used
                );
            }
        }
        for (name, sig) in &compilation.analysis.symbols.functions {
            let params: Vec<String> = sig.params.iter().map(|t| t.to_string()).collect();
            println!("  fn {}({}) -> {}", name, params.join(", "), sig.ret);
        }
    }
    if show.contains(&Phase::Ir) {
        println!("--- intermediate code ---");
        for (i, quad) in compilation.quads.iter().enumerate() {
            println!("  {:3}: {}", i + 1, quad);
        }
    }
    if show.contains(&Phase::Asm) {
        println!("--- object code ---");
        println!("{}", compilation.assembly);
    }
}

fn cmd_check(input: &Path) -> Result<(), String> {
    let source = read_source(input)?;
    let tokens = rillc::tokenize(&source).map_err(|e| e.to_string())?;
    let ast = rillc::parse(&tokens).map_err(|e| e.to_string())?;
    let analysis = rillc::analyze(&ast).map_err(|e| e.to_string())?;
    emit_warnings(&analysis.warnings);
    println!("{}: ok", input.display());
    Ok(())
}

fn cmd_build(input: &Path, output: Option<&Path>) -> Result<(), String> {
    let compilation = compile_file(input)?;
    match output {
        Some(path) => {
            fs::write(path, format!("{}\n", compilation.assembly))
                .map_err(|e| format!("cannot write {}: {}", path.display(), e))?;
            println!("wrote {}", path.display());
        }
        None => println!("{}", compilation.assembly),
    }
    Ok(())
}

fn cmd_test(filter: Option<&str>) -> Result<(), String> {
    let suite = rillc::suite::Suite::embedded()?;
    let outcomes = rillc::suite::run_suite(&suite, filter);
    if outcomes.is_empty() {
        return Err("no test cases matched the filter".to_string());
    }

    let mut failed = 0;
    for outcome in &outcomes {
        if outcome.passed {
            println!("ok   {} - {}", outcome.name, outcome.description);
        } else {
            failed += 1;
            println!("FAIL {} - {}", outcome.name, outcome.description);
            if let Some(error) = &outcome.error {
                println!("     {}", error);
            }
        }
    }
    println!("{} cases, {} failed", outcomes.len(), failed);

    if failed > 0 {
        Err(format!("{} test case(s) failed", failed))
    } else {
        Ok(())
    }
}

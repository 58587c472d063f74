// pascalc: Pascal subset to stack-machine compiler

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

use pascalc::parser::graph::{self, DotGraph};
use pascalc::parser::printer;
use pascalc::vm::Machine;

/// Compile a Pascal program to stack-machine instructions
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Pascal source file
    input: PathBuf,

    /// Write the instruction listing to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print the syntax tree to stderr
    #[arg(long)]
    ast: bool,

    /// Write a Graphviz rendering of the syntax tree
    #[arg(long, value_name = "FILE")]
    dot: Option<PathBuf>,

    /// Execute the program, reading input lines from stdin
    #[arg(long)]
    run: bool,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: &Cli) -> Result<bool, Box<dyn std::error::Error>> {
    let source = fs::read_to_string(&cli.input)
        .map_err(|e| format!("cannot read '{}': {}", cli.input.display(), e))?;

    // lexer errors were already logged as warnings while scanning
    let compilation = pascalc::compile(&source)?;

    if cli.ast {
        eprint!("{}", printer::dump(&compilation.program));
    }

    if let Some(path) = &cli.dot {
        let mut dot = DotGraph::new();
        graph::render(&compilation.program, &mut dot);
        fs::write(path, dot.to_string())?;
        debug!(nodes = dot.node_count(), path = %path.display(), "wrote graph");
    }

    let mut listing = compilation.listing();
    listing.push('\n');
    match &cli.output {
        Some(path) => fs::write(path, &listing)?,
        // stdout carries the program's own output when running
        None if cli.run => {}
        None => io::stdout().write_all(listing.as_bytes())?,
    }

    if cli.run {
        let input = io::stdin().lines().collect::<Result<Vec<_>, _>>()?;
        let mut machine = Machine::new(compilation.instructions)?.with_input(input);
        let result = machine.run();
        io::stdout().write_all(machine.terminal().output().as_bytes())?;
        io::stdout().flush()?;
        result?;
    }

    Ok(compilation.lex_errors.is_empty())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            error!("{}", err);
            ExitCode::FAILURE
        }
    }
}

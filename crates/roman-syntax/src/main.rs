mod classifier;
mod diagnostics;
mod parser;
mod syntax_tree;
mod tokenizer;

use std::env;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::str::FromStr;

use anyhow::Context;
use clap::Parser;
use tracing::{debug, trace};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

use crate::diagnostics::diagnostics_from_analyze_error;
use crate::parser::{ParserOptions, SyntaxAnalyzer, DEFAULT_MAX_DEPTH};

fn main() -> anyhow::Result<ExitCode> {
    initialize_logging();

    let cli = RomanSyntax::parse();

    let output = match cli.subcmd {
        RomanSyntaxSubcommand::Tokens(opts) => tokens(&opts.source)?,
        RomanSyntaxSubcommand::Parse(opts) => match parse(&opts)? {
            Ok(output) => output,
            Err(report) => {
                eprintln!("{report}");
                return Ok(ExitCode::FAILURE);
            }
        },
    };
    println!("{output}");

    Ok(ExitCode::SUCCESS)
}

fn read_source(path: &Path) -> anyhow::Result<String> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    trace!(source_len = source.len(), "Read input file");
    Ok(source)
}

fn tokens(path: &Path) -> anyhow::Result<String> {
    let source = read_source(path)?;
    let results = tokenizer::tokenize(&source);
    debug!(results = results.len(), "Tokenized source file");
    Ok(serde_json::to_string_pretty(&results)?)
}

/// Returns the rendered tree, or the rendered diagnostics when the source is
/// not a valid program. The outer error is reserved for I/O and encoding
/// failures.
fn parse(opts: &ParseOpts) -> anyhow::Result<Result<String, String>> {
    let source = read_source(&opts.source)?;
    let results = tokenizer::tokenize(&source);
    let analyzer = SyntaxAnalyzer::new(ParserOptions {
        max_depth: opts.max_depth,
    });

    let tree = match analyzer.analyze(&results) {
        Ok(tree) => tree,
        Err(err) => {
            debug!(error = %err, "Syntax analysis failed");
            let bundle = diagnostics_from_analyze_error(&source, Some(opts.source.as_path()), &err);
            return Ok(Err(bundle.render_terminal_auto()));
        }
    };

    let output = match opts.format {
        OutputFormat::Tree => tree.render(),
        OutputFormat::Json => serde_json::to_string_pretty(&tree)?,
    };
    Ok(Ok(output))
}

fn initialize_logging() {
    let env_filter = env::var("RUST_LOG").unwrap_or_default();
    let env_filter = EnvFilter::from_str(&env_filter).unwrap_or_else(|_| EnvFilter::new(""));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_filter(env_filter))
        .init();
}

#[derive(clap::Parser)]
#[clap(
    name = "roman-syntax",
    about = "Syntax analyzer for a small language of assignments, arithmetic and conditionals over Roman numerals."
)]
struct RomanSyntax {
    #[clap(subcommand)]
    subcmd: RomanSyntaxSubcommand,
}

#[derive(clap::Subcommand)]
enum RomanSyntaxSubcommand {
    /// Print the tokenizer output as JSON.
    Tokens(TokensOpts),
    /// Build and print the syntax tree.
    Parse(ParseOpts),
}

#[derive(clap::Parser, Debug)]
struct TokensOpts {
    /// Path to the source file
    source: PathBuf,
}

#[derive(clap::Parser, Debug)]
struct ParseOpts {
    /// Path to the source file
    source: PathBuf,

    /// How to print the tree
    #[clap(short, long, value_enum, default_value_t = OutputFormat::Tree)]
    format: OutputFormat,

    /// Deepest allowed nesting of statement sequences
    #[clap(long, default_value_t = DEFAULT_MAX_DEPTH)]
    max_depth: usize,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    Tree,
    Json,
}

//! Command-line interface for xmlcontent

#[cfg(feature = "cli")]
use clap::{Parser, Subcommand};

#[cfg(feature = "cli")]
use std::path::PathBuf;

#[cfg(feature = "cli")]
use xmlcontent::documents::validate_file;
#[cfg(feature = "cli")]
use xmlcontent::namespaces::NamespaceContext;
#[cfg(feature = "cli")]
use xmlcontent::notation;
#[cfg(feature = "cli")]
use xmlcontent::validators::{CompileOptions, ContentValidator};

#[cfg(feature = "cli")]
#[derive(Parser, Debug)]
#[command(name = "xmlcontent")]
#[command(author, version, about = "XML content-model compiler and child-element validator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[cfg(feature = "cli")]
#[derive(Subcommand, Debug)]
enum Commands {
    /// Compile a content model and display how it is represented
    Inspect {
        /// Content model in compact notation, e.g. "(a, b{2,4}, any[##other]*)"
        #[arg(short, long, value_name = "NOTATION")]
        model: String,

        /// Namespace prefix binding, as prefix=uri (repeatable)
        #[arg(long = "ns", value_name = "PREFIX=URI")]
        namespaces: Vec<String>,

        /// Do not check Unique Particle Attribution
        #[arg(long)]
        no_upa: bool,

        /// Keep the non-deterministic form instead of building a transition table
        #[arg(long)]
        nfa: bool,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Validate the children of an XML document's root element
    Check {
        /// Content model in compact notation
        #[arg(short, long, value_name = "NOTATION")]
        model: String,

        /// Namespace prefix binding, as prefix=uri (repeatable)
        #[arg(long = "ns", value_name = "PREFIX=URI")]
        namespaces: Vec<String>,

        /// Path to the XML file to validate
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },
}

#[cfg(feature = "cli")]
fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Inspect {
            model,
            namespaces,
            no_upa,
            nfa,
            json,
        } => cmd_inspect(&model, &namespaces, no_upa, nfa, json),
        Commands::Check {
            model,
            namespaces,
            file,
            json,
        } => cmd_check(&model, &namespaces, file, json),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(feature = "cli")]
fn namespace_context(bindings: &[String]) -> Result<NamespaceContext, Box<dyn std::error::Error>> {
    let mut context = NamespaceContext::new();
    for binding in bindings {
        let (prefix, uri) = binding
            .split_once('=')
            .ok_or_else(|| format!("Invalid namespace binding '{}', expected prefix=uri", binding))?;
        if prefix.is_empty() {
            context.set_default_namespace(uri);
        } else {
            context.add_prefix(prefix, uri);
        }
    }
    Ok(context)
}

#[cfg(feature = "cli")]
fn compile(
    model: &str,
    bindings: &[String],
    options: &CompileOptions,
) -> Result<ContentValidator, Box<dyn std::error::Error>> {
    let namespaces = namespace_context(bindings)?;
    Ok(notation::compile(model, &namespaces, options)?)
}

#[cfg(feature = "cli")]
fn cmd_inspect(
    model: &str,
    bindings: &[String],
    no_upa: bool,
    nfa: bool,
    json_output: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let options = CompileOptions {
        enforce_upa: !no_upa,
        prefer_deterministic: !nfa,
        ..CompileOptions::default()
    };
    let validator = compile(model, bindings, &options)?;
    let start = validator.new_run();

    if json_output {
        let json = serde_json::json!({
            "model": model,
            "category": validator.content_category(),
            "open": validator.is_open(),
            "emptiable": validator.is_emptiable(),
            "whitespacePreservable": validator.is_whitespace_preservable(),
            "representation": validator.representation(),
            "symbols": validator.symbol_count(),
            "positions": validator.position_count(),
            "first": validator.expected_names(&start),
        });
        println!("{}", serde_json::to_string_pretty(&json)?);
    } else {
        println!("xmlcontent v{}", xmlcontent::VERSION);
        println!();
        println!("Content Model: {}", model);
        println!("  Category: {}", validator.content_category());
        println!("  Open: {}", validator.is_open());
        println!("  Emptiable: {}", validator.is_emptiable());
        println!("  Representation: {}", validator.representation());
        println!("  Symbols: {}", validator.symbol_count());
        println!("  Positions: {}", validator.position_count());
        let first = validator.expected_names(&start);
        if !first.is_empty() {
            println!("  First: {}", first.join(" | "));
        }
    }

    Ok(())
}

#[cfg(feature = "cli")]
fn cmd_check(
    model: &str,
    bindings: &[String],
    file: PathBuf,
    json_output: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let validator = compile(model, bindings, &CompileOptions::default())?;
    let report = validate_file(&validator, &file)?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if report.is_valid() {
        println!("✓ Content of {} is valid", report.root.as_deref().unwrap_or("?"));
    } else {
        println!("✗ Content of {} is invalid", report.root.as_deref().unwrap_or("?"));
        println!();
        println!("Errors:");
        for failure in &report.failures {
            let at = match (&failure.index, &failure.name) {
                (Some(index), Some(name)) => format!("child {} ({})", index, name),
                _ => "end of content".to_string(),
            };
            println!("  - {}: {}", at, failure.message);
            if !failure.expected.is_empty() {
                println!("    expected: {}", failure.expected.join(" | "));
            }
        }
    }

    if !report.is_valid() {
        std::process::exit(1);
    }
    Ok(())
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI feature not enabled. Rebuild with --features cli");
    std::process::exit(1);
}

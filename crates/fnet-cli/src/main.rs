//! Function Network lowering CLI.
//!
//! Provides the `fnet` binary. Currently supports `lower`, which reads a
//! CAST module from a JSON file, lowers it through the same
//! `fnet_lower::lower_module()` pipeline library users call, and writes the
//! resulting Function Network module as JSON.

use std::fs;
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

use fnet_cast::CastModule;

/// Function Network lowering and tools.
#[derive(Parser)]
#[command(name = "fnet", about = "Function Network lowering and tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Lower a CAST module (JSON) to a Function Network module (JSON).
    Lower {
        /// Path to the CAST JSON file.
        input: PathBuf,

        /// Output path (default: input with a .fn.json extension).
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Pretty-print the output JSON.
        #[arg(long)]
        pretty: bool,
    },
}

fn main() {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Lower {
            input,
            output,
            pretty,
        } => {
            process::exit(run_lower(&input, output, pretty));
        }
    }
}

/// Execute the lower subcommand.
///
/// Returns exit code: 0 = success, 1 = lowering error, 2 = malformed input,
/// 3 = I/O error.
fn run_lower(input: &PathBuf, output: Option<PathBuf>, pretty: bool) -> i32 {
    let raw = match fs::read_to_string(input) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: failed to read '{}': {}", input.display(), e);
            return 3;
        }
    };

    let cast: CastModule = match serde_json::from_str(&raw) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("Error: '{}' is not a CAST module: {}", input.display(), e);
            return 2;
        }
    };

    let out = match fnet_lower::lower_module(&cast) {
        Ok(out) => out,
        Err(e) => {
            eprintln!("Lowering error: {}", e);
            return 1;
        }
    };
    for warning in &out.warnings {
        eprintln!("Warning: {}", warning);
    }

    let json = if pretty {
        serde_json::to_string_pretty(&out.module)
    } else {
        serde_json::to_string(&out.module)
    };
    let json = match json {
        Ok(j) => j,
        Err(e) => {
            eprintln!("Error: failed to serialize module: {}", e);
            return 1;
        }
    };

    let path = output.unwrap_or_else(|| input.with_extension("fn.json"));
    if let Err(e) = fs::write(&path, json) {
        eprintln!("Error: failed to write '{}': {}", path.display(), e);
        return 3;
    }
    println!("{}", path.display());
    0
}

use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use serde_json::json;

use route_dispatch::routing::{CompileOptions, PathPattern};

#[derive(Parser)]
#[command(name = "route-cli")]
#[command(about = "Inspect how route patterns compile and match", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Flags {
    /// Treat `/User` and `/user` as different paths
    #[arg(long)]
    case_sensitive: bool,

    /// Treat `/user` and `/user/` as different paths
    #[arg(long)]
    strict: bool,
}

impl Flags {
    fn options(&self) -> CompileOptions {
        CompileOptions {
            case_sensitive: self.case_sensitive,
            strict: self.strict,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Print the compiled regex and parameter slots of a route path
    Compile {
        spec: String,
        #[command(flatten)]
        flags: Flags,
    },
    /// Match a request path against a route path and print the parameters
    Match {
        spec: String,
        path: String,
        #[command(flatten)]
        flags: Flags,
    },
}

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Compile { spec, flags } => {
            let pattern = PathPattern::compile(&spec, flags.options())?;
            let report = json!({
                "spec": pattern.spec(),
                "pattern": pattern.as_str(),
                "slots": pattern.slots(),
                "dynamic": pattern.is_dynamic(),
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Match { spec, path, flags } => {
            let pattern = PathPattern::compile(&spec, flags.options())?;
            match pattern.captures(&path) {
                Some(params) => println!("{}", serde_json::to_string_pretty(&params)?),
                None => {
                    eprintln!("No match: {path} against {spec}");
                    return Ok(ExitCode::FAILURE);
                }
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

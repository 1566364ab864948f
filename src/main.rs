//! argspec - parse arguments against a declarative spec file.

use anyhow::{bail, Context, Result};
use argspec::{
    generate_help, parse_args, render_error_script, render_exports, render_help_script,
    render_json, ProgramSpec,
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Parse command-line arguments against a declarative spec.
#[derive(Parser, Debug)]
#[command(name = "argspec", version, about, disable_help_subcommand = true)]
struct Cli {
    /// Log filter used when RUST_LOG is not set
    #[arg(long, global = true, env = "ARGSPEC_LOG", default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Parse arguments and print the result
    Parse {
        #[command(flatten)]
        source: SpecSource,

        /// How to print parsed values
        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        output: OutputFormat,

        /// Variable prefix for `--output env`
        #[arg(long, default_value = "ARGSPEC_")]
        prefix: String,

        /// Arguments to parse
        #[arg(last = true)]
        args: Vec<String>,
    },

    /// Print help text for the spec or one of its subcommands
    Help {
        #[command(flatten)]
        source: SpecSource,

        /// Subcommand to describe
        subcommand: Option<String>,
    },

    /// Compile the spec and summarize it
    Check {
        #[command(flatten)]
        source: SpecSource,
    },
}

#[derive(Args, Debug)]
struct SpecSource {
    /// Path to the spec file
    #[arg(long)]
    spec: PathBuf,

    /// Spec syntax; `auto` picks JSON for `.json` files and text otherwise
    #[arg(long, value_enum, default_value_t = SpecFormat::Auto)]
    spec_format: SpecFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum SpecFormat {
    Auto,
    Text,
    Json,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// A JSON object with subcommand, positionals and flags
    Json,
    /// Shell `export` statements
    Env,
}

impl SpecSource {
    fn resolved_format(&self) -> SpecFormat {
        resolve_format(self.spec_format, &self.spec)
    }

    fn load(&self) -> Result<ProgramSpec> {
        let text = fs::read_to_string(&self.spec)
            .with_context(|| format!("failed to read spec file {}", self.spec.display()))?;

        let format = self.resolved_format();
        debug!(path = %self.spec.display(), ?format, "compiling spec");

        let program = match format {
            SpecFormat::Json => ProgramSpec::from_json(&text),
            SpecFormat::Text | SpecFormat::Auto => ProgramSpec::from_text(&text),
        }
        .with_context(|| format!("invalid spec {}", self.spec.display()))?;

        Ok(program)
    }
}

fn resolve_format(format: SpecFormat, path: &Path) -> SpecFormat {
    match format {
        SpecFormat::Auto => {
            let is_json = path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
            if is_json {
                SpecFormat::Json
            } else {
                SpecFormat::Text
            }
        }
        explicit => explicit,
    }
}

fn init_logging(level: &str) {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    match cli.command {
        Commands::Parse {
            source,
            output,
            prefix,
            args,
        } => {
            let program = source.load()?;

            let matches = match parse_args(&program, &args) {
                Ok(matches) => matches,
                Err(failure) => {
                    if output == OutputFormat::Env {
                        print!("{}", render_error_script(&failure.to_string()));
                        std::process::exit(1);
                    }
                    eprint!("{}", failure.help);
                    return Err(failure).context("failed to parse arguments");
                }
            };

            match output {
                OutputFormat::Json if matches.help_requested() => print!("{}", matches.help()),
                OutputFormat::Env if matches.help_requested() => {
                    print!("{}", render_help_script(matches.help()))
                }
                OutputFormat::Json => {
                    let json = render_json(&matches).context("failed to render JSON")?;
                    println!("{}", json);
                }
                OutputFormat::Env => match render_exports(&matches, &prefix) {
                    Ok(exports) => print!("{}", exports),
                    Err(error) => {
                        print!("{}", render_error_script(&error.to_string()));
                        std::process::exit(1);
                    }
                },
            }
        }
        Commands::Help { source, subcommand } => {
            let program = source.load()?;
            if let Some(ref name) = subcommand {
                if program.subcommand(name).is_none() {
                    bail!("unknown subcommand: {}", name);
                }
            }
            print!("{}", generate_help(&program, subcommand.as_deref()));
        }
        Commands::Check { source } => {
            let program = source.load()?;
            print!("{}", summarize(&program));
        }
    }

    Ok(())
}

fn summarize(program: &ProgramSpec) -> String {
    let mut out = format!(
        "{}: {} arguments, {} flags\n",
        program.name(),
        program.main().arguments().len(),
        program.main().flags().len()
    );
    for sub in program.subcommands() {
        out.push_str(&format!(
            "  {}: {} arguments, {} flags\n",
            sub.name(),
            sub.arguments().len(),
            sub.flags().len()
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_parse_subcommand_parses_spec() {
        let cli = Cli::try_parse_from(["argspec", "parse", "--spec", "cli.spec", "--"]).unwrap();

        match cli.command {
            Commands::Parse {
                source,
                output,
                prefix,
                args,
            } => {
                assert_eq!(source.spec, PathBuf::from("cli.spec"));
                assert_eq!(source.spec_format, SpecFormat::Auto);
                assert_eq!(output, OutputFormat::Json);
                assert_eq!(prefix, "ARGSPEC_");
                assert!(args.is_empty());
            }
            _ => panic!("Expected Parse command"),
        }
    }

    #[test]
    fn test_parse_subcommand_parses_args() {
        let cli = Cli::try_parse_from([
            "argspec",
            "parse",
            "--spec",
            "cli.json",
            "--output",
            "env",
            "--",
            "-v",
            "--output",
            "file.txt",
        ])
        .unwrap();

        match cli.command {
            Commands::Parse { output, args, .. } => {
                assert_eq!(output, OutputFormat::Env);
                assert_eq!(args, vec!["-v", "--output", "file.txt"]);
            }
            _ => panic!("Expected Parse command"),
        }
    }

    #[test]
    fn test_parse_subcommand_requires_spec() {
        let result = Cli::try_parse_from(["argspec", "parse", "--"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_help_subcommand_takes_optional_name() {
        let cli = Cli::try_parse_from(["argspec", "help", "--spec", "a.spec", "copy"]).unwrap();
        match cli.command {
            Commands::Help { subcommand, .. } => assert_eq!(subcommand.as_deref(), Some("copy")),
            _ => panic!("Expected Help command"),
        }
    }

    #[test]
    fn test_cli_requires_subcommand() {
        let result = Cli::try_parse_from(["argspec"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_help() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_resolve_format() {
        assert_eq!(
            resolve_format(SpecFormat::Auto, Path::new("cli.JSON")),
            SpecFormat::Json
        );
        assert_eq!(
            resolve_format(SpecFormat::Auto, Path::new("cli.spec")),
            SpecFormat::Text
        );
        assert_eq!(
            resolve_format(SpecFormat::Text, Path::new("cli.json")),
            SpecFormat::Text
        );
    }

    #[test]
    fn test_summarize() {
        let program =
            ProgramSpec::from_json(r#"{"name":"tool","args":[{"meta":"A"}],"subcmds":[{"name":"run"}]}"#)
                .unwrap();
        assert_eq!(
            summarize(&program),
            "tool: 1 arguments, 1 flags\n  run: 0 arguments, 1 flags\n"
        );
    }
}

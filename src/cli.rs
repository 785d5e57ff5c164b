//! CLI argument parsing for Hookcheck

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Output format for generation reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text format (default)
    Text,
    /// JSON format for machine parsing
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "hookcheck")]
#[command(version)]
#[command(about = "Generate timing proxies for registered hook classes", long_about = None)]
pub struct Cli {
    /// Configuration file (TOML); defaults apply when omitted
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug tracing output to stderr
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate proxies for every instrumentable hook into the file cache
    Generate {
        /// Hook table (TOML, [[hook]] entries)
        #[arg(long, value_name = "FILE")]
        hooks: PathBuf,

        /// Class catalog (JSON)
        #[arg(long, value_name = "FILE")]
        classes: PathBuf,

        /// Output format
        #[arg(long = "format", value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Print the proxy source for one class without caching it
    Show {
        /// Class catalog (JSON)
        #[arg(long, value_name = "FILE")]
        classes: PathBuf,

        /// Class to wrap
        target: String,

        /// Name of the generated proxy class
        new_name: String,
    },

    /// Print the cache key of a proxy class
    Key {
        /// Proxy class name, short or fully-qualified
        class: String,
    },

    /// Remove every cached proxy
    Flush,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_generate() {
        let cli = Cli::parse_from([
            "hookcheck",
            "generate",
            "--hooks",
            "hooks.toml",
            "--classes",
            "classes.json",
        ]);
        match cli.command {
            Command::Generate {
                hooks,
                classes,
                format,
            } => {
                assert_eq!(hooks, PathBuf::from("hooks.toml"));
                assert_eq!(classes, PathBuf::from("classes.json"));
                assert_eq!(format, OutputFormat::Text);
            }
            other => panic!("unexpected command: {other:?}"),
        }
        assert!(!cli.debug);
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_cli_generate_json_format() {
        let cli = Cli::parse_from([
            "hookcheck",
            "generate",
            "--hooks",
            "h.toml",
            "--classes",
            "c.json",
            "--format",
            "json",
        ]);
        assert!(matches!(
            cli.command,
            Command::Generate {
                format: OutputFormat::Json,
                ..
            }
        ));
    }

    #[test]
    fn test_cli_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["hookcheck", "key", "Foo", "--debug", "-c", "hc.toml"]);
        assert!(cli.debug);
        assert_eq!(cli.config, Some(PathBuf::from("hc.toml")));
        assert!(matches!(cli.command, Command::Key { ref class } if class == "Foo"));
    }

    #[test]
    fn test_cli_show_positional_args() {
        let cli = Cli::parse_from([
            "hookcheck",
            "show",
            "--classes",
            "c.json",
            "Vendor\\Hook",
            "myProxy",
        ]);
        match cli.command {
            Command::Show {
                target, new_name, ..
            } => {
                assert_eq!(target, "Vendor\\Hook");
                assert_eq!(new_name, "myProxy");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_requires_subcommand() {
        assert!(Cli::try_parse_from(["hookcheck"]).is_err());
    }
}

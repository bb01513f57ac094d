//! CLI definitions for graphmem.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// graphmem CLI.
#[derive(Debug, Parser)]
#[command(name = "graphmem")]
#[command(about = "Knowledge-graph memory engine for agents")]
#[command(version)]
pub(crate) struct Cli {
    /// Configuration file path (default: ~/.graphmem/graphmem.toml if present)
    #[arg(short, long, global = true, env = "GRAPHMEM_CONFIG")]
    pub config: Option<PathBuf>,

    /// Operational mode, overriding the config file (read, write, full)
    #[arg(short, long, global = true)]
    pub mode: Option<String>,

    /// Log filter, e.g. "info" or "graphmem_core=debug"
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Commands {
    /// List the tools available in the current mode
    Tools {
        /// Include tools the current mode would reject
        #[arg(long)]
        all: bool,
    },

    /// Invoke one tool and print its JSON result
    Call {
        /// Tool id, e.g. create_entity
        tool: String,

        /// Tool parameters as a JSON object
        #[arg(short, long, default_value = "{}")]
        params: String,
    },

    /// Report backend reachability
    Status,

    /// Validate the configuration and exit
    CheckConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_call() {
        let cli = Cli::try_parse_from([
            "graphmem",
            "--mode",
            "full",
            "call",
            "get_entity",
            "--params",
            r#"{"name":"Ada"}"#,
        ])
        .unwrap();
        assert_eq!(cli.mode.as_deref(), Some("full"));
        match cli.command {
            Commands::Call { tool, params } => {
                assert_eq!(tool, "get_entity");
                assert_eq!(params, r#"{"name":"Ada"}"#);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_call_params_default_to_empty_object() {
        let cli = Cli::try_parse_from(["graphmem", "call", "get_schema"]).unwrap();
        match cli.command {
            Commands::Call { params, .. } => assert_eq!(params, "{}"),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_global_options_after_subcommand() {
        let cli = Cli::try_parse_from([
            "graphmem",
            "status",
            "--config",
            "/tmp/graphmem.toml",
            "--log-level",
            "debug",
        ])
        .unwrap();
        assert!(matches!(cli.command, Commands::Status));
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/graphmem.toml")));
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_subcommand_required() {
        assert!(Cli::try_parse_from(["graphmem"]).is_err());
    }
}

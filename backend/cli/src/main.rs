mod config_cmd;
mod terminal_output;
mod watch_cmd;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

use promptcraft_config::{config_dir, config_file_path, load_and_prepare};

#[derive(Parser)]
#[command(name = "promptcraft")]
#[command(about = "Stream PromptCraft optimization sessions from the terminal")]
#[command(version)]
struct Cli {
    /// Config file (default: $PROMPTCRAFT_CONFIG_DIR or ~/.promptcraft/promptcraft.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Follow one session's stream until it completes or fails
    Watch(watch_cmd::WatchArgs),
    /// Print the effective configuration with secrets redacted
    Config {
        /// Also run validation; exits non-zero on errors
        #[arg(long)]
        validate: bool,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let path = cli
        .config
        .unwrap_or_else(|| config_file_path(&config_dir()));
    let config = load_and_prepare(&path).await?;

    logging::init_logger(config.log_dir(), config.log_level());

    match cli.command {
        Commands::Watch(args) => watch_cmd::run(args, &config).await,
        Commands::Config { validate } => config_cmd::run(&config, validate),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use promptcraft_core::SessionMode;

    #[test]
    fn parses_watch_with_overrides() {
        let cli = Cli::try_parse_from([
            "promptcraft",
            "watch",
            "tpl-42",
            "--mode",
            "enhanced-deep",
            "--base-url",
            "http://example.test/api",
            "--json",
        ])
        .unwrap();
        let Commands::Watch(args) = cli.command else {
            panic!("expected watch");
        };
        assert_eq!(args.id, "tpl-42");
        assert_eq!(args.mode, Some(SessionMode::EnhancedDeep));
        assert_eq!(args.base_url.as_deref(), Some("http://example.test/api"));
        assert!(args.json);
        assert!(args.token.is_none());
    }

    #[test]
    fn rejects_unknown_mode() {
        assert!(Cli::try_parse_from(["promptcraft", "watch", "x", "--mode", "turbo"]).is_err());
    }

    #[test]
    fn config_path_is_global() {
        let cli =
            Cli::try_parse_from(["promptcraft", "config", "--validate", "--config", "/tmp/p.yaml"])
                .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/p.yaml")));
        assert!(matches!(cli.command, Commands::Config { validate: true }));
    }
}

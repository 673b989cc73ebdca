// SPDX-FileCopyrightText: 2026 Brokerbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! brokerbot - turns real-estate group chatter into spreadsheet listings.
//!
//! This is the binary entry point.

mod events;
mod prompts;
mod serve;
mod shutdown;

use std::path::PathBuf;

use brokerbot_config::{BrokerConfig, ConfigError};
use brokerbot_pipeline::PromptStore;
use clap::{Parser, Subcommand};

/// brokerbot - listens to real-estate groups and answers questions about the listings.
#[derive(Parser, Debug)]
#[command(name = "brokerbot", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard locations.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Connect to the chat network and process messages (default).
    Serve {
        /// Print every bus event to stdout as one JSON line.
        #[arg(long)]
        json_events: bool,
    },
    /// Inspect the configuration.
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
    /// Manage prompt templates.
    Prompts {
        #[command(subcommand)]
        action: PromptCommands,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Validate the configuration, including what `serve` needs.
    Check,
}

#[derive(Subcommand, Debug)]
enum PromptCommands {
    /// List prompts and whether they are overridden.
    List,
    /// Print the prompt currently in effect.
    Show { id: String },
    /// Replace a prompt with the contents of a file.
    Set { id: String, file: PathBuf },
}

fn load_config(path: Option<&PathBuf>) -> Result<BrokerConfig, Vec<ConfigError>> {
    match path {
        Some(path) => brokerbot_config::load_and_validate_path(path),
        None => brokerbot_config::load_and_validate(),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_ref()) {
        Ok(config) => config,
        Err(errors) => {
            brokerbot_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    match cli.command.unwrap_or(Commands::Serve { json_events: false }) {
        Commands::Serve { json_events } => {
            if let Err(errors) = brokerbot_config::validate_serve_requirements(&config) {
                brokerbot_config::render_errors(&errors);
                std::process::exit(1);
            }
            if let Err(e) = serve::run_serve(config, json_events).await {
                eprintln!("error: {e}");
                std::process::exit(1);
            }
        }
        Commands::Config {
            action: ConfigCommands::Check,
        } => match brokerbot_config::validate_serve_requirements(&config) {
            Ok(()) => println!("brokerbot: configuration OK (bot.name={})", config.bot.name),
            Err(errors) => {
                brokerbot_config::render_errors(&errors);
                std::process::exit(1);
            }
        },
        Commands::Prompts { action } => {
            let store = PromptStore::new(&config.prompts.dir);
            let result = match action {
                PromptCommands::List => {
                    print!("{}", prompts::list(&store).await);
                    Ok(())
                }
                PromptCommands::Show { id } => {
                    prompts::show(&store, &id).await.map(|text| println!("{text}"))
                }
                PromptCommands::Set { id, file } => prompts::set(&store, &id, &file)
                    .await
                    .map(|()| println!("prompt {id} updated")),
            };
            if let Err(e) = result {
                eprintln!("error: {e}");
                std::process::exit(1);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serve_is_the_default_command() {
        let cli = Cli::try_parse_from(["brokerbot"]).unwrap();
        assert!(cli.command.is_none());

        let cli = Cli::try_parse_from(["brokerbot", "serve", "--json-events"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Serve { json_events: true })
        ));
    }

    #[test]
    fn prompt_commands_parse() {
        let cli = Cli::try_parse_from([
            "brokerbot",
            "--config",
            "/tmp/b.toml",
            "prompts",
            "set",
            "query_summarize",
            "summary.txt",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/b.toml")));
        match cli.command {
            Some(Commands::Prompts {
                action: PromptCommands::Set { id, file },
            }) => {
                assert_eq!(id, "query_summarize");
                assert_eq!(file, PathBuf::from("summary.txt"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn config_check_parses() {
        let cli = Cli::try_parse_from(["brokerbot", "config", "check"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Config {
                action: ConfigCommands::Check
            })
        ));
    }

    #[test]
    fn explicit_config_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("brokerbot.toml");
        std::fs::write(&path, "[bot]\nname = \"office\"\n[monitor]\ngroups = [\"1@g.us\"]\n")
            .unwrap();
        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.bot.name, "office");
        assert_eq!(config.monitor.groups, vec!["1@g.us".to_string()]);
    }
}

//! Command-line interface
//!
//! Every command also works inside the interactive REPL started when no
//! command is given.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use colored::Colorize;

use crate::config::Config;
use crate::models::provider::Provider;
use crate::services::analytics_service::Period;
use crate::services::export_service::{ExportFormat, ExportKind};

pub mod config;
pub mod format;
pub mod init;
pub mod logs;
pub mod models;
pub mod playground;
pub mod prompts;

/// Prompt workbench for OpenAI, Anthropic, Gemini, OpenRouter and Ollama
#[derive(Parser, Debug)]
#[command(name = "easyai")]
#[command(version)]
pub struct Cli {
    /// Project directory holding the easyai/ workspace (defaults to the current directory)
    #[arg(long, global = true)]
    pub project: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the easyai/ workspace with example files
    Init {
        /// Overwrite settings and the env template if they exist
        #[arg(long)]
        force: bool,
    },
    /// Start the dashboard API server
    Ui {
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Run a saved prompt
    Prompt {
        /// Prompt name, or category/name
        name: String,
        #[arg(short, long)]
        model: Option<String>,
        /// Text for {{input}}, appended to the prompt when it has no such placeholder
        #[arg(short, long)]
        input: Option<String>,
        /// Variable value as key=value (repeatable)
        #[arg(long = "var", value_parser = parse_key_val)]
        vars: Vec<(String, String)>,
        #[arg(long)]
        provider: Option<Provider>,
    },
    /// Show recent calls
    Logs {
        #[arg(short, long, default_value_t = 20)]
        number: usize,
        /// Substring match on model, provider, prompt or response
        #[arg(short, long)]
        filter: Option<String>,
    },
    /// Read or change configuration
    Config {
        #[arg(short, long)]
        list: bool,
        #[arg(short, long, value_name = "KEY")]
        get: Option<String>,
        #[arg(short, long, value_name = "KEY=VALUE")]
        set: Option<String>,
    },
    /// List available models
    Models {
        #[arg(short, long)]
        provider: Option<Provider>,
        #[arg(short, long)]
        search: Option<String>,
        #[arg(short, long)]
        detailed: bool,
        /// Send a short test prompt to each listed model
        #[arg(short, long)]
        test: bool,
    },
    /// Manage saved prompts
    Prompts {
        #[arg(short, long)]
        list: bool,
        #[arg(short, long, value_name = "CATEGORY/NAME")]
        create: Option<String>,
        #[arg(short, long, value_name = "CATEGORY/NAME")]
        edit: Option<String>,
        #[arg(short, long, value_name = "CATEGORY/NAME")]
        delete: Option<String>,
        #[arg(short, long)]
        search: Option<String>,
        /// Content for --create/--edit (opens $EDITOR when omitted)
        #[arg(long)]
        content: Option<String>,
        /// Suggested model stored with the prompt
        #[arg(long)]
        model: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    /// Try a prompt against one or more models
    Playground {
        #[arg(short, long)]
        prompt: Option<String>,
        /// Comma-separated model list
        #[arg(short, long, value_delimiter = ',')]
        models: Vec<String>,
        /// Read the prompt from a file
        #[arg(short, long)]
        file: Option<PathBuf>,
        /// Print a side-by-side summary
        #[arg(short, long)]
        compare: bool,
        #[arg(long = "var", value_parser = parse_key_val)]
        vars: Vec<(String, String)>,
    },
    /// Usage and cost report
    Analytics {
        #[arg(short, long, default_value = "all")]
        period: Period,
        #[arg(long)]
        provider: Option<Provider>,
        #[arg(short, long)]
        model: Option<String>,
        /// Write the report to a .json or .csv file
        #[arg(short, long)]
        export: Option<PathBuf>,
        #[arg(short, long)]
        detailed: bool,
    },
    /// Export logs, analytics or prompts
    Export {
        #[arg(short = 't', long = "type", default_value = "logs")]
        kind: ExportKind,
        #[arg(short, long, default_value = "json")]
        format: ExportFormat,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (k, v) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got `{s}`"))?;
    if k.trim().is_empty() {
        return Err(format!("empty key in `{s}`"));
    }
    Ok((k.trim().to_string(), v.to_string()))
}

/// Run the CLI command
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::from_env(cli.project)?;
    match cli.command {
        Some(command) => execute(command, &config).await,
        None => repl(&config).await,
    }
}

async fn execute(command: Commands, config: &Config) -> anyhow::Result<()> {
    match command {
        Commands::Init { force } => init::run(config, force),
        Commands::Ui { port } => {
            let addr = match port {
                Some(port) => format!("127.0.0.1:{port}"),
                None if std::env::var_os("EASYAI_LISTEN_ADDR").is_some() => config.listen_addr.clone(),
                None => format!("127.0.0.1:{}", crate::config::Settings::load(&config.workspace).port),
            };
            let state = crate::state::AppState::new(config.clone())?;
            crate::server::serve(state, &addr).await
        }
        Commands::Prompt {
            name,
            model,
            input,
            vars,
            provider,
        } => prompts::run_prompt(config, &name, model, input, vars, provider).await,
        Commands::Logs { number, filter } => logs::show_logs(config, number, filter).await,
        // Listing is the default, so `--list` needs no branch of its own.
        Commands::Config { list: _, get, set } => config::run(config, get, set),
        Commands::Models {
            provider,
            search,
            detailed,
            test,
        } => models::run(config, provider, search, detailed, test).await,
        Commands::Prompts {
            list: _,
            create,
            edit,
            delete,
            search,
            content,
            model,
            description,
        } => {
            let action = if let Some(r) = create {
                prompts::Action::Create(r)
            } else if let Some(r) = edit {
                prompts::Action::Edit(r)
            } else if let Some(r) = delete {
                prompts::Action::Delete(r)
            } else if let Some(q) = search {
                prompts::Action::Search(q)
            } else {
                prompts::Action::List
            };
            prompts::run(config, action, content, model, description).await
        }
        Commands::Playground {
            prompt,
            models,
            file,
            compare,
            vars,
        } => playground::run(config, prompt, models, file, compare, vars).await,
        Commands::Analytics {
            period,
            provider,
            model,
            export,
            detailed,
        } => logs::show_analytics(config, period, provider, model, export, detailed).await,
        Commands::Export { kind, format, output } => logs::export(config, kind, format, output).await,
    }
}

/// Split a REPL line into arguments, honouring single and double quotes.
fn split_args(line: &str) -> Result<Vec<String>, String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut quote: Option<char> = None;

    for c in line.chars() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), c) => current.push(c),
            (None, '"' | '\'') => {
                quote = Some(c);
                in_token = true;
            }
            (None, c) if c.is_whitespace() => {
                if in_token {
                    args.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            (None, c) => {
                current.push(c);
                in_token = true;
            }
        }
    }
    if quote.is_some() {
        return Err("unterminated quote".to_string());
    }
    if in_token {
        args.push(current);
    }
    Ok(args)
}

async fn repl(config: &Config) -> anyhow::Result<()> {
    println!("{} interactive mode. Type {} for commands, {} to leave.", "easyai".bold().cyan(), "help".bold(), "exit".bold());

    loop {
        let line = match inquire::Text::new("easyai ›").prompt() {
            Ok(line) => line,
            Err(inquire::InquireError::OperationCanceled | inquire::InquireError::OperationInterrupted) => break,
            Err(e) => return Err(e.into()),
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if matches!(line, "exit" | "quit") {
            break;
        }

        let args = match split_args(line) {
            Ok(args) => args,
            Err(e) => {
                format::warn(e);
                continue;
            }
        };
        let cli = match Cli::try_parse_from(std::iter::once("easyai".to_string()).chain(args)) {
            Ok(cli) => cli,
            Err(e) => {
                let _ = e.print();
                continue;
            }
        };

        let Some(command) = cli.command else {
            continue;
        };
        let scoped;
        let config = match cli.project {
            Some(dir) => {
                scoped = Config::from_env(Some(dir))?;
                &scoped
            }
            None => config,
        };
        if let Err(e) = execute(command, config).await {
            eprintln!("{} {:#}", "error:".red().bold(), e);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_quoted_arguments() {
        assert_eq!(
            split_args(r#"playground -p "Hello there" --models gpt-4o,claude-3-haiku"#).unwrap(),
            vec!["playground", "-p", "Hello there", "--models", "gpt-4o,claude-3-haiku"]
        );
        assert_eq!(split_args("a '' b").unwrap(), vec!["a", "", "b"]);
        assert!(split_args("oops \"open").is_err());
    }

    #[test]
    fn parses_commands() {
        let cli = Cli::try_parse_from(["easyai", "playground", "-m", "gpt-4o,llama3", "--var", "x=1"]).unwrap();
        match cli.command {
            Some(Commands::Playground { models, vars, .. }) => {
                assert_eq!(models, vec!["gpt-4o", "llama3"]);
                assert_eq!(vars, vec![("x".to_string(), "1".to_string())]);
            }
            other => panic!("unexpected {other:?}"),
        }

        let cli = Cli::try_parse_from(["easyai", "analytics", "--period", "week", "--provider", "google"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Analytics {
                period: Period::Week,
                provider: Some(Provider::Gemini),
                ..
            })
        ));

        assert!(Cli::try_parse_from(["easyai", "export", "--format", "xml"]).is_err());
        assert!(Cli::try_parse_from(["easyai"]).unwrap().command.is_none());
    }

    #[test]
    fn key_value_parsing() {
        assert_eq!(parse_key_val("a=b=c").unwrap(), ("a".to_string(), "b=c".to_string()));
        assert!(parse_key_val("novalue").is_err());
    }
}

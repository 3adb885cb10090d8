//! Proposal Agent - conversational proposal writer.
//!
//! Serves the chat API, runs an interactive terminal session, or renders
//! proposal text straight to PDF / Word.

use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use proposal_agent::agent::today;
use proposal_agent::core::{Config, DocumentsConfig, LlmConfig};
use proposal_agent::{
    extract_user_preferences, render, DocumentFormat, OpenAICompatibleProvider, ProposalService,
};

/// Conversational web-development proposal writer
#[derive(Parser)]
#[command(name = "proposal-agent")]
#[command(author, version, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use this config file instead of the default lookup
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the HTTP API
    Serve {
        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Chat with the agent in the terminal
    Chat,

    /// Render proposal text to a document
    Render {
        /// Proposal text file ("-" for stdin)
        input: PathBuf,

        /// Output format (pdf, docx)
        #[arg(short, long)]
        format: Option<DocumentFormat>,

        /// Document title
        #[arg(short, long)]
        title: Option<String>,

        /// Date printed under the title (PDF only, defaults to today)
        #[arg(short, long)]
        date: Option<String>,

        /// Output file (defaults to a name derived from the title)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show the preferences extracted from a message, as JSON
    Extract {
        /// Message text (reads stdin when omitted)
        text: Option<String>,
    },

    /// Show configuration
    Config {
        /// Show config file path
        #[arg(long)]
        path: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Setup logging; RUST_LOG wins over --verbose
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(io::stderr))
        .with(filter)
        .init();

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Serve { host, port } => cmd_serve(config, host, port)?,
        Commands::Chat => cmd_chat(&config)?,
        Commands::Render { input, format, title, date, output } => {
            let format = format.unwrap_or(config.documents.default_format);
            cmd_render(&input, format, title.as_deref(), date, output)?;
        }
        Commands::Extract { text } => cmd_extract(text)?,
        Commands::Config { path } => cmd_config(&config, path)?,
        Commands::Completions { shell } => cmd_completions(shell),
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load_from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => Config::load(),
    }
}

fn build_service(llm: &LlmConfig, documents: &DocumentsConfig) -> Result<Arc<ProposalService>> {
    let provider = OpenAICompatibleProvider::from_config(llm)?;
    tracing::info!(model = provider.model(), base_url = %llm.base_url, "Language model configured");

    Ok(Arc::new(ProposalService::with_model(Arc::new(provider), documents)))
}

/// Run the HTTP server.
fn cmd_serve(mut config: Config, host: Option<String>, port: Option<u16>) -> Result<()> {
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    let service = build_service(&config.llm, &config.documents)?;

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(proposal_agent::api::run_server(service, &config.server))
}

/// Interactive terminal session.
fn cmd_chat(config: &Config) -> Result<()> {
    // The document tool writes every generated file into the output dir.
    let mut documents = config.documents.clone();
    let output_dir = documents.output_dir.get_or_insert_with(|| PathBuf::from("output")).clone();
    let service = build_service(&config.llm, &documents)?;

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        println!("Describe your project. Say \"make pdf\" or \"make doc\" for a document.");
        println!("Commands: reset, draft, exit\n");

        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        loop {
            print!("> ");
            io::stdout().flush()?;

            let Some(line) = lines.next_line().await? else {
                break;
            };

            match line.trim() {
                "" => continue,
                "exit" | "quit" => break,
                "reset" => {
                    service.reset().await;
                    println!("Session reset.\n");
                    continue;
                }
                "draft" => {
                    let draft = service.current_draft().await;
                    println!("{}\n", if draft.is_empty() { "(no draft yet)" } else { draft.as_str() });
                    continue;
                }
                _ => {}
            }

            let reply = service.interact(&line).await?;
            println!("\n{}\n", reply.reply);

            if let Some(document) = reply.document {
                println!("Saved {}\n", output_dir.join(&document.filename).display());
            }
        }

        Ok::<(), anyhow::Error>(())
    })
}

/// Render a proposal file.
fn cmd_render(
    input: &Path,
    format: DocumentFormat,
    title: Option<&str>,
    date: Option<String>,
    output: Option<PathBuf>,
) -> Result<()> {
    let content = if input == Path::new("-") {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(input)
            .with_context(|| format!("Failed to read {}", input.display()))?
    };

    let date = date.unwrap_or_else(today);
    let document = render(format, title.unwrap_or_default(), &content, Some(&date))?;

    let path = output.unwrap_or_else(|| PathBuf::from(&document.filename));
    std::fs::write(&path, &document.bytes)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    println!("{} ({} bytes)", path.display(), document.len());
    Ok(())
}

/// Print extracted preferences.
fn cmd_extract(text: Option<String>) -> Result<()> {
    let text = match text {
        Some(text) => text,
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };

    let preferences = extract_user_preferences(&text);
    println!("{}", serde_json::to_string_pretty(&preferences)?);
    Ok(())
}

/// Show configuration.
fn cmd_config(config: &Config, show_path: bool) -> Result<()> {
    if show_path {
        match Config::resolve_path() {
            Some(path) => println!("{}", path.display()),
            None => {
                if let Some(dir) = Config::config_dir() {
                    println!("{} (not found, using defaults)", dir.join("config.toml").display());
                }
            }
        }
        return Ok(());
    }

    println!("{}", config.to_toml()?);
    Ok(())
}

/// Generate shell completions.
fn cmd_completions(shell: Shell) {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "proposal-agent", &mut io::stdout());
}

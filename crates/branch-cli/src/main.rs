mod commands;
mod render;

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use colored::Colorize;
use session_manager::{
    Action, AppConfig, ChatSession, FileConversationStorage, GeminiClient, RequestParams,
    SessionManager,
};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use commands::{Command, HELP};

const SESSION_ID: &str = "local";

#[derive(Parser)]
#[command(name = "branch-cli")]
#[command(about = "Branching conversations with Gemini")]
#[command(version)]
struct Cli {
    /// Path to config.toml
    #[arg(long)]
    config: Option<PathBuf>,

    /// Where conversations are saved
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Model key from the catalog, e.g. "Gemini 2.5 Pro"
    #[arg(long)]
    model: Option<String>,

    #[arg(long)]
    temperature: Option<f32>,

    #[arg(long)]
    seed: Option<u64>,

    /// Used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,
}

type Manager = SessionManager<FileConversationStorage>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)))
        .with(
            fmt::layer()
                .with_target(true)
                .with_line_number(true)
                .with_writer(io::stderr),
        )
        .init();

    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    if let Some(model) = cli.model {
        config.default_model = model;
    }
    let catalog = config.catalog()?;

    let api_key = config
        .api_key
        .clone()
        .context("No Gemini API key: set GEMINI_API_KEY or api_key in config.toml")?;
    let mut client = GeminiClient::new(api_key);
    if let Some(base) = &config.api_base {
        client = client.with_base_url(base);
    }

    let manager = SessionManager::new(
        FileConversationStorage::new(config.conversations_dir()),
        Arc::new(client),
        catalog,
    );

    let shared = manager.session(SESSION_ID).await;
    let mut session = shared.lock().await;
    if let Some(temperature) = cli.temperature {
        session.settings.set_temperature(temperature)?;
    }
    if let Some(seed) = cli.seed {
        session.settings.seed = seed;
    }

    tracing::info!(
        model = %session.settings.model_key,
        temperature = session.settings.temperature(),
        seed = session.settings.seed,
        "Starting branch-cli"
    );
    run_repl(&manager, &mut session).await
}

async fn run_repl(manager: &Manager, session: &mut ChatSession) -> anyhow::Result<()> {
    println!("{}", "Branching chat".cyan().bold());
    println!(
        "{}",
        format!("Model: {}. Type /help for commands.", session.settings.model_key).dimmed()
    );
    println!();

    loop {
        print!("{} ", ">".cyan().bold());
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            break;
        }

        let command = match Command::parse(&input) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                println!("{}", e.to_string().red());
                continue;
            }
        };
        if command == Command::Quit {
            break;
        }
        if let Err(e) = execute(manager, session, command).await {
            println!("{}", format!("Error: {e}").red());
        }
        println!();
    }

    if !session.conversation.tree().is_empty() {
        let summary = manager.save_conversation(session).await?;
        println!("{}", format!("Saved as {}", summary.id).dimmed());
    }
    Ok(())
}

async fn execute(manager: &Manager, session: &mut ChatSession, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Prompt(prompt) => {
            let result = manager.submit_prompt(session, &prompt).await;
            render::print_transcript(&session.transcript());
            result?;
        }
        Command::Tree => render::print_sidebar(&session.sidebar()),
        Command::History => render::print_transcript(&session.transcript()),
        Command::Unfold => {
            session.unfold();
            render::print_transcript(&session.transcript());
        }
        Command::Goto(id) => deliver(manager, session, Action::Navigate(id.into())).await,
        Command::Delete(id) => deliver(manager, session, Action::Delete(id.into())).await,
        Command::Branch(text) => deliver(manager, session, Action::BranchFromSelection(text)).await,
        Command::Retry => {
            let result = manager.retry_reply(session).await;
            render::print_transcript(&session.transcript());
            result?;
        }
        Command::New => {
            session.new_chat();
            println!("{}", "Back at the top. Ask a new question.".dimmed());
        }
        Command::Save => {
            let summary = manager.save_conversation(session).await?;
            println!("Saved {} {}", summary.id.cyan(), summary.title);
        }
        Command::List => render::print_conversations(&manager.list_conversations().await?),
        Command::Load(id) => {
            manager.load_conversation(session, &id).await?;
            render::print_sidebar(&session.sidebar());
        }
        Command::Usage => render::print_usage(&session.usage),
        Command::Models => render::print_models(manager.catalog(), &session.settings.model_key),
        Command::Help => println!("{HELP}"),
        Command::Quit => {}
    }
    Ok(())
}

/// Deliver an action the way a UI delivers its request parameters, then run
/// the same processing a page render would: delete/navigate, then branching.
async fn deliver(manager: &Manager, session: &mut ChatSession, action: Action) {
    let mut params = RequestParams::new();
    action.enqueue(&mut params);

    for outcome in manager.process_url_actions(session, &mut params) {
        render::print_outcome(&outcome);
    }
    if let Some(outcome) = manager.process_branching(session, &mut params).await {
        render::print_outcome(&outcome);
    }
    render::print_transcript(&session.transcript());
}

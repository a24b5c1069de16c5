//! parley - terminal client for the parley agent service

mod commands;
mod config;
mod storage;
mod ui;
mod utils;

use clap::Parser;
use std::io::{self, Write};
use std::sync::Arc;

use commands::{CommandResult, Direction, View};
use parley_client::{ClientConfig, HttpClient};
use parley_session::{ConversationStore, MemoryStore, PageOutcome, Session, SessionHandle};

/// parley - chat with the agent service from a terminal
#[derive(Parser, Debug)]
#[command(name = "parley")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Agent service root (default: http://127.0.0.1:8000/api)
    #[arg(long)]
    base_url: Option<String>,

    /// Rows per page in the usage and history views
    #[arg(long)]
    page_size: Option<u32>,

    /// Continue this conversation instead of the saved one
    #[arg(long)]
    conversation: Option<String>,

    /// Show token usage after every reply
    #[arg(long)]
    usage: bool,

    /// Run in non-interactive mode with a single message
    #[arg(short = 'c', long)]
    command: Option<String>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Initialize config file
    #[arg(long)]
    init_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if args.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("parley=debug,parley_client=debug,parley_session=debug")
            .with_writer(io::stderr)
            .init();
    }

    if args.init_config {
        match config::Config::init() {
            Ok(path) => {
                println!("Config file created at: {}", path.display());
                println!("\nExample config:\n{}", config::example_config());
            }
            Err(e) => {
                eprintln!("Error creating config: {}", e);
                std::process::exit(1);
            }
        }
        return Ok(());
    }

    let cfg = config::Config::load();

    // CLI takes precedence over the config file
    let base_url = args.base_url.clone().unwrap_or_else(|| cfg.base_url());
    let mut session_config = cfg.session_config();
    if let Some(page_size) = args.page_size.filter(|n| *n > 0) {
        session_config.page_size = page_size;
    }
    session_config.show_usage |= args.usage;

    let mut client_config = ClientConfig::new(base_url);
    if let Some(timeout) = cfg.connect_timeout() {
        client_config = client_config.with_connect_timeout(timeout);
    }
    let api = Arc::new(HttpClient::new(client_config)?);

    let store: Arc<dyn ConversationStore> = if cfg.persist_conversation() {
        let file = storage::FileConversationStore::new(storage::default_path());
        tracing::debug!("Conversation id stored at {}", file.path().display());
        Arc::new(file)
    } else {
        Arc::new(MemoryStore::new())
    };
    tracing::debug!("Using agent service at {}", api.base_url());

    let session = Session::with_store(api, session_config, store)
        .with_observer(Arc::new(ui::StdoutObserver::new(args.verbose)));

    if let Some(ref id) = args.conversation {
        session.switch_conversation(id).await;
    }

    if let Some(command) = args.command {
        return run_command(&session, &command).await;
    }

    run_interactive(&session).await
}

async fn run_command(session: &Session, message: &str) -> anyhow::Result<()> {
    if message.trim().is_empty() {
        return Ok(());
    }
    match session.send(message).await {
        Ok(report) => {
            if session.usage_view_visible() {
                println!("{}", ui::render_usage(&session.usage().snapshot()));
            }
            tracing::debug!("Turn finished in conversation {:?}", report.conversation_id);
            Ok(())
        }
        Err(e) => {
            if let Some(message) = turn_error_message(&e) {
                eprintln!("Error: {}", message);
            }
            std::process::exit(1);
        }
    }
}

/// What to print when a turn fails, or None when the observer already showed it
fn turn_error_message(err: &parley_session::Error) -> Option<String> {
    match err {
        parley_session::Error::Stream(_) => None,
        other => Some(other.to_string()),
    }
}

/// Ctrl-C aborts the streaming turn, or exits when idle
fn spawn_interrupt_handler(handle: SessionHandle) {
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if handle.is_running() {
                handle.abort();
            } else {
                std::process::exit(130);
            }
        }
    });
}

async fn run_interactive(session: &Session) -> anyhow::Result<()> {
    spawn_interrupt_handler(session.handle());

    if std::io::IsTerminal::is_terminal(&std::io::stderr()) {
        match session.conversation_id() {
            Some(id) => eprintln!("parley (conversation {})", id),
            None => eprintln!("parley (new conversation)"),
        }
        eprintln!("Type /help for commands.");
        eprintln!();
    }

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            // EOF
            break;
        }

        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        if let Some(result) = commands::execute_command(input) {
            if result == CommandResult::Exit {
                break;
            }
            apply_command(session, result).await;
            println!();
            continue;
        }

        println!();
        match session.send(input).await {
            Ok(_) => {
                if session.usage_view_visible() {
                    println!("{}", ui::render_usage(&session.usage().snapshot()));
                }
            }
            Err(parley_session::Error::Aborted) => println!("\n[aborted]"),
            Err(e) => {
                if let Some(message) = turn_error_message(&e) {
                    eprintln!("\nError: {}", message);
                }
            }
        }
        println!();
    }

    Ok(())
}

async fn apply_command(session: &Session, result: CommandResult) {
    match result {
        CommandResult::Message(msg) => println!("{}", msg),
        CommandResult::ShowView { view, page } => {
            if view == View::Usage {
                session.set_usage_view_visible(true);
            }
            let outcome = match view {
                View::Usage => session.usage().go_to_page(page).await,
                View::History => session.history().go_to_page(page).await,
                View::Uploads => session.uploads().go_to_page(page).await,
            };
            show_outcome(session, view, outcome);
        }
        CommandResult::Navigate { view, direction } => {
            let outcome = match (view, direction) {
                (View::Usage, Direction::Next) => session.usage().next_page().await,
                (View::Usage, Direction::Prev) => session.usage().prev_page().await,
                (View::History, Direction::Next) => session.history().next_page().await,
                (View::History, Direction::Prev) => session.history().prev_page().await,
                (View::Uploads, Direction::Next) => session.uploads().next_page().await,
                (View::Uploads, Direction::Prev) => session.uploads().prev_page().await,
            };
            show_outcome(session, view, outcome);
        }
        CommandResult::Switch(id) => {
            session.switch_conversation(&id).await;
            println!("Switched to conversation {}", id);
        }
        CommandResult::NewConversation => {
            session.new_conversation();
            println!("Started a new conversation.");
        }
        CommandResult::HideUsage => {
            session.set_usage_view_visible(false);
            println!("Usage view hidden.");
        }
        CommandResult::Info => match session.agent_info().await {
            Ok(info) => {
                let stats = session
                    .knowledge_stats()
                    .await
                    .map_err(|e| tracing::warn!("Failed to load knowledge stats: {}", e))
                    .ok();
                println!("{}", ui::render_info(&info, stats.as_ref()));
            }
            Err(e) => eprintln!("Error: {}", e),
        },
        CommandResult::Knowledge { question, top_k } => {
            match session.query_knowledge(&question, top_k, None).await {
                Ok(answer) => println!("{}", ui::render_answer(&answer)),
                Err(e) => eprintln!("Error: {}", e),
            }
        }
        CommandResult::Unknown(cmd) => {
            println!("Unknown command: /{}", cmd);
            println!("Type /help for available commands.");
        }
        CommandResult::Exit => {}
    }
}

fn show_outcome(session: &Session, view: View, outcome: parley_session::Result<PageOutcome>) {
    match outcome {
        Ok(PageOutcome::Skipped) => {
            if view == View::Usage && session.conversation_id().is_none() {
                println!("No conversation yet. Send a message first.");
                return;
            }
            println!("No such page.");
            return;
        }
        Ok(PageOutcome::Stale) => {
            tracing::debug!("Dropped a stale {} page", view.name());
        }
        Ok(PageOutcome::Fetched) => {}
        Err(e) => {
            eprintln!("Error loading {}: {}", view.name(), e);
            return;
        }
    }

    let rendered = match view {
        View::Usage => ui::render_usage(&session.usage().snapshot()),
        View::History => {
            let current = session.conversation_id();
            ui::render_history(&session.history().snapshot(), current.as_deref())
        }
        View::Uploads => ui::render_uploads(&session.uploads().snapshot()),
    };
    println!("{}", rendered);
}

//! Slash commands for interactive mode

mod knowledge;
mod view;

pub use knowledge::KnowledgeCommand;
pub use view::{Direction, View, ViewCommand};

/// Result of executing a slash command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandResult {
    /// Show a message to the user (not sent to the agent)
    Message(String),
    /// Open a view at a page (page 1 when none given)
    ShowView { view: View, page: u32 },
    /// Step a view one page forward or back
    Navigate { view: View, direction: Direction },
    /// Focus another conversation
    Switch(String),
    /// Start a new conversation
    NewConversation,
    /// Stop showing the usage view after turns
    HideUsage,
    /// Show deployment info and index size
    Info,
    /// Ask the knowledge base
    Knowledge { question: String, top_k: Option<u32> },
    /// Exit the application
    Exit,
    /// Unknown command
    Unknown(String),
}

/// Parse a slash command
pub fn execute_command(input: &str) -> Option<CommandResult> {
    let input = input.trim();

    let rest = input.strip_prefix('/')?;
    let parts: Vec<&str> = rest.splitn(2, ' ').collect();
    let command = parts[0].to_lowercase();
    let args = parts.get(1).map(|s| s.trim()).unwrap_or("");

    Some(match command.as_str() {
        "help" | "h" | "?" => CommandResult::Message(help_message()),

        "usage" | "u" => ViewCommand::show(View::Usage, args),

        "history" => ViewCommand::show(View::History, args),

        "uploads" => ViewCommand::show(View::Uploads, args),

        "next" | "n" => ViewCommand::navigate(Direction::Next, args),

        "prev" | "p" => ViewCommand::navigate(Direction::Prev, args),

        "switch" | "s" => {
            if args.is_empty() {
                CommandResult::Message("Usage: /switch <conversation-id>".to_string())
            } else {
                CommandResult::Switch(args.to_string())
            }
        }

        "new" => CommandResult::NewConversation,

        "hide" => CommandResult::HideUsage,

        "info" | "i" => CommandResult::Info,

        "kb" => KnowledgeCommand::execute(args),

        "quit" | "exit" | "q" => CommandResult::Exit,

        _ => CommandResult::Unknown(command),
    })
}

fn help_message() -> String {
    r#"Available commands:
  /help, /h, /?          Show this help message
  /usage, /u [page]      Show token usage of this conversation (and keep it updated)
  /history [page]        Show known conversations
  /uploads [page]        Show indexed uploads
  /next, /n <view>       Next page of usage, history or uploads
  /prev, /p <view>       Previous page of usage, history or uploads
  /switch, /s <id>       Continue another conversation
  /new                   Start a new conversation
  /hide                  Stop showing usage after each reply
  /info, /i              Show deployment info and knowledge index size
  /kb [-k N] <question>  Ask the knowledge base
  /quit, /exit, /q       Exit parley

Examples:
  /usage 2               Second page of token usage
  /next history          Next page of conversations
  /kb -k 3 what is the refund policy?"#
        .to_string()
}

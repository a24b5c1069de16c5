//! /kb command - ask the knowledge base

use super::CommandResult;

pub struct KnowledgeCommand;

impl KnowledgeCommand {
    /// Parse `[-k N] <question>`
    pub fn execute(args: &str) -> CommandResult {
        let (top_k, question) = match args.strip_prefix("-k ") {
            Some(rest) => {
                let rest = rest.trim_start();
                let (n, question) = rest.split_once(' ').unwrap_or((rest, ""));
                match n.parse::<u32>() {
                    Ok(k) if k >= 1 => (Some(k), question.trim()),
                    _ => {
                        return CommandResult::Message(format!(
                            "Invalid result count: '{}'",
                            n
                        ));
                    }
                }
            }
            None => (None, args),
        };

        if question.is_empty() {
            return CommandResult::Message("Usage: /kb [-k N] <question>".to_string());
        }
        CommandResult::Knowledge {
            question: question.to_string(),
            top_k,
        }
    }
}

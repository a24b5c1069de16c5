//! /usage, /history, /uploads, /next and /prev - paged views

use super::CommandResult;

/// A paged collection the CLI can show
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Usage,
    History,
    Uploads,
}

impl View {
    pub fn name(self) -> &'static str {
        match self {
            View::Usage => "usage",
            View::History => "history",
            View::Uploads => "uploads",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "usage" | "u" => Some(View::Usage),
            "history" | "h" => Some(View::History),
            "uploads" | "up" => Some(View::Uploads),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Next,
    Prev,
}

pub struct ViewCommand;

impl ViewCommand {
    pub fn show(view: View, args: &str) -> CommandResult {
        if args.is_empty() {
            return CommandResult::ShowView { view, page: 1 };
        }
        match args.parse::<u32>() {
            Ok(page) if page >= 1 => CommandResult::ShowView { view, page },
            _ => CommandResult::Message(format!(
                "Invalid page: '{}'\nUsage: /{} [page]",
                args,
                view.name()
            )),
        }
    }

    pub fn navigate(direction: Direction, args: &str) -> CommandResult {
        match View::parse(args) {
            Some(view) => CommandResult::Navigate { view, direction },
            None => CommandResult::Message(format!(
                "Unknown view: '{}'\nValid views: usage, history, uploads",
                args
            )),
        }
    }
}

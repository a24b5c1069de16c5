//! Terminal rendering: streamed replies and page tables

use std::io::{self, Write};

use parley_client::{
    AgentInfo, HistoryEntry, KnowledgeAnswer, KnowledgeStats, UploadRecord, UsageRecord,
    format_timestamp,
};
use parley_session::{PageView, SessionObserver};

use crate::utils::{format_bytes, format_number, truncate_chars};

/// Prints deltas as they arrive
pub struct StdoutObserver {
    verbose: bool,
}

impl StdoutObserver {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl SessionObserver for StdoutObserver {
    fn on_delta(&self, text: &str) {
        print!("{}", text);
        io::stdout().flush().ok();
    }

    fn on_conversation_established(&self, conversation_id: &str) {
        if self.verbose {
            eprintln!("[conversation {}]", conversation_id);
        }
    }

    fn on_error(&self, message: &str) {
        eprintln!("\nError: {}", message);
    }

    fn on_done(&self, _conversation_id: Option<&str>) {
        println!();
    }
}

fn footer<T>(view: &PageView<T>) -> String {
    let mut line = format!(
        "Page {}/{} ({} total)",
        view.page,
        view.page_count,
        format_number(view.total)
    );
    if view.has_prev {
        line.push_str("  /prev");
    }
    if view.has_next {
        line.push_str("  /next");
    }
    line
}

pub fn render_usage(view: &PageView<UsageRecord>) -> String {
    if !view.has_context {
        return "No conversation yet. Send a message first.".to_string();
    }
    if view.items.is_empty() {
        return "No token usage recorded for this conversation.".to_string();
    }

    let mut output = format!(
        "{:>4}  {:>8}  {:>8}  {:>8}  {:<16}  {}\n",
        "Turn", "Input", "Output", "Total", "Time", "Model"
    );
    output.push_str(&"-".repeat(64));
    output.push('\n');
    for record in &view.items {
        output.push_str(&format!(
            "{:>4}  {:>8}  {:>8}  {:>8}  {:<16}  {}\n",
            record.turn_index,
            format_number(record.input_tokens),
            format_number(record.output_tokens),
            format_number(record.total_tokens),
            format_timestamp(&record.created_at),
            record.model_name.as_deref().unwrap_or("-"),
        ));
    }
    output.push_str(&footer(view));
    output
}

pub fn render_history(view: &PageView<HistoryEntry>, current: Option<&str>) -> String {
    if view.items.is_empty() {
        return "No conversations yet.".to_string();
    }

    let mut output = format!(
        "  {:<38}  {:>5}  {:>8}  {}\n",
        "Conversation", "Turns", "Tokens", "Last active"
    );
    output.push_str(&"-".repeat(72));
    output.push('\n');
    for entry in &view.items {
        let marker = if current == Some(entry.conversation_id.as_str()) {
            "*"
        } else {
            " "
        };
        output.push_str(&format!(
            "{} {:<38}  {:>5}  {:>8}  {}\n",
            marker,
            truncate_chars(&entry.conversation_id, 38),
            entry.turns,
            format_number(entry.total_tokens),
            entry
                .last_created_at
                .as_deref()
                .map(format_timestamp)
                .unwrap_or_else(|| "-".to_string()),
        ));
    }
    output.push_str(&footer(view));
    output
}

pub fn render_uploads(view: &PageView<UploadRecord>) -> String {
    if view.items.is_empty() {
        return "No uploads indexed.".to_string();
    }

    let mut output = format!(
        "{:<32}  {:>9}  {:>6}  {}\n",
        "File", "Size", "Chunks", "Uploaded"
    );
    output.push_str(&"-".repeat(68));
    output.push('\n');
    for upload in &view.items {
        output.push_str(&format!(
            "{:<32}  {:>9}  {:>6}  {}\n",
            truncate_chars(&upload.original_name, 29),
            format_bytes(upload.size_bytes),
            upload.chunks_indexed,
            format_timestamp(&upload.uploaded_at),
        ));
    }
    output.push_str(&footer(view));
    output
}

pub fn render_info(info: &AgentInfo, stats: Option<&KnowledgeStats>) -> String {
    let mut output = String::from("Agent Info\n");
    output.push_str(&"-".repeat(40));
    output.push('\n');

    let rows = [
        ("Deployment", info.deployment_name.as_deref()),
        ("Embeddings", info.embedding_deployment_name.as_deref()),
        ("API version", info.api_version.as_deref()),
        ("Endpoint", info.endpoint_host.as_deref().or(info.endpoint.as_deref())),
        ("Auth mode", Some(info.auth_mode.as_str()).filter(|s| !s.is_empty())),
    ];
    for (label, value) in rows {
        output.push_str(&format!("{:<12} {}\n", format!("{}:", label), value.unwrap_or("-")));
    }
    if let Some(stats) = stats {
        output.push_str(&format!("{:<12} {}\n", "Indexed:", format!("{} chunks", format_number(stats.chunks))));
    }
    output
}

pub fn render_answer(answer: &KnowledgeAnswer) -> String {
    let mut output = answer.answer.trim().to_string();
    if !answer.sources.is_empty() {
        output.push_str("\n\nSources:\n");
        for (i, source) in answer.sources.iter().enumerate() {
            let distance = source
                .distance
                .map(|d| format!(" ({:.3})", d))
                .unwrap_or_default();
            output.push_str(&format!(
                "  [{}] {}{}: {}\n",
                i + 1,
                source.source,
                distance,
                truncate_chars(&source.text.replace('\n', " "), 80)
            ));
        }
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_client::KnowledgeSource;

    fn view<T>(items: Vec<T>, page: u32, page_count: u32, total: u64) -> PageView<T> {
        PageView {
            items,
            page,
            page_size: 20,
            total,
            page_count,
            has_prev: page > 1,
            has_next: page < page_count,
            has_context: true,
            is_loading: false,
        }
    }

    #[test]
    fn test_usage_without_context() {
        let mut empty = view(Vec::<UsageRecord>::new(), 1, 1, 0);
        empty.has_context = false;
        assert_eq!(render_usage(&empty), "No conversation yet. Send a message first.");
    }

    #[test]
    fn test_usage_table() {
        let record = UsageRecord {
            turn_index: 2,
            input_tokens: 1200,
            output_tokens: 30,
            total_tokens: 1230,
            created_at: "2026-03-01T10:15:00Z".into(),
            model_name: Some("gpt-4o".into()),
        };
        let output = render_usage(&view(vec![record], 1, 2, 21));
        assert!(output.contains("1,230"));
        assert!(output.contains("2026-03-01 10:15"));
        assert!(output.contains("gpt-4o"));
        assert!(output.ends_with("Page 1/2 (21 total)  /next"));
    }

    #[test]
    fn test_history_marks_current() {
        let entry = HistoryEntry {
            conversation_id: "c1".into(),
            turns: 3,
            total_tokens: 99,
            last_created_at: None,
        };
        let output = render_history(&view(vec![entry], 2, 2, 21), Some("c1"));
        assert!(output.lines().nth(2).unwrap().starts_with("* c1"));
        assert!(output.ends_with("Page 2/2 (21 total)  /prev"));
    }

    #[test]
    fn test_answer_lists_sources() {
        let answer = KnowledgeAnswer {
            answer: "Thirty days.\n".into(),
            sources: vec![KnowledgeSource {
                text: "Refunds within\n30 days".into(),
                source: "policy.pdf".into(),
                distance: Some(0.12),
            }],
        };
        let output = render_answer(&answer);
        assert!(output.starts_with("Thirty days.\n\nSources:"));
        assert!(output.contains("[1] policy.pdf (0.120): Refunds within 30 days"));
    }

    #[test]
    fn test_info_fills_missing_with_dash() {
        let output = render_info(&AgentInfo::default(), Some(&KnowledgeStats { chunks: 1500 }));
        assert!(output.contains("Deployment:  -"));
        assert!(output.contains("1,500 chunks"));
    }
}

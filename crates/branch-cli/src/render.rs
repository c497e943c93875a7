//! Terminal rendering of sidebar rows, transcripts and action outcomes

use chat_tree::{Role, SidebarEntry, Transcript, TranscriptEntry};
use colored::Colorize;
use session_manager::{ActionOutcome, ConversationSummary, ModelCatalog, UsageTotals};

pub fn sidebar_line(entry: &SidebarEntry) -> String {
    let indent = "  ".repeat(entry.depth);
    let marker = if entry.active {
        "▶".green().bold().to_string()
    } else if entry.pinned {
        "•".yellow().to_string()
    } else {
        " ".to_string()
    };
    let label = entry
        .label
        .as_deref()
        .map(|l| format!("[{l}] "))
        .unwrap_or_default();
    let preview = if entry.active {
        entry.preview.bold().to_string()
    } else {
        entry.preview.clone()
    };

    format!(
        "{indent}{marker} {label}{preview} {}",
        format!("({})", entry.target_id).dimmed()
    )
}

pub fn print_sidebar(entries: &[SidebarEntry]) {
    if entries.is_empty() {
        println!("{}", "No messages yet.".dimmed());
        return;
    }
    for entry in entries {
        println!("{}", sidebar_line(entry));
    }
}

fn speaker(entry: &TranscriptEntry) -> String {
    match (entry.role, entry.label.as_deref()) {
        (Role::User, Some(label)) => format!("You [{label}]:").cyan().bold().to_string(),
        (Role::User, None) => "You:".cyan().bold().to_string(),
        (Role::Model, _) => "Model:".green().bold().to_string(),
        (Role::System, _) => "System:".dimmed().to_string(),
    }
}

pub fn print_transcript(transcript: &Transcript) {
    if transcript.hidden_count > 0 {
        println!(
            "{}",
            format!(
                "... {} earlier message(s) hidden, /unfold to show them",
                transcript.hidden_count
            )
            .dimmed()
        );
    }
    for entry in &transcript.entries {
        println!("{} {}", speaker(entry), format!("({})", entry.node_id).dimmed());
        println!("{}", entry.text);
        println!();
    }
}

pub fn print_outcome(outcome: &ActionOutcome) {
    match outcome {
        ActionOutcome::Deleted { message, .. } => println!("{}", message.green()),
        ActionOutcome::Navigated { node } => {
            println!("{}", format!("Moved to {node}").dimmed())
        }
        ActionOutcome::Branched { user_node, .. } => {
            println!("{}", format!("Branch {user_node} answered").dimmed())
        }
        ActionOutcome::BranchFailed { error, .. } => println!("{}", error.red()),
        ActionOutcome::Ignored { action, reason } => println!(
            "{}",
            format!("Ignored {}: {reason}", action.key()).yellow()
        ),
    }
}

pub fn print_usage(usage: &UsageTotals) {
    println!(
        "Tokens: {} in / {} out, cost ${:.6}",
        usage.input_tokens, usage.output_tokens, usage.total_cost
    );
}

pub fn print_models(catalog: &ModelCatalog, current: &str) {
    for model in catalog.iter() {
        let line = format!(
            "{} ({}) ${:.2} / ${:.2} per 1M tokens",
            model.key, model.id, model.pricing.input_per_1m, model.pricing.output_per_1m
        );
        if model.key == current {
            println!("{} {}", "▶".green(), line.bold());
        } else {
            println!("  {line}");
        }
    }
}

pub fn print_conversations(list: &[ConversationSummary]) {
    if list.is_empty() {
        println!("{}", "No saved conversations.".dimmed());
        return;
    }
    for summary in list {
        println!(
            "{} {} {}",
            summary.id.cyan(),
            summary.title,
            summary
                .updated_at
                .format("%Y-%m-%d %H:%M")
                .to_string()
                .dimmed()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chat_tree::NodeId;

    #[test]
    fn test_sidebar_line_layout() {
        colored::control::set_override(false);
        let entry = SidebarEntry {
            node_id: NodeId::from("u1"),
            target_id: NodeId::from("m1"),
            role: Role::User,
            preview: "Explain gravity".to_string(),
            label: Some("1.2".to_string()),
            pinned: true,
            active: false,
            depth: 2,
            has_reply: true,
            deletable: true,
        };
        assert_eq!(sidebar_line(&entry), "    • [1.2] Explain gravity (m1)");
    }
}

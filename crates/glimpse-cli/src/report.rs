use console::style;
use serde_json::Value;

use glimpse::profiler::{CallCollector, Outcome, RecordedCall};

const PREVIEW_CHARS: usize = 96;

/// Print everything the collector recorded during this run
pub async fn render(collector: &CallCollector) {
    let tools: Vec<String> = collector.tools().into_iter().map(|t| t.name).collect();
    println!(
        "\n{} {}",
        style("tools:").bold(),
        if tools.is_empty() {
            style("none".to_string()).dim()
        } else {
            style(tools.join(", "))
        }
    );

    section("platform calls", &collector.platform_calls().await);
    section("tool calls", &collector.tool_calls());
    section("agent calls", &collector.agent_calls().await);
}

fn section(title: &str, calls: &[RecordedCall]) {
    println!("\n{} ({})", style(title).bold().cyan(), calls.len());
    for call in calls {
        println!("  {}", line(call));
    }
}

fn line(call: &RecordedCall) -> String {
    let duration = format!("{:>6}ms", call.duration.as_millis());
    let outcome = match &call.outcome {
        Outcome::Returned(value) => style(preview(value)).green().to_string(),
        Outcome::Failed(message) => style(format!("failed: {}", message)).red().to_string(),
        Outcome::Pending => style("pending".to_string()).yellow().to_string(),
    };
    format!(
        "{} {} {} {}",
        style(call.started_at.format("%H:%M:%S%.3f")).dim(),
        style(&call.method).bold(),
        style(duration).dim(),
        outcome
    )
}

/// Single-line rendering of a snapshot, cut to a readable width
fn preview(value: &Value) -> String {
    let text = match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    };
    let text = text.replace('\n', " ");
    if text.chars().count() <= PREVIEW_CHARS {
        text
    } else {
        let cut: String = text.chars().take(PREVIEW_CHARS).collect();
        format!("{}…", cut)
    }
}

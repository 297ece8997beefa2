//! Render model → human/json string formatting.
//!
//! Two modes:
//! - **Human** (default): header line, numbered results with links, status messages
//! - **JSON** (`--json`): `serde_json::to_string_pretty` of the render model

use sift_core::{DocumentId, SearchResult, SiftError};
use sift_modal::ResultsView;

/// Output formatting mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Json,
}

/// Format the result area.
pub fn format_view(view: &ResultsView, mode: OutputMode) -> String {
    match mode {
        OutputMode::Json => serde_json::to_string_pretty(view)
            .unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e)),
        OutputMode::Human => format_view_human(view),
    }
}

fn format_view_human(view: &ResultsView) -> String {
    match view {
        ResultsView::Empty => String::new(),
        ResultsView::Loading | ResultsView::Error { .. } => {
            view.message().unwrap_or_default().to_string()
        }
        ResultsView::NoResults { header } => {
            format!("{}\n{}", header, view.message().unwrap_or_default())
        }
        ResultsView::Results { header, items } => {
            let mut lines = vec![format!("{} ({})", header, plural(items.len()))];
            lines.extend(
                items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| format_item(i + 1, item)),
            );
            lines.join("\n")
        }
    }
}

fn format_item(number: usize, item: &SearchResult) -> String {
    format!("{:>3}) {}\n     {}", number, item.display_title(), item.href())
}

fn plural(count: usize) -> String {
    if count == 1 {
        "1 result".to_string()
    } else {
        format!("{} results", count)
    }
}

/// Format a document fetch.
pub fn format_document(id: DocumentId, text: Option<&str>, mode: OutputMode) -> String {
    match mode {
        OutputMode::Json => serde_json::to_string_pretty(&serde_json::json!({
            "document_id": id,
            "text": text,
        }))
        .unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e)),
        OutputMode::Human => match text {
            Some(text) => text.to_string(),
            None => format!("(nil) no document {}", id),
        },
    }
}

/// Format an error.
pub fn format_error(err: &SiftError, mode: OutputMode) -> String {
    match mode {
        OutputMode::Json => serde_json::to_string_pretty(&serde_json::json!({
            "error": format!("{}", err)
        }))
        .unwrap_or_else(|_| format!("{{\"error\": \"{}\"}}", err)),
        OutputMode::Human => format!("(error) {}", err),
    }
}

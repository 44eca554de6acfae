//! Digest rendering for the batched tier

use super::record::NotificationRecord;

/// Fold pending items into one digest message.
///
/// Groups by event kind in first-seen order; within a group the items
/// keep their creation order (the caller hands them in sorted).
pub fn render_digest(items: &[NotificationRecord]) -> String {
    let mut lines = vec!["=== Daily Update ===".to_string(), String::new()];

    let mut group_order: Vec<&str> = Vec::new();
    for item in items {
        let kind = item.context.event_kind.as_str();
        if !group_order.contains(&kind) {
            group_order.push(kind);
        }
    }

    for kind in group_order {
        lines.push(format!("[{}]", heading(kind)));
        for item in items.iter().filter(|i| i.context.event_kind == kind) {
            lines.push(format!("  - {}", item.message));
        }
        lines.push(String::new());
    }

    lines.join("\n")
}

/// "wip_warning" -> "Wip Warning"
fn heading(event_kind: &str) -> String {
    event_kind
        .split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

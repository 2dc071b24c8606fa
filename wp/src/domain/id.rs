//! Task ID generation
//!
//! Generated IDs use the format: `{6-char-hex}-task-{category-slug}`
//! Example: `019430-task-keyword-enrichment`

/// Generate a task ID from a category label
pub fn generate_task_id(category: &str) -> String {
    let uuid = uuid::Uuid::now_v7();
    let hex_prefix = &uuid.to_string()[..6];
    format!("{}-task-{}", hex_prefix, slugify(category))
}

/// Slugify a category label for use in IDs
fn slugify(label: &str) -> String {
    label
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

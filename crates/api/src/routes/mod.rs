//! HTTP route handlers.

pub mod health;
pub mod metrics;
pub mod reservations;
pub mod subjects;
pub mod users;

/// Splits a comma-separated tag list, dropping blanks.
pub(crate) fn parse_tags(raw: Option<&str>) -> Vec<String> {
    raw.map(|raw| {
        raw.split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

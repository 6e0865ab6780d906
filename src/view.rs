//! Local, network-free derivations over the cached catalog.

use crate::models::{Category, Gear, Suggestion, SuggestionStatus};
use crate::session::Session;

/// Ordering applied to the visible gear set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum SortBy {
    #[default]
    Name,
    Nickname,
    /// Most recent first
    Newest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    #[default]
    Gears,
    Suggestions,
    Users,
}

/// Gears in `category`, narrowed by `search` and ordered by `sort`.
/// Recomputed on every call.
pub fn visible_gears<'a>(
    gears: &'a [Gear],
    category: Category,
    search: &str,
    sort: SortBy,
) -> Vec<&'a Gear> {
    let needle = search.to_lowercase();
    let mut visible: Vec<&Gear> = gears
        .iter()
        .filter(|g| g.category == category)
        .filter(|g| needle.is_empty() || matches_search(g, &needle))
        .collect();

    match sort {
        SortBy::Name => visible.sort_by(|a, b| a.name.cmp(&b.name)),
        SortBy::Nickname => visible.sort_by(|a, b| a.nickname.cmp(&b.nickname)),
        SortBy::Newest => visible.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
    }
    visible
}

/// `needle` must already be lowercased
fn matches_search(gear: &Gear, needle: &str) -> bool {
    gear.name.to_lowercase().contains(needle)
        || gear.nickname.to_lowercase().contains(needle)
        || gear.description.to_lowercase().contains(needle)
}

pub fn category_counts(gears: &[Gear]) -> Vec<(Category, usize)> {
    Category::ALL
        .into_iter()
        .map(|c| (c, gears.iter().filter(|g| g.category == c).count()))
        .collect()
}

/// Suggestion totals per moderation state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatusCounts {
    pub pending: usize,
    pub approved: usize,
    pub rejected: usize,
}

pub fn status_counts(suggestions: &[Suggestion]) -> StatusCounts {
    suggestions
        .iter()
        .fold(StatusCounts::default(), |mut counts, s| {
            match s.status {
                SuggestionStatus::Pending => counts.pending += 1,
                SuggestionStatus::Approved => counts.approved += 1,
                SuggestionStatus::Rejected => counts.rejected += 1,
            }
            counts
        })
}

/// Number shown on the suggestions badge
pub fn pending_count(suggestions: &[Suggestion]) -> usize {
    status_counts(suggestions).pending
}

pub fn visible_tabs(session: Option<&Session>) -> Vec<Tab> {
    let mut tabs = vec![Tab::Gears];
    if let Some(session) = session {
        tabs.push(Tab::Suggestions);
        if session.role.can_manage_users() {
            tabs.push(Tab::Users);
        }
    }
    tabs
}

//! The query pipeline: find → rank → slice.
//!
//! Every token of the query must match at least one field of an entry. Field
//! scores come from the relevance scorer and are weighted by
//! [`RankingConfig`]. Entries are then boosted (icon, usage), dampened
//! (disabled or unknown state), filtered and sorted.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};

use regex::{Regex, RegexBuilder};
use tracing::{debug, trace, warn};

use crate::config::RankingConfig;
use crate::error::panic_message;
use crate::gateway::ExecutionGateway;
use crate::scorer::Scorer;

use super::types::{CommandDescriptor, CommandId, QueryResult};

/// Everything a query needs besides the entries themselves.
pub(crate) struct RankContext<'a> {
    pub ranking: &'a RankingConfig,
    pub scorer: Scorer,
    pub gateway: &'a ExecutionGateway,
}

/// One query token with its precomputed helpers.
struct TokenMatcher<'a> {
    token: &'a str,
    /// Token without path separators, for matching against file origins
    path_token: String,
    /// Case-insensitive literal matcher for counting keyword hits
    exact: Option<Regex>,
    /// Long enough to be scored against the file origin
    scores_file: bool,
}

impl<'a> TokenMatcher<'a> {
    fn new(token: &'a str, ranking: &RankingConfig) -> Self {
        let exact = RegexBuilder::new(&regex::escape(token))
            .case_insensitive(true)
            .build()
            .ok();
        Self {
            token,
            path_token: strip_separators(token),
            exact,
            scores_file: token.chars().count() >= ranking.file_min_token_len,
        }
    }
}

fn strip_separators(s: &str) -> String {
    s.chars().filter(|c| !matches!(c, '/' | '\\')).collect()
}

fn optional_score(scorer: &Scorer, token: &str, field: Option<&str>) -> f64 {
    field.map_or(0.0, |value| scorer.score(token, value))
}

/// Weighted relevance of `entry` for all tokens, or 0.0 as soon as one token
/// matches nothing.
fn text_score(entry: &CommandDescriptor, matchers: &[TokenMatcher<'_>], ctx: &RankContext<'_>) -> f64 {
    let ranking = ctx.ranking;
    let keywords = entry.keywords.join(" ");
    let file_origin = entry.file_origin.as_deref().map(strip_separators);

    let mut total = 0.0;
    for m in matchers {
        let mut token_score = ranking.name_weight * ctx.scorer.score(m.token, &entry.name)
            + ranking.category_weight * optional_score(&ctx.scorer, m.token, entry.category.as_deref())
            + ranking.description_weight
                * optional_score(&ctx.scorer, m.token, entry.description.as_deref());

        if !keywords.is_empty() {
            token_score += ranking.keywords_weight * ctx.scorer.score(m.token, &keywords);
            if let Some(exact) = &m.exact {
                let hits = exact.find_iter(&keywords).count();
                token_score += hits as f64 / entry.keywords.len() as f64;
            }
        }

        if m.scores_file {
            if let Some(file) = &file_origin {
                token_score += ranking.file_weight * ctx.scorer.score(&m.path_token, file);
            }
        }

        if token_score == 0.0 {
            return 0.0;
        }
        total += token_score;
    }
    total
}

fn usage_boost(usage_count: u64, total_usage: u64, ranking: &RankingConfig) -> f64 {
    let share = usage_count as f64 / total_usage.max(1) as f64;
    (ranking.usage_boost_factor * share).min(ranking.usage_boost_cap)
}

/// Evaluate one candidate, turning a panic into a skip.
fn guarded<T>(command: &str, evaluate: impl FnOnce() -> T) -> Option<T> {
    match catch_unwind(AssertUnwindSafe(evaluate)) {
        Ok(value) => Some(value),
        Err(payload) => {
            warn!(
                command = command,
                panic = %panic_message(payload.as_ref()),
                "Skipping candidate that failed to score"
            );
            None
        }
    }
}

/// Run the full pipeline and return at most `max_results` owned results.
///
/// Updates `last_score` and `last_enabled` on every evaluated entry; entries
/// that do not match get `0.0` and `None`.
pub(crate) fn run_query(
    entries: &mut HashMap<CommandId, CommandDescriptor>,
    text: &str,
    max_results: usize,
    ctx: &RankContext<'_>,
) -> Vec<QueryResult> {
    let matchers: Vec<TokenMatcher<'_>> = text
        .split_whitespace()
        .map(|token| TokenMatcher::new(token, ctx.ranking))
        .collect();
    if matchers.is_empty() || max_results == 0 {
        return Vec::new();
    }

    let ranking = ctx.ranking;
    let total_usage = entries
        .values()
        .fold(0u64, |acc, e| acc.saturating_add(e.usage_count));

    // (sort key, name, id)
    let mut ranked: Vec<(f64, String, CommandId)> = Vec::new();

    for entry in entries.values_mut() {
        let candidate = &*entry;
        let Some(mut score) = guarded(&candidate.name, || text_score(candidate, &matchers, ctx)) else {
            entry.last_score = 0.0;
            entry.last_enabled = None;
            continue;
        };
        if !score.is_finite() {
            debug!(command = %entry.name, "Skipping candidate with non-finite score");
            entry.last_score = 0.0;
            entry.last_enabled = None;
            continue;
        }
        if score <= 0.0 {
            entry.last_score = 0.0;
            entry.last_enabled = None;
            continue;
        }

        if entry.has_icon() {
            score *= ranking.icon_boost;
        }

        let enabled = match &entry.validation {
            Some(validation) => ctx.gateway.validate(&entry.name, validation.as_ref()),
            None => Some(true),
        };
        entry.last_enabled = enabled;
        if enabled != Some(true) {
            score *= ranking.disabled_factor;
        }

        if score <= ranking.min_score {
            entry.last_score = score;
            continue;
        }

        score += usage_boost(entry.usage_count, total_usage, ranking);
        if !score.is_finite() {
            debug!(command = %entry.name, "Skipping candidate with non-finite score");
            entry.last_score = 0.0;
            entry.last_enabled = None;
            continue;
        }
        entry.last_score = score;

        let offset = if enabled == Some(false) {
            ranking.disabled_sort_offset
        } else {
            0.0
        };
        ranked.push((-score + offset, entry.name.clone(), entry.id));
    }

    ranked.sort_by(|a, b| {
        a.0.total_cmp(&b.0)
            .then_with(|| a.1.cmp(&b.1))
            .then_with(|| a.2.cmp(&b.2))
    });
    ranked.truncate(max_results);

    trace!(query = text, results = ranked.len(), "Query ranked");

    ranked
        .iter()
        .filter_map(|(_, _, id)| entries.get(id).map(CommandDescriptor::to_result))
        .collect()
}

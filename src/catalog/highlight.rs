//! Match positions for highlighting results in a UI.

use nucleo_matcher::pattern::{CaseMatching, Normalization, Pattern};
use nucleo_matcher::{Config, Matcher, Utf32Str};

/// Char positions in `haystack` matched by `query`, sorted and unique.
///
/// Each whitespace-separated word of the query is matched on its own, so the
/// union of all words' positions is returned. Empty when any word fails to
/// match.
pub fn match_indices(haystack: &str, query: &str) -> Vec<usize> {
    if query.trim().is_empty() || haystack.is_empty() {
        return Vec::new();
    }

    let pattern = Pattern::parse(query, CaseMatching::Ignore, Normalization::Smart);
    let mut matcher = Matcher::new(Config::DEFAULT);
    let mut buf = Vec::new();
    let mut indices: Vec<u32> = Vec::new();

    let haystack_utf32 = Utf32Str::new(haystack, &mut buf);
    if pattern
        .indices(haystack_utf32, &mut matcher, &mut indices)
        .is_none()
    {
        return Vec::new();
    }

    indices.sort_unstable();
    indices.dedup();
    indices.into_iter().map(|i| i as usize).collect()
}

//! Relevance scoring of a query token against one candidate string.
//!
//! The score is in `[0, 1]`. Matching starts at the first occurrence of the
//! needle's first character; from there each needle character must sit right
//! under the cursor (case-insensitively). Without fuzziness a miss fails the
//! whole match. Each match is rated by where it lands:
//!
//! - at the very start of the haystack: [`SCORE_BEGIN`]
//! - right after whitespace: [`SCORE_WORD_BEGIN`]
//! - anywhere else: [`SCORE_MATCH`]
//!
//! A match with the wrong case is multiplied by [`PENALTY_CASE`]. The average
//! per-character rating is blended with the fraction of the haystack the
//! needle covers, so short fragments of long strings rank lower.
//!
//! This runs once per (token, field, candidate) on every keystroke. It does
//! not allocate beyond the two char buffers and has no side effects.

pub const SCORE_BEGIN: f64 = 1.0;
pub const SCORE_WORD_BEGIN: f64 = 0.9;
pub const SCORE_MATCH: f64 = 0.8;
pub const PENALTY_CASE: f64 = 0.5;
pub const BONUS_BEGIN: f64 = 0.15;

/// Penalty units for skip/substitution repairs and for jumping ahead.
const FUZZY_REPAIR: u32 = 1;
const FUZZY_JUMP: u32 = 2;

/// A scorer with a fixed fuzziness setting.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Scorer {
    fuzziness: Option<f64>,
}

impl Scorer {
    /// `None` (or NaN) disables fuzzy repairs; values are clamped to [0, 1].
    pub fn new(fuzziness: Option<f64>) -> Self {
        Self {
            fuzziness: fuzziness.filter(|f| !f.is_nan()).map(|f| f.clamp(0.0, 1.0)),
        }
    }

    pub fn fuzziness(&self) -> Option<f64> {
        self.fuzziness
    }

    pub fn score(&self, needle: &str, haystack: &str) -> f64 {
        score_with_fuzziness(needle, haystack, self.fuzziness)
    }
}

/// Score without fuzzy repairs.
pub fn score(needle: &str, haystack: &str) -> f64 {
    score_with_fuzziness(needle, haystack, None)
}

fn fold(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}

fn find_from(folded: &[char], target: char, from: usize) -> Option<usize> {
    folded
        .get(from..)
        .and_then(|rest| rest.iter().position(|&c| c == target))
        .map(|offset| from + offset)
}

fn char_score(haystack: &[char], pos: usize, needle_char: char) -> f64 {
    let tier = if pos == 0 {
        SCORE_BEGIN
    } else if haystack[pos - 1].is_whitespace() {
        SCORE_WORD_BEGIN
    } else {
        SCORE_MATCH
    };
    if haystack[pos] == needle_char {
        tier
    } else {
        tier * PENALTY_CASE
    }
}

/// Score `needle` against `haystack`, optionally tolerating typos.
///
/// With `fuzziness = None` a needle character that is not under the cursor
/// makes the score 0.0. With `fuzziness = Some(f)` the miss is repaired by
/// (in order) skipping one haystack char, skipping one needle char, or
/// accepting a substitution. If none applies the cursor jumps
/// to the next occurrence. Every repair lowers the final score by a factor
/// that tends towards `f` as repairs accumulate.
pub fn score_with_fuzziness(needle: &str, haystack: &str, fuzziness: Option<f64>) -> f64 {
    if needle.is_empty() || haystack.is_empty() {
        return 0.0;
    }
    if needle == haystack {
        return 1.0;
    }

    let fuzziness = fuzziness.filter(|f| !f.is_nan()).map(|f| f.clamp(0.0, 1.0));
    let needle_chars: Vec<char> = needle.chars().collect();
    let haystack_chars: Vec<char> = haystack.chars().collect();
    let needle_folded: Vec<char> = needle_chars.iter().map(|&c| fold(c)).collect();
    let haystack_folded: Vec<char> = haystack_chars.iter().map(|&c| fold(c)).collect();
    let n_len = needle_chars.len();
    let h_len = haystack_chars.len();

    let mut cursor = match find_from(&haystack_folded, needle_folded[0], 0) {
        Some(pos) => pos,
        None => return 0.0,
    };
    let mut total = 0.0;
    let mut fuzzies = 0u32;
    let mut i = 0;

    while i < n_len {
        let wanted = needle_folded[i];

        if cursor < h_len && haystack_folded[cursor] == wanted {
            total += char_score(&haystack_chars, cursor, needle_chars[i]);
            cursor += 1;
            i += 1;
            continue;
        }

        if fuzziness.is_none() {
            return 0.0;
        }

        let next_needle = needle_folded.get(i + 1).copied();
        let next_haystack = haystack_folded.get(cursor + 1).copied();

        if next_haystack == Some(wanted) {
            // extra char in the haystack
            fuzzies += FUZZY_REPAIR;
            cursor += 1;
        } else if cursor < h_len && next_needle == Some(haystack_folded[cursor]) {
            // extra char in the needle
            fuzzies += FUZZY_REPAIR;
            i += 1;
        } else if cursor < h_len && (next_needle.is_none() || next_needle == next_haystack) {
            // substitution
            fuzzies += FUZZY_REPAIR;
            cursor += 1;
            i += 1;
        } else {
            match find_from(&haystack_folded, wanted, cursor) {
                Some(pos) => {
                    fuzzies += FUZZY_JUMP;
                    cursor = pos;
                }
                None => return 0.0,
            }
        }
    }

    let n = n_len as f64;
    let average = total / n;
    let mut result = (average + average * n / h_len as f64) / 2.0;

    if fuzzies > 0 {
        if let Some(f) = fuzziness {
            result *= f + (1.0 - f) / (1.0 + f64::from(fuzzies));
        }
    }

    if needle_folded[0] == haystack_folded[0] {
        result += BONUS_BEGIN;
    }

    result.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_strings_score_one() {
        for s in ["a", "Test", "exists", "Ünïcødé name", "two words"] {
            assert_eq!(score(s, s), 1.0, "score({s:?}, {s:?})");
        }
    }

    #[test]
    fn test_empty_strings_score_zero() {
        assert_eq!(score("", "anything"), 0.0);
        assert_eq!(score("anything", ""), 0.0);
        assert_eq!(score("", ""), 0.0);
    }

    #[test]
    fn test_score_is_bounded() {
        let pairs = [
            ("t", "t t t t"),
            ("tes", "Test"),
            ("x", "abc"),
            ("longer needle", "short"),
            ("pl", "Plane"),
        ];
        for (needle, haystack) in pairs {
            for fuzziness in [None, Some(0.0), Some(0.5), Some(1.0)] {
                let s = score_with_fuzziness(needle, haystack, fuzziness);
                assert!((0.0..=1.0).contains(&s), "{needle} / {haystack}: {s}");
            }
        }
    }

    #[test]
    fn test_positional_monotonicity() {
        let start = score("Test", "Test begin!");
        let word = score("Test", "second Test");
        let inside = score("Test", "insideTest!");

        assert!(start > word, "start {start} should beat word begin {word}");
        assert!(word > inside, "word begin {word} should beat in-word {inside}");
        assert!(inside > 0.0);
    }

    #[test]
    fn test_case_mismatch_is_penalized() {
        let same_case = score("Te", "Test");
        let other_case = score("te", "Test");
        assert!(same_case > other_case);

        let same_case = score("line", "Draw line");
        let other_case = score("LINE", "Draw line");
        assert!(same_case > other_case);
    }

    #[test]
    fn test_gaps_fail_without_fuzziness() {
        assert!(score("lin", "line") > 0.0);
        assert_eq!(score("lne", "line"), 0.0);
        assert_eq!(score("dwl", "draw wall"), 0.0);
        assert!(score("dra", "draw wall") > 0.0);
        assert_eq!(score("tse", "test"), 0.0);
        assert_eq!(score("q", "test"), 0.0);
    }

    #[test]
    fn test_gapped_match_needs_fuzziness_and_ranks_below_contiguous() {
        let contiguous = score_with_fuzziness("lin", "line", Some(0.5));
        let gapped = score_with_fuzziness("lne", "line", Some(0.5));
        assert!(gapped > 0.0);
        assert!(gapped < contiguous, "{gapped} vs {contiguous}");
    }

    #[test]
    fn test_fuzziness_never_lowers_a_score() {
        let pairs = [
            ("lin", "line"),
            ("lne", "line"),
            ("dwl", "draw wall"),
            ("tesat", "test"),
            ("Test", "second Test"),
            ("rect", "Rectangle"),
            ("text", "three exceptions"),
        ];
        for (needle, haystack) in pairs {
            let strict = score(needle, haystack);
            for f in [0.0, 0.25, 0.5, 1.0] {
                let tolerant = score_with_fuzziness(needle, haystack, Some(f));
                assert!(
                    tolerant >= strict,
                    "{needle} / {haystack} with {f}: {tolerant} < {strict}"
                );
            }
        }
    }

    #[test]
    fn test_shorter_haystack_scores_higher() {
        assert!(score("rect", "Rectangle") > score("rect", "Rectangle from center point"));
    }

    #[test]
    fn test_fuzzy_repairs_typos() {
        assert_eq!(score("tesat", "test"), 0.0);
        let fuzzy = score_with_fuzziness("tesat", "test", Some(0.5));
        assert!(fuzzy > 0.0);

        let far = score_with_fuzziness("text", "three exceptions", Some(0.5));
        assert!(fuzzy > far, "{fuzzy} vs {far}");
    }

    #[test]
    fn test_more_fuzziness_is_more_tolerant() {
        let strict = score_with_fuzziness("tesat", "test", Some(0.1));
        let lenient = score_with_fuzziness("tesat", "test", Some(0.9));
        assert!(lenient > strict);
    }

    #[test]
    fn test_fuzziness_does_not_change_exact_matches() {
        let plain = score("line", "Draw line");
        let fuzzy = score_with_fuzziness("line", "Draw line", Some(0.5));
        assert_eq!(plain, fuzzy);
    }

    #[test]
    fn test_scorer_clamps_fuzziness() {
        assert_eq!(Scorer::new(Some(2.0)).fuzziness(), Some(1.0));
        assert_eq!(Scorer::new(Some(f64::NAN)).fuzziness(), None);
        let scorer = Scorer::new(None);
        assert_eq!(scorer.score("abc", "abc"), 1.0);
    }

    #[test]
    fn test_deterministic() {
        let a = score_with_fuzziness("mve", "Move selection", Some(0.3));
        let b = score_with_fuzziness("mve", "Move selection", Some(0.3));
        assert_eq!(a, b);
    }
}

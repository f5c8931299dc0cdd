//! Line matching algorithms.
//!
//! A [`Matcher`] is picked once from configuration (and may be rotated by the user); the
//! query is compiled into a [`CompiledQuery`] once per filter pass and then evaluated
//! against every line. Evaluation is a pure function of (query, line) with no shared
//! mutable state, so it is safe to call from any thread.

use crate::error::{Result, SiftError};
use grep_matcher::Matcher as _;
use grep_regex::{RegexMatcher, RegexMatcherBuilder};
use memchr::memmem;
use std::fmt;
use std::str::FromStr;

/// Byte range `(start, end)` of matched text inside the original line.
pub type MatchRange = (usize, usize);

/// Matching algorithm variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Matcher {
    /// Lowercased query is a contiguous substring of the lowercased line
    #[default]
    IgnoreCase,
    /// Exact substring match
    CaseSensitive,
    /// Query is a regular expression
    Regexp,
}

impl Matcher {
    pub const ALL: [Matcher; 3] = [Self::IgnoreCase, Self::CaseSensitive, Self::Regexp];

    /// Name shown on the prompt line.
    pub fn name(&self) -> &'static str {
        match self {
            Self::IgnoreCase => "IgnoreCase",
            Self::CaseSensitive => "CaseSensitive",
            Self::Regexp => "Regexp",
        }
    }

    /// Next matcher in the rotation order.
    pub fn rotate(self) -> Self {
        match self {
            Self::IgnoreCase => Self::CaseSensitive,
            Self::CaseSensitive => Self::Regexp,
            Self::Regexp => Self::IgnoreCase,
        }
    }

    /// Compile `query` for repeated evaluation.
    ///
    /// Only the regex variant can fail; the failure is a query-level error.
    pub fn compile(self, query: &str) -> Result<CompiledQuery> {
        if query.is_empty() {
            return Ok(CompiledQuery::Everything);
        }

        match self {
            Self::IgnoreCase => Ok(CompiledQuery::FoldedSubstring {
                needle: fold_case(query),
            }),
            Self::CaseSensitive => Ok(CompiledQuery::Substring {
                needle: query.to_string(),
            }),
            Self::Regexp => RegexMatcherBuilder::new()
                .build(query)
                .map(CompiledQuery::Regex)
                .map_err(|e| SiftError::pattern(e.to_string())),
        }
    }

    /// One-shot evaluation: `Ok(Some(ranges))` on a match, `Ok(None)` otherwise.
    pub fn evaluate(self, query: &str, line: &str) -> Result<Option<Vec<MatchRange>>> {
        Ok(self.compile(query)?.evaluate(line))
    }
}

impl fmt::Display for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Matcher {
    type Err = SiftError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "ignorecase" | "ignore-case" => Ok(Self::IgnoreCase),
            "casesensitive" | "case-sensitive" => Ok(Self::CaseSensitive),
            "regexp" | "regex" => Ok(Self::Regexp),
            other => Err(SiftError::config(format!("unknown matcher '{other}'"))),
        }
    }
}

/// A query prepared for one matcher.
#[derive(Debug, Clone)]
pub enum CompiledQuery {
    /// Empty query: every line matches with no highlighted ranges
    Everything,
    Substring {
        needle: String,
    },
    /// Needle is already lowercased
    FoldedSubstring {
        needle: String,
    },
    Regex(RegexMatcher),
}

impl CompiledQuery {
    /// Evaluate against one line.
    pub fn evaluate(&self, line: &str) -> Option<Vec<MatchRange>> {
        match self {
            Self::Everything => Some(Vec::new()),
            Self::Substring { needle } => memmem::find(line.as_bytes(), needle.as_bytes())
                .map(|start| vec![(start, start + needle.len())]),
            Self::FoldedSubstring { needle } => find_folded(line, needle).map(|range| vec![range]),
            Self::Regex(matcher) => find_all_regex(matcher, line),
        }
    }
}

/// Lowercase char by char, the same way lines are folded in [`find_folded`].
///
/// `str::to_lowercase` would turn a word-final `Σ` into `ς` while a line folds it to `σ`.
fn fold_case(text: &str) -> String {
    text.chars().flat_map(char::to_lowercase).collect()
}

/// Case-insensitive search that reports the range in the original line's byte offsets.
///
/// Lowercasing can change the byte length of a character, so non-ASCII lines are folded
/// char by char while recording, for each folded byte, the span of the original char.
fn find_folded(line: &str, needle: &str) -> Option<MatchRange> {
    if line.is_ascii() && needle.is_ascii() {
        let folded = line.to_ascii_lowercase();
        return memmem::find(folded.as_bytes(), needle.as_bytes())
            .map(|start| (start, start + needle.len()));
    }

    let mut folded = String::with_capacity(line.len());
    let mut origin: Vec<(usize, usize)> = Vec::with_capacity(line.len());
    for (start, ch) in line.char_indices() {
        let end = start + ch.len_utf8();
        for lower in ch.to_lowercase() {
            folded.push(lower);
            origin.extend(std::iter::repeat((start, end)).take(lower.len_utf8()));
        }
    }

    let pos = memmem::find(folded.as_bytes(), needle.as_bytes())?;
    let (start, _) = origin[pos];
    let (_, end) = origin[pos + needle.len() - 1];
    Some((start, end))
}

fn find_all_regex(matcher: &RegexMatcher, line: &str) -> Option<Vec<MatchRange>> {
    let mut matched = false;
    let mut ranges = Vec::new();
    let result = matcher.find_iter(line.as_bytes(), |m| {
        matched = true;
        if !m.is_empty() {
            ranges.push((m.start(), m.end()));
        }
        true
    });

    match result {
        Ok(()) if matched => Some(ranges),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_ignore_case_preserves_original_offsets() {
        let lines = ["apple", "Banana", "grape"];
        let hits: Vec<(&str, Vec<MatchRange>)> = lines
            .iter()
            .filter_map(|line| {
                Matcher::IgnoreCase
                    .evaluate("an", line)
                    .unwrap()
                    .map(|r| (*line, r))
            })
            .collect();

        assert_eq!(hits, vec![("Banana", vec![(1, 3)])]);
        assert_eq!(&"Banana"[1..3], "an");
    }

    #[test]
    fn test_ignore_case_folds_query_too() {
        let ranges = Matcher::IgnoreCase.evaluate("BAN", "Banana").unwrap();
        assert_eq!(ranges, Some(vec![(0, 3)]));
    }

    #[test]
    fn test_case_sensitive_rejects_different_case() {
        assert_eq!(Matcher::CaseSensitive.evaluate("AN", "Banana").unwrap(), None);
        assert_eq!(
            Matcher::CaseSensitive.evaluate("Ban", "Banana").unwrap(),
            Some(vec![(0, 3)])
        );
    }

    #[test]
    fn test_case_sensitive_requires_exact_case_across_lines() {
        let hits: Vec<&str> = ["apple", "BANANA", "grape"]
            .into_iter()
            .filter(|line| Matcher::CaseSensitive.evaluate("an", line).unwrap().is_some())
            .collect();
        assert!(hits.is_empty());
    }

    #[test]
    fn test_ignore_case_maps_multibyte_folding() {
        // 'İ' (2 bytes) lowercases to "i̇" (3 bytes); offsets must still point into the original
        let line = "xİstanbul";
        let ranges = Matcher::IgnoreCase.evaluate("stan", line).unwrap().unwrap();
        assert_eq!(ranges.len(), 1);
        let (start, end) = ranges[0];
        assert_eq!(&line[start..end], "stan");

        let ranges = Matcher::IgnoreCase.evaluate("ÄB", "xxäbyy").unwrap().unwrap();
        let (start, end) = ranges[0];
        assert_eq!(&"xxäbyy"[start..end], "äb");
    }

    #[test]
    fn test_ignore_case_matches_word_final_sigma() {
        assert_eq!(
            Matcher::IgnoreCase.evaluate("ΟΔΟΣ", "ΟΔΟΣ").unwrap(),
            Some(vec![(0, 8)])
        );
        let line = "η ΟΔΟΣ μας";
        let (start, end) = Matcher::IgnoreCase.evaluate("οδοσ", line).unwrap().unwrap()[0];
        assert_eq!(&line[start..end], "ΟΔΟΣ");
    }

    #[test]
    fn test_regexp_reports_every_span() {
        let ranges = Matcher::Regexp.evaluate("a.", "banana").unwrap();
        assert_eq!(ranges, Some(vec![(1, 3), (3, 5)]));
    }

    #[test]
    fn test_regexp_empty_match_counts_without_ranges() {
        assert_eq!(Matcher::Regexp.evaluate("z*", "abc").unwrap(), Some(vec![]));
        assert_eq!(Matcher::Regexp.evaluate("^q", "abc").unwrap(), None);
    }

    #[test]
    fn test_regexp_compile_error_is_query_level() {
        match Matcher::Regexp.compile("(unclosed") {
            Err(SiftError::Pattern { .. }) => {}
            other => panic!("expected pattern error, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_query_matches_everything() {
        for matcher in Matcher::ALL {
            assert_eq!(matcher.evaluate("", "anything").unwrap(), Some(vec![]));
            assert_eq!(matcher.evaluate("", "").unwrap(), Some(vec![]));
        }
    }

    #[test]
    fn test_rotation_cycles_all_variants() {
        let mut matcher = Matcher::default();
        let mut seen = Vec::new();
        for _ in 0..3 {
            seen.push(matcher);
            matcher = matcher.rotate();
        }
        assert_eq!(seen, Matcher::ALL.to_vec());
        assert_eq!(matcher, Matcher::IgnoreCase);
    }

    #[test]
    fn test_parse_matcher_names() {
        assert_eq!("IgnoreCase".parse::<Matcher>().unwrap(), Matcher::IgnoreCase);
        assert_eq!(
            "case-sensitive".parse::<Matcher>().unwrap(),
            Matcher::CaseSensitive
        );
        assert_eq!("regexp".parse::<Matcher>().unwrap(), Matcher::Regexp);
        assert!("fuzzy".parse::<Matcher>().is_err());
    }

    proptest! {
        #[test]
        fn prop_evaluation_is_deterministic(
            query in "[a-cA-C.]{0,3}",
            line in "[a-cA-Cäİ ]{0,12}",
        ) {
            for matcher in Matcher::ALL {
                let first = matcher.evaluate(&query, &line).unwrap();
                let second = matcher.evaluate(&query, &line).unwrap();
                prop_assert_eq!(&first, &second);

                if let Some(ranges) = first {
                    for (start, end) in ranges {
                        prop_assert!(start <= end && end <= line.len());
                        prop_assert!(line.is_char_boundary(start) && line.is_char_boundary(end));
                    }
                }
            }
        }
    }
}

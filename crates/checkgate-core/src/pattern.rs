//! Pattern item matching.
//!
//! Pattern items are glob-flavoured regular expressions. Each one is tried
//! in declared order against a finding's key and the first hit wins.
//!
//! Matching is a substring search, not an anchored match: `transition`
//! matches `max_transition:UDFF/Q`. Existing checks depend on this.
//!
//! Compilation is two-stage. [`try_compile`] turns the pattern into a regex
//! when it can; when it cannot, the pattern is compared to the key by plain
//! equality instead.

use lazy_static::lazy_static;
use regex::Regex;

use crate::finding::Finding;

lazy_static! {
    /// Any regex metacharacter. Patterns without one are plain literals and
    /// skip compilation.
    static ref REGEX_META: Regex = Regex::new(r"[\\.+*?()|\[\]{}^$]").unwrap();
}

/// Translate glob wildcards to regex syntax.
///
/// A `*` is a wildcard unless it is escaped, sits inside a `[...]` class, or
/// follows `.`, `)` or `]`, where it is already a regex quantifier.
pub fn glob_to_regex(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + 4);
    let mut prev: Option<char> = None;
    let mut escaped = false;
    let mut in_class = false;

    for c in pattern.chars() {
        if escaped {
            escaped = false;
            out.push(c);
            prev = Some(c);
            continue;
        }

        match c {
            '\\' => escaped = true,
            '[' if !in_class => in_class = true,
            ']' if in_class => in_class = false,
            _ => {}
        }

        if c == '*' && !in_class && !matches!(prev, Some('.' | ')' | ']')) {
            out.push_str(".*");
        } else {
            out.push(c);
        }
        prev = Some(c);
    }

    out
}

/// Compile a pattern item, or `None` if it is not a valid regex.
pub fn try_compile(pattern: &str) -> Option<Regex> {
    match Regex::new(&glob_to_regex(pattern)) {
        Ok(re) => Some(re),
        Err(e) => {
            tracing::debug!(pattern, error = %e, "Pattern is not a valid regex, using exact match");
            None
        }
    }
}

#[derive(Debug, Clone)]
enum Matcher {
    /// No metacharacters: substring containment
    Literal,
    Regex(Regex),
    /// Invalid regex: whole-key equality
    Exact,
}

/// A compiled pattern item.
#[derive(Debug, Clone)]
pub struct PatternItem {
    source: String,
    matcher: Matcher,
}

impl PatternItem {
    pub fn compile(pattern: &str) -> Self {
        let matcher = if !REGEX_META.is_match(pattern) {
            Matcher::Literal
        } else {
            match try_compile(pattern) {
                Some(re) => Matcher::Regex(re),
                None => Matcher::Exact,
            }
        };

        Self {
            source: pattern.to_string(),
            matcher,
        }
    }

    /// The pattern as declared.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn is_match(&self, key: &str) -> bool {
        match &self.matcher {
            Matcher::Literal => key.contains(self.source.as_str()),
            Matcher::Regex(re) => re.is_match(key),
            Matcher::Exact => key == self.source,
        }
    }
}

/// Pattern items compiled once for an evaluation, in priority order.
#[derive(Debug, Clone)]
pub struct PatternSet {
    items: Vec<PatternItem>,
}

impl PatternSet {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Self {
        Self {
            items: patterns.iter().map(|p| PatternItem::compile(p.as_ref())).collect(),
        }
    }

    /// Index of the first pattern matching `key`.
    pub fn first_match(&self, key: &str) -> Option<usize> {
        self.items.iter().position(|item| item.is_match(key))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// First pattern, in declared order, matching `finding_name`.
pub fn match_pattern<'p, S: AsRef<str>>(finding_name: &str, patterns: &'p [S]) -> Option<&'p str> {
    PatternSet::new(patterns)
        .first_match(finding_name)
        .map(|i| patterns[i].as_ref())
}

/// A finding and the pattern item it matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatternHit<'a> {
    pub finding: &'a Finding,
    pub pattern: &'a str,
}

/// Outcome of matching findings against pattern items.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatternMatches<'a> {
    /// Findings that matched a pattern, in input order
    pub matched: Vec<PatternHit<'a>>,

    /// Findings no pattern matched, in input order
    pub unmatched: Vec<&'a Finding>,

    /// Patterns that no finding matched, in declared order
    pub missing: Vec<&'a str>,
}

impl<'a> PatternMatches<'a> {
    pub fn matched_findings(&self) -> impl Iterator<Item = &'a Finding> + '_ {
        self.matched.iter().map(|hit| hit.finding)
    }
}

/// Match every finding's key against the pattern items.
pub fn match_findings<'a>(findings: &'a [Finding], patterns: &'a [String]) -> PatternMatches<'a> {
    let set = PatternSet::new(patterns);
    let mut hit = vec![false; set.len()];
    let mut matches = PatternMatches::default();

    for finding in findings {
        match set.first_match(&finding.key()) {
            Some(i) => {
                hit[i] = true;
                matches.matched.push(PatternHit {
                    finding,
                    pattern: patterns[i].as_str(),
                });
            }
            None => matches.unmatched.push(finding),
        }
    }

    matches.missing = patterns
        .iter()
        .zip(hit)
        .filter(|(_, was_hit)| !was_hit)
        .map(|(p, _)| p.as_str())
        .collect();

    matches
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glob_translation() {
        assert_eq!(glob_to_regex("*transition*"), ".*transition.*");
        assert_eq!(glob_to_regex("max_.*"), "max_.*");
        assert_eq!(glob_to_regex(r"U1\*"), r"U1\*");
        assert_eq!(glob_to_regex("(ab)*c"), "(ab)*c");
        assert_eq!(glob_to_regex("**"), ".*.*");
        assert_eq!(glob_to_regex("U1[a*]x"), "U1[a*]x");
        assert_eq!(glob_to_regex(r"U1[\]*]x*"), r"U1[\]*]x.*");
        assert_eq!(glob_to_regex("[ab]*"), "[ab]*");
    }

    #[test]
    fn test_star_inside_class_is_literal() {
        let patterns = ["U1[a*]x"];
        assert_eq!(match_pattern("U1.x", &patterns), None);
        assert_eq!(match_pattern("top/U1*x", &patterns), Some("U1[a*]x"));
    }

    #[test]
    fn test_glob_matches_by_substring() {
        let patterns = ["*transition*"];
        assert_eq!(
            match_pattern("max_transition:UDFF/Q", &patterns),
            Some("*transition*")
        );
    }

    #[test]
    fn test_unrelated_pattern_does_not_match() {
        let patterns = ["max_fanout"];
        assert_eq!(match_pattern("max_transition:UDFF/Q", &patterns), None);
    }

    #[test]
    fn test_unanchored_literal_matches_substring() {
        let patterns = ["transition"];
        assert_eq!(
            match_pattern("max_transition:UDFF/Q", &patterns),
            Some("transition")
        );
    }

    #[test]
    fn test_regex_pattern_is_searched_not_anchored() {
        let patterns = [r"UDFF/[A-Z]$"];
        assert!(match_pattern("max_transition:UDFF/Q", &patterns).is_some());

        let anchored = [r"^UDFF"];
        assert!(match_pattern("max_transition:UDFF/Q", &anchored).is_none());
    }

    #[test]
    fn test_first_declared_pattern_wins() {
        let patterns = ["max_*", "*transition*"];
        assert_eq!(
            match_pattern("max_transition:UDFF/Q", &patterns),
            Some("max_*")
        );

        let reversed = ["*transition*", "max_*"];
        assert_eq!(
            match_pattern("max_transition:UDFF/Q", &reversed),
            Some("*transition*")
        );
    }

    #[test]
    fn test_invalid_regex_falls_back_to_exact_match() {
        assert!(try_compile("U1/A[").is_none());

        let patterns = ["U1/A["];
        assert_eq!(match_pattern("U1/A[", &patterns), Some("U1/A["));
        assert_eq!(match_pattern("top/U1/A[", &patterns), None);
    }

    #[test]
    fn test_match_findings_uses_composite_key() {
        let findings = vec![
            Finding::new("UDFF/Q").with_category("max_transition"),
            Finding::new("U7/Y").with_category("max_fanout"),
        ];
        let patterns = vec!["max_transition".to_string(), "max_capacitance".to_string()];

        let matches = match_findings(&findings, &patterns);

        assert_eq!(matches.matched.len(), 1);
        assert_eq!(matches.matched[0].finding.name, "UDFF/Q");
        assert_eq!(matches.matched[0].pattern, "max_transition");
        assert_eq!(matches.unmatched, vec![&findings[1]]);
        assert_eq!(matches.missing, vec!["max_capacitance"]);
    }

    #[test]
    fn test_match_findings_empty_input() {
        let patterns = vec!["a".to_string(), "b".to_string()];
        let matches = match_findings(&[], &patterns);
        assert!(matches.matched.is_empty());
        assert_eq!(matches.missing, vec!["a", "b"]);
    }
}

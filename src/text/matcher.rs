use std::panic::{catch_unwind, AssertUnwindSafe};

use regex::Regex;
use tracing::{error, trace};

use super::PatternSet;
use crate::record::{Fields, Value};

/// Fields captured from a field string.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Matched {
    /// Label of the matching pattern, if the pattern set is labeled.
    pub message_type: Option<String>,
    /// Named captures of the matching pattern, as strings. Empty if nothing matched.
    pub fields: Fields,
}

/// Applies a [PatternSet] to field strings.
///
/// Patterns are tried in declaration order and the first one that matches the whole field
/// string wins; later patterns are never tried.
#[derive(Debug, Clone, Default)]
pub struct FieldMatcher {
    patterns: PatternSet,
}

impl FieldMatcher {
    pub fn new(patterns: PatternSet) -> Self {
        FieldMatcher { patterns }
    }

    #[must_use]
    pub fn patterns(&self) -> &PatternSet {
        &self.patterns
    }

    /// Match `field_string` against the configured patterns.
    ///
    /// Not matching anything is not an error, it just produces a [Matched] with no fields
    /// and no message type.
    #[must_use]
    pub fn match_fields(&self, field_string: &str) -> Matched {
        if field_string.is_empty() {
            return Matched::default();
        }
        for (idx, (label, pattern)) in self.patterns.iter().enumerate() {
            // A fault in one pattern must not prevent trying the rest.
            let zult = catch_unwind(AssertUnwindSafe(|| capture(pattern, field_string)));
            match zult {
                Ok(Some(fields)) => {
                    trace!(pattern_idx = idx, message_type = label, "field pattern matched");
                    return Matched {
                        message_type: label.map(String::from),
                        fields,
                    };
                }
                Ok(None) => {}
                Err(_) => {
                    error!(
                        pattern_idx = idx,
                        pattern = pattern.as_str(),
                        "field pattern failed; skipping"
                    );
                }
            }
        }
        Matched::default()
    }
}

/// Named groups that participated in the match, in the order they appear in the pattern.
fn capture(pattern: &Regex, field_string: &str) -> Option<Fields> {
    let caps = pattern.captures(field_string)?;
    let mut fields = Fields::new();
    for name in pattern.capture_names().flatten() {
        if let Some(m) = caps.name(name) {
            fields.insert(name.to_string(), Value::from(m.as_str()));
        }
    }
    Some(fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::FieldPatterns;

    fn matcher(patterns: FieldPatterns) -> FieldMatcher {
        FieldMatcher::new(patterns.compile().unwrap())
    }

    #[test]
    fn first_declared_match_wins() {
        // Both patterns match; the narrower one is declared first.
        let m = matcher(FieldPatterns::from(vec![
            ("HEADING", r"\$HEHDT,(?P<heading>[\d.]+),T"),
            ("ANY", r"\$(?P<talker>\w+),(?P<rest>.*)"),
        ]));
        let matched = m.match_fields("$HEHDT,271.3,T");
        assert_eq!(matched.message_type.as_deref(), Some("HEADING"));
        let keys: Vec<&str> = matched.fields.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["heading"]);
        assert_eq!(matched.fields["heading"], Value::from("271.3"));

        // Swapping the declaration order swaps the winner.
        let m = matcher(FieldPatterns::from(vec![
            ("ANY", r"\$(?P<talker>\w+),(?P<rest>.*)"),
            ("HEADING", r"\$HEHDT,(?P<heading>[\d.]+),T"),
        ]));
        let matched = m.match_fields("$HEHDT,271.3,T");
        assert_eq!(matched.message_type.as_deref(), Some("ANY"));
        assert_eq!(matched.fields["talker"], Value::from("HEHDT"));
    }

    #[test]
    fn later_pattern_used_when_earlier_fails() {
        let m = matcher(FieldPatterns::from(vec![
            r"(?P<depth>[\d.]+),m",
            r"(?P<depth_ft>[\d.]+),f",
        ]));
        let matched = m.match_fields("102.4,f");
        assert_eq!(matched.message_type, None);
        assert_eq!(matched.fields["depth_ft"], Value::from("102.4"));
        assert!(!matched.fields.contains_key("depth"));
    }

    #[test]
    fn no_match_is_empty() {
        let m = matcher(FieldPatterns::from(vec![("GGA", r"GPGGA,(?P<x>.*)")]));
        assert_eq!(m.match_fields("GPRMC,1,2"), Matched::default());
        assert_eq!(m.match_fields(""), Matched::default());
    }

    #[test]
    fn partial_match_is_not_a_match() {
        let m = matcher(FieldPatterns::from(vec![r"(?P<n>\d+)"]));
        assert!(m.match_fields("12 trailing").fields.is_empty());
    }

    #[test]
    fn unparticipating_groups_are_omitted() {
        let m = matcher(FieldPatterns::from(vec![
            r"(?P<speed>[\d.]+)(,(?P<unit>[A-Z]))?",
        ]));
        let matched = m.match_fields("12.5");
        assert_eq!(matched.fields.len(), 1);
        assert_eq!(matched.fields["speed"], Value::from("12.5"));

        let matched = m.match_fields("12.5,N");
        assert_eq!(matched.fields["unit"], Value::from("N"));
    }

    #[test]
    fn field_order_follows_pattern() {
        let m = matcher(FieldPatterns::from(vec![
            r"(?P<b>\w),(?P<a>\w),(?P<c>\w)",
        ]));
        let matched = m.match_fields("1,2,3");
        let keys: Vec<&str> = matched.fields.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["b", "a", "c"]);
    }

    #[test]
    fn empty_pattern_set_matches_nothing() {
        let m = FieldMatcher::default();
        assert_eq!(m.match_fields("anything"), Matched::default());
    }
}

//! Route rules: path-pattern scoped overrides and suppression.
//!
//! Patterns are `/`-separated. A segment is a literal, `*` or `:name`
//! (exactly one segment), or `**` (any number of trailing segments, last
//! position only).

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Reverse;
use std::fmt;

use crate::types::ImageFragment;
use crate::{OgError, Result};

/// Value attached to a route pattern in configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleValue {
    /// `false` suppresses image generation; `true` enables it with defaults.
    Toggle(bool),
    Override(ImageFragment),
}

/// Route rules as written in configuration, in document order.
///
/// Order matters: it breaks specificity ties in [`RouteRules::match_all`].
/// Inserting an existing pattern replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleTable {
    entries: Vec<(String, RuleValue)>,
}

impl RuleTable {
    pub fn insert(&mut self, pattern: impl Into<String>, value: RuleValue) {
        let pattern = pattern.into();
        match self.entries.iter_mut().find(|(p, _)| *p == pattern) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((pattern, value)),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RuleValue)> {
        self.entries.iter().map(|(p, v)| (p.as_str(), v))
    }
}

impl Serialize for RuleTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter())
    }
}

impl<'de> Deserialize<'de> for RuleTable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct TableVisitor;

        impl<'de> Visitor<'de> for TableVisitor {
            type Value = RuleTable;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a table of route patterns")
            }

            fn visit_map<A>(self, mut map: A) -> std::result::Result<RuleTable, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut table = RuleTable::default();
                while let Some((pattern, value)) = map.next_entry::<String, RuleValue>()? {
                    table.insert(pattern, value);
                }
                Ok(table)
            }
        }

        deserializer.deserialize_map(TableVisitor)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Single,
    CatchAll,
}

/// A compiled route pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePattern {
    source: String,
    segments: Vec<Segment>,
}

impl RoutePattern {
    pub fn parse(pattern: &str) -> Result<Self> {
        if !pattern.starts_with('/') {
            return Err(OgError::route_pattern(pattern, "must start with '/'"));
        }
        let parts: Vec<&str> = split_path(pattern).collect();
        let mut segments = Vec::with_capacity(parts.len());
        for (idx, part) in parts.iter().enumerate() {
            let segment = match *part {
                "**" if idx + 1 == parts.len() => Segment::CatchAll,
                "**" => {
                    return Err(OgError::route_pattern(
                        pattern,
                        "'**' is only allowed as the last segment",
                    ))
                }
                "*" => Segment::Single,
                p if p.starts_with(':') && p.len() > 1 => Segment::Single,
                p if p.contains('*') => {
                    return Err(OgError::route_pattern(
                        pattern,
                        format!("wildcards must fill a whole segment, found '{p}'"),
                    ))
                }
                p => Segment::Literal(p.to_string()),
            };
            segments.push(segment);
        }
        Ok(Self {
            source: pattern.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn matches(&self, path: &str) -> bool {
        let parts: Vec<&str> = split_path(path).collect();
        let mut idx = 0;
        for segment in &self.segments {
            match segment {
                Segment::CatchAll => return true,
                Segment::Single => {
                    if idx >= parts.len() {
                        return false;
                    }
                }
                Segment::Literal(lit) => {
                    if parts.get(idx) != Some(&lit.as_str()) {
                        return false;
                    }
                }
            }
            idx += 1;
        }
        idx == parts.len()
    }

    /// Ordering key; larger is more specific.
    fn specificity(&self) -> (bool, usize, usize) {
        let exact = !self.segments.contains(&Segment::CatchAll);
        let literals = self
            .segments
            .iter()
            .filter(|s| matches!(s, Segment::Literal(_)))
            .count();
        (exact, literals, self.segments.len())
    }
}

fn split_path(path: &str) -> impl Iterator<Item = &str> {
    path.split(['?', '#'])
        .next()
        .unwrap_or_default()
        .split('/')
        .filter(|s| !s.is_empty())
}

/// Outcome of resolving the rules that apply to one route.
#[derive(Debug, Clone, PartialEq)]
pub enum RuleResolution {
    /// No rule matched.
    Unmatched,
    /// The cascade ended on `false`.
    Suppressed,
    /// Merged override of every matched rule, most specific winning.
    Override(ImageFragment),
}

/// The immutable rule set for one run.
#[derive(Debug, Clone, Default)]
pub struct RouteRules {
    rules: Vec<(RoutePattern, RuleValue)>,
}

impl RouteRules {
    pub fn new<I, S>(rules: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, RuleValue)>,
        S: AsRef<str>,
    {
        let rules = rules
            .into_iter()
            .map(|(pattern, value)| Ok((RoutePattern::parse(pattern.as_ref())?, value)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { rules })
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Every rule matching `path`, most specific first.
    ///
    /// Ties keep configuration order.
    pub fn match_all(&self, path: &str) -> Vec<(&RoutePattern, &RuleValue)> {
        let mut matched: Vec<_> = self
            .rules
            .iter()
            .filter(|(pattern, _)| pattern.matches(path))
            .map(|(pattern, value)| (pattern, value))
            .collect();
        matched.sort_by_key(|(pattern, _)| Reverse(pattern.specificity()));
        matched
    }

    /// Cascade the matching rules from most general to most specific.
    pub fn resolve(&self, path: &str) -> RuleResolution {
        self.match_all(path)
            .into_iter()
            .rev()
            .fold(RuleResolution::Unmatched, |acc, (_, value)| match value {
                RuleValue::Toggle(false) => RuleResolution::Suppressed,
                RuleValue::Toggle(true) => match acc {
                    RuleResolution::Override(fragment) => RuleResolution::Override(fragment),
                    _ => RuleResolution::Override(ImageFragment::default()),
                },
                RuleValue::Override(fragment) => match acc {
                    RuleResolution::Override(base) => RuleResolution::Override(base.overlay(fragment)),
                    _ => RuleResolution::Override(fragment.clone()),
                },
            })
    }
}

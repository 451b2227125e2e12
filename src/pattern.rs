// src/pattern.rs

//! Structured path patterns: literal fragments plus named `{wildcard}` slots.
//!
//! Patterns are parsed once at registration time, so malformed syntax is a
//! configuration error, never a scheduling-time surprise. Substitution
//! against a wildcard binding is the only way to turn a pattern into a
//! concrete path, which keeps path manipulation out of the string domain.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// Concrete wildcard assignment, e.g. `{sample: "S1", read: "2"}`.
///
/// A `BTreeMap` keeps iteration order stable so task identities and resolved
/// paths are deterministic across runs.
pub type Binding = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Part {
    Literal(String),
    Wildcard(String),
}

/// A parsed path (or command) pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    raw: String,
    parts: Vec<Part>,
}

/// Error produced when a pattern cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternSyntaxError {
    pub pattern: String,
    pub reason: String,
}

impl fmt::Display for PatternSyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pattern '{}': {}", self.pattern, self.reason)
    }
}

impl std::error::Error for PatternSyntaxError {}

impl PathPattern {
    /// Parse a pattern string.
    ///
    /// Rejects unbalanced braces, nested braces, and empty wildcard names.
    pub fn parse(raw: &str) -> Result<Self, PatternSyntaxError> {
        let mut parts = Vec::new();
        let mut literal = String::new();
        let mut wildcard: Option<String> = None;

        for ch in raw.chars() {
            match (ch, wildcard.as_mut()) {
                ('{', None) => {
                    if !literal.is_empty() {
                        parts.push(Part::Literal(std::mem::take(&mut literal)));
                    }
                    wildcard = Some(String::new());
                }
                ('{', Some(_)) => {
                    return Err(PatternSyntaxError {
                        pattern: raw.to_string(),
                        reason: "nested '{'".to_string(),
                    });
                }
                ('}', Some(name)) => {
                    if name.is_empty() {
                        return Err(PatternSyntaxError {
                            pattern: raw.to_string(),
                            reason: "empty wildcard name".to_string(),
                        });
                    }
                    parts.push(Part::Wildcard(std::mem::take(name)));
                    wildcard = None;
                }
                ('}', None) => {
                    return Err(PatternSyntaxError {
                        pattern: raw.to_string(),
                        reason: "unmatched '}'".to_string(),
                    });
                }
                (c, Some(name)) => name.push(c),
                (c, None) => literal.push(c),
            }
        }

        if wildcard.is_some() {
            return Err(PatternSyntaxError {
                pattern: raw.to_string(),
                reason: "unclosed '{'".to_string(),
            });
        }
        if !literal.is_empty() {
            parts.push(Part::Literal(literal));
        }

        Ok(Self {
            raw: raw.to_string(),
            parts,
        })
    }

    /// The pattern as originally written.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Names of all wildcard slots, in order of appearance (may repeat).
    pub fn wildcards(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().filter_map(|p| match p {
            Part::Wildcard(name) => Some(name.as_str()),
            Part::Literal(_) => None,
        })
    }

    /// True if the pattern contains no wildcard slots.
    pub fn is_literal(&self) -> bool {
        self.parts
            .iter()
            .all(|p| matches!(p, Part::Literal(_)))
    }

    /// Substitute wildcard values and return the resulting path.
    ///
    /// Returns the name of the first unbound wildcard on failure.
    pub fn substitute(&self, binding: &Binding) -> Result<PathBuf, String> {
        Ok(PathBuf::from(self.substitute_str(binding)?))
    }

    /// Like [`substitute`](Self::substitute) but yields a `String`.
    /// Used for command templates and sample-column names.
    pub fn substitute_str(&self, binding: &Binding) -> Result<String, String> {
        let mut out = String::with_capacity(self.raw.len());
        for part in &self.parts {
            match part {
                Part::Literal(s) => out.push_str(s),
                Part::Wildcard(name) => match binding.get(name) {
                    Some(value) => out.push_str(value),
                    None => return Err(name.clone()),
                },
            }
        }
        Ok(out)
    }

    /// Substitute bound wildcards and re-emit unbound ones as `{name}`.
    ///
    /// Commands keep their `{scratch}` placeholder until execution time;
    /// this is the substitution used for them at instantiation.
    pub fn substitute_partial(&self, binding: &Binding) -> String {
        let mut out = String::with_capacity(self.raw.len());
        for part in &self.parts {
            match part {
                Part::Literal(s) => out.push_str(s),
                Part::Wildcard(name) => match binding.get(name) {
                    Some(value) => out.push_str(value),
                    None => {
                        out.push('{');
                        out.push_str(name);
                        out.push('}');
                    }
                },
            }
        }
        out
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binding(pairs: &[(&str, &str)]) -> Binding {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn parses_literals_and_wildcards() {
        let p = PathPattern::parse("trimmed/{sample}_{read}.fastq").unwrap();
        let names: Vec<_> = p.wildcards().collect();
        assert_eq!(names, vec!["sample", "read"]);
        assert!(!p.is_literal());
    }

    #[test]
    fn literal_pattern_has_no_wildcards() {
        let p = PathPattern::parse("db/.installed").unwrap();
        assert!(p.is_literal());
        assert_eq!(p.substitute(&Binding::new()).unwrap(), PathBuf::from("db/.installed"));
    }

    #[test]
    fn substitution_is_exact() {
        let p = PathPattern::parse("out/{sample}.txt").unwrap();
        let b = binding(&[("sample", "S1")]);
        assert_eq!(p.substitute(&b).unwrap(), PathBuf::from("out/S1.txt"));
    }

    #[test]
    fn missing_wildcard_is_reported_by_name() {
        let p = PathPattern::parse("out/{sample}.{read}.txt").unwrap();
        let b = binding(&[("sample", "S1")]);
        assert_eq!(p.substitute(&b).unwrap_err(), "read");
    }

    #[test]
    fn rejects_unclosed_brace() {
        assert!(PathPattern::parse("out/{sample.txt").is_err());
    }

    #[test]
    fn rejects_nested_brace() {
        assert!(PathPattern::parse("out/{sa{mple}}.txt").is_err());
    }

    #[test]
    fn rejects_empty_wildcard() {
        assert!(PathPattern::parse("out/{}.txt").is_err());
    }

    #[test]
    fn rejects_unmatched_close() {
        assert!(PathPattern::parse("out/sample}.txt").is_err());
    }

    #[test]
    fn partial_substitution_keeps_unbound_slots() {
        let p = PathPattern::parse("tool --in {input} --tmp {scratch}").unwrap();
        let b = binding(&[("input", "a.fq")]);
        assert_eq!(p.substitute_partial(&b), "tool --in a.fq --tmp {scratch}");
    }
}

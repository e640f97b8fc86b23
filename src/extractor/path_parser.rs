use std::fmt;
use std::str::FromStr;

use crate::shared::{ASN, DEFAULT_PATH_FIELD, DEFAULT_RECORD_TYPE};

/// What to keep from an AS-set (`{702,703}`) or comma group in a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AsSetPolicy {
    /// Keep only the first member of the set.
    #[default]
    FirstMember,
    /// Drop the whole set from the path.
    Discard,
}

impl FromStr for AsSetPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "first" | "first-member" => Ok(AsSetPolicy::FirstMember),
            "discard" => Ok(AsSetPolicy::Discard),
            other => Err(format!("unknown AS-set policy '{}' (expected first or discard)", other)),
        }
    }
}

impl fmt::Display for AsSetPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AsSetPolicy::FirstMember => "first",
            AsSetPolicy::Discard => "discard",
        };
        write!(f, "{}", s)
    }
}

/// Turns table dump records into canonical AS paths.
///
/// A record is relevant when its first field equals the configured record type and it has
/// enough fields to reach the path field. The path is whitespace tokenized, AS-sets are
/// reduced according to the [`AsSetPolicy`], empty tokens are dropped and consecutive
/// duplicates (prepending) are collapsed. Non-adjacent repeats are left alone.
#[derive(Debug, Clone)]
pub struct PathParser {
    pub record_type: String,
    pub delimiter: char,
    pub path_field: usize,
    pub as_set_policy: AsSetPolicy,
}

impl PathParser {
    pub fn new() -> Self {
        PathParser {
            record_type: DEFAULT_RECORD_TYPE.to_string(),
            delimiter: '|',
            path_field: DEFAULT_PATH_FIELD,
            as_set_policy: AsSetPolicy::FirstMember,
        }
    }

    pub fn with_record_type(mut self, record_type: impl Into<String>) -> Self {
        self.record_type = record_type.into();
        self
    }

    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_path_field(mut self, path_field: usize) -> Self {
        self.path_field = path_field;
        self
    }

    pub fn with_as_set_policy(mut self, policy: AsSetPolicy) -> Self {
        self.as_set_policy = policy;
        self
    }

    /// Returns the normalized path of a record, or `None` when the line is not a relevant
    /// table entry or carries no path. Paths shorter than two hops are still returned.
    pub fn parse_line(&self, line: &str) -> Option<Vec<ASN>> {
        let line = line.trim_end_matches(&['\r', '\n'][..]);
        let fields: Vec<&str> = line.split(self.delimiter).collect();

        if fields.len() <= self.path_field || fields[0] != self.record_type {
            return None;
        }

        let raw_path = fields[self.path_field];
        if raw_path.trim().is_empty() {
            return None;
        }

        let path = self.normalize(raw_path.split_whitespace());
        if path.is_empty() {
            None
        } else {
            Some(path)
        }
    }

    /// Canonicalizes a tokenized path. Normalizing an already canonical path is a no-op.
    pub fn normalize<'a, I>(&self, tokens: I) -> Vec<ASN>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let tokens: Vec<&str> = tokens.into_iter().collect();

        let mut path: Vec<ASN> = Vec::new();
        // Set written across several tokens, e.g. "{702, 703}".
        let mut inside_set = false;

        for (i, &token) in tokens.iter().enumerate() {
            if inside_set {
                if token.contains('}') {
                    inside_set = false;
                }
                continue;
            }

            let is_set = token.starts_with('{') || token.contains(',');
            let opens_set = token.starts_with('{') && !token.contains('}');
            if opens_set && closes_later(&tokens[i + 1..]) {
                inside_set = true;
            }

            let asn = if is_set {
                match self.as_set_policy {
                    AsSetPolicy::FirstMember => first_member(token),
                    AsSetPolicy::Discard => continue,
                }
            } else {
                token.trim_matches(is_brace)
            };

            if asn.is_empty() || path.last().map(String::as_str) == Some(asn) {
                continue;
            }
            path.push(asn.to_string());
        }

        path
    }
}

impl Default for PathParser {
    fn default() -> Self {
        Self::new()
    }
}

fn is_brace(c: char) -> bool {
    c == '{' || c == '}'
}

/// Whether the next brace in `rest` closes a set. An unclosed `{` applies to its own token.
fn closes_later(rest: &[&str]) -> bool {
    rest.iter()
        .find(|token| token.contains(is_brace))
        .map_or(false, |token| !token.contains('{'))
}

fn first_member(token: &str) -> &str {
    token
        .trim_matches(is_brace)
        .split(',')
        .next()
        .unwrap_or("")
        .trim()
}

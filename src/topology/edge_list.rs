use std::fmt;
use std::io::BufRead;
use std::str::FromStr;

use crate::shared::{AsRankError, Result, ASN};

/// Whether the first non-blank row of an edge list is a header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HeaderMode {
    /// Treat the first row as a header unless its first column looks like an identifier.
    #[default]
    Auto,
    Present,
    Absent,
}

impl FromStr for HeaderMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(HeaderMode::Auto),
            "present" | "yes" => Ok(HeaderMode::Present),
            "absent" | "no" => Ok(HeaderMode::Absent),
            other => Err(format!(
                "unknown header mode '{}' (expected auto, present or absent)",
                other
            )),
        }
    }
}

impl fmt::Display for HeaderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HeaderMode::Auto => "auto",
            HeaderMode::Present => "present",
            HeaderMode::Absent => "absent",
        };
        write!(f, "{}", s)
    }
}

/// Bare number, or `AS` followed by digits.
pub fn looks_like_identifier(field: &str) -> bool {
    let digits = match field.get(..2) {
        Some(prefix) if prefix.eq_ignore_ascii_case("as") => &field[2..],
        _ => field,
    };
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

fn is_usable(field: &str) -> bool {
    !field.is_empty() && !field.contains(char::REPLACEMENT_CHARACTER)
}

/// Undirected adjacency rows read from a comma separated file. Only the first two columns
/// are used, so the stage-1 relationship table can be fed in directly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EdgeList {
    pub edges: Vec<(ASN, ASN)>,
    /// Rows dropped for having fewer than two usable columns.
    pub skipped_rows: usize,
    pub header_skipped: bool,
}

impl EdgeList {
    pub fn from_pairs<I, A, B>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (A, B)>,
        A: Into<ASN>,
        B: Into<ASN>,
    {
        EdgeList {
            edges: pairs.into_iter().map(|(a, b)| (a.into(), b.into())).collect(),
            skipped_rows: 0,
            header_skipped: false,
        }
    }

    /// Rows that are not valid UTF-8 are decoded lossily; an identifier column that
    /// needed replacement characters counts the row as skipped.
    pub fn read<R: BufRead>(mut reader: R, header: HeaderMode) -> Result<Self> {
        let mut list = EdgeList::default();
        let mut first_row = true;
        let mut buf = Vec::with_capacity(256);

        loop {
            buf.clear();
            let n = reader.read_until(b'\n', &mut buf).map_err(AsRankError::Read)?;
            if n == 0 {
                break;
            }
            let decoded = String::from_utf8_lossy(&buf);
            let line = decoded.trim();
            if line.is_empty() {
                continue;
            }

            let mut columns = line.split(',').map(str::trim);
            let from = columns.next().unwrap_or("");
            let to = columns.next();

            if first_row {
                first_row = false;
                let is_header = match header {
                    HeaderMode::Present => true,
                    HeaderMode::Absent => false,
                    HeaderMode::Auto => !looks_like_identifier(from),
                };
                if is_header {
                    list.header_skipped = true;
                    continue;
                }
            }

            match to {
                Some(to) if is_usable(from) && is_usable(to) => {
                    list.edges.push((from.to_string(), to.to_string()));
                }
                _ => list.skipped_rows += 1,
            }
        }

        Ok(list)
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_detection() {
        assert!(looks_like_identifier("3356"));
        assert!(looks_like_identifier("AS3356"));
        assert!(looks_like_identifier("as174"));
        assert!(!looks_like_identifier("ASN"));
        assert!(!looks_like_identifier("From_ASN"));
        assert!(!looks_like_identifier(""));
    }
}

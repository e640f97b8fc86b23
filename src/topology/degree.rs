use std::collections::{HashMap, HashSet};

use crate::shared::ASN;

/// Distinct-neighbor count of every identifier in an undirected edge list.
///
/// Both directions of a link and repeated observations collapse to one neighbor. A row
/// joining an identifier to itself registers the identifier without adding a neighbor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DegreeTable {
    degrees: HashMap<ASN, usize>,
}

impl DegreeTable {
    pub fn from_edges<'a, I>(edges: I) -> Self
    where
        I: IntoIterator<Item = &'a (ASN, ASN)>,
    {
        let mut neighbors: HashMap<&str, HashSet<&str>> = HashMap::new();

        for (a, b) in edges {
            if a == b {
                neighbors.entry(a.as_str()).or_default();
                continue;
            }
            neighbors.entry(a.as_str()).or_default().insert(b.as_str());
            neighbors.entry(b.as_str()).or_default().insert(a.as_str());
        }

        DegreeTable {
            degrees: neighbors
                .into_iter()
                .map(|(asn, set)| (asn.to_string(), set.len()))
                .collect(),
        }
    }

    /// Degree of `asn`, zero when it never appeared.
    pub fn degree(&self, asn: &str) -> usize {
        self.degrees.get(asn).copied().unwrap_or(0)
    }

    pub fn contains(&self, asn: &str) -> bool {
        self.degrees.contains_key(asn)
    }

    pub fn len(&self) -> usize {
        self.degrees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.degrees.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ASN, usize)> {
        self.degrees.iter().map(|(asn, &degree)| (asn, degree))
    }
}

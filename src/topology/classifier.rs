use std::collections::{BTreeSet, HashSet};

use serde::Serialize;
use tracing::info;

use crate::shared::{AsRankError, Relationship, Result, ASN, DEFAULT_PROVIDER_RATIO};

use super::degree::DegreeTable;
use super::graph::CustomerGraph;

/// One unordered link with its inferred relationship, `a` sorting before `b`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedLink {
    pub a: ASN,
    pub b: ASN,
    /// Relationship of `a` towards `b`.
    pub relationship: Relationship,
}

impl ClassifiedLink {
    /// `(provider, customer)` unless the link is a peering.
    pub fn provider_customer(&self) -> Option<(&str, &str)> {
        match self.relationship {
            Relationship::ProviderToCustomer => Some((&self.a, &self.b)),
            Relationship::CustomerToProvider => Some((&self.b, &self.a)),
            Relationship::PeerToPeer => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ClassificationStats {
    pub total_links: usize,
    pub customer_links: usize,
    pub peer_links: usize,
    /// Provider/customer links dropped because the customer is protected.
    pub protected_dropped: usize,
}

/// Degree-ratio heuristic: the endpoint with more than `provider_ratio` times the other's
/// degree is the provider, otherwise the two are peers. Each pair is decided on its own.
#[derive(Debug, Clone)]
pub struct RelationshipClassifier {
    pub provider_ratio: f64,
    /// Identifiers that may never end up on the customer side of a link.
    pub protected: HashSet<ASN>,
}

impl RelationshipClassifier {
    pub fn new() -> Self {
        RelationshipClassifier {
            provider_ratio: DEFAULT_PROVIDER_RATIO,
            protected: HashSet::new(),
        }
    }

    pub fn with_provider_ratio(mut self, ratio: f64) -> Self {
        self.provider_ratio = ratio;
        self
    }

    pub fn with_protected<I, S>(mut self, asns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<ASN>,
    {
        self.protected = asns.into_iter().map(Into::into).collect();
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !self.provider_ratio.is_finite() || self.provider_ratio <= 0.0 {
            return Err(AsRankError::config(format!(
                "provider ratio must be a positive number, got {}",
                self.provider_ratio
            )));
        }
        Ok(())
    }

    /// Relationship of the endpoint with degree `d1` towards the one with degree `d2`.
    pub fn classify(&self, d1: usize, d2: usize) -> Relationship {
        let (d1, d2) = (d1 as f64, d2 as f64);
        if d1 > d2 * self.provider_ratio {
            Relationship::ProviderToCustomer
        } else if d2 > d1 * self.provider_ratio {
            Relationship::CustomerToProvider
        } else {
            Relationship::PeerToPeer
        }
    }

    /// Classifies every distinct unordered pair exactly once, in pair order. Rows joining an
    /// identifier to itself are not links and are ignored.
    pub fn classify_links(&self, edges: &[(ASN, ASN)], degrees: &DegreeTable) -> Vec<ClassifiedLink> {
        let pairs: BTreeSet<(&str, &str)> = edges
            .iter()
            .filter(|(a, b)| a != b)
            .map(|(a, b)| {
                if a <= b {
                    (a.as_str(), b.as_str())
                } else {
                    (b.as_str(), a.as_str())
                }
            })
            .collect();

        pairs
            .into_iter()
            .map(|(a, b)| ClassifiedLink {
                a: a.to_string(),
                b: b.to_string(),
                relationship: self.classify(degrees.degree(a), degrees.degree(b)),
            })
            .collect()
    }

    /// Builds the customer graph from the full edge list. `degrees` must already cover
    /// every edge.
    pub fn build_hierarchy(
        &self,
        edges: &[(ASN, ASN)],
        degrees: &DegreeTable,
    ) -> (CustomerGraph, ClassificationStats) {
        let mut graph = CustomerGraph::from_degrees(degrees);
        let mut stats = ClassificationStats::default();

        for link in self.classify_links(edges, degrees) {
            stats.total_links += 1;
            match link.provider_customer() {
                Some((_, customer)) if self.protected.contains(customer) => {
                    stats.protected_dropped += 1;
                }
                Some((provider, customer)) => {
                    graph.add_customer(provider, customer);
                    stats.customer_links += 1;
                }
                None => stats.peer_links += 1,
            }
        }

        info!(
            links = stats.total_links,
            customer = stats.customer_links,
            peer = stats.peer_links,
            protected = stats.protected_dropped,
            "inferred relationships"
        );
        (graph, stats)
    }
}

impl Default for RelationshipClassifier {
    fn default() -> Self {
        Self::new()
    }
}

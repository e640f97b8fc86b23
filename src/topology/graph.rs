use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use crate::shared::ASN;

use super::cone::Cones;
use super::degree::DegreeTable;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopologyNode {
    pub asn: ASN,
    /// Distinct neighbors in the undirected relationship set.
    pub degree: usize,
    /// Confirmed direct customers.
    pub customers: HashSet<ASN>,
    pub cone_size: usize,
}

impl TopologyNode {
    pub fn new(asn: ASN, degree: usize) -> Self {
        TopologyNode {
            asn,
            degree,
            customers: HashSet::new(),
            cone_size: 0,
        }
    }

    pub fn is_stub(&self) -> bool {
        self.customers.is_empty()
    }

    /// Cone size per direct customer; zero for stubs.
    pub fn customer_efficiency(&self) -> f64 {
        if self.customers.is_empty() {
            return 0.0;
        }
        self.cone_size as f64 / self.customers.len() as f64
    }
}

/// Directed provider -> customer graph over every identifier seen in the edge list.
///
/// Nothing here guarantees acyclicity; the degree heuristic can orient links into a cycle.
#[derive(Debug, Clone, Default)]
pub struct CustomerGraph {
    pub nodes: HashMap<ASN, TopologyNode>,
}

impl CustomerGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// One node per identifier in the degree table, no customers yet.
    pub fn from_degrees(degrees: &DegreeTable) -> Self {
        CustomerGraph {
            nodes: degrees
                .iter()
                .map(|(asn, degree)| (asn.clone(), TopologyNode::new(asn.clone(), degree)))
                .collect(),
        }
    }

    pub fn get(&self, asn: &str) -> Option<&TopologyNode> {
        self.nodes.get(asn)
    }

    pub fn insert(&mut self, node: TopologyNode) {
        self.nodes.insert(node.asn.clone(), node);
    }

    /// Records `customer` under `provider`, creating either node if needed.
    pub fn add_customer(&mut self, provider: &str, customer: &str) {
        self.nodes
            .entry(customer.to_string())
            .or_insert_with(|| TopologyNode::new(customer.to_string(), 0));
        self.nodes
            .entry(provider.to_string())
            .or_insert_with(|| TopologyNode::new(provider.to_string(), 0))
            .customers
            .insert(customer.to_string());
    }

    pub fn customers_of(&self, asn: &str) -> Option<&HashSet<ASN>> {
        self.nodes.get(asn).map(|node| &node.customers)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TopologyNode> {
        self.nodes.values()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn customer_link_count(&self) -> usize {
        self.nodes.values().map(|node| node.customers.len()).sum()
    }

    pub fn assign_cone_sizes(&mut self, cones: &Cones) {
        for node in self.nodes.values_mut() {
            node.cone_size = cones.size(&node.asn).unwrap_or(0);
        }
    }

    /// Nodes by cone size, then degree, both descending; ties broken by identifier.
    pub fn ranked(&self) -> Vec<&TopologyNode> {
        let mut list: Vec<&TopologyNode> = self.nodes.values().collect();
        list.sort_by(|a, b| {
            b.cone_size
                .cmp(&a.cone_size)
                .then_with(|| b.degree.cmp(&a.degree))
                .then_with(|| a.asn.cmp(&b.asn))
        });
        list
    }

    /// Provider -> sorted customers, for providers with at least one customer.
    pub fn downstream_map(&self) -> BTreeMap<&str, BTreeSet<&str>> {
        self.nodes
            .values()
            .filter(|node| !node.customers.is_empty())
            .map(|node| {
                (
                    node.asn.as_str(),
                    node.customers.iter().map(String::as_str).collect(),
                )
            })
            .collect()
    }
}

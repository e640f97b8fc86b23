use std::collections::{BTreeSet, HashMap, HashSet};

use tracing::{debug, info, warn};

use crate::shared::ASN;

use super::graph::CustomerGraph;

const UNVISITED: usize = usize::MAX;

/// Customer cones of every node in a [`CustomerGraph`].
///
/// Identifiers are interned into slots; each strongly connected component owns one
/// finalized reachable set, shared by all of its members.
#[derive(Debug, Clone)]
pub struct Cones {
    slots: HashMap<ASN, usize>,
    asns: Vec<ASN>,
    component: Vec<usize>,
    reach: Vec<HashSet<usize>>,
    cyclic: Vec<bool>,
}

impl Cones {
    /// Number of distinct nodes reachable through one or more customer edges, not counting
    /// the node itself.
    pub fn size(&self, asn: &str) -> Option<usize> {
        let slot = *self.slots.get(asn)?;
        let reach = &self.reach[self.component[slot]];
        Some(reach.len() - usize::from(reach.contains(&slot)))
    }

    pub fn members(&self, asn: &str) -> Option<BTreeSet<&str>> {
        let slot = *self.slots.get(asn)?;
        Some(
            self.reach[self.component[slot]]
                .iter()
                .filter(|&&member| member != slot)
                .map(|&member| self.asns[member].as_str())
                .collect(),
        )
    }

    /// Whether `asn` sits on a provider/customer cycle.
    pub fn on_cycle(&self, asn: &str) -> bool {
        self.slots
            .get(asn)
            .map(|&slot| self.cyclic[self.component[slot]])
            .unwrap_or(false)
    }

    pub fn cyclic_components(&self) -> usize {
        self.cyclic.iter().filter(|&&cyclic| cyclic).count()
    }

    pub fn len(&self) -> usize {
        self.asns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.asns.is_empty()
    }

    pub fn sizes(&self) -> impl Iterator<Item = (&str, usize)> + '_ {
        self.asns
            .iter()
            .filter_map(move |asn| self.size(asn).map(|size| (asn.as_str(), size)))
    }
}

/// Walks the customer graph once with an explicit stack, so deep hierarchies cannot blow
/// the call stack and cycles cannot loop.
///
/// Nodes on the active walk are tracked; reaching one of them again closes a cycle instead
/// of expanding it. When a component is complete every component it points at is already
/// final, so its reachable set is the union of those cached sets plus its direct targets
/// (and its own members when it is a cycle).
pub struct ConeCalculator<'g> {
    graph: &'g CustomerGraph,
}

struct Frame {
    slot: usize,
    next: usize,
}

impl<'g> ConeCalculator<'g> {
    pub fn new(graph: &'g CustomerGraph) -> Self {
        ConeCalculator { graph }
    }

    pub fn compute(&self) -> Cones {
        let (asns, slots, customers) = self.intern();
        let n = asns.len();

        let mut order = vec![UNVISITED; n];
        let mut low = vec![0usize; n];
        let mut on_path = vec![false; n];
        let mut path: Vec<usize> = Vec::new();
        let mut component = vec![UNVISITED; n];
        let mut reach: Vec<HashSet<usize>> = Vec::new();
        let mut cyclic: Vec<bool> = Vec::new();
        let mut visited = 0usize;

        for root in 0..n {
            if order[root] != UNVISITED {
                continue;
            }

            let mut stack = vec![Frame { slot: root, next: 0 }];
            order[root] = visited;
            low[root] = visited;
            visited += 1;
            path.push(root);
            on_path[root] = true;

            while let Some(frame) = stack.last_mut() {
                let v = frame.slot;

                if let Some(&w) = customers[v].get(frame.next) {
                    frame.next += 1;
                    if order[w] == UNVISITED {
                        order[w] = visited;
                        low[w] = visited;
                        visited += 1;
                        path.push(w);
                        on_path[w] = true;
                        stack.push(Frame { slot: w, next: 0 });
                    } else if on_path[w] {
                        low[v] = low[v].min(order[w]);
                    }
                    continue;
                }

                stack.pop();
                if let Some(parent) = stack.last() {
                    low[parent.slot] = low[parent.slot].min(low[v]);
                }
                if low[v] != order[v] {
                    continue;
                }

                let id = reach.len();
                let mut members = Vec::new();
                while let Some(member) = path.pop() {
                    on_path[member] = false;
                    component[member] = id;
                    members.push(member);
                    if member == v {
                        break;
                    }
                }

                let is_cycle = members.len() > 1 || customers[v].contains(&v);
                let mut cone = HashSet::new();
                for &member in &members {
                    for &target in &customers[member] {
                        let target_component = component[target];
                        if target_component != id {
                            cone.insert(target);
                            cone.extend(reach[target_component].iter().copied());
                        }
                    }
                }
                if is_cycle {
                    cone.extend(members.iter().copied());
                }

                reach.push(cone);
                cyclic.push(is_cycle);
            }
        }

        let cones = Cones {
            slots,
            asns,
            component,
            reach,
            cyclic,
        };

        let cycles = cones.cyclic_components();
        if cycles > 0 {
            warn!(components = cycles, "customer graph contains provider/customer cycles");
        }
        info!(nodes = cones.len(), "customer cones computed");
        cones
    }

    /// Assigns every identifier (including customers missing from the node map) a slot in
    /// sorted order and builds slot adjacency.
    fn intern(&self) -> (Vec<ASN>, HashMap<ASN, usize>, Vec<Vec<usize>>) {
        let mut all: BTreeSet<&str> = BTreeSet::new();
        for node in self.graph.iter() {
            all.insert(&node.asn);
            all.extend(node.customers.iter().map(String::as_str));
        }

        let asns: Vec<ASN> = all.into_iter().map(str::to_string).collect();
        let slots: HashMap<ASN, usize> = asns
            .iter()
            .enumerate()
            .map(|(slot, asn)| (asn.clone(), slot))
            .collect();

        let mut customers = vec![Vec::new(); asns.len()];
        for node in self.graph.iter() {
            let slot = slots[&node.asn];
            let mut targets: Vec<usize> = node.customers.iter().map(|c| slots[c]).collect();
            targets.sort_unstable();
            customers[slot] = targets;
        }

        debug!(nodes = asns.len(), "interned customer graph");
        (asns, slots, customers)
    }
}

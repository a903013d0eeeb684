//! Graph algorithms for code analysis
//!
//! Read-only, O(V+E) operations over a [`GraphStore`]: strongly-connected
//! component cycle detection, forward/reverse reachability, unweighted
//! shortest path, and bounded neighborhood expansion.
//!
//! # Determinism
//!
//! Every algorithm visits vertices in the store's insertion order and edges
//! in adjacency order, so results are stable across runs for the same build
//! inputs.
//!
//! # Failure semantics
//!
//! Impact, ancestors, and neighbors are exploratory: a start id absent from
//! the store yields an empty result. Shortest path and cycle queries that
//! explicitly name an unknown node return [`QueryError::TargetNotFound`],
//! because those queries are precise rather than exploratory.

use std::collections::VecDeque;

use ahash::{AHashMap, AHashSet};
use serde::{Deserialize, Serialize};

use crate::error::{QueryError, Result};

use super::{EdgeFilter, GraphStore};

/// Default ceiling on traversal depth when the caller gives none.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Default ceiling on the number of nodes a traversal may return.
pub const DEFAULT_MAX_RESULTS: usize = 10_000;

/// Caller-supplied bounds on traversal work.
///
/// A traversal that would exceed these bounds truncates its result rather
/// than running unbounded; latency and memory stay proportional to the
/// ceiling, not to the graph.
#[derive(Debug, Clone, Copy)]
pub struct TraversalLimits {
    pub max_depth: usize,
    pub max_results: usize,
}

impl Default for TraversalLimits {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_results: DEFAULT_MAX_RESULTS,
        }
    }
}

impl TraversalLimits {
    pub fn with_depth(depth: usize) -> Self {
        Self {
            max_depth: depth,
            ..Self::default()
        }
    }
}

/// Edge direction for neighborhood expansion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Outgoing,
    Incoming,
    Both,
}

/// Kind of cycle found by SCC detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleKind {
    /// An edge targets its own source
    SelfLoop,
    /// Two or more nodes reach each other
    MutualRecursion,
}

/// A single cycle: node ids listed in an order that follows the cycle's
/// edges, starting from the lexicographically smallest member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cycle {
    pub kind: CycleKind,
    pub members: Vec<String>,
}

/// All cycles detected in one pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleReport {
    pub cycles: Vec<Cycle>,
}

impl CycleReport {
    pub fn is_empty(&self) -> bool {
        self.cycles.is_empty()
    }
}

impl GraphStore {
    /// Detect every cycle in the graph under the given edge filter.
    ///
    /// Uses an iterative Tarjan strongly-connected-components pass. Every
    /// SCC with more than one member is a cycle; a single node forms a
    /// cycle only when a self-edge exists under the filter.
    ///
    /// # Returns
    /// Cycles ordered by their smallest member id; members of each cycle
    /// ordered along the cycle's edges.
    pub fn detect_cycles(&self, filter: &EdgeFilter) -> CycleReport {
        let vertices = self.traversal_vertices();
        let sccs = self.tarjan_sccs(&vertices, filter);

        let mut cycles = Vec::new();
        for scc in sccs {
            if scc.len() > 1 {
                cycles.push(Cycle {
                    kind: CycleKind::MutualRecursion,
                    members: self.order_along_cycle(scc, filter),
                });
            } else if self.has_self_edge(&scc[0], filter) {
                cycles.push(Cycle {
                    kind: CycleKind::SelfLoop,
                    members: scc,
                });
            }
        }

        cycles.sort_by(|a, b| a.members[0].cmp(&b.members[0]));
        CycleReport { cycles }
    }

    /// Cycles containing a specific node.
    ///
    /// # Errors
    /// [`QueryError::TargetNotFound`] when `id` has no node record — naming
    /// a node makes this a precise query, unlike exploratory traversals.
    pub fn cycles_containing(&self, id: &str, filter: &EdgeFilter) -> Result<Vec<Cycle>> {
        if !self.contains(id) {
            return Err(QueryError::TargetNotFound { id: id.to_string() });
        }
        Ok(self
            .detect_cycles(filter)
            .cycles
            .into_iter()
            .filter(|c| c.members.iter().any(|m| m == id))
            .collect())
    }

    /// All nodes reachable from `id` along outgoing edges, excluding `id`
    /// itself. Discovery (breadth-first) order.
    ///
    /// A start id absent from the store yields an empty result.
    pub fn impact(&self, id: &str, filter: &EdgeFilter, limits: &TraversalLimits) -> Vec<String> {
        self.bounded_walk(id, Direction::Outgoing, filter, limits)
    }

    /// All nodes from which `id` is reachable, excluding `id` itself.
    ///
    /// Mirror of [`GraphStore::impact`]: `B ∈ impact(A)` exactly when
    /// `A ∈ ancestors(B)` under the same filter.
    pub fn ancestors(
        &self,
        id: &str,
        filter: &EdgeFilter,
        limits: &TraversalLimits,
    ) -> Vec<String> {
        self.bounded_walk(id, Direction::Incoming, filter, limits)
    }

    /// All nodes within `depth` hops of `id` in the given direction,
    /// deduplicated, excluding `id` itself.
    pub fn neighbors(
        &self,
        id: &str,
        direction: Direction,
        depth: usize,
        filter: &EdgeFilter,
    ) -> Vec<String> {
        let limits = TraversalLimits {
            max_depth: depth,
            max_results: DEFAULT_MAX_RESULTS,
        };
        self.bounded_walk(id, direction, filter, &limits)
    }

    /// Minimum-edge-count path from `from` to `to` under the filter.
    ///
    /// Unweighted BFS; ties broken by first-discovered predecessor, which
    /// is stable given the fixed adjacency order.
    ///
    /// # Returns
    /// `Ok(Some(path))` including both endpoints, `Ok(None)` when `to` is
    /// unreachable within `max_depth` hops.
    ///
    /// # Errors
    /// [`QueryError::TargetNotFound`] when either endpoint has no node
    /// record.
    pub fn shortest_path(
        &self,
        from: &str,
        to: &str,
        filter: &EdgeFilter,
        max_depth: usize,
    ) -> Result<Option<Vec<String>>> {
        if !self.contains(from) {
            return Err(QueryError::TargetNotFound {
                id: from.to_string(),
            });
        }
        if !self.contains(to) {
            return Err(QueryError::TargetNotFound { id: to.to_string() });
        }
        if from == to {
            return Ok(Some(vec![from.to_string()]));
        }

        let mut predecessor: AHashMap<String, String> = AHashMap::new();
        let mut visited: AHashSet<String> = AHashSet::new();
        let mut queue: VecDeque<(String, usize)> = VecDeque::new();
        visited.insert(from.to_string());
        queue.push_back((from.to_string(), 0));

        while let Some((current, depth)) = queue.pop_front() {
            if depth >= max_depth {
                continue;
            }
            for edge in self.edges_from(&current, filter) {
                let next = &edge.target_id;
                if visited.contains(next) {
                    continue;
                }
                visited.insert(next.clone());
                predecessor.insert(next.clone(), current.clone());
                if next == to {
                    return Ok(Some(reconstruct_path(&predecessor, from, to)));
                }
                queue.push_back((next.clone(), depth + 1));
            }
        }

        Ok(None)
    }

    /// Breadth-first walk shared by impact/ancestors/neighbors.
    fn bounded_walk(
        &self,
        start: &str,
        direction: Direction,
        filter: &EdgeFilter,
        limits: &TraversalLimits,
    ) -> Vec<String> {
        let mut result = Vec::new();
        let mut visited: AHashSet<String> = AHashSet::new();
        let mut queue: VecDeque<(String, usize)> = VecDeque::new();
        visited.insert(start.to_string());
        queue.push_back((start.to_string(), 0));

        while let Some((current, depth)) = queue.pop_front() {
            if depth >= limits.max_depth {
                continue;
            }
            for next in self.step(&current, direction, filter) {
                if visited.contains(&next) {
                    continue;
                }
                visited.insert(next.clone());
                result.push(next.clone());
                if result.len() >= limits.max_results {
                    tracing::debug!(
                        start,
                        max_results = limits.max_results,
                        "traversal truncated at result ceiling"
                    );
                    return result;
                }
                queue.push_back((next, depth + 1));
            }
        }

        result
    }

    /// Ids adjacent to `id` one hop away in the given direction, in
    /// adjacency order.
    fn step(&self, id: &str, direction: Direction, filter: &EdgeFilter) -> Vec<String> {
        let mut out = Vec::new();
        if matches!(direction, Direction::Outgoing | Direction::Both) {
            out.extend(
                self.edges_from(id, filter)
                    .iter()
                    .map(|e| e.target_id.clone()),
            );
        }
        if matches!(direction, Direction::Incoming | Direction::Both) {
            out.extend(
                self.edges_to(id, filter)
                    .iter()
                    .map(|e| e.source_id.clone()),
            );
        }
        out
    }

    /// Vertex set for whole-graph passes: every node record plus every
    /// dangling edge endpoint, in deterministic first-seen order.
    fn traversal_vertices(&self) -> Vec<String> {
        let mut seen: AHashSet<&str> = self.node_ids().iter().map(String::as_str).collect();
        let mut vertices: Vec<String> = self.node_ids().to_vec();
        for edge in self.edges() {
            for endpoint in [&edge.source_id, &edge.target_id] {
                if seen.insert(endpoint) {
                    vertices.push(endpoint.clone());
                }
            }
        }
        vertices
    }

    fn has_self_edge(&self, id: &str, filter: &EdgeFilter) -> bool {
        self.edges_from(id, filter)
            .iter()
            .any(|e| e.target_id == id)
    }

    /// Iterative Tarjan SCC over integer-indexed vertices. Components are
    /// returned in completion order; the caller decides which count as
    /// cycles.
    fn tarjan_sccs(&self, vertices: &[String], filter: &EdgeFilter) -> Vec<Vec<String>> {
        const UNVISITED: usize = usize::MAX;

        let index_of: AHashMap<&str, usize> = vertices
            .iter()
            .enumerate()
            .map(|(i, v)| (v.as_str(), i))
            .collect();

        let adjacency: Vec<Vec<usize>> = vertices
            .iter()
            .map(|v| {
                self.edges_from(v, filter)
                    .iter()
                    .filter_map(|e| index_of.get(e.target_id.as_str()).copied())
                    .collect()
            })
            .collect();

        let n = vertices.len();
        let mut index = vec![UNVISITED; n];
        let mut lowlink = vec![0usize; n];
        let mut on_stack = vec![false; n];
        let mut stack: Vec<usize> = Vec::new();
        let mut next_index = 0usize;
        let mut sccs: Vec<Vec<String>> = Vec::new();

        for root in 0..n {
            if index[root] != UNVISITED {
                continue;
            }

            // Explicit (vertex, successor cursor) work stack replaces
            // recursion so deep graphs cannot overflow the call stack.
            let mut work: Vec<(usize, usize)> = vec![(root, 0)];
            index[root] = next_index;
            lowlink[root] = next_index;
            next_index += 1;
            on_stack[root] = true;
            stack.push(root);

            while let Some(&mut (v, ref mut cursor)) = work.last_mut() {
                if *cursor < adjacency[v].len() {
                    let w = adjacency[v][*cursor];
                    *cursor += 1;
                    if index[w] == UNVISITED {
                        index[w] = next_index;
                        lowlink[w] = next_index;
                        next_index += 1;
                        on_stack[w] = true;
                        stack.push(w);
                        work.push((w, 0));
                    } else if on_stack[w] {
                        lowlink[v] = lowlink[v].min(index[w]);
                    }
                } else {
                    work.pop();
                    if lowlink[v] == index[v] {
                        let mut component = Vec::new();
                        while let Some(w) = stack.pop() {
                            on_stack[w] = false;
                            component.push(vertices[w].clone());
                            if w == v {
                                break;
                            }
                        }
                        sccs.push(component);
                    }
                    if let Some(&mut (parent, _)) = work.last_mut() {
                        lowlink[parent] = lowlink[parent].min(lowlink[v]);
                    }
                }
            }
        }

        sccs
    }

    /// Order SCC members along the cycle: start at the smallest id and
    /// follow intra-component edges in adjacency order. Deterministic, and
    /// for simple cycles the result is the cycle path itself.
    fn order_along_cycle(&self, mut members: Vec<String>, filter: &EdgeFilter) -> Vec<String> {
        members.sort();
        let member_set: AHashSet<&str> = members.iter().map(String::as_str).collect();

        let mut ordered: Vec<String> = Vec::with_capacity(members.len());
        let mut placed: AHashSet<String> = AHashSet::with_capacity(members.len());
        let mut current = members[0].clone();
        placed.insert(current.clone());
        ordered.push(current.clone());

        while ordered.len() < members.len() {
            let next = self
                .edges_from(&current, filter)
                .iter()
                .map(|e| e.target_id.clone())
                .find(|t| member_set.contains(t.as_str()) && !placed.contains(t));
            // Branchy SCCs may strand the walk; restart from the next
            // unplaced member in sorted order.
            let next = next.unwrap_or_else(|| {
                members
                    .iter()
                    .find(|m| !placed.contains(*m))
                    .expect("unplaced member exists while ordered is short")
                    .clone()
            });
            placed.insert(next.clone());
            ordered.push(next.clone());
            current = next;
        }

        ordered
    }
}

fn reconstruct_path(
    predecessor: &AHashMap<String, String>,
    from: &str,
    to: &str,
) -> Vec<String> {
    let mut path = vec![to.to_string()];
    let mut current = to;
    while current != from {
        let prev = predecessor
            .get(current)
            .expect("predecessor chain reaches the source");
        path.push(prev.clone());
        current = prev;
    }
    path.reverse();
    path
}

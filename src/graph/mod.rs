//! In-memory code graph store
//!
//! The store is built once per change-set from flat node and edge lists and
//! is immutable afterwards. All adjacency indices are populated at build
//! time in input order, so rebuilding from the same inputs yields an
//! identical structure and every scan or traversal is deterministic.

mod schema;
mod snapshot;

pub mod algorithms;

use ahash::{AHashMap, AHashSet};

pub use algorithms::{
    Cycle, CycleKind, CycleReport, Direction, TraversalLimits, DEFAULT_MAX_DEPTH,
    DEFAULT_MAX_RESULTS,
};
pub use schema::{Edge, EdgeKind, Node, NodeKind};
pub use snapshot::GraphSnapshots;

/// Restriction of a traversal to a set of edge kinds.
///
/// `EdgeFilter::all()` (or an empty allow-set) places no restriction; a
/// non-empty set restricts traversal to exactly those kinds.
#[derive(Debug, Clone, Default)]
pub struct EdgeFilter {
    allowed: Option<AHashSet<EdgeKind>>,
}

impl EdgeFilter {
    /// Allow every edge kind.
    pub fn all() -> Self {
        Self { allowed: None }
    }

    /// Restrict traversal to the given kinds. An empty list means "all".
    pub fn only<I: IntoIterator<Item = EdgeKind>>(kinds: I) -> Self {
        let set: AHashSet<EdgeKind> = kinds.into_iter().collect();
        if set.is_empty() {
            Self::all()
        } else {
            Self { allowed: Some(set) }
        }
    }

    pub fn allows(&self, kind: &EdgeKind) -> bool {
        match &self.allowed {
            None => true,
            Some(set) => set.contains(kind),
        }
    }

    /// Edge kinds in the allow-set, sorted, or `None` when unrestricted.
    pub fn kinds(&self) -> Option<Vec<EdgeKind>> {
        self.allowed.as_ref().map(|set| {
            let mut kinds: Vec<EdgeKind> = set.iter().cloned().collect();
            kinds.sort_by(|a, b| a.as_str().cmp(b.as_str()));
            kinds
        })
    }
}

/// Immutable in-memory graph of code entities.
///
/// Construction is O(V+E). Duplicate node ids overwrite in place: the first
/// insertion fixes the node's position in scan order, later inserts only
/// replace the record. Edges referencing ids with no node record are kept;
/// they resolve to unknown nodes at read time.
pub struct GraphStore {
    nodes: AHashMap<String, Node>,
    /// Node ids in first-insertion order; fixes scan and traversal order.
    node_order: Vec<String>,
    edges: Vec<Edge>,
    /// node id -> indices into `edges`, in insertion order
    outgoing: AHashMap<String, Vec<usize>>,
    incoming: AHashMap<String, Vec<usize>>,
    /// edge kind -> indices into `edges`, in insertion order
    by_kind: AHashMap<EdgeKind, Vec<usize>>,
    /// simple name -> node ids, in insertion order
    by_name: AHashMap<String, Vec<String>>,
}

impl GraphStore {
    /// Build a store from flat node and edge lists.
    ///
    /// # Determinism
    /// Indices are populated strictly in input order. Building twice from
    /// the same lists yields identical adjacency structure.
    pub fn build(nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        let mut node_map: AHashMap<String, Node> = AHashMap::with_capacity(nodes.len());
        let mut node_order: Vec<String> = Vec::with_capacity(nodes.len());
        let mut by_name: AHashMap<String, Vec<String>> = AHashMap::new();

        for node in nodes {
            match node_map.get(&node.id) {
                None => {
                    node_order.push(node.id.clone());
                    by_name
                        .entry(node.name.clone())
                        .or_default()
                        .push(node.id.clone());
                }
                Some(previous) => {
                    // Overwrite may change the simple name; keep the name index exact.
                    if previous.name != node.name {
                        if let Some(ids) = by_name.get_mut(&previous.name) {
                            ids.retain(|id| id != &node.id);
                        }
                        by_name
                            .entry(node.name.clone())
                            .or_default()
                            .push(node.id.clone());
                    }
                }
            }
            node_map.insert(node.id.clone(), node);
        }

        let mut outgoing: AHashMap<String, Vec<usize>> = AHashMap::new();
        let mut incoming: AHashMap<String, Vec<usize>> = AHashMap::new();
        let mut by_kind: AHashMap<EdgeKind, Vec<usize>> = AHashMap::new();

        for (idx, edge) in edges.iter().enumerate() {
            outgoing.entry(edge.source_id.clone()).or_default().push(idx);
            incoming.entry(edge.target_id.clone()).or_default().push(idx);
            by_kind.entry(edge.kind.clone()).or_default().push(idx);
        }

        tracing::debug!(
            nodes = node_order.len(),
            edges = edges.len(),
            "graph store built"
        );

        Self {
            nodes: node_map,
            node_order,
            edges,
            outgoing,
            incoming,
            by_kind,
            by_name,
        }
    }

    /// Empty store. Mostly useful as a placeholder before the first build.
    pub fn empty() -> Self {
        Self::build(Vec::new(), Vec::new())
    }

    /// Look up a node by identifier.
    pub fn get(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Whether a node record exists for the identifier.
    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// Outgoing edges of a node, restricted by the filter.
    ///
    /// Unknown ids yield an empty list, not an error.
    pub fn edges_from<'a>(&'a self, id: &str, filter: &EdgeFilter) -> Vec<&'a Edge> {
        self.adjacent(&self.outgoing, id, filter)
    }

    /// Incoming edges of a node, restricted by the filter.
    pub fn edges_to<'a>(&'a self, id: &str, filter: &EdgeFilter) -> Vec<&'a Edge> {
        self.adjacent(&self.incoming, id, filter)
    }

    fn adjacent<'a>(
        &'a self,
        index: &AHashMap<String, Vec<usize>>,
        id: &str,
        filter: &EdgeFilter,
    ) -> Vec<&'a Edge> {
        index
            .get(id)
            .map(|indices| {
                indices
                    .iter()
                    .map(|&i| &self.edges[i])
                    .filter(|e| filter.allows(&e.kind))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn node_count(&self) -> usize {
        self.node_order.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// All edge kinds present in the store, sorted by canonical form.
    pub fn distinct_edge_kinds(&self) -> Vec<EdgeKind> {
        let mut kinds: Vec<EdgeKind> = self.by_kind.keys().cloned().collect();
        kinds.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        kinds
    }

    /// Node ids in first-insertion order.
    pub fn node_ids(&self) -> &[String] {
        &self.node_order
    }

    /// Nodes in first-insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.node_order.iter().filter_map(|id| self.nodes.get(id))
    }

    /// All edges, in input order.
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Node ids whose simple name matches exactly, in insertion order.
    pub fn ids_by_name(&self, name: &str) -> &[String] {
        self.by_name.get(name).map(Vec::as_slice).unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_store() -> GraphStore {
        let nodes = vec![
            Node::new(NodeKind::Function, "foo", "a.py"),
            Node::new(NodeKind::Function, "bar", "b.py"),
            Node::new(NodeKind::Class, "Baz", "c.py"),
        ];
        let edges = vec![
            Edge::new("function:a.py:foo", "function:b.py:bar", EdgeKind::Calls),
            Edge::new("function:a.py:foo", "class:c.py:Baz", EdgeKind::References),
            Edge::new("function:b.py:bar", "class:c.py:Baz", EdgeKind::Calls),
        ];
        GraphStore::build(nodes, edges)
    }

    #[test]
    fn test_build_indexes_nodes_and_edges() {
        let store = small_store();
        assert_eq!(store.node_count(), 3);
        assert_eq!(store.edge_count(), 3);
        assert!(store.contains("function:a.py:foo"));
        assert!(!store.contains("function:a.py:missing"));
    }

    #[test]
    fn test_duplicate_node_id_overwrites_in_place() {
        let nodes = vec![
            Node::new(NodeKind::Function, "foo", "a.py").with_complexity(1.0),
            Node::new(NodeKind::Function, "bar", "b.py"),
            Node::new(NodeKind::Function, "foo", "a.py").with_complexity(9.0),
        ];
        let store = GraphStore::build(nodes, Vec::new());

        assert_eq!(store.node_count(), 2);
        // First insertion fixed the scan position, last insertion won the data.
        assert_eq!(store.node_ids()[0], "function:a.py:foo");
        assert_eq!(store.get("function:a.py:foo").unwrap().complexity, 9.0);
    }

    #[test]
    fn test_edge_filter_restricts_adjacency() {
        let store = small_store();
        let calls = EdgeFilter::only([EdgeKind::Calls]);
        let all = EdgeFilter::all();

        assert_eq!(store.edges_from("function:a.py:foo", &all).len(), 2);
        assert_eq!(store.edges_from("function:a.py:foo", &calls).len(), 1);
        assert_eq!(store.edges_to("class:c.py:Baz", &calls).len(), 1);
    }

    #[test]
    fn test_empty_filter_means_all_kinds() {
        let store = small_store();
        let filter = EdgeFilter::only(Vec::<EdgeKind>::new());
        assert_eq!(store.edges_from("function:a.py:foo", &filter).len(), 2);
    }

    #[test]
    fn test_dangling_edges_are_tolerated() {
        let nodes = vec![Node::new(NodeKind::Function, "foo", "a.py")];
        let edges = vec![Edge::new(
            "function:a.py:foo",
            "function:ghost.py:ghost",
            EdgeKind::Calls,
        )];
        let store = GraphStore::build(nodes, edges);

        assert_eq!(
            store.edges_from("function:a.py:foo", &EdgeFilter::all()).len(),
            1
        );
        assert!(!store.contains("function:ghost.py:ghost"));
    }

    #[test]
    fn test_rebuild_is_deterministic() {
        let a = small_store();
        let b = small_store();
        assert_eq!(a.node_ids(), b.node_ids());
        assert_eq!(a.edges(), b.edges());
        assert_eq!(a.distinct_edge_kinds(), b.distinct_edge_kinds());
    }

    #[test]
    fn test_distinct_edge_kinds_sorted() {
        let store = small_store();
        assert_eq!(
            store.distinct_edge_kinds(),
            vec![EdgeKind::Calls, EdgeKind::References]
        );
    }

    #[test]
    fn test_ids_by_name() {
        let store = small_store();
        assert_eq!(store.ids_by_name("foo"), ["function:a.py:foo"]);
        assert!(store.ids_by_name("nope").is_empty());
    }
}

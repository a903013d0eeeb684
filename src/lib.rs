//! Sextant: deterministic structural queries over a code graph
//!
//! Sextant indexes a codebase as a typed directed graph — files,
//! functions, classes and modules as nodes; imports/calls/inherits/
//! contains as edges — and answers structural questions about it:
//! what breaks if X changes, where the circular imports are, how two
//! modules connect.
//!
//! The graph is built wholesale from flat node and edge lists produced by
//! external parsers, held immutably in memory, and swapped atomically on
//! rebuild ([`GraphSnapshots`]). Queries arrive as strings in either of
//! two surfaces (`SELECT * FROM functions WHERE complexity > 50` or
//! `fn c>50`), parse to one AST, and execute as either a relational scan
//! or a graph traversal.
//!
//! # Example
//!
//! ```
//! use sextant::graph::{Edge, EdgeKind, GraphStore, Node, NodeKind};
//! use sextant::query::{QueryExecutor, QueryOutput};
//!
//! let store = GraphStore::build(
//!     vec![
//!         Node::new(NodeKind::Function, "foo", "a.py"),
//!         Node::new(NodeKind::Function, "bar", "b.py"),
//!     ],
//!     vec![Edge::new("function:a.py:foo", "function:b.py:bar", EdgeKind::Calls)],
//! );
//!
//! let out = QueryExecutor::new(&store).run("impact foo")?;
//! assert_eq!(out, QueryOutput::Nodes(vec!["function:b.py:bar".to_string()]));
//! # Ok::<(), sextant::QueryError>(())
//! ```
//!
//! # Determinism
//!
//! Every operation is deterministic for a given build input: adjacency
//! indices are populated in input order, traversals visit in that order,
//! and result ordering is stable. Rebuilding from identical lists yields
//! identical structure.

pub mod error;
pub mod graph;
pub mod query;
pub mod resolver;

pub use error::{QueryError, Result, VALID_TABLES};
pub use graph::{
    Cycle, CycleKind, CycleReport, Direction, Edge, EdgeFilter, EdgeKind, GraphSnapshots,
    GraphStore, Node, NodeKind, TraversalLimits,
};
pub use query::{
    normalize, parse, PathOutcome, QueryExecutor, QueryOutput, Statement, Table, Value,
};
pub use resolver::{
    Candidate, Chooser, MatchTier, NodeResolver, Resolution, ResolutionStrategy,
};

//! Plan execution
//!
//! Runs a [`Plan`] against one [`GraphStore`] snapshot. Relational scans
//! filter the node collection (in parallel for large stores, preserving
//! scan order), then group, aggregate, order and limit; graph plans
//! resolve their references through the [`NodeResolver`] and dispatch to
//! the matching algorithm. Final shaping — projection, stable ordering,
//! limiting — is applied uniformly regardless of which path produced the
//! rows.

use std::cmp::Ordering;

use rayon::prelude::*;
use serde::Serialize;

use crate::error::{QueryError, Result};
use crate::graph::{
    Cycle, EdgeFilter, EdgeKind, GraphStore, Node, TraversalLimits,
};
use crate::resolver::{NodeResolver, ResolutionStrategy};

use super::ast::*;
use super::normalize::normalize;
use super::parser::parse;
use super::planner::{self, Plan, ScanPlan, TraverseOp};

/// Scalar node fields, in `SELECT *` projection order.
pub const SCALAR_COLUMNS: &[&str] = &[
    "id",
    "kind",
    "name",
    "qualified_name",
    "file_path",
    "line_start",
    "line_end",
    "complexity",
];

/// Stores at or above this many nodes scan with rayon.
const PARALLEL_SCAN_THRESHOLD: usize = 4096;

/// Structured query result. Rendering to text tables, JSON or CSV is the
/// consumer's responsibility.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryOutput {
    Table(Table),
    Nodes(Vec<String>),
    Cycles(Vec<Cycle>),
    Path(PathOutcome),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PathOutcome {
    Found(Vec<String>),
    Unreachable,
}

/// Executes queries against one graph snapshot.
pub struct QueryExecutor<'a> {
    store: &'a GraphStore,
    resolver: NodeResolver<'a>,
    limits: TraversalLimits,
}

impl<'a> QueryExecutor<'a> {
    pub fn new(store: &'a GraphStore) -> Self {
        Self {
            store,
            resolver: NodeResolver::new(store, ResolutionStrategy::default()),
            limits: TraversalLimits::default(),
        }
    }

    /// Replace the reference-resolution strategy.
    pub fn with_strategy(self, strategy: ResolutionStrategy) -> Self {
        let store = self.store;
        self.with_resolver(NodeResolver::new(store, strategy))
    }

    /// Replace the resolver wholesale (for an Interactive chooser).
    pub fn with_resolver(mut self, resolver: NodeResolver<'a>) -> Self {
        self.resolver = resolver;
        self
    }

    /// Replace the engine-enforced traversal ceilings.
    pub fn with_limits(mut self, limits: TraversalLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Parse, plan and execute a query string in either surface.
    pub fn run(&self, query: &str) -> Result<QueryOutput> {
        let statement = parse(query)?;
        tracing::debug!(query = %normalize(&statement), "executing query");
        let plan = planner::plan(statement)?;
        self.execute(plan)
    }

    /// Execute an already-built plan.
    pub fn execute(&self, plan: Plan) -> Result<QueryOutput> {
        match plan {
            Plan::Scan(scan) => self.execute_scan(scan),
            Plan::Traverse(op) => self.execute_traverse(op),
        }
    }

    fn resolve(&self, reference: &str) -> Result<String> {
        self.resolver.resolve(reference).map(|r| r.id)
    }

    // ------------------------------------------------------------------
    // Relational path
    // ------------------------------------------------------------------

    fn execute_scan(&self, plan: ScanPlan) -> Result<QueryOutput> {
        let filtered = self.filtered_nodes(&plan);

        let aggregated = !plan.group_by.is_empty()
            || plan.having.is_some()
            || plan.items.iter().any(|item| {
                matches!(
                    item,
                    SelectItem::Expr {
                        expr: Expr::Aggregate { .. },
                        ..
                    }
                )
            });

        let table = if aggregated {
            grouped_table(&plan, &filtered)
        } else {
            plain_table(&plan, filtered)
        };
        Ok(QueryOutput::Table(table))
    }

    fn filtered_nodes(&self, plan: &ScanPlan) -> Vec<&Node> {
        let matches =
            |node: &&Node| plan.predicate.as_ref().map_or(true, |p| eval_predicate(node, p));

        // Order-preserving even in the parallel case: rayon's collect
        // keeps the input order of an ordered parallel iterator.
        if self.store.node_count() >= PARALLEL_SCAN_THRESHOLD {
            self.store
                .node_ids()
                .par_iter()
                .filter_map(|id| self.store.get(id))
                .filter(matches)
                .collect()
        } else {
            self.store.nodes().filter(matches).collect()
        }
    }

    // ------------------------------------------------------------------
    // Graph path
    // ------------------------------------------------------------------

    fn execute_traverse(&self, op: TraverseOp) -> Result<QueryOutput> {
        match op {
            TraverseOp::Neighbors {
                target,
                direction,
                depth,
                via,
            } => {
                let id = self.resolve(&target)?;
                let ids = self
                    .store
                    .neighbors(&id, direction, depth, &edge_filter(&via));
                Ok(QueryOutput::Nodes(ids))
            }
            TraverseOp::Impact { target, depth, via } => {
                let id = self.resolve(&target)?;
                let limits = TraversalLimits {
                    max_depth: depth.unwrap_or(self.limits.max_depth),
                    max_results: self.limits.max_results,
                };
                let ids = self.store.impact(&id, &edge_filter(&via), &limits);
                Ok(QueryOutput::Nodes(ids))
            }
            TraverseOp::Cycles { via } => {
                let filter = match via {
                    Some(kind) => EdgeFilter::only([kind]),
                    None => EdgeFilter::all(),
                };
                Ok(QueryOutput::Cycles(self.store.detect_cycles(&filter).cycles))
            }
            TraverseOp::Related {
                target,
                relation,
                kind,
            } => {
                let id = self.resolve(&target)?;
                Ok(QueryOutput::Nodes(self.related_ids(&id, relation, kind)))
            }
            TraverseOp::Path {
                from,
                to,
                max_depth,
                via,
            } => {
                let from_id = self.resolve(&from)?;
                let to_id = self.resolve(&to)?;
                let path = self.store.shortest_path(
                    &from_id,
                    &to_id,
                    &edge_filter(&via),
                    max_depth.unwrap_or(self.limits.max_depth),
                )?;
                Ok(QueryOutput::Path(match path {
                    Some(ids) => PathOutcome::Found(ids),
                    None => PathOutcome::Unreachable,
                }))
            }
            TraverseOp::Describe { target } => {
                let id = self.resolve(&target)?;
                let node = self
                    .store
                    .get(&id)
                    .ok_or(QueryError::TargetNotFound { id })?;
                Ok(QueryOutput::Table(Table {
                    columns: SCALAR_COLUMNS.iter().map(|c| c.to_string()).collect(),
                    rows: vec![scalar_row(node)],
                }))
            }
        }
    }

    /// Direct relatives of a node for FIND queries, deduplicated in
    /// adjacency order, optionally restricted to a node kind.
    fn related_ids(
        &self,
        id: &str,
        relation: RelatedRelation,
        kind: Option<String>,
    ) -> Vec<String> {
        let (edge_kind, incoming) = match relation {
            RelatedRelation::Calling => (EdgeKind::Calls, true),
            RelatedRelation::CalledBy => (EdgeKind::Calls, false),
            RelatedRelation::Inheriting => (EdgeKind::Inherits, true),
        };
        let filter = EdgeFilter::only([edge_kind]);

        let adjacent: Vec<&str> = if incoming {
            self.store
                .edges_to(id, &filter)
                .iter()
                .map(|e| e.source_id.as_str())
                .collect()
        } else {
            self.store
                .edges_from(id, &filter)
                .iter()
                .map(|e| e.target_id.as_str())
                .collect()
        };

        let mut out: Vec<String> = Vec::new();
        for other in adjacent {
            if out.iter().any(|seen| seen == other) {
                continue;
            }
            let keep = match &kind {
                None => true,
                Some(kind) => self
                    .store
                    .get(other)
                    .is_some_and(|node| node.kind.as_str() == kind),
            };
            if keep {
                out.push(other.to_string());
            }
        }
        out
    }
}

fn edge_filter(via: &[EdgeKind]) -> EdgeFilter {
    EdgeFilter::only(via.iter().cloned())
}

// ----------------------------------------------------------------------
// Row shaping
// ----------------------------------------------------------------------

fn scalar_row(node: &Node) -> Vec<Value> {
    SCALAR_COLUMNS
        .iter()
        .map(|column| field_value(node, column))
        .collect()
}

/// A field read on a node: scalar columns first, then the open property
/// map. Unknown fields are null, not errors — predicates over absent
/// properties simply never match.
fn field_value(node: &Node, field: &str) -> Value {
    match field {
        "id" => Value::Str(node.id.clone()),
        "kind" => Value::Str(node.kind.as_str().to_string()),
        "name" => Value::Str(node.name.clone()),
        "qualified_name" => Value::Str(node.qualified_name.clone()),
        "file_path" => node
            .file_path
            .clone()
            .map(Value::Str)
            .unwrap_or(Value::Null),
        "line_start" => Value::Int(i64::from(node.line_start)),
        "line_end" => Value::Int(i64::from(node.line_end)),
        "complexity" => Value::Float(node.complexity),
        property => node
            .properties
            .get(property)
            .map(json_to_value)
            .unwrap_or(Value::Null),
    }
}

fn json_to_value(value: &serde_json::Value) -> Value {
    match value {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Value::Int(i),
            None => Value::Float(n.as_f64().unwrap_or(0.0)),
        },
        serde_json::Value::String(s) => Value::Str(s.clone()),
        other => Value::Str(other.to_string()),
    }
}

fn eval_predicate(node: &Node, predicate: &Predicate) -> bool {
    match predicate {
        Predicate::Compare { left, op, value } => match left {
            Expr::Field(field) => compare_values(&field_value(node, field), *op, value),
            // Rejected at plan time; never matches if it slips through.
            Expr::Aggregate { .. } => false,
        },
        Predicate::Like { field, pattern } => match field_value(node, field) {
            Value::Str(text) => pattern_match(&text, pattern),
            _ => false,
        },
        Predicate::And(l, r) => eval_predicate(node, l) && eval_predicate(node, r),
        Predicate::Or(l, r) => eval_predicate(node, l) || eval_predicate(node, r),
        Predicate::Not(inner) => !eval_predicate(node, inner),
    }
}

fn compare_values(lhs: &Value, op: CompareOp, rhs: &Value) -> bool {
    use CompareOp::*;

    if let (Some(a), Some(b)) = (lhs.as_f64(), rhs.as_f64()) {
        return match op {
            Eq => a == b,
            Ne => a != b,
            Lt => a < b,
            Le => a <= b,
            Gt => a > b,
            Ge => a >= b,
        };
    }

    match (lhs, rhs) {
        (Value::Str(a), Value::Str(b)) => match op {
            Eq => a == b,
            Ne => a != b,
            Lt => a < b,
            Le => a <= b,
            Gt => a > b,
            Ge => a >= b,
        },
        (Value::Bool(a), Value::Bool(b)) => match op {
            Eq => a == b,
            Ne => a != b,
            _ => false,
        },
        (Value::Null, Value::Null) => matches!(op, Eq),
        // Type-mismatched comparisons: only inequality holds.
        _ => matches!(op, Ne),
    }
}

/// `~` / LIKE: case-insensitive substring, or SQL LIKE semantics when the
/// pattern carries `%`/`_` wildcards.
fn pattern_match(text: &str, pattern: &str) -> bool {
    let text = text.to_lowercase();
    let pattern = pattern.to_lowercase();
    if pattern.contains(['%', '_']) {
        let text: Vec<char> = text.chars().collect();
        let pattern: Vec<char> = pattern.chars().collect();
        like_match(&text, &pattern)
    } else {
        text.contains(&pattern)
    }
}

fn like_match(text: &[char], pattern: &[char]) -> bool {
    match pattern.first() {
        None => text.is_empty(),
        Some('%') => (0..=text.len()).any(|i| like_match(&text[i..], &pattern[1..])),
        Some('_') => !text.is_empty() && like_match(&text[1..], &pattern[1..]),
        Some(&c) => text.first() == Some(&c) && like_match(&text[1..], &pattern[1..]),
    }
}

/// Total order over values for sorting and MIN/MAX: null, then booleans,
/// then numbers, then strings.
fn value_cmp(a: &Value, b: &Value) -> Ordering {
    fn rank(v: &Value) -> u8 {
        match v {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Int(_) | Value::Float(_) => 2,
            Value::Str(_) => 3,
        }
    }

    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Str(x), Value::Str(y)) => x.cmp(y),
        _ => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            _ => rank(a).cmp(&rank(b)),
        },
    }
}

// ----------------------------------------------------------------------
// Plain (ungrouped) scans
// ----------------------------------------------------------------------

fn plain_table(plan: &ScanPlan, mut nodes: Vec<&Node>) -> Table {
    // Ordering happens on node fields, before projection, so unprojected
    // sort keys work. Aliased keys resolve to their underlying field.
    if !plan.order_by.is_empty() {
        let keys: Vec<(String, bool)> = plan
            .order_by
            .iter()
            .map(|key| (underlying_field(plan, &key.field), key.descending))
            .collect();
        nodes.sort_by(|a, b| {
            for (field, descending) in &keys {
                let ordering = value_cmp(&field_value(a, field), &field_value(b, field));
                let ordering = if *descending { ordering.reverse() } else { ordering };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            Ordering::Equal
        });
    }

    if let Some(limit) = plan.limit {
        nodes.truncate(limit as usize);
    }

    let columns = plain_columns(plan);
    let rows = nodes
        .into_iter()
        .map(|node| {
            plan.items
                .iter()
                .flat_map(|item| match item {
                    SelectItem::Star => scalar_row(node),
                    SelectItem::Expr { expr, .. } => match expr {
                        Expr::Field(field) => vec![field_value(node, field)],
                        Expr::Aggregate { .. } => vec![Value::Null],
                    },
                })
                .collect()
        })
        .collect();

    Table { columns, rows }
}

fn plain_columns(plan: &ScanPlan) -> Vec<String> {
    plan.items
        .iter()
        .flat_map(|item| match item {
            SelectItem::Star => SCALAR_COLUMNS.iter().map(|c| c.to_string()).collect(),
            SelectItem::Expr { expr, alias } => vec![alias
                .clone()
                .unwrap_or_else(|| planner::default_column_name(expr))],
        })
        .collect()
}

/// Map an ORDER BY key through select-item aliases back to a node field.
fn underlying_field(plan: &ScanPlan, key: &str) -> String {
    for item in &plan.items {
        if let SelectItem::Expr {
            expr: Expr::Field(field),
            alias: Some(alias),
        } = item
        {
            if alias == key {
                return field.clone();
            }
        }
    }
    key.to_string()
}

// ----------------------------------------------------------------------
// Grouped / aggregated scans
// ----------------------------------------------------------------------

fn grouped_table(plan: &ScanPlan, nodes: &[&Node]) -> Table {
    let columns = planner::output_columns(plan);
    let groups = partition(plan, nodes);

    let mut rows: Vec<Vec<Value>> = Vec::new();
    for group in &groups {
        if let Some(having) = &plan.having {
            if !eval_having(having, plan, group) {
                continue;
            }
        }
        rows.push(
            plan.items
                .iter()
                .map(|item| match item {
                    SelectItem::Star => Value::Null,
                    SelectItem::Expr { expr, .. } => group_value(expr, plan, group),
                })
                .collect(),
        );
    }

    if !plan.order_by.is_empty() {
        let key_indices: Vec<(usize, bool)> = plan
            .order_by
            .iter()
            .filter_map(|key| {
                columns
                    .iter()
                    .position(|c| c == &key.field)
                    .map(|i| (i, key.descending))
            })
            .collect();
        rows.sort_by(|a, b| {
            for (index, descending) in &key_indices {
                let ordering = value_cmp(&a[*index], &b[*index]);
                let ordering = if *descending { ordering.reverse() } else { ordering };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            Ordering::Equal
        });
    }

    if let Some(limit) = plan.limit {
        rows.truncate(limit as usize);
    }

    Table { columns, rows }
}

struct Group<'a> {
    key: Vec<Value>,
    rows: Vec<&'a Node>,
}

/// Partition rows by the GROUP BY field tuple, first-seen order. With no
/// GROUP BY the whole input forms one group, so whole-table aggregates
/// yield exactly one row even over an empty scan.
fn partition<'a>(plan: &ScanPlan, nodes: &[&'a Node]) -> Vec<Group<'a>> {
    if plan.group_by.is_empty() {
        return vec![Group {
            key: Vec::new(),
            rows: nodes.to_vec(),
        }];
    }

    let mut groups: Vec<Group<'a>> = Vec::new();
    let mut index: ahash::AHashMap<String, usize> = ahash::AHashMap::new();
    for &node in nodes {
        let key: Vec<Value> = plan
            .group_by
            .iter()
            .map(|field| field_value(node, field))
            .collect();
        let lookup = format!("{key:?}");
        match index.get(&lookup) {
            Some(&i) => groups[i].rows.push(node),
            None => {
                index.insert(lookup, groups.len());
                groups.push(Group {
                    key,
                    rows: vec![node],
                });
            }
        }
    }
    groups
}

fn group_value(expr: &Expr, plan: &ScanPlan, group: &Group<'_>) -> Value {
    match expr {
        Expr::Field(field) => plan
            .group_by
            .iter()
            .position(|g| g == field)
            .map(|i| group.key[i].clone())
            .unwrap_or(Value::Null),
        Expr::Aggregate { func, arg } => aggregate(*func, arg, &group.rows),
    }
}

fn aggregate(func: AggregateFunc, arg: &AggregateArg, rows: &[&Node]) -> Value {
    let values: Vec<Value> = match arg {
        AggregateArg::Star => Vec::new(),
        AggregateArg::Field(field) => rows
            .iter()
            .map(|node| field_value(node, field))
            .filter(|v| *v != Value::Null)
            .collect(),
    };

    match func {
        AggregateFunc::Count => match arg {
            AggregateArg::Star => Value::Int(rows.len() as i64),
            AggregateArg::Field(_) => Value::Int(values.len() as i64),
        },
        AggregateFunc::Sum => numeric_fold(&values, |sum, v| sum + v),
        AggregateFunc::Avg => match numeric_fold(&values, |sum, v| sum + v) {
            Value::Null => Value::Null,
            sum => {
                let count = values.iter().filter(|v| v.as_f64().is_some()).count();
                Value::Float(sum.as_f64().unwrap_or(0.0) / count as f64)
            }
        },
        AggregateFunc::Min => values
            .iter()
            .min_by(|a, b| value_cmp(a, b))
            .cloned()
            .unwrap_or(Value::Null),
        AggregateFunc::Max => values
            .iter()
            .max_by(|a, b| value_cmp(a, b))
            .cloned()
            .unwrap_or(Value::Null),
    }
}

/// Sum over the numeric values, `Int` when every input was an integer,
/// `Null` when nothing numeric was present.
fn numeric_fold(values: &[Value], fold: impl Fn(f64, f64) -> f64) -> Value {
    let mut sum = 0.0;
    let mut any = false;
    let mut all_int = true;
    for value in values {
        if let Some(v) = value.as_f64() {
            sum = fold(sum, v);
            any = true;
            if !matches!(value, Value::Int(_)) {
                all_int = false;
            }
        }
    }
    if !any {
        Value::Null
    } else if all_int {
        Value::Int(sum as i64)
    } else {
        Value::Float(sum)
    }
}

/// HAVING over one group: fields resolve to the group key or to aggregate
/// aliases; aggregate expressions compute over the group's rows.
fn eval_having(predicate: &Predicate, plan: &ScanPlan, group: &Group<'_>) -> bool {
    match predicate {
        Predicate::Compare { left, op, value } => {
            let lhs = having_value(left, plan, group);
            compare_values(&lhs, *op, value)
        }
        Predicate::Like { field, pattern } => {
            match having_value(&Expr::Field(field.clone()), plan, group) {
                Value::Str(text) => pattern_match(&text, pattern),
                _ => false,
            }
        }
        Predicate::And(l, r) => eval_having(l, plan, group) && eval_having(r, plan, group),
        Predicate::Or(l, r) => eval_having(l, plan, group) || eval_having(r, plan, group),
        Predicate::Not(inner) => !eval_having(inner, plan, group),
    }
}

fn having_value(expr: &Expr, plan: &ScanPlan, group: &Group<'_>) -> Value {
    match expr {
        Expr::Aggregate { func, arg } => aggregate(*func, arg, &group.rows),
        Expr::Field(field) => {
            if let Some(i) = plan.group_by.iter().position(|g| g == field) {
                return group.key[i].clone();
            }
            // Alias of an aggregate select item (validated at plan time).
            for item in &plan.items {
                if let SelectItem::Expr {
                    expr: aggregate_expr @ Expr::Aggregate { .. },
                    alias: Some(alias),
                } = item
                {
                    if alias == field {
                        return group_value(aggregate_expr, plan, group);
                    }
                }
            }
            Value::Null
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Edge, NodeKind};

    fn fixture() -> GraphStore {
        let nodes = vec![
            Node::new(NodeKind::Function, "alpha", "src/a.py").with_complexity(60.0),
            Node::new(NodeKind::Function, "beta", "src/b.py").with_complexity(10.0),
            Node::new(NodeKind::Function, "gamma", "src/c.py").with_complexity(75.0),
            Node::new(NodeKind::Class, "Widget", "src/w.py").with_complexity(30.0),
            Node::new(NodeKind::Module, "core", "src/core/__init__.py").with_complexity(5.0),
        ];
        let edges = vec![
            Edge::new("function:src/a.py:alpha", "function:src/b.py:beta", EdgeKind::Calls),
            Edge::new("function:src/b.py:beta", "function:src/c.py:gamma", EdgeKind::Calls),
            Edge::new("module:src/core/__init__.py:core", "class:src/w.py:Widget", EdgeKind::Contains),
            Edge::new("class:src/w.py:Widget", "function:src/c.py:gamma", EdgeKind::References),
        ];
        GraphStore::build(nodes, edges)
    }

    fn run(query: &str) -> Result<QueryOutput> {
        let store = fixture();
        QueryExecutor::new(&store).run(query)
    }

    fn table(query: &str) -> Table {
        match run(query).unwrap() {
            QueryOutput::Table(table) => table,
            other => panic!("expected table, got {other:?}"),
        }
    }

    fn ids(query: &str) -> Vec<String> {
        match run(query).unwrap() {
            QueryOutput::Nodes(ids) => ids,
            other => panic!("expected node list, got {other:?}"),
        }
    }

    #[test]
    fn test_select_star_scans_in_insertion_order() {
        let t = table("SELECT * FROM functions");
        assert_eq!(t.columns, SCALAR_COLUMNS.to_vec());
        let names: Vec<&Value> = t.rows.iter().map(|r| &r[2]).collect();
        assert_eq!(
            names,
            vec![
                &Value::Str("alpha".to_string()),
                &Value::Str("beta".to_string()),
                &Value::Str("gamma".to_string()),
            ]
        );
    }

    #[test]
    fn test_verbose_and_terse_select_same_rows() {
        let verbose = table("SELECT * FROM functions WHERE complexity > 50");
        let terse = table("fn c>50");
        assert_eq!(verbose, terse);
        assert_eq!(verbose.rows.len(), 2);
    }

    #[test]
    fn test_order_by_desc_and_limit() {
        let t = table("SELECT name FROM functions ORDER BY complexity DESC LIMIT 2");
        assert_eq!(t.columns, vec!["name".to_string()]);
        assert_eq!(
            t.rows,
            vec![
                vec![Value::Str("gamma".to_string())],
                vec![Value::Str("alpha".to_string())],
            ]
        );
    }

    #[test]
    fn test_limit_zero_is_empty_not_error() {
        let t = table("SELECT * FROM functions LIMIT 0");
        assert!(t.rows.is_empty());
    }

    #[test]
    fn test_group_by_count_and_having() {
        let t = table(
            "SELECT kind, COUNT(*) AS total FROM nodes GROUP BY kind HAVING total >= 1 ORDER BY total DESC",
        );
        assert_eq!(t.columns, vec!["kind".to_string(), "total".to_string()]);
        assert_eq!(t.rows[0], vec![Value::Str("function".to_string()), Value::Int(3)]);
        assert_eq!(t.rows.len(), 3);
    }

    #[test]
    fn test_having_filters_after_aggregation() {
        let t = table("SELECT kind, COUNT(*) FROM nodes GROUP BY kind HAVING COUNT(*) > 1");
        assert_eq!(t.rows.len(), 1);
        assert_eq!(t.rows[0][0], Value::Str("function".to_string()));
    }

    #[test]
    fn test_whole_table_aggregates() {
        let t = table("SELECT COUNT(*) AS n, AVG(complexity) AS avg_c FROM functions");
        assert_eq!(t.rows.len(), 1);
        assert_eq!(t.rows[0][0], Value::Int(3));
        let Value::Float(avg) = t.rows[0][1] else {
            panic!("expected float");
        };
        assert!((avg - (60.0 + 10.0 + 75.0) / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_aggregate_over_empty_scan_yields_one_row() {
        let t = table("SELECT COUNT(*) FROM functions WHERE complexity > 1000");
        assert_eq!(t.rows, vec![vec![Value::Int(0)]]);
    }

    #[test]
    fn test_pattern_match_substring_and_like() {
        let t = table("SELECT name FROM functions WHERE name ~ 'amm'");
        assert_eq!(t.rows, vec![vec![Value::Str("gamma".to_string())]]);

        let t = table("SELECT name FROM nodes WHERE file_path LIKE 'src/%.py'");
        assert_eq!(t.rows.len(), 5);

        let t = table("SELECT name FROM nodes WHERE file_path LIKE 'src/_.py'");
        assert_eq!(t.rows.len(), 4);
    }

    #[test]
    fn test_property_map_fallback() {
        let nodes = vec![
            Node::new(NodeKind::Function, "f", "a.py").with_property("language", "python"),
            Node::new(NodeKind::Function, "g", "b.rs").with_property("language", "rust"),
        ];
        let store = GraphStore::build(nodes, Vec::new());
        let out = QueryExecutor::new(&store)
            .run("SELECT name FROM functions WHERE language = 'rust'")
            .unwrap();
        let QueryOutput::Table(t) = out else {
            panic!("expected table");
        };
        assert_eq!(t.rows, vec![vec![Value::Str("g".to_string())]]);
    }

    #[test]
    fn test_deps_and_show_dependencies_agree() {
        assert_eq!(ids("deps alpha d2"), ids("SHOW DEPENDENCIES OF alpha DEPTH 2"));
        assert_eq!(
            ids("deps alpha d2"),
            vec![
                "function:src/b.py:beta".to_string(),
                "function:src/c.py:gamma".to_string()
            ]
        );
    }

    #[test]
    fn test_callers_walk_call_edges_only() {
        assert_eq!(ids("callers gamma"), vec!["function:src/b.py:beta".to_string()]);
        // Widget references gamma but does not call it.
        assert!(!ids("callers gamma").contains(&"class:src/w.py:Widget".to_string()));
    }

    #[test]
    fn test_impact_unbounded_depth() {
        assert_eq!(
            ids("impact alpha"),
            vec![
                "function:src/b.py:beta".to_string(),
                "function:src/c.py:gamma".to_string()
            ]
        );
    }

    #[test]
    fn test_path_query() {
        let out = run("PATH FROM alpha TO gamma").unwrap();
        assert_eq!(
            out,
            QueryOutput::Path(PathOutcome::Found(vec![
                "function:src/a.py:alpha".to_string(),
                "function:src/b.py:beta".to_string(),
                "function:src/c.py:gamma".to_string(),
            ]))
        );

        let out = run("PATH FROM gamma TO alpha").unwrap();
        assert_eq!(out, QueryOutput::Path(PathOutcome::Unreachable));
    }

    #[test]
    fn test_find_calling() {
        let out = run("FIND fn CALLING gamma").unwrap();
        assert_eq!(
            out,
            QueryOutput::Nodes(vec!["function:src/b.py:beta".to_string()])
        );
    }

    #[test]
    fn test_describe_single_row() {
        let t = table("DESCRIBE Widget");
        assert_eq!(t.rows.len(), 1);
        assert_eq!(t.rows[0][0], Value::Str("class:src/w.py:Widget".to_string()));
        assert_eq!(t.rows[0][1], Value::Str("class".to_string()));
    }

    #[test]
    fn test_unresolvable_reference_errors() {
        let err = run("deps NoSuchThing").unwrap_err();
        assert!(matches!(err, QueryError::NodeNotFound { .. }));
    }

    #[test]
    fn test_cycles_query_empty_fixture() {
        let out = run("cycles").unwrap();
        assert_eq!(out, QueryOutput::Cycles(Vec::new()));
    }

    #[test]
    fn test_stable_ordering_preserves_discovery_order_on_ties() {
        // All functions share a kind; sorting by kind must keep insertion
        // order among equals.
        let t = table("SELECT name FROM functions ORDER BY kind");
        assert_eq!(
            t.rows,
            vec![
                vec![Value::Str("alpha".to_string())],
                vec![Value::Str("beta".to_string())],
                vec![Value::Str("gamma".to_string())],
            ]
        );
    }
}

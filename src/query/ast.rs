//! Query AST shared by both grammar surfaces
//!
//! The verbose SQL-like surface and the terse surface both produce this
//! tree; equivalent queries parse to structurally equal values, which the
//! equivalence tests assert directly with `==`.

use serde::{Deserialize, Serialize};

/// A parsed query.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Select(SelectStmt),
    Describe(DescribeStmt),
    Show(ShowStmt),
    FindCycles(CyclesStmt),
    FindRelated(RelatedStmt),
    Path(PathStmt),
}

/// Relational scan over the node collection.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectStmt {
    pub table: TableRef,
    pub items: Vec<SelectItem>,
    pub predicate: Option<Predicate>,
    pub group_by: Vec<String>,
    pub having: Option<Predicate>,
    pub order_by: Vec<OrderKey>,
    pub limit: Option<u64>,
}

/// Virtual table name. Everything except `Nodes` is sugar for a kind
/// predicate and is rewritten away before planning.
#[derive(Debug, Clone, PartialEq)]
pub enum TableRef {
    Nodes,
    Functions,
    Classes,
    Modules,
    Methods,
    /// Not a valid table; surfaces as an unknown-table error at plan time.
    Unknown(String),
}

impl TableRef {
    /// The node kind this virtual table filters to, if any.
    pub fn kind_filter(&self) -> Option<&'static str> {
        match self {
            TableRef::Functions => Some("function"),
            TableRef::Classes => Some("class"),
            TableRef::Modules => Some("module"),
            TableRef::Methods => Some("method"),
            TableRef::Nodes | TableRef::Unknown(_) => None,
        }
    }

    /// Verbose-surface spelling.
    pub fn as_str(&self) -> &str {
        match self {
            TableRef::Nodes => "nodes",
            TableRef::Functions => "functions",
            TableRef::Classes => "classes",
            TableRef::Modules => "modules",
            TableRef::Methods => "methods",
            TableRef::Unknown(name) => name,
        }
    }
}

/// One projected column.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectItem {
    Star,
    Expr { expr: Expr, alias: Option<String> },
}

/// A scalar or aggregate expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Field(String),
    Aggregate { func: AggregateFunc, arg: AggregateArg },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFunc {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl AggregateFunc {
    pub fn as_str(&self) -> &'static str {
        match self {
            AggregateFunc::Count => "COUNT",
            AggregateFunc::Sum => "SUM",
            AggregateFunc::Avg => "AVG",
            AggregateFunc::Min => "MIN",
            AggregateFunc::Max => "MAX",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AggregateArg {
    Star,
    Field(String),
}

/// Predicate tree for WHERE and HAVING clauses.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Compare {
        left: Expr,
        op: CompareOp,
        value: Value,
    },
    /// Pattern match (`LIKE` / `~`): case-insensitive substring, or SQL
    /// LIKE semantics when the pattern contains `%` or `_`.
    Like { field: String, pattern: String },
    And(Box<Predicate>, Box<Predicate>),
    Or(Box<Predicate>, Box<Predicate>),
    Not(Box<Predicate>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "!=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        }
    }
}

/// Literal values in predicates and result rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl Value {
    /// Numeric view, when the value is a number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }
}

/// One ORDER BY key.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderKey {
    pub field: String,
    pub descending: bool,
}

/// `DESCRIBE <ref>` — single-row view of one resolved node.
#[derive(Debug, Clone, PartialEq)]
pub struct DescribeStmt {
    pub target: String,
}

/// `SHOW <relation> OF <ref> [DEPTH n] [VIA kinds]`.
#[derive(Debug, Clone, PartialEq)]
pub struct ShowStmt {
    pub relation: ShowRelation,
    pub target: String,
    pub depth: Option<u64>,
    /// Edge-kind allow-list; empty means the relation's default view.
    pub via: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShowRelation {
    Dependencies,
    Dependents,
    Callers,
    Callees,
    Impact,
}

impl ShowRelation {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShowRelation::Dependencies => "DEPENDENCIES",
            ShowRelation::Dependents => "DEPENDENTS",
            ShowRelation::Callers => "CALLERS",
            ShowRelation::Callees => "CALLEES",
            ShowRelation::Impact => "IMPACT",
        }
    }
}

/// `FIND CYCLES [WHERE edge_type = '...']`.
#[derive(Debug, Clone, PartialEq)]
pub struct CyclesStmt {
    pub edge_kind: Option<String>,
}

/// `FIND <type> {CALLING|CALLED_BY|INHERITING} <ref>`.
#[derive(Debug, Clone, PartialEq)]
pub struct RelatedStmt {
    pub table: TableRef,
    pub relation: RelatedRelation,
    pub target: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelatedRelation {
    Calling,
    CalledBy,
    Inheriting,
}

impl RelatedRelation {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelatedRelation::Calling => "CALLING",
            RelatedRelation::CalledBy => "CALLED_BY",
            RelatedRelation::Inheriting => "INHERITING",
        }
    }
}

/// `PATH FROM <ref> TO <ref> [MAX_DEPTH n] [VIA kinds]`.
#[derive(Debug, Clone, PartialEq)]
pub struct PathStmt {
    pub from: String,
    pub to: String,
    pub max_depth: Option<u64>,
    pub via: Vec<String>,
}

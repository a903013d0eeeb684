//! Query planning
//!
//! Classifies every parsed statement into one of two execution shapes: a
//! relational scan over the node collection, or a graph traversal. All
//! shape errors — unknown virtual tables, HAVING references that are
//! neither grouped nor aggregated — are caught here, before execution
//! starts, so a malformed query never degrades into a silently empty
//! result.

use crate::error::{QueryError, Result};
use crate::graph::{Direction, EdgeKind};

use super::ast::*;

/// An executable query plan.
#[derive(Debug, Clone, PartialEq)]
pub enum Plan {
    Scan(ScanPlan),
    Traverse(TraverseOp),
}

/// Predicate-filtered scan over the node collection.
///
/// Virtual tables are already rewritten away: a query against `functions`
/// and an equivalent query against `nodes WHERE kind = 'function'` arrive
/// here as the same plan.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanPlan {
    pub predicate: Option<Predicate>,
    pub items: Vec<SelectItem>,
    pub group_by: Vec<String>,
    pub having: Option<Predicate>,
    pub order_by: Vec<OrderKey>,
    pub limit: Option<u64>,
}

/// Graph-shaped execution: resolve reference(s), dispatch to an algorithm.
#[derive(Debug, Clone, PartialEq)]
pub enum TraverseOp {
    Neighbors {
        target: String,
        direction: Direction,
        depth: usize,
        via: Vec<EdgeKind>,
    },
    Impact {
        target: String,
        depth: Option<usize>,
        via: Vec<EdgeKind>,
    },
    Cycles {
        via: Option<EdgeKind>,
    },
    Related {
        target: String,
        relation: RelatedRelation,
        kind: Option<String>,
    },
    Path {
        from: String,
        to: String,
        max_depth: Option<usize>,
        via: Vec<EdgeKind>,
    },
    Describe {
        target: String,
    },
}

/// Plan a parsed statement.
pub fn plan(statement: Statement) -> Result<Plan> {
    match statement {
        Statement::Select(select) => plan_select(select).map(Plan::Scan),
        Statement::Describe(describe) => Ok(Plan::Traverse(TraverseOp::Describe {
            target: describe.target,
        })),
        Statement::Show(show) => Ok(Plan::Traverse(plan_show(show))),
        Statement::FindCycles(cycles) => Ok(Plan::Traverse(TraverseOp::Cycles {
            via: cycles.edge_kind.as_deref().map(EdgeKind::parse),
        })),
        Statement::FindRelated(related) => plan_related(related).map(Plan::Traverse),
        Statement::Path(path) => Ok(Plan::Traverse(TraverseOp::Path {
            from: path.from,
            to: path.to,
            max_depth: path.max_depth.map(|d| d as usize),
            via: parse_via(&path.via),
        })),
    }
}

fn parse_via(via: &[String]) -> Vec<EdgeKind> {
    via.iter().map(|kind| EdgeKind::parse(kind)).collect()
}

fn plan_show(show: ShowStmt) -> TraverseOp {
    let via = parse_via(&show.via);
    match show.relation {
        ShowRelation::Impact => TraverseOp::Impact {
            target: show.target,
            depth: show.depth.map(|d| d as usize),
            via,
        },
        relation => {
            let direction = match relation {
                ShowRelation::Dependencies | ShowRelation::Callees => Direction::Outgoing,
                ShowRelation::Dependents | ShowRelation::Callers => Direction::Incoming,
                ShowRelation::Impact => unreachable!(),
            };
            // Caller/callee views walk call edges unless the query names
            // its own allow-list.
            let via = if via.is_empty()
                && matches!(relation, ShowRelation::Callers | ShowRelation::Callees)
            {
                vec![EdgeKind::Calls]
            } else {
                via
            };
            TraverseOp::Neighbors {
                target: show.target,
                direction,
                depth: show.depth.map(|d| d as usize).unwrap_or(1),
                via,
            }
        }
    }
}

fn plan_related(related: RelatedStmt) -> Result<TraverseOp> {
    let kind = match &related.table {
        TableRef::Unknown(name) => {
            return Err(QueryError::UnknownTable { name: name.clone() })
        }
        table => table.kind_filter().map(str::to_string),
    };
    Ok(TraverseOp::Related {
        target: related.target,
        relation: related.relation,
        kind,
    })
}

fn plan_select(select: SelectStmt) -> Result<ScanPlan> {
    let SelectStmt {
        table,
        items,
        predicate,
        group_by,
        having,
        order_by,
        limit,
    } = select;

    let predicate = rewrite_table(&table, predicate)?;

    if let Some(pred) = &predicate {
        if predicate_has_aggregate(pred) {
            return Err(QueryError::plan(
                "aggregate expressions are not allowed in WHERE; use HAVING",
            ));
        }
    }

    let plan = ScanPlan {
        predicate,
        items,
        group_by,
        having,
        order_by,
        limit,
    };
    validate_shape(&plan)?;
    Ok(plan)
}

/// Rewrite a virtual table into a kind predicate, AND-merged in front of
/// any user-supplied WHERE clause.
fn rewrite_table(table: &TableRef, predicate: Option<Predicate>) -> Result<Option<Predicate>> {
    if let TableRef::Unknown(name) = table {
        return Err(QueryError::UnknownTable { name: name.clone() });
    }

    let Some(kind) = table.kind_filter() else {
        return Ok(predicate);
    };
    let kind_predicate = Predicate::Compare {
        left: Expr::Field("kind".to_string()),
        op: CompareOp::Eq,
        value: Value::Str(kind.to_string()),
    };
    Ok(Some(match predicate {
        None => kind_predicate,
        Some(user) => Predicate::And(Box::new(kind_predicate), Box::new(user)),
    }))
}

fn predicate_has_aggregate(predicate: &Predicate) -> bool {
    match predicate {
        Predicate::Compare { left, .. } => matches!(left, Expr::Aggregate { .. }),
        Predicate::Like { .. } => false,
        Predicate::And(l, r) | Predicate::Or(l, r) => {
            predicate_has_aggregate(l) || predicate_has_aggregate(r)
        }
        Predicate::Not(inner) => predicate_has_aggregate(inner),
    }
}

/// Validate grouping/aggregation shape before execution.
fn validate_shape(plan: &ScanPlan) -> Result<()> {
    let grouped = !plan.group_by.is_empty();
    let has_aggregate_item = plan.items.iter().any(|item| {
        matches!(
            item,
            SelectItem::Expr {
                expr: Expr::Aggregate { .. },
                ..
            }
        )
    });
    let aggregated = grouped || has_aggregate_item || plan.having.is_some();

    if aggregated {
        for item in &plan.items {
            match item {
                SelectItem::Star => {
                    return Err(QueryError::plan(
                        "SELECT * cannot be combined with GROUP BY or aggregates",
                    ));
                }
                SelectItem::Expr {
                    expr: Expr::Field(field),
                    ..
                } if !plan.group_by.contains(field) => {
                    return Err(QueryError::plan(format!(
                        "field '{field}' must appear in GROUP BY or an aggregate"
                    )));
                }
                SelectItem::Expr { .. } => {}
            }
        }
    }

    if let Some(having) = &plan.having {
        validate_having(having, plan)?;
    }

    if aggregated {
        // Grouped output is ordered by its own columns.
        for key in &plan.order_by {
            if !output_columns(plan).iter().any(|c| c == &key.field) {
                return Err(QueryError::plan(format!(
                    "ORDER BY '{}' does not name an output column of the grouped query",
                    key.field
                )));
            }
        }
    }

    Ok(())
}

/// HAVING may reference grouped fields, aggregate expressions, and aliases
/// of aggregate select items — nothing else.
fn validate_having(having: &Predicate, plan: &ScanPlan) -> Result<()> {
    match having {
        Predicate::Compare { left, .. } => match left {
            Expr::Aggregate { .. } => Ok(()),
            Expr::Field(field) => {
                if plan.group_by.contains(field) || aggregate_aliases(plan).contains(field) {
                    Ok(())
                } else {
                    Err(QueryError::plan(format!(
                        "HAVING references '{field}', which is neither grouped nor aggregated"
                    )))
                }
            }
        },
        Predicate::Like { field, .. } => {
            if plan.group_by.contains(field) {
                Ok(())
            } else {
                Err(QueryError::plan(format!(
                    "HAVING references '{field}', which is neither grouped nor aggregated"
                )))
            }
        }
        Predicate::And(l, r) | Predicate::Or(l, r) => {
            validate_having(l, plan)?;
            validate_having(r, plan)
        }
        Predicate::Not(inner) => validate_having(inner, plan),
    }
}

fn aggregate_aliases(plan: &ScanPlan) -> Vec<String> {
    plan.items
        .iter()
        .filter_map(|item| match item {
            SelectItem::Expr {
                expr: Expr::Aggregate { .. },
                alias: Some(alias),
            } => Some(alias.clone()),
            _ => None,
        })
        .collect()
}

/// Output column names of a grouped query, in projection order.
pub fn output_columns(plan: &ScanPlan) -> Vec<String> {
    plan.items
        .iter()
        .map(|item| match item {
            SelectItem::Star => "*".to_string(),
            SelectItem::Expr { expr, alias } => match alias {
                Some(alias) => alias.clone(),
                None => default_column_name(expr),
            },
        })
        .collect()
}

/// Default column name for an unaliased expression.
pub fn default_column_name(expr: &Expr) -> String {
    match expr {
        Expr::Field(field) => field.clone(),
        Expr::Aggregate { func, arg } => match arg {
            AggregateArg::Star => format!("{}(*)", func.as_str().to_ascii_lowercase()),
            AggregateArg::Field(field) => {
                format!("{}({})", func.as_str().to_ascii_lowercase(), field)
            }
        },
    }
}

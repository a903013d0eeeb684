//! Rendering parsed queries back to the verbose surface
//!
//! Used for debugging and logging: any AST — including one parsed from the
//! terse surface — renders to a canonical verbose query string. The
//! rendering is re-parseable and structure-preserving:
//! `parse(normalize(parse(q))) == parse(q)`.

use std::fmt::Write;

use super::ast::*;

/// Render a statement in the verbose surface.
pub fn normalize(statement: &Statement) -> String {
    match statement {
        Statement::Select(select) => render_select(select),
        Statement::Describe(describe) => format!("DESCRIBE {}", render_ref(&describe.target)),
        Statement::Show(show) => render_show(show),
        Statement::FindCycles(cycles) => match &cycles.edge_kind {
            None => "FIND CYCLES".to_string(),
            Some(kind) => format!("FIND CYCLES WHERE edge_type = '{kind}'"),
        },
        Statement::FindRelated(related) => format!(
            "FIND {} {} {}",
            related.table.as_str(),
            related.relation.as_str(),
            render_ref(&related.target)
        ),
        Statement::Path(path) => render_path(path),
    }
}

fn render_select(select: &SelectStmt) -> String {
    let mut out = String::from("SELECT ");

    let items: Vec<String> = select.items.iter().map(render_item).collect();
    out.push_str(&items.join(", "));

    write!(out, " FROM {}", select.table.as_str()).unwrap();

    if let Some(predicate) = &select.predicate {
        write!(out, " WHERE {}", render_predicate(predicate)).unwrap();
    }
    if !select.group_by.is_empty() {
        write!(out, " GROUP BY {}", select.group_by.join(", ")).unwrap();
    }
    if let Some(having) = &select.having {
        write!(out, " HAVING {}", render_predicate(having)).unwrap();
    }
    if !select.order_by.is_empty() {
        let keys: Vec<String> = select
            .order_by
            .iter()
            .map(|key| {
                if key.descending {
                    format!("{} DESC", key.field)
                } else {
                    key.field.clone()
                }
            })
            .collect();
        write!(out, " ORDER BY {}", keys.join(", ")).unwrap();
    }
    if let Some(limit) = select.limit {
        write!(out, " LIMIT {limit}").unwrap();
    }

    out
}

fn render_item(item: &SelectItem) -> String {
    match item {
        SelectItem::Star => "*".to_string(),
        SelectItem::Expr { expr, alias } => {
            let rendered = render_expr(expr);
            match alias {
                Some(alias) => format!("{rendered} AS {alias}"),
                None => rendered,
            }
        }
    }
}

fn render_expr(expr: &Expr) -> String {
    match expr {
        Expr::Field(name) => name.clone(),
        Expr::Aggregate { func, arg } => match arg {
            AggregateArg::Star => format!("{}(*)", func.as_str()),
            AggregateArg::Field(field) => format!("{}({})", func.as_str(), field),
        },
    }
}

/// Compound predicates always parenthesize, so the rendered string parses
/// back to the same tree regardless of operator precedence.
fn render_predicate(predicate: &Predicate) -> String {
    match predicate {
        Predicate::Compare { left, op, value } => {
            format!("{} {} {}", render_expr(left), op.as_str(), render_value(value))
        }
        Predicate::Like { field, pattern } => {
            format!("{} LIKE {}", field, quote(pattern))
        }
        Predicate::And(left, right) => {
            format!("({} AND {})", render_predicate(left), render_predicate(right))
        }
        Predicate::Or(left, right) => {
            format!("({} OR {})", render_predicate(left), render_predicate(right))
        }
        Predicate::Not(inner) => format!("NOT {}", render_predicate(inner)),
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => format!("{f:?}"),
        Value::Str(s) => quote(s),
    }
}

fn render_show(show: &ShowStmt) -> String {
    let mut out = format!(
        "SHOW {} OF {}",
        show.relation.as_str(),
        render_ref(&show.target)
    );
    if let Some(depth) = show.depth {
        write!(out, " DEPTH {depth}").unwrap();
    }
    if !show.via.is_empty() {
        write!(out, " VIA {}", show.via.join(", ")).unwrap();
    }
    out
}

fn render_path(path: &PathStmt) -> String {
    let mut out = format!(
        "PATH FROM {} TO {}",
        render_ref(&path.from),
        render_ref(&path.to)
    );
    if let Some(depth) = path.max_depth {
        write!(out, " MAX_DEPTH {depth}").unwrap();
    }
    if !path.via.is_empty() {
        write!(out, " VIA {}", path.via.join(", ")).unwrap();
    }
    out
}

/// References render bare when they lex as a single identifier, quoted
/// otherwise.
fn render_ref(reference: &str) -> String {
    let bare = reference
        .chars()
        .next()
        .map(|c| c.is_alphabetic() || c == '_')
        .unwrap_or(false)
        && reference
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '_' | '.' | ':' | '/'));
    if bare {
        reference.to_string()
    } else {
        quote(reference)
    }
}

fn quote(text: &str) -> String {
    if text.contains('\'') {
        format!("\"{text}\"")
    } else {
        format!("'{text}'")
    }
}

#[cfg(test)]
mod tests {
    use super::super::parser::parse;
    use super::*;

    fn round_trips(query: &str) {
        let ast = parse(query).unwrap();
        let rendered = normalize(&ast);
        let reparsed = parse(&rendered)
            .unwrap_or_else(|e| panic!("normalize({query:?}) = {rendered:?} failed to parse: {e}"));
        assert_eq!(ast, reparsed, "round trip changed AST for {query:?} -> {rendered:?}");
    }

    #[test]
    fn test_round_trip_select() {
        round_trips("SELECT * FROM functions WHERE complexity > 50");
        round_trips("fn c>50 sort c- 10");
        round_trips("SELECT name AS n2, COUNT(*) AS total FROM nodes GROUP BY name HAVING COUNT(*) > 1");
        round_trips("fn c>50 & n~'pay' | !(fp~'test')");
        round_trips("SELECT * FROM nodes WHERE complexity >= 2.5 AND kind != 'file' LIMIT 0");
    }

    #[test]
    fn test_round_trip_graph_queries() {
        round_trips("SHOW DEPENDENCIES OF PayoutService DEPTH 2");
        round_trips("deps PayoutService d2 via imports,calls");
        round_trips("FIND CYCLES WHERE edge_type = 'imports'");
        round_trips("cycles");
        round_trips("FIND cls INHERITING BaseHandler");
        round_trips("PATH FROM a TO b MAX_DEPTH 5");
        round_trips("path function:src/a.py:foo function:src/b.py:bar");
        round_trips("DESCRIBE 'My Service'");
    }

    #[test]
    fn test_normalized_form_is_verbose() {
        let ast = parse("fn c>50 sort c- 10").unwrap();
        assert_eq!(
            normalize(&ast),
            "SELECT * FROM functions WHERE complexity > 50 ORDER BY complexity DESC LIMIT 10"
        );
    }

    #[test]
    fn test_terse_and_verbose_normalize_identically() {
        let terse = parse("deps X d2").unwrap();
        let verbose = parse("SHOW DEPENDENCIES OF X DEPTH 2").unwrap();
        assert_eq!(normalize(&terse), normalize(&verbose));
    }
}

//! Tests for the query language: surface equivalence, normalization
//! round-trips, planning errors, and end-to-end execution.

use sextant::graph::{Edge, EdgeKind, GraphStore, Node, NodeKind};
use sextant::query::{normalize, parse, QueryExecutor, QueryOutput};
use sextant::QueryError;

fn fixture() -> GraphStore {
    let nodes = vec![
        Node::new(NodeKind::Function, "parse_config", "src/config.py")
            .with_qualified_name("config.parse_config")
            .with_lines(10, 80)
            .with_complexity(72.0),
        Node::new(NodeKind::Function, "load", "src/config.py")
            .with_qualified_name("config.load")
            .with_lines(82, 95)
            .with_complexity(8.0),
        Node::new(NodeKind::Function, "render", "src/view.py")
            .with_qualified_name("view.render")
            .with_lines(5, 120)
            .with_complexity(55.0),
        Node::new(NodeKind::Class, "Router", "src/router.py")
            .with_qualified_name("router.Router")
            .with_complexity(31.0),
        Node::new(NodeKind::Module, "config", "src/config.py")
            .with_qualified_name("config")
            .with_complexity(1.0),
        Node::new(NodeKind::Module, "view", "src/view.py")
            .with_qualified_name("view")
            .with_complexity(1.0),
    ];
    let edges = vec![
        Edge::new("function:src/config.py:parse_config", "function:src/config.py:load", EdgeKind::Calls),
        Edge::new("function:src/view.py:render", "function:src/config.py:parse_config", EdgeKind::Calls),
        Edge::new("module:src/view.py:view", "module:src/config.py:config", EdgeKind::Imports),
        Edge::new("module:src/config.py:config", "module:src/view.py:view", EdgeKind::Imports),
        Edge::new("class:src/router.py:Router", "function:src/view.py:render", EdgeKind::Calls),
    ];
    GraphStore::build(nodes, edges)
}

/// Alias pairs from the grammar: each terse query must parse to exactly
/// the AST of its verbose equivalent.
#[test]
fn test_surface_equivalence_for_alias_pairs() {
    let pairs = [
        ("fn c>50", "SELECT * FROM functions WHERE complexity > 50"),
        ("cls n~'Rout'", "SELECT * FROM classes WHERE name LIKE 'Rout'"),
        ("mod fp~'config'", "SELECT * FROM modules WHERE file_path LIKE 'config'"),
        ("meth c>=3", "SELECT * FROM methods WHERE complexity >= 3"),
        (
            "fn c>50 & n~'x'",
            "SELECT * FROM functions WHERE complexity > 50 AND name LIKE 'x'",
        ),
        (
            "fn c>50 | c<2",
            "SELECT * FROM functions WHERE complexity > 50 OR complexity < 2",
        ),
        (
            "fn !(n~'test')",
            "SELECT * FROM functions WHERE NOT (name LIKE 'test')",
        ),
        (
            "fn sort c- 10",
            "SELECT * FROM functions ORDER BY complexity DESC LIMIT 10",
        ),
        (
            "fn sort n+",
            "SELECT * FROM functions ORDER BY name ASC",
        ),
        ("deps X d2", "SHOW DEPENDENCIES OF X DEPTH 2"),
        ("rdeps X", "SHOW DEPENDENTS OF X"),
        ("callers X", "SHOW CALLERS OF X"),
        ("callees X d3", "SHOW CALLEES OF X DEPTH 3"),
        ("impact X", "SHOW IMPACT OF X"),
        ("cycles", "FIND CYCLES"),
        ("cycles imports", "FIND CYCLES WHERE edge_type = 'imports'"),
        ("path A B d4", "PATH FROM A TO B MAX_DEPTH 4"),
    ];

    for (terse, verbose) in pairs {
        let terse_ast = parse(terse).unwrap_or_else(|e| panic!("terse {terse:?}: {e}"));
        let verbose_ast = parse(verbose).unwrap_or_else(|e| panic!("verbose {verbose:?}: {e}"));
        assert_eq!(terse_ast, verbose_ast, "ASTs differ for {terse:?} / {verbose:?}");
    }
}

#[test]
fn test_normalize_round_trip_over_query_corpus() {
    let corpus = [
        "SELECT * FROM functions",
        "fn c>50 sort c- 10",
        "SELECT name, complexity FROM functions WHERE complexity > 50 ORDER BY name",
        "SELECT kind, COUNT(*) AS total FROM nodes GROUP BY kind HAVING total > 1 ORDER BY total DESC LIMIT 3",
        "SELECT COUNT(name) FROM functions",
        "fn (c>50 | c<2) & !(n~'x')",
        "SHOW DEPENDENCIES OF PayoutService DEPTH 2 VIA imports,calls",
        "rdeps X d3",
        "FIND CYCLES WHERE edge_type = 'imports'",
        "FIND cls INHERITING BaseHandler",
        "FIND fn CALLED_BY dispatch",
        "PATH FROM a TO b MAX_DEPTH 7",
        "path module:src/a.py:m module:src/b.py:n",
        "DESCRIBE Router",
        "impact render d2",
    ];

    for query in corpus {
        let ast = parse(query).unwrap_or_else(|e| panic!("{query:?}: {e}"));
        let reparsed = parse(&normalize(&ast))
            .unwrap_or_else(|e| panic!("{query:?} normalized to unparseable text: {e}"));
        assert_eq!(ast, reparsed, "round trip changed {query:?}");
    }
}

#[test]
fn test_virtual_table_and_explicit_kind_filter_return_identical_rows() {
    let store = fixture();
    let executor = QueryExecutor::new(&store);

    let sugar = executor.run("SELECT * FROM functions WHERE complexity > 50").unwrap();
    let explicit = executor
        .run("SELECT * FROM nodes WHERE kind = 'function' AND complexity > 50")
        .unwrap();
    let terse = executor.run("fn c>50").unwrap();

    assert_eq!(sugar, explicit);
    assert_eq!(sugar, terse);

    let QueryOutput::Table(table) = sugar else {
        panic!("expected table");
    };
    assert_eq!(table.rows.len(), 2); // parse_config (72), render (55)
}

#[test]
fn test_unknown_table_error_names_valid_set() {
    let store = fixture();
    let err = QueryExecutor::new(&store)
        .run("SELECT * FROM widgets")
        .unwrap_err();
    assert_eq!(
        err,
        QueryError::UnknownTable {
            name: "widgets".to_string()
        }
    );
    let message = err.to_string();
    for table in sextant::VALID_TABLES {
        assert!(message.contains(table), "error should list '{table}'");
    }
}

#[test]
fn test_single_letter_alias_in_table_position_is_unknown_table() {
    let store = fixture();
    let err = QueryExecutor::new(&store).run("SELECT * FROM c").unwrap_err();
    assert_eq!(
        err,
        QueryError::UnknownTable {
            name: "c".to_string()
        }
    );
}

#[test]
fn test_deps_terse_and_verbose_return_identical_sets() {
    let store = fixture();
    let executor = QueryExecutor::new(&store);

    let terse = executor.run("deps view d2").unwrap();
    let verbose = executor.run("SHOW DEPENDENCIES OF view DEPTH 2").unwrap();
    assert_eq!(terse, verbose);

    let QueryOutput::Nodes(ids) = terse else {
        panic!("expected node list");
    };
    assert!(ids.contains(&"module:src/config.py:config".to_string()));
}

#[test]
fn test_cycles_restricted_to_imports() {
    let store = fixture();
    let executor = QueryExecutor::new(&store);

    let QueryOutput::Cycles(cycles) = executor.run("cycles imports").unwrap() else {
        panic!("expected cycles");
    };
    assert_eq!(cycles.len(), 1);
    assert_eq!(
        cycles[0].members,
        vec![
            "module:src/config.py:config".to_string(),
            "module:src/view.py:view".to_string(),
        ]
    );

    // The call graph alone has no cycles in this fixture.
    let QueryOutput::Cycles(call_cycles) = executor.run("cycles calls").unwrap() else {
        panic!("expected cycles");
    };
    assert!(call_cycles.is_empty());
}

#[test]
fn test_impact_matches_shortest_path_reachability() {
    let store = fixture();
    let executor = QueryExecutor::new(&store);

    let QueryOutput::Nodes(reached) = executor.run("impact Router").unwrap() else {
        panic!("expected node list");
    };
    assert_eq!(
        reached,
        vec![
            "function:src/view.py:render".to_string(),
            "function:src/config.py:parse_config".to_string(),
            "function:src/config.py:load".to_string(),
        ]
    );

    let QueryOutput::Path(path) = executor.run("path Router load").unwrap() else {
        panic!("expected path");
    };
    assert_eq!(
        path,
        sextant::PathOutcome::Found(vec![
            "class:src/router.py:Router".to_string(),
            "function:src/view.py:render".to_string(),
            "function:src/config.py:parse_config".to_string(),
            "function:src/config.py:load".to_string(),
        ])
    );
}

#[test]
fn test_find_calling_and_called_by() {
    let store = fixture();
    let executor = QueryExecutor::new(&store);

    let QueryOutput::Nodes(callers) = executor.run("FIND fn CALLING parse_config").unwrap()
    else {
        panic!("expected node list");
    };
    assert_eq!(callers, vec!["function:src/view.py:render".to_string()]);

    let QueryOutput::Nodes(callees) = executor.run("FIND fn CALLED_BY parse_config").unwrap()
    else {
        panic!("expected node list");
    };
    assert_eq!(callees, vec!["function:src/config.py:load".to_string()]);
}

#[test]
fn test_group_by_having_pipeline() {
    let store = fixture();
    let executor = QueryExecutor::new(&store);

    let QueryOutput::Table(table) = executor
        .run("SELECT kind, COUNT(*) AS total, MAX(complexity) AS worst FROM nodes GROUP BY kind HAVING total >= 2 ORDER BY total DESC")
        .unwrap()
    else {
        panic!("expected table");
    };

    assert_eq!(table.columns, vec!["kind", "total", "worst"]);
    assert_eq!(table.rows.len(), 2); // functions (3), modules (2)
    assert_eq!(table.rows[0][0], sextant::Value::Str("function".to_string()));
    assert_eq!(table.rows[0][1], sextant::Value::Int(3));
}

#[test]
fn test_having_on_ungrouped_field_fails_before_execution() {
    let store = fixture();
    let err = QueryExecutor::new(&store)
        .run("SELECT kind, COUNT(*) FROM nodes GROUP BY kind HAVING name = 'x'")
        .unwrap_err();
    assert!(matches!(err, QueryError::Plan { .. }));
}

#[test]
fn test_parse_error_is_surfaced_never_recovered() {
    let store = fixture();
    let err = QueryExecutor::new(&store).run("SELECT FROM WHERE").unwrap_err();
    assert!(matches!(err, QueryError::Parse { .. }));
}

#[test]
fn test_column_alias_renames_output_only() {
    let store = fixture();
    let QueryOutput::Table(table) = QueryExecutor::new(&store)
        .run("SELECT name AS function_name FROM functions WHERE complexity > 50 ORDER BY function_name")
        .unwrap()
    else {
        panic!("expected table");
    };
    assert_eq!(table.columns, vec!["function_name"]);
    assert_eq!(
        table.rows,
        vec![
            vec![sextant::Value::Str("parse_config".to_string())],
            vec![sextant::Value::Str("render".to_string())],
        ]
    );
}

#[test]
fn test_describe_returns_single_row_table() {
    let store = fixture();
    let QueryOutput::Table(table) = QueryExecutor::new(&store).run("DESCRIBE Router").unwrap()
    else {
        panic!("expected table");
    };
    assert_eq!(table.rows.len(), 1);
    assert_eq!(
        table.rows[0][0],
        sextant::Value::Str("class:src/router.py:Router".to_string())
    );
}

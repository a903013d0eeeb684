//! Recursive-descent parser for both query surfaces
//!
//! Dispatch is purely positional: the first token decides the statement
//! kind, and single-letter aliases are interpreted by grammar position
//! alone (`c` is the `complexity` field on a predicate left-hand side and
//! never a table name, because the table position only accepts table
//! names). Both surfaces share one token set and one predicate grammar, so
//! equivalent queries produce structurally equal ASTs.

use crate::error::{QueryError, Result};

use super::ast::*;
use super::lexer::{tokenize, Token, TokenKind};

/// Parse a query string in either surface into a [`Statement`].
pub fn parse(input: &str) -> Result<Statement> {
    let tokens = tokenize(input)?;
    let mut parser = TokenParser::new(tokens);
    let statement = parser.parse_statement()?;
    parser.expect_eof()?;
    Ok(statement)
}

/// Canonical field name for a field-position identifier.
///
/// Aliases apply only where the grammar expects a field; references and
/// values pass through untouched.
fn canonical_field(name: &str) -> String {
    match name {
        "c" => "complexity".to_string(),
        "n" => "name".to_string(),
        "fp" => "file_path".to_string(),
        other => other.to_string(),
    }
}

/// Table for a table-position identifier.
fn table_ref(name: &str) -> TableRef {
    match name {
        "fn" | "functions" => TableRef::Functions,
        "cls" | "classes" => TableRef::Classes,
        "mod" | "modules" => TableRef::Modules,
        "meth" | "methods" => TableRef::Methods,
        "nodes" => TableRef::Nodes,
        other => TableRef::Unknown(other.to_string()),
    }
}

/// `d<N>` shorthand for DEPTH in the terse surface.
fn depth_shorthand(word: &str) -> Option<u64> {
    let digits = word.strip_prefix('d')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

struct TokenParser {
    tokens: Vec<Token>,
    position: usize,
}

impl TokenParser {
    fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            position: 0,
        }
    }

    fn parse_statement(&mut self) -> Result<Statement> {
        match self.peek_kind().clone() {
            TokenKind::Select => {
                self.advance();
                Ok(Statement::Select(self.parse_select()?))
            }
            TokenKind::Describe => {
                self.advance();
                let target = self.expect_reference("reference after DESCRIBE")?;
                Ok(Statement::Describe(DescribeStmt { target }))
            }
            TokenKind::Show => {
                self.advance();
                Ok(Statement::Show(self.parse_show()?))
            }
            TokenKind::Find => {
                self.advance();
                self.parse_find()
            }
            TokenKind::Path => {
                self.advance();
                Ok(Statement::Path(self.parse_path()?))
            }
            TokenKind::Cycles => {
                self.advance();
                Ok(Statement::FindCycles(self.parse_terse_cycles()?))
            }
            TokenKind::Deps => {
                self.advance();
                Ok(Statement::Show(
                    self.parse_terse_show(ShowRelation::Dependencies)?,
                ))
            }
            TokenKind::Rdeps => {
                self.advance();
                Ok(Statement::Show(
                    self.parse_terse_show(ShowRelation::Dependents)?,
                ))
            }
            TokenKind::Callers => {
                self.advance();
                Ok(Statement::Show(self.parse_terse_show(ShowRelation::Callers)?))
            }
            TokenKind::Callees => {
                self.advance();
                Ok(Statement::Show(self.parse_terse_show(ShowRelation::Callees)?))
            }
            TokenKind::Impact => {
                self.advance();
                Ok(Statement::Show(self.parse_terse_show(ShowRelation::Impact)?))
            }
            TokenKind::Ident(name) => {
                self.advance();
                Ok(Statement::Select(self.parse_terse_select(&name)?))
            }
            other => Err(self.error_here(format!("unexpected token {:?}", other))),
        }
    }

    // ------------------------------------------------------------------
    // SELECT (verbose)
    // ------------------------------------------------------------------

    fn parse_select(&mut self) -> Result<SelectStmt> {
        let items = self.parse_select_items()?;
        self.consume(&TokenKind::From, "expected FROM after select list")?;
        let table_name = self.expect_word("table name after FROM")?;
        let table = table_ref(&table_name);

        let mut stmt = SelectStmt {
            table,
            items,
            predicate: None,
            group_by: Vec::new(),
            having: None,
            order_by: Vec::new(),
            limit: None,
        };

        if self.match_kind(&TokenKind::Where) {
            stmt.predicate = Some(self.parse_predicate()?);
        }
        if self.match_kind(&TokenKind::Group) {
            self.consume(&TokenKind::By, "expected BY after GROUP")?;
            stmt.group_by = self.parse_field_list()?;
        }
        if self.match_kind(&TokenKind::Having) {
            stmt.having = Some(self.parse_predicate()?);
        }
        if self.match_kind(&TokenKind::Order) {
            self.consume(&TokenKind::By, "expected BY after ORDER")?;
            stmt.order_by = self.parse_order_keys()?;
        } else if self.match_kind(&TokenKind::Sort) {
            stmt.order_by = self.parse_sort_keys()?;
        }
        if self.match_kind(&TokenKind::Limit) {
            stmt.limit = Some(self.expect_count("row count after LIMIT")?);
        } else if let TokenKind::Int(_) = self.peek_kind() {
            // A bare trailing integer is the terse LIMIT spelling.
            stmt.limit = Some(self.expect_count("row count")?);
        }

        Ok(stmt)
    }

    fn parse_select_items(&mut self) -> Result<Vec<SelectItem>> {
        if self.match_kind(&TokenKind::Star) {
            return Ok(vec![SelectItem::Star]);
        }

        let mut items = Vec::new();
        loop {
            let expr = self.parse_expr()?;
            let alias = if self.match_kind(&TokenKind::As) {
                Some(self.expect_word("alias after AS")?)
            } else {
                None
            };
            items.push(SelectItem::Expr { expr, alias });
            if !self.match_kind(&TokenKind::Comma) {
                return Ok(items);
            }
        }
    }

    fn parse_expr(&mut self) -> Result<Expr> {
        if let Some(func) = self.match_aggregate() {
            self.consume(&TokenKind::LParen, "expected ( after aggregate function")?;
            let arg = if self.match_kind(&TokenKind::Star) {
                AggregateArg::Star
            } else {
                AggregateArg::Field(canonical_field(&self.expect_word("aggregate argument")?))
            };
            self.consume(&TokenKind::RParen, "expected ) after aggregate argument")?;
            return Ok(Expr::Aggregate { func, arg });
        }
        let field = self.expect_word("field name")?;
        Ok(Expr::Field(canonical_field(&field)))
    }

    fn match_aggregate(&mut self) -> Option<AggregateFunc> {
        let func = match self.peek_kind() {
            TokenKind::Count => AggregateFunc::Count,
            TokenKind::Sum => AggregateFunc::Sum,
            TokenKind::Avg => AggregateFunc::Avg,
            TokenKind::Min => AggregateFunc::Min,
            TokenKind::Max => AggregateFunc::Max,
            _ => return None,
        };
        self.advance();
        Some(func)
    }

    fn parse_field_list(&mut self) -> Result<Vec<String>> {
        let mut fields = vec![canonical_field(&self.expect_word("field name")?)];
        while self.match_kind(&TokenKind::Comma) {
            fields.push(canonical_field(&self.expect_word("field name")?));
        }
        Ok(fields)
    }

    fn parse_order_keys(&mut self) -> Result<Vec<OrderKey>> {
        let mut keys = Vec::new();
        loop {
            let field = canonical_field(&self.expect_word("field name in ORDER BY")?);
            let descending = if self.match_kind(&TokenKind::Desc) {
                true
            } else {
                self.match_kind(&TokenKind::Asc);
                false
            };
            keys.push(OrderKey { field, descending });
            if !self.match_kind(&TokenKind::Comma) {
                return Ok(keys);
            }
        }
    }

    /// `sort field-` / `sort field+` — the terse spelling, also accepted
    /// after a verbose clause chain.
    fn parse_sort_keys(&mut self) -> Result<Vec<OrderKey>> {
        let mut keys = Vec::new();
        loop {
            let field = canonical_field(&self.expect_word("field name after sort")?);
            let descending = if self.match_kind(&TokenKind::Minus) {
                true
            } else {
                self.match_kind(&TokenKind::Plus);
                false
            };
            keys.push(OrderKey { field, descending });
            if !self.match_kind(&TokenKind::Comma) {
                return Ok(keys);
            }
        }
    }

    // ------------------------------------------------------------------
    // SELECT (terse): `<type> [predicates] [sort f±] [limit]`
    // ------------------------------------------------------------------

    fn parse_terse_select(&mut self, type_word: &str) -> Result<SelectStmt> {
        let mut stmt = SelectStmt {
            table: table_ref(type_word),
            items: vec![SelectItem::Star],
            predicate: None,
            group_by: Vec::new(),
            having: None,
            order_by: Vec::new(),
            limit: None,
        };

        // Adjacent predicate groups AND-combine: `fn c>50 n~'x'`.
        while matches!(
            self.peek_kind(),
            TokenKind::Ident(_)
                | TokenKind::Bang
                | TokenKind::Not
                | TokenKind::LParen
                | TokenKind::Count
                | TokenKind::Sum
                | TokenKind::Avg
                | TokenKind::Min
                | TokenKind::Max
        ) {
            let next = self.parse_predicate()?;
            stmt.predicate = Some(match stmt.predicate.take() {
                None => next,
                Some(existing) => Predicate::And(Box::new(existing), Box::new(next)),
            });
        }

        if self.match_kind(&TokenKind::Sort) {
            stmt.order_by = self.parse_sort_keys()?;
        } else if self.match_kind(&TokenKind::Order) {
            self.consume(&TokenKind::By, "expected BY after ORDER")?;
            stmt.order_by = self.parse_order_keys()?;
        }

        if self.match_kind(&TokenKind::Limit) {
            stmt.limit = Some(self.expect_count("row count after LIMIT")?);
        } else if let TokenKind::Int(_) = self.peek_kind() {
            stmt.limit = Some(self.expect_count("row count")?);
        }

        Ok(stmt)
    }

    // ------------------------------------------------------------------
    // SHOW / terse relationship commands
    // ------------------------------------------------------------------

    fn parse_show(&mut self) -> Result<ShowStmt> {
        let relation = match self.peek_kind() {
            TokenKind::Dependencies | TokenKind::Deps => ShowRelation::Dependencies,
            TokenKind::Dependents | TokenKind::Rdeps => ShowRelation::Dependents,
            TokenKind::Callers => ShowRelation::Callers,
            TokenKind::Callees => ShowRelation::Callees,
            TokenKind::Impact => ShowRelation::Impact,
            other => {
                return Err(self.error_here(format!(
                    "expected DEPENDENCIES, DEPENDENTS, CALLERS, CALLEES or IMPACT, found {:?}",
                    other
                )))
            }
        };
        self.advance();
        self.consume(&TokenKind::Of, "expected OF after SHOW relation")?;
        let target = self.expect_reference("reference after OF")?;

        let mut stmt = ShowStmt {
            relation,
            target,
            depth: None,
            via: Vec::new(),
        };
        self.parse_traversal_tail(&mut stmt.depth, &mut stmt.via)?;
        Ok(stmt)
    }

    fn parse_terse_show(&mut self, relation: ShowRelation) -> Result<ShowStmt> {
        let target = self.expect_reference("reference after command")?;
        let mut stmt = ShowStmt {
            relation,
            target,
            depth: None,
            via: Vec::new(),
        };
        self.parse_traversal_tail(&mut stmt.depth, &mut stmt.via)?;
        Ok(stmt)
    }

    /// Shared `[DEPTH n | d<n>] [VIA kind[,kind]]` tail.
    fn parse_traversal_tail(
        &mut self,
        depth: &mut Option<u64>,
        via: &mut Vec<String>,
    ) -> Result<()> {
        loop {
            match self.peek_kind().clone() {
                TokenKind::Depth => {
                    self.advance();
                    *depth = Some(self.expect_count("depth after DEPTH")?);
                }
                TokenKind::Ident(word) if depth.is_none() && depth_shorthand(&word).is_some() => {
                    self.advance();
                    *depth = depth_shorthand(&word);
                }
                TokenKind::Via => {
                    self.advance();
                    via.push(self.expect_word("edge kind after VIA")?);
                    while self.match_kind(&TokenKind::Comma) {
                        via.push(self.expect_word("edge kind after comma")?);
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    // ------------------------------------------------------------------
    // FIND / cycles / path
    // ------------------------------------------------------------------

    fn parse_find(&mut self) -> Result<Statement> {
        if self.match_kind(&TokenKind::Cycles) {
            let mut edge_kind = None;
            if self.match_kind(&TokenKind::Where) {
                let field = self.expect_word("edge_type after WHERE")?;
                if field != "edge_type" {
                    return Err(
                        self.error_here(format!("expected edge_type in cycle filter, found '{field}'"))
                    );
                }
                self.consume(&TokenKind::Eq, "expected = after edge_type")?;
                edge_kind = Some(self.expect_reference("edge kind value")?);
            }
            return Ok(Statement::FindCycles(CyclesStmt { edge_kind }));
        }

        let type_word = self.expect_word("node type after FIND")?;
        let table = table_ref(&type_word);
        let relation = match self.peek_kind() {
            TokenKind::Calling => RelatedRelation::Calling,
            TokenKind::CalledBy => RelatedRelation::CalledBy,
            TokenKind::Inheriting => RelatedRelation::Inheriting,
            other => {
                return Err(self.error_here(format!(
                    "expected CALLING, CALLED_BY or INHERITING, found {:?}",
                    other
                )))
            }
        };
        self.advance();
        let target = self.expect_reference("reference after relation")?;
        Ok(Statement::FindRelated(RelatedStmt {
            table,
            relation,
            target,
        }))
    }

    fn parse_terse_cycles(&mut self) -> Result<CyclesStmt> {
        // `cycles` / `cycles imports`
        let edge_kind = match self.peek_kind().clone() {
            TokenKind::Ident(word) => {
                self.advance();
                Some(word)
            }
            TokenKind::Str(word) => {
                self.advance();
                Some(word)
            }
            _ => None,
        };
        Ok(CyclesStmt { edge_kind })
    }

    fn parse_path(&mut self) -> Result<PathStmt> {
        let verbose = self.match_kind(&TokenKind::From);
        let from = self.expect_reference("source reference")?;
        if verbose {
            self.consume(&TokenKind::To, "expected TO after source reference")?;
        } else {
            // Terse allows `path a b` or `path a to b`.
            self.match_kind(&TokenKind::To);
        }
        let to = self.expect_reference("target reference")?;

        let mut stmt = PathStmt {
            from,
            to,
            max_depth: None,
            via: Vec::new(),
        };
        loop {
            match self.peek_kind().clone() {
                TokenKind::MaxDepth | TokenKind::Depth => {
                    self.advance();
                    stmt.max_depth = Some(self.expect_count("depth")?);
                }
                TokenKind::Ident(word)
                    if stmt.max_depth.is_none() && depth_shorthand(&word).is_some() =>
                {
                    self.advance();
                    stmt.max_depth = depth_shorthand(&word);
                }
                TokenKind::Via => {
                    self.advance();
                    stmt.via.push(self.expect_word("edge kind after VIA")?);
                    while self.match_kind(&TokenKind::Comma) {
                        stmt.via.push(self.expect_word("edge kind after comma")?);
                    }
                }
                _ => return Ok(stmt),
            }
        }
    }

    // ------------------------------------------------------------------
    // Predicates (shared by both surfaces)
    // ------------------------------------------------------------------

    fn parse_predicate(&mut self) -> Result<Predicate> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Predicate> {
        let mut left = self.parse_and()?;
        while self.match_kind(&TokenKind::Or) || self.match_kind(&TokenKind::Pipe) {
            let right = self.parse_and()?;
            left = Predicate::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Predicate> {
        let mut left = self.parse_unary()?;
        while self.match_kind(&TokenKind::And) || self.match_kind(&TokenKind::Amp) {
            let right = self.parse_unary()?;
            left = Predicate::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Predicate> {
        if self.match_kind(&TokenKind::Not) || self.match_kind(&TokenKind::Bang) {
            return Ok(Predicate::Not(Box::new(self.parse_unary()?)));
        }
        if self.match_kind(&TokenKind::LParen) {
            let inner = self.parse_or()?;
            self.consume(&TokenKind::RParen, "expected ) after predicate")?;
            return Ok(inner);
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Predicate> {
        let left = self.parse_expr()?;

        if self.match_kind(&TokenKind::Like) || self.match_kind(&TokenKind::Tilde) {
            let field = match left {
                Expr::Field(name) => name,
                Expr::Aggregate { .. } => {
                    return Err(self.error_here("pattern match applies to fields, not aggregates"))
                }
            };
            let pattern = match self.peek_kind().clone() {
                TokenKind::Str(s) => {
                    self.advance();
                    s
                }
                other => {
                    return Err(
                        self.error_here(format!("expected pattern string, found {:?}", other))
                    )
                }
            };
            return Ok(Predicate::Like { field, pattern });
        }

        let op = match self.peek_kind() {
            TokenKind::Eq => CompareOp::Eq,
            TokenKind::Ne => CompareOp::Ne,
            TokenKind::Lt => CompareOp::Lt,
            TokenKind::Le => CompareOp::Le,
            TokenKind::Gt => CompareOp::Gt,
            TokenKind::Ge => CompareOp::Ge,
            other => {
                return Err(
                    self.error_here(format!("expected comparison operator, found {:?}", other))
                )
            }
        };
        self.advance();

        let value = self.parse_value()?;
        Ok(Predicate::Compare { left, op, value })
    }

    fn parse_value(&mut self) -> Result<Value> {
        let value = match self.peek_kind().clone() {
            TokenKind::Str(s) => Value::Str(s),
            TokenKind::Int(i) => Value::Int(i),
            TokenKind::Float(f) => Value::Float(f),
            TokenKind::Ident(word) => match word.as_str() {
                "true" => Value::Bool(true),
                "false" => Value::Bool(false),
                "null" => Value::Null,
                // A bare word compares as a string: `kind = function`.
                _ => Value::Str(word),
            },
            other => return Err(self.error_here(format!("expected value, found {:?}", other))),
        };
        self.advance();
        Ok(value)
    }

    // ------------------------------------------------------------------
    // Token plumbing
    // ------------------------------------------------------------------

    fn peek(&self) -> &Token {
        &self.tokens[self.position]
    }

    fn peek_kind(&self) -> &TokenKind {
        &self.peek().kind
    }

    fn advance(&mut self) -> &Token {
        let token = &self.tokens[self.position];
        if self.position + 1 < self.tokens.len() {
            self.position += 1;
        }
        token
    }

    fn match_kind(&mut self, kind: &TokenKind) -> bool {
        if self.peek_kind() == kind {
            self.advance();
            true
        } else {
            false
        }
    }

    fn consume(&mut self, kind: &TokenKind, message: &str) -> Result<()> {
        if self.match_kind(kind) {
            Ok(())
        } else {
            Err(self.error_here(format!("{message}, found {:?}", self.peek_kind())))
        }
    }

    /// A plain word: identifier or keyword spelling, for positions where
    /// keywords may legally appear as names (field, table, edge kind).
    fn expect_word(&mut self, what: &str) -> Result<String> {
        let word = match self.peek_kind().clone() {
            TokenKind::Ident(name) => name,
            TokenKind::Count => "count".to_string(),
            TokenKind::Min => "min".to_string(),
            TokenKind::Max => "max".to_string(),
            TokenKind::Depth => "depth".to_string(),
            TokenKind::Path => "path".to_string(),
            other => {
                return Err(self.error_here(format!("expected {what}, found {:?}", other)))
            }
        };
        self.advance();
        Ok(word)
    }

    /// A node reference: bare identifier or quoted string.
    fn expect_reference(&mut self, what: &str) -> Result<String> {
        let reference = match self.peek_kind().clone() {
            TokenKind::Ident(name) => name,
            TokenKind::Str(name) => name,
            other => {
                return Err(self.error_here(format!("expected {what}, found {:?}", other)))
            }
        };
        self.advance();
        Ok(reference)
    }

    fn expect_count(&mut self, what: &str) -> Result<u64> {
        match self.peek_kind().clone() {
            TokenKind::Int(i) if i >= 0 => {
                self.advance();
                Ok(i as u64)
            }
            other => Err(self.error_here(format!("expected {what}, found {:?}", other))),
        }
    }

    fn expect_eof(&mut self) -> Result<()> {
        if self.peek_kind() == &TokenKind::Eof {
            Ok(())
        } else {
            Err(self.error_here(format!("unexpected trailing token {:?}", self.peek_kind())))
        }
    }

    fn error_here(&self, message: impl Into<String>) -> QueryError {
        QueryError::parse(self.peek().offset, message)
    }
}

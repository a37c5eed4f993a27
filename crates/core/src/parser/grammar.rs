use crate::parser::ast::{
    AttributeKey, ColumnConstraint, ExpressionOperator, IntervalType, JoinType, KnownFunction,
    Node, NodeType, OrderDirection, OrderNullRule, Statement, TempType,
};
use crate::parser::keywords::{Keyword, KeywordCategory};
use crate::parser::parse_context::{ExprElem, ParseContext};
use crate::parser::parser::ExpectedSymbol;
use crate::parser::scanner::ScannedScript;
use crate::parser::token::{ScannerSymbol, SymbolKind};
use crate::text::Location;

/// A syntax error that aborts the current statement.
/// The message has already been recorded when this is raised.
pub(crate) struct ParseError;

type PResult<T> = Result<T, ParseError>;

struct ExpectedCollector {
    target: usize,
    symbols: Vec<ExpectedSymbol>,
}

/// The recursive grammar over the pre-tokenised symbol stream.
///
/// Every token test goes through `note`, so re-running the grammar with a
/// target symbol collects the full set of symbols the grammar would accept
/// at that position.
pub(crate) struct Grammar<'a> {
    ctx: ParseContext<'a>,
    pos: usize,
    last_end: u32,
    expected: Option<ExpectedCollector>,
}

impl<'a> Grammar<'a> {
    pub fn new(scanned: &'a ScannedScript) -> Self {
        Self {
            ctx: ParseContext::new(scanned),
            pos: 0,
            last_end: 0,
            expected: None,
        }
    }

    pub fn new_with_target(scanned: &'a ScannedScript, target_symbol_id: usize) -> Self {
        Self {
            ctx: ParseContext::new(scanned),
            pos: 0,
            last_end: 0,
            expected: Some(ExpectedCollector {
                target: target_symbol_id,
                symbols: Vec::new(),
            }),
        }
    }

    pub fn finish(self) -> (Vec<Node>, Vec<Statement>, Vec<(Location, String)>) {
        (self.ctx.nodes, self.ctx.statements, self.ctx.errors)
    }

    pub fn into_expected(self) -> Vec<ExpectedSymbol> {
        self.expected.map(|c| c.symbols).unwrap_or_default()
    }

    // ---- symbol stream -------------------------------------------------

    fn peek(&self) -> ScannerSymbol {
        let symbols = &self.ctx.scanned.symbols;
        symbols[self.pos.min(symbols.len() - 1)]
    }

    fn at_eof(&self) -> bool {
        self.peek().is_eof()
    }

    fn advance(&mut self) -> ScannerSymbol {
        let symbol = self.peek();
        if !symbol.is_eof() {
            self.pos += 1;
            self.last_end = symbol.location.end();
        }
        symbol
    }

    fn note(&mut self, expected: ExpectedSymbol) {
        if let Some(collector) = &mut self.expected {
            if self.pos == collector.target && !collector.symbols.contains(&expected) {
                collector.symbols.push(expected);
            }
        }
    }

    /// Is the parser positioned at the completion marker?
    ///
    /// The marker symbol matches nothing, so every alternative the grammar
    /// would accept here gets tested (and noted) before the statement
    /// errors out. This mirrors the expected-symbol collection of an LALR
    /// parser with look-ahead correction.
    fn at_completion_target(&self) -> bool {
        self.expected
            .as_ref()
            .is_some_and(|collector| self.pos == collector.target)
    }

    fn span_from(&self, begin: Location) -> Location {
        let end = self.last_end.max(begin.offset);
        Location::new(begin.offset, end - begin.offset)
    }

    fn error_here(&mut self, message: impl Into<String>) -> ParseError {
        let location = self.peek().location;
        self.ctx.error(location, message);
        ParseError
    }

    // ---- token tests ---------------------------------------------------

    fn peek_keyword(&mut self, keyword: Keyword) -> bool {
        self.note(ExpectedSymbol::Keyword(keyword));
        !self.at_completion_target() && self.peek().keyword() == Some(keyword)
    }

    fn accept_keyword(&mut self, keyword: Keyword) -> Option<Location> {
        if self.peek_keyword(keyword) {
            Some(self.advance().location)
        } else {
            None
        }
    }

    fn expect_keyword(&mut self, keyword: Keyword) -> PResult<Location> {
        match self.accept_keyword(keyword) {
            Some(location) => Ok(location),
            None => Err(self.error_here(format!("expected '{}'", keyword.name()))),
        }
    }

    fn peek_punct(&mut self, kind: SymbolKind, expected: ExpectedSymbol) -> bool {
        self.note(expected);
        !self.at_completion_target() && self.peek().kind == kind
    }

    fn accept_punct(&mut self, kind: SymbolKind, expected: ExpectedSymbol) -> Option<Location> {
        if self.peek_punct(kind, expected) {
            Some(self.advance().location)
        } else {
            None
        }
    }

    fn expect_punct(
        &mut self,
        kind: SymbolKind,
        expected: ExpectedSymbol,
        what: &str,
    ) -> PResult<Location> {
        match self.accept_punct(kind, expected) {
            Some(location) => Ok(location),
            None => Err(self.error_here(format!("expected {what}"))),
        }
    }

    fn accept_ident(&mut self) -> Option<(u32, Location)> {
        self.note(ExpectedSymbol::Identifier);
        if self.at_completion_target() {
            return None;
        }
        match self.peek().kind {
            SymbolKind::Ident(name) => {
                let location = self.advance().location;
                Some((name, location))
            }
            _ => None,
        }
    }

    /// A name component: an identifier or a keyword usable as a bare name.
    fn accept_name_component(&mut self) -> Option<Node> {
        if let Some((name, location)) = self.accept_ident() {
            return Some(self.ctx.name_from_identifier(location, name));
        }
        if self.at_completion_target() {
            return None;
        }
        if let SymbolKind::Keyword(keyword) = self.peek().kind {
            if matches!(
                keyword.category(),
                KeywordCategory::SqlUnreserved | KeywordCategory::SqlColumnName
            ) {
                let location = self.advance().location;
                return Some(self.ctx.name_from_keyword(location, keyword.name()));
            }
        }
        None
    }

    fn expect_name_component(&mut self) -> PResult<Node> {
        match self.accept_name_component() {
            Some(node) => Ok(node),
            None => Err(self.error_here("expected a name")),
        }
    }

    // ---- script --------------------------------------------------------

    pub fn parse_script(&mut self) {
        loop {
            while self
                .accept_punct(SymbolKind::Semicolon, ExpectedSymbol::Semicolon)
                .is_some()
            {
                self.ctx.reset_statement();
            }
            if self.at_eof() {
                break;
            }
            match self.parse_statement() {
                Ok(node) => {
                    self.ctx.add_statement(node);
                    if !self.at_eof()
                        && self
                            .accept_punct(SymbolKind::Semicolon, ExpectedSymbol::Semicolon)
                            .is_none()
                    {
                        let _ = self.error_here("expected ';'");
                        self.recover();
                    }
                }
                Err(ParseError) => self.recover(),
            }
        }
    }

    /// Discard symbols up to the next top-level semicolon.
    fn recover(&mut self) {
        while !self.at_eof() {
            if matches!(self.advance().kind, SymbolKind::Semicolon) {
                break;
            }
        }
        self.ctx.reset_statement();
    }

    fn parse_statement(&mut self) -> PResult<Node> {
        if self.peek_keyword(Keyword::With) || self.peek_keyword(Keyword::Select) {
            return self.parse_select_statement();
        }
        if self.peek_keyword(Keyword::Create) {
            return self.parse_create_statement();
        }
        if self.peek_keyword(Keyword::Set) {
            return self.parse_set_statement();
        }
        Err(self.error_here("expected a statement"))
    }

    // ---- select --------------------------------------------------------

    fn parse_select_statement(&mut self) -> PResult<Node> {
        let begin = self.peek().location;
        let mut attrs = Vec::new();

        if let Some(with_loc) = self.accept_keyword(Keyword::With) {
            self.accept_keyword(Keyword::Recursive);
            let mut ctes = vec![self.parse_cte()?];
            while self
                .accept_punct(SymbolKind::Comma, ExpectedSymbol::Comma)
                .is_some()
            {
                ctes.push(self.parse_cte()?);
            }
            let array = self.ctx.array(with_loc, ctes, true, true);
            attrs.push(self.ctx.attr(AttributeKey::SqlSelectWithCtes, array));
        }

        self.expect_keyword(Keyword::Select)?;
        if let Some(loc) = self.accept_keyword(Keyword::Distinct) {
            let flag = self.ctx.bool_node(loc, true);
            attrs.push(self.ctx.attr(AttributeKey::SqlSelectDistinct, flag));
        } else {
            self.accept_keyword(Keyword::All);
        }

        let targets_begin = self.peek().location;
        let mut targets = vec![self.parse_result_target()?];
        while self
            .accept_punct(SymbolKind::Comma, ExpectedSymbol::Comma)
            .is_some()
        {
            targets.push(self.parse_result_target()?);
        }
        let targets = self.ctx.array(targets_begin, targets, true, true);
        attrs.push(self.ctx.attr(AttributeKey::SqlSelectTargets, targets));

        if let Some(from_loc) = self.accept_keyword(Keyword::From) {
            let mut items = vec![self.parse_from_element()?];
            while self
                .accept_punct(SymbolKind::Comma, ExpectedSymbol::Comma)
                .is_some()
            {
                items.push(self.parse_from_element()?);
            }
            let array = self.ctx.array(from_loc, items, true, true);
            attrs.push(self.ctx.attr(AttributeKey::SqlSelectFrom, array));
        }
        if self.accept_keyword(Keyword::Where).is_some() {
            let elem = self.parse_expression()?;
            let node = self.ctx.expression(elem);
            attrs.push(self.ctx.attr(AttributeKey::SqlSelectWhere, node));
        }
        if let Some(group_loc) = self.accept_keyword(Keyword::Group) {
            self.expect_keyword(Keyword::By)?;
            let mut exprs = Vec::new();
            loop {
                let elem = self.parse_expression()?;
                exprs.push(self.ctx.expression(elem));
                if self
                    .accept_punct(SymbolKind::Comma, ExpectedSymbol::Comma)
                    .is_none()
                {
                    break;
                }
            }
            let array = self.ctx.array(group_loc, exprs, true, true);
            attrs.push(self.ctx.attr(AttributeKey::SqlSelectGroupBy, array));
        }
        if self.accept_keyword(Keyword::Having).is_some() {
            let elem = self.parse_expression()?;
            let node = self.ctx.expression(elem);
            attrs.push(self.ctx.attr(AttributeKey::SqlSelectHaving, node));
        }
        if let Some(order_loc) = self.accept_keyword(Keyword::Order) {
            self.expect_keyword(Keyword::By)?;
            let mut specs = vec![self.parse_order_spec()?];
            while self
                .accept_punct(SymbolKind::Comma, ExpectedSymbol::Comma)
                .is_some()
            {
                specs.push(self.parse_order_spec()?);
            }
            let array = self.ctx.array(order_loc, specs, true, true);
            attrs.push(self.ctx.attr(AttributeKey::SqlSelectOrderBy, array));
        }
        if self.accept_keyword(Keyword::Limit).is_some() {
            let elem = self.parse_expression()?;
            let node = self.ctx.expression(elem);
            attrs.push(self.ctx.attr(AttributeKey::SqlSelectLimit, node));
        }
        if self.accept_keyword(Keyword::Offset).is_some() {
            let elem = self.parse_expression()?;
            let node = self.ctx.expression(elem);
            attrs.push(self.ctx.attr(AttributeKey::SqlSelectOffset, node));
        }

        let location = self.span_from(begin);
        Ok(self
            .ctx
            .object(location, NodeType::ObjectSqlSelect, attrs, false, false))
    }

    fn parse_cte(&mut self) -> PResult<Node> {
        let begin = self.peek().location;
        let name = self.expect_name_component()?;
        let mut attrs = vec![self.ctx.attr(AttributeKey::SqlCteName, name)];
        if let Some(paren_loc) = self.accept_punct(SymbolKind::LParen, ExpectedSymbol::LParen) {
            let mut columns = vec![self.expect_name_component()?];
            while self
                .accept_punct(SymbolKind::Comma, ExpectedSymbol::Comma)
                .is_some()
            {
                columns.push(self.expect_name_component()?);
            }
            self.expect_punct(SymbolKind::RParen, ExpectedSymbol::RParen, "')'")?;
            let array = self.ctx.array(paren_loc, columns, true, true);
            attrs.push(self.ctx.attr(AttributeKey::SqlCteColumns, array));
        }
        self.expect_keyword(Keyword::As)?;
        self.expect_punct(SymbolKind::LParen, ExpectedSymbol::LParen, "'('")?;
        let select = self.parse_select_statement()?;
        self.expect_punct(SymbolKind::RParen, ExpectedSymbol::RParen, "')'")?;
        attrs.push(self.ctx.attr(AttributeKey::SqlCteStatement, select));
        let location = self.span_from(begin);
        Ok(self
            .ctx
            .object(location, NodeType::ObjectSqlCte, attrs, false, false))
    }

    fn parse_result_target(&mut self) -> PResult<Node> {
        if let Some(star_loc) = self.accept_punct(SymbolKind::Star, ExpectedSymbol::Star) {
            let star = self.ctx.bool_node(star_loc, true);
            let attrs = vec![self.ctx.attr(AttributeKey::SqlResultTargetStar, star)];
            return Ok(self.ctx.object(
                star_loc,
                NodeType::ObjectSqlResultTarget,
                attrs,
                false,
                false,
            ));
        }
        let begin = self.peek().location;
        let elem = self.parse_expression()?;
        let value = self.ctx.expression(elem);
        let mut attrs = vec![self.ctx.attr(AttributeKey::SqlResultTargetValue, value)];
        if self.accept_keyword(Keyword::As).is_some() {
            let name = self.expect_name_component()?;
            attrs.push(self.ctx.attr(AttributeKey::SqlResultTargetName, name));
        } else if let Some((name, loc)) = self.accept_ident() {
            let name = self.ctx.name_from_identifier(loc, name);
            attrs.push(self.ctx.attr(AttributeKey::SqlResultTargetName, name));
        }
        let location = self.span_from(begin);
        Ok(self
            .ctx
            .object(location, NodeType::ObjectSqlResultTarget, attrs, false, false))
    }

    fn parse_order_spec(&mut self) -> PResult<Node> {
        let begin = self.peek().location;
        let elem = self.parse_expression()?;
        let value = self.ctx.expression(elem);
        let mut attrs = vec![self.ctx.attr(AttributeKey::SqlOrderValue, value)];
        if let Some(loc) = self.accept_keyword(Keyword::Asc) {
            let node = self.ctx.enum_node(
                loc,
                NodeType::EnumSqlOrderDirection,
                OrderDirection::Ascending as u32,
            );
            attrs.push(self.ctx.attr(AttributeKey::SqlOrderDirection, node));
        } else if let Some(loc) = self.accept_keyword(Keyword::Desc) {
            let node = self.ctx.enum_node(
                loc,
                NodeType::EnumSqlOrderDirection,
                OrderDirection::Descending as u32,
            );
            attrs.push(self.ctx.attr(AttributeKey::SqlOrderDirection, node));
        }
        if let Some(nulls_loc) = self.accept_keyword(Keyword::NullsLa) {
            let rule = if self.accept_keyword(Keyword::First).is_some() {
                OrderNullRule::NullsFirst
            } else {
                self.expect_keyword(Keyword::Last)?;
                OrderNullRule::NullsLast
            };
            let node = self
                .ctx
                .enum_node(nulls_loc, NodeType::EnumSqlOrderNullRule, rule as u32);
            attrs.push(self.ctx.attr(AttributeKey::SqlOrderNulls, node));
        }
        let location = self.span_from(begin);
        Ok(self
            .ctx
            .object(location, NodeType::ObjectSqlOrderSpec, attrs, false, false))
    }

    // ---- from ----------------------------------------------------------

    fn parse_from_element(&mut self) -> PResult<Node> {
        let begin = self.peek().location;
        let mut left = self.parse_table_ref()?;
        loop {
            let join_type = if self.peek_keyword(Keyword::Join) {
                self.advance();
                JoinType::Inner
            } else if self.accept_keyword(Keyword::Inner).is_some() {
                self.expect_keyword(Keyword::Join)?;
                JoinType::Inner
            } else if self.accept_keyword(Keyword::Left).is_some() {
                self.accept_keyword(Keyword::Outer);
                self.expect_keyword(Keyword::Join)?;
                JoinType::Left
            } else if self.accept_keyword(Keyword::Right).is_some() {
                self.accept_keyword(Keyword::Outer);
                self.expect_keyword(Keyword::Join)?;
                JoinType::Right
            } else if self.accept_keyword(Keyword::Full).is_some() {
                self.accept_keyword(Keyword::Outer);
                self.expect_keyword(Keyword::Join)?;
                JoinType::Full
            } else if self.accept_keyword(Keyword::Cross).is_some() {
                self.expect_keyword(Keyword::Join)?;
                JoinType::Cross
            } else {
                break;
            };
            let right = self.parse_table_ref()?;
            let join_node =
                self.ctx
                    .enum_node(begin, NodeType::EnumSqlJoinType, join_type as u32);
            let mut attrs = vec![
                self.ctx.attr(AttributeKey::SqlJoinType, join_node),
                self.ctx.attr(AttributeKey::SqlJoinLeft, left),
                self.ctx.attr(AttributeKey::SqlJoinRight, right),
            ];
            if self.accept_keyword(Keyword::On).is_some() {
                let elem = self.parse_expression()?;
                let node = self.ctx.expression(elem);
                attrs.push(self.ctx.attr(AttributeKey::SqlJoinOn, node));
            } else if self.accept_keyword(Keyword::Using).is_some() {
                let paren = self.expect_punct(SymbolKind::LParen, ExpectedSymbol::LParen, "'('")?;
                let mut columns = vec![self.expect_name_component()?];
                while self
                    .accept_punct(SymbolKind::Comma, ExpectedSymbol::Comma)
                    .is_some()
                {
                    columns.push(self.expect_name_component()?);
                }
                self.expect_punct(SymbolKind::RParen, ExpectedSymbol::RParen, "')'")?;
                let array = self.ctx.array(paren, columns, true, true);
                attrs.push(self.ctx.attr(AttributeKey::SqlJoinUsing, array));
            }
            let location = self.span_from(begin);
            left = self
                .ctx
                .object(location, NodeType::ObjectSqlJoinedTable, attrs, false, false);
        }
        Ok(left)
    }

    fn parse_table_ref(&mut self) -> PResult<Node> {
        let begin = self.peek().location;
        if self
            .accept_punct(SymbolKind::LParen, ExpectedSymbol::LParen)
            .is_some()
        {
            if self.peek_keyword(Keyword::Select) || self.peek_keyword(Keyword::With) {
                let select = self.parse_select_statement()?;
                self.expect_punct(SymbolKind::RParen, ExpectedSymbol::RParen, "')'")?;
                let mut attrs = vec![self.ctx.attr(AttributeKey::SqlTablerefSelect, select)];
                if let Some(alias) = self.parse_alias()? {
                    attrs.push(self.ctx.attr(AttributeKey::SqlTablerefAlias, alias));
                }
                let location = self.span_from(begin);
                return Ok(self.ctx.object(
                    location,
                    NodeType::ObjectSqlTableRef,
                    attrs,
                    false,
                    false,
                ));
            }
            let element = self.parse_from_element()?;
            self.expect_punct(SymbolKind::RParen, ExpectedSymbol::RParen, "')'")?;
            return Ok(element);
        }

        let path = self.parse_name_path()?;
        let array = self.ctx.array(path.location, path.elements, false, false);
        let mut attrs = vec![self.ctx.attr(AttributeKey::SqlTablerefName, array)];
        if let Some(alias) = self.parse_alias()? {
            attrs.push(self.ctx.attr(AttributeKey::SqlTablerefAlias, alias));
        }
        let location = self.span_from(begin);
        Ok(self
            .ctx
            .object(location, NodeType::ObjectSqlTableRef, attrs, false, false))
    }

    fn parse_alias(&mut self) -> PResult<Option<Node>> {
        if self.accept_keyword(Keyword::As).is_some() {
            return Ok(Some(self.expect_name_component()?));
        }
        if let Some((name, location)) = self.accept_ident() {
            return Ok(Some(self.ctx.name_from_identifier(location, name)));
        }
        Ok(None)
    }

    // ---- names ---------------------------------------------------------

    fn parse_name_path(&mut self) -> PResult<NamePath> {
        let first = self.expect_name_component()?;
        let mut location = first.location;
        let mut elements = vec![first];
        let mut star = false;
        loop {
            if let Some(dot_loc) = self.accept_punct(SymbolKind::Dot, ExpectedSymbol::Dot) {
                location = location.spanning(dot_loc);
                if self
                    .accept_punct(SymbolKind::Star, ExpectedSymbol::Star)
                    .is_some()
                {
                    location = Location::new(location.offset, self.last_end - location.offset);
                    star = true;
                    break;
                }
                if let Some(element) = self.accept_name_component() {
                    location = location.spanning(element.location);
                    elements.push(element);
                    continue;
                }
                let node = self.ctx.trailing_dot(dot_loc);
                elements.push(node);
                break;
            }
            if let Some(dot_loc) = self.accept_punct(SymbolKind::DotTrailing, ExpectedSymbol::Dot) {
                location = location.spanning(dot_loc);
                let node = self.ctx.trailing_dot(dot_loc);
                elements.push(node);
                break;
            }
            break;
        }
        Ok(NamePath {
            elements,
            location,
            star,
        })
    }

    // ---- expressions ---------------------------------------------------

    pub(crate) fn parse_expression(&mut self) -> PResult<ExprElem> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> PResult<ExprElem> {
        let begin = self.peek().location;
        let mut elem = self.parse_and()?;
        while let Some(op_loc) = self.accept_keyword(Keyword::Or) {
            let rhs = self.parse_and()?;
            let location = self.span_from(begin);
            elem = self
                .ctx
                .make_expr(location, ExpressionOperator::Or, op_loc, vec![elem, rhs]);
        }
        Ok(elem)
    }

    fn parse_and(&mut self) -> PResult<ExprElem> {
        let begin = self.peek().location;
        let mut elem = self.parse_not()?;
        while let Some(op_loc) = self.accept_keyword(Keyword::And) {
            let rhs = self.parse_not()?;
            let location = self.span_from(begin);
            elem = self
                .ctx
                .make_expr(location, ExpressionOperator::And, op_loc, vec![elem, rhs]);
        }
        Ok(elem)
    }

    fn parse_not(&mut self) -> PResult<ExprElem> {
        if let Some(op_loc) = self.accept_keyword(Keyword::Not) {
            let inner = self.parse_not()?;
            let location = self.span_from(op_loc);
            return Ok(self
                .ctx
                .make_expr(location, ExpressionOperator::Not, op_loc, vec![inner]));
        }
        self.parse_comparison()
    }

    /// The unit keyword of an interval literal, e.g. `interval '1' day`.
    fn accept_interval_unit(&mut self) -> Option<(IntervalType, Location)> {
        for (keyword, unit) in [
            (Keyword::Year, IntervalType::Year),
            (Keyword::Month, IntervalType::Month),
            (Keyword::Day, IntervalType::Day),
            (Keyword::Hour, IntervalType::Hour),
            (Keyword::Minute, IntervalType::Minute),
            (Keyword::Second, IntervalType::Second),
        ] {
            if let Some(location) = self.accept_keyword(keyword) {
                return Some((unit, location));
            }
        }
        None
    }

    fn accept_comparison_op(&mut self) -> Option<(ExpressionOperator, Location)> {
        self.note(ExpectedSymbol::Operator);
        if self.at_completion_target() {
            return None;
        }
        let op = match self.peek().kind {
            SymbolKind::Equals => ExpressionOperator::Equal,
            SymbolKind::NotEquals => ExpressionOperator::NotEqual,
            SymbolKind::LessThan => ExpressionOperator::LessThan,
            SymbolKind::LessEquals => ExpressionOperator::LessEqual,
            SymbolKind::GreaterThan => ExpressionOperator::GreaterThan,
            SymbolKind::GreaterEquals => ExpressionOperator::GreaterEqual,
            _ => return None,
        };
        Some((op, self.advance().location))
    }

    fn parse_comparison(&mut self) -> PResult<ExprElem> {
        let begin = self.peek().location;
        let lhs = self.parse_additive()?;

        if let Some((op, op_loc)) = self.accept_comparison_op() {
            let rhs = self.parse_additive()?;
            let location = self.span_from(begin);
            return Ok(self.ctx.make_expr(location, op, op_loc, vec![lhs, rhs]));
        }

        if let Some(is_loc) = self.accept_keyword(Keyword::Is) {
            let negated = self.accept_keyword(Keyword::Not).is_some();
            self.expect_keyword(Keyword::Null)?;
            let op = if negated {
                ExpressionOperator::IsNotNull
            } else {
                ExpressionOperator::IsNull
            };
            let location = self.span_from(begin);
            return Ok(self.ctx.make_expr(location, op, is_loc, vec![lhs]));
        }

        let negated = self.accept_keyword(Keyword::NotLa).is_some();
        if let Some(op_loc) = self.accept_keyword(Keyword::Between) {
            let low = self.parse_additive()?;
            self.expect_keyword(Keyword::And)?;
            let high = self.parse_additive()?;
            let op = if negated {
                ExpressionOperator::NotBetween
            } else {
                ExpressionOperator::Between
            };
            let location = self.span_from(begin);
            return Ok(self
                .ctx
                .make_expr(location, op, op_loc, vec![lhs, low, high]));
        }
        if let Some(op_loc) = self.accept_keyword(Keyword::In) {
            self.expect_punct(SymbolKind::LParen, ExpectedSymbol::LParen, "'('")?;
            let mut args = vec![lhs];
            loop {
                args.push(self.parse_expression()?);
                if self
                    .accept_punct(SymbolKind::Comma, ExpectedSymbol::Comma)
                    .is_none()
                {
                    break;
                }
            }
            self.expect_punct(SymbolKind::RParen, ExpectedSymbol::RParen, "')'")?;
            let op = if negated {
                ExpressionOperator::NotIn
            } else {
                ExpressionOperator::In
            };
            let location = self.span_from(begin);
            return Ok(self.ctx.make_expr(location, op, op_loc, args));
        }
        if let Some(op_loc) = self.accept_keyword(Keyword::Like) {
            let rhs = self.parse_additive()?;
            let op = if negated {
                ExpressionOperator::NotLike
            } else {
                ExpressionOperator::Like
            };
            let location = self.span_from(begin);
            return Ok(self.ctx.make_expr(location, op, op_loc, vec![lhs, rhs]));
        }
        if let Some(op_loc) = self.accept_keyword(Keyword::Ilike) {
            let rhs = self.parse_additive()?;
            let op = if negated {
                ExpressionOperator::NotIlike
            } else {
                ExpressionOperator::Ilike
            };
            let location = self.span_from(begin);
            return Ok(self.ctx.make_expr(location, op, op_loc, vec![lhs, rhs]));
        }
        if let Some(op_loc) = self.accept_keyword(Keyword::Similar) {
            self.expect_keyword(Keyword::To)?;
            let rhs = self.parse_additive()?;
            let op = if negated {
                ExpressionOperator::NotSimilarTo
            } else {
                ExpressionOperator::SimilarTo
            };
            let location = self.span_from(begin);
            return Ok(self.ctx.make_expr(location, op, op_loc, vec![lhs, rhs]));
        }
        if negated {
            return Err(self.error_here("expected BETWEEN, IN, LIKE, ILIKE or SIMILAR"));
        }
        Ok(lhs)
    }

    fn parse_additive(&mut self) -> PResult<ExprElem> {
        let begin = self.peek().location;
        let mut elem = self.parse_multiplicative()?;
        loop {
            self.note(ExpectedSymbol::Operator);
            if self.at_completion_target() {
                break;
            }
            let op = match self.peek().kind {
                SymbolKind::Plus => ExpressionOperator::Plus,
                SymbolKind::Minus => ExpressionOperator::Minus,
                SymbolKind::Concat => ExpressionOperator::Concat,
                _ => break,
            };
            let op_loc = self.advance().location;
            let rhs = self.parse_multiplicative()?;
            let location = self.span_from(begin);
            elem = self.ctx.make_expr(location, op, op_loc, vec![elem, rhs]);
        }
        Ok(elem)
    }

    fn parse_multiplicative(&mut self) -> PResult<ExprElem> {
        let begin = self.peek().location;
        let mut elem = self.parse_unary()?;
        loop {
            self.note(ExpectedSymbol::Operator);
            if self.at_completion_target() {
                break;
            }
            let op = match self.peek().kind {
                SymbolKind::Star => ExpressionOperator::Multiply,
                SymbolKind::Slash => ExpressionOperator::Divide,
                SymbolKind::Percent => ExpressionOperator::Modulo,
                _ => break,
            };
            let op_loc = self.advance().location;
            let rhs = self.parse_unary()?;
            let location = self.span_from(begin);
            elem = self.ctx.make_expr(location, op, op_loc, vec![elem, rhs]);
        }
        Ok(elem)
    }

    fn parse_unary(&mut self) -> PResult<ExprElem> {
        if let Some(op_loc) = self.accept_punct(SymbolKind::Minus, ExpectedSymbol::Operator) {
            let inner = self.parse_unary()?;
            let location = self.span_from(op_loc);
            return Ok(self.ctx.make_expr(
                location,
                ExpressionOperator::Negate,
                op_loc,
                vec![inner],
            ));
        }
        if self
            .accept_punct(SymbolKind::Plus, ExpectedSymbol::Operator)
            .is_some()
        {
            return self.parse_unary();
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> PResult<ExprElem> {
        self.note(ExpectedSymbol::IntegerLiteral);
        self.note(ExpectedSymbol::StringLiteral);
        if self.at_completion_target() {
            self.note(ExpectedSymbol::Identifier);
            self.note(ExpectedSymbol::LParen);
            for keyword in [
                Keyword::True,
                Keyword::False,
                Keyword::Null,
                Keyword::Interval,
                Keyword::Cast,
                Keyword::Not,
            ] {
                self.note(ExpectedSymbol::Keyword(keyword));
            }
            return Err(self.error_here("expected an expression"));
        }
        let symbol = self.peek();
        match symbol.kind {
            SymbolKind::LiteralInteger => {
                let location = self.advance().location;
                Ok(ExprElem::Node(
                    self.ctx.literal(location, NodeType::LiteralInteger),
                ))
            }
            SymbolKind::LiteralFloat => {
                let location = self.advance().location;
                Ok(ExprElem::Node(
                    self.ctx.literal(location, NodeType::LiteralFloat),
                ))
            }
            SymbolKind::LiteralString
            | SymbolKind::LiteralBitString
            | SymbolKind::LiteralHexString => {
                let location = self.advance().location;
                Ok(ExprElem::Node(
                    self.ctx.literal(location, NodeType::LiteralString),
                ))
            }
            SymbolKind::Keyword(Keyword::True) => {
                let location = self.advance().location;
                Ok(ExprElem::Node(self.ctx.bool_node(location, true)))
            }
            SymbolKind::Keyword(Keyword::False) => {
                let location = self.advance().location;
                Ok(ExprElem::Node(self.ctx.bool_node(location, false)))
            }
            SymbolKind::Keyword(Keyword::Null) => {
                let location = self.advance().location;
                Ok(ExprElem::Node(
                    self.ctx.literal(location, NodeType::LiteralNull),
                ))
            }
            SymbolKind::Keyword(Keyword::Interval) => {
                let begin = self.advance().location;
                let literal_loc = self.expect_punct(
                    SymbolKind::LiteralString,
                    ExpectedSymbol::StringLiteral,
                    "an interval literal",
                )?;
                let value = self.ctx.literal(literal_loc, NodeType::LiteralInterval);
                let mut attrs = vec![self.ctx.attr(AttributeKey::SqlConstCastValue, value)];
                if let Some((unit, unit_loc)) = self.accept_interval_unit() {
                    let node =
                        self.ctx
                            .enum_node(unit_loc, NodeType::EnumSqlIntervalType, unit as u32);
                    attrs.push(self.ctx.attr(AttributeKey::SqlConstCastInterval, node));
                }
                let location = self.span_from(begin);
                Ok(ExprElem::Node(self.ctx.object(
                    location,
                    NodeType::ObjectSqlConstIntervalCast,
                    attrs,
                    false,
                    false,
                )))
            }
            SymbolKind::Keyword(Keyword::Cast) => {
                let begin = self.advance().location;
                self.expect_punct(SymbolKind::LParen, ExpectedSymbol::LParen, "'('")?;
                let elem = self.parse_expression()?;
                let value = self.ctx.expression(elem);
                self.expect_keyword(Keyword::As)?;
                let data_type = self.parse_data_type()?;
                self.expect_punct(SymbolKind::RParen, ExpectedSymbol::RParen, "')'")?;
                let attrs = vec![
                    self.ctx.attr(AttributeKey::SqlCastValue, value),
                    self.ctx.attr(AttributeKey::SqlCastType, data_type),
                ];
                let location = self.span_from(begin);
                Ok(ExprElem::Node(self.ctx.object(
                    location,
                    NodeType::ObjectSqlCast,
                    attrs,
                    false,
                    false,
                )))
            }
            SymbolKind::LParen => {
                self.advance();
                if self.peek_keyword(Keyword::Select) || self.peek_keyword(Keyword::With) {
                    let select = self.parse_select_statement()?;
                    self.expect_punct(SymbolKind::RParen, ExpectedSymbol::RParen, "')'")?;
                    return Ok(ExprElem::Node(select));
                }
                let elem = self.parse_expression()?;
                self.expect_punct(SymbolKind::RParen, ExpectedSymbol::RParen, "')'")?;
                // Parentheses materialize; chains never merge across them.
                let node = self.ctx.expression(elem);
                Ok(ExprElem::Node(node))
            }
            SymbolKind::Param => {
                let location = self.advance().location;
                self.ctx
                    .error(location, "parameter references are not supported here");
                Ok(ExprElem::Node(
                    self.ctx.literal(location, NodeType::LiteralNull),
                ))
            }
            _ => {
                if self.peek_ident_or_name() {
                    return self.parse_column_ref_or_function_call();
                }
                Err(self.error_here("expected an expression"))
            }
        }
    }

    fn peek_ident_or_name(&mut self) -> bool {
        self.note(ExpectedSymbol::Identifier);
        if self.at_completion_target() {
            return false;
        }
        match self.peek().kind {
            SymbolKind::Ident(_) => true,
            SymbolKind::Keyword(keyword) => matches!(
                keyword.category(),
                KeywordCategory::SqlUnreserved | KeywordCategory::SqlColumnName
            ),
            _ => false,
        }
    }

    fn parse_column_ref_or_function_call(&mut self) -> PResult<ExprElem> {
        let begin = self.peek().location;
        let path = self.parse_name_path()?;

        if !path.star
            && self
                .accept_punct(SymbolKind::LParen, ExpectedSymbol::LParen)
                .is_some()
        {
            let mut attrs = Vec::new();
            // Known functions keep their enum; everything else the name path.
            let known = if let [only] = path.elements.as_slice() {
                let names = self.ctx.scanned.name_registry.borrow();
                KnownFunction::find(&names.get(only.children_begin_or_value).text)
            } else {
                None
            };
            match known {
                Some(func) => {
                    let node = self.ctx.enum_node(
                        path.location,
                        NodeType::EnumSqlKnownFunction,
                        func as u32,
                    );
                    attrs.push(self.ctx.attr(AttributeKey::SqlFunctionKnownName, node));
                }
                None => {
                    let array = self.ctx.array(path.location, path.elements, false, false);
                    attrs.push(self.ctx.attr(AttributeKey::SqlFunctionName, array));
                }
            }
            if let Some(loc) = self.accept_keyword(Keyword::Distinct) {
                let flag = self.ctx.bool_node(loc, true);
                attrs.push(self.ctx.attr(AttributeKey::SqlFunctionDistinct, flag));
            }
            if let Some(star_loc) = self.accept_punct(SymbolKind::Star, ExpectedSymbol::Star) {
                let star = self.ctx.bool_node(star_loc, true);
                attrs.push(self.ctx.attr(AttributeKey::SqlFunctionStar, star));
            } else if !self.peek_punct(SymbolKind::RParen, ExpectedSymbol::RParen) {
                let args_begin = self.peek().location;
                let mut args = Vec::new();
                loop {
                    let elem = self.parse_expression()?;
                    args.push(self.ctx.expression(elem));
                    if self
                        .accept_punct(SymbolKind::Comma, ExpectedSymbol::Comma)
                        .is_none()
                    {
                        break;
                    }
                }
                let array = self.ctx.array(args_begin, args, true, true);
                attrs.push(self.ctx.attr(AttributeKey::SqlFunctionArguments, array));
            }
            self.expect_punct(SymbolKind::RParen, ExpectedSymbol::RParen, "')'")?;
            let location = self.span_from(begin);
            return Ok(ExprElem::Node(self.ctx.object(
                location,
                NodeType::ObjectSqlFunctionCall,
                attrs,
                false,
                false,
            )));
        }

        let array = self.ctx.array(path.location, path.elements, false, false);
        let mut attrs = vec![self.ctx.attr(AttributeKey::SqlColumnRefPath, array)];
        if path.star {
            let star = self.ctx.bool_node(path.location, true);
            attrs.push(self.ctx.attr(AttributeKey::SqlColumnRefStar, star));
        }
        Ok(ExprElem::Node(self.ctx.object(
            path.location,
            NodeType::ObjectSqlColumnRef,
            attrs,
            false,
            false,
        )))
    }

    // ---- types ---------------------------------------------------------

    fn parse_data_type(&mut self) -> PResult<Node> {
        let begin = self.peek().location;
        if self.at_completion_target() {
            self.note(ExpectedSymbol::Identifier);
            return Err(self.error_here("expected a type name"));
        }
        let name = match self.peek().kind {
            SymbolKind::Keyword(keyword) if is_type_keyword(keyword) => {
                let loc = self.advance().location;
                match keyword {
                    Keyword::Double => {
                        self.expect_keyword(Keyword::Precision)?;
                        self.ctx.name_from_keyword(loc, "double")
                    }
                    Keyword::Time | Keyword::Timestamp => {
                        if self.accept_keyword(Keyword::WithLa).is_some()
                            || self.accept_keyword(Keyword::Without).is_some()
                        {
                            self.expect_keyword(Keyword::Time)?;
                            self.expect_keyword(Keyword::Zone)?;
                        }
                        self.ctx.name_from_keyword(loc, keyword.name())
                    }
                    _ => self.ctx.name_from_keyword(loc, keyword.name()),
                }
            }
            SymbolKind::Ident(name) => {
                self.note(ExpectedSymbol::Identifier);
                let loc = self.advance().location;
                self.ctx.name_from_identifier(loc, name)
            }
            _ => return Err(self.error_here("expected a type name")),
        };
        let mut attrs = vec![self.ctx.attr(AttributeKey::SqlDataTypeName, name)];
        if let Some(paren_loc) = self.accept_punct(SymbolKind::LParen, ExpectedSymbol::LParen) {
            let mut modifiers = Vec::new();
            loop {
                let loc = self.expect_punct(
                    SymbolKind::LiteralInteger,
                    ExpectedSymbol::IntegerLiteral,
                    "an integer",
                )?;
                modifiers.push(self.ctx.literal(loc, NodeType::LiteralInteger));
                if self
                    .accept_punct(SymbolKind::Comma, ExpectedSymbol::Comma)
                    .is_none()
                {
                    break;
                }
            }
            self.expect_punct(SymbolKind::RParen, ExpectedSymbol::RParen, "')'")?;
            let array = self.ctx.array(paren_loc, modifiers, true, true);
            attrs.push(self.ctx.attr(AttributeKey::SqlDataTypeModifiers, array));
        }
        let location = self.span_from(begin);
        Ok(self
            .ctx
            .object(location, NodeType::ObjectSqlDataType, attrs, false, false))
    }

    // ---- create / set --------------------------------------------------

    fn parse_create_statement(&mut self) -> PResult<Node> {
        let begin = self.peek().location;
        self.expect_keyword(Keyword::Create)?;
        let temp = if let Some(loc) = self
            .accept_keyword(Keyword::Temp)
            .or_else(|| self.accept_keyword(Keyword::Temporary))
        {
            Some(
                self.ctx
                    .enum_node(loc, NodeType::EnumSqlTempType, TempType::Temp as u32),
            )
        } else {
            None
        };
        self.expect_keyword(Keyword::Table)?;
        if self.accept_keyword(Keyword::If).is_some() {
            self.expect_keyword(Keyword::Not)?;
            self.expect_keyword(Keyword::Exists)?;
        }
        let path = self.parse_name_path()?;
        let name_array = self.ctx.array(path.location, path.elements, false, false);

        if self.accept_keyword(Keyword::As).is_some() {
            let select = self.parse_select_statement()?;
            let attrs = vec![
                self.ctx.attr(AttributeKey::SqlCreateAsName, name_array),
                self.ctx.attr(AttributeKey::SqlCreateAsStatement, select),
            ];
            let location = self.span_from(begin);
            return Ok(self
                .ctx
                .object(location, NodeType::ObjectSqlCreateAs, attrs, false, false));
        }

        self.expect_punct(SymbolKind::LParen, ExpectedSymbol::LParen, "'('")?;
        let columns_begin = self.peek().location;
        let mut columns = vec![self.parse_column_def()?];
        while self
            .accept_punct(SymbolKind::Comma, ExpectedSymbol::Comma)
            .is_some()
        {
            columns.push(self.parse_column_def()?);
        }
        self.expect_punct(SymbolKind::RParen, ExpectedSymbol::RParen, "')'")?;

        let mut attrs = vec![self.ctx.attr(AttributeKey::SqlCreateName, name_array)];
        if let Some(temp) = temp {
            attrs.push(self.ctx.attr(AttributeKey::SqlCreateTemp, temp));
        }
        let columns_array = self.ctx.array(columns_begin, columns, true, true);
        attrs.push(self.ctx.attr(AttributeKey::SqlCreateColumns, columns_array));
        let location = self.span_from(begin);
        Ok(self
            .ctx
            .object(location, NodeType::ObjectSqlCreate, attrs, false, false))
    }

    fn parse_column_def(&mut self) -> PResult<Node> {
        let begin = self.peek().location;
        let name = self.expect_name_component()?;
        let data_type = self.parse_data_type()?;
        let mut constraints = Vec::new();
        loop {
            if let Some(loc) = self.accept_keyword(Keyword::Not) {
                self.expect_keyword(Keyword::Null)?;
                constraints.push(self.ctx.enum_node(
                    loc,
                    NodeType::EnumSqlColumnConstraint,
                    ColumnConstraint::NotNull as u32,
                ));
            } else if let Some(loc) = self.accept_keyword(Keyword::Null) {
                constraints.push(self.ctx.enum_node(
                    loc,
                    NodeType::EnumSqlColumnConstraint,
                    ColumnConstraint::Null as u32,
                ));
            } else if let Some(loc) = self.accept_keyword(Keyword::Primary) {
                self.expect_keyword(Keyword::Key)?;
                constraints.push(self.ctx.enum_node(
                    loc,
                    NodeType::EnumSqlColumnConstraint,
                    ColumnConstraint::PrimaryKey as u32,
                ));
            } else if let Some(loc) = self.accept_keyword(Keyword::Unique) {
                constraints.push(self.ctx.enum_node(
                    loc,
                    NodeType::EnumSqlColumnConstraint,
                    ColumnConstraint::Unique as u32,
                ));
            } else if let Some(loc) = self.accept_keyword(Keyword::Default) {
                constraints.push(self.ctx.enum_node(
                    loc,
                    NodeType::EnumSqlColumnConstraint,
                    ColumnConstraint::Default as u32,
                ));
                let elem = self.parse_expression()?;
                let node = self.ctx.expression(elem);
                constraints.push(node);
            } else if let Some(loc) = self.accept_keyword(Keyword::Check) {
                constraints.push(self.ctx.enum_node(
                    loc,
                    NodeType::EnumSqlColumnConstraint,
                    ColumnConstraint::Check as u32,
                ));
                self.expect_punct(SymbolKind::LParen, ExpectedSymbol::LParen, "'('")?;
                let elem = self.parse_expression()?;
                let node = self.ctx.expression(elem);
                self.expect_punct(SymbolKind::RParen, ExpectedSymbol::RParen, "')'")?;
                constraints.push(node);
            } else {
                break;
            }
        }
        let mut attrs = vec![
            self.ctx.attr(AttributeKey::SqlColumnDefName, name),
            self.ctx.attr(AttributeKey::SqlColumnDefType, data_type),
        ];
        if !constraints.is_empty() {
            let array = self.ctx.array(begin, constraints, true, true);
            attrs.push(self.ctx.attr(AttributeKey::SqlColumnDefConstraints, array));
        }
        let location = self.span_from(begin);
        Ok(self
            .ctx
            .object(location, NodeType::ObjectSqlColumnDef, attrs, false, false))
    }

    fn parse_set_statement(&mut self) -> PResult<Node> {
        let begin = self.peek().location;
        self.expect_keyword(Keyword::Set)?;
        let path = self.parse_name_path()?;
        let key_array = self.ctx.array(path.location, path.elements, false, false);
        if self
            .accept_punct(SymbolKind::Equals, ExpectedSymbol::Operator)
            .is_none()
        {
            self.expect_keyword(Keyword::To)?;
        }
        let elem = self.parse_expression()?;
        let value = self.ctx.expression(elem);
        let attrs = vec![
            self.ctx.attr(AttributeKey::ExtSetKey, key_array),
            self.ctx.attr(AttributeKey::ExtSetValue, value),
        ];
        let location = self.span_from(begin);
        Ok(self
            .ctx
            .object(location, NodeType::ObjectExtSet, attrs, false, false))
    }
}

struct NamePath {
    elements: Vec<Node>,
    location: Location,
    star: bool,
}

fn is_type_keyword(keyword: Keyword) -> bool {
    matches!(
        keyword,
        Keyword::Bigint
            | Keyword::Boolean
            | Keyword::Char
            | Keyword::Character
            | Keyword::Date
            | Keyword::Decimal
            | Keyword::Double
            | Keyword::Float
            | Keyword::Int
            | Keyword::Integer
            | Keyword::Interval
            | Keyword::Numeric
            | Keyword::Real
            | Keyword::Smallint
            | Keyword::Text
            | Keyword::Time
            | Keyword::Timestamp
            | Keyword::Varchar
    )
}

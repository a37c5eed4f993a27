use std::rc::Rc;

use crate::catalog::CatalogEntryId;
use crate::parser::ast::{Node, Statement};
use crate::parser::grammar::Grammar;
use crate::parser::keywords::Keyword;
use crate::parser::scanner::ScannedScript;
use crate::text::Location;

/// A grammar symbol the parser would accept at a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExpectedSymbol {
    Identifier,
    Keyword(Keyword),
    IntegerLiteral,
    FloatLiteral,
    StringLiteral,
    Dot,
    Comma,
    Semicolon,
    LParen,
    RParen,
    Star,
    Operator,
}

/// The output of one parser run over a scanned script.
#[derive(Debug)]
pub struct ParsedScript {
    pub catalog_entry_id: CatalogEntryId,
    pub scanned_script: Rc<ScannedScript>,
    pub nodes: Vec<Node>,
    pub statements: Vec<Statement>,
    pub errors: Vec<(Location, String)>,
}

impl ParsedScript {
    /// Resolve the statement and AST node enclosing a text offset.
    ///
    /// Exact containment wins over `end == offset` adjacency; holes in the
    /// AST yield the closest enclosing materialized node.
    pub fn find_node_at_offset(&self, text_offset: usize) -> Option<(usize, usize)> {
        if self.statements.is_empty() {
            return None;
        }
        let text_offset = text_offset as u32;
        // Predecessor of the first statement beginning after the offset.
        let mut statement_id = 0;
        while statement_id < self.statements.len() {
            let root = &self.nodes[self.statements[statement_id].root as usize];
            if root.location.offset > text_offset {
                break;
            }
            statement_id += 1;
        }
        if statement_id == 0 {
            return None;
        }
        statement_id -= 1;

        let mut iter = self.statements[statement_id].root as usize;
        loop {
            let node = &self.nodes[iter];
            if node.children_count == 0 || !node.node_type.has_children() {
                break;
            }
            let mut child_exact = None;
            let mut child_adjacent = None;
            for child_id in node.children() {
                let child = &self.nodes[child_id];
                let begin = child.location.offset;
                let end = child.location.end();
                if begin <= text_offset {
                    if end > text_offset {
                        child_exact = Some(child_id);
                    } else if end == text_offset {
                        child_adjacent = Some(child_id);
                    }
                }
            }
            match child_exact.or(child_adjacent) {
                Some(child_id) => iter = child_id,
                None => break,
            }
        }
        Some((statement_id, iter))
    }

    pub fn ast_byte_size(&self) -> usize {
        self.nodes.len() * std::mem::size_of::<Node>()
            + self.statements.len() * std::mem::size_of::<Statement>()
    }
}

/// Parse a scanned symbol stream into a flat AST.
pub fn parse(scanned: &Rc<ScannedScript>) -> ParsedScript {
    let mut grammar = Grammar::new(scanned);
    grammar.parse_script();
    let (nodes, statements, errors) = grammar.finish();
    ParsedScript {
        catalog_entry_id: scanned.catalog_entry_id,
        scanned_script: scanned.clone(),
        nodes,
        statements,
        errors,
    }
}

/// Re-run the parser and collect the grammar symbols expected at the
/// target symbol. Errors before the target do not stop the collection.
pub fn parse_until(scanned: &ScannedScript, target_symbol_id: usize) -> Vec<ExpectedSymbol> {
    let mut grammar = Grammar::new_with_target(scanned, target_symbol_id);
    grammar.parse_script();
    grammar.into_expected()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::parser::ast::{AttributeKey, NodeType, StatementType};
    use crate::parser::scanner;

    fn parse_text(text: &str) -> ParsedScript {
        let scanned = Rc::new(scanner::scan(format!("{text}\0\0"), 1, 1));
        parse(&scanned)
    }

    #[test]
    fn test_parse_simple_select() {
        let parsed = parse_text("select 1");
        assert_eq!(parsed.statements.len(), 1);
        assert_eq!(parsed.statements[0].statement_type, StatementType::Select);
        assert!(parsed.errors.is_empty());
        let root = &parsed.nodes[parsed.statements[0].root as usize];
        assert_eq!(root.node_type, NodeType::ObjectSqlSelect);
    }

    #[test]
    fn test_parent_pointers_hold() {
        let parsed = parse_text("select a, b from foo f where a < 10 order by b desc limit 5");
        assert!(parsed.errors.is_empty());
        for (id, node) in parsed.nodes.iter().enumerate() {
            if node.node_type.has_children() {
                for child_id in node.children() {
                    assert_eq!(parsed.nodes[child_id].parent as usize, id);
                }
            }
        }
    }

    #[test]
    fn test_statement_ranges_are_disjoint() {
        let parsed = parse_text("select 1; select 2; create table foo(a int)");
        assert_eq!(parsed.statements.len(), 3);
        let mut last_end = 0;
        for statement in &parsed.statements {
            assert_eq!(statement.nodes_begin, last_end);
            last_end = statement.nodes_begin + statement.node_count;
            assert_eq!(
                parsed.nodes[statement.root as usize].parent,
                statement.root
            );
        }
        assert_eq!(last_end, parsed.nodes.len());
    }

    #[test]
    fn test_create_table_statement() {
        let parsed = parse_text("create table db1.schema1.table1(a int, b text not null)");
        assert!(parsed.errors.is_empty(), "{:?}", parsed.errors);
        assert_eq!(
            parsed.statements[0].statement_type,
            StatementType::CreateTable
        );
        // The qualified name has three components.
        let name_array = parsed
            .nodes
            .iter()
            .find(|n| n.attribute_key == AttributeKey::SqlCreateName)
            .unwrap();
        assert_eq!(name_array.children_count, 3);
    }

    #[test]
    fn test_create_table_as() {
        let parsed = parse_text("create table t as select 1");
        assert!(parsed.errors.is_empty(), "{:?}", parsed.errors);
        assert_eq!(
            parsed.statements[0].statement_type,
            StatementType::CreateTableAs
        );
    }

    #[test]
    fn test_set_statement() {
        let parsed = parse_text("set search_path = 'public'");
        assert!(parsed.errors.is_empty(), "{:?}", parsed.errors);
        assert_eq!(parsed.statements[0].statement_type, StatementType::Set);
    }

    #[test]
    fn test_nary_merging() {
        let parsed = parse_text("select 1 where a = 1 and b = 2 and c = 3");
        assert!(parsed.errors.is_empty(), "{:?}", parsed.errors);
        // The AND chain merges into one n-ary expression with three args.
        let and_args = parsed
            .nodes
            .iter()
            .filter(|n| n.attribute_key == AttributeKey::SqlExpressionArgs)
            .map(|n| n.children_count)
            .max()
            .unwrap();
        assert_eq!(and_args, 3);
    }

    #[test]
    fn test_interval_cast_with_unit() {
        let parsed = parse_text("select interval '1' day");
        assert!(parsed.errors.is_empty(), "{:?}", parsed.errors);
        let unit = parsed
            .nodes
            .iter()
            .find(|n| n.attribute_key == AttributeKey::SqlConstCastInterval)
            .expect("interval unit node");
        assert_eq!(unit.node_type, NodeType::EnumSqlIntervalType);

        // The unit is optional.
        let parsed = parse_text("select interval '1 day'");
        assert!(parsed.errors.is_empty(), "{:?}", parsed.errors);
        assert!(
            !parsed
                .nodes
                .iter()
                .any(|n| n.attribute_key == AttributeKey::SqlConstCastInterval)
        );
    }

    #[test]
    fn test_join_using() {
        let parsed = parse_text("select * from a join b using (id, ts)");
        assert!(parsed.errors.is_empty(), "{:?}", parsed.errors);
        let using = parsed
            .nodes
            .iter()
            .find(|n| n.attribute_key == AttributeKey::SqlJoinUsing)
            .expect("using column list");
        assert_eq!(using.node_type, NodeType::Array);
        assert_eq!(using.children_count, 2);
    }

    #[test]
    fn test_syntax_error_keeps_partial_output() {
        let parsed = parse_text("select 1; select from from; select 2");
        assert_eq!(parsed.statements.len(), 2);
        assert!(!parsed.errors.is_empty());
    }

    #[test]
    fn test_trailing_dot_is_reported() {
        let parsed = parse_text("select * from schema1.");
        assert!(
            parsed
                .errors
                .iter()
                .any(|(_, msg)| msg.contains("trailing dot"))
        );
        assert_eq!(parsed.statements.len(), 1);
    }

    #[test]
    fn test_find_node_at_offset() {
        let parsed = parse_text("select a from foo");
        //                       0123456789012345678
        let (statement, node) = parsed.find_node_at_offset(7).unwrap();
        assert_eq!(statement, 0);
        // Offset 7 is inside the column ref `a`.
        let mut iter = node;
        let mut found_column_ref = false;
        loop {
            let n = &parsed.nodes[iter];
            if n.node_type == NodeType::ObjectSqlColumnRef {
                found_column_ref = true;
                break;
            }
            if n.parent as usize == iter {
                break;
            }
            iter = n.parent as usize;
        }
        assert!(found_column_ref);

        // A hole between FROM and the table ref resolves to an enclosing node.
        assert!(parsed.find_node_at_offset(5).is_some());
    }

    #[test]
    fn test_expected_symbols_after_select() {
        let scanned = Rc::new(scanner::scan("select 1 \0\0".to_string(), 1, 1));
        // Target the EOF symbol: what comes after `1`?
        let eof_id = scanned.symbols.len() - 1;
        let expected = parse_until(&scanned, eof_id);
        assert!(expected.contains(&ExpectedSymbol::Keyword(Keyword::From)));
        assert!(expected.contains(&ExpectedSymbol::Keyword(Keyword::Where)));
    }

    #[test]
    fn test_expected_symbols_in_from() {
        let scanned = Rc::new(scanner::scan("select 1 from \0\0".to_string(), 1, 1));
        let eof_id = scanned.symbols.len() - 1;
        let expected = parse_until(&scanned, eof_id);
        assert!(expected.contains(&ExpectedSymbol::Identifier));
    }
}

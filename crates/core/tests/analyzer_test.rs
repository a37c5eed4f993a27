use dashql_core::analyzer::{ExpressionInner, TableReferenceInner};
use dashql_core::catalog::{
    Catalog, ContextObjectId, SchemaColumnDescriptor, SchemaDescriptor, SchemaTableDescriptor,
};
use dashql_core::parser::ast::IntervalType;
use dashql_core::script::Script;
use dashql_core::status::StatusCode;

fn analyzed_script(catalog: &mut Catalog, entry_id: u32, text: &str) -> Script {
    let mut script = Script::new(catalog, entry_id);
    script.replace_text(text);
    script.analyze(catalog, true).unwrap();
    script
}

#[test]
fn test_create_table_declares_qualified_defaults() {
    let mut catalog = Catalog::new();
    let script = analyzed_script(&mut catalog, 1, "create table foo(a int, b text)");
    let analyzed = script.analyzed_script().unwrap();
    assert_eq!(analyzed.entry.table_declarations.len(), 1);
    let table = &analyzed.entry.table_declarations[0];
    assert_eq!(table.table_name.database_name, "dashql");
    assert_eq!(table.table_name.schema_name, "public");
    assert_eq!(table.table_name.table_name, "foo");
    assert_eq!(table.table_columns.len(), 2);
    assert_eq!(table.column_by_name("b").unwrap().column_index, 1);
    assert_eq!(table.catalog_table_id, ContextObjectId::new(1, 0));
}

#[test]
fn test_resolve_qualified_table_across_catalog() {
    // S2: two ranked catalog entries, the script resolves against the right one.
    let mut catalog = Catalog::new();
    let a = analyzed_script(&mut catalog, 1, "create table db1.schema1.table1(a int);");
    catalog.load_script(&a, 0).unwrap();
    let b = analyzed_script(&mut catalog, 2, "create table db2.schema2.table2(a int);");
    catalog.load_script(&b, 1).unwrap();

    let script = analyzed_script(&mut catalog, 3, "select * from db2.schema2.table2");
    let analyzed = script.analyzed_script().unwrap();
    assert_eq!(analyzed.table_references.len(), 1);
    let TableReferenceInner::Resolved(resolved) = &analyzed.table_references[0].inner else {
        panic!("table ref was not resolved");
    };
    let b_analyzed = b.analyzed_script().unwrap();
    let b_table = &b_analyzed.entry.table_declarations[0];
    assert_eq!(resolved.selected.catalog_table_id, b_table.catalog_table_id);
    assert_eq!(
        resolved.selected.catalog_database_id,
        b_table.catalog_database_id
    );
    assert_eq!(
        resolved.selected.catalog_schema_id,
        b_table.catalog_schema_id
    );
    assert!(resolved.alternatives.is_empty());
}

#[test]
fn test_catalog_id_out_of_sync() {
    // S5: two scripts allocate preliminary ids for the same schema; the
    // second load must fail.
    let mut catalog = Catalog::new();
    let x = analyzed_script(&mut catalog, 1, "create table schema1.table1(a int)");
    let y = analyzed_script(&mut catalog, 2, "create table schema1.table2(a int)");
    catalog.load_script(&x, 0).unwrap();
    assert_eq!(
        catalog.load_script(&y, 1),
        Err(StatusCode::CatalogIdOutOfSync)
    );
    // Re-analyzing against the updated catalog heals the ids.
    let mut y = y;
    y.replace_text("create table schema1.table2(a int) ");
    y.analyze(&mut catalog, true).unwrap();
    catalog.load_script(&y, 1).unwrap();
}

#[test]
fn test_column_refs_resolve_through_alias_and_scope() {
    let mut catalog = Catalog::new();
    catalog.add_descriptor_pool(100, 0).unwrap();
    catalog
        .add_schema_descriptor(
            100,
            SchemaDescriptor {
                database_name: Some("dashql".into()),
                schema_name: Some("public".into()),
                tables: Some(vec![SchemaTableDescriptor {
                    table_name: "foo".into(),
                    columns: vec![
                        SchemaColumnDescriptor {
                            column_name: "v".into(),
                            ordinal_position: Some(0),
                        },
                        SchemaColumnDescriptor {
                            column_name: "w".into(),
                            ordinal_position: Some(1),
                        },
                    ],
                }]),
            },
        )
        .unwrap();

    let script = analyzed_script(
        &mut catalog,
        1,
        "select f.v, w from foo f where f.v = 42",
    );
    let analyzed = script.analyzed_script().unwrap();

    let resolved: Vec<_> = analyzed
        .expressions
        .iter()
        .filter_map(|e| match &e.inner {
            ExpressionInner::ResolvedColumnRef(r) => Some(r),
            _ => None,
        })
        .collect();
    // f.v (select), w (unqualified, unambiguous), f.v (where)
    assert_eq!(resolved.len(), 3);
    for column_ref in &resolved {
        assert_eq!(column_ref.catalog_table_id.origin(), 100);
        assert!(column_ref.referenced_catalog_version <= catalog.version());
    }
    assert!(resolved.iter().any(|r| r.column_name == "w"));

    // The comparison `f.v = 42` is a restriction on (foo, v).
    assert_eq!(analyzed.column_restrictions.len(), 1);
    assert_eq!(analyzed.column_restrictions[0].table_column_id, 0);

    // One scope with the aliased table.
    assert_eq!(analyzed.name_scopes.len(), 1);
    assert!(
        analyzed.name_scopes[0]
            .referenced_tables_by_name
            .contains_key("f")
    );
}

#[test]
fn test_interval_cast_classification() {
    let mut catalog = Catalog::new();
    let script = analyzed_script(&mut catalog, 1, "select interval '1' month");
    let analyzed = script.analyzed_script().unwrap();
    let cast = analyzed
        .expressions
        .iter()
        .find_map(|e| match &e.inner {
            ExpressionInner::ConstIntervalCast(cast) => Some((cast, e.is_constant)),
            _ => None,
        })
        .expect("interval cast expression");
    assert_eq!(cast.0.interval, Some(IntervalType::Month));
    assert_eq!(cast.0.raw_value, "'1'");
    assert!(cast.1);
}

#[test]
fn test_unresolvable_column_stays_unresolved() {
    let mut catalog = Catalog::new();
    let script = analyzed_script(&mut catalog, 1, "select mystery from nowhere");
    let analyzed = script.analyzed_script().unwrap();
    assert!(analyzed.expressions.iter().any(|e| matches!(
        &e.inner,
        ExpressionInner::UnresolvedColumnRef(c) if c.column_name == "mystery"
    )));
    assert!(matches!(
        analyzed.table_references[0].inner,
        TableReferenceInner::Unresolved(_)
    ));
}

#[test]
fn test_analyze_is_idempotent() {
    let mut catalog = Catalog::new();
    let mut script = analyzed_script(&mut catalog, 1, "select a, b from foo where a = 1");
    let first = script.analyzed_script().unwrap().clone();
    script.analyze(&mut catalog, true).unwrap();
    let second = script.analyzed_script().unwrap();

    assert_eq!(first.expressions.len(), second.expressions.len());
    assert_eq!(first.table_references.len(), second.table_references.len());
    assert_eq!(first.name_scopes.len(), second.name_scopes.len());
    for (left, right) in first.expressions.iter().zip(second.expressions.iter()) {
        assert_eq!(left.expression_id, right.expression_id);
        assert_eq!(left.ast_node_id, right.ast_node_id);
    }
}

#[test]
fn test_edit_and_undo_roundtrip() {
    let mut catalog = Catalog::new();
    let mut script = analyzed_script(&mut catalog, 1, "select a from foo");
    let before = script.analyzed_script().unwrap().clone();

    script.insert_text_at(7, "xyz, ");
    script.analyze(&mut catalog, true).unwrap();
    script.erase_text_range(7, 5);
    script.analyze(&mut catalog, true).unwrap();

    assert_eq!(script.to_string(), "select a from foo");
    let after = script.analyzed_script().unwrap();
    assert_eq!(before.expressions.len(), after.expressions.len());
    assert_eq!(
        before.table_references.len(),
        after.table_references.len()
    );
    assert_eq!(before.name_scopes.len(), after.name_scopes.len());
}

#[test]
fn test_pipeline_stage_order_is_enforced() {
    let catalog = Catalog::new();
    let mut script = Script::new(&catalog, 1);
    script.replace_text("select 1");
    assert_eq!(script.parse().unwrap_err(), StatusCode::ScriptNotScanned);
    let mut catalog = catalog;
    assert_eq!(
        script.analyze(&mut catalog, false).unwrap_err(),
        StatusCode::ScriptNotParsed
    );
    script.scan().unwrap();
    script.parse().unwrap();
    script.analyze(&mut catalog, false).unwrap();
}

#[test]
fn test_scan_is_lazy_on_version() {
    let catalog = Catalog::new();
    let mut script = Script::new(&catalog, 1);
    script.replace_text("select 1");
    script.scan().unwrap();
    let first = script.scanned_script().unwrap().clone();
    // No edit: the same scan is kept.
    script.scan().unwrap();
    assert!(std::rc::Rc::ptr_eq(&first, script.scanned_script().unwrap()));
    // An edit triggers a re-scan.
    script.insert_text_at(0, " ");
    script.scan().unwrap();
    assert!(!std::rc::Rc::ptr_eq(&first, script.scanned_script().unwrap()));
}

#[test]
fn test_scan_incrementally() {
    // S1: insert one character at a time and re-scan after each.
    let catalog = Catalog::new();
    let mut script = Script::new(&catalog, 1);
    for (idx, c) in "select 1".chars().enumerate() {
        script.insert_char_at(idx, c as u32);
        script.scan().unwrap();
    }
    let scanned = script.scanned_script().unwrap();
    let symbols = &scanned.symbols;
    assert_eq!(symbols.len(), 3);
    assert_eq!(scanned.read_text_at(symbols[0].location), "select");
    assert_eq!(symbols[0].location.offset, 0);
    assert_eq!(symbols[0].location.length, 6);
    assert_eq!(scanned.read_text_at(symbols[1].location), "1");
    assert_eq!(symbols[1].location.offset, 7);
    assert_eq!(symbols[1].location.length, 1);
    assert!(symbols[2].is_eof());
}

#[test]
fn test_empty_script() {
    let mut catalog = Catalog::new();
    let mut script = Script::new(&catalog, 1);
    script.analyze(&mut catalog, true).unwrap();
    assert_eq!(script.parsed_script().unwrap().statements.len(), 0);
    assert_eq!(script.scanned_script().unwrap().symbols.len(), 1);
    let analyzed = script.analyzed_script().unwrap();
    assert!(analyzed.expressions.is_empty());
    assert!(analyzed.table_references.is_empty());
    script.move_cursor(0).unwrap();
}

#[test]
fn test_statistics_cover_all_stages() {
    let mut catalog = Catalog::new();
    let script = analyzed_script(&mut catalog, 1, "select a, b from foo where a < 1");
    let stats = script.statistics();
    assert!(stats.memory.rope_bytes > 0);
    assert!(stats.memory.scanner_input_bytes > 0);
    assert!(stats.memory.scanner_symbol_bytes > 0);
    assert!(stats.memory.parser_ast_bytes > 0);
    assert!(stats.memory.analyzer_description_bytes > 0);
}

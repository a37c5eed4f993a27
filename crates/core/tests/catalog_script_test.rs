use dashql_core::catalog::{Catalog, CatalogEntryType, SchemaDescriptor, SchemaTableDescriptor};
use dashql_core::cursor::CursorContext;
use dashql_core::script::Script;
use dashql_core::status::StatusCode;
use smol_str::SmolStr;

fn analyzed_script(catalog: &mut Catalog, entry_id: u32, text: &str) -> Script {
    let mut script = Script::new(catalog, entry_id);
    script.replace_text(text);
    script.analyze(catalog, true).unwrap();
    script
}

#[test]
fn test_update_script_diffs_schema_rows() {
    let mut catalog = Catalog::new();
    let mut script = analyzed_script(&mut catalog, 1, "create table schema1.table1(a int)");
    catalog.load_script(&script, 0).unwrap();
    let version_after_load = catalog.version();
    assert!(
        catalog
            .schemas()
            .contains_key(&(SmolStr::new("dashql"), SmolStr::new("schema1")))
    );

    // Re-loading the same analysis is a no-op.
    catalog.load_script(&script, 0).unwrap();
    assert_eq!(catalog.version(), version_after_load);

    // Moving the table to another schema rebinds the entry and drops the
    // orphaned schema declaration.
    script.replace_text("create table schema2.table1(a int)");
    script.analyze(&mut catalog, true).unwrap();
    catalog.load_script(&script, 0).unwrap();
    assert!(catalog.version() > version_after_load);
    assert!(
        !catalog
            .schemas()
            .contains_key(&(SmolStr::new("dashql"), SmolStr::new("schema1")))
    );
    assert!(
        catalog
            .schemas()
            .contains_key(&(SmolStr::new("dashql"), SmolStr::new("schema2")))
    );

    // The rebound entry resolves through the catalog.
    let mut hits = Vec::new();
    catalog.resolve_table_by_name("", "schema2", "table1", None, &mut hits, 8);
    assert_eq!(hits.len(), 1);

    let version_before_drop = catalog.version();
    catalog.drop_script(&script);
    assert!(catalog.version() > version_before_drop);
    assert!(!catalog.contains_entry(1));
    let mut hits = Vec::new();
    catalog.resolve_table_by_name("", "schema2", "table1", None, &mut hits, 8);
    assert!(hits.is_empty());
}

#[test]
fn test_entry_id_collision_across_entry_kinds() {
    let mut catalog = Catalog::new();
    catalog.add_descriptor_pool(1, 0).unwrap();
    catalog
        .add_schema_descriptor(
            1,
            SchemaDescriptor {
                database_name: None,
                schema_name: None,
                tables: Some(vec![SchemaTableDescriptor {
                    table_name: "t".into(),
                    columns: vec![],
                }]),
            },
        )
        .unwrap();

    let script = analyzed_script(&mut catalog, 1, "select 1");
    assert_eq!(
        catalog.load_script(&script, 0),
        Err(StatusCode::ExternalIdCollision)
    );
}

#[test]
fn test_catalog_mismatch_is_detected() {
    let mut first = Catalog::new();
    let mut second = Catalog::new();
    let mut script = Script::new(&first, 1);
    script.replace_text("select 1");
    assert_eq!(
        script.analyze(&mut second, true).unwrap_err(),
        StatusCode::CatalogMismatch
    );
    script.analyze(&mut first, true).unwrap();
    assert_eq!(
        second.load_script(&script, 0),
        Err(StatusCode::CatalogMismatch)
    );
}

#[test]
fn test_describe_entries() {
    let mut catalog = Catalog::new();
    catalog.add_descriptor_pool(7, 2).unwrap();
    catalog
        .add_schema_descriptor(
            7,
            SchemaDescriptor {
                database_name: Some("db1".into()),
                schema_name: Some("schema1".into()),
                tables: Some(vec![
                    SchemaTableDescriptor {
                        table_name: "t1".into(),
                        columns: vec![],
                    },
                    SchemaTableDescriptor {
                        table_name: "t2".into(),
                        columns: vec![],
                    },
                ]),
            },
        )
        .unwrap();
    let script = analyzed_script(&mut catalog, 3, "create table foo(a int)");
    catalog.load_script(&script, 1).unwrap();

    let described = catalog.describe_entries();
    assert_eq!(described.len(), 2);
    // Ranked order: the script at rank 1 precedes the pool at rank 2.
    assert_eq!(described[0].catalog_entry_id, 3);
    assert_eq!(described[0].entry_type, CatalogEntryType::Script);
    assert_eq!(described[1].catalog_entry_id, 7);
    assert_eq!(described[1].entry_type, CatalogEntryType::DescriptorPool);
    assert_eq!(described[1].schemas.len(), 1);
    assert_eq!(described[1].schemas[0].table_count, 2);

    let one = catalog.describe_entries_of(7).unwrap();
    assert_eq!(one.rank, 2);
    assert!(catalog.describe_entries_of(99).is_none());
}

#[test]
fn test_cursor_contexts() {
    let mut catalog = Catalog::new();
    let text = "select f.v from foo f where v < 10";
    //          0123456789012345678901234567890123
    let mut script = analyzed_script(&mut catalog, 1, text);

    // Inside `f.v`: a column ref.
    let cursor = script.move_cursor(8).unwrap();
    assert!(matches!(cursor.context, CursorContext::ColumnRef { .. }));
    assert_eq!(cursor.statement_id, Some(0));
    assert!(!cursor.name_scopes.is_empty());

    // Inside `foo`: a table ref, not at the alias.
    let cursor = script.move_cursor(17).unwrap();
    assert!(matches!(
        cursor.context,
        CursorContext::TableRef { at_alias: false, .. }
    ));

    // At the alias `f`.
    let cursor = script.move_cursor(21).unwrap();
    assert!(matches!(
        cursor.context,
        CursorContext::TableRef { at_alias: true, .. }
    ));

    // Inside the SELECT keyword: no reference context.
    let cursor = script.move_cursor(3).unwrap();
    assert!(matches!(cursor.context, CursorContext::None));
}

#[test]
fn test_cursor_requires_scan() {
    let catalog = Catalog::new();
    let mut script = Script::new(&catalog, 1);
    script.replace_text("select 1");
    assert_eq!(
        script.move_cursor(0).unwrap_err(),
        StatusCode::ScriptNotScanned
    );
}

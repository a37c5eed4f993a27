use dashql_core::catalog::{
    Catalog, SchemaColumnDescriptor, SchemaDescriptor, SchemaTableDescriptor,
};
use dashql_core::completion::{CandidateTags, CompletionStrategy};
use dashql_core::registry::ScriptRegistry;
use dashql_core::script::Script;
use dashql_core::status::StatusCode;

fn descriptor(
    database: &str,
    schema: &str,
    tables: &[(&str, &[&str])],
) -> SchemaDescriptor {
    SchemaDescriptor {
        database_name: Some(database.into()),
        schema_name: Some(schema.into()),
        tables: Some(
            tables
                .iter()
                .map(|(name, columns)| SchemaTableDescriptor {
                    table_name: (*name).into(),
                    columns: columns
                        .iter()
                        .enumerate()
                        .map(|(idx, column)| SchemaColumnDescriptor {
                            column_name: (*column).into(),
                            ordinal_position: Some(idx as u32),
                        })
                        .collect(),
                })
                .collect(),
        ),
    }
}

fn script_at_end(catalog: &mut Catalog, entry_id: u32, text: &str) -> Script {
    let mut script = Script::new(catalog, entry_id);
    script.replace_text(text);
    script.analyze(catalog, true).unwrap();
    script.move_cursor(text.len()).unwrap();
    script
}

#[test]
fn test_dot_completion_on_schema() {
    // S3: `select * from schema1.` completes the schema's tables.
    let mut catalog = Catalog::new();
    catalog.add_descriptor_pool(100, 0).unwrap();
    catalog
        .add_schema_descriptor(
            100,
            descriptor(
                "db1",
                "schema1",
                &[
                    ("table1", &["column1", "column2", "column3"]),
                    ("table2", &["column1", "column2", "column4"]),
                ],
            ),
        )
        .unwrap();

    let text = "select * from schema1.";
    let script = script_at_end(&mut catalog, 1, text);
    let completion = script.complete_at_cursor(&catalog, 10, None).unwrap();

    assert!(completion.dot_completion);
    assert_eq!(completion.strategy, CompletionStrategy::TableRef);
    let names: Vec<&str> = completion
        .candidates
        .iter()
        .map(|c| c.completion_text.as_str())
        .collect();
    assert!(names.contains(&"table1"), "{names:?}");
    assert!(names.contains(&"table2"), "{names:?}");
    for candidate in &completion.candidates {
        assert!(
            candidate
                .candidate_tags
                .contains(CandidateTags::DOT_RESOLUTION_TABLE)
        );
        assert!(
            candidate
                .candidate_tags
                .contains(CandidateTags::THROUGH_CATALOG)
        );
        // The replacement target is the empty span right after the dot.
        assert_eq!(candidate.target_location.offset as usize, text.len());
        assert_eq!(candidate.target_location.length, 0);
    }
}

#[test]
fn test_dot_completion_on_alias_qualifies_columns() {
    // S4: `select f. from foo f` completes the columns of foo as `f.<col>`.
    let mut catalog = Catalog::new();
    catalog.add_descriptor_pool(100, 0).unwrap();
    catalog
        .add_schema_descriptor(
            100,
            descriptor("dashql", "public", &[("foo", &["v", "w", "x"])]),
        )
        .unwrap();

    let text = "select f. from foo f";
    let mut script = Script::new(&catalog, 1);
    script.replace_text(text);
    script.analyze(&mut catalog, true).unwrap();
    script.move_cursor(9).unwrap();
    let completion = script.complete_at_cursor(&catalog, 10, None).unwrap();

    assert!(completion.dot_completion);
    assert_eq!(completion.strategy, CompletionStrategy::ColumnRef);
    assert_eq!(completion.candidates.len(), 3);
    for candidate in &completion.candidates {
        assert!(
            candidate
                .candidate_tags
                .contains(CandidateTags::DOT_RESOLUTION_COLUMN)
        );
        assert!(
            candidate
                .candidate_tags
                .contains(CandidateTags::IN_NAME_SCOPE)
        );
        let object = &candidate.catalog_objects[0];
        assert!(object.prefer_qualified);
        assert_eq!(object.qualified_name.len(), 2);
        assert_eq!(object.qualified_name[0], "f");
        assert_eq!(object.qualified_name_target_idx, 1);
    }
}

#[test]
fn test_keyword_candidates_while_typing() {
    let mut catalog = Catalog::new();
    let script = script_at_end(&mut catalog, 1, "select 1 f");
    let completion = script.complete_at_cursor(&catalog, 10, None).unwrap();
    let names: Vec<&str> = completion
        .candidates
        .iter()
        .map(|c| c.completion_text.as_str())
        .collect();
    assert!(names.contains(&"from"), "{names:?}");
    for candidate in &completion.candidates {
        assert!(
            candidate
                .candidate_tags
                .contains(CandidateTags::EXPECTED_PARSER_SYMBOL)
        );
    }
    // FROM matches the typed prefix and is very popular; it must win.
    assert_eq!(completion.candidates[0].completion_text, "from");
}

#[test]
fn test_completion_after_whitespace_is_empty() {
    // A cursor floating in whitespace is not attached to any symbol.
    let mut catalog = Catalog::new();
    let script = script_at_end(&mut catalog, 1, "select 1 ");
    let completion = script.complete_at_cursor(&catalog, 10, None).unwrap();
    assert!(completion.candidates.is_empty());
}

#[test]
fn test_typed_prefix_matches_keywords() {
    let mut catalog = Catalog::new();
    let script = script_at_end(&mut catalog, 1, "select 1 fr");
    let completion = script.complete_at_cursor(&catalog, 10, None).unwrap();
    let from = completion
        .candidates
        .iter()
        .find(|c| c.completion_text == "from")
        .expect("from is a candidate");
    assert!(from.candidate_tags.contains(CandidateTags::SUBSTRING_MATCH));
    assert!(from.candidate_tags.contains(CandidateTags::PREFIX_MATCH));
    assert_eq!(completion.candidates[0].completion_text, "from");
}

#[test]
fn test_top_k_is_stable() {
    // S6: many equally scored substring matches; the k smallest names win.
    let mut catalog = Catalog::new();
    let columns: Vec<String> = (0..50).map(|i| format!("m{i:02}")).collect();
    let column_refs: Vec<&str> = columns.iter().map(String::as_str).collect();
    catalog.add_descriptor_pool(100, 0).unwrap();
    catalog
        .add_schema_descriptor(100, descriptor("db1", "schema1", &[("t", &column_refs)]))
        .unwrap();

    let text = "select m from db1.schema1.t";
    let mut script = Script::new(&catalog, 1);
    script.replace_text(text);
    script.analyze(&mut catalog, true).unwrap();
    script.move_cursor(8).unwrap();

    let completion = script.complete_at_cursor(&catalog, 5, None).unwrap();
    assert_eq!(completion.candidates.len(), 5);
    let names: Vec<&str> = completion
        .candidates
        .iter()
        .map(|c| c.completion_text.as_str())
        .collect();
    assert_eq!(names, vec!["m00", "m01", "m02", "m03", "m04"]);
    let scores: Vec<u32> = completion.candidates.iter().map(|c| c.score).collect();
    let mut sorted = scores.clone();
    sorted.sort_unstable_by(|a, b| b.cmp(a));
    assert_eq!(scores, sorted);

    // Re-requesting produces the same sequence.
    let again = script.complete_at_cursor(&catalog, 5, None).unwrap();
    let names_again: Vec<&str> = again
        .candidates
        .iter()
        .map(|c| c.completion_text.as_str())
        .collect();
    assert_eq!(names, names_again);
}

#[test]
fn test_completion_requires_cursor() {
    let mut catalog = Catalog::new();
    let mut script = Script::new(&catalog, 1);
    script.replace_text("select 1");
    script.analyze(&mut catalog, true).unwrap();
    assert_eq!(
        script.complete_at_cursor(&catalog, 10, None).unwrap_err(),
        StatusCode::CompletionMissesCursor
    );
}

#[test]
fn test_completion_on_punctuation_is_empty() {
    let mut catalog = Catalog::new();
    let text = "select (1";
    let mut script = Script::new(&catalog, 1);
    script.replace_text(text);
    script.analyze(&mut catalog, true).unwrap();
    // Inside the literal `1`, pointing at a non-completable symbol.
    script.move_cursor(text.len()).unwrap();
    let completion = script.complete_at_cursor(&catalog, 10, None).unwrap();
    assert!(completion.candidates.is_empty());
}

#[test]
fn test_snippets_attach_to_column_candidates() {
    let mut catalog = Catalog::new();
    catalog.add_descriptor_pool(100, 0).unwrap();
    catalog
        .add_schema_descriptor(
            100,
            descriptor("dashql", "public", &[("foo", &["v", "w"])]),
        )
        .unwrap();

    // Another script restricts foo.v; its filter becomes a snippet.
    let mut registry = ScriptRegistry::new();
    let mut other = Script::new(&catalog, 2);
    other.replace_text("select * from foo where v = 42");
    other.analyze(&mut catalog, true).unwrap();
    registry.load_script(&other).unwrap();

    let mut script = Script::new(&catalog, 1);
    script.replace_text("select f. from foo f");
    script.analyze(&mut catalog, true).unwrap();
    script.move_cursor(9).unwrap();
    let completion = script
        .complete_at_cursor(&catalog, 10, Some(&registry))
        .unwrap();

    let v_candidate = completion
        .candidates
        .iter()
        .find(|c| c.completion_text == "v")
        .expect("column v is a candidate");
    let object = &v_candidate.catalog_objects[0];
    assert_eq!(object.restriction_snippets.len(), 1);
    let group = &object.restriction_snippets[0];
    assert_eq!(group.snippets.len(), 1);
    assert_eq!(group.snippets[0].text, "v = 42");
}

#[test]
fn test_select_candidate_roundtrip() {
    let mut catalog = Catalog::new();
    catalog.add_descriptor_pool(100, 0).unwrap();
    catalog
        .add_schema_descriptor(
            100,
            descriptor("dashql", "public", &[("foo", &["v", "w"])]),
        )
        .unwrap();

    let mut script = Script::new(&catalog, 1);
    script.replace_text("select f. from foo f");
    script.analyze(&mut catalog, true).unwrap();
    script.move_cursor(9).unwrap();
    let completion = script.complete_at_cursor(&catalog, 10, None).unwrap();
    assert!(!completion.candidates.is_empty());

    let selected = script
        .select_completion_candidate_at_cursor(&completion, 0)
        .unwrap();
    assert_eq!(selected.candidates.len(), 1);
    assert_eq!(
        selected.candidates[0].completion_text,
        completion.candidates[0].completion_text
    );

    assert_eq!(
        script
            .select_completion_candidate_at_cursor(&completion, 99)
            .unwrap_err(),
        StatusCode::CompletionCandidateInvalid
    );

    let scoped = script
        .select_completion_catalog_object_at_cursor(&completion, 0, 0)
        .unwrap();
    assert_eq!(scoped.candidates[0].catalog_objects.len(), 1);
    assert_eq!(
        script
            .select_completion_catalog_object_at_cursor(&completion, 0, 42)
            .unwrap_err(),
        StatusCode::CompletionCatalogObjectInvalid
    );
}

#[test]
fn test_registry_lazy_cleanup() {
    let mut catalog = Catalog::new();
    catalog.add_descriptor_pool(100, 0).unwrap();
    catalog
        .add_schema_descriptor(
            100,
            descriptor("dashql", "public", &[("foo", &["v"])]),
        )
        .unwrap();

    let mut registry = ScriptRegistry::new();
    let mut script = Script::new(&catalog, 1);
    script.replace_text("select * from foo where v = 1");
    script.analyze(&mut catalog, true).unwrap();
    registry.load_script(&script).unwrap();

    let analyzed = script.analyzed_script().unwrap();
    assert_eq!(analyzed.column_restrictions.len(), 1);
    let usage = analyzed.column_restrictions[0];
    let groups =
        registry.collect_column_restrictions(usage.catalog_table_id, usage.table_column_id, None);
    assert_eq!(groups.len(), 1);

    // Re-analyzing without the restriction leaves a stale row behind;
    // the next lookup prunes it.
    script.replace_text("select * from foo");
    script.analyze(&mut catalog, true).unwrap();
    registry.load_script(&script).unwrap();
    let groups =
        registry.collect_column_restrictions(usage.catalog_table_id, usage.table_column_id, None);
    assert!(groups.is_empty());

    // Dropped scripts are pruned the same way.
    registry.drop_script(&script);
    let groups =
        registry.collect_column_restrictions(usage.catalog_table_id, usage.table_column_id, None);
    assert!(groups.is_empty());
}

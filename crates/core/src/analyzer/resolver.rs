use ahash::AHashSet;
use smol_str::SmolStr;

use crate::analyzer::{
    AnalyzedScript, ExpressionInner, NameScope, ResolvedColumnRef, ResolvedRelation,
    ResolvedTableEntry, TableReferenceInner,
};
use crate::catalog::{Catalog, CatalogEntryData, ContextObjectId, TableDeclaration, resolve_table_in};

/// How many candidate tables a single reference may collect.
const RESOLUTION_LIMIT: usize = 32;

/// Resolve all table references against the own entry and the catalog.
///
/// The own entry is probed first since it may not have been loaded into the
/// catalog yet; catalog hits follow in rank order. The first hit is
/// selected, the rest become alternatives.
pub(crate) fn resolve_table_refs(analyzed: &mut AnalyzedScript, catalog: &Catalog) {
    let catalog_version = catalog.version();
    let AnalyzedScript {
        entry,
        table_references,
        name_scopes,
        ..
    } = analyzed;
    let entry: &CatalogEntryData = entry;
    let own_id = entry.catalog_entry_id;

    for table_ref in table_references.iter_mut() {
        let TableReferenceInner::Unresolved(unresolved) = &table_ref.inner else {
            continue;
        };
        let name = unresolved.table_name.clone();
        let name_ast_node = unresolved.table_name_ast_node_id;

        let mut hits: Vec<&TableDeclaration> = Vec::new();
        if let Some(decl) = entry.resolve_table_by_qualified_name(&name.key()) {
            hits.push(decl);
        }
        if hits.is_empty() && name.database_name.is_empty() {
            if !name.schema_name.is_empty() {
                entry.resolve_table_in_schema(
                    &name.schema_name,
                    &name.table_name,
                    &mut hits,
                    RESOLUTION_LIMIT,
                );
            } else {
                entry.resolve_table_everywhere(&name.table_name, &mut hits, RESOLUTION_LIMIT);
            }
        }
        catalog.resolve_table_by_name(
            &name.database_name,
            &name.schema_name,
            &name.table_name,
            Some(own_id),
            &mut hits,
            RESOLUTION_LIMIT,
        );
        if hits.is_empty() {
            continue;
        }

        let mut entries = hits.into_iter().map(|decl| ResolvedTableEntry {
            table_name: decl.table_name.clone(),
            catalog_database_id: decl.catalog_database_id,
            catalog_schema_id: decl.catalog_schema_id,
            catalog_table_id: decl.catalog_table_id,
            referenced_catalog_version: catalog_version,
        });
        let selected = entries.next().expect("hits are non-empty");
        let alternatives = entries.collect();
        table_ref.inner = TableReferenceInner::Resolved(ResolvedRelation {
            table_name_ast_node_id: name_ast_node,
            selected,
            alternatives,
        });
    }

    // Populate the named tables per scope from the resolved refs.
    for scope in name_scopes.iter_mut() {
        for &ref_id in &scope.table_references {
            let table_ref = &table_references[ref_id as usize];
            let TableReferenceInner::Resolved(resolved) = &table_ref.inner else {
                continue;
            };
            let key = table_ref
                .alias_name
                .clone()
                .unwrap_or_else(|| resolved.selected.table_name.table_name.clone());
            scope
                .referenced_tables_by_name
                .entry(key)
                .or_insert(resolved.selected.catalog_table_id);
        }
    }
}

fn lookup_table_in_scope_chain(
    name_scopes: &[NameScope],
    scope_idx: usize,
    key: &str,
) -> Option<ContextObjectId> {
    let mut iter = Some(scope_idx);
    while let Some(idx) = iter {
        let scope = &name_scopes[idx];
        if let Some(&table) = scope.referenced_tables_by_name.get(key) {
            return Some(table);
        }
        iter = scope.parent_scope.map(|p| p as usize);
    }
    None
}

/// Resolve the column references per scope, innermost outward.
///
/// Qualified references look up their alias in the scope chain; unqualified
/// references resolve if exactly one in-scope table declares the column.
pub(crate) fn resolve_column_refs(analyzed: &mut AnalyzedScript, catalog: &Catalog) {
    let catalog_version = catalog.version();
    let AnalyzedScript {
        entry,
        expressions,
        name_scopes,
        ..
    } = analyzed;
    let entry: &CatalogEntryData = entry;

    for scope_idx in 0..name_scopes.len() {
        for expr_pos in 0..name_scopes[scope_idx].expressions.len() {
            let expression_id = name_scopes[scope_idx].expressions[expr_pos] as usize;
            let ExpressionInner::UnresolvedColumnRef(unresolved) =
                &expressions[expression_id].inner
            else {
                continue;
            };

            let resolved = if let Some(alias) = &unresolved.table_alias {
                lookup_table_in_scope_chain(name_scopes, scope_idx, alias)
                    .and_then(|table_id| resolve_table_in(entry, catalog, table_id))
                    .and_then(|decl| {
                        decl.column_by_name(&unresolved.column_name)
                            .map(|column| (decl, column.column_index))
                    })
            } else if !unresolved.column_name.is_empty() {
                // Probe every in-scope table; resolve only unambiguously.
                let mut seen_keys: AHashSet<&SmolStr> = AHashSet::new();
                let mut matches = Vec::new();
                let mut iter = Some(scope_idx);
                while let Some(idx) = iter {
                    let scope = &name_scopes[idx];
                    for (key, &table_id) in &scope.referenced_tables_by_name {
                        if !seen_keys.insert(key) {
                            continue;
                        }
                        if let Some(decl) = resolve_table_in(entry, catalog, table_id) {
                            if let Some(column) = decl.column_by_name(&unresolved.column_name) {
                                matches.push((decl, column.column_index));
                            }
                        }
                    }
                    iter = scope.parent_scope.map(|p| p as usize);
                }
                if matches.len() == 1 {
                    matches.pop()
                } else {
                    None
                }
            } else {
                None
            };

            if let Some((decl, column_index)) = resolved {
                let unresolved = unresolved.clone();
                expressions[expression_id].inner =
                    ExpressionInner::ResolvedColumnRef(ResolvedColumnRef {
                        column_name_ast_node_id: unresolved.column_name_ast_node_id,
                        table_alias: unresolved.table_alias,
                        column_name: unresolved.column_name,
                        ast_scope_root: unresolved.ast_scope_root,
                        catalog_database_id: decl.catalog_database_id,
                        catalog_schema_id: decl.catalog_schema_id,
                        catalog_table_id: decl.catalog_table_id,
                        table_column_id: column_index,
                        referenced_catalog_version: catalog_version,
                    });
            }
        }
    }
}

/// Index the restrictions and transforms that target resolved columns.
pub(crate) fn collect_column_uses(analyzed: &mut AnalyzedScript) {
    let AnalyzedScript {
        expressions,
        column_restrictions,
        column_transforms,
        ..
    } = analyzed;

    for (idx, expression) in expressions.iter().enumerate() {
        let (target, out) = match &expression.inner {
            ExpressionInner::Comparison(comparison) if expression.is_restriction => {
                let target = if comparison.restriction_target_left {
                    comparison.left_expression_id
                } else {
                    comparison.right_expression_id
                };
                (target, &mut *column_restrictions)
            }
            ExpressionInner::BinaryExpression(binary) if expression.is_projection => {
                let target = if binary.projection_target_left {
                    binary.left_expression_id
                } else {
                    binary.right_expression_id
                };
                (target, &mut *column_transforms)
            }
            _ => continue,
        };
        let Some(target) = target else { continue };
        if let ExpressionInner::ResolvedColumnRef(column_ref) =
            &expressions[target as usize].inner
        {
            out.push(crate::analyzer::ColumnUse {
                catalog_table_id: column_ref.catalog_table_id,
                table_column_id: column_ref.table_column_id,
                expression_id: idx as u32,
                root_ast_node_id: expression.ast_node_id,
            });
        }
    }
}

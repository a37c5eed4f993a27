use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use ahash::AHashMap;

use crate::analyzer::{AnalyzedScript, ColumnUse};
use crate::catalog::{CatalogEntryId, CatalogVersion, ContextObjectId};
use crate::script::Script;
use crate::snippet::{ScriptSnippet, SnippetGroup};
use crate::status::StatusCode;

/// A secondary index from (table, column) to the scripts containing
/// restrictions and transforms referring to it.
///
/// Writes are cheap: entries are not erased when a script is edited or
/// dropped. Lookups validate every row against the latest loaded analysis
/// and lazily remove the stale ones. The registry tolerates bounded growth
/// from edits to rarely-queried columns.
#[derive(Default)]
pub struct ScriptRegistry {
    script_entries: AHashMap<CatalogEntryId, RegistryEntry>,
    column_restrictions: RefCell<BTreeSet<(ContextObjectId, u32, CatalogEntryId)>>,
    column_transforms: RefCell<BTreeSet<(ContextObjectId, u32, CatalogEntryId)>>,
}

struct RegistryEntry {
    analyzed: Rc<AnalyzedScript>,
}

#[derive(Clone, Copy)]
enum ColumnUseKind {
    Restriction,
    Transform,
}

/// The restriction and transform templates found for one column.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ColumnInfo {
    pub restriction_templates: Vec<SnippetGroup>,
    pub transform_templates: Vec<SnippetGroup>,
}

impl ScriptRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.script_entries.clear();
        self.column_restrictions.get_mut().clear();
        self.column_transforms.get_mut().clear();
    }

    pub fn contains_script(&self, catalog_entry_id: CatalogEntryId) -> bool {
        self.script_entries.contains_key(&catalog_entry_id)
    }

    pub(crate) fn entries(
        &self,
    ) -> impl Iterator<Item = (CatalogEntryId, &Rc<AnalyzedScript>)> {
        self.script_entries.iter().map(|(&id, e)| (id, &e.analyzed))
    }

    /// Create or update a script entry.
    /// Rows of an older analysis stay behind and are cleaned up lazily.
    pub fn load_script(&mut self, script: &Script) -> Result<(), StatusCode> {
        let Some(analyzed) = script.analyzed_script() else {
            return Err(StatusCode::ScriptNotAnalyzed);
        };
        let entry_id = script.catalog_entry_id();
        let restrictions = self.column_restrictions.get_mut();
        for usage in &analyzed.column_restrictions {
            restrictions.insert((usage.catalog_table_id, usage.table_column_id, entry_id));
        }
        let transforms = self.column_transforms.get_mut();
        for usage in &analyzed.column_transforms {
            transforms.insert((usage.catalog_table_id, usage.table_column_id, entry_id));
        }
        self.script_entries.insert(
            entry_id,
            RegistryEntry {
                analyzed: analyzed.clone(),
            },
        );
        Ok(())
    }

    pub fn drop_script(&mut self, script: &Script) {
        self.script_entries.remove(&script.catalog_entry_id());
    }

    /// Collect restriction snippets for a column, grouped by template
    /// signature. Stale rows are removed on the way.
    pub fn collect_column_restrictions(
        &self,
        table: ContextObjectId,
        column_id: u32,
        target_catalog_version: Option<CatalogVersion>,
    ) -> Vec<SnippetGroup> {
        self.collect_column_uses(ColumnUseKind::Restriction, table, column_id, target_catalog_version)
    }

    /// Collect transform snippets for a column, grouped by template
    /// signature.
    pub fn collect_column_computations(
        &self,
        table: ContextObjectId,
        column_id: u32,
        target_catalog_version: Option<CatalogVersion>,
    ) -> Vec<SnippetGroup> {
        self.collect_column_uses(ColumnUseKind::Transform, table, column_id, target_catalog_version)
    }

    /// Answer "which restriction/transform templates exist for this column".
    pub fn find_column(
        &self,
        table: ContextObjectId,
        column_id: u32,
        target_catalog_version: Option<CatalogVersion>,
    ) -> ColumnInfo {
        ColumnInfo {
            restriction_templates: self.collect_column_restrictions(
                table,
                column_id,
                target_catalog_version,
            ),
            transform_templates: self.collect_column_computations(
                table,
                column_id,
                target_catalog_version,
            ),
        }
    }

    fn collect_column_uses(
        &self,
        kind: ColumnUseKind,
        table: ContextObjectId,
        column_id: u32,
        target_catalog_version: Option<CatalogVersion>,
    ) -> Vec<SnippetGroup> {
        let index = match kind {
            ColumnUseKind::Restriction => &self.column_restrictions,
            ColumnUseKind::Transform => &self.column_transforms,
        };
        let mut groups: BTreeMap<u64, Vec<ScriptSnippet>> = BTreeMap::new();
        let mut stale: Vec<(ContextObjectId, u32, CatalogEntryId)> = Vec::new();

        {
            let rows = index.borrow();
            for &(row_table, row_column, entry_id) in
                rows.range((table, column_id, CatalogEntryId::MIN)..)
            {
                if row_table != table || row_column != column_id {
                    break;
                }
                // The referenced script may have been dropped, or its latest
                // analysis may no longer carry this column use.
                let Some(entry) = self.script_entries.get(&entry_id) else {
                    stale.push((row_table, row_column, entry_id));
                    continue;
                };
                let analyzed = &entry.analyzed;
                if let Some(version) = target_catalog_version {
                    if analyzed.catalog_version < version {
                        continue;
                    }
                }
                let all_uses = match kind {
                    ColumnUseKind::Restriction => &analyzed.column_restrictions,
                    ColumnUseKind::Transform => &analyzed.column_transforms,
                };
                let uses: Vec<&ColumnUse> = all_uses
                    .iter()
                    .filter(|u| u.catalog_table_id == table && u.table_column_id == column_id)
                    .collect();
                if uses.is_empty() {
                    stale.push((row_table, row_column, entry_id));
                    continue;
                }
                let scanned = &analyzed.parsed_script.scanned_script;
                let names = scanned.name_registry.borrow();
                for usage in uses {
                    let snippet = ScriptSnippet::extract(
                        scanned.text(),
                        &analyzed.parsed_script.nodes,
                        &analyzed.node_markers,
                        usage.root_ast_node_id as usize,
                        &names,
                    );
                    groups
                        .entry(snippet.template_signature())
                        .or_default()
                        .push(snippet);
                }
            }
        }
        if !stale.is_empty() {
            let mut rows = index.borrow_mut();
            for row in stale {
                rows.remove(&row);
            }
        }

        groups
            .into_iter()
            .map(|(template_signature, snippets)| SnippetGroup {
                template_signature,
                snippets,
            })
            .collect()
    }
}

use std::cell::{Ref, RefCell};
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use ahash::AHashMap;
use dashql_helpers::IndexSet;
use smol_str::SmolStr;

use crate::analyzer::AnalyzedScript;
use crate::script::Script;
use crate::status::StatusCode;
use crate::text::names::{
    NameRegistry, NameSearchIndex, NameTags, index_name_suffixes,
};
use crate::parser::ast::NodeId;

pub type CatalogEntryId = u32;
pub type CatalogDatabaseId = u32;
pub type CatalogSchemaId = u32;
pub type CatalogVersion = u64;
pub type Rank = u32;

pub const INITIAL_DATABASE_ID: CatalogDatabaseId = 1 << 8;
pub const INITIAL_SCHEMA_ID: CatalogSchemaId = 1 << 16;

pub const DEFAULT_DATABASE_NAME: &str = "dashql";
pub const DEFAULT_SCHEMA_NAME: &str = "public";

/// An id of an object that lives inside one catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ContextObjectId {
    origin: CatalogEntryId,
    object: u32,
}

impl ContextObjectId {
    pub fn new(origin: CatalogEntryId, object: u32) -> Self {
        Self { origin, object }
    }

    pub fn origin(&self) -> CatalogEntryId {
        self.origin
    }

    pub fn object(&self) -> u32 {
        self.object
    }

    pub fn pack(&self) -> u64 {
        ((self.origin as u64) << 32) | self.object as u64
    }

    pub fn unpack(packed: u64) -> Self {
        Self {
            origin: (packed >> 32) as u32,
            object: packed as u32,
        }
    }
}

/// A tagged id over everything the catalog can resolve a name to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum QualifiedCatalogObjectId {
    Deferred,
    Database(CatalogDatabaseId),
    Schema(CatalogDatabaseId, CatalogSchemaId),
    Table(ContextObjectId),
    TableColumn(ContextObjectId, u32),
}

/// A database referenced by a catalog entry.
#[derive(Debug, Clone)]
pub struct DatabaseReference {
    pub catalog_database_id: CatalogDatabaseId,
    pub database_name: SmolStr,
    pub database_alias: SmolStr,
}

/// A schema referenced by a catalog entry.
#[derive(Debug, Clone)]
pub struct SchemaReference {
    pub catalog_database_id: CatalogDatabaseId,
    pub catalog_schema_id: CatalogSchemaId,
    pub database_name: SmolStr,
    pub schema_name: SmolStr,
}

/// A fully qualified table name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualifiedTableName {
    pub database_name: SmolStr,
    pub schema_name: SmolStr,
    pub table_name: SmolStr,
}

impl QualifiedTableName {
    pub fn key(&self) -> (SmolStr, SmolStr, SmolStr) {
        (
            self.database_name.clone(),
            self.schema_name.clone(),
            self.table_name.clone(),
        )
    }
}

/// A column of a declared table.
#[derive(Debug, Clone)]
pub struct TableColumn {
    pub column_index: u32,
    pub ast_node_id: Option<NodeId>,
    pub column_name: SmolStr,
}

/// A table declared by a catalog entry.
#[derive(Debug, Clone)]
pub struct TableDeclaration {
    pub catalog_database_id: CatalogDatabaseId,
    pub catalog_schema_id: CatalogSchemaId,
    pub catalog_table_id: ContextObjectId,
    pub ast_node_id: Option<NodeId>,
    pub ast_statement_id: Option<u32>,
    pub ast_scope_root: Option<NodeId>,
    pub table_name: QualifiedTableName,
    pub table_columns: Vec<TableColumn>,
    /// Case-preserving map from column name to column index.
    pub table_columns_by_name: AHashMap<SmolStr, u32>,
}

impl TableDeclaration {
    pub fn column_by_name(&self, name: &str) -> Option<&TableColumn> {
        self.table_columns_by_name
            .get(name)
            .map(|&idx| &self.table_columns[idx as usize])
    }
}

/// The catalog-facing content of one entry: the referenced databases and
/// schemas, the declared tables, and the name indexes over them.
#[derive(Debug)]
pub struct CatalogEntryData {
    pub catalog_entry_id: CatalogEntryId,
    pub database_references: Vec<DatabaseReference>,
    pub schema_references: Vec<SchemaReference>,
    pub table_declarations: Vec<TableDeclaration>,
    pub databases_by_name: AHashMap<SmolStr, usize>,
    pub schemas_by_qualified_name: BTreeMap<(SmolStr, SmolStr), usize>,
    pub tables_by_qualified_name: BTreeMap<(SmolStr, SmolStr, SmolStr), usize>,
    /// Multimap (table name, table index).
    pub tables_by_unqualified_name: BTreeSet<(SmolStr, usize)>,
    /// Multimap (schema name, database name, table index).
    pub tables_by_unqualified_schema: BTreeSet<(SmolStr, SmolStr, usize)>,
    /// Multimap (column name, table index, column index).
    pub table_columns_by_name: BTreeSet<(SmolStr, usize, u32)>,
}

impl CatalogEntryData {
    pub fn new(catalog_entry_id: CatalogEntryId) -> Self {
        Self {
            catalog_entry_id,
            database_references: Vec::new(),
            schema_references: Vec::new(),
            table_declarations: Vec::new(),
            databases_by_name: AHashMap::new(),
            schemas_by_qualified_name: BTreeMap::new(),
            tables_by_qualified_name: BTreeMap::new(),
            tables_by_unqualified_name: BTreeSet::new(),
            tables_by_unqualified_schema: BTreeSet::new(),
            table_columns_by_name: BTreeSet::new(),
        }
    }

    pub fn add_database_reference(&mut self, reference: DatabaseReference) -> usize {
        if let Some(&idx) = self.databases_by_name.get(&reference.database_name) {
            return idx;
        }
        let idx = self.database_references.len();
        self.databases_by_name
            .insert(reference.database_name.clone(), idx);
        self.database_references.push(reference);
        idx
    }

    pub fn add_schema_reference(&mut self, reference: SchemaReference) -> usize {
        let key = (
            reference.database_name.clone(),
            reference.schema_name.clone(),
        );
        if let Some(&idx) = self.schemas_by_qualified_name.get(&key) {
            return idx;
        }
        let idx = self.schema_references.len();
        self.schemas_by_qualified_name.insert(key, idx);
        self.schema_references.push(reference);
        idx
    }

    /// Declare a table and index it.
    /// The caller guarantees that the qualified name is not taken.
    pub fn declare_table(&mut self, declaration: TableDeclaration) -> usize {
        let idx = self.table_declarations.len();
        debug_assert_eq!(declaration.catalog_table_id.object() as usize, idx);
        let name = &declaration.table_name;
        self.tables_by_qualified_name.insert(name.key(), idx);
        self.tables_by_unqualified_name
            .insert((name.table_name.clone(), idx));
        self.tables_by_unqualified_schema.insert((
            name.schema_name.clone(),
            name.database_name.clone(),
            idx,
        ));
        for column in &declaration.table_columns {
            self.table_columns_by_name
                .insert((column.column_name.clone(), idx, column.column_index));
        }
        self.table_declarations.push(declaration);
        idx
    }

    pub fn resolve_table_by_id(&self, table_id: ContextObjectId) -> Option<&TableDeclaration> {
        if table_id.origin() != self.catalog_entry_id {
            return None;
        }
        self.table_declarations.get(table_id.object() as usize)
    }

    pub fn resolve_table_by_qualified_name(
        &self,
        key: &(SmolStr, SmolStr, SmolStr),
    ) -> Option<&TableDeclaration> {
        self.tables_by_qualified_name
            .get(key)
            .map(|&idx| &self.table_declarations[idx])
    }

    pub fn resolve_tables_in_schema<'a>(
        &'a self,
        schema_name: &str,
        database_name: Option<&str>,
        out: &mut Vec<&'a TableDeclaration>,
        limit: usize,
    ) {
        for (schema, database, idx) in self
            .tables_by_unqualified_schema
            .range((SmolStr::new(schema_name), SmolStr::default(), 0)..)
        {
            if schema != schema_name {
                break;
            }
            if let Some(database_name) = database_name {
                if database != database_name {
                    continue;
                }
            }
            out.push(&self.table_declarations[*idx]);
            if out.len() >= limit {
                return;
            }
        }
    }

    /// Find a table by name within a schema, across all databases.
    pub fn resolve_table_in_schema<'a>(
        &'a self,
        schema_name: &str,
        table_name: &str,
        out: &mut Vec<&'a TableDeclaration>,
        limit: usize,
    ) {
        for (schema, _, idx) in self
            .tables_by_unqualified_schema
            .range((SmolStr::new(schema_name), SmolStr::default(), 0)..)
        {
            if schema != schema_name {
                break;
            }
            let declaration = &self.table_declarations[*idx];
            if declaration.table_name.table_name == table_name {
                out.push(declaration);
                if out.len() >= limit {
                    return;
                }
            }
        }
    }

    pub fn resolve_table_everywhere<'a>(
        &'a self,
        table_name: &str,
        out: &mut Vec<&'a TableDeclaration>,
        limit: usize,
    ) {
        for (name, idx) in self
            .tables_by_unqualified_name
            .range((SmolStr::new(table_name), 0)..)
        {
            if name != table_name {
                break;
            }
            out.push(&self.table_declarations[*idx]);
            if out.len() >= limit {
                return;
            }
        }
    }

    /// Find all (table, column) pairs declared under a column name.
    pub fn resolve_table_columns<'a>(
        &'a self,
        column_name: &str,
        out: &mut Vec<(&'a TableDeclaration, u32)>,
    ) {
        for (name, table_idx, column_idx) in self
            .table_columns_by_name
            .range((SmolStr::new(column_name), 0, 0)..)
        {
            if name != column_name {
                break;
            }
            out.push((&self.table_declarations[*table_idx], *column_idx));
        }
    }

    pub fn byte_size(&self) -> usize {
        self.database_references.len() * std::mem::size_of::<DatabaseReference>()
            + self.schema_references.len() * std::mem::size_of::<SchemaReference>()
            + self.table_declarations.len() * std::mem::size_of::<TableDeclaration>()
            + self
                .table_declarations
                .iter()
                .map(|t| t.table_columns.len() * std::mem::size_of::<TableColumn>())
                .sum::<usize>()
    }
}

/// One source of catalog content: an analyzed script or a descriptor pool.
pub trait CatalogEntry {
    fn entry_data(&self) -> &CatalogEntryData;
    fn names(&self) -> Ref<'_, NameRegistry>;
    fn name_search_index(&self) -> &NameSearchIndex;

    fn catalog_entry_id(&self) -> CatalogEntryId {
        self.entry_data().catalog_entry_id
    }
}

/// An externally supplied schema descriptor.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct SchemaDescriptor {
    pub database_name: Option<String>,
    pub schema_name: Option<String>,
    pub tables: Option<Vec<SchemaTableDescriptor>>,
}

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct SchemaTableDescriptor {
    pub table_name: String,
    pub columns: Vec<SchemaColumnDescriptor>,
}

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct SchemaColumnDescriptor {
    pub column_name: String,
    pub ordinal_position: Option<u32>,
}

/// A catalog entry populated from schema descriptors, used when no SQL
/// source is available.
#[derive(Debug)]
pub struct DescriptorPool {
    entry: CatalogEntryData,
    rank: Rank,
    descriptors: Vec<SchemaDescriptor>,
    name_registry: RefCell<NameRegistry>,
    name_search_index: NameSearchIndex,
}

impl DescriptorPool {
    fn new(catalog_entry_id: CatalogEntryId, rank: Rank) -> Self {
        Self {
            entry: CatalogEntryData::new(catalog_entry_id),
            rank,
            descriptors: Vec::new(),
            name_registry: RefCell::new(NameRegistry::new()),
            name_search_index: NameSearchIndex::new(),
        }
    }

    pub fn rank(&self) -> Rank {
        self.rank
    }

    pub fn descriptors(&self) -> &[SchemaDescriptor] {
        &self.descriptors
    }

    fn register_name(&mut self, text: &str, tags: NameTags) -> u32 {
        let mut names = self.name_registry.borrow_mut();
        let id = names.register(text, Default::default(), tags);
        index_name_suffixes(&mut self.name_search_index, names.get(id));
        id
    }
}

impl CatalogEntry for DescriptorPool {
    fn entry_data(&self) -> &CatalogEntryData {
        &self.entry
    }

    fn names(&self) -> Ref<'_, NameRegistry> {
        self.name_registry.borrow()
    }

    fn name_search_index(&self) -> &NameSearchIndex {
        &self.name_search_index
    }
}

/// A database declared in the catalog. Owns its name.
#[derive(Debug, Clone)]
pub struct DatabaseDeclaration {
    pub catalog_database_id: CatalogDatabaseId,
    pub database_name: SmolStr,
    pub database_alias: SmolStr,
}

/// A schema declared in the catalog. Owns its names.
#[derive(Debug, Clone)]
pub struct SchemaDeclaration {
    pub catalog_database_id: CatalogDatabaseId,
    pub catalog_schema_id: CatalogSchemaId,
    pub database_name: SmolStr,
    pub schema_name: SmolStr,
}

#[derive(Debug, Clone, Copy)]
struct CatalogSchemaEntryInfo {
    catalog_entry_id: CatalogEntryId,
    catalog_database_id: CatalogDatabaseId,
    catalog_schema_id: CatalogSchemaId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CatalogEntryKind {
    Script,
    DescriptorPool,
}

struct ScriptEntry {
    analyzed: Rc<AnalyzedScript>,
    rank: Rank,
}

/// The type of a described catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum CatalogEntryType {
    Script,
    DescriptorPool,
}

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct CatalogSchemaSummary {
    pub database_name: SmolStr,
    pub schema_name: SmolStr,
    pub table_count: usize,
}

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct CatalogEntryDescriptor {
    pub catalog_entry_id: CatalogEntryId,
    pub entry_type: CatalogEntryType,
    pub rank: Rank,
    pub schemas: Vec<CatalogSchemaSummary>,
}

/// One row of the flattened catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct FlatCatalogEntry {
    pub flat_entry_idx: u32,
    pub flat_parent_idx: u32,
    pub catalog_object_id: u64,
    pub name_id: u32,
    pub child_begin: u32,
    pub child_count: u32,
}

/// The flattened catalog: four parallel arrays ordered by name, plus
/// sorted-by-id index arrays and a shared name dictionary.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct FlatCatalog {
    pub catalog_version: CatalogVersion,
    pub name_dictionary: Vec<SmolStr>,
    pub databases: Vec<FlatCatalogEntry>,
    pub schemas: Vec<FlatCatalogEntry>,
    pub tables: Vec<FlatCatalogEntry>,
    pub columns: Vec<FlatCatalogEntry>,
    pub databases_by_id: Vec<(CatalogDatabaseId, u32)>,
    pub schemas_by_id: Vec<(CatalogSchemaId, u32)>,
    pub tables_by_id: Vec<(u64, u32)>,
}

#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct CatalogStatistics {
    pub version: CatalogVersion,
    pub entry_count: usize,
    pub database_count: usize,
    pub schema_count: usize,
    pub table_count: usize,
    pub column_count: usize,
}

static NEXT_CATALOG_INSTANCE: AtomicU64 = AtomicU64::new(1);

/// The cross-script registry of databases, schemas, tables and columns.
///
/// Entries overlay each other by rank; a lower rank wins resolution ties.
/// Every mutation bumps the version counter which consumers record.
pub struct Catalog {
    instance_id: u64,
    version: CatalogVersion,
    default_database_name: SmolStr,
    default_schema_name: SmolStr,
    entries: AHashMap<CatalogEntryId, CatalogEntryKind>,
    script_entries: AHashMap<CatalogEntryId, ScriptEntry>,
    descriptor_pool_entries: AHashMap<CatalogEntryId, DescriptorPool>,
    entries_ranked: BTreeSet<(Rank, CatalogEntryId)>,
    entries_by_schema: BTreeMap<(SmolStr, Rank, CatalogEntryId), CatalogSchemaEntryInfo>,
    entries_by_qualified_schema:
        BTreeMap<(SmolStr, SmolStr, Rank, CatalogEntryId), CatalogSchemaEntryInfo>,
    next_database_id: CatalogDatabaseId,
    next_schema_id: CatalogSchemaId,
    databases: BTreeMap<SmolStr, DatabaseDeclaration>,
    schemas: BTreeMap<(SmolStr, SmolStr), SchemaDeclaration>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}

impl Catalog {
    pub fn new() -> Self {
        Self::with_default_names(DEFAULT_DATABASE_NAME, DEFAULT_SCHEMA_NAME)
    }

    pub fn with_default_names(default_database_name: &str, default_schema_name: &str) -> Self {
        Self {
            instance_id: NEXT_CATALOG_INSTANCE.fetch_add(1, Ordering::Relaxed),
            version: 1,
            default_database_name: SmolStr::new(default_database_name),
            default_schema_name: SmolStr::new(default_schema_name),
            entries: AHashMap::new(),
            script_entries: AHashMap::new(),
            descriptor_pool_entries: AHashMap::new(),
            entries_ranked: BTreeSet::new(),
            entries_by_schema: BTreeMap::new(),
            entries_by_qualified_schema: BTreeMap::new(),
            next_database_id: INITIAL_DATABASE_ID,
            next_schema_id: INITIAL_SCHEMA_ID,
            databases: BTreeMap::new(),
            schemas: BTreeMap::new(),
        }
    }

    pub(crate) fn instance_id(&self) -> u64 {
        self.instance_id
    }

    pub fn version(&self) -> CatalogVersion {
        self.version
    }

    pub fn default_database_name(&self) -> &SmolStr {
        &self.default_database_name
    }

    pub fn default_schema_name(&self) -> &SmolStr {
        &self.default_schema_name
    }

    pub fn contains_entry(&self, catalog_entry_id: CatalogEntryId) -> bool {
        self.entries.contains_key(&catalog_entry_id)
    }

    pub fn databases(&self) -> &BTreeMap<SmolStr, DatabaseDeclaration> {
        &self.databases
    }

    pub fn schemas(&self) -> &BTreeMap<(SmolStr, SmolStr), SchemaDeclaration> {
        &self.schemas
    }

    pub fn entry(&self, catalog_entry_id: CatalogEntryId) -> Option<&dyn CatalogEntry> {
        match self.entries.get(&catalog_entry_id)? {
            CatalogEntryKind::Script => self
                .script_entries
                .get(&catalog_entry_id)
                .map(|e| &*e.analyzed as &dyn CatalogEntry),
            CatalogEntryKind::DescriptorPool => self
                .descriptor_pool_entries
                .get(&catalog_entry_id)
                .map(|p| p as &dyn CatalogEntry),
        }
    }

    /// Iterate entries ordered by (rank, entry id).
    pub fn iterate_ranked(
        &self,
    ) -> impl Iterator<Item = (CatalogEntryId, &dyn CatalogEntry, Rank)> {
        self.entries_ranked.iter().filter_map(move |&(rank, id)| {
            self.entry(id).map(|entry| (id, entry, rank))
        })
    }

    /// Look up or allocate a database id. Allocation does not create a
    /// declaration; that happens on load.
    pub fn allocate_database_id(&mut self, database_name: &str) -> CatalogDatabaseId {
        if let Some(db) = self.databases.get(database_name) {
            return db.catalog_database_id;
        }
        let id = self.next_database_id;
        self.next_database_id += 1;
        id
    }

    /// Look up or allocate a schema id.
    pub fn allocate_schema_id(
        &mut self,
        database_name: &str,
        schema_name: &str,
    ) -> CatalogSchemaId {
        if let Some(schema) = self
            .schemas
            .get(&(SmolStr::new(database_name), SmolStr::new(schema_name)))
        {
            return schema.catalog_schema_id;
        }
        let id = self.next_schema_id;
        self.next_schema_id += 1;
        id
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.script_entries.clear();
        self.descriptor_pool_entries.clear();
        self.entries_ranked.clear();
        self.entries_by_schema.clear();
        self.entries_by_qualified_schema.clear();
        self.databases.clear();
        self.schemas.clear();
        self.version += 1;
    }

    // ---- scripts -------------------------------------------------------

    /// Load an analyzed script into the catalog.
    pub fn load_script(&mut self, script: &Script, rank: Rank) -> Result<(), StatusCode> {
        let Some(analyzed) = script.analyzed_script() else {
            return Err(StatusCode::CatalogScriptNotAnalyzed);
        };
        if script.catalog_instance_id() != self.instance_id {
            return Err(StatusCode::CatalogMismatch);
        }
        let entry_id = script.catalog_entry_id();
        if self.script_entries.contains_key(&entry_id) {
            return self.update_script(entry_id, analyzed.clone());
        }
        if self.entries.contains_key(&entry_id) {
            return Err(StatusCode::ExternalIdCollision);
        }

        // Check that every database and schema the script refers to has
        // either no catalog declaration or one with the same ids.
        // The script may have allocated preliminary ids at analysis time
        // that another entry overtook since.
        let entry = &analyzed.entry;
        for reference in &entry.database_references {
            if let Some(declared) = self.databases.get(&reference.database_name) {
                if declared.catalog_database_id != reference.catalog_database_id {
                    return Err(StatusCode::CatalogIdOutOfSync);
                }
            }
        }
        for reference in &entry.schema_references {
            let key = (
                reference.database_name.clone(),
                reference.schema_name.clone(),
            );
            if let Some(declared) = self.schemas.get(&key) {
                if declared.catalog_database_id != reference.catalog_database_id
                    || declared.catalog_schema_id != reference.catalog_schema_id
                {
                    return Err(StatusCode::CatalogIdOutOfSync);
                }
            }
        }

        // All checks passed; declare what is missing.
        for reference in &entry.database_references {
            self.databases
                .entry(reference.database_name.clone())
                .or_insert_with(|| DatabaseDeclaration {
                    catalog_database_id: reference.catalog_database_id,
                    database_name: reference.database_name.clone(),
                    database_alias: reference.database_alias.clone(),
                });
        }
        for reference in &entry.schema_references {
            self.schemas
                .entry((
                    reference.database_name.clone(),
                    reference.schema_name.clone(),
                ))
                .or_insert_with(|| SchemaDeclaration {
                    catalog_database_id: reference.catalog_database_id,
                    catalog_schema_id: reference.catalog_schema_id,
                    database_name: reference.database_name.clone(),
                    schema_name: reference.schema_name.clone(),
                });
        }
        for ((db_name, schema_name), &idx) in &entry.schemas_by_qualified_name {
            let reference = &entry.schema_references[idx];
            let info = CatalogSchemaEntryInfo {
                catalog_entry_id: entry_id,
                catalog_database_id: reference.catalog_database_id,
                catalog_schema_id: reference.catalog_schema_id,
            };
            self.entries_by_qualified_schema
                .insert((db_name.clone(), schema_name.clone(), rank, entry_id), info);
            self.entries_by_schema
                .insert((schema_name.clone(), rank, entry_id), info);
        }

        self.script_entries.insert(
            entry_id,
            ScriptEntry {
                analyzed: analyzed.clone(),
                rank,
            },
        );
        self.entries.insert(entry_id, CatalogEntryKind::Script);
        self.entries_ranked.insert((rank, entry_id));
        self.version += 1;
        log::debug!("catalog loaded script entry {entry_id} at rank {rank}");
        Ok(())
    }

    /// Rebind a loaded script to its latest analyzed state, diffing the
    /// database and schema reference sets.
    fn update_script(
        &mut self,
        entry_id: CatalogEntryId,
        analyzed: Rc<AnalyzedScript>,
    ) -> Result<(), StatusCode> {
        let previous = self
            .script_entries
            .get(&entry_id)
            .expect("caller checked the entry");
        if Rc::ptr_eq(&previous.analyzed, &analyzed) {
            return Ok(());
        }
        let rank = previous.rank;
        let prev_analyzed = previous.analyzed.clone();

        // Remove schema rows that no longer exist, dropping orphaned schema
        // declarations with them.
        for (key, _) in &prev_analyzed.entry.schemas_by_qualified_name {
            let (db_name, schema_name) = key;
            if analyzed.entry.schemas_by_qualified_name.contains_key(key) {
                continue;
            }
            self.entries_by_qualified_schema.remove(&(
                db_name.clone(),
                schema_name.clone(),
                rank,
                entry_id,
            ));
            self.entries_by_schema
                .remove(&(schema_name.clone(), rank, entry_id));
            let still_referenced = self
                .entries_by_qualified_schema
                .range((db_name.clone(), schema_name.clone(), 0, 0)..)
                .next()
                .is_some_and(|((db, schema, _, _), _)| db == db_name && schema == schema_name);
            if !still_referenced {
                self.schemas.remove(&(db_name.clone(), schema_name.clone()));
            }
        }

        // Insert new schema rows and declarations.
        for ((db_name, schema_name), &idx) in &analyzed.entry.schemas_by_qualified_name {
            let reference = &analyzed.entry.schema_references[idx];
            let info = CatalogSchemaEntryInfo {
                catalog_entry_id: entry_id,
                catalog_database_id: reference.catalog_database_id,
                catalog_schema_id: reference.catalog_schema_id,
            };
            self.entries_by_qualified_schema
                .insert((db_name.clone(), schema_name.clone(), rank, entry_id), info);
            self.entries_by_schema
                .insert((schema_name.clone(), rank, entry_id), info);
            self.schemas
                .entry((db_name.clone(), schema_name.clone()))
                .or_insert_with(|| SchemaDeclaration {
                    catalog_database_id: reference.catalog_database_id,
                    catalog_schema_id: reference.catalog_schema_id,
                    database_name: db_name.clone(),
                    schema_name: schema_name.clone(),
                });
        }
        for reference in &analyzed.entry.database_references {
            self.databases
                .entry(reference.database_name.clone())
                .or_insert_with(|| DatabaseDeclaration {
                    catalog_database_id: reference.catalog_database_id,
                    database_name: reference.database_name.clone(),
                    database_alias: reference.database_alias.clone(),
                });
        }

        // Cleanup dead databases after dead schemas; schema references that
        // are about to be deleted must not keep a database alive.
        for (db_name, _) in &prev_analyzed.entry.databases_by_name {
            if analyzed.entry.databases_by_name.contains_key(db_name) {
                continue;
            }
            let still_referenced = self
                .entries_by_qualified_schema
                .range((db_name.clone(), SmolStr::default(), 0, 0)..)
                .next()
                .is_some_and(|((db, _, _, _), _)| db == db_name);
            if !still_referenced {
                self.databases.remove(db_name);
            }
        }

        self.script_entries
            .insert(entry_id, ScriptEntry { analyzed, rank });
        self.version += 1;
        Ok(())
    }

    /// Remove all traces of a script.
    pub fn drop_script(&mut self, script: &Script) {
        let entry_id = script.catalog_entry_id();
        let Some(entry) = self.script_entries.remove(&entry_id) else {
            return;
        };
        for ((db_name, schema_name), _) in &entry.analyzed.entry.schemas_by_qualified_name {
            self.entries_by_qualified_schema.remove(&(
                db_name.clone(),
                schema_name.clone(),
                entry.rank,
                entry_id,
            ));
            self.entries_by_schema
                .remove(&(schema_name.clone(), entry.rank, entry_id));
        }
        self.entries_ranked.remove(&(entry.rank, entry_id));
        self.entries.remove(&entry_id);
        self.version += 1;
    }

    // ---- descriptor pools ----------------------------------------------

    pub fn add_descriptor_pool(
        &mut self,
        catalog_entry_id: CatalogEntryId,
        rank: Rank,
    ) -> Result<(), StatusCode> {
        if self.entries.contains_key(&catalog_entry_id) {
            return Err(StatusCode::ExternalIdCollision);
        }
        self.descriptor_pool_entries
            .insert(catalog_entry_id, DescriptorPool::new(catalog_entry_id, rank));
        self.entries
            .insert(catalog_entry_id, CatalogEntryKind::DescriptorPool);
        self.entries_ranked.insert((rank, catalog_entry_id));
        self.version += 1;
        Ok(())
    }

    pub fn drop_descriptor_pool(
        &mut self,
        catalog_entry_id: CatalogEntryId,
    ) -> Result<(), StatusCode> {
        let Some(pool) = self.descriptor_pool_entries.remove(&catalog_entry_id) else {
            return Err(StatusCode::CatalogDescriptorPoolUnknown);
        };
        for reference in &pool.entry.schema_references {
            self.entries_by_qualified_schema.remove(&(
                reference.database_name.clone(),
                reference.schema_name.clone(),
                pool.rank,
                catalog_entry_id,
            ));
            self.entries_by_schema.remove(&(
                reference.schema_name.clone(),
                pool.rank,
                catalog_entry_id,
            ));
        }
        self.entries_ranked.remove(&(pool.rank, catalog_entry_id));
        self.entries.remove(&catalog_entry_id);
        self.version += 1;
        Ok(())
    }

    pub fn add_schema_descriptor(
        &mut self,
        catalog_entry_id: CatalogEntryId,
        descriptor: SchemaDescriptor,
    ) -> Result<(), StatusCode> {
        self.add_schema_descriptors(catalog_entry_id, vec![descriptor])
    }

    pub fn add_schema_descriptors(
        &mut self,
        catalog_entry_id: CatalogEntryId,
        descriptors: Vec<SchemaDescriptor>,
    ) -> Result<(), StatusCode> {
        let Some(pool) = self.descriptor_pool_entries.get(&catalog_entry_id) else {
            return Err(StatusCode::CatalogDescriptorPoolUnknown);
        };

        // Validate everything upfront; state stays untouched on failure.
        let mut new_tables: BTreeSet<(SmolStr, SmolStr, SmolStr)> = BTreeSet::new();
        for descriptor in &descriptors {
            let Some(tables) = &descriptor.tables else {
                return Err(StatusCode::CatalogDescriptorTablesNull);
            };
            let db_name = SmolStr::new(descriptor.database_name.as_deref().unwrap_or(""));
            let schema_name = SmolStr::new(descriptor.schema_name.as_deref().unwrap_or(""));
            for table in tables {
                if table.table_name.is_empty() {
                    return Err(StatusCode::CatalogDescriptorTableNameEmpty);
                }
                let key = (
                    db_name.clone(),
                    schema_name.clone(),
                    SmolStr::new(&table.table_name),
                );
                if pool.entry.tables_by_qualified_name.contains_key(&key)
                    || !new_tables.insert(key)
                {
                    return Err(StatusCode::CatalogDescriptorTableNameCollision);
                }
            }
        }

        let mut pool = self
            .descriptor_pool_entries
            .remove(&catalog_entry_id)
            .expect("pool presence checked above");
        let rank = pool.rank;
        for descriptor in descriptors {
            self.encode_descriptor(&mut pool, descriptor, rank);
        }
        self.descriptor_pool_entries.insert(catalog_entry_id, pool);
        self.version += 1;
        Ok(())
    }

    fn encode_descriptor(
        &mut self,
        pool: &mut DescriptorPool,
        descriptor: SchemaDescriptor,
        rank: Rank,
    ) {
        let pool_id = pool.entry.catalog_entry_id;
        let db_name = SmolStr::new(descriptor.database_name.as_deref().unwrap_or(""));
        let schema_name = SmolStr::new(descriptor.schema_name.as_deref().unwrap_or(""));

        let db_name_id = pool.register_name(&db_name, NameTags::DATABASE_NAME);
        let schema_name_id = pool.register_name(&schema_name, NameTags::SCHEMA_NAME);

        let database_id = match pool.entry.databases_by_name.get(&db_name) {
            Some(&idx) => pool.entry.database_references[idx].catalog_database_id,
            None => {
                let id = self.allocate_database_id(&db_name);
                pool.entry.add_database_reference(DatabaseReference {
                    catalog_database_id: id,
                    database_name: db_name.clone(),
                    database_alias: SmolStr::default(),
                });
                pool.name_registry
                    .borrow_mut()
                    .get_mut(db_name_id)
                    .resolved_objects
                    .push(QualifiedCatalogObjectId::Database(id));
                id
            }
        };
        let schema_id = match pool
            .entry
            .schemas_by_qualified_name
            .get(&(db_name.clone(), schema_name.clone()))
        {
            Some(&idx) => pool.entry.schema_references[idx].catalog_schema_id,
            None => {
                let id = self.allocate_schema_id(&db_name, &schema_name);
                pool.entry.add_schema_reference(SchemaReference {
                    catalog_database_id: database_id,
                    catalog_schema_id: id,
                    database_name: db_name.clone(),
                    schema_name: schema_name.clone(),
                });
                pool.name_registry
                    .borrow_mut()
                    .get_mut(schema_name_id)
                    .resolved_objects
                    .push(QualifiedCatalogObjectId::Schema(database_id, id));
                id
            }
        };

        // Declare the catalog-level database and schema.
        self.databases
            .entry(db_name.clone())
            .or_insert_with(|| DatabaseDeclaration {
                catalog_database_id: database_id,
                database_name: db_name.clone(),
                database_alias: SmolStr::default(),
            });
        self.schemas
            .entry((db_name.clone(), schema_name.clone()))
            .or_insert_with(|| SchemaDeclaration {
                catalog_database_id: database_id,
                catalog_schema_id: schema_id,
                database_name: db_name.clone(),
                schema_name: schema_name.clone(),
            });
        let info = CatalogSchemaEntryInfo {
            catalog_entry_id: pool_id,
            catalog_database_id: database_id,
            catalog_schema_id: schema_id,
        };
        self.entries_by_qualified_schema.insert(
            (db_name.clone(), schema_name.clone(), rank, pool_id),
            info,
        );
        self.entries_by_schema
            .insert((schema_name.clone(), rank, pool_id), info);

        // Declare the tables.
        for table in descriptor.tables.as_deref().unwrap_or_default() {
            let table_idx = pool.entry.table_declarations.len() as u32;
            let table_id = ContextObjectId::new(pool_id, table_idx);
            let table_name = SmolStr::new(&table.table_name);
            let table_name_id = pool.register_name(&table_name, NameTags::TABLE_NAME);
            pool.name_registry
                .borrow_mut()
                .get_mut(table_name_id)
                .resolved_objects
                .push(QualifiedCatalogObjectId::Table(table_id));

            let mut columns: Vec<TableColumn> = table
                .columns
                .iter()
                .enumerate()
                .map(|(idx, column)| TableColumn {
                    column_index: column.ordinal_position.unwrap_or(idx as u32),
                    ast_node_id: None,
                    column_name: SmolStr::new(&column.column_name),
                })
                .collect();
            columns.sort_by_key(|c| c.column_index);
            let mut columns_by_name = AHashMap::with_capacity(columns.len());
            for (idx, column) in columns.iter_mut().enumerate() {
                column.column_index = idx as u32;
                columns_by_name.insert(column.column_name.clone(), idx as u32);
                let column_name_id = pool.register_name(&column.column_name, NameTags::COLUMN_NAME);
                pool.name_registry
                    .borrow_mut()
                    .get_mut(column_name_id)
                    .resolved_objects
                    .push(QualifiedCatalogObjectId::TableColumn(table_id, idx as u32));
            }

            pool.entry.declare_table(TableDeclaration {
                catalog_database_id: database_id,
                catalog_schema_id: schema_id,
                catalog_table_id: table_id,
                ast_node_id: None,
                ast_statement_id: None,
                ast_scope_root: None,
                table_name: QualifiedTableName {
                    database_name: db_name.clone(),
                    schema_name: schema_name.clone(),
                    table_name,
                },
                table_columns: columns,
                table_columns_by_name: columns_by_name,
            });
        }
        pool.descriptors.push(descriptor);
    }

    // ---- resolution ----------------------------------------------------

    pub fn resolve_table_by_id(&self, table_id: ContextObjectId) -> Option<&TableDeclaration> {
        self.entry(table_id.origin())?
            .entry_data()
            .resolve_table_by_id(table_id)
    }

    /// Resolve a table by qualified name across all entries in rank order.
    ///
    /// A fully-qualified direct hit wins; an empty database name falls back
    /// to a schema-only search and finally to a global unqualified search.
    pub fn resolve_table_by_name<'a>(
        &'a self,
        database_name: &str,
        schema_name: &str,
        table_name: &str,
        ignore_entry: Option<CatalogEntryId>,
        out: &mut Vec<&'a TableDeclaration>,
        limit: usize,
    ) {
        let key = (
            SmolStr::new(database_name),
            SmolStr::new(schema_name),
            SmolStr::new(table_name),
        );
        for ((db, schema, _, candidate), _) in self
            .entries_by_qualified_schema
            .range((key.0.clone(), key.1.clone(), 0, 0)..)
        {
            if db != database_name || schema != schema_name {
                break;
            }
            if Some(*candidate) == ignore_entry {
                continue;
            }
            if let Some(entry) = self.entry(*candidate) {
                if let Some(table) = entry.entry_data().resolve_table_by_qualified_name(&key) {
                    out.push(table);
                    if out.len() >= limit {
                        break;
                    }
                }
            }
        }
        if !out.is_empty() {
            return;
        }

        if database_name.is_empty() {
            if !schema_name.is_empty() {
                for ((schema, _, candidate), _) in self
                    .entries_by_schema
                    .range((SmolStr::new(schema_name), 0, 0)..)
                {
                    if schema != schema_name {
                        break;
                    }
                    if Some(*candidate) == ignore_entry {
                        continue;
                    }
                    if let Some(entry) = self.entry(*candidate) {
                        entry.entry_data().resolve_table_in_schema(
                            schema_name,
                            table_name,
                            out,
                            limit,
                        );
                        if out.len() >= limit {
                            break;
                        }
                    }
                }
            } else {
                for (_, id) in &self.entries_ranked {
                    if Some(*id) == ignore_entry {
                        continue;
                    }
                    if let Some(entry) = self.entry(*id) {
                        entry
                            .entry_data()
                            .resolve_table_everywhere(table_name, out, limit);
                        if out.len() >= limit {
                            break;
                        }
                    }
                }
            }
        }
    }

    // ---- flattening & description --------------------------------------

    /// Emit the flat catalog representation.
    ///
    /// Tables are deduplicated across entries: the highest-ranked (lowest
    /// rank value) entry wins.
    pub fn flatten(&self) -> FlatCatalog {
        let mut name_dictionary: IndexSet<SmolStr> = IndexSet::default();
        let mut add_name =
            |text: &SmolStr| -> u32 { name_dictionary.insert_full(text.clone()).0 as u32 };

        struct TableNode {
            table_id: ContextObjectId,
            name_id: u32,
            columns: Vec<(u32, u32)>,
        }

        // db name -> (db id, name id, schema name -> (schema id, name id, table name -> node))
        type SchemaTree = BTreeMap<SmolStr, (CatalogSchemaId, u32, BTreeMap<SmolStr, TableNode>)>;
        let mut root: BTreeMap<SmolStr, (CatalogDatabaseId, u32, SchemaTree)> = BTreeMap::new();
        let mut seen_databases: BTreeSet<CatalogDatabaseId> = BTreeSet::new();
        let mut seen_schemas: BTreeSet<CatalogSchemaId> = BTreeSet::new();

        for (_, entry, _) in self.iterate_ranked() {
            for reference in &entry.entry_data().database_references {
                if seen_databases.insert(reference.catalog_database_id) {
                    let name_id = add_name(&reference.database_name);
                    root.entry(reference.database_name.clone()).or_insert((
                        reference.catalog_database_id,
                        name_id,
                        BTreeMap::new(),
                    ));
                }
            }
        }
        for (_, entry, _) in self.iterate_ranked() {
            for reference in &entry.entry_data().schema_references {
                if seen_schemas.insert(reference.catalog_schema_id) {
                    let name_id = add_name(&reference.schema_name);
                    if let Some((_, _, schemas)) = root.get_mut(&reference.database_name) {
                        schemas.entry(reference.schema_name.clone()).or_insert((
                            reference.catalog_schema_id,
                            name_id,
                            BTreeMap::new(),
                        ));
                    }
                }
            }
        }

        // Ranked order; the first declaration of a (db, schema, table) wins.
        for (_, entry, _) in self.iterate_ranked() {
            let data = entry.entry_data();
            for table in &data.table_declarations {
                let Some((_, _, schemas)) = root.get_mut(&table.table_name.database_name) else {
                    continue;
                };
                let Some((_, _, tables)) = schemas.get_mut(&table.table_name.schema_name) else {
                    continue;
                };
                if tables.contains_key(&table.table_name.table_name) {
                    continue;
                }
                let name_id = add_name(&table.table_name.table_name);
                let columns = table
                    .table_columns
                    .iter()
                    .map(|c| (c.column_index, add_name(&c.column_name)))
                    .collect();
                tables.insert(
                    table.table_name.table_name.clone(),
                    TableNode {
                        table_id: table.catalog_table_id,
                        name_id,
                        columns,
                    },
                );
            }
        }

        let mut out = FlatCatalog {
            catalog_version: self.version,
            name_dictionary: name_dictionary.into_iter().collect(),
            ..Default::default()
        };
        for (_, (database_id, db_name_id, schemas)) in &root {
            let database_idx = out.databases.len() as u32;
            out.databases.push(FlatCatalogEntry {
                flat_entry_idx: database_idx,
                flat_parent_idx: 0,
                catalog_object_id: *database_id as u64,
                name_id: *db_name_id,
                child_begin: out.schemas.len() as u32,
                child_count: schemas.len() as u32,
            });
            out.databases_by_id.push((*database_id, database_idx));
            for (_, (schema_id, schema_name_id, tables)) in schemas {
                let schema_idx = out.schemas.len() as u32;
                out.schemas.push(FlatCatalogEntry {
                    flat_entry_idx: schema_idx,
                    flat_parent_idx: database_idx,
                    catalog_object_id: *schema_id as u64,
                    name_id: *schema_name_id,
                    child_begin: out.tables.len() as u32,
                    child_count: tables.len() as u32,
                });
                out.schemas_by_id.push((*schema_id, schema_idx));
                for (_, table) in tables {
                    let table_idx = out.tables.len() as u32;
                    out.tables.push(FlatCatalogEntry {
                        flat_entry_idx: table_idx,
                        flat_parent_idx: schema_idx,
                        catalog_object_id: table.table_id.pack(),
                        name_id: table.name_id,
                        child_begin: out.columns.len() as u32,
                        child_count: table.columns.len() as u32,
                    });
                    out.tables_by_id.push((table.table_id.pack(), table_idx));
                    for (column_id, column_name_id) in &table.columns {
                        out.columns.push(FlatCatalogEntry {
                            flat_entry_idx: out.columns.len() as u32,
                            flat_parent_idx: table_idx,
                            catalog_object_id: *column_id as u64,
                            name_id: *column_name_id,
                            child_begin: 0,
                            child_count: 0,
                        });
                    }
                }
            }
        }
        out.databases_by_id.sort_unstable();
        out.schemas_by_id.sort_unstable();
        out.tables_by_id.sort_unstable();
        out
    }

    pub fn describe_entries(&self) -> Vec<CatalogEntryDescriptor> {
        self.iterate_ranked()
            .map(|(id, entry, rank)| self.describe_entry(id, entry, rank))
            .collect()
    }

    pub fn describe_entries_of(
        &self,
        catalog_entry_id: CatalogEntryId,
    ) -> Option<CatalogEntryDescriptor> {
        let entry = self.entry(catalog_entry_id)?;
        let rank = self
            .script_entries
            .get(&catalog_entry_id)
            .map(|e| e.rank)
            .or_else(|| {
                self.descriptor_pool_entries
                    .get(&catalog_entry_id)
                    .map(|p| p.rank)
            })?;
        Some(self.describe_entry(catalog_entry_id, entry, rank))
    }

    fn describe_entry(
        &self,
        catalog_entry_id: CatalogEntryId,
        entry: &dyn CatalogEntry,
        rank: Rank,
    ) -> CatalogEntryDescriptor {
        let data = entry.entry_data();
        let entry_type = match self.entries.get(&catalog_entry_id) {
            Some(CatalogEntryKind::DescriptorPool) => CatalogEntryType::DescriptorPool,
            _ => CatalogEntryType::Script,
        };
        let schemas = data
            .schemas_by_qualified_name
            .keys()
            .map(|(db_name, schema_name)| {
                let table_count = data
                    .tables_by_unqualified_schema
                    .range((schema_name.clone(), db_name.clone(), 0)..)
                    .take_while(|(schema, db, _)| schema == schema_name && db == db_name)
                    .count();
                CatalogSchemaSummary {
                    database_name: db_name.clone(),
                    schema_name: schema_name.clone(),
                    table_count,
                }
            })
            .collect();
        CatalogEntryDescriptor {
            catalog_entry_id,
            entry_type,
            rank,
            schemas,
        }
    }

    pub fn statistics(&self) -> CatalogStatistics {
        let mut stats = CatalogStatistics {
            version: self.version,
            entry_count: self.entries.len(),
            database_count: self.databases.len(),
            schema_count: self.schemas.len(),
            ..Default::default()
        };
        for (_, entry, _) in self.iterate_ranked() {
            let data = entry.entry_data();
            stats.table_count += data.table_declarations.len();
            stats.column_count += data
                .table_declarations
                .iter()
                .map(|t| t.table_columns.len())
                .sum::<usize>();
        }
        stats
    }
}

/// Resolve a table by id, checking a possibly not-yet-loaded entry first.
pub(crate) fn resolve_table_in<'a>(
    own: &'a CatalogEntryData,
    catalog: &'a Catalog,
    table_id: ContextObjectId,
) -> Option<&'a TableDeclaration> {
    own.resolve_table_by_id(table_id)
        .or_else(|| catalog.resolve_table_by_id(table_id))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn pool_descriptor() -> SchemaDescriptor {
        SchemaDescriptor {
            database_name: Some("db1".into()),
            schema_name: Some("schema1".into()),
            tables: Some(vec![
                SchemaTableDescriptor {
                    table_name: "table1".into(),
                    columns: vec![
                        SchemaColumnDescriptor {
                            column_name: "column1".into(),
                            ordinal_position: Some(0),
                        },
                        SchemaColumnDescriptor {
                            column_name: "column2".into(),
                            ordinal_position: Some(1),
                        },
                        SchemaColumnDescriptor {
                            column_name: "column3".into(),
                            ordinal_position: Some(2),
                        },
                    ],
                },
                SchemaTableDescriptor {
                    table_name: "table2".into(),
                    columns: vec![
                        SchemaColumnDescriptor {
                            column_name: "column1".into(),
                            ordinal_position: Some(0),
                        },
                        SchemaColumnDescriptor {
                            column_name: "column2".into(),
                            ordinal_position: Some(1),
                        },
                        SchemaColumnDescriptor {
                            column_name: "column4".into(),
                            ordinal_position: Some(2),
                        },
                    ],
                },
            ]),
        }
    }

    #[test]
    fn test_id_allocation_reuses_declared_ids() {
        let mut catalog = Catalog::new();
        let db1 = catalog.allocate_database_id("db1");
        let db2 = catalog.allocate_database_id("db1");
        // No declaration was created, so the id is not reused.
        assert_eq!(db1, INITIAL_DATABASE_ID);
        assert_eq!(db2, INITIAL_DATABASE_ID + 1);

        catalog.add_descriptor_pool(1, 0).unwrap();
        catalog.add_schema_descriptor(1, pool_descriptor()).unwrap();
        let declared = catalog.databases().get("db1").unwrap().catalog_database_id;
        assert_eq!(catalog.allocate_database_id("db1"), declared);
        let schema = catalog.allocate_schema_id("db1", "schema1");
        assert_eq!(
            schema,
            catalog
                .schemas()
                .get(&(SmolStr::new("db1"), SmolStr::new("schema1")))
                .unwrap()
                .catalog_schema_id
        );
    }

    #[test]
    fn test_descriptor_pool_roundtrip() {
        let mut catalog = Catalog::new();
        assert_eq!(catalog.version(), 1);
        catalog.add_descriptor_pool(42, 0).unwrap();
        assert_eq!(
            catalog.add_descriptor_pool(42, 0),
            Err(StatusCode::ExternalIdCollision)
        );
        catalog.add_schema_descriptor(42, pool_descriptor()).unwrap();

        let entry = catalog.entry(42).unwrap();
        let table = entry
            .entry_data()
            .resolve_table_by_qualified_name(&(
                SmolStr::new("db1"),
                SmolStr::new("schema1"),
                SmolStr::new("table1"),
            ))
            .unwrap();
        assert_eq!(table.table_columns.len(), 3);
        assert_eq!(table.column_by_name("column2").unwrap().column_index, 1);

        catalog.drop_descriptor_pool(42).unwrap();
        assert!(catalog.entry(42).is_none());
        assert_eq!(
            catalog.drop_descriptor_pool(42),
            Err(StatusCode::CatalogDescriptorPoolUnknown)
        );
    }

    #[test]
    fn test_descriptor_validation() {
        let mut catalog = Catalog::new();
        catalog.add_descriptor_pool(1, 0).unwrap();

        let missing_tables = SchemaDescriptor {
            database_name: Some("db".into()),
            schema_name: Some("s".into()),
            tables: None,
        };
        assert_eq!(
            catalog.add_schema_descriptor(1, missing_tables),
            Err(StatusCode::CatalogDescriptorTablesNull)
        );

        let empty_name = SchemaDescriptor {
            database_name: Some("db".into()),
            schema_name: Some("s".into()),
            tables: Some(vec![SchemaTableDescriptor {
                table_name: "".into(),
                columns: vec![],
            }]),
        };
        assert_eq!(
            catalog.add_schema_descriptor(1, empty_name),
            Err(StatusCode::CatalogDescriptorTableNameEmpty)
        );

        let duplicate = SchemaDescriptor {
            database_name: Some("db".into()),
            schema_name: Some("s".into()),
            tables: Some(vec![
                SchemaTableDescriptor {
                    table_name: "t".into(),
                    columns: vec![],
                },
                SchemaTableDescriptor {
                    table_name: "t".into(),
                    columns: vec![],
                },
            ]),
        };
        assert_eq!(
            catalog.add_schema_descriptor(1, duplicate),
            Err(StatusCode::CatalogDescriptorTableNameCollision)
        );
        // Nothing was registered by the failed adds.
        assert!(catalog.entry(1).unwrap().entry_data().table_declarations.is_empty());
    }

    #[test]
    fn test_resolve_table_by_name_ranked() {
        let mut catalog = Catalog::new();
        catalog.add_descriptor_pool(1, 1).unwrap();
        catalog.add_schema_descriptor(1, pool_descriptor()).unwrap();
        catalog.add_descriptor_pool(2, 0).unwrap();
        catalog
            .add_schema_descriptor(
                2,
                SchemaDescriptor {
                    database_name: Some("db2".into()),
                    schema_name: Some("schema2".into()),
                    tables: Some(vec![SchemaTableDescriptor {
                        table_name: "table1".into(),
                        columns: vec![],
                    }]),
                },
            )
            .unwrap();

        // Fully qualified.
        let mut hits = Vec::new();
        catalog.resolve_table_by_name("db1", "schema1", "table1", None, &mut hits, 8);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].catalog_table_id.origin(), 1);

        // Unqualified: both entries declare `table1`; rank 0 comes first.
        let mut hits = Vec::new();
        catalog.resolve_table_by_name("", "", "table1", None, &mut hits, 8);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].catalog_table_id.origin(), 2);

        // Schema-only.
        let mut hits = Vec::new();
        catalog.resolve_table_by_name("", "schema1", "table2", None, &mut hits, 8);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].table_name.table_name, "table2");
    }

    #[test]
    fn test_flatten() {
        let mut catalog = Catalog::new();
        let empty = catalog.flatten();
        assert_eq!(empty.catalog_version, 1);
        assert!(empty.databases.is_empty());

        catalog.add_descriptor_pool(7, 0).unwrap();
        catalog.add_schema_descriptor(7, pool_descriptor()).unwrap();
        let flat = catalog.flatten();
        assert_eq!(flat.databases.len(), 1);
        assert_eq!(flat.schemas.len(), 1);
        assert_eq!(flat.tables.len(), 2);
        assert_eq!(flat.columns.len(), 6);
        // Ordered by name: table1 before table2; column order is ordinal.
        assert_eq!(
            flat.name_dictionary[flat.tables[0].name_id as usize],
            "table1"
        );
        assert_eq!(flat.tables[0].child_begin, 0);
        assert_eq!(flat.tables[1].child_begin, 3);

        // Determinism.
        let again = catalog.flatten();
        assert_eq!(flat.databases, again.databases);
        assert_eq!(flat.schemas, again.schemas);
        assert_eq!(flat.tables, again.tables);
        assert_eq!(flat.columns, again.columns);
        assert_eq!(flat.name_dictionary, again.name_dictionary);
    }

    #[test]
    fn test_statistics() {
        let mut catalog = Catalog::new();
        catalog.add_descriptor_pool(1, 0).unwrap();
        catalog.add_schema_descriptor(1, pool_descriptor()).unwrap();
        let stats = catalog.statistics();
        assert_eq!(stats.entry_count, 1);
        assert_eq!(stats.database_count, 1);
        assert_eq!(stats.schema_count, 1);
        assert_eq!(stats.table_count, 2);
        assert_eq!(stats.column_count, 6);
    }
}

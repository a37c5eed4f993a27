use std::collections::BTreeSet;
use std::ops::{BitOr, BitOrAssign};

use ahash::AHashMap;
use smol_str::SmolStr;

use crate::catalog::QualifiedCatalogObjectId;
use crate::text::Location;
use crate::utils::fold_case;

pub type NameId = u32;

/// Coarse name tags accumulated by the analyzer.
/// A name may occur in multiple situations, so these tags only provide a
/// semantic hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct NameTags(u8);

impl NameTags {
    pub const NONE: NameTags = NameTags(0);
    pub const DATABASE_NAME: NameTags = NameTags(1 << 0);
    pub const SCHEMA_NAME: NameTags = NameTags(1 << 1);
    pub const TABLE_NAME: NameTags = NameTags(1 << 2);
    pub const TABLE_ALIAS: NameTags = NameTags(1 << 3);
    pub const COLUMN_NAME: NameTags = NameTags(1 << 4);

    pub fn contains(&self, other: NameTags) -> bool {
        (self.0 & other.0) == other.0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn clear(&mut self) {
        self.0 = 0;
    }
}

impl BitOr for NameTags {
    type Output = NameTags;

    fn bitor(self, rhs: NameTags) -> NameTags {
        NameTags(self.0 | rhs.0)
    }
}

impl BitOrAssign for NameTags {
    fn bitor_assign(&mut self, rhs: NameTags) {
        self.0 |= rhs.0;
    }
}

/// An interned name.
#[derive(Debug, Clone)]
pub struct RegisteredName {
    /// The unique name id within the owner.
    pub name_id: NameId,
    /// The interned text.
    pub text: SmolStr,
    /// The first-seen location (if any).
    pub location: Location,
    /// The occurrence count.
    pub occurrences: usize,
    /// The coarse name tags resolved by the analyzer.
    /// Reset when the owning script is re-analyzed; interning is preserved.
    pub coarse_analyzer_tags: NameTags,
    /// The catalog objects resolved by the analyzer that share this name.
    pub resolved_objects: Vec<QualifiedCatalogObjectId>,
}

/// A per-owner name interner.
///
/// Names are interned per owner (scanned script or descriptor pool);
/// equality is by id within an owner and by text across owners.
#[derive(Debug, Default)]
pub struct NameRegistry {
    names: Vec<RegisteredName>,
    names_by_text: AHashMap<SmolStr, NameId>,
}

impl NameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn get(&self, name_id: NameId) -> &RegisteredName {
        &self.names[name_id as usize]
    }

    pub fn get_mut(&mut self, name_id: NameId) -> &mut RegisteredName {
        &mut self.names[name_id as usize]
    }

    pub fn find(&self, text: &str) -> Option<&RegisteredName> {
        self.names_by_text
            .get(text)
            .map(|&id| &self.names[id as usize])
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegisteredName> {
        self.names.iter()
    }

    /// Intern a name.
    /// Returns the existing entry (incrementing occurrences and OR-ing tags)
    /// or appends a new one.
    pub fn register(&mut self, text: &str, location: Location, tags: NameTags) -> NameId {
        if let Some(&id) = self.names_by_text.get(text) {
            let name = &mut self.names[id as usize];
            name.occurrences += 1;
            name.coarse_analyzer_tags |= tags;
            return id;
        }
        let name_id = self.names.len() as NameId;
        let text = SmolStr::new(text);
        self.names.push(RegisteredName {
            name_id,
            text: text.clone(),
            location,
            occurrences: 1,
            coarse_analyzer_tags: tags,
            resolved_objects: Vec::new(),
        });
        self.names_by_text.insert(text, name_id);
        name_id
    }

    /// Reset the per-name transient analyzer state.
    /// Interning, locations and occurrence counts are preserved.
    pub fn reset_analyzer_state(&mut self) {
        for name in &mut self.names {
            name.coarse_analyzer_tags.clear();
            name.resolved_objects.clear();
        }
    }

    pub fn byte_size(&self) -> usize {
        self.names.len() * std::mem::size_of::<RegisteredName>()
            + self.names.iter().map(|n| n.text.len()).sum::<usize>()
    }
}

/// A case-insensitive suffix index over registered names.
/// Keys are the case-folded suffixes of every name with length >= 1.
pub type NameSearchIndex = BTreeSet<(SmolStr, NameId)>;

/// Insert all suffixes of a name into a search index.
pub fn index_name_suffixes(index: &mut NameSearchIndex, name: &RegisteredName) {
    let folded = fold_case(&name.text);
    for (pos, _) in folded.char_indices() {
        index.insert((SmolStr::new(&folded[pos..]), name.name_id));
    }
}

/// Scan a search index for all names with a suffix starting with `prefix`.
/// The prefix is matched case-insensitively; the same name may be yielded
/// once per matching suffix.
pub fn search_names<'a>(
    index: &'a NameSearchIndex,
    prefix: &str,
) -> impl Iterator<Item = NameId> + 'a {
    let folded = fold_case(prefix);
    let lower_bound = (SmolStr::new(&folded), NameId::MIN);
    index
        .range(lower_bound..)
        .take_while(move |(suffix, _)| suffix.starts_with(folded.as_str()))
        .map(|&(_, name_id)| name_id)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_register_interns_by_text() {
        let mut registry = NameRegistry::new();
        let a = registry.register("foo", Location::new(0, 3), NameTags::NONE);
        let b = registry.register("foo", Location::new(10, 3), NameTags::TABLE_NAME);
        assert_eq!(a, b);
        assert_eq!(registry.len(), 1);
        let name = registry.get(a);
        assert_eq!(name.occurrences, 2);
        assert_eq!(name.location, Location::new(0, 3));
        assert!(name.coarse_analyzer_tags.contains(NameTags::TABLE_NAME));
    }

    #[test]
    fn test_reset_analyzer_state_preserves_interning() {
        let mut registry = NameRegistry::new();
        let id = registry.register("foo", Location::new(0, 3), NameTags::COLUMN_NAME);
        registry.reset_analyzer_state();
        let name = registry.get(id);
        assert_eq!(name.occurrences, 1);
        assert!(name.coarse_analyzer_tags.is_empty());
        assert_eq!(
            registry.register("foo", Location::new(4, 3), NameTags::NONE),
            id
        );
    }

    #[test]
    fn test_suffix_search() {
        let mut registry = NameRegistry::new();
        let warehouse = registry.register("Warehouse", Location::default(), NameTags::NONE);
        let house = registry.register("house", Location::default(), NameTags::NONE);
        let mut index = NameSearchIndex::new();
        index_name_suffixes(&mut index, registry.get(warehouse));
        index_name_suffixes(&mut index, registry.get(house));

        let mut hits: Vec<NameId> = search_names(&index, "hou").collect();
        hits.sort_unstable();
        hits.dedup();
        assert_eq!(hits, vec![warehouse, house]);

        let mut prefix_hits: Vec<NameId> = search_names(&index, "ware").collect();
        prefix_hits.sort_unstable();
        prefix_hits.dedup();
        assert_eq!(prefix_hits, vec![warehouse]);

        assert_eq!(search_names(&index, "zzz").count(), 0);
    }
}

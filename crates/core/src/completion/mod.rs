use std::ops::{BitOr, BitOrAssign};

use ahash::{AHashMap, AHashSet};
use smol_str::SmolStr;

use crate::analyzer::{AnalyzedScript, ExpressionInner, TableReferenceInner};
use crate::catalog::{
    Catalog, CatalogEntry, ContextObjectId, QualifiedCatalogObjectId, QualifiedTableName,
    resolve_table_in,
};
use crate::cursor::{CursorContext, NameComponentKind, ScriptCursor};
use crate::parser::keywords::KeywordPrevalence;
use crate::parser::parser::{ExpectedSymbol, ParsedScript, parse_until};
use crate::parser::scanner::{RelativePosition, ScannedScript, SymbolLocation};
use crate::parser::token::SymbolKind;
use crate::registry::ScriptRegistry;
use crate::script::Script;
use crate::snippet::SnippetGroup;
use crate::status::StatusCode;
use crate::text::Location;
use crate::text::names::{NameId, NameTags, search_names};
use crate::utils::topk::TopKHeap;
use crate::utils::{ci_compare, ci_find, ci_starts_with};

/// The completion dispatch bucket derived from the cursor's AST context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum CompletionStrategy {
    Default,
    TableRef,
    TableRefAlias,
    ColumnRef,
}

/// Fine-granular tags accumulated per candidate and candidate object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct CandidateTags(u32);

impl CandidateTags {
    pub const NONE: CandidateTags = CandidateTags(0);
    pub const EXPECTED_PARSER_SYMBOL: CandidateTags = CandidateTags(1 << 0);
    pub const NAME_INDEX: CandidateTags = CandidateTags(1 << 1);
    pub const KEYWORD_DEFAULT: CandidateTags = CandidateTags(1 << 2);
    pub const KEYWORD_POPULAR: CandidateTags = CandidateTags(1 << 3);
    pub const KEYWORD_VERY_POPULAR: CandidateTags = CandidateTags(1 << 4);
    pub const SUBSTRING_MATCH: CandidateTags = CandidateTags(1 << 5);
    pub const PREFIX_MATCH: CandidateTags = CandidateTags(1 << 6);
    pub const RESOLVING_TABLE: CandidateTags = CandidateTags(1 << 7);
    pub const UNRESOLVED_PEER: CandidateTags = CandidateTags(1 << 8);
    pub const DOT_RESOLUTION_SCHEMA: CandidateTags = CandidateTags(1 << 9);
    pub const DOT_RESOLUTION_TABLE: CandidateTags = CandidateTags(1 << 10);
    pub const DOT_RESOLUTION_COLUMN: CandidateTags = CandidateTags(1 << 11);
    pub const THROUGH_CATALOG: CandidateTags = CandidateTags(1 << 12);
    pub const IN_NAME_SCOPE: CandidateTags = CandidateTags(1 << 13);
    pub const IN_SAME_STATEMENT: CandidateTags = CandidateTags(1 << 14);
    pub const IN_SAME_SCRIPT: CandidateTags = CandidateTags(1 << 15);
    pub const IN_OTHER_SCRIPT: CandidateTags = CandidateTags(1 << 16);

    pub fn contains(&self, other: CandidateTags) -> bool {
        (self.0 & other.0) == other.0
    }

    pub fn add_if(&mut self, tag: CandidateTags, condition: bool) {
        if condition {
            self.0 |= tag.0;
        }
    }
}

impl BitOr for CandidateTags {
    type Output = CandidateTags;

    fn bitor(self, rhs: CandidateTags) -> CandidateTags {
        CandidateTags(self.0 | rhs.0)
    }
}

impl BitOrAssign for CandidateTags {
    fn bitor_assign(&mut self, rhs: CandidateTags) {
        self.0 |= rhs.0;
    }
}

type ScoreValue = u32;

const KEYWORD_VERY_POPULAR_SCORE: ScoreValue = 3;
const KEYWORD_POPULAR_SCORE: ScoreValue = 2;
const KEYWORD_DEFAULT_SCORE: ScoreValue = 0;

const NAME_TAG_IGNORE: ScoreValue = 0;
const NAME_TAG_UNLIKELY: ScoreValue = 10;
const NAME_TAG_LIKELY: ScoreValue = 20;

const SUBSTRING_SCORE_MODIFIER: ScoreValue = 30;
const PREFIX_SCORE_MODIFIER: ScoreValue = 5;
const RESOLVING_TABLE_SCORE_MODIFIER: ScoreValue = 5;
const UNRESOLVED_PEER_SCORE_MODIFIER: ScoreValue = 1;
const DOT_SCHEMA_SCORE_MODIFIER: ScoreValue = 2;
const DOT_TABLE_SCORE_MODIFIER: ScoreValue = 2;
const DOT_COLUMN_SCORE_MODIFIER: ScoreValue = 2;
const IN_NAME_SCOPE_SCORE_MODIFIER: ScoreValue = 10;
const IN_SAME_STATEMENT_SCORE_MODIFIER: ScoreValue = 1;
const IN_SAME_SCRIPT_SCORE_MODIFIER: ScoreValue = 1;
const IN_OTHER_SCRIPT_SCORE_MODIFIER: ScoreValue = 1;

/// How many catalog objects a single candidate retains.
const CANDIDATE_OBJECT_LIMIT: usize = 24;

// Ranking constraints the scoring constants must uphold.
const _: () = assert!(NAME_TAG_UNLIKELY + SUBSTRING_SCORE_MODIFIER > NAME_TAG_LIKELY);
const _: () = assert!(IN_NAME_SCOPE_SCORE_MODIFIER > PREFIX_SCORE_MODIFIER);
const _: () = assert!(
    SUBSTRING_SCORE_MODIFIER
        > IN_SAME_STATEMENT_SCORE_MODIFIER
            + IN_SAME_SCRIPT_SCORE_MODIFIER
            + IN_OTHER_SCRIPT_SCORE_MODIFIER
);
const _: () = assert!(
    IN_NAME_SCOPE_SCORE_MODIFIER
        > IN_SAME_STATEMENT_SCORE_MODIFIER
            + IN_SAME_SCRIPT_SCORE_MODIFIER
            + IN_OTHER_SCRIPT_SCORE_MODIFIER
);
const _: () = assert!(
    RESOLVING_TABLE_SCORE_MODIFIER
        > IN_SAME_STATEMENT_SCORE_MODIFIER
            + IN_SAME_SCRIPT_SCORE_MODIFIER
            + IN_OTHER_SCRIPT_SCORE_MODIFIER
);

fn compute_candidate_score(tags: CandidateTags) -> ScoreValue {
    let mut score = 0;
    let mut add = |tag: CandidateTags, value: ScoreValue| {
        if tags.contains(tag) {
            score += value;
        }
    };
    add(CandidateTags::KEYWORD_DEFAULT, KEYWORD_DEFAULT_SCORE);
    add(CandidateTags::KEYWORD_POPULAR, KEYWORD_POPULAR_SCORE);
    add(CandidateTags::KEYWORD_VERY_POPULAR, KEYWORD_VERY_POPULAR_SCORE);
    add(CandidateTags::SUBSTRING_MATCH, SUBSTRING_SCORE_MODIFIER);
    add(CandidateTags::PREFIX_MATCH, PREFIX_SCORE_MODIFIER);
    add(CandidateTags::RESOLVING_TABLE, RESOLVING_TABLE_SCORE_MODIFIER);
    add(CandidateTags::UNRESOLVED_PEER, UNRESOLVED_PEER_SCORE_MODIFIER);
    add(CandidateTags::DOT_RESOLUTION_SCHEMA, DOT_SCHEMA_SCORE_MODIFIER);
    add(CandidateTags::DOT_RESOLUTION_TABLE, DOT_TABLE_SCORE_MODIFIER);
    add(CandidateTags::DOT_RESOLUTION_COLUMN, DOT_COLUMN_SCORE_MODIFIER);
    add(CandidateTags::IN_NAME_SCOPE, IN_NAME_SCOPE_SCORE_MODIFIER);
    add(CandidateTags::IN_SAME_STATEMENT, IN_SAME_STATEMENT_SCORE_MODIFIER);
    add(CandidateTags::IN_SAME_SCRIPT, IN_SAME_SCRIPT_SCORE_MODIFIER);
    add(CandidateTags::IN_OTHER_SCRIPT, IN_OTHER_SCRIPT_SCORE_MODIFIER);
    score
}

/// The name-tag base score for a strategy.
fn name_tag_score(strategy: CompletionStrategy, tags: NameTags) -> ScoreValue {
    let table: [(NameTags, ScoreValue); 5] = match strategy {
        CompletionStrategy::Default | CompletionStrategy::TableRefAlias => [
            (NameTags::SCHEMA_NAME, NAME_TAG_LIKELY),
            (NameTags::DATABASE_NAME, NAME_TAG_LIKELY),
            (NameTags::TABLE_NAME, NAME_TAG_LIKELY),
            (NameTags::TABLE_ALIAS, NAME_TAG_LIKELY),
            (NameTags::COLUMN_NAME, NAME_TAG_LIKELY),
        ],
        CompletionStrategy::TableRef => [
            (NameTags::SCHEMA_NAME, NAME_TAG_LIKELY),
            (NameTags::DATABASE_NAME, NAME_TAG_LIKELY),
            (NameTags::TABLE_NAME, NAME_TAG_LIKELY),
            (NameTags::TABLE_ALIAS, NAME_TAG_UNLIKELY),
            (NameTags::COLUMN_NAME, NAME_TAG_UNLIKELY),
        ],
        CompletionStrategy::ColumnRef => [
            (NameTags::SCHEMA_NAME, NAME_TAG_UNLIKELY),
            (NameTags::DATABASE_NAME, NAME_TAG_UNLIKELY),
            (NameTags::TABLE_NAME, NAME_TAG_UNLIKELY),
            (NameTags::TABLE_ALIAS, NAME_TAG_LIKELY),
            (NameTags::COLUMN_NAME, NAME_TAG_LIKELY),
        ],
    };
    let mut score = NAME_TAG_IGNORE;
    for (tag, value) in table {
        if tags.contains(tag) {
            score = score.max(value);
        }
    }
    score
}

/// A catalog object attached to a finished completion candidate.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct CompletionCandidateObject {
    pub candidate_tags: CandidateTags,
    pub catalog_object_id: QualifiedCatalogObjectId,
    pub score: ScoreValue,
    pub qualified_name: Vec<SmolStr>,
    pub qualified_name_target_idx: usize,
    pub prefer_qualified: bool,
    pub restriction_snippets: Vec<SnippetGroup>,
    pub computation_snippets: Vec<SnippetGroup>,
}

/// A finished completion candidate.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct CompletionCandidate {
    pub completion_text: SmolStr,
    pub coarse_name_tags: NameTags,
    pub candidate_tags: CandidateTags,
    pub target_location: Location,
    pub target_location_qualified: Location,
    pub score: ScoreValue,
    pub prefer_qualified_tables: bool,
    pub prefer_qualified_columns: bool,
    pub catalog_objects: Vec<CompletionCandidateObject>,
}

/// The bounded, ranked completion result for one cursor.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Completion {
    pub text_offset: usize,
    pub strategy: CompletionStrategy,
    pub dot_completion: bool,
    pub candidates: Vec<CompletionCandidate>,
}

struct HeapCandidate {
    score: ScoreValue,
    candidate: CompletionCandidate,
}

impl PartialEq for HeapCandidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == std::cmp::Ordering::Equal
    }
}

impl Eq for HeapCandidate {}

impl PartialOrd for HeapCandidate {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapCandidate {
    /// A candidate is kicked before another if its score is lower; on equal
    /// scores the lexicographically larger name loses.
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.score
            .cmp(&other.score)
            .then_with(|| {
                ci_compare(
                    &other.candidate.completion_text,
                    &self.candidate.completion_text,
                )
            })
            .then_with(|| {
                other
                    .candidate
                    .completion_text
                    .cmp(&self.candidate.completion_text)
            })
    }
}

/// A pending candidate during collection.
struct Candidate {
    completion_text: SmolStr,
    coarse_name_tags: NameTags,
    candidate_tags: CandidateTags,
    target_location: Location,
    target_location_qualified: Location,
    objects: Vec<u32>,
}

struct CandidateObject {
    candidate: u32,
    candidate_tags: CandidateTags,
    catalog_object_id: QualifiedCatalogObjectId,
}

struct Engine<'a> {
    script: &'a Script,
    catalog: &'a Catalog,
    registry: Option<&'a ScriptRegistry>,
    cursor: &'a ScriptCursor,
    scanned: &'a ScannedScript,
    parsed: Option<&'a ParsedScript>,
    analyzed: Option<&'a AnalyzedScript>,
    strategy: CompletionStrategy,
    target_symbol: SymbolLocation,
    candidates: Vec<Candidate>,
    candidate_objects: Vec<CandidateObject>,
    candidates_by_name: AHashMap<SmolStr, u32>,
    candidate_objects_by_id: AHashMap<QualifiedCatalogObjectId, u32>,
    heap: TopKHeap<HeapCandidate>,
}

fn select_strategy(cursor: &ScriptCursor) -> CompletionStrategy {
    match cursor.context {
        CursorContext::TableRef { at_alias: true, .. } => CompletionStrategy::TableRefAlias,
        CursorContext::TableRef { at_alias: false, .. } => CompletionStrategy::TableRef,
        CursorContext::ColumnRef { .. } => CompletionStrategy::ColumnRef,
        CursorContext::None => CompletionStrategy::Default,
    }
}

fn do_not_complete_symbol(kind: SymbolKind) -> bool {
    matches!(
        kind,
        SymbolKind::LiteralString
            | SymbolKind::LiteralInteger
            | SymbolKind::LiteralFloat
            | SymbolKind::LiteralBitString
            | SymbolKind::LiteralHexString
            | SymbolKind::Comma
            | SymbolKind::LParen
            | SymbolKind::RParen
            | SymbolKind::LBracket
            | SymbolKind::RBracket
            | SymbolKind::Semicolon
            | SymbolKind::Colon
            | SymbolKind::Plus
            | SymbolKind::Minus
            | SymbolKind::Star
            | SymbolKind::Slash
            | SymbolKind::Percent
            | SymbolKind::QuestionMark
            | SymbolKind::Circumflex
            | SymbolKind::LessThan
            | SymbolKind::GreaterThan
            | SymbolKind::Equals
    )
}

/// Compute completion at the script's cursor.
pub(crate) fn compute(
    script: &Script,
    catalog: &Catalog,
    k: usize,
    registry: Option<&ScriptRegistry>,
) -> Result<Completion, StatusCode> {
    let Some(cursor) = script.cursor() else {
        return Err(StatusCode::CompletionMissesCursor);
    };
    let Some(scanned) = script.scanned_script() else {
        return Err(StatusCode::CompletionMissesScannerToken);
    };
    let strategy = select_strategy(cursor);
    let empty = |dot_completion: bool| Completion {
        text_offset: cursor.text_offset,
        strategy,
        dot_completion,
        candidates: Vec::new(),
    };

    // Cannot complete without a scanner location.
    let Some(scanner_location) = cursor.scanner_location else {
        return Ok(empty(false));
    };
    let mut target_symbol = scanner_location.current;
    let mut previous_symbol = scanner_location.previous;

    // Pointing into nirvana? Nothing to complete then.
    if matches!(
        target_symbol.relative_pos,
        RelativePosition::NewSymbolAfter | RelativePosition::NewSymbolBefore
    ) {
        return Ok(empty(false));
    }

    let mut use_previous_if_at_end = |target: &mut SymbolLocation| -> bool {
        if let Some(previous) = previous_symbol {
            if previous.relative_pos == RelativePosition::EndOfSymbol {
                *target = previous;
                previous_symbol = None;
                return true;
            }
        }
        false
    };

    // Dots complete their predecessor, never themselves.
    let mut dot_completion = false;
    if target_symbol.is_dot() {
        match target_symbol.relative_pos {
            RelativePosition::EndOfSymbol | RelativePosition::NewSymbolAfter => {
                dot_completion = true;
            }
            _ => {
                return Ok(empty(false));
            }
        }
    } else if target_symbol.is_trailing_dot() {
        match target_symbol.relative_pos {
            RelativePosition::EndOfSymbol | RelativePosition::NewSymbolAfter => {
                dot_completion = true;
            }
            RelativePosition::BeginOfSymbol => {
                if !use_previous_if_at_end(&mut target_symbol) {
                    return Ok(empty(false));
                }
            }
            RelativePosition::MidOfSymbol | RelativePosition::NewSymbolBefore => {
                return Ok(empty(false));
            }
        }
    }

    // Skip non-completable symbols, trying the predecessor once.
    if !dot_completion && do_not_complete_symbol(target_symbol.symbol.kind) {
        if !use_previous_if_at_end(&mut target_symbol) {
            return Ok(empty(false));
        }
        if do_not_complete_symbol(target_symbol.symbol.kind) {
            return Ok(empty(false));
        }
    }

    // When not dot-completing, collect the expected grammar symbols.
    let mut expects_identifier = false;
    let mut expected_symbols = Vec::new();
    if !dot_completion {
        let target_id = if target_symbol.relative_pos == RelativePosition::NewSymbolAfter
            && !target_symbol.symbol.is_eof()
        {
            target_symbol.symbol_id + 1
        } else {
            target_symbol.symbol_id
        };
        expected_symbols = parse_until(scanned, target_id);
        expects_identifier = expected_symbols.contains(&ExpectedSymbol::Identifier);

        // An inner dot as the previous symbol qualifies for dot completion
        // when an identifier is expected here.
        if let Some(previous) = previous_symbol {
            if previous.is_dot()
                && expects_identifier
                && matches!(
                    target_symbol.relative_pos,
                    RelativePosition::BeginOfSymbol
                        | RelativePosition::MidOfSymbol
                        | RelativePosition::EndOfSymbol
                )
            {
                dot_completion = true;
            }
        }
    }

    let mut engine = Engine {
        script,
        catalog,
        registry,
        cursor,
        scanned: scanned.as_ref(),
        parsed: script.parsed_script().map(|rc| &**rc),
        analyzed: script.analyzed_script().map(|rc| &**rc),
        strategy,
        target_symbol,
        candidates: Vec::new(),
        candidate_objects: Vec::new(),
        candidates_by_name: AHashMap::new(),
        candidate_objects_by_id: AHashMap::new(),
        heap: TopKHeap::with_capacity(k),
    };

    if dot_completion {
        engine.find_candidates_for_name_path();
    } else {
        engine.add_expected_keywords_as_candidates(&expected_symbols);
        if expects_identifier && strategy != CompletionStrategy::TableRefAlias {
            engine.find_candidates_in_indexes();
            engine.promote_tables_and_peers_for_unresolved_columns();
        }
    }
    engine.promote_identifiers_in_scope();
    if let Some(registry) = registry {
        engine.promote_identifiers_in_scripts(registry);
    }
    let mut top_candidates = engine.select_top_candidates();
    engine.qualify_top_candidates(&mut top_candidates);

    let cursor_at_identifier = matches!(target_symbol.symbol.kind, SymbolKind::Ident(_));
    if engine.registry.is_some()
        && (dot_completion
            || strategy == CompletionStrategy::ColumnRef
            || (cursor_at_identifier && strategy != CompletionStrategy::TableRefAlias))
    {
        engine.attach_snippets(&mut top_candidates);
    }

    log::debug!(
        "completion at {} via {:?}: {} candidates",
        cursor.text_offset,
        strategy,
        top_candidates.len()
    );
    Ok(Completion {
        text_offset: cursor.text_offset,
        strategy,
        dot_completion,
        candidates: top_candidates,
    })
}

impl<'a> Engine<'a> {
    fn name_text(&self, name: NameId) -> SmolStr {
        self.scanned.name_registry.borrow().get(name).text.clone()
    }

    /// The typed symbol prefix left of the cursor, trimmed of quotes.
    fn cursor_prefix(&self) -> SmolStr {
        let symbol = &self.target_symbol.symbol;
        let begin = symbol.location.offset as usize;
        let end = symbol.location.end() as usize;
        let cursor = self.target_symbol.text_offset.clamp(begin, end);
        let text = self.scanned.read_text_at(Location::new(
            begin as u32,
            (cursor - begin) as u32,
        ));
        SmolStr::new(text.trim_matches('"'))
    }

    fn match_prefix_tags(&self, candidate_text: &str, prefix: &str) -> CandidateTags {
        let mut tags = CandidateTags::NONE;
        if prefix.is_empty() {
            return tags;
        }
        if let Some(pos) = ci_find(candidate_text, prefix) {
            tags |= CandidateTags::SUBSTRING_MATCH;
            if pos == 0 {
                tags |= CandidateTags::PREFIX_MATCH;
            }
        }
        tags
    }

    fn upsert_candidate(
        &mut self,
        text: SmolStr,
        name_tags: NameTags,
        tags: CandidateTags,
        target_location: Location,
        target_location_qualified: Location,
    ) -> u32 {
        if let Some(&idx) = self.candidates_by_name.get(&text) {
            let candidate = &mut self.candidates[idx as usize];
            candidate.coarse_name_tags |= name_tags;
            candidate.candidate_tags |= tags;
            return idx;
        }
        let idx = self.candidates.len() as u32;
        self.candidates_by_name.insert(text.clone(), idx);
        self.candidates.push(Candidate {
            completion_text: text,
            coarse_name_tags: name_tags,
            candidate_tags: tags,
            target_location,
            target_location_qualified,
            objects: Vec::new(),
        });
        idx
    }

    /// Attach a catalog object to a candidate, merging tags on rehits.
    /// A catalog object belongs to at most one candidate.
    fn add_candidate_object(
        &mut self,
        candidate: u32,
        tags: CandidateTags,
        object_id: QualifiedCatalogObjectId,
    ) {
        if let Some(&idx) = self.candidate_objects_by_id.get(&object_id) {
            self.candidate_objects[idx as usize].candidate_tags |= tags;
            return;
        }
        let idx = self.candidate_objects.len() as u32;
        self.candidate_objects.push(CandidateObject {
            candidate,
            candidate_tags: tags,
            catalog_object_id: object_id,
        });
        self.candidates[candidate as usize].objects.push(idx);
        self.candidate_objects_by_id.insert(object_id, idx);
    }

    fn bump_object(&mut self, object_id: QualifiedCatalogObjectId, tag: CandidateTags) {
        if let Some(&idx) = self.candidate_objects_by_id.get(&object_id) {
            let object = &mut self.candidate_objects[idx as usize];
            object.candidate_tags |= tag;
            let candidate = object.candidate;
            self.candidates[candidate as usize].candidate_tags |= tag;
        }
    }

    // ---- keyword candidates --------------------------------------------

    /// Push expected grammar keywords directly into the result heap.
    /// They are deliberately not registered as candidates to not inflate
    /// the merged results.
    fn add_expected_keywords_as_candidates(&mut self, expected: &[ExpectedSymbol]) {
        let prefix = match self.target_symbol.relative_pos {
            RelativePosition::BeginOfSymbol
            | RelativePosition::MidOfSymbol
            | RelativePosition::EndOfSymbol => Some(self.cursor_prefix()),
            _ => None,
        };
        for symbol in expected {
            let ExpectedSymbol::Keyword(keyword) = symbol else {
                continue;
            };
            let name = keyword.name();
            let mut tags = CandidateTags::EXPECTED_PARSER_SYMBOL;
            tags |= match keyword.prevalence() {
                KeywordPrevalence::VeryPopular => CandidateTags::KEYWORD_VERY_POPULAR,
                KeywordPrevalence::Popular => CandidateTags::KEYWORD_POPULAR,
                KeywordPrevalence::Default => CandidateTags::KEYWORD_DEFAULT,
            };
            if let Some(prefix) = &prefix {
                tags |= self.match_prefix_tags(name, prefix);
            }
            let score = compute_candidate_score(tags);
            self.heap.insert(HeapCandidate {
                score,
                candidate: CompletionCandidate {
                    completion_text: SmolStr::new_static(name),
                    coarse_name_tags: NameTags::NONE,
                    candidate_tags: tags,
                    target_location: self.target_symbol.symbol.location,
                    target_location_qualified: self.target_symbol.symbol.location,
                    score,
                    prefer_qualified_tables: false,
                    prefer_qualified_columns: false,
                    catalog_objects: Vec::new(),
                },
            });
        }
    }

    // ---- dot completion ------------------------------------------------

    fn find_candidates_for_name_path(&mut self) {
        let Some(parsed) = self.parsed else { return };
        let Some(analyzed) = self.analyzed else { return };
        let cursor_location = self.cursor.text_offset as u32;
        let (path, path_location) = self.cursor.read_name_path(parsed);

        // Filter the path: count full names, find the sealed prefix and the
        // typed prefix of the component under the cursor.
        let mut name_count = 0usize;
        let mut sealed = 0usize;
        let mut last_text_prefix = SmolStr::default();
        let mut truncate_at = path_location.end();
        for component in &path {
            match component.kind {
                NameComponentKind::TrailingDot => {
                    truncate_at = component.location.offset + 1;
                    break;
                }
                NameComponentKind::Unknown => {
                    truncate_at = component.location.offset;
                    break;
                }
                NameComponentKind::Name => {}
            }
            if component.location.end() < cursor_location {
                sealed += 1;
                name_count += 1;
            } else {
                // The cursor points into this component; everything typed
                // strictly before the cursor is the match prefix.
                let text = self.scanned.read_text_at(component.location);
                let content_begin = text.len() - text.trim_start_matches('"').len();
                let content_offset = component.location.offset + content_begin as u32;
                let prefix_len =
                    cursor_location.max(content_offset) - content_offset;
                let content = &text[content_begin..];
                last_text_prefix =
                    SmolStr::new(&content[..(prefix_len as usize).min(content.len())]);
                truncate_at = component.location.offset;
                break;
            }
        }
        let path = &path[..name_count];

        let replace_text_at = Location::new(
            truncate_at,
            path_location.end().max(truncate_at) - truncate_at,
        );
        if path.is_empty() {
            return;
        }

        struct DotCandidate {
            name: SmolStr,
            candidate_tags: CandidateTags,
            name_tags: NameTags,
            object_id: QualifiedCatalogObjectId,
        }
        let mut dot_candidates: Vec<DotCandidate> = Vec::new();

        match self.cursor.context {
            CursorContext::TableRef { .. } => match sealed {
                1 => {
                    // `a._` : "a" may be a schema name or a database name.
                    let a_text = self.name_text(path[0].name.expect("name component"));
                    let mut tables = Vec::new();
                    analyzed.resolve_schema_tables_with_catalog(
                        self.catalog,
                        None,
                        &a_text,
                        &mut tables,
                    );
                    for (table, through_catalog) in tables {
                        let mut tags = CandidateTags::DOT_RESOLUTION_TABLE;
                        tags.add_if(CandidateTags::THROUGH_CATALOG, through_catalog);
                        dot_candidates.push(DotCandidate {
                            name: table.table_name.table_name.clone(),
                            candidate_tags: tags,
                            name_tags: NameTags::TABLE_NAME,
                            object_id: QualifiedCatalogObjectId::Table(table.catalog_table_id),
                        });
                    }
                    let mut schemas = Vec::new();
                    analyzed.resolve_database_schemas_with_catalog(
                        self.catalog,
                        &a_text,
                        &mut schemas,
                    );
                    for schema in schemas {
                        let mut tags = CandidateTags::DOT_RESOLUTION_SCHEMA;
                        tags.add_if(CandidateTags::THROUGH_CATALOG, schema.through_catalog);
                        dot_candidates.push(DotCandidate {
                            name: schema.schema_name.clone(),
                            candidate_tags: tags,
                            name_tags: NameTags::SCHEMA_NAME,
                            object_id: QualifiedCatalogObjectId::Schema(
                                schema.catalog_database_id,
                                schema.catalog_schema_id,
                            ),
                        });
                    }
                }
                2 => {
                    // `a.b._` : "a" must be a database, "b" a schema.
                    let a_text = self.name_text(path[0].name.expect("name component"));
                    let b_text = self.name_text(path[1].name.expect("name component"));
                    let mut tables = Vec::new();
                    analyzed.resolve_schema_tables_with_catalog(
                        self.catalog,
                        Some(&a_text),
                        &b_text,
                        &mut tables,
                    );
                    for (table, through_catalog) in tables {
                        let mut tags = CandidateTags::DOT_RESOLUTION_TABLE;
                        tags.add_if(CandidateTags::THROUGH_CATALOG, through_catalog);
                        dot_candidates.push(DotCandidate {
                            name: table.table_name.table_name.clone(),
                            candidate_tags: tags,
                            name_tags: NameTags::TABLE_NAME,
                            object_id: QualifiedCatalogObjectId::Table(table.catalog_table_id),
                        });
                    }
                }
                _ => {}
            },
            CursorContext::ColumnRef { .. } => {
                if sealed == 1 {
                    // `a._` : "a" might be a table alias in scope.
                    let a_text = self.name_text(path[0].name.expect("name component"));
                    for &scope_id in &self.cursor.name_scopes {
                        let scope = &analyzed.name_scopes[scope_id as usize];
                        let Some(&table_id) = scope.referenced_tables_by_name.get(&a_text)
                        else {
                            continue;
                        };
                        if let Some(declaration) =
                            resolve_table_in(&analyzed.entry, self.catalog, table_id)
                        {
                            let through_catalog =
                                table_id.origin() != self.script.catalog_entry_id();
                            for column in &declaration.table_columns {
                                let mut tags = CandidateTags::DOT_RESOLUTION_COLUMN;
                                tags.add_if(CandidateTags::THROUGH_CATALOG, through_catalog);
                                dot_candidates.push(DotCandidate {
                                    name: column.column_name.clone(),
                                    candidate_tags: tags,
                                    name_tags: NameTags::COLUMN_NAME,
                                    object_id: QualifiedCatalogObjectId::TableColumn(
                                        table_id,
                                        column.column_index,
                                    ),
                                });
                            }
                        }
                        break;
                    }
                }
            }
            CursorContext::None => {}
        }

        for mut dot_candidate in dot_candidates {
            if let Some(&idx) = self
                .candidate_objects_by_id
                .get(&dot_candidate.object_id)
            {
                // Merge tags and re-apply the replacement targets.
                let object = &mut self.candidate_objects[idx as usize];
                object.candidate_tags |= dot_candidate.candidate_tags;
                let candidate = &mut self.candidates[object.candidate as usize];
                candidate.target_location = replace_text_at;
                candidate.target_location_qualified = path_location;
                continue;
            }
            dot_candidate.candidate_tags |=
                self.match_prefix_tags(&dot_candidate.name, &last_text_prefix);
            let candidate = self.upsert_candidate(
                dot_candidate.name.clone(),
                dot_candidate.name_tags,
                dot_candidate.candidate_tags,
                replace_text_at,
                path_location,
            );
            // Dot candidates always re-apply the replacement targets.
            self.candidates[candidate as usize].target_location = replace_text_at;
            self.candidates[candidate as usize].target_location_qualified = path_location;
            self.add_candidate_object(
                candidate,
                dot_candidate.candidate_tags,
                dot_candidate.object_id,
            );
        }
    }

    // ---- identifier candidates -----------------------------------------

    fn find_candidates_in_indexes(&mut self) {
        let Some(analyzed) = self.analyzed else { return };
        self.find_candidates_in_index(analyzed, false);
        let own_id = self.script.catalog_entry_id();
        let catalog = self.catalog;
        for (entry_id, entry, _) in catalog.iterate_ranked() {
            if entry_id != own_id {
                self.find_candidates_in_index(entry, true);
            }
        }
    }

    fn find_candidates_in_index(&mut self, entry: &dyn CatalogEntry, through_catalog: bool) {
        // The cursor prefix; fall back to the full token when empty.
        let mut search_prefix = self.cursor_prefix();
        if search_prefix.is_empty() {
            let full = self
                .scanned
                .read_text_at(self.target_symbol.symbol.location);
            search_prefix = SmolStr::new(full.trim_matches('"'));
        }
        if search_prefix.is_empty() {
            return;
        }

        let in_symbol = matches!(
            self.target_symbol.relative_pos,
            RelativePosition::BeginOfSymbol
                | RelativePosition::MidOfSymbol
                | RelativePosition::EndOfSymbol
        );
        let cursor_prefix = self.cursor_prefix();

        struct IndexHit {
            text: SmolStr,
            name_tags: NameTags,
            tags: CandidateTags,
            objects: Vec<QualifiedCatalogObjectId>,
        }
        let mut hits: Vec<IndexHit> = Vec::new();
        {
            let index = entry.name_search_index();
            let names = entry.names();
            let mut seen: AHashSet<NameId> = AHashSet::new();
            for name_id in search_names(index, &search_prefix) {
                if !seen.insert(name_id) {
                    continue;
                }
                let name = names.get(name_id);
                // Skip the identifier the cursor itself is typing.
                if !through_catalog
                    && name.occurrences == 1
                    && self.target_symbol.text_offset >= name.location.offset as usize
                    && self.target_symbol.text_offset <= name.location.end() as usize
                {
                    continue;
                }
                let mut tags = CandidateTags::NAME_INDEX;
                tags.add_if(CandidateTags::THROUGH_CATALOG, through_catalog);
                if in_symbol {
                    tags |= CandidateTags::SUBSTRING_MATCH;
                    if ci_starts_with(&name.text, &cursor_prefix) {
                        tags |= CandidateTags::PREFIX_MATCH;
                    }
                }
                hits.push(IndexHit {
                    text: name.text.clone(),
                    name_tags: name.coarse_analyzer_tags,
                    tags,
                    objects: name.resolved_objects.clone(),
                });
            }
        }

        let target_location = self.target_symbol.symbol.location;
        for hit in hits {
            let candidate = self.upsert_candidate(
                hit.text,
                hit.name_tags,
                hit.tags,
                target_location,
                target_location,
            );
            for object_id in hit.objects {
                self.add_candidate_object(candidate, hit.tags, object_id);
            }
        }
    }

    // ---- promotion passes ----------------------------------------------

    /// OR `IN_NAME_SCOPE` into candidates for the columns of every resolved
    /// table-ref and column-ref in the cursor's scopes.
    fn promote_identifiers_in_scope(&mut self) {
        let Some(analyzed) = self.analyzed else { return };
        let cursor = self.cursor;
        for &scope_id in &cursor.name_scopes {
            let scope = &analyzed.name_scopes[scope_id as usize];
            for &table_ref_id in &scope.table_references {
                let table_ref = &analyzed.table_references[table_ref_id as usize];
                let TableReferenceInner::Resolved(resolved) = &table_ref.inner else {
                    continue;
                };
                let table_id = resolved.selected.catalog_table_id;
                let Some(declaration) = resolve_table_in(&analyzed.entry, self.catalog, table_id)
                else {
                    continue;
                };
                for column_id in 0..declaration.table_columns.len() as u32 {
                    self.bump_object(
                        QualifiedCatalogObjectId::TableColumn(table_id, column_id),
                        CandidateTags::IN_NAME_SCOPE,
                    );
                }
            }
            for &expression_id in &scope.expressions {
                let expression = &analyzed.expressions[expression_id as usize];
                if let ExpressionInner::ResolvedColumnRef(column_ref) = &expression.inner {
                    self.bump_object(
                        QualifiedCatalogObjectId::TableColumn(
                            column_ref.catalog_table_id,
                            column_ref.table_column_id,
                        ),
                        CandidateTags::IN_NAME_SCOPE,
                    );
                }
            }
        }
    }

    /// OR `IN_SAME_SCRIPT` / `IN_OTHER_SCRIPT` into candidate objects used
    /// by registered scripts.
    fn promote_identifiers_in_scripts(&mut self, registry: &ScriptRegistry) {
        let own_id = self.script.catalog_entry_id();
        let mut bumps: Vec<(QualifiedCatalogObjectId, CandidateTags)> = Vec::new();
        for (entry_id, analyzed) in registry.entries() {
            let tag = if entry_id == own_id {
                CandidateTags::IN_SAME_SCRIPT
            } else {
                CandidateTags::IN_OTHER_SCRIPT
            };
            for expression in &analyzed.expressions {
                if let ExpressionInner::ResolvedColumnRef(column_ref) = &expression.inner {
                    bumps.push((
                        QualifiedCatalogObjectId::TableColumn(
                            column_ref.catalog_table_id,
                            column_ref.table_column_id,
                        ),
                        tag,
                    ));
                }
            }
        }
        for (object_id, tag) in bumps {
            self.bump_object(object_id, tag);
        }
    }

    /// Promote tables that could resolve a still-unresolved column, and the
    /// peer columns of those tables.
    fn promote_tables_and_peers_for_unresolved_columns(&mut self) {
        let Some(analyzed) = self.analyzed else { return };
        if self.cursor.statement_id.is_none() {
            return;
        }
        let mut bumps: Vec<(QualifiedCatalogObjectId, CandidateTags)> = Vec::new();
        for &scope_id in &self.cursor.name_scopes {
            let scope = &analyzed.name_scopes[scope_id as usize];
            for &expression_id in &scope.expressions {
                let expression = &analyzed.expressions[expression_id as usize];
                let ExpressionInner::UnresolvedColumnRef(column_ref) = &expression.inner else {
                    continue;
                };
                if column_ref.column_name.is_empty() {
                    continue;
                }
                let mut columns = Vec::new();
                analyzed.resolve_table_columns_with_catalog(
                    self.catalog,
                    &column_ref.column_name,
                    &mut columns,
                );
                for (table, _) in columns {
                    bumps.push((
                        QualifiedCatalogObjectId::Table(table.catalog_table_id),
                        CandidateTags::RESOLVING_TABLE,
                    ));
                    for peer in 0..table.table_columns.len() as u32 {
                        bumps.push((
                            QualifiedCatalogObjectId::TableColumn(table.catalog_table_id, peer),
                            CandidateTags::UNRESOLVED_PEER,
                        ));
                    }
                }
            }
        }
        for (object_id, tag) in bumps {
            self.bump_object(object_id, tag);
        }
    }

    // ---- scoring & selection -------------------------------------------

    fn select_top_candidates(&mut self) -> Vec<CompletionCandidate> {
        #[derive(PartialEq, Eq)]
        struct ObjectRef {
            score: ScoreValue,
            object: std::cmp::Reverse<u32>,
        }
        impl PartialOrd for ObjectRef {
            fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
                Some(self.cmp(other))
            }
        }
        impl Ord for ObjectRef {
            fn cmp(&self, other: &Self) -> std::cmp::Ordering {
                self.score
                    .cmp(&other.score)
                    .then_with(|| self.object.cmp(&other.object))
            }
        }

        for candidate_idx in 0..self.candidates.len() {
            let candidate = &self.candidates[candidate_idx];
            let base_score = name_tag_score(self.strategy, candidate.coarse_name_tags);

            // Keep the best objects; the candidate's own score uses the
            // worst object that still fits.
            let mut object_heap: TopKHeap<ObjectRef> =
                TopKHeap::with_capacity(CANDIDATE_OBJECT_LIMIT);
            for &object_idx in &candidate.objects {
                let object = &self.candidate_objects[object_idx as usize];
                object_heap.insert(ObjectRef {
                    score: compute_candidate_score(object.candidate_tags),
                    object: std::cmp::Reverse(object_idx),
                });
            }
            let kept = object_heap.finish();
            let object_score = kept.last().map(|o| o.score).unwrap_or(0);
            let score = base_score + object_score;

            let catalog_objects = kept
                .into_iter()
                .map(|object_ref| {
                    let object = &self.candidate_objects[object_ref.object.0 as usize];
                    CompletionCandidateObject {
                        candidate_tags: object.candidate_tags,
                        catalog_object_id: object.catalog_object_id,
                        score: object_ref.score,
                        qualified_name: Vec::new(),
                        qualified_name_target_idx: 0,
                        prefer_qualified: false,
                        restriction_snippets: Vec::new(),
                        computation_snippets: Vec::new(),
                    }
                })
                .collect();

            let candidate = &self.candidates[candidate_idx];
            self.heap.insert(HeapCandidate {
                score,
                candidate: CompletionCandidate {
                    completion_text: candidate.completion_text.clone(),
                    coarse_name_tags: candidate.coarse_name_tags,
                    candidate_tags: candidate.candidate_tags,
                    target_location: candidate.target_location,
                    target_location_qualified: candidate.target_location_qualified,
                    score,
                    prefer_qualified_tables: false,
                    prefer_qualified_columns: false,
                    catalog_objects,
                },
            });
        }

        let heap = std::mem::replace(&mut self.heap, TopKHeap::with_capacity(1));
        heap.finish().into_iter().map(|h| h.candidate).collect()
    }

    // ---- qualification -------------------------------------------------

    fn qualified_table_name(name: &QualifiedTableName) -> Vec<SmolStr> {
        let mut parts = Vec::with_capacity(3);
        if !name.database_name.is_empty() {
            parts.push(name.database_name.clone());
        }
        if !parts.is_empty() || !name.schema_name.is_empty() {
            parts.push(name.schema_name.clone());
        }
        parts.push(name.table_name.clone());
        parts
    }

    fn qualify_top_candidates(&self, top_candidates: &mut [CompletionCandidate]) {
        let Some(analyzed) = self.analyzed else { return };

        // Remember column candidates by their table so that aliased
        // table-refs in scope can rewrite them below.
        let mut column_candidates_by_table: AHashMap<ContextObjectId, Vec<(usize, usize)>> =
            AHashMap::new();

        for (candidate_idx, candidate) in top_candidates.iter_mut().enumerate() {
            let mut column_count_in_scope = 0usize;
            let mut table_count = 0usize;
            for (object_idx, object) in candidate.catalog_objects.iter_mut().enumerate() {
                match object.catalog_object_id {
                    QualifiedCatalogObjectId::TableColumn(table_id, column_id) => {
                        if object.candidate_tags.contains(CandidateTags::IN_NAME_SCOPE) {
                            column_count_in_scope += 1;
                        }
                        column_candidates_by_table
                            .entry(table_id)
                            .or_default()
                            .push((candidate_idx, object_idx));
                        if let Some(declaration) =
                            resolve_table_in(&analyzed.entry, self.catalog, table_id)
                        {
                            let mut parts = Self::qualified_table_name(&declaration.table_name);
                            let column_name = declaration
                                .table_columns
                                .get(column_id as usize)
                                .map(|c| c.column_name.clone())
                                .unwrap_or_default();
                            parts.push(column_name);
                            object.qualified_name_target_idx = parts.len() - 1;
                            object.qualified_name = parts;
                        }
                    }
                    QualifiedCatalogObjectId::Table(table_id) => {
                        table_count += 1;
                        if let Some(declaration) =
                            resolve_table_in(&analyzed.entry, self.catalog, table_id)
                        {
                            let parts = Self::qualified_table_name(&declaration.table_name);
                            object.qualified_name_target_idx = parts.len() - 1;
                            object.qualified_name = parts;
                        }
                    }
                    _ => {}
                }
            }
            let prefer_qualified_columns = column_count_in_scope > 1;
            let prefer_qualified_tables = table_count > 1;
            candidate.prefer_qualified_tables = prefer_qualified_tables;
            candidate.prefer_qualified_columns = prefer_qualified_columns;
            for object in candidate.catalog_objects.iter_mut() {
                match object.catalog_object_id {
                    QualifiedCatalogObjectId::TableColumn(..) => {
                        object.prefer_qualified = prefer_qualified_columns;
                    }
                    QualifiedCatalogObjectId::Table(_) => {
                        object.prefer_qualified = prefer_qualified_tables;
                    }
                    _ => {}
                }
            }
        }

        // Aliased table-refs in scope qualify matching column candidates
        // as `alias.column`.
        for &scope_id in &self.cursor.name_scopes {
            let scope = &analyzed.name_scopes[scope_id as usize];
            for &table_ref_id in &scope.table_references {
                let table_ref = &analyzed.table_references[table_ref_id as usize];
                let TableReferenceInner::Resolved(resolved) = &table_ref.inner else {
                    continue;
                };
                let table_id = resolved.selected.catalog_table_id;
                let Some(matches) = column_candidates_by_table.remove(&table_id) else {
                    continue;
                };
                for (candidate_idx, object_idx) in matches {
                    let candidate = &mut top_candidates[candidate_idx];
                    let object = &mut candidate.catalog_objects[object_idx];
                    let QualifiedCatalogObjectId::TableColumn(_, column_id) =
                        object.catalog_object_id
                    else {
                        continue;
                    };
                    let column_name = resolve_table_in(&analyzed.entry, self.catalog, table_id)
                        .and_then(|declaration| {
                            declaration.table_columns.get(column_id as usize)
                        })
                        .map(|column| column.column_name.clone())
                        .unwrap_or_default();
                    if let Some(alias) = &table_ref.alias_name {
                        object.qualified_name = vec![alias.clone(), column_name];
                        object.qualified_name_target_idx = 1;
                        object.prefer_qualified = true;
                        candidate.prefer_qualified_columns = true;
                    } else if let Some(declaration) =
                        resolve_table_in(&analyzed.entry, self.catalog, table_id)
                    {
                        let mut parts = Self::qualified_table_name(&declaration.table_name);
                        parts.push(column_name);
                        object.qualified_name_target_idx = parts.len() - 1;
                        object.qualified_name = parts;
                    }
                }
            }
        }
    }

    // ---- snippets ------------------------------------------------------

    fn attach_snippets(&self, top_candidates: &mut [CompletionCandidate]) {
        let Some(registry) = self.registry else { return };
        for candidate in top_candidates.iter_mut() {
            for object in candidate.catalog_objects.iter_mut() {
                let QualifiedCatalogObjectId::TableColumn(table_id, column_id) =
                    object.catalog_object_id
                else {
                    continue;
                };
                object.restriction_snippets =
                    registry.collect_column_restrictions(table_id, column_id, None);
                object.computation_snippets =
                    registry.collect_column_computations(table_id, column_id, None);
            }
        }
    }
}

/// Re-locate a previous completion's candidate at the current cursor.
///
/// Editors call this to commit a suggestion across buffer edits; the
/// replacement targets are rebuilt from the current text.
pub(crate) fn select_candidate(
    cursor: &ScriptCursor,
    parsed: &ParsedScript,
    previous: &Completion,
    candidate_idx: usize,
    catalog_object_idx: Option<usize>,
) -> Result<Completion, StatusCode> {
    let Some(candidate) = previous.candidates.get(candidate_idx) else {
        return Err(StatusCode::CompletionCandidateInvalid);
    };
    if let Some(object_idx) = catalog_object_idx {
        if object_idx >= candidate.catalog_objects.len() {
            return Err(StatusCode::CompletionCatalogObjectInvalid);
        }
    }

    // Keywords have no continuation to re-locate.
    let keyword_mask = CandidateTags::KEYWORD_DEFAULT
        | CandidateTags::KEYWORD_POPULAR
        | CandidateTags::KEYWORD_VERY_POPULAR;
    if candidate.candidate_tags.0 & keyword_mask.0 != 0 {
        return Err(StatusCode::CompletionWithoutContinuation);
    }

    let compatible = match previous.strategy {
        CompletionStrategy::ColumnRef => {
            matches!(cursor.context, CursorContext::ColumnRef { .. })
        }
        CompletionStrategy::TableRef => {
            matches!(cursor.context, CursorContext::TableRef { .. })
        }
        CompletionStrategy::Default => {
            return Err(StatusCode::CompletionStateIncompatible);
        }
        CompletionStrategy::TableRefAlias => {
            return Err(StatusCode::CompletionStrategyUnknown);
        }
    };
    if !compatible {
        return Err(StatusCode::CompletionStateIncompatible);
    }

    // Re-read the name path and derive the new replacement targets: the
    // component under the cursor, or the last one.
    let (path, _) = cursor.read_name_path(parsed);
    let (mut target_location, path_location) = match path.last() {
        Some(last) => {
            let mut path_begin = u32::MAX;
            let mut path_end = 0u32;
            let mut target = last.location;
            for component in &path {
                if component.location.contains(cursor.text_offset as u32) {
                    target = component.location;
                }
                path_begin = path_begin.min(component.location.offset);
                path_end = path_end.max(component.location.end());
            }
            (target, Location::new(path_begin, path_end - path_begin))
        }
        None => (Location::default(), Location::default()),
    };
    if path.is_empty() {
        target_location = Location::zero_at(cursor.text_offset as u32);
    }

    let mut selected = candidate.clone();
    selected.target_location = target_location;
    selected.target_location_qualified = path_location;
    if let Some(object_idx) = catalog_object_idx {
        selected.catalog_objects = vec![selected.catalog_objects[object_idx].clone()];
    }
    Ok(Completion {
        text_offset: cursor.text_offset,
        strategy: previous.strategy,
        dot_completion: previous.dot_completion,
        candidates: vec![selected],
    })
}

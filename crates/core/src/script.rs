use std::rc::Rc;
use std::time::Instant;

use crate::analyzer::{self, AnalyzedScript};
use crate::catalog::{Catalog, CatalogEntryId};
use crate::completion::{self, Completion};
use crate::cursor::ScriptCursor;
use crate::parser::parser::{self as parser, ParsedScript};
use crate::parser::scanner::{self as scanner, ScannedScript};
use crate::registry::ScriptRegistry;
use crate::status::StatusCode;
use crate::text::rope::Rope;

/// Elapsed nanoseconds of the last pipeline stages.
#[derive(Debug, Clone, Copy, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ScriptProcessingTimings {
    pub scanner_last_elapsed: u64,
    pub parser_last_elapsed: u64,
    pub analyzer_last_elapsed: u64,
}

/// Estimated byte sizes of the script artifacts.
#[derive(Debug, Clone, Copy, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ScriptMemoryStatistics {
    pub rope_bytes: usize,
    pub scanner_input_bytes: usize,
    pub scanner_symbol_bytes: usize,
    pub scanner_name_dictionary_bytes: usize,
    pub parser_ast_bytes: usize,
    pub analyzer_description_bytes: usize,
    pub analyzer_name_index_size: usize,
}

#[derive(Debug, Clone, Copy, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ScriptStatistics {
    pub timings: ScriptProcessingTimings,
    pub memory: ScriptMemoryStatistics,
}

/// One SQL script: the rope plus the latest scanned, parsed and analyzed
/// artifacts.
///
/// Editing invalidates lazily: `scan` compares the rope's text version,
/// `parse` and `analyze` re-run iff their input is stale.
pub struct Script {
    catalog_entry_id: CatalogEntryId,
    catalog_instance: u64,
    text: Rope,
    scanned_script: Option<Rc<ScannedScript>>,
    parsed_script: Option<Rc<ParsedScript>>,
    analyzed_script: Option<Rc<AnalyzedScript>>,
    cursor: Option<ScriptCursor>,
    timings: ScriptProcessingTimings,
}

impl Script {
    pub fn new(catalog: &Catalog, catalog_entry_id: CatalogEntryId) -> Self {
        Self {
            catalog_entry_id,
            catalog_instance: catalog.instance_id(),
            text: Rope::new(),
            scanned_script: None,
            parsed_script: None,
            analyzed_script: None,
            cursor: None,
            timings: ScriptProcessingTimings::default(),
        }
    }

    pub fn catalog_entry_id(&self) -> CatalogEntryId {
        self.catalog_entry_id
    }

    pub(crate) fn catalog_instance_id(&self) -> u64 {
        self.catalog_instance
    }

    pub fn scanned_script(&self) -> Option<&Rc<ScannedScript>> {
        self.scanned_script.as_ref()
    }

    pub fn parsed_script(&self) -> Option<&Rc<ParsedScript>> {
        self.parsed_script.as_ref()
    }

    pub fn analyzed_script(&self) -> Option<&Rc<AnalyzedScript>> {
        self.analyzed_script.as_ref()
    }

    pub fn cursor(&self) -> Option<&ScriptCursor> {
        self.cursor.as_ref()
    }

    // ---- edits ---------------------------------------------------------

    pub fn insert_char_at(&mut self, char_idx: usize, codepoint: u32) {
        self.text.insert_char_at(char_idx, codepoint);
    }

    pub fn insert_text_at(&mut self, char_idx: usize, text: &str) {
        self.text.insert_text_at(char_idx, text);
    }

    pub fn erase_text_range(&mut self, char_idx: usize, count: usize) {
        self.text.erase_range(char_idx, count);
    }

    pub fn replace_text(&mut self, text: &str) {
        self.text.replace_all(text);
    }

    pub fn to_string(&self) -> String {
        self.text.to_string()
    }

    // ---- pipeline ------------------------------------------------------

    /// Scan the current rope text.
    /// A no-op when the text version did not change since the last scan.
    pub fn scan(&mut self) -> Result<&Rc<ScannedScript>, StatusCode> {
        let version = self.text.version();
        let stale = self
            .scanned_script
            .as_ref()
            .is_none_or(|scanned| scanned.text_version != version);
        if stale {
            let started = Instant::now();
            let scanned = scanner::scan(
                self.text.to_padded_string(),
                version,
                self.catalog_entry_id,
            );
            self.timings.scanner_last_elapsed = started.elapsed().as_nanos() as u64;
            self.scanned_script = Some(Rc::new(scanned));
        }
        Ok(self.scanned_script.as_ref().expect("scan stores a script"))
    }

    /// Parse the latest scanned script.
    pub fn parse(&mut self) -> Result<&Rc<ParsedScript>, StatusCode> {
        let Some(scanned) = &self.scanned_script else {
            return Err(StatusCode::ScriptNotScanned);
        };
        let stale = self
            .parsed_script
            .as_ref()
            .is_none_or(|parsed| !Rc::ptr_eq(&parsed.scanned_script, scanned));
        if stale {
            let started = Instant::now();
            let parsed = parser::parse(scanned);
            self.timings.parser_last_elapsed = started.elapsed().as_nanos() as u64;
            self.parsed_script = Some(Rc::new(parsed));
        }
        Ok(self.parsed_script.as_ref().expect("parse stores a script"))
    }

    /// Analyze the latest parsed script.
    ///
    /// With `parse_if_outdated`, the scan and parse re-run lazily first.
    /// Replacing a previous analysis resets the name registry's transient
    /// analyzer state.
    pub fn analyze(
        &mut self,
        catalog: &mut Catalog,
        parse_if_outdated: bool,
    ) -> Result<&Rc<AnalyzedScript>, StatusCode> {
        if self.catalog_instance != catalog.instance_id() {
            return Err(StatusCode::CatalogMismatch);
        }
        if parse_if_outdated {
            self.scan()?;
            self.parse()?;
        }
        let Some(parsed) = &self.parsed_script else {
            return Err(StatusCode::ScriptNotParsed);
        };
        if self.analyzed_script.is_some() {
            parsed
                .scanned_script
                .name_registry
                .borrow_mut()
                .reset_analyzer_state();
        }
        let started = Instant::now();
        let analyzed = analyzer::analyze(parsed, catalog);
        self.timings.analyzer_last_elapsed = started.elapsed().as_nanos() as u64;
        self.analyzed_script = Some(Rc::new(analyzed));
        Ok(self
            .analyzed_script
            .as_ref()
            .expect("analyze stores a script"))
    }

    // ---- cursor & completion -------------------------------------------

    pub fn move_cursor(&mut self, text_offset: usize) -> Result<&ScriptCursor, StatusCode> {
        let cursor = ScriptCursor::place(self, text_offset)?;
        self.cursor = Some(cursor);
        Ok(self.cursor.as_ref().expect("cursor was placed"))
    }

    pub fn complete_at_cursor(
        &self,
        catalog: &Catalog,
        limit: usize,
        registry: Option<&ScriptRegistry>,
    ) -> Result<Completion, StatusCode> {
        if self.catalog_instance != catalog.instance_id() {
            return Err(StatusCode::CatalogMismatch);
        }
        completion::compute(self, catalog, limit, registry)
    }

    /// Re-locate a candidate of a previous completion in the current text.
    pub fn select_completion_candidate_at_cursor(
        &self,
        previous: &Completion,
        candidate_idx: usize,
    ) -> Result<Completion, StatusCode> {
        let Some(cursor) = &self.cursor else {
            return Err(StatusCode::CompletionMissesCursor);
        };
        let Some(parsed) = &self.parsed_script else {
            return Err(StatusCode::ScriptNotParsed);
        };
        completion::select_candidate(cursor, parsed, previous, candidate_idx, None)
    }

    /// Like candidate selection, scoped to one catalog object.
    pub fn select_completion_catalog_object_at_cursor(
        &self,
        previous: &Completion,
        candidate_idx: usize,
        catalog_object_idx: usize,
    ) -> Result<Completion, StatusCode> {
        let Some(cursor) = &self.cursor else {
            return Err(StatusCode::CompletionMissesCursor);
        };
        let Some(parsed) = &self.parsed_script else {
            return Err(StatusCode::ScriptNotParsed);
        };
        completion::select_candidate(
            cursor,
            parsed,
            previous,
            candidate_idx,
            Some(catalog_object_idx),
        )
    }

    // ---- statistics ----------------------------------------------------

    pub fn statistics(&self) -> ScriptStatistics {
        let mut memory = ScriptMemoryStatistics {
            rope_bytes: self.text.byte_size(),
            ..Default::default()
        };
        if let Some(scanned) = &self.scanned_script {
            memory.scanner_input_bytes = scanned.text_len() + 2;
            memory.scanner_symbol_bytes = scanned.symbol_byte_size();
            memory.scanner_name_dictionary_bytes = scanned.name_registry.borrow().byte_size();
        }
        if let Some(parsed) = &self.parsed_script {
            memory.parser_ast_bytes = parsed.ast_byte_size();
        }
        if let Some(analyzed) = &self.analyzed_script {
            memory.analyzer_description_bytes = analyzed.byte_size();
            memory.analyzer_name_index_size = analyzed.name_search_index_size();
        }
        ScriptStatistics {
            timings: self.timings,
            memory,
        }
    }
}

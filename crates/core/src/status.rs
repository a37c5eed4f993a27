use thiserror::Error;

/// Status codes returned by the public surface.
///
/// Pipeline stages additionally collect per-location messages on their
/// outputs; a non-OK status is reserved for genuine usage errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StatusCode {
    #[error("ok")]
    Ok,

    #[error("script was not scanned")]
    ScriptNotScanned,
    #[error("script was not parsed")]
    ScriptNotParsed,
    #[error("script was not analyzed")]
    ScriptNotAnalyzed,

    #[error("catalog script was not analyzed")]
    CatalogScriptNotAnalyzed,
    #[error("catalog is null")]
    CatalogNull,
    #[error("script belongs to a different catalog")]
    CatalogMismatch,
    #[error("script is not registered in the catalog")]
    CatalogScriptUnknown,

    #[error("catalog entry id is already in use")]
    ExternalIdCollision,
    #[error("catalog ids are out of sync")]
    CatalogIdOutOfSync,
    #[error("descriptor pool is unknown")]
    CatalogDescriptorPoolUnknown,
    #[error("schema descriptor has no tables")]
    CatalogDescriptorTablesNull,
    #[error("schema descriptor contains an empty table name")]
    CatalogDescriptorTableNameEmpty,
    #[error("schema descriptor contains a duplicate table name")]
    CatalogDescriptorTableNameCollision,

    #[error("completion misses a cursor")]
    CompletionMissesCursor,
    #[error("completion misses a scanner token")]
    CompletionMissesScannerToken,
    #[error("completion state is incompatible with the cursor")]
    CompletionStateIncompatible,
    #[error("completion strategy is unknown")]
    CompletionStrategyUnknown,
    #[error("completion has no continuation")]
    CompletionWithoutContinuation,
    #[error("completion candidate is invalid")]
    CompletionCandidateInvalid,
    #[error("completion catalog object is invalid")]
    CompletionCatalogObjectInvalid,
    #[error("completion template is invalid")]
    CompletionTemplateInvalid,
}

pub mod analyzer;
pub mod catalog;
pub mod completion;
pub mod cursor;
pub mod parser;
pub mod registry;
pub mod script;
pub mod snippet;
pub mod status;
pub mod text;
pub mod utils;

pub use catalog::{Catalog, CatalogEntryId, ContextObjectId, QualifiedCatalogObjectId};
pub use completion::Completion;
pub use registry::ScriptRegistry;
pub use script::Script;
pub use status::StatusCode;

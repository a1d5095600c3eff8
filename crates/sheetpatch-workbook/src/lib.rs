//! Batch cell updates for spreadsheet files.
//!
//! [`WorkbookUpdater`] resolves an optional template and a destination through
//! [`PathResolver`], copies the template into place, writes every update into
//! the first sheet through a [`WorkbookBackend`], and saves only if the whole
//! batch succeeded.

pub mod backends;
pub mod config;
pub mod error;
pub mod resolver;
pub mod traits;
pub mod updater;

pub use backends::{JsonAdapter, JsonBackendError, UmyaAdapter};
pub use config::{BASE_DIR_ENV, BackendKind, RESOURCE_ROOT_ENV, UpdaterConfig};
pub use error::{CellUpdateCause, UpdateError};
pub use resolver::{
    BundledResources, DEFAULT_RESOURCE_PREFIX, FilesystemSource, Lookup, PathResolver,
    ResolvedDestination, TemplateOrigin, TemplateSource, TemplateStream,
};
pub use traits::WorkbookBackend;
pub use updater::{UpdateResult, WorkbookUpdater, XlsxUpdater, update_cells};

// Re-export for convenience
pub use sheetpatch_common::{AddressError, CellAddress, CellContent, coerce};

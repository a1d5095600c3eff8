use crate::backends::UmyaAdapter;
use crate::config::UpdaterConfig;
use crate::error::{CellUpdateCause, UpdateError};
use crate::resolver::{PathResolver, TemplateOrigin, TemplateStream};
use crate::traits::WorkbookBackend;
use serde::Serialize;
use serde_json::Value;
use sheetpatch_common::{CellAddress, coerce};
use std::fs::{self, File};
use std::io::{self, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateResult {
    /// Cells written, equal to the batch size on success.
    pub applied_count: usize,
    pub destination: PathBuf,
    /// Set when the destination was seeded from a template.
    pub template: Option<TemplateOrigin>,
}

/// Applies a batch of cell edits to the first sheet of a workbook and saves it.
///
/// The batch is fail-fast and all-or-nothing at the file level: the first
/// address or write failure aborts the call before anything is saved, so the
/// destination holds either its previous bytes or the freshly copied template.
///
/// There is no locking. Two calls targeting the same destination at the same
/// time can overwrite each other; callers must keep one mutation in flight per
/// destination path.
pub struct WorkbookUpdater<B: WorkbookBackend> {
    resolver: PathResolver,
    _backend: PhantomData<fn() -> B>,
}

pub type XlsxUpdater = WorkbookUpdater<UmyaAdapter>;

impl<B: WorkbookBackend> WorkbookUpdater<B> {
    pub fn new(resolver: PathResolver) -> Self {
        Self {
            resolver,
            _backend: PhantomData,
        }
    }

    pub fn from_config(config: &UpdaterConfig) -> Result<Self, UpdateError> {
        Ok(Self::new(PathResolver::from_config(config)?))
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    /// Seed `output` from `template` (when given), apply `updates` in iteration
    /// order, then save.
    ///
    /// Without a template the destination must already exist.
    pub fn apply<'a, I, K>(
        &self,
        template: Option<&str>,
        output: &str,
        updates: I,
    ) -> Result<UpdateResult, UpdateError>
    where
        I: IntoIterator<Item = (K, &'a Value)>,
        K: AsRef<str>,
    {
        let _span = tracing::info_span!("apply", backend = B::NAME, output).entered();

        let path = self.resolver.destination_path(output)?;

        let template = match template {
            Some(reference) => {
                let stream = self.resolver.resolve_source(reference)?;
                let origin = stream.origin.clone();
                match &origin {
                    TemplateOrigin::File(source) if same_file(source, &path) => {
                        // Truncating the destination would empty the template too.
                        drop(stream);
                        debug!(template = %origin, "template is the destination; updating in place");
                    }
                    _ => {
                        self.resolver.resolve_destination(output)?;
                        let bytes = copy_template(stream, &path)?;
                        info!(template = %origin, bytes, "destination seeded from template");
                    }
                }
                Some(origin)
            }
            None => {
                if !path.is_file() {
                    return Err(UpdateError::io(
                        &path,
                        io::Error::new(io::ErrorKind::NotFound, "workbook does not exist"),
                    ));
                }
                None
            }
        };

        let mut workbook =
            B::open_path(&path).map_err(|e| UpdateError::from_backend(B::NAME, &path, e))?;
        let sheet = workbook
            .first_sheet()
            .map_err(|e| UpdateError::from_backend(B::NAME, &path, e))?
            .ok_or_else(|| UpdateError::NoSheet { path: path.clone() })?;
        debug!(sheet = %sheet, "selected first sheet");

        let applied_count = apply_updates(&mut workbook, &sheet, updates)?;

        workbook
            .save_to_path(&path)
            .map_err(|e| UpdateError::from_backend(B::NAME, &path, e))?;
        info!(applied_count, "workbook saved");

        Ok(UpdateResult {
            applied_count,
            destination: path,
            template,
        })
    }
}

/// Write every update into `sheet`, stopping at the first failure.
fn apply_updates<'a, B, I, K>(workbook: &mut B, sheet: &str, updates: I) -> Result<usize, UpdateError>
where
    B: WorkbookBackend,
    I: IntoIterator<Item = (K, &'a Value)>,
    K: AsRef<str>,
{
    let mut applied = 0;
    for (key, value) in updates {
        let address = key.as_ref();
        let written = CellAddress::parse(address)
            .map_err(CellUpdateCause::from)
            .and_then(|addr| {
                workbook
                    .write_cell(sheet, addr, coerce(value))
                    .map_err(|e| CellUpdateCause::from_backend(B::NAME, e))
            });
        if let Err(cause) = written {
            warn!(address, error = %cause, applied, "cell update failed; batch aborted");
            return Err(UpdateError::CellUpdate {
                address: address.to_string(),
                source: cause,
            });
        }
        debug!(address, "cell updated");
        applied += 1;
    }
    Ok(applied)
}

/// Both paths exist and name the same file once symlinks and `..` are resolved.
fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Overwrite `dest` with the template bytes. The stream is dropped on return.
fn copy_template(mut template: TemplateStream, dest: &Path) -> Result<u64, UpdateError> {
    let mut file = File::create(dest).map_err(|e| UpdateError::io(dest, e))?;
    let bytes = io::copy(&mut template.reader, &mut file).map_err(|e| UpdateError::io(dest, e))?;
    file.flush().map_err(|e| UpdateError::io(dest, e))?;
    Ok(bytes)
}

/// Update an existing XLSX file in place, resolving relative paths against
/// the working directory. Returns the number of cells written.
pub fn update_cells<'a, I, K>(path: &str, updates: I) -> Result<usize, UpdateError>
where
    I: IntoIterator<Item = (K, &'a Value)>,
    K: AsRef<str>,
{
    let updater = XlsxUpdater::new(PathResolver::from_current_dir()?);
    Ok(updater.apply(None, path, updates)?.applied_count)
}

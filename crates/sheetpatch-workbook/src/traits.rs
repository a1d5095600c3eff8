use sheetpatch_common::{CellAddress, CellContent};
use std::path::Path;

/// Spreadsheet library seam used by the updater.
///
/// Implementations own the in-memory workbook; dropping the adapter releases
/// it together with any file handles.
pub trait WorkbookBackend: Sized + Send {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Short name used in logs and error messages.
    const NAME: &'static str;

    fn open_path<P: AsRef<Path>>(path: P) -> Result<Self, Self::Error>;

    /// Sheet names in workbook order.
    fn sheet_names(&mut self) -> Result<Vec<String>, Self::Error>;

    /// Write `content` at `addr`, creating the row and cell when absent.
    /// `CellContent::Blank` clears the cell.
    fn write_cell(
        &mut self,
        sheet: &str,
        addr: CellAddress,
        content: CellContent,
    ) -> Result<(), Self::Error>;

    /// `None` for cells that are absent or blank.
    fn read_cell(
        &mut self,
        sheet: &str,
        addr: CellAddress,
    ) -> Result<Option<CellContent>, Self::Error>;

    fn save_to_path<P: AsRef<Path>>(&mut self, path: P) -> Result<(), Self::Error>;

    fn first_sheet(&mut self) -> Result<Option<String>, Self::Error> {
        Ok(self.sheet_names()?.into_iter().next())
    }
}

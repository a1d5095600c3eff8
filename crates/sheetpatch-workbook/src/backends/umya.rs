use crate::traits::WorkbookBackend;
use sheetpatch_common::{CellAddress, CellContent};
use std::path::{Path, PathBuf};
use umya_spreadsheet::{CellRawValue, CellValue, Spreadsheet, XlsxError, reader::xlsx};

/// XLSX backend over `umya-spreadsheet`.
pub struct UmyaAdapter {
    workbook: Spreadsheet,
    original_path: Option<PathBuf>,
}

impl UmyaAdapter {
    /// Wrap an already built workbook (fixtures, in-memory pipelines).
    pub fn from_spreadsheet(workbook: Spreadsheet) -> Self {
        Self {
            workbook,
            original_path: None,
        }
    }

    pub fn original_path(&self) -> Option<&Path> {
        self.original_path.as_deref()
    }

    pub fn spreadsheet(&self) -> &Spreadsheet {
        &self.workbook
    }

    fn convert_cell_value(cv: &CellValue) -> Option<CellContent> {
        let raw = cv.get_raw_value();
        if raw.is_empty() {
            return None;
        }
        if raw.is_error() {
            // No error variant in CellContent; keep the Excel token as text.
            return Some(CellContent::Text(cv.get_value().to_string()));
        }
        match raw {
            CellRawValue::Numeric(n) => Some(CellContent::Number(*n)),
            CellRawValue::Bool(b) => Some(CellContent::Boolean(*b)),
            CellRawValue::String(s) => Some(CellContent::Text(s.to_string())),
            CellRawValue::RichText(rt) => Some(CellContent::Text(rt.get_text().to_string())),
            CellRawValue::Lazy(s) => {
                let txt: &str = s.as_ref();
                if let Ok(n) = txt.parse::<f64>() {
                    Some(CellContent::Number(n))
                } else if txt.eq_ignore_ascii_case("TRUE") {
                    Some(CellContent::Boolean(true))
                } else if txt.eq_ignore_ascii_case("FALSE") {
                    Some(CellContent::Boolean(false))
                } else {
                    Some(CellContent::Text(txt.to_string()))
                }
            }
            CellRawValue::Error(_) | CellRawValue::Empty => None,
        }
    }

    fn sheet_not_found(sheet: &str) -> XlsxError {
        XlsxError::CellError(format!("sheet `{sheet}` not found"))
    }

    /// Deserialize `sheet` if it exists. umya's by-name reader panics on an
    /// unknown name, so look the index up first.
    fn ensure_sheet(&mut self, sheet: &str) -> Result<(), XlsxError> {
        let index = self
            .workbook
            .get_sheet_collection_no_check()
            .iter()
            .position(|ws| ws.get_name() == sheet)
            .ok_or_else(|| Self::sheet_not_found(sheet))?;
        self.workbook.read_sheet(index);
        Ok(())
    }

    fn deserialize_all(&mut self) {
        let count = self.workbook.get_sheet_count();
        for i in 0..count {
            self.workbook.read_sheet(i);
        }
    }
}

impl WorkbookBackend for UmyaAdapter {
    type Error = XlsxError;

    const NAME: &'static str = "umya";

    fn open_path<P: AsRef<Path>>(path: P) -> Result<Self, Self::Error> {
        // Full read rather than lazy so saving never trips over undeserialized sheets.
        let workbook = xlsx::read(path.as_ref())?;
        Ok(Self {
            workbook,
            original_path: Some(path.as_ref().to_path_buf()),
        })
    }

    fn sheet_names(&mut self) -> Result<Vec<String>, Self::Error> {
        let count = self.workbook.get_sheet_count();
        let mut names = Vec::with_capacity(count);
        for i in 0..count {
            self.workbook.read_sheet(i);
            if let Some(s) = self.workbook.get_sheet(&i) {
                names.push(s.get_name().to_string());
            }
        }
        Ok(names)
    }

    fn write_cell(
        &mut self,
        sheet: &str,
        addr: CellAddress,
        content: CellContent,
    ) -> Result<(), Self::Error> {
        self.ensure_sheet(sheet)?;
        let ws = self
            .workbook
            .get_sheet_by_name_mut(sheet)
            .ok_or_else(|| Self::sheet_not_found(sheet))?;
        // umya indexes cells as 1-based (col, row) and creates them on demand
        let cell = ws.get_cell_mut(addr.to_excel_tuple());
        match content {
            CellContent::Blank => {
                cell.set_blank();
            }
            CellContent::Text(s) => {
                cell.set_value_string(s);
            }
            CellContent::Number(n) => {
                cell.set_value_number(n);
            }
            CellContent::Boolean(b) => {
                cell.set_value_bool(b);
            }
        }
        Ok(())
    }

    fn read_cell(
        &mut self,
        sheet: &str,
        addr: CellAddress,
    ) -> Result<Option<CellContent>, Self::Error> {
        self.ensure_sheet(sheet)?;
        let ws = self
            .workbook
            .get_sheet_by_name(sheet)
            .ok_or_else(|| Self::sheet_not_found(sheet))?;
        Ok(ws
            .get_cell(addr.to_excel_tuple())
            .and_then(|cell| Self::convert_cell_value(cell.get_cell_value())))
    }

    fn save_to_path<P: AsRef<Path>>(&mut self, path: P) -> Result<(), Self::Error> {
        self.deserialize_all();
        umya_spreadsheet::writer::xlsx::write(&self.workbook, path.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read_in_memory() {
        let mut adapter = UmyaAdapter::from_spreadsheet(umya_spreadsheet::new_file());
        assert_eq!(adapter.sheet_names().unwrap(), vec!["Sheet1".to_string()]);

        let a1 = CellAddress::new(0, 0);
        let b2 = CellAddress::new(1, 1);
        adapter.write_cell("Sheet1", a1, "123".into()).unwrap();
        adapter.write_cell("Sheet1", b2, 10.0.into()).unwrap();

        assert_eq!(
            adapter.read_cell("Sheet1", a1).unwrap(),
            Some(CellContent::Text("123".into()))
        );
        assert_eq!(
            adapter.read_cell("Sheet1", b2).unwrap(),
            Some(CellContent::Number(10.0))
        );
        assert_eq!(adapter.read_cell("Sheet1", CellAddress::new(9, 9)).unwrap(), None);

        adapter.write_cell("Sheet1", b2, CellContent::Blank).unwrap();
        assert_eq!(adapter.read_cell("Sheet1", b2).unwrap(), None);
    }

    #[test]
    fn unknown_sheet_is_an_error() {
        let mut adapter = UmyaAdapter::from_spreadsheet(umya_spreadsheet::new_file());
        let err = adapter
            .write_cell("Missing", CellAddress::new(0, 0), true.into())
            .unwrap_err();
        assert!(err.to_string().contains("Missing"), "{err}");

        let err = adapter
            .read_cell("Missing", CellAddress::new(0, 0))
            .unwrap_err();
        assert!(err.to_string().contains("Missing"), "{err}");
    }

    #[test]
    fn unknown_sheet_after_reopen_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book.xlsx");
        umya_spreadsheet::writer::xlsx::write(&umya_spreadsheet::new_file(), &path).unwrap();

        let mut adapter = UmyaAdapter::open_path(&path).unwrap();
        assert!(adapter.read_cell("Nope", CellAddress::new(0, 0)).is_err());
        assert!(
            adapter
                .write_cell("Nope", CellAddress::new(0, 0), 1.0.into())
                .is_err()
        );
        adapter
            .write_cell("Sheet1", CellAddress::new(0, 0), 1.0.into())
            .unwrap();
    }
}

use crate::traits::WorkbookBackend;
use serde::{Deserialize, Serialize};
use sheetpatch_common::{CellAddress, CellContent};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum JsonBackendError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("sheet `{0}` not found")]
    MissingSheet(String),
}

#[derive(Serialize, Deserialize, Debug, Clone)]
struct JsonWorkbook {
    #[serde(default = "default_version")]
    version: u32,
    #[serde(default)]
    sheets: Vec<JsonSheet>,
}

fn default_version() -> u32 {
    1
}

#[derive(Serialize, Deserialize, Debug, Clone)]
struct JsonSheet {
    name: String,
    #[serde(default)]
    cells: Vec<JsonCell>,
}

/// Rows and columns are stored 1-based, as a spreadsheet user reads them.
#[derive(Serialize, Deserialize, Debug, Clone)]
struct JsonCell {
    row: u32,
    col: u32,
    value: JsonValue,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", content = "value")]
enum JsonValue {
    Number(f64),
    Text(String),
    Boolean(bool),
}

impl From<JsonValue> for CellContent {
    fn from(value: JsonValue) -> Self {
        match value {
            JsonValue::Number(n) => CellContent::Number(n),
            JsonValue::Text(s) => CellContent::Text(s),
            JsonValue::Boolean(b) => CellContent::Boolean(b),
        }
    }
}

/// Workbook persisted as a JSON document with ordered sheets.
///
/// ```json
/// {"version":1,"sheets":[{"name":"Sheet1","cells":[
///   {"row":1,"col":1,"value":{"type":"Text","value":"X"}}]}]}
/// ```
#[derive(Debug)]
pub struct JsonAdapter {
    data: JsonWorkbook,
    path: Option<PathBuf>,
}

impl Default for JsonAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonAdapter {
    /// Empty workbook with no sheets.
    pub fn new() -> Self {
        Self {
            data: JsonWorkbook {
                version: default_version(),
                sheets: Vec::new(),
            },
            path: None,
        }
    }

    /// Append a sheet unless one with this name already exists.
    pub fn add_sheet(&mut self, name: &str) -> &mut Self {
        if !self.data.sheets.iter().any(|s| s.name == name) {
            self.data.sheets.push(JsonSheet {
                name: name.to_string(),
                cells: Vec::new(),
            });
        }
        self
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn to_json_string(&self) -> Result<String, JsonBackendError> {
        Ok(serde_json::to_string_pretty(&self.data)?)
    }

    fn sheet_mut(&mut self, name: &str) -> Result<&mut JsonSheet, JsonBackendError> {
        self.data
            .sheets
            .iter_mut()
            .find(|s| s.name == name)
            .ok_or_else(|| JsonBackendError::MissingSheet(name.to_string()))
    }
}

impl WorkbookBackend for JsonAdapter {
    type Error = JsonBackendError;

    const NAME: &'static str = "json";

    fn open_path<P: AsRef<Path>>(path: P) -> Result<Self, Self::Error> {
        let file = File::open(path.as_ref())?;
        let data: JsonWorkbook = serde_json::from_reader(BufReader::new(file))?;
        Ok(Self {
            data,
            path: Some(path.as_ref().to_path_buf()),
        })
    }

    fn sheet_names(&mut self) -> Result<Vec<String>, Self::Error> {
        Ok(self.data.sheets.iter().map(|s| s.name.clone()).collect())
    }

    fn write_cell(
        &mut self,
        sheet: &str,
        addr: CellAddress,
        content: CellContent,
    ) -> Result<(), Self::Error> {
        let (col, row) = addr.to_excel_tuple();
        let ws = self.sheet_mut(sheet)?;
        let existing = ws.cells.iter().position(|c| c.row == row && c.col == col);
        let value = match content {
            CellContent::Blank => {
                if let Some(idx) = existing {
                    ws.cells.remove(idx);
                }
                return Ok(());
            }
            CellContent::Number(n) => JsonValue::Number(n),
            CellContent::Text(s) => JsonValue::Text(s),
            CellContent::Boolean(b) => JsonValue::Boolean(b),
        };
        match existing {
            Some(idx) => ws.cells[idx].value = value,
            None => ws.cells.push(JsonCell { row, col, value }),
        }
        Ok(())
    }

    fn read_cell(
        &mut self,
        sheet: &str,
        addr: CellAddress,
    ) -> Result<Option<CellContent>, Self::Error> {
        let (col, row) = addr.to_excel_tuple();
        let ws = self.sheet_mut(sheet)?;
        Ok(ws
            .cells
            .iter()
            .find(|c| c.row == row && c.col == col)
            .map(|c| c.value.clone().into()))
    }

    fn save_to_path<P: AsRef<Path>>(&mut self, path: P) -> Result<(), Self::Error> {
        for sheet in &mut self.data.sheets {
            sheet.cells.sort_by_key(|c| (c.row, c.col));
        }
        let mut writer = BufWriter::new(File::create(path.as_ref())?);
        serde_json::to_writer_pretty(&mut writer, &self.data)?;
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_shape() {
        let mut adapter = JsonAdapter::new();
        adapter.add_sheet("Sheet1");
        adapter
            .write_cell("Sheet1", CellAddress::new(0, 0), 42.0.into())
            .unwrap();

        let v: serde_json::Value = serde_json::from_str(&adapter.to_json_string().unwrap()).unwrap();
        assert_eq!(v["sheets"][0]["name"], "Sheet1");
        assert_eq!(v["sheets"][0]["cells"][0]["row"], 1);
        assert_eq!(v["sheets"][0]["cells"][0]["col"], 1);
        assert_eq!(v["sheets"][0]["cells"][0]["value"]["type"], "Number");
        assert_eq!(v["sheets"][0]["cells"][0]["value"]["value"], 42.0);
    }

    #[test]
    fn overwrite_and_clear() {
        let mut adapter = JsonAdapter::new();
        adapter.add_sheet("Data").add_sheet("Data");
        assert_eq!(adapter.sheet_names().unwrap(), vec!["Data".to_string()]);

        let c3 = CellAddress::new(2, 2);
        adapter.write_cell("Data", c3, "a".into()).unwrap();
        adapter.write_cell("Data", c3, false.into()).unwrap();
        assert_eq!(
            adapter.read_cell("Data", c3).unwrap(),
            Some(CellContent::Boolean(false))
        );
        adapter.write_cell("Data", c3, CellContent::Blank).unwrap();
        assert_eq!(adapter.read_cell("Data", c3).unwrap(), None);

        assert!(matches!(
            adapter.read_cell("Nope", c3),
            Err(JsonBackendError::MissingSheet(name)) if name == "Nope"
        ));
    }

    #[test]
    fn file_roundtrip_keeps_sheet_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book.json");

        let mut adapter = JsonAdapter::new();
        adapter.add_sheet("Zeta").add_sheet("Alpha");
        adapter
            .write_cell("Zeta", CellAddress::new(1, 1), "x".into())
            .unwrap();
        adapter.save_to_path(&path).unwrap();

        let mut reopened = JsonAdapter::open_path(&path).unwrap();
        assert_eq!(reopened.path(), Some(path.as_path()));
        assert_eq!(reopened.first_sheet().unwrap().as_deref(), Some("Zeta"));
        assert_eq!(
            reopened.read_cell("Zeta", CellAddress::new(1, 1)).unwrap(),
            Some(CellContent::Text("x".into()))
        );
    }
}

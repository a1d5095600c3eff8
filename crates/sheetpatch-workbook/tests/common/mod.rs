#![allow(dead_code)]

use sheetpatch_workbook::{CellAddress, CellContent, UmyaAdapter, WorkbookBackend};
use std::path::{Path, PathBuf};

/// Write a fresh single-sheet XLSX under `dir` after letting `f` populate it.
pub fn build_workbook<F>(dir: &Path, name: &str, f: F) -> PathBuf
where
    F: FnOnce(&mut umya_spreadsheet::Spreadsheet),
{
    let path = dir.join(name);
    let mut book = umya_spreadsheet::new_file();
    f(&mut book);
    umya_spreadsheet::writer::xlsx::write(&book, &path).expect("write fixture xlsx");
    path
}

pub fn empty_workbook(dir: &Path, name: &str) -> PathBuf {
    build_workbook(dir, name, |_| {})
}

/// Reopen `path` and read one cell of its first sheet.
pub fn read_back(path: &Path, address: &str) -> Option<CellContent> {
    let mut adapter = UmyaAdapter::open_path(path).expect("reopen xlsx");
    let sheet = adapter.first_sheet().unwrap().expect("first sheet");
    adapter
        .read_cell(&sheet, CellAddress::parse(address).unwrap())
        .unwrap()
}

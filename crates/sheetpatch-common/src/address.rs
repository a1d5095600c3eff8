//! A1-style cell addresses.
//!
//! `CellAddress` is the zero-based (row, column) pair behind a string such as
//! `"AB123"`. Columns use bijective base-26 letters (`A` = 1 … `Z` = 26, no
//! zero digit) and rows are 1-based decimal numbers, both shifted down by one.
//! Bounds follow Excel: 1,048,576 rows × 16,384 columns (`XFD`).

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Number of addressable rows (1-based maximum).
pub const ROW_LIMIT: u32 = 1 << 20;
/// Number of addressable columns (1-based maximum, `XFD`).
pub const COL_LIMIT: u32 = 1 << 14;

/// Errors produced while parsing an address string.
///
/// Every variant carries the offending input verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("invalid cell address `{0}`: expected column letters followed by a row number")]
    Malformed(String),
    #[error("invalid cell address `{0}`: row numbers start at 1")]
    ZeroRow(String),
    #[error("invalid cell address `{0}`: row exceeds 1048576")]
    RowOutOfRange(String),
    #[error("invalid cell address `{0}`: column is past XFD")]
    ColumnOutOfRange(String),
}

impl AddressError {
    /// The address string that failed to parse.
    pub fn address(&self) -> &str {
        match self {
            AddressError::Malformed(a)
            | AddressError::ZeroRow(a)
            | AddressError::RowOutOfRange(a)
            | AddressError::ColumnOutOfRange(a) => a,
        }
    }
}

/// Zero-based cell coordinate.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct CellAddress {
    pub row: u32,
    pub col: u32,
}

impl CellAddress {
    pub const fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    /// Parse `"B2"` into `CellAddress { row: 1, col: 1 }`.
    ///
    /// Letters are matched case-insensitively and the row part may carry
    /// leading zeros (`"a01"` parses like `"A1"`); [`Display`](fmt::Display)
    /// emits the canonical upper-case, zero-free form.
    pub fn parse(address: &str) -> Result<Self, AddressError> {
        let split = address
            .bytes()
            .position(|b| !b.is_ascii_alphabetic())
            .unwrap_or(address.len());
        let (letters, digits) = address.split_at(split);

        if letters.is_empty() || digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(AddressError::Malformed(address.to_string()));
        }
        if digits.bytes().all(|b| b == b'0') {
            return Err(AddressError::ZeroRow(address.to_string()));
        }

        let col = column_index(letters)
            .ok_or_else(|| AddressError::ColumnOutOfRange(address.to_string()))?;
        let row = digits
            .parse::<u32>()
            .ok()
            .filter(|r| *r <= ROW_LIMIT)
            .ok_or_else(|| AddressError::RowOutOfRange(address.to_string()))?;

        Ok(Self { row: row - 1, col })
    }

    /// Non-failing probe: `true` when [`CellAddress::parse`] would succeed.
    pub fn is_valid(address: &str) -> bool {
        Self::parse(address).is_ok()
    }

    /// 1-based `(col, row)` pair, the order umya-spreadsheet indexes cells by.
    pub fn to_excel_tuple(self) -> (u32, u32) {
        (self.col + 1, self.row + 1)
    }
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", column_letters(self.col), self.row + 1)
    }
}

impl FromStr for CellAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<CellAddress> for (u32, u32) {
    fn from(addr: CellAddress) -> Self {
        (addr.row, addr.col)
    }
}

/// Zero-based column index to letters: `0 -> "A"`, `26 -> "AA"`.
pub fn column_letters(mut col: u32) -> String {
    let mut buf = Vec::new();
    loop {
        buf.push(b'A' + (col % 26) as u8);
        col /= 26;
        if col == 0 {
            break;
        }
        col -= 1;
    }
    buf.reverse();
    buf.into_iter().map(char::from).collect()
}

/// Letters to zero-based column index. `None` for empty input, non-letters,
/// or a column past `XFD`.
pub fn column_index(letters: &str) -> Option<u32> {
    if letters.is_empty() {
        return None;
    }
    let mut acc: u32 = 0;
    for ch in letters.bytes() {
        if !ch.is_ascii_alphabetic() {
            return None;
        }
        let digit = (ch.to_ascii_uppercase() - b'A') as u32 + 1;
        acc = acc.checked_mul(26)?.checked_add(digit)?;
        if acc > COL_LIMIT {
            return None;
        }
    }
    Some(acc - 1)
}

use crate::core::{Result, TimelockError};
use serde::{Deserialize, Serialize};

/// A cell and one of its timestamps, as returned by a sweep page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellTsPairInfo {
    pub row_name: Vec<u8>,
    pub col_name: Vec<u8>,
    pub ts: u64,
}

impl CellTsPairInfo {
    pub fn new(row_name: impl Into<Vec<u8>>, col_name: impl Into<Vec<u8>>, ts: u64) -> Self {
        Self {
            row_name: row_name.into(),
            col_name: col_name.into(),
            ts,
        }
    }
}

/// Where the next sweep page starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellTsPairToken {
    pub start_row_inclusive: Vec<u8>,
    #[serde(default)]
    pub start_col_inclusive: Vec<u8>,
    #[serde(default)]
    pub start_ts_inclusive: Option<u64>,
    #[serde(default)]
    pub reached_end: bool,
}

impl CellTsPairToken {
    /// Starts at the beginning of `start_row_inclusive`.
    pub fn start_row(start_row_inclusive: impl Into<Vec<u8>>) -> Self {
        Self {
            start_row_inclusive: start_row_inclusive.into(),
            start_col_inclusive: Vec::new(),
            start_ts_inclusive: None,
            reached_end: false,
        }
    }

    /// Continues just after `last_result` within the same cell.
    ///
    /// A record at `u64::MAX` has no successor timestamp, so it is rejected
    /// before any further page is requested.
    pub fn continue_row(last_result: &CellTsPairInfo) -> Result<Self> {
        if last_result.ts == u64::MAX {
            return Err(TimelockError::IllegalState(
                "Illegal timestamp MAX_VALUE".to_string(),
            ));
        }
        Ok(Self {
            start_row_inclusive: last_result.row_name.clone(),
            start_col_inclusive: last_result.col_name.clone(),
            start_ts_inclusive: Some(last_result.ts + 1),
            reached_end: false,
        })
    }

    /// Terminal token: nothing left to sweep.
    pub fn end() -> Self {
        Self {
            start_row_inclusive: Vec::new(),
            start_col_inclusive: Vec::new(),
            start_ts_inclusive: None,
            reached_end: true,
        }
    }
}

/// Derives the token for the page after `page`.
///
/// A short page means the table is exhausted.
pub fn next_token(page: &[CellTsPairInfo], page_size: usize) -> Result<CellTsPairToken> {
    match page.last() {
        Some(last) if page.len() >= page_size => CellTsPairToken::continue_row(last),
        _ => Ok(CellTsPairToken::end()),
    }
}

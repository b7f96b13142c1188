use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::MuxError;

/// Rows by columns pane grid, written `RxC`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GridSpec {
    pub rows: u32,
    pub columns: u32,
}

impl Default for GridSpec {
    fn default() -> Self {
        Self {
            rows: 2,
            columns: 2,
        }
    }
}

impl GridSpec {
    pub fn new(rows: u32, columns: u32) -> Result<Self, MuxError> {
        if rows == 0 || columns == 0 {
            return Err(MuxError::validation(format!(
                "grid must be at least 1x1, got {rows}x{columns}"
            )));
        }
        Ok(Self { rows, columns })
    }

    pub fn parse(raw: &str) -> Result<Self, MuxError> {
        let spec = raw.trim().to_ascii_lowercase();
        let invalid = || MuxError::validation(format!("invalid grid {raw:?} (expected RxC, e.g. 2x3)"));
        let (r, c) = spec.split_once('x').ok_or_else(invalid)?;
        let rows: u32 = r.trim().parse().map_err(|_| invalid())?;
        let columns: u32 = c.trim().parse().map_err(|_| invalid())?;
        Self::new(rows, columns)
    }

    pub fn pane_count(self) -> usize {
        self.rows as usize * self.columns as usize
    }
}

impl fmt::Display for GridSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.rows, self.columns)
    }
}

impl FromStr for GridSpec {
    type Err = MuxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for GridSpec {
    type Error = MuxError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<GridSpec> for String {
    fn from(value: GridSpec) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rows_by_columns() {
        let g = GridSpec::parse("2x3").expect("2x3");
        assert_eq!((g.rows, g.columns), (2, 3));
        assert_eq!(g.pane_count(), 6);
        assert_eq!(GridSpec::parse(" 1X4 ").expect("1X4").pane_count(), 4);
    }

    #[test]
    fn rejects_malformed() {
        for bad in ["", "2", "x3", "2x", "0x2", "2x0", "-1x2", "ax2", "2x3x4", "2*3"] {
            let err = GridSpec::parse(bad).expect_err(bad);
            assert!(matches!(err, MuxError::Validation(_)), "{bad}: {err}");
        }
    }

    #[test]
    fn default_and_display() {
        assert_eq!(GridSpec::default().to_string(), "2x2");
        assert_eq!("3x1".parse::<GridSpec>().expect("parse").to_string(), "3x1");
    }
}

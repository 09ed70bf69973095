// ⏳ Identifier Era Selector
//
// Paper ids encode their submission month in one of two formats:
//   new: YYMM.NNNNN        (2008 onwards, 2007 partially)
//   old: archive/YYMMNNN   (up to 2007)
// Both formats coexist only in the boundary year.

use rusqlite::types::Value;
use serde::{Deserialize, Serialize};

/// Only year in which both identifier formats were issued
pub const BOUNDARY_YEAR: i32 = 2007;

// ============================================================================
// ID FORMAT
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IdFormat {
    /// `YYMM.NNNNN`
    New,
    /// `archive/YYMMNNN`
    Old,
}

// ============================================================================
// ERA DISPATCH
// ============================================================================

/// Which identifier formats a year can contain, decided once per request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EraDispatch {
    NewEraOnly,
    OldEraOnly,
    BoundaryMerge,
}

impl EraDispatch {
    pub fn for_year(year: i32) -> EraDispatch {
        if year > BOUNDARY_YEAR {
            EraDispatch::NewEraOnly
        } else if year < BOUNDARY_YEAR {
            EraDispatch::OldEraOnly
        } else {
            EraDispatch::BoundaryMerge
        }
    }

    pub fn formats(&self) -> &'static [IdFormat] {
        match self {
            EraDispatch::NewEraOnly => &[IdFormat::New],
            EraDispatch::OldEraOnly => &[IdFormat::Old],
            EraDispatch::BoundaryMerge => &[IdFormat::New, IdFormat::Old],
        }
    }
}

/// Two-digit year as it appears in a paper id
pub fn year_prefix(year: i32) -> String {
    format!("{:02}", year.rem_euclid(100))
}

// ============================================================================
// ERA PREDICATE
// ============================================================================

/// Filter over paper ids selecting one month, or a whole year
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EraPredicate {
    pub year: i32,
    pub month: Option<u32>,
    pub dispatch: EraDispatch,
}

impl EraPredicate {
    pub fn new(year: i32, month: Option<u32>) -> Self {
        EraPredicate {
            year,
            month,
            dispatch: EraDispatch::for_year(year),
        }
    }

    /// `YYMM` for monthly requests, `YY` for yearly ones
    pub fn period_prefix(&self) -> String {
        match self.month {
            Some(month) => format!("{}{:02}", year_prefix(self.year), month),
            None => year_prefix(self.year),
        }
    }

    pub fn matches(&self, paper_id: &str) -> bool {
        let prefix = self.period_prefix();
        self.dispatch.formats().iter().any(|format| match format {
            IdFormat::New => paper_id.starts_with(&prefix),
            IdFormat::Old => paper_id.contains(&format!("/{}", prefix)),
        })
    }

    /// Parameterised SQL condition over `column`, OR-ing one clause per format
    pub fn sql_condition(&self, column: &str) -> (String, Vec<Value>) {
        let prefix = self.period_prefix();
        let mut clauses = Vec::new();
        let mut params = Vec::new();

        for format in self.dispatch.formats() {
            match format {
                IdFormat::New => {
                    clauses.push(format!("substr({}, 1, {}) = ?", column, prefix.len()));
                    params.push(Value::Text(prefix.clone()));
                }
                IdFormat::Old => {
                    clauses.push(format!("instr({}, ?) > 0", column));
                    params.push(Value::Text(format!("/{}", prefix)));
                }
            }
        }

        (format!("({})", clauses.join(" OR ")), params)
    }
}

// ============================================================================
// TESTS
// ============================================================================

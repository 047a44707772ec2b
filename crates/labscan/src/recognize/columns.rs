//! Column-role inference for detected tables.
//!
//! Identifying which column holds test names, values, and units is a
//! classification problem over column statistics; it is implemented as a
//! pure function so it can be tested without any table detection in play.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::catalog::ReferenceCatalog;

/// Keyword sets matched against column headers.
const NAME_INDICATORS: &[&str] = &["test", "parameter", "name", "analyte", "component"];
const VALUE_INDICATORS: &[&str] = &["value", "result", "level", "concentration", "amount"];
const UNIT_INDICATORS: &[&str] = &["unit", "units", "measurement", "uom"];

/// Statistical-inference thresholds: fraction of data cells that must look
/// like a value / test name / unit before a column is assigned that role.
const NUMERIC_FRACTION_MIN: f64 = 0.7;
const TEST_NAME_FRACTION_MIN: f64 = 0.3;
const UNIT_FRACTION_MIN: f64 = 0.5;

static NUMERIC_CELL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+(?:\.\d+)?$").expect("invalid numeric cell pattern"));

/// Identified column roles, any of which may be missing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ColumnRoles {
    pub name: Option<usize>,
    pub value: Option<usize>,
    pub unit: Option<usize>,
}

/// Identify which columns hold test names, values, and units.
///
/// Headers are matched against keyword sets first. When that leaves the name
/// or value column unresolved, statistical inference over the data cells
/// takes over and reassigns all three roles.
pub fn identify_columns(headers: &[String], data: &[Vec<String>], catalog: &ReferenceCatalog) -> ColumnRoles {
    let mut roles = ColumnRoles {
        name: find_header(headers, NAME_INDICATORS),
        value: find_header(headers, VALUE_INDICATORS),
        unit: find_header(headers, UNIT_INDICATORS),
    };

    if roles.name.is_none() || roles.value.is_none() {
        roles = infer_from_data(data, catalog);
    }

    roles
}

fn find_header(headers: &[String], indicators: &[&str]) -> Option<usize> {
    headers.iter().position(|header| {
        let header = header.to_lowercase();
        indicators.iter().any(|indicator| header.contains(indicator))
    })
}

/// Assign roles from per-column cell statistics.
///
/// Each role goes to the column with the highest matching fraction, provided
/// that fraction clears the role's threshold.
fn infer_from_data(data: &[Vec<String>], catalog: &ReferenceCatalog) -> ColumnRoles {
    if data.len() < 2 {
        return ColumnRoles::default();
    }

    let column_count = data.iter().map(|row| row.len()).max().unwrap_or(0);

    let mut best_numeric: Option<(usize, f64)> = None;
    let mut best_name: Option<(usize, f64)> = None;
    let mut best_unit: Option<(usize, f64)> = None;

    for col in 0..column_count {
        let cells: Vec<&str> = data
            .iter()
            .filter_map(|row| row.get(col))
            .map(|cell| cell.trim())
            .filter(|cell| !cell.is_empty())
            .collect();

        if cells.is_empty() {
            continue;
        }

        let total = cells.len() as f64;
        let numeric = cells.iter().filter(|cell| NUMERIC_CELL.is_match(cell)).count() as f64 / total;
        let names = cells
            .iter()
            .filter(|cell| super::normalize_test_name(catalog, cell).is_some())
            .count() as f64
            / total;
        let units = cells.iter().filter(|cell| catalog.mentions_unit(cell)).count() as f64 / total;

        if numeric > NUMERIC_FRACTION_MIN && best_numeric.is_none_or(|(_, f)| numeric > f) {
            best_numeric = Some((col, numeric));
        }
        if names > TEST_NAME_FRACTION_MIN && best_name.is_none_or(|(_, f)| names > f) {
            best_name = Some((col, names));
        }
        if units > UNIT_FRACTION_MIN && best_unit.is_none_or(|(_, f)| units > f) {
            best_unit = Some((col, units));
        }
    }

    ColumnRoles {
        name: best_name.map(|(col, _)| col),
        value: best_numeric.map(|(col, _)| col),
        unit: best_unit.map(|(col, _)| col),
    }
}

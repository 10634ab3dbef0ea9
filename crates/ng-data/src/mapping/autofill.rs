//! Fill a destination column from a source column over the visible rows
//!
//! Each call reads the source column once and writes the destination column
//! once. The mapping is prepared before the destination is touched, so an
//! invalid configuration leaves the table unchanged.

use indexmap::IndexSet;

use super::{category_color, ColorGradient, NumericMapping};
use crate::columns::ColumnBatch;
use crate::convert::{AttributeConverter, ColorConverter};
use crate::store::{CellValue, TableHandle, TabularStore};
use crate::DataError;

/// What an autofill call did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AutofillOutcome {
    pub rows_written: usize,
    /// Visible rows whose source cell could not be used
    pub rows_skipped: usize,
}

fn visible_source_cells(
    store: &dyn TabularStore,
    table: &TableHandle,
    source_column: &str,
) -> Result<Vec<(usize, CellValue)>, DataError> {
    let source = ColumnBatch::try_read(store, table, source_column)?
        .ok_or_else(|| DataError::ColumnNotFound(source_column.to_string()))?;

    Ok(store
        .visible_rows(table)?
        .into_iter()
        .filter_map(|position| source.get(position).map(|cell| (position, cell.clone())))
        .collect())
}

fn numeric_cells(cells: &[(usize, CellValue)]) -> Vec<(usize, f64)> {
    cells
        .iter()
        .filter_map(|(position, cell)| cell.as_f64().map(|value| (*position, value)))
        .collect()
}

/// Map a numeric source column onto a numeric destination range
pub fn map_to_numeric_range(
    store: &dyn TabularStore,
    table: &TableHandle,
    source_column: &str,
    dest_column: &str,
    mapping: &NumericMapping,
) -> Result<AutofillOutcome, DataError> {
    let cells = visible_source_cells(store, table, source_column)?;
    let numbers = numeric_cells(&cells);
    let values: Vec<f64> = numbers.iter().map(|(_, value)| *value).collect();
    let prepared = mapping.prepare(&values)?;

    let mut dest = ColumnBatch::read_or_add(store, table, dest_column)?;
    for (position, value) in &numbers {
        dest.set(*position, CellValue::Number(prepared.map(*value)))?;
    }
    dest.commit(store)?;

    tracing::debug!(
        "Mapped '{}' onto '{}' in {}: {} rows",
        source_column,
        dest_column,
        table,
        numbers.len()
    );
    Ok(AutofillOutcome {
        rows_written: numbers.len(),
        rows_skipped: cells.len() - numbers.len(),
    })
}

/// Map a numeric source column onto a two-color gradient.
///
/// Only the mapping's mode, source bounds and outlier setting are used; the
/// destination range is the gradient itself.
pub fn map_to_color(
    store: &dyn TabularStore,
    table: &TableHandle,
    source_column: &str,
    dest_column: &str,
    mapping: &NumericMapping,
    gradient: ColorGradient,
) -> Result<AutofillOutcome, DataError> {
    let cells = visible_source_cells(store, table, source_column)?;
    let numbers = numeric_cells(&cells);
    let values: Vec<f64> = numbers.iter().map(|(_, value)| *value).collect();
    let prepared = NumericMapping {
        dest_min: 0.0,
        dest_max: 1.0,
        ..*mapping
    }
    .prepare(&values)?;

    let converter = ColorConverter;
    let mut dest = ColumnBatch::read_or_add(store, table, dest_column)?;
    for (position, value) in &numbers {
        let color = gradient.color_at(prepared.fraction(*value));
        dest.set(*position, converter.to_store(&color))?;
    }
    dest.commit(store)?;

    Ok(AutofillOutcome {
        rows_written: numbers.len(),
        rows_skipped: cells.len() - numbers.len(),
    })
}

/// Give every distinct source value its own color.
///
/// Categories are numbered in order of first appearance. Empty source
/// cells are skipped.
pub fn map_to_category_colors(
    store: &dyn TabularStore,
    table: &TableHandle,
    source_column: &str,
    dest_column: &str,
) -> Result<AutofillOutcome, DataError> {
    let cells = visible_source_cells(store, table, source_column)?;

    let mut categories: IndexSet<String> = IndexSet::new();
    let mut assignments = Vec::with_capacity(cells.len());
    for (position, cell) in &cells {
        if cell.is_empty() {
            continue;
        }
        let (index, _) = categories.insert_full(cell.to_text());
        assignments.push((*position, index));
    }

    if assignments.is_empty() {
        tracing::debug!("No categories in '{}' of {}; nothing colored", source_column, table);
        return Ok(AutofillOutcome {
            rows_written: 0,
            rows_skipped: cells.len(),
        });
    }

    let converter = ColorConverter;
    let mut dest = ColumnBatch::read_or_add(store, table, dest_column)?;
    for (position, index) in &assignments {
        dest.set(*position, converter.to_store(&category_color(*index)))?;
    }
    dest.commit(store)?;

    tracing::debug!(
        "Colored {} categories of '{}' in {}",
        categories.len(),
        source_column,
        table
    );
    Ok(AutofillOutcome {
        rows_written: assignments.len(),
        rows_skipped: cells.len() - assignments.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::MappingError;
    use crate::store::MemoryStore;
    use ng_core::Color;

    fn degree_store() -> (MemoryStore, TableHandle) {
        let store = MemoryStore::new();
        let table = store.add_table("Vertices", "Vertices", &["ID", "Degree", "Group"]);
        let rows: [(i64, CellValue, &str); 5] = [
            (1, CellValue::Number(1.0), "a"),
            (2, CellValue::Number(3.0), "b"),
            (3, CellValue::Text("n/a".into()), "a"),
            (4, CellValue::Number(5.0), ""),
            (5, CellValue::Number(100.0), "c"),
        ];
        for (id, degree, group) in rows {
            store
                .append_row(
                    &table,
                    vec![
                        ("ID", CellValue::from(id)),
                        ("Degree", degree),
                        ("Group", group.into()),
                    ],
                )
                .unwrap();
        }
        (store, table)
    }

    #[test]
    fn test_numeric_autofill_over_visible_rows() {
        let (store, table) = degree_store();
        store.set_row_hidden(&table, 5, true).unwrap();

        let outcome = map_to_numeric_range(
            &store,
            &table,
            "Degree",
            "Size",
            &NumericMapping::linear(1.0, 10.0),
        )
        .unwrap();

        assert_eq!(outcome, AutofillOutcome { rows_written: 3, rows_skipped: 1 });
        assert_eq!(store.cell(&table, "Size", 1), Some(CellValue::Number(1.0)));
        assert_eq!(store.cell(&table, "Size", 2), Some(CellValue::Number(5.5)));
        assert_eq!(store.cell(&table, "Size", 4), Some(CellValue::Number(10.0)));
        assert_eq!(store.cell(&table, "Size", 5), Some(CellValue::Empty));
        assert_eq!(store.write_count(&table, "Size"), 1);
    }

    #[test]
    fn test_invalid_log_mapping_writes_nothing() {
        let (store, table) = degree_store();
        store.set_cell(&table, "Degree", 2, CellValue::Number(-3.0)).unwrap();

        let result = map_to_numeric_range(
            &store,
            &table,
            "Degree",
            "Size",
            &NumericMapping::logarithmic(1.0, 10.0),
        );

        assert!(matches!(
            result,
            Err(DataError::InvalidMapping(MappingError::NonPositiveLogValue(_)))
        ));
        assert_eq!(store.total_writes(), 0);
        assert!(store.try_get_column(&table, "Size").is_none());
    }

    #[test]
    fn test_color_autofill() {
        let (store, table) = degree_store();
        map_to_color(
            &store,
            &table,
            "Degree",
            "Color",
            &NumericMapping::linear(0.0, 0.0).with_source_range(1.0, 5.0),
            ColorGradient::new(Color::BLACK, Color::WHITE),
        )
        .unwrap();

        assert_eq!(store.cell(&table, "Color", 1), Some("Black".into()));
        assert_eq!(store.cell(&table, "Color", 2), Some("Gray".into()));
        assert_eq!(store.cell(&table, "Color", 5), Some("White".into()));
    }

    #[test]
    fn test_category_colors() {
        let (store, table) = degree_store();
        let outcome = map_to_category_colors(&store, &table, "Group", "Color").unwrap();

        assert_eq!(outcome, AutofillOutcome { rows_written: 4, rows_skipped: 1 });
        assert_eq!(store.cell(&table, "Color", 1), store.cell(&table, "Color", 3));
        assert_ne!(store.cell(&table, "Color", 1), store.cell(&table, "Color", 2));
        assert_eq!(store.cell(&table, "Color", 4), Some(CellValue::Empty));
    }

    #[test]
    fn test_blank_categories_leave_destination_alone() {
        let store = MemoryStore::new();
        let table = store.add_table("Vertices", "Vertices", &["ID", "Cluster"]);
        for id in [1_i64, 2] {
            store.append_row(&table, vec![("ID", id.into())]).unwrap();
        }

        let outcome = map_to_category_colors(&store, &table, "Cluster", "Color").unwrap();

        assert_eq!(outcome, AutofillOutcome { rows_written: 0, rows_skipped: 2 });
        assert!(store.try_get_column(&table, "Color").is_none());
        assert_eq!(store.total_writes(), 0);
    }

    #[test]
    fn test_missing_source_column() {
        let (store, table) = degree_store();
        assert!(matches!(
            map_to_category_colors(&store, &table, "Cluster", "Color"),
            Err(DataError::ColumnNotFound(_))
        ));
    }
}

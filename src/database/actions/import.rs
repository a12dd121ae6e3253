use std::{io::Read, path::Path};

use csv::ReaderBuilder;
use sqlx::{Pool, Sqlite};

use crate::error::ApiError;

use super::ingredients::insert_ingredient;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImportReport {
    pub inserted: usize,
    pub skipped: usize,
}

/// Loads `name,measurement_unit` rows. Any row whose first column is `name` is
/// ignored, on any line of the file, as are rows with an empty name. Pairs that
/// already exist are counted as skipped.
pub async fn load_ingredients<R: Read>(
    source: R,
    pool: &Pool<Sqlite>,
) -> Result<ImportReport, ApiError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(false)
        .trim(csv::Trim::All)
        .from_reader(source);

    let mut report = ImportReport::default();
    for (row_num, record) in reader.records().enumerate() {
        let record = record.map_err(|e| {
            ApiError::InvalidRequest(format!("Row {}: CSV parse error: {e}", row_num + 1))
        })?;

        let (name, unit) = match (record.get(0), record.get(1)) {
            (Some(name), Some(unit)) if record.len() == 2 => (name, unit),
            _ => {
                return Err(ApiError::InvalidRequest(format!(
                    "Row {}: expected name and measurement unit",
                    row_num + 1
                )))
            }
        };
        if name == "name" || name.is_empty() {
            continue;
        }

        match insert_ingredient(name, unit, pool).await? {
            Some(_) => report.inserted += 1,
            None => report.skipped += 1,
        }
    }

    log::info!(
        "ingredient import done: {} inserted, {} already present",
        report.inserted,
        report.skipped
    );
    Ok(report)
}

pub async fn load_ingredients_file(
    path: &Path,
    pool: &Pool<Sqlite>,
) -> Result<ImportReport, ApiError> {
    let file = std::fs::File::open(path).map_err(|e| {
        ApiError::InvalidRequest(format!("could not open {}: {e}", path.display()))
    })?;
    load_ingredients(file, pool).await
}

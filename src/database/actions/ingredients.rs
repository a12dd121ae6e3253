use sqlx::{Pool, Sqlite};

use crate::{
    constants::TAG_FIELD_MAX_LENGTH,
    error::{ApiError, QueryError, ValidationErrors},
    form::Form,
    schema::{Id, Ingredient},
    validation::required_str,
};

/// Ingredients ordered by name, optionally filtered by a case-insensitive name prefix.
/// Matching runs against `name_lower`, which holds the Unicode-lowercased name.
pub async fn list_ingredients(
    name: Option<&str>,
    pool: &Pool<Sqlite>,
) -> Result<Vec<Ingredient>, ApiError> {
    let rows: Vec<Ingredient> = match name.map(str::trim).filter(|n| !n.is_empty()) {
        Some(name) => {
            let pattern = format!("{}%", escape_like(&name.to_lowercase()));
            sqlx::query_as(
                "SELECT * FROM ingredients WHERE name_lower LIKE ? ESCAPE '\\' ORDER BY name, id",
            )
            .bind(pattern)
            .fetch_all(pool)
            .await
            .map_err(QueryError::from)?
        }
        None => sqlx::query_as("SELECT * FROM ingredients ORDER BY name, id")
            .fetch_all(pool)
            .await
            .map_err(QueryError::from)?,
    };

    Ok(rows)
}

fn escape_like(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

pub async fn get_ingredient(id: Id, pool: &Pool<Sqlite>) -> Result<Option<Ingredient>, ApiError> {
    let row: Option<Ingredient> = sqlx::query_as("SELECT * FROM ingredients WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn create_ingredient(form: &Form, pool: &Pool<Sqlite>) -> Result<Ingredient, ApiError> {
    let mut errors = ValidationErrors::new();
    let name = required_str(form, "name", TAG_FIELD_MAX_LENGTH, &mut errors);
    let unit = required_str(form, "measurement_unit", TAG_FIELD_MAX_LENGTH, &mut errors);
    errors.into_result()?;

    let (name, unit) = match (name, unit) {
        (Some(name), Some(unit)) => (name, unit),
        _ => return Err(ApiError::InvalidRequest("Invalid ingredient".to_string())),
    };

    match insert_ingredient(name.trim(), unit.trim(), pool).await? {
        Some(ingredient) => Ok(ingredient),
        None => Err(ApiError::field(
            "non_field_errors",
            "Ingredient with this name and measurement unit already exists.",
        )),
    }
}

/// Inserts an ingredient; `None` when the (name, measurement_unit) pair already exists
pub async fn insert_ingredient(
    name: &str,
    measurement_unit: &str,
    pool: &Pool<Sqlite>,
) -> Result<Option<Ingredient>, ApiError> {
    let row: Option<Ingredient> = sqlx::query_as(
        "INSERT INTO ingredients (name, name_lower, measurement_unit) VALUES (?, ?, ?) ON CONFLICT DO NOTHING RETURNING *",
    )
    .bind(name)
    .bind(name.to_lowercase())
    .bind(measurement_unit)
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(row)
}

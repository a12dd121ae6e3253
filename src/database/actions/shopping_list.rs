use sqlx::{Pool, Sqlite};

use crate::{
    error::{ApiError, QueryError},
    schema::{Id, ShoppingListItem},
};

/// Ingredient totals over every recipe in the user's cart, grouped by name and unit
pub async fn fetch_shopping_list(
    user_id: Id,
    pool: &Pool<Sqlite>,
) -> Result<Vec<ShoppingListItem>, ApiError> {
    let rows: Vec<ShoppingListItem> = sqlx::query_as(
        "
        SELECT i.name AS name, i.measurement_unit AS measurement_unit, SUM(ri.amount) AS amount
        FROM shopping_carts c
        INNER JOIN recipe_ingredients ri ON ri.recipe_id = c.recipe_id
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE c.user_id = ?
        GROUP BY i.name, i.measurement_unit
        ORDER BY i.name, i.measurement_unit
    ",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows)
}

/// One `"<name> - <amount> <unit>"` line per item
pub fn render_shopping_list(items: &[ShoppingListItem]) -> String {
    items
        .iter()
        .map(|item| format!("{} - {} {}", item.name, item.amount, item.measurement_unit))
        .collect::<Vec<String>>()
        .join("\n")
}

use sqlx::{Pool, Sqlite};

use crate::{
    error::{ApiError, QueryError},
    schema::{Id, RecipeSummary},
};

use super::recipes::require_recipe;

/// Per-user recipe collections sharing one table shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecipeList {
    Favorites,
    ShoppingCart,
}

impl RecipeList {
    fn table(&self) -> &'static str {
        match self {
            RecipeList::Favorites => "favorites",
            RecipeList::ShoppingCart => "shopping_carts",
        }
    }

    fn already_added(&self) -> &'static str {
        match self {
            RecipeList::Favorites => "Recipe is already in favorites.",
            RecipeList::ShoppingCart => "Recipe is already in the shopping cart.",
        }
    }

    fn not_present(&self) -> &'static str {
        match self {
            RecipeList::Favorites => "Recipe is not in favorites.",
            RecipeList::ShoppingCart => "Recipe is not in the shopping cart.",
        }
    }
}

pub async fn add_to_list(
    list: RecipeList,
    user_id: Id,
    recipe_id: Id,
    pool: &Pool<Sqlite>,
) -> Result<RecipeSummary, ApiError> {
    let recipe = require_recipe(recipe_id, pool).await?;

    let result = sqlx::query(&format!(
        "INSERT INTO {} (user_id, recipe_id) VALUES (?, ?) ON CONFLICT DO NOTHING",
        list.table()
    ))
    .bind(user_id)
    .bind(recipe_id)
    .execute(pool)
    .await
    .map_err(QueryError::from)?;

    if result.rows_affected() == 0 {
        return Err(ApiError::InvalidRequest(list.already_added().to_string()));
    }

    log::debug!("user {user_id} added recipe {recipe_id} to {}", list.table());
    Ok(RecipeSummary::from(&recipe))
}

pub async fn remove_from_list(
    list: RecipeList,
    user_id: Id,
    recipe_id: Id,
    pool: &Pool<Sqlite>,
) -> Result<(), ApiError> {
    let result = sqlx::query(&format!(
        "DELETE FROM {} WHERE user_id = ? AND recipe_id = ?",
        list.table()
    ))
    .bind(user_id)
    .bind(recipe_id)
    .execute(pool)
    .await
    .map_err(QueryError::from)?;

    if result.rows_affected() == 0 {
        return Err(ApiError::InvalidRequest(list.not_present().to_string()));
    }
    Ok(())
}

/// Always false for anonymous requests
pub async fn is_in_list(
    list: RecipeList,
    user_id: Option<Id>,
    recipe_id: Id,
    pool: &Pool<Sqlite>,
) -> Result<bool, ApiError> {
    let user_id = match user_id {
        Some(user_id) => user_id,
        None => return Ok(false),
    };

    let row: Option<(Id,)> = sqlx::query_as(&format!(
        "SELECT id FROM {} WHERE user_id = ? AND recipe_id = ?",
        list.table()
    ))
    .bind(user_id)
    .bind(recipe_id)
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(row.is_some())
}

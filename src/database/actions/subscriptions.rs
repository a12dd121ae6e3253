use sqlx::{Pool, Sqlite};

use crate::{
    error::{ApiError, QueryError},
    pagination::{PageContext, PageQuery},
    schema::{Id, RecipeSummary, SubscriptionView, User, UserRow},
};

use super::users::require_user;

pub async fn subscribe(
    user_id: Id,
    author_id: Id,
    recipes_limit: i64,
    pool: &Pool<Sqlite>,
) -> Result<SubscriptionView, ApiError> {
    let author = require_user(author_id, pool).await?;
    if author.id == user_id {
        return Err(ApiError::InvalidRequest(
            "You cannot subscribe to yourself.".to_string(),
        ));
    }

    let result = sqlx::query(
        "INSERT INTO subscriptions (user_id, author_id) VALUES (?, ?) ON CONFLICT DO NOTHING",
    )
    .bind(user_id)
    .bind(author_id)
    .execute(pool)
    .await
    .map_err(QueryError::from)?;

    if result.rows_affected() == 0 {
        return Err(ApiError::InvalidRequest(
            "You are already subscribed to this author.".to_string(),
        ));
    }

    log::debug!("user {user_id} subscribed to {author_id}");
    subscription_view(author, true, recipes_limit, pool).await
}

pub async fn unsubscribe(user_id: Id, author_id: Id, pool: &Pool<Sqlite>) -> Result<(), ApiError> {
    require_user(author_id, pool).await?;

    let result = sqlx::query("DELETE FROM subscriptions WHERE user_id = ? AND author_id = ?")
        .bind(user_id)
        .bind(author_id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Subscription"));
    }
    Ok(())
}

pub async fn fetch_subscriptions(
    user_id: Id,
    recipes_limit: i64,
    page: PageQuery,
    page_size: i64,
    pool: &Pool<Sqlite>,
) -> Result<PageContext<SubscriptionView>, ApiError> {
    let rows: Vec<UserRow> = sqlx::query_as(
        "
        SELECT u.*, 1 AS is_subscribed, COUNT(*) OVER() AS count
        FROM subscriptions s
        INNER JOIN users u ON u.id = s.author_id
        WHERE s.user_id = ?
        ORDER BY u.username
        LIMIT ? OFFSET ?
    ",
    )
    .bind(user_id)
    .bind(page.limit(page_size))
    .bind(page.offset(page_size))
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    let total_count = rows.first().map(|row| row.count).unwrap_or(0);

    let mut views = Vec::with_capacity(rows.len());
    for row in rows {
        let author = User {
            id: row.id,
            email: row.email,
            username: row.username,
            first_name: row.first_name,
            last_name: row.last_name,
            password: row.password,
            role: row.role,
        };
        views.push(subscription_view(author, row.is_subscribed, recipes_limit, pool).await?);
    }

    Ok(PageContext::from_rows(
        views,
        total_count,
        page.limit(page_size),
        page.page(),
    ))
}

async fn subscription_view(
    author: User,
    is_subscribed: bool,
    recipes_limit: i64,
    pool: &Pool<Sqlite>,
) -> Result<SubscriptionView, ApiError> {
    let recipes: Vec<RecipeSummary> = sqlx::query_as(
        "SELECT id, name, image, cooking_time FROM recipes WHERE author_id = ? ORDER BY id DESC LIMIT ?",
    )
    .bind(author.id)
    .bind(recipes_limit.max(0))
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    let recipes_count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM recipes WHERE author_id = ?")
        .bind(author.id)
        .fetch_one(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(SubscriptionView {
        id: author.id,
        email: author.email,
        username: author.username,
        first_name: author.first_name,
        last_name: author.last_name,
        is_subscribed,
        recipes,
        recipes_count: recipes_count.0,
    })
}

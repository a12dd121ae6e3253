use std::collections::HashSet;

use serde_json::Value;
use sqlx::{Pool, QueryBuilder, Sqlite, SqliteConnection};

use crate::{
    authentication::permissions::ActionType,
    constants::{
        AMOUNT_MAX, AMOUNT_MIN, COOKING_TIME_MAX, COOKING_TIME_MIN, RECIPE_NAME_MAX_LENGTH,
        RECIPE_TEXT_MAX_LENGTH,
    },
    error::{ApiError, QueryError, ValidationErrors},
    form::{value_as_integer, Form},
    jwt::SessionData,
    pagination::{PageContext, PageQuery},
    schema::{Id, Recipe, RecipePart, RecipeRow, RecipeView, UserView},
    validation::{bounded_number, check_bounds, required_str},
};

use super::{
    favorites::{is_in_list, RecipeList},
    tags::list_recipe_tags,
    users::get_user_view,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngredientAmount {
    pub id: Id,
    pub amount: i64,
}

/// Validated recipe payload. `None` fields were omitted from a partial update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecipeForm {
    pub ingredients: Option<Vec<IngredientAmount>>,
    pub cooking_time: Option<i64>,
    pub tags: Option<Vec<Id>>,
    pub name: Option<String>,
    pub text: Option<String>,
    pub image: Option<String>,
}

impl RecipeForm {
    /// Field-level checks only; referenced ids are checked by [`RecipeForm::validate`]
    pub fn parse(form: &Form, partial: bool) -> (Self, ValidationErrors) {
        let mut errors = ValidationErrors::new();
        let wanted = |field: &str| !partial || form.contains(field);

        let ingredients = if wanted("ingredients") {
            parse_ingredients(form, &mut errors)
        } else {
            None
        };
        let cooking_time = if wanted("cooking_time") {
            bounded_number(
                form,
                "cooking_time",
                COOKING_TIME_MIN,
                COOKING_TIME_MAX,
                &mut errors,
            )
        } else {
            None
        };
        let tags = if wanted("tags") {
            parse_tags(form, &mut errors)
        } else {
            None
        };
        let name = if wanted("name") {
            required_str(form, "name", RECIPE_NAME_MAX_LENGTH, &mut errors)
        } else {
            None
        };
        let text = if wanted("text") {
            required_str(form, "text", RECIPE_TEXT_MAX_LENGTH, &mut errors)
        } else {
            None
        };
        let image = if wanted("image") {
            required_str(form, "image", usize::MAX, &mut errors)
        } else {
            None
        };

        (
            Self {
                ingredients,
                cooking_time,
                tags,
                name,
                text,
                image,
            },
            errors,
        )
    }

    pub async fn validate(form: &Form, partial: bool, pool: &Pool<Sqlite>) -> Result<Self, ApiError> {
        let (recipe, mut errors) = Self::parse(form, partial);

        if let Some(ingredients) = &recipe.ingredients {
            let ids: Vec<Id> = ingredients.iter().map(|i| i.id).collect();
            for id in missing_ids("ingredients", &ids, pool).await? {
                errors.add(
                    "ingredients",
                    format!("Invalid pk \"{id}\" - object does not exist."),
                );
            }
        }
        if let Some(tags) = &recipe.tags {
            for id in missing_ids("tags", tags, pool).await? {
                errors.add("tags", format!("Invalid pk \"{id}\" - object does not exist."));
            }
        }

        errors.into_result()?;
        Ok(recipe)
    }
}

fn parse_ingredients(form: &Form, errors: &mut ValidationErrors) -> Option<Vec<IngredientAmount>> {
    let list = match form.get_list("ingredients") {
        Ok(list) => list,
        Err(e) => {
            errors.add("ingredients", e.to_string());
            return None;
        }
    };
    if list.is_empty() {
        errors.add("ingredients", "At least one ingredient is required.");
        return None;
    }

    let mut parsed = Vec::with_capacity(list.len());
    for item in list {
        let id = item.get("id").map(value_as_integer);
        let amount = item.get("amount").map(value_as_integer);
        match (id, amount) {
            (Some(Ok(id)), Some(Ok(amount))) => {
                if check_bounds("amount", amount, AMOUNT_MIN, AMOUNT_MAX, errors).is_some() {
                    parsed.push(IngredientAmount { id, amount });
                }
            }
            (Some(Ok(_)), Some(Err(e))) => errors.add("amount", e.to_string()),
            (Some(Ok(_)), None) => errors.add("amount", "This field is required."),
            _ => errors.add("ingredients", "Each ingredient needs an integer \"id\"."),
        }
    }

    if parsed.len() == list.len() {
        Some(parsed)
    } else {
        None
    }
}

fn parse_tags(form: &Form, errors: &mut ValidationErrors) -> Option<Vec<Id>> {
    let list = match form.get_list("tags") {
        Ok(list) => list,
        Err(e) => {
            errors.add("tags", e.to_string());
            return None;
        }
    };
    if list.is_empty() {
        errors.add("tags", "A recipe needs at least one tag.");
        return None;
    }

    let ids = match list.iter().map(value_as_integer).collect::<Result<Vec<Id>, _>>() {
        Ok(ids) => ids,
        Err(e) => {
            errors.add("tags", e.to_string());
            return None;
        }
    };

    let unique: HashSet<Id> = ids.iter().copied().collect();
    if unique.len() != ids.len() {
        errors.add("tags", "Tags must be unique.");
        return None;
    }

    Some(ids)
}

/// Ids from `ids` that have no row in `table`
async fn missing_ids(table: &str, ids: &[Id], pool: &Pool<Sqlite>) -> Result<Vec<Id>, ApiError> {
    if ids.is_empty() {
        return Ok(vec![]);
    }

    let mut query = QueryBuilder::<Sqlite>::new(format!("SELECT id FROM {table} WHERE id IN ("));
    let mut separated = query.separated(", ");
    for id in ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(")");

    let found: Vec<(Id,)> = query
        .build_query_as()
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;
    let found: HashSet<Id> = found.into_iter().map(|row| row.0).collect();

    let mut missing: Vec<Id> = ids.iter().copied().filter(|id| !found.contains(id)).collect();
    missing.dedup();
    Ok(missing)
}

/// Query-string filters of the recipe list
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecipeFilter {
    pub author: Option<Id>,
    pub tags: Vec<String>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
}

fn flag(value: &str) -> bool {
    matches!(value, "1" | "true" | "True")
}

impl RecipeFilter {
    /// Parses `?author=&tags=a&tags=b&is_favorited=1&is_in_shopping_cart=1&page=&limit=`
    pub fn from_query(pairs: &[(String, String)]) -> Result<(Self, PageQuery), ApiError> {
        let mut filter = Self::default();
        let mut page = PageQuery::default();

        for (key, value) in pairs {
            let number = || {
                value_as_integer(&Value::String(value.to_owned()))
                    .map_err(|e| ApiError::field(key, e.to_string()))
            };
            match key.as_str() {
                "author" => filter.author = Some(number()?),
                "tags" => filter.tags.push(value.to_owned()),
                "is_favorited" => filter.is_favorited = flag(value),
                "is_in_shopping_cart" => filter.is_in_shopping_cart = flag(value),
                "page" => page.page = Some(number()?),
                "limit" => page.limit = Some(number()?),
                _ => {}
            }
        }

        Ok((filter, page))
    }
}

pub async fn create_recipe(
    author_id: Id,
    recipe: &RecipeForm,
    pool: &Pool<Sqlite>,
) -> Result<Id, ApiError> {
    let (name, text, image, cooking_time, ingredients, tags) = match recipe {
        RecipeForm {
            name: Some(name),
            text: Some(text),
            image: Some(image),
            cooking_time: Some(cooking_time),
            ingredients: Some(ingredients),
            tags: Some(tags),
        } => (name, text, image, *cooking_time, ingredients, tags),
        _ => {
            return Err(ApiError::InvalidRequest(
                "Every recipe field is required.".to_string(),
            ))
        }
    };

    let mut tr = pool
        .begin()
        .await
        .map_err(|_| QueryError::new("Could not start transaction".to_owned()))?;

    let id: (Id,) = sqlx::query_as(
        "
        INSERT INTO recipes (author_id, name, image, text, cooking_time)
        VALUES (?, ?, ?, ?, ?)
        RETURNING id
    ",
    )
    .bind(author_id)
    .bind(name)
    .bind(image)
    .bind(text)
    .bind(cooking_time)
    .fetch_one(&mut *tr)
    .await
    .map_err(QueryError::from)?;

    set_recipe_tags(id.0, tags, &mut tr).await?;
    set_recipe_ingredients(id.0, ingredients, &mut tr).await?;

    tr.commit()
        .await
        .map_err(|_| QueryError::new("Could not commit transaction".to_owned()))?;

    log::info!("user {author_id} created recipe {}", id.0);
    Ok(id.0)
}

/// Applies a validated update. Ingredients and tags are replaced only when supplied.
pub async fn update_recipe(
    recipe_id: Id,
    recipe: &RecipeForm,
    pool: &Pool<Sqlite>,
) -> Result<(), ApiError> {
    let mut tr = pool
        .begin()
        .await
        .map_err(|_| QueryError::new("Could not start transaction".to_owned()))?;

    sqlx::query(
        "
        UPDATE recipes SET
        name = COALESCE(?, name),
        text = COALESCE(?, text),
        image = COALESCE(?, image),
        cooking_time = COALESCE(?, cooking_time)
        WHERE id = ?
    ",
    )
    .bind(recipe.name.as_deref())
    .bind(recipe.text.as_deref())
    .bind(recipe.image.as_deref())
    .bind(recipe.cooking_time)
    .bind(recipe_id)
    .execute(&mut *tr)
    .await
    .map_err(QueryError::from)?;

    if let Some(ingredients) = &recipe.ingredients {
        sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = ?")
            .bind(recipe_id)
            .execute(&mut *tr)
            .await
            .map_err(QueryError::from)?;
        set_recipe_ingredients(recipe_id, ingredients, &mut tr).await?;
    }

    if let Some(tags) = &recipe.tags {
        sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = ?")
            .bind(recipe_id)
            .execute(&mut *tr)
            .await
            .map_err(QueryError::from)?;
        set_recipe_tags(recipe_id, tags, &mut tr).await?;
    }

    tr.commit()
        .await
        .map_err(|_| QueryError::new("Could not commit transaction".to_owned()))?;

    Ok(())
}

async fn set_recipe_ingredients(
    recipe_id: Id,
    ingredients: &[IngredientAmount],
    conn: &mut SqliteConnection,
) -> Result<(), ApiError> {
    if ingredients.is_empty() {
        return Ok(());
    }

    let mut query = QueryBuilder::<Sqlite>::new(
        "INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount) ",
    );
    query.push_values(ingredients, |mut row, ingredient| {
        row.push_bind(recipe_id)
            .push_bind(ingredient.id)
            .push_bind(ingredient.amount);
    });

    query
        .build()
        .execute(&mut *conn)
        .await
        .map_err(QueryError::from)?;

    Ok(())
}

async fn set_recipe_tags(
    recipe_id: Id,
    tags: &[Id],
    conn: &mut SqliteConnection,
) -> Result<(), ApiError> {
    if tags.is_empty() {
        return Ok(());
    }

    let mut query = QueryBuilder::<Sqlite>::new("INSERT INTO recipe_tags (recipe_id, tag_id) ");
    query.push_values(tags, |mut row, tag_id| {
        row.push_bind(recipe_id).push_bind(*tag_id);
    });

    query
        .build()
        .execute(&mut *conn)
        .await
        .map_err(QueryError::from)?;

    Ok(())
}

pub async fn delete_recipe(recipe_id: Id, pool: &Pool<Sqlite>) -> Result<(), ApiError> {
    sqlx::query("DELETE FROM recipes WHERE id = ?")
        .bind(recipe_id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    log::info!("deleted recipe {recipe_id}");
    Ok(())
}

pub async fn get_recipe(id: Id, pool: &Pool<Sqlite>) -> Result<Option<Recipe>, ApiError> {
    let row: Option<Recipe> = sqlx::query_as("SELECT * FROM recipes WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn require_recipe(id: Id, pool: &Pool<Sqlite>) -> Result<Recipe, ApiError> {
    get_recipe(id, pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Recipe"))
}

/// Loads a recipe the session may modify: its author or an admin
pub async fn get_recipe_mut(
    id: Id,
    session: &SessionData,
    pool: &Pool<Sqlite>,
) -> Result<Recipe, ApiError> {
    let recipe = require_recipe(id, pool).await?;

    if session.can_manage(
        recipe.author_id,
        ActionType::ManageOwnRecipes,
        ActionType::ManageAllRecipes,
    ) {
        Ok(recipe)
    } else {
        log::warn!(
            "user {} denied write access to recipe {}",
            session.user_id,
            recipe.id
        );
        Err(ApiError::Forbidden)
    }
}

pub async fn list_recipe_parts(
    recipe_id: Id,
    pool: &Pool<Sqlite>,
) -> Result<Vec<RecipePart>, ApiError> {
    let rows: Vec<RecipePart> = sqlx::query_as(
        "
        SELECT i.id AS id, i.name AS name, i.measurement_unit AS measurement_unit, ri.amount AS amount
        FROM recipe_ingredients ri
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE ri.recipe_id = ?
        ORDER BY ri.id
    ",
    )
    .bind(recipe_id)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows)
}

pub async fn recipe_view(
    recipe: Recipe,
    requester: Option<Id>,
    pool: &Pool<Sqlite>,
) -> Result<RecipeView, ApiError> {
    let tags = list_recipe_tags(recipe.id, pool).await?;
    let ingredients = list_recipe_parts(recipe.id, pool).await?;
    let author: UserView = get_user_view(recipe.author_id, requester, pool).await?;
    let is_favorited = is_in_list(RecipeList::Favorites, requester, recipe.id, pool).await?;
    let is_in_shopping_cart =
        is_in_list(RecipeList::ShoppingCart, requester, recipe.id, pool).await?;

    Ok(RecipeView {
        id: recipe.id,
        tags,
        author,
        ingredients,
        name: recipe.name,
        image: recipe.image,
        text: recipe.text,
        cooking_time: recipe.cooking_time,
        is_favorited,
        is_in_shopping_cart,
    })
}

pub async fn fetch_recipes(
    filter: &RecipeFilter,
    requester: Option<Id>,
    page: PageQuery,
    page_size: i64,
    pool: &Pool<Sqlite>,
) -> Result<PageContext<RecipeView>, ApiError> {
    let mut query =
        QueryBuilder::<Sqlite>::new("SELECT r.*, COUNT(*) OVER() AS count FROM recipes r WHERE 1 = 1");

    if let Some(author) = filter.author {
        query.push(" AND r.author_id = ").push_bind(author);
    }
    if !filter.tags.is_empty() {
        query.push(
            " AND EXISTS (SELECT 1 FROM recipe_tags rt INNER JOIN tags t ON t.id = rt.tag_id WHERE rt.recipe_id = r.id AND t.slug IN (",
        );
        let mut separated = query.separated(", ");
        for slug in &filter.tags {
            separated.push_bind(slug.to_owned());
        }
        separated.push_unseparated("))");
    }
    if let Some(user_id) = requester {
        if filter.is_favorited {
            query
                .push(" AND EXISTS (SELECT 1 FROM favorites f WHERE f.recipe_id = r.id AND f.user_id = ")
                .push_bind(user_id)
                .push(")");
        }
        if filter.is_in_shopping_cart {
            query
                .push(" AND EXISTS (SELECT 1 FROM shopping_carts c WHERE c.recipe_id = r.id AND c.user_id = ")
                .push_bind(user_id)
                .push(")");
        }
    }

    query
        .push(" ORDER BY r.id DESC LIMIT ")
        .push_bind(page.limit(page_size))
        .push(" OFFSET ")
        .push_bind(page.offset(page_size));

    let rows: Vec<RecipeRow> = query
        .build_query_as()
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    let total_count = rows.first().map(|p| p.count).unwrap_or(0);

    let mut views = Vec::with_capacity(rows.len());
    for row in rows {
        views.push(recipe_view(Recipe::from(row), requester, pool).await?);
    }

    Ok(PageContext::from_rows(
        views,
        total_count,
        page.limit(page_size),
        page.page(),
    ))
}

use serde::{Deserialize, Serialize};
use warp::{
    http::{header, Response as HttpResponse, StatusCode},
    reply::{self, Reply, Response},
    Rejection,
};

use crate::{
    actions::{
        favorites::{add_to_list, remove_from_list, RecipeList},
        ingredients, recipes,
        recipes::{RecipeFilter, RecipeForm},
        shopping_list::{fetch_shopping_list, render_shopping_list},
        subscriptions, tags,
        tags::NewTag,
        tokens::revoke_token,
        users,
        users::NewUser,
    },
    constants::SHOPPING_LIST_FILENAME,
    context::Context,
    error::{ApiError, ValidationErrors},
    form::{Form, FormData},
    jwt::SessionData,
    pagination::PageQuery,
    permissions::ActionType,
    schema::{Id, RegisteredUser, UserRole},
    validation::required_str,
};

type HandlerResult = Result<Response, Rejection>;

fn created<T: Serialize>(value: &T) -> Response {
    reply::with_status(reply::json(value), StatusCode::CREATED).into_response()
}

fn no_content() -> Response {
    reply::with_status(reply::reply(), StatusCode::NO_CONTENT).into_response()
}

fn ok<T: Serialize>(value: &T) -> Response {
    reply::json(value).into_response()
}

fn requester(session: &Option<SessionData>) -> Option<Id> {
    session.as_ref().map(|s| s.user_id)
}

#[derive(Debug, Deserialize)]
pub struct IngredientQuery {
    pub name: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct SubscriptionQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub recipes_limit: Option<i64>,
}

impl SubscriptionQuery {
    fn page(&self) -> PageQuery {
        PageQuery::new(self.page, self.limit)
    }

    fn recipes_limit(&self, ctx: &Context) -> i64 {
        self.recipes_limit
            .unwrap_or(ctx.config.api.recipes_limit)
            .max(0)
    }
}

#[derive(Debug, Serialize)]
struct TokenResponse {
    auth_token: String,
}

// Recipes

pub async fn list_recipes(
    query: Vec<(String, String)>,
    session: Option<SessionData>,
    ctx: Context,
) -> HandlerResult {
    let (filter, page) = RecipeFilter::from_query(&query)?;
    let recipes = recipes::fetch_recipes(
        &filter,
        requester(&session),
        page,
        ctx.config.api.page_size,
        &ctx.pool,
    )
    .await?;

    Ok(ok(&recipes))
}

pub async fn get_recipe(id: Id, session: Option<SessionData>, ctx: Context) -> HandlerResult {
    let recipe = recipes::require_recipe(id, &ctx.pool).await?;
    let view = recipes::recipe_view(recipe, requester(&session), &ctx.pool).await?;

    Ok(ok(&view))
}

pub async fn create_recipe(session: SessionData, data: FormData, ctx: Context) -> HandlerResult {
    session.authenticate(ActionType::CreateRecipes)?;

    let form = Form::from_data(data);
    let recipe = RecipeForm::validate(&form, false, &ctx.pool).await?;
    let id = recipes::create_recipe(session.user_id, &recipe, &ctx.pool).await?;

    let recipe = recipes::require_recipe(id, &ctx.pool).await?;
    let view = recipes::recipe_view(recipe, Some(session.user_id), &ctx.pool).await?;

    Ok(created(&view))
}

/// `partial` is set for PATCH
pub async fn update_recipe(
    id: Id,
    partial: bool,
    session: SessionData,
    data: FormData,
    ctx: Context,
) -> HandlerResult {
    let recipe = recipes::get_recipe_mut(id, &session, &ctx.pool).await?;

    let form = Form::from_data(data);
    let update = RecipeForm::validate(&form, partial, &ctx.pool).await?;
    recipes::update_recipe(recipe.id, &update, &ctx.pool).await?;

    let recipe = recipes::require_recipe(recipe.id, &ctx.pool).await?;
    let view = recipes::recipe_view(recipe, Some(session.user_id), &ctx.pool).await?;

    Ok(ok(&view))
}

pub async fn delete_recipe(id: Id, session: SessionData, ctx: Context) -> HandlerResult {
    let recipe = recipes::get_recipe_mut(id, &session, &ctx.pool).await?;
    recipes::delete_recipe(recipe.id, &ctx.pool).await?;

    Ok(no_content())
}

fn list_action(list: RecipeList) -> ActionType {
    match list {
        RecipeList::Favorites => ActionType::ManageOwnFavorites,
        RecipeList::ShoppingCart => ActionType::ManageOwnShoppingCart,
    }
}

pub async fn add_recipe_to(
    id: Id,
    list: RecipeList,
    session: SessionData,
    ctx: Context,
) -> HandlerResult {
    session.authenticate(list_action(list))?;
    let summary = add_to_list(list, session.user_id, id, &ctx.pool).await?;

    Ok(created(&summary))
}

pub async fn remove_recipe_from(
    id: Id,
    list: RecipeList,
    session: SessionData,
    ctx: Context,
) -> HandlerResult {
    session.authenticate(list_action(list))?;
    remove_from_list(list, session.user_id, id, &ctx.pool).await?;

    Ok(no_content())
}

pub async fn download_shopping_cart(session: SessionData, ctx: Context) -> HandlerResult {
    session.authenticate(ActionType::ManageOwnShoppingCart)?;

    let items = fetch_shopping_list(session.user_id, &ctx.pool).await?;
    let body = render_shopping_list(&items);

    let response = HttpResponse::builder()
        .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{SHOPPING_LIST_FILENAME}\""),
        )
        .body(body)
        .map_err(|e| ApiError::Internal(format!("could not build response: {e}")))?;

    Ok(response.into_response())
}

// Ingredients

pub async fn list_ingredients(query: IngredientQuery, ctx: Context) -> HandlerResult {
    let list = ingredients::list_ingredients(query.name.as_deref(), &ctx.pool).await?;
    Ok(ok(&list))
}

pub async fn get_ingredient(id: Id, ctx: Context) -> HandlerResult {
    let ingredient = ingredients::get_ingredient(id, &ctx.pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Ingredient"))?;

    Ok(ok(&ingredient))
}

pub async fn create_ingredient(session: SessionData, data: FormData, ctx: Context) -> HandlerResult {
    session.authenticate(ActionType::CreateIngredients)?;
    let ingredient = ingredients::create_ingredient(&Form::from_data(data), &ctx.pool).await?;

    Ok(created(&ingredient))
}

// Tags

pub async fn list_tags(ctx: Context) -> HandlerResult {
    let list = tags::list_tags(&ctx.pool).await?;
    Ok(ok(&list))
}

pub async fn get_tag(id: Id, ctx: Context) -> HandlerResult {
    let tag = tags::get_tag(id, &ctx.pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Tag"))?;

    Ok(ok(&tag))
}

pub async fn create_tag(session: SessionData, data: FormData, ctx: Context) -> HandlerResult {
    session.authenticate(ActionType::ManageTags)?;
    let tag = NewTag::from_form(&Form::from_data(data))?;
    let tag = tags::create_tag(&tag, &ctx.pool).await?;

    Ok(created(&tag))
}

// Users

pub async fn list_users(
    page: PageQuery,
    session: Option<SessionData>,
    ctx: Context,
) -> HandlerResult {
    let list = users::fetch_users(
        requester(&session),
        page,
        ctx.config.api.page_size,
        &ctx.pool,
    )
    .await?;

    Ok(ok(&list))
}

pub async fn register(data: FormData, ctx: Context) -> HandlerResult {
    let user = NewUser::from_form(&Form::from_data(data))?;
    let user = users::register_user(&user, UserRole::User, &ctx.pool).await?;

    Ok(created(&RegisteredUser::from(user)))
}

pub async fn get_user(id: Id, session: Option<SessionData>, ctx: Context) -> HandlerResult {
    let view = users::get_user_view(id, requester(&session), &ctx.pool).await?;
    Ok(ok(&view))
}

pub async fn me(session: SessionData, ctx: Context) -> HandlerResult {
    let view = users::get_user_view(session.user_id, Some(session.user_id), &ctx.pool).await?;
    Ok(ok(&view))
}

pub async fn set_password(session: SessionData, data: FormData, ctx: Context) -> HandlerResult {
    let (new_password, current_password) = users::validate_set_password(&Form::from_data(data))?;
    users::set_password(session.user_id, &current_password, &new_password, &ctx.pool).await?;

    Ok(no_content())
}

pub async fn subscribe(
    id: Id,
    query: SubscriptionQuery,
    session: SessionData,
    ctx: Context,
) -> HandlerResult {
    session.authenticate(ActionType::ManageOwnSubscriptions)?;
    let view = subscriptions::subscribe(
        session.user_id,
        id,
        query.recipes_limit(&ctx),
        &ctx.pool,
    )
    .await?;

    Ok(created(&view))
}

pub async fn unsubscribe(id: Id, session: SessionData, ctx: Context) -> HandlerResult {
    session.authenticate(ActionType::ManageOwnSubscriptions)?;
    subscriptions::unsubscribe(session.user_id, id, &ctx.pool).await?;

    Ok(no_content())
}

pub async fn list_subscriptions(
    query: SubscriptionQuery,
    session: SessionData,
    ctx: Context,
) -> HandlerResult {
    let list = subscriptions::fetch_subscriptions(
        session.user_id,
        query.recipes_limit(&ctx),
        query.page(),
        ctx.config.api.page_size,
        &ctx.pool,
    )
    .await?;

    Ok(ok(&list))
}

// Auth tokens

pub async fn login(data: FormData, ctx: Context) -> HandlerResult {
    let form = Form::from_data(data);
    let mut errors = ValidationErrors::new();
    let email = required_str(&form, "email", usize::MAX, &mut errors);
    let password = required_str(&form, "password", usize::MAX, &mut errors);
    errors.into_result()?;

    let (email, password) = match (email, password) {
        (Some(email), Some(password)) => (email, password),
        _ => return Err(ApiError::InvalidRequest("Invalid credentials".to_string()).into()),
    };

    let auth_token = users::login_user(&email, &password, &ctx.config.auth, &ctx.pool).await?;
    Ok(ok(&TokenResponse { auth_token }))
}

pub async fn logout(session: SessionData, ctx: Context) -> HandlerResult {
    revoke_token(&session, &ctx.pool).await?;
    Ok(no_content())
}

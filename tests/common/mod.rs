#![allow(dead_code)]

use foodgram::{
    actions::{
        ingredients::insert_ingredient,
        tags::{create_tag, NewTag},
        users::{register_user, NewUser},
    },
    config::AppConfig,
    connection::connect_in_memory,
    context::Context,
    jwt::generate_jwt_session,
    logging::setup_test_logging,
    routes::routes,
    schema::{Ingredient, Tag, User, UserRole},
};
use serde_json::{json, Value};
use warp::http::StatusCode;

pub const SECRET: &str = "test-secret";

pub async fn context() -> Context {
    setup_test_logging();
    let pool = connect_in_memory().await.unwrap();

    let mut config = AppConfig::default();
    config.auth.secret_key = SECRET.to_string();
    Context::new(pool, config)
}

/// Registered user and a valid token for it
pub async fn user(ctx: &Context, username: &str, role: UserRole) -> (User, String) {
    let new_user = NewUser {
        email: format!("{username}@example.com"),
        username: username.to_string(),
        first_name: "Test".to_string(),
        last_name: "Cook".to_string(),
        password: "password123".to_string(),
    };
    let user = register_user(&new_user, role, &ctx.pool).await.unwrap();
    let token = generate_jwt_session(&user, SECRET, 1).unwrap();
    (user, token)
}

pub async fn ingredient(ctx: &Context, name: &str, unit: &str) -> Ingredient {
    insert_ingredient(name, unit, &ctx.pool)
        .await
        .unwrap()
        .unwrap()
}

/// Rows in `table` belonging to `user_id`
pub async fn count_rows(ctx: &Context, table: &str, user_id: i64) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table} WHERE user_id = ?"))
        .bind(user_id)
        .fetch_one(&ctx.pool)
        .await
        .unwrap()
}

pub async fn tag(ctx: &Context, name: &str, color: &str, slug: &str) -> Tag {
    let tag = NewTag {
        name: name.to_string(),
        color: color.to_string(),
        slug: slug.to_string(),
    };
    create_tag(&tag, &ctx.pool).await.unwrap()
}

pub fn recipe_payload(name: &str, ingredients: &[(i64, i64)], tags: &[i64], cooking_time: i64) -> Value {
    let ingredients: Vec<Value> = ingredients
        .iter()
        .map(|(id, amount)| json!({ "id": id, "amount": amount }))
        .collect();

    json!({
        "ingredients": ingredients,
        "tags": tags,
        "name": name,
        "text": "Mix everything and cook.",
        "image": "data:image/png;base64,iVBORw0KGgo=",
        "cooking_time": cooking_time,
    })
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: warp::http::HeaderMap,
    pub text: String,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.text).unwrap_or(Value::Null)
    }
}

pub async fn send(
    ctx: &Context,
    method: &str,
    path: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> TestResponse {
    let mut request = warp::test::request().method(method).path(path);
    if let Some(token) = token {
        request = request.header("authorization", format!("Token {token}"));
    }
    if let Some(body) = body {
        request = request.json(&body);
    }

    let response = request.reply(&routes(ctx.clone())).await;
    TestResponse {
        status: response.status(),
        headers: response.headers().clone(),
        text: String::from_utf8_lossy(response.body()).to_string(),
    }
}

/// Creates a recipe through the API and returns its id
pub async fn create_recipe(ctx: &Context, token: &str, payload: Value) -> i64 {
    let response = send(ctx, "POST", "/recipes/", Some(token), Some(payload)).await;
    assert_eq!(response.status, StatusCode::CREATED, "{}", response.text);
    response.json()["id"].as_i64().unwrap()
}

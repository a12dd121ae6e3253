mod common;

use common::*;
use foodgram::schema::UserRole;
use serde_json::json;
use warp::http::StatusCode;

#[tokio::test]
async fn create_and_read_recipe() {
    let ctx = context().await;
    let (author, token) = user(&ctx, "author", UserRole::User).await;
    let salt = ingredient(&ctx, "Salt", "g").await;
    let breakfast = tag(&ctx, "Breakfast", "#E26C2D", "breakfast").await;

    let id = create_recipe(
        &ctx,
        &token,
        recipe_payload("Porridge", &[(salt.id, 5)], &[breakfast.id], 15),
    )
    .await;

    let response = send(&ctx, "GET", &format!("/recipes/{id}/"), None, None).await;
    assert_eq!(response.status, StatusCode::OK);

    let body = response.json();
    assert_eq!(body["name"], "Porridge");
    assert_eq!(body["cooking_time"], 15);
    assert_eq!(body["author"]["id"], author.id);
    assert_eq!(body["author"]["is_subscribed"], false);
    assert_eq!(body["tags"][0]["slug"], "breakfast");
    assert_eq!(
        body["ingredients"],
        json!([{ "id": salt.id, "name": "Salt", "measurement_unit": "g", "amount": 5 }])
    );
    assert_eq!(body["is_favorited"], false);
    assert_eq!(body["is_in_shopping_cart"], false);
}

#[tokio::test]
async fn cooking_time_boundaries() {
    let ctx = context().await;
    let (_, token) = user(&ctx, "author", UserRole::User).await;
    let salt = ingredient(&ctx, "Salt", "g").await;
    let lunch = tag(&ctx, "Lunch", "#49B64E", "lunch").await;

    for (cooking_time, expected) in [
        (0, StatusCode::BAD_REQUEST),
        (1, StatusCode::CREATED),
        (600, StatusCode::CREATED),
        (601, StatusCode::BAD_REQUEST),
    ] {
        let response = send(
            &ctx,
            "POST",
            "/recipes/",
            Some(&token),
            Some(recipe_payload("Stew", &[(salt.id, 5)], &[lunch.id], cooking_time)),
        )
        .await;
        assert_eq!(response.status, expected, "cooking_time {cooking_time}");
        if expected == StatusCode::BAD_REQUEST {
            assert!(response.json()["cooking_time"].is_array());
        }
    }
}

#[tokio::test]
async fn recipe_validation_reports_fields() {
    let ctx = context().await;
    let (_, token) = user(&ctx, "author", UserRole::User).await;
    let salt = ingredient(&ctx, "Salt", "g").await;
    let lunch = tag(&ctx, "Lunch", "#49B64E", "lunch").await;

    let duplicate_tags = send(
        &ctx,
        "POST",
        "/recipes/",
        Some(&token),
        Some(recipe_payload("Stew", &[(salt.id, 5)], &[lunch.id, lunch.id], 10)),
    )
    .await;
    assert_eq!(duplicate_tags.status, StatusCode::BAD_REQUEST);
    assert!(duplicate_tags.json()["tags"].is_array());

    let unknown_ingredient = send(
        &ctx,
        "POST",
        "/recipes/",
        Some(&token),
        Some(recipe_payload("Stew", &[(9999, 5)], &[lunch.id], 10)),
    )
    .await;
    assert_eq!(unknown_ingredient.status, StatusCode::BAD_REQUEST);
    assert!(unknown_ingredient.json()["ingredients"].is_array());

    let no_ingredients = send(
        &ctx,
        "POST",
        "/recipes/",
        Some(&token),
        Some(recipe_payload("Stew", &[], &[lunch.id], 10)),
    )
    .await;
    assert_eq!(no_ingredients.status, StatusCode::BAD_REQUEST);

    let string_amount = send(
        &ctx,
        "POST",
        "/recipes/",
        Some(&token),
        Some(json!({
            "ingredients": [{ "id": salt.id, "amount": "12" }],
            "tags": [lunch.id],
            "name": "Stew",
            "text": "Slowly.",
            "image": "data:image/png;base64,AAAA",
            "cooking_time": "30",
        })),
    )
    .await;
    assert_eq!(string_amount.status, StatusCode::CREATED, "{}", string_amount.text);
    assert_eq!(string_amount.json()["ingredients"][0]["amount"], 12);
}

#[tokio::test]
async fn anonymous_writes_are_unauthorized() {
    let ctx = context().await;
    let (_, token) = user(&ctx, "author", UserRole::User).await;
    let salt = ingredient(&ctx, "Salt", "g").await;
    let lunch = tag(&ctx, "Lunch", "#49B64E", "lunch").await;
    let payload = recipe_payload("Stew", &[(salt.id, 5)], &[lunch.id], 10);

    let response = send(&ctx, "POST", "/recipes/", None, Some(payload.clone())).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert!(response.json()["detail"].is_string());

    let id = create_recipe(&ctx, &token, payload).await;
    let response = send(&ctx, "DELETE", &format!("/recipes/{id}/"), None, None).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn only_author_or_admin_may_modify() {
    let ctx = context().await;
    let (_, author) = user(&ctx, "author", UserRole::User).await;
    let (_, stranger) = user(&ctx, "stranger", UserRole::User).await;
    let (_, admin) = user(&ctx, "admin", UserRole::Admin).await;
    let salt = ingredient(&ctx, "Salt", "g").await;
    let lunch = tag(&ctx, "Lunch", "#49B64E", "lunch").await;

    let id = create_recipe(
        &ctx,
        &author,
        recipe_payload("Stew", &[(salt.id, 5)], &[lunch.id], 10),
    )
    .await;
    let path = format!("/recipes/{id}/");

    let response = send(&ctx, "PATCH", &path, Some(&stranger), Some(json!({ "name": "Mine" }))).await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    let response = send(&ctx, "DELETE", &path, Some(&stranger), None).await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    let response = send(&ctx, "PATCH", &path, Some(&author), Some(json!({ "name": "Better stew" }))).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["name"], "Better stew");

    let response = send(&ctx, "PATCH", &path, Some(&admin), Some(json!({ "name": "Moderated stew" }))).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["name"], "Moderated stew");

    let response = send(&ctx, "DELETE", &path, Some(&admin), None).await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);

    let response = send(&ctx, "GET", &path, None, None).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn patch_replaces_ingredients_only_when_given() {
    let ctx = context().await;
    let (_, token) = user(&ctx, "author", UserRole::User).await;
    let salt = ingredient(&ctx, "Salt", "g").await;
    let sugar = ingredient(&ctx, "Sugar", "g").await;
    let lunch = tag(&ctx, "Lunch", "#49B64E", "lunch").await;
    let dinner = tag(&ctx, "Dinner", "#8775D2", "dinner").await;

    let id = create_recipe(
        &ctx,
        &token,
        recipe_payload("Stew", &[(salt.id, 5)], &[lunch.id], 10),
    )
    .await;
    let path = format!("/recipes/{id}/");

    let response = send(&ctx, "PATCH", &path, Some(&token), Some(json!({ "cooking_time": 20 }))).await;
    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    assert_eq!(body["cooking_time"], 20);
    assert_eq!(body["ingredients"].as_array().unwrap().len(), 1);
    assert_eq!(body["ingredients"][0]["name"], "Salt");
    assert_eq!(body["tags"][0]["slug"], "lunch");

    let response = send(
        &ctx,
        "PATCH",
        &path,
        Some(&token),
        Some(json!({
            "ingredients": [{ "id": sugar.id, "amount": 7 }],
            "tags": [dinner.id],
        })),
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    assert_eq!(
        body["ingredients"],
        json!([{ "id": sugar.id, "name": "Sugar", "measurement_unit": "g", "amount": 7 }])
    );
    assert_eq!(body["tags"][0]["slug"], "dinner");
    assert_eq!(body["cooking_time"], 20);

    let response = send(&ctx, "PATCH", &path, Some(&token), Some(json!({ "ingredients": [] }))).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn put_requires_every_field() {
    let ctx = context().await;
    let (_, token) = user(&ctx, "author", UserRole::User).await;
    let salt = ingredient(&ctx, "Salt", "g").await;
    let lunch = tag(&ctx, "Lunch", "#49B64E", "lunch").await;

    let id = create_recipe(
        &ctx,
        &token,
        recipe_payload("Stew", &[(salt.id, 5)], &[lunch.id], 10),
    )
    .await;
    let path = format!("/recipes/{id}/");

    let response = send(&ctx, "PUT", &path, Some(&token), Some(json!({ "name": "Only name" }))).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.json()["ingredients"].is_array());

    let response = send(
        &ctx,
        "PUT",
        &path,
        Some(&token),
        Some(recipe_payload("Full update", &[(salt.id, 9)], &[lunch.id], 45)),
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["name"], "Full update");
    assert_eq!(response.json()["ingredients"][0]["amount"], 9);
}

#[tokio::test]
async fn favorites_toggle() {
    let ctx = context().await;
    let (author, token) = user(&ctx, "author", UserRole::User).await;
    let salt = ingredient(&ctx, "Salt", "g").await;
    let lunch = tag(&ctx, "Lunch", "#49B64E", "lunch").await;

    let id = create_recipe(
        &ctx,
        &token,
        recipe_payload("Stew", &[(salt.id, 5)], &[lunch.id], 10),
    )
    .await;
    let path = format!("/recipes/{id}/favorite/");

    let response = send(&ctx, "POST", &path, Some(&token), None).await;
    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(
        response.json(),
        json!({
            "id": id,
            "name": "Stew",
            "image": "data:image/png;base64,iVBORw0KGgo=",
            "cooking_time": 10,
        })
    );

    let response = send(&ctx, "POST", &path, Some(&token), None).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.json()["errors"].is_string());
    assert_eq!(count_rows(&ctx, "favorites", author.id).await, 1);

    let detail = send(&ctx, "GET", &format!("/recipes/{id}/"), Some(&token), None).await;
    assert_eq!(detail.json()["is_favorited"], true);

    let response = send(&ctx, "DELETE", &path, Some(&token), None).await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);
    assert_eq!(count_rows(&ctx, "favorites", author.id).await, 0);

    let response = send(&ctx, "DELETE", &path, Some(&token), None).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = send(&ctx, "POST", "/recipes/9999/favorite/", Some(&token), None).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let response = send(&ctx, "POST", &path, None, None).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn shopping_list_sums_amounts() {
    let ctx = context().await;
    let (_, token) = user(&ctx, "author", UserRole::User).await;
    let salt = ingredient(&ctx, "Salt", "g").await;
    let flour = ingredient(&ctx, "Flour", "g").await;
    let lunch = tag(&ctx, "Lunch", "#49B64E", "lunch").await;

    let bread = create_recipe(
        &ctx,
        &token,
        recipe_payload("Bread", &[(salt.id, 5), (flour.id, 500)], &[lunch.id], 60),
    )
    .await;
    let soup = create_recipe(
        &ctx,
        &token,
        recipe_payload("Soup", &[(salt.id, 10)], &[lunch.id], 30),
    )
    .await;

    for id in [bread, soup] {
        let response = send(&ctx, "POST", &format!("/recipes/{id}/shopping_cart/"), Some(&token), None).await;
        assert_eq!(response.status, StatusCode::CREATED);
    }

    let response = send(&ctx, "GET", "/recipes/download_shopping_cart/", Some(&token), None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.text, "Flour - 500 g\nSalt - 15 g");
    assert_eq!(
        response.headers["content-disposition"],
        "attachment; filename=\"buylist.txt\""
    );
    assert!(response.headers["content-type"]
        .to_str()
        .unwrap()
        .starts_with("text/plain"));

    let response = send(&ctx, "GET", "/recipes/download_shopping_cart/", None, None).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn shopping_cart_conflicts() {
    let ctx = context().await;
    let (cook, token) = user(&ctx, "cook", UserRole::User).await;
    let salt = ingredient(&ctx, "Salt", "g").await;
    let lunch = tag(&ctx, "Lunch", "#49B64E", "lunch").await;

    let id = create_recipe(
        &ctx,
        &token,
        recipe_payload("Soup", &[(salt.id, 10)], &[lunch.id], 30),
    )
    .await;
    let path = format!("/recipes/{id}/shopping_cart/");

    let response = send(&ctx, "DELETE", &path, Some(&token), None).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.json()["errors"].is_string());

    let response = send(&ctx, "POST", &path, Some(&token), None).await;
    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.json()["name"], "Soup");

    let response = send(&ctx, "POST", &path, Some(&token), None).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.json()["errors"].is_string());
    assert_eq!(count_rows(&ctx, "shopping_carts", cook.id).await, 1);

    let detail = send(&ctx, "GET", &format!("/recipes/{id}/"), Some(&token), None).await;
    assert_eq!(detail.json()["is_in_shopping_cart"], true);

    let response = send(&ctx, "DELETE", &path, Some(&token), None).await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);
    assert_eq!(count_rows(&ctx, "shopping_carts", cook.id).await, 0);

    let response = send(&ctx, "DELETE", &path, Some(&token), None).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = send(&ctx, "POST", "/recipes/9999/shopping_cart/", Some(&token), None).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn list_filters_and_paginates() {
    let ctx = context().await;
    let (author, token) = user(&ctx, "author", UserRole::User).await;
    let (_, other) = user(&ctx, "other", UserRole::User).await;
    let salt = ingredient(&ctx, "Salt", "g").await;
    let lunch = tag(&ctx, "Lunch", "#49B64E", "lunch").await;
    let dinner = tag(&ctx, "Dinner", "#8775D2", "dinner").await;

    let first = create_recipe(&ctx, &token, recipe_payload("First", &[(salt.id, 1)], &[lunch.id], 10)).await;
    let second = create_recipe(&ctx, &token, recipe_payload("Second", &[(salt.id, 1)], &[dinner.id], 10)).await;
    let third = create_recipe(&ctx, &other, recipe_payload("Third", &[(salt.id, 1)], &[lunch.id], 10)).await;

    let response = send(&ctx, "GET", "/recipes/", None, None).await;
    let body = response.json();
    assert_eq!(body["count"], 3);
    let ids: Vec<i64> = body["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![third, second, first]);

    let response = send(&ctx, "GET", &format!("/recipes/?author={}", author.id), None, None).await;
    assert_eq!(response.json()["count"], 2);

    let response = send(&ctx, "GET", "/recipes/?tags=dinner&tags=breakfast", None, None).await;
    assert_eq!(response.json()["count"], 1);
    assert_eq!(response.json()["results"][0]["id"], second);

    let response = send(&ctx, "GET", "/recipes/?limit=2&page=2", None, None).await;
    let body = response.json();
    assert_eq!(body["count"], 3);
    assert_eq!(body["results"].as_array().unwrap().len(), 1);
    assert_eq!(body["previous"], 1);
    assert!(body["next"].is_null());

    send(&ctx, "POST", &format!("/recipes/{first}/favorite/"), Some(&token), None).await;
    let response = send(&ctx, "GET", "/recipes/?is_favorited=1", Some(&token), None).await;
    assert_eq!(response.json()["count"], 1);
    assert_eq!(response.json()["results"][0]["is_favorited"], true);

    let response = send(&ctx, "GET", "/recipes/?is_favorited=1", None, None).await;
    assert_eq!(response.json()["count"], 3);

    let response = send(&ctx, "GET", "/recipes/?author=me", None, None).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn routing_errors() {
    let ctx = context().await;

    let response = send(&ctx, "GET", "/nothing/here/", None, None).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let response = send(&ctx, "DELETE", "/tags/", None, None).await;
    assert_eq!(response.status, StatusCode::METHOD_NOT_ALLOWED);

    let response = send(&ctx, "GET", "/recipes", None, None).await;
    assert_eq!(response.status, StatusCode::OK);
}

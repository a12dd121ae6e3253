use std::{convert::Infallible, net::SocketAddr};

use warp::{filters::BoxedFilter, reply::Response, Filter, Rejection, Reply};

use crate::{
    actions::favorites::RecipeList,
    constants::MAX_BODY_SIZE,
    context::{with_context, Context},
    error::ApiError,
    form::FormData,
    jwt::SessionData,
    middleware::{with_possible_session, with_session},
    pagination::PageQuery,
    schema::Id,
};

use super::{
    handlers::{self, IngredientQuery, SubscriptionQuery},
    rejection::handle_rejection,
};

fn json_body() -> impl Filter<Extract = (FormData,), Error = Rejection> + Clone {
    warp::body::content_length_limit(MAX_BODY_SIZE).and(warp::body::json())
}

/// `true` for PATCH, `false` for PUT
fn update_method() -> impl Filter<Extract = (bool,), Error = Rejection> + Clone {
    warp::put()
        .map(|| false)
        .or(warp::patch().map(|| true))
        .unify()
}

fn recipe_list_routes(ctx: &Context, list: RecipeList, segment: &'static str) -> BoxedFilter<(Response,)> {
    let add = warp::path("recipes")
        .and(warp::path::param::<Id>())
        .and(warp::path(segment))
        .and(warp::path::end())
        .and(warp::post())
        .and(with_session(ctx.clone()))
        .and(with_context(ctx.clone()))
        .and_then(move |id: Id, session: SessionData, ctx: Context| {
            handlers::add_recipe_to(id, list, session, ctx)
        });

    let remove = warp::path("recipes")
        .and(warp::path::param::<Id>())
        .and(warp::path(segment))
        .and(warp::path::end())
        .and(warp::delete())
        .and(with_session(ctx.clone()))
        .and(with_context(ctx.clone()))
        .and_then(move |id: Id, session: SessionData, ctx: Context| {
            handlers::remove_recipe_from(id, list, session, ctx)
        });

    add.or(remove).unify().boxed()
}

fn recipe_routes(ctx: &Context) -> BoxedFilter<(Response,)> {
    let download = warp::path!("recipes" / "download_shopping_cart")
        .and(warp::get())
        .and(with_session(ctx.clone()))
        .and(with_context(ctx.clone()))
        .and_then(handlers::download_shopping_cart);

    let list = warp::path!("recipes")
        .and(warp::get())
        .and(warp::query::<Vec<(String, String)>>())
        .and(with_possible_session(ctx.clone()))
        .and(with_context(ctx.clone()))
        .and_then(handlers::list_recipes);

    let create = warp::path!("recipes")
        .and(warp::post())
        .and(with_session(ctx.clone()))
        .and(json_body())
        .and(with_context(ctx.clone()))
        .and_then(handlers::create_recipe);

    let detail = warp::path!("recipes" / Id)
        .and(warp::get())
        .and(with_possible_session(ctx.clone()))
        .and(with_context(ctx.clone()))
        .and_then(handlers::get_recipe);

    let update = warp::path!("recipes" / Id)
        .and(update_method())
        .and(with_session(ctx.clone()))
        .and(json_body())
        .and(with_context(ctx.clone()))
        .and_then(handlers::update_recipe);

    let delete = warp::path!("recipes" / Id)
        .and(warp::delete())
        .and(with_session(ctx.clone()))
        .and(with_context(ctx.clone()))
        .and_then(handlers::delete_recipe);

    download
        .or(list)
        .unify()
        .or(create)
        .unify()
        .or(detail)
        .unify()
        .or(update)
        .unify()
        .or(delete)
        .unify()
        .or(recipe_list_routes(ctx, RecipeList::Favorites, "favorite"))
        .unify()
        .or(recipe_list_routes(ctx, RecipeList::ShoppingCart, "shopping_cart"))
        .unify()
        .boxed()
}

fn ingredient_routes(ctx: &Context) -> BoxedFilter<(Response,)> {
    let list = warp::path!("ingredients")
        .and(warp::get())
        .and(warp::query::<IngredientQuery>())
        .and(with_context(ctx.clone()))
        .and_then(handlers::list_ingredients);

    let create = warp::path!("ingredients")
        .and(warp::post())
        .and(with_session(ctx.clone()))
        .and(json_body())
        .and(with_context(ctx.clone()))
        .and_then(handlers::create_ingredient);

    let detail = warp::path!("ingredients" / Id)
        .and(warp::get())
        .and(with_context(ctx.clone()))
        .and_then(handlers::get_ingredient);

    list.or(create).unify().or(detail).unify().boxed()
}

fn tag_routes(ctx: &Context) -> BoxedFilter<(Response,)> {
    let list = warp::path!("tags")
        .and(warp::get())
        .and(with_context(ctx.clone()))
        .and_then(handlers::list_tags);

    let create = warp::path!("tags")
        .and(warp::post())
        .and(with_session(ctx.clone()))
        .and(json_body())
        .and(with_context(ctx.clone()))
        .and_then(handlers::create_tag);

    let detail = warp::path!("tags" / Id)
        .and(warp::get())
        .and(with_context(ctx.clone()))
        .and_then(handlers::get_tag);

    list.or(create).unify().or(detail).unify().boxed()
}

fn user_routes(ctx: &Context) -> BoxedFilter<(Response,)> {
    let me = warp::path!("users" / "me")
        .and(warp::get())
        .and(with_session(ctx.clone()))
        .and(with_context(ctx.clone()))
        .and_then(handlers::me);

    let set_password = warp::path!("users" / "set_password")
        .and(warp::post())
        .and(with_session(ctx.clone()))
        .and(json_body())
        .and(with_context(ctx.clone()))
        .and_then(handlers::set_password);

    let subscriptions = warp::path!("users" / "subscriptions")
        .and(warp::get())
        .and(warp::query::<SubscriptionQuery>())
        .and(with_session(ctx.clone()))
        .and(with_context(ctx.clone()))
        .and_then(handlers::list_subscriptions);

    let subscribe = warp::path!("users" / Id / "subscribe")
        .and(warp::post())
        .and(warp::query::<SubscriptionQuery>())
        .and(with_session(ctx.clone()))
        .and(with_context(ctx.clone()))
        .and_then(handlers::subscribe);

    let unsubscribe = warp::path!("users" / Id / "subscribe")
        .and(warp::delete())
        .and(with_session(ctx.clone()))
        .and(with_context(ctx.clone()))
        .and_then(handlers::unsubscribe);

    let list = warp::path!("users")
        .and(warp::get())
        .and(warp::query::<PageQuery>())
        .and(with_possible_session(ctx.clone()))
        .and(with_context(ctx.clone()))
        .and_then(handlers::list_users);

    let register = warp::path!("users")
        .and(warp::post())
        .and(json_body())
        .and(with_context(ctx.clone()))
        .and_then(handlers::register);

    let detail = warp::path!("users" / Id)
        .and(warp::get())
        .and(with_possible_session(ctx.clone()))
        .and(with_context(ctx.clone()))
        .and_then(handlers::get_user);

    me.or(set_password)
        .unify()
        .or(subscriptions)
        .unify()
        .or(subscribe)
        .unify()
        .or(unsubscribe)
        .unify()
        .or(list)
        .unify()
        .or(register)
        .unify()
        .or(detail)
        .unify()
        .boxed()
}

fn auth_routes(ctx: &Context) -> BoxedFilter<(Response,)> {
    let login = warp::path!("auth" / "token" / "login")
        .and(warp::post())
        .and(json_body())
        .and(with_context(ctx.clone()))
        .and_then(handlers::login);

    let logout = warp::path!("auth" / "token" / "logout")
        .and(warp::post())
        .and(with_session(ctx.clone()))
        .and(with_context(ctx.clone()))
        .and_then(handlers::logout);

    login.or(logout).unify().boxed()
}

/// Every endpoint, with error rendering and request logging
pub fn routes(
    ctx: Context,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    recipe_routes(&ctx)
        .or(ingredient_routes(&ctx))
        .unify()
        .or(tag_routes(&ctx))
        .unify()
        .or(user_routes(&ctx))
        .unify()
        .or(auth_routes(&ctx))
        .unify()
        .recover(handle_rejection)
        .unify()
        .with(warp::log("foodgram::api"))
}

pub async fn start_server(ctx: Context) -> Result<(), ApiError> {
    let addr: SocketAddr = ctx
        .config
        .server
        .bind
        .parse()
        .map_err(|e| ApiError::Internal(format!("invalid bind address: {e}")))?;

    let (addr, server) = warp::serve(routes(ctx))
        .try_bind_with_graceful_shutdown(addr, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                log::error!("could not listen for shutdown signal: {e}");
            }
        })
        .map_err(|e| ApiError::Internal(format!("could not bind: {e}")))?;

    log::info!("listening on http://{addr}");
    server.await;
    log::info!("server stopped");

    Ok(())
}

use std::{convert::Infallible, sync::Arc};

use sqlx::{Pool, Sqlite};
use warp::Filter;

use crate::config::AppConfig;

/// Shared state handed to every route
#[derive(Clone)]
pub struct Context {
    pub pool: Pool<Sqlite>,
    pub config: Arc<AppConfig>,
}

impl Context {
    pub fn new(pool: Pool<Sqlite>, config: AppConfig) -> Self {
        Self {
            pool,
            config: Arc::new(config),
        }
    }
}

pub fn with_context(ctx: Context) -> impl Filter<Extract = (Context,), Error = Infallible> + Clone {
    warp::any().map(move || ctx.clone())
}

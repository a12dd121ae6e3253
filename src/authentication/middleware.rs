use warp::{reject::Rejection, Filter};

use crate::{
    actions::tokens::is_token_revoked,
    context::Context,
    error::ApiError,
};

use super::jwt::{verify_jwt_session, SessionData};

/// Accepts `Token <jwt>` and `Bearer <jwt>`
fn parse_authorization(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    match scheme {
        "Token" | "Bearer" => Some(token.trim()).filter(|t| !t.is_empty()),
        _ => None,
    }
}

async fn resolve_session(header: Option<String>, ctx: Context) -> Result<Option<SessionData>, ApiError> {
    let header = match header {
        Some(header) => header,
        None => return Ok(None),
    };

    let token = parse_authorization(&header)
        .ok_or_else(|| ApiError::InvalidSession("Invalid token header.".to_string()))?;
    let session: SessionData = verify_jwt_session(token, &ctx.config.auth.secret_key)?.into();

    if is_token_revoked(&session.jti, &ctx.pool).await? {
        return Err(ApiError::InvalidSession("Invalid token.".to_string()));
    }

    Ok(Some(session))
}

pub fn with_session(
    ctx: Context,
) -> impl Filter<Extract = (SessionData,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization").and_then(move |header: Option<String>| {
        let ctx = ctx.clone();
        async move {
            match resolve_session(header, ctx).await {
                Ok(Some(session)) => Ok(session),
                Ok(None) => Err(warp::reject::custom(ApiError::Unauthorized)),
                Err(e) => Err(warp::reject::custom(e)),
            }
        }
    })
}

pub fn with_possible_session(
    ctx: Context,
) -> impl Filter<Extract = (Option<SessionData>,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization").and_then(move |header: Option<String>| {
        let ctx = ctx.clone();
        async move {
            resolve_session(header, ctx)
                .await
                .map_err(warp::reject::custom)
        }
    })
}

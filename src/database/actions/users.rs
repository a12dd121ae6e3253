use once_cell::sync::Lazy;
use regex::Regex;
use sqlx::{Pool, Sqlite};

use crate::{
    authentication::{
        cryptography::{hash_password, verify_password},
        jwt::generate_jwt_session,
    },
    config::AuthConfig,
    constants::{EMAIL_MAX_LENGTH, PASSWORD_MIN_LENGTH, USERNAME_PATTERN, USER_FIELD_MAX_LENGTH},
    error::{ApiError, QueryError, ValidationErrors},
    form::Form,
    pagination::{PageContext, PageQuery},
    schema::{Id, User, UserRole, UserRow, UserView},
    validation::{pattern_str, required_str},
};

static USERNAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(USERNAME_PATTERN).expect("valid username pattern"));

/// Registration payload after validation
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

impl NewUser {
    pub fn from_form(form: &Form) -> Result<Self, ApiError> {
        let mut errors = ValidationErrors::new();

        let email = required_str(form, "email", EMAIL_MAX_LENGTH, &mut errors);
        if let Some(email) = &email {
            if !validator::validate_email(email.as_str()) {
                errors.add("email", "Enter a valid email address.");
            }
        }
        let username = pattern_str(
            form,
            "username",
            USER_FIELD_MAX_LENGTH,
            &USERNAME_RE,
            "Enter a valid username.",
            &mut errors,
        );
        let first_name = required_str(form, "first_name", USER_FIELD_MAX_LENGTH, &mut errors);
        let last_name = required_str(form, "last_name", USER_FIELD_MAX_LENGTH, &mut errors);
        let password = validate_new_password(form, "password", &mut errors);

        errors.into_result()?;

        match (email, username, first_name, last_name, password) {
            (Some(email), Some(username), Some(first_name), Some(last_name), Some(password)) => {
                Ok(Self {
                    email,
                    username,
                    first_name,
                    last_name,
                    password,
                })
            }
            _ => Err(ApiError::InvalidRequest("Invalid registration data".to_string())),
        }
    }
}

fn validate_new_password(form: &Form, field: &str, errors: &mut ValidationErrors) -> Option<String> {
    let password = required_str(form, field, usize::MAX, errors)?;
    if password.chars().count() < PASSWORD_MIN_LENGTH {
        errors.add(
            field,
            format!("This password is too short. It must contain at least {PASSWORD_MIN_LENGTH} characters."),
        );
        return None;
    }
    Some(password)
}

pub async fn get_user_by_email(
    email: &str,
    pool: &Pool<Sqlite>,
) -> Result<Option<User>, ApiError> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE LOWER(email) = LOWER(?)")
        .bind(email)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn get_user_by_id(user_id: Id, pool: &Pool<Sqlite>) -> Result<Option<User>, ApiError> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn require_user(user_id: Id, pool: &Pool<Sqlite>) -> Result<User, ApiError> {
    get_user_by_id(user_id, pool)
        .await?
        .ok_or_else(|| ApiError::not_found("User"))
}

/// Creates a user; duplicate email or username is reported per field
pub async fn register_user(
    user: &NewUser,
    role: UserRole,
    pool: &Pool<Sqlite>,
) -> Result<User, ApiError> {
    let mut errors = ValidationErrors::new();
    if get_user_by_email(&user.email, pool).await?.is_some() {
        errors.add("email", "A user with that email already exists.");
    }
    let taken: Option<(Id,)> = sqlx::query_as("SELECT id FROM users WHERE username = ?")
        .bind(&user.username)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;
    if taken.is_some() {
        errors.add("username", "A user with that username already exists.");
    }
    errors.into_result()?;

    let password = hash_password(&user.password)
        .map_err(|e| ApiError::Internal(format!("could not hash password: {e}")))?;

    let created: Option<User> = sqlx::query_as(
        "
        INSERT INTO users (email, username, first_name, last_name, password, role)
        VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT DO NOTHING RETURNING *
    ",
    )
    .bind(&user.email)
    .bind(&user.username)
    .bind(&user.first_name)
    .bind(&user.last_name)
    .bind(password)
    .bind(role)
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    match created {
        Some(created) => {
            log::info!("registered user {} ({})", created.username, role.as_str());
            Ok(created)
        }
        None => Err(ApiError::InvalidRequest(
            "A user with that email or username already exists.".to_string(),
        )),
    }
}

pub async fn login_user(
    email: &str,
    password: &str,
    auth: &AuthConfig,
    pool: &Pool<Sqlite>,
) -> Result<String, ApiError> {
    let invalid = || {
        ApiError::field(
            "non_field_errors",
            "Unable to log in with provided credentials.",
        )
    };

    let user = get_user_by_email(email, pool).await?.ok_or_else(invalid)?;
    let authenticated = verify_password(password, &user.password)
        .map_err(|e| ApiError::Internal(format!("stored password hash is invalid: {e}")))?;
    if !authenticated {
        return Err(invalid());
    }

    generate_jwt_session(&user, &auth.secret_key, auth.token_lifetime_hours)
}

pub async fn set_password(
    user_id: Id,
    current_password: &str,
    new_password: &str,
    pool: &Pool<Sqlite>,
) -> Result<(), ApiError> {
    let user = require_user(user_id, pool).await?;
    let authenticated = verify_password(current_password, &user.password)
        .map_err(|e| ApiError::Internal(format!("stored password hash is invalid: {e}")))?;
    if !authenticated {
        return Err(ApiError::field("current_password", "Invalid password."));
    }

    let hash = hash_password(new_password)
        .map_err(|e| ApiError::Internal(format!("could not hash password: {e}")))?;

    sqlx::query("UPDATE users SET password = ? WHERE id = ?")
        .bind(hash)
        .bind(user_id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(())
}

pub fn validate_set_password(form: &Form) -> Result<(String, String), ApiError> {
    let mut errors = ValidationErrors::new();
    let new_password = validate_new_password(form, "new_password", &mut errors);
    let current_password = required_str(form, "current_password", usize::MAX, &mut errors);
    errors.into_result()?;

    match (new_password, current_password) {
        (Some(new_password), Some(current_password)) => Ok((new_password, current_password)),
        _ => Err(ApiError::InvalidRequest("Invalid password data".to_string())),
    }
}

pub async fn is_subscribed(
    requester: Option<Id>,
    author_id: Id,
    pool: &Pool<Sqlite>,
) -> Result<bool, ApiError> {
    let requester = match requester {
        Some(requester) => requester,
        None => return Ok(false),
    };

    let row: Option<(Id,)> =
        sqlx::query_as("SELECT id FROM subscriptions WHERE user_id = ? AND author_id = ?")
            .bind(requester)
            .bind(author_id)
            .fetch_optional(pool)
            .await
            .map_err(QueryError::from)?;

    Ok(row.is_some())
}

pub async fn get_user_view(
    user_id: Id,
    requester: Option<Id>,
    pool: &Pool<Sqlite>,
) -> Result<UserView, ApiError> {
    let user = require_user(user_id, pool).await?;
    let subscribed = is_subscribed(requester, user.id, pool).await?;

    Ok(UserView::from_user(user, subscribed))
}

pub async fn fetch_users(
    requester: Option<Id>,
    page: PageQuery,
    page_size: i64,
    pool: &Pool<Sqlite>,
) -> Result<PageContext<UserView>, ApiError> {
    let rows: Vec<UserRow> = sqlx::query_as(
        "
        SELECT u.*,
            EXISTS (SELECT 1 FROM subscriptions s WHERE s.user_id = ? AND s.author_id = u.id) AS is_subscribed,
            COUNT(*) OVER() AS count
        FROM users u
        ORDER BY u.username
        LIMIT ? OFFSET ?
    ",
    )
    .bind(requester)
    .bind(page.limit(page_size))
    .bind(page.offset(page_size))
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    let total_count = rows.first().map(|row| row.count).unwrap_or(0);
    let rows = rows.into_iter().map(UserView::from).collect();

    Ok(PageContext::from_rows(
        rows,
        total_count,
        page.limit(page_size),
        page.page(),
    ))
}

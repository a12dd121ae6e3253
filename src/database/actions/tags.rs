use once_cell::sync::Lazy;
use regex::Regex;
use sqlx::{Pool, Sqlite};

use crate::{
    constants::{TAG_COLOR_PATTERN, TAG_FIELD_MAX_LENGTH, TAG_SLUG_PATTERN},
    error::{ApiError, QueryError, ValidationErrors},
    form::Form,
    schema::{Id, Tag},
    validation::{pattern_str, required_str},
};

static COLOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(TAG_COLOR_PATTERN).expect("valid color pattern"));
static SLUG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(TAG_SLUG_PATTERN).expect("valid slug pattern"));

#[derive(Debug, Clone, PartialEq)]
pub struct NewTag {
    pub name: String,
    pub color: String,
    pub slug: String,
}

impl NewTag {
    pub fn from_form(form: &Form) -> Result<Self, ApiError> {
        let mut errors = ValidationErrors::new();
        let name = required_str(form, "name", TAG_FIELD_MAX_LENGTH, &mut errors);
        let color = pattern_str(
            form,
            "color",
            7,
            &COLOR_RE,
            "Enter a color in hex format (#ABCDEF).",
            &mut errors,
        );
        let slug = pattern_str(
            form,
            "slug",
            TAG_FIELD_MAX_LENGTH,
            &SLUG_RE,
            "Enter a valid slug consisting of letters, numbers, underscores or hyphens.",
            &mut errors,
        );
        errors.into_result()?;

        match (name, color, slug) {
            (Some(name), Some(color), Some(slug)) => Ok(Self { name, color, slug }),
            _ => Err(ApiError::InvalidRequest("Invalid tag".to_string())),
        }
    }
}

pub async fn create_tag(tag: &NewTag, pool: &Pool<Sqlite>) -> Result<Tag, ApiError> {
    let mut errors = ValidationErrors::new();
    for (field, value) in [("name", &tag.name), ("color", &tag.color), ("slug", &tag.slug)] {
        let taken: Option<(Id,)> =
            sqlx::query_as(&format!("SELECT id FROM tags WHERE {field} = ?"))
                .bind(value)
                .fetch_optional(pool)
                .await
                .map_err(QueryError::from)?;
        if taken.is_some() {
            errors.add(field, format!("Tag with this {field} already exists."));
        }
    }
    errors.into_result()?;

    let created: Option<Tag> = sqlx::query_as(
        "INSERT INTO tags (name, color, slug) VALUES (?, ?, ?) ON CONFLICT DO NOTHING RETURNING *",
    )
    .bind(&tag.name)
    .bind(&tag.color)
    .bind(&tag.slug)
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    created.ok_or_else(|| ApiError::InvalidRequest("Tag already exists.".to_string()))
}

pub async fn get_tag(id: Id, pool: &Pool<Sqlite>) -> Result<Option<Tag>, ApiError> {
    let tag: Option<Tag> = sqlx::query_as("SELECT * FROM tags WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(tag)
}

pub async fn list_tags(pool: &Pool<Sqlite>) -> Result<Vec<Tag>, ApiError> {
    let list: Vec<Tag> = sqlx::query_as("SELECT * FROM tags ORDER BY name")
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(list)
}

pub async fn list_recipe_tags(recipe_id: Id, pool: &Pool<Sqlite>) -> Result<Vec<Tag>, ApiError> {
    let list: Vec<Tag> = sqlx::query_as(
        "
        SELECT t.*
        FROM recipe_tags rt
        INNER JOIN tags t ON t.id = rt.tag_id
        WHERE rt.recipe_id = ?
        ORDER BY t.name
    ",
    )
    .bind(recipe_id)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(list)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn form(value: serde_json::Value) -> Form {
        Form::from_data(serde_json::from_value(value).unwrap())
    }

    #[test]
    fn color_must_be_hex() {
        let bad = NewTag::from_form(&form(json!({
            "name": "Breakfast", "color": "#GGGGGG", "slug": "breakfast"
        })));
        assert!(matches!(bad, Err(ApiError::Validation(e)) if e.contains("color")));

        let good = NewTag::from_form(&form(json!({
            "name": "Breakfast", "color": "#E26C2D", "slug": "breakfast"
        })))
        .unwrap();
        assert_eq!(good.color, "#E26C2D");
    }

    #[test]
    fn slug_rejects_spaces() {
        let bad = NewTag::from_form(&form(json!({
            "name": "Lunch", "color": "#49B64E", "slug": "late lunch"
        })));
        assert!(matches!(bad, Err(ApiError::Validation(e)) if e.contains("slug")));
    }
}

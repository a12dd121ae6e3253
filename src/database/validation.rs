use regex::Regex;

use super::{error::ValidationErrors, form::Form};

/// Required, non-blank string no longer than `max_length` characters
pub fn required_str(
    form: &Form,
    field: &str,
    max_length: usize,
    errors: &mut ValidationErrors,
) -> Option<String> {
    match form.get_str(field) {
        Ok(value) if value.trim().is_empty() => {
            errors.add(field, "This field may not be blank.");
            None
        }
        Ok(value) if value.chars().count() > max_length => {
            errors.add(
                field,
                format!("Ensure this field has no more than {max_length} characters."),
            );
            None
        }
        Ok(value) => Some(value),
        Err(e) => {
            errors.add(field, e.to_string());
            None
        }
    }
}

/// Like [`required_str`], additionally matched against `pattern`
pub fn pattern_str(
    form: &Form,
    field: &str,
    max_length: usize,
    pattern: &Regex,
    message: &str,
    errors: &mut ValidationErrors,
) -> Option<String> {
    let value = required_str(form, field, max_length, errors)?;
    if !pattern.is_match(&value) {
        errors.add(field, message);
        return None;
    }
    Some(value)
}

/// Integer within `min..=max`
pub fn bounded_number(
    form: &Form,
    field: &str,
    min: i64,
    max: i64,
    errors: &mut ValidationErrors,
) -> Option<i64> {
    match form.get_number(field) {
        Ok(value) => check_bounds(field, value, min, max, errors),
        Err(e) => {
            errors.add(field, e.to_string());
            None
        }
    }
}

pub fn check_bounds(
    field: &str,
    value: i64,
    min: i64,
    max: i64,
    errors: &mut ValidationErrors,
) -> Option<i64> {
    if value < min {
        errors.add(
            field,
            format!("Ensure this value is greater than or equal to {min}."),
        );
        None
    } else if value > max {
        errors.add(
            field,
            format!("Ensure this value is less than or equal to {max}."),
        );
        None
    } else {
        Some(value)
    }
}

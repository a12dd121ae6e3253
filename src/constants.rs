pub const RECIPE_COUNT_PER_PAGE: i64 = 6;
pub const MAX_PAGE_SIZE: i64 = 100;

/// Recipes shown per author in the subscriptions list unless `recipes_limit` is given.
pub const RECIPES_LIMIT: i64 = 3;

pub const COOKING_TIME_MIN: i64 = 1;
pub const COOKING_TIME_MAX: i64 = 600;

pub const AMOUNT_MIN: i64 = 1;
pub const AMOUNT_MAX: i64 = 1440;

pub const RECIPE_NAME_MAX_LENGTH: usize = 200;
pub const RECIPE_TEXT_MAX_LENGTH: usize = 2000;
pub const TAG_FIELD_MAX_LENGTH: usize = 200;
pub const USER_FIELD_MAX_LENGTH: usize = 150;
pub const EMAIL_MAX_LENGTH: usize = 254;
pub const PASSWORD_MIN_LENGTH: usize = 8;

pub const TAG_COLOR_PATTERN: &str = r"^#[a-fA-F0-9]{6}$";
pub const TAG_SLUG_PATTERN: &str = r"^[-a-zA-Z0-9_]+$";
pub const USERNAME_PATTERN: &str = r"^[\w.@+-]+$";

pub const SHOPPING_LIST_FILENAME: &str = "buylist.txt";

pub const MAX_BODY_SIZE: u64 = 1024 * 1024 * 16;

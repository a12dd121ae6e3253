pub mod favorites;
pub mod import;
pub mod ingredients;
pub mod recipes;
pub mod shopping_list;
pub mod subscriptions;
pub mod tags;
pub mod tokens;
pub mod users;

pub mod admin;
pub mod categories;
pub mod health;
pub mod import_export;
pub mod questions;
pub mod test_routes;
pub mod updates;

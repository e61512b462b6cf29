// HTTP surface: one router per area, assembled in `routes`

pub mod auth;
pub mod brotherhood;
pub mod bugs;
pub mod ebooks;
pub mod email_templates;
pub mod health;
pub mod live;
pub mod login_logs;
pub mod marketing;
pub mod nutrition;
pub mod packages;
pub mod profile;
pub mod progress;
pub mod routes;
pub mod training;

pub use routes::{create_routes, AppServices};

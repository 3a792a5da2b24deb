pub mod auth;
pub mod certificates;
pub mod courses;
pub mod health;
pub mod learning_paths;
pub mod payments;
pub mod subscriptions;
pub mod users;

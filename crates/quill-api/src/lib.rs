pub mod articles;
pub mod auth;
pub mod comments;
pub mod error;
pub mod guard;
pub mod routes;
pub mod state;
pub mod users;
pub mod validation;

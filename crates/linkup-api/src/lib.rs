pub mod auth;
pub mod connections;
pub mod error;
pub mod messages;
pub mod middleware;
pub mod routes;
pub mod state;

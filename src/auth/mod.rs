pub mod auth;
pub mod face;
pub mod handlers;
pub mod jwt;
pub mod middleware;
pub mod password;

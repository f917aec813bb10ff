pub mod auth;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod response;
pub mod routes;
pub mod state;

#[cfg(test)]
mod testing;

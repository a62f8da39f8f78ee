//! Realtime support chat backend: a session store, change notifications,
//! the visitor and admin client state machines, and the HTTP surface.

pub mod clients;
pub mod config;
pub mod db;
pub mod docs;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod services;
pub mod state;
pub mod types;
pub mod utils;
pub mod validation;

pub mod batch;
pub mod config;
pub mod dialect;
pub mod error;
pub mod routes;
pub mod rules;
pub mod schema;
pub mod service;
pub mod state;
pub mod translate;

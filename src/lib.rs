pub mod config;
pub mod dataset;
pub mod db;
pub mod error;
pub mod logging;
pub mod middleware;
pub mod ml;
pub mod models;
pub mod routes;
pub mod services;

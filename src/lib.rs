// Library exports for the corpus gateway

pub mod backend;
pub mod clients;
pub mod coercion;
pub mod config;
pub mod env_interpolation;
pub mod error;
pub mod health;
pub mod middleware;
pub mod relay;
pub mod routes;
pub mod routing;

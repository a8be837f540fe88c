pub mod config;
pub mod constants;
pub mod logging;
pub mod middleware;
pub mod monitoring;
pub mod response;
pub mod routes;
pub mod screening;
pub mod state;

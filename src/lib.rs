// Library for the server, the sampler binary and tests

pub mod config;
pub mod counter_source;
pub mod error;
pub mod interval;
pub mod logging;
pub mod metrics_repo;
pub mod models;
pub mod routes;
pub mod sampler;
pub mod version;
pub mod worker;

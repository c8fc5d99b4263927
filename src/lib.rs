pub mod config;
pub mod error;
pub mod indicator;
pub mod manager;
pub mod model;
pub mod registry;
pub mod series;
pub mod sink;
pub mod store;

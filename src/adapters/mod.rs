//! Concrete adapters for the port traits.

pub mod csv_feed_adapter;
pub mod file_config_adapter;
pub mod sim_broker_adapter;

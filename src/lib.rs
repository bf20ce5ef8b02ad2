pub mod configuration;
pub mod migration;
pub mod selection;
pub mod storage;
pub mod types;

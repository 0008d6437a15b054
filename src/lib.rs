pub mod categorize;
pub mod clock;
pub mod config;
pub mod dedup;
pub mod demo;
pub mod extract;
pub mod import;
pub mod mapping;
pub mod models;
pub mod pipeline;
pub mod scan;
pub mod storage;
pub mod summary;

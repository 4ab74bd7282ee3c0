pub mod catalog;
pub mod completeness;
pub mod config;
pub mod error;
pub mod filesystem;
pub mod internal_products;
pub mod manifest;
pub mod orphan_stores;
pub mod presence;
pub mod runtime;

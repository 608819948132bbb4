pub mod api;
pub mod config;
pub mod engine;
pub mod extension;
pub mod humanize;
pub mod ledger;
pub mod observability;

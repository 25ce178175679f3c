pub mod bazos;
pub mod config;
pub mod crawler;
pub mod enricher;
pub mod error;
pub mod export;
pub mod history;
pub mod identity;
pub mod models;
pub mod notify;
pub mod observer;
pub mod parser;
pub mod reconcile;
pub mod render;
pub mod store;
pub mod tui;

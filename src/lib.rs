pub mod app;
pub mod charts;
pub mod color;
pub mod config;
pub mod data;
pub mod error;
pub mod fetch;
pub mod state;
pub mod ui;

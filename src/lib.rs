pub mod app;
pub mod catalog;
pub mod config;
pub mod core;
pub mod library;
pub mod model;
pub mod player;
pub mod sequencer;
pub mod store;
pub mod ui;

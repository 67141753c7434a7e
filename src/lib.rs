//! Stream picker for debrid-backed Stremio addons (AIOStreams, Comet,
//! Torrentio), with a terminal UI and an external player.

pub mod addon;
pub mod catalog;
pub mod config;
pub mod content;
pub mod controller;
pub mod doctor;
pub mod history;
pub mod navigation;
pub mod parser;
pub mod player;
pub mod screen;
pub mod source;
pub mod store;
pub mod trakt;
pub mod tui;
pub mod view;

//! Core library for music-top-tracks-playlist-gen
pub mod config;
pub mod error;
pub mod models;
pub mod cancel;
pub mod api;
pub mod aggregator;
pub mod resolver;
pub mod writer;
pub mod generator;
pub mod util;

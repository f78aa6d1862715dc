//! Set Decoder
//!
//! Identifies the tracks played in a long DJ set. The set is downloaded,
//! sampled at a fixed stride, each sample is fingerprinted through AudD, and
//! the answers are folded into a deduplicated, time-ordered track list that
//! clients poll through a small job API.

pub mod app_state;
pub mod config;
pub mod models;
pub mod routes;
pub mod services;

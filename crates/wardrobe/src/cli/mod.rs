//! Command modules for the wardrobe CLI.

pub mod config;
pub mod extract;
pub mod train;

//! Wire types, configuration and display formatting shared by the Beats
//! jukebox client crates.

pub mod config;
pub mod format;
pub mod platform;
pub mod protocol;

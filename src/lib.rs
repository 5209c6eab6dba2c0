pub mod config;
pub mod gesture;
pub mod landmark;
pub mod protocol;
pub mod stats;
pub mod trigger;

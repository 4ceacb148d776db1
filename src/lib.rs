pub mod catalog;
pub mod config;
pub mod engine_core;
pub mod gate;
pub mod serial;
pub mod sites;

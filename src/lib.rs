pub mod common;
pub mod config;
pub mod cost;
pub mod error;
pub mod exploration;
pub mod heuristic;
pub mod landmark;
pub mod problem;
pub mod stat;

pub mod config;
pub mod database;
pub mod models;
pub mod tracker;
pub mod ui;
pub mod usage_stats;
pub mod util;

#[cfg(test)]
mod tests;

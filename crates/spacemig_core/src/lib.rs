pub mod api;
pub mod client;
pub mod commands;
pub mod config;
pub mod contracts;
pub mod create;
pub mod driver;
pub mod enumerate;
pub mod error;
pub mod hierarchy;
pub mod model;
pub mod progress;
pub mod runtime;
pub mod subresources;

#[cfg(test)]
mod test_support;

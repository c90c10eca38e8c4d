pub mod algorithms;
pub mod config;
pub mod connection;
pub mod dispatch;
pub mod driver;
pub mod engine;
pub mod error;
pub mod events;
pub mod models;
pub mod output;
pub mod protocol;
pub mod retry;
pub mod state;

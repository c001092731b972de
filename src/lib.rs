pub mod auth;
pub mod config;
pub mod domain;
pub mod graph;
pub mod http;
pub mod report;
pub mod retry;
pub mod state;

//! HTTP surface and orchestration for the decora generation platform.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod response;
pub mod router;
pub mod routes;
pub mod services;
pub mod state;
pub mod storage;

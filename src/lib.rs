//! Client for a Job Tracker backend: session persistence, the REST gateway,
//! authentication, route guarding and the optimistic jobs engine.

pub mod api;
pub mod auth;
pub mod commands;
pub mod db;
pub mod guard;
pub mod models;
pub mod session;
pub mod sync;

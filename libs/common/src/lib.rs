//! Common library for the task-management backend
//!
//! This crate provides shared functionality used by the API service:
//! database connectivity, schema setup, and shared error types.

pub mod database;
pub mod error;

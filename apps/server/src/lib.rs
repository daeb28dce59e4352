//! Radiology department API server.
//!
//! Staff accounts, patient registration, visit tracking and the nurse/doctor
//! assessment forms of a hospital radiology department, served as JSON over
//! HTTP with an audit trail and a real-time change feed.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod realtime;
pub mod services;
pub mod startup;
pub mod state;

pub use config::Config;
pub use error::{Error, Result};

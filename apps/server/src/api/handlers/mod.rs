//! HTTP handlers. Each one extracts, delegates to a service, and shapes the response.

pub mod admin;
pub mod auth;
pub mod forms;
pub mod patients;
pub mod realtime;
pub mod users;
pub mod visits;

//! HTTP handlers

pub mod health;
pub mod logs;
pub mod analytics;
pub mod prevention;
pub mod faults;

//! Request middleware

pub mod faults;

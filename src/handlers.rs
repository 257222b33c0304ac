// src/handlers.rs

pub mod auth;
pub mod dashboard;
pub mod diagnostics;
pub mod enrollments;
pub mod payments;
pub mod settings;
pub mod students;

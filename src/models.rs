// src/models.rs

pub mod dashboard;
pub mod diagnostics;
pub mod enrollment;
pub mod payment;
pub mod secretary;
pub mod settings;
pub mod student;

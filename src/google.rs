// src/google.rs

pub mod auth;
pub use auth::{ServiceAccountAuth, ServiceAccountCredentials};

// src/services.rs

pub mod auth;
pub mod config_service;
pub mod dashboard_service;
pub mod diagnostics_service;
pub mod enrollment_service;
pub mod mercadopago;
pub mod payment_service;
pub mod pix;
pub mod student_service;

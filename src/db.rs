// src/db.rs

pub mod sheets;
pub use sheets::{GoogleSheetsClient, SheetStore};
pub mod tab;
pub mod student_repo;
pub use student_repo::StudentRepository;
pub mod enrollment_repo;
pub use enrollment_repo::EnrollmentRepository;
pub mod order_repo;
pub use order_repo::OrderRepository;
pub mod payment_repo;
pub use payment_repo::PaymentRepository;
pub mod user_repo;
pub use user_repo::UserRepository;

#[cfg(test)]
pub mod memory;

// src/common.rs

pub mod cpf;
pub mod error;
pub mod i18n;
pub mod keyed_lock;
pub mod sheet_table;

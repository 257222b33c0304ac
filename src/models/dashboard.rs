// src/models/dashboard.rs

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;

// Cards do painel da secretaria
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub total_students: usize,      // Cadastros na aba "dados pessoais"
    pub pending_enrollments: usize, // Ainda sem matrícula
    pub enrollments: usize,         // Linhas em "matriculas"
    pub enrollments_by_ciclo: BTreeMap<String, usize>,
    pub book_orders: usize,
    pub payments_by_status: BTreeMap<String, usize>,
    #[schema(value_type = f64, example = 1350.0)]
    pub approved_amount: Decimal,   // Soma dos pagamentos aprovados
}

// src/services/dashboard_service.rs

use std::collections::{BTreeMap, HashSet};
use std::str::FromStr;

use rust_decimal::Decimal;

use crate::{
    common::{cpf::normalize_cpf, error::AppError},
    db::{EnrollmentRepository, OrderRepository, PaymentRepository, StudentRepository},
    models::{
        dashboard::DashboardSummary,
        enrollment::PendingCriterion,
        payment::{PaymentStatus, PendingPaymentRecord},
    },
    services::enrollment_service::resolve_pending,
};

const NO_CICLO: &str = "sem ciclo";

/// Lê valores monetários como a planilha guarda: "45.00", "45,00",
/// "R$ 1.350,00", "1.350". Sem vírgula, ponto seguido de exatamente três
/// dígitos (ou mais de um ponto) é separador de milhar.
pub fn parse_amount(raw: &str) -> Option<Decimal> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, ',' | '.' | '-'))
        .collect();
    if cleaned.is_empty() {
        return None;
    }

    let thousands_only = cleaned.matches('.').count() > 1
        || cleaned
            .split_once('.')
            .is_some_and(|(_, decimals)| decimals.len() == 3);

    let normalized = if cleaned.contains(',') {
        // Formato brasileiro: ponto de milhar, vírgula decimal
        cleaned.replace('.', "").replace(',', ".")
    } else if thousands_only {
        cleaned.replace('.', "")
    } else {
        cleaned
    };
    Decimal::from_str(&normalized).ok()
}

#[derive(Clone)]
pub struct DashboardService {
    students: StudentRepository,
    enrollments: EnrollmentRepository,
    orders: OrderRepository,
    payments: PaymentRepository,
    criterion: PendingCriterion,
}

impl DashboardService {
    pub fn new(
        students: StudentRepository,
        enrollments: EnrollmentRepository,
        orders: OrderRepository,
        payments: PaymentRepository,
        criterion: PendingCriterion,
    ) -> Self {
        Self {
            students,
            enrollments,
            orders,
            payments,
            criterion,
        }
    }

    pub async fn summary(&self) -> Result<DashboardSummary, AppError> {
        let (students, enrollments, orders, payments) = tokio::join!(
            self.students.load(),
            self.enrollments.load(),
            self.orders.load(),
            self.payments.load(),
        );
        let students = students?;
        let enrollments = enrollments?;

        let enrolled = EnrollmentRepository::enrolled_cpfs(&enrollments);
        let pending = resolve_pending(&students, &enrolled, self.criterion);

        let total_students = students
            .records()
            .map(|row| normalize_cpf(row.get("cpf")))
            .filter(|cpf| !cpf.is_empty())
            .collect::<HashSet<_>>()
            .len();

        let enrollment_records = EnrollmentRepository::records(&enrollments);
        let mut enrollments_by_ciclo = BTreeMap::new();
        for record in &enrollment_records {
            let ciclo = record.ciclo.trim();
            let key = if ciclo.is_empty() { NO_CICLO } else { ciclo };
            *enrollments_by_ciclo.entry(key.to_string()).or_insert(0) += 1;
        }

        // Pedidos e pagamentos só entram na contagem se as abas existirem
        let book_orders = match orders {
            Ok(table) => OrderRepository::records(&table).len(),
            Err(e) => {
                tracing::warn!("⚠️ Painel sem a aba de pedidos: {:?}", e);
                0
            }
        };
        let payment_records = match payments {
            Ok(table) => PaymentRepository::records(&table),
            Err(e) => {
                tracing::warn!("⚠️ Painel sem a aba de pagamentos: {:?}", e);
                Vec::new()
            }
        };
        let (payments_by_status, approved_amount) = payment_totals(&payment_records);

        Ok(DashboardSummary {
            total_students,
            pending_enrollments: pending.len(),
            enrollments: enrollment_records.len(),
            enrollments_by_ciclo,
            book_orders,
            payments_by_status,
            approved_amount,
        })
    }
}

fn payment_totals(records: &[PendingPaymentRecord]) -> (BTreeMap<String, usize>, Decimal) {
    let mut by_status = BTreeMap::new();
    let mut approved = Decimal::ZERO;

    for record in records {
        let status = PaymentStatus::parse(&record.status);
        *by_status.entry(status.as_str().to_string()).or_insert(0) += 1;

        if status == PaymentStatus::Approved {
            match parse_amount(&record.valor) {
                Some(value) => approved += value,
                None => tracing::warn!(
                    "Valor ilegível no pagamento {}: '{}'",
                    record.payment_id,
                    record.valor
                ),
            }
        }
    }
    (by_status, approved)
}

// src/services/enrollment_service.rs

use std::collections::{BTreeMap, HashSet};
use std::sync::{
    atomic::{AtomicI64, Ordering},
    Arc,
};

use chrono::Local;

use crate::{
    common::{cpf::normalize_cpf, error::AppError, keyed_lock::KeyedLocks, sheet_table::SheetTable},
    db::{EnrollmentRepository, StudentRepository},
    models::{
        enrollment::{
            DuplicateEnrollment, EnrollmentQuery, EnrollmentRecord, FinalizeEnrollmentPayload,
            FinalizeEnrollmentResponse, PendingCriterion, ReconcileReport, StatusRepair,
        },
        student::PendingStudent,
    },
};

const PENDING_STATUS: &str = "pendente";
const MATRICULA_PREFIX: &str = "EETAD";

/// Cadastros de "dados pessoais" que ainda não viraram matrícula.
///
/// Um CPF presente em `enrolled` nunca entra na lista. Linhas sem nome ou
/// sem CPF são ignoradas e, para CPFs repetidos, vale a primeira linha.
pub fn resolve_pending(
    students: &SheetTable,
    enrolled: &HashSet<String>,
    criterion: PendingCriterion,
) -> Vec<PendingStudent> {
    let mut seen = HashSet::new();

    students
        .records()
        .filter_map(|row| {
            let nome = row.get("nome");
            let cpf = normalize_cpf(row.get("cpf"));
            if nome.is_empty() || cpf.is_empty() || enrolled.contains(&cpf) {
                return None;
            }
            if criterion == PendingCriterion::Status
                && !row.get("status").eq_ignore_ascii_case(PENDING_STATUS)
            {
                return None;
            }
            if !seen.insert(cpf.clone()) {
                return None;
            }

            Some(PendingStudent {
                row_index: row.row_index,
                nome: nome.to_string(),
                cpf,
                telefone: row.get("telefone").to_string(),
                email: row.get("email").to_string(),
                status: row.get("status").to_string(),
                data_cadastro: row.get("timestamp").to_string(),
            })
        })
        .collect()
}

#[derive(Clone)]
pub struct EnrollmentService {
    students: StudentRepository,
    enrollments: EnrollmentRepository,
    criterion: PendingCriterion,
    locks: KeyedLocks,
    // Último número de matrícula emitido por este processo
    last_matricula: Arc<AtomicI64>,
}

impl EnrollmentService {
    pub fn new(
        students: StudentRepository,
        enrollments: EnrollmentRepository,
        criterion: PendingCriterion,
    ) -> Self {
        Self {
            students,
            enrollments,
            criterion,
            locks: KeyedLocks::new(),
            last_matricula: Arc::new(AtomicI64::new(0)),
        }
    }

    /// Próximo número a partir de `floor`, sempre maior que o último emitido.
    fn issue_number(&self, floor: i64) -> i64 {
        let step = |last: i64| last.max(floor - 1) + 1;
        let previous = self
            .last_matricula
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| Some(step(last)))
            .unwrap_or_else(|last| last);
        step(previous)
    }

    /// Matrícula `EETAD<ms>` única no processo e fora das já gravadas na aba.
    fn next_matricula(&self, now_ms: i64, enrollments: &SheetTable) -> String {
        let taken: HashSet<&str> = enrollments
            .records()
            .map(|row| row.get("matricula").trim())
            .collect();

        let mut number = self.issue_number(now_ms);
        loop {
            let matricula = format!("{MATRICULA_PREFIX}{number}");
            if !taken.contains(matricula.as_str()) {
                return matricula;
            }
            number = self.issue_number(number + 1);
        }
    }

    pub async fn pending_students(&self) -> Result<Vec<PendingStudent>, AppError> {
        let students = self.students.load().await?;
        let enrollments = self.enrollments.load().await?;
        let enrolled = EnrollmentRepository::enrolled_cpfs(&enrollments);

        let pending = resolve_pending(&students, &enrolled, self.criterion);
        tracing::info!(
            "📋 {} cadastros pendentes ({} CPFs já matriculados)",
            pending.len(),
            enrolled.len()
        );
        Ok(pending)
    }

    /// Efetiva a matrícula de um cadastro.
    ///
    /// Repetir a chamada para um CPF já matriculado não cria outra linha em
    /// "matriculas": só regrava o status e devolve a matrícula existente.
    pub async fn finalize(
        &self,
        payload: &FinalizeEnrollmentPayload,
    ) -> Result<FinalizeEnrollmentResponse, AppError> {
        let cpf = normalize_cpf(&payload.cpf);
        if cpf.len() != 11 {
            return Err(AppError::BadRequest("CPF deve ter 11 dígitos".into()));
        }
        let status = payload.status.trim();
        if status.is_empty() {
            return Err(AppError::BadRequest("O status é obrigatório".into()));
        }

        let _guard = self.locks.acquire(&cpf).await;

        let students = self.students.load().await?;
        self.students.require_status_column(&students)?;

        let row_index = match students.row(payload.row_index) {
            Some(row) if normalize_cpf(row.get("cpf")) == cpf => row.row_index,
            _ => {
                let found = students
                    .records()
                    .find(|row| normalize_cpf(row.get("cpf")) == cpf)
                    .map(|row| row.row_index)
                    .ok_or(AppError::StudentNotFound)?;
                tracing::warn!(
                    "⚠️ Linha {} não confere com o CPF informado; usando a linha {}",
                    payload.row_index,
                    found
                );
                found
            }
        };
        let student = students
            .row(row_index)
            .map(|row| StudentRepository::to_record(&row))
            .ok_or(AppError::StudentNotFound)?;

        let enrollments = self.enrollments.load().await?;
        if let Some(existing) = EnrollmentRepository::latest_for_cpf(&enrollments, &cpf) {
            tracing::info!(
                "🔁 CPF já matriculado ({}); regravando status da linha {}",
                existing.matricula,
                row_index
            );
            self.students
                .update_status(&students, row_index, status)
                .await?;
            return Ok(FinalizeEnrollmentResponse {
                success: true,
                matricula: existing.matricula,
                row_index,
                already_enrolled: true,
            });
        }

        let now = Local::now();
        let record = EnrollmentRecord {
            row_index: 0,
            data: now.format("%d/%m/%Y %H:%M:%S").to_string(),
            matricula: self.next_matricula(now.timestamp_millis(), &enrollments),
            cpf,
            nome: student.nome,
            ciclo: payload.ciclo.trim().to_string(),
            subnucleo: payload.subnucleo.clone().unwrap_or_default(),
            data_evento: payload.data_evento.clone().unwrap_or_default(),
            status: status.to_string(),
            observacao: payload.observacao.clone().unwrap_or_default(),
            email: student.email,
            telefone: student.telefone,
        };

        self.enrollments.append(&enrollments, &record).await?;
        // Se esta escrita falhar, o CPF fica matriculado com status antigo;
        // o próximo finalize ou o reconcile corrigem.
        self.students
            .update_status(&students, row_index, status)
            .await?;

        tracing::info!("🎓 Matrícula {} efetivada (linha {})", record.matricula, row_index);

        Ok(FinalizeEnrollmentResponse {
            success: true,
            matricula: record.matricula,
            row_index,
            already_enrolled: false,
        })
    }

    pub async fn list_enrollments(&self, query: &EnrollmentQuery) -> Result<Vec<EnrollmentRecord>, AppError> {
        let table = self.enrollments.load().await?;
        let cpf = query.cpf.as_deref().map(normalize_cpf).filter(|c| !c.is_empty());

        Ok(EnrollmentRepository::records(&table)
            .into_iter()
            .filter(|r| cpf.as_ref().is_none_or(|c| &normalize_cpf(&r.cpf) == c))
            .filter(|r| {
                query
                    .ciclo
                    .as_deref()
                    .is_none_or(|ciclo| r.ciclo.eq_ignore_ascii_case(ciclo.trim()))
            })
            .filter(|r| {
                query
                    .status
                    .as_deref()
                    .is_none_or(|status| r.status.eq_ignore_ascii_case(status.trim()))
            })
            .collect())
    }

    /// Confere "dados pessoais" contra "matriculas" e corrige status que
    /// ficaram para trás. Também aponta CPFs com mais de uma matrícula.
    pub async fn reconcile(&self, dry_run: bool) -> Result<ReconcileReport, AppError> {
        let students = self.students.load().await?;
        self.students.require_status_column(&students)?;
        let enrollments = self.enrollments.load().await?;

        let mut by_cpf: BTreeMap<String, Vec<EnrollmentRecord>> = BTreeMap::new();
        for record in EnrollmentRepository::records(&enrollments) {
            let cpf = normalize_cpf(&record.cpf);
            if !cpf.is_empty() {
                by_cpf.entry(cpf).or_default().push(record);
            }
        }

        let duplicate_enrollments = by_cpf
            .iter()
            .filter(|(_, records)| records.len() > 1)
            .map(|(cpf, records)| DuplicateEnrollment {
                cpf: cpf.clone(),
                matriculas: records.iter().map(|r| r.matricula.clone()).collect(),
            })
            .collect::<Vec<_>>();

        let mut checked = 0;
        let mut repaired = Vec::new();
        for row in students.records() {
            let cpf = normalize_cpf(row.get("cpf"));
            let Some(latest) = by_cpf.get(&cpf).and_then(|records| records.last()) else {
                continue;
            };
            checked += 1;

            let current = row.get("status");
            if latest.status.is_empty() || current.eq_ignore_ascii_case(&latest.status) {
                continue;
            }
            repaired.push(StatusRepair {
                row_index: row.row_index,
                cpf,
                from: current.to_string(),
                to: latest.status.clone(),
            });
        }

        if !dry_run {
            for repair in &repaired {
                self.students
                    .update_status(&students, repair.row_index, &repair.to)
                    .await?;
            }
        }

        tracing::info!(
            "🧮 Reconciliação: {} conferidos, {} status corrigidos, {} CPFs com matrícula duplicada{}",
            checked,
            repaired.len(),
            duplicate_enrollments.len(),
            if dry_run { " (simulação)" } else { "" }
        );

        Ok(ReconcileReport {
            success: true,
            dry_run,
            checked,
            repaired,
            duplicate_enrollments,
        })
    }
}

// src/services/student_service.rs

use chrono::Local;

use crate::{
    common::{cpf::normalize_cpf, error::AppError},
    db::{OrderRepository, StudentRepository},
    models::{
        payment::{BookOrderRecord, SaveBookOrderPayload},
        student::{PersonalDataRecord, SavePersonalDataPayload, SavePersonalDataResponse},
    },
};

pub const INITIAL_STUDENT_STATUS: &str = "Pendente";
pub const INITIAL_ORDER_STATUS: &str = "pendente";

fn text(value: &Option<String>) -> String {
    value.as_deref().map(str::trim).unwrap_or_default().to_string()
}

#[derive(Clone)]
pub struct StudentService {
    students: StudentRepository,
    orders: OrderRepository,
}

impl StudentService {
    pub fn new(students: StudentRepository, orders: OrderRepository) -> Self {
        Self { students, orders }
    }

    /// Auto-cadastro do aluno. O CPF é gravado só com dígitos.
    pub async fn save_personal_data(
        &self,
        payload: &SavePersonalDataPayload,
    ) -> Result<SavePersonalDataResponse, AppError> {
        let cpf = normalize_cpf(&payload.cpf);

        let table = self.students.load().await?;
        let already_registered = table
            .records()
            .any(|row| normalize_cpf(row.get("cpf")) == cpf);
        if already_registered {
            return Err(AppError::CpfAlreadyRegistered);
        }

        let record = PersonalDataRecord {
            row_index: 0,
            timestamp: Local::now().format("%d/%m/%Y %H:%M:%S").to_string(),
            nome: payload.nome.trim().to_string(),
            rg: text(&payload.rg),
            cpf: cpf.clone(),
            telefone: payload.telefone.trim().to_string(),
            email: payload.email.trim().to_string(),
            sexo: text(&payload.sexo),
            estado_civil: text(&payload.estado_civil),
            data_nascimento: text(&payload.data_nascimento),
            cidade_nascimento: text(&payload.cidade_nascimento),
            uf_nascimento: text(&payload.uf_nascimento),
            nacionalidade: text(&payload.nacionalidade),
            escolaridade: text(&payload.escolaridade),
            profissao: text(&payload.profissao),
            cargo_igreja: text(&payload.cargo_igreja),
            cep: text(&payload.cep),
            endereco: text(&payload.endereco),
            numero: text(&payload.numero),
            complemento: text(&payload.complemento),
            bairro: text(&payload.bairro),
            cidade: text(&payload.cidade),
            uf: text(&payload.uf),
            status: INITIAL_STUDENT_STATUS.to_string(),
        };

        self.students.append(&table, &record).await?;
        tracing::info!("📝 Novo cadastro em '{}'", self.students.sheet_name());

        Ok(SavePersonalDataResponse {
            success: true,
            cpf,
            status: record.status,
        })
    }

    pub async fn save_book_order(&self, payload: &SaveBookOrderPayload) -> Result<BookOrderRecord, AppError> {
        let table = self.orders.load().await?;

        let record = BookOrderRecord {
            row_index: 0,
            data: Local::now().format("%d/%m/%Y %H:%M:%S").to_string(),
            cpf: normalize_cpf(&payload.cpf),
            nome: payload.nome.trim().to_string(),
            email: payload.email.trim().to_string(),
            telefone: text(&payload.telefone),
            livro: payload.livro.trim().to_string(),
            ciclo: payload.ciclo.trim().to_string(),
            valor: payload.valor.round_dp(2).to_string(),
            forma_pagamento: payload
                .forma_pagamento
                .clone()
                .unwrap_or_else(|| "pix".to_string()),
            payment_id: text(&payload.payment_id),
            status: INITIAL_ORDER_STATUS.to_string(),
        };

        self.orders.append(&table, &record).await?;
        tracing::info!("📚 Pedido de livro registrado ({})", record.livro);
        Ok(record)
    }
}

// src/services/payment_service.rs

use std::sync::Arc;

use chrono::Local;
use uuid::Uuid;

use crate::{
    common::{cpf::normalize_cpf, error::AppError},
    config::RuntimeSettings,
    db::{OrderRepository, PaymentRepository},
    models::payment::{
        BookOrderRecord, CreatePixPaymentPayload, ExternalReference, PaymentStatus,
        PaymentStatusResponse, PendingPaymentRecord, PixPaymentResponse, SavePendingPaymentPayload,
        UpdatePaymentStatusPayload, WebhookAck, WebhookNotification,
    },
    services::{
        mercadopago::{verify_webhook_signature, GatewayPayment, PaymentGateway, PixCharge},
        pix::render_qr_png_base64,
    },
};

const ORDER_STATUS_PAID: &str = "pago";
const ORDER_STATUS_PENDING: &str = "pendente";

fn now_text() -> String {
    Local::now().format("%d/%m/%Y %H:%M:%S").to_string()
}

// Cabeçalhos da notificação usados na verificação da assinatura
#[derive(Debug, Default)]
pub struct WebhookHeaders {
    pub signature: Option<String>,
    pub request_id: Option<String>,
}

#[derive(Clone)]
pub struct PaymentService {
    gateway: Arc<dyn PaymentGateway>,
    payments: PaymentRepository,
    orders: OrderRepository,
    runtime: RuntimeSettings,
    notification_url: Option<String>,
}

impl PaymentService {
    pub fn new(
        gateway: Arc<dyn PaymentGateway>,
        payments: PaymentRepository,
        orders: OrderRepository,
        runtime: RuntimeSettings,
        notification_url: Option<String>,
    ) -> Self {
        Self {
            gateway,
            payments,
            orders,
            runtime,
            notification_url,
        }
    }

    /// Cria a cobrança PIX e registra o pagamento e o pedido nas planilhas.
    pub async fn create_pix_payment(
        &self,
        payload: &CreatePixPaymentPayload,
    ) -> Result<PixPaymentResponse, AppError> {
        let reference = ExternalReference::new(&payload.cpf, &payload.livro, &payload.ciclo);
        let charge = PixCharge::new(
            payload.valor,
            format!("{} - {}", reference.livro, reference.ciclo),
            reference.encode(),
            self.notification_url.clone(),
            &payload.email,
            &payload.nome,
            &reference.cpf,
        );

        let payment = self
            .gateway
            .create_pix_payment(&charge, &Uuid::new_v4().to_string())
            .await?;
        tracing::info!("💳 Cobrança PIX {} criada ({})", payment.id, payment.status);

        let qr_code_base64 = match (&payment.qr_code_base64, &payment.qr_code) {
            (Some(image), _) => Some(image.clone()),
            (None, Some(code)) => match render_qr_png_base64(code) {
                Ok(image) => Some(image),
                Err(e) => {
                    tracing::warn!("⚠️ Falha ao gerar a imagem do QR Code: {:?}", e);
                    None
                }
            },
            (None, None) => None,
        };

        // A cobrança já existe no gateway: falha ao registrar não desfaz nada
        if let Err(e) = self
            .record_new_payment(payload, &reference, &payment, qr_code_base64.as_deref())
            .await
        {
            tracing::warn!("⚠️ Pagamento {} criado mas não registrado na planilha: {:?}", payment.id, e);
        }

        Ok(PixPaymentResponse {
            success: true,
            payment_id: payment.id,
            status: payment.status,
            external_reference: reference.encode(),
            ticket_url: payment.ticket_url,
            qr_code: payment.qr_code,
            qr_code_base64,
            expires_at: payment.date_of_expiration,
        })
    }

    async fn record_new_payment(
        &self,
        payload: &CreatePixPaymentPayload,
        reference: &ExternalReference,
        payment: &GatewayPayment,
        qr_code_base64: Option<&str>,
    ) -> Result<(), AppError> {
        let data = now_text();
        let valor = payload.valor.round_dp(2).to_string();

        let payments = self.payments.load().await?;
        let record = PendingPaymentRecord {
            row_index: 0,
            data: data.clone(),
            payment_id: payment.id.clone(),
            cpf: reference.cpf.clone(),
            nome: payload.nome.trim().to_string(),
            email: payload.email.trim().to_string(),
            livro: reference.livro.clone(),
            ciclo: reference.ciclo.clone(),
            valor: valor.clone(),
            status: payment.status.clone(),
            external_reference: reference.encode(),
            ticket_url: payment.ticket_url.clone().unwrap_or_default(),
            qr_code: payment.qr_code.clone().unwrap_or_default(),
            qr_code_base64: qr_code_base64.unwrap_or_default().to_string(),
            data_confirmacao: String::new(),
        };
        self.payments.append(&payments, &record).await?;

        let orders = self.orders.load().await?;
        let order = BookOrderRecord {
            row_index: 0,
            data,
            cpf: reference.cpf.clone(),
            nome: record.nome.clone(),
            email: record.email.clone(),
            telefone: payload.telefone.clone().unwrap_or_default(),
            livro: reference.livro.clone(),
            ciclo: reference.ciclo.clone(),
            valor,
            forma_pagamento: "pix".into(),
            payment_id: payment.id.clone(),
            status: ORDER_STATUS_PENDING.into(),
        };
        self.orders.append(&orders, &order).await
    }

    /// Registra um pagamento já criado (ex.: pelo frontend).
    pub async fn save_pending_payment(
        &self,
        payload: &SavePendingPaymentPayload,
    ) -> Result<PendingPaymentRecord, AppError> {
        let parsed = payload
            .external_reference
            .as_deref()
            .and_then(ExternalReference::parse);
        let pick = |given: &Option<String>, from_reference: Option<&String>| {
            given
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .or_else(|| from_reference.cloned())
                .unwrap_or_default()
        };

        let record = PendingPaymentRecord {
            row_index: 0,
            data: now_text(),
            payment_id: payload.payment_id.trim().to_string(),
            cpf: normalize_cpf(&pick(&payload.cpf, parsed.as_ref().map(|r| &r.cpf))),
            nome: pick(&payload.nome, None),
            email: pick(&payload.email, None),
            livro: pick(&payload.livro, parsed.as_ref().map(|r| &r.livro)),
            ciclo: pick(&payload.ciclo, parsed.as_ref().map(|r| &r.ciclo)),
            valor: payload.valor.round_dp(2).to_string(),
            // Rota pública: o status definitivo só vem do gateway
            status: PaymentStatus::Pending.as_str().to_string(),
            external_reference: pick(&payload.external_reference, None),
            ticket_url: pick(&payload.ticket_url, None),
            qr_code: pick(&payload.qr_code, None),
            qr_code_base64: pick(&payload.qr_code_base64, None),
            data_confirmacao: String::new(),
        };

        let table = self.payments.load().await?;
        self.payments.append(&table, &record).await?;
        tracing::info!("💾 Pagamento {} registrado como {}", record.payment_id, record.status);
        Ok(record)
    }

    /// Consulta o gateway e leva o status definitivo para a planilha.
    ///
    /// A escrita é feita no melhor esforço: falhas viram log e
    /// `sheet_updated: false`, a resposta ainda traz o status do gateway.
    pub async fn check_payment_status(&self, payment_id: &str) -> Result<PaymentStatusResponse, AppError> {
        let payment = self.gateway.get_payment(payment_id.trim()).await?;
        let status = PaymentStatus::parse(&payment.status);

        let (sheet_updated, confirmed_at) = if status.is_final() {
            match self.record_status(&payment.id, status, false).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::warn!("⚠️ Status de {} não gravado na planilha: {:?}", payment.id, e);
                    (false, None)
                }
            }
        } else {
            tracing::debug!("Pagamento {} ainda {}", payment.id, payment.status);
            (false, None)
        };

        Ok(PaymentStatusResponse {
            success: true,
            payment_id: payment.id,
            status: payment.status,
            status_detail: payment.status_detail,
            sheet_updated,
            confirmed_at,
        })
    }

    /// Ajuste manual da secretaria. Aqui os erros não são engolidos.
    pub async fn update_payment_status(
        &self,
        payload: &UpdatePaymentStatusPayload,
    ) -> Result<PaymentStatusResponse, AppError> {
        let status = PaymentStatus::parse(&payload.status);
        if status == PaymentStatus::Unknown {
            return Err(AppError::BadRequest(format!("status desconhecido: {}", payload.status)));
        }

        let (sheet_updated, confirmed_at) = self
            .record_status(payload.payment_id.trim(), status, true)
            .await?;

        Ok(PaymentStatusResponse {
            success: true,
            payment_id: payload.payment_id.trim().to_string(),
            status: status.as_str().to_string(),
            status_detail: None,
            sheet_updated,
            confirmed_at,
        })
    }

    /// Grava o status na linha do pagamento. Devolve (gravou?, data de confirmação).
    async fn record_status(
        &self,
        payment_id: &str,
        status: PaymentStatus,
        strict: bool,
    ) -> Result<(bool, Option<String>), AppError> {
        let table = self.payments.load().await?;
        let Some(row_index) = PaymentRepository::find_row(&table, payment_id) else {
            if strict {
                return Err(AppError::PaymentNotFound);
            }
            tracing::warn!("⚠️ Pagamento {} não encontrado na aba de pagamentos", payment_id);
            return Ok((false, None));
        };
        let current = table
            .row(row_index)
            .map(|row| PaymentRepository::to_record(&row))
            .unwrap_or_default();

        if current.status.eq_ignore_ascii_case(status.as_str()) {
            let confirmed = Some(current.data_confirmacao).filter(|d| !d.is_empty());
            return Ok((false, confirmed));
        }

        let mut fields = vec![("status", status.as_str().to_string())];
        let mut confirmed_at = None;
        if status == PaymentStatus::Approved {
            if table.column("data_confirmacao").is_some() {
                let now = now_text();
                fields.push(("data_confirmacao", now.clone()));
                confirmed_at = Some(now);
            } else {
                tracing::warn!("⚠️ Aba '{}' sem coluna de data de confirmação", table.sheet());
            }
        }
        self.payments.update_fields(&table, row_index, &fields).await?;
        tracing::info!("✅ Pagamento {} marcado como {}", payment_id, status.as_str());

        if status == PaymentStatus::Approved {
            match self.orders.update_status_by_payment(payment_id, ORDER_STATUS_PAID).await {
                Ok(true) => {}
                Ok(false) => tracing::debug!("Nenhum pedido ligado ao pagamento {}", payment_id),
                Err(e) if strict => return Err(e),
                Err(e) => tracing::warn!("⚠️ Pedido do pagamento {} não atualizado: {:?}", payment_id, e),
            }
        }

        Ok((true, confirmed_at))
    }

    /// Notificação do MercadoPago. Assinatura conferida quando há segredo.
    pub async fn handle_webhook(
        &self,
        notification: &WebhookNotification,
        query_payment_id: Option<String>,
        headers: &WebhookHeaders,
    ) -> Result<WebhookAck, AppError> {
        if !notification.is_payment() {
            tracing::debug!("Notificação ignorada: {:?}", notification.kind);
            return Ok(WebhookAck {
                success: true,
                ..Default::default()
            });
        }

        let payment_id = notification
            .payment_id()
            .or(query_payment_id)
            .ok_or_else(|| AppError::BadRequest("notificação sem id de pagamento".into()))?;

        if let Some(secret) = self.runtime.snapshot().mercadopago_webhook_secret {
            let valid = headers.signature.as_deref().is_some_and(|signature| {
                verify_webhook_signature(
                    &secret,
                    signature,
                    headers.request_id.as_deref(),
                    Some(&payment_id),
                )
            });
            if !valid {
                tracing::warn!("🚫 Webhook com assinatura inválida (pagamento {})", payment_id);
                return Err(AppError::InvalidWebhookSignature);
            }
        }

        match self.check_payment_status(&payment_id).await {
            Ok(result) => Ok(WebhookAck {
                success: true,
                payment_id: Some(result.payment_id),
                status: Some(result.status),
                sheet_updated: result.sheet_updated,
            }),
            Err(e) => {
                tracing::warn!("⚠️ Webhook do pagamento {} não reconciliado: {:?}", payment_id, e);
                Ok(WebhookAck {
                    success: true,
                    payment_id: Some(payment_id),
                    ..Default::default()
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::RuntimeConfig,
        db::memory::{InMemorySheets, SheetCall},
        services::mercadopago::tests::{sign, FakeGateway},
    };
    use rust_decimal::Decimal;
    use serde_json::json;

    const PAYMENT_HEADER: &[&str] = &["Data", "ID Pagamento", "CPF", "Status", "Data de Confirmação"];
    const ORDER_HEADER: &[&str] = &["Data", "CPF", "Livro", "ID Pagamento", "Status"];

    fn sheets() -> InMemorySheets {
        InMemorySheets::new()
            .with_sheet("pagamentos", &[
                PAYMENT_HEADER,
                &["01/10/2026", "111", "61767735120", "pending", ""],
            ])
            .with_sheet("pedidos", &[
                ORDER_HEADER,
                &["01/10/2026", "61767735120", "Livro 3", "111", "pendente"],
            ])
    }

    fn gateway_with(status: &str) -> FakeGateway {
        FakeGateway::default().with_payment(GatewayPayment {
            id: "111".into(),
            status: status.into(),
            ..Default::default()
        })
    }

    fn service(sheets: &InMemorySheets, gateway: FakeGateway, runtime: RuntimeSettings) -> PaymentService {
        let store = Arc::new(sheets.clone());
        PaymentService::new(
            Arc::new(gateway),
            PaymentRepository::new(store.clone(), "pagamentos"),
            OrderRepository::new(store, "pedidos"),
            runtime,
            None,
        )
    }

    #[tokio::test]
    async fn approved_writes_status_confirmation_and_order() {
        let sheets = sheets();
        let service = service(&sheets, gateway_with("approved"), RuntimeSettings::default());

        let result = service.check_payment_status("111").await.unwrap();

        assert!(result.sheet_updated);
        assert!(result.confirmed_at.is_some());
        let payments = sheets.rows("pagamentos");
        assert_eq!(payments[1][3], "approved");
        assert_eq!(Some(payments[1][4].clone()), result.confirmed_at);
        assert_eq!(sheets.rows("pedidos")[1][4], "pago");
    }

    #[tokio::test]
    async fn pending_writes_nothing() {
        for status in ["pending", "in_process", "authorized"] {
            let sheets = sheets();
            let service = service(&sheets, gateway_with(status), RuntimeSettings::default());

            let result = service.check_payment_status("111").await.unwrap();

            assert_eq!(result.status, status);
            assert!(!result.sheet_updated);
            assert!(sheets.calls().is_empty());
        }
    }

    #[tokio::test]
    async fn rejected_writes_status_only() {
        let sheets = sheets();
        let service = service(&sheets, gateway_with("rejected"), RuntimeSettings::default());

        let result = service.check_payment_status("111").await.unwrap();

        assert!(result.sheet_updated);
        assert_eq!(result.confirmed_at, None);
        assert_eq!(sheets.calls(), vec![SheetCall::Update {
            sheet: "pagamentos".into(),
            row_index: 2,
            column: 3,
            values: vec!["rejected".into()],
        }]);
    }

    #[tokio::test]
    async fn repeated_approval_keeps_first_confirmation() {
        let sheets = InMemorySheets::new()
            .with_sheet("pagamentos", &[PAYMENT_HEADER, &["", "111", "", "approved", "02/10/2026 10:00:00"]])
            .with_sheet("pedidos", &[ORDER_HEADER]);
        let service = service(&sheets, gateway_with("approved"), RuntimeSettings::default());

        let result = service.check_payment_status("111").await.unwrap();

        assert!(!result.sheet_updated);
        assert_eq!(result.confirmed_at.as_deref(), Some("02/10/2026 10:00:00"));
        assert!(sheets.calls().is_empty());
    }

    #[tokio::test]
    async fn sheet_failure_is_swallowed_when_checking() {
        let sheets = sheets();
        sheets.fail_updates();
        let service = service(&sheets, gateway_with("approved"), RuntimeSettings::default());

        let result = service.check_payment_status("111").await.unwrap();

        assert_eq!(result.status, "approved");
        assert!(!result.sheet_updated);
    }

    #[tokio::test]
    async fn unknown_row_is_not_an_error_when_checking() {
        let sheets = InMemorySheets::new()
            .with_sheet("pagamentos", &[PAYMENT_HEADER])
            .with_sheet("pedidos", &[ORDER_HEADER]);
        let service = service(&sheets, gateway_with("approved"), RuntimeSettings::default());

        let result = service.check_payment_status("111").await.unwrap();
        assert!(!result.sheet_updated);
    }

    #[tokio::test]
    async fn manual_update_is_strict() {
        let sheets = sheets();
        let service = service(&sheets, FakeGateway::default(), RuntimeSettings::default());

        let err = service
            .update_payment_status(&UpdatePaymentStatusPayload {
                payment_id: "999".into(),
                status: "approved".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::PaymentNotFound));

        let ok = service
            .update_payment_status(&UpdatePaymentStatusPayload {
                payment_id: "111".into(),
                status: "cancelled".into(),
            })
            .await
            .unwrap();
        assert!(ok.sheet_updated);
        assert_eq!(sheets.rows("pagamentos")[1][3], "cancelled");

        sheets.fail_updates();
        let err = service
            .update_payment_status(&UpdatePaymentStatusPayload {
                payment_id: "111".into(),
                status: "approved".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::UpstreamError { status: 503, .. }));
    }

    #[tokio::test]
    async fn pix_creation_records_payment_and_order() {
        let sheets = InMemorySheets::new()
            .with_sheet("pagamentos", &[])
            .with_sheet("pedidos", &[]);
        let service = service(&sheets, FakeGateway::default(), RuntimeSettings::default());
        let payload: CreatePixPaymentPayload = serde_json::from_value(json!({
            "cpf": "617.677.351-20",
            "nome": "Ana Paula",
            "email": "ana@x.com",
            "livro": "Livro_3",
            "ciclo": "Ciclo 2025",
            "valor": 45.0
        }))
        .unwrap();

        let response = service.create_pix_payment(&payload).await.unwrap();

        assert_eq!(response.payment_id, "1319876543");
        assert_eq!(response.external_reference, "61767735120_Livro 3_Ciclo 2025");
        // O gateway falso não manda imagem: o serviço gera o PNG
        assert!(response.qr_code_base64.as_deref().is_some_and(|b| b.starts_with("iVBOR")));

        let payments = sheets.rows("pagamentos");
        assert_eq!(payments.len(), 2);
        assert_eq!(payments[1][1], "1319876543");
        assert_eq!(payments[1][8], "pending");
        let orders = sheets.rows("pedidos");
        assert_eq!(orders.len(), 2);
        assert_eq!(orders[1][9], "1319876543");
        assert_eq!(orders[1][10], "pendente");
    }

    #[tokio::test]
    async fn gateway_failure_aborts_pix_creation() {
        let sheets = sheets();
        let gateway = FakeGateway { fail: true, ..Default::default() };
        let service = service(&sheets, gateway, RuntimeSettings::default());
        let payload = CreatePixPaymentPayload {
            cpf: "61767735120".into(),
            nome: "Ana".into(),
            email: "ana@x.com".into(),
            telefone: None,
            livro: "Livro 3".into(),
            ciclo: "Ciclo 2025".into(),
            valor: Decimal::new(45, 0),
        };

        let err = service.create_pix_payment(&payload).await.unwrap_err();
        assert!(matches!(err, AppError::UpstreamError { service: "MercadoPago", .. }));
        assert!(sheets.calls().is_empty());
    }

    #[tokio::test]
    async fn pending_payment_fills_fields_from_reference() {
        let sheets = InMemorySheets::new().with_sheet("pagamentos", &[]);
        let service = service(&sheets, FakeGateway::default(), RuntimeSettings::default());
        let payload: SavePendingPaymentPayload = serde_json::from_value(json!({
            "paymentId": "555",
            "valor": 90,
            "externalReference": "61767735120_Livro 4_Ciclo 2026"
        }))
        .unwrap();

        let record = service.save_pending_payment(&payload).await.unwrap();

        assert_eq!(record.cpf, "61767735120");
        assert_eq!(record.livro, "Livro 4");
        assert_eq!(record.ciclo, "Ciclo 2026");
        assert_eq!(record.status, "pending");
        assert_eq!(sheets.rows("pagamentos")[1][1], "555");
    }

    #[tokio::test]
    async fn pending_payment_ignores_status_sent_by_caller() {
        let sheets = InMemorySheets::new().with_sheet("pagamentos", &[]);
        let service = service(&sheets, gateway_with("approved"), RuntimeSettings::default());
        let payload: SavePendingPaymentPayload = serde_json::from_value(json!({
            "paymentId": "111",
            "valor": 45,
            "status": "approved"
        }))
        .unwrap();

        let record = service.save_pending_payment(&payload).await.unwrap();
        assert_eq!(record.status, "pending");

        // A confirmação ainda é escrita quando o gateway aprova
        let result = service.check_payment_status("111").await.unwrap();
        assert!(result.sheet_updated);
        assert!(result.confirmed_at.is_some());
    }

    #[tokio::test]
    async fn webhook_requires_valid_signature_when_secret_is_set() {
        let runtime = RuntimeSettings::new(RuntimeConfig {
            mercadopago_webhook_secret: Some("segredo".into()),
            ..Default::default()
        });
        let sheets = sheets();
        let service = service(&sheets, gateway_with("approved"), runtime);
        let notification: WebhookNotification =
            serde_json::from_value(json!({ "type": "payment", "data": { "id": "111" } })).unwrap();

        let err = service
            .handle_webhook(&notification, None, &WebhookHeaders::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidWebhookSignature));
        assert!(sheets.calls().is_empty());

        let headers = WebhookHeaders {
            signature: Some(format!("ts=1700000000,v1={}", sign("segredo", "id:111;request-id:r1;ts:1700000000;"))),
            request_id: Some("r1".into()),
        };
        let ack = service.handle_webhook(&notification, None, &headers).await.unwrap();
        assert!(ack.sheet_updated);
        assert_eq!(ack.status.as_deref(), Some("approved"));
    }

    #[tokio::test]
    async fn webhook_acknowledges_even_when_reconciliation_fails() {
        let sheets = sheets();
        let service = service(&sheets, FakeGateway::default(), RuntimeSettings::default());
        let notification = WebhookNotification::default();

        // Sem corpo: id pela query string; gateway não conhece o pagamento
        let ack = service
            .handle_webhook(&notification, Some("999".into()), &WebhookHeaders::default())
            .await
            .unwrap();
        assert!(ack.success);
        assert_eq!(ack.payment_id.as_deref(), Some("999"));
        assert!(!ack.sheet_updated);

        let other: WebhookNotification =
            serde_json::from_value(json!({ "type": "merchant_order", "data": { "id": "1" } })).unwrap();
        let ack = service.handle_webhook(&other, None, &WebhookHeaders::default()).await.unwrap();
        assert!(ack.payment_id.is_none());
    }
}

// src/docs.rs

use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::OpenApi;

use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Enrollments ---
        handlers::enrollments::get_pending_enrollments,
        handlers::enrollments::finalize_enrollment,
        handlers::enrollments::get_enrollments,
        handlers::enrollments::reconcile_enrollments,

        // --- Students ---
        handlers::students::save_student_personal_data,
        handlers::students::save_book_order,

        // --- Payments ---
        handlers::payments::create_pix_payment,
        handlers::payments::save_pending_payment,
        handlers::payments::check_payment_status,
        handlers::payments::update_payment_status,
        handlers::payments::mercadopago_webhook,

        // --- Secretary ---
        handlers::auth::login,
        handlers::auth::logout,
        handlers::auth::get_me,
        handlers::auth::manage_users,

        // --- Dashboard / Diagnostics / Settings ---
        handlers::dashboard::get_summary,
        handlers::diagnostics::debug_sheets,
        handlers::settings::get_env_config,
        handlers::settings::update_env_config,
    ),
    components(
        schemas(
            // --- Students ---
            models::student::PersonalDataRecord,
            models::student::SavePersonalDataPayload,
            models::student::SavePersonalDataResponse,
            models::student::PendingStudent,
            models::student::PendingStudentsResponse,

            // --- Enrollments ---
            models::enrollment::PendingCriterion,
            models::enrollment::EnrollmentRecord,
            models::enrollment::FinalizeEnrollmentPayload,
            models::enrollment::FinalizeEnrollmentResponse,
            models::enrollment::EnrollmentListResponse,
            models::enrollment::ReconcilePayload,
            models::enrollment::ReconcileReport,
            models::enrollment::StatusRepair,
            models::enrollment::DuplicateEnrollment,

            // --- Payments ---
            models::payment::BookOrderRecord,
            models::payment::PendingPaymentRecord,
            models::payment::SaveBookOrderPayload,
            models::payment::SaveBookOrderResponse,
            models::payment::CreatePixPaymentPayload,
            models::payment::PixPaymentResponse,
            models::payment::SavePendingPaymentPayload,
            models::payment::SavePendingPaymentResponse,
            models::payment::CheckPaymentStatusPayload,
            models::payment::UpdatePaymentStatusPayload,
            models::payment::PaymentStatusResponse,
            models::payment::WebhookNotification,
            models::payment::WebhookData,
            models::payment::WebhookAck,

            // --- Secretary ---
            models::secretary::SecretaryUser,
            models::secretary::LoginPayload,
            models::secretary::AuthResponse,
            models::secretary::MeResponse,
            models::secretary::LogoutResponse,
            models::secretary::CreateUserPayload,
            models::secretary::UpdateUserPayload,
            models::secretary::ManageUsersRequest,
            models::secretary::ManageUsersResponse,

            // --- Dashboard / Diagnostics / Settings ---
            models::dashboard::DashboardSummary,
            models::diagnostics::SheetDiagnostics,
            models::diagnostics::DebugSheetsResponse,
            models::settings::EnvVarStatus,
            models::settings::EnvConfigStatus,
            models::settings::UpdateEnvConfigPayload,
        )
    ),
    tags(
        (name = "Enrollments", description = "Pendências e efetivação de matrículas"),
        (name = "Students", description = "Auto-cadastro do aluno e pedidos de livros"),
        (name = "Payments", description = "PIX no MercadoPago e conciliação com a planilha"),
        (name = "Secretary", description = "Login e usuários da secretaria"),
        (name = "Dashboard", description = "Indicadores da secretaria"),
        (name = "Diagnostics", description = "Raio-X das abas da planilha"),
        (name = "Settings", description = "Configuração em tempo de execução")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        );
    }
}

// src/routes.rs

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    config::AppState,
    docs::ApiDoc,
    handlers,
    middleware::auth::auth_guard,
};

// As antigas funções serverless, uma rota por nome
fn function_routes(app_state: &AppState) -> Router<AppState> {
    // Formulários do aluno, PIX e webhook: sem login
    let public_routes = Router::new()
        .route("/save-student-personal-data", post(handlers::students::save_student_personal_data))
        .route("/save-book-order", post(handlers::students::save_book_order))
        .route("/create-pix-payment", post(handlers::payments::create_pix_payment))
        .route("/save-pending-payment", post(handlers::payments::save_pending_payment))
        .route("/check-payment-status", post(handlers::payments::check_payment_status))
        .route(
            "/mercadopago-webhook",
            post(handlers::payments::mercadopago_webhook).get(handlers::payments::mercadopago_webhook),
        )
        .route("/secretary-login", post(handlers::auth::login))
        // Sessão opcional: o primeiro usuário é criado sem login
        .route("/manage-secretary-users", post(handlers::auth::manage_users));

    // Painel da secretaria
    let secretary_routes = Router::new()
        .route(
            "/get-pending-enrollments",
            get(handlers::enrollments::get_pending_enrollments)
                .post(handlers::enrollments::get_pending_enrollments),
        )
        .route(
            "/get-pending-students",
            get(handlers::enrollments::get_pending_enrollments)
                .post(handlers::enrollments::get_pending_enrollments),
        )
        .route("/finalize-enrollment", post(handlers::enrollments::finalize_enrollment))
        .route(
            "/get-enrollments",
            get(handlers::enrollments::get_enrollments).post(handlers::enrollments::get_enrollments),
        )
        .route("/reconcile-enrollments", post(handlers::enrollments::reconcile_enrollments))
        .route("/update-payment-status", post(handlers::payments::update_payment_status))
        .route("/secretary-logout", post(handlers::auth::logout))
        .route("/secretary-me", get(handlers::auth::get_me).post(handlers::auth::get_me))
        .route(
            "/dashboard-summary",
            get(handlers::dashboard::get_summary).post(handlers::dashboard::get_summary),
        )
        .route(
            "/debug-sheets",
            get(handlers::diagnostics::debug_sheets).post(handlers::diagnostics::debug_sheets),
        )
        .route(
            "/update-env-config",
            get(handlers::settings::get_env_config).post(handlers::settings::update_env_config),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    public_routes.merge(secretary_routes)
}

pub fn build_router(app_state: AppState) -> Router {
    let functions = function_routes(&app_state);

    Router::new()
        .route("/health", get(|| async { "OK" }))
        .nest("/functions/v1", functions.clone())
        .nest("/functions", functions)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{header, Method, Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::{
        config::{RuntimeSettings, Settings},
        db::memory::InMemorySheets,
        services::mercadopago::tests::FakeGateway,
    };

    fn app(sheets: &InMemorySheets) -> Router {
        let state = AppState::from_parts(
            Settings::for_tests(),
            RuntimeSettings::default(),
            Arc::new(sheets.clone()),
            Arc::new(FakeGateway::default()),
        );
        build_router(state)
    }

    fn sheets() -> InMemorySheets {
        InMemorySheets::new()
            .with_sheet("dados pessoais", &[
                &["Data/Hora", "Nome", "CPF", "Telefone", "Email", "Status"],
                &["18/10/2026", "Ana", "617.677.351-20", "61999990000", "ana@x.org", "Pendente"],
                &["18/10/2026", "Bruno", "12345678909", "61988880000", "bruno@x.org", "Pendente"],
            ])
            .with_sheet("matriculas", &[&["Data", "Matrícula", "CPF", "Nome", "Ciclo", "Status"]])
    }

    async fn call(
        app: &Router,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    async fn bootstrap_and_login(app: &Router) -> String {
        let (status, _) = call(
            app,
            Method::POST,
            "/functions/v1/manage-secretary-users",
            None,
            Some(json!({
                "action": "create",
                "username": "secretaria",
                "email": "sec@eetad.org",
                "nomeCompleto": "Maria das Graças",
                "password": "segredo1"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = call(
            app,
            Method::POST,
            "/functions/v1/secretary-login",
            None,
            Some(json!({ "username": "secretaria", "password": "segredo1" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        body["token"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn health_is_public() {
        let app = app(&sheets());
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn secretary_routes_require_a_session() {
        let app = app(&sheets());

        let (status, body) =
            call(&app, Method::GET, "/functions/v1/get-pending-enrollments", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Token de autenticação inválido ou ausente.");

        let request = Request::builder()
            .uri("/functions/v1/dashboard-summary")
            .header(header::ACCEPT_LANGUAGE, "en-US")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "Missing or invalid authentication token.");
    }

    #[tokio::test]
    async fn pending_list_and_finalize_through_both_prefixes() {
        let sheets = sheets();
        let app = app(&sheets);
        let token = bootstrap_and_login(&app).await;

        let (status, body) =
            call(&app, Method::POST, "/functions/get-pending-students", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 2);
        assert_eq!(body["students"][0]["cpf"], "61767735120");

        let (status, body) = call(
            &app,
            Method::POST,
            "/functions/v1/finalize-enrollment",
            Some(&token),
            Some(json!({
                "rowIndex": 2,
                "cpf": "61767735120",
                "ciclo": "Ciclo 2025",
                "status": "Efetivado"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["alreadyEnrolled"], false);
        assert_eq!(sheets.rows("dados pessoais")[1][5], "Efetivado");

        let (_, body) =
            call(&app, Method::GET, "/functions/v1/get-pending-enrollments", Some(&token), None).await;
        assert_eq!(body["total"], 1);
        assert_eq!(body["students"][0]["nome"], "Bruno");
    }

    #[tokio::test]
    async fn logout_ends_the_session() {
        let app = app(&sheets());
        let token = bootstrap_and_login(&app).await;

        let (status, body) = call(&app, Method::GET, "/functions/v1/secretary-me", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["username"], "secretaria");
        assert!(body["user"].get("passwordHash").is_none());

        let (status, _) = call(&app, Method::POST, "/functions/v1/secretary-logout", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = call(&app, Method::GET, "/functions/v1/secretary-me", Some(&token), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Sessão expirada. Faça login novamente.");
    }

    #[tokio::test]
    async fn invalid_registration_returns_field_details() {
        let app = app(&sheets());

        let (status, body) = call(
            &app,
            Method::POST,
            "/functions/v1/save-student-personal-data",
            None,
            Some(json!({
                "nome": "Carla Dias",
                "cpf": "111.111.111-11",
                "telefone": "61977770000",
                "email": "carla@x.org"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["details"]["cpf"].is_array());
    }

    #[tokio::test]
    async fn webhook_is_acknowledged_without_login() {
        let app = app(&sheets());

        let (status, body) = call(
            &app,
            Method::POST,
            "/functions/v1/mercadopago-webhook?data.id=555&type=payment",
            None,
            Some(json!({ "type": "payment", "data": { "id": "555" } })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["paymentId"], "555");

        let (status, _) =
            call(&app, Method::POST, "/functions/v1/mercadopago-webhook", None, Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn runtime_config_is_masked_and_updatable() {
        let app = app(&sheets());
        let token = bootstrap_and_login(&app).await;

        let (status, body) = call(
            &app,
            Method::POST,
            "/functions/v1/update-env-config",
            Some(&token),
            Some(json!({ "MERCADOPAGO_ACCESS_TOKEN": "APP_USR-123456-4321" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let token_var = body["variables"]
            .as_array()
            .unwrap()
            .iter()
            .find(|v| v["name"] == "MERCADOPAGO_ACCESS_TOKEN")
            .unwrap();
        assert_eq!(token_var["configured"], true);
        assert_eq!(token_var["preview"], "APP_***4321");
    }
}

/// HTTP tests against the full router, with an in-memory dataset
/// Exercises routing, middleware, error envelopes and both score formulas
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use credito_pme_api::config::Config;
use credito_pme_api::dataset::{Dataset, DatasetRow, DatasetStore};
use credito_pme_api::handlers::AppState;
use credito_pme_api::middleware::TRACE_ID_HEADER;
use credito_pme_api::router::build_router;
use credito_pme_api::services::ScoreService;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn fixture() -> Dataset {
    Dataset::from_rows(vec![
        DatasetRow {
            name: "TechNova Soluções".to_string(),
            annual_revenue: Some(2_500_000.0),
            total_debt: Some(500_000.0),
            payment_term_days: Some(30),
            sector: Some("Tecnologia".to_string()),
            rating: Some("A".to_string()),
            recent_news: Some("Investimento em novo produto".to_string()),
        },
        DatasetRow {
            name: "Alfa Comércio Ltda".to_string(),
            annual_revenue: Some(900_000.0),
            total_debt: Some(300_000.0),
            payment_term_days: Some(75),
            sector: Some("Comércio".to_string()),
            rating: Some("B+".to_string()),
            recent_news: None,
        },
    ])
}

/// Helper function to create a router over the fixture dataset
fn app_with(config: Config) -> Router {
    let scorer = ScoreService::new(Arc::new(DatasetStore::new(fixture())), 64, 0);
    build_router(Arc::new(AppState { config, scorer }))
}

fn app() -> Router {
    app_with(Config::default())
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Option<String>, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let trace_id = response
        .headers()
        .get(TRACE_ID_HEADER)
        .map(|v| v.to_str().unwrap().to_string());
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, trace_id, body)
}

fn activity_body() -> Value {
    json!({
        "cnpj": "00.000.000/0001-00",
        "faturamento_mensal": 15000,
        "tempo_atividade_meses": 18,
        "inadimplente": false,
        "setor": "Comercio",
        "empregados": 3
    })
}

#[tokio::test]
async fn test_root_message() {
    let (status, _, body) = send(app(), get("/")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"mensagem": "API de Crédito PME rodando!"}));
}

#[tokio::test]
async fn test_healthz() {
    let (status, _, body) = send(app(), get("/healthz")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok"}));
}

#[tokio::test]
async fn test_activity_reference_scenario() {
    let (status, _, body) = send(app(), post_json("/v1/score", &activity_body())).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["score"], 538);
    assert_eq!(body["aprovado"], false);
    assert_eq!(body["limite_sugerido"], 8070);
    assert_eq!(body["cnpj"], "00.000.000/0001-00");
}

#[tokio::test]
async fn test_annual_aliases_give_identical_output() {
    let alias_body = json!({
        "cnpj": "00.000.000/0001-00",
        "faturamento_anual": 180000,
        "meses_operando": 18,
        "inadimplente": false,
        "setor": "Comercio",
        "empregados": 3
    });

    let (_, _, monthly) = send(app(), post_json("/v1/score", &activity_body())).await;
    let (status, _, annual) = send(app(), post_json("/v1/score", &alias_body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(monthly, annual);
}

#[tokio::test]
async fn test_missing_revenue_mentions_faturamento() {
    let body = json!({
        "cnpj": "00.000.000/0001-00",
        "tempo_atividade_meses": 18,
        "inadimplente": false,
        "empregados": 3
    });
    let (status, trace_id, body) = send(app(), post_json("/v1/score", &body)).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "validation_error");
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("faturamento"));
    assert_eq!(body["error"]["trace_id"].as_str(), trace_id.as_deref());
}

#[tokio::test]
async fn test_unknown_company_is_404() {
    let (status, _, body) = send(
        app(),
        post_json("/v1/score", &json!({"empresa": "Empresa Fantasma"})),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "not_found");
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("Empresa Fantasma"));
}

#[tokio::test]
async fn test_name_only_profile_from_dataset() {
    let (status, _, body) = send(app(), post_json("/v1/score", &json!({"empresa": "technova"}))).await;

    // 850 - 40 + 20 + 15
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["empresa"], "technova");
    assert_eq!(body["score"], 845);
    assert_eq!(body["aprovado"], true);
    assert_eq!(body["faixa_risco"], "baixíssimo");
    // 2_500_000 * 0.40 * 0.8
    assert_eq!(body["limite_sugerido"], 800_000);
}

#[tokio::test]
async fn test_partial_profile_is_completed_from_dataset() {
    let body = json!({
        "empresa": "TechNova Soluções",
        "receita_anual": 2500000,
        "divida_total": 500000
    });

    let (status, _, score) = send(app(), post_json("/v1/score", &body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(score["score"], 845);

    let (status, _, reasons) = send(app(), post_json("/v1/score/motivos", &body)).await;
    assert_eq!(status, StatusCode::OK);
    let motivos = reasons["motivos"].as_array().unwrap();
    assert!(motivos.contains(&json!("Rating A favorece aprovação.")));
    assert!(motivos.contains(&json!("Dados preenchidos a partir do dataset de referência.")));
}

#[tokio::test]
async fn test_explicit_profile_of_unknown_company_still_scores() {
    let body = json!({
        "empresa": "Empresa Fantasma",
        "receita_anual": 1000000,
        "divida_total": 100000,
        "prazo_pagamento_dias": 30,
        "setor": "Serviços",
        "rating": "B"
    });
    let (status, _, body) = send(app(), post_json("/v1/score", &body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["empresa"], "Empresa Fantasma");
}

#[tokio::test]
async fn test_profile_reasons() {
    let (status, _, body) = send(
        app(),
        post_json("/v1/score/motivos", &json!({"empresa": "Alfa"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["empresa"], "Alfa");
    assert_eq!(
        body["motivos"],
        json!([
            "Dados preenchidos a partir do dataset de referência.",
            "Endividamento/Receita saudável (até 50%).",
            "Rating B+ intermediário.",
            "Prazo de pagamento de 75 dias aumenta risco de caixa."
        ])
    );
}

#[tokio::test]
async fn test_activity_reasons_have_five_factors() {
    let (status, _, body) = send(app(), post_json("/v1/score/motivos", &activity_body())).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["score"], 538);
    assert_eq!(body["aprovado"], false);

    let factors: Vec<&str> = body["breakdown"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["fator"].as_str().unwrap())
        .collect();
    assert_eq!(
        factors,
        vec!["faturamento", "tempo_atividade", "inadimplencia", "empregados", "setor"]
    );
}

#[tokio::test]
async fn test_every_response_carries_trace_id() {
    let (_, first, _) = send(app(), get("/healthz")).await;
    let (_, second, _) = send(app(), get("/healthz")).await;

    let first = first.expect("x-trace-id header");
    assert_eq!(first.len(), 12);
    assert!(first.chars().all(|c| c.is_ascii_hexdigit()));
    assert_ne!(Some(first), second);
}

#[tokio::test]
async fn test_malformed_json_is_validation_error() {
    let request = Request::builder()
        .method("POST")
        .uri("/v1/score")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"empresa\": "))
        .unwrap();
    let (status, _, body) = send(app(), request).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "validation_error");
    assert_eq!(body["error"]["details"][0]["type"], "json_invalid");
}

#[tokio::test]
async fn test_wrong_field_type_is_validation_error() {
    let (status, _, body) = send(
        app(),
        post_json("/v1/score", &json!({"empresa": "Alfa", "receita_anual": "muito"})),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["details"][0]["type"], "type_error");
}

#[tokio::test]
async fn test_oversized_body_is_rejected() {
    let config = Config {
        max_body_bytes: 32,
        ..Config::default()
    };
    let payload = json!({"empresa": "x".repeat(100)}).to_string();
    let request = Request::builder()
        .method("POST")
        .uri("/v1/score")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::CONTENT_LENGTH, payload.len())
        .body(Body::from(payload))
        .unwrap();
    let (status, trace_id, body) = send(app_with(config), request).await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["error"]["code"], "http_error");
    assert_eq!(body["error"]["trace_id"].as_str(), trace_id.as_deref());
}

#[tokio::test]
async fn test_wrong_method_is_http_error() {
    let (status, trace_id, body) = send(app(), get("/v1/score")).await;

    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body["error"]["code"], "http_error");
    assert_eq!(body["error"]["trace_id"].as_str(), trace_id.as_deref());
}

#[tokio::test]
async fn test_unknown_route_is_http_error() {
    let (status, trace_id, body) = send(app(), get("/v2/nada")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "http_error");
    assert_eq!(body["error"]["trace_id"].as_str(), trace_id.as_deref());
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let (status, _, body) = send(app(), get("/api-docs/openapi.json")).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"].get("/v1/score/motivos").is_some());
}

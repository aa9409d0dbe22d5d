use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use commission_engine::api::router;
use commission_engine::settings::{PaymentTermBonus, PercentBracket};
use commission_engine::CommissionSettings;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use tower::ServiceExt;

fn ae_settings() -> CommissionSettings {
    CommissionSettings {
        ae_brackets: Some(vec![
            PercentBracket {
                min: Decimal::ZERO,
                max: Some(Decimal::from(50000)),
                percent: Decimal::from(5),
            },
            PercentBracket {
                min: Decimal::from(50000),
                max: None,
                percent: Decimal::new(75, 1),
            },
        ]),
        ae_payment_term_bonuses: Some(vec![PaymentTermBonus {
            term: "6 months".into(),
            bonus_percent: Decimal::from(2),
        }]),
        ..Default::default()
    }
}

async fn send(app: axum::Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    let request = match body {
        Some(body) => request.body(Body::from(serde_json::to_vec(&body).expect("serialize body"))),
        None => request.body(Body::empty()),
    }
    .expect("request");

    let response = app.oneshot(request).await.expect("router dispatch");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("body");
    let payload = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json")
    };
    (status, payload)
}

fn ae_request() -> Value {
    json!({
        "rep_id": "ae-7",
        "rep_name": "Alex",
        "team": "Enterprise AE",
        "period": {"start": "2024-03-01", "end": "2024-03-31"},
        "deals": [
            {"id": "d1", "amount": 60000, "stage": "Closed Won", "payment_term": "6 months"},
            {"id": "d2", "amount": "call me", "stage": "Closed Won"}
        ],
        "meetings": []
    })
}

#[tokio::test]
async fn health_reports_ok() {
    let (app, _) = router(CommissionSettings::default());
    let (status, body) = send(app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn calculate_returns_result_and_diagnostics() {
    let (app, _) = router(ae_settings());
    let (status, body) = send(app, "POST", "/api/commissions/calculate", Some(ae_request())).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["team"], "ae");
    assert_eq!(body["result"]["rep_id"], "ae-7");
    let total: Decimal = body["result"]["total_commission"]
        .as_str()
        .expect("decimal string")
        .parse()
        .expect("decimal");
    assert_eq!(total, Decimal::from(5700));
    assert_eq!(body["result"]["total_commission"], "5700.00");
    assert_eq!(body["diagnostics"]["invalid_amounts"][0]["deal_id"], "d2");
}

#[tokio::test]
async fn calculate_reports_missing_rule_table() {
    let (app, _) = router(CommissionSettings::default());
    let (status, body) = send(app, "POST", "/api/commissions/calculate", Some(ae_request())).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].as_str().unwrap().contains("ae_brackets"));
}

#[tokio::test]
async fn calculate_reports_overflow_as_unprocessable() {
    let (app, _) = router(ae_settings());
    let huge = "50000000000000000000000000000";
    let request = json!({
        "rep_id": "ae-9",
        "rep_name": "Sam",
        "team": "AE",
        "period": {"start": "2024-03-01", "end": "2024-03-31"},
        "deals": [
            {"id": "h1", "amount": huge, "stage": "Closed Won"},
            {"id": "h2", "amount": huge, "stage": "Closed Won"}
        ]
    });
    let (status, body) = send(app, "POST", "/api/commissions/calculate", Some(request)).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].as_str().unwrap().contains("overflow"));
}

#[tokio::test]
async fn run_computes_every_rep() {
    let (app, _) = router(ae_settings());
    let run = json!({
        "period": {"start": "2024-03-01", "end": "2024-03-31"},
        "reps": [
            {"rep_id": "ae-1", "rep_name": "A", "team": "AE",
             "deals": [{"amount": 1000, "stage": "Closed Won"}]},
            {"rep_id": "ops-1", "rep_name": "B", "team": "Operations"}
        ]
    });
    let (status, body) = send(app, "POST", "/api/commissions/run", Some(run)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totals"]["computed"], 1);
    assert_eq!(body["totals"]["failed"], 1);
    assert_eq!(body["outcomes"][0]["status"], "computed");
    assert_eq!(body["outcomes"][1]["status"], "failed");
}

#[tokio::test]
async fn settings_can_be_replaced_only_with_valid_tables() {
    let (app, state) = router(CommissionSettings::default());

    let overlapping = json!({
        "ae_brackets": [
            {"min": 0, "max": 1000, "percent": 5},
            {"min": 500, "max": null, "percent": 7}
        ]
    });
    let (status, _) = send(app.clone(), "PUT", "/api/settings", Some(overlapping)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(state.settings.read().await.ae_brackets.is_none());

    let valid = json!({
        "ae_brackets": [{"min": 0, "max": null, "percent": 4}],
        "marketing_inbound_percent": "1.5"
    });
    let (status, _) = send(app.clone(), "PUT", "/api/settings", Some(valid)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(app, "GET", "/api/settings", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ae_brackets"][0]["percent"], "4");
    assert_eq!(body["marketing_inbound_percent"], "1.5");
}

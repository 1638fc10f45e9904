//! REST Client Integration Tests
//!
//! Runs the dashboard adapter against a mock backend: retry policy, status
//! mapping, bearer tokens, request shapes and the alert endpoints.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::time::Duration;

use serde_json::json;
use rust_decimal_macros::dec;
use wiremock::matchers::{body_json, body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use stock_dashboard::application::ports::{AlertsPort, ApiError, AuthPort, MarketDataPort};
use stock_dashboard::domain::alerts::{AlertType, AlertUpdate, NewAlert};
use stock_dashboard::domain::screener::{FilterState, ScreenerKind, ScreenerRequest};
use stock_dashboard::domain::stock::MoverKind;
use stock_dashboard::infrastructure::api::{ApiClientConfig, DashboardApiClient, RetryConfig};

fn fast_retry(max_attempts: u32) -> RetryConfig {
    RetryConfig {
        max_attempts,
        initial_backoff: Duration::from_millis(1),
        max_backoff: Duration::from_millis(5),
        multiplier: 2.0,
    }
}

fn client_for(server: &MockServer) -> DashboardApiClient {
    let config = ApiClientConfig::new(server.uri())
        .with_timeout(Duration::from_secs(5))
        .with_retry(fast_retry(3));
    DashboardApiClient::new(&config).unwrap()
}

#[tokio::test]
async fn retries_server_errors_then_succeeds() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/stocks/popular"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/stocks/popular"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"popular_stocks": [{"symbol": "AAPL"}, {"symbol": "MSFT"}]})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let items = client_for(&server).popular_stocks().await.unwrap();
    assert_eq!(items.len(), 2);
}

#[tokio::test]
async fn server_errors_give_up_after_max_attempts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/stocks/popular"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let err = client_for(&server).popular_stocks().await.unwrap_err();
    assert!(matches!(err, ApiError::Connection { .. }), "got {err:?}");
}

#[tokio::test]
async fn not_found_maps_to_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/stocks/info/ZZZZ"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"detail": "Stock not found"})))
        .expect(1)
        .mount(&server)
        .await;

    let err = client_for(&server).stock_info("ZZZZ").await.unwrap_err();
    assert_eq!(
        err,
        ApiError::NotFound {
            resource: "/api/stocks/info/ZZZZ".to_string()
        }
    );
}

#[tokio::test]
async fn validation_error_carries_backend_detail() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/stocks/history/AAPL"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({"detail": "bad period"})))
        .mount(&server)
        .await;

    let err = client_for(&server).history("AAPL", "7y").await.unwrap_err();
    assert_eq!(
        err,
        ApiError::Rejected {
            status: 400,
            detail: "bad period".to_string()
        }
    );
}

#[tokio::test]
async fn unauthorized_current_user() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = client_for(&server).current_user().await.unwrap_err();
    assert!(err.is_auth());
}

#[tokio::test]
async fn bearer_token_sent_after_install() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .and(header("authorization", "Bearer tok-123"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"username": "trader", "email": "trader@example.com"})),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let client = client_for(&server);
    client.set_bearer_token(Some("tok-123".to_string()));
    let user = client.current_user().await.unwrap();
    assert_eq!(user.username, "trader");
    assert_eq!(user.created_at, None);

    client.set_bearer_token(None);
    assert_eq!(client.current_user().await.unwrap_err(), ApiError::Unauthorized);
}

#[tokio::test]
async fn login_posts_form_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/token"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string_contains("username=trader"))
        .and(body_string_contains("password=s3cret"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"access_token": "tok-1", "token_type": "bearer"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let token = client_for(&server).login("trader", "s3cret").await.unwrap();
    assert_eq!(token.access_token, "tok-1");
    assert_eq!(token.token_type, "bearer");
}

#[tokio::test]
async fn post_is_not_retried_on_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/token"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let err = client_for(&server).login("trader", "pw").await.unwrap_err();
    assert!(matches!(err, ApiError::Rejected { status: 503, .. }), "got {err:?}");
}

#[tokio::test]
async fn movers_send_limit_and_accept_bare_or_wrapped_lists() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/stocks/top-gainers"))
        .and(query_param("limit", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"symbol": "NVDA", "change_percent": 8.1},
            {"symbol": "AMD", "change_percent": 6.4}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/stocks/most-active"))
        .and(query_param("limit", "5"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"stocks": [{"symbol": "TSLA"}]})),
        )
        .mount(&server)
        .await;

    let client = client_for(&server);
    let gainers = client.movers(MoverKind::Gainers, 5).await.unwrap();
    let active = client.movers(MoverKind::MostActive, 5).await.unwrap();

    assert_eq!(gainers.len(), 2);
    assert_eq!(active[0]["symbol"], "TSLA");
}

#[tokio::test]
async fn screener_sends_full_parameter_set() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/stocks/screener/consecutive-positive"))
        .and(query_param("limit", "15"))
        .and(query_param("timeframe", "5m"))
        .and(query_param("num_candles", "3"))
        .and(query_param("min_price", "0"))
        .and(query_param("max_price", "5000"))
        .and(query_param("min_change_percent", "-500"))
        .and(query_param("max_change_percent", "500"))
        .and(query_param("min_volume", "100000"))
        .and(query_param("max_volume", "10000000"))
        .and(query_param("sector", "Technology"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"symbol": "msft"}])))
        .expect(1)
        .mount(&server)
        .await;

    let request = ScreenerRequest::new(ScreenerKind::ConsecutivePositive).with_filters(FilterState {
        sector: "Technology".to_string(),
        ..FilterState::default()
    });
    let items = client_for(&server).screener(&request).await.unwrap();
    assert_eq!(items.len(), 1);
}

#[tokio::test]
async fn symbols_are_path_encoded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/stocks/price/BRK.B"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"symbol": "BRK.B", "price": 412.5})))
        .expect(1)
        .mount(&server)
        .await;

    let quote = client_for(&server).stock_price("BRK.B").await.unwrap();
    assert_eq!(quote["price"], 412.5);
}

#[tokio::test]
async fn unreachable_backend_is_a_connection_error() {
    let config = ApiClientConfig::new("http://127.0.0.1:1").with_retry(fast_retry(2));
    let client = DashboardApiClient::new(&config).unwrap();

    let err = client.popular_stocks().await.unwrap_err();
    assert!(matches!(err, ApiError::Connection { .. }), "got {err:?}");
}

#[tokio::test]
async fn create_alert_posts_json_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/alerts/create"))
        .and(body_json(json!({
            "stock_symbol": "NVDA",
            "user_email": "trader@example.com",
            "alert_type": "price_above",
            "threshold_value": 1000.5
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "message": "Alert created",
            "alert_id": 42
        })))
        .expect(1)
        .mount(&server)
        .await;

    let alert = NewAlert {
        stock_symbol: "NVDA".to_string(),
        user_email: "trader@example.com".to_string(),
        alert_type: AlertType::PriceAbove,
        threshold_value: dec!(1000.5),
    };
    let outcome = client_for(&server).create_alert(&alert).await.unwrap();
    assert!(outcome.success);
    assert_eq!(outcome.alert_id, Some(42));
    assert_eq!(outcome.message.as_deref(), Some("Alert created"));
}

#[tokio::test]
async fn user_alerts_unwrap_envelope_and_decode_timestamps() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/alerts/user/trader%40example.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "alerts": [
                {
                    "id": 7,
                    "stock_symbol": "AAPL",
                    "alert_type": "price_below",
                    "threshold_value": 180.0,
                    "is_active": false,
                    "created_at": "2024-05-01T14:30:00.123456",
                    "last_triggered": "2024-05-02T09:31:00Z"
                },
                {
                    "id": 8,
                    "stock_symbol": "TSLA",
                    "alert_type": "rsi_above",
                    "threshold_value": "70"
                }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let alerts = client_for(&server).user_alerts("trader@example.com").await.unwrap();
    assert_eq!(alerts.len(), 2);

    assert_eq!(alerts[0].alert_type, AlertType::PriceBelow);
    assert!(!alerts[0].is_active);
    assert_eq!(
        alerts[0].created_at.unwrap().to_rfc3339(),
        "2024-05-01T14:30:00.123456+00:00"
    );
    assert_eq!(
        alerts[0].last_triggered.unwrap().to_rfc3339(),
        "2024-05-02T09:31:00+00:00"
    );

    assert_eq!(alerts[1].alert_type, AlertType::Other);
    assert_eq!(alerts[1].threshold_value, dec!(70));
    assert!(alerts[1].is_active);
    assert!(alerts[1].created_at.is_none());
}

#[tokio::test]
async fn user_alerts_missing_envelope_is_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/alerts/user/nobody%40example.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let alerts = client_for(&server).user_alerts("nobody@example.com").await.unwrap();
    assert!(alerts.is_empty());
}

#[tokio::test]
async fn update_alert_puts_only_set_fields() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/alerts/7"))
        .and(body_json(json!({"is_active": false})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"success": true, "message": "Alert updated"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let update = AlertUpdate {
        is_active: Some(false),
        threshold_value: None,
    };
    let outcome = client_for(&server).update_alert(7, &update).await.unwrap();
    assert!(outcome.success);
    assert_eq!(outcome.alert_id, None);
}

#[tokio::test]
async fn delete_alert_sends_delete() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/alerts/7"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"success": false, "message": "Alert 7 already removed"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let outcome = client_for(&server).delete_alert(7).await.unwrap();
    assert!(!outcome.success);
    assert_eq!(outcome.message.as_deref(), Some("Alert 7 already removed"));
}

#[tokio::test]
async fn delete_missing_alert_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/alerts/99"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"detail": "Alert 99 not found"})))
        .mount(&server)
        .await;

    let err = client_for(&server).delete_alert(99).await.unwrap_err();
    assert!(matches!(err, ApiError::NotFound { .. }), "got {err:?}");
}

#[tokio::test]
async fn triggered_alerts_unwrap_envelope() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/alerts/triggered"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "triggered_alerts": [{
                "id": 3,
                "stock_symbol": "AMD",
                "alert_type": "percent_change",
                "threshold_value": 5,
                "current_value": 6.25,
                "user_email": "trader@example.com",
                "triggered_at": "2024-05-02 15:59:59"
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let fired = client_for(&server).triggered_alerts().await.unwrap();
    assert_eq!(fired.len(), 1);
    assert_eq!(fired[0].alert_type, AlertType::PercentChange);
    assert_eq!(fired[0].current_value, Some(dec!(6.25)));
    assert_eq!(fired[0].user_email.as_deref(), Some("trader@example.com"));
}

#[tokio::test]
async fn alert_types_unwrap_envelope() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/alerts/types"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "alert_types": [
                {"type": "price_above", "description": "Price rises above"},
                {"type": "volume_above", "description": "Volume exceeds"},
                {"type": "macd_cross", "description": "MACD crossover"}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let types = client_for(&server).alert_types().await.unwrap();
    let kinds: Vec<_> = types.iter().map(|t| t.alert_type.clone()).collect();
    assert_eq!(
        kinds,
        vec![AlertType::PriceAbove, AlertType::VolumeAbove, AlertType::Other]
    );
    assert_eq!(types[2].description, "MACD crossover");
}

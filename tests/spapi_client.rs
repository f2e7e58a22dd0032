//! End-to-end tests for the SP-API restrictions client against a mock
//! server: token exchange, signing headers, retry behavior, and response
//! mapping.

use asin_tracker::config::SpApiConfig;
use asin_tracker::core::eligibility::types::SellingStatus;
use asin_tracker::core::spapi::{RestrictionsClient, SpApiClient};
use serde_json::json;
use wiremock::matchers::{body_string_contains, header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate, Times};

const RESTRICTIONS_PATH: &str = "/listings/2021-08-01/restrictions";

fn client_for(server: &MockServer, max_attempts: u32) -> SpApiClient {
    let mut config = SpApiConfig::default();
    config.lwa_url = format!("{}/auth/o2/token", server.uri());
    config.endpoint = server.uri();
    config.lwa_client_id = "client-id".to_string();
    config.lwa_client_secret = "client-secret".to_string();
    config.lwa_refresh_token = "refresh-token".to_string();
    config.aws_access_key = "AKIATEST".to_string();
    config.aws_secret_key = "testsecret".to_string();
    config.seller_id = "SELLER1".to_string();
    config.max_attempts = max_attempts;
    config.retry_base_delay_ms = 1;
    SpApiClient::new(config)
}

async fn mock_token_endpoint(server: &MockServer, expected_calls: impl Into<Times>) {
    Mock::given(method("POST"))
        .and(path("/auth/o2/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=refresh-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "lwa-access-token",
            "token_type": "bearer",
            "expires_in": 3600
        })))
        .expect(expected_calls)
        .mount(server)
        .await;
}

#[tokio::test]
async fn unrestricted_asin_maps_to_allowed_with_signed_request() {
    let server = MockServer::start().await;
    mock_token_endpoint(&server, 1).await;

    Mock::given(method("GET"))
        .and(path(RESTRICTIONS_PATH))
        .and(query_param("asin", "B000000001"))
        .and(query_param("sellerId", "SELLER1"))
        .and(query_param("conditionType", "new_new"))
        .and(header_exists("x-amz-access-token"))
        .and(header_exists("authorization"))
        .and(header_exists("x-amz-date"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "restrictions": [] })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, 3);
    let status = client.check("B000000001").await.unwrap();
    assert_eq!(status, SellingStatus::Allowed);
}

#[tokio::test]
async fn approval_required_maps_to_gated() {
    let server = MockServer::start().await;
    mock_token_endpoint(&server, 1).await;

    Mock::given(method("GET"))
        .and(path(RESTRICTIONS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "restrictions": [{
                "marketplaceId": "A1PA6795UKMFR9",
                "conditionType": "new_new",
                "reasons": [{
                    "reasonCode": "APPROVAL_REQUIRED",
                    "message": "You need approval to list this product."
                }]
            }]
        })))
        .mount(&server)
        .await;

    let client = client_for(&server, 3);
    assert_eq!(
        client.check("B000000002").await.unwrap(),
        SellingStatus::Gated
    );
}

#[tokio::test]
async fn invoice_requirement_maps_to_requires_invoice() {
    let server = MockServer::start().await;
    mock_token_endpoint(&server, 1).await;

    Mock::given(method("GET"))
        .and(path(RESTRICTIONS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "restrictions": [{
                "reasons": [{
                    "reasonCode": "APPROVAL_REQUIRED",
                    "message": "Submit invoices from an authorized distributor."
                }]
            }]
        })))
        .mount(&server)
        .await;

    let client = client_for(&server, 3);
    assert_eq!(
        client.check("B000000003").await.unwrap(),
        SellingStatus::RequiresInvoice
    );
}

#[tokio::test]
async fn throttled_request_retries_and_succeeds() {
    let server = MockServer::start().await;
    mock_token_endpoint(&server, 0..).await;

    // First attempt is throttled with an explicit zero-second Retry-After
    // so the test does not wait out a real backoff.
    Mock::given(method("GET"))
        .and(path(RESTRICTIONS_PATH))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("Retry-After", "0")
                .set_body_json(json!({
                    "errors": [{ "code": "QuotaExceeded", "message": "slow down" }]
                })),
        )
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(RESTRICTIONS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "restrictions": [{
                "reasons": [{ "reasonCode": "NOT_ELIGIBLE" }]
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, 3);
    assert_eq!(
        client.check("B000000004").await.unwrap(),
        SellingStatus::Restricted
    );
}

#[tokio::test]
async fn exhausted_retries_surface_an_error() {
    let server = MockServer::start().await;
    mock_token_endpoint(&server, 0..).await;

    Mock::given(method("GET"))
        .and(path(RESTRICTIONS_PATH))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&server)
        .await;

    let client = client_for(&server, 2);
    let result = client.check("B000000005").await;
    assert!(result.is_err(), "expected an error, got {:?}", result.ok());
}

#[tokio::test]
async fn unknown_asin_error_maps_to_unknown_status() {
    let server = MockServer::start().await;
    mock_token_endpoint(&server, 1).await;

    Mock::given(method("GET"))
        .and(path(RESTRICTIONS_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "errors": [{ "code": "ASIN_NOT_FOUND", "message": "no such ASIN" }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, 3);
    assert_eq!(
        client.check("B0UNKNOWN00").await.unwrap(),
        SellingStatus::Unknown
    );
}

#[tokio::test]
async fn access_token_is_cached_across_lookups() {
    let server = MockServer::start().await;
    // Two lookups, one token exchange.
    mock_token_endpoint(&server, 1).await;

    Mock::given(method("GET"))
        .and(path(RESTRICTIONS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "restrictions": [] })))
        .expect(2)
        .mount(&server)
        .await;

    let client = client_for(&server, 3);
    client.check("B000000006").await.unwrap();
    client.check("B000000007").await.unwrap();
}

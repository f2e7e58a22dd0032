//! Job lifecycle endpoints
//!
//! Import and eligibility runs are started here and observed by polling;
//! every read is side-effect free. Validation and conflicts surface
//! synchronously, everything after a job id is handed out surfaces only
//! through the job record.

use crate::core::eligibility::types::{CheckMode, SellingStatus};
use crate::server::routes::ApiResponse;
use crate::server::state::AppState;
use crate::utils::error::TrackerError;
use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use futures::StreamExt;
use serde::Deserialize;
use tracing::{error, info};

const DEFAULT_RECENT_LIMIT: usize = 50;

/// Configure job routes
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/products/import", web::post().to(start_import))
            .route(
                "/products/import/{job_id}/progress",
                web::get().to(import_progress),
            )
            .route("/seller-status/check", web::post().to(start_check))
            .route(
                "/seller-status/check/progress",
                web::get().to(check_progress),
            )
            .route("/seller-status/check/cancel", web::post().to(cancel_check)),
    );
}

/// Accept a CSV upload and start an import job
pub async fn start_import(
    state: web::Data<AppState>,
    mut payload: Multipart,
) -> Result<HttpResponse, TrackerError> {
    let mut file_data: Option<Vec<u8>> = None;
    let mut filename: Option<String> = None;

    while let Some(item) = payload.next().await {
        let mut field = item
            .map_err(|e| TrackerError::BadRequest(format!("invalid multipart data: {}", e)))?;

        if field.name() != Some("file") {
            continue;
        }
        if let Some(cd) = field.content_disposition() {
            if let Some(fname) = cd.get_filename() {
                filename = Some(fname.to_string());
            }
        }

        let mut data = Vec::new();
        while let Some(chunk) = field.next().await {
            let bytes = chunk.map_err(|e| {
                error!("error reading file chunk: {}", e);
                TrackerError::BadRequest("error reading uploaded file".to_string())
            })?;
            data.extend_from_slice(&bytes);
        }
        file_data = Some(data);
    }

    let file_data = file_data
        .ok_or_else(|| TrackerError::BadRequest("missing \"file\" form field".to_string()))?;

    info!(
        filename = filename.as_deref().unwrap_or("<unnamed>"),
        bytes = file_data.len(),
        "import upload received"
    );
    let receipt = state.imports.start_import(&file_data, filename).await?;
    Ok(HttpResponse::Accepted().json(ApiResponse::success(receipt)))
}

/// Poll an import job's progress
pub async fn import_progress(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, TrackerError> {
    let record = state.imports.import_progress(&path).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(record)))
}

#[derive(Debug, Deserialize)]
pub struct CheckRequest {
    mode: String,
    status: Option<SellingStatus>,
    limit: Option<usize>,
}

fn parse_mode(request: &CheckRequest) -> Result<CheckMode, TrackerError> {
    match request.mode.as_str() {
        "not_checked" => Ok(CheckMode::NotChecked),
        "with_status" => {
            let status = request.status.ok_or_else(|| {
                TrackerError::Validation(
                    "mode \"with_status\" requires a \"status\" value".to_string(),
                )
            })?;
            Ok(CheckMode::WithStatus(status))
        }
        "recent" => {
            let limit = request.limit.unwrap_or(DEFAULT_RECENT_LIMIT);
            if limit == 0 {
                return Err(TrackerError::Validation(
                    "\"limit\" must be at least 1".to_string(),
                ));
            }
            Ok(CheckMode::Recent(limit))
        }
        other => Err(TrackerError::Validation(format!(
            "unknown check mode {:?}; expected not_checked, with_status, or recent",
            other
        ))),
    }
}

/// Start an eligibility run
pub async fn start_check(
    state: web::Data<AppState>,
    request: web::Json<CheckRequest>,
) -> Result<HttpResponse, TrackerError> {
    let mode = parse_mode(&request)?;
    let receipt = state.eligibility.start_check(mode).await?;
    Ok(HttpResponse::Accepted().json(ApiResponse::success(receipt)))
}

#[derive(Debug, Deserialize)]
pub struct CheckProgressQuery {
    job_id: Option<String>,
}

/// Poll an eligibility run; without a job id, resolves the active one
pub async fn check_progress(
    state: web::Data<AppState>,
    query: web::Query<CheckProgressQuery>,
) -> Result<HttpResponse, TrackerError> {
    let record = state
        .eligibility
        .check_status(query.job_id.as_deref())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(record)))
}

/// Request cancellation of the active eligibility run
pub async fn cancel_check(state: web::Data<AppState>) -> Result<HttpResponse, TrackerError> {
    let outcome = state.eligibility.cancel().await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(outcome)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::core::eligibility::EligibilityPipeline;
    use crate::core::import::ImportPipeline;
    use crate::core::spapi::client::MockRestrictionsClient;
    use crate::storage::memory::MemoryProgressStore;
    use crate::storage::memory_repository::{
        MemoryImportHistoryStore, MemoryProductRepository, MemoryTagStore,
    };
    use actix_web::{test, App};
    use std::sync::Arc;

    fn allowed_client() -> MockRestrictionsClient {
        let mut client = MockRestrictionsClient::new();
        client
            .expect_check()
            .returning(|_| Ok(SellingStatus::Allowed));
        client
    }

    fn state() -> AppState {
        let config = Arc::new(Config::default());
        let progress = Arc::new(MemoryProgressStore::new());
        let repository = Arc::new(MemoryProductRepository::new());
        let jobs = config.jobs().clone();

        let imports = Arc::new(ImportPipeline::new(
            progress.clone(),
            repository.clone(),
            Arc::new(MemoryTagStore::new()),
            Arc::new(MemoryImportHistoryStore::new()),
            jobs.clone(),
        ));
        let eligibility = Arc::new(EligibilityPipeline::new(
            progress,
            repository,
            Arc::new(allowed_client()),
            jobs,
        ));
        AppState::new(config, imports, eligibility)
    }

    fn multipart_csv(boundary: &str, csv: &str) -> Vec<u8> {
        format!(
            "--{b}\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"products.csv\"\r\n\
             Content-Type: text/csv\r\n\r\n\
             {csv}\r\n\
             --{b}--\r\n",
            b = boundary,
            csv = csv
        )
        .into_bytes()
    }

    #[actix_web::test]
    async fn test_import_endpoint_accepts_csv_and_is_pollable() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state()))
                .configure(configure_routes),
        )
        .await;

        let boundary = "test-boundary";
        let body = multipart_csv(boundary, "ASIN,Title\nB000000001,Widget\n");
        let request = test::TestRequest::post()
            .uri("/api/products/import")
            .insert_header((
                "content-type",
                format!("multipart/form-data; boundary={}", boundary),
            ))
            .set_payload(body)
            .to_request();

        let response: serde_json::Value = test::call_and_read_body_json(&app, request).await;
        assert_eq!(response["success"], true);
        let job_id = response["data"]["job_id"].as_str().unwrap().to_string();
        assert_eq!(response["data"]["total"], 1);

        let request = test::TestRequest::get()
            .uri(&format!("/api/products/import/{}/progress", job_id))
            .to_request();
        let response: serde_json::Value = test::call_and_read_body_json(&app, request).await;
        assert_eq!(response["data"]["job_id"], job_id.as_str());
        assert_eq!(response["data"]["kind"], "import");
    }

    #[actix_web::test]
    async fn test_unknown_import_job_is_404() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state()))
                .configure(configure_routes),
        )
        .await;

        let request = test::TestRequest::get()
            .uri("/api/products/import/nonexistent/progress")
            .to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), 404);
    }

    #[actix_web::test]
    async fn test_check_with_no_products_is_400() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state()))
                .configure(configure_routes),
        )
        .await;

        let request = test::TestRequest::post()
            .uri("/api/seller-status/check")
            .set_json(serde_json::json!({"mode": "not_checked"}))
            .to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), 400);
    }

    #[actix_web::test]
    async fn test_cancel_with_nothing_running() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state()))
                .configure(configure_routes),
        )
        .await;

        let request = test::TestRequest::post()
            .uri("/api/seller-status/check/cancel")
            .to_request();
        let response: serde_json::Value = test::call_and_read_body_json(&app, request).await;
        assert_eq!(response["data"]["cancelled"], false);
    }

    #[::core::prelude::v1::test]
    fn test_parse_mode_variants() {
        let ok = parse_mode(&CheckRequest {
            mode: "recent".to_string(),
            status: None,
            limit: Some(10),
        })
        .unwrap();
        assert_eq!(ok, CheckMode::Recent(10));

        let missing_status = parse_mode(&CheckRequest {
            mode: "with_status".to_string(),
            status: None,
            limit: None,
        });
        assert!(missing_status.is_err());

        let unknown = parse_mode(&CheckRequest {
            mode: "everything".to_string(),
            status: None,
            limit: None,
        });
        assert!(unknown.is_err());
    }
}

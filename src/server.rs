//! HTTP adapter: exposes availability search over REST.
//!
//! Every request runs its own browser session through the shared
//! [`SearchOrchestrator`]; failures are rendered with the status and body
//! carried by [`AppError`].

use crate::browser::BrowserDriver;
use crate::error::AppError;
use crate::fasthotel::{AccommodationListing, SearchOrchestrator};
use crate::validation::{ValidationErrors, ValidationIssue};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

/// Body of `POST /search`. Absent fields are reported by validation.
#[derive(Debug, Default, Deserialize)]
pub struct SearchBody {
    #[serde(default)]
    pub checkin: Option<String>,
    #[serde(default)]
    pub checkout: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.body())).into_response()
    }
}

/// An unreadable body is reported like any other invalid request.
fn body_rejected(rejection: JsonRejection) -> AppError {
    let issue = ValidationIssue {
        path: "body".to_string(),
        message: rejection.body_text(),
        code: "invalid_json".to_string(),
    };
    ValidationErrors(vec![issue]).into()
}

/// Build the axum Router with all endpoints.
pub fn router<D: BrowserDriver + 'static>(state: Arc<SearchOrchestrator<D>>) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/", get(greeting))
        .route("/health", get(health))
        .route("/search", post(search::<D>))
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server on the given port.
pub async fn start<D: BrowserDriver + 'static>(port: u16, state: Arc<SearchOrchestrator<D>>) -> anyhow::Result<()> {
    let app = router(state);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn greeting() -> &'static str {
    "Hello from fasthotel-search!"
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn search<D: BrowserDriver + 'static>(
    State(state): State<Arc<SearchOrchestrator<D>>>,
    body: Result<Json<SearchBody>, JsonRejection>,
) -> Result<Json<Vec<AccommodationListing>>, AppError> {
    let Json(body) = body.map_err(body_rejected)?;
    let listings = state.search_fields(body.checkin.as_deref(), body.checkout.as_deref()).await?;
    Ok(Json(listings))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::testing::{MockDriver, PageScript, StaticResponse};
    use crate::config::Config;
    use crate::error::ErrorCode;
    use chrono::{Days, Utc};
    use std::time::Duration;

    const ROOM: &str = r#"<section data-name="acomodacoes">
        <div class="row borda-cor" data-codigo="3">
          <h3 data-campo="titulo">Luxo Vista Mar</h3>
          <div class="row tarifa"><h4 data-campo="nome">Pacote Réveillon</h4><b data-campo="valor">R$ 1.200,00</b></div>
        </div>
      </section>"#;

    fn state(script: PageScript) -> Arc<SearchOrchestrator<MockDriver>> {
        Arc::new(SearchOrchestrator::new(MockDriver::new(script), Config::default()).unwrap())
    }

    fn page() -> PageScript {
        PageScript {
            navigation_delay: Duration::from_millis(100),
            selector_found: true,
            html: ROOM.to_string(),
            ..PageScript::default()
        }
    }

    fn body(checkin_in: u64, checkout_in: u64) -> SearchBody {
        let today = Utc::now().date_naive();
        let day = |n| today.checked_add_days(Days::new(n)).unwrap().format("%Y-%m-%d").to_string();
        SearchBody { checkin: Some(day(checkin_in)), checkout: Some(day(checkout_in)) }
    }

    #[tokio::test]
    async fn test_greeting_and_health() {
        assert!(greeting().await.contains("fasthotel-search"));
        assert_eq!(health().await.0["status"], "ok");
    }

    #[tokio::test(start_paused = true)]
    async fn test_search_returns_listings() {
        let Json(listings) = search(State(state(page())), Ok(Json(body(3, 4)))).await.unwrap();

        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].name, "Luxo Vista Mar");
        assert_eq!(listings[0].price, "R$ 1.200,00");
        assert_eq!(listings[0].description, "Description not found");
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_fields_are_bad_request() {
        let err = search(State(state(page())), Ok(Json(SearchBody::default()))).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);

        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reservation_failure_keeps_upstream_status() {
        let script = PageScript {
            during_navigation: vec![StaticResponse::quote(429, r#"{"status":"error","error":"Too many requests"}"#)],
            ..page()
        };

        let err = search(State(state(script)), Ok(Json(body(3, 4)))).await.unwrap_err();
        assert_eq!(err.message, "Too many requests");
        assert_eq!(err.into_response().status(), StatusCode::TOO_MANY_REQUESTS);
    }

    async fn rejected(content_type: &str, payload: &'static str) -> JsonRejection {
        use axum::extract::FromRequest;

        let request = axum::http::Request::builder()
            .method("POST")
            .uri("/search")
            .header("content-type", content_type)
            .body(axum::body::Body::from(payload))
            .unwrap();
        Json::<SearchBody>::from_request(request, &()).await.unwrap_err()
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_json_is_validation_error() {
        let err = search(State(state(page())), Err(rejected("application/json", "{\"checkin\": ").await))
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::ValidationError);
        assert_eq!(err.message, "Request validation failed");
        let details = err.details.clone().unwrap();
        assert_eq!(details[0]["path"], "body");
        assert_eq!(details[0]["code"], "invalid_json");
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_content_type_is_validation_error() {
        let driver = MockDriver::new(page());
        let recorder = Arc::clone(&driver.recorder);
        let state = Arc::new(SearchOrchestrator::new(driver, Config::default()).unwrap());

        let err = search(State(state), Err(rejected("text/plain", "{}").await)).await.unwrap_err();

        assert_eq!(err.code, ErrorCode::ValidationError);
        assert_eq!(recorder.launches(), 0);
    }

    #[test]
    fn test_out_of_range_status_falls_back_to_500() {
        let err = AppError::new(ErrorCode::SearchServiceError, "boom").with_status(42);
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_search_body_accepts_partial_json() {
        let body: SearchBody = serde_json::from_str(r#"{"checkin":"2030-01-01"}"#).unwrap();
        assert_eq!(body.checkin.as_deref(), Some("2030-01-01"));
        assert!(body.checkout.is_none());
    }

    #[test]
    fn test_router_builds() {
        let _ = router(state(page()));
    }
}

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::Context;
use axum::{
    Json, Router,
    extract::{Path, Request, State},
    http::{HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::{Deserialize, Serialize};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use nutrilog_core::models::{
    AddFoodResponse, DailySummary, Food, Goal, LogFoodResponse, MealsForDate, SetGoalResponse,
    parse_date,
};
use nutrilog_core::service::{NutritionService, today};

const BODY_LIMIT: usize = 1024 * 1024; // 1 MB

#[derive(Clone)]
struct AppState {
    service: Arc<Mutex<NutritionService>>,
}

impl AppState {
    fn service(&self) -> MutexGuard<'_, NutritionService> {
        self.service.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// --- Request / Response types ---

#[derive(Deserialize)]
struct AddFoodRequest {
    name: String,
    calories: i64,
    protein: f64,
    carbs: f64,
    fat: f64,
}

#[derive(Deserialize)]
struct LogFoodRequest {
    name: String,
    quantity: f64,
    meal: Option<String>,
    date: Option<String>,
}

#[derive(Deserialize)]
struct SetGoalRequest {
    calories: i64,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

// --- Error handling ---

enum ApiError {
    BadRequest(String),
    Internal(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::Internal(err) => {
                error!(error = %format!("{err:#}"), "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err)
    }
}

fn parse_date_param(date: &str) -> Result<chrono::NaiveDate, ApiError> {
    parse_date(date).map_err(|e| ApiError::BadRequest(format!("{e}")))
}

// --- Middleware ---

async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(
        "x-content-type-options",
        HeaderValue::from_static("nosniff"),
    );
    headers.insert("x-frame-options", HeaderValue::from_static("DENY"));
    headers.insert(
        "content-security-policy",
        HeaderValue::from_static("default-src 'none'"),
    );
    response
}

// --- Handlers ---

async fn add_food(
    State(state): State<AppState>,
    Json(req): Json<AddFoodRequest>,
) -> Result<(StatusCode, Json<AddFoodResponse>), ApiError> {
    let resp = state
        .service()
        .add_food(&req.name, req.calories, req.protein, req.carbs, req.fat)
        .context("failed to save food")?;
    Ok((StatusCode::CREATED, Json(resp)))
}

async fn list_foods(State(state): State<AppState>) -> Result<Json<Vec<Food>>, ApiError> {
    let foods = state.service().list_foods().context("database error")?;
    Ok(Json(foods))
}

async fn log_food(
    State(state): State<AppState>,
    Json(req): Json<LogFoodRequest>,
) -> Result<(StatusCode, Json<LogFoodResponse>), ApiError> {
    let date = match req.date.as_deref() {
        Some(d) => parse_date_param(d)?,
        None => today(),
    };

    let resp = state
        .service()
        .log_food_on(&req.name, req.quantity, req.meal.as_deref(), date)
        .context("failed to log food")?;

    let status = if resp.is_ok() {
        StatusCode::CREATED
    } else {
        StatusCode::NOT_FOUND
    };
    Ok((status, Json(resp)))
}

async fn get_meals_today(State(state): State<AppState>) -> Result<Json<MealsForDate>, ApiError> {
    let meals = state.service().get_meals(None).context("database error")?;
    Ok(Json(meals))
}

async fn get_meals(
    State(state): State<AppState>,
    Path(date_str): Path<String>,
) -> Result<Json<MealsForDate>, ApiError> {
    let date = parse_date_param(&date_str)?;
    let meals = state.service().meals_on(date).context("database error")?;
    Ok(Json(meals))
}

async fn get_goal(State(state): State<AppState>) -> Result<Json<Goal>, ApiError> {
    let goal = state.service().get_goal().context("database error")?;
    Ok(Json(goal))
}

async fn set_goal(
    State(state): State<AppState>,
    Json(req): Json<SetGoalRequest>,
) -> Result<Json<SetGoalResponse>, ApiError> {
    let resp = state
        .service()
        .set_daily_calorie_goal(req.calories)
        .context("failed to set goal")?;
    Ok(Json(resp))
}

async fn today_summary(State(state): State<AppState>) -> Result<Json<DailySummary>, ApiError> {
    let summary = state.service().today_summary().context("database error")?;
    Ok(Json(summary))
}

async fn get_summary(
    State(state): State<AppState>,
    Path(date_str): Path<String>,
) -> Result<Json<DailySummary>, ApiError> {
    let date = parse_date_param(&date_str)?;
    let summary = state.service().summary_on(date).context("database error")?;
    Ok(Json(summary))
}

fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/foods", get(list_foods).post(add_food))
        .route("/api/logs", axum::routing::post(log_food))
        .route("/api/meals", get(get_meals_today))
        .route("/api/meals/{date}", get(get_meals))
        .route("/api/goal", get(get_goal).put(set_goal))
        .route("/api/summary/today", get(today_summary))
        .route("/api/summary/{date}", get(get_summary))
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT))
        .layer(middleware::from_fn(security_headers))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// --- Server startup ---

pub async fn start_server(service: NutritionService, port: u16, bind: &str) -> anyhow::Result<()> {
    let db_path = service.db_path().to_string();
    let state = AppState {
        service: Arc::new(Mutex::new(service)),
    };
    let app = build_router(state);

    if bind != "127.0.0.1" && bind != "localhost" {
        warn!(%bind, "listening beyond localhost; the API has no authentication");
    }

    let listener = tokio::net::TcpListener::bind(format!("{bind}:{port}"))
        .await
        .with_context(|| format!("failed to bind {bind}:{port}"))?;
    info!(%db_path, "listening on http://{bind}:{port}");
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn test_app() -> Router {
        build_router(AppState {
            service: Arc::new(Mutex::new(NutritionService::new_in_memory().unwrap())),
        })
    }

    async fn send(
        app: &Router,
        request: axum::http::Request<Body>,
    ) -> (StatusCode, serde_json::Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json = if body.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&body).unwrap()
        };
        (status, json)
    }

    fn get(uri: &str) -> axum::http::Request<Body> {
        axum::http::Request::get(uri).body(Body::empty()).unwrap()
    }

    fn json_request(
        method: &str,
        uri: &str,
        body: &serde_json::Value,
    ) -> axum::http::Request<Body> {
        axum::http::Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn add_oats(app: &Router) {
        let (status, _) = send(
            app,
            json_request(
                "POST",
                "/api/foods",
                &serde_json::json!({
                    "name": "Oats", "calories": 150, "protein": 5.0, "carbs": 27.0, "fat": 3.0
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    #[tokio::test]
    async fn add_food_returns_stored_food() {
        let app = test_app();
        let (status, json) = send(
            &app,
            json_request(
                "POST",
                "/api/foods",
                &serde_json::json!({
                    "name": "Oats", "calories": 150, "protein": 5.0, "carbs": 27.0, "fat": 3.0
                }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json["status"], "ok");
        assert_eq!(json["food"]["name"], "Oats");
        assert_eq!(json["food"]["calories"], 150);
        assert_eq!(json["db_path"], ":memory:");

        let (status, json) = send(&app, get("/api/foods")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn log_unknown_food_returns_404_error_result() {
        let app = test_app();
        let (status, json) = send(
            &app,
            json_request(
                "POST",
                "/api/logs",
                &serde_json::json!({ "name": "Ghost", "quantity": 1.0 }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["status"], "error");
        assert_eq!(json["message"], "Food not found");
    }

    #[tokio::test]
    async fn log_then_get_meals_for_date() {
        let app = test_app();
        add_oats(&app).await;

        let (status, json) = send(
            &app,
            json_request(
                "POST",
                "/api/logs",
                &serde_json::json!({ "name": "Oats", "quantity": 2.0, "meal": "breakfast", "date": "2024-01-01" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json["status"], "ok");
        assert_eq!(json["meal"], "breakfast");
        assert_eq!(json["log_date"], "2024-01-01");

        let (status, json) = send(&app, get("/api/meals/2024-01-01")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["date"], "2024-01-01");
        let breakfast = json["meals"]["breakfast"].as_array().unwrap();
        assert_eq!(breakfast.len(), 1);
        assert_eq!(breakfast[0]["food"], "Oats");
        assert_eq!(breakfast[0]["calories_per_serving"], 150);
        assert_eq!(breakfast[0]["calories_total"], 300.0);

        let (_, json) = send(&app, get("/api/meals/2024-01-02")).await;
        assert!(json["meals"].as_object().unwrap().is_empty());
    }

    #[tokio::test]
    async fn log_without_meal_lands_in_unspecified_today() {
        let app = test_app();
        add_oats(&app).await;

        send(
            &app,
            json_request(
                "POST",
                "/api/logs",
                &serde_json::json!({ "name": "Oats", "quantity": 1.0 }),
            ),
        )
        .await;

        let (status, json) = send(&app, get("/api/meals")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["meals"]["unspecified"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn invalid_dates_return_400() {
        let app = test_app();
        let (status, json) = send(&app, get("/api/meals/01-02-2024")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].as_str().unwrap().contains("Invalid date"));

        let (status, _) = send(&app, get("/api/summary/not-a-date")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(
            &app,
            json_request(
                "POST",
                "/api/logs",
                &serde_json::json!({ "name": "Oats", "quantity": 1.0, "date": "soon" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn goal_set_and_summary() {
        let app = test_app();

        let (_, json) = send(&app, get("/api/goal")).await;
        assert_eq!(json["daily_calories"], 2000);

        let (status, json) = send(
            &app,
            json_request("PUT", "/api/goal", &serde_json::json!({ "calories": 1500 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "ok");
        assert_eq!(json["daily_calories"], 1500);

        let (status, json) = send(&app, get("/api/summary/today")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["goal"], 1500);
        assert_eq!(json["totals"]["calories"], 0.0);
        assert_eq!(json["remaining_calories"], 1500.0);
    }

    #[tokio::test]
    async fn summary_for_date_totals() {
        let app = test_app();
        add_oats(&app).await;
        send(
            &app,
            json_request(
                "POST",
                "/api/logs",
                &serde_json::json!({ "name": "Oats", "quantity": 1.5, "meal": "lunch", "date": "2024-01-01" }),
            ),
        )
        .await;

        let (status, json) = send(&app, get("/api/summary/2024-01-01")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["totals"]["calories"], 225.0);
        assert_eq!(json["totals"]["protein"], 7.5);
        assert_eq!(json["remaining_calories"], 1775.0);
    }

    #[tokio::test]
    async fn security_headers_present() {
        let app = test_app();
        let response = app.oneshot(get("/api/goal")).await.unwrap();

        assert_eq!(
            response.headers().get("x-content-type-options").unwrap(),
            "nosniff"
        );
        assert_eq!(response.headers().get("x-frame-options").unwrap(), "DENY");
        assert_eq!(
            response.headers().get("content-security-policy").unwrap(),
            "default-src 'none'"
        );
    }

    #[tokio::test]
    async fn body_size_limit_rejects_oversized() {
        let app = test_app();

        let big_body = vec![0u8; BODY_LIMIT + 1];
        let response = app
            .oneshot(
                axum::http::Request::post("/api/foods")
                    .header("content-type", "application/json")
                    .body(Body::from(big_body))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn internal_error_does_not_leak_details() {
        let error =
            ApiError::Internal(anyhow::anyhow!("secret database path /data/nutrition.db"));
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "Internal server error");
        assert!(!json["error"].as_str().unwrap().contains("secret"));
    }
}

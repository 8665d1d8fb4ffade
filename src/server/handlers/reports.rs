//! Public reporting handlers for the admin dashboard charts

use axum::Json;
use axum::extract::State;
use serde_json::{Value, json};

use crate::core::error::ApiResult;
use crate::server::AppState;

pub async fn today_sales(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let total = state.reporting.today_sales().await?;
    Ok(Json(json!({
        "message": "Today's sales fetched successfully",
        "total_sales": total,
    })))
}

pub async fn today_orders(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let total = state.reporting.today_orders().await?;
    Ok(Json(json!({
        "message": "Today's total orders fetched successfully",
        "total_orders": total,
    })))
}

pub async fn weekly_sales(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let report = state.reporting.weekly_sales().await?;
    Ok(Json(json!({
        "message": "Weekly sales data fetched successfully",
        "current_day": report.current_day,
        "data": report.data,
    })))
}

pub async fn monthly_sales(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let report = state.reporting.monthly_sales().await?;
    Ok(Json(json!({
        "message": format!("Sales data for {} fetched successfully", report.month),
        "data": report,
    })))
}

pub async fn yearly_sales(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let report = state.reporting.yearly_sales().await?;
    Ok(Json(json!({
        "message": "Yearly sales data fetched successfully",
        "year": report.year,
        "current_month": report.current_month,
        "data": report.data,
    })))
}

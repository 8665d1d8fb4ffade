//! Checkout, order history, the admin order table, status updates and
//! invoices

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::core::error::{ApiError, ApiResult};
use crate::server::AppState;
use crate::server::extractors::{AdminUser, ApiJson, AuthUser};
use crate::services::checkout::{CheckoutPayment, PlacedOrder, SubmittedLine};

#[derive(Debug, Deserialize)]
pub struct CheckoutBody {
    pub order: Vec<SubmittedLineBody>,
    #[serde(rename = "paymentDetails", default)]
    pub payment_details: Option<PaymentDetailsBody>,
}

#[derive(Debug, Deserialize)]
pub struct SubmittedLineBody {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub price: f64,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDetailsBody {
    pub card_number: Option<String>,
    pub expiry_date: Option<String>,
    pub cvc: Option<String>,
    pub card_name: Option<String>,
    pub bkash_phone_number: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdateBody {
    #[serde(rename = "placeOrderTimestamp")]
    pub place_order_timestamp: i64,
    #[serde(rename = "newStatus")]
    pub new_status: String,
}

fn submitted_lines(body: &CheckoutBody) -> Vec<SubmittedLine> {
    body.order
        .iter()
        .map(|line| SubmittedLine {
            book_id: line.id,
            price: line.price,
        })
        .collect()
}

fn placed_order_json(placed: &PlacedOrder, message: &str, with_total: bool) -> Value {
    let mut body = json!({
        "message": message,
        "group_id": placed.group.id,
        "orders": placed.lines,
    });
    if with_total {
        body["total_amount"] = json!(placed.group.total);
    }
    body
}

pub async fn place_order(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(body): ApiJson<CheckoutBody>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let lines = submitted_lines(&body);
    let placed = state
        .checkout
        .checkout(auth.user_id, &lines, CheckoutPayment::Cod)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(placed_order_json(&placed, "Order placed successfully", false)),
    ))
}

pub async fn card_payment(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(body): ApiJson<CheckoutBody>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let lines = submitted_lines(&body);
    let details = body.payment_details.unwrap_or_default();
    let payment = CheckoutPayment::Card {
        card_number: details.card_number,
        expiry_date: details.expiry_date,
        cvc: details.cvc,
        card_name: details.card_name,
    };

    let placed = state.checkout.checkout(auth.user_id, &lines, payment).await?;
    Ok((
        StatusCode::CREATED,
        Json(placed_order_json(&placed, "Order placed successfully", true)),
    ))
}

pub async fn bkash_payment(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(body): ApiJson<CheckoutBody>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let lines = submitted_lines(&body);
    let details = body.payment_details.unwrap_or_default();
    let payment = CheckoutPayment::Bkash {
        phone_number: details.bkash_phone_number,
    };

    let placed = state.checkout.checkout(auth.user_id, &lines, payment).await?;
    Ok((
        StatusCode::CREATED,
        Json(placed_order_json(
            &placed,
            "Order placed successfully with bKash payment",
            true,
        )),
    ))
}

pub async fn order_history(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<Value>> {
    let orders = state.reporting.order_history(&auth.user_id).await?;
    Ok(Json(json!({ "orders": orders })))
}

pub async fn all_orders(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> ApiResult<Json<Value>> {
    let rows = state.reporting.all_orders().await?;
    Ok(Json(json!({
        "message": "Orders fetched successfully",
        "data": rows,
    })))
}

pub async fn update_order_status(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiJson(body): ApiJson<StatusUpdateBody>,
) -> ApiResult<Json<Value>> {
    let placed_at = millis_to_datetime(body.place_order_timestamp)?;
    let updated = state
        .status
        .update_status(placed_at, &body.new_status)
        .await?;

    Ok(Json(json!({
        "message": "Order statuses updated successfully",
        "updated_count": updated,
    })))
}

pub async fn invoice(State(state): State<AppState>, auth: AuthUser) -> ApiResult<Json<Value>> {
    let invoice = state.reporting.invoice_latest(&auth.user_id).await?;
    Ok(Json(json!(invoice)))
}

pub async fn invoice_by_timestamp(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(timestamp): Path<i64>,
) -> ApiResult<Json<Value>> {
    let at = millis_to_datetime(timestamp)?;
    let invoice = state.reporting.invoice_at(&auth.user_id, at).await?;
    Ok(Json(json!(invoice)))
}

fn millis_to_datetime(millis: i64) -> ApiResult<DateTime<Utc>> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or_else(|| ApiError::field("placeOrderTimestamp", "not a valid unix timestamp"))
}

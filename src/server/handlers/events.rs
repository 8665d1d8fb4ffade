//! Event handlers
//!
//! A virtual event carries a URL and no location; an in-person event the
//! reverse. Both rules are enforced on create and update.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::{NaiveDate, NaiveTime, Utc};
use regex::Regex;
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::OnceLock;
use uuid::Uuid;

use crate::core::error::{ApiError, ApiResult, NotFoundError};
use crate::domain::event::Event;
use crate::server::AppState;
use crate::server::extractors::{AdminUser, ApiJson};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventBody {
    pub name: String,
    pub event_date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
    #[serde(default)]
    pub is_virtual: bool,
    pub description: String,
    pub event_url: Option<String>,
    pub location: Option<String>,
    #[serde(default)]
    pub image_url: String,
}

fn is_url(value: &str) -> bool {
    static URL: OnceLock<Regex> = OnceLock::new();
    let re = URL.get_or_init(|| Regex::new(r#"^(ftp|http|https)://[^ "]+$"#).expect("static regex"));
    re.is_match(value)
}

fn validate_body(body: &EventBody) -> ApiResult<()> {
    for (field, value) in [
        ("name", &body.name),
        ("description", &body.description),
    ] {
        if value.trim().is_empty() {
            return Err(ApiError::field(field, "is required"));
        }
    }
    for (field, value) in [("startTime", &body.start_time), ("endTime", &body.end_time)] {
        if NaiveTime::parse_from_str(value, "%H:%M").is_err() {
            return Err(ApiError::field(field, "must be a HH:MM wall-clock time"));
        }
    }

    if body.is_virtual {
        let url = body
            .event_url
            .as_deref()
            .ok_or_else(|| ApiError::field("eventUrl", "is required for virtual events"))?;
        if !is_url(url) {
            return Err(ApiError::field("eventUrl", "is not a valid URL"));
        }
        if body.location.as_deref().is_some_and(|l| !l.is_empty()) {
            return Err(ApiError::field(
                "location",
                "must not be provided for virtual events",
            ));
        }
    } else {
        if body
            .location
            .as_deref()
            .is_none_or(|l| l.trim().is_empty())
        {
            return Err(ApiError::field(
                "location",
                "is required for in-person events",
            ));
        }
        if body.event_url.as_deref().is_some_and(|u| !u.is_empty()) {
            return Err(ApiError::field(
                "eventUrl",
                "must not be provided for in-person events",
            ));
        }
    }
    Ok(())
}

pub async fn add_event(
    State(state): State<AppState>,
    admin: AdminUser,
    ApiJson(body): ApiJson<EventBody>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    validate_body(&body)?;

    let now = Utc::now();
    let event = Event {
        id: Uuid::new_v4(),
        name: body.name,
        event_date: body.event_date,
        start_time: body.start_time,
        end_time: body.end_time,
        is_virtual: body.is_virtual,
        description: body.description,
        event_url: if body.is_virtual { body.event_url } else { None },
        location: if body.is_virtual { None } else { body.location },
        image_url: body.image_url,
        created_by: admin.user_id,
        created_at: now,
        updated_at: now,
    };
    let event = state.events.insert(event).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Event added successfully", "event": event })),
    ))
}

pub async fn update_event(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
    ApiJson(body): ApiJson<EventBody>,
) -> ApiResult<Json<Value>> {
    validate_body(&body)?;

    let mut event = state
        .events
        .get(&id)
        .await?
        .ok_or_else(|| NotFoundError::entity("event", id))?;

    event.name = body.name;
    event.event_date = body.event_date;
    event.start_time = body.start_time;
    event.end_time = body.end_time;
    event.is_virtual = body.is_virtual;
    event.description = body.description;
    event.event_url = if body.is_virtual { body.event_url } else { None };
    event.location = if body.is_virtual { None } else { body.location };
    if !body.image_url.is_empty() {
        event.image_url = body.image_url;
    }
    event.touch();

    let event = state.events.update(&id, event).await?;
    Ok(Json(json!({
        "message": "Event updated successfully",
        "event": event,
    })))
}

pub async fn delete_event(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    state
        .events
        .get(&id)
        .await?
        .ok_or_else(|| NotFoundError::entity("event", id))?;

    state.events.delete(&id).await?;
    Ok(Json(json!({ "message": "Event deleted successfully" })))
}

pub async fn all_events(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let events = state.events.list().await?;
    Ok(Json(json!({ "status": "success", "data": events })))
}

pub async fn event_details(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    let event = state
        .events
        .get(&id)
        .await?
        .ok_or_else(|| NotFoundError::entity("event", id))?;
    Ok(Json(json!({ "status": "success", "data": event })))
}

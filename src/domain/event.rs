//! Bookstore events (readings, signings, launches)
//!
//! An event is either virtual (carries a URL, no location) or in-person
//! (carries a location, no URL). Times are kept the way the storefront
//! submits them: a calendar date plus "HH:MM" wall-clock strings.

use chrono::{DateTime, Local, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub name: String,
    pub event_date: NaiveDate,
    /// Wall-clock "HH:MM"
    pub start_time: String,
    /// Wall-clock "HH:MM"
    pub end_time: String,
    pub is_virtual: bool,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default)]
    pub image_url: String,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// The event's end instant in server-local time, or `None` when the
    /// stored end_time string does not parse.
    pub fn end_instant(&self) -> Option<DateTime<Utc>> {
        let time = NaiveTime::parse_from_str(&self.end_time, "%H:%M").ok()?;
        let naive = self.event_date.and_time(time);
        Local
            .from_local_datetime(&naive)
            .earliest()
            .map(|local| local.with_timezone(&Utc))
    }

    /// True once the event's end instant has passed. Unparseable times never
    /// expire; the sweep leaves them alone.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.end_instant().is_some_and(|end| end < now)
    }
}

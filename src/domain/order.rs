//! Order aggregate: groups, lines, statuses and payment payloads
//!
//! One checkout produces one [`OrderGroup`] (the purchase header: who, when,
//! how paid, total) and one [`OrderLine`] per purchased book. Grouping is by
//! the generated group id; the shared placement timestamp is kept on both
//! records because every time-window report reads the lines collection alone.

use chrono::{DateTime, Utc};
use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use uuid::Uuid;

/// Fixed prefix of every order number.
pub const ORDER_NUMBER_PREFIX: &str = "wspr";

/// Delivery status of a single order line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    Pending,
    OutForDelivery,
    Completed,
    Cancelled,
}

impl OrderStatus {
    /// Legal transition table. `Pending → {OutForDelivery, Cancelled}`,
    /// `OutForDelivery → {Completed, Cancelled}`; `Completed` and
    /// `Cancelled` are terminal.
    pub fn can_transition_to(self, target: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, target),
            (Pending, OutForDelivery)
                | (Pending, Cancelled)
                | (OutForDelivery, Completed)
                | (OutForDelivery, Cancelled)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }

    /// Statuses counted as live orders in the daily/weekly/monthly reports.
    pub const ACTIVE: [OrderStatus; 3] = [
        OrderStatus::Pending,
        OrderStatus::OutForDelivery,
        OrderStatus::Completed,
    ];
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::OutForDelivery => "OutForDelivery",
            OrderStatus::Completed => "Completed",
            OrderStatus::Cancelled => "Cancelled",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for OrderStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(OrderStatus::Pending),
            "OutForDelivery" => Ok(OrderStatus::OutForDelivery),
            "Completed" => Ok(OrderStatus::Completed),
            "Cancelled" => Ok(OrderStatus::Cancelled),
            _ => Err(()),
        }
    }
}

/// How a checkout was paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum PaymentMethod {
    #[default]
    #[serde(rename = "COD")]
    Cod,
    Card,
    #[serde(rename = "bKash")]
    Bkash,
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PaymentMethod::Cod => "COD",
            PaymentMethod::Card => "Card",
            PaymentMethod::Bkash => "bKash",
        };
        write!(f, "{}", s)
    }
}

/// Method-specific payment payload. Absent for COD. Card data is stored
/// as-is; there is no gateway behind this.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum PaymentDetails {
    Card {
        card_number: String,
        expiry_date: String,
        cvc: String,
        card_name: String,
    },
    Bkash {
        phone_number: String,
    },
}

impl PaymentDetails {
    pub fn method(&self) -> PaymentMethod {
        match self {
            PaymentDetails::Card { .. } => PaymentMethod::Card,
            PaymentDetails::Bkash { .. } => PaymentMethod::Bkash,
        }
    }
}

/// One purchase header, created by a single checkout call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderGroup {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub placed_at: DateTime<Utc>,
    pub payment_method: PaymentMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment: Option<PaymentDetails>,
    pub line_ids: Vec<Uuid>,
    pub total: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderGroup {
    pub fn new(
        user_id: Uuid,
        placed_at: DateTime<Utc>,
        payment_method: PaymentMethod,
        payment: Option<PaymentDetails>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            placed_at,
            payment_method,
            payment,
            line_ids: Vec::new(),
            total: 0.0,
            created_at: now,
            updated_at: now,
        }
    }
}

/// One order line, one per purchased book per checkout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLine {
    pub id: Uuid,
    pub order_number: String,
    pub group_id: Uuid,
    pub user_id: Uuid,
    pub book_id: Uuid,
    pub price: f64,
    pub status: OrderStatus,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub placed_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderLine {
    pub fn new(
        group_id: Uuid,
        user_id: Uuid,
        book_id: Uuid,
        price: f64,
        placed_at: DateTime<Utc>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            order_number: generate_order_number(),
            group_id,
            user_id,
            book_id,
            price,
            status: OrderStatus::Pending,
            placed_at,
            created_at: now,
            updated_at: now,
        }
    }

    /// Draw a fresh order number after a uniqueness collision at the store.
    pub fn regenerate_order_number(&mut self) {
        self.order_number = generate_order_number();
    }
}

/// Generate an order number: fixed prefix, the low-order six digits of the
/// current unix-millis clock, and a random suffix in 0..10000. Not
/// collision-free; the store's unique index is the authority and callers
/// retry with a regenerated number.
pub fn generate_order_number() -> String {
    let tail = Utc::now().timestamp_millis().rem_euclid(1_000_000);
    let suffix: u32 = rand::thread_rng().gen_range(0..10_000);
    format!("{}{:06}{}", ORDER_NUMBER_PREFIX, tail, suffix)
}

/// Normalize a bKash phone number to the canonical `+880 1XXXXXXXXX` form.
///
/// Accepts the 11-digit national form (`01XXXXXXXXX`) or an already
/// `+880`-prefixed form, with any punctuation. Returns `None` when the
/// digits do not reduce to the national format.
pub fn normalize_bkash_phone(raw: &str) -> Option<String> {
    static LOCAL_PART: OnceLock<Regex> = OnceLock::new();
    let re = LOCAL_PART.get_or_init(|| Regex::new(r"^1\d{9}$").expect("static regex"));

    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    let rest = digits
        .strip_prefix("880")
        .or_else(|| digits.strip_prefix('0'))?;

    if re.is_match(rest) {
        Some(format!("+880 {}", rest))
    } else {
        None
    }
}

//! Read-side reporting over the order ledger
//!
//! Best-seller detection, the daily/weekly/monthly/yearly dashboards, the
//! admin all-orders join and the invoice views. Time windows are computed
//! against the server-local calendar; the stores are queried in UTC.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{
    DateTime, Datelike, Duration, Local, NaiveDateTime, TimeZone, Utc,
};
use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use crate::core::error::{ApiResult, NotFoundError};
use crate::domain::book::Book;
use crate::domain::order::{OrderGroup, OrderStatus, PaymentMethod};
use crate::domain::user::PublicUser;
use crate::storage::{BookStore, OrderStore, UserStore};

/// Trailing window for best-seller detection.
const BEST_SELLER_WINDOW_DAYS: i64 = 30;
/// A book qualifies when its window count is strictly greater than this.
const BEST_SELLER_THRESHOLD: u64 = 5;
/// Window, in hours, for matching an invoice by an explicit timestamp.
const INVOICE_MATCH_WINDOW_HOURS: i64 = 1;

const DAY_NAMES: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// One row of the admin order table: a line joined with its user and book.
#[derive(Debug, Clone, Serialize)]
pub struct AdminOrderRow {
    pub line_id: Uuid,
    pub order_number: String,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub placed_at: DateTime<Utc>,
    pub username: String,
    pub email: String,
    pub address: String,
    pub title: String,
    pub author: String,
    pub price: f64,
}

/// One row of a user's order history: a line with its book details.
#[derive(Debug, Clone, Serialize)]
pub struct OrderHistoryRow {
    pub line_id: Uuid,
    pub order_number: String,
    pub status: OrderStatus,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub placed_at: DateTime<Utc>,
    pub price: f64,
    pub title: String,
    pub author: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DayOrders {
    pub day: String,
    pub total_orders: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct WeeklySales {
    pub current_day: String,
    pub data: Vec<DayOrders>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DayOfMonthOrders {
    pub day: u32,
    pub total_orders: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MonthlySales {
    pub month: String,
    pub data: Vec<DayOfMonthOrders>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MonthOrders {
    pub month: u32,
    pub total_orders: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct YearlySales {
    pub year: i32,
    pub current_month: String,
    pub data: Vec<MonthOrders>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InvoiceLine {
    pub order_number: String,
    pub title: String,
    pub author: String,
    pub price: f64,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Invoice {
    pub user: PublicUser,
    pub payment_method: PaymentMethod,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub placed_at: DateTime<Utc>,
    pub total: f64,
    pub orders: Vec<InvoiceLine>,
}

#[derive(Clone)]
pub struct ReportingService {
    orders: Arc<dyn OrderStore>,
    books: Arc<dyn BookStore>,
    users: Arc<dyn UserStore>,
}

impl ReportingService {
    pub fn new(
        orders: Arc<dyn OrderStore>,
        books: Arc<dyn BookStore>,
        users: Arc<dyn UserStore>,
    ) -> Self {
        Self {
            orders,
            books,
            users,
        }
    }

    /// Books whose trailing-30-day order count (any status) is strictly
    /// greater than the threshold.
    pub async fn best_sellers(&self) -> ApiResult<Vec<Book>> {
        let cutoff = Utc::now() - Duration::days(BEST_SELLER_WINDOW_DAYS);
        let counts = self.orders.count_lines_per_book_since(cutoff).await?;

        let ids: Vec<Uuid> = counts
            .into_iter()
            .filter(|c| c.count > BEST_SELLER_THRESHOLD)
            .map(|c| c.book_id)
            .collect();

        Ok(self.books.get_many(&ids).await?)
    }

    /// Every order line joined with its user and book, newest first. Lines
    /// whose user or book has vanished are dropped from the view.
    pub async fn all_orders(&self) -> ApiResult<Vec<AdminOrderRow>> {
        let lines = self.orders.all_lines().await?;
        if lines.is_empty() {
            return Err(NotFoundError::no_match("orders"));
        }

        let book_ids: Vec<Uuid> = dedup(lines.iter().map(|l| l.book_id));
        let books: HashMap<Uuid, Book> = self
            .books
            .get_many(&book_ids)
            .await?
            .into_iter()
            .map(|b| (b.id, b))
            .collect();

        let mut users = HashMap::new();
        for user_id in dedup(lines.iter().map(|l| l.user_id)) {
            if let Some(user) = self.users.get(&user_id).await? {
                users.insert(user_id, user);
            }
        }

        let mut methods: HashMap<Uuid, PaymentMethod> = HashMap::new();
        for group_id in dedup(lines.iter().map(|l| l.group_id)) {
            if let Some(group) = self.orders.get_group(&group_id).await? {
                methods.insert(group_id, group.payment_method);
            }
        }

        let mut rows = Vec::with_capacity(lines.len());
        for line in lines {
            let (Some(user), Some(book)) = (users.get(&line.user_id), books.get(&line.book_id))
            else {
                warn!(line_id = %line.id, "order line references a missing user or book");
                continue;
            };
            rows.push(AdminOrderRow {
                line_id: line.id,
                order_number: line.order_number,
                status: line.status,
                payment_method: methods
                    .get(&line.group_id)
                    .copied()
                    .unwrap_or(PaymentMethod::Cod),
                placed_at: line.placed_at,
                username: user.username.clone(),
                email: user.email.clone(),
                address: user.address.clone(),
                title: book.title.clone(),
                author: book.author.clone(),
                price: book.price,
            });
        }
        Ok(rows)
    }

    /// One user's order lines with book details, newest first.
    pub async fn order_history(&self, user_id: &Uuid) -> ApiResult<Vec<OrderHistoryRow>> {
        let lines = self.orders.lines_for_user(user_id).await?;
        if lines.is_empty() {
            return Err(NotFoundError::no_match("orders for this user"));
        }

        let book_ids: Vec<Uuid> = dedup(lines.iter().map(|l| l.book_id));
        let books: HashMap<Uuid, Book> = self
            .books
            .get_many(&book_ids)
            .await?
            .into_iter()
            .map(|b| (b.id, b))
            .collect();

        Ok(lines
            .into_iter()
            .filter_map(|line| {
                let book = books.get(&line.book_id)?;
                Some(OrderHistoryRow {
                    line_id: line.id,
                    order_number: line.order_number,
                    status: line.status,
                    placed_at: line.placed_at,
                    price: line.price,
                    title: book.title.clone(),
                    author: book.author.clone(),
                    description: book.description.clone(),
                })
            })
            .collect())
    }

    /// Revenue from Completed lines placed today (server-local day).
    pub async fn today_sales(&self) -> ApiResult<f64> {
        let (start, end) = local_day_bounds();
        self.orders
            .sum_completed_prices(start, end)
            .await?
            .ok_or_else(|| NotFoundError::no_match("sales for today"))
    }

    /// Count of non-Cancelled lines placed today (server-local day).
    pub async fn today_orders(&self) -> ApiResult<u64> {
        let (start, end) = local_day_bounds();
        let lines = self
            .orders
            .lines_placed_between(start, end, Some(&OrderStatus::ACTIVE))
            .await?;
        if lines.is_empty() {
            return Err(NotFoundError::no_match("orders for today"));
        }
        Ok(lines.len() as u64)
    }

    /// Non-Cancelled order counts per day of the current week, Sunday-first,
    /// up to and including today.
    pub async fn weekly_sales(&self) -> ApiResult<WeeklySales> {
        let today = Local::now();
        let weekday = today.weekday().num_days_from_sunday() as usize;
        let week_start = today.date_naive() - Duration::days(weekday as i64);

        let start = local_naive_to_utc(start_of_day(week_start));
        let (_, end) = local_day_bounds();

        let lines = self
            .orders
            .lines_placed_between(start, end, Some(&OrderStatus::ACTIVE))
            .await?;

        let mut buckets = [0u64; 7];
        for line in &lines {
            let idx = line
                .placed_at
                .with_timezone(&Local)
                .weekday()
                .num_days_from_sunday() as usize;
            buckets[idx] += 1;
        }

        let data = (0..=weekday)
            .map(|i| DayOrders {
                day: DAY_NAMES[i].to_string(),
                total_orders: buckets[i],
            })
            .collect();

        Ok(WeeklySales {
            current_day: DAY_NAMES[weekday].to_string(),
            data,
        })
    }

    /// Non-Cancelled order counts per day of the current month, up to and
    /// including today.
    pub async fn monthly_sales(&self) -> ApiResult<MonthlySales> {
        let today = Local::now();
        let month_start = today
            .date_naive()
            .with_day(1)
            .expect("day 1 exists in every month");

        let start = local_naive_to_utc(start_of_day(month_start));
        let (_, end) = local_day_bounds();

        let lines = self
            .orders
            .lines_placed_between(start, end, Some(&OrderStatus::ACTIVE))
            .await?;

        let mut buckets: HashMap<u32, u64> = HashMap::new();
        for line in &lines {
            let day = line.placed_at.with_timezone(&Local).day();
            *buckets.entry(day).or_default() += 1;
        }

        let data = (1..=today.day())
            .map(|day| DayOfMonthOrders {
                day,
                total_orders: buckets.get(&day).copied().unwrap_or(0),
            })
            .collect();

        Ok(MonthlySales {
            month: MONTH_NAMES[today.month0() as usize].to_string(),
            data,
        })
    }

    /// Non-Cancelled order counts per month of the current year; empty
    /// months are omitted.
    pub async fn yearly_sales(&self) -> ApiResult<YearlySales> {
        let today = Local::now();
        let year_start = today
            .date_naive()
            .with_month(1)
            .and_then(|d| d.with_day(1))
            .expect("january 1 exists in every year");

        let start = local_naive_to_utc(start_of_day(year_start));
        let (_, end) = local_day_bounds();

        let lines = self
            .orders
            .lines_placed_between(start, end, Some(&OrderStatus::ACTIVE))
            .await?;

        let mut buckets: HashMap<u32, u64> = HashMap::new();
        for line in &lines {
            let month = line.placed_at.with_timezone(&Local).month();
            *buckets.entry(month).or_default() += 1;
        }

        let data = (1..=12)
            .filter_map(|month| {
                let total_orders = buckets.get(&month).copied().unwrap_or(0);
                (total_orders > 0).then_some(MonthOrders {
                    month,
                    total_orders,
                })
            })
            .collect();

        Ok(YearlySales {
            year: today.year(),
            current_month: MONTH_NAMES[today.month0() as usize].to_string(),
            data,
        })
    }

    /// Invoice for the user's most recent checkout.
    pub async fn invoice_latest(&self, user_id: &Uuid) -> ApiResult<Invoice> {
        let group = self
            .orders
            .latest_group_for_user(user_id)
            .await?
            .ok_or_else(|| NotFoundError::no_match("orders"))?;
        self.build_invoice(user_id, group).await
    }

    /// Invoice for the checkout matched within one hour of the given
    /// timestamp, absorbing timezone and precision drift in client-echoed
    /// values.
    pub async fn invoice_at(&self, user_id: &Uuid, at: DateTime<Utc>) -> ApiResult<Invoice> {
        let group = self
            .orders
            .group_for_user_in_window(user_id, at, at + Duration::hours(INVOICE_MATCH_WINDOW_HOURS))
            .await?
            .ok_or_else(|| NotFoundError::no_match("orders for the given timestamp"))?;
        self.build_invoice(user_id, group).await
    }

    async fn build_invoice(&self, user_id: &Uuid, group: OrderGroup) -> ApiResult<Invoice> {
        let user = self
            .users
            .get(user_id)
            .await?
            .ok_or_else(|| NotFoundError::entity("user", *user_id))?;

        let lines = self.orders.lines_in_group(&group.id).await?;
        let book_ids: Vec<Uuid> = dedup(lines.iter().map(|l| l.book_id));
        let books: HashMap<Uuid, Book> = self
            .books
            .get_many(&book_ids)
            .await?
            .into_iter()
            .map(|b| (b.id, b))
            .collect();

        let orders = lines
            .into_iter()
            .filter_map(|line| {
                let book = books.get(&line.book_id)?;
                Some(InvoiceLine {
                    order_number: line.order_number,
                    title: book.title.clone(),
                    author: book.author.clone(),
                    price: line.price,
                    description: book.description.clone(),
                    created_at: line.created_at,
                })
            })
            .collect();

        Ok(Invoice {
            user: PublicUser::from(&user),
            payment_method: group.payment_method,
            placed_at: group.placed_at,
            total: group.total,
            orders,
        })
    }
}

fn dedup<I: Iterator<Item = Uuid>>(ids: I) -> Vec<Uuid> {
    let mut seen = std::collections::HashSet::new();
    ids.filter(|id| seen.insert(*id)).collect()
}

fn start_of_day(date: chrono::NaiveDate) -> NaiveDateTime {
    date.and_hms_opt(0, 0, 0).expect("midnight exists")
}

/// `[start-of-day, end-of-day]` of the current server-local day, in UTC.
fn local_day_bounds() -> (DateTime<Utc>, DateTime<Utc>) {
    let today = Local::now().date_naive();
    let start = start_of_day(today);
    let end = today
        .and_hms_milli_opt(23, 59, 59, 999)
        .expect("end of day exists");
    (local_naive_to_utc(start), local_naive_to_utc(end))
}

/// Interpret a naive wall-clock instant in the server's local zone. Falls
/// back to UTC for instants skipped by a DST jump.
fn local_naive_to_utc(naive: NaiveDateTime) -> DateTime<Utc> {
    match Local.from_local_datetime(&naive).earliest() {
        Some(local) => local.with_timezone(&Utc),
        None => Utc.from_utc_datetime(&naive),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_day_bounds_cover_now() {
        let (start, end) = local_day_bounds();
        let now = Utc::now();
        assert!(start <= now);
        assert!(now <= end);
        // A calendar day, give or take DST
        let span = end - start;
        assert!(span >= Duration::hours(22) && span <= Duration::hours(26));
    }

    #[test]
    fn test_dedup_preserves_first_occurrence() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let deduped = dedup(vec![a, b, a, b, a].into_iter());
        assert_eq!(deduped, vec![a, b]);
    }
}

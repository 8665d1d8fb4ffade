//! Reporting engine tests over the in-memory backend

mod common;

use bookstore::domain::order::{OrderLine, OrderStatus, PaymentMethod};
use bookstore::services::checkout::{CheckoutPayment, SubmittedLine};
use chrono::{Duration, Utc};
use common::{memory_state, seed_book, seed_user};
use uuid::Uuid;

/// Insert a raw order line with a chosen status and placement instant.
async fn seed_line(
    state: &bookstore::server::AppState,
    book_id: Uuid,
    price: f64,
    status: OrderStatus,
    placed_at: chrono::DateTime<Utc>,
) {
    let mut line = OrderLine::new(Uuid::new_v4(), Uuid::new_v4(), book_id, price, placed_at);
    line.status = status;
    state.orders.insert_line(line).await.unwrap();
}

#[tokio::test]
async fn today_sales_sums_only_completed_lines_placed_today() {
    let state = memory_state();
    let book = seed_book(&state, "The Silent Library", 100.0).await;
    let now = Utc::now();

    seed_line(&state, book.id, 100.0, OrderStatus::Completed, now).await;
    seed_line(&state, book.id, 250.0, OrderStatus::Completed, now).await;
    // Pending today: not revenue
    seed_line(&state, book.id, 40.0, OrderStatus::Pending, now).await;
    // Completed, but two days ago
    seed_line(
        &state,
        book.id,
        500.0,
        OrderStatus::Completed,
        now - Duration::days(2),
    )
    .await;

    let total = state.reporting.today_sales().await.unwrap();
    assert_eq!(total, 350.0);
}

#[tokio::test]
async fn today_sales_with_no_completed_lines_is_not_found() {
    let state = memory_state();
    let book = seed_book(&state, "The Silent Library", 100.0).await;
    seed_line(&state, book.id, 100.0, OrderStatus::Pending, Utc::now()).await;

    let err = state.reporting.today_sales().await.unwrap_err();
    assert_eq!(err.status_code(), axum::http::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn today_orders_excludes_cancelled() {
    let state = memory_state();
    let book = seed_book(&state, "The Silent Library", 100.0).await;
    let now = Utc::now();

    seed_line(&state, book.id, 100.0, OrderStatus::Pending, now).await;
    seed_line(&state, book.id, 100.0, OrderStatus::OutForDelivery, now).await;
    seed_line(&state, book.id, 100.0, OrderStatus::Completed, now).await;
    seed_line(&state, book.id, 100.0, OrderStatus::Cancelled, now).await;

    let total = state.reporting.today_orders().await.unwrap();
    assert_eq!(total, 3);
}

#[tokio::test]
async fn best_sellers_require_strictly_more_than_five_recent_orders() {
    let state = memory_state();
    let hot = seed_book(&state, "The Silent Library", 100.0).await;
    let warm = seed_book(&state, "Paper Harbour", 250.0).await;
    let stale = seed_book(&state, "Old News", 10.0).await;
    let now = Utc::now();

    // Six recent orders: qualifies
    for _ in 0..6 {
        seed_line(&state, hot.id, 100.0, OrderStatus::Pending, now).await;
    }
    // Exactly five: does not qualify (strictly greater)
    for _ in 0..5 {
        seed_line(&state, warm.id, 250.0, OrderStatus::Completed, now).await;
    }
    // Plenty of orders, but outside the trailing 30 days
    for _ in 0..8 {
        seed_line(
            &state,
            stale.id,
            10.0,
            OrderStatus::Completed,
            now - Duration::days(40),
        )
        .await;
    }

    let best = state.reporting.best_sellers().await.unwrap();
    assert_eq!(best.len(), 1);
    assert_eq!(best[0].id, hot.id);
}

#[tokio::test]
async fn best_sellers_count_every_status() {
    let state = memory_state();
    let book = seed_book(&state, "The Silent Library", 100.0).await;
    let now = Utc::now();

    for status in [
        OrderStatus::Pending,
        OrderStatus::OutForDelivery,
        OrderStatus::Completed,
        OrderStatus::Cancelled,
        OrderStatus::Pending,
        OrderStatus::Completed,
    ] {
        seed_line(&state, book.id, 100.0, status, now).await;
    }

    let best = state.reporting.best_sellers().await.unwrap();
    assert_eq!(best.len(), 1);
}

#[tokio::test]
async fn weekly_sales_buckets_today() {
    let state = memory_state();
    let book = seed_book(&state, "The Silent Library", 100.0).await;
    let now = Utc::now();

    seed_line(&state, book.id, 100.0, OrderStatus::Pending, now).await;
    seed_line(&state, book.id, 100.0, OrderStatus::Completed, now).await;
    seed_line(&state, book.id, 100.0, OrderStatus::Cancelled, now).await;

    let report = state.reporting.weekly_sales().await.unwrap();
    let today_bucket = report.data.last().unwrap();
    assert_eq!(today_bucket.day, report.current_day);
    assert_eq!(today_bucket.total_orders, 2);

    // No bucket reaches past today
    let weekday = chrono::Local::now()
        .format("%A")
        .to_string();
    assert_eq!(report.current_day, weekday);
}

#[tokio::test]
async fn monthly_sales_buckets_every_day_up_to_today() {
    let state = memory_state();
    let book = seed_book(&state, "The Silent Library", 100.0).await;

    seed_line(&state, book.id, 100.0, OrderStatus::Pending, Utc::now()).await;

    let report = state.reporting.monthly_sales().await.unwrap();
    let today = chrono::Local::now();
    assert_eq!(report.data.len() as u32, chrono::Datelike::day(&today));
    assert_eq!(report.data.last().unwrap().total_orders, 1);
}

#[tokio::test]
async fn yearly_sales_omit_empty_months() {
    let state = memory_state();
    let book = seed_book(&state, "The Silent Library", 100.0).await;

    seed_line(&state, book.id, 100.0, OrderStatus::Pending, Utc::now()).await;

    let report = state.reporting.yearly_sales().await.unwrap();
    assert!(!report.data.is_empty());
    assert!(report.data.iter().all(|m| m.total_orders > 0));

    let this_month = chrono::Datelike::month(&chrono::Local::now());
    assert!(report.data.iter().any(|m| m.month == this_month));
}

#[tokio::test]
async fn invoice_latest_returns_the_most_recent_group() {
    let state = memory_state();
    let (user_id, _) = seed_user(&state, "alice").await;
    let first = seed_book(&state, "The Silent Library", 100.0).await;
    let second = seed_book(&state, "Paper Harbour", 250.0).await;

    state
        .checkout
        .checkout(
            user_id,
            &[SubmittedLine {
                book_id: first.id,
                price: 100.0,
            }],
            CheckoutPayment::Cod,
        )
        .await
        .unwrap();

    tokio::time::sleep(std::time::Duration::from_millis(5)).await;

    state
        .checkout
        .checkout(
            user_id,
            &[SubmittedLine {
                book_id: second.id,
                price: 250.0,
            }],
            CheckoutPayment::Bkash {
                phone_number: Some("01812345678".into()),
            },
        )
        .await
        .unwrap();

    let invoice = state.reporting.invoice_latest(&user_id).await.unwrap();
    assert_eq!(invoice.user.username, "alice");
    assert_eq!(invoice.payment_method, PaymentMethod::Bkash);
    assert_eq!(invoice.total, 250.0);
    assert_eq!(invoice.orders.len(), 1);
    assert_eq!(invoice.orders[0].title, "Paper Harbour");
}

#[tokio::test]
async fn invoice_by_timestamp_matches_within_one_hour() {
    let state = memory_state();
    let (user_id, _) = seed_user(&state, "alice").await;
    let book = seed_book(&state, "The Silent Library", 100.0).await;

    let placed = state
        .checkout
        .checkout(
            user_id,
            &[SubmittedLine {
                book_id: book.id,
                price: 100.0,
            }],
            CheckoutPayment::Cod,
        )
        .await
        .unwrap();
    let at = placed.group.placed_at;

    // Exact instant and half an hour early both land in the window
    assert!(state.reporting.invoice_at(&user_id, at).await.is_ok());
    assert!(
        state
            .reporting
            .invoice_at(&user_id, at - Duration::minutes(30))
            .await
            .is_ok()
    );

    // Two hours late misses it
    let err = state
        .reporting
        .invoice_at(&user_id, at + Duration::hours(2))
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), axum::http::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invoice_for_user_without_orders_is_not_found() {
    let state = memory_state();
    let (user_id, _) = seed_user(&state, "alice").await;

    let err = state.reporting.invoice_latest(&user_id).await.unwrap_err();
    assert_eq!(err.status_code(), axum::http::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn all_orders_joins_user_and_book() {
    let state = memory_state();
    let (user_id, _) = seed_user(&state, "alice").await;
    let book = seed_book(&state, "The Silent Library", 100.0).await;

    state
        .checkout
        .checkout(
            user_id,
            &[SubmittedLine {
                book_id: book.id,
                price: 100.0,
            }],
            CheckoutPayment::Cod,
        )
        .await
        .unwrap();

    let rows = state.reporting.all_orders().await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].username, "alice");
    assert_eq!(rows[0].title, "The Silent Library");
    assert_eq!(rows[0].payment_method, PaymentMethod::Cod);
    assert_eq!(rows[0].status, OrderStatus::Pending);
}

#[tokio::test]
async fn order_history_lists_newest_first_with_book_details() {
    let state = memory_state();
    let (user_id, _) = seed_user(&state, "alice").await;
    let first = seed_book(&state, "The Silent Library", 100.0).await;
    let second = seed_book(&state, "Paper Harbour", 250.0).await;

    state
        .checkout
        .checkout(
            user_id,
            &[SubmittedLine {
                book_id: first.id,
                price: 100.0,
            }],
            CheckoutPayment::Cod,
        )
        .await
        .unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    state
        .checkout
        .checkout(
            user_id,
            &[SubmittedLine {
                book_id: second.id,
                price: 250.0,
            }],
            CheckoutPayment::Cod,
        )
        .await
        .unwrap();

    let history = state.reporting.order_history(&user_id).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].title, "Paper Harbour");
    assert_eq!(history[1].title, "The Silent Library");
}

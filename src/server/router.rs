//! Route table
//!
//! Every route sits under `/api/v1`. Auth is per-handler via the
//! [`AuthUser`](super::extractors::AuthUser) and
//! [`AdminUser`](super::extractors::AdminUser) extractors.

use axum::Router;
use axum::routing::{delete, get, post, put};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::AppState;
use super::handlers::{accounts, books, cart, events, favourites, orders, reports};

pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        // Accounts
        .route("/signup", post(accounts::signup))
        .route("/login", post(accounts::login))
        .route("/getuserinfo", get(accounts::get_user_info))
        .route("/updateuserinfo", put(accounts::update_user_info))
        .route("/updatepassword", put(accounts::update_password))
        .route("/getallusers", get(accounts::get_all_users))
        // Catalog
        .route("/addbook", post(books::add_book))
        .route("/updatebook/{id}", put(books::update_book))
        .route("/deletebook/{id}", delete(books::delete_book))
        .route("/getallbooks", get(books::get_all_books))
        .route("/getrecentbooks", get(books::get_recent_books))
        .route("/booksbygenre", get(books::books_by_genre))
        .route("/getbookdetails/{id}", get(books::get_book_details))
        .route("/markbestsellers", get(books::mark_best_sellers))
        // Cart
        .route("/addbooktocart", put(cart::add_book_to_cart))
        .route("/removebookfromcart", put(cart::remove_book_from_cart))
        .route("/getusercart", get(cart::get_user_cart))
        // Favourites
        .route("/addbooktofav", put(favourites::add_book_to_favourites))
        .route(
            "/removebookfromfav",
            put(favourites::remove_book_from_favourites),
        )
        .route("/favourites", get(favourites::get_favourites))
        // Checkout and orders
        .route("/placeorder", post(orders::place_order))
        .route("/cardpayment", post(orders::card_payment))
        .route("/bkashpayment", post(orders::bkash_payment))
        .route("/orderhistory", get(orders::order_history))
        .route("/allorders", get(orders::all_orders))
        .route("/orders/status", put(orders::update_order_status))
        .route("/invoice", get(orders::invoice))
        .route("/invoice/timestamp/{ts}", get(orders::invoice_by_timestamp))
        // Reporting
        .route("/todaysales", get(reports::today_sales))
        .route("/todayorders", get(reports::today_orders))
        .route("/weeklysales", get(reports::weekly_sales))
        .route("/monthlysales", get(reports::monthly_sales))
        .route("/yearlysales", get(reports::yearly_sales))
        // Events
        .route("/addevent", post(events::add_event))
        .route("/updateevent/{id}", put(events::update_event))
        .route("/deleteevent/{id}", delete(events::delete_event))
        .route("/allevents", get(events::all_events))
        .route("/eventdetails/{id}", get(events::event_details))
        .with_state(state);

    Router::new()
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

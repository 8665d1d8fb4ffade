//! HTTP server: shared state, extractors, router and handlers

pub mod extractors;
pub mod handlers;
pub mod router;

use std::sync::Arc;

use chrono::Duration;

use crate::services::{AccountsService, CheckoutService, ReportingService, StatusService};
use crate::storage::{BookStore, CartStore, EventStore, OrderStore, SessionStore, UserStore};

/// Shared application state: store handles plus the services built on them.
#[derive(Clone)]
pub struct AppState {
    pub books: Arc<dyn BookStore>,
    pub users: Arc<dyn UserStore>,
    pub carts: Arc<dyn CartStore>,
    pub orders: Arc<dyn OrderStore>,
    pub sessions: Arc<dyn SessionStore>,
    pub events: Arc<dyn EventStore>,
    pub checkout: CheckoutService,
    pub reporting: ReportingService,
    pub status: StatusService,
    pub accounts: AccountsService,
}

impl AppState {
    pub fn new(
        books: Arc<dyn BookStore>,
        users: Arc<dyn UserStore>,
        carts: Arc<dyn CartStore>,
        orders: Arc<dyn OrderStore>,
        sessions: Arc<dyn SessionStore>,
        events: Arc<dyn EventStore>,
        session_ttl: Duration,
    ) -> Self {
        let checkout = CheckoutService::new(
            books.clone(),
            users.clone(),
            carts.clone(),
            orders.clone(),
        );
        let reporting = ReportingService::new(orders.clone(), books.clone(), users.clone());
        let status = StatusService::new(orders.clone());
        let accounts = AccountsService::new(users.clone(), sessions.clone(), session_ttl);

        Self {
            books,
            users,
            carts,
            orders,
            sessions,
            events,
            checkout,
            reporting,
            status,
            accounts,
        }
    }
}

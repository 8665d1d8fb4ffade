//! Order status lifecycle
//!
//! Bulk status update for every line of one order group, keyed by the
//! placement timestamp. The legal-transition table is enforced here,
//! all-or-nothing: if any matched line cannot legally move to the target
//! status, nothing is mutated.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use crate::core::error::{ApiResult, NotFoundError, ValidationError};
use crate::domain::order::OrderStatus;
use crate::storage::OrderStore;

#[derive(Clone)]
pub struct StatusService {
    orders: Arc<dyn OrderStore>,
}

impl StatusService {
    pub fn new(orders: Arc<dyn OrderStore>) -> Self {
        Self { orders }
    }

    /// Move every line placed at `placed_at` to `new_status`. Returns how
    /// many lines were updated.
    pub async fn update_status(
        &self,
        placed_at: DateTime<Utc>,
        new_status: &str,
    ) -> ApiResult<u64> {
        let target: OrderStatus = new_status.parse().map_err(|_| {
            ValidationError::UnknownStatus {
                value: new_status.to_string(),
            }
        })?;

        let lines = self.orders.lines_placed_at(placed_at).await?;
        if lines.is_empty() {
            return Err(NotFoundError::no_match(
                "orders with the specified place order timestamp",
            ));
        }

        for line in &lines {
            if !line.status.can_transition_to(target) {
                return Err(ValidationError::IllegalTransition {
                    order_number: line.order_number.clone(),
                    from: line.status,
                    to: target,
                }
                .into());
            }
        }

        let updated = self
            .orders
            .set_status_where_placed_at(placed_at, target)
            .await?;
        info!(%placed_at, status = %target, updated, "order statuses updated");
        Ok(updated)
    }
}

//! Checkout workflow
//!
//! Turns a submitted list of cart lines into one persisted order group plus
//! its order lines, then appends the line ids to the user's order list and
//! drains the purchased books from the cart.
//!
//! # Write order and compensation
//!
//! There is no multi-document transaction. Writes happen in the order
//! lines → group → order-list append → cart drain; if any step after the
//! line inserts fails, the created group and lines are deleted again and the
//! checkout fails. The compensating delete itself can fail, which is logged
//! and leaves residue — a narrower window than ignoring the problem, not a
//! guarantee.

use std::sync::Arc;

use chrono::Utc;
use tracing::{error, warn};
use uuid::Uuid;

use crate::core::error::{ApiError, ApiResult, NotFoundError, ValidationError};
use crate::domain::cart::Cart;
use crate::domain::order::{
    self, OrderGroup, OrderLine, PaymentDetails, PaymentMethod,
};
use crate::storage::{BookStore, CartConflict, CartStore, OrderNumberTaken, OrderStore, UserStore};

/// How many fresh order numbers to try per line before giving up.
const ORDER_NUMBER_ATTEMPTS: u32 = 3;

/// One submitted cart line: a book reference plus the price the client saw.
#[derive(Debug, Clone)]
pub struct SubmittedLine {
    pub book_id: Uuid,
    pub price: f64,
}

/// Payment input as submitted, before validation.
#[derive(Debug, Clone)]
pub enum CheckoutPayment {
    Cod,
    Card {
        card_number: Option<String>,
        expiry_date: Option<String>,
        cvc: Option<String>,
        card_name: Option<String>,
    },
    Bkash {
        phone_number: Option<String>,
    },
}

/// Result of a successful checkout.
#[derive(Debug, Clone)]
pub struct PlacedOrder {
    pub group: OrderGroup,
    pub lines: Vec<OrderLine>,
}

#[derive(Clone)]
pub struct CheckoutService {
    books: Arc<dyn BookStore>,
    users: Arc<dyn UserStore>,
    carts: Arc<dyn CartStore>,
    orders: Arc<dyn OrderStore>,
}

impl CheckoutService {
    pub fn new(
        books: Arc<dyn BookStore>,
        users: Arc<dyn UserStore>,
        carts: Arc<dyn CartStore>,
        orders: Arc<dyn OrderStore>,
    ) -> Self {
        Self {
            books,
            users,
            carts,
            orders,
        }
    }

    /// Place an order. Creates one group and one line per submitted book,
    /// all sharing a single placement timestamp.
    pub async fn checkout(
        &self,
        user_id: Uuid,
        lines: &[SubmittedLine],
        payment: CheckoutPayment,
    ) -> ApiResult<PlacedOrder> {
        if lines.is_empty() {
            return Err(ValidationError::EmptyOrder.into());
        }

        let (method, details) = resolve_payment(payment)?;

        self.users
            .get(&user_id)
            .await?
            .ok_or_else(|| NotFoundError::entity("user", user_id))?;

        // Prices come from the client's cart payload; the catalog is the
        // authority. A mismatch fails the whole checkout before any write.
        for line in lines {
            let book = self
                .books
                .get(&line.book_id)
                .await?
                .ok_or_else(|| NotFoundError::entity("book", line.book_id))?;
            if line.price != book.price {
                return Err(ValidationError::PriceMismatch {
                    book_id: line.book_id,
                    submitted: line.price,
                    catalog: book.price,
                }
                .into());
            }
        }

        let placed_at = Utc::now();
        let mut group = OrderGroup::new(user_id, placed_at, method, details);

        let mut created: Vec<OrderLine> = Vec::with_capacity(lines.len());
        for submitted in lines {
            let mut line =
                OrderLine::new(group.id, user_id, submitted.book_id, submitted.price, placed_at);
            let mut attempt = 0;
            loop {
                match self.orders.insert_line(line.clone()).await {
                    Ok(saved) => {
                        created.push(saved);
                        break;
                    }
                    Err(e) if e.downcast_ref::<OrderNumberTaken>().is_some() => {
                        attempt += 1;
                        if attempt >= ORDER_NUMBER_ATTEMPTS {
                            self.compensate(&group.id).await;
                            return Err(ApiError::from(anyhow::anyhow!(
                                "order number collisions exhausted after {} attempts",
                                attempt
                            )));
                        }
                        warn!(order_number = %line.order_number, "order number collision, regenerating");
                        line.regenerate_order_number();
                    }
                    Err(e) => {
                        self.compensate(&group.id).await;
                        return Err(e.into());
                    }
                }
            }
        }

        group.line_ids = created.iter().map(|l| l.id).collect();
        group.total = created.iter().map(|l| l.price).sum();
        let group = match self.orders.insert_group(group).await {
            Ok(group) => group,
            Err(e) => {
                self.compensate_lines(&created).await;
                return Err(e.into());
            }
        };

        if let Err(e) = self.users.append_order_lines(&user_id, &group.line_ids).await {
            self.compensate(&group.id).await;
            return Err(e.into());
        }

        let purchased: Vec<Uuid> = lines.iter().map(|l| l.book_id).collect();
        if let Err(e) = self.drain_cart(user_id, &purchased).await {
            self.compensate(&group.id).await;
            return Err(e);
        }

        Ok(PlacedOrder {
            group,
            lines: created,
        })
    }

    /// Remove the purchased books from the user's cart. A version conflict
    /// means someone mutated the cart mid-checkout; re-read and retry once.
    async fn drain_cart(&self, user_id: Uuid, purchased: &[Uuid]) -> ApiResult<()> {
        let mut attempt = 0;
        loop {
            let mut cart: Cart = self.carts.get(&user_id).await?;
            cart.drain(purchased);
            match self.carts.put(cart).await {
                Ok(_) => return Ok(()),
                Err(e) if e.downcast_ref::<CartConflict>().is_some() && attempt == 0 => {
                    attempt = 1;
                    warn!(%user_id, "cart changed during checkout, retrying drain");
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Delete the group and its lines after a post-insert failure.
    async fn compensate(&self, group_id: &Uuid) {
        if let Err(e) = self.orders.delete_group(group_id).await {
            error!(%group_id, error = %e, "checkout compensation failed, orphaned order records remain");
        }
    }

    /// Same, for the window before the group record exists.
    async fn compensate_lines(&self, lines: &[OrderLine]) {
        if let Some(line) = lines.first() {
            self.compensate(&line.group_id).await;
        }
    }
}

/// Validate the submitted payment input into a method plus stored payload.
fn resolve_payment(
    payment: CheckoutPayment,
) -> ApiResult<(PaymentMethod, Option<PaymentDetails>)> {
    match payment {
        CheckoutPayment::Cod => Ok((PaymentMethod::Cod, None)),
        CheckoutPayment::Card {
            card_number,
            expiry_date,
            cvc,
            card_name,
        } => {
            let (card_number, expiry_date, cvc, card_name) = match (
                non_empty(card_number),
                non_empty(expiry_date),
                non_empty(cvc),
                non_empty(card_name),
            ) {
                (Some(n), Some(e), Some(c), Some(h)) => (n, e, c, h),
                _ => return Err(ValidationError::MissingPaymentFields { method: "Card" }.into()),
            };
            // Stored as-is; there is no Luhn or expiry format check.
            Ok((
                PaymentMethod::Card,
                Some(PaymentDetails::Card {
                    card_number,
                    expiry_date,
                    cvc,
                    card_name,
                }),
            ))
        }
        CheckoutPayment::Bkash { phone_number } => {
            let raw = non_empty(phone_number)
                .ok_or(ValidationError::MissingPaymentFields { method: "bKash" })?;
            let phone_number = order::normalize_bkash_phone(&raw)
                .ok_or(ValidationError::InvalidPhoneNumber { value: raw })?;
            Ok((
                PaymentMethod::Bkash,
                Some(PaymentDetails::Bkash { phone_number }),
            ))
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_cod() {
        let (method, details) = resolve_payment(CheckoutPayment::Cod).unwrap();
        assert_eq!(method, PaymentMethod::Cod);
        assert!(details.is_none());
    }

    #[test]
    fn test_resolve_card_requires_all_fields() {
        let payment = CheckoutPayment::Card {
            card_number: Some("4242424242424242".into()),
            expiry_date: Some("12/27".into()),
            cvc: None,
            card_name: Some("A. Reader".into()),
        };
        let err = resolve_payment(payment).unwrap_err();
        assert_eq!(err.error_code(), "MISSING_PAYMENT_FIELDS");
    }

    #[test]
    fn test_resolve_card_rejects_blank_fields() {
        let payment = CheckoutPayment::Card {
            card_number: Some("4242424242424242".into()),
            expiry_date: Some("  ".into()),
            cvc: Some("123".into()),
            card_name: Some("A. Reader".into()),
        };
        assert!(resolve_payment(payment).is_err());
    }

    #[test]
    fn test_resolve_bkash_normalizes() {
        let payment = CheckoutPayment::Bkash {
            phone_number: Some("01812345678".into()),
        };
        let (method, details) = resolve_payment(payment).unwrap();
        assert_eq!(method, PaymentMethod::Bkash);
        assert_eq!(
            details,
            Some(PaymentDetails::Bkash {
                phone_number: "+880 1812345678".into()
            })
        );
    }

    #[test]
    fn test_resolve_bkash_rejects_malformed() {
        let payment = CheckoutPayment::Bkash {
            phone_number: Some("12345".into()),
        };
        let err = resolve_payment(payment).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_PHONE_NUMBER");
    }
}

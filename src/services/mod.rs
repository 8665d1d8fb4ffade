//! Service layer: the checkout workflow, reporting, status lifecycle and
//! account management

pub mod accounts;
pub mod checkout;
pub mod reporting;
pub mod status;

pub use accounts::AccountsService;
pub use checkout::CheckoutService;
pub use reporting::ReportingService;
pub use status::StatusService;

//! Request handlers, grouped by resource

pub mod accounts;
pub mod books;
pub mod cart;
pub mod events;
pub mod favourites;
pub mod orders;
pub mod reports;

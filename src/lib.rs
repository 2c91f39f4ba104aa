//! Billboard
//!
//! Pricing and booking engine for sponsorship slots. Slots such as a homepage
//! banner are sold by the day with a minimum booking length; this crate prices
//! those bookings, prices the flat and quantity add-ons sold next to them, and
//! keeps committed bookings of a slot from overlapping.

pub mod booking;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod dates;
pub mod picker;
pub mod prelude;
pub mod pricing;
pub mod reservations;
pub mod slots;
pub mod summary;

//! Checkout
//!
//! The server-side commit path. Client-side checks in the picker are only
//! advisory: every range is validated again here, against the reservation
//! store as it stands, before the order is handed to the order system.

use jiff::civil::Date;
#[cfg(test)]
use mockall::automock;
use rusty_money::{Money, iso::Currency};
use thiserror::Error;
use tracing::{debug, info};

use crate::{
    booking::{BookingError, BookingIndex},
    cart::{CartError, CartLine, CartTotal, LineKind, Selections, compute_cart_total},
    dates::DateRange,
    reservations::{InMemoryReservationStore, OrderStatus, Reservation, ReservationStore, StoreError},
    slots::SlotId,
};

/// Checkout errors
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// The terms of service were not accepted.
    #[error("terms of service must be accepted")]
    ConsentRequired,

    /// Nothing billable was selected.
    #[error("cart total is below the checkout minimum")]
    BelowMinimum,

    /// Errors bubbled up from cart pricing.
    #[error(transparent)]
    Cart(#[from] CartError),

    /// A range failed validation.
    #[error(transparent)]
    Booking(#[from] BookingError),

    /// The order system rejected the order.
    #[error("could not persist order: {0}")]
    Persist(#[source] StoreError),
}

/// A slot booking ready to be stored with the order.
#[derive(Debug, Clone, PartialEq)]
pub struct ReservationLine {
    /// Booked slot
    pub slot: SlotId,

    /// Booked days
    pub range: DateRange,

    /// Price charged
    pub price: Money<'static, Currency>,
}

/// A validated, priced order.
#[derive(Debug, Clone, PartialEq)]
pub struct FinalizedOrder {
    cart: CartTotal,
    reservations: Vec<ReservationLine>,
}

impl FinalizedOrder {
    /// Every priced line
    pub fn cart(&self) -> &CartTotal {
        &self.cart
    }

    /// Slot bookings
    pub fn reservations(&self) -> &[ReservationLine] {
        &self.reservations
    }

    /// Flat and quantity lines
    pub fn selections(&self) -> impl Iterator<Item = &CartLine> {
        self.cart
            .lines()
            .iter()
            .filter(|line| !matches!(line.kind, LineKind::Reservation { .. }))
    }

    /// Order total
    pub fn total(&self) -> &Money<'static, Currency> {
        self.cart.total()
    }
}

/// Write access to the external order system.
#[cfg_attr(test, automock)]
pub trait OrderSink: Send + Sync {
    /// Stores a paid order.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the order could not be stored.
    fn persist(&self, order: &FinalizedOrder) -> Result<(), StoreError>;
}

impl OrderSink for InMemoryReservationStore {
    fn persist(&self, order: &FinalizedOrder) -> Result<(), StoreError> {
        for line in order.reservations() {
            self.insert(Reservation::new(
                line.slot.clone(),
                line.range,
                OrderStatus::Processing,
            ))?;
        }

        Ok(())
    }
}

/// Validates and prices orders against a booking index.
#[derive(Debug)]
pub struct Checkout<'a, S> {
    index: &'a BookingIndex<S>,
}

impl<'a, S: ReservationStore> Checkout<'a, S> {
    /// Creates a checkout over `index`.
    pub fn new(index: &'a BookingIndex<S>) -> Self {
        Self { index }
    }

    /// Validates every picked range, prices the cart and applies the checkout gate.
    ///
    /// # Errors
    ///
    /// - [`CheckoutError::Booking`]: a range is too short, overlaps a committed
    ///   reservation, starts in the past, or availability could not be fetched.
    /// - [`CheckoutError::ConsentRequired`]: the terms were not accepted.
    /// - [`CheckoutError::BelowMinimum`]: nothing billable was selected.
    /// - [`CheckoutError::Cart`]: pricing failed.
    #[tracing::instrument(
        name = "checkout.finalize",
        skip(self, selections),
        fields(reservation_count = tracing::field::Empty),
        err
    )]
    pub fn finalize(
        &self,
        selections: &Selections,
        today: Date,
    ) -> Result<FinalizedOrder, CheckoutError> {
        let catalog = self.index.catalog();

        for option in selections.options().filter_map(|key| catalog.option(key)) {
            for slot_id in option.slots() {
                let Some(range) = selections.range(slot_id.as_str()) else {
                    continue;
                };

                let slot = self.index.slot(slot_id.as_str())?;

                self.index.validate_candidate_range(slot, *range, today)?;
            }
        }

        let cart = compute_cart_total(catalog, selections)?;

        if !selections.consent() {
            return Err(CheckoutError::ConsentRequired);
        }

        if !cart.can_checkout(true) {
            return Err(CheckoutError::BelowMinimum);
        }

        let reservations: Vec<ReservationLine> = cart
            .reservations()
            .filter_map(|line| match &line.kind {
                LineKind::Reservation { slot, range } => Some(ReservationLine {
                    slot: slot.clone(),
                    range: *range,
                    price: line.amount.clone(),
                }),
                LineKind::Flat | LineKind::Quantity(_) => None,
            })
            .collect();

        tracing::Span::current().record("reservation_count", reservations.len());

        debug!(total = %cart.total(), "order finalized");

        Ok(FinalizedOrder { cart, reservations })
    }

    /// Finalizes the order and hands it to `sink`.
    ///
    /// # Errors
    ///
    /// Same as [`Checkout::finalize`], plus [`CheckoutError::Persist`] when the
    /// sink fails.
    pub fn place(
        &self,
        sink: &impl OrderSink,
        selections: &Selections,
        today: Date,
    ) -> Result<FinalizedOrder, CheckoutError> {
        let order = self.finalize(selections, today)?;

        sink.persist(&order).map_err(CheckoutError::Persist)?;

        info!(
            total = %order.total(),
            reservation_count = order.reservations().len(),
            "order placed"
        );

        Ok(order)
    }
}

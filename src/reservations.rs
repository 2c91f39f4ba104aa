//! Reservations
//!
//! Reservations are owned by the external order system. This module only
//! describes them and defines the seam through which they are read.

use std::sync::RwLock;

#[cfg(test)]
use mockall::automock;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::{dates::DateRange, slots::SlotId};

/// Errors reported by a reservation store.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// The store could not be reached or answered with an error.
    #[error("reservation store unavailable: {0}")]
    Unavailable(String),

    /// A writer panicked while holding the store lock.
    #[error("reservation store lock poisoned")]
    Poisoned,
}

/// Lifecycle state of the order a reservation belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OrderStatus {
    /// Awaiting payment
    Pending,
    /// Awaiting manual action
    OnHold,
    /// Paid, being fulfilled
    Processing,
    /// Fulfilled
    Completed,
    /// Cancelled before fulfilment
    Cancelled,
    /// Refunded after payment
    Refunded,
    /// Payment failed
    Failed,
}

impl OrderStatus {
    /// Whether reservations on an order in this state hold their slot.
    pub fn is_committed(self) -> bool {
        matches!(self, OrderStatus::Processing | OrderStatus::Completed)
    }
}

/// A slot booking attached to an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    /// Booked slot
    pub slot: SlotId,

    /// Booked days
    pub range: DateRange,

    /// State of the owning order
    pub status: OrderStatus,
}

impl Reservation {
    /// Creates a reservation.
    pub fn new(slot: impl Into<SlotId>, range: DateRange, status: OrderStatus) -> Self {
        Self {
            slot: slot.into(),
            range,
            status,
        }
    }
}

/// Read access to the reservations recorded by the order system.
#[cfg_attr(test, automock)]
pub trait ReservationStore: Send + Sync {
    /// Every reservation recorded for `slot`, whatever its order state.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the reservations cannot be fetched.
    fn reservations(&self, slot: &SlotId) -> Result<Vec<Reservation>, StoreError>;
}

/// Reservation store kept in memory.
#[derive(Debug, Default)]
pub struct InMemoryReservationStore {
    reservations: RwLock<Vec<Reservation>>,
}

impl InMemoryReservationStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding the given reservations.
    pub fn with_reservations(reservations: impl IntoIterator<Item = Reservation>) -> Self {
        Self {
            reservations: RwLock::new(reservations.into_iter().collect()),
        }
    }

    /// Records a reservation.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Poisoned`] if the lock was poisoned.
    pub fn insert(&self, reservation: Reservation) -> Result<(), StoreError> {
        let mut reservations = self
            .reservations
            .write()
            .map_err(|_err| StoreError::Poisoned)?;

        debug!(slot = %reservation.slot, range = %reservation.range, "recorded reservation");

        reservations.push(reservation);

        Ok(())
    }

    /// Number of reservations held, in any state.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Poisoned`] if the lock was poisoned.
    pub fn len(&self) -> Result<usize, StoreError> {
        self.reservations
            .read()
            .map(|reservations| reservations.len())
            .map_err(|_err| StoreError::Poisoned)
    }

    /// Whether the store holds no reservations.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Poisoned`] if the lock was poisoned.
    pub fn is_empty(&self) -> Result<bool, StoreError> {
        self.len().map(|len| len == 0)
    }
}

impl ReservationStore for InMemoryReservationStore {
    fn reservations(&self, slot: &SlotId) -> Result<Vec<Reservation>, StoreError> {
        let reservations = self
            .reservations
            .read()
            .map_err(|_err| StoreError::Poisoned)?;

        Ok(reservations
            .iter()
            .filter(|reservation| reservation.slot == *slot)
            .cloned()
            .collect())
    }
}

//! Booking Index
//!
//! Answers availability questions for a slot from the committed reservations
//! held by a [`ReservationStore`].

use std::{fmt, sync::Arc};

use jiff::civil::Date;
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    catalog::Catalog,
    dates::{DateRange, DateRangeError},
    reservations::{ReservationStore, StoreError},
    slots::{SlotDefinition, SlotId},
};

/// Why a candidate range cannot be booked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unavailability {
    /// Overlaps this committed reservation.
    Reserved(DateRange),

    /// Starts before this day.
    BeforeToday(Date),
}

impl fmt::Display for Unavailability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unavailability::Reserved(range) => write!(f, "overlaps reservation {range}"),
            Unavailability::BeforeToday(today) => write!(f, "starts before {today}"),
        }
    }
}

/// Booking errors
#[derive(Debug, Clone, Error, PartialEq)]
pub enum BookingError {
    /// The requested dates are malformed.
    #[error(transparent)]
    InvalidRange(#[from] DateRangeError),

    /// The range is shorter than the slot minimum.
    #[error("slot {slot} needs at least {min_days} days, got {days}")]
    TooShort {
        /// Slot requested
        slot: SlotId,
        /// Inclusive day count requested
        days: u32,
        /// Minimum day count of the slot
        min_days: u32,
    },

    /// The range cannot be booked.
    #[error("slot {slot} is unavailable for {range}: {reason}")]
    Unavailable {
        /// Slot requested
        slot: SlotId,
        /// Range requested
        range: DateRange,
        /// First reason found
        reason: Unavailability,
    },

    /// The slot is not in the catalog.
    #[error("unknown slot: {0}")]
    UnknownSlot(SlotId),

    /// Reservations for the slot could not be fetched.
    #[error("could not fetch reservations for slot {slot}")]
    AvailabilityQueryFailed {
        /// Slot queried
        slot: SlotId,
        /// Store failure
        #[source]
        source: StoreError,
    },

    /// Availability for the slot is not known yet.
    #[error("availability for slot {0} is not known yet")]
    AvailabilityPending(SlotId),

    /// There is no picked range to confirm.
    #[error("no range picked for slot {0}")]
    NothingSelected(SlotId),
}

impl BookingError {
    /// Whether the customer can fix the error by choosing other dates.
    pub fn is_user_correctable(&self) -> bool {
        matches!(
            self,
            BookingError::InvalidRange(_)
                | BookingError::TooShort { .. }
                | BookingError::Unavailable { .. }
        )
    }
}

/// Availability index over a reservation store.
///
/// Holds a shared handle to the catalog; construct one per process and pass it
/// to whatever needs availability answers.
#[derive(Debug)]
pub struct BookingIndex<S> {
    catalog: Arc<Catalog>,
    store: S,
}

impl<S: ReservationStore> BookingIndex<S> {
    /// Creates an index reading reservations from `store`.
    pub fn new(catalog: Arc<Catalog>, store: S) -> Self {
        Self { catalog, store }
    }

    /// The catalog slots are resolved against.
    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// The underlying reservation store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Look up a slot, failing on identifiers the catalog does not know.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::UnknownSlot`] for unknown identifiers.
    pub fn slot(&self, slot: &str) -> Result<&SlotDefinition, BookingError> {
        self.catalog
            .slot(slot)
            .ok_or_else(|| BookingError::UnknownSlot(SlotId::new(slot)))
    }

    /// Date ranges of every committed reservation on `slot`, in no particular order.
    ///
    /// # Errors
    ///
    /// - [`BookingError::UnknownSlot`]: the slot is not in the catalog.
    /// - [`BookingError::AvailabilityQueryFailed`]: the store failed.
    #[tracing::instrument(
        name = "booking.index.list_reserved_ranges",
        skip(self),
        fields(reserved_count = tracing::field::Empty),
        err
    )]
    pub fn list_reserved_ranges(&self, slot: &str) -> Result<Vec<DateRange>, BookingError> {
        let slot = self.slot(slot)?.id();

        let reservations = self.store.reservations(slot).map_err(|source| {
            warn!(%slot, error = %source, "reservation query failed");

            BookingError::AvailabilityQueryFailed {
                slot: slot.clone(),
                source,
            }
        })?;

        let ranges: Vec<DateRange> = reservations
            .into_iter()
            .filter(|reservation| reservation.slot == *slot && reservation.status.is_committed())
            .map(|reservation| reservation.range)
            .collect();

        tracing::Span::current().record("reserved_count", ranges.len());

        Ok(ranges)
    }

    /// Reserved days of `slot` merged into sorted, non-touching spans for a
    /// calendar to disable.
    ///
    /// # Errors
    ///
    /// Same as [`BookingIndex::list_reserved_ranges`].
    pub fn disabled_spans(&self, slot: &str) -> Result<Vec<DateRange>, BookingError> {
        self.list_reserved_ranges(slot).map(merge_spans)
    }

    /// Whether `candidate` is free on `slot` and does not start before `today`.
    ///
    /// # Errors
    ///
    /// Same as [`BookingIndex::list_reserved_ranges`].
    pub fn is_available(
        &self,
        slot: &str,
        candidate: &DateRange,
        today: Date,
    ) -> Result<bool, BookingError> {
        let reserved = self.list_reserved_ranges(slot)?;

        Ok(unavailability(&reserved, candidate, today).is_none())
    }

    /// Checks that `candidate` can be booked on `slot`.
    ///
    /// # Errors
    ///
    /// - [`BookingError::TooShort`]: the range is shorter than the slot minimum.
    /// - [`BookingError::Unavailable`]: the range overlaps a committed
    ///   reservation or starts before `today`.
    /// - [`BookingError::UnknownSlot`] or [`BookingError::AvailabilityQueryFailed`]
    ///   when reservations cannot be listed.
    #[tracing::instrument(
        name = "booking.index.validate_candidate_range",
        skip(self, slot, candidate),
        fields(slot = %slot.id(), candidate = %candidate),
        err
    )]
    pub fn validate_candidate_range(
        &self,
        slot: &SlotDefinition,
        candidate: DateRange,
        today: Date,
    ) -> Result<DateRange, BookingError> {
        ensure_min_length(slot, &candidate)?;

        let reserved = self.list_reserved_ranges(slot.id().as_str())?;
        let validated = validate_against(slot, &reserved, candidate, today)?;

        debug!("candidate range accepted");

        Ok(validated)
    }
}

/// Validates `candidate` on `slot` against an already fetched list of
/// reserved ranges.
///
/// # Errors
///
/// - [`BookingError::TooShort`]: the range is shorter than the slot minimum.
/// - [`BookingError::Unavailable`]: the range overlaps a reserved range or
///   starts before `today`.
pub fn validate_against(
    slot: &SlotDefinition,
    reserved: &[DateRange],
    candidate: DateRange,
    today: Date,
) -> Result<DateRange, BookingError> {
    ensure_min_length(slot, &candidate)?;

    match unavailability(reserved, &candidate, today) {
        Some(reason) => Err(BookingError::Unavailable {
            slot: slot.id().clone(),
            range: candidate,
            reason,
        }),
        None => Ok(candidate),
    }
}

fn ensure_min_length(slot: &SlotDefinition, candidate: &DateRange) -> Result<(), BookingError> {
    let days = candidate.day_count();

    if days < slot.min_days() {
        return Err(BookingError::TooShort {
            slot: slot.id().clone(),
            days,
            min_days: slot.min_days(),
        });
    }

    Ok(())
}

/// First reason `candidate` cannot be booked, if any.
pub fn unavailability(
    reserved: &[DateRange],
    candidate: &DateRange,
    today: Date,
) -> Option<Unavailability> {
    if candidate.from() < today {
        return Some(Unavailability::BeforeToday(today));
    }

    reserved
        .iter()
        .find(|range| range.overlaps(candidate))
        .copied()
        .map(Unavailability::Reserved)
}

/// Sorts ranges and merges those that overlap or sit on consecutive days.
pub fn merge_spans(mut ranges: Vec<DateRange>) -> Vec<DateRange> {
    ranges.sort_unstable();

    let mut merged: Vec<DateRange> = Vec::with_capacity(ranges.len());

    for range in ranges {
        match merged.last_mut() {
            Some(last) if last.touches(&range) => *last = last.union(&range),
            _ => merged.push(range),
        }
    }

    merged
}

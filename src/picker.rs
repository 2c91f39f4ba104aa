//! Slot Picker
//!
//! Per-slot date picker state. A picker asks for the slot's reservations once
//! when it is shown, keeps them for as long as it stays shown, and validates
//! selections against that cached list.

use jiff::civil::Date;
use tracing::debug;

use crate::{
    booking::{BookingError, BookingIndex, merge_spans, validate_against},
    dates::DateRange,
    reservations::ReservationStore,
    slots::{SlotDefinition, SlotId},
};

/// Identifies one availability request issued by a picker.
///
/// A response is only applied when its ticket matches the picker's current
/// request; anything older is dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailabilityTicket {
    slot: SlotId,
    generation: u64,
}

impl AvailabilityTicket {
    /// Slot whose reservations should be fetched
    pub fn slot(&self) -> &SlotId {
        &self.slot
    }
}

/// Range selection of a visible picker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Selection {
    /// Nothing picked yet.
    #[default]
    Empty,

    /// Picked, awaiting validation.
    Pending(DateRange),

    /// Picked and validated.
    Confirmed(DateRange),
}

/// Picker lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PickerState {
    /// Not shown; holds nothing.
    #[default]
    Hidden,

    /// Shown, reservations requested but not received.
    AwaitingAvailability,

    /// Shown with reservations known.
    Ready {
        /// Reserved spans, merged and sorted
        reserved: Vec<DateRange>,
        /// Current selection
        selection: Selection,
    },

    /// Shown, but reservations could not be fetched. Nothing can be confirmed.
    Failed,
}

/// Date range picker for one slot.
#[derive(Debug, Clone)]
pub struct SlotPicker {
    slot: SlotDefinition,
    state: PickerState,
    generation: u64,
}

impl SlotPicker {
    /// Creates a hidden picker for `slot`.
    pub fn new(slot: SlotDefinition) -> Self {
        Self {
            slot,
            state: PickerState::Hidden,
            generation: 0,
        }
    }

    /// Slot the picker books
    pub fn slot(&self) -> &SlotDefinition {
        &self.slot
    }

    /// Current state
    pub fn state(&self) -> &PickerState {
        &self.state
    }

    /// Shows the picker.
    ///
    /// Returns a ticket when reservations must be fetched, which happens only
    /// when the picker was hidden; an already visible picker keeps its cache.
    pub fn show(&mut self) -> Option<AvailabilityTicket> {
        if self.state != PickerState::Hidden {
            return None;
        }

        self.generation = self.generation.wrapping_add(1);
        self.state = PickerState::AwaitingAvailability;

        debug!(slot = %self.slot.id(), generation = self.generation, "picker awaiting availability");

        Some(self.ticket())
    }

    /// Hides the picker, dropping its selection and cached reservations.
    pub fn hide(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        self.state = PickerState::Hidden;
    }

    /// Applies the answer to an availability request.
    ///
    /// The answer is ignored unless the picker is still awaiting the request
    /// identified by `ticket`. Returns whether it was applied.
    pub fn apply_availability(
        &mut self,
        ticket: &AvailabilityTicket,
        result: Result<Vec<DateRange>, BookingError>,
    ) -> bool {
        if self.state != PickerState::AwaitingAvailability || *ticket != self.ticket() {
            debug!(slot = %ticket.slot, "ignoring stale availability response");

            return false;
        }

        self.state = match result {
            Ok(reserved) => PickerState::Ready {
                reserved: merge_spans(reserved),
                selection: Selection::Empty,
            },
            Err(err) => {
                debug!(slot = %self.slot.id(), error = %err, "picker failed closed");

                PickerState::Failed
            }
        };

        true
    }

    /// Records a picked range, pending validation.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::AvailabilityPending`] unless reservations are known.
    pub fn pick(&mut self, range: DateRange) -> Result<(), BookingError> {
        let PickerState::Ready { selection, .. } = &mut self.state else {
            return Err(BookingError::AvailabilityPending(self.slot.id().clone()));
        };

        *selection = Selection::Pending(range);

        Ok(())
    }

    /// Validates the pending range against the cached reservations.
    ///
    /// A rejected range is cleared so the customer can pick again.
    ///
    /// # Errors
    ///
    /// - [`BookingError::TooShort`] or [`BookingError::Unavailable`] for a
    ///   rejected range.
    /// - [`BookingError::AvailabilityPending`] when reservations are not known.
    /// - [`BookingError::NothingSelected`] when no range was picked.
    pub fn confirm(&mut self, today: Date) -> Result<DateRange, BookingError> {
        let PickerState::Ready {
            reserved,
            selection,
        } = &mut self.state
        else {
            return Err(BookingError::AvailabilityPending(self.slot.id().clone()));
        };

        let Selection::Pending(range) = *selection else {
            return match *selection {
                Selection::Confirmed(range) => Ok(range),
                Selection::Empty | Selection::Pending(_) => {
                    Err(BookingError::NothingSelected(self.slot.id().clone()))
                }
            };
        };

        match validate_against(&self.slot, reserved.as_slice(), range, today) {
            Ok(range) => {
                *selection = Selection::Confirmed(range);

                Ok(range)
            }
            Err(err) => {
                *selection = Selection::Empty;

                Err(err)
            }
        }
    }

    /// Picks and validates a range in one step.
    ///
    /// # Errors
    ///
    /// Same as [`SlotPicker::pick`] and [`SlotPicker::confirm`].
    pub fn select(&mut self, range: DateRange, today: Date) -> Result<DateRange, BookingError> {
        self.pick(range)?;
        self.confirm(today)
    }

    /// Drops the current selection, keeping the cached reservations.
    pub fn clear_selection(&mut self) {
        if let PickerState::Ready { selection, .. } = &mut self.state {
            *selection = Selection::Empty;
        }
    }

    /// The validated range, if any.
    pub fn confirmed_range(&self) -> Option<DateRange> {
        match &self.state {
            PickerState::Ready {
                selection: Selection::Confirmed(range),
                ..
            } => Some(*range),
            _ => None,
        }
    }

    /// Spans the calendar should disable; empty until reservations are known.
    pub fn disabled_spans(&self) -> &[DateRange] {
        match &self.state {
            PickerState::Ready { reserved, .. } => reserved,
            PickerState::Hidden | PickerState::AwaitingAvailability | PickerState::Failed => &[],
        }
    }

    /// Whether a range may be confirmed in the current state.
    pub fn can_confirm(&self) -> bool {
        matches!(self.state, PickerState::Ready { .. })
    }

    fn ticket(&self) -> AvailabilityTicket {
        AvailabilityTicket {
            slot: self.slot.id().clone(),
            generation: self.generation,
        }
    }
}

impl<S: ReservationStore> BookingIndex<S> {
    /// Creates a hidden picker for `slot`.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::UnknownSlot`] if the slot is not in the catalog.
    pub fn picker(&self, slot: &str) -> Result<SlotPicker, BookingError> {
        self.slot(slot).cloned().map(SlotPicker::new)
    }

    /// Answers a picker's availability request.
    ///
    /// # Errors
    ///
    /// Same as [`BookingIndex::list_reserved_ranges`].
    pub fn fetch_availability(
        &self,
        ticket: &AvailabilityTicket,
    ) -> Result<Vec<DateRange>, BookingError> {
        self.list_reserved_ranges(ticket.slot().as_str())
    }
}

//! Billboard prelude.
//!
//! Convenience exports for common library consumers.

pub use crate::{
    booking::{BookingError, BookingIndex, Unavailability},
    cart::{CartError, CartLine, CartTotal, FormInput, LineKind, Selections, can_checkout, compute_cart_total},
    catalog::{Catalog, CatalogError, OptionKind, SponsorOption},
    checkout::{Checkout, CheckoutError, FinalizedOrder, OrderSink, ReservationLine},
    dates::{DateRange, DateRangeError},
    picker::{AvailabilityTicket, PickerState, Selection, SlotPicker},
    pricing::{PricingError, Quantity, QuantityItem, price_date_range, price_quantity_item},
    reservations::{InMemoryReservationStore, OrderStatus, Reservation, ReservationStore, StoreError},
    slots::{SlotDefinition, SlotError, SlotId},
    summary::{SummaryRow, summary_rows, write_summary},
};

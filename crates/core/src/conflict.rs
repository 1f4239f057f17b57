//! Client-scoped conflict filtering for availability.

use crate::span::Span;
use crate::types::{Minutes, Timestamp};

/// Removes slots that would collide with a client's existing appointments.
#[derive(Debug, Clone)]
pub struct ConflictFilter {
    bookings: Vec<Span>,
    duration: Minutes,
}

impl ConflictFilter {
    /// `bookings` are the client's non-cancelled appointments in the search
    /// window across every tenant; `duration` is the requested service length.
    pub fn new(bookings: impl IntoIterator<Item = Span>, duration: Minutes) -> Self {
        let mut bookings: Vec<Span> = bookings.into_iter().collect();
        bookings.sort();
        Self { bookings, duration }
    }

    /// True if a slot starting at `start` collides with any booking: same
    /// start, start inside the booking, or booking starting inside the slot.
    pub fn conflicts(&self, start: Timestamp) -> bool {
        let slot = Span::from_start(start, self.duration);
        self.bookings.iter().any(|b| {
            b.start == start || b.contains_instant(start) || slot.contains_instant(b.start)
        })
    }

    pub fn allows(&self, start: Timestamp) -> bool {
        !self.conflicts(start)
    }

    pub fn is_empty(&self) -> bool {
        self.bookings.is_empty()
    }
}

//! Domain types and models

pub mod application;
pub mod availability;
pub mod meeting;
pub mod reminder;
pub mod slot;

pub use application::{Application, ApplicationOutcome, ApplicationStatus};
pub use availability::{AvailableDate, SlotOccurrence};
pub use meeting::{Meeting, MeetingMember, MeetingStatus};
pub use reminder::{ReminderKind, ReminderRecord};
pub use slot::{RecurringSlot, Weekday};

/// Opaque identifier of an end user, assigned by the messaging front-end.
pub type UserId = i64;

//! # Roundtable Core
//!
//! Pure business logic layer - no infrastructure dependencies.
//!
//! This crate contains:
//! - The slot calendar projection and reminder due-window math
//! - Port/adapter interfaces (traits) implemented by `roundtable-infra`
//! - Use cases and services (applications, meetings, availability,
//!   reminder dispatch)
//!
//! ## Architecture Principles
//! - Only depends on `roundtable-domain`
//! - No database, HTTP, or platform code
//! - All external dependencies via traits
//! - Pure, testable business logic

pub mod applications;
pub mod availability;
pub mod calendar;
pub mod meetings;
pub mod messages;
pub mod ports;
pub mod reminders;

// Re-export specific items to avoid ambiguity
pub use applications::ApplicationService;
pub use availability::AvailabilityService;
pub use calendar::project;
pub use meetings::{MeetingService, NewMeeting};
pub use ports::{
    ApplicationRepository, AvailabilityStore, MeetingRepository, NotificationGateway,
    ReminderLedger, ServiceState, SlotRepository,
};
pub use reminders::{hour_before_due, CycleReport, ReminderService, ReminderServiceConfig};

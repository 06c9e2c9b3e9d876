//! Outbound notification delivery

pub mod gateway;

pub use gateway::{HttpNotificationGateway, HttpNotificationGatewayConfig};

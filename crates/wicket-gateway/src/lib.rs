// SPDX-FileCopyrightText: 2026 Wicket Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP gateway for the Wicket support-chat platform.
//!
//! Exposes the widget embed contract (bootstrap, respond, typing), the
//! operator actions (list, read, join, leave, close, message), and the
//! scheduler-facing sweep trigger.

pub mod auth;
pub mod handlers;
pub mod server;

pub use auth::SecretConfig;
pub use server::{router, start_server, GatewayState, HealthState, ServerConfig};

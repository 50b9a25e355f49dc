//! HTTP entitlement service for hwgate.
//!
//! Wires the [`AuthorizationLedger`](hwgate_license::AuthorizationLedger) and
//! [`ActivityRegistry`](hwgate_license::ActivityRegistry) behind a
//! [`Gateway`] that checks input and the admin secret, then exposes the
//! gateway over HTTP with [`build_router`].

pub mod config;
mod error;
mod gateway;
mod http;
mod notify;

pub use error::{GatewayError, GatewayResult};
pub use gateway::{Gateway, GatewayConfig};
pub use http::{
    build_router, ActivityRequest, AuthorizeRequest, RevokeRequest, SubmitRequest, VerifyRequest,
};
pub use notify::{LogSink, NotificationSink, NotifyError, NotifyResult, WebhookSink};

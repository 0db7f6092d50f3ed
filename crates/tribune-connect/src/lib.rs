//! Connect SSO bridge between Tribune and an external discussion forum.
//!
//! This crate implements the shared-secret HMAC handshake that lets the
//! forum delegate authentication to the identity-owning application:
//!
//! - Payload codec (Base64-wrapped, URL-encoded parameter sets)
//! - HMAC-SHA256 signing with constant-time verification
//! - Return-URL validation (open-redirect defense)
//! - The provider and login-callback flows
//! - Best-effort forum user synchronization and SSO event auditing

pub mod audit;
pub mod crypto;
pub mod directory;
pub mod error;
pub mod handlers;
pub mod handshake;
pub mod models;
pub mod payload;
pub mod return_url;
pub mod router;
pub mod sync;

pub use audit::{AuditService, SsoEventKind};
pub use crypto::{PayloadSigner, SharedSecret};
pub use directory::{
    ForumIdentity, InMemoryUserDirectory, LocalUser, PgUserDirectory, SessionIssuer, UserDirectory,
};
pub use error::{ConnectError, ConnectResult};
pub use handshake::{ConnectHandshake, InboundSso, ProviderOutcome};
pub use payload::SsoPayload;
pub use return_url::validate_return_url;
pub use router::{connect_router, ConnectState};
pub use sync::{ForumSyncClient, DEFAULT_SYNC_TIMEOUT};

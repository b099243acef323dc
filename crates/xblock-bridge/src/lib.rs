//! # xblock Bridge
//!
//! Both halves of the cross-context action bridge.
//!
//! The annotator side holds a [`BridgeClient`]: it posts correlated requests
//! on the shared [`MessageBus`] and resolves them on the matching `RESULT`, or
//! locally on timeout. The page side runs a [`BridgeServer`] around an
//! [`ActionExecutor`], which performs the privileged calls with credentials
//! captured from the page's own traffic by [`CredentialStore`].

mod bus;
mod client;
mod credentials;
mod error;
mod executor;
mod intercept;
mod server;
mod transport;

pub use bus::MessageBus;
pub use client::{BridgeClient, BridgeTimeouts, REQUEST_ID_PREFIX};
pub use credentials::{CredentialPair, CredentialStore};
pub use error::BridgeError;
pub use executor::{ActionExecutor, ExecutorSettings};
pub use intercept::{InterceptingFetch, XhrRequest};
pub use server::BridgeServer;
pub use transport::ReqwestFetch;

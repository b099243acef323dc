//! # xblock Protocols
//!
//! Data model and interface definitions shared by both execution contexts of
//! xblock: the isolated annotation side and the page-owned executor side.
//! Contains only types and traits - no implementations with side effects.
//!
//! ## Core Types
//!
//! - [`Identifier`] - validated subject handle, never generated locally
//! - [`ActionKind`] / [`ControlKind`] - paired actions and their inverses
//! - [`BridgeMessage`] - the closed message union crossing the isolation boundary
//! - [`ActionErrorCode`] / [`ActionFailure`] - failure taxonomy surfaced to controls
//! - [`Settings`], [`Stats`], [`IconPair`] - records held by the external store
//!
//! ## Seams
//!
//! - [`Fetch`] - opaque network capability handed to the executor
//! - [`ActionBridge`] - what a control needs to run an action
//! - [`ConfirmPrompt`] - user confirmation before blocking a followed account
//! - [`CookieSource`] - the page's cookie string

pub mod action;
pub mod bridge;
pub mod cookie;
pub mod error;
pub mod fetch;
pub mod i18n;
pub mod identifier;
pub mod message;
pub mod settings;

pub use action::{ActionKind, ControlKind};
pub use bridge::{ActionBridge, AlwaysConfirm, ConfirmPrompt};
pub use cookie::{parse_cookie, CookieSource};
pub use error::{ActionErrorCode, ActionFailure, ActionOutcome, ParseCodeError};
pub use fetch::{Fetch, FetchError, HttpMethod, HttpRequest, HttpResponse};
pub use i18n::{Locale, MessageKey, Messages};
pub use identifier::{Identifier, InvalidIdentifier};
pub use message::{BridgeMessage, RequestId, ResultPayload};
pub use settings::{IconPair, Settings, Stats};

//! # xblock Annotate
//!
//! Keeps a live host tree annotated with block and mute controls.
//!
//! The [`Scheduler`] turns host mutations into coalesced passes of the
//! [`Annotator`], which resolves identifiers with the [`extract`] heuristics
//! and attaches control clusters built by the [`ControlFactory`]. Clicking a
//! control runs the action through an [`ActionBridge`](xblock_protocols::ActionBridge)
//! and drives the control's visual state. The [`IconAcquirer`] learns the
//! host's own glyphs. [`Runtime`] wires all of it to the external store.

mod annotator;
mod collapse;
mod context;
mod controls;
mod error;
pub mod extract;
mod icons;
mod runtime;
mod scheduler;
pub mod selectors;
mod toast;

#[cfg(test)]
mod test_support;

pub use annotator::{Annotator, PassReport, RowContext};
pub use collapse::undo_button;
pub use context::AnnotateContext;
pub use controls::{Control, ControlFactory, ERROR_CLASS, LOADING_CLASS, SUCCESS_CLASS};
pub use error::{AnnotateError, Result};
pub use icons::{
    CHECK_ICON, IconAcquirer, IconCache, ProbeOutcome, extract_icons, icon_markup, matches_kind,
};
pub use runtime::{DocumentCookies, Runtime, RuntimeStores};
pub use scheduler::{
    PassKind, PassScheduler, Scheduler, SchedulerMetrics, SchedulerState, SchedulerStats,
};
pub use toast::show as show_toast;

//! A host-agnostic virtual tree differ.
//!
//! The crate reconciles an immutable description of a desired element/text
//! tree (a [`vdom::VNode`]) against whatever a live host tree currently
//! contains, applying the smallest set of host mutations it can get away
//! with. The host tree itself stays external: everything the differ needs
//! from it is expressed through the [`host::HostTree`] trait, so the same
//! algorithm can drive a browser document, a retained-mode scene graph or
//! the in-memory tree the integration tests use.
//!
//! [`diff::TreeDiffer::render`] runs one synchronous pass to completion.
//! There is no batching and no scheduling; callers decide when to re-render.

#![warn(clippy::pedantic)]

pub mod diff;
mod handlers;
pub mod host;
pub mod load;
pub mod vdom;

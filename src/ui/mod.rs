//! # UI Module
//!
//! Discord-facing rendering: embeds, control buttons and the presenters the
//! playback engine uses to talk back to users.

pub mod buttons;
pub mod embeds;
pub mod presenters;

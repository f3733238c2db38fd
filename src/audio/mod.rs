//! # Audio Module
//!
//! Per-guild playback engine for Open Jukebox.
//!
//! Each guild gets one controller task that owns its queue and playback
//! state. Everything else (commands, sink callbacks, the playlist ingester)
//! talks to it through messages.
//!
//! ## Architecture
//!
//! ### [`player`] - Playback Controller
//! - `Idle → Starting → Playing ⇄ Paused` state machine per guild
//! - Completion chaining through generation-tagged messages
//! - [`player::PlayerRegistry`] keeps one controller per guild
//!
//! ### [`queue`] - Queue and State
//! - FIFO of resolved [`queue::QueueItem`]s
//! - Immutable snapshots for display
//!
//! ### [`ingest`] - Play Requests
//! - Single videos and playlists, resolved in bounded concurrent batches
//! - Progress reporting and partial-failure accounting
//!
//! ### [`sink`] / [`songbird_sink`] - Audio Output
//! - [`sink::VoiceSink`] is the source of truth for "is something playing"
//! - Songbird implementation with `TrackEvent::End`/`TrackEvent::Error` hooks
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use open_jukebox::audio::{
//!     player::{GuildPlayer, PlaybackTimings},
//!     presenter::SilentPresenter,
//!     sink::VoiceSink,
//! };
//! use serenity::all::GuildId;
//! use std::sync::Arc;
//!
//! # async fn example(sink: Arc<dyn VoiceSink>) -> anyhow::Result<()> {
//! let player = GuildPlayer::spawn(
//!     GuildId::new(123456789),
//!     sink,
//!     Arc::new(SilentPresenter),
//!     PlaybackTimings::default(),
//! );
//!
//! // Control playback
//! player.pause().await?;
//! player.resume().await?;
//! player.skip().await?;
//! # Ok(())
//! # }
//! ```

pub mod ingest;
pub mod player;
pub mod presenter;
pub mod queue;
pub mod sink;
pub mod songbird_sink;

#[cfg(test)]
pub(crate) mod testing;

//! Open Jukebox: cola de reproducción por servidor para un bot de voz de
//! Discord.
//!
//! `cache` y `sources` no conocen Discord. `audio` usa `GuildId` de serenity
//! como clave por servidor y trae el sink de songbird (`audio::songbird_sink`),
//! pero el controlador solo habla con los traits `VoiceSink` y `Presenter`,
//! así que se prueba sin conexión. `bot` y `ui` son la capa de Discord.

pub mod audio;
pub mod bot;
pub mod cache;
pub mod config;
pub mod sources;
pub mod ui;

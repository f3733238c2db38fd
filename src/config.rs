use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::audio::{ingest::IngestSettings, player::PlaybackTimings};
use crate::sources::ytdlp::YtDlpOptions;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    // Discord
    pub discord_token: String,
    pub application_id: u64,
    pub guild_id: Option<u64>, // Para comandos de desarrollo

    // Resolución de metadata
    pub resolver_cache_size: usize,
    pub resolver_workers: usize,
    pub ytdlp_path: String,
    pub source_address: String,
    pub extractor_retries: u32,

    // Ingesta de playlists
    pub playlist_batch_size: usize,
    pub progress_interval: usize,

    // Reproducción
    pub sink_settle_ms: u64,
    pub advance_debounce_ms: u64,

    // UI
    pub queue_preview_size: usize,
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let playlist_batch_size: usize = std::env::var("PLAYLIST_BATCH_SIZE")
            .unwrap_or_else(|_| "3".to_string())
            .parse()?;

        let config = Self {
            // Discord
            discord_token: std::env::var("DISCORD_TOKEN")?,
            application_id: std::env::var("APPLICATION_ID")?.parse()?,
            guild_id: std::env::var("GUILD_ID").ok().and_then(|s| s.parse().ok()),

            // Resolución
            resolver_cache_size: std::env::var("RESOLVER_CACHE_SIZE")
                .unwrap_or_else(|_| "50".to_string())
                .parse()?,
            resolver_workers: match std::env::var("RESOLVER_WORKERS") {
                Ok(val) if !val.trim().is_empty() => val.parse()?,
                _ => default_resolver_workers(playlist_batch_size),
            },
            ytdlp_path: std::env::var("YTDLP_PATH").unwrap_or_else(|_| "yt-dlp".to_string()),
            source_address: std::env::var("SOURCE_ADDRESS")
                .unwrap_or_else(|_| "0.0.0.0".to_string()),
            extractor_retries: std::env::var("EXTRACTOR_RETRIES")
                .unwrap_or_else(|_| "1".to_string())
                .parse()?,

            // Playlists
            playlist_batch_size,
            progress_interval: std::env::var("PROGRESS_INTERVAL")
                .unwrap_or_else(|_| "15".to_string())
                .parse()?,

            // Reproducción
            sink_settle_ms: std::env::var("SINK_SETTLE_MS")
                .unwrap_or_else(|_| "500".to_string())
                .parse()?,
            advance_debounce_ms: std::env::var("ADVANCE_DEBOUNCE_MS")
                .unwrap_or_else(|_| "300".to_string())
                .parse()?,

            queue_preview_size: std::env::var("QUEUE_PREVIEW_SIZE")
                .unwrap_or_else(|_| "10".to_string())
                .parse()?,
        };

        config.validate()?;

        Ok(config)
    }

    /// Validates configuration values for correctness.
    ///
    /// # Validation Rules
    ///
    /// - Cache size, worker count and batch size must be greater than 0
    /// - Worker count must cover a full playlist batch
    /// - Progress interval must be greater than 0
    /// - The source address must be a valid IP address
    pub fn validate(&self) -> Result<()> {
        if self.resolver_cache_size == 0 {
            anyhow::bail!("Resolver cache size must be greater than 0");
        }

        if self.resolver_workers == 0 {
            anyhow::bail!("Resolver workers must be greater than 0");
        }

        if self.playlist_batch_size == 0 {
            anyhow::bail!("Playlist batch size must be greater than 0");
        }

        if self.resolver_workers < self.playlist_batch_size {
            anyhow::bail!(
                "Resolver workers ({}) must be at least the playlist batch size ({})",
                self.resolver_workers,
                self.playlist_batch_size
            );
        }

        if self.progress_interval == 0 {
            anyhow::bail!("Progress interval must be greater than 0");
        }

        if self.source_address.parse::<std::net::IpAddr>().is_err() {
            anyhow::bail!("Source address must be an IP address, got: {}", self.source_address);
        }

        if self.queue_preview_size == 0 || self.queue_preview_size > 25 {
            anyhow::bail!(
                "Queue preview size must be between 1 and 25, got: {}",
                self.queue_preview_size
            );
        }

        Ok(())
    }

    pub fn playback_timings(&self) -> PlaybackTimings {
        PlaybackTimings {
            settle_delay: Duration::from_millis(self.sink_settle_ms),
            advance_debounce: Duration::from_millis(self.advance_debounce_ms),
        }
    }

    pub fn ingest_settings(&self) -> IngestSettings {
        IngestSettings {
            batch_size: self.playlist_batch_size,
            progress_interval: self.progress_interval,
        }
    }

    pub fn ytdlp_options(&self) -> YtDlpOptions {
        YtDlpOptions {
            binary: self.ytdlp_path.clone(),
            source_address: self.source_address.clone(),
            extractor_retries: self.extractor_retries,
        }
    }

    /// Returns a summary of the current configuration for logging.
    ///
    /// Excludes the Discord token.
    pub fn summary(&self) -> String {
        format!(
            "Config Summary:\n  \
            Discord: App ID {} (Guild: {})\n  \
            Resolver: {} cached entries, {} workers, egress {} ({} retries)\n  \
            Playlists: batches of {}, progress every {} entries\n  \
            Playback: settle {}, debounce {}",
            self.application_id,
            self.guild_id.map_or("global".to_string(), |id| id.to_string()),
            self.resolver_cache_size,
            self.resolver_workers,
            self.source_address,
            self.extractor_retries,
            self.playlist_batch_size,
            self.progress_interval,
            humantime::format_duration(Duration::from_millis(self.sink_settle_ms)),
            humantime::format_duration(Duration::from_millis(self.advance_debounce_ms)),
        )
    }
}

/// Resolver workers: CPUs plus four, never less than one playlist batch.
fn default_resolver_workers(batch_size: usize) -> usize {
    (num_cpus::get() + 4).max(batch_size)
}

/// Default configuration values.
///
/// Used as fallbacks when environment variables are not provided.
impl Default for Config {
    fn default() -> Self {
        Self {
            discord_token: String::new(),
            application_id: 0,
            guild_id: None,

            resolver_cache_size: 50,
            resolver_workers: default_resolver_workers(3),
            ytdlp_path: "yt-dlp".to_string(),
            source_address: "0.0.0.0".to_string(),
            extractor_retries: 1,

            playlist_batch_size: 3,
            progress_interval: 15,

            sink_settle_ms: 500,
            advance_debounce_ms: 300,

            queue_preview_size: 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.resolver_cache_size, 50);
        assert_eq!(config.playlist_batch_size, 3);
        assert_eq!(config.progress_interval, 15);
    }

    #[test]
    fn rejects_zero_batch_size() {
        let config = Config {
            playlist_batch_size: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn default_workers_cover_a_batch() {
        let config = Config::default();
        assert!(config.resolver_workers >= config.playlist_batch_size);
        assert!(config.resolver_workers > num_cpus::get());
        assert_eq!(default_resolver_workers(64), 64.max(num_cpus::get() + 4));
    }

    #[test]
    fn rejects_fewer_workers_than_batch_size() {
        let config = Config {
            resolver_workers: 2,
            playlist_batch_size: 3,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_invalid_source_address() {
        let config = Config {
            source_address: "eth0".to_string(),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn timings_follow_millisecond_settings() {
        let config = Config::default();
        let timings = config.playback_timings();
        assert_eq!(timings.settle_delay, Duration::from_millis(500));
        assert_eq!(timings.advance_debounce, Duration::from_millis(300));
    }

    #[test]
    fn summary_hides_token() {
        let config = Config {
            discord_token: "super-secret".to_string(),
            ..Config::default()
        };
        assert!(!config.summary().contains("super-secret"));
    }
}

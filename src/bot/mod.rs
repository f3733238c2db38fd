//! # Bot Module
//!
//! Discord shell around the playback engine.
//!
//! This module contains:
//! - Command registration and dispatch
//! - Voice connection management (songbird)
//! - Event handling (ready, interactions, voice state updates)
//! - Background maintenance tasks
//!
//! ## Architecture
//!
//! [`OpenJukeboxBot`] implements Serenity's [`EventHandler`] trait. It owns:
//!
//! - The [`BatchIngester`] (and through it the cached metadata resolver)
//! - A [`PlayerRegistry`] with one playback controller per guild
//! - The songbird calls per guild
//!
//! ## Example
//!
//! ```rust,no_run
//! use open_jukebox::{bot::OpenJukeboxBot, config::Config};
//!
//! # fn example() -> anyhow::Result<()> {
//! let config = Config::load()?;
//! let bot = OpenJukeboxBot::new(config);
//! # Ok(())
//! # }
//! ```

use anyhow::Result;
use dashmap::DashMap;
use serenity::{
    all::{ChannelId, Context, EventHandler, GuildId, Http, Interaction, Ready, VoiceState},
    async_trait,
};
use std::{sync::Arc, time::Duration};
use tracing::{error, info, warn};

pub mod commands;
pub mod handlers;

use crate::{
    audio::{
        ingest::BatchIngester,
        player::{GuildPlayer, PlayerRegistry},
        presenter::Presenter,
        sink::VoiceSink,
        songbird_sink::SongbirdSink,
    },
    config::Config,
    sources::{MetadataResolver, YtDlpService},
    ui::presenters::ChannelPresenter,
};

type CallHandle = Arc<tokio::sync::Mutex<songbird::Call>>;

/// Main Discord handler for Open Jukebox.
///
/// ## Fields
///
/// - `config`: Bot configuration (tokens, limits, timings)
/// - `ingester`: `/play` entry point, shares the resolver cache across guilds
/// - `players`: Per-guild playback controllers
/// - `voice_handlers`: Per-guild songbird calls
pub struct OpenJukeboxBot {
    config: Arc<Config>,
    ingester: Arc<BatchIngester>,
    players: PlayerRegistry,
    http_client: reqwest::Client,
    voice_handlers: DashMap<GuildId, CallHandle>,
}

impl OpenJukeboxBot {
    /// Builds the engine (yt-dlp service, resolver, ingester, registry)
    /// from `config`.
    pub fn new(config: Config) -> Self {
        let service = Arc::new(YtDlpService::new(config.ytdlp_options()));
        let resolver = Arc::new(MetadataResolver::new(
            service,
            config.resolver_cache_size,
            config.resolver_workers,
        ));
        let ingester = Arc::new(BatchIngester::new(resolver, config.ingest_settings()));
        let players = PlayerRegistry::new(config.playback_timings());

        Self {
            config: Arc::new(config),
            ingester,
            players,
            http_client: reqwest::Client::new(),
            voice_handlers: DashMap::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn ingester(&self) -> &BatchIngester {
        &self.ingester
    }

    pub fn players(&self) -> &PlayerRegistry {
        &self.players
    }

    /// Registers slash commands with Discord.
    ///
    /// With `GUILD_ID` set, commands are registered for that guild only
    /// (instant propagation, for development); otherwise globally.
    async fn register_commands(&self, ctx: &Context) -> Result<()> {
        info!("📝 Registrando comandos slash...");
        info!("🔧 Application ID: {}", self.config.application_id);

        match self.config.guild_id {
            Some(guild_id) => {
                let guild_id = GuildId::new(guild_id);
                info!("🏠 Registrando comandos para guild específica: {}", guild_id);

                if !ctx.cache.guilds().contains(&guild_id) {
                    warn!("⚠️ El bot no está en la guild especificada: {}", guild_id);
                    return Ok(());
                }

                commands::register_guild_commands(ctx, guild_id)
                    .await
                    .map_err(|e| {
                        error!("❌ Error registrando comandos de guild: {:?}", e);
                        anyhow::anyhow!("No se pudieron registrar comandos de guild. Verifica que el bot tenga permisos de 'applications.commands' en la guild.")
                    })?;
                info!("✅ Comandos de guild registrados para: {}", guild_id);
            }
            None => {
                info!("🌐 Registrando comandos globalmente");
                commands::register_global_commands(ctx).await.map_err(|e| {
                    error!("❌ Error registrando comandos globales: {:?}", e);
                    anyhow::anyhow!("No se pudieron registrar comandos globales. Verifica que el bot tenga permisos de 'applications.commands'.")
                })?;
                info!("✅ Comandos globales registrados");
            }
        }

        Ok(())
    }

    /// Connects the bot to a voice channel and returns the call handle.
    ///
    /// Reuses the existing call if the bot is already connected in the guild.
    pub async fn join_voice_channel(
        &self,
        ctx: &Context,
        guild_id: GuildId,
        channel_id: ChannelId,
    ) -> Result<CallHandle> {
        if let Some(handler) = self.get_voice_handler(guild_id) {
            return Ok(handler);
        }

        let manager = songbird::get(ctx)
            .await
            .ok_or_else(|| anyhow::anyhow!("Songbird no inicializado"))?;

        match manager.join(guild_id, channel_id).await {
            Ok(call) => {
                self.voice_handlers.insert(guild_id, call.clone());
                info!("🔊 Conectado al canal de voz en guild {}", guild_id);
                Ok(call)
            }
            Err(e) => {
                error!("Error al obtener handler de voz: {:?}", e);
                Err(anyhow::anyhow!("Error al conectar al canal de voz"))
            }
        }
    }

    pub fn get_voice_handler(&self, guild_id: GuildId) -> Option<CallHandle> {
        self.voice_handlers.get(&guild_id).map(|h| h.clone())
    }

    /// Returns the guild's playback controller, creating it over `call` if
    /// needed. Now-playing notices go to `text_channel`.
    pub fn player_for(
        &self,
        guild_id: GuildId,
        call: CallHandle,
        http: Arc<Http>,
        text_channel: ChannelId,
    ) -> GuildPlayer {
        self.players.get_or_spawn(guild_id, || {
            let sink: Arc<dyn VoiceSink> =
                Arc::new(SongbirdSink::new(call, self.http_client.clone()));
            let presenter: Arc<dyn Presenter> =
                Arc::new(ChannelPresenter::new(http, text_channel));
            (sink, presenter)
        })
    }
}

#[async_trait]
impl EventHandler for OpenJukeboxBot {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("🤖 {} está en línea!", ready.user.name);
        info!("📊 Conectado a {} servidores", ready.guilds.len());

        if let Err(e) = self.register_commands(&ctx).await {
            error!("Error al registrar comandos: {:?}", e);
        }

        let ingester = self.ingester.clone();
        tokio::spawn(async move {
            maintenance_tasks(ingester).await;
        });
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        match interaction {
            Interaction::Command(command_interaction) => {
                if let Err(e) = handlers::handle_command(&ctx, command_interaction, self).await {
                    error!("Error manejando comando: {:?}", e);
                }
            }
            Interaction::Component(component_interaction) => {
                if let Err(e) = handlers::handle_component(&ctx, component_interaction, self).await
                {
                    error!("Error manejando componente: {:?}", e);
                }
            }
            _ => {}
        }
    }

    /// Stops and drops the guild's controller when the bot leaves voice.
    async fn voice_state_update(&self, ctx: Context, old: Option<VoiceState>, new: VoiceState) {
        let current_user_id = ctx.cache.current_user().id;
        if new.user_id != current_user_id || old.is_none() || new.channel_id.is_some() {
            return;
        }

        if let Some(guild_id) = new.guild_id {
            info!("🔌 Bot desconectado en guild {}", guild_id);
            self.voice_handlers.remove(&guild_id);
            self.players.remove(guild_id);
        }
    }
}

/// Logs resolver cache statistics once per hour.
async fn maintenance_tasks(ingester: Arc<BatchIngester>) {
    let mut interval = tokio::time::interval(Duration::from_secs(3600));
    interval.tick().await;

    loop {
        interval.tick().await;

        let metrics = ingester.resolver().cache_metrics();
        info!(
            "🧹 Cache de resolución: {} entradas, {} hits, {} misses, {} expulsiones ({:.1}% hit rate)",
            ingester.resolver().cache().len(),
            metrics.hits,
            metrics.misses,
            metrics.evictions,
            metrics.hit_rate() * 100.0
        );
    }
}

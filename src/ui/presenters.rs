use async_trait::async_trait;
use serenity::{
    all::{ChannelId, CommandInteraction, Http},
    builder::{CreateMessage, EditInteractionResponse},
};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::{
    audio::{
        ingest::IngestProgress,
        player::PlaybackError,
        presenter::{IngestReporter, Presenter},
        queue::QueueItem,
    },
    ui::{buttons, embeds},
};

/// Publica los avisos del reproductor en el canal de texto donde se pidió
/// la música.
pub struct ChannelPresenter {
    http: Arc<Http>,
    channel_id: ChannelId,
}

impl ChannelPresenter {
    pub fn new(http: Arc<Http>, channel_id: ChannelId) -> Self {
        Self { http, channel_id }
    }
}

#[async_trait]
impl Presenter for ChannelPresenter {
    async fn now_playing(&self, item: &QueueItem, queued: usize) {
        let message = CreateMessage::new()
            .embed(embeds::now_playing_embed(item, queued))
            .components(buttons::player_controls());

        if let Err(e) = self.channel_id.send_message(&self.http, message).await {
            warn!("No se pudo publicar 'reproduciendo ahora': {:?}", e);
        }
    }

    async fn playback_failed(&self, item: &QueueItem, error: &PlaybackError) {
        let message = CreateMessage::new().content(format!(
            "❌ No se pudo reproducir: {}",
            embeds::truncate(&item.title, 100)
        ));

        debug!("Aviso de fallo para {}: {}", item.title, error);
        if let Err(e) = self.channel_id.send_message(&self.http, message).await {
            warn!("No se pudo publicar el fallo de reproducción: {:?}", e);
        }
    }
}

/// Actualiza la respuesta diferida de `/play` con el progreso de la playlist.
pub struct InteractionReporter {
    http: Arc<Http>,
    interaction: CommandInteraction,
}

impl InteractionReporter {
    pub fn new(http: Arc<Http>, interaction: CommandInteraction) -> Self {
        Self { http, interaction }
    }
}

#[async_trait]
impl IngestReporter for InteractionReporter {
    async fn started(&self, title: &str, total: usize) {
        let edit = EditInteractionResponse::new()
            .content("")
            .embed(embeds::playlist_loading_embed(title, total));

        if let Err(e) = self.interaction.edit_response(&self.http, edit).await {
            debug!("No se pudo publicar el inicio de la playlist: {:?}", e);
        }
    }

    async fn progress(&self, progress: &IngestProgress) {
        let edit = EditInteractionResponse::new().embed(embeds::playlist_progress_embed(progress));

        if let Err(e) = self.interaction.edit_response(&self.http, edit).await {
            debug!("No se pudo actualizar el progreso de la playlist: {:?}", e);
        }
    }
}

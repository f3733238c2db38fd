use async_trait::async_trait;

use super::{ingest::IngestProgress, player::PlaybackError, queue::QueueItem};

/// Canal de avisos hacia el usuario (mensajes "reproduciendo ahora", fallos).
///
/// Es fire-and-forget: las implementaciones registran y descartan sus
/// propios errores.
#[async_trait]
pub trait Presenter: Send + Sync {
    async fn now_playing(&self, item: &QueueItem, queued: usize);

    async fn playback_failed(&self, item: &QueueItem, error: &PlaybackError);
}

/// Destino del progreso de ingesta de una playlist.
#[async_trait]
pub trait IngestReporter: Send + Sync {
    /// La playlist se expandió y empieza la resolución por lotes.
    async fn started(&self, _title: &str, _total: usize) {}

    async fn progress(&self, progress: &IngestProgress);
}

/// Presenter que no muestra nada.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentPresenter;

#[async_trait]
impl Presenter for SilentPresenter {
    async fn now_playing(&self, _item: &QueueItem, _queued: usize) {}

    async fn playback_failed(&self, _item: &QueueItem, _error: &PlaybackError) {}
}

#[async_trait]
impl IngestReporter for SilentPresenter {
    async fn progress(&self, _progress: &IngestProgress) {}
}

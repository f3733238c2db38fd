use futures::future::join_all;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use super::{
    player::{GuildPlayer, Placement, PlaybackError, TransportError},
    presenter::IngestReporter,
    queue::QueueItem,
};
use crate::sources::{MetadataResolver, PlaylistEntry, ResolutionError};

/// Parámetros de ingesta de playlists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestSettings {
    /// Entradas resueltas en paralelo por lote.
    pub batch_size: usize,
    /// Cada cuántas entradas procesadas se reporta progreso.
    pub progress_interval: usize,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            batch_size: 3,
            progress_interval: 15,
        }
    }
}

/// Estado parcial de una ingesta, para mostrar al usuario.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestProgress {
    pub title: String,
    pub processed: usize,
    pub total: usize,
    pub added: usize,
    pub skipped: usize,
    pub age_restricted: usize,
    pub finished: bool,
}

/// Resumen de una playlist ingerida.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestReport {
    pub title: String,
    pub total: usize,
    pub added: usize,
    pub skipped: usize,
    pub age_restricted: usize,
    /// Primer item agregado, en orden de reproducción.
    pub first_title: Option<String>,
    pub started: bool,
    pub queued: usize,
}

impl IngestReport {
    fn new(title: &str, total: usize) -> Self {
        Self {
            title: title.to_string(),
            total,
            added: 0,
            skipped: 0,
            age_restricted: 0,
            first_title: None,
            started: false,
            queued: 0,
        }
    }

    fn progress(&self, processed: usize) -> IngestProgress {
        IngestProgress {
            title: self.title.clone(),
            processed,
            total: self.total,
            added: self.added,
            skipped: self.skipped,
            age_restricted: self.age_restricted,
            finished: processed == self.total,
        }
    }
}

/// Resultado de `/play`.
#[derive(Debug, Clone, PartialEq)]
pub enum EnqueueOutcome {
    /// El item pedido empezó a sonar.
    Started(QueueItem),
    /// El item pedido quedó en la cola, en `position` (desde 1).
    Queued { item: QueueItem, position: usize },
    Playlist(IngestReport),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IngestError {
    #[error(transparent)]
    Resolution(#[from] ResolutionError),
    #[error("no videos found in playlist {title}")]
    EmptyPlaylist { title: String },
    #[error("no video from {title} could be added ({skipped} unavailable, {age_restricted} age-restricted)")]
    AllItemsFailed {
        title: String,
        skipped: usize,
        age_restricted: usize,
    },
    #[error("the result has no playable stream")]
    NoPlayableStream,
    #[error("the voice sink rejected the track: {0}")]
    Rejected(PlaybackError),
    #[error("playback was stopped while {title} was loading ({added} added)")]
    Cancelled { title: String, added: usize },
    #[error("the guild player is no longer running")]
    PlayerGone,
}

impl From<TransportError> for IngestError {
    fn from(_: TransportError) -> Self {
        IngestError::PlayerGone
    }
}

/// Punto de entrada de `/play`: resuelve referencias y llena la cola.
pub struct BatchIngester {
    resolver: Arc<MetadataResolver>,
    settings: IngestSettings,
}

impl BatchIngester {
    pub fn new(resolver: Arc<MetadataResolver>, settings: IngestSettings) -> Self {
        Self {
            resolver,
            settings: IngestSettings {
                batch_size: settings.batch_size.max(1),
                progress_interval: settings.progress_interval.max(1),
            },
        }
    }

    pub fn resolver(&self) -> &Arc<MetadataResolver> {
        &self.resolver
    }

    /// Resuelve `source_ref` y lo agrega a la cola del guild.
    ///
    /// Un video suelto se encola y arranca si el guild está ocioso; una
    /// playlist (o búsqueda) pasa por [`BatchIngester::ingest`].
    pub async fn enqueue(
        &self,
        source_ref: &str,
        player: &GuildPlayer,
        reporter: &dyn IngestReporter,
    ) -> Result<EnqueueOutcome, IngestError> {
        let listing = self.resolver.resolve(source_ref, true).await?;

        if listing.is_playlist() {
            let title = listing
                .title
                .clone()
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| "Unknown Playlist".to_string());
            let entries = listing.entries.unwrap_or_default();
            let report = self.ingest(&title, entries, player, reporter).await?;
            return Ok(EnqueueOutcome::Playlist(report));
        }

        let info = if listing.has_stream() {
            listing
        } else {
            self.resolver.resolve(source_ref, false).await?
        };

        let item = QueueItem::from_info(info).ok_or(IngestError::NoPlayableStream)?;
        let receipt = player.enqueue(vec![item.clone()], true).await?;

        match receipt.placement {
            Placement::Started => {
                info!("▶️ {} empieza de inmediato", item.title);
                Ok(EnqueueOutcome::Started(item))
            }
            Placement::Queued { position } => {
                info!("➕ {} en cola, posición #{}", item.title, position);
                Ok(EnqueueOutcome::Queued { item, position })
            }
            Placement::Rejected(error) => Err(IngestError::Rejected(error)),
        }
    }

    /// Resuelve las entradas de una playlist por lotes y las encola.
    ///
    /// Los fallos individuales se cuentan y se saltan. Si al menos una
    /// entrada se agregó, el controlador se arranca al final. Un `stop`
    /// durante la carga la corta con [`IngestError::Cancelled`].
    pub async fn ingest(
        &self,
        title: &str,
        entries: Vec<Option<PlaylistEntry>>,
        player: &GuildPlayer,
        reporter: &dyn IngestReporter,
    ) -> Result<IngestReport, IngestError> {
        let pending: Vec<(String, String)> = entries
            .into_iter()
            .flatten()
            .filter_map(|entry| {
                let reference = entry.source_ref()?;
                Some((reference, entry.display_title().to_string()))
            })
            .collect();

        if pending.is_empty() {
            return Err(IngestError::EmptyPlaylist {
                title: title.to_string(),
            });
        }

        let session = player.begin_ingest().await?;
        let mut report = IngestReport::new(title, pending.len());
        let mut processed = 0;
        info!("📋 Cargando playlist {}: {} videos", title, report.total);
        reporter.started(title, report.total).await;

        for batch in pending.chunks(self.settings.batch_size) {
            let results = join_all(
                batch
                    .iter()
                    .map(|(reference, _)| self.resolver.resolve(reference, false)),
            )
            .await;

            let mut resolved = Vec::with_capacity(batch.len());
            for ((reference, entry_title), result) in batch.iter().zip(results) {
                match result {
                    Ok(info) => match QueueItem::from_info(info) {
                        Some(item) => resolved.push(item),
                        None => {
                            warn!("⚠️ Sin stream reproducible: {}", reference);
                            report.skipped += 1;
                        }
                    },
                    Err(ResolutionError::AgeRestricted) => {
                        warn!("🔞 Saltado por restricción de edad: {}", entry_title);
                        report.age_restricted += 1;
                    }
                    Err(e) => {
                        warn!("⚠️ Saltado {}: {}", reference, e);
                        report.skipped += 1;
                    }
                }
            }

            if !resolved.is_empty() {
                if report.first_title.is_none() {
                    report.first_title = resolved.first().map(|item| item.title.clone());
                }
                let count = resolved.len();
                session
                    .enqueue(resolved)
                    .await
                    .map_err(|e| cancelled(e, &report))?;
                report.added += count;
            }

            processed += batch.len();
            if processed % self.settings.progress_interval == 0 || processed == report.total {
                reporter.progress(&report.progress(processed)).await;
            }
        }

        if report.added == 0 {
            warn!("❌ Ningún video de {} se pudo agregar", title);
            return Err(IngestError::AllItemsFailed {
                title: report.title,
                skipped: report.skipped,
                age_restricted: report.age_restricted,
            });
        }

        report.started = session.kick().await.map_err(|e| cancelled(e, &report))?;
        report.queued = player.snapshot().await?.pending.len();

        info!(
            "✅ Playlist {}: {} agregados, {} saltados, {} con restricción de edad",
            title, report.added, report.skipped, report.age_restricted
        );
        Ok(report)
    }
}

fn cancelled(error: TransportError, report: &IngestReport) -> IngestError {
    match error {
        TransportError::SessionEnded => {
            info!("⏹️ Carga de {} cortada por stop", report.title);
            IngestError::Cancelled {
                title: report.title.clone(),
                added: report.added,
            }
        }
        other => other.into(),
    }
}

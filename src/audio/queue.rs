use std::{collections::VecDeque, time::Duration};
use tracing::{debug, info};

use crate::sources::RawInfo;

/// Unidad reproducible ya resuelta.
///
/// Solo guarda lo necesario para reproducir y mostrar; formatos, miniaturas
/// y subtítulos del [`RawInfo`] se descartan al construirla.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueItem {
    pub stream_url: String,
    pub title: String,
    pub page_url: String,
    pub thumbnail: Option<String>,
    pub uploader: Option<String>,
    pub duration: Option<Duration>,
}

impl QueueItem {
    /// Construye el item a partir de una resolución completa.
    ///
    /// Devuelve `None` si la resolución no trae URL de stream.
    pub fn from_info(info: RawInfo) -> Option<Self> {
        let stream_url = info.url.filter(|url| !url.is_empty())?;

        Some(Self {
            stream_url,
            title: info
                .title
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| "Unknown".to_string()),
            page_url: info.webpage_url.unwrap_or_default(),
            thumbnail: info.thumbnail.filter(|t| !t.is_empty()),
            uploader: info.uploader.filter(|u| !u.is_empty()),
            duration: info
                .duration
                .filter(|d| d.is_finite() && *d > 0.0)
                .map(|d| Duration::from_secs(d as u64)),
        })
    }
}

/// Cola FIFO de items pendientes de un guild.
///
/// No está sincronizada: la posee la tarea del controlador del guild.
#[derive(Debug, Default)]
pub struct PlaybackQueue {
    items: VecDeque<QueueItem>,
}

impl PlaybackQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_back(&mut self, item: QueueItem) {
        debug!("➕ Agregado a la cola: {}", item.title);
        self.items.push_back(item);
    }

    /// Devuelve un item al frente (p. ej. si el sink lo rechazó por estar ocupado).
    pub fn push_front(&mut self, item: QueueItem) {
        self.items.push_front(item);
    }

    pub fn pop_front(&mut self) -> Option<QueueItem> {
        let next = self.items.pop_front();
        if let Some(ref item) = next {
            info!("➡️ Siguiente en cola (FIFO): {}", item.title);
        }
        next
    }

    pub fn peek_all(&self) -> Vec<QueueItem> {
        self.items.iter().cloned().collect()
    }

    /// Vacía la cola y devuelve cuántos items se eliminaron.
    pub fn clear(&mut self) -> usize {
        let removed = self.items.len();
        self.items.clear();
        if removed > 0 {
            info!("🗑️ Cola limpiada ({} canciones)", removed);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Fase del controlador de un guild.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackPhase {
    Idle,
    Starting,
    Playing,
    Paused,
}

/// Estado de reproducción de un guild.
///
/// `is_running` es verdadero desde que se emite un play al sink hasta que
/// una finalización deja la cola vacía; `now_playing` solo existe mientras
/// `is_running`.
#[derive(Debug)]
pub struct GuildPlaybackState {
    pub pending: PlaybackQueue,
    pub is_running: bool,
    pub now_playing: Option<QueueItem>,
    pub phase: PlaybackPhase,
}

impl Default for GuildPlaybackState {
    fn default() -> Self {
        Self {
            pending: PlaybackQueue::new(),
            is_running: false,
            now_playing: None,
            phase: PlaybackPhase::Idle,
        }
    }
}

impl GuildPlaybackState {
    pub fn begin(&mut self, item: QueueItem) {
        self.is_running = true;
        self.now_playing = Some(item);
        self.phase = PlaybackPhase::Starting;
    }

    pub fn go_idle(&mut self) {
        self.is_running = false;
        self.now_playing = None;
        self.phase = PlaybackPhase::Idle;
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        PlaybackSnapshot {
            phase: self.phase,
            is_running: self.is_running,
            now_playing: self.now_playing.clone(),
            pending: self.pending.peek_all(),
        }
    }
}

/// Copia inmutable del estado, para mostrar o inspeccionar.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackSnapshot {
    pub phase: PlaybackPhase,
    pub is_running: bool,
    pub now_playing: Option<QueueItem>,
    pub pending: Vec<QueueItem>,
}

impl PlaybackSnapshot {
    pub fn is_idle(&self) -> bool {
        self.phase == PlaybackPhase::Idle && !self.is_running && self.pending.is_empty()
    }

    pub fn pending_titles(&self) -> Vec<&str> {
        self.pending.iter().map(|item| item.title.as_str()).collect()
    }
}

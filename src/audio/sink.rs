use async_trait::async_trait;
use parking_lot::Mutex;
use std::{fmt, sync::Arc};
use thiserror::Error;

/// Error reportado por el sink de audio.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct SinkError(pub String);

type CompletionFn = Box<dyn FnOnce(Option<String>) + Send>;

/// Callback de finalización que el sink invoca cuando termina un track
/// (fin natural, error o stop explícito).
///
/// Se dispara como máximo una vez aunque se registre en varios eventos.
#[derive(Clone)]
pub struct CompletionNotifier {
    callback: Arc<Mutex<Option<CompletionFn>>>,
}

impl CompletionNotifier {
    pub fn new(callback: impl FnOnce(Option<String>) + Send + 'static) -> Self {
        Self {
            callback: Arc::new(Mutex::new(Some(Box::new(callback)))),
        }
    }

    /// Notifica la finalización; `error` lleva el motivo si el track falló.
    pub fn notify(&self, error: Option<String>) {
        let callback = self.callback.lock().take();
        if let Some(callback) = callback {
            callback(error);
        }
    }

    pub fn is_pending(&self) -> bool {
        self.callback.lock().is_some()
    }
}

impl fmt::Debug for CompletionNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionNotifier")
            .field("pending", &self.is_pending())
            .finish()
    }
}

/// Salida de audio de un guild.
///
/// Es la fuente de verdad del estado de reproducción: el controlador le
/// pregunta antes de actuar en lugar de confiar en su propio estado.
#[async_trait]
pub trait VoiceSink: Send + Sync {
    async fn is_playing(&self) -> bool;

    async fn is_paused(&self) -> bool;

    async fn pause(&self) -> Result<(), SinkError>;

    async fn resume(&self) -> Result<(), SinkError>;

    /// Detiene el track actual. El sink debe disparar su notificador.
    async fn stop(&self) -> Result<(), SinkError>;

    async fn play(&self, stream_url: &str, on_complete: CompletionNotifier) -> Result<(), SinkError>;
}

use async_trait::async_trait;
use parking_lot::Mutex;
use songbird::{
    input::HttpRequest,
    tracks::{PlayMode, TrackHandle},
    Call, Event, EventContext, EventHandler as VoiceEventHandler, TrackEvent,
};
use std::sync::Arc;
use tracing::{debug, warn};

use super::sink::{CompletionNotifier, SinkError, VoiceSink};

/// Sink de producción sobre una llamada de songbird.
pub struct SongbirdSink {
    call: Arc<tokio::sync::Mutex<Call>>,
    http: reqwest::Client,
    current: Mutex<Option<TrackHandle>>,
    volume: f32,
}

impl SongbirdSink {
    pub fn new(call: Arc<tokio::sync::Mutex<Call>>, http: reqwest::Client) -> Self {
        Self {
            call,
            http,
            current: Mutex::new(None),
            volume: 0.5,
        }
    }

    fn current(&self) -> Option<TrackHandle> {
        self.current.lock().clone()
    }

    async fn mode(&self) -> Option<PlayMode> {
        let handle = self.current()?;
        handle.get_info().await.ok().map(|state| state.playing)
    }
}

#[async_trait]
impl VoiceSink for SongbirdSink {
    async fn is_playing(&self) -> bool {
        matches!(self.mode().await, Some(PlayMode::Play))
    }

    async fn is_paused(&self) -> bool {
        matches!(self.mode().await, Some(PlayMode::Pause))
    }

    async fn pause(&self) -> Result<(), SinkError> {
        match self.current() {
            Some(handle) => handle.pause().map_err(|e| SinkError(e.to_string())),
            None => Err(SinkError("no hay track activo".to_string())),
        }
    }

    async fn resume(&self) -> Result<(), SinkError> {
        match self.current() {
            Some(handle) => handle.play().map_err(|e| SinkError(e.to_string())),
            None => Err(SinkError("no hay track activo".to_string())),
        }
    }

    async fn stop(&self) -> Result<(), SinkError> {
        let handle = self.current.lock().take();
        match handle {
            Some(handle) => handle.stop().map_err(|e| SinkError(e.to_string())),
            None => Ok(()),
        }
    }

    async fn play(&self, stream_url: &str, on_complete: CompletionNotifier) -> Result<(), SinkError> {
        let input = HttpRequest::new(self.http.clone(), stream_url.to_string());

        let handle = {
            let mut call = self.call.lock().await;
            call.play_input(input.into())
        };
        let _ = handle.set_volume(self.volume);

        for event in [TrackEvent::End, TrackEvent::Error] {
            let registered = handle.add_event(
                Event::Track(event),
                TrackFinished {
                    notifier: on_complete.clone(),
                },
            );
            if let Err(e) = registered {
                let _ = handle.stop();
                return Err(SinkError(format!("Error al agregar event handler: {e}")));
            }
        }

        debug!("🔊 Stream enviado a songbird: {}", stream_url);
        *self.current.lock() = Some(handle);
        Ok(())
    }
}

/// Reenvía el fin (o error) de un track al controlador.
struct TrackFinished {
    notifier: CompletionNotifier,
}

#[async_trait]
impl VoiceEventHandler for TrackFinished {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<Event> {
        let error = match ctx {
            EventContext::Track(tracks) => tracks.iter().find_map(|(state, _)| match &state.playing {
                PlayMode::Errored(e) => Some(format!("{e:?}")),
                _ => None,
            }),
            _ => None,
        };

        if let Some(reason) = &error {
            warn!("Track terminó con error en songbird: {}", reason);
        }
        self.notifier.notify(error);

        None
    }
}

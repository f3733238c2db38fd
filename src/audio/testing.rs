//! Dobles de prueba compartidos por los tests del motor.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::{collections::HashSet, time::Duration};

use super::{
    ingest::IngestProgress,
    player::{GuildPlayer, PlaybackError, PlaybackTimings},
    presenter::{IngestReporter, Presenter},
    queue::{PlaybackSnapshot, QueueItem},
    sink::{CompletionNotifier, SinkError, VoiceSink},
};

pub fn item(title: &str) -> QueueItem {
    QueueItem {
        stream_url: stream_url(title),
        title: title.to_string(),
        page_url: format!("https://youtu.be/{title}"),
        thumbnail: None,
        uploader: None,
        duration: Some(Duration::from_secs(180)),
    }
}

pub fn stream_url(title: &str) -> String {
    format!("https://cdn.example/{title}.webm")
}

pub fn fast_timings() -> PlaybackTimings {
    PlaybackTimings {
        settle_delay: Duration::from_millis(5),
        advance_debounce: Duration::from_millis(5),
    }
}

/// Espera hasta que el snapshot del player cumpla la condición.
pub async fn wait_for(
    player: &GuildPlayer,
    condition: impl Fn(&PlaybackSnapshot) -> bool,
) -> PlaybackSnapshot {
    let mut last = None;
    for _ in 0..400 {
        let snapshot = player.snapshot().await.expect("player vivo");
        if condition(&snapshot) {
            return snapshot;
        }
        last = Some(snapshot);
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condición no alcanzada; último estado: {last:?}");
}

#[derive(Default)]
struct FakeSinkState {
    current: Option<(String, CompletionNotifier)>,
    paused: bool,
    played: Vec<String>,
    rejected: HashSet<String>,
    silent_stop: bool,
    stops: usize,
}

/// Sink en memoria: la prueba decide cuándo termina cada track.
#[derive(Default)]
pub struct FakeSink {
    state: Mutex<FakeSinkState>,
}

impl FakeSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// El sink rechazará este stream en `play`.
    pub fn reject(&self, stream_url: &str) {
        self.state.lock().rejected.insert(stream_url.to_string());
    }

    /// `stop` no dispara el notificador (simula una finalización en vuelo).
    pub fn silence_stop(&self) {
        self.state.lock().silent_stop = true;
    }

    /// Fin natural del track actual.
    pub fn finish(&self) -> bool {
        self.end_current(None)
    }

    /// El track actual termina con error.
    pub fn fail(&self, reason: &str) -> bool {
        self.end_current(Some(reason.to_string()))
    }

    fn end_current(&self, error: Option<String>) -> bool {
        let current = {
            let mut state = self.state.lock();
            state.paused = false;
            state.current.take()
        };
        match current {
            Some((_, notifier)) => {
                notifier.notify(error);
                true
            }
            None => false,
        }
    }

    /// Simula audio ajeno al controlador.
    pub fn occupy(&self, stream_url: &str) {
        let mut state = self.state.lock();
        state.current = Some((stream_url.to_string(), CompletionNotifier::new(|_| {})));
        state.paused = false;
    }

    pub fn current_notifier(&self) -> Option<CompletionNotifier> {
        self.state.lock().current.as_ref().map(|(_, n)| n.clone())
    }

    pub fn current_url(&self) -> Option<String> {
        self.state.lock().current.as_ref().map(|(url, _)| url.clone())
    }

    pub fn played(&self) -> Vec<String> {
        self.state.lock().played.clone()
    }

    pub fn stops(&self) -> usize {
        self.state.lock().stops
    }
}

#[async_trait]
impl VoiceSink for FakeSink {
    async fn is_playing(&self) -> bool {
        let state = self.state.lock();
        state.current.is_some() && !state.paused
    }

    async fn is_paused(&self) -> bool {
        let state = self.state.lock();
        state.current.is_some() && state.paused
    }

    async fn pause(&self) -> Result<(), SinkError> {
        self.state.lock().paused = true;
        Ok(())
    }

    async fn resume(&self) -> Result<(), SinkError> {
        self.state.lock().paused = false;
        Ok(())
    }

    async fn stop(&self) -> Result<(), SinkError> {
        let current = {
            let mut state = self.state.lock();
            state.stops += 1;
            state.paused = false;
            let current = state.current.take();
            if state.silent_stop {
                None
            } else {
                current
            }
        };
        if let Some((_, notifier)) = current {
            notifier.notify(None);
        }
        Ok(())
    }

    async fn play(&self, stream_url: &str, on_complete: CompletionNotifier) -> Result<(), SinkError> {
        let mut state = self.state.lock();
        if state.rejected.contains(stream_url) {
            return Err(SinkError(format!("formato no soportado: {stream_url}")));
        }
        state.current = Some((stream_url.to_string(), on_complete));
        state.paused = false;
        state.played.push(stream_url.to_string());
        Ok(())
    }
}

/// Registra los avisos como texto.
#[derive(Default)]
pub struct RecordingPresenter {
    events: Mutex<Vec<String>>,
}

impl RecordingPresenter {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }
}

#[async_trait]
impl Presenter for RecordingPresenter {
    async fn now_playing(&self, item: &QueueItem, queued: usize) {
        self.events
            .lock()
            .push(format!("now_playing:{}:{}", item.title, queued));
    }

    async fn playback_failed(&self, item: &QueueItem, _error: &PlaybackError) {
        self.events.lock().push(format!("failed:{}", item.title));
    }
}

/// Registra cada reporte de progreso.
#[derive(Default)]
pub struct RecordingReporter {
    reports: Mutex<Vec<IngestProgress>>,
}

impl RecordingReporter {
    pub fn reports(&self) -> Vec<IngestProgress> {
        self.reports.lock().clone()
    }
}

#[async_trait]
impl IngestReporter for RecordingReporter {
    async fn progress(&self, progress: &IngestProgress) {
        self.reports.lock().push(progress.clone());
    }
}

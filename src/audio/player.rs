use dashmap::DashMap;
use serenity::model::id::GuildId;
use std::{sync::Arc, time::Duration};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use super::{
    presenter::Presenter,
    queue::{GuildPlaybackState, PlaybackPhase, PlaybackSnapshot, QueueItem},
    sink::{CompletionNotifier, VoiceSink},
};

/// Tiempos del controlador.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackTimings {
    /// Espera tras detener un sink en pausa antes de iniciar otro stream.
    pub settle_delay: Duration,
    /// Espera entre una finalización y el avance de la cola.
    pub advance_debounce: Duration,
}

impl Default for PlaybackTimings {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_millis(500),
            advance_debounce: Duration::from_millis(300),
        }
    }
}

/// Fallo al iniciar un item en el sink.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlaybackError {
    #[error("el sink rechazó el stream: {0}")]
    SinkRejected(String),
    #[error("el sink ya está reproduciendo")]
    AlreadyPlaying,
}

/// Fallo de una operación de transporte (pause, resume, skip...).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("no hay nada reproduciéndose")]
    NothingPlaying,
    #[error("no hay nada en pausa")]
    NothingPaused,
    #[error("error del sink: {0}")]
    Sink(String),
    #[error("el reproductor del servidor ya no está activo")]
    PlayerGone,
    #[error("la reproducción se detuvo mientras se cargaban items")]
    SessionEnded,
}

/// Qué pasó con el primer item de un `enqueue`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    Started,
    /// Quedó en la cola; `position` empieza en 1.
    Queued { position: usize },
    Rejected(PlaybackError),
}

/// Resultado de encolar items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnqueueReceipt {
    pub placement: Placement,
    /// Largo de la cola pendiente tras la operación.
    pub queued: usize,
}

impl EnqueueReceipt {
    pub fn started(&self) -> bool {
        self.placement == Placement::Started
    }
}

/// Resultado de sacar items del frente hasta que uno arranque.
#[derive(Debug, Default)]
struct StartAttempt {
    started: bool,
    /// Fallos en orden de salida de la cola.
    rejected: Vec<PlaybackError>,
}

impl StartAttempt {
    fn popped(&self) -> usize {
        self.rejected.len() + usize::from(self.started)
    }

    /// Ubicación del item que estaba en `index` antes del intento.
    fn placement_of(&self, index: usize) -> Placement {
        if let Some(error) = self.rejected.get(index) {
            return Placement::Rejected(error.clone());
        }
        if self.started && index + 1 == self.popped() {
            return Placement::Started;
        }
        Placement::Queued {
            position: index - self.popped() + 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StopOutcome {
    pub was_active: bool,
    pub cleared: usize,
}

enum Command {
    Enqueue {
        items: Vec<QueueItem>,
        start_if_idle: bool,
        session: Option<u64>,
        reply: oneshot::Sender<Result<EnqueueReceipt, TransportError>>,
    },
    Kick {
        session: Option<u64>,
        reply: oneshot::Sender<Result<bool, TransportError>>,
    },
    BeginIngest {
        reply: oneshot::Sender<u64>,
    },
    EndIngest {
        session: u64,
    },
    TrackEnded {
        generation: u64,
        error: Option<String>,
    },
    Advance {
        generation: u64,
    },
    Pause {
        reply: oneshot::Sender<Result<(), TransportError>>,
    },
    Resume {
        reply: oneshot::Sender<Result<(), TransportError>>,
    },
    Skip {
        reply: oneshot::Sender<Result<Option<QueueItem>, TransportError>>,
    },
    Stop {
        reply: oneshot::Sender<StopOutcome>,
    },
    Clear {
        reply: oneshot::Sender<usize>,
    },
    Snapshot {
        reply: oneshot::Sender<PlaybackSnapshot>,
    },
    Shutdown,
}

/// Handle al controlador de reproducción de un guild.
///
/// Todas las operaciones son mensajes a la tarea del controlador, que es la
/// única dueña del [`GuildPlaybackState`].
#[derive(Clone)]
pub struct GuildPlayer {
    guild_id: GuildId,
    commands: mpsc::UnboundedSender<Command>,
}

impl GuildPlayer {
    pub fn spawn(
        guild_id: GuildId,
        sink: Arc<dyn VoiceSink>,
        presenter: Arc<dyn Presenter>,
        timings: PlaybackTimings,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let controller = PlaybackController {
            guild_id,
            state: GuildPlaybackState::default(),
            sink,
            presenter,
            timings,
            generation: 0,
            session: 0,
            ingests: 0,
            mailbox: tx.downgrade(),
        };
        tokio::spawn(controller.run(rx));

        Self {
            guild_id,
            commands: tx,
        }
    }

    pub fn guild_id(&self) -> GuildId {
        self.guild_id
    }

    pub fn is_alive(&self) -> bool {
        !self.commands.is_closed()
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, TransportError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(build(reply))
            .map_err(|_| TransportError::PlayerGone)?;
        response.await.map_err(|_| TransportError::PlayerGone)
    }

    /// Agrega items al final de la cola. Con `start_if_idle`, si no hay
    /// nada corriendo, arranca el frente de la cola (que puede ser un item
    /// encolado antes; ver [`EnqueueReceipt::placement`]).
    pub async fn enqueue(
        &self,
        items: Vec<QueueItem>,
        start_if_idle: bool,
    ) -> Result<EnqueueReceipt, TransportError> {
        self.enqueue_in(None, items, start_if_idle).await
    }

    async fn enqueue_in(
        &self,
        session: Option<u64>,
        items: Vec<QueueItem>,
        start_if_idle: bool,
    ) -> Result<EnqueueReceipt, TransportError> {
        self.request(|reply| Command::Enqueue {
            items,
            start_if_idle,
            session,
            reply,
        })
        .await?
    }

    /// Arranca la cola si el controlador está ocioso. Devuelve si algo empezó.
    pub async fn kick(&self) -> Result<bool, TransportError> {
        self.request(|reply| Command::Kick {
            session: None,
            reply,
        })
        .await?
    }

    /// Abre una carga larga (playlist). Sus `enqueue`/`kick` fallan con
    /// [`TransportError::SessionEnded`] si un `stop` llega en el medio.
    pub async fn begin_ingest(&self) -> Result<IngestSession, TransportError> {
        let session = self.request(|reply| Command::BeginIngest { reply }).await?;
        Ok(IngestSession {
            player: self.clone(),
            session,
        })
    }

    pub async fn pause(&self) -> Result<(), TransportError> {
        self.request(|reply| Command::Pause { reply }).await?
    }

    pub async fn resume(&self) -> Result<(), TransportError> {
        self.request(|reply| Command::Resume { reply }).await?
    }

    /// Fuerza el fin del track actual; el avance ocurre por la ruta de
    /// finalización. Devuelve el item que sonaba.
    pub async fn skip(&self) -> Result<Option<QueueItem>, TransportError> {
        self.request(|reply| Command::Skip { reply }).await?
    }

    pub async fn stop(&self) -> Result<StopOutcome, TransportError> {
        self.request(|reply| Command::Stop { reply }).await
    }

    /// Vacía la cola pendiente sin tocar el track actual.
    pub async fn clear(&self) -> Result<usize, TransportError> {
        self.request(|reply| Command::Clear { reply }).await
    }

    pub async fn list_queue(&self) -> Result<Vec<QueueItem>, TransportError> {
        Ok(self.snapshot().await?.pending)
    }

    pub async fn snapshot(&self) -> Result<PlaybackSnapshot, TransportError> {
        self.request(|reply| Command::Snapshot { reply }).await
    }

    /// Detiene el sink y termina la tarea del controlador.
    pub fn shutdown(&self) {
        let _ = self.commands.send(Command::Shutdown);
    }
}

/// Carga en curso sobre un [`GuildPlayer`]; se cierra al soltarla.
pub struct IngestSession {
    player: GuildPlayer,
    session: u64,
}

impl IngestSession {
    pub async fn enqueue(&self, items: Vec<QueueItem>) -> Result<EnqueueReceipt, TransportError> {
        self.player
            .enqueue_in(Some(self.session), items, false)
            .await
    }

    pub async fn kick(&self) -> Result<bool, TransportError> {
        self.player
            .request(|reply| Command::Kick {
                session: Some(self.session),
                reply,
            })
            .await?
    }

    pub fn player(&self) -> &GuildPlayer {
        &self.player
    }
}

impl Drop for IngestSession {
    fn drop(&mut self) {
        let _ = self.player.commands.send(Command::EndIngest {
            session: self.session,
        });
    }
}

struct PlaybackController {
    guild_id: GuildId,
    state: GuildPlaybackState,
    sink: Arc<dyn VoiceSink>,
    presenter: Arc<dyn Presenter>,
    timings: PlaybackTimings,
    generation: u64,
    /// Lo incrementa cada `stop`; invalida las cargas abiertas antes.
    session: u64,
    ingests: usize,
    mailbox: mpsc::WeakUnboundedSender<Command>,
}

impl PlaybackController {
    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        info!("🎛️ Controlador de reproducción iniciado para guild {}", self.guild_id);

        while let Some(command) = commands.recv().await {
            match command {
                Command::Enqueue {
                    items,
                    start_if_idle,
                    session,
                    reply,
                } => {
                    let receipt = match self.check_session(session) {
                        Ok(()) => Ok(self.enqueue(items, start_if_idle).await),
                        Err(e) => Err(e),
                    };
                    let _ = reply.send(receipt);
                }
                Command::Kick { session, reply } => {
                    let started = match self.check_session(session) {
                        Ok(()) => Ok(self.kick().await.started),
                        Err(e) => Err(e),
                    };
                    let _ = reply.send(started);
                }
                Command::BeginIngest { reply } => {
                    self.ingests += 1;
                    let _ = reply.send(self.session);
                }
                Command::EndIngest { session } => {
                    if session == self.session {
                        self.ingests = self.ingests.saturating_sub(1);
                    }
                }
                Command::TrackEnded { generation, error } => self.on_track_end(generation, error),
                Command::Advance { generation } => self.advance(generation).await,
                Command::Pause { reply } => {
                    let _ = reply.send(self.pause().await);
                }
                Command::Resume { reply } => {
                    let _ = reply.send(self.resume().await);
                }
                Command::Skip { reply } => {
                    let _ = reply.send(self.skip().await);
                }
                Command::Stop { reply } => {
                    let _ = reply.send(self.stop().await);
                }
                Command::Clear { reply } => {
                    let _ = reply.send(self.state.pending.clear());
                }
                Command::Snapshot { reply } => {
                    let _ = reply.send(self.state.snapshot());
                }
                Command::Shutdown => {
                    self.stop().await;
                    break;
                }
            }
        }

        info!("👋 Controlador de reproducción cerrado para guild {}", self.guild_id);
    }

    fn check_session(&self, session: Option<u64>) -> Result<(), TransportError> {
        match session {
            Some(session) if session != self.session => {
                debug!("Carga de una sesión anterior descartada en guild {}", self.guild_id);
                Err(TransportError::SessionEnded)
            }
            _ => Ok(()),
        }
    }

    async fn enqueue(&mut self, items: Vec<QueueItem>, start_if_idle: bool) -> EnqueueReceipt {
        let index = self.state.pending.len();
        for item in items {
            self.state.pending.push_back(item);
        }

        let attempt = if start_if_idle {
            self.kick().await
        } else {
            StartAttempt::default()
        };

        EnqueueReceipt {
            placement: attempt.placement_of(index),
            queued: self.state.pending.len(),
        }
    }

    async fn kick(&mut self) -> StartAttempt {
        if self.state.is_running {
            return StartAttempt::default();
        }
        self.start_next().await
    }

    /// Saca items del frente hasta que uno arranque o la cola se vacíe.
    async fn start_next(&mut self) -> StartAttempt {
        let mut attempt = StartAttempt::default();

        while let Some(item) = self.state.pending.pop_front() {
            match self.start_item(item.clone()).await {
                Ok(()) => {
                    attempt.started = true;
                    return attempt;
                }
                Err(PlaybackError::AlreadyPlaying) => {
                    warn!(
                        "⚠️ El sink ya está reproduciendo en guild {}; {} vuelve al frente",
                        self.guild_id, item.title
                    );
                    self.state.pending.push_front(item);
                    self.state.go_idle();
                    return attempt;
                }
                Err(e) => {
                    error!("❌ No se pudo reproducir {}: {}", item.title, e);
                    attempt.rejected.push(e.clone());
                    self.report_failure(item, e);
                }
            }
        }

        self.state.go_idle();
        attempt
    }

    async fn start_item(&mut self, item: QueueItem) -> Result<(), PlaybackError> {
        if self.sink.is_playing().await {
            return Err(PlaybackError::AlreadyPlaying);
        }

        if self.sink.is_paused().await {
            debug!("⏹️ Deteniendo track en pausa antes de iniciar {}", item.title);
            if let Err(e) = self.sink.stop().await {
                warn!("Error deteniendo el sink en pausa: {}", e);
            }
            tokio::time::sleep(self.timings.settle_delay).await;
        }

        self.generation += 1;
        let notifier = self.completion_notifier(self.generation);
        self.state.begin(item.clone());

        match self.sink.play(&item.stream_url, notifier).await {
            Ok(()) => {
                self.state.phase = PlaybackPhase::Playing;
                info!("🎵 Reproduciendo: {}", item.title);
                self.publish_now_playing(item);
                Ok(())
            }
            Err(e) => {
                self.state.go_idle();
                Err(PlaybackError::SinkRejected(e.0))
            }
        }
    }

    fn completion_notifier(&self, generation: u64) -> CompletionNotifier {
        let mailbox = self.mailbox.clone();
        CompletionNotifier::new(move |error| {
            if let Some(tx) = mailbox.upgrade() {
                let _ = tx.send(Command::TrackEnded { generation, error });
            }
        })
    }

    fn on_track_end(&mut self, generation: u64, error: Option<String>) {
        if let Some(reason) = &error {
            error!("❌ El track terminó con error: {}", reason);
        }

        if generation != self.generation || !self.state.is_running {
            debug!(
                "Finalización ignorada en guild {} (generación {}, actual {})",
                self.guild_id, generation, self.generation
            );
            return;
        }

        self.state.now_playing = None;

        if self.state.pending.is_empty() {
            info!("🔚 Cola terminada en guild {}", self.guild_id);
            self.state.go_idle();
        } else {
            self.state.phase = PlaybackPhase::Starting;
            self.schedule_advance(generation);
        }
    }

    fn schedule_advance(&self, generation: u64) {
        let mailbox = self.mailbox.clone();
        let delay = self.timings.advance_debounce;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(tx) = mailbox.upgrade() {
                let _ = tx.send(Command::Advance { generation });
            }
        });
    }

    async fn advance(&mut self, generation: u64) {
        if generation != self.generation || !self.state.is_running {
            return;
        }

        if self.sink.is_playing().await {
            warn!(
                "⚠️ Audio ajeno en el sink de guild {}; la cola queda en espera",
                self.guild_id
            );
            self.state.go_idle();
            return;
        }

        self.start_next().await;
    }

    async fn pause(&mut self) -> Result<(), TransportError> {
        if !self.sink.is_playing().await {
            return Err(TransportError::NothingPlaying);
        }
        self.sink
            .pause()
            .await
            .map_err(|e| TransportError::Sink(e.0))?;
        self.state.phase = PlaybackPhase::Paused;
        info!("⏸️ Pausado en guild {}", self.guild_id);
        Ok(())
    }

    async fn resume(&mut self) -> Result<(), TransportError> {
        if !self.sink.is_paused().await {
            return Err(TransportError::NothingPaused);
        }
        self.sink
            .resume()
            .await
            .map_err(|e| TransportError::Sink(e.0))?;
        self.state.phase = PlaybackPhase::Playing;
        info!("▶️ Reanudado en guild {}", self.guild_id);
        Ok(())
    }

    async fn skip(&mut self) -> Result<Option<QueueItem>, TransportError> {
        if !self.sink.is_playing().await && !self.sink.is_paused().await {
            return Err(TransportError::NothingPlaying);
        }
        let skipped = self.state.now_playing.clone();
        self.sink
            .stop()
            .await
            .map_err(|e| TransportError::Sink(e.0))?;
        info!("⏭️ Saltado en guild {}", self.guild_id);
        Ok(skipped)
    }

    async fn stop(&mut self) -> StopOutcome {
        let sink_active = self.sink.is_playing().await || self.sink.is_paused().await;
        let was_active = sink_active || self.state.is_running || self.ingests > 0;

        // La finalización que dispare el sink llega con la guild ya ociosa.
        let cleared = self.state.pending.clear();
        self.state.go_idle();
        self.session += 1;
        self.ingests = 0;

        if sink_active {
            if let Err(e) = self.sink.stop().await {
                error!("Error deteniendo el sink: {}", e);
            }
        }

        info!("⏹️ Reproducción detenida en guild {}", self.guild_id);
        StopOutcome {
            was_active,
            cleared,
        }
    }

    fn publish_now_playing(&self, item: QueueItem) {
        let presenter = self.presenter.clone();
        let queued = self.state.pending.len();
        tokio::spawn(async move {
            presenter.now_playing(&item, queued).await;
        });
    }

    fn report_failure(&self, item: QueueItem, error: PlaybackError) {
        let presenter = self.presenter.clone();
        tokio::spawn(async move {
            presenter.playback_failed(&item, &error).await;
        });
    }
}

/// Controladores vivos por guild.
pub struct PlayerRegistry {
    players: DashMap<GuildId, GuildPlayer>,
    timings: PlaybackTimings,
}

impl PlayerRegistry {
    pub fn new(timings: PlaybackTimings) -> Self {
        Self {
            players: DashMap::new(),
            timings,
        }
    }

    pub fn get(&self, guild_id: GuildId) -> Option<GuildPlayer> {
        self.players
            .get(&guild_id)
            .map(|player| player.clone())
            .filter(GuildPlayer::is_alive)
    }

    /// Devuelve el controlador del guild, creándolo con el sink y presenter
    /// que entregue `connect` si no existe o si su tarea terminó.
    pub fn get_or_spawn<F>(&self, guild_id: GuildId, connect: F) -> GuildPlayer
    where
        F: FnOnce() -> (Arc<dyn VoiceSink>, Arc<dyn Presenter>),
    {
        if self
            .players
            .remove_if(&guild_id, |_, player| !player.is_alive())
            .is_some()
        {
            warn!("♻️ Controlador de guild {} terminado; se reemplaza", guild_id);
        }

        self.players
            .entry(guild_id)
            .or_insert_with(|| {
                let (sink, presenter) = connect();
                GuildPlayer::spawn(guild_id, sink, presenter, self.timings)
            })
            .value()
            .clone()
    }

    /// Detiene y descarta el controlador del guild.
    pub fn remove(&self, guild_id: GuildId) -> bool {
        match self.players.remove(&guild_id) {
            Some((_, player)) => {
                player.shutdown();
                info!("🗑️ Controlador eliminado para guild {}", guild_id);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}

/// BeatsCore: single-owner event loop for all client state.
///
/// Owns `ViewState` (and with it the reconciled `PlayerState`), the session
/// store and the dispatcher exclusively.  Everything else talks to it with
/// `CoreEvent` messages: user intents from a front-end, ticks from the
/// poller.  HTTP requests run as tasks in a `JoinSet` and come back to the
/// loop as `Completion`s, so state is only ever mutated here, one event at a
/// time.  The hold flags are the only arbitration between a poll result and
/// a local edit.
///
/// After each event the view is published on a `watch` channel; decibel
/// labels are refreshed through the `LabelBoard`.
use std::future::Future;

use beats_proto::config::Config;
use beats_proto::protocol::{
    Album, Command, EqualizerInfo, NowPlaying, QueueResponse, SessionUser, Song, SongKey,
    ALBUM_QUERY_PREFIX, ARTIST_QUERY_PREFIX,
};
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info, warn};

use crate::api::BeatsApi;
use crate::dispatch::Dispatcher;
use crate::error::{ApiError, ClientError};
use crate::hold::FieldKey;
use crate::labels::{LabelBoard, LabelKey, Refresh};
use crate::player::FieldUpdate;
use crate::poller::Poller;
use crate::session::SessionStore;
use crate::view::ViewState;

// ── Events ────────────────────────────────────────────────────────────────────

/// Something a front-end asks for.
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    /// Pointer pressed on a control.
    BeginGesture(FieldKey),
    /// Pointer moved; ratio along the control, unclamped.
    Drag(FieldKey, f64),
    EndGesture(FieldKey),
    /// Whole gesture in one step.
    Set(FieldUpdate),
    Vote(Song),
    PlayStream(String),
    Pause,
    Skip,
    Search(String),
    SearchAlbum(String),
    RandomSongs,
    Login { username: String, password: String },
    Logout,
    /// Poll now-playing and the queue now instead of waiting for a tick.
    Refresh,
    ValidateSession,
    DismissNotice,
}

/// All inputs into the BeatsCore loop.
#[derive(Debug)]
pub enum CoreEvent {
    Intent(Intent),
    PlayerTick,
    SessionTick,
    Shutdown,
}

/// A finished HTTP request.
#[derive(Debug)]
enum Completion {
    NowPlaying(Result<NowPlaying, ApiError>),
    Queue(Result<QueueResponse, ApiError>),
    Equalizer(Result<EqualizerInfo, ApiError>),
    Songs {
        query: String,
        result: Result<Vec<Song>, ApiError>,
    },
    Albums {
        query: String,
        result: Result<Vec<Album>, ApiError>,
    },
    Random(Result<Vec<Song>, ApiError>),
    Login(Result<String, ApiError>),
    /// Validation of `token`.  Ignored if the session changed meanwhile.
    Session {
        token: String,
        result: Result<SessionUser, ApiError>,
    },
    Logout(Result<(), ApiError>),
    Command {
        command: Command,
        result: Result<(), ApiError>,
    },
}

// ── BeatsCore ─────────────────────────────────────────────────────────────────

pub struct BeatsCore {
    config: Config,
    api: BeatsApi,
    session: SessionStore,
    dispatcher: Dispatcher,
    labels: LabelBoard,
    view: ViewState,
    view_tx: watch::Sender<ViewState>,
    /// In-flight requests.
    tasks: JoinSet<Completion>,
    /// A `now_playing` poll is outstanding.
    polling_player: bool,
    /// A `queue` poll is outstanding.
    polling_queue: bool,
    /// Handed to the poller when the loop starts.
    event_tx: Option<mpsc::Sender<CoreEvent>>,
}

impl BeatsCore {
    pub fn new(config: Config, event_tx: mpsc::Sender<CoreEvent>) -> anyhow::Result<Self> {
        let api = BeatsApi::new(&config.backend.base_url)?;
        let session = SessionStore::load(config.session.token_file.clone());
        let dispatcher = Dispatcher::new(&config.equalizer);
        let (view_tx, _) = watch::channel(ViewState::default());
        info!(
            "BeatsCore: backend {} (session {})",
            api.base_url(),
            if session.is_active() { "stored" } else { "none" }
        );

        Ok(Self {
            config,
            api,
            session,
            dispatcher,
            labels: LabelBoard::new(),
            view: ViewState::default(),
            view_tx,
            tasks: JoinSet::new(),
            polling_player: false,
            polling_queue: false,
            event_tx: Some(event_tx),
        })
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn subscribe(&self) -> watch::Receiver<ViewState> {
        self.view_tx.subscribe()
    }

    pub fn labels(&self) -> LabelBoard {
        self.labels.clone()
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Run the core event loop.  Returns the final view when a `Shutdown`
    /// event is received or every sender is gone.
    pub async fn run(mut self, mut event_rx: mpsc::Receiver<CoreEvent>) -> anyhow::Result<ViewState> {
        info!("BeatsCore: starting event loop");
        self.start();
        let poller = self
            .event_tx
            .take()
            .map(|tx| Poller::spawn(&self.config.polling, tx));

        loop {
            tokio::select! {
                evt = event_rx.recv() => match evt {
                    None => {
                        info!("BeatsCore: event channel closed, shutting down");
                        break;
                    }
                    Some(evt) => {
                        if !self.handle_event(evt) {
                            info!("BeatsCore: shutdown requested");
                            break;
                        }
                    }
                },
                Some(joined) = self.tasks.join_next() => {
                    self.handle_joined(joined);
                }
            }
        }

        if let Some(poller) = poller {
            poller.stop().await;
        }
        self.tasks.shutdown().await;
        Ok(self.view)
    }

    /// Start-up sequence: learn the user, fill the song list, load the
    /// equalizer catalogue and take a first player snapshot.
    pub fn start(&mut self) {
        self.request_user();
        self.request_random();
        self.request_equalizer();
        self.refresh_player();
        self.publish();
    }

    /// Process one event.  Returns `false` for `Shutdown`.
    pub fn handle_event(&mut self, evt: CoreEvent) -> bool {
        match evt {
            CoreEvent::Shutdown => return false,
            CoreEvent::Intent(intent) => self.handle_intent(intent),
            CoreEvent::PlayerTick => {
                self.refresh_player();
                self.publish();
            }
            CoreEvent::SessionTick => {
                self.request_user();
                self.publish();
            }
        }
        true
    }

    /// Wait for every in-flight request, including any spawned by the
    /// completions themselves.
    pub async fn settle(&mut self) {
        while let Some(joined) = self.tasks.join_next().await {
            self.handle_joined(joined);
        }
    }

    pub fn in_flight(&self) -> usize {
        self.tasks.len()
    }

    // ── Intents ───────────────────────────────────────────────────────────────

    pub fn handle_intent(&mut self, intent: Intent) {
        debug!("BeatsCore: intent {:?}", intent);
        match intent {
            Intent::BeginGesture(key) => {
                self.dispatcher.begin(&mut self.view, key);
            }
            Intent::Drag(key, ratio) => {
                if self.dispatcher.drag(&mut self.view, key, ratio) {
                    self.refresh_label(key);
                }
            }
            Intent::EndGesture(key) => {
                if let Some(command) = self.dispatcher.end(&mut self.view, key) {
                    self.refresh_label(key);
                    self.submit(command);
                }
            }
            Intent::Set(update) => {
                if let Some(command) = self.dispatcher.set(&mut self.view, update) {
                    self.refresh_label(update.key());
                    self.submit(command);
                }
            }
            Intent::Vote(song) => match self.dispatcher.vote(&self.view, &song) {
                Ok(Command::Enqueue(key)) => self.enqueue(key),
                Ok(command) => {
                    self.submit(command);
                }
                Err(err) => self.view.show_error(&err),
            },
            Intent::PlayStream(url) => {
                let url = url.trim();
                if !url.is_empty() {
                    self.enqueue(SongKey::Url(url.to_string()));
                }
            }
            Intent::Pause => {
                self.submit(Command::Pause);
            }
            Intent::Skip => {
                self.submit(Command::PlayNext);
            }
            Intent::Search(query) => self.request_search(query),
            Intent::SearchAlbum(album) => {
                if !album.trim().is_empty() {
                    self.request_search(format!("{}{}", ALBUM_QUERY_PREFIX, album.trim()));
                }
            }
            Intent::RandomSongs => self.request_random(),
            Intent::Login { username, password } => {
                let api = self.api.clone();
                self.spawn(async move { Completion::Login(api.login(&username, &password).await) });
            }
            Intent::Logout => match self.session.token() {
                Some(token) => {
                    let token = token.to_string();
                    let api = self.api.clone();
                    self.spawn(async move { Completion::Logout(api.logout(&token).await) });
                }
                None => self.view.user = None,
            },
            Intent::Refresh => self.refresh_player(),
            Intent::ValidateSession => self.request_user(),
            Intent::DismissNotice => {
                self.view.dismiss_notice();
                self.view.login_prompt = false;
            }
        }
        self.publish();
    }

    fn refresh_label(&self, key: FieldKey) {
        if let Some(label) = LabelKey::for_field(key) {
            self.labels.refresh(&self.view.player, Refresh::One(label));
        }
    }

    /// Without authentication turned off, an action needs a stored session.
    /// Raises the login prompt and returns `false` when there is none.
    fn ensure_login(&mut self) -> bool {
        if !self.config.backend.auth_required || self.session.is_active() {
            return true;
        }
        debug!("BeatsCore: no session, prompting for login");
        self.view.show_error(&ClientError::AuthRequired);
        false
    }

    /// Send an authenticated command.  Returns `false` if it was blocked.
    fn submit(&mut self, command: Command) -> bool {
        if !self.ensure_login() {
            return false;
        }
        let token = self.session.token().unwrap_or_default().to_string();
        let api = self.api.clone();
        info!("BeatsCore: command {:?}", command);
        self.spawn(async move {
            let result = api.send(&token, &command).await;
            Completion::Command { command, result }
        });
        true
    }

    fn enqueue(&mut self, key: SongKey) {
        if self.submit(Command::Enqueue(key.clone())) {
            self.view.pending_votes.insert(key);
        }
    }

    // ── Requests ──────────────────────────────────────────────────────────────

    fn spawn<F>(&mut self, request: F)
    where
        F: Future<Output = Completion> + Send + 'static,
    {
        self.tasks.spawn(request);
    }

    /// Poll now-playing and the queue.  A poll still waiting for its answer
    /// is not sent again.
    fn refresh_player(&mut self) {
        if self.polling_player {
            debug!("BeatsCore: now_playing poll outstanding, skipped");
        } else {
            self.polling_player = true;
            let api = self.api.clone();
            self.spawn(async move { Completion::NowPlaying(api.now_playing().await) });
        }

        if self.polling_queue {
            debug!("BeatsCore: queue poll outstanding, skipped");
        } else {
            self.polling_queue = true;
            let api = self.api.clone();
            let user = self.view.user.as_ref().map(|u| u.name.clone());
            self.spawn(async move { Completion::Queue(api.queue(user.as_deref()).await) });
        }
    }

    fn request_equalizer(&mut self) {
        let api = self.api.clone();
        self.spawn(async move { Completion::Equalizer(api.equalizer_info().await) });
    }

    fn request_random(&mut self) {
        let api = self.api.clone();
        self.spawn(async move { Completion::Random(api.random_songs().await) });
    }

    fn request_search(&mut self, query: String) {
        let query = query.trim().to_string();
        if query.is_empty() {
            self.request_random();
            return;
        }
        let api = self.api.clone();
        if query.starts_with(ARTIST_QUERY_PREFIX) {
            self.spawn(async move {
                let result = api.search_albums(&query).await;
                Completion::Albums { query, result }
            });
        } else {
            self.spawn(async move {
                let result = api.search_songs(&query).await;
                Completion::Songs { query, result }
            });
        }
    }

    /// Re-validate the stored token.  With no token the user is simply
    /// cleared and nothing is sent.
    fn request_user(&mut self) {
        let Some(token) = self.session.token().map(str::to_string) else {
            self.view.user = None;
            return;
        };
        let api = self.api.clone();
        self.spawn(async move {
            let result = api.validate(&token).await;
            Completion::Session { token, result }
        });
    }

    // ── Completions ───────────────────────────────────────────────────────────

    fn handle_joined(&mut self, joined: Result<Completion, JoinError>) {
        match joined {
            Ok(completion) => self.handle_completion(completion),
            Err(e) if e.is_cancelled() => debug!("BeatsCore: request cancelled"),
            Err(e) => {
                error!("BeatsCore: request task failed: {}", e);
                // Which request died is unknown; let the next tick poll again.
                self.polling_player = false;
                self.polling_queue = false;
            }
        }
        self.publish();
    }

    fn handle_completion(&mut self, completion: Completion) {
        match &completion {
            Completion::NowPlaying(_) => self.polling_player = false,
            Completion::Queue(_) => self.polling_queue = false,
            _ => {}
        }
        match completion {
            Completion::NowPlaying(Ok(snapshot)) => {
                if self.view.player.apply_now_playing(&snapshot) {
                    self.labels.refresh(&self.view.player, Refresh::All);
                }
                self.view.media = snapshot.media;
            }
            Completion::Queue(Ok(queue)) => self.view.apply_queue(queue),
            Completion::Equalizer(Ok(info)) => {
                self.view.apply_equalizer_info(info);
                self.labels.refresh(&self.view.player, Refresh::All);
            }
            Completion::NowPlaying(Err(e))
            | Completion::Queue(Err(e))
            | Completion::Equalizer(Err(e)) => {
                warn!("BeatsCore: player poll failed: {}", e);
            }

            Completion::Songs { query, result } => match result {
                Ok(songs) => self.view.apply_songs(&query, songs),
                Err(e) => self.request_failed("search", &e),
            },
            Completion::Albums { query, result } => match result {
                Ok(albums) => self.view.apply_albums(&query, albums),
                Err(e) => self.request_failed("artist search", &e),
            },
            Completion::Random(result) => match result {
                Ok(songs) => self.view.apply_songs("", songs),
                Err(e) => self.request_failed("random songs", &e),
            },

            Completion::Login(result) => match result {
                Ok(token) => {
                    info!("BeatsCore: login succeeded");
                    if let Err(e) = self.session.set(token) {
                        error!("BeatsCore: could not store session: {:#}", e);
                    }
                    self.view.login_prompt = false;
                    self.request_user();
                }
                Err(e) => {
                    warn!("BeatsCore: login failed: {}", e);
                    self.view.show_error(&ClientError::from_login_failure(&e));
                }
            },
            Completion::Session { token, result } => {
                if self.session.token() != Some(token.as_str()) {
                    debug!("BeatsCore: stale session validation ignored");
                    return;
                }
                match result {
                    Ok(user) => {
                        if self.view.user.as_ref() != Some(&user) {
                            info!("BeatsCore: logged in as {}", user.name);
                        }
                        self.view.user = Some(user);
                        self.view.login_prompt = false;
                    }
                    Err(e) if e.is_session_invalid() => {
                        info!("BeatsCore: session no longer valid");
                        self.expire_session();
                    }
                    Err(e) => warn!("BeatsCore: session check failed: {}", e),
                }
            }
            Completion::Logout(result) => match result {
                Ok(()) => {
                    info!("BeatsCore: logged out");
                    self.clear_session();
                    self.refresh_player();
                }
                Err(e) => self.request_failed("logout", &e),
            },

            Completion::Command { command, result } => match result {
                Ok(()) => {
                    debug!("BeatsCore: {:?} accepted", command);
                    if matches!(
                        command,
                        Command::Enqueue(_) | Command::Pause | Command::PlayNext
                    ) {
                        self.refresh_player();
                    }
                }
                Err(e) => {
                    warn!("BeatsCore: {:?} failed: {}", command, e);
                    match ClientError::from_command_failure(&e) {
                        ClientError::SessionExpired => self.expire_session(),
                        kind => self.view.show_error(&kind),
                    }
                }
            },
        }
    }

    fn request_failed(&mut self, what: &str, err: &ApiError) {
        warn!("BeatsCore: {} failed: {}", what, err);
        self.view.show_error(&ClientError::RequestFailed);
    }

    fn clear_session(&mut self) {
        if let Err(e) = self.session.clear() {
            error!("BeatsCore: could not remove session file: {:#}", e);
        }
        self.view.user = None;
    }

    fn expire_session(&mut self) {
        self.clear_session();
        self.view.show_error(&ClientError::SessionExpired);
    }

    fn publish(&self) {
        self.view_tx.send_replace(self.view.clone());
    }
}

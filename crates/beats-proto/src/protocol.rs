use serde::{Deserialize, Serialize};
use std::fmt;

/// `player_status.state` value reported while audio is playing.
pub const STATE_PLAYING: &str = "State.Playing";

/// Query prefix that makes the search endpoint return albums instead of songs.
pub const ARTIST_QUERY_PREFIX: &str = "artist:";

/// Query prefix used when browsing into a single album.
pub const ALBUM_QUERY_PREFIX: &str = "album:";

/// Read-only backend routes.
pub mod routes {
    pub const SEARCH: &str = "/v1/songs/search";
    pub const RANDOM: &str = "/v1/songs/random";
    pub const EQUALIZER: &str = "/v1/player/equalizer";
    pub const NOW_PLAYING: &str = "/v1/now_playing";
    pub const QUEUE: &str = "/v1/queue";
    pub const SESSION: &str = "/v1/session";
}

// ── Songs & queue ─────────────────────────────────────────────────────────────

/// Identity of a song.  Catalogue songs have an `id`; streamed songs only
/// have the `url` they were queued from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SongKey {
    Id(u64),
    Url(String),
}

impl fmt::Display for SongKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SongKey::Id(id) => write!(f, "#{}", id),
            SongKey::Url(url) => write!(f, "{}", url),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Song {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub artist: String,
    #[serde(default)]
    pub album: String,
    /// Length in seconds.
    #[serde(default)]
    pub length: f64,
    #[serde(default)]
    pub art_uri: Option<String>,
}

impl Song {
    /// Preferred identity: the catalogue id when present, else the stream URL.
    pub fn key(&self) -> Option<SongKey> {
        match (&self.id, &self.url) {
            (Some(id), _) => Some(SongKey::Id(*id)),
            (None, Some(url)) => Some(SongKey::Url(url.clone())),
            (None, None) => None,
        }
    }

    /// True when both songs share an id, or both share a URL.
    pub fn same_song(&self, other: &Song) -> bool {
        let by_id = matches!((self.id, other.id), (Some(a), Some(b)) if a == b);
        let by_url = matches!((&self.url, &other.url), (Some(a), Some(b)) if a == b);
        by_id || by_url
    }

    /// True when this song is identified by `key`.
    pub fn matches_key(&self, key: &SongKey) -> bool {
        match key {
            SongKey::Id(id) => self.id == Some(*id),
            SongKey::Url(url) => self.url.as_deref() == Some(url.as_str()),
        }
    }
}

/// Per-viewer voting details attached to a queue entry.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct VotePacket {
    #[serde(default)]
    pub has_voted: bool,
    #[serde(default)]
    pub num_votes: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct QueueEntry {
    #[serde(flatten)]
    pub song: Song,
    #[serde(default)]
    pub packet: VotePacket,
}

/// `GET /v1/queue` body.  `position` indexes the entry currently playing;
/// everything before it has already been played.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct QueueResponse {
    pub queue: Vec<QueueEntry>,
    #[serde(default)]
    pub position: usize,
}

impl QueueResponse {
    /// Entries from the playing one onwards.
    pub fn into_upcoming(mut self) -> Vec<QueueEntry> {
        let start = self.position.min(self.queue.len());
        self.queue.split_off(start)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Album {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub artist: String,
    #[serde(default)]
    pub art_uri: Option<String>,
}

/// Search and random endpoints wrap their lists in `results`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse<T> {
    pub results: Vec<T>,
}

// ── Player ────────────────────────────────────────────────────────────────────

/// `GET /v1/player/equalizer` body.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct EqualizerInfo {
    #[serde(default)]
    pub equalizer_supported: bool,
    #[serde(default)]
    pub equalizer_preset_names: Vec<String>,
    /// Band centre frequencies in Hz, ordered by band index.
    #[serde(default)]
    pub equalizer_band_freqs: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Media {
    /// Length in seconds.
    #[serde(default)]
    pub length: f64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub artist: String,
}

/// Player status.  The equalizer fields are only present when the backend's
/// player supports an equalizer.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct PlayerStatus {
    /// Playback position in milliseconds.
    #[serde(default)]
    pub current_time: f64,
    #[serde(default)]
    pub volume: f64,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub equalizer_enabled: Option<bool>,
    #[serde(default)]
    pub equalizer_preset: Option<usize>,
    #[serde(default)]
    pub equalizer_preamp_level: Option<f64>,
    #[serde(default)]
    pub equalizer_band_levels: Option<Vec<f64>>,
}

impl PlayerStatus {
    pub fn is_playing(&self) -> bool {
        self.state == STATE_PLAYING
    }
}

/// `GET /v1/now_playing` body.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct NowPlaying {
    #[serde(default)]
    pub media: Option<Media>,
    #[serde(default)]
    pub player_status: PlayerStatus,
}

impl NowPlaying {
    /// `(position, duration)` in seconds; both zero when nothing is loaded.
    pub fn timeline_secs(&self) -> (f64, f64) {
        match &self.media {
            Some(media) => (self.player_status.current_time / 1000.0, media.length),
            None => (0.0, 0.0),
        }
    }
}

// ── Session ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SessionUser {
    pub name: String,
}

/// `GET /v1/session/<token>` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionInfo {
    pub user: SessionUser,
}

// ── Commands ──────────────────────────────────────────────────────────────────

/// Authenticated player/queue commands.  Each one is a form-encoded POST; the
/// session token is added by the transport.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    EnableEqualizer { enabled: bool },
    AdjustPreset { index: usize },
    AdjustPreamp { level: f64 },
    AdjustBand { band: usize, level: f64 },
    Volume { volume: u8 },
    Pause,
    PlayNext,
    Enqueue(SongKey),
}

impl Command {
    pub fn endpoint(&self) -> &'static str {
        match self {
            Command::EnableEqualizer { .. } => "/v1/player/equalizer/enable",
            Command::AdjustPreset { .. } => "/v1/player/equalizer/adjust_preset",
            Command::AdjustPreamp { .. } => "/v1/player/equalizer/adjust_preamp",
            Command::AdjustBand { .. } => "/v1/player/equalizer/adjust_band",
            Command::Volume { .. } => "/v1/player/volume",
            Command::Pause => "/v1/player/pause",
            Command::PlayNext => "/v1/player/play_next",
            Command::Enqueue(_) => "/v1/queue/add",
        }
    }

    /// Form fields, excluding the token.
    pub fn form(&self) -> Vec<(&'static str, String)> {
        match self {
            Command::EnableEqualizer { enabled } => vec![("enabled", enabled.to_string())],
            Command::AdjustPreset { index } => vec![("index", index.to_string())],
            Command::AdjustPreamp { level } => vec![("level", level.to_string())],
            Command::AdjustBand { band, level } => {
                vec![("band", band.to_string()), ("level", level.to_string())]
            }
            Command::Volume { volume } => vec![("volume", volume.to_string())],
            Command::Pause | Command::PlayNext => Vec::new(),
            Command::Enqueue(SongKey::Id(id)) => vec![("id", id.to_string())],
            Command::Enqueue(SongKey::Url(url)) => vec![("url", url.clone())],
        }
    }
}

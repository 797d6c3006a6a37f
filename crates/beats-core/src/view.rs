//! ViewState: everything a front-end renders.
//!
//! Owned and written only by `BeatsCore`; front-ends receive clones through
//! a `watch` channel.

use std::collections::HashSet;

use beats_proto::protocol::{
    Album, EqualizerInfo, Media, QueueEntry, QueueResponse, SessionUser, Song, SongKey,
};

use crate::error::ClientError;
use crate::player::PlayerState;

/// Which listing the browse pane shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Layout {
    #[default]
    SongList,
    AlbumGrid,
}

/// Queue status of a song as shown next to it in listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SongBadge {
    Playing,
    /// The backend reports this session already voted for it.
    Voted,
    /// A vote was sent but the queue has not confirmed it yet.
    Pending,
    Votable,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EqualizerCatalog {
    pub supported: bool,
    pub presets: Vec<String>,
    /// Band centre frequencies in Hz, by band index.
    pub band_frequencies: Vec<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct ViewState {
    pub player: PlayerState,
    /// Track metadata from the last now-playing poll.
    pub media: Option<Media>,
    pub equalizer: EqualizerCatalog,
    /// Upcoming queue; entry 0 is playing.
    pub queue: Vec<QueueEntry>,

    // ── Browse ───────────────────────────────────────────────────────────────
    pub layout: Layout,
    pub songs: Vec<Song>,
    pub albums: Vec<Album>,
    pub search_text: String,
    pub pending_votes: HashSet<SongKey>,

    // ── Session / notices ────────────────────────────────────────────────────
    pub user: Option<SessionUser>,
    pub notice: Option<String>,
    /// Set when an action needed a session and there was none.
    pub login_prompt: bool,
}

impl ViewState {
    /// A song can be voted for unless it is playing or this session already
    /// voted for it.
    pub fn is_song_votable(&self, song: &Song) -> bool {
        for (index, entry) in self.queue.iter().enumerate() {
            if entry.song.same_song(song) && (index == 0 || entry.packet.has_voted) {
                return false;
            }
        }
        true
    }

    pub fn song_badge(&self, song: &Song) -> SongBadge {
        if self.queue.first().is_some_and(|e| e.song.same_song(song)) {
            return SongBadge::Playing;
        }
        if self
            .queue
            .iter()
            .any(|e| e.packet.has_voted && e.song.same_song(song))
        {
            return SongBadge::Voted;
        }
        match song.key() {
            Some(key) if self.pending_votes.contains(&key) => SongBadge::Pending,
            _ => SongBadge::Votable,
        }
    }

    /// Replace the queue with the unplayed part of `resp`.  Pending votes the
    /// backend now reports as voted are dropped.
    pub fn apply_queue(&mut self, resp: QueueResponse) {
        self.queue = resp.into_upcoming();
        let queue = &self.queue;
        self.pending_votes.retain(|key| {
            !queue
                .iter()
                .any(|e| e.packet.has_voted && e.song.matches_key(key))
        });
    }

    pub fn apply_songs(&mut self, search_text: &str, songs: Vec<Song>) {
        self.songs = songs;
        self.layout = Layout::SongList;
        self.search_text = search_text.to_string();
    }

    pub fn apply_albums(&mut self, search_text: &str, albums: Vec<Album>) {
        self.albums = albums;
        self.layout = Layout::AlbumGrid;
        self.search_text = search_text.to_string();
    }

    pub fn apply_equalizer_info(&mut self, info: EqualizerInfo) {
        self.equalizer.supported = info.equalizer_supported;
        if !info.equalizer_supported {
            return;
        }
        self.equalizer.presets = info.equalizer_preset_names;
        for band in 0..info.equalizer_band_freqs.len() {
            self.player.ensure_band(band);
        }
        self.equalizer.band_frequencies = info.equalizer_band_freqs;
    }

    /// Surface an error.  Silent kinds leave the notice untouched.
    pub fn show_error(&mut self, err: &ClientError) {
        if *err == ClientError::AuthRequired {
            self.login_prompt = true;
        }
        if let Some(message) = err.notice() {
            self.notice = Some(message);
        }
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }
}

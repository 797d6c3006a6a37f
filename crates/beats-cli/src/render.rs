//! Plain-text rendering of the view for the terminal.

use beats_core::view::{Layout, SongBadge, ViewState};
use beats_proto::format::{format_db, format_duration, format_frequency};
use beats_proto::protocol::{Album, Song};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

const TITLE_MAX: usize = 40;
const NAME_MAX: usize = 24;

pub fn badge_mark(badge: SongBadge) -> &'static str {
    match badge {
        SongBadge::Playing => "▶",
        SongBadge::Voted => "✓",
        SongBadge::Pending => "…",
        SongBadge::Votable => " ",
    }
}

/// Cut `text` to at most `max` columns, marking the cut with `…`.
pub fn truncate(text: &str, max: usize) -> String {
    if text.width() <= max {
        return text.to_string();
    }
    let mut out = String::new();
    let mut used = 0;
    for c in text.chars() {
        let w = c.width().unwrap_or(0);
        if used + w + 1 > max {
            break;
        }
        out.push(c);
        used += w;
    }
    out.push('…');
    out
}

fn pad(text: &str, width: usize) -> String {
    let w = text.width();
    if w >= width {
        text.to_string()
    } else {
        format!("{}{}", text, " ".repeat(width - w))
    }
}

/// Lay rows out in columns sized to their widest cell.  The last column is
/// not padded.
pub fn table(rows: &[Vec<String>]) -> String {
    let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
    let mut widths = vec![0; columns];
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.width());
        }
    }
    let mut out = String::new();
    for row in rows {
        let last = row.len().saturating_sub(1);
        let line: Vec<String> = row
            .iter()
            .enumerate()
            .map(|(i, cell)| if i == last { cell.clone() } else { pad(cell, widths[i]) })
            .collect();
        out.push_str(line.join("  ").trim_end());
        out.push('\n');
    }
    out
}

pub fn status_line(view: &ViewState) -> String {
    let player = &view.player;
    let state = if player.is_playing { "▶" } else { "⏸" };
    let track = match &view.media {
        Some(media) if !media.artist.is_empty() => format!("{} - {}", media.title, media.artist),
        Some(media) => media.title.clone(),
        None => "nothing playing".to_string(),
    };
    format!(
        "{} {}  {}/{}  vol {}",
        state,
        track,
        format_duration(player.playback_time),
        format_duration(player.playback_duration),
        player.volume().round()
    )
}

pub fn queue_table(view: &ViewState) -> String {
    if view.queue.is_empty() {
        return "queue is empty\n".to_string();
    }
    let rows: Vec<Vec<String>> = view
        .queue
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            vec![
                if i == 0 { "now".to_string() } else { i.to_string() },
                badge_mark(view.song_badge(&entry.song)).to_string(),
                truncate(&song_title(&entry.song), TITLE_MAX),
                truncate(&entry.song.artist, NAME_MAX),
                format!("{} votes", entry.packet.num_votes),
            ]
        })
        .collect();
    table(&rows)
}

fn song_title(song: &Song) -> String {
    if song.title.is_empty() {
        song.url.clone().unwrap_or_default()
    } else {
        song.title.clone()
    }
}

/// Numbered listing; the numbers are what `vote <n>` refers to.
pub fn song_table(view: &ViewState) -> String {
    if view.songs.is_empty() {
        return "no songs\n".to_string();
    }
    let rows: Vec<Vec<String>> = view
        .songs
        .iter()
        .enumerate()
        .map(|(i, song)| {
            vec![
                format!("{}.", i + 1),
                badge_mark(view.song_badge(song)).to_string(),
                truncate(&song_title(song), TITLE_MAX),
                truncate(&song.artist, NAME_MAX),
                truncate(&song.album, NAME_MAX),
                format_duration(song.length),
            ]
        })
        .collect();
    table(&rows)
}

pub fn album_table(albums: &[Album]) -> String {
    if albums.is_empty() {
        return "no albums\n".to_string();
    }
    let rows: Vec<Vec<String>> = albums
        .iter()
        .enumerate()
        .map(|(i, album)| {
            vec![
                format!("{}.", i + 1),
                truncate(&album.name, TITLE_MAX),
                truncate(&album.artist, NAME_MAX),
            ]
        })
        .collect();
    table(&rows)
}

pub fn listing(view: &ViewState) -> String {
    match view.layout {
        Layout::SongList => song_table(view),
        Layout::AlbumGrid => album_table(&view.albums),
    }
}

pub fn equalizer(view: &ViewState) -> String {
    if !view.equalizer.supported {
        return "equalizer not supported\n".to_string();
    }
    let player = &view.player;
    let preset = view
        .equalizer
        .presets
        .get(player.eq_preset())
        .map(String::as_str)
        .unwrap_or("?");
    let mut rows = vec![
        vec![
            "enabled".to_string(),
            if player.eq_enabled() { "on" } else { "off" }.to_string(),
        ],
        vec!["preset".to_string(), format!("{} ({})", preset, player.eq_preset())],
        vec!["preamp".to_string(), format_db(player.preamp())],
    ];
    for (band, level) in player.band_levels() {
        let freq = view
            .equalizer
            .band_frequencies
            .get(band)
            .map(|hz| format_frequency(*hz))
            .unwrap_or_else(|| "?".to_string());
        rows.push(vec![format!("band {}", band), freq, format_db(level)]);
    }
    table(&rows)
}

pub fn presets(view: &ViewState) -> String {
    let rows: Vec<Vec<String>> = view
        .equalizer
        .presets
        .iter()
        .enumerate()
        .map(|(i, name)| vec![i.to_string(), name.clone()])
        .collect();
    table(&rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use beats_proto::protocol::{Media, QueueEntry};

    #[test]
    fn test_table_pads_by_display_width() {
        let rows = vec![
            vec!["1.".to_string(), "日本".to_string(), "x".to_string()],
            vec!["10.".to_string(), "ab".to_string(), "y".to_string()],
        ];
        let out = table(&rows);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "1.   日本  x");
        assert_eq!(lines[1], "10.  ab    y");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghij", 5), "abcd…");
        assert_eq!(truncate("日本語テキスト", 5), "日本…");
    }

    #[test]
    fn test_status_line() {
        let mut view = ViewState::default();
        assert!(status_line(&view).contains("nothing playing"));
        view.media = Some(Media {
            length: 200.0,
            title: "Song".into(),
            artist: "Band".into(),
        });
        view.player.playback_time = 65.0;
        view.player.playback_duration = 200.0;
        view.player.is_playing = true;
        assert_eq!(status_line(&view), "▶ Song - Band  1:05/3:20  vol 0");
    }

    #[test]
    fn test_queue_marks_playing_entry() {
        let view = ViewState {
            queue: vec![QueueEntry {
                song: Song {
                    id: Some(1),
                    title: "Now".into(),
                    ..Default::default()
                },
                ..Default::default()
            }],
            ..Default::default()
        };
        let out = queue_table(&view);
        assert!(out.starts_with("now  ▶  Now"));
    }
}

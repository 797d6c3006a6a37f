//! Interactive watch mode: follows the player and reads commands from stdin.

use beats_core::labels::{LabelBoard, LabelKey};
use beats_core::view::{Layout, ViewState};
use beats_core::{BeatsCore, CoreEvent, FieldUpdate, Intent};
use beats_proto::config::Config;
use beats_proto::format::format_frequency;
use beats_proto::protocol::{QueueEntry, ARTIST_QUERY_PREFIX};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, watch};
use tracing::info;

use crate::render;

pub const HELP: &str = "\
commands:
  status                    now playing and volume
  queue                     upcoming songs
  list                      last search results
  search <query>            search songs (empty: random)
  artist <name>             albums by an artist
  album <name|n>            songs on an album
  random                    random songs
  vote <n>                  vote for song n of the listing
  stream <url>              queue a stream URL
  volume <0-100>            set the volume
  pause | skip              transport
  eq                        equalizer state
  eq on|off                 enable or disable the equalizer
  eq presets                list presets
  eq preset <i>             select a preset
  eq preamp <db>            set the preamp
  eq band <i> <db>          set one band
  login <user> <password>   start a session
  logout | whoami           session
  refresh                   poll now
  help | quit
";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Show {
    Status,
    Queue,
    Listing,
    Equalizer,
    Presets,
    User,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    Intent(Intent),
    Show(Show),
    Help,
    Quit,
    Nothing,
}

fn number<T: std::str::FromStr>(arg: Option<&str>, what: &str) -> Result<T, String> {
    let arg = arg.ok_or_else(|| format!("missing {}", what))?;
    arg.parse()
        .map_err(|_| format!("not a valid {}: {}", what, arg))
}

/// Parse one input line against the current view (listing numbers refer to
/// what is on screen).
pub fn parse(line: &str, view: &ViewState) -> Result<Input, String> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };
    let mut args = rest.split_whitespace();

    let input = match word {
        "" => Input::Nothing,
        "help" | "?" => Input::Help,
        "quit" | "exit" | "q" => Input::Quit,
        "status" => Input::Show(Show::Status),
        "queue" => Input::Show(Show::Queue),
        "list" => Input::Show(Show::Listing),
        "whoami" => Input::Show(Show::User),
        "search" => Input::Intent(Intent::Search(rest.to_string())),
        "artist" if !rest.is_empty() => {
            Input::Intent(Intent::Search(format!("{}{}", ARTIST_QUERY_PREFIX, rest)))
        }
        "album" if !rest.is_empty() => {
            let picked = match (view.layout, rest.parse::<usize>()) {
                (Layout::AlbumGrid, Ok(n)) => n
                    .checked_sub(1)
                    .and_then(|i| view.albums.get(i))
                    .map(|album| album.name.clone()),
                _ => None,
            };
            Input::Intent(Intent::SearchAlbum(picked.unwrap_or_else(|| rest.to_string())))
        }
        "artist" | "album" => return Err(format!("usage: {} <name>", word)),
        "random" => Input::Intent(Intent::RandomSongs),
        "vote" => {
            let n: usize = number(args.next(), "song number")?;
            let song = n
                .checked_sub(1)
                .and_then(|i| view.songs.get(i))
                .ok_or_else(|| format!("no song {} in the listing", n))?;
            Input::Intent(Intent::Vote(song.clone()))
        }
        "stream" if !rest.is_empty() => Input::Intent(Intent::PlayStream(rest.to_string())),
        "stream" => return Err("usage: stream <url>".to_string()),
        "volume" => Input::Intent(Intent::Set(FieldUpdate::Volume(number(
            args.next(),
            "volume",
        )?))),
        "pause" => Input::Intent(Intent::Pause),
        "skip" | "next" => Input::Intent(Intent::Skip),
        "login" => {
            let (Some(username), Some(password)) = (args.next(), args.next()) else {
                return Err("usage: login <user> <password>".to_string());
            };
            Input::Intent(Intent::Login {
                username: username.to_string(),
                password: password.to_string(),
            })
        }
        "logout" => Input::Intent(Intent::Logout),
        "refresh" => Input::Intent(Intent::Refresh),
        "eq" => match args.next() {
            None => Input::Show(Show::Equalizer),
            Some("on") => Input::Intent(Intent::Set(FieldUpdate::EqEnabled(true))),
            Some("off") => Input::Intent(Intent::Set(FieldUpdate::EqEnabled(false))),
            Some("presets") => Input::Show(Show::Presets),
            Some("preset") => {
                Input::Intent(Intent::Set(FieldUpdate::EqPreset(number(args.next(), "preset")?)))
            }
            Some("preamp") => {
                Input::Intent(Intent::Set(FieldUpdate::Preamp(number(args.next(), "level")?)))
            }
            Some("band") => {
                let band = number(args.next(), "band")?;
                let level = number(args.next(), "level")?;
                Input::Intent(Intent::Set(FieldUpdate::Band(band, level)))
            }
            Some(other) => return Err(format!("unknown eq command: {}", other)),
        },
        other => return Err(format!("unknown command: {} (try `help`)", other)),
    };
    Ok(input)
}

pub fn show(what: Show, view: &ViewState) -> String {
    match what {
        Show::Status => format!("{}\n", render::status_line(view)),
        Show::Queue => render::queue_table(view),
        Show::Listing => render::listing(view),
        Show::Equalizer => render::equalizer(view),
        Show::Presets => render::presets(view),
        Show::User => match &view.user {
            Some(user) => format!("logged in as {}\n", user.name),
            None => "not logged in\n".to_string(),
        },
    }
}

/// Prints what changed between successive views.
pub struct Printer {
    labels: LabelBoard,
    label_rx: Vec<(LabelKey, watch::Receiver<String>)>,
    status: Option<(String, bool, i64)>,
    queue: Vec<QueueEntry>,
    listing: Option<(Layout, String, usize, usize)>,
    user: Option<String>,
}

impl Printer {
    pub fn new(labels: LabelBoard) -> Self {
        Self {
            labels,
            label_rx: Vec::new(),
            status: None,
            queue: Vec::new(),
            listing: None,
            user: None,
        }
    }

    /// Render the changes in `view` to a string.  The flag is set when a
    /// notice or login prompt was shown and should be dismissed.
    pub fn update(&mut self, view: &ViewState) -> (String, bool) {
        let mut out = String::new();

        let status = (
            view.media.as_ref().map(|m| m.title.clone()).unwrap_or_default(),
            view.player.is_playing,
            view.player.volume().round() as i64,
        );
        if self.status.as_ref() != Some(&status) {
            self.status = Some(status);
            out.push_str(&render::status_line(view));
            out.push('\n');
        }

        if self.queue != view.queue {
            self.queue = view.queue.clone();
            out.push_str(&render::queue_table(view));
        }

        let listing = (
            view.layout,
            view.search_text.clone(),
            view.songs.len(),
            view.albums.len(),
        );
        if self.listing.as_ref() != Some(&listing) {
            self.listing = Some(listing);
            out.push_str(&render::listing(view));
        }

        let user = view.user.as_ref().map(|u| u.name.clone());
        if self.user != user {
            match &user {
                Some(name) => out.push_str(&format!("logged in as {}\n", name)),
                None if self.user.is_some() => out.push_str("logged out\n"),
                None => {}
            }
            self.user = user;
        }

        out.push_str(&self.label_changes(view));

        let mut dismiss = false;
        if let Some(notice) = &view.notice {
            out.push_str(&format!("! {}\n", notice));
            dismiss = true;
        }
        if view.login_prompt {
            out.push_str("login required: login <user> <password>\n");
            dismiss = true;
        }
        (out, dismiss)
    }

    /// Decibel labels that changed since the last update.
    fn label_changes(&mut self, view: &ViewState) -> String {
        if !view.equalizer.supported {
            return String::new();
        }
        // Subscribing renders the current text, so labels first seen after
        // the start-up refresh still print.
        if self.label_rx.is_empty() {
            let rx = self.labels.subscribe_current(LabelKey::Preamp, &view.player);
            self.label_rx.push((LabelKey::Preamp, rx));
        }
        while self.label_rx.len() <= view.equalizer.band_frequencies.len() {
            let key = LabelKey::Band(self.label_rx.len() - 1);
            let rx = self.labels.subscribe_current(key, &view.player);
            self.label_rx.push((key, rx));
        }

        let mut out = String::new();
        for (key, rx) in self.label_rx.iter_mut() {
            if !rx.has_changed().unwrap_or(false) {
                continue;
            }
            let text = rx.borrow_and_update().clone();
            match key {
                LabelKey::Preamp => out.push_str(&format!("eq preamp {}\n", text)),
                LabelKey::Band(band) => {
                    let freq = view
                        .equalizer
                        .band_frequencies
                        .get(*band)
                        .map(|hz| format_frequency(*hz))
                        .unwrap_or_default();
                    out.push_str(&format!("eq band {} ({}) {}\n", band, freq, text));
                }
            }
        }
        out
    }
}

pub async fn watch(config: Config) -> anyhow::Result<()> {
    let (event_tx, event_rx) = mpsc::channel::<CoreEvent>(256);
    let core = BeatsCore::new(config, event_tx.clone())?;
    let mut view_rx = core.subscribe();
    let mut printer = Printer::new(core.labels());
    let core_task = tokio::spawn(core.run(event_rx));

    println!("beats: type `help` for commands");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                let view = view_rx.borrow().clone();
                match parse(&line, &view) {
                    Ok(Input::Quit) => break,
                    Ok(Input::Intent(intent)) => {
                        if event_tx.send(CoreEvent::Intent(intent)).await.is_err() {
                            break;
                        }
                    }
                    Ok(Input::Show(what)) => print!("{}", show(what, &view)),
                    Ok(Input::Help) => print!("{}", HELP),
                    Ok(Input::Nothing) => {}
                    Err(msg) => println!("{}", msg),
                }
            }
            changed = view_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let view = view_rx.borrow_and_update().clone();
                let (out, dismiss) = printer.update(&view);
                print!("{}", out);
                if dismiss {
                    let _ = event_tx
                        .send(CoreEvent::Intent(Intent::DismissNotice))
                        .await;
                }
            }
        }
    }

    info!("watch: leaving");
    let _ = event_tx.send(CoreEvent::Shutdown).await;
    core_task.await??;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use beats_core::labels::Refresh;
    use beats_proto::protocol::{Album, Song};

    fn view_with_songs() -> ViewState {
        ViewState {
            songs: vec![
                Song {
                    id: Some(4),
                    title: "Four".into(),
                    ..Default::default()
                },
                Song {
                    id: Some(5),
                    title: "Five".into(),
                    ..Default::default()
                },
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_vote_by_listing_number() {
        let view = view_with_songs();
        match parse("vote 2", &view) {
            Ok(Input::Intent(Intent::Vote(song))) => assert_eq!(song.id, Some(5)),
            other => panic!("unexpected {:?}", other),
        }
        assert!(parse("vote 0", &view).is_err());
        assert!(parse("vote 3", &view).is_err());
        assert!(parse("vote x", &view).is_err());
    }

    #[test]
    fn test_parse_equalizer_commands() {
        let view = ViewState::default();
        assert_eq!(
            parse("eq band 3 -4.5", &view),
            Ok(Input::Intent(Intent::Set(FieldUpdate::Band(3, -4.5))))
        );
        assert_eq!(
            parse("eq off", &view),
            Ok(Input::Intent(Intent::Set(FieldUpdate::EqEnabled(false))))
        );
        assert_eq!(
            parse("eq preamp 2", &view),
            Ok(Input::Intent(Intent::Set(FieldUpdate::Preamp(2.0))))
        );
        assert_eq!(parse("eq", &view), Ok(Input::Show(Show::Equalizer)));
        assert!(parse("eq preset", &view).is_err());
    }

    #[test]
    fn test_parse_search_forms() {
        let mut view = ViewState::default();
        assert_eq!(
            parse("artist The Band", &view),
            Ok(Input::Intent(Intent::Search("artist:The Band".into())))
        );
        assert_eq!(
            parse("search", &view),
            Ok(Input::Intent(Intent::Search(String::new())))
        );
        view.layout = Layout::AlbumGrid;
        view.albums = vec![Album {
            name: "Debut".into(),
            ..Default::default()
        }];
        assert_eq!(
            parse("album 1", &view),
            Ok(Input::Intent(Intent::SearchAlbum("Debut".into())))
        );
        assert_eq!(
            parse("album 1999", &view),
            Ok(Input::Intent(Intent::SearchAlbum("1999".into())))
        );
        assert!(parse("album", &view).is_err());
        assert!(parse("bogus", &view).is_err());
    }

    #[test]
    fn test_printer_shows_labels_refreshed_before_it_listened() {
        let board = LabelBoard::new();
        let mut view = ViewState::default();
        view.equalizer.supported = true;
        view.equalizer.band_frequencies = vec![60.0, 1000.0];
        view.player.ensure_band(0);
        view.player.ensure_band(1);
        view.player.set_local(FieldUpdate::Preamp(2.0));
        view.player.set_local(FieldUpdate::Band(1, -3.0));
        board.refresh(&view.player, Refresh::All);

        let mut printer = Printer::new(board);
        let (out, _) = printer.update(&view);
        assert!(out.contains("eq preamp 2.0 dB"), "{}", out);
        assert!(out.contains("eq band 0 (60 Hz) 0.0 dB"), "{}", out);
        assert!(out.contains("eq band 1 (1 kHz) -3.0 dB"), "{}", out);
        assert!(!out.contains("eq band 2"), "{}", out);

        let (again, _) = printer.update(&view);
        assert!(!again.contains("eq "), "{}", again);
    }

    #[test]
    fn test_printer_reports_changes_once() {
        let mut printer = Printer::new(LabelBoard::new());
        let mut view = view_with_songs();
        let (first, _) = printer.update(&view);
        assert!(first.contains("Four"));
        let (again, dismiss) = printer.update(&view);
        assert_eq!(again, "");
        assert!(!dismiss);

        view.notice = Some("An error has occurred.".into());
        let (out, dismiss) = printer.update(&view);
        assert!(out.contains("! An error has occurred."));
        assert!(dismiss);
    }
}

//! Line-command surface for the binary
//!
//! Reads one command per line from stdin and drives the player, the like
//! manager and the library the same way a touch UI would.

use std::sync::Arc;

use anyhow::Result;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::engine::ConnectionState;
use crate::library::Library;
use crate::likes::LikeStateManager;
use crate::model::{PlaybackSnapshot, Playlist, Track};
use crate::player::PlayerHandle;
use crate::presenter::{NotificationListener, NowPlayingPresenter};

const HELP: &str = "\
commands:
  play <n>          play track n of the open list
  pause             toggle play/pause
  next | prev       skip forward / back
  shuffle on|off    toggle shuffle
  repeat on|off     toggle repeat
  seek <ms>         seek within the current track
  like              like or unlike the current track
  queue             show the play queue
  list              show the open list
  playlists         show the library
  open <n>          open playlist n
  search <query>    search tracks and open the results
  status            show playback state
  stop              dismiss now playing and stop
  reconnect         rebind the playback engine
  quit";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConsoleCommand {
    Play(usize),
    TogglePause,
    Next,
    Previous,
    Shuffle(bool),
    Repeat(bool),
    Seek(u64),
    Like,
    Queue,
    List,
    Playlists,
    Open(usize),
    Search(String),
    Status,
    Stop,
    Reconnect,
    Help,
    Quit,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("empty input")]
    Empty,
    #[error("unknown command `{0}`, try `help`")]
    Unknown(String),
    #[error("`{command}` expects {expected}")]
    BadArgument {
        command: &'static str,
        expected: &'static str,
    },
}

pub fn parse_command(line: &str) -> Result<ConsoleCommand, ParseError> {
    let line = line.trim();
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Err(ParseError::Empty);
    };
    let arg = words.next();
    let rest = line[head.len()..].trim();

    let command = match head.to_ascii_lowercase().as_str() {
        "play" | "p" => ConsoleCommand::Play(position(arg, "play")?),
        "pause" | "toggle" => ConsoleCommand::TogglePause,
        "next" | "n" => ConsoleCommand::Next,
        "prev" | "previous" => ConsoleCommand::Previous,
        "shuffle" => ConsoleCommand::Shuffle(switch(arg, "shuffle")?),
        "repeat" => ConsoleCommand::Repeat(switch(arg, "repeat")?),
        "seek" => ConsoleCommand::Seek(
            arg.and_then(|a| a.parse().ok())
                .ok_or(ParseError::BadArgument { command: "seek", expected: "a position in milliseconds" })?,
        ),
        "like" => ConsoleCommand::Like,
        "queue" | "q" => ConsoleCommand::Queue,
        "list" | "ls" => ConsoleCommand::List,
        "playlists" => ConsoleCommand::Playlists,
        "open" => ConsoleCommand::Open(position(arg, "open")?),
        "search" | "/" if !rest.is_empty() => ConsoleCommand::Search(rest.to_string()),
        "search" | "/" => {
            return Err(ParseError::BadArgument { command: "search", expected: "a query" });
        }
        "status" | "s" => ConsoleCommand::Status,
        "stop" => ConsoleCommand::Stop,
        "reconnect" => ConsoleCommand::Reconnect,
        "help" | "?" => ConsoleCommand::Help,
        "quit" | "exit" => ConsoleCommand::Quit,
        other => return Err(ParseError::Unknown(other.to_string())),
    };
    Ok(command)
}

/// 1-based list position to a 0-based index.
fn position(arg: Option<&str>, command: &'static str) -> Result<usize, ParseError> {
    arg.and_then(|a| a.parse::<usize>().ok())
        .filter(|n| *n > 0)
        .map(|n| n - 1)
        .ok_or(ParseError::BadArgument { command, expected: "a number starting at 1" })
}

fn switch(arg: Option<&str>, command: &'static str) -> Result<bool, ParseError> {
    match arg.map(|a| a.to_ascii_lowercase()).as_deref() {
        Some("on") => Ok(true),
        Some("off") => Ok(false),
        _ => Err(ParseError::BadArgument { command, expected: "`on` or `off`" }),
    }
}

/// `m:ss`
pub fn format_duration(ms: u64) -> String {
    let total_secs = ms / 1000;
    format!("{}:{:02}", total_secs / 60, total_secs % 60)
}

pub struct Console<P> {
    player: PlayerHandle,
    likes: LikeStateManager,
    library: Library,
    notification: Arc<NotificationListener<P>>,
    list: Vec<Track>,
    playlists: Vec<Playlist>,
}

impl<P: NowPlayingPresenter + 'static> Console<P> {
    pub fn new(
        player: PlayerHandle,
        likes: LikeStateManager,
        library: Library,
        notification: Arc<NotificationListener<P>>,
    ) -> Self {
        Self {
            player,
            likes,
            library,
            notification,
            list: Vec::new(),
            playlists: Vec::new(),
        }
    }

    /// Use `tracks` as the open list and `playlists` as the library.
    pub fn with_library(mut self, tracks: Vec<Track>, playlists: Vec<Playlist>) -> Self {
        self.list = tracks;
        self.playlists = playlists;
        self
    }

    pub async fn run(mut self) -> Result<()> {
        println!("{HELP}");
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Some(line) = lines.next_line().await? {
            match parse_command(&line) {
                Ok(ConsoleCommand::Quit) => break,
                Ok(command) => self.execute(command).await,
                Err(ParseError::Empty) => {}
                Err(e) => println!("{e}"),
            }
        }
        tracing::info!("Console input closed");
        Ok(())
    }

    pub async fn execute(&mut self, command: ConsoleCommand) {
        tracing::debug!(?command, "Console command");
        match command {
            ConsoleCommand::Play(index) => {
                if index < self.list.len() {
                    self.player.set_queue(self.list.clone(), index);
                } else {
                    println!("no track {} in a list of {}", index + 1, self.list.len());
                }
            }
            ConsoleCommand::TogglePause => self.player.toggle_play_pause(),
            ConsoleCommand::Next => self.player.next(),
            ConsoleCommand::Previous => self.player.previous(),
            ConsoleCommand::Shuffle(on) => self.player.set_shuffle_enabled(on),
            ConsoleCommand::Repeat(on) => self.player.set_repeat_enabled(on),
            ConsoleCommand::Seek(ms) => self.player.seek(ms),
            ConsoleCommand::Like => self.toggle_like().await,
            ConsoleCommand::Queue => {
                if let Some(snapshot) = self.player.snapshot().await {
                    print_tracks(&snapshot.queue, snapshot.current_index);
                }
            }
            ConsoleCommand::List => print_tracks(&self.list, None),
            ConsoleCommand::Playlists => {
                self.playlists = self.library.listing().await.playlists;
                for (i, playlist) in self.playlists.iter().enumerate() {
                    println!("{:>3}. {} ({} tracks)", i + 1, playlist.title, playlist.track_count);
                }
            }
            ConsoleCommand::Open(index) => self.open(index).await,
            ConsoleCommand::Search(query) => match self.library.search(&query).await {
                Ok(tracks) => {
                    println!("{} results for \"{query}\"", tracks.len());
                    self.list = tracks;
                    print_tracks(&self.list, None);
                }
                Err(e) => println!("search failed: {e}"),
            },
            ConsoleCommand::Status => {
                if let Some(snapshot) = self.player.snapshot().await {
                    println!("{}", describe(&snapshot));
                }
            }
            ConsoleCommand::Stop => self.notification.dismissed(&self.player),
            ConsoleCommand::Reconnect => match self.player.connection_state() {
                state @ (ConnectionState::Bound | ConnectionState::Binding) => {
                    println!("engine already {state:?}");
                }
                _ => self.player.initialize_engine(),
            },
            ConsoleCommand::Help => println!("{HELP}"),
            ConsoleCommand::Quit => {}
        }
    }

    async fn toggle_like(&self) {
        let Some(track) = self.player.snapshot().await.and_then(|s| s.current_track) else {
            println!("nothing is playing");
            return;
        };
        let currently_liked = self.likes.is_liked(track.id).await;
        match self.likes.toggle_like(&track, currently_liked).await {
            Ok(true) => println!("liked {}", track.title),
            Ok(false) => println!("unliked {}", track.title),
            Err(e) => println!("{e}"),
        }
    }

    async fn open(&mut self, index: usize) {
        let Some(playlist) = self.playlists.get(index).cloned() else {
            println!("no playlist {}, run `playlists` first", index + 1);
            return;
        };
        match self.library.tracks_for(&playlist).await {
            Ok(tracks) => {
                println!("opened {} ({} tracks)", playlist.title, tracks.len());
                self.list = tracks;
                print_tracks(&self.list, None);
            }
            Err(e) => {
                tracing::warn!(playlist_id = playlist.id, error = %e, "Could not open playlist");
                println!("could not load {}: {e}", playlist.title);
            }
        }
    }
}

fn print_tracks(tracks: &[Track], current: Option<usize>) {
    if tracks.is_empty() {
        println!("(empty)");
    }
    for (i, track) in tracks.iter().enumerate() {
        let marker = if Some(i) == current { '>' } else { ' ' };
        println!(
            "{marker}{:>3}. {} - {} [{}]",
            i + 1,
            track.title,
            track.artist,
            format_duration(track.duration_ms)
        );
    }
}

fn describe(snapshot: &PlaybackSnapshot) -> String {
    let track = snapshot
        .current_track
        .as_ref()
        .map(|t| format!("{} - {}", t.title, t.artist))
        .unwrap_or_else(|| "nothing loaded".to_string());
    let mut line = format!(
        "{:?} | {} | {} / {} | shuffle {} | repeat {} | engine {:?}",
        snapshot.phase,
        track,
        format_duration(snapshot.position_ms),
        format_duration(snapshot.duration_ms),
        if snapshot.shuffle_enabled { "on" } else { "off" },
        if snapshot.repeat_enabled { "on" } else { "off" },
        snapshot.connection,
    );
    if let Some(error) = &snapshot.last_error {
        line.push_str(&format!(" | last error: {error}"));
    }
    line
}

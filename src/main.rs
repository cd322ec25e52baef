use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use scplayer::api::SoundCloudClient;
use scplayer::config::Config;
use scplayer::console::Console;
use scplayer::engine::SimulatedEngineHost;
use scplayer::library::{Library, LibraryLimits};
use scplayer::likes::LikeStateManager;
use scplayer::logging;
use scplayer::model::LikedTracksCache;
use scplayer::player::{self, EventCategories, EventCategory, PlayerEvent, PlayerHandle, PlayerOptions};
use scplayer::presenter::{NotificationListener, TracingPresenter};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;

    if let Err(e) = logging::init_logging(&config.log_dir) {
        eprintln!("Warning: Failed to initialize logging: {}", e);
    }

    tracing::info!("=== scplayer Starting ===");

    let client = Arc::new(SoundCloudClient::new(
        config.api_base_url.clone(),
        config.client_id.clone(),
        config.access_token.clone(),
    )?);
    if config.access_token.is_none() {
        tracing::warn!("No access token configured, library and like requests will be rejected");
    }

    let host = Arc::new(SimulatedEngineHost::new(Duration::from_millis(
        config.simulated_track_length_ms,
    )));
    let options = PlayerOptions {
        mode_policy: config.mode_policy,
        shuffle_seed: config.shuffle_seed,
    };
    let (handle, player_task) = PlayerHandle::spawn(host, client.clone(), options);

    let notification = Arc::new(NotificationListener::new(TracingPresenter));
    notification.attach(handle.events());
    handle.events().add_listener(
        EventCategories::of(&[EventCategory::TrackChanged, EventCategory::Error]),
        Arc::new(print_event),
    );

    let likes = LikeStateManager::new(client.clone(), LikedTracksCache::new(&config.cache_dir))
        .with_player(handle.clone());
    let library = Library::new(client, likes.clone(), LibraryLimits::from(&config));

    // First run loads liked tracks up front; otherwise the disk copy serves
    // until the background refresh lands.
    if likes.warm_from_disk().await {
        tracing::debug!("Liked tracks cache found, refreshing in background");
        let likes = likes.clone();
        let limit = config.liked_tracks_limit;
        tokio::spawn(async move {
            if let Err(e) = likes.load_liked(limit).await {
                tracing::warn!(error = %e, "Background liked tracks refresh failed");
            }
        });
    } else {
        tracing::info!("Loading liked tracks from API (first run or cache miss)...");
        if let Err(e) = likes.load_liked(config.liked_tracks_limit).await {
            tracing::warn!(error = %e, "Could not load liked tracks");
        }
    }

    let listing = library.listing().await;
    tracing::info!(
        playlists = listing.playlists.len(),
        liked = listing.liked_tracks.len(),
        "Library loaded"
    );

    let poller = player::spawn_position_poller(handle.clone(), config.position_poll_interval());

    let console = Console::new(handle.clone(), likes, library, notification)
        .with_library(listing.liked_tracks, listing.playlists);
    let res = console.run().await;

    handle.shutdown();
    if let Err(e) = player_task.await {
        tracing::error!(error = %e, "Player task panicked");
    }
    poller.abort();

    if let Err(err) = res {
        tracing::error!(error = ?err, "Application error");
    }

    tracing::info!("scplayer shutting down");
    Ok(())
}

fn print_event(event: &PlayerEvent) {
    match event {
        PlayerEvent::TrackChanged { track, .. } => println!("now playing: {} - {}", track.title, track.artist),
        PlayerEvent::Error(e) => println!("error: {e}"),
        _ => {}
    }
}

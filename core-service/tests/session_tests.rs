mod common;

use bridge_traits::EngineStatus;
use common::{track, url, wait_until, FakeEngine};
use core_playback::{PlaybackConfig, PlaybackStatus};
use core_runtime::config::CoreConfig;
use core_runtime::events::{CoreEvent, PlaybackEvent, PlaylistEvent};
use core_service::PlaybackSession;
use std::sync::Arc;
use std::time::Duration;

fn session(engine: &Arc<FakeEngine>) -> PlaybackSession {
    let config = CoreConfig::builder()
        .audio_engine(engine.clone())
        .build()
        .unwrap();
    PlaybackSession::new(config, PlaybackConfig::default()).unwrap()
}

#[tokio::test]
async fn test_play_track_through_session() {
    let engine = FakeEngine::new();
    let session = session(&engine);

    session.play_track(track("a")).await;

    let state = session.state();
    assert_eq!(state.status, PlaybackStatus::Playing);
    assert_eq!(state.current_track_id(), Some("a"));
    assert_eq!(state.duration, Duration::from_secs(180));
    assert!(engine.played(engine.handle_for(&url("a")).unwrap()));
}

#[tokio::test]
async fn test_load_track_does_not_autoplay_by_default() {
    let engine = FakeEngine::new();
    let session = session(&engine);

    session.load_track(track("a")).await;
    assert_eq!(session.state().status, PlaybackStatus::Ready);

    session.play().await;
    session.pause().await;
    assert_eq!(session.state().status, PlaybackStatus::Paused);

    session.toggle_play_pause().await;
    assert_eq!(session.state().status, PlaybackStatus::Playing);
}

#[tokio::test]
async fn test_newer_load_supersedes_pending_one() {
    let engine = FakeEngine::new();
    let session = Arc::new(session(&engine));
    engine.gate(&url("a"));

    let first = {
        let session = Arc::clone(&session);
        tokio::spawn(async move { session.play_track(track("a")).await })
    };
    wait_until(|| session.state().status == PlaybackStatus::Loading).await;

    // Must not queue behind the gated open of "a".
    session.play_track(track("b")).await;
    assert_eq!(session.state().current_track_id(), Some("b"));
    assert_eq!(session.state().status, PlaybackStatus::Playing);

    engine.release(&url("a"));
    first.await.unwrap();

    let a = engine.handle_for(&url("a")).unwrap();
    assert!(!engine.played(a));
    assert_eq!(engine.live_count(), 1);
    assert_eq!(session.state().current_track_id(), Some("b"));
}

#[tokio::test]
async fn test_pump_auto_advances_on_finish() {
    let engine = FakeEngine::new();
    let session = session(&engine);
    session.set_playlist(vec![track("a"), track("b"), track("c")]);

    session.play_track(track("a")).await;
    let a = engine.handle_for(&url("a")).unwrap();
    let end = Duration::from_secs(180);
    engine.emit(
        EngineStatus::loaded(a)
            .with_duration(end)
            .with_position(end)
            .finished(),
    );

    wait_until(|| {
        let state = session.state();
        state.current_track_id() == Some("b") && state.status == PlaybackStatus::Playing
    })
    .await;
    assert_eq!(session.queue_position(), Some((1, 3)));
    assert_eq!(engine.live_count(), 1);
}

#[tokio::test]
async fn test_pump_tracks_position_and_buffering() {
    let engine = FakeEngine::new();
    let session = session(&engine);
    session.play_track(track("a")).await;
    let a = engine.handle_for(&url("a")).unwrap();

    engine.emit(
        EngineStatus::loaded(a)
            .with_position(Duration::from_secs(42))
            .playing(true)
            .buffering(true),
    );
    wait_until(|| session.state().status == PlaybackStatus::Buffering).await;
    assert_eq!(session.state().position, Duration::from_secs(42));

    engine.emit(
        EngineStatus::loaded(a)
            .with_position(Duration::from_secs(43))
            .playing(true),
    );
    wait_until(|| session.state().status == PlaybackStatus::Playing).await;
}

#[tokio::test]
async fn test_pump_ignores_stale_handles() {
    let engine = FakeEngine::new();
    let session = session(&engine);
    session.play_track(track("a")).await;
    let a = engine.handle_for(&url("a")).unwrap();
    session.play_track(track("b")).await;

    engine.emit(EngineStatus::loaded(a).failed("decoder crashed"));
    engine.emit(EngineStatus::loaded(a).finished());
    // Flush the pump with an event for the live handle.
    let b = engine.handle_for(&url("b")).unwrap();
    engine.emit(EngineStatus::loaded(b).with_position(Duration::from_secs(7)));
    wait_until(|| session.state().position == Duration::from_secs(7)).await;

    let state = session.state();
    assert_eq!(state.status, PlaybackStatus::Playing);
    assert!(state.last_error.is_none());
}

#[tokio::test]
async fn test_next_and_previous_keep_pause_intent() {
    let engine = FakeEngine::new();
    let session = session(&engine);
    session.set_playlist(vec![track("a"), track("b")]);

    session.load_track(track("a")).await;
    session.next().await;
    assert_eq!(session.state().current_track_id(), Some("b"));
    assert_eq!(session.state().status, PlaybackStatus::Ready);

    session.play().await;
    session.previous().await;
    assert_eq!(session.state().current_track_id(), Some("a"));
    assert_eq!(session.state().status, PlaybackStatus::Playing);
}

#[tokio::test]
async fn test_stop_and_seek_and_volume() {
    let engine = FakeEngine::new();
    let session = session(&engine);
    session.play_track(track("a")).await;

    session.seek(Duration::from_secs(600)).await;
    assert_eq!(session.state().position, Duration::from_secs(180));

    session.set_volume(1.7).await;
    assert_eq!(session.state().volume, 1.0);

    session.stop().await;
    let state = session.state();
    assert_eq!(state.status, PlaybackStatus::Idle);
    assert!(state.current_track.is_none());
    assert_eq!(engine.live_count(), 0);
}

#[tokio::test]
async fn test_set_playlist_emits_replaced() {
    let engine = FakeEngine::new();
    let session = session(&engine);
    let mut events = session.events().subscribe();

    session.set_playlist(vec![track("a"), track("b")]);

    let event = events.recv().await.unwrap();
    assert_eq!(
        event,
        CoreEvent::Playlist(PlaylistEvent::Replaced {
            track_count: 2,
            query: None,
        })
    );
    assert_eq!(session.playlist().len(), 2);
}

#[tokio::test]
async fn test_event_stream_filters_playback_events() {
    let engine = FakeEngine::new();
    let session = session(&engine);
    let mut stream = session
        .event_stream()
        .filter(|event| matches!(event, CoreEvent::Playback(_)));

    session.set_playlist(vec![track("a")]);
    session.play_track(track("a")).await;

    let first = stream.recv().await.unwrap();
    assert!(matches!(
        first,
        CoreEvent::Playback(PlaybackEvent::TrackLoading { .. })
    ));
}

#[tokio::test]
async fn test_snapshots_reach_subscribers() {
    let engine = FakeEngine::new();
    let session = session(&engine);
    let mut snapshots = session.subscribe();

    session.play_track(track("a")).await;

    let mut seen = Vec::new();
    while let Ok(state) = snapshots.try_recv() {
        seen.push(state.status);
    }
    assert_eq!(
        seen,
        [
            PlaybackStatus::Loading,
            PlaybackStatus::Ready,
            PlaybackStatus::Playing
        ]
    );
}

#[tokio::test]
async fn test_dispose_stops_pump_and_ignores_commands() {
    let engine = FakeEngine::new();
    let session = session(&engine);
    let mut snapshots = session.subscribe();
    session.play_track(track("a")).await;
    assert_eq!(engine.listeners(), 1);

    session.dispose().await;
    session.dispose().await;

    wait_until(|| engine.listeners() == 0).await;
    assert_eq!(engine.live_count(), 0);
    assert!(session.is_disposed());
    assert_eq!(session.state().status, PlaybackStatus::Idle);

    session.play_track(track("b")).await;
    assert_eq!(engine.open_count(&url("b")), 0);

    // Drain then observe the closed channel.
    loop {
        match snapshots.recv().await {
            Ok(_) => continue,
            Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
        }
    }
}

#[tokio::test]
async fn test_dispose_during_load_closes_late_handle() {
    let engine = FakeEngine::new();
    let session = Arc::new(session(&engine));
    engine.gate(&url("a"));

    let pending = {
        let session = Arc::clone(&session);
        tokio::spawn(async move { session.play_track(track("a")).await })
    };
    wait_until(|| session.state().status == PlaybackStatus::Loading).await;

    session.dispose().await;
    engine.release(&url("a"));
    pending.await.unwrap();

    assert_eq!(engine.open_count(&url("a")), 1);
    assert_eq!(engine.live_count(), 0);
    assert_eq!(session.state().status, PlaybackStatus::Idle);
}

#[tokio::test]
async fn test_drop_cancels_pump_and_closes_live_handle() {
    let engine = FakeEngine::new();
    let session = session(&engine);
    assert_eq!(engine.listeners(), 1);
    session.play_track(track("a")).await;
    assert_eq!(engine.live_count(), 1);

    drop(session);
    wait_until(|| engine.listeners() == 0).await;
    wait_until(|| engine.live_count() == 0).await;
}

#[tokio::test]
async fn test_pump_keeps_draining_while_auto_advance_opens() {
    let engine = FakeEngine::new();
    let session = session(&engine);
    session.set_playlist(vec![track("a"), track("b"), track("c")]);
    session.play_track(track("a")).await;
    engine.gate(&url("b"));

    let a = engine.handle_for(&url("a")).unwrap();
    engine.emit(EngineStatus::loaded(a).finished());
    wait_until(|| session.state().current_track_id() == Some("b")).await;
    assert_eq!(session.state().status, PlaybackStatus::Loading);

    // The user moves on while "b" is still opening.
    session.play_track(track("c")).await;
    let c = engine.handle_for(&url("c")).unwrap();
    engine.emit(
        EngineStatus::loaded(c)
            .with_position(Duration::from_secs(7))
            .playing(true)
            .buffering(true),
    );
    wait_until(|| session.state().status == PlaybackStatus::Buffering).await;
    assert_eq!(session.state().position, Duration::from_secs(7));

    engine.release(&url("b"));
    wait_until(|| engine.open_count(&url("b")) == 1 && engine.live_count() == 1).await;
    assert_eq!(session.state().current_track_id(), Some("c"));
}

#[tokio::test]
async fn test_session_requires_runtime() {
    let engine = FakeEngine::new();
    let config = CoreConfig::builder()
        .audio_engine(engine.clone())
        .build()
        .unwrap();

    let result = std::thread::spawn(move || {
        PlaybackSession::new(config, PlaybackConfig::default()).map(|_| ())
    })
    .join()
    .unwrap();

    assert!(matches!(
        result,
        Err(core_service::ServiceError::InitializationFailed(_))
    ));
}

#[tokio::test]
async fn test_invalid_playback_config_is_rejected() {
    let engine = FakeEngine::new();
    let config = CoreConfig::builder()
        .audio_engine(engine.clone())
        .build()
        .unwrap();
    let playback = PlaybackConfig {
        initial_volume: 3.0,
        ..PlaybackConfig::default()
    };

    assert!(matches!(
        PlaybackSession::new(config, playback),
        Err(core_service::ServiceError::Playback(_))
    ));
}

//! Send session integration tests
//!
//! Idle animation lifecycle and payload presentation on an in-memory surface.

mod common;

use std::time::Duration;

use common::mock_surface::MemorySurface;
use grid_codec::codec::decode;
use lightshare::config::ShareConfig;
use lightshare::display::GridKind;
use lightshare::session::SendSession;

fn config() -> ShareConfig {
    ShareConfig {
        viewport_width: 64,
        viewport_height: 64,
        ..ShareConfig::default()
    }
}

#[tokio::test(start_paused = true)]
async fn test_idle_animation_stops_when_payload_set() {
    let surface = MemorySurface::new(64, 64);
    let session = SendSession::new(surface.clone(), &config()).unwrap();

    let idle = session.spawn_idle(None);
    // first tick fires immediately, then every 100ms
    tokio::time::sleep(Duration::from_millis(250)).await;
    let idle_frames = surface.count();
    assert!(idle_frames >= 2, "only {idle_frames} idle frames");

    session.set_payload(b"Hello").await.unwrap();
    let ticks = idle.await.unwrap().unwrap();
    assert_eq!(ticks as usize, idle_frames);

    let last = surface.last().unwrap();
    assert_eq!(last.kind, GridKind::Payload);
    assert_eq!(&decode(&last.grid)[..5], b"Hello");

    // nothing presented after the payload
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(surface.count(), idle_frames + 1);
}

#[tokio::test]
async fn test_idle_grids_change() {
    let surface = MemorySurface::new(64, 64);
    let session = SendSession::new(surface.clone(), &config()).unwrap();

    for _ in 0..3 {
        assert!(session.tick_idle().await.unwrap());
    }
    let presented = surface.presented.lock().unwrap();
    assert!(presented.iter().all(|f| f.kind == GridKind::Idle));
    // 256 random cells: identical consecutive grids would take a 4^-256 fluke
    assert_ne!(presented[0].grid, presented[1].grid);
    assert_ne!(presented[1].grid, presented[2].grid);
}

#[tokio::test]
async fn test_oversized_payload_is_truncated() {
    let surface = MemorySurface::new(64, 64);
    let session = SendSession::new(surface.clone(), &config()).unwrap();

    let payload: Vec<u8> = (0..100u8).collect();
    let frame = session.set_payload(&payload).await.unwrap();
    assert_eq!(decode(&frame.grid), payload[..64].to_vec());
    assert_eq!(frame.pixels.len(), 64 * 64 * 4);
}

#[tokio::test]
async fn test_clones_share_payload_state() {
    let surface = MemorySurface::new(64, 64);
    let session = SendSession::new(surface.clone(), &config()).unwrap();
    let other = session.clone();

    other.set_payload(b"shared").await.unwrap();
    assert!(session.has_payload());
    assert!(session.slot().is_set());
    assert!(!session.tick_idle().await.unwrap());
    assert_eq!(surface.count(), 1);
}

#[tokio::test]
async fn test_empty_payload_is_all_black() {
    let surface = MemorySurface::new(32, 32);
    let session = SendSession::new(
        surface.clone(),
        &ShareConfig {
            viewport_width: 32,
            viewport_height: 32,
            ..ShareConfig::default()
        },
    )
    .unwrap();

    let frame = session.set_payload(&[]).await.unwrap();
    assert!(frame.pixels.chunks_exact(4).all(|p| p == [0, 0, 0, 255]));
}

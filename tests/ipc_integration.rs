//! Integration tests for pushing change events to a display process.

#![cfg(unix)]

use std::path::PathBuf;
use std::time::Duration;

use buggrabber_viewer::ipc::{DisplayClient, DisplayServer};
use buggrabber_viewer::notifier::{Delivery, Notifier};
use buggrabber_viewer::pipeline::Pipeline;
use buggrabber_viewer::savefile::ParsedRecord;

fn socket_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("bgv-{name}-{}.sock", std::process::id()))
}

/// A pipeline process notifying a separate display over the socket.
#[tokio::test]
async fn change_reaches_display_over_socket() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let save_file = temp_dir.path().join("!BugGrabber.lua");
    std::fs::write(
        &save_file,
        r#"BugGrabberDB = { session = 4, errors = { { message = "boom", counter = 1 } } }"#,
    )
    .unwrap();

    let socket = socket_path("pipeline");
    let (handle, mut rx) = DisplayServer::new(&socket)
        .start()
        .expect("Failed to start server");
    tokio::time::sleep(Duration::from_millis(10)).await;

    let client = DisplayClient::with_path(&socket);
    assert!(client.is_display_running());
    let pipeline = Pipeline::new(Notifier::new(client));
    assert_eq!(pipeline.refresh(&save_file).await, Delivery::Delivered);

    let event = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("Timed out waiting for event")
        .expect("Channel closed");
    assert_eq!(event.path, save_file);
    let db = event.db.expect("record");
    assert_eq!(db.session, Some(4));
    assert_eq!(db.errors[0].as_ref().unwrap().message.as_deref(), Some("boom"));

    handle.shutdown();
}

/// Events sent back to back arrive in send order.
#[tokio::test]
async fn events_arrive_in_order() {
    let socket = socket_path("order");
    let (handle, mut rx) = DisplayServer::new(&socket).start().unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;

    let notifier = Notifier::new(DisplayClient::with_path(&socket));
    for session in 1..=5 {
        let record = ParsedRecord {
            session: Some(session),
            ..Default::default()
        };
        let delivery = notifier
            .notify(&PathBuf::from("/wtf/!BugGrabber.lua"), Some(record))
            .await;
        assert_eq!(delivery, Delivery::Delivered);
    }

    let mut sessions = Vec::new();
    while sessions.len() < 5 {
        let event = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("Timed out waiting for event")
            .expect("Channel closed");
        sessions.push(event.db.and_then(|db| db.session));
    }
    assert_eq!(sessions, [Some(1), Some(2), Some(3), Some(4), Some(5)]);

    handle.shutdown();
}

/// With no display listening, changes are dropped without error.
#[tokio::test]
async fn missing_display_drops_change() {
    let socket = socket_path("absent");
    let _ = std::fs::remove_file(&socket);

    let notifier = Notifier::new(DisplayClient::with_path(&socket));
    assert!(!notifier.is_attached());
    let delivery = notifier
        .notify(&PathBuf::from("/wtf/!BugGrabber.lua"), None)
        .await;
    assert_eq!(delivery, Delivery::Dropped);
}

/// The socket file is removed when the server handle is dropped.
#[tokio::test]
async fn socket_removed_on_drop() {
    let socket = socket_path("cleanup");
    {
        let (_handle, _rx) = DisplayServer::new(&socket).start().unwrap();
        assert!(socket.exists());
    }
    assert!(!socket.exists());
}

//! Call budget behaviour against a slow platform

use bridge_platform::{
    ChatPlatform, InMemoryPlatform, Operation, PlatformError, RoomCreationSpec, TimeoutPlatform,
};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn slow_call_surfaces_timeout() {
    let inner = Arc::new(InMemoryPlatform::default());
    inner.set_latency(Some(Duration::from_secs(60)));
    let platform = TimeoutPlatform::new(Arc::clone(&inner), Duration::from_secs(30));

    let err = platform.list_rooms(None).await.unwrap_err();
    assert_eq!(
        err,
        PlatformError::Timeout {
            operation: "list_rooms",
            timeout_secs: 30
        }
    );
    assert!(err.is_retryable());
}

#[tokio::test(start_paused = true)]
async fn fast_call_passes_through() {
    let inner = Arc::new(InMemoryPlatform::default());
    inner.set_latency(Some(Duration::from_secs(1)));
    let platform = TimeoutPlatform::with_default_timeout(Arc::clone(&inner));

    let room = platform
        .create_space("@bot", &RoomCreationSpec::new("Svc X", "subsystem-orga-svcx"))
        .await
        .unwrap();
    assert!(room.is_space);
    assert_eq!(inner.count(Operation::CreateSpace), 1);
    assert_eq!(platform.timeout(), Duration::from_secs(30));
}

#[tokio::test]
async fn inner_errors_are_not_rewritten() {
    let inner = Arc::new(InMemoryPlatform::default());
    let platform = TimeoutPlatform::with_default_timeout(Arc::clone(&inner));

    let err = platform.add_room_member("!missing", "@alice").await.unwrap_err();
    assert_eq!(err, PlatformError::RoomNotFound("!missing".into()));
}

//! Per-call time budget for platform clients

use crate::error::{PlatformError, PlatformResult};
use crate::traits::ChatPlatform;
use crate::types::RoomCreationSpec;
use async_trait::async_trait;
use bridge_cache::Room;
use std::future::Future;
use std::time::Duration;

/// Default per-call budget
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Wraps a [`ChatPlatform`] so that every call fails with
/// [`PlatformError::Timeout`] once it exceeds the budget
#[derive(Debug, Clone)]
pub struct TimeoutPlatform<P> {
    inner: P,
    timeout: Duration,
}

impl<P: ChatPlatform> TimeoutPlatform<P> {
    #[must_use]
    pub fn new(inner: P, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    #[must_use]
    pub fn with_default_timeout(inner: P) -> Self {
        Self::new(inner, DEFAULT_CALL_TIMEOUT)
    }

    #[inline]
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    #[inline]
    #[must_use]
    pub fn inner(&self) -> &P {
        &self.inner
    }

    async fn bounded<T, F>(&self, operation: &'static str, call: F) -> PlatformResult<T>
    where
        T: Send,
        F: Future<Output = PlatformResult<T>> + Send,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_elapsed) => {
                tracing::warn!(
                    operation,
                    timeout_secs = self.timeout.as_secs(),
                    "Platform call timed out"
                );
                Err(PlatformError::Timeout {
                    operation,
                    timeout_secs: self.timeout.as_secs(),
                })
            }
        }
    }
}

#[async_trait]
impl<P: ChatPlatform> ChatPlatform for TimeoutPlatform<P> {
    async fn list_rooms(&self, alias_filter: Option<&str>) -> PlatformResult<Vec<Room>> {
        self.bounded("list_rooms", self.inner.list_rooms(alias_filter))
            .await
    }

    async fn create_space(&self, owner_id: &str, spec: &RoomCreationSpec) -> PlatformResult<Room> {
        self.bounded("create_space", self.inner.create_space(owner_id, spec))
            .await
    }

    async fn create_room_in_space(
        &self,
        owner_id: &str,
        spec: &RoomCreationSpec,
        parent_space_id: &str,
    ) -> PlatformResult<Room> {
        self.bounded(
            "create_room_in_space",
            self.inner
                .create_room_in_space(owner_id, spec, parent_space_id),
        )
        .await
    }

    async fn add_child_to_space(&self, parent_id: &str, child_id: &str) -> PlatformResult<()> {
        self.bounded(
            "add_child_to_space",
            self.inner.add_child_to_space(parent_id, child_id),
        )
        .await
    }

    async fn list_room_members(&self, room_id: &str) -> PlatformResult<Vec<String>> {
        self.bounded("list_room_members", self.inner.list_room_members(room_id))
            .await
    }

    async fn add_room_member(&self, room_id: &str, user_id: &str) -> PlatformResult<()> {
        self.bounded(
            "add_room_member",
            self.inner.add_room_member(room_id, user_id),
        )
        .await
    }

    async fn delete_room(&self, room_id: &str, reason: &str) -> PlatformResult<()> {
        self.bounded("delete_room", self.inner.delete_room(room_id, reason))
            .await
    }
}

//! Collaborator boundaries
//!
//! The engine talks to the chat platform and the user directory only through
//! these traits. Wire-level clients live outside this workspace.

use crate::error::PlatformResult;
use crate::types::{RoomCreationSpec, UserAccount};
use async_trait::async_trait;
use bridge_cache::Room;

/// Administrative chat-platform client
#[async_trait]
pub trait ChatPlatform: Send + Sync {
    /// List rooms, optionally restricted to those whose alias contains the filter
    async fn list_rooms(&self, alias_filter: Option<&str>) -> PlatformResult<Vec<Room>>;

    /// Create a root-level space
    async fn create_space(&self, owner_id: &str, spec: &RoomCreationSpec) -> PlatformResult<Room>;

    /// Create a room or nested space inside an existing space
    async fn create_room_in_space(
        &self,
        owner_id: &str,
        spec: &RoomCreationSpec,
        parent_space_id: &str,
    ) -> PlatformResult<Room>;

    /// Record `child_id` as a child of the space `parent_id`
    ///
    /// Adding an existing child is not an error.
    async fn add_child_to_space(&self, parent_id: &str, child_id: &str) -> PlatformResult<()>;

    async fn list_room_members(&self, room_id: &str) -> PlatformResult<Vec<String>>;

    async fn add_room_member(&self, room_id: &str, user_id: &str) -> PlatformResult<()>;

    async fn delete_room(&self, room_id: &str, reason: &str) -> PlatformResult<()>;
}

/// User account directory
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn list_all_accounts(&self) -> PlatformResult<Vec<UserAccount>>;
}

#[async_trait]
impl<T: ChatPlatform + ?Sized> ChatPlatform for std::sync::Arc<T> {
    async fn list_rooms(&self, alias_filter: Option<&str>) -> PlatformResult<Vec<Room>> {
        (**self).list_rooms(alias_filter).await
    }

    async fn create_space(&self, owner_id: &str, spec: &RoomCreationSpec) -> PlatformResult<Room> {
        (**self).create_space(owner_id, spec).await
    }

    async fn create_room_in_space(
        &self,
        owner_id: &str,
        spec: &RoomCreationSpec,
        parent_space_id: &str,
    ) -> PlatformResult<Room> {
        (**self)
            .create_room_in_space(owner_id, spec, parent_space_id)
            .await
    }

    async fn add_child_to_space(&self, parent_id: &str, child_id: &str) -> PlatformResult<()> {
        (**self).add_child_to_space(parent_id, child_id).await
    }

    async fn list_room_members(&self, room_id: &str) -> PlatformResult<Vec<String>> {
        (**self).list_room_members(room_id).await
    }

    async fn add_room_member(&self, room_id: &str, user_id: &str) -> PlatformResult<()> {
        (**self).add_room_member(room_id, user_id).await
    }

    async fn delete_room(&self, room_id: &str, reason: &str) -> PlatformResult<()> {
        (**self).delete_room(room_id, reason).await
    }
}

#[async_trait]
impl<T: UserDirectory + ?Sized> UserDirectory for std::sync::Arc<T> {
    async fn list_all_accounts(&self) -> PlatformResult<Vec<UserAccount>> {
        (**self).list_all_accounts().await
    }
}

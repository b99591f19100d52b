//! Persistence contracts.
//!
//! Services talk to these traits only, so the MongoDB adapter can be swapped
//! for the in-memory one in tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::listing::Listing;
use crate::models::user::{TokenKind, User};
use crate::services::listing_query::ListingQuery;

pub mod mongo;

#[cfg(test)]
pub mod memory;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A unique index rejected the write.
    #[error("duplicate key: {0}")]
    Duplicate(String),
    #[error("database error: {0}")]
    Database(#[from] mongodb::error::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Outcome of a wishlist membership change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WishlistChange {
    Changed,
    Unchanged,
    ListingMissing,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with [`StoreError::Duplicate`] when the email is taken.
    async fn insert_user(&self, user: &User) -> StoreResult<()>;

    async fn find_user_by_id(&self, id: &str) -> StoreResult<Option<User>>;

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    /// The user holding `token` of `kind` with an expiry after `now`.
    async fn find_user_by_token(
        &self,
        kind: TokenKind,
        token: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<User>>;

    /// Replaces the stored record. Returns false if it no longer exists.
    async fn replace_user(&self, user: &User) -> StoreResult<bool>;

    async fn delete_user(&self, id: &str) -> StoreResult<bool>;
}

#[async_trait]
pub trait ListingStore: Send + Sync {
    async fn insert_listing(&self, listing: &Listing) -> StoreResult<()>;

    /// The bare record, without the owner join.
    async fn find_listing(&self, id: &str) -> StoreResult<Option<Listing>>;

    /// The record with `owner` populated when the owner still exists.
    async fn find_listing_with_owner(&self, id: &str) -> StoreResult<Option<Listing>>;

    /// Newest first.
    async fn listings_by_owner(&self, owner_id: &str) -> StoreResult<Vec<Listing>>;

    async fn replace_listing(&self, listing: &Listing) -> StoreResult<bool>;

    async fn delete_listing(&self, id: &str) -> StoreResult<bool>;

    async fn search_listings(&self, query: &ListingQuery) -> StoreResult<Vec<Listing>>;

    async fn add_to_wishlist(&self, listing_id: &str, user_id: &str) -> StoreResult<WishlistChange>;

    async fn remove_from_wishlist(
        &self,
        listing_id: &str,
        user_id: &str,
    ) -> StoreResult<WishlistChange>;

    /// Ads wishlisted by `user_id`, owner joined, newest first.
    async fn wishlisted_by(&self, user_id: &str) -> StoreResult<Vec<Listing>>;
}

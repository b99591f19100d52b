// src/store/mongo.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::bson::{doc, Document};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::{FindOptions, IndexOptions};
use mongodb::{Collection, Database, IndexModel};

use crate::models::listing::{Listing, OwnerSummary};
use crate::models::timestamp;
use crate::models::user::{TokenKind, User};
use crate::services::listing_query::{owner_join_stages, ListingQuery};
use crate::store::{ListingStore, StoreError, StoreResult, UserStore, WishlistChange};

pub const USERS_COLLECTION: &str = "users";
pub const LISTINGS_COLLECTION: &str = "ads";

/// MongoDB-backed implementation of both store traits.
#[derive(Clone)]
pub struct MongoStore {
    users: Collection<User>,
    listings: Collection<Listing>,
}

impl MongoStore {
    pub fn new(db: &Database) -> Self {
        Self {
            users: db.collection::<User>(USERS_COLLECTION),
            listings: db.collection::<Listing>(LISTINGS_COLLECTION),
        }
    }

    /// Creates the indexes the queries rely on. Safe to run on every start.
    pub async fn ensure_indexes(&self) -> StoreResult<()> {
        let unique = IndexOptions::builder().unique(true).build();
        self.users
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "email": 1 })
                    .options(unique)
                    .build(),
                None,
            )
            .await?;

        let listing_indexes = vec![
            IndexModel::builder().keys(doc! { "geo": "2dsphere" }).build(),
            IndexModel::builder().keys(doc! { "userId": 1 }).build(),
            IndexModel::builder().keys(doc! { "wishlistedBy": 1 }).build(),
        ];
        self.listings.create_indexes(listing_indexes, None).await?;
        log::info!("MongoDB indexes are in place");
        Ok(())
    }

    async fn aggregate_listings(&self, pipeline: Vec<Document>) -> StoreResult<Vec<Listing>> {
        let cursor = self
            .listings
            .aggregate(pipeline, None)
            .await?
            .with_type::<Listing>();
        Ok(cursor.try_collect().await?)
    }
}

/// Maps a duplicate key write error (code 11000) to [`StoreError::Duplicate`].
fn map_write_error(err: mongodb::error::Error, what: &str) -> StoreError {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(e)) if e.code == 11000 => {
            StoreError::Duplicate(what.to_string())
        }
        _ => StoreError::Database(err),
    }
}

#[async_trait]
impl UserStore for MongoStore {
    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        self.users
            .insert_one(user, None)
            .await
            .map_err(|e| map_write_error(e, "email"))?;
        Ok(())
    }

    async fn find_user_by_id(&self, id: &str) -> StoreResult<Option<User>> {
        Ok(self.users.find_one(doc! { "_id": id }, None).await?)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self.users.find_one(doc! { "email": email }, None).await?)
    }

    async fn find_user_by_token(
        &self,
        kind: TokenKind,
        token: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<User>> {
        let (token_field, expire_field) = kind.fields();
        let filter = doc! {
            token_field: token,
            expire_field: { "$gt": timestamp::to_bson(now) },
        };
        Ok(self.users.find_one(filter, None).await?)
    }

    async fn replace_user(&self, user: &User) -> StoreResult<bool> {
        let result = self
            .users
            .replace_one(doc! { "_id": &user.id }, user, None)
            .await
            .map_err(|e| map_write_error(e, "email"))?;
        Ok(result.matched_count > 0)
    }

    async fn delete_user(&self, id: &str) -> StoreResult<bool> {
        let result = self.users.delete_one(doc! { "_id": id }, None).await?;
        Ok(result.deleted_count > 0)
    }
}

#[async_trait]
impl ListingStore for MongoStore {
    async fn insert_listing(&self, listing: &Listing) -> StoreResult<()> {
        self.listings.insert_one(listing, None).await?;
        Ok(())
    }

    async fn find_listing(&self, id: &str) -> StoreResult<Option<Listing>> {
        Ok(self.listings.find_one(doc! { "_id": id }, None).await?)
    }

    async fn find_listing_with_owner(&self, id: &str) -> StoreResult<Option<Listing>> {
        let Some(mut listing) = self.find_listing(id).await? else {
            return Ok(None);
        };
        listing.owner = self
            .find_user_by_id(&listing.user_id)
            .await?
            .map(|u| OwnerSummary {
                id: u.id,
                name: u.name,
                avatar: u.avatar,
            });
        Ok(Some(listing))
    }

    async fn listings_by_owner(&self, owner_id: &str) -> StoreResult<Vec<Listing>> {
        let options = FindOptions::builder().sort(doc! { "createdAt": -1 }).build();
        let cursor = self
            .listings
            .find(doc! { "userId": owner_id }, options)
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn replace_listing(&self, listing: &Listing) -> StoreResult<bool> {
        let result = self
            .listings
            .replace_one(doc! { "_id": &listing.id }, listing, None)
            .await?;
        Ok(result.matched_count > 0)
    }

    async fn delete_listing(&self, id: &str) -> StoreResult<bool> {
        let result = self.listings.delete_one(doc! { "_id": id }, None).await?;
        Ok(result.deleted_count > 0)
    }

    async fn search_listings(&self, query: &ListingQuery) -> StoreResult<Vec<Listing>> {
        self.aggregate_listings(query.to_pipeline()).await
    }

    async fn add_to_wishlist(&self, listing_id: &str, user_id: &str) -> StoreResult<WishlistChange> {
        let result = self
            .listings
            .update_one(
                doc! { "_id": listing_id, "wishlistedBy": { "$ne": user_id } },
                doc! {
                    "$addToSet": { "wishlistedBy": user_id },
                    "$set": { "updatedAt": timestamp::to_bson(Utc::now()) },
                },
                None,
            )
            .await?;
        if result.modified_count > 0 {
            return Ok(WishlistChange::Changed);
        }
        let exists = self.listings.count_documents(doc! { "_id": listing_id }, None).await?;
        Ok(if exists > 0 {
            WishlistChange::Unchanged
        } else {
            WishlistChange::ListingMissing
        })
    }

    async fn remove_from_wishlist(
        &self,
        listing_id: &str,
        user_id: &str,
    ) -> StoreResult<WishlistChange> {
        let result = self
            .listings
            .update_one(
                doc! { "_id": listing_id },
                doc! { "$pull": { "wishlistedBy": user_id } },
                None,
            )
            .await?;
        Ok(match (result.matched_count, result.modified_count) {
            (0, _) => WishlistChange::ListingMissing,
            (_, 0) => WishlistChange::Unchanged,
            _ => WishlistChange::Changed,
        })
    }

    async fn wishlisted_by(&self, user_id: &str) -> StoreResult<Vec<Listing>> {
        let mut pipeline = vec![doc! { "$match": { "wishlistedBy": user_id } }];
        pipeline.extend(owner_join_stages());
        pipeline.push(doc! { "$sort": { "createdAt": -1 } });
        self.aggregate_listings(pipeline).await
    }
}

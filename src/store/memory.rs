//! In-process store used by the test suite. Evaluates [`ListingQuery`] the
//! same way the aggregation pipeline does.

use std::cmp::Ordering;
use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::models::listing::{Coordinates, Listing, OwnerSummary};
use crate::models::user::{TokenKind, User};
use crate::services::listing_query::{ListingQuery, SortBy, NEAR_RADIUS_METERS};
use crate::store::{ListingStore, StoreError, StoreResult, UserStore, WishlistChange};

#[derive(Default)]
struct Tables {
    users: HashMap<String, User>,
    listings: HashMap<String, Listing>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn owner_of(tables: &Tables, listing: &Listing) -> Option<OwnerSummary> {
    tables.users.get(&listing.user_id).map(|u| OwnerSummary {
        id: u.id.clone(),
        name: u.name.clone(),
        avatar: u.avatar.clone(),
    })
}

/// Inner join with users, as `$lookup` + `$unwind` do.
fn joined<'a>(tables: &Tables, listings: impl Iterator<Item = &'a Listing>) -> Vec<Listing> {
    listings
        .filter_map(|l| {
            owner_of(tables, l).map(|owner| Listing {
                owner: Some(owner),
                ..l.clone()
            })
        })
        .collect()
}

fn newest_first(a: &Listing, b: &Listing) -> Ordering {
    b.created_at.cmp(&a.created_at)
}

/// Great-circle distance in meters.
pub fn distance_meters(a: Coordinates, b: Coordinates) -> f64 {
    const EARTH_RADIUS_METERS: f64 = 6_378_100.0;
    let (lat1, lat2) = (a.lat.to_radians(), b.lat.to_radians());
    let d_lat = lat2 - lat1;
    let d_lng = (b.lng - a.lng).to_radians();
    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_METERS * h.sqrt().asin()
}

fn matches(query: &ListingQuery, l: &Listing) -> bool {
    if let Some(text) = &query.text {
        let needle = text.to_lowercase();
        let hit = [&l.location, &l.headline, &l.description]
            .iter()
            .any(|field| field.to_lowercase().contains(&needle));
        if !hit {
            return false;
        }
    }
    if l.price < query.rent.0 || l.price > query.rent.1 {
        return false;
    }
    if l.stay_length.min < query.stay.0 || l.stay_length.max > query.stay.1 {
        return false;
    }
    if !query.property_types.is_empty() && !query.property_types.contains(&l.property_type) {
        return false;
    }
    if !query.amenities.iter().all(|a| l.amenities.contains(a)) {
        return false;
    }
    if !query.tenant_preferred.is_empty()
        && !query.tenant_preferred.iter().any(|t| l.tenant_preferred.contains(t))
    {
        return false;
    }
    if !query.household_preferences.is_empty()
        && !query
            .household_preferences
            .iter()
            .any(|h| l.household_preferences.contains(h))
    {
        return false;
    }
    if query.listing_type.is_some_and(|t| t != l.listing_type) {
        return false;
    }
    if query.status.is_some_and(|s| s != l.status) {
        return false;
    }
    if let Some(center) = query.near {
        match l.coordinates {
            Some(c) if distance_meters(center, c) <= NEAR_RADIUS_METERS => {}
            _ => return false,
        }
    }
    true
}

fn compare(query: &ListingQuery, a: &Listing, b: &Listing) -> Ordering {
    if let Some(center) = query.near {
        let da = a.coordinates.map(|c| distance_meters(center, c)).unwrap_or(f64::MAX);
        let db = b.coordinates.map(|c| distance_meters(center, c)).unwrap_or(f64::MAX);
        return da.total_cmp(&db);
    }
    let primary = match query.sort {
        Some(SortBy::PriceAsc) => a.price.total_cmp(&b.price),
        Some(SortBy::PriceDesc) => b.price.total_cmp(&a.price),
        Some(SortBy::StayAsc) => a.stay_length.min.cmp(&b.stay_length.min),
        Some(SortBy::StayDesc) => b.stay_length.max.cmp(&a.stay_length.max),
        None => Ordering::Equal,
    };
    primary.then_with(|| newest_first(a, b))
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Duplicate("email".into()));
        }
        tables.users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn find_user_by_id(&self, id: &str) -> StoreResult<Option<User>> {
        Ok(self.tables.read().await.users.get(id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_token(
        &self,
        kind: TokenKind,
        token: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.holds_token(kind, token, now))
            .cloned())
    }

    async fn replace_user(&self, user: &User) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        if tables
            .users
            .values()
            .any(|u| u.id != user.id && u.email == user.email)
        {
            return Err(StoreError::Duplicate("email".into()));
        }
        match tables.users.get_mut(&user.id) {
            Some(slot) => {
                *slot = user.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_user(&self, id: &str) -> StoreResult<bool> {
        Ok(self.tables.write().await.users.remove(id).is_some())
    }
}

#[async_trait]
impl ListingStore for MemoryStore {
    async fn insert_listing(&self, listing: &Listing) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        tables.listings.insert(listing.id.clone(), listing.clone());
        Ok(())
    }

    async fn find_listing(&self, id: &str) -> StoreResult<Option<Listing>> {
        Ok(self.tables.read().await.listings.get(id).cloned())
    }

    async fn find_listing_with_owner(&self, id: &str) -> StoreResult<Option<Listing>> {
        let tables = self.tables.read().await;
        Ok(tables.listings.get(id).map(|l| Listing {
            owner: owner_of(&tables, l),
            ..l.clone()
        }))
    }

    async fn listings_by_owner(&self, owner_id: &str) -> StoreResult<Vec<Listing>> {
        let tables = self.tables.read().await;
        let mut found: Vec<Listing> = tables
            .listings
            .values()
            .filter(|l| l.user_id == owner_id)
            .cloned()
            .collect();
        found.sort_by(newest_first);
        Ok(found)
    }

    async fn replace_listing(&self, listing: &Listing) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        match tables.listings.get_mut(&listing.id) {
            Some(slot) => {
                *slot = Listing {
                    owner: None,
                    ..listing.clone()
                };
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_listing(&self, id: &str) -> StoreResult<bool> {
        Ok(self.tables.write().await.listings.remove(id).is_some())
    }

    async fn search_listings(&self, query: &ListingQuery) -> StoreResult<Vec<Listing>> {
        let tables = self.tables.read().await;
        let mut found = joined(&tables, tables.listings.values().filter(|l| matches(query, l)));
        found.sort_by(|a, b| compare(query, a, b));
        let skip = usize::try_from(query.skip).unwrap_or(usize::MAX);
        let limit = query
            .limit
            .map(|n| usize::try_from(n).unwrap_or(usize::MAX))
            .unwrap_or(usize::MAX);
        Ok(found.into_iter().skip(skip).take(limit).collect())
    }

    async fn add_to_wishlist(&self, listing_id: &str, user_id: &str) -> StoreResult<WishlistChange> {
        let mut tables = self.tables.write().await;
        let Some(listing) = tables.listings.get_mut(listing_id) else {
            return Ok(WishlistChange::ListingMissing);
        };
        if listing.wishlisted_by.iter().any(|u| u == user_id) {
            return Ok(WishlistChange::Unchanged);
        }
        listing.wishlisted_by.push(user_id.to_string());
        listing.updated_at = Utc::now();
        Ok(WishlistChange::Changed)
    }

    async fn remove_from_wishlist(
        &self,
        listing_id: &str,
        user_id: &str,
    ) -> StoreResult<WishlistChange> {
        let mut tables = self.tables.write().await;
        let Some(listing) = tables.listings.get_mut(listing_id) else {
            return Ok(WishlistChange::ListingMissing);
        };
        let before = listing.wishlisted_by.len();
        listing.wishlisted_by.retain(|u| u != user_id);
        Ok(if listing.wishlisted_by.len() < before {
            WishlistChange::Changed
        } else {
            WishlistChange::Unchanged
        })
    }

    async fn wishlisted_by(&self, user_id: &str) -> StoreResult<Vec<Listing>> {
        let tables = self.tables.read().await;
        let mut found = joined(
            &tables,
            tables
                .listings
                .values()
                .filter(|l| l.wishlisted_by.iter().any(|u| u == user_id)),
        );
        found.sort_by(newest_first);
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    use crate::models::listing::fixtures::listing;
    use crate::models::listing::{
        Amenity, HouseholdPreference, ListingStatus, ListingType, PropertyType, StayLength, TenantType,
    };

    async fn store_with_owner() -> (MemoryStore, String) {
        let store = MemoryStore::new();
        let owner = User::new("Owner".into(), "owner@x.com".into(), "hash".into());
        store.insert_user(&owner).await.unwrap();
        (store, owner.id)
    }

    fn aged(owner: &str, price: f64, minutes_ago: i64) -> Listing {
        let mut l = listing(owner, price);
        l.created_at = Utc::now() - Duration::minutes(minutes_ago);
        l
    }

    async fn ids(store: &MemoryStore, query: &ListingQuery) -> Vec<String> {
        store
            .search_listings(query)
            .await
            .unwrap()
            .into_iter()
            .map(|l| l.id)
            .collect()
    }

    #[tokio::test]
    async fn price_range_includes_and_excludes() {
        let (store, owner) = store_with_owner().await;
        let cheap = listing(&owner, 800.0);
        let pricey = listing(&owner, 1200.0);
        store.insert_listing(&cheap).await.unwrap();
        store.insert_listing(&pricey).await.unwrap();

        let query = ListingQuery {
            rent: (500.0, 1000.0),
            ..Default::default()
        };
        assert_eq!(ids(&store, &query).await, vec![cheap.id]);
    }

    #[tokio::test]
    async fn amenities_all_of_tenants_any_of() {
        let (store, owner) = store_with_owner().await;
        let mut both = listing(&owner, 500.0);
        both.amenities = vec![Amenity::Furnished, Amenity::Ensuite];
        both.tenant_preferred = vec![TenantType::Family];
        let mut one = listing(&owner, 500.0);
        one.amenities = vec![Amenity::Furnished];
        one.tenant_preferred = vec![TenantType::Student];
        let mut neither = listing(&owner, 500.0);
        neither.tenant_preferred = vec![TenantType::Professional];
        for l in [&both, &one, &neither] {
            store.insert_listing(l).await.unwrap();
        }

        let amenities = ListingQuery {
            amenities: vec![Amenity::Furnished, Amenity::Ensuite],
            ..Default::default()
        };
        assert_eq!(ids(&store, &amenities).await, vec![both.id.clone()]);

        let tenants = ListingQuery {
            tenant_preferred: vec![TenantType::Student, TenantType::Family],
            ..Default::default()
        };
        let mut found = ids(&store, &tenants).await;
        found.sort();
        let mut expected = vec![both.id, one.id];
        expected.sort();
        assert_eq!(found, expected);
    }

    #[tokio::test]
    async fn stay_range_must_contain_the_listing() {
        let (store, owner) = store_with_owner().await;
        let mut fits = listing(&owner, 500.0);
        fits.stay_length = StayLength { min: 3, max: 6 };
        let mut overlaps = listing(&owner, 500.0);
        overlaps.stay_length = StayLength { min: 3, max: 12 };
        store.insert_listing(&fits).await.unwrap();
        store.insert_listing(&overlaps).await.unwrap();

        let query = ListingQuery {
            stay: (2, 8),
            ..Default::default()
        };
        assert_eq!(ids(&store, &query).await, vec![fits.id]);
    }

    #[tokio::test]
    async fn sort_orders() {
        let (store, owner) = store_with_owner().await;
        let mut a = aged(&owner, 300.0, 3);
        a.stay_length = StayLength { min: 2, max: 6 };
        let mut b = aged(&owner, 100.0, 2);
        b.stay_length = StayLength { min: 1, max: 12 };
        let mut c = aged(&owner, 200.0, 1);
        c.stay_length = StayLength { min: 4, max: 8 };
        for l in [&a, &b, &c] {
            store.insert_listing(l).await.unwrap();
        }

        let sorted = |sort| ListingQuery {
            sort,
            ..Default::default()
        };
        assert_eq!(
            ids(&store, &sorted(Some(SortBy::PriceAsc))).await,
            vec![b.id.clone(), c.id.clone(), a.id.clone()]
        );
        assert_eq!(
            ids(&store, &sorted(Some(SortBy::PriceDesc))).await,
            vec![a.id.clone(), c.id.clone(), b.id.clone()]
        );
        assert_eq!(
            ids(&store, &sorted(Some(SortBy::StayAsc))).await,
            vec![b.id.clone(), a.id.clone(), c.id.clone()]
        );
        assert_eq!(
            ids(&store, &sorted(Some(SortBy::StayDesc))).await,
            vec![b.id.clone(), c.id.clone(), a.id.clone()]
        );
        assert_eq!(ids(&store, &sorted(None)).await, vec![c.id, b.id, a.id]);
    }

    #[tokio::test]
    async fn equal_sort_keys_fall_back_to_newest_first() {
        let (store, owner) = store_with_owner().await;
        let oldest = aged(&owner, 500.0, 10);
        let middle = aged(&owner, 500.0, 5);
        let newest = aged(&owner, 500.0, 1);
        for l in [&middle, &oldest, &newest] {
            store.insert_listing(l).await.unwrap();
        }

        for sort in [SortBy::PriceAsc, SortBy::PriceDesc, SortBy::StayAsc, SortBy::StayDesc] {
            let query = ListingQuery {
                sort: Some(sort),
                ..Default::default()
            };
            assert_eq!(
                ids(&store, &query).await,
                vec![newest.id.clone(), middle.id.clone(), oldest.id.clone()]
            );
        }
    }

    #[tokio::test]
    async fn text_matches_location_headline_or_description_ignoring_case() {
        let (store, owner) = store_with_owner().await;
        let mut by_location = aged(&owner, 500.0, 3);
        by_location.location = "Brixton, London".into();
        let mut by_headline = aged(&owner, 500.0, 2);
        by_headline.headline = "Loft with ROOFTOP views".into();
        let mut by_description = aged(&owner, 500.0, 1);
        by_description.description = "Two minutes from the Canal".into();
        for l in [&by_location, &by_headline, &by_description] {
            store.insert_listing(l).await.unwrap();
        }

        let text = |t: &str| ListingQuery {
            text: Some(t.into()),
            ..Default::default()
        };
        assert_eq!(ids(&store, &text("brixton")).await, vec![by_location.id.clone()]);
        assert_eq!(ids(&store, &text("Rooftop")).await, vec![by_headline.id.clone()]);
        assert_eq!(ids(&store, &text("CANAL")).await, vec![by_description.id.clone()]);
        assert_eq!(
            ids(&store, &text("sunny")).await,
            vec![by_description.id, by_location.id]
        );
        assert!(ids(&store, &text("penthouse")).await.is_empty());
    }

    #[tokio::test]
    async fn property_type_set_and_household_any_of() {
        let (store, owner) = store_with_owner().await;
        let mut house = aged(&owner, 500.0, 3);
        house.property_type = PropertyType::House;
        house.household_preferences = vec![HouseholdPreference::Vegetarian, HouseholdPreference::NoPets];
        let mut studio = aged(&owner, 500.0, 2);
        studio.property_type = PropertyType::StudioFlat;
        studio.household_preferences = vec![HouseholdPreference::NonSmoker];
        let rooms = aged(&owner, 500.0, 1);
        for l in [&house, &studio, &rooms] {
            store.insert_listing(l).await.unwrap();
        }

        let types = ListingQuery {
            property_types: vec![PropertyType::House, PropertyType::StudioFlat],
            ..Default::default()
        };
        assert_eq!(ids(&store, &types).await, vec![studio.id.clone(), house.id.clone()]);

        let household = ListingQuery {
            household_preferences: vec![HouseholdPreference::NoPets, HouseholdPreference::NonSmoker],
            ..Default::default()
        };
        assert_eq!(ids(&store, &household).await, vec![studio.id, house.id]);

        let nobody = ListingQuery {
            household_preferences: vec![HouseholdPreference::NoAlcohol],
            ..Default::default()
        };
        assert!(ids(&store, &nobody).await.is_empty());
    }

    #[tokio::test]
    async fn listing_type_and_status_filters() {
        let (store, owner) = store_with_owner().await;
        let mut wanted = aged(&owner, 500.0, 3);
        wanted.listing_type = ListingType::RoomsWanted;
        wanted.status = ListingStatus::Active;
        let mut live = aged(&owner, 500.0, 2);
        live.status = ListingStatus::Active;
        let pending = aged(&owner, 500.0, 1);
        for l in [&wanted, &live, &pending] {
            store.insert_listing(l).await.unwrap();
        }

        let by_type = ListingQuery {
            listing_type: Some(ListingType::RoomsToRent),
            ..Default::default()
        };
        assert_eq!(ids(&store, &by_type).await, vec![pending.id.clone(), live.id.clone()]);

        let by_status = ListingQuery {
            status: Some(ListingStatus::Active),
            ..Default::default()
        };
        assert_eq!(ids(&store, &by_status).await, vec![live.id.clone(), wanted.id.clone()]);

        let both = ListingQuery {
            listing_type: Some(ListingType::RoomsToRent),
            status: Some(ListingStatus::Active),
            ..Default::default()
        };
        assert_eq!(ids(&store, &both).await, vec![live.id]);
    }

    #[tokio::test]
    async fn orphaned_listings_are_hidden_from_search() {
        let (store, owner) = store_with_owner().await;
        let kept = listing(&owner, 500.0);
        let orphan = listing("deleted-user", 500.0);
        store.insert_listing(&kept).await.unwrap();
        store.insert_listing(&orphan).await.unwrap();

        assert_eq!(ids(&store, &ListingQuery::default()).await, vec![kept.id]);
    }

    #[tokio::test]
    async fn near_search_orders_by_distance_and_ignores_sort() {
        let (store, owner) = store_with_owner().await;
        let center = Coordinates { lat: 51.5074, lng: -0.1278 };
        let mut close = listing(&owner, 2000.0);
        close.set_coordinates(Some(Coordinates { lat: 51.51, lng: -0.13 }));
        let mut further = listing(&owner, 100.0);
        further.set_coordinates(Some(Coordinates { lat: 51.55, lng: -0.10 }));
        let mut far_away = listing(&owner, 100.0);
        far_away.set_coordinates(Some(Coordinates { lat: 53.48, lng: -2.24 }));
        let unplaced = listing(&owner, 100.0);
        for l in [&close, &further, &far_away, &unplaced] {
            store.insert_listing(l).await.unwrap();
        }

        let query = ListingQuery {
            near: Some(center),
            sort: Some(SortBy::PriceAsc),
            ..Default::default()
        };
        assert_eq!(ids(&store, &query).await, vec![close.id, further.id]);
    }

    #[tokio::test]
    async fn wishlist_add_is_exclusive_remove_is_idempotent() {
        let (store, owner) = store_with_owner().await;
        let ad = listing(&owner, 500.0);
        store.insert_listing(&ad).await.unwrap();

        assert_eq!(store.add_to_wishlist(&ad.id, "u1").await.unwrap(), WishlistChange::Changed);
        assert_eq!(store.add_to_wishlist(&ad.id, "u1").await.unwrap(), WishlistChange::Unchanged);
        assert_eq!(
            store.remove_from_wishlist(&ad.id, "u1").await.unwrap(),
            WishlistChange::Changed
        );
        assert_eq!(
            store.remove_from_wishlist(&ad.id, "u1").await.unwrap(),
            WishlistChange::Unchanged
        );
        assert_eq!(
            store.add_to_wishlist("missing", "u1").await.unwrap(),
            WishlistChange::ListingMissing
        );
    }

    #[test]
    fn distance_is_roughly_right() {
        let london = Coordinates { lat: 51.5074, lng: -0.1278 };
        let paris = Coordinates { lat: 48.8566, lng: 2.3522 };
        let km = distance_meters(london, paris) / 1000.0;
        assert!((340.0..350.0).contains(&km), "got {km}");
    }
}

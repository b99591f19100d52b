use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::timestamp;
use crate::models::user::default_id;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingType {
    RoomsWanted,
    WholeBuilding,
    RoomsToRent,
    ServicedAccommodation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyType {
    Rooms,
    StudioFlat,
    House,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Amenity {
    Furnished,
    Unfurnished,
    DoubleRoom,
    SingleRoom,
    Ensuite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TenantType {
    Student,
    Professional,
    Family,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HouseholdPreference {
    Vegetarian,
    NonSmoker,
    NoAlcohol,
    NoPets,
    NoParking,
    DisabledFriendly,
}

/// Moderation state of an ad. New ads start out pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingStatus {
    #[default]
    Pending,
    Active,
    Rejected,
    Sold,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

/// GeoJSON point mirrored from [`Coordinates`] so the `2dsphere` index can see it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    #[serde(rename = "type")]
    pub kind: String,
    /// `[lng, lat]`, GeoJSON order.
    pub coordinates: [f64; 2],
}

impl From<Coordinates> for GeoPoint {
    fn from(c: Coordinates) -> Self {
        Self {
            kind: "Point".to_string(),
            coordinates: [c.lng, c.lat],
        }
    }
}

/// Distance in minutes (or miles, at the poster's discretion) to transport links.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DistanceFrom {
    pub tube: f64,
    pub bus: f64,
    pub railway: f64,
    pub metro: f64,
}

/// Acceptable tenancy length in months. `min <= max` always holds for stored ads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StayLength {
    pub min: u32,
    pub max: u32,
}

impl Default for StayLength {
    fn default() -> Self {
        Self { min: 1, max: 12 }
    }
}

/// The owner fields exposed alongside an ad.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwnerSummary {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub avatar: Option<String>,
}

/// A rental or room advertisement, stored in the `ads` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    #[serde(rename = "_id", default = "default_id")]
    pub id: String,
    pub user_id: String,
    pub listing_type: ListingType,
    pub headline: String,
    pub description: String,
    pub location: String,
    #[serde(default)]
    pub coordinates: Option<Coordinates>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geo: Option<GeoPoint>,
    pub price: f64,
    #[serde(default)]
    pub distance_from: DistanceFrom,
    #[serde(default)]
    pub stay_length: StayLength,
    pub property_type: PropertyType,
    #[serde(default)]
    pub amenities: Vec<Amenity>,
    #[serde(default)]
    pub tenant_preferred: Vec<TenantType>,
    #[serde(default)]
    pub tenant_other: String,
    #[serde(default)]
    pub household_preferences: Vec<HouseholdPreference>,
    pub photos: Vec<String>,
    #[serde(default)]
    pub status: ListingStatus,
    #[serde(default)]
    pub wishlisted_by: Vec<String>,
    /// Filled in by queries that join the owner; never written back.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<OwnerSummary>,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl Listing {
    /// Sets coordinates and keeps the indexed GeoJSON mirror in step.
    pub fn set_coordinates(&mut self, coordinates: Option<Coordinates>) {
        self.coordinates = coordinates;
        self.geo = coordinates.map(GeoPoint::from);
    }

    pub fn wishlist_count(&self) -> usize {
        self.wishlisted_by.len()
    }
}

/// Client-facing rendering of an ad.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingView {
    #[serde(flatten)]
    pub listing: Listing,
    pub wishlist_count: usize,
}

impl From<Listing> for ListingView {
    fn from(listing: Listing) -> Self {
        let wishlist_count = listing.wishlist_count();
        Self {
            listing,
            wishlist_count,
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// A minimal valid ad owned by `owner`.
    pub fn listing(owner: &str, price: f64) -> Listing {
        let now = Utc::now();
        Listing {
            id: default_id(),
            user_id: owner.to_string(),
            listing_type: ListingType::RoomsToRent,
            headline: "Sunny double room".into(),
            description: "Close to the park".into(),
            location: "Camden, London".into(),
            coordinates: None,
            geo: None,
            price,
            distance_from: DistanceFrom::default(),
            stay_length: StayLength::default(),
            property_type: PropertyType::Rooms,
            amenities: vec![],
            tenant_preferred: vec![],
            tenant_other: String::new(),
            household_preferences: vec![],
            photos: vec!["https://media.test/a.jpg".into()],
            status: ListingStatus::Pending,
            wishlisted_by: vec![],
            owner: None,
            created_at: now,
            updated_at: now,
        }
    }
}

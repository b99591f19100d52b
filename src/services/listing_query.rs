// src/services/listing_query.rs

//! Turns the search query string into a MongoDB aggregation pipeline.

use mongodb::bson::{doc, Bson, Document};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ApiError;
use crate::models::listing::{
    Amenity, Coordinates, HouseholdPreference, ListingStatus, ListingType, PropertyType, TenantType,
};
use crate::store::mongo::USERS_COLLECTION;

pub const DEFAULT_RENT_MIN: f64 = 0.0;
pub const DEFAULT_RENT_MAX: f64 = 5000.0;
pub const DEFAULT_STAY_MIN: u32 = 1;
pub const DEFAULT_STAY_MAX: u32 = 24;
/// Radius of a "near me" search.
pub const NEAR_RADIUS_METERS: f64 = 10_000.0;
pub const MAX_PAGE_SIZE: u64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum SortBy {
    #[serde(rename = "price-asc")]
    PriceAsc,
    #[serde(rename = "price-desc")]
    PriceDesc,
    #[serde(rename = "stay-asc")]
    StayAsc,
    #[serde(rename = "stay-desc")]
    StayDesc,
}

/// Query string accepted by `GET /api/ad/getall`.
///
/// List-valued fields are comma separated, e.g. `amenities=furnished,ensuite`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingFilter {
    pub location: Option<String>,
    pub rent_min: Option<f64>,
    pub rent_max: Option<f64>,
    pub stay_min: Option<u32>,
    pub stay_max: Option<u32>,
    pub property_type: Option<String>,
    pub amenities: Option<String>,
    pub tenant_preferred: Option<String>,
    pub household_preferences: Option<String>,
    pub listing_type: Option<ListingType>,
    pub status: Option<ListingStatus>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub sort_by: Option<SortBy>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

/// A validated search with every default applied.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingQuery {
    pub text: Option<String>,
    pub rent: (f64, f64),
    pub stay: (u32, u32),
    pub property_types: Vec<PropertyType>,
    /// All of these must be present.
    pub amenities: Vec<Amenity>,
    /// Any of these is enough.
    pub tenant_preferred: Vec<TenantType>,
    /// Any of these is enough.
    pub household_preferences: Vec<HouseholdPreference>,
    pub listing_type: Option<ListingType>,
    pub status: Option<ListingStatus>,
    /// Geo ordering replaces `sort` when set.
    pub near: Option<Coordinates>,
    pub sort: Option<SortBy>,
    pub skip: u64,
    pub limit: Option<u64>,
}

impl Default for ListingQuery {
    fn default() -> Self {
        Self {
            text: None,
            rent: (DEFAULT_RENT_MIN, DEFAULT_RENT_MAX),
            stay: (DEFAULT_STAY_MIN, DEFAULT_STAY_MAX),
            property_types: vec![],
            amenities: vec![],
            tenant_preferred: vec![],
            household_preferences: vec![],
            listing_type: None,
            status: None,
            near: None,
            sort: None,
            skip: 0,
            limit: None,
        }
    }
}

impl ListingQuery {
    pub fn from_filter(filter: ListingFilter) -> Result<Self, ApiError> {
        let near = match (filter.lat, filter.lng) {
            (Some(lat), Some(lng)) => {
                if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
                    return Err(ApiError::validation("lat/lng out of range"));
                }
                Some(Coordinates { lat, lng })
            }
            (None, None) => None,
            _ => return Err(ApiError::validation("lat and lng must be supplied together")),
        };

        let limit = match filter.limit {
            Some(0) => return Err(ApiError::validation("limit must be at least 1")),
            Some(n) => Some(n.min(MAX_PAGE_SIZE)),
            None => None,
        };
        let skip = match (filter.page, limit) {
            (Some(page), Some(limit)) if page > 1 => (page - 1)
                .checked_mul(limit)
                .filter(|skip| i64::try_from(*skip).is_ok())
                .ok_or_else(|| ApiError::validation("page is out of range"))?,
            _ => 0,
        };

        Ok(Self {
            text: filter
                .location
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            rent: (
                filter.rent_min.unwrap_or(DEFAULT_RENT_MIN),
                filter.rent_max.unwrap_or(DEFAULT_RENT_MAX),
            ),
            stay: (
                filter.stay_min.unwrap_or(DEFAULT_STAY_MIN),
                filter.stay_max.unwrap_or(DEFAULT_STAY_MAX),
            ),
            property_types: parse_tags("propertyType", filter.property_type.as_deref())?,
            amenities: parse_tags("amenities", filter.amenities.as_deref())?,
            tenant_preferred: parse_tags("tenantPreferred", filter.tenant_preferred.as_deref())?,
            household_preferences: parse_tags(
                "householdPreferences",
                filter.household_preferences.as_deref(),
            )?,
            listing_type: filter.listing_type,
            status: filter.status,
            near,
            sort: filter.sort_by,
            skip,
            limit,
        })
    }

    /// The `$match` document, also used as the `$geoNear` query.
    pub fn match_document(&self) -> Document {
        let mut filter = doc! {
            "price": { "$gte": self.rent.0, "$lte": self.rent.1 },
            "stayLength.min": { "$gte": i64::from(self.stay.0) },
            "stayLength.max": { "$lte": i64::from(self.stay.1) },
        };

        if let Some(text) = &self.text {
            let pattern = regex::escape(text);
            let fields = ["location", "headline", "description"];
            let any_field: Vec<Document> = fields
                .iter()
                .map(|field| doc! { *field: { "$regex": &pattern, "$options": "i" } })
                .collect();
            filter.insert("$or", any_field);
        }
        if !self.property_types.is_empty() {
            filter.insert("propertyType", doc! { "$in": tag_names(&self.property_types) });
        }
        if !self.amenities.is_empty() {
            filter.insert("amenities", doc! { "$all": tag_names(&self.amenities) });
        }
        if !self.tenant_preferred.is_empty() {
            filter.insert("tenantPreferred", doc! { "$in": tag_names(&self.tenant_preferred) });
        }
        if !self.household_preferences.is_empty() {
            filter.insert(
                "householdPreferences",
                doc! { "$in": tag_names(&self.household_preferences) },
            );
        }
        if let Some(listing_type) = &self.listing_type {
            filter.insert("listingType", tag_name(listing_type));
        }
        if let Some(status) = &self.status {
            filter.insert("status", tag_name(status));
        }
        filter
    }

    pub fn sort_document(&self) -> Document {
        match self.sort {
            Some(SortBy::PriceAsc) => doc! { "price": 1, "createdAt": -1 },
            Some(SortBy::PriceDesc) => doc! { "price": -1, "createdAt": -1 },
            Some(SortBy::StayAsc) => doc! { "stayLength.min": 1, "createdAt": -1 },
            Some(SortBy::StayDesc) => doc! { "stayLength.max": -1, "createdAt": -1 },
            None => doc! { "createdAt": -1 },
        }
    }

    pub fn to_pipeline(&self) -> Vec<Document> {
        let mut pipeline = Vec::new();
        match self.near {
            Some(c) => pipeline.push(doc! {
                "$geoNear": {
                    "near": { "type": "Point", "coordinates": [c.lng, c.lat] },
                    "distanceField": "distance",
                    "maxDistance": NEAR_RADIUS_METERS,
                    "spherical": true,
                    "key": "geo",
                    "query": self.match_document(),
                }
            }),
            None => pipeline.push(doc! { "$match": self.match_document() }),
        }
        pipeline.extend(owner_join_stages());
        // $geoNear already emits nearest first.
        if self.near.is_none() {
            pipeline.push(doc! { "$sort": self.sort_document() });
        }
        if self.skip > 0 {
            pipeline.push(doc! { "$skip": i64::try_from(self.skip).unwrap_or(i64::MAX) });
        }
        if let Some(limit) = self.limit {
            pipeline.push(doc! { "$limit": limit as i64 });
        }
        pipeline
    }
}

/// Joins the owning user as `owner: {_id, name, avatar}`. Ads whose owner is
/// gone drop out.
pub fn owner_join_stages() -> Vec<Document> {
    vec![
        doc! {
            "$lookup": {
                "from": USERS_COLLECTION,
                "localField": "userId",
                "foreignField": "_id",
                "as": "owner",
            }
        },
        doc! { "$unwind": "$owner" },
        doc! {
            "$addFields": {
                "owner": { "_id": "$owner._id", "name": "$owner.name", "avatar": "$owner.avatar" }
            }
        },
    ]
}

/// Parses a comma separated list of snake_case tags, dropping duplicates.
pub fn parse_tags<T>(field: &str, raw: Option<&str>) -> Result<Vec<T>, ApiError>
where
    T: DeserializeOwned + PartialEq,
{
    let mut tags = Vec::new();
    for part in raw.unwrap_or_default().split(',').map(str::trim) {
        if part.is_empty() {
            continue;
        }
        let tag = parse_tag(part)
            .ok_or_else(|| ApiError::validation(format!("Unknown {} value '{}'", field, part)))?;
        if !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    Ok(tags)
}

pub fn parse_tag<T: DeserializeOwned>(raw: &str) -> Option<T> {
    serde_json::from_value(Value::String(raw.to_string())).ok()
}

/// The stored string form of a unit enum.
pub fn tag_name<T: Serialize>(tag: &T) -> String {
    serde_json::to_value(tag)
        .ok()
        .and_then(|v| v.as_str().map(str::to_owned))
        .unwrap_or_default()
}

fn tag_names<T: Serialize>(tags: &[T]) -> Vec<Bson> {
    tags.iter().map(|t| Bson::String(tag_name(t))).collect()
}

// src/services/listing_service.rs

//! Ad lifecycle: create, read, owner-only update/delete, and wishlist membership.

use std::collections::HashMap;

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::error::ApiError;
use crate::media::UploadedFile;
use crate::models::listing::{
    Amenity, Coordinates, DistanceFrom, HouseholdPreference, Listing, ListingStatus, ListingType,
    ListingView, PropertyType, StayLength, TenantType,
};
use crate::models::user::default_id;
use crate::services::listing_query::{parse_tag, ListingFilter, ListingQuery};
use crate::services::media_service;
use crate::state::AppState;
use crate::store::WishlistChange;

pub const HEADLINE_MAX_CHARS: usize = 100;
pub const DESCRIPTION_MAX_CHARS: usize = 2000;

/// Text fields of a multipart ad submission. Structured values arrive JSON encoded.
pub type AdForm = HashMap<String, String>;

fn field<'a>(form: &'a AdForm, name: &str) -> Option<&'a str> {
    form.get(name).map(String::as_str)
}

fn required<'a>(form: &'a AdForm, name: &str) -> Result<&'a str, ApiError> {
    field(form, name)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::validation(format!("{} is required", name)))
}

fn parse_json<T: DeserializeOwned>(name: &str, raw: &str) -> Result<T, ApiError> {
    serde_json::from_str(raw).map_err(|e| ApiError::validation(format!("Invalid {}: {}", name, e)))
}

fn parse_bounded_text(name: &str, raw: &str, max: usize) -> Result<String, ApiError> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(ApiError::validation(format!("{} is required", name)));
    }
    if text.chars().count() > max {
        return Err(ApiError::validation(format!(
            "{} must be at most {} characters",
            name, max
        )));
    }
    Ok(text.to_string())
}

fn parse_price(raw: &str) -> Result<f64, ApiError> {
    let price: f64 = raw
        .trim()
        .parse()
        .map_err(|_| ApiError::validation("price must be a number"))?;
    if !price.is_finite() || price < 0.0 {
        return Err(ApiError::validation("price must be zero or more"));
    }
    Ok(price)
}

fn parse_enum<T: DeserializeOwned>(name: &str, raw: &str) -> Result<T, ApiError> {
    parse_tag(raw.trim()).ok_or_else(|| ApiError::validation(format!("Invalid {} '{}'", name, raw)))
}

fn parse_coordinates(raw: &str) -> Result<Option<Coordinates>, ApiError> {
    let raw = raw.trim();
    if raw.is_empty() || raw == "null" {
        return Ok(None);
    }
    let c: Coordinates = parse_json("coordinates", raw)?;
    if !(-90.0..=90.0).contains(&c.lat) || !(-180.0..=180.0).contains(&c.lng) {
        return Err(ApiError::validation("coordinates out of range"));
    }
    Ok(Some(c))
}

fn parse_distance_from(raw: &str) -> Result<DistanceFrom, ApiError> {
    if raw.trim().is_empty() {
        return Ok(DistanceFrom::default());
    }
    let d: DistanceFrom = parse_json("distanceFrom", raw)?;
    let all = [d.tube, d.bus, d.railway, d.metro];
    if all.iter().any(|v| !v.is_finite() || *v < 0.0) {
        return Err(ApiError::validation("distanceFrom values must be zero or more"));
    }
    Ok(d)
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct RawStayLength {
    min: Option<Value>,
    max: Option<Value>,
}

/// A bound that is missing, null or not a number falls back to `default`.
fn stay_bound(name: &str, raw: Option<Value>, default: u32) -> Result<u32, ApiError> {
    let number = match raw {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match number.filter(|n| n.is_finite()) {
        None => Ok(default),
        Some(n) if n < 1.0 || n > f64::from(u32::MAX) => Err(ApiError::validation(format!(
            "stayLength.{} must be at least 1",
            name
        ))),
        Some(n) => Ok(n.round() as u32),
    }
}

/// Missing or non-numeric bounds default to 1..12 months; `min > max` is rejected.
pub fn parse_stay_length(raw: &str) -> Result<StayLength, ApiError> {
    let parsed: RawStayLength = if raw.trim().is_empty() {
        RawStayLength::default()
    } else {
        parse_json("stayLength", raw)?
    };
    let defaults = StayLength::default();
    let stay = StayLength {
        min: stay_bound("min", parsed.min, defaults.min)?,
        max: stay_bound("max", parsed.max, defaults.max)?,
    };
    if stay.min > stay.max {
        return Err(ApiError::validation(
            "stayLength.min must not be greater than stayLength.max",
        ));
    }
    Ok(stay)
}

/// A JSON array of tags; duplicates are dropped.
fn parse_tag_set<T: DeserializeOwned + PartialEq>(name: &str, raw: &str) -> Result<Vec<T>, ApiError> {
    if raw.trim().is_empty() {
        return Ok(vec![]);
    }
    let parsed: Vec<T> = parse_json(name, raw)?;
    let mut tags = Vec::with_capacity(parsed.len());
    for tag in parsed {
        if !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    Ok(tags)
}

/// Builds a pending ad from a submission. Photos are attached by the caller.
pub fn listing_from_form(owner_id: &str, form: &AdForm) -> Result<Listing, ApiError> {
    let listing_type: ListingType = parse_enum("listingType", required(form, "listingType")?)?;
    let headline = parse_bounded_text("headline", required(form, "headline")?, HEADLINE_MAX_CHARS)?;
    let description = parse_bounded_text(
        "description",
        required(form, "description")?,
        DESCRIPTION_MAX_CHARS,
    )?;
    let location = required(form, "location")?.to_string();
    let price = parse_price(required(form, "price")?)?;
    let property_type: PropertyType = parse_enum("propertyType", required(form, "propertyType")?)?;

    let now = Utc::now();
    let mut listing = Listing {
        id: default_id(),
        user_id: owner_id.to_string(),
        listing_type,
        headline,
        description,
        location,
        coordinates: None,
        geo: None,
        price,
        distance_from: parse_distance_from(field(form, "distanceFrom").unwrap_or_default())?,
        stay_length: parse_stay_length(field(form, "stayLength").unwrap_or_default())?,
        property_type,
        amenities: parse_tag_set("amenities", field(form, "amenities").unwrap_or_default())?,
        tenant_preferred: parse_tag_set(
            "tenantPreferred",
            field(form, "tenantPreferred").unwrap_or_default(),
        )?,
        tenant_other: field(form, "tenantOther").unwrap_or_default().trim().to_string(),
        household_preferences: parse_tag_set(
            "householdPreferences",
            field(form, "householdPreferences").unwrap_or_default(),
        )?,
        photos: vec![],
        status: ListingStatus::Pending,
        wishlisted_by: vec![],
        owner: None,
        created_at: now,
        updated_at: now,
    };
    listing.set_coordinates(parse_coordinates(field(form, "coordinates").unwrap_or_default())?);
    Ok(listing)
}

/// Owner-editable fields. Anything not listed here is ignored on update.
#[derive(Debug, Default)]
pub struct ListingPatch {
    pub headline: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub coordinates: Option<Option<Coordinates>>,
    pub price: Option<f64>,
    pub distance_from: Option<DistanceFrom>,
    pub stay_length: Option<StayLength>,
    pub amenities: Option<Vec<Amenity>>,
    pub tenant_preferred: Option<Vec<TenantType>>,
    pub household_preferences: Option<Vec<HouseholdPreference>>,
    pub tenant_other: Option<String>,
}

impl ListingPatch {
    /// Validates every supplied field before anything is applied.
    pub fn from_form(form: &AdForm) -> Result<Self, ApiError> {
        Ok(Self {
            headline: field(form, "headline")
                .map(|v| parse_bounded_text("headline", v, HEADLINE_MAX_CHARS))
                .transpose()?,
            description: field(form, "description")
                .map(|v| parse_bounded_text("description", v, DESCRIPTION_MAX_CHARS))
                .transpose()?,
            location: field(form, "location")
                .map(|v| parse_bounded_text("location", v, usize::MAX))
                .transpose()?,
            coordinates: field(form, "coordinates").map(parse_coordinates).transpose()?,
            price: field(form, "price").map(parse_price).transpose()?,
            distance_from: field(form, "distanceFrom").map(parse_distance_from).transpose()?,
            stay_length: field(form, "stayLength").map(parse_stay_length).transpose()?,
            amenities: field(form, "amenities")
                .map(|v| parse_tag_set("amenities", v))
                .transpose()?,
            tenant_preferred: field(form, "tenantPreferred")
                .map(|v| parse_tag_set("tenantPreferred", v))
                .transpose()?,
            household_preferences: field(form, "householdPreferences")
                .map(|v| parse_tag_set("householdPreferences", v))
                .transpose()?,
            tenant_other: field(form, "tenantOther").map(|v| v.trim().to_string()),
        })
    }

    pub fn apply(self, listing: &mut Listing) {
        if let Some(v) = self.headline {
            listing.headline = v;
        }
        if let Some(v) = self.description {
            listing.description = v;
        }
        if let Some(v) = self.location {
            listing.location = v;
        }
        if let Some(v) = self.coordinates {
            listing.set_coordinates(v);
        }
        if let Some(v) = self.price {
            listing.price = v;
        }
        if let Some(v) = self.distance_from {
            listing.distance_from = v;
        }
        if let Some(v) = self.stay_length {
            listing.stay_length = v;
        }
        if let Some(v) = self.amenities {
            listing.amenities = v;
        }
        if let Some(v) = self.tenant_preferred {
            listing.tenant_preferred = v;
        }
        if let Some(v) = self.household_preferences {
            listing.household_preferences = v;
        }
        if let Some(v) = self.tenant_other {
            listing.tenant_other = v;
        }
    }
}

/// A session token can outlive its account; writes keyed on the caller need the account.
async fn require_account(state: &AppState, user_id: &str) -> Result<(), ApiError> {
    match state.users.find_user_by_id(user_id).await? {
        Some(_) => Ok(()),
        None => Err(ApiError::not_found("User not found")),
    }
}

pub async fn create(
    state: &AppState,
    owner_id: &str,
    form: &AdForm,
    photos: &[UploadedFile],
) -> Result<Listing, ApiError> {
    let mut listing = listing_from_form(owner_id, form)?;
    require_account(state, owner_id).await?;
    if photos.is_empty() {
        return Err(ApiError::validation("At least one photo is required"));
    }
    listing.photos = media_service::upload_all(state.media.as_ref(), photos).await?;

    state.listings.insert_listing(&listing).await?;
    log::info!("Ad {} created by {}", listing.id, owner_id);
    Ok(listing)
}

pub async fn get(state: &AppState, id: &str) -> Result<ListingView, ApiError> {
    state
        .listings
        .find_listing_with_owner(id)
        .await?
        .map(ListingView::from)
        .ok_or_else(|| ApiError::not_found("Ad not found"))
}

pub async fn list_by_owner(state: &AppState, owner_id: &str) -> Result<Vec<ListingView>, ApiError> {
    let ads = state.listings.listings_by_owner(owner_id).await?;
    Ok(ads.into_iter().map(ListingView::from).collect())
}

pub async fn search(state: &AppState, filter: ListingFilter) -> Result<Vec<ListingView>, ApiError> {
    let query = ListingQuery::from_filter(filter)?;
    let ads = state.listings.search_listings(&query).await?;
    Ok(ads.into_iter().map(ListingView::from).collect())
}

/// Loads an ad and checks that `caller_id` owns it.
async fn load_owned(
    state: &AppState,
    id: &str,
    caller_id: &str,
    action: &str,
) -> Result<Listing, ApiError> {
    let listing = state
        .listings
        .find_listing(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Ad not found"))?;
    if listing.user_id != caller_id {
        return Err(ApiError::Forbidden(format!("Not authorized to {} this ad", action)));
    }
    Ok(listing)
}

/// Merges the allowed fields and appends any new photos.
pub async fn update(
    state: &AppState,
    id: &str,
    caller_id: &str,
    form: &AdForm,
    photos: &[UploadedFile],
) -> Result<Listing, ApiError> {
    let mut listing = load_owned(state, id, caller_id, "update").await?;
    let patch = ListingPatch::from_form(form)?;

    patch.apply(&mut listing);
    if !photos.is_empty() {
        let urls = media_service::upload_all(state.media.as_ref(), photos).await?;
        listing.photos.extend(urls);
    }
    listing.updated_at = Utc::now();

    if !state.listings.replace_listing(&listing).await? {
        return Err(ApiError::not_found("Ad not found"));
    }
    log::info!("Ad {} updated", listing.id);
    Ok(listing)
}

/// Removes the photos (best effort) and then the record.
pub async fn delete(state: &AppState, id: &str, caller_id: &str) -> Result<(), ApiError> {
    let listing = load_owned(state, id, caller_id, "delete").await?;
    media_service::remove_all(state.media.as_ref(), &listing.photos).await;
    state.listings.delete_listing(&listing.id).await?;
    log::info!("Ad {} deleted", listing.id);
    Ok(())
}

pub async fn add_to_wishlist(state: &AppState, id: &str, user_id: &str) -> Result<(), ApiError> {
    require_account(state, user_id).await?;
    match state.listings.add_to_wishlist(id, user_id).await? {
        WishlistChange::Changed => Ok(()),
        WishlistChange::Unchanged => Err(ApiError::Conflict("Ad already in wishlist".into())),
        WishlistChange::ListingMissing => Err(ApiError::not_found("Ad not found")),
    }
}

/// Removing an ad that is not in the wishlist is not an error.
pub async fn remove_from_wishlist(state: &AppState, id: &str, user_id: &str) -> Result<(), ApiError> {
    match state.listings.remove_from_wishlist(id, user_id).await? {
        WishlistChange::Changed | WishlistChange::Unchanged => Ok(()),
        WishlistChange::ListingMissing => Err(ApiError::not_found("Ad not found")),
    }
}

pub async fn get_wishlist(state: &AppState, user_id: &str) -> Result<Vec<ListingView>, ApiError> {
    let ads = state.listings.wishlisted_by(user_id).await?;
    Ok(ads.into_iter().map(ListingView::from).collect())
}

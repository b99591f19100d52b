//! Serde glue for `DateTime<Utc>` fields.
//!
//! MongoDB sees native BSON dates (the driver serializes with a
//! non-human-readable serializer), while JSON responses get RFC 3339 strings.

use chrono::{DateTime, TimeZone, Utc};
use mongodb::bson;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub fn to_bson(dt: DateTime<Utc>) -> bson::DateTime {
    bson::DateTime::from_millis(dt.timestamp_millis())
}

pub fn serialize<S: Serializer>(dt: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
    if s.is_human_readable() {
        dt.serialize(s)
    } else {
        to_bson(*dt).serialize(s)
    }
}

pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
    if d.is_human_readable() {
        DateTime::<Utc>::deserialize(d)
    } else {
        let raw = bson::DateTime::deserialize(d)?;
        Utc.timestamp_millis_opt(raw.timestamp_millis())
            .single()
            .ok_or_else(|| D::Error::custom("timestamp out of range"))
    }
}

pub mod option {
    use super::*;

    #[derive(Deserialize)]
    struct Wrapper(#[serde(with = "super")] DateTime<Utc>);

    pub fn serialize<S: Serializer>(v: &Option<DateTime<Utc>>, s: S) -> Result<S::Ok, S::Error> {
        match v {
            Some(dt) => super::serialize(dt, s),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<DateTime<Utc>>, D::Error> {
        Ok(Option::<Wrapper>::deserialize(d)?.map(|Wrapper(dt)| dt))
    }
}

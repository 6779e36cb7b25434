use bson::oid::ObjectId;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use serde_aux::field_attributes::deserialize_option_number_from_string;
use std::fmt;
use std::str::FromStr;

use crate::{ClienteleError, Result};

/// Store-assigned identifier, rendered as 24 hex digits on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CustomerId(ObjectId);

impl CustomerId {
    pub fn new() -> Self {
        Self(ObjectId::new())
    }

    /// Parses a raw id from a request
    ///
    /// Anything that is not a well formed id can never resolve to a record,
    /// so it is reported as `NotFound` rather than as bad input
    pub fn parse(raw: &str) -> Result<Self> {
        raw.trim().parse().map_err(|_| ClienteleError::NotFound)
    }

    pub fn as_object_id(&self) -> ObjectId {
        self.0
    }
}

impl Default for CustomerId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<ObjectId> for CustomerId {
    fn from(id: ObjectId) -> Self {
        Self(id)
    }
}

impl FromStr for CustomerId {
    type Err = bson::oid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        ObjectId::parse_str(s).map(Self)
    }
}

impl fmt::Display for CustomerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_hex())
    }
}

impl Serialize for CustomerId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_hex())
    }
}

impl<'de> Deserialize<'de> for CustomerId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    #[serde(rename = "_id")]
    pub id: CustomerId,
    pub name: String,
    pub date_of_birth: DateTime<Utc>,
    pub member_number: i64,
    pub interests: String,
}

/// A validated customer that has not been stored yet
#[derive(Debug, Clone, PartialEq)]
pub struct NewCustomer {
    pub name: String,
    pub date_of_birth: DateTime<Utc>,
    pub member_number: i64,
    pub interests: String,
}

impl NewCustomer {
    pub fn into_customer(self, id: CustomerId) -> Customer {
        Customer {
            id,
            name: self.name,
            date_of_birth: self.date_of_birth,
            member_number: self.member_number,
            interests: self.interests,
        }
    }
}

/// Fields to overwrite on an existing customer, `None` leaves a field untouched
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CustomerUpdate {
    pub name: Option<String>,
    pub date_of_birth: Option<DateTime<Utc>>,
    pub member_number: Option<i64>,
    pub interests: Option<String>,
}

impl CustomerUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.date_of_birth.is_none()
            && self.member_number.is_none()
            && self.interests.is_none()
    }

    pub fn apply(self, customer: &mut Customer) {
        if let Some(name) = self.name {
            customer.name = name;
        }
        if let Some(date_of_birth) = self.date_of_birth {
            customer.date_of_birth = date_of_birth;
        }
        if let Some(member_number) = self.member_number {
            customer.member_number = member_number;
        }
        if let Some(interests) = self.interests {
            customer.interests = interests;
        }
    }
}

/// Request body shared by create and update
///
/// Every field is optional here so that a missing field surfaces as a
/// `BadRequest` from validation instead of a deserialization failure
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerPayload {
    #[serde(rename = "_id", default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_date_of_birth")]
    pub date_of_birth: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "deserialize_option_number_from_string")]
    pub member_number: Option<i64>,
    #[serde(default)]
    pub interests: Option<String>,
}

impl CustomerPayload {
    /// Splits an update body into the target id and the fields to overwrite
    pub fn into_update(self) -> Result<(CustomerId, CustomerUpdate)> {
        let raw_id = non_blank(self.id).ok_or_else(ClienteleError::missing_id)?;
        let id = CustomerId::parse(&raw_id)?;
        let update = CustomerUpdate {
            name: non_blank(self.name),
            date_of_birth: self.date_of_birth,
            member_number: self.member_number,
            interests: non_blank(self.interests),
        };
        Ok((id, update))
    }
}

impl TryFrom<CustomerPayload> for NewCustomer {
    type Error = ClienteleError;

    fn try_from(payload: CustomerPayload) -> Result<Self> {
        match (
            non_blank(payload.name),
            payload.date_of_birth,
            payload.member_number,
            non_blank(payload.interests),
        ) {
            (Some(name), Some(date_of_birth), Some(member_number), Some(interests)) => {
                Ok(NewCustomer {
                    name,
                    date_of_birth,
                    member_number,
                    interests,
                })
            }
            _ => Err(ClienteleError::missing_fields()),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Accepts `YYYY-MM-DD` (what a date input posts) or a full RFC 3339 timestamp
fn deserialize_date_of_birth<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = match Option::<String>::deserialize(deserializer)? {
        Some(raw) if !raw.trim().is_empty() => raw,
        _ => return Ok(None),
    };
    parse_date_of_birth(raw.trim())
        .map(Some)
        .ok_or_else(|| de::Error::custom(format!("invalid dateOfBirth: {}", raw)))
}

fn parse_date_of_birth(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(raw) {
        return Some(timestamp.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()?;
    Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?))
}

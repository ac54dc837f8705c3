use std::{collections::BTreeSet, fmt::Display, str::FromStr};

use serde::{Deserialize, Deserializer};
use strum::{AsRefStr, EnumIter, EnumString, IntoEnumIterator};

use crate::ErrorKind;

/// A single response field of the upstream JSON schema.
///
/// The upstream service accepts fields either by name or packed into a
/// numeric bit mask; [`Field::bit`] returns the bit for a field.
/// See <https://ip-api.com/docs/api:json> for the reference.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, AsRefStr, EnumIter, EnumString,
)]
#[strum(serialize_all = "camelCase")]
pub enum Field {
    /// `success` or `fail`
    Status,
    /// Included only when status is `fail`
    Message,
    /// Continent name
    Continent,
    /// Two-letter continent code
    ContinentCode,
    /// Country name
    Country,
    /// Two-letter country code, ISO 3166-1 alpha-2
    CountryCode,
    /// Region/state short code
    Region,
    /// Region/state name
    RegionName,
    /// City name
    City,
    /// District (subdivision of city)
    District,
    /// Zip code
    Zip,
    /// Latitude
    Lat,
    /// Longitude
    Lon,
    /// Timezone (tz)
    Timezone,
    /// Timezone UTC DST offset in seconds
    Offset,
    /// National currency
    Currency,
    /// ISP name
    Isp,
    /// Organization name
    Org,
    /// AS number and organization, separated by space (RIR)
    #[strum(serialize = "as")]
    As,
    /// AS name (RIR)
    #[strum(serialize = "asname")]
    AsName,
    /// Reverse DNS of the IP
    Reverse,
    /// Mobile (cellular) connection
    Mobile,
    /// Proxy, VPN or Tor exit address
    Proxy,
    /// Hosting, colocated or data center
    Hosting,
    /// IP used for the query
    Query,
}

impl Field {
    /// The bit representing this field in a numeric field selector
    #[must_use]
    pub const fn bit(self) -> u32 {
        match self {
            Field::Country => 1,
            Field::CountryCode => 1 << 1,
            Field::Region => 1 << 2,
            Field::RegionName => 1 << 3,
            Field::City => 1 << 4,
            Field::Zip => 1 << 5,
            Field::Lat => 1 << 6,
            Field::Lon => 1 << 7,
            Field::Timezone => 1 << 8,
            Field::Isp => 1 << 9,
            Field::Org => 1 << 10,
            Field::As => 1 << 11,
            Field::Reverse => 1 << 12,
            Field::Query => 1 << 13,
            Field::Status => 1 << 14,
            Field::Message => 1 << 15,
            Field::Mobile => 1 << 16,
            Field::Proxy => 1 << 17,
            Field::District => 1 << 19,
            Field::Continent => 1 << 20,
            Field::ContinentCode => 1 << 21,
            Field::AsName => 1 << 22,
            Field::Currency => 1 << 23,
            Field::Hosting => 1 << 24,
            Field::Offset => 1 << 25,
        }
    }
}

impl Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_ref())
    }
}

/// Fields requested by the free endpoint when nothing else is configured
const DEFAULT_FIELDS: [Field; 15] = [
    Field::Status,
    Field::Message,
    Field::Country,
    Field::CountryCode,
    Field::Region,
    Field::RegionName,
    Field::City,
    Field::Zip,
    Field::Lat,
    Field::Lon,
    Field::Timezone,
    Field::Isp,
    Field::Org,
    Field::As,
    Field::Query,
];

/// Selects which fields the upstream service should return.
///
/// Either a set of named fields, rendered as a comma-separated list,
/// or a raw numeric code as produced by the upstream documentation's
/// field generator (e.g. `61439`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Fields {
    /// Named fields; always rendered in a stable order
    Named(BTreeSet<Field>),
    /// A packed bit mask, passed through verbatim
    Numeric(u32),
}

impl Fields {
    /// Request every field the upstream service knows about
    #[must_use]
    pub fn all() -> Self {
        Fields::Named(Field::iter().collect())
    }

    /// The packed numeric representation of this selector
    #[must_use]
    pub fn code(&self) -> u32 {
        match self {
            Fields::Named(fields) => fields.iter().fold(0, |acc, field| acc | field.bit()),
            Fields::Numeric(code) => *code,
        }
    }

    /// Whether the given field is part of this selection
    #[must_use]
    pub fn contains(&self, field: Field) -> bool {
        match self {
            Fields::Named(fields) => fields.contains(&field),
            Fields::Numeric(code) => code & field.bit() != 0,
        }
    }
}

impl Default for Fields {
    fn default() -> Self {
        Fields::Named(DEFAULT_FIELDS.into_iter().collect())
    }
}

impl FromIterator<Field> for Fields {
    fn from_iter<T: IntoIterator<Item = Field>>(iter: T) -> Self {
        Fields::Named(iter.into_iter().collect())
    }
}

impl Display for Fields {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Fields::Named(fields) => {
                let names: Vec<&str> = fields.iter().map(AsRef::as_ref).collect();
                f.write_str(&names.join(","))
            }
            Fields::Numeric(code) => write!(f, "{code}"),
        }
    }
}

impl FromStr for Fields {
    type Err = ErrorKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        // Old configurations carry the query string prefix along
        let s = s.strip_prefix("?fields=").unwrap_or(s);

        if let Ok(code) = s.parse::<u32>() {
            return Ok(Fields::Numeric(code));
        }

        s.split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(|name| Field::from_str(name).map_err(|_| ErrorKind::InvalidField(name.into())))
            .collect()
    }
}

impl<'de> Deserialize<'de> for Fields {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Fields::from_str(&s).map_err(serde::de::Error::custom)
    }
}

use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Value of the `status` field for successful lookups
pub const STATUS_SUCCESS: &str = "success";
/// Value of the `status` field for failed lookups
pub const STATUS_FAIL: &str = "fail";

/// Result of a single geolocation lookup.
///
/// Mirrors the JSON object returned by the upstream service. Every field is
/// optional because the upstream only returns the fields that were selected
/// (see [`Fields`](crate::Fields)). Absent fields are skipped when
/// serializing.
///
/// Failed lookups, whether reported by the upstream or synthesized locally,
/// have a `status` of `"fail"` and a `message` describing the cause.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupResult {
    /// IP used for the query
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    /// `success` or `fail`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Included only when status is `fail`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub continent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub continent_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
    /// Region/state short code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lon: Option<f64>,
    /// Timezone name, e.g. `America/New_York`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    /// UTC DST offset in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub isp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub org: Option<String>,
    /// AS number and organization, e.g. `AS15169 Google LLC`
    #[serde(rename = "as", skip_serializing_if = "Option::is_none")]
    pub as_: Option<String>,
    #[serde(rename = "asname", skip_serializing_if = "Option::is_none")]
    pub as_name: Option<String>,
    /// Reverse DNS of the IP (slow, only when requested)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reverse: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mobile: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hosting: Option<bool>,
}

impl LookupResult {
    /// Create a failed result for `address` carrying `message` as
    /// diagnostic
    #[must_use]
    pub fn fail<A: Into<String>, M: Into<String>>(address: A, message: M) -> Self {
        Self {
            query: Some(address.into()),
            status: Some(STATUS_FAIL.into()),
            message: Some(message.into()),
            ..Default::default()
        }
    }

    /// True if the upstream reported a successful lookup
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.as_deref() == Some(STATUS_SUCCESS)
    }

    /// True if the lookup failed, either upstream or locally
    #[inline]
    #[must_use]
    pub fn is_fail(&self) -> bool {
        self.status.as_deref() == Some(STATUS_FAIL)
    }
}

impl Display for LookupResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let query = self.query.as_deref().unwrap_or("-");
        let status = self.status.as_deref().unwrap_or("unknown");
        write!(f, "{query} [{status}]")?;

        if self.is_fail() {
            if let Some(message) = &self.message {
                write!(f, " | {message}")?;
            }
            return Ok(());
        }

        let place: Vec<&str> = [&self.city, &self.region_name, &self.country]
            .into_iter()
            .filter_map(|part| part.as_deref())
            .collect();
        if !place.is_empty() {
            write!(f, " {}", place.join(", "))?;
        }
        if let Some(as_) = &self.as_ {
            write!(f, " ({as_})")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_deserialize_partial_body() {
        let body = r#"{
            "query": "8.8.8.8",
            "status": "success",
            "country": "United States",
            "countryCode": "US",
            "regionName": "Virginia",
            "city": "Ashburn",
            "lat": 39.03,
            "lon": -77.5,
            "as": "AS15169 Google LLC",
            "mobile": false
        }"#;
        let result: LookupResult = serde_json::from_str(body).unwrap();

        assert!(result.is_success());
        assert_eq!(result.country_code.as_deref(), Some("US"));
        assert_eq!(result.as_.as_deref(), Some("AS15169 Google LLC"));
        assert_eq!(result.mobile, Some(false));
        assert_eq!(result.zip, None);
        assert_eq!(result.isp, None);
    }

    #[test]
    fn test_absent_fields_are_not_serialized() {
        let result = LookupResult::fail("192.168.0.1", "private range");
        assert_eq!(
            serde_json::to_string(&result).unwrap(),
            r#"{"query":"192.168.0.1","status":"fail","message":"private range"}"#
        );
    }

    #[test]
    fn test_fail_helpers() {
        let result = LookupResult::fail("1 2 3 4", "invalid query");
        assert!(result.is_fail());
        assert!(!result.is_success());
        assert!(!LookupResult::default().is_fail());
    }

    #[test]
    fn test_display() {
        let result = LookupResult {
            query: Some("8.8.8.8".into()),
            status: Some(STATUS_SUCCESS.into()),
            country: Some("United States".into()),
            region_name: Some("Virginia".into()),
            city: Some("Ashburn".into()),
            as_: Some("AS15169 Google LLC".into()),
            ..Default::default()
        };
        assert_eq!(
            result.to_string(),
            "8.8.8.8 [success] Ashburn, Virginia, United States (AS15169 Google LLC)"
        );
        assert_eq!(
            LookupResult::fail("192.168.0.1", "private range").to_string(),
            "192.168.0.1 [fail] | private range"
        );
    }
}

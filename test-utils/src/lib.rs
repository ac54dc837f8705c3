//! `test-utils` is used for testing in both `ipapi-lib` and `ipapi-bin`.
//! This crate does not depend on `ipapi-lib` or `ipapi-bin`, else we would get dependency cycles.
//! Macros are used instead, so that the importer is responsible for providing the dependencies.

/// Upstream reply for `8.8.8.8` with the default field selection
pub const GOOGLE_DNS_RESPONSE: &str = r#"{
    "query": "8.8.8.8",
    "status": "success",
    "country": "United States",
    "countryCode": "US",
    "region": "VA",
    "regionName": "Virginia",
    "city": "Ashburn",
    "zip": "20149",
    "lat": 39.03,
    "lon": -77.5,
    "timezone": "America/New_York",
    "isp": "Google LLC",
    "org": "Google Public DNS",
    "as": "AS15169 Google LLC"
}"#;

/// Upstream reply for `2606:4700:4700::1111` with the default field selection
pub const CLOUDFLARE_DNS_RESPONSE: &str = r#"{
    "query": "2606:4700:4700::1111",
    "status": "success",
    "country": "Canada",
    "countryCode": "CA",
    "region": "QC",
    "regionName": "Quebec",
    "city": "Montreal",
    "zip": "H4X",
    "lat": 45.5,
    "lon": -73.6,
    "timezone": "America/Toronto",
    "isp": "Cloudflare, Inc.",
    "org": "",
    "as": "AS13335 Cloudflare, Inc."
}"#;

/// Upstream reply for an address in a private network
pub const PRIVATE_RANGE_RESPONSE: &str =
    r#"{"query":"192.168.0.1","status":"fail","message":"private range"}"#;

/// Upstream reply for something which is not an address at all
pub const INVALID_QUERY_RESPONSE: &str =
    r#"{"query":"1 2 3 4","status":"fail","message":"invalid query"}"#;

/// Create a mock web server, which responds with a predefined status when
/// handling any lookup
#[macro_export]
macro_rules! mock_server {
    ($status:expr $(, $func:tt ($($arg:expr),*))*) => {{
        let mock_server = wiremock::MockServer::start().await;
        let response_template = wiremock::ResponseTemplate::new($status);
        let template = response_template$(.$func($($arg),*))*;
        wiremock::Mock::given(wiremock::matchers::method("GET")).respond_with(template).mount(&mock_server).await;
        mock_server
    }};
}

/// Set up a mock lookup endpoint under `/json/` which answers every given
/// address with the given body and a generous rate limit window.
///
/// ```ignore
/// let mock_server = mock_lookup_server!(
///     "8.8.8.8" => GOOGLE_DNS_RESPONSE,
///     "192.168.0.1" => PRIVATE_RANGE_RESPONSE,
/// );
/// ```
#[macro_export]
macro_rules! mock_lookup_server {
    ($($address:expr => $body:expr),+ $(,)?) => {{
        let mock_server = wiremock::MockServer::start().await;
        $(
            let template = wiremock::ResponseTemplate::new(200)
                .insert_header("X-Rl", "44")
                .insert_header("X-Ttl", "60")
                .set_body_raw($body, "application/json; charset=utf-8");
            wiremock::Mock::given(wiremock::matchers::method("GET"))
                .and(wiremock::matchers::path(format!("/json/{}", $address)))
                .respond_with(template)
                .mount(&mock_server)
                .await;
        )+
        mock_server
    }};
}

/// The lookup endpoint of a mock server, e.g. `http://127.0.0.1:1234/json/`
#[macro_export]
macro_rules! lookup_endpoint {
    ($mock_server:expr) => {
        format!("{}/json/", $mock_server.uri())
    };
}

#[cfg(test)]
mod geolocator {
    use std::time::Duration;

    use ipapi_lib::{Config, ErrorKind, Field, Fields, Geolocator};
    use pretty_assertions::assert_eq;
    use secrecy::SecretString;
    use test_utils::{
        CLOUDFLARE_DNS_RESPONSE, GOOGLE_DNS_RESPONSE, INVALID_QUERY_RESPONSE,
        PRIVATE_RANGE_RESPONSE, lookup_endpoint, mock_lookup_server, mock_server,
    };
    use url::Url;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path, query_param},
    };

    fn config_for(endpoint: &str) -> Config {
        Config::builder()
            .endpoint(Url::parse(endpoint).unwrap())
            .backoff_buffer(Duration::from_millis(10))
            .fallback_backoff(Duration::from_millis(50))
            .timeout(Duration::from_secs(2))
            .build()
    }

    #[tokio::test]
    async fn test_lookup_google_dns() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/json/8.8.8.8"))
            .and(query_param("fields", "country,city"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                r#"{"query":"8.8.8.8","status":"success","country":"United States","city":"Ashburn"}"#,
                "application/json",
            ))
            .expect(1)
            .mount(&mock_server)
            .await;

        let config = Config::builder()
            .endpoint(Url::parse(&lookup_endpoint!(mock_server)).unwrap())
            .fields([Field::Country, Field::City].into_iter().collect::<Fields>())
            .build();
        let geolocator = Geolocator::new(config).unwrap();
        let result = geolocator.lookup("8.8.8.8").await.unwrap();

        assert_eq!(result.query.as_deref(), Some("8.8.8.8"));
        assert!(result.is_success());
        assert_eq!(result.country.as_deref(), Some("United States"));
        assert_eq!(result.city.as_deref(), Some("Ashburn"));
        assert_eq!(result.zip, None);
    }

    #[tokio::test]
    async fn test_lookup_known_addresses() {
        let mock_server = mock_lookup_server!(
            "8.8.8.8" => GOOGLE_DNS_RESPONSE,
            "2606:4700:4700::1111" => CLOUDFLARE_DNS_RESPONSE,
            "192.168.0.1" => PRIVATE_RANGE_RESPONSE,
            "1%202%203%204" => INVALID_QUERY_RESPONSE,
        );
        let geolocator = Geolocator::new(config_for(&lookup_endpoint!(mock_server))).unwrap();

        let google = geolocator.submit("8.8.8.8").unwrap();
        let cloudflare = geolocator.submit("2606:4700:4700::1111").unwrap();
        let private = geolocator.submit("192.168.0.1").unwrap();
        let invalid = geolocator.submit("1 2 3 4").unwrap();

        let google = google.await.unwrap();
        assert_eq!(google.region.as_deref(), Some("VA"));
        assert_eq!(google.zip.as_deref(), Some("20149"));
        assert_eq!(google.timezone.as_deref(), Some("America/New_York"));
        assert_eq!(google.org.as_deref(), Some("Google Public DNS"));

        let cloudflare = cloudflare.await.unwrap();
        assert_eq!(cloudflare.country_code.as_deref(), Some("CA"));
        assert_eq!(cloudflare.city.as_deref(), Some("Montreal"));
        assert_eq!(cloudflare.isp.as_deref(), Some("Cloudflare, Inc."));
        assert_eq!(cloudflare.as_.as_deref(), Some("AS13335 Cloudflare, Inc."));

        let private = private.await.unwrap();
        assert!(private.is_fail());
        assert_eq!(private.message.as_deref(), Some("private range"));

        let invalid = invalid.await.unwrap();
        assert!(invalid.is_fail());
        assert_eq!(invalid.message.as_deref(), Some("invalid query"));
    }

    #[tokio::test]
    async fn test_lookup_with_lang_and_key() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/json/8.8.8.8"))
            .and(query_param("lang", "de"))
            .and(query_param("key", "s3cr3t"))
            .respond_with(ResponseTemplate::new(200).set_body_string(GOOGLE_DNS_RESPONSE))
            .expect(1)
            .mount(&mock_server)
            .await;

        let config = Config::builder()
            .endpoint(Url::parse(&lookup_endpoint!(mock_server)).unwrap())
            .lang(Some("de".to_string()))
            .api_key(Some(SecretString::from("s3cr3t")))
            .build();
        let result = Geolocator::new(config)
            .unwrap()
            .lookup("8.8.8.8")
            .await
            .unwrap();
        assert!(result.is_success());
    }

    #[tokio::test]
    async fn test_unexpected_status() {
        let mock_server = mock_server!(403, set_body_string("SSL unavailable for this endpoint"));
        let geolocator = Geolocator::new(config_for(&lookup_endpoint!(mock_server))).unwrap();

        let result = geolocator.lookup("8.8.8.8").await.unwrap();

        assert!(result.is_fail());
        assert_eq!(result.query.as_deref(), Some("8.8.8.8"));
        assert_eq!(
            result.message.as_deref(),
            Some("Upstream service responded with 403 Forbidden")
        );
        assert_eq!(mock_server.received_requests().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let mock_server = mock_server!(200, set_body_string("<html>not json</html>"));
        let geolocator = Geolocator::new(config_for(&lookup_endpoint!(mock_server))).unwrap();

        let result = geolocator.lookup("8.8.8.8").await.unwrap();

        assert!(result.is_fail());
        assert!(
            result
                .message
                .unwrap()
                .starts_with("Malformed response body")
        );
    }

    #[tokio::test]
    async fn test_throttled_until_budget_runs_out() {
        let mock_server = mock_server!(
            429,
            insert_header("X-Rl", "0"),
            insert_header("X-Ttl", "0")
        );
        let geolocator = Geolocator::new(config_for(&lookup_endpoint!(mock_server))).unwrap();

        let result = geolocator.lookup("8.8.8.8").await.unwrap();

        assert_eq!(
            result.message.as_deref(),
            Some("Rate limit exceeded after 2 attempt(s)")
        );
        assert_eq!(mock_server.received_requests().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_timeout_is_a_transport_failure() {
        let mock_server = mock_server!(
            200,
            set_body_string(GOOGLE_DNS_RESPONSE),
            set_delay(Duration::from_millis(500))
        );
        let config = Config::builder()
            .endpoint(Url::parse(&lookup_endpoint!(mock_server)).unwrap())
            .timeout(Duration::from_millis(50))
            .build();
        let geolocator = Geolocator::new(config).unwrap();

        let result = geolocator.lookup("8.8.8.8").await.unwrap();

        assert!(result.is_fail());
        assert!(result.message.unwrap().ends_with("request timed out"));
        // Network errors are not retried
        assert_eq!(mock_server.received_requests().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unreachable_upstream() {
        // Nothing listens on the discard port
        let geolocator = Geolocator::new(config_for("http://127.0.0.1:9/json/")).unwrap();

        let result = geolocator.lookup("8.8.8.8").await.unwrap();

        assert!(result.is_fail());
        assert!(
            result
                .message
                .unwrap()
                .starts_with("Network error while trying to reach the lookup endpoint")
        );
    }

    #[tokio::test]
    async fn test_queue_full_is_reported_synchronously() {
        let mock_server = mock_lookup_server!("8.8.8.8" => GOOGLE_DNS_RESPONSE);
        let config = Config::builder()
            .endpoint(Url::parse(&lookup_endpoint!(mock_server)).unwrap())
            .capacity(1_usize)
            .build();
        let geolocator = Geolocator::new(config).unwrap();

        let handle = geolocator.submit("8.8.8.8").unwrap();
        let err = geolocator.submit("8.8.8.8").unwrap_err();
        assert_eq!(err, ErrorKind::QueueFull { capacity: 1 });
        assert!(err.is_admission_error());

        assert!(handle.await.unwrap().is_success());
        assert_eq!(mock_server.received_requests().await.unwrap().len(), 1);
    }
}

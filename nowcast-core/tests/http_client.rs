//! Integration tests for HttpUpstreamClient using wiremock.

use std::time::Duration;

use nowcast_core::{
    Coordinates, HttpUpstreamClient, ObservationKind, UpstreamClient, UpstreamError,
    provider::Endpoints,
    retry::RetryPolicy,
};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const RALEIGH: Coordinates = Coordinates { latitude: 35.7796, longitude: -78.6382 };

fn fast_retry(max_retries: u32) -> RetryPolicy {
    RetryPolicy {
        max_retries,
        initial_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(5),
    }
}

fn client_for(server: &MockServer, retry: RetryPolicy) -> HttpUpstreamClient {
    HttpUpstreamClient::new(Endpoints::with_base(&server.uri()), Duration::from_secs(5), retry)
        .unwrap()
}

#[tokio::test]
async fn weather_request_embeds_coordinates() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .and(query_param("latitude", "35.7796"))
        .and(query_param("longitude", "-78.6382"))
        .and(query_param("forecast_hours", "24"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "current": {"temperature_2m": 20.0}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let raw = client_for(&server, RetryPolicy::none())
        .fetch(RALEIGH, ObservationKind::CurrentWeather)
        .await
        .unwrap();

    assert_eq!(raw["current"]["temperature_2m"], 20.0);
}

#[tokio::test]
async fn air_quality_and_sun_times_hit_their_endpoints() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/air-quality"))
        .and(query_param("current", "us_aqi"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "current": {"us_aqi": 37}
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/json"))
        .and(query_param("lat", "35.7796"))
        .and(query_param("lng", "-78.6382"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "results": {"sunrise": "7:20:41 AM", "sunset": "6:39:02 PM"},
            "status": "OK"
        })))
        .mount(&server)
        .await;

    let client = client_for(&server, RetryPolicy::none());

    let air = client.fetch(RALEIGH, ObservationKind::AirQuality).await.unwrap();
    assert_eq!(air["current"]["us_aqi"], 37);

    let sun = client.fetch(RALEIGH, ObservationKind::SunTimes).await.unwrap();
    assert_eq!(sun["results"]["sunrise"], "7:20:41 AM");
}

#[tokio::test]
async fn client_error_is_unavailable_and_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/air-quality"))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad latitude"))
        .expect(1)
        .mount(&server)
        .await;

    let err = client_for(&server, fast_retry(3))
        .fetch(RALEIGH, ObservationKind::AirQuality)
        .await
        .unwrap_err();

    let UpstreamError::Unavailable { kind, reason } = err;
    assert_eq!(kind, ObservationKind::AirQuality);
    assert!(reason.contains("400"));
    assert!(reason.contains("bad latitude"));
}

#[tokio::test]
async fn malformed_json_is_unavailable() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/json"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let err = client_for(&server, fast_retry(2))
        .fetch(RALEIGH, ObservationKind::SunTimes)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ObservationKind::SunTimes);
    assert!(err.to_string().contains("malformed JSON"));
}

#[tokio::test]
async fn server_error_is_retried_until_success() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "current": {"temperature_2m": 4.5}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let raw = client_for(&server, fast_retry(2))
        .fetch(RALEIGH, ObservationKind::CurrentWeather)
        .await
        .unwrap();

    assert_eq!(raw["current"]["temperature_2m"], 4.5);
}

#[tokio::test]
async fn retries_are_bounded() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let err = client_for(&server, fast_retry(2))
        .fetch(RALEIGH, ObservationKind::CurrentWeather)
        .await
        .unwrap_err();

    assert!(err.to_string().contains("500"));
}

#[tokio::test]
async fn unreachable_host_is_unavailable() {
    // Port 9 (discard) on localhost is not expected to be listening.
    let endpoints = Endpoints::with_base("http://127.0.0.1:9");
    let client =
        HttpUpstreamClient::new(endpoints, Duration::from_secs(2), RetryPolicy::none()).unwrap();

    let err = client.fetch(RALEIGH, ObservationKind::CurrentWeather).await.unwrap_err();
    assert_eq!(err.kind(), ObservationKind::CurrentWeather);
}

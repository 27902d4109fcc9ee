use chrono::NaiveDate;
use httpmock::prelude::*;
use outage_schedule::core::sun_times::{SunLocation, SunTimeService, SunTimesConfig};
use std::time::Duration;

fn service(server: &MockServer) -> SunTimeService {
    SunTimeService::new(SunTimesConfig {
        endpoint: server.url("/json"),
        location: SunLocation::default(),
        cache_capacity: 366,
        timeout: Duration::from_secs(5),
    })
}

fn june_first() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
}

fn ok_body() -> serde_json::Value {
    serde_json::json!({
        "results": {
            "date": "2024-06-01",
            "sunrise": "6:45:30 AM",
            "sunset": "5:45:00 PM",
            "first_light": "5:26:45 AM",
            "last_light": "7:03:45 PM",
            "dawn": "6:21:42 AM",
            "dusk": "6:08:48 PM",
            "solar_noon": "12:15:15 PM",
            "golden_hour": "5:13:48 PM",
            "day_length": "10:59:30",
            "timezone": "Indian/Mauritius",
            "utc_offset": 240
        },
        "status": "OK"
    })
}

#[tokio::test]
async fn test_successful_lookup_is_memoized() {
    let server = MockServer::start();
    let api_mock = server.mock(|when, then| {
        when.method(GET)
            .path("/json")
            .query_param("lat", "-20.3484")
            .query_param("lng", "57.5522")
            .query_param("timezone", "Indian/Mauritius")
            .query_param("date", "2024-06-01");
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(ok_body());
    });

    let service = service(&server);
    let first = service.get(june_first()).await;
    let second = service.get(june_first()).await;

    api_mock.assert_hits(1);
    assert_eq!(first, second);
    assert!((first.sunrise - (6.0 + 45.0 / 60.0 + 30.0 / 3600.0)).abs() < 1e-9);
    assert!((first.sunset - 17.75).abs() < 1e-9);
    assert_eq!(first.sunrise_formatted, "6:45:30 AM");
    assert_eq!(first.golden_hour, "5:13:48 PM");
    assert_eq!(first.day_length, "10:59:30");
    assert_eq!(service.cached_len(), 1);
}

#[tokio::test]
async fn test_failure_returns_defaults_and_does_not_poison_cache() {
    let server = MockServer::start();
    let mut failing = server.mock(|when, then| {
        when.method(GET).path("/json");
        then.status(500);
    });

    let service = service(&server);
    let fallback = service.get(june_first()).await;

    failing.assert_hits(1);
    assert_eq!(fallback.sunrise, 6.0);
    assert_eq!(fallback.sunset, 18.0);
    assert_eq!(fallback.sunrise_formatted, "6:00 AM");
    assert_eq!(fallback.sunset_formatted, "6:00 PM");
    assert!(fallback.golden_hour.is_empty());
    assert_eq!(service.cached_len(), 0);

    failing.delete();
    let recovered = server.mock(|when, then| {
        when.method(GET).path("/json");
        then.status(200).json_body(ok_body());
    });

    let times = service.get(june_first()).await;
    recovered.assert_hits(1);
    assert_eq!(times.sunset_formatted, "5:45:00 PM");
    assert_eq!(service.cached_len(), 1);
}

#[tokio::test]
async fn test_non_ok_status_falls_back() {
    let server = MockServer::start();
    let api_mock = server.mock(|when, then| {
        when.method(GET).path("/json");
        then.status(200)
            .json_body(serde_json::json!({"results": null, "status": "INVALID_REQUEST"}));
    });

    let service = service(&server);
    let times = service.get(june_first()).await;
    let again = service.get(june_first()).await;

    // Not cached, so the second call goes back to the network.
    api_mock.assert_hits(2);
    assert_eq!(times.sunrise, 6.0);
    assert_eq!(again.sunrise, 6.0);
}

#[tokio::test]
async fn test_unparseable_field_degrades_to_zero() {
    let server = MockServer::start();
    let mut body = ok_body();
    body["results"]["sunset"] = serde_json::json!("dusk-ish");
    server.mock(|when, then| {
        when.method(GET).path("/json");
        then.status(200).json_body(body);
    });

    let times = service(&server).get(june_first()).await;
    assert_eq!(times.sunset, 0.0);
    assert_eq!(times.sunset_formatted, "dusk-ish");
    assert!(times.sunrise > 6.0);
}

#[tokio::test]
async fn test_dates_are_cached_independently() {
    let server = MockServer::start();
    let api_mock = server.mock(|when, then| {
        when.method(GET).path("/json");
        then.status(200).json_body(ok_body());
    });

    let service = service(&server);
    service.get(june_first()).await;
    service.get(june_first().succ_opt().unwrap()).await;
    service.get(june_first()).await;

    api_mock.assert_hits(2);
    assert_eq!(service.cached_len(), 2);
}

//! Mock listing/API endpoints and harvester construction

use doi_harvest::{FetchConfig, HarvestConfig, Harvester};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Publication id used by every mocked listing
pub const PUBID: &str = "J140965";

/// Depositor report body: two header lines then one identifier per line
pub fn listing_body(ids: &[&str]) -> String {
    let mut body = String::from("DOI\tDATE\r\n------------------\r\n");
    for id in ids {
        body.push_str(id);
        body.push_str(" 2017-09-03 1\r\n");
    }
    body
}

/// Works API response for `doi` with the given `message.type`
pub fn work_body(doi: &str, kind: &str) -> String {
    json!({
        "status": "ok",
        "message-type": "work",
        "message": {
            "DOI": doi,
            "type": kind,
            "title": [format!("Über {doi}")],
        }
    })
    .to_string()
}

/// Serve `ids` as the listing for [`PUBID`]
pub async fn mount_listing(server: &MockServer, ids: &[&str]) {
    Mock::given(method("GET"))
        .and(path("/depositorreport"))
        .and(query_param("pubid", PUBID))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_body(ids)))
        .mount(server)
        .await;
}

/// Serve a works record for `doi`
pub async fn mount_work(server: &MockServer, doi: &str, kind: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/works/{doi}")))
        .respond_with(ResponseTemplate::new(200).set_body_string(work_body(doi, kind)))
        .mount(server)
        .await;
}

/// Serve an arbitrary status/body for `doi`
pub async fn mount_raw(server: &MockServer, doi: &str, status: u16, body: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/works/{doi}")))
        .respond_with(ResponseTemplate::new(status).set_body_string(body))
        .mount(server)
        .await;
}

/// Listing URL on the mock server
pub fn listing_url(server: &MockServer) -> String {
    format!("{}/depositorreport?pubid={}", server.uri(), PUBID)
}

/// Harvest configuration pointing at the mock server with fast retries
pub fn test_config(server: &MockServer, workers: usize) -> HarvestConfig {
    HarvestConfig {
        api_base: format!("{}/works/", server.uri()),
        workers,
        fetch: FetchConfig {
            timeout: Duration::from_secs(5),
            listing_timeout: Duration::from_secs(5),
            max_attempts: 3,
            retry_delay: Duration::from_millis(10),
            ..Default::default()
        },
        ..Default::default()
    }
}

/// Harvester for the mock server
pub fn test_harvester(server: &MockServer, workers: usize) -> Harvester {
    Harvester::new(&test_config(server, workers)).expect("test harvester")
}

//! Contract Test: OPNsense Host Override Provider
//!
//! Runs the provider against a mocked OPNsense API.
//!
//! Constraints verified:
//! - The managed override is resolved once, by hostname or FQDN
//! - Reads report the selected record's server address
//! - A switch keeps the override's fields, saves, then reconfigures Unbound
//! - No write is sent when the override already serves the target
//! - Dry-run mode never writes
//! - Credentials travel as HTTP Basic auth and must be `key:secret`

use gslb_core::traits::GslbProvider;
use gslb_core::{Error, FailoverTargets, ProviderConfig, ProviderRegistry};
use gslb_provider_opnsense::OpnSenseProvider;

use serde_json::{Value, json};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const HOST: &str = "test-host";
const UUID: &str = "test-uuid-123";
const PRIMARY_IP: &str = "10.0.0.1";
const SECONDARY_IP: &str = "10.0.0.2";
const AUTH: &str = "key:secret";
// base64("key:secret")
const BASIC_AUTH: &str = "Basic a2V5OnNlY3JldA==";

const SEARCH: &str = "/api/unbound/settings/searchHostOverride/";
const GET: &str = "/api/unbound/settings/getHostOverride/test-uuid-123";
const SET: &str = "/api/unbound/settings/setHostOverride/test-uuid-123";
const RECONFIGURE: &str = "/api/unbound/service/reconfigure";

fn targets() -> FailoverTargets {
    FailoverTargets::new(PRIMARY_IP, SECONDARY_IP)
}

fn search_rows(rows: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "rows": rows }))
}

fn single_row() -> Value {
    json!([{ "uuid": UUID, "hostname": HOST, "domain": "local", "rr": "A (IPv4 address)" }])
}

fn host_override(a_selected: i64, aaaa_selected: i64, server: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "host": {
            "enabled": "1",
            "hostname": HOST,
            "domain": "local",
            "rr": {
                "A": { "value": "A (IPv4 address)", "selected": a_selected },
                "AAAA": { "value": "AAAA (IPv6 address)", "selected": aaaa_selected },
                "MX": { "value": "MX (Mail server)", "selected": 0 }
            },
            "mxprio": "",
            "mx": "",
            "ttl": "60",
            "server": server,
            "description": "GSLB record"
        }
    }))
}

fn expected_set_body(server: &str) -> Value {
    json!({
        "host": {
            "enabled": "1",
            "hostname": HOST,
            "domain": "local",
            "rr": "A",
            "mxprio": "",
            "mx": "",
            "ttl": "60",
            "server": server,
            "description": "GSLB record"
        }
    })
}

/// A server that resolves the managed override to `UUID`
async fn firewall() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SEARCH))
        .respond_with(search_rows(single_row()))
        .mount(&server)
        .await;
    server
}

async fn connect(server: &MockServer, dry_run: bool) -> OpnSenseProvider {
    OpnSenseProvider::connect(server.uri(), AUTH, HOST, targets(), dry_run)
        .await
        .expect("provider should resolve the managed override")
}

#[tokio::test]
async fn connect_resolves_record_uuid_with_basic_auth() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SEARCH))
        .and(header("authorization", BASIC_AUTH))
        .and(body_json(json!({ "rowCount": 10, "searchPhrase": HOST })))
        .respond_with(search_rows(single_row()))
        .expect(1)
        .mount(&server)
        .await;

    let provider = connect(&server, false).await;

    assert_eq!(provider.record_uuid(), UUID);
    assert_eq!(provider.provider_name(), "opnsense");
}

#[tokio::test]
async fn secret_may_contain_colons() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SEARCH))
        // base64("key:sec:ret")
        .and(header("authorization", "Basic a2V5OnNlYzpyZXQ="))
        .respond_with(search_rows(single_row()))
        .expect(1)
        .mount(&server)
        .await;

    let provider = OpnSenseProvider::connect(server.uri(), "key:sec:ret", HOST, targets(), false)
        .await
        .unwrap();

    assert_eq!(provider.record_uuid(), UUID);
}

#[tokio::test]
async fn bare_token_is_rejected_without_contacting_firewall() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SEARCH))
        .respond_with(search_rows(single_row()))
        .expect(0)
        .mount(&server)
        .await;

    let result = OpnSenseProvider::connect(server.uri(), "apitoken", HOST, targets(), false).await;

    assert!(matches!(result, Err(Error::Config(_))));
}

#[tokio::test]
async fn connect_matches_fully_qualified_name() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SEARCH))
        .respond_with(search_rows(json!([
            { "uuid": "other", "hostname": "test-host", "domain": "example.org", "rr": "A (IPv4 address)" },
            { "uuid": UUID, "hostname": "test-host", "domain": "local", "rr": "A (IPv4 address)" }
        ])))
        .mount(&server)
        .await;

    let provider = OpnSenseProvider::connect(server.uri(), AUTH, "test-host.local", targets(), false)
        .await
        .unwrap();

    assert_eq!(provider.record_uuid(), UUID);
}

#[tokio::test]
async fn connect_fails_when_no_record_matches() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SEARCH))
        .respond_with(search_rows(json!([
            { "uuid": "mx", "hostname": HOST, "domain": "local", "rr": "MX (Mail server)" }
        ])))
        .mount(&server)
        .await;

    let err = OpnSenseProvider::connect(server.uri(), AUTH, HOST, targets(), false)
        .await
        .unwrap_err();

    assert!(err.to_string().starts_with("getting GSLB record"));
    assert!(
        err.to_string()
            .contains("no GSLB record found for hostname test-host")
    );
}

#[tokio::test]
async fn connect_fails_when_record_is_ambiguous() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SEARCH))
        .respond_with(search_rows(json!([
            { "uuid": "uuid-1", "hostname": HOST, "domain": "local", "rr": "A (IPv4 address)" },
            { "uuid": "uuid-2", "hostname": HOST, "domain": "lan", "rr": "AAAA (IPv6 address)" }
        ])))
        .mount(&server)
        .await;

    let err = OpnSenseProvider::connect(server.uri(), AUTH, HOST, targets(), false)
        .await
        .unwrap_err();

    assert!(
        err.to_string()
            .contains("multiple GSLB records found for hostname test-host")
    );
}

#[tokio::test]
async fn connect_surfaces_rejected_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SEARCH))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = OpnSenseProvider::connect(server.uri(), AUTH, HOST, targets(), false)
        .await
        .unwrap_err();

    assert!(matches!(err.root(), Error::Authentication(_)));
    assert!(!err.to_string().contains("secret"));
}

#[tokio::test]
async fn current_ip_reads_selected_record() {
    let server = firewall().await;
    Mock::given(method("GET"))
        .and(path(GET))
        .respond_with(host_override(1, 0, PRIMARY_IP))
        .expect(2)
        .mount(&server)
        .await;

    let provider = connect(&server, false).await;

    // Never cached: each read hits the firewall
    assert_eq!(provider.current_ip().await.unwrap(), PRIMARY_IP);
    assert_eq!(provider.current_ip().await.unwrap(), PRIMARY_IP);
}

#[tokio::test]
async fn current_ip_rejects_incomplete_records() {
    for (a, aaaa, server_ip, message) in [
        (1, 0, "", "A record selected but no server IP set"),
        (0, 1, "", "AAAA record selected but no server IP set"),
        (0, 0, PRIMARY_IP, "no A or AAAA record selected"),
    ] {
        let server = firewall().await;
        Mock::given(method("GET"))
            .and(path(GET))
            .respond_with(host_override(a, aaaa, server_ip))
            .mount(&server)
            .await;

        let provider = connect(&server, false).await;
        let err = provider.current_ip().await.unwrap_err();

        assert!(err.to_string().contains(message), "{}", err);
        assert!(matches!(err.root(), Error::Record(_)));
    }
}

#[tokio::test]
async fn current_ip_maps_server_errors() {
    let server = firewall().await;
    Mock::given(method("GET"))
        .and(path(GET))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let provider = connect(&server, false).await;
    let err = provider.current_ip().await.unwrap_err();

    assert!(err.to_string().contains("503"));
    assert!(err.to_string().contains("maintenance"));
}

#[tokio::test]
async fn switch_saves_then_reconfigures() {
    let server = firewall().await;
    Mock::given(method("GET"))
        .and(path(GET))
        .respond_with(host_override(1, 0, PRIMARY_IP))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(SET))
        .and(header("authorization", BASIC_AUTH))
        .and(body_json(expected_set_body(SECONDARY_IP)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": "saved" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(RECONFIGURE))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "response": "OK" })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = connect(&server, false).await;

    provider.switch_to_secondary().await.unwrap();
}

#[tokio::test]
async fn switch_to_served_address_writes_nothing() {
    let server = firewall().await;
    Mock::given(method("GET"))
        .and(path(GET))
        .respond_with(host_override(1, 0, PRIMARY_IP))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(SET))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": "saved" })))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(RECONFIGURE))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "response": "OK" })))
        .expect(0)
        .mount(&server)
        .await;

    let provider = connect(&server, false).await;

    provider.switch_to_primary().await.unwrap();
}

#[tokio::test]
async fn unsaved_override_skips_reconfigure() {
    let server = firewall().await;
    Mock::given(method("GET"))
        .and(path(GET))
        .respond_with(host_override(1, 0, PRIMARY_IP))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(SET))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": "failed" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(RECONFIGURE))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "response": "OK" })))
        .expect(0)
        .mount(&server)
        .await;

    let provider = connect(&server, false).await;
    let err = provider.switch_to_secondary().await.unwrap_err();

    assert!(err.to_string().contains("unexpected result failed"), "{}", err);
}

#[tokio::test]
async fn failed_reconfigure_fails_the_switch() {
    let server = firewall().await;
    Mock::given(method("GET"))
        .and(path(GET))
        .respond_with(host_override(1, 0, PRIMARY_IP))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(SET))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": "saved" })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(RECONFIGURE))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "response": "FAILED" })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = connect(&server, false).await;
    let err = provider.switch_to_secondary().await.unwrap_err();

    assert!(err.to_string().starts_with("restarting Unbound service"), "{}", err);
}

#[tokio::test]
async fn switch_requires_selected_record_type() {
    let server = firewall().await;
    Mock::given(method("GET"))
        .and(path(GET))
        .respond_with(host_override(0, 0, PRIMARY_IP))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(SET))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let provider = connect(&server, false).await;
    let err = provider.switch_to_secondary().await.unwrap_err();

    assert!(matches!(err.root(), Error::Record(_)));
}

#[tokio::test]
async fn dry_run_reads_but_never_writes() {
    let server = firewall().await;
    Mock::given(method("GET"))
        .and(path(GET))
        .respond_with(host_override(1, 0, PRIMARY_IP))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(SET))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": "saved" })))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(RECONFIGURE))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "response": "OK" })))
        .expect(0)
        .mount(&server)
        .await;

    let provider = connect(&server, true).await;

    assert!(provider.is_dry_run());
    assert_eq!(provider.current_ip().await.unwrap(), PRIMARY_IP);
    provider.switch_to_secondary().await.unwrap();
}

#[tokio::test]
async fn registry_creates_connected_provider() {
    let server = firewall().await;
    let registry = ProviderRegistry::new();
    gslb_provider_opnsense::register(&registry);

    let config = ProviderConfig::OpnSense {
        endpoint: format!("{}/", server.uri()),
        auth: AUTH.to_string(),
        dry_run: false,
    };

    let provider = registry
        .create_provider(&config, HOST, &targets())
        .await
        .unwrap();

    assert_eq!(provider.provider_name(), "opnsense");
}

#[tokio::test]
async fn debug_output_redacts_credentials() {
    let server = firewall().await;
    let provider = OpnSenseProvider::connect(server.uri(), "key:top-secret-value", HOST, targets(), false)
        .await
        .unwrap();

    let debug = format!("{:?}", provider);

    assert!(debug.contains("OpnSenseProvider"));
    assert!(debug.contains("<REDACTED>"));
    assert!(!debug.contains("top-secret-value"));
}

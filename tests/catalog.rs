mod common;

use serde_json::json;

use common::{MockTransport, ROOT, client, single_stream_catalog, url};

#[test]
fn list_arrays_returns_full_list() {
    let client = client(single_stream_catalog());
    assert_eq!(client.list_arrays(None), vec!["CE01ISSM", "CE02SHSM"]);
}

#[test]
fn list_arrays_filter_keeps_only_known_array() {
    let client = client(single_stream_catalog());
    assert_eq!(client.list_arrays(Some("CE02SHSM")), vec!["CE02SHSM"]);
    assert!(client.list_arrays(Some("GI01SUMO")).is_empty());
}

#[test]
fn list_arrays_timeout_returns_empty() {
    let client = client(MockTransport::new().timeout(ROOT));
    assert!(client.list_arrays(None).is_empty());
    assert_eq!(client.transport().requests(), vec![ROOT.to_string()]);
}

#[test]
fn non_200_is_treated_as_no_data() {
    let transport = MockTransport::new()
        .status(ROOT, 503, "Service Unavailable")
        .status(&url("/CE01ISSM"), 201, "Created");
    let client = client(transport);
    assert!(client.list_arrays(None).is_empty());
    assert!(client.list_platforms("CE01ISSM").is_empty());
}

#[test]
fn undecodable_body_is_treated_as_no_data() {
    let client = client(MockTransport::new().json(&url("/CE01ISSM"), json!({"not": "a list"})));
    assert!(client.list_platforms("CE01ISSM").is_empty());
}

#[test]
fn missing_identifier_sends_no_request() {
    let client = client(single_stream_catalog());
    assert!(client.list_platforms("").is_empty());
    assert!(client.list_sensors("CE01ISSM", "").is_empty());
    assert!(client.sensor_metadata("CE01ISSM", "MFD35", "").is_none());
    assert!(client.transport().requests().is_empty());
}

#[test]
fn each_level_uses_its_own_path() {
    let client = client(single_stream_catalog());
    assert_eq!(client.list_platforms("CE01ISSM"), vec!["MFD35"]);
    assert_eq!(client.list_sensors("CE01ISSM", "MFD35"), vec!["02-PRESFA000"]);
    let metadata = client
        .sensor_metadata("CE01ISSM", "MFD35", "02-PRESFA000")
        .unwrap();
    assert_eq!(metadata.parameters.len(), 2);
    assert_eq!(metadata.times[0].stream, "A_sample");
    assert_eq!(
        client.transport().requests(),
        vec![
            url("/CE01ISSM"),
            url("/CE01ISSM/MFD35"),
            url("/CE01ISSM/MFD35/02-PRESFA000/metadata"),
        ]
    );
}

#[test]
fn empty_metadata_is_treated_as_missing() {
    let client = client(
        MockTransport::new().json(&url("/CE01ISSM/MFD35/02-PRESFA000/metadata"), json!({"parameters": [], "times": []})),
    );
    assert!(client.sensor_metadata("CE01ISSM", "MFD35", "02-PRESFA000").is_none());
}

use crate::domain::{FileFormat, RecordLimit};
use crate::endpoint::CatalogEndpoint;

/// Server-side processing flags and the payload format of a stream request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestFlags {
    pub format: FileFormat,
    pub exec_dpa: bool,
    pub include_provenance: bool,
    pub limit: RecordLimit,
}

impl Default for RequestFlags {
    fn default() -> Self {
        Self {
            format: FileFormat::Netcdf,
            exec_dpa: true,
            include_provenance: false,
            limit: RecordLimit::default(),
        }
    }
}

/// One time-bounded request for a single stream of a single sensor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamRequest {
    pub subsite: String,
    pub node: String,
    pub sensor: String,
    pub method: String,
    pub stream: String,
    pub begin: String,
    pub end: String,
}

/// Builds the data request URL. Query parameters always appear in the same
/// order; timestamps are not percent-encoded since the server expects raw
/// colons.
pub fn build_stream_url(
    endpoint: &CatalogEndpoint,
    request: &StreamRequest,
    flags: &RequestFlags,
) -> String {
    format!(
        "{}?beginDT={}&endDT={}&limit={}&execDPA={}&format=application/{}&include_provenance={}",
        endpoint.url_for(&[
            &request.subsite,
            &request.node,
            &request.sensor,
            &request.method,
            &request.stream,
        ]),
        request.begin,
        request.end,
        flags.limit,
        flags.exec_dpa,
        flags.format.mime_suffix(),
        flags.include_provenance,
    )
}

pub fn metadata_url(endpoint: &CatalogEndpoint, array: &str, platform: &str, sensor: &str) -> String {
    endpoint.url_for(&[array, platform, sensor, "metadata"])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> StreamRequest {
        StreamRequest {
            subsite: "CE01ISSM".to_string(),
            node: "MFD35".to_string(),
            sensor: "02-PRESFA000".to_string(),
            method: "telemetered".to_string(),
            stream: "A_sample".to_string(),
            begin: "2015-05-31T00:00:00.000000Z".to_string(),
            end: "2015-06-01T00:00:00.000Z".to_string(),
        }
    }

    #[test]
    fn url_has_fixed_query_order() {
        let endpoint = CatalogEndpoint::new("http://catalog.example", 12576).unwrap();
        let url = build_stream_url(&endpoint, &request(), &RequestFlags::default());
        assert_eq!(
            url,
            "http://catalog.example:12576/sensor/inv/CE01ISSM/MFD35/02-PRESFA000/telemetered/A_sample\
             ?beginDT=2015-05-31T00:00:00.000000Z&endDT=2015-06-01T00:00:00.000Z&limit=10000\
             &execDPA=true&format=application/netcdf&include_provenance=false"
        );
    }

    #[test]
    fn flags_render_lowercase_and_unlimited() {
        let endpoint = CatalogEndpoint::default();
        let flags = RequestFlags {
            format: FileFormat::Json,
            exec_dpa: false,
            include_provenance: true,
            limit: RecordLimit::Unlimited,
        };
        let url = build_stream_url(&endpoint, &request(), &flags);
        assert!(url.ends_with("&limit=-1&execDPA=false&format=application/json&include_provenance=true"));
        assert_eq!(url, build_stream_url(&endpoint, &request(), &flags));
    }

    #[test]
    fn metadata_url_appends_metadata_segment() {
        let endpoint = CatalogEndpoint::new("http://catalog.example", 12576).unwrap();
        assert_eq!(
            metadata_url(&endpoint, "CE01ISSM", "MFD35", "02-PRESFA000"),
            "http://catalog.example:12576/sensor/inv/CE01ISSM/MFD35/02-PRESFA000/metadata"
        );
    }
}

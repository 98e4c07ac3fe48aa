#![allow(dead_code)]

use std::collections::HashMap;
use std::io::{self, Cursor, Read};
use std::sync::Mutex;

use serde_json::{Value, json};

use uframe_inventory::catalog::CatalogClient;
use uframe_inventory::endpoint::CatalogEndpoint;
use uframe_inventory::http::{HttpResponse, Transport, TransportError};

pub const ROOT: &str = "http://catalog.example:12576/sensor/inv";

pub enum Reply {
    Body {
        status: u16,
        reason: &'static str,
        content_type: Option<String>,
        content_disposition: Option<String>,
        body: Vec<u8>,
    },
    Timeout,
    /// 200 whose body yields `prefix` and then times out.
    Stall { prefix: Vec<u8> },
}

/// Body that serves its bytes once, then fails every later read.
pub struct StallingBody {
    data: Cursor<Vec<u8>>,
}

impl Read for StallingBody {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.data.read(buf)? {
            0 => Err(io::Error::new(io::ErrorKind::TimedOut, "operation timed out")),
            read => Ok(read),
        }
    }
}

/// Canned responses keyed by URL path (query string ignored).
#[derive(Default)]
pub struct MockTransport {
    routes: HashMap<String, Reply>,
    requests: Mutex<Vec<String>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn json(mut self, path: &str, value: Value) -> Self {
        self.routes.insert(
            path.to_string(),
            Reply::Body {
                status: 200,
                reason: "OK",
                content_type: Some("application/json".to_string()),
                content_disposition: None,
                body: value.to_string().into_bytes(),
            },
        );
        self
    }

    pub fn file(
        mut self,
        path: &str,
        content_type: &str,
        content_disposition: Option<&str>,
        body: &[u8],
    ) -> Self {
        self.routes.insert(
            path.to_string(),
            Reply::Body {
                status: 200,
                reason: "OK",
                content_type: Some(content_type.to_string()),
                content_disposition: content_disposition.map(str::to_string),
                body: body.to_vec(),
            },
        );
        self
    }

    pub fn status(mut self, path: &str, status: u16, reason: &'static str) -> Self {
        self.routes.insert(
            path.to_string(),
            Reply::Body {
                status,
                reason,
                content_type: None,
                content_disposition: None,
                body: Vec::new(),
            },
        );
        self
    }

    pub fn timeout(mut self, path: &str) -> Self {
        self.routes.insert(path.to_string(), Reply::Timeout);
        self
    }

    pub fn stall(mut self, path: &str, prefix: &[u8]) -> Self {
        self.routes.insert(
            path.to_string(),
            Reply::Stall {
                prefix: prefix.to_vec(),
            },
        );
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

impl Transport for MockTransport {
    fn get(&self, url: &str) -> Result<HttpResponse, TransportError> {
        self.requests.lock().unwrap().push(url.to_string());
        let path = url.split('?').next().unwrap_or(url);
        match self.routes.get(path) {
            Some(Reply::Timeout) => Err(TransportError::Timeout(format!("timed out: {url}"))),
            Some(Reply::Stall { prefix }) => Ok(HttpResponse {
                status: 200,
                reason: Some("OK".to_string()),
                content_type: Some("application/netcdf".to_string()),
                content_disposition: None,
                body: Box::new(StallingBody {
                    data: Cursor::new(prefix.clone()),
                }),
            }),
            Some(Reply::Body {
                status,
                reason,
                content_type,
                content_disposition,
                body,
            }) => Ok(HttpResponse {
                status: *status,
                reason: Some(reason.to_string()),
                content_type: content_type.clone(),
                content_disposition: content_disposition.clone(),
                body: Box::new(Cursor::new(body.clone())),
            }),
            None => Ok(HttpResponse {
                status: 404,
                reason: Some("Not Found".to_string()),
                content_type: None,
                content_disposition: None,
                body: Box::new(Cursor::new(Vec::new())),
            }),
        }
    }
}

pub fn endpoint() -> CatalogEndpoint {
    CatalogEndpoint::new("http://catalog.example", 12576).unwrap()
}

pub fn client(transport: MockTransport) -> CatalogClient<MockTransport> {
    CatalogClient::with_transport(endpoint(), transport)
}

pub fn url(path: &str) -> String {
    format!("{ROOT}{path}")
}

pub fn pressure_metadata() -> Value {
    json!({
        "parameters": [
            {"particleKey": "pressure", "stream": "A_sample", "pdId": "PD195",
             "units": "dbar", "shape": "SCALAR", "fillValue": "-9999"},
            {"particleKey": "pressure_depth", "stream": "A_sample", "pdId": "PD2",
             "units": "m", "shape": "FUNCTION"}
        ],
        "times": [
            {"stream": "A_sample", "method": "telemetered", "sensor": "CE01ISSM-MFD35-02-PRESFA000",
             "count": 120, "beginTime": "2015-01-01T00:00:00.000Z", "endTime": "2015-06-01T00:00:00.000Z"}
        ]
    })
}

/// One array, one platform, one sensor, one telemetered stream.
pub fn single_stream_catalog() -> MockTransport {
    MockTransport::new()
        .json(ROOT, json!(["CE01ISSM", "CE02SHSM"]))
        .json(&url("/CE01ISSM"), json!(["MFD35"]))
        .json(&url("/CE01ISSM/MFD35"), json!(["02-PRESFA000"]))
        .json(&url("/CE01ISSM/MFD35/02-PRESFA000/metadata"), pressure_metadata())
}

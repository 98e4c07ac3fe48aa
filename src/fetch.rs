use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::sync::LazyLock;

use camino::{Utf8Path, Utf8PathBuf};
use regex::Regex;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::catalog::CatalogClient;
use crate::domain::{FileFormat, Stage};
use crate::error::UframeError;
use crate::http::Transport;
use crate::url::{RequestFlags, StreamRequest, build_stream_url};
use crate::window::{format_compact, parse_timestamp};

/// Code of an outcome whose request was never sent.
pub const UNATTEMPTED: i32 = -1;
/// Code and reason recorded when no HTTP response was received.
pub const TRANSPORT_FAILURE_CODE: i32 = 500;
pub const TRANSPORT_FAILURE_REASON: &str = "ConnectTimeout";

const CHUNK_SIZE: usize = 8 * 1024;
const ZIP_EXTENSION: &str = "zip";
const OCTET_STREAM: &str = "application/octet-stream";

static DISPOSITION_FILENAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"filename\*?=(?:UTF-8'')?"?([^";]+)"?"#).expect("valid filename pattern")
});

/// Result of one stream download attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FetchOutcome {
    pub url: String,
    pub code: i32,
    pub reason: Option<String>,
    pub request_time: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub bytes: u64,
}

impl FetchOutcome {
    fn pending(url: String) -> Self {
        Self {
            url,
            code: UNATTEMPTED,
            reason: None,
            request_time: chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S").to_string(),
            path: None,
            bytes: 0,
        }
    }

    pub fn is_attempted(&self) -> bool {
        self.code != UNATTEMPTED
    }

    pub fn is_success(&self) -> bool {
        self.code == 200
    }
}

impl<T: Transport> CatalogClient<T> {
    /// Downloads one time-bounded stream into `dest_dir`.
    ///
    /// With `url_only` the URL is built and returned with code `-1`; nothing is
    /// created on disk and no request is sent.
    pub fn fetch_stream(
        &self,
        request: &StreamRequest,
        flags: &RequestFlags,
        url_only: bool,
        dest_dir: Option<&Utf8Path>,
    ) -> FetchOutcome {
        let url = build_stream_url(self.endpoint(), request, flags);
        let mut outcome = FetchOutcome::pending(url);
        if url_only {
            return outcome;
        }

        let Some(dest_dir) = dest_dir else {
            warn!(stage = %Stage::Fetch, url = %outcome.url, "{}", UframeError::MissingIdentifier("destination directory"));
            return outcome;
        };
        let file_name = match download_file_name(request, flags.format.extension()) {
            Ok(name) => name,
            Err(err) => {
                warn!(stage = %Stage::Fetch, url = %outcome.url, "{err}");
                return outcome;
            }
        };
        if let Err(err) = ensure_dir(dest_dir) {
            error!(stage = %Stage::Fetch, dir = %dest_dir, "{err}");
            return outcome;
        }

        info!(stage = %Stage::Fetch, url = %outcome.url, "fetching url");
        let response = match self.transport().get(&outcome.url) {
            Ok(response) => response,
            Err(err) => {
                warn!(stage = %Stage::Fetch, url = %outcome.url, "{err}");
                outcome.code = TRANSPORT_FAILURE_CODE;
                outcome.reason = Some(TRANSPORT_FAILURE_REASON.to_string());
                return outcome;
            }
        };
        outcome.code = i32::from(response.status);
        outcome.reason = response.reason.clone();
        if !response.is_success() {
            warn!(
                stage = %Stage::Fetch,
                url = %outcome.url,
                "download failed: {} {}",
                response.status,
                response.reason.as_deref().unwrap_or("")
            );
            return outcome;
        }

        let extension = resolve_extension(
            flags.format,
            response.content_type.as_deref(),
            response.content_disposition.as_deref(),
        );
        let file_name = if extension == flags.format.extension() {
            file_name
        } else {
            download_file_name(request, extension).unwrap_or(file_name)
        };
        let path = dest_dir.join(file_name);
        info!(stage = %Stage::Fetch, path = %path, "writing file");
        match write_chunked(response.body, &path) {
            Ok(bytes) => {
                outcome.path = Some(path.to_string());
                outcome.bytes = bytes;
            }
            Err(WriteFailure::Body(err)) => {
                warn!(stage = %Stage::Fetch, url = %outcome.url, "body transfer failed: {err}");
                outcome.code = TRANSPORT_FAILURE_CODE;
                outcome.reason = Some(TRANSPORT_FAILURE_REASON.to_string());
                if let Err(err) = fs::remove_file(path.as_std_path()) {
                    error!(stage = %Stage::Fetch, path = %path, "remove partial file: {err}");
                }
            }
            Err(WriteFailure::File(err)) => error!(stage = %Stage::Fetch, path = %path, "{err}"),
        }
        outcome
    }
}

/// `{subsite}-{node}-{stream}-{method}-{begin}-{end}.{ext}` with compact
/// timestamps.
pub fn download_file_name(request: &StreamRequest, extension: &str) -> Result<String, UframeError> {
    let begin = parse_timestamp(&request.begin)?;
    let end = parse_timestamp(&request.end)?;
    Ok(format!(
        "{}-{}-{}-{}-{}-{}.{}",
        request.subsite,
        request.node,
        request.stream,
        request.method,
        format_compact(&begin),
        format_compact(&end),
        extension
    ))
}

/// The server falls back to a zip of NetCDF files by answering with a generic
/// binary content type and a `.zip` attachment name; that overrides the
/// requested format.
pub fn resolve_extension(
    format: FileFormat,
    content_type: Option<&str>,
    content_disposition: Option<&str>,
) -> &'static str {
    let is_octet_stream = content_type
        .and_then(|value| value.split(';').next())
        .map(|essence| essence.trim().eq_ignore_ascii_case(OCTET_STREAM))
        .unwrap_or(false);
    let names_zip = content_disposition
        .map(|value| {
            DISPOSITION_FILENAME
                .captures(value)
                .and_then(|captures| captures.get(1))
                .map(|name| name.as_str())
                .unwrap_or_else(|| value.trim().trim_end_matches('"'))
                .to_ascii_lowercase()
                .ends_with(".zip")
        })
        .unwrap_or(false);
    if is_octet_stream && names_zip {
        ZIP_EXTENSION
    } else {
        format.extension()
    }
}

fn ensure_dir(dir: &Utf8Path) -> Result<(), UframeError> {
    if dir.as_std_path().is_dir() {
        return Ok(());
    }
    info!(stage = %Stage::Fetch, dir = %dir, "creating destination directory");
    fs::create_dir_all(dir.as_std_path())
        .map_err(|err| UframeError::Filesystem(format!("create {dir}: {err}")))
}

/// Why a chunked copy stopped early.
enum WriteFailure {
    /// Reading the response body failed.
    Body(io::Error),
    File(UframeError),
}

/// Copies `body` to `path` one fixed-size chunk at a time. The file is
/// flushed and closed before returning on every path.
fn write_chunked(mut body: impl Read, path: &Utf8PathBuf) -> Result<u64, WriteFailure> {
    let file = File::create(path.as_std_path())
        .map_err(|err| WriteFailure::File(UframeError::Filesystem(format!("create {path}: {err}"))))?;
    let mut writer = BufWriter::new(file);
    let mut buffer = [0u8; CHUNK_SIZE];
    let mut written = 0u64;
    loop {
        let read = match body.read(&mut buffer) {
            Ok(0) => break,
            Ok(read) => read,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(WriteFailure::Body(err)),
        };
        writer
            .write_all(&buffer[..read])
            .map_err(|err| WriteFailure::File(UframeError::Filesystem(format!("write {path}: {err}"))))?;
        written += read as u64;
    }
    writer
        .flush()
        .map_err(|err| WriteFailure::File(UframeError::Filesystem(format!("flush {path}: {err}"))))?;
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zip_fallback_overrides_requested_format() {
        let ext = resolve_extension(
            FileFormat::Netcdf,
            Some("application/octet-stream"),
            Some("attachment; filename=\"archive.zip\""),
        );
        assert_eq!(ext, "zip");
    }

    #[test]
    fn zip_name_without_binary_type_keeps_format() {
        let ext = resolve_extension(
            FileFormat::Netcdf,
            Some("application/netcdf"),
            Some("attachment; filename=\"archive.zip\""),
        );
        assert_eq!(ext, "nc");
        assert_eq!(resolve_extension(FileFormat::Json, None, None), "json");
    }

    #[test]
    fn file_name_uses_compact_bounds() {
        let request = StreamRequest {
            subsite: "CE01ISSM".to_string(),
            node: "MFD35".to_string(),
            sensor: "02-PRESFA000".to_string(),
            method: "telemetered".to_string(),
            stream: "A_sample".to_string(),
            begin: "2015-05-31T00:00:00.000000Z".to_string(),
            end: "2015-06-01T00:00:00.000Z".to_string(),
        };
        assert_eq!(
            download_file_name(&request, "nc").unwrap(),
            "CE01ISSM-MFD35-A_sample-telemetered-20150531T000000-20150601T000000.nc"
        );
    }
}

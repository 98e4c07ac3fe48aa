//! Client-side toolkit for uFrame sensor catalog servers.
//!
//! The catalog is a four-level hierarchy (array, platform, sensor, stream).
//! [`catalog::CatalogClient`] reads each level, [`window`] turns a stream's end
//! time into a request window, [`url`] builds data request URLs and
//! [`fetch`] downloads them. [`walker`] ties these together for one array.

pub mod availability;
pub mod bench;
pub mod catalog;
pub mod config;
pub mod domain;
pub mod endpoint;
pub mod error;
pub mod fetch;
pub mod http;
pub mod inventory;
pub mod output;
pub mod query;
pub mod stream_map;
pub mod url;
pub mod walker;
pub mod window;

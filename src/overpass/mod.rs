//! Settlement lookup against the Overpass API.

mod client;

pub use client::{
    parse_response, LookupError, OverpassClient, OverpassOptions, SettlementLookup,
    DEFAULT_OVERPASS_ENDPOINT,
};

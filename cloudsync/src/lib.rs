use std::{collections::BTreeMap, time::SystemTime};

use chrono::{DateTime, FixedOffset, Local, NaiveDateTime, TimeZone};

pub mod config;
pub mod plan;

mod error;

pub use crate::config::Config;
pub use crate::error::*;
pub use crate::plan::SyncPlan;

/// Objects directly under the cloud folder, keyed by name relative to the folder.
pub type RemoteEntries = BTreeMap<String, DateTime<FixedOffset>>;

/// Regular files directly under the local folder, keyed by file name.
/// Modification times are in the local timezone, without the zone.
pub type LocalEntries = BTreeMap<String, NaiveDateTime>;

/// Format of the `modified` field of the cloud listing.
pub const REMOTE_MTIME_FMT: &str = "%Y-%m-%dT%H:%M:%S%z";

/// Parse a cloud modification timestamp.
/// RFC 3339 (fractional seconds, `Z` suffix) is accepted as a fallback.
pub fn parse_remote_mtime(s: &str) -> Result<DateTime<FixedOffset>> {
    DateTime::parse_from_str(s, REMOTE_MTIME_FMT)
        .or_else(|_| DateTime::parse_from_rfc3339(s))
        .map_err(|err| crate::api_error!("Invalid timestamp '{s}': {err}"))
}

/// Convert a cloud timestamp to `tz` and drop the zone, so it can be
/// compared with a local naive modification time.
pub fn normalize_mtime<Tz: TimeZone>(mtime: &DateTime<FixedOffset>, tz: &Tz) -> NaiveDateTime {
    mtime.with_timezone(tz).naive_local()
}

/// Modification time of a local file, as seen by the local clock.
pub fn local_mtime(mtime: SystemTime) -> NaiveDateTime {
    DateTime::<Local>::from(mtime).naive_local()
}

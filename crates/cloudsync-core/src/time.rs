use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::error::{CoreError, Result};

pub fn now_utc() -> OffsetDateTime {
    OffsetDateTime::now_utc()
}

/// Parse an RFC 3339 timestamp as reported by provider APIs.
pub fn parse_rfc3339(value: &str) -> Result<OffsetDateTime> {
    OffsetDateTime::parse(value, &Rfc3339).map_err(|e| {
        CoreError::invalid_timestamp(format!("Failed to parse timestamp '{value}': {e}"))
    })
}

pub fn format_rfc3339(value: OffsetDateTime) -> String {
    value.format(&Rfc3339).unwrap_or_default()
}

//! Conversion of Xero's legacy `.NET` JSON dates.
//!
//! Responses embed timestamps as `/Date(1494201600000+0000)/`: Unix
//! milliseconds optionally followed by a signed offset. The offset is applied
//! to the truncated Unix seconds as a raw count, not converted from minutes.
//! That arithmetic is kept as the API has always been read by this client.

use time::{
    Date, OffsetDateTime, format_description::well_known::Rfc3339, macros::format_description,
};

use crate::error::{Error, Result};

/// How a decoded timestamp is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flavor {
    /// RFC 3339 with the `Z` suffix, for fields that are UTC by contract.
    Utc,
    /// RFC 3339 without a zone marker. Xero rejects zone-suffixed values on
    /// write for document dates, so these read as zone-less local times.
    Local,
}

/// Converts a legacy `/Date(<millis>[+|-]<offset>)/` string into RFC 3339.
///
/// An empty input is returned unchanged.
pub fn decode(legacy: &str, flavor: Flavor) -> Result<String> {
    if legacy.is_empty() {
        return Ok(String::new());
    }

    let compact: String = legacy
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '+' || *c == '-')
        .collect();

    let shifted = if let Some((millis, offset)) = compact.split_once('+') {
        (parse_part(legacy, millis)? / 1000).checked_add(parse_part(legacy, offset)?)
    } else if let Some((millis, offset)) = compact.split_once('-') {
        (parse_part(legacy, millis)? / 1000).checked_sub(parse_part(legacy, offset)?)
    } else {
        Some(parse_part(legacy, &compact)? / 1000)
    };
    let unix_seconds =
        shifted.ok_or_else(|| Error::malformed_timestamp(legacy, "offset out of range"))?;

    let formatted = OffsetDateTime::from_unix_timestamp(unix_seconds)
        .map_err(|e| Error::malformed_timestamp(legacy, e))?
        .format(&Rfc3339)
        .map_err(|e| Error::malformed_timestamp(legacy, e))?;

    Ok(match flavor {
        Flavor::Utc => formatted,
        Flavor::Local => formatted.trim_end_matches('Z').to_string(),
    })
}

fn parse_part(input: &str, part: &str) -> Result<i64> {
    part.parse::<i64>()
        .map_err(|e| Error::malformed_timestamp(input, e))
}

/// Decodes an optional field in place. `None` and `""` are left untouched.
pub fn normalize(field: &mut Option<String>, flavor: Flavor) -> Result<()> {
    if let Some(value) = field.as_mut() {
        *value = decode(value, flavor)?;
    }
    Ok(())
}

/// Encodes an instant in the legacy form with a zero offset.
#[must_use]
pub fn encode_legacy(datetime: OffsetDateTime) -> String {
    let millis = datetime.unix_timestamp_nanos() / 1_000_000;
    format!("/Date({millis}+0000)/")
}

/// Formats a date as midnight with no zone marker, the shape Xero expects for
/// document dates on write.
pub fn format_date(date: Date) -> Result<String> {
    date.format(&format_description!("[year]-[month]-[day]T00:00:00"))
        .map_err(|e| Error::malformed_timestamp(&date.to_string(), e))
}

/// Today's UTC date formatted with [`format_date`].
pub fn today() -> Result<String> {
    format_date(OffsetDateTime::now_utc().date())
}

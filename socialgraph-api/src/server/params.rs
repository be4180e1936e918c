//! Boundary parsing of request fields. Clients send every field, ids
//! included, as a string; an empty string counts as missing.

use crate::server::{Result, ServerError};
use socialgraph_common::model::Id;

pub fn require<'a>(field: &'static str, value: &'a str) -> Result<&'a str> {
    if value.is_empty() {
        Err(ServerError::MissingField(field))
    } else {
        Ok(value)
    }
}

pub fn require_id<Marker>(field: &'static str, value: &str) -> Result<Id<Marker>> {
    require(field, value)?
        .parse()
        .map_err(|source| ServerError::InvalidId { field, source })
}

pub fn optional_id<Marker>(field: &'static str, value: &str) -> Result<Option<Id<Marker>>> {
    if value.is_empty() {
        Ok(None)
    } else {
        require_id(field, value).map(Some)
    }
}

pub fn optional_text(value: String) -> Option<String> {
    (!value.is_empty()).then_some(value)
}

/// Row offset of a post listing; missing means the first page.
pub fn offset(value: &str) -> Result<u32> {
    if value.is_empty() {
        return Ok(0);
    }

    value.trim().parse().map_err(ServerError::InvalidOffset)
}

//! Query string parsing for task collection endpoints
//!
//! `id`, `status` and `notStatus` may repeat. Status strings are taken as
//! given; unknown values survive as [`Status::Unknown`] and match nothing.

use url::form_urlencoded;

use super::error::ApiError;
use super::pagination::PageRequest;
use super::utils::parse_force;
use crate::engine::{Status, TaskFilter};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskQuery {
    pub filter: TaskFilter,
    pub page: PageRequest,
    pub force: bool,
}

impl TaskQuery {
    pub fn parse(query: Option<&str>) -> Result<Self, ApiError> {
        let raw = query.unwrap_or_default();
        check_well_formed(raw)?;

        let mut ids = Vec::new();
        let mut statuses = Vec::new();
        let mut not_statuses = Vec::new();
        let mut page = None;
        let mut page_size = None;
        let mut force = None;

        for (key, value) in form_urlencoded::parse(raw.as_bytes()) {
            match key.as_ref() {
                "id" => ids.push(value.into_owned()),
                "status" => statuses.push(Status::from(value.into_owned())),
                "notStatus" => not_statuses.push(Status::from(value.into_owned())),
                "page" => {
                    page.get_or_insert(value.into_owned());
                }
                "pageSize" => {
                    page_size.get_or_insert(value.into_owned());
                }
                "force" => {
                    force.get_or_insert(value.into_owned());
                }
                _ => {}
            }
        }

        Ok(Self {
            filter: TaskFilter::builder()
                .ids(ids)
                .statuses(statuses)
                .not_statuses(not_statuses)
                .build(),
            page: PageRequest::parse(page.as_deref(), page_size.as_deref()),
            force: parse_force(force.as_deref()),
        })
    }
}

/// Rejects broken percent escapes and `;` separators.
///
/// `form_urlencoded` decodes leniently, so these are caught up front.
fn check_well_formed(raw: &str) -> Result<(), ApiError> {
    if raw.contains(';') {
        return Err(ApiError::MalformedQuery(
            "invalid semicolon separator in query".to_string(),
        ));
    }

    let bytes = raw.as_bytes();
    for (pos, _) in raw.match_indices('%') {
        let escape = bytes.get(pos + 1..pos + 3);
        let valid = escape.is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit));
        if !valid {
            let end = (pos + 3).min(raw.len());
            let shown = raw.get(pos..end).unwrap_or("%");
            return Err(ApiError::MalformedQuery(format!(
                "invalid URL escape \"{shown}\""
            )));
        }
    }

    Ok(())
}

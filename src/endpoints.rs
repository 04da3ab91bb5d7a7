use std::collections::BTreeMap;

use url::Url;

use crate::error::{Error, Result};

pub const BASE_URL: &str = "https://api.xero.com/api.xro/2.0/";

/// Query string parameters, passed through without validation.
pub type QueryParameters = BTreeMap<String, String>;

/// Parses an API root, making sure relative paths resolve beneath it.
pub(crate) fn parse_base(base_url: &str) -> Result<Url> {
    let normalized = if base_url.ends_with('/') {
        base_url.to_string()
    } else {
        format!("{base_url}/")
    };
    Url::parse(&normalized).map_err(|source| Error::InvalidEndpoint {
        path: base_url.to_string(),
        source,
    })
}

/// Resolves `path` against `base`, appends `identifier` as a single encoded
/// path segment and `query` as an encoded query string.
pub(crate) fn resolve(
    base: &Url,
    path: &str,
    identifier: Option<&str>,
    query: Option<&QueryParameters>,
) -> Result<Url> {
    let invalid = |source| Error::InvalidEndpoint {
        path: path.to_string(),
        source,
    };
    let mut url = base.join(path.trim_start_matches('/')).map_err(invalid)?;
    if let Some(identifier) = identifier {
        url.path_segments_mut()
            .map_err(|()| invalid(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .push(identifier);
    }
    if let Some(query) = query.filter(|query| !query.is_empty()) {
        url.query_pairs_mut().extend_pairs(query.iter());
    }
    Ok(url)
}

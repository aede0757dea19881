//! Query string merging for GET requests.

use url::Url;

use crate::Error;

/// Merge `params` into the query string of `url`.
///
/// Existing pairs keep their order. A caller-supplied key replaces every
/// existing pair with that key. New keys are appended in the order given.
/// With no params the URL is returned untouched.
pub fn merge_query(url: &str, params: &[(&str, &str)]) -> Result<String, Error> {
    if params.is_empty() {
        return Ok(url.to_string());
    }

    let mut parsed = Url::parse(url).map_err(|e| Error::InvalidUrl(format!("{url}: {e}")))?;

    let mut merged: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(k, _)| !params.iter().any(|(pk, _)| *pk == &**k))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    for (key, value) in params {
        let (key, value) = ((*key).to_string(), (*value).to_string());
        match merged.iter_mut().find(|(k, _)| *k == key) {
            Some(existing) => existing.1 = value,
            None => merged.push((key, value)),
        }
    }

    parsed.query_pairs_mut().clear().extend_pairs(merged.iter());

    Ok(parsed.to_string())
}

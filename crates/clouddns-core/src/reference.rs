//! Container image reference helpers.
//!
//! Splits references like `gcr.io/p/app:1.2` or `localhost:5000/app@sha256:…`
//! into their repository part, and pins a repository to a content digest.

/// Repository part of an image reference
///
/// Removes an `@digest` suffix and a `:tag` suffix. A colon only starts a
/// tag when it comes after the last `/`, so registry ports survive:
///
/// - `reg/img:1-abc` → `reg/img`
/// - `reg/img@sha256:ab` → `reg/img`
/// - `localhost:5000/img:1` → `localhost:5000/img`
/// - `localhost:5000/img` → `localhost:5000/img`
pub fn repository(reference: &str) -> &str {
    let name_tag = match reference.rfind('@') {
        Some(at) => &reference[..at],
        None => reference,
    };

    let path_start = name_tag.rfind('/').map(|slash| slash + 1).unwrap_or(0);
    match name_tag[path_start..].rfind(':') {
        Some(colon) => &name_tag[..path_start + colon],
        None => name_tag,
    }
}

/// Pin the repository of `reference` to `digest`
pub fn qualified_name(reference: &str, digest: &str) -> String {
    format!("{}@{}", repository(reference), digest)
}

/// Pick the content digest of `reference` from a `RepoDigests` listing
///
/// Entries look like `repo@sha256:…`. The entry for the reference's own
/// repository wins; otherwise the first well-formed entry is used.
pub fn select_digest(reference: &str, repo_digests: &[String]) -> Option<String> {
    let wanted = repository(reference);
    let parsed: Vec<(&str, &str)> = repo_digests
        .iter()
        .filter_map(|entry| entry.split_once('@'))
        .filter(|(_, digest)| is_digest(digest))
        .collect();

    parsed
        .iter()
        .find(|(repo, _)| *repo == wanted)
        .or_else(|| parsed.first())
        .map(|(_, digest)| digest.to_string())
}

/// Whether `value` has the `algorithm:hex` shape of a content digest
pub fn is_digest(value: &str) -> bool {
    match value.split_once(':') {
        Some((algorithm, hex)) => {
            !algorithm.is_empty()
                && !hex.is_empty()
                && hex.chars().all(|c| c.is_ascii_hexdigit())
        }
        None => false,
    }
}

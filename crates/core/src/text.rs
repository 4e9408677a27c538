//! String normalisation helpers shared by the stores.

use crate::{Error, Result};

pub fn trim_to_none(value: Option<String>) -> Option<String> {
    value.and_then(|raw| {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

/// Lowercase, dash-separated slug. Fails if nothing alphanumeric remains.
pub fn normalize_slug(value: &str) -> Result<String> {
    let mut slug = String::with_capacity(value.len());
    let mut last_was_dash = false;
    for ch in value.chars().flat_map(|ch| ch.to_lowercase()) {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch);
            last_was_dash = false;
        } else if !last_was_dash {
            slug.push('-');
            last_was_dash = true;
        }
    }
    let slug = slug.trim_matches('-').to_string();
    if slug.is_empty() {
        return Err(Error::invalid("Slug cannot be empty"));
    }
    Ok(slug)
}

/// Reduce a host, origin or URL to the bare lowercase host name.
///
/// `https://Azure.Example.com:3000/path` becomes `azure.example.com`.
pub fn normalize_host(value: &str) -> Option<String> {
    let mut host = value.trim();
    if let Some((_, rest)) = host.split_once("://") {
        host = rest;
    }
    if let Some(idx) = host.find(['/', '?', '#']) {
        host = &host[..idx];
    }
    if let Some((_, rest)) = host.rsplit_once('@') {
        host = rest;
    }
    if let Some((name, port)) = host.rsplit_once(':') {
        if port.chars().all(|c| c.is_ascii_digit()) {
            host = name;
        }
    }
    let host = host.trim_end_matches('.').to_ascii_lowercase();
    if host.is_empty() {
        None
    } else {
        Some(host)
    }
}

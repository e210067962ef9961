//! Watch-filter matching for inbound messages.

use crate::types::{Message, WatchMode, WatchOptions};
use log::debug;

/// Decides whether a decoded message satisfies a watcher's filters.
///
/// With neither a media type nor a record type filter set, any message that
/// passes the mode and URL checks matches. Otherwise a single record
/// satisfying both filters accepts the whole message.
pub fn matches(message: &Message, options: &WatchOptions) -> bool {
    let message_url = message.url.as_deref().unwrap_or("");
    if options.mode == WatchMode::WebNfcOnly && message_url.is_empty() {
        return false;
    }
    if !url_pattern_matches(message_url, &options.url) {
        return false;
    }
    if options.media_type.is_none() && options.record_type.is_none() {
        return true;
    }
    message.records.iter().any(|record| {
        let media_ok = options
            .media_type
            .as_deref()
            .is_none_or(|m| record.media_type.as_deref() == Some(m));
        let type_ok = options
            .record_type
            .is_none_or(|t| record.record_type == t);
        media_ok && type_ok
    })
}

/// Same-origin prefix match between a message URL and a watcher pattern.
///
/// An empty URL or pattern matches permissively. Otherwise both must parse;
/// schemes must be equal; the host must be equal to or a dot-suffix
/// subdomain of the pattern's host; the path must match the `"/*"` wildcard
/// or start with the pattern's path. Parse failures never match.
pub fn url_pattern_matches(url: &str, pattern: &str) -> bool {
    if url.is_empty() || pattern.is_empty() {
        return true;
    }
    let (Some(url), Some(pattern)) = (UrlParts::split(url), UrlParts::split(pattern)) else {
        debug!(target: "Matcher/Url", "unparseable url or pattern, treated as non-match");
        return false;
    };
    if url.scheme != pattern.scheme {
        return false;
    }
    let subdomain = url.host.len() > pattern.host.len()
        && url.host.ends_with(&pattern.host)
        && url.host.as_bytes()[url.host.len() - pattern.host.len() - 1] == b'.';
    if url.host != pattern.host && !subdomain {
        return false;
    }
    pattern.path == "/*" || url.path.starts_with(&pattern.path)
}

struct UrlParts {
    scheme: String,
    host: String,
    path: String,
}

impl UrlParts {
    fn split(raw: &str) -> Option<Self> {
        let (scheme, rest) = raw.split_once("://")?;
        let valid_scheme = scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
        if scheme.is_empty() || !valid_scheme || !scheme.starts_with(|c: char| c.is_ascii_alphabetic())
        {
            return None;
        }

        let authority_end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
        let authority = &rest[..authority_end];
        let path = match rest[authority_end..].split(['?', '#']).next() {
            Some(p) if !p.is_empty() => p,
            _ => "/",
        };

        // Drop userinfo and any port, keeping bracketed IPv6 hosts intact.
        let mut host = authority.rsplit('@').next().unwrap_or(authority);
        if !host.starts_with('[') {
            if let Some((name, port)) = host.rsplit_once(':') {
                if port.chars().all(|c| c.is_ascii_digit()) {
                    host = name;
                }
            }
        }
        if host.is_empty() {
            return None;
        }

        Some(Self {
            scheme: scheme.to_ascii_lowercase(),
            host: host.to_ascii_lowercase(),
            path: path.to_string(),
        })
    }
}

//! Subcommand definitions and their implementations.
//!
//! Each command runs against an already opened [`CachedSession`] and writes
//! its result to the given writer: raw bodies for fetches, pretty JSON for
//! inspection commands.

use std::io::Write;

use bytes::Bytes;
use clap::Subcommand;
use serde::Serialize;

use reqcache_core::{CacheEntry, CachedSession, Transport};

use crate::error::CliError;

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Fetch a URL with GET through the cache.
    Get {
        url: String,

        /// Extra query parameter as key=value; overrides the URL's own value.
        #[arg(short, long = "query", value_parser = parse_pair)]
        query: Vec<(String, String)>,

        /// Bypass the cache for this request.
        #[arg(long)]
        no_cache: bool,
    },

    /// Fetch a URL with HEAD through the cache.
    Head { url: String },

    /// POST to a URL. Cached only if POST is an allowed method.
    Post {
        url: String,

        /// Request body.
        #[arg(short, long)]
        data: Option<String>,
    },

    /// Show hit/miss totals and entry count.
    Stats,

    /// List cached URLs.
    List,

    /// Show one cached entry.
    Show {
        url: String,

        #[arg(short, long, default_value = "GET")]
        method: String,
    },

    /// Search cached URLs with % and _ wildcards.
    Search { pattern: String },

    /// Delete every entry and reset the counters.
    Clear,

    /// Delete expired entries.
    ClearExpired,

    /// Show, set or clear stored cookies.
    Cookies {
        /// Cookie to store as name=value.
        #[arg(long, value_parser = parse_pair)]
        set: Option<(String, String)>,

        /// Delete all cookies.
        #[arg(long, conflicts_with = "set")]
        clear: bool,
    },
}

/// Parse a `key=value` argument. The value may itself contain `=`.
pub fn parse_pair(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected key=value, got {raw:?}")),
    }
}

#[derive(Serialize)]
struct EntryView<'a> {
    #[serde(flatten)]
    entry: &'a CacheEntry,
    body_len: usize,
    body: String,
}

#[derive(Serialize)]
struct Cleared {
    deleted: u64,
}

fn write_json(out: &mut impl Write, value: &impl Serialize) -> Result<(), CliError> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

fn write_body(out: &mut impl Write, body: &Bytes) -> Result<(), CliError> {
    out.write_all(body)?;
    out.flush()?;
    Ok(())
}

/// Execute `command` against `session`.
pub fn run<T: Transport>(session: &CachedSession<T>, command: Command, out: &mut impl Write) -> Result<(), CliError> {
    match command {
        Command::Get { url, query, no_cache } => {
            let pairs: Vec<(&str, &str)> = query.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
            let body = if no_cache {
                session.with_cache_disabled(|s| s.get_with_query(&url, &pairs))??
            } else {
                session.get_with_query(&url, &pairs)?
            };
            write_body(out, &body)
        }
        Command::Head { url } => {
            session.head(&url)?;
            Ok(())
        }
        Command::Post { url, data } => {
            let body = session.post(&url, data.map(Bytes::from))?;
            write_body(out, &body)
        }
        Command::Stats => write_json(out, &session.stats()?),
        Command::List => write_json(out, &session.list_cached_urls()?),
        Command::Show { url, method } => {
            let method = method.to_ascii_uppercase();
            let entry = session
                .get_entry_for(&url, &method)?
                .ok_or_else(|| CliError::InvalidInput(format!("no cached {method} entry for {url}")))?;
            let view = EntryView {
                entry: &entry,
                body_len: entry.body.len(),
                body: String::from_utf8_lossy(&entry.body).into_owned(),
            };
            write_json(out, &view)
        }
        Command::Search { pattern } => write_json(out, &session.search(&pattern)?),
        Command::Clear => write_json(out, &Cleared { deleted: session.clear_cache()? }),
        Command::ClearExpired => write_json(out, &Cleared { deleted: session.clear_expired()? }),
        Command::Cookies { set, clear } => {
            if clear {
                session.clear_cookies()?;
            }
            if let Some((name, value)) = set {
                session.set_cookie(&name, &value)?;
            }
            let header = session.cookie_header()?;
            writeln!(out, "{header}")?;
            Ok(())
        }
    }
}

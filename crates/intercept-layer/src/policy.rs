//! Per-request routing decision.
//!
//! The decision is pure and is evaluated before any cache or network work.
//! Checks run in a fixed order: allow-listed external host, non-read method,
//! same-origin read, everything else.

use crate::error::InterceptError;
use bytes::Bytes;
use http::uri::{Authority, PathAndQuery, Scheme};
use http::{Method, Request, Uri};

/// How a request is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Host is on the allow-list: straight to the network, cache untouched.
    External,
    /// Mutating method: straight to the network, cache untouched.
    NonRead,
    /// Same-origin GET: served cache-first.
    CacheFirst,
    /// Any other shape: forwarded unmodified.
    PassThrough,
}

impl Route {
    pub fn as_str(&self) -> &'static str {
        match self {
            Route::External => "external",
            Route::NonRead => "non_read",
            Route::CacheFirst => "cache_first",
            Route::PassThrough => "pass_through",
        }
    }
}

/// Scheme and authority the layer is installed for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    scheme: Scheme,
    authority: Authority,
}

impl Origin {
    pub fn parse(origin: &str) -> Result<Self, InterceptError> {
        let uri: Uri = origin
            .parse()
            .map_err(|e| InterceptError::InvalidOrigin(format!("{origin}: {e}")))?;

        match (uri.scheme(), uri.authority()) {
            (Some(scheme), Some(authority)) => Ok(Self {
                scheme: scheme.clone(),
                authority: authority.clone(),
            }),
            _ => Err(InterceptError::InvalidOrigin(format!(
                "{origin}: expected scheme://host[:port]"
            ))),
        }
    }

    /// Whether `uri` targets this origin. Origin-form URIs (`/path`) always do.
    pub fn is_same(&self, uri: &Uri) -> bool {
        let Some(authority) = uri.authority() else {
            return true;
        };
        let default_scheme = Scheme::HTTP;
        let scheme = uri.scheme().unwrap_or(&default_scheme);

        scheme == &self.scheme
            && authority.host().eq_ignore_ascii_case(self.authority.host())
            && effective_port(scheme, authority) == effective_port(&self.scheme, &self.authority)
    }

    /// Absolute form of `uri`, resolving origin-form targets against this origin.
    pub fn resolve(&self, uri: &Uri) -> Uri {
        if uri.scheme().is_some() {
            return uri.clone();
        }
        let path = uri
            .path_and_query()
            .cloned()
            .unwrap_or_else(|| PathAndQuery::from_static("/"));

        Uri::builder()
            .scheme(self.scheme.clone())
            .authority(self.authority.clone())
            .path_and_query(path)
            .build()
            .unwrap_or_else(|_| uri.clone())
    }

    pub fn as_string(&self) -> String {
        format!("{}://{}", self.scheme, self.authority)
    }
}

fn effective_port(scheme: &Scheme, authority: &Authority) -> Option<u16> {
    authority.port_u16().or(if scheme == &Scheme::HTTPS {
        Some(443)
    } else if scheme == &Scheme::HTTP {
        Some(80)
    } else {
        None
    })
}

/// Origin-form (`/path?query`) of a URI.
pub fn origin_form(uri: &Uri) -> Uri {
    Uri::from(
        uri.path_and_query()
            .cloned()
            .unwrap_or_else(|| PathAndQuery::from_static("/")),
    )
}

/// External hostnames that are never intercepted.
///
/// A host matches an entry when it is the entry itself or one of its
/// subdomains. Comparison ignores ASCII case.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowList {
    hosts: Vec<String>,
}

impl AllowList {
    pub fn new<I, S>(hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            hosts: hosts
                .into_iter()
                .map(|h| h.as_ref().trim().trim_end_matches('.').to_ascii_lowercase())
                .filter(|h| !h.is_empty())
                .collect(),
        }
    }

    pub fn contains_host(&self, host: &str) -> bool {
        let host = host.trim_end_matches('.').to_ascii_lowercase();
        self.hosts.iter().any(|allowed| {
            host == *allowed
                || host
                    .strip_suffix(allowed.as_str())
                    .is_some_and(|prefix| prefix.ends_with('.'))
        })
    }
}

/// Reads are GET and HEAD. Everything else may mutate.
pub fn is_read(method: &Method) -> bool {
    method == Method::GET || method == Method::HEAD
}

/// Decide how `request` is handled.
pub fn classify(request: &Request<Bytes>, origin: &Origin, allowed: &AllowList) -> Route {
    let uri = request.uri();

    if uri.host().is_some_and(|host| allowed.contains_host(host)) {
        return Route::External;
    }

    if !is_read(request.method()) {
        return Route::NonRead;
    }

    if request.method() == Method::GET && origin.is_same(uri) {
        return Route::CacheFirst;
    }

    Route::PassThrough
}

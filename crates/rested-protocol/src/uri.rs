//! URIs for requests, replies and events.
//!
//! [`Uri`] wraps a parsed [`url::Url`] and may also be empty, which is the
//! state of a default-constructed header. Only absolute URIs are accepted.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{ProtocolError, ProtocolResult};

/// An absolute URI, or nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Uri {
    url: Option<Url>,
}

impl Uri {
    /// Parses `input`. Blank input yields the empty URI.
    pub fn parse(input: &str) -> ProtocolResult<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Ok(Self::default());
        }
        let url = Url::parse(trimmed).map_err(|e| ProtocolError::invalid_uri(input, e))?;
        Ok(Self { url: Some(url) })
    }

    /// Starts a builder seeded with the parts of `input`.
    pub fn builder(input: &str) -> ProtocolResult<UriBuilder> {
        Ok(UriBuilder::from(&Self::parse(input)?))
    }

    pub fn is_empty(&self) -> bool {
        self.url.is_none()
    }

    pub fn as_str(&self) -> &str {
        self.url.as_ref().map_or("", Url::as_str)
    }

    pub fn scheme(&self) -> &str {
        self.url.as_ref().map_or("", Url::scheme)
    }

    /// `user` or `user:password`, when present.
    pub fn user_info(&self) -> Option<String> {
        let url = self.url.as_ref()?;
        if url.username().is_empty() {
            return None;
        }
        Some(match url.password() {
            Some(password) => format!("{}:{password}", url.username()),
            None => url.username().to_string(),
        })
    }

    pub fn host(&self) -> Option<&str> {
        self.url.as_ref()?.host_str()
    }

    /// The explicit port, or the scheme's well-known port.
    pub fn port(&self) -> Option<u16> {
        self.url.as_ref()?.port_or_known_default()
    }

    pub fn path(&self) -> UriPath {
        let segments = self
            .url
            .as_ref()
            .and_then(Url::path_segments)
            .map(|segments| {
                segments
                    .filter(|s| !s.is_empty())
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default();
        UriPath { segments }
    }

    pub fn query(&self) -> UriQuery {
        let params = self
            .url
            .as_ref()
            .map(|url| url.query_pairs().into_owned().collect())
            .unwrap_or_default();
        UriQuery { params }
    }

    pub fn fragment(&self) -> Option<&str> {
        self.url.as_ref()?.fragment()
    }
}

impl fmt::Display for Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Uri {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Uri {
    type Error = ProtocolError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Uri> for String {
    fn from(uri: Uri) -> Self {
        uri.as_str().to_string()
    }
}

impl From<Url> for Uri {
    fn from(url: Url) -> Self {
        Self { url: Some(url) }
    }
}

/// The non-empty segments of a URI path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UriPath {
    segments: Vec<String>,
}

impl UriPath {
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn segment(&self, index: usize) -> Option<&str> {
        self.segments.get(index).map(String::as_str)
    }

    pub fn num_segments(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

impl fmt::Display for UriPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("/");
        }
        for segment in &self.segments {
            write!(f, "/{segment}")?;
        }
        Ok(())
    }
}

/// Decoded query parameters in their original order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UriQuery {
    params: Vec<(String, String)>,
}

impl UriQuery {
    /// Value of the first parameter named `key`.
    pub fn find(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn has_key(&self, key: &str) -> bool {
        self.find(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Assembles a [`Uri`] part by part.
///
/// ```rust
/// use rested_protocol::Uri;
///
/// let uri = Uri::builder("http://localhost:8080/api")
///     .unwrap()
///     .path_segment("items")
///     .query_parameter("limit", "10")
///     .build()
///     .unwrap();
/// assert_eq!(uri.as_str(), "http://localhost:8080/api/items?limit=10");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UriBuilder {
    scheme: Option<String>,
    user: Option<String>,
    password: Option<String>,
    host: Option<String>,
    port: Option<u16>,
    segments: Vec<String>,
    query: Vec<(String, String)>,
    fragment: Option<String>,
}

impl UriBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = Some(scheme.into());
        self
    }

    /// Sets `user` or `user:password`.
    #[must_use]
    pub fn user_info(mut self, user_info: &str) -> Self {
        match user_info.split_once(':') {
            Some((user, password)) => {
                self.user = Some(user.to_string());
                self.password = Some(password.to_string());
            }
            None => {
                self.user = Some(user_info.to_string());
                self.password = None;
            }
        }
        self
    }

    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Replaces the whole path.
    #[must_use]
    pub fn path(mut self, path: &str) -> Self {
        self.segments = path
            .split('/')
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .collect();
        self
    }

    #[must_use]
    pub fn path_segment(mut self, segment: impl Into<String>) -> Self {
        self.segments.push(segment.into());
        self
    }

    #[must_use]
    pub fn query_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    #[must_use]
    pub fn fragment(mut self, fragment: impl Into<String>) -> Self {
        self.fragment = Some(fragment.into());
        self
    }

    /// Builds the URI. A builder with no parts yields the empty URI.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidUri`] when a host is missing or a
    /// part is rejected by the URL parser.
    pub fn build(self) -> ProtocolResult<Uri> {
        if self == Self::default() {
            return Ok(Uri::default());
        }

        let scheme = self.scheme.as_deref().unwrap_or("http");
        let Some(host) = self.host.as_deref() else {
            return Err(ProtocolError::invalid_uri(scheme, "missing host"));
        };
        let base = format!("{scheme}://{host}");
        let mut url = Url::parse(&base).map_err(|e| ProtocolError::invalid_uri(&base, e))?;

        if let Some(user) = &self.user {
            url.set_username(user)
                .map_err(|()| ProtocolError::invalid_uri(&base, "cannot carry user info"))?;
            url.set_password(self.password.as_deref())
                .map_err(|()| ProtocolError::invalid_uri(&base, "cannot carry user info"))?;
        }
        url.set_port(self.port)
            .map_err(|()| ProtocolError::invalid_uri(&base, "cannot carry a port"))?;

        if !self.segments.is_empty() {
            let mut segments = url
                .path_segments_mut()
                .map_err(|()| ProtocolError::invalid_uri(&base, "cannot carry a path"))?;
            segments.clear().extend(&self.segments);
        }
        if !self.query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &self.query {
                pairs.append_pair(key, value);
            }
        }
        url.set_fragment(self.fragment.as_deref());

        Ok(Uri::from(url))
    }
}

impl From<&Uri> for UriBuilder {
    fn from(uri: &Uri) -> Self {
        let Some(url) = &uri.url else {
            return Self::default();
        };
        Self {
            scheme: Some(url.scheme().to_string()),
            user: Some(url.username())
                .filter(|u| !u.is_empty())
                .map(str::to_owned),
            password: url.password().map(str::to_owned),
            host: url.host_str().map(str::to_owned),
            port: url.port(),
            segments: uri.path().segments,
            query: uri.query().params,
            fragment: url.fragment().map(str::to_owned),
        }
    }
}

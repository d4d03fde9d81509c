use super::rewrite::path_segments;
use http::Uri;
use http::uri::{Authority, InvalidUri, Scheme};
use std::fmt;
use std::str::FromStr;

/// A parsed base URL that requests can be redirected to.
///
/// Only `http` and `https` targets are supported. The port defaults to the
/// well known port of the scheme when the target does not name one.
/// Query and fragment of the target are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RedirectTarget {
    scheme: Scheme,
    authority: Authority,
    port: u16,
    base_segments: Vec<String>,
    encoded_base_path: String,
}

impl RedirectTarget {
    /// The scheme requests are sent with after redirection.
    #[must_use]
    pub fn scheme(&self) -> &Scheme {
        &self.scheme
    }

    /// The host of this target, IPv6 hosts include their brackets.
    #[must_use]
    pub fn host(&self) -> &str {
        self.authority.host()
    }

    /// The effective port of this target.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// The authority written into rewritten request uris.
    ///
    /// The port is only part of it when it differs
    /// from the default port of the scheme.
    #[must_use]
    pub fn authority(&self) -> &Authority {
        &self.authority
    }

    /// The (still percent-encoded) path segments of the base path.
    ///
    /// A base path ending in `/` ends with an empty segment,
    /// the root path `/` is a single empty segment.
    #[must_use]
    pub fn base_path_segments(&self) -> &[String] {
        &self.base_segments
    }

    /// The encoded base path, always starting with `/`.
    #[must_use]
    pub fn encoded_base_path(&self) -> &str {
        &self.encoded_base_path
    }

    fn try_from_uri(input: &str, uri: &Uri) -> Result<Self, InvalidRedirectTarget> {
        let scheme = uri
            .scheme()
            .cloned()
            .ok_or_else(|| InvalidRedirectTarget::new(input, InvalidKind::MissingScheme))?;
        let default_port = default_port(&scheme).ok_or_else(|| {
            InvalidRedirectTarget::new(input, InvalidKind::UnsupportedScheme(scheme.to_string()))
        })?;

        let host = uri
            .host()
            .filter(|host| !host.is_empty())
            .ok_or_else(|| InvalidRedirectTarget::new(input, InvalidKind::MissingHost))?;
        let port = uri.port_u16().unwrap_or(default_port);

        let authority = if port == default_port {
            Authority::from_str(host)
        } else {
            Authority::from_str(&format!("{host}:{port}"))
        }
        .map_err(|err| InvalidRedirectTarget::new(input, InvalidKind::Uri(err)))?;

        let encoded_base_path = match uri.path() {
            "" => "/".to_owned(),
            path if path.starts_with('/') => path.to_owned(),
            path => format!("/{path}"),
        };
        let base_segments = path_segments(&encoded_base_path)
            .map(ToOwned::to_owned)
            .collect();

        Ok(Self {
            scheme,
            authority,
            port,
            base_segments,
            encoded_base_path,
        })
    }
}

fn default_port(scheme: &Scheme) -> Option<u16> {
    if scheme == &Scheme::HTTP {
        Some(80)
    } else if scheme == &Scheme::HTTPS {
        Some(443)
    } else {
        None
    }
}

impl FromStr for RedirectTarget {
    type Err = InvalidRedirectTarget;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim();
        let uri: Uri = input
            .parse()
            .map_err(|err| InvalidRedirectTarget::new(input, InvalidKind::Uri(err)))?;
        Self::try_from_uri(input, &uri)
    }
}

impl TryFrom<&str> for RedirectTarget {
    type Error = InvalidRedirectTarget;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl TryFrom<String> for RedirectTarget {
    type Error = InvalidRedirectTarget;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for RedirectTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}://{}{}",
            self.scheme, self.authority, self.encoded_base_path
        )
    }
}

/// Error returned when a string cannot be used as a [`RedirectTarget`].
#[derive(Debug)]
pub struct InvalidRedirectTarget {
    input: String,
    kind: InvalidKind,
}

#[derive(Debug)]
enum InvalidKind {
    Uri(InvalidUri),
    MissingScheme,
    UnsupportedScheme(String),
    MissingHost,
}

impl InvalidRedirectTarget {
    fn new(input: &str, kind: InvalidKind) -> Self {
        Self {
            input: input.to_owned(),
            kind,
        }
    }

    /// The rejected input.
    #[must_use]
    pub fn input(&self) -> &str {
        &self.input
    }
}

impl fmt::Display for InvalidRedirectTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid redirect target '{}': ", self.input)?;
        match &self.kind {
            InvalidKind::Uri(err) => write!(f, "{err}"),
            InvalidKind::MissingScheme => f.write_str("missing scheme"),
            InvalidKind::UnsupportedScheme(scheme) => {
                write!(f, "unsupported scheme '{scheme}', expected http or https")
            }
            InvalidKind::MissingHost => f.write_str("missing host"),
        }
    }
}

impl std::error::Error for InvalidRedirectTarget {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            InvalidKind::Uri(err) => Some(err),
            _ => None,
        }
    }
}

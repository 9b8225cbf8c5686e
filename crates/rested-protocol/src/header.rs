//! Request and reply headers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;
use crate::uri::Uri;

/// Request verb.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RequestMethod {
    #[default]
    Get,
    Post,
    Put,
    Delete,
    Options,
    Head,
}

impl RequestMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Options => "OPTIONS",
            Self::Head => "HEAD",
        }
    }
}

impl fmt::Display for RequestMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestMethod {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "DELETE" => Ok(Self::Delete),
            "OPTIONS" => Ok(Self::Options),
            "HEAD" => Ok(Self::Head),
            _ => Err(ProtocolError::UnknownMethod(s.to_string())),
        }
    }
}

macro_rules! status_codes {
    ($($(#[$meta:meta])* $name:ident = $code:literal, $reason:literal;)+) => {
        /// HTTP status code.
        ///
        /// `Display` renders the number, not the reason phrase.
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "u16", into = "u16")]
        #[repr(u16)]
        pub enum StatusCode {
            $($(#[$meta])* $name = $code,)+
        }

        impl StatusCode {
            /// Standard reason phrase, e.g. `Not Found`.
            pub fn reason_phrase(&self) -> &'static str {
                match self {
                    $(Self::$name => $reason,)+
                }
            }
        }

        impl TryFrom<u16> for StatusCode {
            type Error = ProtocolError;

            fn try_from(code: u16) -> Result<Self, Self::Error> {
                match code {
                    $($code => Ok(Self::$name),)+
                    other => Err(ProtocolError::UnknownStatus(other)),
                }
            }
        }
    };
}

status_codes! {
    Continue = 100, "Continue";
    SwitchingProtocols = 101, "Switching Protocols";
    Processing = 102, "Processing";
    EarlyHints = 103, "Early Hints";

    #[default]
    Ok = 200, "OK";
    Created = 201, "Created";
    Accepted = 202, "Accepted";
    NonAuthoritative = 203, "Non-Authoritative Information";
    NoContent = 204, "No Content";
    ResetContent = 205, "Reset Content";
    PartialContent = 206, "Partial Content";
    MultiStatus = 207, "Multi-Status";
    AlreadyReported = 208, "Already Reported";
    ImUsed = 226, "IM Used";

    MultipleChoices = 300, "Multiple Choices";
    MovedPermanently = 301, "Moved Permanently";
    Found = 302, "Found";
    SeeOther = 303, "See Other";
    NotModified = 304, "Not Modified";
    UseProxy = 305, "Use Proxy";
    TemporaryRedirect = 307, "Temporary Redirect";
    PermanentRedirect = 308, "Permanent Redirect";

    BadRequest = 400, "Bad Request";
    Unauthorized = 401, "Unauthorized";
    PaymentRequired = 402, "Payment Required";
    Forbidden = 403, "Forbidden";
    NotFound = 404, "Not Found";
    MethodNotAllowed = 405, "Method Not Allowed";
    NotAcceptable = 406, "Not Acceptable";
    ProxyAuthenticationRequired = 407, "Proxy Authentication Required";
    RequestTimeout = 408, "Request Timeout";
    Conflict = 409, "Conflict";
    Gone = 410, "Gone";
    LengthRequired = 411, "Length Required";
    PreconditionFailed = 412, "Precondition Failed";
    RequestEntityTooLarge = 413, "Request Entity Too Large";
    RequestUriTooLong = 414, "Request-URI Too Long";
    UnsupportedMediaType = 415, "Unsupported Media Type";
    RequestedRangeNotSatisfiable = 416, "Requested Range Not Satisfiable";
    ExpectationFailed = 417, "Expectation Failed";
    ImATeapot = 418, "I'm a teapot";
    EnhanceYourCalm = 420, "Enhance Your Calm";
    MisdirectedRequest = 421, "Misdirected Request";
    UnprocessableEntity = 422, "Unprocessable Entity";
    Locked = 423, "Locked";
    FailedDependency = 424, "Failed Dependency";
    UpgradeRequired = 426, "Upgrade Required";
    PreconditionRequired = 428, "Precondition Required";
    TooManyRequests = 429, "Too Many Requests";
    RequestHeaderFieldsTooLarge = 431, "Request Header Fields Too Large";
    UnavailableForLegalReasons = 451, "Unavailable For Legal Reasons";

    InternalServerError = 500, "Internal Server Error";
    NotImplemented = 501, "Not Implemented";
    BadGateway = 502, "Bad Gateway";
    ServiceUnavailable = 503, "Service Unavailable";
    GatewayTimeout = 504, "Gateway Timeout";
    VersionNotSupported = 505, "HTTP Version Not Supported";
    VariantAlsoNegotiates = 506, "Variant Also Negotiates";
    InsufficientStorage = 507, "Insufficient Storage";
    LoopDetected = 508, "Loop Detected";
    NotExtended = 510, "Not Extended";
    NetworkAuthenticationRequired = 511, "Network Authentication Required";
}

impl StatusCode {
    pub fn as_u16(self) -> u16 {
        self as u16
    }

    pub fn is_informational(self) -> bool {
        (100..200).contains(&self.as_u16())
    }

    pub fn is_success(self) -> bool {
        (200..300).contains(&self.as_u16())
    }

    pub fn is_redirection(self) -> bool {
        (300..400).contains(&self.as_u16())
    }

    pub fn is_client_error(self) -> bool {
        (400..500).contains(&self.as_u16())
    }

    pub fn is_server_error(self) -> bool {
        self.as_u16() >= 500
    }
}

impl From<StatusCode> for u16 {
    fn from(status: StatusCode) -> Self {
        status.as_u16()
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u16())
    }
}

/// Method, target and status of a request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestHeader {
    method: RequestMethod,
    uri: Uri,
    status: StatusCode,
}

impl RequestHeader {
    pub fn new(method: RequestMethod, uri: Uri) -> Self {
        Self {
            method,
            uri,
            status: StatusCode::default(),
        }
    }

    pub fn method(&self) -> RequestMethod {
        self.method
    }

    pub fn set_method(&mut self, method: RequestMethod) {
        self.method = method;
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn set_uri(&mut self, uri: Uri) {
        self.uri = uri;
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }
}

/// Target and status of a reply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplyHeader {
    uri: Uri,
    status: StatusCode,
}

impl ReplyHeader {
    pub fn new(uri: Uri, status: StatusCode) -> Self {
        Self { uri, status }
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn set_uri(&mut self, uri: Uri) {
        self.uri = uri;
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }
}

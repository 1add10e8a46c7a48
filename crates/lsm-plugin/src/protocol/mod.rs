//! Request and response messages exchanged with the storage daemon.
//!
//! Requests carry a method name, an opaque identifier and an optional map
//! of named arguments. Every request is answered by exactly one [`Response`]
//! that echoes the identifier unchanged: either a result value or an
//! [`ErrorPayload`]. Framing is the [`transport`](crate::transport) module's
//! concern; this module only deals with the JSON shapes.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::LsmError;

/// Named arguments applied to an operation.
pub type Params = Map<String, Value>;

/// Stable codes for failures owned by the dispatcher rather than a plugin.
pub mod codes {
    use crate::error::error_number;

    /// The request content could not be interpreted.
    pub const PARSE_ERROR: i32 = -32700;
    /// The plugin could not be constructed; sent before any request is read.
    pub const INSTANTIATION_ERROR: i32 = -32099;
    /// The requested operation is not implemented by the plugin.
    pub const UNSUPPORTED_OPERATION: i32 = error_number::NO_SUPPORT;
    /// An unanticipated fault occurred inside the plugin.
    pub const PLUGIN_FAULT: i32 = error_number::PLUGIN_BUG;
}

/// Opaque request identifier, echoed back in the matching response.
///
/// # Example
///
/// ```
/// use lsm_plugin::RequestId;
///
/// let id = RequestId::from(7);
/// assert_eq!(id.as_value(), &serde_json::json!(7));
/// assert_eq!(RequestId::placeholder(), RequestId::from(0));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Value);

impl RequestId {
    /// Wraps an arbitrary JSON identifier.
    #[must_use]
    pub const fn new(value: Value) -> Self {
        Self(value)
    }

    /// Identifier used when no request id is known, such as when the plugin
    /// fails to construct before the first request is read.
    #[must_use]
    pub fn placeholder() -> Self {
        Self(Value::from(0))
    }

    /// Returns the raw JSON identifier.
    #[must_use]
    pub const fn as_value(&self) -> &Value {
        &self.0
    }
}

impl From<i64> for RequestId {
    fn from(value: i64) -> Self {
        Self(Value::from(value))
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A method invocation request read from the client.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    method: String,
    id: RequestId,
    params: Option<Params>,
}

impl Request {
    /// Creates a request.
    #[must_use]
    pub fn new(method: impl Into<String>, id: RequestId, params: Option<Params>) -> Self {
        Self {
            method: method.into(),
            id,
            params,
        }
    }

    /// Returns the requested operation name.
    #[must_use]
    pub const fn method(&self) -> &str {
        self.method.as_str()
    }

    /// Returns the request identifier.
    #[must_use]
    pub const fn id(&self) -> &RequestId {
        &self.id
    }

    /// Returns the named arguments, or `None` when the client sent none.
    #[must_use]
    pub const fn params(&self) -> Option<&Params> {
        self.params.as_ref()
    }

    /// Splits the request into method, id and params.
    #[must_use]
    pub fn into_parts(self) -> (String, RequestId, Option<Params>) {
        (self.method, self.id, self.params)
    }

    /// Interprets a decoded JSON payload as a request.
    ///
    /// `params` may be missing or `null`, both meaning "no arguments".
    ///
    /// # Errors
    ///
    /// Returns [`MalformedRequest`] when the payload is not an object, lacks
    /// an `id` or a string `method`, or carries `params` that are not an
    /// object. The error keeps the identifier when one could be recovered so
    /// the rejection can still be correlated by the client.
    pub fn from_value(value: Value) -> Result<Self, MalformedRequest> {
        let Value::Object(mut fields) = value else {
            return Err(MalformedRequest::new(None, "request must be a JSON object"));
        };

        let id = fields
            .remove("id")
            .map(RequestId::new)
            .ok_or_else(|| MalformedRequest::new(None, "request is missing 'id'"))?;

        let method = match fields.remove("method") {
            Some(Value::String(method)) => method,
            Some(_) => {
                return Err(MalformedRequest::new(
                    Some(id),
                    "request 'method' must be a string",
                ));
            }
            None => return Err(MalformedRequest::new(Some(id), "request is missing 'method'")),
        };

        let params = match fields.remove("params") {
            None | Some(Value::Null) => None,
            Some(Value::Object(params)) => Some(params),
            Some(_) => {
                return Err(MalformedRequest::new(
                    Some(id),
                    "request 'params' must be an object or null",
                ));
            }
        };

        Ok(Self { method, id, params })
    }

    /// Encodes the request in its wire shape.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut fields = Map::new();
        fields.insert(String::from("method"), Value::String(self.method.clone()));
        fields.insert(String::from("id"), self.id.0.clone());
        fields.insert(
            String::from("params"),
            self.params.clone().map_or(Value::Null, Value::Object),
        );
        Value::Object(fields)
    }
}

/// A payload that decoded as JSON but is not a valid request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedRequest {
    id: Option<RequestId>,
    message: String,
}

impl MalformedRequest {
    fn new(id: Option<RequestId>, message: impl Into<String>) -> Self {
        Self {
            id,
            message: message.into(),
        }
    }

    /// Returns the identifier recovered from the payload, if any.
    #[must_use]
    pub const fn id(&self) -> Option<&RequestId> {
        self.id.as_ref()
    }

    /// Returns the description of the defect.
    #[must_use]
    pub const fn message(&self) -> &str {
        self.message.as_str()
    }

    /// Splits the rejection into its recovered id and message.
    #[must_use]
    pub fn into_parts(self) -> (Option<RequestId>, String) {
        (self.id, self.message)
    }
}

/// Error body of a failed response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorPayload {
    code: i32,
    message: String,
    #[serde(default)]
    data: Option<Value>,
}

impl ErrorPayload {
    /// Creates an error payload without auxiliary data.
    #[must_use]
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Attaches auxiliary data.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Returns the error code.
    #[must_use]
    pub const fn code(&self) -> i32 {
        self.code
    }

    /// Returns the error message.
    #[must_use]
    pub const fn message(&self) -> &str {
        self.message.as_str()
    }

    /// Returns the auxiliary data, if any.
    #[must_use]
    pub const fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }
}

impl From<LsmError> for ErrorPayload {
    fn from(error: LsmError) -> Self {
        let (code, message, data) = error.into_parts();
        Self {
            code,
            message,
            data,
        }
    }
}

/// A response written back to the client.
///
/// Serialised as `{"id": .., "result": ..}` or `{"id": .., "error": {..}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response {
    /// The operation failed.
    Error {
        /// Identifier of the request being answered.
        id: RequestId,
        /// Failure details.
        error: ErrorPayload,
    },
    /// The operation succeeded; `null` stands for "no value".
    Success {
        /// Identifier of the request being answered.
        id: RequestId,
        /// Value returned by the operation.
        result: Value,
    },
}

impl Response {
    /// Creates a success response.
    #[must_use]
    pub const fn success(id: RequestId, result: Value) -> Self {
        Self::Success { id, result }
    }

    /// Creates an error response.
    #[must_use]
    pub const fn error(id: RequestId, error: ErrorPayload) -> Self {
        Self::Error { id, error }
    }

    /// Returns the identifier of the answered request.
    #[must_use]
    pub const fn id(&self) -> &RequestId {
        match self {
            Self::Error { id, .. } | Self::Success { id, .. } => id,
        }
    }

    /// Returns the error payload when the response reports a failure.
    #[must_use]
    pub const fn error_payload(&self) -> Option<&ErrorPayload> {
        match self {
            Self::Error { error, .. } => Some(error),
            Self::Success { .. } => None,
        }
    }

    /// Returns the result value when the response reports success.
    #[must_use]
    pub const fn result(&self) -> Option<&Value> {
        match self {
            Self::Success { result, .. } => Some(result),
            Self::Error { .. } => None,
        }
    }
}

//! This module contains the trait that abstracts over GraphQL operations,
//! keeping the transport independent of any particular query shape.
//!
//! [`Request`] passes results through as raw JSON, the typed subscriptions in
//! [`crate::operations`] decode them into their own response types.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::Error;

/// An abstraction over GraphQL operations.
///
/// The serialized form of an operation is sent as the `payload` of a
/// `subscribe` frame, so it should look like `{"query": ..., "variables": ...}`.
pub trait GraphqlOperation: Serialize {
    /// The decoded `data` of a single result.
    type Response;

    /// Decodes the `data` of a `next` frame into this operation's response.
    fn decode(&self, data: Value) -> Result<Self::Response, Error>;
}

/// An untyped operation: a query string & its variables.
///
/// ```rust
/// use backboard_subscriptions::graphql::Request;
///
/// let request = Request::new("subscription Deployment($id: String!) { deployment(id: $id) { status } }")
///     .variable("id", "f62b534a")?;
/// # Ok::<(), backboard_subscriptions::Error>(())
/// ```
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Request {
    query: String,
    #[serde(skip_serializing_if = "Map::is_empty")]
    variables: Map<String, Value>,
}

impl Request {
    /// Creates a request without variables.
    pub fn new(query: impl Into<String>) -> Self {
        Request {
            query: query.into(),
            variables: Map::new(),
        }
    }

    /// Replaces all variables at once.
    pub fn with_variables(mut self, variables: Map<String, Value>) -> Self {
        self.variables = variables;
        self
    }

    /// Sets a single variable.
    pub fn variable(mut self, name: impl Into<String>, value: impl Serialize) -> Result<Self, Error> {
        let value =
            serde_json::to_value(value).map_err(|error| Error::Serializing(error.to_string()))?;
        self.variables.insert(name.into(), value);
        Ok(self)
    }

    /// The query string
    pub fn query(&self) -> &str {
        &self.query
    }

    /// The variables sent alongside the query
    pub fn variables(&self) -> &Map<String, Value> {
        &self.variables
    }
}

impl GraphqlOperation for Request {
    type Response = Value;

    fn decode(&self, data: Value) -> Result<Self::Response, Error> {
        Ok(data)
    }
}

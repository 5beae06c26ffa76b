//! The payload type registry: type name → validate + transform.
//!
//! The party service carries payloads as `(type name, JSON body)` and its
//! catalogue of types grows independently of this client. Rather than
//! matching on names in the tracker, every type is a [`TypeHandler`]
//! stored under its name in a [`PayloadRegistry`], and new types are added
//! by registering another handler.

use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::PipelineError;
use crate::builtin::{
    BatchedUpdate, LOCATION_UPDATE, LocationUpdate, PARTY_BATCHED_CHANGE,
    RawBatchedChange, RawLocationUpdate, RawStatusUpdate, STATUS_UPDATE,
    StatusUpdate,
};

/// The result of running a body through its handler.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Status(StatusUpdate),
    Location(LocationUpdate),
    Batched(BatchedUpdate),
    /// Produced by handlers registered outside this crate. Carries no
    /// merge semantics.
    Custom(Value),
}

/// Validates and transforms the body of one payload type.
///
/// `validate` checks the raw JSON and produces an intermediate value;
/// `transform` turns that into a [`Payload`]. The error string of
/// `validate` becomes the `reason` of [`PipelineError::Validation`].
pub trait TypeHandler: Send + Sync + 'static {
    /// What validation produces and transformation consumes.
    type Validated;

    fn validate(&self, body: &Value) -> Result<Self::Validated, String>;

    fn transform(&self, validated: Self::Validated) -> Payload;
}

/// Object-safe view of a [`TypeHandler`] so handlers with different
/// `Validated` types can share one map.
trait ErasedHandler: Send + Sync {
    fn process(&self, body: &Value) -> Result<Payload, String>;
}

impl<H: TypeHandler> ErasedHandler for H {
    fn process(&self, body: &Value) -> Result<Payload, String> {
        let validated = self.validate(body)?;
        Ok(self.transform(validated))
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// A handler whose schema is a serde type.
///
/// Validation requires the body to be a JSON object and deserializes it
/// into `R`; transformation is `R: Into<Payload>`. The built-in types are
/// all `SchemaHandler`s over their raw records.
pub struct SchemaHandler<R> {
    _record: PhantomData<fn() -> R>,
}

impl<R> SchemaHandler<R> {
    pub const fn new() -> Self {
        Self {
            _record: PhantomData,
        }
    }
}

impl<R> Default for SchemaHandler<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> TypeHandler for SchemaHandler<R>
where
    R: DeserializeOwned + Into<Payload> + 'static,
{
    type Validated = R;

    fn validate(&self, body: &Value) -> Result<R, String> {
        if !body.is_object() {
            return Err(format!("expected a JSON object, got {}", json_kind(body)));
        }
        R::deserialize(body).map_err(|e| e.to_string())
    }

    fn transform(&self, record: R) -> Payload {
        record.into()
    }
}

/// A handler built from two closures, producing [`Payload::Custom`].
pub struct FnHandler<V, T> {
    validate: V,
    transform: T,
}

impl<V, T> FnHandler<V, T>
where
    V: Fn(&Value) -> Result<(), String> + Send + Sync + 'static,
    T: Fn(Value) -> Value + Send + Sync + 'static,
{
    pub fn new(validate: V, transform: T) -> Self {
        Self {
            validate,
            transform,
        }
    }
}

impl<V, T> TypeHandler for FnHandler<V, T>
where
    V: Fn(&Value) -> Result<(), String> + Send + Sync + 'static,
    T: Fn(Value) -> Value + Send + Sync + 'static,
{
    type Validated = Value;

    fn validate(&self, body: &Value) -> Result<Value, String> {
        (self.validate)(body)?;
        Ok(body.clone())
    }

    fn transform(&self, body: Value) -> Payload {
        Payload::Custom((self.transform)(body))
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Maps payload type names to handlers.
///
/// An owned value; share it with `Arc` when several trackers need it.
///
/// ```
/// use partyline_payload::{Payload, PayloadRegistry, PipelineError};
/// use serde_json::json;
///
/// let mut registry = PayloadRegistry::new();
/// registry.register_fn(
///     "Ping",
///     |body| body.get("at").map(|_| ()).ok_or_else(|| "missing at".to_string()),
///     |body| body,
/// );
///
/// let payload = registry.process("Ping", &json!({"at": 1})).unwrap();
/// assert_eq!(payload, Payload::Custom(json!({"at": 1})));
///
/// let err = registry.process("Pong", &json!({})).unwrap_err();
/// assert_eq!(err, PipelineError::UnknownType("Pong".into()));
/// ```
pub struct PayloadRegistry {
    handlers: HashMap<String, Box<dyn ErasedHandler>>,
}

impl PayloadRegistry {
    /// A registry with the built-in types: `PartyBatchedChange`,
    /// `StatusUpdate` and `LocationUpdate`.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register(PARTY_BATCHED_CHANGE, SchemaHandler::<RawBatchedChange>::new());
        registry.register(STATUS_UPDATE, SchemaHandler::<RawStatusUpdate>::new());
        registry.register(LOCATION_UPDATE, SchemaHandler::<RawLocationUpdate>::new());
        registry
    }

    /// A registry with no handlers at all.
    pub fn empty() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Registers `handler` under `type_name`, replacing any previous one.
    ///
    /// Returns `true` if a handler was replaced.
    pub fn register<H: TypeHandler>(&mut self, type_name: impl Into<String>, handler: H) -> bool {
        let type_name = type_name.into();
        let replaced = self
            .handlers
            .insert(type_name.clone(), Box::new(handler))
            .is_some();
        if replaced {
            tracing::debug!(type_name, "replaced payload handler");
        }
        replaced
    }

    /// Registers a closure-based handler. See [`FnHandler`].
    pub fn register_fn<V, T>(
        &mut self,
        type_name: impl Into<String>,
        validate: V,
        transform: T,
    ) -> bool
    where
        V: Fn(&Value) -> Result<(), String> + Send + Sync + 'static,
        T: Fn(Value) -> Value + Send + Sync + 'static,
    {
        self.register(type_name, FnHandler::new(validate, transform))
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.handlers.contains_key(type_name)
    }

    /// Registered type names, in no particular order.
    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }

    /// Validates and transforms `body` with the handler for `type_name`.
    ///
    /// # Errors
    /// - [`PipelineError::UnknownType`]: nothing registered under the name
    /// - [`PipelineError::Validation`]: the body failed validation
    pub fn process(&self, type_name: &str, body: &Value) -> Result<Payload, PipelineError> {
        let handler = self
            .handlers
            .get(type_name)
            .ok_or_else(|| PipelineError::UnknownType(type_name.to_string()))?;
        handler
            .process(body)
            .map_err(|reason| PipelineError::Validation {
                type_name: type_name.to_string(),
                reason,
            })
    }
}

impl Default for PayloadRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PayloadRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.type_names().collect();
        names.sort_unstable();
        f.debug_struct("PayloadRegistry")
            .field("types", &names)
            .finish()
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

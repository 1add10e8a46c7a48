//! Operation tables describing what a plugin can do.
//!
//! A plugin type implements [`LsmPlugin`] and declares its operations once,
//! into an [`OperationTable`]. Each entry maps a wire method name to a typed
//! handler. Named arguments are bound by deserialising the request `params`
//! into the handler's argument type, and the handler's return value is
//! serialised back to JSON. A method name without an entry is the
//! "unsupported operation" condition.


use std::collections::HashMap;
use std::fmt;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::error::LsmError;
use crate::protocol::Params;

/// Wire name of the operation that registers the plugin with its backend.
pub const REGISTER_OPERATION: &str = "plugin_register";

/// Wire name of the operation that releases the backend.
pub const UNREGISTER_OPERATION: &str = "plugin_unregister";

/// A storage backend driven by the plugin run-loop.
pub trait LsmPlugin: Sized + 'static {
    /// Declares every operation the plugin answers.
    ///
    /// Implementations must declare [`REGISTER_OPERATION`] and
    /// [`UNREGISTER_OPERATION`].
    fn operations(table: &mut OperationTable<Self>);
}

/// Argument type for operations that accept no named arguments.
///
/// Binding fails if the client supplies any argument at all.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NoArguments {}

/// Why an operation produced no result.
#[derive(Debug, Error)]
pub enum OperationFailure {
    /// The supplied params could not be bound to the operation's arguments.
    #[error("invalid arguments for '{method}': {message}")]
    InvalidArguments {
        /// Operation name.
        method: String,
        /// Binding failure description.
        message: String,
    },

    /// The operation rejected the request.
    #[error(transparent)]
    Domain(#[from] LsmError),

    /// The operation's return value could not be serialised.
    #[error("failed to encode result of '{method}': {source}")]
    Encode {
        /// Operation name.
        method: String,
        /// Underlying serialisation error.
        #[source]
        source: serde_json::Error,
    },
}

/// Errors raised while assembling an operation table.
#[derive(Debug, Error)]
pub enum CapabilityError {
    /// A lifecycle operation was not declared.
    #[error("plugin does not declare the '{name}' operation")]
    MissingLifecycleOperation {
        /// Missing operation name.
        name: &'static str,
    },
}

type Handler<P> = Box<dyn Fn(&mut P, Option<Params>) -> Result<Value, OperationFailure>>;

/// Registry mapping operation names to handlers for plugin type `P`.
pub struct OperationTable<P> {
    handlers: HashMap<&'static str, Handler<P>>,
}

impl<P> Default for OperationTable<P> {
    fn default() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }
}

impl<P> fmt::Debug for OperationTable<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationTable")
            .field("operations", &self.names())
            .finish()
    }
}

impl<P: LsmPlugin> OperationTable<P> {
    /// Builds the table declared by `P` and checks the lifecycle operations.
    ///
    /// # Errors
    ///
    /// Returns [`CapabilityError::MissingLifecycleOperation`] if either
    /// lifecycle operation is absent.
    pub fn for_plugin() -> Result<Self, CapabilityError> {
        let mut table = Self::new();
        P::operations(&mut table);
        for name in [REGISTER_OPERATION, UNREGISTER_OPERATION] {
            if !table.contains(name) {
                return Err(CapabilityError::MissingLifecycleOperation { name });
            }
        }
        Ok(table)
    }
}

impl<P> OperationTable<P> {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares an operation with typed arguments and result.
    ///
    /// Present params are bound as named arguments into `A`. Absent params
    /// bind an empty argument set, so every field of `A` must then have a
    /// default. Declaring a name twice replaces the earlier handler.
    ///
    /// # Example
    ///
    /// ```
    /// use lsm_plugin::{LsmError, NoArguments, OperationTable};
    ///
    /// struct Counter(u32);
    ///
    /// let mut table = OperationTable::<Counter>::new();
    /// table.operation("bump", |counter: &mut Counter, _: NoArguments| {
    ///     counter.0 += 1;
    ///     Ok::<_, LsmError>(counter.0)
    /// });
    ///
    /// let mut counter = Counter(0);
    /// let result = table.invoke(&mut counter, "bump", None).expect("declared");
    /// assert_eq!(result.expect("succeeds"), serde_json::json!(1));
    /// ```
    pub fn operation<A, R, F>(&mut self, name: &'static str, handler: F) -> &mut Self
    where
        P: 'static,
        A: DeserializeOwned + 'static,
        R: Serialize + 'static,
        F: Fn(&mut P, A) -> Result<R, LsmError> + 'static,
    {
        let boxed: Handler<P> = Box::new(move |plugin, params| {
            let arguments = bind_arguments::<A>(name, params)?;
            let result = handler(plugin, arguments)?;
            serde_json::to_value(result).map_err(|source| OperationFailure::Encode {
                method: name.to_owned(),
                source,
            })
        });
        self.handlers.insert(name, boxed);
        self
    }

    /// Declares an operation that receives the raw params.
    ///
    /// Use this when the operation must tell absent params apart from an
    /// empty argument map.
    pub fn raw_operation<F>(&mut self, name: &'static str, handler: F) -> &mut Self
    where
        P: 'static,
        F: Fn(&mut P, Option<Params>) -> Result<Value, LsmError> + 'static,
    {
        self.handlers.insert(
            name,
            Box::new(move |plugin, params| handler(plugin, params).map_err(OperationFailure::from)),
        );
        self
    }

    /// Returns `true` if an operation with this name is declared.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Returns the declared operation names in sorted order.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.handlers.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Invokes the named operation.
    ///
    /// Returns `None` when no operation with that name is declared.
    pub fn invoke(
        &self,
        plugin: &mut P,
        method: &str,
        params: Option<Params>,
    ) -> Option<Result<Value, OperationFailure>> {
        self.handlers
            .get(method)
            .map(|handler| handler(plugin, params))
    }
}

fn bind_arguments<A: DeserializeOwned>(
    method: &str,
    params: Option<Params>,
) -> Result<A, OperationFailure> {
    serde_json::from_value(Value::Object(params.unwrap_or_default())).map_err(|error| {
        OperationFailure::InvalidArguments {
            method: method.to_owned(),
            message: error.to_string(),
        }
    })
}

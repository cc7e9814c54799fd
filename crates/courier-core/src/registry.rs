//! Service registry.
//!
//! Maps `<version>.<service>.<method>` keys to invocable methods bound to a
//! service instance or instance factory. Methods are registered explicitly
//! through [`ServiceBuilder`]; their input and output types must implement
//! [`Record`], so only structured records can cross the wire.
//!
//! # Thread Safety
//!
//! The map is a [`DashMap`]: registration and lookup may run concurrently from
//! any thread without external locking. Entries are inserted only if absent and
//! never mutated afterwards, so a looked-up `Arc<ServiceRecord>` stays valid for
//! the life of the registry.

use crate::envelope::Payload;
use crate::target::RpcTarget;
use crate::Result;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;
use tracing::debug;

/// Marker for structured record types that may be a method's input or output.
///
/// Implement it with the [`record!`](crate::record) macro. Primitives and
/// collections deliberately have no implementation.
pub trait Record: Serialize + DeserializeOwned + Send + 'static {}

/// Implement [`Record`] for one or more types.
///
/// ```rust,ignore
/// #[derive(Serialize, Deserialize)]
/// struct AddRequest { x: i32, y: i32 }
///
/// courier_core::record!(AddRequest);
/// ```
#[macro_export]
macro_rules! record {
    ($($ty:ty),+ $(,)?) => {
        $(impl $crate::registry::Record for $ty {})+
    };
}

/// Instance-management policy of a registered service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstancePolicy {
    /// Fresh instance per call.
    Transient,
    /// One instance shared by every call.
    Singleton,
}

impl fmt::Display for InstancePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstancePolicy::Transient => f.write_str("transient"),
            InstancePolicy::Singleton => f.write_str("singleton"),
        }
    }
}

/// How a service instance is obtained for each call.
pub enum ServiceBinding<S> {
    Transient(Arc<dyn Fn() -> S + Send + Sync>),
    Singleton(Arc<S>),
}

impl<S> Clone for ServiceBinding<S> {
    fn clone(&self) -> Self {
        match self {
            ServiceBinding::Transient(factory) => ServiceBinding::Transient(factory.clone()),
            ServiceBinding::Singleton(instance) => ServiceBinding::Singleton(instance.clone()),
        }
    }
}

impl<S: Send + Sync + 'static> ServiceBinding<S> {
    pub fn transient<F>(factory: F) -> Self
    where
        F: Fn() -> S + Send + Sync + 'static,
    {
        ServiceBinding::Transient(Arc::new(factory))
    }

    pub fn singleton(instance: S) -> Self {
        ServiceBinding::Singleton(Arc::new(instance))
    }

    /// Singleton over an instance the caller keeps a handle to.
    pub fn shared(instance: Arc<S>) -> Self {
        ServiceBinding::Singleton(instance)
    }

    pub fn policy(&self) -> InstancePolicy {
        match self {
            ServiceBinding::Transient(_) => InstancePolicy::Transient,
            ServiceBinding::Singleton(_) => InstancePolicy::Singleton,
        }
    }

    fn resolve(&self) -> Instance<S> {
        match self {
            ServiceBinding::Transient(factory) => Instance::Fresh(factory()),
            ServiceBinding::Singleton(instance) => Instance::Shared(instance.clone()),
        }
    }
}

enum Instance<S> {
    Fresh(S),
    Shared(Arc<S>),
}

impl<S> Deref for Instance<S> {
    type Target = S;

    fn deref(&self) -> &S {
        match self {
            Instance::Fresh(instance) => instance,
            Instance::Shared(instance) => instance.as_ref(),
        }
    }
}

type Invoker = dyn Fn(&Payload) -> Result<Option<Payload>> + Send + Sync;

/// Registry entry: a method bound to its service instance policy.
pub struct ServiceRecord {
    target: RpcTarget,
    key: String,
    policy: InstancePolicy,
    input_type: &'static str,
    output_type: &'static str,
    invoker: Box<Invoker>,
}

impl ServiceRecord {
    /// Bind `method` to `binding` under `target`.
    ///
    /// A `None` result from `method` is reported as an absent value.
    pub fn new<S, I, O, F>(target: RpcTarget, binding: ServiceBinding<S>, method: F) -> Self
    where
        S: Send + Sync + 'static,
        I: Record,
        O: Record,
        F: Fn(&S, I) -> Option<O> + Send + Sync + 'static,
    {
        let policy = binding.policy();
        let invoker = move |payload: &Payload| -> Result<Option<Payload>> {
            let input: I = payload.decode()?;
            let instance = binding.resolve();
            match method(&*instance, input) {
                Some(output) => Ok(Some(Payload::encode(&output)?)),
                None => Ok(None),
            }
        };

        Self {
            key: target.key(),
            target,
            policy,
            input_type: std::any::type_name::<I>(),
            output_type: std::any::type_name::<O>(),
            invoker: Box::new(invoker),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn target(&self) -> &RpcTarget {
        &self.target
    }

    pub fn policy(&self) -> InstancePolicy {
        self.policy
    }

    pub fn input_type(&self) -> &'static str {
        self.input_type
    }

    pub fn output_type(&self) -> &'static str {
        self.output_type
    }

    /// Decode `payload` into the declared input type, resolve an instance and
    /// call the method.
    ///
    /// Decode failures return before the method runs.
    pub fn invoke(&self, payload: &Payload) -> Result<Option<Payload>> {
        (self.invoker)(payload)
    }
}

impl fmt::Debug for ServiceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceRecord")
            .field("key", &self.key)
            .field("policy", &self.policy)
            .field("input_type", &self.input_type)
            .field("output_type", &self.output_type)
            .finish_non_exhaustive()
    }
}

/// Thread-safe map from target keys to service records.
#[derive(Debug, Default)]
pub struct ServiceRegistry {
    records: DashMap<String, Arc<ServiceRecord>>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start registering methods of a service under `name` and `version`.
    pub fn register_service<S>(
        &self,
        name: impl Into<String>,
        version: impl Into<String>,
        binding: ServiceBinding<S>,
    ) -> ServiceBuilder<'_, S>
    where
        S: Send + Sync + 'static,
    {
        ServiceBuilder {
            registry: self,
            name: name.into(),
            version: version.into(),
            binding,
            inserted: 0,
        }
    }

    /// Insert `record` unless its key is already taken.
    ///
    /// Returns `true` if the record was inserted. The first registration of a
    /// key wins; later ones are dropped.
    pub fn insert(&self, record: ServiceRecord) -> bool {
        match self.records.entry(record.key.clone()) {
            Entry::Occupied(_) => {
                debug!("Method {} already registered, keeping the first", record.key);
                false
            }
            Entry::Vacant(slot) => {
                debug!(
                    "Registered {} ({}, {} -> {})",
                    record.key, record.policy, record.input_type, record.output_type
                );
                slot.insert(Arc::new(record));
                true
            }
        }
    }

    /// Find the record for `target`.
    pub fn lookup(&self, target: &RpcTarget) -> Result<Arc<ServiceRecord>> {
        self.records
            .get(&target.key())
            .map(|entry| entry.value().clone())
            .ok_or_else(|| target.not_found())
    }

    pub fn contains(&self, target: &RpcTarget) -> bool {
        self.records.contains_key(&target.key())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Registered keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.records.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        keys
    }
}

/// Adds methods of one service to a [`ServiceRegistry`].
pub struct ServiceBuilder<'r, S> {
    registry: &'r ServiceRegistry,
    name: String,
    version: String,
    binding: ServiceBinding<S>,
    inserted: usize,
}

impl<'r, S: Send + Sync + 'static> ServiceBuilder<'r, S> {
    /// Register a method that always produces a value.
    pub fn method<I, O, F>(self, name: &str, method: F) -> Self
    where
        I: Record,
        O: Record,
        F: Fn(&S, I) -> O + Send + Sync + 'static,
    {
        self.method_opt(name, move |service: &S, input: I| Some(method(service, input)))
    }

    /// Register a method that may produce no value.
    pub fn method_opt<I, O, F>(mut self, name: &str, method: F) -> Self
    where
        I: Record,
        O: Record,
        F: Fn(&S, I) -> Option<O> + Send + Sync + 'static,
    {
        let target = RpcTarget::new(self.name.clone(), name).with_version(self.version.clone());
        let record = ServiceRecord::new(target, self.binding.clone(), method);
        if self.registry.insert(record) {
            self.inserted += 1;
        }
        self
    }

    /// Number of methods this builder actually inserted.
    pub fn inserted(&self) -> usize {
        self.inserted
    }
}

//! HandlerRegistry - capability type → handlers, with subtype matching
//!
//! Built once through `RegistryBuilder` (mutable), then shared as an
//! immutable value. No locks on the lookup path.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use super::handler::{DynHandler, Handler, HandlerId, TypedHandler};
use crate::domain::{ActivationError, Message, MessageKind, RegistryError};

struct Bucket {
    capability: MessageKind,
    handlers: Vec<Arc<dyn DynHandler>>,
}

/// A unit that contributes handlers at startup.
///
/// Each crate or feature area implements this once and lists its handlers
/// explicitly:
///
/// # Example
/// ```ignore
/// struct BankModule;
///
/// impl HandlerModule for BankModule {
///     fn register(&self, registry: &mut RegistryBuilder) -> Result<(), RegistryError> {
///         registry
///             .register(|| Ok(AccountHandler::new()))?
///             .capability::<OpenAccount>()
///             .capability::<Deposit>();
///         Ok(())
///     }
/// }
/// ```
pub trait HandlerModule {
    fn register(&self, registry: &mut RegistryBuilder) -> Result<(), RegistryError>;
}

/// Collects bindings during discovery.
///
/// Buckets keep the order in which their capability type was first seen;
/// bindings inside a bucket keep append order.
///
/// Each handler type is activated at most once per builder; registering it
/// again reuses that instance.
#[derive(Default)]
pub struct RegistryBuilder {
    buckets: Vec<Bucket>,
    index: HashMap<&'static str, usize>,
    instances: HashMap<HandlerId, Arc<dyn Any + Send + Sync>>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Activate a handler and start declaring its capabilities.
    ///
    /// A failed activation aborts discovery with an error naming `H`.
    /// `activate` is not called if `H` was already registered.
    pub fn register<H, F>(&mut self, activate: F) -> Result<Capabilities<'_, H>, RegistryError>
    where
        H: Send + Sync + 'static,
        F: FnOnce() -> Result<H, ActivationError>,
    {
        let handler_id = HandlerId::of::<H>();
        if let Some(existing) = self.instances.get(&handler_id) {
            if let Ok(handler) = Arc::clone(existing).downcast::<H>() {
                debug!(handler = %handler_id, "handler already activated, reusing instance");
                return Ok(self.register_instance(handler));
            }
        }

        let handler = activate().map_err(|source| RegistryError::Activation {
            handler: std::any::type_name::<H>(),
            source,
        })?;
        Ok(self.register_instance(Arc::new(handler)))
    }

    /// Declare capabilities for an already constructed handler.
    pub fn register_instance<H>(&mut self, handler: Arc<H>) -> Capabilities<'_, H>
    where
        H: Send + Sync + 'static,
    {
        self.instances
            .entry(HandlerId::of::<H>())
            .or_insert_with(|| Arc::clone(&handler) as Arc<dyn Any + Send + Sync>);
        Capabilities {
            builder: self,
            handler,
        }
    }

    /// Run one discovery unit against this builder.
    pub fn module(mut self, module: &dyn HandlerModule) -> Result<Self, RegistryError> {
        module.register(&mut self)?;
        Ok(self)
    }

    pub fn build(self) -> HandlerRegistry {
        HandlerRegistry {
            buckets: self.buckets,
        }
    }

    /// Append `handler` to its capability bucket unless the same handler
    /// type is already bound there. Returns whether a binding was added.
    fn bind(&mut self, handler: Arc<dyn DynHandler>) -> bool {
        let capability = handler.capability();
        let handler_id = handler.handler_id();

        let slot = match self.index.get(capability.name()) {
            Some(&slot) => slot,
            None => {
                self.buckets.push(Bucket {
                    capability,
                    handlers: Vec::new(),
                });
                let slot = self.buckets.len() - 1;
                self.index.insert(capability.name(), slot);
                slot
            }
        };

        let bucket = &mut self.buckets[slot];
        if bucket.handlers.iter().any(|h| h.handler_id() == handler_id) {
            debug!(
                capability = %capability,
                handler = %handler_id,
                "handler already bound, skipping"
            );
            return false;
        }

        debug!(capability = %capability, handler = %handler_id, "handler bound");
        bucket.handlers.push(handler);
        true
    }
}

/// Capability declarations for one activated handler.
///
/// `capability::<M>()` only compiles when `H: Handler<M>`.
pub struct Capabilities<'a, H> {
    builder: &'a mut RegistryBuilder,
    handler: Arc<H>,
}

impl<H: Send + Sync + 'static> Capabilities<'_, H> {
    pub fn capability<M: Message>(self) -> Self
    where
        H: Handler<M>,
    {
        let adapter = TypedHandler::<M, H>::new(Arc::clone(&self.handler));
        self.builder.bind(Arc::new(adapter));
        self
    }
}

/// Read-only lookup from message kind to every handler that accepts it.
pub struct HandlerRegistry {
    buckets: Vec<Bucket>,
}

impl HandlerRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Run every module in order and build the registry.
    ///
    /// Either all modules succeed or no registry is produced.
    pub fn discover(modules: &[&dyn HandlerModule]) -> Result<Self, RegistryError> {
        let mut builder = RegistryBuilder::new();
        for module in modules {
            module.register(&mut builder)?;
        }
        Ok(builder.build())
    }

    /// All handlers bound to `kind` or to any of its ancestors.
    ///
    /// Buckets are visited in the order their capability type was first
    /// registered; handlers within a bucket in append order.
    pub fn get_handlers(&self, kind: &MessageKind) -> Vec<Arc<dyn DynHandler>> {
        self.buckets
            .iter()
            .filter(|bucket| kind.is_assignable_to(bucket.capability.name()))
            .flat_map(|bucket| bucket.handlers.iter().cloned())
            .collect()
    }

    pub fn get_handlers_for<M: Message>(&self) -> Vec<Arc<dyn DynHandler>> {
        self.get_handlers(&M::KIND)
    }

    pub fn capability_types(&self) -> Vec<MessageKind> {
        self.buckets.iter().map(|bucket| bucket.capability).collect()
    }

    /// Total number of bindings across all capability types.
    pub fn len(&self) -> usize {
        self.buckets.iter().map(|bucket| bucket.handlers.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{HandlerError, MessageEnvelope};
    use async_trait::async_trait;
    use rstest::rstest;
    use serde::{Deserialize, Serialize};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Serialize, Deserialize)]
    struct Foo {
        id: u32,
    }

    impl Message for Foo {
        const KIND: MessageKind = MessageKind::new("test.foo");
    }

    #[derive(Debug, Serialize, Deserialize)]
    struct Bar {
        id: u32,
        extra: String,
    }

    impl Message for Bar {
        const KIND: MessageKind = MessageKind::with_ancestors("test.bar", &["test.foo"]);
    }

    #[derive(Debug, Serialize, Deserialize)]
    struct Baz {
        id: u32,
    }

    impl Message for Baz {
        const KIND: MessageKind = MessageKind::new("test.baz");
    }

    struct AHandler;

    #[async_trait]
    impl Handler<Foo> for AHandler {
        async fn handle(&self, _message: Foo) -> Result<(), HandlerError> {
            Ok(())
        }
    }

    struct BHandler;

    #[async_trait]
    impl Handler<Bar> for BHandler {
        async fn handle(&self, _message: Bar) -> Result<(), HandlerError> {
            Ok(())
        }
    }

    #[async_trait]
    impl Handler<Baz> for BHandler {
        async fn handle(&self, _message: Baz) -> Result<(), HandlerError> {
            Ok(())
        }
    }

    struct FailingHandler;

    #[async_trait]
    impl Handler<Foo> for FailingHandler {
        async fn handle(&self, _message: Foo) -> Result<(), HandlerError> {
            Ok(())
        }
    }

    struct SampleModule;

    impl HandlerModule for SampleModule {
        fn register(&self, registry: &mut RegistryBuilder) -> Result<(), RegistryError> {
            registry.register(|| Ok(AHandler))?.capability::<Foo>();
            registry
                .register(|| Ok(BHandler))?
                .capability::<Bar>()
                .capability::<Baz>();
            Ok(())
        }
    }

    struct BrokenModule;

    impl HandlerModule for BrokenModule {
        fn register(&self, registry: &mut RegistryBuilder) -> Result<(), RegistryError> {
            registry
                .register::<FailingHandler, _>(|| Err(ActivationError::new("not a component")))?
                .capability::<Foo>();
            Ok(())
        }
    }

    fn ids(handlers: &[Arc<dyn DynHandler>]) -> Vec<HandlerId> {
        handlers.iter().map(|h| h.handler_id()).collect()
    }

    #[test]
    fn test_subtype_sees_handlers_bound_to_ancestor() {
        let registry = HandlerRegistry::discover(&[&SampleModule]).unwrap();

        let handlers = registry.get_handlers_for::<Bar>();
        assert_eq!(
            ids(&handlers),
            vec![HandlerId::of::<AHandler>(), HandlerId::of::<BHandler>()]
        );
    }

    #[test]
    fn test_ancestor_does_not_see_subtype_handlers() {
        let registry = HandlerRegistry::discover(&[&SampleModule]).unwrap();

        let handlers = registry.get_handlers_for::<Foo>();
        assert_eq!(ids(&handlers), vec![HandlerId::of::<AHandler>()]);
    }

    #[rstest]
    #[case::exact(Foo::KIND, 1)]
    #[case::subtype(Bar::KIND, 2)]
    #[case::unrelated(Baz::KIND, 1)]
    #[case::unknown(MessageKind::new("test.unknown"), 0)]
    #[case::unknown_subtype_of_foo(MessageKind::with_ancestors("test.qux", &["test.foo"]), 1)]
    fn test_get_handlers_matches_assignable_capabilities(#[case] kind: MessageKind, #[case] expected: usize) {
        let registry = HandlerRegistry::discover(&[&SampleModule]).unwrap();
        assert_eq!(registry.get_handlers(&kind).len(), expected);
    }

    #[test]
    fn test_repeated_discovery_does_not_duplicate_bindings() {
        let registry = HandlerRegistry::discover(&[&SampleModule, &SampleModule]).unwrap();

        assert_eq!(registry.len(), 3);
        assert_eq!(registry.get_handlers_for::<Bar>().len(), 2);
    }

    /// Activates `AHandler` once; any further activation fails.
    struct CountedModule {
        activations: AtomicUsize,
    }

    impl HandlerModule for CountedModule {
        fn register(&self, registry: &mut RegistryBuilder) -> Result<(), RegistryError> {
            registry
                .register(|| {
                    if self.activations.fetch_add(1, Ordering::SeqCst) == 0 {
                        Ok(AHandler)
                    } else {
                        Err(ActivationError::new("already activated"))
                    }
                })?
                .capability::<Foo>();
            Ok(())
        }
    }

    #[test]
    fn test_rediscovery_does_not_activate_again() {
        let module = CountedModule {
            activations: AtomicUsize::new(0),
        };

        let registry = HandlerRegistry::discover(&[&module, &module]).unwrap();

        assert_eq!(module.activations.load(Ordering::SeqCst), 1);
        assert_eq!(registry.get_handlers_for::<Foo>().len(), 1);
    }

    #[test]
    fn test_repeated_capability_on_one_handler_binds_once() {
        let mut builder = HandlerRegistry::builder();
        builder
            .register_instance(Arc::new(AHandler))
            .capability::<Foo>()
            .capability::<Foo>();
        let registry = builder.build();

        assert_eq!(registry.get_handlers_for::<Foo>().len(), 1);
    }

    #[test]
    fn test_distinct_handlers_share_a_bucket_in_append_order() {
        let mut builder = HandlerRegistry::builder();
        builder.register_instance(Arc::new(FailingHandler)).capability::<Foo>();
        builder.register_instance(Arc::new(AHandler)).capability::<Foo>();
        let registry = builder.build();

        assert_eq!(
            ids(&registry.get_handlers_for::<Foo>()),
            vec![HandlerId::of::<FailingHandler>(), HandlerId::of::<AHandler>()]
        );
    }

    #[test]
    fn test_buckets_follow_first_registration_order() {
        let mut builder = HandlerRegistry::builder();
        builder.register_instance(Arc::new(BHandler)).capability::<Bar>();
        builder.register_instance(Arc::new(AHandler)).capability::<Foo>();
        let registry = builder.build();

        assert_eq!(registry.capability_types(), vec![Bar::KIND, Foo::KIND]);
        assert_eq!(
            ids(&registry.get_handlers_for::<Bar>()),
            vec![HandlerId::of::<BHandler>(), HandlerId::of::<AHandler>()]
        );
    }

    #[test]
    fn test_activation_failure_aborts_discovery() {
        let result = HandlerRegistry::discover(&[&SampleModule, &BrokenModule]);

        let Err(err) = result else {
            panic!("discovery should fail");
        };
        assert!(matches!(
            &err,
            RegistryError::Activation { handler, .. } if handler.ends_with("FailingHandler")
        ));
        assert!(err.to_string().contains("not a component"));
    }

    #[test]
    fn test_builder_module_chains() {
        let registry = RegistryBuilder::new()
            .module(&SampleModule)
            .unwrap()
            .build();
        assert!(!registry.is_empty());
        assert_eq!(registry.capability_types(), vec![Foo::KIND, Bar::KIND, Baz::KIND]);
    }

    #[tokio::test]
    async fn test_ancestor_handler_decodes_subtype_envelope() {
        let registry = HandlerRegistry::discover(&[&SampleModule]).unwrap();
        let envelope = MessageEnvelope::new(&Bar {
            id: 3,
            extra: "x".to_string(),
        })
        .unwrap();

        for handler in registry.get_handlers(&envelope.kind()) {
            handler.handle_dyn(&envelope).await.unwrap();
        }
    }
}

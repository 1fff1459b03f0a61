//! Dependency injection container.
//!
//! Services are registered once at bootstrap, either as ready instances or as
//! factories that build a singleton on first use. Handlers never touch the
//! shared [`Container`] directly: every request gets a [`Scope`] layered over
//! it, and request-local values (the inbound [`Request`](crate::Request), the
//! [`ResponseHead`](crate::ResponseHead)) are bound into that scope only.
//!
//! # Example
//!
//! ```rust
//! use trellis_core::di::{Container, Inject};
//! use std::sync::Arc;
//!
//! struct Database {
//!     url: String,
//! }
//!
//! struct Greeting(&'static str);
//!
//! let mut container = Container::new();
//! container.register(Arc::new(Database { url: "postgres://localhost/db".into() }));
//!
//! let mut scope = container.scope();
//! scope.set(Arc::new(Greeting("hello")));
//!
//! let describe = |db: Inject<Database>, greeting: Arc<Greeting>| {
//!     format!("{} from {}", greeting.0, db.url)
//! };
//!
//! let out = scope.call(&describe).unwrap();
//! assert_eq!(out, "hello from postgres://localhost/db");
//! ```

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

type Instance = Arc<dyn Any + Send + Sync>;
type Factory = Arc<dyn Fn(&Container) -> Result<Instance, InjectionError> + Send + Sync>;

/// Error when a dependency cannot be resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InjectionError {
    /// The type name that could not be resolved.
    pub type_name: &'static str,
    /// The reason for the failure.
    pub reason: String,
}

impl fmt::Display for InjectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Failed to inject {}: {}", self.type_name, self.reason)
    }
}

impl std::error::Error for InjectionError {}

impl InjectionError {
    /// Creates a new injection error for a missing service.
    pub fn not_registered<T>() -> Self {
        Self {
            type_name: std::any::type_name::<T>(),
            reason: "service not registered".to_string(),
        }
    }

    /// Creates a new injection error with a custom reason.
    pub fn custom<T>(reason: impl Into<String>) -> Self {
        Self {
            type_name: std::any::type_name::<T>(),
            reason: reason.into(),
        }
    }
}

/// The shared dependency injection container.
///
/// Instances are keyed by type. A type is either registered as an instance
/// up front or through a factory; a factory runs at most once, and every
/// later [`get`](Self::get) returns the same `Arc`.
///
/// # Thread Safety
///
/// The container is `Send + Sync`. Each factory owns a `parking_lot::Mutex`
/// slot held while it builds, so racing first resolutions of one type wait
/// for a single construction. Factories may resolve other types.
#[derive(Default)]
pub struct Container {
    services: HashMap<TypeId, Instance>,
    factories: HashMap<TypeId, Lazy>,
}

/// A factory and the singleton it produced.
struct Lazy {
    build: Factory,
    slot: Mutex<Option<Instance>>,
}

impl Container {
    /// Creates a new empty container.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a ready-made instance.
    pub fn register<T: Send + Sync + 'static>(&mut self, service: Arc<T>) {
        self.services.insert(TypeId::of::<T>(), service);
    }

    /// Registers a factory that builds `T` on first resolution.
    ///
    /// # Example
    ///
    /// ```rust
    /// use trellis_core::Container;
    /// use std::sync::Arc;
    ///
    /// struct Config(u16);
    /// struct Server { port: u16 }
    ///
    /// let mut container = Container::new();
    /// container.register(Arc::new(Config(8080)));
    /// container.register_factory(|c: &Container| {
    ///     Ok(Server { port: c.get::<Config>()?.0 })
    /// });
    ///
    /// let first = container.get::<Server>().unwrap();
    /// let second = container.get::<Server>().unwrap();
    /// assert_eq!(first.port, 8080);
    /// assert!(Arc::ptr_eq(&first, &second));
    /// ```
    pub fn register_factory<T, F>(&mut self, build: F)
    where
        T: Send + Sync + 'static,
        F: Fn(&Container) -> Result<T, InjectionError> + Send + Sync + 'static,
    {
        let factory: Factory =
            Arc::new(move |container: &Container| -> Result<Instance, InjectionError> {
                Ok(Arc::new(build(container)?) as Instance)
            });
        self.factories.insert(
            TypeId::of::<T>(),
            Lazy {
                build: factory,
                slot: Mutex::new(None),
            },
        );
    }

    /// Returns the instance of `T`, constructing and caching it if needed.
    ///
    /// # Errors
    ///
    /// Returns `InjectionError` if `T` has neither an instance nor a factory,
    /// or if its factory fails.
    pub fn get<T: Send + Sync + 'static>(&self) -> Result<Arc<T>, InjectionError> {
        let id = TypeId::of::<T>();

        if let Some(service) = self.services.get(&id) {
            return downcast::<T>(service.clone());
        }

        let lazy = self
            .factories
            .get(&id)
            .ok_or_else(InjectionError::not_registered::<T>)?;

        let mut slot = lazy.slot.lock();
        let service = match slot.as_ref() {
            Some(built) => built.clone(),
            None => {
                let built = (lazy.build)(self)?;
                *slot = Some(built.clone());
                built
            }
        };
        drop(slot);
        downcast::<T>(service)
    }

    /// Checks if `T` can be provided, either as an instance or via a factory.
    #[must_use]
    pub fn contains<T: Send + Sync + 'static>(&self) -> bool {
        let id = TypeId::of::<T>();
        self.factories.contains_key(&id) || self.services.contains_key(&id)
    }

    /// Returns the number of provided types.
    #[must_use]
    pub fn len(&self) -> usize {
        let pending = self
            .factories
            .keys()
            .filter(|id| !self.services.contains_key(id))
            .count();
        self.services.len() + pending
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Opens a request scope layered over this container.
    #[must_use]
    pub fn scope(&self) -> Scope<'_> {
        Scope {
            container: self,
            locals: HashMap::new(),
        }
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("service_count", &self.services.len())
            .field("factory_count", &self.factories.len())
            .finish()
    }
}

fn downcast<T: Send + Sync + 'static>(service: Instance) -> Result<Arc<T>, InjectionError> {
    service
        .downcast::<T>()
        .map_err(|_| InjectionError::custom::<T>("registered instance has a different type"))
}

/// A request-local view of the [`Container`].
///
/// Values bound with [`set`](Self::set) are visible only through this scope
/// and shadow container entries of the same type. Dropping the scope drops
/// the bindings.
pub struct Scope<'c> {
    container: &'c Container,
    locals: HashMap<TypeId, Instance>,
}

impl<'c> Scope<'c> {
    /// Binds an instance for the lifetime of this scope.
    pub fn set<T: Send + Sync + 'static>(&mut self, instance: Arc<T>) {
        self.locals.insert(TypeId::of::<T>(), instance);
    }

    /// Resolves `T` from the scope, falling back to the container.
    ///
    /// # Errors
    ///
    /// Returns `InjectionError` if neither the scope nor the container can
    /// provide `T`.
    pub fn get<T: Send + Sync + 'static>(&self) -> Result<Arc<T>, InjectionError> {
        match self.locals.get(&TypeId::of::<T>()) {
            Some(local) => downcast::<T>(local.clone()),
            None => self.container.get::<T>(),
        }
    }

    /// Checks if `T` is bound in the scope or provided by the container.
    #[must_use]
    pub fn contains<T: Send + Sync + 'static>(&self) -> bool {
        self.locals.contains_key(&TypeId::of::<T>()) || self.container.contains::<T>()
    }

    /// Invokes `callable`, resolving each of its arguments from this scope.
    ///
    /// # Errors
    ///
    /// Returns the first `InjectionError` hit while resolving arguments; the
    /// callable is not invoked in that case.
    pub fn call<F, Args>(&self, callable: &F) -> Result<F::Output, InjectionError>
    where
        F: Injectable<Args>,
    {
        callable.invoke(self)
    }

    /// Returns the underlying shared container.
    #[must_use]
    pub fn container(&self) -> &'c Container {
        self.container
    }
}

impl fmt::Debug for Scope<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("local_count", &self.locals.len())
            .field("container", self.container)
            .finish()
    }
}

/// A wrapper for injected dependencies.
///
/// Declaring a handler parameter as `Inject<T>` asks the scope for `T`.
#[derive(Clone)]
pub struct Inject<T>(pub Arc<T>);

impl<T> Inject<T> {
    /// Creates a new `Inject` wrapper.
    pub fn new(inner: Arc<T>) -> Self {
        Self(inner)
    }

    /// Converts into the inner `Arc`.
    pub fn into_inner(self) -> Arc<T> {
        self.0
    }
}

impl<T> std::ops::Deref for Inject<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T: fmt::Debug> fmt::Debug for Inject<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Inject").field(&self.0).finish()
    }
}

/// Types that can be produced from a [`Scope`] as a handler argument.
pub trait FromScope: Sized {
    /// Resolves the value from the scope.
    fn from_scope(scope: &Scope<'_>) -> Result<Self, InjectionError>;
}

impl<T: Send + Sync + 'static> FromScope for Inject<T> {
    fn from_scope(scope: &Scope<'_>) -> Result<Self, InjectionError> {
        scope.get::<T>().map(Inject)
    }
}

impl<T: Send + Sync + 'static> FromScope for Arc<T> {
    fn from_scope(scope: &Scope<'_>) -> Result<Self, InjectionError> {
        scope.get::<T>()
    }
}

impl<T: FromScope> FromScope for Option<T> {
    fn from_scope(scope: &Scope<'_>) -> Result<Self, InjectionError> {
        Ok(T::from_scope(scope).ok())
    }
}

/// A callable whose arguments are all resolvable from a [`Scope`].
///
/// Implemented for `Fn` closures and functions taking up to six
/// [`FromScope`] arguments. `Args` is the tuple of argument types and only
/// serves to keep the implementations apart.
pub trait Injectable<Args>: Send + Sync + 'static {
    /// The callable's return type.
    type Output;

    /// Resolves the arguments and invokes the callable.
    fn invoke(&self, scope: &Scope<'_>) -> Result<Self::Output, InjectionError>;
}

macro_rules! impl_injectable {
    ($($arg:ident),*) => {
        impl<F, R, $($arg,)*> Injectable<($($arg,)*)> for F
        where
            F: Fn($($arg),*) -> R + Send + Sync + 'static,
            $($arg: FromScope,)*
        {
            type Output = R;

            #[allow(non_snake_case, unused_variables)]
            fn invoke(&self, scope: &Scope<'_>) -> Result<R, InjectionError> {
                $(let $arg = $arg::from_scope(scope)?;)*
                Ok((self)($($arg),*))
            }
        }
    };
}

impl_injectable!();
impl_injectable!(A1);
impl_injectable!(A1, A2);
impl_injectable!(A1, A2, A3);
impl_injectable!(A1, A2, A3, A4);
impl_injectable!(A1, A2, A3, A4, A5);
impl_injectable!(A1, A2, A3, A4, A5, A6);

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug)]
    struct TestService {
        value: String,
    }

    impl TestService {
        fn new(value: &str) -> Self {
            Self {
                value: value.to_string(),
            }
        }
    }

    struct Counter(usize);

    #[test]
    fn test_container_new() {
        let container = Container::new();
        assert!(container.is_empty());
        assert_eq!(container.len(), 0);
    }

    #[test]
    fn test_register_and_get() {
        let mut container = Container::new();
        container.register(Arc::new(TestService::new("hello")));

        let service = container.get::<TestService>().unwrap();
        assert_eq!(service.value, "hello");
    }

    #[test]
    fn test_get_missing() {
        let container = Container::new();
        let err = container.get::<TestService>().unwrap_err();
        assert!(err.to_string().contains("TestService"));
        assert!(err.to_string().contains("not registered"));
    }

    #[test]
    fn test_factory_builds_once() {
        let built = Arc::new(AtomicUsize::new(0));
        let counter = built.clone();

        let mut container = Container::new();
        container.register_factory(move |_: &Container| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(TestService::new("lazy"))
        });

        assert!(container.contains::<TestService>());
        assert_eq!(built.load(Ordering::SeqCst), 0);

        let first = container.get::<TestService>().unwrap();
        let second = container.get::<TestService>().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(built.load(Ordering::SeqCst), 1);
        assert_eq!(container.len(), 1);
    }

    #[test]
    fn test_factory_builds_once_under_concurrent_first_use() {
        use std::sync::Barrier;
        use std::thread;
        use std::time::Duration;

        const THREADS: usize = 8;

        let built = Arc::new(AtomicUsize::new(0));
        let counter = built.clone();

        let mut container = Container::new();
        container.register_factory(move |_: &Container| {
            counter.fetch_add(1, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(50));
            Ok(TestService::new("slow"))
        });

        let container = Arc::new(container);
        let barrier = Arc::new(Barrier::new(THREADS));
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let container = Arc::clone(&container);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    container.get::<TestService>().unwrap()
                })
            })
            .collect();

        let instances: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(built.load(Ordering::SeqCst), 1);
        assert!(instances.iter().all(|i| Arc::ptr_eq(i, &instances[0])));
    }

    #[test]
    fn test_failed_factory_can_retry() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = attempts.clone();

        let mut container = Container::new();
        container.register_factory(move |_: &Container| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(InjectionError::custom::<TestService>("not ready"))
            } else {
                Ok(TestService::new("second"))
            }
        });

        assert!(container.get::<TestService>().is_err());
        assert_eq!(container.get::<TestService>().unwrap().value, "second");
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_factory_resolves_dependencies() {
        let mut container = Container::new();
        container.register(Arc::new(Counter(3)));
        container.register_factory(|c: &Container| {
            let counter = c.get::<Counter>()?;
            Ok(TestService::new(&"x".repeat(counter.0)))
        });

        assert_eq!(container.get::<TestService>().unwrap().value, "xxx");
    }

    #[test]
    fn test_factory_error_propagates() {
        let mut container = Container::new();
        container.register_factory(|c: &Container| {
            c.get::<Counter>()?;
            Ok(TestService::new("never"))
        });

        let err = container.get::<TestService>().unwrap_err();
        assert!(err.type_name.contains("Counter"));
    }

    #[test]
    fn test_scope_shadows_container() {
        let mut container = Container::new();
        container.register(Arc::new(TestService::new("shared")));

        let mut scope = container.scope();
        scope.set(Arc::new(TestService::new("local")));

        assert_eq!(scope.get::<TestService>().unwrap().value, "local");
        assert_eq!(container.get::<TestService>().unwrap().value, "shared");
    }

    #[test]
    fn test_scope_bindings_do_not_leak() {
        let container = Container::new();
        {
            let mut scope = container.scope();
            scope.set(Arc::new(TestService::new("request")));
            assert!(scope.contains::<TestService>());
        }

        assert!(!container.contains::<TestService>());
        assert!(!container.scope().contains::<TestService>());
    }

    #[test]
    fn test_call_injects_arguments() {
        let mut container = Container::new();
        container.register(Arc::new(TestService::new("svc")));
        container.register(Arc::new(Counter(2)));

        let scope = container.scope();
        let out = scope
            .call(&|svc: Inject<TestService>, counter: Arc<Counter>| {
                svc.value.repeat(counter.0)
            })
            .unwrap();
        assert_eq!(out, "svcsvc");
    }

    #[test]
    fn test_call_without_arguments() {
        let container = Container::new();
        let out = container.scope().call(&|| 42).unwrap();
        assert_eq!(out, 42);
    }

    #[test]
    fn test_call_missing_argument_is_not_invoked() {
        let invoked = Arc::new(AtomicUsize::new(0));
        let seen = invoked.clone();

        let container = Container::new();
        let result = container.scope().call(&move |_svc: Inject<TestService>| {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        assert!(result.is_err());
        assert_eq!(invoked.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_optional_argument() {
        let container = Container::new();
        let out = container
            .scope()
            .call(&|svc: Option<Inject<TestService>>| svc.is_some())
            .unwrap();
        assert!(!out);
    }

    #[test]
    fn test_inject_deref() {
        let inject = Inject::new(Arc::new(TestService::new("deref test")));
        assert_eq!(inject.value, "deref test");
    }

    #[test]
    fn test_container_debug() {
        let mut container = Container::new();
        container.register(Arc::new(TestService::new("debug")));

        let debug = format!("{:?}", container);
        assert!(debug.contains("Container"));
        assert!(debug.contains("service_count"));
    }
}

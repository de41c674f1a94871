//! Service location for injected handlers.
//!
//! Services are identified by their Rust type. A handler declares what it
//! needs through the type of its first parameter, and the adapter resolves
//! that list once, when the route is wrapped:
//!
//! ```rust
//! use std::sync::Arc;
//! use tsu_wrap::{Adapter, Container, Json, Next, Request, Response};
//!
//! struct Users;
//! struct Mailer;
//!
//! async fn invite(
//!     (users, mailer): (Arc<Users>, Arc<Mailer>),
//!     _req: Request,
//!     _res: Response,
//!     _next: Next,
//! ) -> Json<&'static str> {
//!     # let _ = (users, mailer);
//!     Json("sent")
//! }
//!
//! let adapter = Adapter::new(Container::new().provide(Users).provide(Mailer));
//! let handler = adapter.wrap_with(invite).expect("services registered");
//! # let _ = handler;
//! ```

use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::ConfigError;

type Instance = Arc<dyn Any + Send + Sync>;

/// Looks up service instances by type.
///
/// Object safe, so an [`Adapter`](crate::Adapter) can hold any locator behind
/// an `Arc<dyn ServiceLocator>`.
pub trait ServiceLocator: Send + Sync {
    fn locate(&self, id: TypeId) -> Option<Instance>;
}

impl<L: ServiceLocator + ?Sized> ServiceLocator for Arc<L> {
    fn locate(&self, id: TypeId) -> Option<Instance> {
        (**self).locate(id)
    }
}

// ── Inject ────────────────────────────────────────────────────────────────────

/// A list of service identifiers, resolved into a service context.
///
/// Implemented for `Arc<T>` (one service) and for tuples of `Inject` types
/// up to eight elements, resolved left to right. There is no implementation
/// for `()`: an injected handler always has at least one service.
pub trait Inject: Clone + Send + Sync + 'static {
    fn inject(locator: &dyn ServiceLocator) -> Result<Self, ConfigError>;

    /// Type names of the services, in resolution order.
    fn describe(names: &mut Vec<&'static str>);
}

impl<T: Send + Sync + 'static> Inject for Arc<T> {
    fn inject(locator: &dyn ServiceLocator) -> Result<Self, ConfigError> {
        locator
            .locate(TypeId::of::<T>())
            .and_then(|instance| instance.downcast::<T>().ok())
            .ok_or(ConfigError::Unresolved { service: type_name::<T>() })
    }

    fn describe(names: &mut Vec<&'static str>) {
        names.push(type_name::<T>());
    }
}

macro_rules! impl_inject_tuple {
    ($($name:ident),+) => {
        impl<$($name: Inject),+> Inject for ($($name,)+) {
            fn inject(locator: &dyn ServiceLocator) -> Result<Self, ConfigError> {
                Ok(($($name::inject(locator)?,)+))
            }

            fn describe(names: &mut Vec<&'static str>) {
                $($name::describe(names);)+
            }
        }
    };
}

impl_inject_tuple!(A);
impl_inject_tuple!(A, B);
impl_inject_tuple!(A, B, C);
impl_inject_tuple!(A, B, C, D);
impl_inject_tuple!(A, B, C, D, E);
impl_inject_tuple!(A, B, C, D, E, F);
impl_inject_tuple!(A, B, C, D, E, F, G);
impl_inject_tuple!(A, B, C, D, E, F, G, H);

// ── Container ─────────────────────────────────────────────────────────────────

enum Entry {
    Shared(Instance),
    Factory(Box<dyn Fn(&Container) -> Instance + Send + Sync>),
}

/// A type-keyed [`ServiceLocator`].
///
/// Registrations chain, so a container reads like a route table:
///
/// ```rust
/// use tsu_wrap::Container;
///
/// struct Db;
/// struct Users { db: std::sync::Arc<Db> }
///
/// let container = Container::new()
///     .provide(Db)
///     .provide_with(|c| Users { db: c.resolve::<Db>().expect("db registered") });
/// assert!(container.resolve::<Users>().is_ok());
/// ```
#[derive(Default)]
pub struct Container {
    entries: HashMap<TypeId, Entry>,
}

impl Container {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a singleton. Re-registering a type replaces it.
    pub fn provide<T: Send + Sync + 'static>(self, value: T) -> Self {
        self.provide_arc(Arc::new(value))
    }

    /// Registers an already shared singleton.
    pub fn provide_arc<T: Send + Sync + 'static>(mut self, value: Arc<T>) -> Self {
        self.entries.insert(TypeId::of::<T>(), Entry::Shared(value));
        self
    }

    /// Registers a factory, run on every lookup.
    pub fn provide_with<T, F>(mut self, factory: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&Container) -> T + Send + Sync + 'static,
    {
        let factory = move |c: &Container| -> Instance { Arc::new(factory(c)) };
        self.entries.insert(TypeId::of::<T>(), Entry::Factory(Box::new(factory)));
        self
    }

    /// Typed lookup.
    pub fn resolve<T: Send + Sync + 'static>(&self) -> Result<Arc<T>, ConfigError> {
        <Arc<T> as Inject>::inject(self)
    }
}

impl ServiceLocator for Container {
    fn locate(&self, id: TypeId) -> Option<Instance> {
        match self.entries.get(&id)? {
            Entry::Shared(instance) => Some(Arc::clone(instance)),
            Entry::Factory(factory) => Some(factory(self)),
        }
    }
}

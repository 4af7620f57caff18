//! Attachable capability modules.
//!
//! A [`Decorator`] extends an [`Artifact`] without subclassing it. It holds its
//! own [`PropertyBag`] and a back-reference to its host while attached.
//!
//! ```text
//! attach(host)                         detach(host)
//!   ├── accepts(host)?   (may reject)    ├── on_detaching(host)  (host ref still valid)
//!   ├── host = Some(id)                  └── host = None
//!   └── on_attached(host)
//! ```
//!
//! [`CompositeDecorator`] bundles several decorators behind one key and fans
//! attach/detach out to them in registration order.

use std::any::Any;
use std::fmt;

use crate::domain::{
    artifact::{Artifact, ArtifactId},
    error::DomainError,
    memento::Memento,
    property_bag::PropertyBag,
};

/// State every decorator carries.
#[derive(Debug, Default)]
pub struct DecoratorBase {
    properties: PropertyBag,
    host: Option<ArtifactId>,
}

impl DecoratorBase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn properties(&self) -> &PropertyBag {
        &self.properties
    }

    pub fn properties_mut(&mut self) -> &mut PropertyBag {
        &mut self.properties
    }

    pub fn host(&self) -> Option<ArtifactId> {
        self.host
    }

    pub(crate) fn set_host(&mut self, host: Option<ArtifactId>) {
        self.host = host;
    }
}

/// A capability attachable to exactly one artifact at a time.
pub trait Decorator: Any + Send + Sync {
    /// Stable type discriminator, also the default key.
    fn kind(&self) -> &'static str;

    /// Key under which the host stores this decorator.
    fn key(&self) -> String {
        self.kind().to_string()
    }

    fn base(&self) -> &DecoratorBase;

    fn base_mut(&mut self) -> &mut DecoratorBase;

    /// Host compatibility check, run before the back-reference is stored.
    fn accepts(&self, _host: &Artifact) -> Result<(), DomainError> {
        Ok(())
    }

    fn on_attached(&mut self, _host: &mut Artifact) {}

    fn on_detaching(&mut self, _host: &mut Artifact) {}

    /// Child decorators of a composite, in registration order.
    fn children(&self) -> &[Box<dyn Decorator>] {
        &[]
    }

    fn children_mut(&mut self) -> &mut [Box<dyn Decorator>] {
        &mut []
    }

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    fn attach(&mut self, host: &mut Artifact) -> Result<(), DomainError> {
        if let Some(current) = self.base().host() {
            return Err(DomainError::DecoratorAlreadyAttached {
                decorator: self.kind().to_string(),
                host: current,
            });
        }
        self.accepts(host)?;
        self.base_mut().set_host(Some(host.id()));
        self.on_attached(host);
        Ok(())
    }

    fn detach(&mut self, host: &mut Artifact) {
        if self.base().host().is_none() {
            return;
        }
        self.on_detaching(host);
        self.base_mut().set_host(None);
    }

    fn host(&self) -> Option<ArtifactId> {
        self.base().host()
    }

    fn is_attached(&self) -> bool {
        self.base().host().is_some()
    }
}

impl dyn Decorator {
    pub fn downcast_ref<T: Decorator>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    pub fn downcast_mut<T: Decorator>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut::<T>()
    }

    pub fn properties(&self) -> &PropertyBag {
        self.base().properties()
    }

    pub fn properties_mut(&mut self) -> &mut PropertyBag {
        self.base_mut().properties_mut()
    }
}

impl Memento for dyn Decorator {
    fn discriminator(&self) -> &str {
        self.kind()
    }

    fn property_bag(&self) -> &PropertyBag {
        self.base().properties()
    }

    fn property_bag_mut(&mut self) -> &mut PropertyBag {
        self.base_mut().properties_mut()
    }
}

impl fmt::Debug for dyn Decorator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Decorator")
            .field("kind", &self.kind())
            .field("host", &self.host())
            .field("children", &self.children().len())
            .finish()
    }
}

/// Decorator that owns an ordered list of child decorators.
///
/// Attach is all-or-nothing: when one child rejects the host, the children
/// attached so far are detached again in reverse order.
pub struct CompositeDecorator {
    kind: &'static str,
    base: DecoratorBase,
    children: Vec<Box<dyn Decorator>>,
}

impl CompositeDecorator {
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            base: DecoratorBase::new(),
            children: Vec::new(),
        }
    }

    pub fn with_child(mut self, child: impl Decorator) -> Self {
        self.children.push(Box::new(child));
        self
    }

    /// Append a child. Only allowed while detached.
    pub fn push(&mut self, child: Box<dyn Decorator>) -> Result<(), DomainError> {
        if let Some(host) = self.base.host() {
            return Err(DomainError::DecoratorAlreadyAttached {
                decorator: self.kind.to_string(),
                host,
            });
        }
        self.children.push(child);
        Ok(())
    }

    pub fn child<T: Decorator>(&self) -> Option<&T> {
        self.children.iter().find_map(|c| c.downcast_ref::<T>())
    }

    pub fn child_mut<T: Decorator>(&mut self) -> Option<&mut T> {
        self.children.iter_mut().find_map(|c| c.downcast_mut::<T>())
    }
}

impl Decorator for CompositeDecorator {
    fn kind(&self) -> &'static str {
        self.kind
    }

    fn base(&self) -> &DecoratorBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut DecoratorBase {
        &mut self.base
    }

    fn accepts(&self, host: &Artifact) -> Result<(), DomainError> {
        self.children.iter().try_for_each(|c| c.accepts(host))
    }

    fn children(&self) -> &[Box<dyn Decorator>] {
        &self.children
    }

    fn children_mut(&mut self) -> &mut [Box<dyn Decorator>] {
        &mut self.children
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn attach(&mut self, host: &mut Artifact) -> Result<(), DomainError> {
        if let Some(current) = self.base.host() {
            return Err(DomainError::DecoratorAlreadyAttached {
                decorator: self.kind.to_string(),
                host: current,
            });
        }
        self.accepts(host)?;

        for index in 0..self.children.len() {
            if let Err(err) = self.children[index].attach(host) {
                for attached in self.children[..index].iter_mut().rev() {
                    attached.detach(host);
                }
                return Err(err);
            }
        }

        self.base.set_host(Some(host.id()));
        self.on_attached(host);
        Ok(())
    }

    fn detach(&mut self, host: &mut Artifact) {
        if self.base.host().is_none() {
            return;
        }
        self.on_detaching(host);
        for child in self.children.iter_mut() {
            child.detach(host);
        }
        self.base.set_host(None);
    }
}

//! Artifact: one node of the workspace tree.
//!
//! An artifact owns its property bag and its decorators. Parent and children
//! are stored as ids; the owning [`ArtifactTree`](crate::domain::tree::ArtifactTree)
//! keeps them consistent.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{
    decorator::Decorator,
    error::DomainError,
    memento::Memento,
    property_bag::PropertyBag,
    value::{FromValue, Value},
};

/// Property holding the display name.
pub const NAME_PROPERTY: &str = "name";

/// Stable unique artifact identifier. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactId(Uuid);

impl ArtifactId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Parse the textual form used in persisted documents.
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        Uuid::parse_str(raw)
            .map(Self)
            .map_err(|e| DomainError::InvalidDocument(format!("invalid artifact id '{raw}': {e}")))
    }
}

impl Default for ArtifactId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

pub struct Artifact {
    id: ArtifactId,
    kind: String,
    properties: PropertyBag,
    pub(crate) parent: Option<ArtifactId>,
    pub(crate) children: Vec<ArtifactId>,
    decorators: BTreeMap<String, Box<dyn Decorator>>,
}

impl Artifact {
    pub fn new(kind: impl Into<String>, name: impl Into<String>) -> Self {
        let mut artifact = Self::with_id(ArtifactId::new(), kind);
        artifact.properties.set_value(NAME_PROPERTY, name.into());
        artifact.properties.mark_clean();
        artifact
    }

    /// Empty artifact with a fixed id, used when rebuilding from a snapshot.
    pub fn with_id(id: ArtifactId, kind: impl Into<String>) -> Self {
        Self {
            id,
            kind: kind.into(),
            properties: PropertyBag::new(),
            parent: None,
            children: Vec::new(),
            decorators: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> ArtifactId {
        self.id
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn name(&self) -> String {
        self.properties.get_value(NAME_PROPERTY, String::new())
    }

    pub fn parent(&self) -> Option<ArtifactId> {
        self.parent
    }

    pub fn children(&self) -> &[ArtifactId] {
        &self.children
    }

    pub fn properties(&self) -> &PropertyBag {
        &self.properties
    }

    pub fn properties_mut(&mut self) -> &mut PropertyBag {
        &mut self.properties
    }

    pub fn get_value<T: FromValue>(&self, name: &str, default: T) -> T {
        self.properties.get_value(name, default)
    }

    /// See [`PropertyBag::set_value`].
    pub fn set_value(&mut self, name: &str, value: impl Into<Value>) -> bool {
        self.properties.set_value(name, value)
    }

    // ========================================================================
    // Decorators
    // ========================================================================

    /// Attach a decorator under its key.
    ///
    /// Fails with `DuplicateDecorator` when the key is taken, or with whatever
    /// the decorator's compatibility check reports. The artifact is unchanged
    /// on failure.
    pub fn add_decorator(&mut self, mut decorator: Box<dyn Decorator>) -> Result<(), DomainError> {
        let key = decorator.key();
        if self.decorators.contains_key(&key) {
            return Err(DomainError::DuplicateDecorator { key });
        }
        decorator.attach(self)?;
        self.decorators.insert(key, decorator);
        Ok(())
    }

    /// Detach and return the decorator stored under `key`.
    pub fn remove_decorator(&mut self, key: &str) -> Option<Box<dyn Decorator>> {
        let mut decorator = self.decorators.remove(key)?;
        decorator.detach(self);
        Some(decorator)
    }

    pub fn decorator<T: Decorator>(&self) -> Option<&T> {
        self.decorators
            .values()
            .find_map(|d| d.downcast_ref::<T>())
    }

    pub fn decorator_mut<T: Decorator>(&mut self) -> Option<&mut T> {
        self.decorators
            .values_mut()
            .find_map(|d| d.downcast_mut::<T>())
    }

    pub fn has_decorator<T: Decorator>(&self) -> bool {
        self.decorator::<T>().is_some()
    }

    pub fn decorator_by_key(&self, key: &str) -> Option<&dyn Decorator> {
        self.decorators.get(key).map(|d| d.as_ref())
    }

    pub fn decorator_by_key_mut(&mut self, key: &str) -> Option<&mut Box<dyn Decorator>> {
        self.decorators.get_mut(key)
    }

    /// Attached decorators in key order.
    pub fn decorators(&self) -> impl Iterator<Item = (&str, &dyn Decorator)> {
        self.decorators.iter().map(|(k, d)| (k.as_str(), d.as_ref()))
    }

    pub fn decorator_keys(&self) -> Vec<String> {
        self.decorators.keys().cloned().collect()
    }
}

impl Memento for Artifact {
    fn discriminator(&self) -> &str {
        &self.kind
    }

    fn property_bag(&self) -> &PropertyBag {
        &self.properties
    }

    fn property_bag_mut(&mut self) -> &mut PropertyBag {
        &mut self.properties
    }
}

impl fmt::Debug for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Artifact")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("properties", &self.properties)
            .field("parent", &self.parent)
            .field("children", &self.children)
            .field("decorators", &self.decorators.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::decorator::{CompositeDecorator, DecoratorBase};
    use crate::domain::memento::State;
    use std::any::Any;

    struct Marker {
        base: DecoratorBase,
    }

    impl Marker {
        fn new() -> Self {
            Self {
                base: DecoratorBase::new(),
            }
        }
    }

    impl Decorator for Marker {
        fn kind(&self) -> &'static str {
            "marker"
        }
        fn base(&self) -> &DecoratorBase {
            &self.base
        }
        fn base_mut(&mut self) -> &mut DecoratorBase {
            &mut self.base
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    #[test]
    fn new_artifact_is_clean_and_named() {
        let artifact = Artifact::new("scope", "Infrastructure");
        assert_eq!(artifact.name(), "Infrastructure");
        assert_eq!(artifact.kind(), "scope");
        assert!(!artifact.properties().is_dirty());
        assert!(artifact.parent().is_none());
    }

    #[test]
    fn one_decorator_per_key() {
        let mut artifact = Artifact::new("entity", "Customer");
        artifact.add_decorator(Box::new(Marker::new())).unwrap();
        let err = artifact.add_decorator(Box::new(Marker::new())).unwrap_err();
        assert_eq!(err, DomainError::DuplicateDecorator { key: "marker".into() });

        assert!(artifact.has_decorator::<Marker>());
        assert_eq!(artifact.decorator::<Marker>().unwrap().host(), Some(artifact.id()));
    }

    #[test]
    fn removed_decorator_is_detached() {
        let mut artifact = Artifact::new("entity", "Customer");
        artifact.add_decorator(Box::new(Marker::new())).unwrap();

        let removed = artifact.remove_decorator("marker").unwrap();
        assert!(!removed.is_attached());
        assert!(!artifact.has_decorator::<Marker>());
        assert!(artifact.remove_decorator("marker").is_none());
    }

    #[test]
    fn composite_is_found_by_its_key() {
        let mut artifact = Artifact::new("entity", "Customer");
        let composite = CompositeDecorator::new("bundle").with_child(Marker::new());
        artifact.add_decorator(Box::new(composite)).unwrap();

        let found = artifact.decorator::<CompositeDecorator>().unwrap();
        assert!(found.child::<Marker>().unwrap().is_attached());
        assert!(artifact.decorator_by_key("bundle").is_some());
    }

    #[test]
    fn capture_restore_round_trip() {
        let mut original = Artifact::new("entity", "Customer");
        original.set_value("table", "customers");
        original.set_value("audited", true);
        let state = original.capture_state();

        let mut restored = Artifact::with_id(ArtifactId::new(), "entity");
        restored.set_value("stale", 1);
        restored.restore_state(&state).unwrap();

        assert_eq!(restored.properties().to_map(), original.properties().to_map());
        assert!(!restored.properties().is_dirty());
    }

    #[test]
    fn restore_rejects_foreign_state() {
        let mut artifact = Artifact::new("entity", "Customer");
        let state = State::new("scope").with_property("name", "Infra");
        assert!(matches!(
            artifact.restore_state(&state),
            Err(DomainError::InvalidDocument(_))
        ));
        assert_eq!(artifact.name(), "Customer");
    }

    #[test]
    fn id_parses_its_display_form() {
        let id = ArtifactId::new();
        assert_eq!(ArtifactId::parse(&id.to_string()).unwrap(), id);
        assert!(ArtifactId::parse("not-a-uuid").is_err());
    }
}

//! Builtin decorators.
//!
//! | kind                | host      | purpose                                    |
//! |---------------------|-----------|--------------------------------------------|
//! | `lock`              | any       | vetoes every property write on the host    |
//! | `table`             | `entity`  | storage mapping (table name, schema)       |
//! | `control`           | any       | composite of `label` + `visibility`        |
//! | `link`              | any       | reference to another artifact              |
//! | `generator-binding` | any       | ties a staged artifact to a live run       |

use std::any::Any;

use tokio_util::sync::CancellationToken;

use crate::domain::{
    artifact::{Artifact, ArtifactId},
    decorator::{CompositeDecorator, Decorator, DecoratorBase},
    error::{DomainError, DomainResult},
    memento::{Memento, State},
    model::kinds,
    naming::to_snake_case,
    property_bag::ObserverId,
    registry::TypeRegistry,
};

macro_rules! decorator_plumbing {
    () => {
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
    };
}

// ============================================================================
// lock
// ============================================================================

/// Makes the host read-only while attached.
#[derive(Debug, Default)]
pub struct LockDecorator {
    base: DecoratorBase,
    observer: Option<ObserverId>,
}

impl LockDecorator {
    pub const KIND: &'static str = "lock";

    pub fn new(reason: impl Into<String>) -> Self {
        let mut base = DecoratorBase::new();
        base.properties_mut().set_value("reason", reason.into());
        base.properties_mut().mark_clean();
        Self {
            base,
            observer: None,
        }
    }

    pub fn reason(&self) -> String {
        self.base.properties().get_value("reason", String::new())
    }
}

impl Decorator for LockDecorator {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn on_attached(&mut self, host: &mut Artifact) {
        let id = host
            .properties_mut()
            .on_changing(|change| change.cancel = true);
        self.observer = Some(id);
    }

    fn on_detaching(&mut self, host: &mut Artifact) {
        if let Some(id) = self.observer.take() {
            host.properties_mut().remove_observer(id);
        }
    }

    decorator_plumbing!();
}

// ============================================================================
// table
// ============================================================================

/// Storage mapping for an entity.
#[derive(Debug, Default)]
pub struct TableDecorator {
    base: DecoratorBase,
}

impl TableDecorator {
    pub const KIND: &'static str = "table";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table_name(mut self, table: impl Into<String>) -> Self {
        self.base
            .properties_mut()
            .set_value("table_name", table.into());
        self
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.base.properties_mut().set_value("schema", schema.into());
        self
    }

    pub fn table_name(&self) -> String {
        self.base.properties().get_value("table_name", String::new())
    }

    pub fn schema(&self) -> String {
        self.base
            .properties()
            .get_value("schema", "public".to_string())
    }
}

impl Decorator for TableDecorator {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn accepts(&self, host: &Artifact) -> Result<(), DomainError> {
        if host.kind() != kinds::ENTITY {
            return Err(DomainError::HostTypeMismatch {
                decorator: Self::KIND.into(),
                expected: kinds::ENTITY.into(),
                actual: host.kind().into(),
            });
        }
        Ok(())
    }

    fn on_attached(&mut self, host: &mut Artifact) {
        if !self.base.properties().contains("table_name") {
            self.base
                .properties_mut()
                .set_value("table_name", to_snake_case(&host.name()));
        }
    }

    decorator_plumbing!();
}

// ============================================================================
// control = label + visibility
// ============================================================================

#[derive(Debug, Default)]
pub struct LabelCapability {
    base: DecoratorBase,
}

impl LabelCapability {
    pub const KIND: &'static str = "label";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> String {
        self.base.properties().get_value("text", String::new())
    }
}

impl Decorator for LabelCapability {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn on_attached(&mut self, host: &mut Artifact) {
        if !self.base.properties().contains("text") {
            self.base.properties_mut().set_value("text", host.name());
        }
    }

    decorator_plumbing!();
}

#[derive(Debug, Default)]
pub struct VisibilityCapability {
    base: DecoratorBase,
}

impl VisibilityCapability {
    pub const KIND: &'static str = "visibility";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_visible(&self) -> bool {
        self.base.properties().get_value("visible", true)
    }

    pub fn set_visible(&mut self, visible: bool) -> bool {
        self.base.properties_mut().set_value("visible", visible)
    }
}

impl Decorator for VisibilityCapability {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    decorator_plumbing!();
}

pub const CONTROL_KIND: &str = "control";

/// "This node is shown as a control": label plus visibility.
pub fn control() -> CompositeDecorator {
    CompositeDecorator::new(CONTROL_KIND)
        .with_child(LabelCapability::new())
        .with_child(VisibilityCapability::new())
}

// ============================================================================
// link
// ============================================================================

/// Points at another artifact of the same workspace by id.
#[derive(Debug, Default)]
pub struct LinkDecorator {
    base: DecoratorBase,
}

impl LinkDecorator {
    pub const KIND: &'static str = "link";

    pub fn new(target: ArtifactId) -> Self {
        let mut link = Self::default();
        link.base.properties_mut().set_value("target", target);
        link.base.properties_mut().mark_clean();
        link
    }

    pub fn target(&self) -> Option<ArtifactId> {
        self.base.properties().try_get("target").ok().flatten()
    }
}

impl Decorator for LinkDecorator {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    decorator_plumbing!();
}

// ============================================================================
// generator-binding
// ============================================================================

/// Marks an artifact staged by a running generator.
///
/// Holds the run's cancellation token, which has no persistent form, so this
/// decorator is declared transient and never rebuilt from a document.
#[derive(Debug)]
pub struct GeneratorBindingDecorator {
    base: DecoratorBase,
    run: CancellationToken,
}

impl GeneratorBindingDecorator {
    pub const KIND: &'static str = "generator-binding";

    pub fn new(generator: impl Into<String>, run: CancellationToken) -> Self {
        let mut base = DecoratorBase::new();
        base.properties_mut()
            .set_value("generator", generator.into());
        Self { base, run }
    }

    pub fn generator(&self) -> String {
        self.base.properties().get_value("generator", String::new())
    }

    pub fn is_cancelled(&self) -> bool {
        self.run.is_cancelled()
    }
}

impl Decorator for GeneratorBindingDecorator {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    decorator_plumbing!();
}

// ============================================================================
// Registration
// ============================================================================

fn restored(mut decorator: Box<dyn Decorator>, state: &State) -> DomainResult<Box<dyn Decorator>> {
    decorator.restore_state(state)?;
    Ok(decorator)
}

pub fn register_builtins(registry: &mut TypeRegistry) -> DomainResult<()> {
    registry.register_decorator(LockDecorator::KIND, |state| {
        restored(Box::new(LockDecorator::default()), state)
    })?;
    registry.register_decorator(TableDecorator::KIND, |state| {
        restored(Box::new(TableDecorator::new()), state)
    })?;
    registry.register_decorator(LabelCapability::KIND, |state| {
        restored(Box::new(LabelCapability::new()), state)
    })?;
    registry.register_decorator(VisibilityCapability::KIND, |state| {
        restored(Box::new(VisibilityCapability::new()), state)
    })?;
    registry.register_decorator(CONTROL_KIND, |state| restored(Box::new(control()), state))?;
    registry.register_decorator(LinkDecorator::KIND, |state| {
        restored(Box::new(LinkDecorator::default()), state)
    })?;
    registry.declare_transient(
        GeneratorBindingDecorator::KIND,
        "bound to the cancellation signal of a live generation run",
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_vetoes_writes_until_detached() {
        let mut artifact = Artifact::new(kinds::ENTITY, "Customer");
        artifact
            .add_decorator(Box::new(LockDecorator::new("published")))
            .unwrap();

        assert!(!artifact.set_value("name", "Client"));
        assert_eq!(artifact.name(), "Customer");

        let lock = artifact.remove_decorator(LockDecorator::KIND).unwrap();
        assert_eq!(lock.downcast_ref::<LockDecorator>().unwrap().reason(), "published");
        assert_eq!(artifact.properties().observer_count(), 0);
        assert!(artifact.set_value("name", "Client"));
    }

    #[test]
    fn table_only_attaches_to_entities() {
        let mut scope = Artifact::new(kinds::SCOPE, "Infrastructure");
        let err = scope
            .add_decorator(Box::new(TableDecorator::new()))
            .unwrap_err();
        assert!(matches!(err, DomainError::HostTypeMismatch { .. }));
        assert!(err.is_structural());
        assert!(!scope.has_decorator::<TableDecorator>());

        let mut entity = Artifact::new(kinds::ENTITY, "Customer Order");
        entity.add_decorator(Box::new(TableDecorator::new())).unwrap();
        let table = entity.decorator::<TableDecorator>().unwrap();
        assert_eq!(table.table_name(), "customer_order");
        assert_eq!(table.schema(), "public");
    }

    #[test]
    fn control_installs_both_capabilities() {
        let mut artifact = Artifact::new(kinds::ENTITY, "Customer");
        artifact.add_decorator(Box::new(control())).unwrap();

        let composite = artifact.decorator::<CompositeDecorator>().unwrap();
        assert_eq!(composite.child::<LabelCapability>().unwrap().text(), "Customer");
        assert!(composite.child::<VisibilityCapability>().unwrap().is_visible());
        assert!(artifact.decorator_by_key(CONTROL_KIND).is_some());
    }

    #[test]
    fn link_exposes_its_target() {
        let target = ArtifactId::new();
        assert_eq!(LinkDecorator::new(target).target(), Some(target));
        assert_eq!(LinkDecorator::default().target(), None);
    }

    #[test]
    fn binding_reflects_run_cancellation() {
        let run = CancellationToken::new();
        let binding = GeneratorBindingDecorator::new("readme", run.clone());
        assert!(!binding.is_cancelled());
        run.cancel();
        assert!(binding.is_cancelled());
        assert_eq!(binding.generator(), "readme");
    }
}

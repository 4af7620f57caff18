//! Discriminator → factory table used to rebuild snapshots.

use std::collections::HashMap;
use std::fmt;

use crate::domain::{
    artifact::{Artifact, ArtifactId},
    decorator::Decorator,
    decorators,
    error::{DomainError, DomainResult},
    memento::{Memento, State},
    model,
};

pub type ArtifactFactory = Box<dyn Fn(ArtifactId, &State) -> DomainResult<Artifact> + Send + Sync>;
pub type DecoratorFactory = Box<dyn Fn(&State) -> DomainResult<Box<dyn Decorator>> + Send + Sync>;

/// Explicit type registry, populated at startup.
#[derive(Default)]
pub struct TypeRegistry {
    artifacts: HashMap<String, ArtifactFactory>,
    decorators: HashMap<String, DecoratorFactory>,
    transient: HashMap<String, String>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the workspace model kinds and builtin decorators.
    pub fn with_builtins() -> DomainResult<Self> {
        let mut registry = Self::new();
        model::register_kinds(&mut registry)?;
        decorators::register_builtins(&mut registry)?;
        Ok(registry)
    }

    fn ensure_free(&self, discriminator: &str) -> DomainResult<()> {
        if self.knows(discriminator) {
            return Err(DomainError::DuplicateType {
                discriminator: discriminator.to_string(),
            });
        }
        Ok(())
    }

    pub fn register_artifact(
        &mut self,
        discriminator: impl Into<String>,
        factory: impl Fn(ArtifactId, &State) -> DomainResult<Artifact> + Send + Sync + 'static,
    ) -> DomainResult<()> {
        let discriminator = discriminator.into();
        self.ensure_free(&discriminator)?;
        self.artifacts.insert(discriminator, Box::new(factory));
        Ok(())
    }

    /// Register a plain artifact kind rebuilt by restoring its state.
    pub fn register_artifact_kind(&mut self, kind: &'static str) -> DomainResult<()> {
        self.register_artifact(kind, move |id, state| {
            let mut artifact = Artifact::with_id(id, kind);
            artifact.restore_state(state)?;
            Ok(artifact)
        })
    }

    pub fn register_decorator(
        &mut self,
        discriminator: impl Into<String>,
        factory: impl Fn(&State) -> DomainResult<Box<dyn Decorator>> + Send + Sync + 'static,
    ) -> DomainResult<()> {
        let discriminator = discriminator.into();
        self.ensure_free(&discriminator)?;
        self.decorators.insert(discriminator, Box::new(factory));
        Ok(())
    }

    /// Declare a type that exists at runtime but refuses reconstruction.
    pub fn declare_transient(
        &mut self,
        discriminator: impl Into<String>,
        reason: impl Into<String>,
    ) -> DomainResult<()> {
        let discriminator = discriminator.into();
        self.ensure_free(&discriminator)?;
        self.transient.insert(discriminator, reason.into());
        Ok(())
    }

    pub fn knows(&self, discriminator: &str) -> bool {
        self.artifacts.contains_key(discriminator)
            || self.decorators.contains_key(discriminator)
            || self.transient.contains_key(discriminator)
    }

    pub fn create_artifact(&self, id: ArtifactId, state: &State) -> DomainResult<Artifact> {
        self.check_transient(&state.discriminator)?;
        let factory =
            self.artifacts
                .get(&state.discriminator)
                .ok_or_else(|| DomainError::UnknownType {
                    discriminator: state.discriminator.clone(),
                })?;
        factory(id, state)
    }

    pub fn create_decorator(&self, state: &State) -> DomainResult<Box<dyn Decorator>> {
        self.check_transient(&state.discriminator)?;
        let factory =
            self.decorators
                .get(&state.discriminator)
                .ok_or_else(|| DomainError::UnknownType {
                    discriminator: state.discriminator.clone(),
                })?;
        factory(state)
    }

    fn check_transient(&self, discriminator: &str) -> DomainResult<()> {
        match self.transient.get(discriminator) {
            Some(reason) => Err(DomainError::NotReconstructible {
                discriminator: discriminator.to_string(),
                reason: reason.clone(),
            }),
            None => Ok(()),
        }
    }

    /// Registered artifact kinds, sorted.
    pub fn artifact_kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.artifacts.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }

    pub fn decorator_kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.decorators.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("artifacts", &self.artifact_kinds())
            .field("decorators", &self.decorator_kinds())
            .field("transient", &self.transient.keys().collect::<Vec<_>>())
            .finish()
    }
}

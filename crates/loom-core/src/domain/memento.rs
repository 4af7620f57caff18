//! Snapshot / restore of property state.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::{error::DomainError, property_bag::PropertyBag, value::Value};

/// A captured snapshot: the concrete type's discriminator plus a full copy
/// of its properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct State {
    pub discriminator: String,
    pub properties: BTreeMap<String, Value>,
}

impl State {
    pub fn new(discriminator: impl Into<String>) -> Self {
        Self {
            discriminator: discriminator.into(),
            properties: BTreeMap::new(),
        }
    }

    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }
}

/// Objects whose property state can be captured and restored.
pub trait Memento {
    /// Stable discriminator used to pick a factory on reconstruction.
    fn discriminator(&self) -> &str;

    fn property_bag(&self) -> &PropertyBag;

    fn property_bag_mut(&mut self) -> &mut PropertyBag;

    /// Copy every current property into a new state record.
    fn capture_state(&self) -> State {
        State {
            discriminator: self.discriminator().to_string(),
            properties: self.property_bag().to_map(),
        }
    }

    /// Replace the whole property map with the snapshot and reset the dirty flag.
    ///
    /// Fails when the snapshot belongs to another type.
    fn restore_state(&mut self, state: &State) -> Result<(), DomainError> {
        if state.discriminator != self.discriminator() {
            return Err(DomainError::InvalidDocument(format!(
                "cannot restore '{}' state into '{}'",
                state.discriminator,
                self.discriminator()
            )));
        }
        self.property_bag_mut()
            .replace_all(state.properties.clone());
        Ok(())
    }
}

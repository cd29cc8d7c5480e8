//! Resource traits for declarative state management
//!
//! A resource owns one thing on a system and knows how to create, read,
//! update and delete it. Stored state travels as JSON so plans can hold
//! resources of different types side by side; implement [`TypedResource`]
//! to work with a concrete state type instead.

use crate::types::Change;
use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;

/// Core trait for declarative resources
///
/// Every resource in the system implements this trait, which provides:
/// - Identity (id, description, type)
/// - Lifecycle (create, read, update, delete)
/// - Change detection against live state
/// - Ordering (stage) and parallelism hints
pub trait Resource: Send + Sync + fmt::Debug {
    /// Unique identifier for this resource within its type
    fn id(&self) -> String;

    /// Human-readable description of what this resource does
    fn description(&self) -> String;

    /// Resource type category, used for grouping and filtering
    fn resource_type(&self) -> &'static str;

    /// Ordering stage. Lower stages are created first and deleted last.
    fn stage(&self) -> u8 {
        0
    }

    /// Create the resource and return the state read back afterwards.
    fn create(&self) -> Result<Value>;

    /// Look the resource up by the identity in `prior`.
    ///
    /// `Ok(None)` means it no longer exists.
    fn read(&self, prior: &Value) -> Result<Option<Value>>;

    /// Compare live state with this definition.
    fn compare(&self, live: &Value) -> Result<Change>;

    /// Converge in place and return the state read back afterwards.
    fn update(&self, prior: &Value) -> Result<Value>;

    /// Remove the resource identified by `prior`.
    fn delete(&self, prior: &Value) -> Result<()>;

    /// Whether this resource can be applied in parallel with others
    /// in the same stage.
    fn can_parallelize(&self) -> bool {
        true
    }
}

/// A boxed resource for type-erased storage
pub type BoxedResource = Box<dyn Resource>;

/// [`Resource`] with a concrete state type.
pub trait TypedResource: Send + Sync + fmt::Debug {
    type State: Serialize + DeserializeOwned;

    fn id(&self) -> String;
    fn description(&self) -> String;
    fn resource_type(&self) -> &'static str;

    fn stage(&self) -> u8 {
        0
    }

    fn create(&self) -> Result<Self::State>;
    fn read(&self, prior: &Self::State) -> Result<Option<Self::State>>;
    /// Compare live state with this definition; errors when the change
    /// cannot be expressed at all.
    fn compare(&self, live: &Self::State) -> Result<Change>;
    fn update(&self, prior: &Self::State) -> Result<Self::State>;
    fn delete(&self, prior: &Self::State) -> Result<()>;

    fn can_parallelize(&self) -> bool {
        true
    }
}

fn decode<T: DeserializeOwned>(resource_type: &str, id: &str, value: &Value) -> Result<T> {
    T::deserialize(value).with_context(|| format!("Invalid stored state for {resource_type}.{id}"))
}

fn encode<T: Serialize>(state: &T) -> Result<Value> {
    serde_json::to_value(state).context("Failed to serialize resource state")
}

impl<R: TypedResource> Resource for R {
    fn id(&self) -> String {
        TypedResource::id(self)
    }

    fn description(&self) -> String {
        TypedResource::description(self)
    }

    fn resource_type(&self) -> &'static str {
        TypedResource::resource_type(self)
    }

    fn stage(&self) -> u8 {
        TypedResource::stage(self)
    }

    fn create(&self) -> Result<Value> {
        encode(&TypedResource::create(self)?)
    }

    fn read(&self, prior: &Value) -> Result<Option<Value>> {
        let prior = decode(TypedResource::resource_type(self), &TypedResource::id(self), prior)?;
        TypedResource::read(self, &prior)?
            .map(|live| encode(&live))
            .transpose()
    }

    fn compare(&self, live: &Value) -> Result<Change> {
        let live = decode(TypedResource::resource_type(self), &TypedResource::id(self), live)?;
        TypedResource::compare(self, &live)
    }

    fn update(&self, prior: &Value) -> Result<Value> {
        let prior = decode(TypedResource::resource_type(self), &TypedResource::id(self), prior)?;
        encode(&TypedResource::update(self, &prior)?)
    }

    fn delete(&self, prior: &Value) -> Result<()> {
        let prior = decode(TypedResource::resource_type(self), &TypedResource::id(self), prior)?;
        TypedResource::delete(self, &prior)
    }

    fn can_parallelize(&self) -> bool {
        TypedResource::can_parallelize(self)
    }
}

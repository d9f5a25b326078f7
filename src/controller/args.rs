use std::any::Any;

use crate::exception::{categories, Thrown};
use crate::value::Value;

/// The live argument array of one call, indexed by parameter position.
#[derive(Debug, Clone, Default)]
pub struct Args {
    values: Vec<Option<Value>>,
}

impl Args {
    pub(crate) fn new(values: Vec<Option<Value>>) -> Self {
        Self { values }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[must_use]
    pub fn value(&self, position: usize) -> Option<&Value> {
        self.values.get(position)?.as_ref()
    }

    /// The argument at `position` as a `T`.
    ///
    /// # Errors
    ///
    /// An `IllegalArgumentException` [`Thrown`] when the argument is absent or
    /// holds another type.
    pub fn get<T: Any>(&self, position: usize) -> Result<&T, Thrown> {
        let value = self.value(position).ok_or_else(|| {
            Thrown::new(
                &categories::ILLEGAL_ARGUMENT,
                format!("argument {position} is absent"),
            )
        })?;
        value.downcast_ref::<T>().ok_or_else(|| {
            Thrown::new(
                &categories::ILLEGAL_ARGUMENT,
                format!(
                    "argument {position} is {}, not {}",
                    value.type_name(),
                    std::any::type_name::<T>()
                ),
            )
        })
    }

    /// The argument at `position` if present and a `T`.
    #[must_use]
    pub fn opt<T: Any>(&self, position: usize) -> Option<&T> {
        self.value(position)?.downcast_ref::<T>()
    }

    /// Overwrite the argument at `position`. Out-of-range positions are ignored.
    pub fn set(&mut self, position: usize, value: Value) {
        if let Some(slot) = self.values.get_mut(position) {
            *slot = Some(value);
        }
    }

    pub fn clear(&mut self, position: usize) {
        if let Some(slot) = self.values.get_mut(position) {
            *slot = None;
        }
    }
}

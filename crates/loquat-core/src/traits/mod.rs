//! Record description traits implemented by storable types.
//!
//! Leaves implement [`FieldValue`] directly; records get it, plus
//! [`Record`] and [`RecordAccess`], from `#[derive(Record)]`.

mod impls;

use crate::{
    error::{Error, ErrorOrigin},
    model::{FieldKind, RecordShape},
    value::{CodecError, Value},
};
use std::any::Any;

///
/// FieldValue
///
/// A storable type: declared kind plus conversion to and from [`Value`].
/// `Value::Null` converts to the type's default.
///

pub trait FieldValue: Sized {
    fn kind() -> FieldKind;

    fn to_value(&self) -> Value;

    fn from_value(value: Value) -> Result<Self, CodecError>;

    fn as_record(&self) -> Option<&dyn RecordAccess> {
        None
    }

    fn as_record_mut(&mut self) -> Option<&mut dyn RecordAccess> {
        None
    }
}

///
/// FieldSlot
///
/// Object-safe view of one field of a record.
///

pub trait FieldSlot {
    fn get_value(&self) -> Value;

    fn set_value(&mut self, value: Value) -> Result<(), CodecError>;

    fn record(&self) -> Option<&dyn RecordAccess>;

    fn record_mut(&mut self) -> Option<&mut dyn RecordAccess>;
}

impl<T: FieldValue> FieldSlot for T {
    fn get_value(&self) -> Value {
        self.to_value()
    }

    fn set_value(&mut self, value: Value) -> Result<(), CodecError> {
        *self = T::from_value(value)?;

        Ok(())
    }

    fn record(&self) -> Option<&dyn RecordAccess> {
        self.as_record()
    }

    fn record_mut(&mut self) -> Option<&mut dyn RecordAccess> {
        self.as_record_mut()
    }
}

///
/// RecordAccess
///
/// Slot access by position in the record's shape.
///

pub trait RecordAccess {
    fn slot(&self, index: usize) -> Option<&dyn FieldSlot>;

    fn slot_mut(&mut self, index: usize) -> Option<&mut dyn FieldSlot>;
}

///
/// Record
///

pub trait Record: RecordAccess + FieldValue + Default {
    /// Fully-qualified type path.
    const PATH: &'static str;

    fn shape() -> RecordShape;
}

///
/// Entity
///
/// A top-level record stored in its own table.
///

pub trait Entity: Record + Send + Sync + 'static {
    /// Kind of its keys and default table name.
    const NAME: &'static str;

    fn hooks() -> HookBindings {
        HookBindings::none()
    }
}

///
/// RecordHooks
///
/// Optional callbacks run after a row is loaded and before one is written.
///

pub trait RecordHooks {
    fn on_load(&mut self) -> Result<(), Error> {
        Ok(())
    }

    fn on_save(&mut self) -> Result<(), Error> {
        Ok(())
    }
}

pub type HookFn = fn(&mut dyn Any) -> Result<(), Error>;

///
/// HookBindings
///
/// Load/save callbacks resolved once, when the entity model is derived.
///

#[derive(Clone, Copy, Debug, Default)]
pub struct HookBindings {
    load: Option<HookFn>,
    save: Option<HookFn>,
}

impl HookBindings {
    #[must_use]
    pub const fn none() -> Self {
        Self {
            load: None,
            save: None,
        }
    }

    #[must_use]
    pub fn of<T: RecordHooks + 'static>() -> Self {
        Self {
            load: Some(run_load::<T>),
            save: Some(run_save::<T>),
        }
    }

    #[must_use]
    pub const fn is_bound(&self) -> bool {
        self.load.is_some() || self.save.is_some()
    }

    pub fn on_load(&self, record: &mut dyn Any) -> Result<(), Error> {
        self.load.map_or(Ok(()), |hook| hook(record))
    }

    pub fn on_save(&self, record: &mut dyn Any) -> Result<(), Error> {
        self.save.map_or(Ok(()), |hook| hook(record))
    }
}

fn run_load<T: RecordHooks + 'static>(record: &mut dyn Any) -> Result<(), Error> {
    downcast::<T>(record)?.on_load()
}

fn run_save<T: RecordHooks + 'static>(record: &mut dyn Any) -> Result<(), Error> {
    downcast::<T>(record)?.on_save()
}

fn downcast<T: 'static>(record: &mut dyn Any) -> Result<&mut T, Error> {
    record.downcast_mut::<T>().ok_or_else(|| {
        Error::configuration(
            ErrorOrigin::Model,
            format!("hook bound for {}", std::any::type_name::<T>()),
        )
    })
}

/// `FieldValue::from_value` for derived records: positional values are
/// written slot by slot over a default instance.
pub fn record_from_value<R: Record>(value: Value) -> Result<R, CodecError> {
    match value {
        Value::Null => Ok(R::default()),
        Value::Record(values) => {
            let mut record = R::default();
            for (index, value) in values.into_iter().enumerate() {
                if let Some(slot) = record.slot_mut(index) {
                    slot.set_value(value)?;
                }
            }

            Ok(record)
        }
        other => Err(CodecError::Mismatch {
            expected: "record",
            found: other.label(),
        }),
    }
}

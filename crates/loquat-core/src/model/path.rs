use crate::{
    error::Error,
    model::ModelError,
    traits::{FieldSlot, RecordAccess},
    value::Value,
};

fn mismatch(path: &[usize]) -> ModelError {
    ModelError::PathMismatch {
        path: format!("{path:?}"),
    }
}

/// Follow `path` through nested records to the field slot it names.
pub fn slot_at<'a>(
    record: &'a dyn RecordAccess,
    path: &[usize],
) -> Result<&'a dyn FieldSlot, ModelError> {
    let (last, parents) = path.split_last().ok_or_else(|| mismatch(path))?;

    let mut current = record;
    for index in parents {
        current = current
            .slot(*index)
            .and_then(FieldSlot::record)
            .ok_or_else(|| mismatch(path))?;
    }

    current.slot(*last).ok_or_else(|| mismatch(path))
}

/// Mutable counterpart of [`slot_at`].
pub fn slot_at_mut<'a>(
    record: &'a mut dyn RecordAccess,
    path: &[usize],
) -> Result<&'a mut dyn FieldSlot, ModelError> {
    let (last, parents) = path.split_last().ok_or_else(|| mismatch(path))?;

    let mut current = record;
    for index in parents {
        current = current
            .slot_mut(*index)
            .and_then(FieldSlot::record_mut)
            .ok_or_else(|| mismatch(path))?;
    }

    current.slot_mut(*last).ok_or_else(|| mismatch(path))
}

/// Read the value at `path`.
pub fn read_path(record: &dyn RecordAccess, path: &[usize]) -> Result<Value, ModelError> {
    slot_at(record, path).map(FieldSlot::get_value)
}

/// Overwrite the value at `path`.
pub fn write_path(record: &mut dyn RecordAccess, path: &[usize], value: Value) -> Result<(), Error> {
    slot_at_mut(record, path)?.set_value(value)?;

    Ok(())
}

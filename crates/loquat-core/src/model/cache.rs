use crate::{
    error::Error,
    model::EntityModel,
    obs::sink::{MetricsEvent, MetricsSink},
    traits::Entity,
};
use std::{
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock},
};

///
/// ModelCache
///
/// Entity models keyed by type path. Derivation runs once per type; a race
/// between two first derivations converges on whichever is stored first.
/// Owned by the session layer so tests can build a fresh one.
///

#[derive(Debug, Default)]
pub struct ModelCache {
    models: RwLock<HashMap<&'static str, Arc<EntityModel>>>,
}

impl ModelCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached model of `E`, derived on first use.
    pub fn model<E: Entity>(&self) -> Result<Arc<EntityModel>, Error> {
        self.model_with_sink::<E>(None)
    }

    pub(crate) fn model_with_sink<E: Entity>(
        &self,
        sink: Option<&dyn MetricsSink>,
    ) -> Result<Arc<EntityModel>, Error> {
        if let Some(model) = self
            .models
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(E::PATH)
        {
            return Ok(Arc::clone(model));
        }

        let derived = Arc::new(EntityModel::derive::<E>()?);

        let mut models = self.models.write().unwrap_or_else(PoisonError::into_inner);
        let stored = models.entry(E::PATH).or_insert_with(|| {
            tracing::trace!(
                entity = E::PATH,
                columns = derived.fields.len(),
                "derived entity model"
            );
            if let Some(sink) = sink {
                sink.record(MetricsEvent::ModelDerived {
                    entity_path: E::PATH,
                });
            }

            Arc::clone(&derived)
        });

        Ok(Arc::clone(stored))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.models
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forget every cached model.
    pub fn clear(&self) {
        self.models
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

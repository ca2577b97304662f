use crate::{error::ZanzibarError, models::*};
use async_trait::async_trait;
use dashmap::DashMap;

/// Repository interface for storing relationship tuples of one store
#[async_trait]
pub trait TupleRepository: Send + Sync {
    /// Write a single tuple
    async fn write_tuple(&self, tuple: Tuple) -> Result<(), ZanzibarError>;

    /// Delete a single tuple
    async fn delete_tuple(&self, tuple: Tuple) -> Result<(), ZanzibarError>;

    /// Apply writes then deletes
    async fn batch_write(&self, request: WriteRequest) -> Result<(), ZanzibarError> {
        for tuple in request.writes {
            self.write_tuple(tuple).await?;
        }
        for tuple in request.deletes {
            self.delete_tuple(tuple).await?;
        }
        Ok(())
    }

    /// Read tuples matching the given filter
    async fn read_tuples(&self, filter: &TupleFilter) -> Result<Vec<Tuple>, ZanzibarError>;

    /// Check if a specific tuple exists
    async fn tuple_exists(&self, tuple: &Tuple) -> Result<bool, ZanzibarError>;
}

/// In-memory tuple repository
#[derive(Default)]
pub struct InMemoryTupleRepository {
    tuples: DashMap<String, Tuple>,
}

impl InMemoryTupleRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tuples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tuples.is_empty()
    }
}

#[async_trait]
impl TupleRepository for InMemoryTupleRepository {
    async fn write_tuple(&self, tuple: Tuple) -> Result<(), ZanzibarError> {
        self.tuples.insert(tuple.key(), tuple);
        Ok(())
    }

    async fn delete_tuple(&self, tuple: Tuple) -> Result<(), ZanzibarError> {
        self.tuples.remove(&tuple.key());
        Ok(())
    }

    async fn read_tuples(&self, filter: &TupleFilter) -> Result<Vec<Tuple>, ZanzibarError> {
        let mut tuples: Vec<Tuple> = self
            .tuples
            .iter()
            .filter(|entry| filter.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        // DashMap iteration order is arbitrary
        tuples.sort_by_key(Tuple::key);
        Ok(tuples)
    }

    async fn tuple_exists(&self, tuple: &Tuple) -> Result<bool, ZanzibarError> {
        Ok(self.tuples.contains_key(&tuple.key()))
    }
}

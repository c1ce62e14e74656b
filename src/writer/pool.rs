//! Interning tables for the writer's pools.
//!
//! Two kinds of table back the pools:
//!
//! - [`Pool`] holds entities with `Eq + Hash` identity (strings, types, prototypes, fields,
//!   methods). Freezing sorts the entities into the order the format requires and assigns
//!   indices.
//! - [`InternTable`] holds data items deduplicated by [`StructuralKey`] (type lists, encoded
//!   arrays, annotations, annotation sets and their reference lists). Items keep insertion
//!   order; offsets are recorded as the items are written.
//!
//! Both tables are one-way: once frozen, adding a new entity fails with
//! [`crate::Error::FrozenPoolMutation`].

use std::{borrow::Borrow, collections::HashMap, hash::Hash};

use crate::{metadata::key::StructuralKey, utils::to_u32, Error, Result};

/// An interning table that is sorted and indexed when frozen.
#[derive(Debug, Clone)]
pub struct Pool<T> {
    name: &'static str,
    items: Vec<T>,
    indices: HashMap<T, u32>,
    frozen: bool,
}

impl<T: Clone + Eq + Hash> Pool<T> {
    /// Creates an empty pool; `name` is reported in errors.
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Pool {
            name,
            items: Vec::new(),
            indices: HashMap::new(),
            frozen: false,
        }
    }

    /// Adds an entity. Returns `true` if it was not yet present.
    ///
    /// # Errors
    /// Returns [`crate::Error::FrozenPoolMutation`] if the pool is frozen and the entity is new.
    pub fn add(&mut self, item: T) -> Result<bool> {
        if self.indices.contains_key(&item) {
            return Ok(false);
        }
        if self.frozen {
            return Err(Error::FrozenPoolMutation(self.name));
        }

        let index = to_u32(self.items.len())?;
        self.indices.insert(item.clone(), index);
        self.items.push(item);
        Ok(true)
    }

    /// Sorts the entities by `key`, assigns indices and freezes the pool.
    pub fn freeze_by<K: Ord>(&mut self, key: impl FnMut(&T) -> K) -> Result<()> {
        self.items.sort_by_cached_key(key);
        self.reindex()?;
        self.frozen = true;
        Ok(())
    }

    /// Sorts the entities with a comparator, assigns indices and freezes the pool.
    pub fn freeze_with(&mut self, compare: impl FnMut(&T, &T) -> std::cmp::Ordering) -> Result<()> {
        self.items.sort_by(compare);
        self.reindex()?;
        self.frozen = true;
        Ok(())
    }

    fn reindex(&mut self) -> Result<()> {
        self.indices.clear();
        for (index, item) in self.items.iter().enumerate() {
            self.indices.insert(item.clone(), to_u32(index)?);
        }
        Ok(())
    }

    /// Index of an entity.
    pub fn index_of<Q>(&self, item: &Q) -> Option<u32>
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.indices.get(item).copied()
    }

    /// Entity at an index.
    #[must_use]
    pub fn get(&self, index: u32) -> Option<&T> {
        self.items.get(index as usize)
    }

    /// Entities in index order.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.items.iter()
    }

    /// Number of entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if the pool has no entities.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns `true` once the pool has been frozen.
    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Name of the pool.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// A content-deduplicated table of data items.
#[derive(Debug, Clone)]
pub struct InternTable<T> {
    name: &'static str,
    items: Vec<T>,
    keys: HashMap<Vec<u8>, u32>,
    offsets: Vec<u32>,
    frozen: bool,
}

impl<T: StructuralKey> InternTable<T> {
    /// Creates an empty table; `name` is reported in errors.
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        InternTable {
            name,
            items: Vec::new(),
            keys: HashMap::new(),
            offsets: Vec::new(),
            frozen: false,
        }
    }

    /// Interns an item and returns its index. Structurally equal items share one index.
    ///
    /// # Errors
    /// Returns [`crate::Error::FrozenPoolMutation`] if the table is frozen and the item is new.
    pub fn intern(&mut self, item: T) -> Result<u32> {
        let key = item.structural_key();
        if let Some(index) = self.keys.get(&key) {
            return Ok(*index);
        }
        if self.frozen {
            return Err(Error::FrozenPoolMutation(self.name));
        }

        let index = to_u32(self.items.len())?;
        self.keys.insert(key, index);
        self.items.push(item);
        self.offsets.push(0);
        Ok(index)
    }

    /// Index of an item with the same content.
    #[must_use]
    pub fn index_of(&self, item: &T) -> Option<u32> {
        self.keys.get(&item.structural_key()).copied()
    }

    /// Freezes the table.
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    /// Records where an item was written.
    pub fn set_offset(&mut self, index: u32, offset: u32) {
        if let Some(slot) = self.offsets.get_mut(index as usize) {
            *slot = offset;
        }
    }

    /// Offset an item was written at.
    ///
    /// # Errors
    /// Returns [`crate::Error::DanglingReference`] if no item with this content exists.
    pub fn offset_of(&self, item: &T) -> Result<u32> {
        self.index_of(item)
            .and_then(|index| self.offsets.get(index as usize).copied())
            .ok_or_else(|| Error::DanglingReference(format!("{} item", self.name)))
    }

    /// Offset of the item at an index.
    #[must_use]
    pub fn offset_at(&self, index: u32) -> Option<u32> {
        self.offsets.get(index as usize).copied()
    }

    /// Items in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.items.iter()
    }

    /// Number of distinct items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if the table has no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

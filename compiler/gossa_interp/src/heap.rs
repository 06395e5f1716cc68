//! Storage shared by all goroutines of one execution.
//!
//! Three arenas, each addressed by a dense handle:
//!
//! - cells: one [`Value`] per allocation (`new`, escaping locals, backing
//!   arrays); pointers project into them
//! - maps: insertion-ordered entries plus a hash index
//! - range iterators over strings and maps
//!
//! Nothing is freed before the execution ends.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::errors::Fatal;
use crate::value::{CellId, IterId, MapId, MapKey, Pointer, SliceRef, Value};

/// One map entry; the original key value is kept for iteration.
#[derive(Clone, Debug)]
pub struct MapEntry {
    pub key: MapKey,
    pub k: Value,
    pub v: Value,
}

#[derive(Clone, Debug, Default)]
pub struct MapObject {
    index: FxHashMap<MapKey, usize>,
    entries: Vec<MapEntry>,
}

impl MapObject {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &MapKey) -> Option<&Value> {
        self.index.get(key).map(|&i| &self.entries[i].v)
    }

    pub fn entry(&self, key: &MapKey) -> Option<&MapEntry> {
        self.index.get(key).map(|&i| &self.entries[i])
    }

    pub fn insert(&mut self, key: MapKey, k: Value, v: Value) {
        if let Some(&i) = self.index.get(&key) {
            self.entries[i].v = v;
            return;
        }
        self.index.insert(key.clone(), self.entries.len());
        self.entries.push(MapEntry { key, k, v });
    }

    pub fn remove(&mut self, key: &MapKey) {
        let Some(i) = self.index.remove(key) else {
            return;
        };
        self.entries.swap_remove(i);
        if let Some(moved) = self.entries.get(i) {
            self.index.insert(moved.key.clone(), i);
        }
    }

    pub fn clear(&mut self) {
        self.index.clear();
        self.entries.clear();
    }

    pub fn entries(&self) -> &[MapEntry] {
        &self.entries
    }

    /// Current keys, for an iteration that tolerates concurrent deletes.
    pub fn keys(&self) -> Vec<MapKey> {
        self.entries.iter().map(|e| e.key.clone()).collect()
    }
}

/// State of a `range` over a string or map.
#[derive(Clone, Debug)]
pub enum IterState {
    Str { bytes: Arc<[u8]>, pos: usize },
    /// `map` is `None` for a nil map. Keys deleted after the snapshot are
    /// skipped.
    Map {
        map: Option<MapId>,
        keys: Vec<MapKey>,
        pos: usize,
    },
}

#[derive(Default)]
pub struct Heap {
    cells: Vec<Value>,
    maps: Vec<MapObject>,
    iters: Vec<IterState>,
}

fn bad_address(p: &Pointer) -> Fatal {
    Fatal::Internal(format!("invalid address {:?}{:?}", p.cell, p.path.as_slice()))
}

impl Heap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, v: Value) -> Pointer {
        let id = CellId::new(self.cells.len() as u32);
        self.cells.push(v);
        Pointer::to_cell(id)
    }

    pub fn num_cells(&self) -> usize {
        self.cells.len()
    }

    /// The location `p` addresses.
    pub fn slot(&self, p: &Pointer) -> Result<&Value, Fatal> {
        let mut v = self.cells.get(p.cell.index()).ok_or_else(|| bad_address(p))?;
        for &step in &p.path {
            v = match v {
                Value::Struct(xs) | Value::Array(xs) => {
                    xs.get(step as usize).ok_or_else(|| bad_address(p))?
                }
                _ => return Err(bad_address(p)),
            };
        }
        Ok(v)
    }

    pub fn slot_mut(&mut self, p: &Pointer) -> Result<&mut Value, Fatal> {
        let err = || bad_address(p);
        let mut v = self.cells.get_mut(p.cell.index()).ok_or_else(err)?;
        for &step in &p.path {
            v = match v {
                Value::Struct(xs) | Value::Array(xs) => xs.get_mut(step as usize).ok_or_else(err)?,
                _ => return Err(err()),
            };
        }
        Ok(v)
    }

    pub fn load(&self, p: &Pointer) -> Result<Value, Fatal> {
        self.slot(p).cloned()
    }

    pub fn store(&mut self, p: &Pointer, v: Value) -> Result<(), Fatal> {
        *self.slot_mut(p)? = v;
        Ok(())
    }

    /// The elements `s` covers, copied out.
    pub fn slice_elems(&self, s: &SliceRef) -> Result<Vec<Value>, Fatal> {
        match self.slot(&s.array)? {
            Value::Array(xs) => xs
                .get(s.offset..s.offset + s.len)
                .map(<[Value]>::to_vec)
                .ok_or_else(|| bad_address(&s.array)),
            _ => Err(bad_address(&s.array)),
        }
    }

    /// Elements of a slice value; a nil slice has none.
    pub fn elems_of(&self, v: &Value) -> Result<Vec<Value>, Fatal> {
        match v {
            Value::Slice(s) => self.slice_elems(s),
            _ => Ok(Vec::new()),
        }
    }

    /// A fresh backing array holding `elems`, sliced whole.
    pub fn alloc_slice(&mut self, elems: Vec<Value>) -> Value {
        let len = elems.len();
        let array = self.alloc(Value::Array(elems));
        Value::Slice(SliceRef {
            array,
            offset: 0,
            len,
            cap: len,
        })
    }

    pub fn new_map(&mut self) -> MapId {
        let id = MapId::new(self.maps.len() as u32);
        self.maps.push(MapObject::default());
        id
    }

    pub fn map(&self, id: MapId) -> &MapObject {
        &self.maps[id.index()]
    }

    pub fn map_mut(&mut self, id: MapId) -> &mut MapObject {
        &mut self.maps[id.index()]
    }

    pub fn new_iter(&mut self, state: IterState) -> IterId {
        let id = IterId::new(self.iters.len() as u32);
        self.iters.push(state);
        id
    }

    pub fn iter_mut(&mut self, id: IterId) -> &mut IterState {
        &mut self.iters[id.index()]
    }
}

#[cfg(test)]
mod tests;

use std::collections::{HashMap, VecDeque};

use crate::runtime::ObjectRef;

/// Offset applied to object handles when encoding them as DAP `variablesReference` values.
///
/// Frame scopes use `frame * 1000 + selector`, so object references start far
/// above any frame-derived id.
pub const OBJECT_REFERENCE_BASE: i64 = 1_000_000;

/// Default maximum number of object references kept per session.
pub const DEFAULT_MAX_OBJECTS: usize = 10_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectHandle(u32);

impl ObjectHandle {
    pub fn from_variables_reference(variables_reference: i64) -> Option<Self> {
        let raw = variables_reference.checked_sub(OBJECT_REFERENCE_BASE)?;
        if raw <= 0 {
            return None;
        }
        u32::try_from(raw).ok().map(Self)
    }

    pub fn as_variables_reference(self) -> i64 {
        OBJECT_REFERENCE_BASE + i64::from(self.0)
    }

    pub fn as_u32(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for ObjectHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "@{}", self.0)
    }
}

/// Maps opaque `variablesReference` ids to runtime objects.
///
/// Handles are stop-scoped: [`ObjectRegistry::clear`] drops every entry when
/// the script resumes into a new pause, but the handle counter keeps counting
/// so an id handed out earlier is never reused for a different object within
/// the same session. [`ObjectRegistry::reset`] starts over for a new session.
pub struct ObjectRegistry {
    next_handle: u32,
    object_to_handle: HashMap<ObjectRef, ObjectHandle>,
    handle_to_object: HashMap<ObjectHandle, ObjectRef>,
    max_objects: usize,
    fifo: VecDeque<ObjectHandle>,
}

impl ObjectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_objects(max_objects: usize) -> Self {
        Self {
            max_objects,
            ..Self::default()
        }
    }

    /// Register `object`, returning the existing handle if it is already tracked.
    pub fn track(&mut self, object: ObjectRef) -> ObjectHandle {
        if let Some(handle) = self.object_to_handle.get(&object).copied() {
            return handle;
        }

        let next = self.next_handle.max(1);
        let handle = ObjectHandle(next);
        self.next_handle = next.saturating_add(1);
        self.object_to_handle.insert(object, handle);
        self.handle_to_object.insert(handle, object);
        self.fifo.push_back(handle);
        self.maybe_evict();
        handle
    }

    pub fn get(&self, handle: ObjectHandle) -> Option<ObjectRef> {
        self.handle_to_object.get(&handle).copied()
    }

    pub fn lookup(&self, variables_reference: i64) -> Option<ObjectRef> {
        ObjectHandle::from_variables_reference(variables_reference).and_then(|h| self.get(h))
    }

    pub fn len(&self) -> usize {
        self.handle_to_object.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handle_to_object.is_empty()
    }

    /// Drop all tracked objects, keeping the handle counter.
    pub fn clear(&mut self) {
        self.object_to_handle.clear();
        self.handle_to_object.clear();
        self.fifo.clear();
    }

    /// Drop all tracked objects and restart handle numbering.
    pub fn reset(&mut self) {
        self.clear();
        self.next_handle = 0;
    }

    fn maybe_evict(&mut self) {
        while self.fifo.len() > self.max_objects {
            let Some(handle) = self.fifo.pop_front() else {
                break;
            };
            if let Some(object) = self.handle_to_object.remove(&handle) {
                self.object_to_handle.remove(&object);
            }
        }
    }
}

impl Default for ObjectRegistry {
    fn default() -> Self {
        Self {
            next_handle: 0,
            object_to_handle: HashMap::new(),
            handle_to_object: HashMap::new(),
            max_objects: DEFAULT_MAX_OBJECTS,
            fifo: VecDeque::new(),
        }
    }
}

//! Line-indexed multi-map of annotations. Pure state: every mutation returns
//! the events a view has to apply to stay consistent.

use std::collections::BTreeMap;

use crate::{
    annotation::{Annotation, AnnotationId},
    types::LineKey,
};

/// Change applied to the index.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IndexEvent {
    /// An annotation was appended to a line list.
    Added {
        /// Added annotation.
        id:       AnnotationId,
        /// Line list it was appended to.
        key:      LineKey,
        /// Position within that list.
        position: usize,
    },
    /// An annotation was dropped from a line list.
    Removed {
        /// Removed annotation.
        id:      AnnotationId,
        /// Line list it was dropped from.
        key:     LineKey,
        /// The list became empty and the key was deleted.
        emptied: bool,
    },
    /// An annotation was swapped for another at the same position.
    Replaced {
        /// Previous annotation.
        old:      AnnotationId,
        /// Its replacement.
        new:      AnnotationId,
        /// Line list both live in.
        key:      LineKey,
        /// Position within that list.
        position: usize,
    },
}

/// Per-line annotation lists. Insertion order within a line is preserved.
#[derive(Clone, Debug, Default)]
pub struct AnnotationIndex {
    /// Annotation lists keyed by line; never contains an empty list.
    lines: BTreeMap<LineKey, Vec<Annotation>>,
}

impl AnnotationIndex {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an annotation to the list of its line.
    pub fn add(&mut self, annotation: Annotation) -> IndexEvent {
        let key = annotation.key();
        let id = annotation.id();
        let list = self.lines.entry(key).or_default();
        list.push(annotation);
        IndexEvent::Added {
            id,
            key,
            position: list.len() - 1,
        }
    }

    /// Drops an annotation, matched by identity within the list of its line.
    /// Returns `None` when it is not indexed.
    pub fn remove(&mut self, annotation: &Annotation) -> Option<IndexEvent> {
        let key = annotation.key();
        let id = annotation.id();
        let list = self.lines.get_mut(&key)?;
        let before = list.len();
        list.retain(|a| a.id() != id);
        if list.len() == before {
            return None;
        }

        let emptied = list.is_empty();
        if emptied {
            self.lines.remove(&key);
        }
        Some(IndexEvent::Removed { id, key, emptied })
    }

    /// Replaces `original` by `updated`. Same line: in place, keeping the
    /// position. Different line: remove then append. Unknown originals leave
    /// the index untouched.
    pub fn update(&mut self, original: &Annotation, updated: Annotation) -> Vec<IndexEvent> {
        let key = original.key();
        let Some(position) = self.position(original) else {
            return Vec::new();
        };

        if key != updated.key() {
            let mut events = Vec::with_capacity(2);
            events.extend(self.remove(original));
            events.push(self.add(updated));
            return events;
        }

        let new = updated.id();
        let Some(list) = self.lines.get_mut(&key) else {
            return Vec::new();
        };
        list[position] = updated;
        vec![IndexEvent::Replaced {
            old: original.id(),
            new,
            key,
            position,
        }]
    }

    /// Position of an annotation within the list of its line.
    pub fn position(&self, annotation: &Annotation) -> Option<usize> {
        self.lines
            .get(&annotation.key())?
            .iter()
            .position(|a| a.id() == annotation.id())
    }

    /// Looks an annotation up by identity.
    pub fn get(&self, id: AnnotationId) -> Option<&Annotation> {
        self.iter().find(|a| a.id() == id)
    }

    /// Mutable lookup by identity.
    pub fn get_mut(&mut self, id: AnnotationId) -> Option<&mut Annotation> {
        self.lines
            .values_mut()
            .flat_map(|list| list.iter_mut())
            .find(|a| a.id() == id)
    }

    /// Looks a user annotation or question up by server id.
    pub fn find_by_server_id(&self, server_id: u64) -> Option<&Annotation> {
        self.iter().find(|a| a.server_id() == Some(server_id))
    }

    /// Whether an annotation is indexed.
    pub fn contains(&self, id: AnnotationId) -> bool {
        self.get(id).is_some()
    }

    /// Annotations of one line, in insertion order.
    pub fn line(&self, key: LineKey) -> &[Annotation] {
        self.lines.get(&key).map(Vec::as_slice).unwrap_or_default()
    }

    /// All non-empty lines.
    pub fn lines(&self) -> impl Iterator<Item = (LineKey, &[Annotation])> {
        self.lines.iter().map(|(key, list)| (*key, list.as_slice()))
    }

    /// All annotations, line by line.
    pub fn iter(&self) -> impl Iterator<Item = &Annotation> {
        self.lines.values().flatten()
    }

    /// Total number of annotations.
    pub fn count(&self) -> usize {
        self.lines.values().map(Vec::len).sum()
    }

    /// Number of annotations surviving "show errors only".
    pub fn important_count(&self) -> usize {
        self.iter().filter(|a| a.important()).count()
    }

    /// Whether nothing is indexed.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

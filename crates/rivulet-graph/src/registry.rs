//! Stream registry: the owned set of stream definitions, keyed by id.
//!
//! Streams are kept in insertion order so the persisted `(id, stream)` list
//! is stable across save/load cycles.

use rivulet_types::{Result, RivuletError, Stream, StreamId};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamRegistry {
    streams: Vec<Stream>,
}

impl StreamRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a registry from persisted `(id, stream)` pairs.
    ///
    /// Fails if a pair's key disagrees with the stream's own id or if an id
    /// appears twice.
    pub fn from_entries(entries: Vec<(StreamId, Stream)>) -> Result<Self> {
        let mut registry = Self::new();
        for (id, stream) in entries {
            if id != stream.id {
                return Err(RivuletError::invalid_config(
                    "registry",
                    format!("entry key '{id}' does not match stream id '{}'", stream.id),
                ));
            }
            registry.insert(stream)?;
        }
        Ok(registry)
    }

    pub fn entries(&self) -> Vec<(StreamId, Stream)> {
        self.streams
            .iter()
            .map(|s| (s.id.clone(), s.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.streams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }

    pub fn contains(&self, id: &StreamId) -> bool {
        self.position(id).is_some()
    }

    pub fn get(&self, id: &StreamId) -> Option<&Stream> {
        self.position(id).map(|i| &self.streams[i])
    }

    pub fn get_mut(&mut self, id: &StreamId) -> Option<&mut Stream> {
        self.position(id).map(move |i| &mut self.streams[i])
    }

    /// Add a new stream. Ids are never overwritten by `insert`.
    pub fn insert(&mut self, stream: Stream) -> Result<()> {
        if self.contains(&stream.id) {
            return Err(RivuletError::DuplicateStream(stream.id));
        }
        self.streams.push(stream);
        Ok(())
    }

    /// Swap in a new definition for an existing id, returning the old one.
    pub fn replace(&mut self, stream: Stream) -> Result<Stream> {
        match self.position(&stream.id) {
            Some(i) => Ok(std::mem::replace(&mut self.streams[i], stream)),
            None => Err(RivuletError::UnknownStream(stream.id)),
        }
    }

    pub fn remove(&mut self, id: &StreamId) -> Option<Stream> {
        self.position(id).map(|i| self.streams.remove(i))
    }

    pub fn clear(&mut self) {
        self.streams.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &Stream> {
        self.streams.iter()
    }

    pub fn sources(&self) -> impl Iterator<Item = &Stream> {
        self.streams.iter().filter(|s| s.is_source())
    }

    pub fn transforms(&self) -> impl Iterator<Item = &Stream> {
        self.streams.iter().filter(|s| s.is_transform())
    }

    fn position(&self, id: &StreamId) -> Option<usize> {
        self.streams.iter().position(|s| &s.id == id)
    }
}

//! Serialization and snapshot support.
//!
//! Provides binary serialization via `bitcode` with a versioned header and a
//! snapshot ring buffer for undo/replay. Only the [`World`] is serialized:
//! the catalog is static configuration and the event bus holds closures, so
//! both stay with the caller.

use crate::scheduler::Scheduler;
use crate::world::World;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Magic number identifying a production line snapshot.
pub const SNAPSHOT_MAGIC: u32 = 0x524C_0001;

/// Current format version. Increment when breaking the wire format.
pub const FORMAT_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur during serialization.
#[derive(Debug, thiserror::Error)]
pub enum SerializeError {
    #[error("bitcode encoding failed: {0}")]
    Encode(String),
}

/// Errors that can occur during deserialization.
#[derive(Debug, thiserror::Error)]
pub enum DeserializeError {
    #[error("invalid magic number: expected 0x{:08X}, got 0x{:08X}", SNAPSHOT_MAGIC, .0)]
    InvalidMagic(u32),
    #[error("unsupported format version: expected {}, got {}", FORMAT_VERSION, .0)]
    UnsupportedVersion(u32),
    #[error("snapshot from future version {0} (this build supports up to {FORMAT_VERSION})")]
    FutureVersion(u32),
    #[error("bitcode decoding failed: {0}")]
    Decode(String),
}

// ---------------------------------------------------------------------------
// Snapshot header
// ---------------------------------------------------------------------------

/// Header prepended to every serialized snapshot. Enables format detection
/// and version checking before attempting to use the payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotHeader {
    /// Magic number for format detection.
    pub magic: u32,
    /// Format version for forward compatibility.
    pub version: u32,
    /// Tick count at the time the snapshot was taken.
    pub tick: u64,
}

impl SnapshotHeader {
    /// Create a header for the current format version.
    pub fn new(tick: u64) -> Self {
        Self {
            magic: SNAPSHOT_MAGIC,
            version: FORMAT_VERSION,
            tick,
        }
    }

    /// Validate the header. Returns `Ok(())` if valid.
    pub fn validate(&self) -> Result<(), DeserializeError> {
        if self.magic != SNAPSHOT_MAGIC {
            return Err(DeserializeError::InvalidMagic(self.magic));
        }
        if self.version > FORMAT_VERSION {
            return Err(DeserializeError::FutureVersion(self.version));
        }
        if self.version < FORMAT_VERSION {
            return Err(DeserializeError::UnsupportedVersion(self.version));
        }
        Ok(())
    }
}

/// The serializable world snapshot: header plus the full world state.
#[derive(Debug, Serialize, Deserialize)]
struct WorldBlob {
    header: SnapshotHeader,
    world: World,
}

// ---------------------------------------------------------------------------
// World serialization
// ---------------------------------------------------------------------------

impl World {
    /// Serialize the world to a binary blob via bitcode.
    pub fn serialize(&self) -> Result<Vec<u8>, SerializeError> {
        let blob = WorldBlob {
            header: SnapshotHeader::new(self.tick()),
            world: self.clone(),
        };
        bitcode::serialize(&blob).map_err(|e| SerializeError::Encode(e.to_string()))
    }

    /// Deserialize a world from a binary blob.
    ///
    /// Validates the snapshot header (magic number, version) and returns an
    /// error (not a panic) on mismatch.
    pub fn deserialize(data: &[u8]) -> Result<Self, DeserializeError> {
        let blob: WorldBlob =
            bitcode::deserialize(data).map_err(|e| DeserializeError::Decode(e.to_string()))?;
        blob.header.validate()?;
        Ok(blob.world)
    }
}

// ---------------------------------------------------------------------------
// SnapshotRingBuffer
// ---------------------------------------------------------------------------

/// A fixed-capacity ring buffer of serialized world snapshots.
///
/// When the buffer is full, the oldest snapshot is evicted. Each entry
/// stores the serialized bytes and the tick at which it was taken.
#[derive(Debug)]
pub struct SnapshotRingBuffer {
    /// Stored snapshots. Fixed-size allocation.
    entries: Vec<Option<SnapshotEntry>>,
    /// Write position (wraps around).
    head: usize,
    /// Number of snapshots currently stored.
    len: usize,
    /// Total snapshots ever taken (including evicted).
    total_taken: u64,
}

/// A single entry in the snapshot ring buffer.
#[derive(Debug, Clone)]
pub struct SnapshotEntry {
    /// Tick at which the snapshot was taken.
    pub tick: u64,
    /// Serialized world state (bitcode bytes).
    pub data: Vec<u8>,
}

impl SnapshotRingBuffer {
    /// Create a new ring buffer with the given capacity.
    /// A capacity of 0 is clamped to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: (0..capacity).map(|_| None).collect(),
            head: 0,
            len: 0,
            total_taken: 0,
        }
    }

    /// Push a snapshot into the ring buffer. If full, the oldest entry
    /// is evicted.
    pub fn push(&mut self, entry: SnapshotEntry) {
        self.entries[self.head] = Some(entry);
        self.head = (self.head + 1) % self.capacity();
        if self.len < self.capacity() {
            self.len += 1;
        }
        self.total_taken += 1;
    }

    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Total snapshots ever taken (including evicted).
    pub fn total_taken(&self) -> u64 {
        self.total_taken
    }

    /// Get a snapshot by index (0 = oldest, len-1 = newest).
    /// Returns `None` if the index is out of range.
    pub fn get(&self, index: usize) -> Option<&SnapshotEntry> {
        if index >= self.len {
            return None;
        }
        let start = if self.len < self.capacity() {
            0
        } else {
            self.head
        };
        let actual_index = (start + index) % self.capacity();
        self.entries[actual_index].as_ref()
    }

    /// Get the most recent snapshot.
    pub fn latest(&self) -> Option<&SnapshotEntry> {
        if self.len == 0 {
            return None;
        }
        self.get(self.len - 1)
    }

    /// Clear all snapshots.
    pub fn clear(&mut self) {
        for entry in &mut self.entries {
            *entry = None;
        }
        self.head = 0;
        self.len = 0;
    }
}

// ---------------------------------------------------------------------------
// Scheduler snapshot integration
// ---------------------------------------------------------------------------

impl Scheduler {
    /// Take a snapshot of the current world state and store it in the
    /// provided ring buffer.
    pub fn take_snapshot(&self, buffer: &mut SnapshotRingBuffer) -> Result<(), SerializeError> {
        let data = self.world().serialize()?;
        buffer.push(SnapshotEntry {
            tick: self.world().tick(),
            data,
        });
        Ok(())
    }

    /// Restore the world from a snapshot in the ring buffer.
    ///
    /// `index` is 0-based from oldest (0) to newest (len-1). Returns
    /// `Ok(false)` if the index is out of range.
    pub fn restore_snapshot(
        &mut self,
        buffer: &SnapshotRingBuffer,
        index: usize,
    ) -> Result<bool, DeserializeError> {
        let Some(entry) = buffer.get(index) else {
            return Ok(false);
        };
        let world = World::deserialize(&entry.data)?;
        self.restore(world);
        Ok(true)
    }
}

// ===========================================================================
// Tests
// ===========================================================================

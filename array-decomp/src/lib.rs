//! Master/worker array decomposition over a group of communicating ranks.
//!
//! Rank 0 owns the array, ships one equal chunk to every other rank, updates
//! its own chunk, collects the updated chunks back and finally receives the
//! sum of every rank's local aggregate through a collective reduction.
use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;
use std::pin::Pin;

pub trait DataType: Serialize + DeserializeOwned + Default + Clone + 'static {}

impl<T> DataType for T where T: Serialize + DeserializeOwned + Default + Clone + 'static {}

/// Future returned by the point-to-point primitives of a [`CommGroup`].
pub type CommFuture<T> = Pin<Box<dyn Future<Output = Result<T>>>>;

pub trait CommGroup {
    /// Get the rank of the process in the group.
    fn rank(&self) -> u32;
    /// Get the size of this communication group.
    fn size(&self) -> u32;
    /// Send data to a destination process.
    ///
    /// Must be matched by exactly one `recv` on `dest` with the same tag.
    fn send<T: DataType>(&self, data: &T, dest: u32, tag: u32) -> CommFuture<()>;
    /// Receive some data from a source process.
    ///
    /// Only a message sent by `source` with the same `tag` can complete this
    /// receive; messages on other tags stay queued for their own receive.
    fn recv<T: DataType>(&self, source: u32, tag: u32) -> CommFuture<T>;
    /// Tear down every participant of the group with a non-zero status.
    fn abort(&self, code: i32) -> !;
}

pub mod array;
pub mod channel;
pub mod config;
pub mod driver;
mod error;
pub mod local;
#[cfg(feature = "mpi")]
mod mpi;
pub mod partition;
pub mod reduce;
pub mod report;
pub mod role;
pub mod transform;

pub use array::{Chunk, GlobalArray};
pub use channel::ChunkChannel;
pub use config::RunConfig;
pub use driver::{run_local, run_participant, Outcome};
pub use error::{Error, Result};
pub use local::LocalCommGroup;
#[cfg(feature = "mpi")]
pub use mpi::{init_standard_mpi, MpiCommGroup};
pub use partition::Partition;
pub use reduce::reduce_sum;
pub use report::Report;
pub use role::{Participant, ParticipantIdentity};

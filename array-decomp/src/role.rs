//! Coordinator and worker behaviour, selected once from the participant's
//! rank.
//!
//! Both roles stop after their local compute and exchange phases. The
//! collective reduction and the report are driven by [`crate::driver`], which
//! runs them for every role alike.
use crate::array::GlobalArray;
use crate::channel::ChunkChannel;
use crate::partition::Partition;
use crate::{transform, CommGroup, RunConfig};
use crate::Result;
use futures::future::{FutureExt, LocalBoxFuture};
use std::fmt;
use tracing::{debug, info};

/// Rank that owns the array and orchestrates the run.
pub const COORDINATOR: u32 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParticipantIdentity {
    pub rank: u32,
    pub size: u32,
}

impl ParticipantIdentity {
    pub fn of<C: CommGroup>(comm: &C) -> Self {
        ParticipantIdentity {
            rank: comm.rank(),
            size: comm.size(),
        }
    }

    pub fn is_coordinator(&self) -> bool {
        self.rank == COORDINATOR
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorState {
    Init,
    Distribute,
    Compute,
    Collect,
    Reduce,
    Report,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Init,
    Receive,
    Compute,
    Send,
    Reduce,
    Done,
}

impl fmt::Display for CoordinatorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Offsets of one worker's chunk on the way out and on the way back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Exchange {
    pub rank: u32,
    pub sent_offset: usize,
    pub received_offset: usize,
}

/// What the coordinator holds once every chunk is back.
#[derive(Debug, Clone)]
pub struct Collected {
    pub initial: Vec<f64>,
    pub initial_sum: f64,
    pub array: GlobalArray,
    pub exchanges: Vec<Exchange>,
}

/// Result of a role's compute and exchange phases.
#[derive(Debug, Clone)]
pub struct RoleOutcome {
    pub local_sum: f64,
    /// Present only on the coordinator.
    pub collected: Option<Collected>,
}

pub trait Participant<C: CommGroup> {
    fn identity(&self) -> ParticipantIdentity;

    /// Run this role up to, but not including, the collective reduction.
    fn run<'a>(&'a mut self, comm: &'a C) -> LocalBoxFuture<'a, Result<RoleOutcome>>;

    /// Mark the role done once the reduction has returned.
    fn finish(&mut self);
}

/// Pick the role for `identity`. Called once per run.
pub fn select<C: CommGroup + 'static>(
    identity: ParticipantIdentity,
    partition: Partition,
    config: RunConfig,
) -> Box<dyn Participant<C>> {
    if identity.is_coordinator() {
        Box::new(CoordinatorRole::new(identity, partition, config))
    } else {
        Box::new(WorkerRole::new(identity, partition, config))
    }
}

pub struct CoordinatorRole {
    identity: ParticipantIdentity,
    partition: Partition,
    config: RunConfig,
    state: CoordinatorState,
}

impl CoordinatorRole {
    pub fn new(identity: ParticipantIdentity, partition: Partition, config: RunConfig) -> Self {
        CoordinatorRole {
            identity,
            partition,
            config,
            state: CoordinatorState::Init,
        }
    }

    pub fn state(&self) -> CoordinatorState {
        self.state
    }

    fn enter(&mut self, state: CoordinatorState) {
        debug!(rank = self.identity.rank, from = %self.state, to = %state, "coordinator state");
        self.state = state;
    }

    async fn execute<C: CommGroup>(&mut self, comm: &C) -> Result<RoleOutcome> {
        let rank = self.identity.rank;
        let partition = self.partition;
        let channel = ChunkChannel::new(comm);

        let mut array = GlobalArray::initialized(partition.len());
        let initial = array.as_slice().to_vec();
        let initial_sum = array.naive_sum();
        info!(rank, values = ?initial, sum = initial_sum, "initialized array");

        self.enter(CoordinatorState::Distribute);
        for worker in 1..partition.participants() {
            let chunk = array.copy_chunk(partition.range(worker));
            channel.send_chunk(worker, &chunk).await?;
            info!(
                rank,
                peer = worker,
                offset = chunk.offset,
                len = chunk.len(),
                "sent chunk to worker"
            );
        }

        self.enter(CoordinatorState::Compute);
        let own = partition.range(COORDINATOR);
        if self.config.trace_chunks {
            debug!(rank, offset = own.start, values = ?&array.as_slice()[own.clone()], "chunk before update");
        }
        let local_sum = transform::apply(own.start, array.slice_mut(own.clone()));
        if self.config.trace_chunks {
            debug!(rank, offset = own.start, values = ?&array.as_slice()[own.clone()], "chunk after update");
        }
        info!(rank, local_sum, "local sum");

        self.enter(CoordinatorState::Collect);
        let mut exchanges = Vec::with_capacity(partition.participants() as usize - 1);
        for worker in 1..partition.participants() {
            let chunk = channel
                .recv_chunk(worker, partition.chunk_size(), partition.len())
                .await?;
            array.write_back(&chunk);
            debug!(rank, peer = worker, offset = chunk.offset, "collected chunk");
            exchanges.push(Exchange {
                rank: worker,
                sent_offset: partition.offset(worker),
                received_offset: chunk.offset,
            });
        }

        self.enter(CoordinatorState::Reduce);
        Ok(RoleOutcome {
            local_sum,
            collected: Some(Collected {
                initial,
                initial_sum,
                array,
                exchanges,
            }),
        })
    }
}

impl<C: CommGroup> Participant<C> for CoordinatorRole {
    fn identity(&self) -> ParticipantIdentity {
        self.identity
    }

    fn run<'a>(&'a mut self, comm: &'a C) -> LocalBoxFuture<'a, Result<RoleOutcome>> {
        self.execute(comm).boxed_local()
    }

    fn finish(&mut self) {
        self.enter(CoordinatorState::Report);
        self.enter(CoordinatorState::Done);
    }
}

pub struct WorkerRole {
    identity: ParticipantIdentity,
    partition: Partition,
    config: RunConfig,
    state: WorkerState,
}

impl WorkerRole {
    pub fn new(identity: ParticipantIdentity, partition: Partition, config: RunConfig) -> Self {
        WorkerRole {
            identity,
            partition,
            config,
            state: WorkerState::Init,
        }
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    fn enter(&mut self, state: WorkerState) {
        debug!(rank = self.identity.rank, from = %self.state, to = %state, "worker state");
        self.state = state;
    }

    async fn execute<C: CommGroup>(&mut self, comm: &C) -> Result<RoleOutcome> {
        let rank = self.identity.rank;
        let channel = ChunkChannel::new(comm);

        self.enter(WorkerState::Receive);
        let mut chunk = channel
            .recv_chunk(COORDINATOR, self.partition.chunk_size(), self.partition.len())
            .await?;
        if self.config.trace_chunks {
            debug!(rank, offset = chunk.offset, values = ?chunk.values, "chunk before update");
        }

        self.enter(WorkerState::Compute);
        let local_sum = transform::apply(chunk.offset, &mut chunk.values);
        if self.config.trace_chunks {
            debug!(rank, offset = chunk.offset, values = ?chunk.values, "chunk after update");
        }
        info!(rank, local_sum, "local sum");

        self.enter(WorkerState::Send);
        channel.send_chunk(COORDINATOR, &chunk).await?;

        self.enter(WorkerState::Reduce);
        Ok(RoleOutcome {
            local_sum,
            collected: None,
        })
    }
}

impl<C: CommGroup> Participant<C> for WorkerRole {
    fn identity(&self) -> ParticipantIdentity {
        self.identity
    }

    fn run<'a>(&'a mut self, comm: &'a C) -> LocalBoxFuture<'a, Result<RoleOutcome>> {
        self.execute(comm).boxed_local()
    }

    fn finish(&mut self) {
        self.enter(WorkerState::Done);
    }
}

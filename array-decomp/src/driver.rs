//! Runs one participant end to end: precondition check, role, reduction,
//! report.
use crate::reduce::reduce_sum;
use crate::role::{self, ParticipantIdentity, COORDINATOR};
use crate::{CommGroup, Error, LocalCommGroup, Partition, Report, Result, RunConfig};
use futures::executor;
use std::thread;
use tracing::{error, info};

/// What one participant ends the run with.
#[derive(Debug, Clone)]
pub struct Outcome {
    pub identity: ParticipantIdentity,
    pub local_sum: f64,
    /// Only the coordinator observes the reduced sum.
    pub global_sum: Option<f64>,
    pub report: Option<Report>,
}

/// Run the whole protocol for the participant behind `comm`.
///
/// The divisibility check happens before any message is exchanged, and every
/// participant computes the same verdict from the same array length and group
/// size, so a bad configuration fails everywhere without anyone blocking on a
/// peer.
pub async fn run_participant<C: CommGroup + 'static>(
    comm: &C,
    config: &RunConfig,
) -> Result<Outcome> {
    let identity = ParticipantIdentity::of(comm);
    info!(rank = identity.rank, size = identity.size, "participant started");

    let partition = Partition::new(config.array_len, identity.size).map_err(|err| {
        error!(rank = identity.rank, %err, "refusing to start");
        err
    })?;

    let mut participant = role::select::<C>(identity, partition, config.clone());
    let computed = participant.run(comm).await?;

    // Every rank takes part, whatever its role.
    let global_sum = reduce_sum(comm, computed.local_sum, COORDINATOR).await?;
    participant.finish();

    let report = match (computed.collected, global_sum) {
        (Some(collected), Some(global_sum)) => {
            info!(rank = identity.rank, global_sum, "final sum");
            Some(Report::new(
                collected,
                computed.local_sum,
                global_sum,
                &partition,
                config,
            ))
        }
        _ => None,
    };

    Ok(Outcome {
        identity,
        local_sum: computed.local_sum,
        global_sum,
        report,
    })
}

/// Run `participants` ranks on threads of this process, one per rank.
///
/// Results are returned in rank order. An empty group has no rank to report
/// the configuration error, so it comes back as the single result.
pub fn run_local(config: &RunConfig, participants: u32) -> Vec<Result<Outcome>> {
    if participants == 0 {
        error!(len = config.array_len, "no participants to run");
        return vec![Err(Error::Configuration {
            len: config.array_len,
            participants,
        })];
    }
    let world = LocalCommGroup::world(participants);
    thread::scope(|scope| {
        let handles: Vec<_> = world
            .into_iter()
            .map(|comm| scope.spawn(move || executor::block_on(run_participant(&comm, config))))
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic)))
            .collect()
    })
}

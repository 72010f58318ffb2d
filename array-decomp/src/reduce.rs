//! Sum reduction to a single root, built on point-to-point messages.
//!
//! Non-roots send their value to the root and then wait for a release
//! message, so no participant leaves the reduction before the root holds all
//! contributions. A participant that never arrives leaves the others
//! suspended unless the transport reports its departure.
use crate::{CommGroup, Error, Result};
use tracing::debug;

/// Tag carrying a participant's contribution to the root.
pub const REDUCE_TAG: u32 = 32766;
/// Tag carrying the root's release to every contributor.
pub const RELEASE_TAG: u32 = 32767;

/// Sum one value from every rank of `comm` at `root`.
///
/// Must be called exactly once by every rank. Returns `Some(total)` on the
/// root and `None` everywhere else. The root adds contributions in rank
/// order, so the total does not depend on arrival order.
pub async fn reduce_sum<C: CommGroup>(comm: &C, value: f64, root: u32) -> Result<Option<f64>> {
    let rank = comm.rank();
    let size = comm.size();
    if root >= size {
        return Err(Error::transport(root, REDUCE_TAG, "reduction root outside the group"));
    }

    if rank != root {
        comm.send(&value, root, REDUCE_TAG).await?;
        comm.recv::<()>(root, RELEASE_TAG).await?;
        debug!(rank, root, value, "contributed to reduction");
        return Ok(None);
    }

    let mut total = 0.0;
    for peer in 0..size {
        total += if peer == root {
            value
        } else {
            comm.recv::<f64>(peer, REDUCE_TAG)
                .await
                .map_err(|err| match err {
                    Error::Transport { peer, .. } => Error::Reduction { rank: peer },
                    other => other,
                })?
        };
    }
    for peer in (0..size).filter(|&peer| peer != root) {
        comm.send(&(), peer, RELEASE_TAG).await?;
    }
    debug!(rank, total, "reduction complete");
    Ok(Some(total))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LocalCommGroup;
    use futures::executor::block_on;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;
    use std::time::Duration;

    fn reduce_on_threads(values: &[f64], root: u32) -> Vec<Result<Option<f64>>> {
        let world = LocalCommGroup::world(values.len() as u32);
        thread::scope(|scope| {
            let handles: Vec<_> = world
                .into_iter()
                .zip(values)
                .map(|(comm, &value)| scope.spawn(move || block_on(reduce_sum(&comm, value, root))))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        })
    }

    #[test]
    fn only_root_sees_the_sum() {
        let results = reduce_on_threads(&[6.0, 27.0, 45.0, 66.0], 0);
        assert_eq!(results[0].as_ref().unwrap(), &Some(144.0));
        for result in &results[1..] {
            assert_eq!(result.as_ref().unwrap(), &None);
        }
    }

    #[test]
    fn early_contributor_waits_for_late_one() {
        let mut world = LocalCommGroup::world(3);
        let late = world.pop().unwrap();
        let early = world.pop().unwrap();
        let root = world.pop().unwrap();
        let late_arrived = AtomicBool::new(false);

        thread::scope(|scope| {
            let late_arrived = &late_arrived;
            let root = scope.spawn(move || block_on(reduce_sum(&root, 1.0, 0)));
            let late = scope.spawn(move || {
                thread::sleep(Duration::from_millis(100));
                late_arrived.store(true, Ordering::SeqCst);
                block_on(reduce_sum(&late, 3.0, 0))
            });

            let early_result = block_on(reduce_sum(&early, 2.0, 0)).unwrap();
            // Released only after the late contribution reached the root.
            assert!(late_arrived.load(Ordering::SeqCst));
            assert_eq!(early_result, None);

            assert_eq!(root.join().unwrap().unwrap(), Some(6.0));
            assert_eq!(late.join().unwrap().unwrap(), None);
        });
    }

    #[test]
    fn non_zero_root() {
        let results = reduce_on_threads(&[1.0, 2.0, 3.0], 2);
        assert_eq!(results[2].as_ref().unwrap(), &Some(6.0));
        assert_eq!(results[0].as_ref().unwrap(), &None);
    }

    #[test]
    fn single_participant_sends_nothing() {
        let world = LocalCommGroup::world(1);
        assert_eq!(block_on(reduce_sum(&world[0], 4.5, 0)).unwrap(), Some(4.5));
        assert_eq!(world[0].messages_sent(), 0);
    }

    #[test]
    fn missing_contributor() {
        let mut world = LocalCommGroup::world(2);
        drop(world.pop());
        let err = block_on(reduce_sum(&world[0], 1.0, 0)).unwrap_err();
        assert!(matches!(err, Error::Reduction { rank: 1 }));
    }

    #[test]
    fn root_outside_group() {
        let world = LocalCommGroup::world(2);
        assert!(block_on(reduce_sum(&world[0], 1.0, 2)).is_err());
    }
}

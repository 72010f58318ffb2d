//! In-process implementation of CommGroup.
//!
//! Every rank is a `LocalCommGroup` handle, normally moved onto its own
//! thread. Messages travel over one unbounded lane per (source, dest, tag),
//! so a receive only ever sees messages sent with its own tag, in send order.
use crate::{CommFuture, CommGroup, DataType, Error};
use futures::channel::mpsc::{self, UnboundedReceiver, UnboundedSender};
use futures::lock::Mutex as AsyncMutex;
use futures::StreamExt;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, error};

/// (source, dest, tag)
type LaneKey = (u32, u32, u32);

struct Lane {
    tx: UnboundedSender<Vec<u8>>,
    rx: AsyncMutex<UnboundedReceiver<Vec<u8>>>,
}

impl Lane {
    fn open() -> Self {
        let (tx, rx) = mpsc::unbounded();
        Lane {
            tx,
            rx: AsyncMutex::new(rx),
        }
    }
}

#[derive(Default)]
struct Switchboard {
    lanes: HashMap<LaneKey, Arc<Lane>>,
    departed: HashSet<u32>,
}

impl Switchboard {
    fn lane(&mut self, key: LaneKey) -> Arc<Lane> {
        let source_departed = self.departed.contains(&key.0);
        let lane = self.lanes.entry(key).or_insert_with(|| {
            let lane = Lane::open();
            if source_departed {
                lane.tx.close_channel();
            }
            Arc::new(lane)
        });
        Arc::clone(lane)
    }
}

struct World {
    size: u32,
    board: Mutex<Switchboard>,
    delivered: AtomicUsize,
}

impl World {
    fn board(&self) -> MutexGuard<'_, Switchboard> {
        self.board.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub struct LocalCommGroup {
    rank: u32,
    world: Arc<World>,
}

impl LocalCommGroup {
    /// Create the handles of a `size`-rank group, in rank order.
    pub fn world(size: u32) -> Vec<LocalCommGroup> {
        let world = Arc::new(World {
            size,
            board: Mutex::new(Switchboard::default()),
            delivered: AtomicUsize::new(0),
        });
        (0..size)
            .map(|rank| LocalCommGroup {
                rank,
                world: Arc::clone(&world),
            })
            .collect()
    }

    /// Number of messages sent so far by all ranks of the group.
    pub fn messages_sent(&self) -> usize {
        self.world.delivered.load(Ordering::SeqCst)
    }
}

impl Drop for LocalCommGroup {
    /// A dropped rank can no longer send, so everything it has not sent yet
    /// will never arrive: close its outgoing lanes so blocked receivers fail
    /// once the already queued messages are drained.
    fn drop(&mut self) {
        let mut board = self.world.board();
        board.departed.insert(self.rank);
        for ((source, _, _), lane) in board.lanes.iter() {
            if *source == self.rank {
                lane.tx.close_channel();
            }
        }
        debug!(rank = self.rank, "local rank departed");
    }
}

impl CommGroup for LocalCommGroup {
    fn rank(&self) -> u32 {
        self.rank
    }

    fn size(&self) -> u32 {
        self.world.size
    }

    fn send<T: DataType>(&self, data: &T, dest: u32, tag: u32) -> CommFuture<()> {
        let buffer = bincode::serialize(data);
        let world = Arc::clone(&self.world);
        let rank = self.rank;
        Box::into_pin(Box::new(async move {
            let buffer = buffer?;
            if dest >= world.size {
                return Err(Error::transport(dest, tag, "no such rank"));
            }
            let lane = {
                let mut board = world.board();
                if board.departed.contains(&dest) {
                    return Err(Error::transport(dest, tag, "peer has departed"));
                }
                board.lane((rank, dest, tag))
            };
            lane.tx
                .unbounded_send(buffer)
                .map_err(|_| Error::transport(dest, tag, "lane closed"))?;
            world.delivered.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }))
    }

    fn recv<T: DataType>(&self, source: u32, tag: u32) -> CommFuture<T> {
        let world = Arc::clone(&self.world);
        let rank = self.rank;
        Box::into_pin(Box::new(async move {
            if source >= world.size {
                return Err(Error::transport(source, tag, "no such rank"));
            }
            let lane = world.board().lane((source, rank, tag));
            let buffer = lane
                .rx
                .lock()
                .await
                .next()
                .await
                .ok_or_else(|| Error::transport(source, tag, "peer departed before sending"))?;
            Ok(bincode::deserialize(&buffer[..])?)
        }))
    }

    fn abort(&self, code: i32) -> ! {
        error!(rank = self.rank, code, "aborting local group");
        std::process::exit(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;
    use std::thread;

    #[test]
    fn ranks_and_size() {
        let world = LocalCommGroup::world(3);
        let ranks: Vec<u32> = world.iter().map(|c| c.rank()).collect();
        assert_eq!(ranks, vec![0, 1, 2]);
        assert!(world.iter().all(|c| c.size() == 3));
    }

    #[test]
    fn tags_do_not_mix() {
        let world = LocalCommGroup::world(2);
        block_on(async {
            world[0].send(&vec![1.5f64, 2.5], 1, 2).await.unwrap();
            world[0].send(&7u64, 1, 1).await.unwrap();

            // The tag 1 message was sent second but is received first.
            let offset: u64 = world[1].recv(0, 1).await.unwrap();
            let values: Vec<f64> = world[1].recv(0, 2).await.unwrap();
            assert_eq!(offset, 7);
            assert_eq!(values, vec![1.5, 2.5]);
        });
        assert_eq!(world[0].messages_sent(), 2);
    }

    #[test]
    fn same_tag_keeps_send_order() {
        let world = LocalCommGroup::world(2);
        block_on(async {
            for i in 0..4u32 {
                world[1].send(&i, 0, 9).await.unwrap();
            }
            for i in 0..4u32 {
                assert_eq!(world[0].recv::<u32>(1, 9).await.unwrap(), i);
            }
        });
    }

    #[test]
    fn blocking_receive_across_threads() {
        let mut world = LocalCommGroup::world(2);
        let second = world.pop().unwrap();
        let first = world.pop().unwrap();

        let echo = thread::spawn(move || {
            block_on(async {
                let value: f64 = second.recv(0, 3).await.unwrap();
                second.send(&(value * 2.0), 0, 4).await.unwrap();
            })
        });
        let reply: f64 = block_on(async {
            first.send(&21.0f64, 1, 3).await.unwrap();
            first.recv(1, 4).await.unwrap()
        });
        echo.join().unwrap();
        assert_eq!(reply, 42.0);
    }

    #[test]
    fn departed_peer_fails_receive() {
        let mut world = LocalCommGroup::world(2);
        let gone = world.pop().unwrap();
        block_on(gone.send(&1u32, 0, 5)).unwrap();
        drop(gone);

        block_on(async {
            // Queued before departure, still delivered.
            assert_eq!(world[0].recv::<u32>(1, 5).await.unwrap(), 1);
            let err = world[0].recv::<u32>(1, 5).await.unwrap_err();
            assert!(matches!(err, Error::Transport { peer: 1, tag: 5, .. }));
            // A lane first touched after departure fails too.
            assert!(world[0].recv::<u32>(1, 6).await.is_err());
            assert!(world[0].send(&1u32, 1, 5).await.is_err());
        });
    }

    #[test]
    fn mistyped_payload_is_a_codec_error() {
        let world = LocalCommGroup::world(2);
        block_on(async {
            world[0].send(&1u8, 1, 0).await.unwrap();
            let err = world[1].recv::<Vec<f64>>(0, 0).await.unwrap_err();
            assert!(matches!(err, Error::Codec(_)));
        });
    }

    #[test]
    fn unknown_rank() {
        let world = LocalCommGroup::world(1);
        assert!(block_on(world[0].send(&1u8, 3, 0)).is_err());
        assert!(block_on(world[0].recv::<u8>(3, 0)).is_err());
    }
}

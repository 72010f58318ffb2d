//! MPI-based implementation of CommGroup.
use crate::{CommFuture, CommGroup, DataType, Error, Result};
use lazy_static::lazy_static;
use mpi_sys::{
    MPI_Abort, MPI_Comm, MPI_Comm_rank, MPI_Comm_size, MPI_Finalize, MPI_Get_count,
    MPI_Init_thread, MPI_Iprobe, MPI_Irecv, MPI_Isend, MPI_Request, MPI_Test, RSMPI_COMM_WORLD,
    RSMPI_STATUS_IGNORE, RSMPI_THREAD_MULTIPLE, RSMPI_UINT8_T,
};
use std::mem::MaybeUninit;
use std::os::raw::c_int;
use std::sync::{Mutex, PoisonError};
use tracing::{debug, error};

lazy_static! {
    static ref MPI_INIT_LOCK: Mutex<i32> = Mutex::new(0);
}

/// Initialize MPI and return the world communicator.
///
/// Fails if MPI was already initialized by this process.
pub fn init_standard_mpi() -> Result<MpiCommGroup> {
    let mut init_lock = MPI_INIT_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
    if *init_lock != 0 {
        return Err(Error::AlreadyInitialized);
    }
    unsafe {
        let mut provided: c_int = 0;
        check(MPI_Init_thread(
            std::ptr::null_mut(),
            std::ptr::null_mut(),
            RSMPI_THREAD_MULTIPLE,
            &mut provided,
        ))?;
        *init_lock = 1;

        let comm = RSMPI_COMM_WORLD;
        let mut rank = 0;
        check(MPI_Comm_rank(comm, &mut rank))?;
        let mut size = 0;
        check(MPI_Comm_size(comm, &mut size))?;
        debug!(rank, size, provided, "MPI initialized");

        Ok(MpiCommGroup {
            comm,
            rank: rank as u32,
            size: size as u32,
        })
    }
}

impl Drop for MpiCommGroup {
    fn drop(&mut self) {
        unsafe {
            MPI_Finalize();
        }
        let mut init_lock = MPI_INIT_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
        *init_lock = 0;
    }
}

pub struct MpiCommGroup {
    comm: MPI_Comm,
    rank: u32,
    size: u32,
}

impl CommGroup for MpiCommGroup {
    fn rank(&self) -> u32 {
        self.rank
    }

    fn size(&self) -> u32 {
        self.size
    }

    fn send<T: DataType>(&self, data: &T, dest: u32, tag: u32) -> CommFuture<()> {
        let buffer = bincode::serialize(data);
        let comm = self.comm;
        Box::into_pin(Box::new(async move {
            internal_send(comm, &buffer?, dest, tag).await
        }))
    }

    fn recv<T: DataType>(&self, source: u32, tag: u32) -> CommFuture<T> {
        let comm = self.comm;
        Box::into_pin(Box::new(async move {
            let buffer = internal_recv(comm, source, tag).await?;
            bincode::deserialize(&buffer[..]).map_err(Error::from)
        }))
    }

    fn abort(&self, code: i32) -> ! {
        error!(rank = self.rank, code, "aborting MPI job");
        unsafe {
            MPI_Abort(self.comm, code);
        }
        // MPI_Abort should not return; make sure this process goes down anyway.
        std::process::exit(code)
    }
}

fn check(code: c_int) -> Result<()> {
    if code == 0 {
        Ok(())
    } else {
        Err(Error::Mpi { code })
    }
}

fn rank_and_tag(peer: u32, tag: u32) -> Result<(c_int, c_int)> {
    let rank = c_int::try_from(peer).map_err(|_| Error::transport(peer, tag, "rank out of range"))?;
    let ctag = c_int::try_from(tag).map_err(|_| Error::transport(peer, tag, "tag out of range"))?;
    Ok((rank, ctag))
}

async fn internal_send(comm: MPI_Comm, buffer: &[u8], dest: u32, tag: u32) -> Result<()> {
    let (rank, ctag) = rank_and_tag(dest, tag)?;
    let count = c_int::try_from(buffer.len())
        .map_err(|_| Error::transport(dest, tag, "payload too large"))?;
    unsafe {
        let mut req = MaybeUninit::uninit();
        check(MPI_Isend(
            buffer.as_ptr() as *const _,
            count,
            RSMPI_UINT8_T,
            rank,
            ctag,
            comm,
            req.as_mut_ptr(),
        ))?;
        let mut req = req.assume_init();

        while !test_request(&mut req).await? {}
    }
    Ok(())
}

async fn internal_recv(comm: MPI_Comm, source: u32, tag: u32) -> Result<Vec<u8>> {
    let (rank, ctag) = rank_and_tag(source, tag)?;
    unsafe {
        let mut buffer = vec![];

        loop {
            if let Some(count) = probe_recv(comm, rank, ctag).await? {
                buffer.resize(count, 0);
                break;
            }
        }

        let mut req = MaybeUninit::uninit();
        check(MPI_Irecv(
            buffer.as_mut_ptr() as *mut _,
            buffer.len() as c_int,
            RSMPI_UINT8_T,
            rank,
            ctag,
            comm,
            req.as_mut_ptr(),
        ))?;
        let mut req = req.assume_init();

        while !test_request(&mut req).await? {}
        Ok(buffer)
    }
}

/// Probe for a receive message.
async unsafe fn probe_recv(comm: MPI_Comm, source: c_int, tag: c_int) -> Result<Option<usize>> {
    let mut status = MaybeUninit::uninit();
    let mut flag = 0;
    check(MPI_Iprobe(source, tag, comm, &mut flag, status.as_mut_ptr()))?;
    if flag != 0 {
        let status = status.assume_init();
        let mut count = 0;
        check(MPI_Get_count(&status, RSMPI_UINT8_T, &mut count))?;
        // MPI_UNDEFINED comes back negative.
        let count = usize::try_from(count).map_err(|_| {
            Error::transport(source as u32, tag as u32, format!("undefined message size {}", count))
        })?;
        Ok(Some(count))
    } else {
        Ok(None)
    }
}

/// Test if the request is complete.
async unsafe fn test_request(req: &mut MPI_Request) -> Result<bool> {
    let mut flag = 0;
    check(MPI_Test(req, &mut flag, RSMPI_STATUS_IGNORE))?;
    Ok(flag != 0)
}

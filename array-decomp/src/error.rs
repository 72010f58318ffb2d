//! Error types for array-decomp

use thiserror::Error;

/// Result type for decomposition runs
pub type Result<T> = std::result::Result<T, Error>;

/// Every variant is fatal for the run; nothing is retried or salvaged.
#[derive(Error, Debug)]
pub enum Error {
    /// The participant count does not split the array into equal,
    /// non-empty chunks.
    #[error("array of {len} elements cannot be split evenly across {participants} participants")]
    Configuration { len: usize, participants: u32 },

    /// A point-to-point send or receive failed.
    #[error("transport failure with rank {peer} on tag {tag}: {reason}")]
    Transport { peer: u32, tag: u32, reason: String },

    /// A payload could not be encoded or decoded.
    #[error("malformed payload: {0}")]
    Codec(#[from] bincode::Error),

    /// A participant never reached the collective reduction.
    #[error("rank {rank} did not reach the collective reduction")]
    Reduction { rank: u32 },

    /// MPI has already been initialized in this process
    #[error("MPI has already been initialized")]
    AlreadyInitialized,

    /// MPI call returned a non-success code
    #[error("MPI error (code {code})")]
    Mpi { code: i32 },
}

impl Error {
    pub(crate) fn transport(peer: u32, tag: u32, reason: impl Into<String>) -> Self {
        Error::Transport {
            peer,
            tag,
            reason: reason.into(),
        }
    }

    /// Whether this error belongs to the transport class (including codec
    /// failures on the wire).
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport { .. } | Error::Codec(_) | Error::Mpi { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_message_names_both_counts() {
        let err = Error::Configuration {
            len: 12,
            participants: 5,
        };
        let msg = err.to_string();
        assert!(msg.contains("12"));
        assert!(msg.contains("5 participants"));
    }

    #[test]
    fn transport_class() {
        assert!(Error::transport(1, 2, "peer gone").is_transport());
        assert!(Error::Mpi { code: 3 }.is_transport());
        assert!(!Error::Reduction { rank: 1 }.is_transport());
        assert!(!Error::AlreadyInitialized.is_transport());
    }
}

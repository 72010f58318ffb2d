//! Run parameters shared by every participant.

/// Array length used when none is given.
pub const DEFAULT_ARRAY_LEN: usize = 12;
/// Values per chunk shown in the report samples.
pub const DEFAULT_SAMPLE_WIDTH: usize = 5;

/// Every participant must be started with the same configuration; the
/// partition is derived from it independently on each rank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    /// Number of elements in the global array.
    pub array_len: usize,
    /// How many leading values of each chunk the report samples.
    pub sample_width: usize,
    /// Log chunk contents before and after the transform at debug level.
    pub trace_chunks: bool,
    /// Include the whole final array in the report.
    pub show_full_array: bool,
}

impl RunConfig {
    pub fn new(array_len: usize) -> Self {
        RunConfig {
            array_len,
            ..RunConfig::default()
        }
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            array_len: DEFAULT_ARRAY_LEN,
            sample_width: DEFAULT_SAMPLE_WIDTH,
            trace_chunks: false,
            show_full_array: true,
        }
    }
}

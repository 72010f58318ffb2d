//! Final state of a run as seen by the coordinator.
use crate::role::{Collected, Exchange};
use crate::{Partition, RunConfig};
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    /// Array contents before distribution.
    pub initial: Vec<f64>,
    /// Plain sum of `initial`. Diagnostic only.
    pub initial_sum: f64,
    /// The coordinator's own local aggregate.
    pub coordinator_sum: f64,
    pub final_array: Vec<f64>,
    /// Result of the collective reduction.
    pub global_sum: f64,
    pub exchanges: Vec<Exchange>,
    chunk_size: usize,
    sample_width: usize,
    show_full_array: bool,
}

impl Report {
    pub(crate) fn new(
        collected: Collected,
        coordinator_sum: f64,
        global_sum: f64,
        partition: &Partition,
        config: &RunConfig,
    ) -> Self {
        Report {
            initial: collected.initial,
            initial_sum: collected.initial_sum,
            coordinator_sum,
            final_array: collected.array.into_vec(),
            global_sum,
            exchanges: collected.exchanges,
            chunk_size: partition.chunk_size(),
            sample_width: config.sample_width,
            show_full_array: config.show_full_array,
        }
    }

    /// Leading values of every chunk, in rank order.
    pub fn samples(&self) -> impl Iterator<Item = &[f64]> + '_ {
        let width = self.sample_width.min(self.chunk_size);
        self.final_array
            .chunks(self.chunk_size)
            .map(move |chunk| &chunk[..width])
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Initial array = (")?;
        for value in &self.initial {
            write!(f, " {:4.0}", value)?;
        }
        writeln!(f, " )")?;
        writeln!(f, "Initialized array sum = {:.1}", self.initial_sum)?;

        writeln!(f, "Sample results:")?;
        for (rank, sample) in self.samples().enumerate() {
            write!(f, "  chunk({}) =", rank)?;
            for value in sample {
                write!(f, "  {:5.1}", value)?;
            }
            writeln!(f)?;
        }

        if self.show_full_array {
            write!(f, "Final array = (")?;
            for value in &self.final_array {
                write!(f, " {:.1}", value)?;
            }
            writeln!(f, " )")?;
        }
        write!(f, "Final sum = {:.1}", self.global_sum)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GlobalArray;

    fn report(len: usize, parts: u32, config: RunConfig) -> Report {
        let partition = Partition::new(len, parts).unwrap();
        let initial = GlobalArray::initialized(len);
        let mut array = initial.clone();
        crate::transform::apply(0, array.slice_mut(0..len));
        let global_sum = array.naive_sum();
        let collected = Collected {
            initial: initial.as_slice().to_vec(),
            initial_sum: initial.naive_sum(),
            array,
            exchanges: Vec::new(),
        };
        Report::new(collected, 0.0, global_sum, &partition, &config)
    }

    #[test]
    fn samples_are_capped_by_width() {
        let r = report(12, 2, RunConfig { sample_width: 2, ..RunConfig::new(12) });
        let samples: Vec<&[f64]> = r.samples().collect();
        assert_eq!(samples, vec![&[1.0, 3.0][..], &[13.0, 15.0][..]]);
    }

    #[test]
    fn samples_are_capped_by_chunk_size() {
        let r = report(8, 4, RunConfig::new(8));
        let samples: Vec<&[f64]> = r.samples().collect();
        assert_eq!(samples.len(), 4);
        assert!(samples.iter().all(|s| s.len() == 2));
        assert_eq!(samples[3], &[13.0, 15.0]);
    }

    #[test]
    fn display_ends_with_final_sum() {
        let text = report(8, 4, RunConfig::new(8)).to_string();
        assert!(text.contains("Initialized array sum = 36.0"));
        assert!(text.contains("chunk(3) ="));
        assert!(text.contains("Final array = ("));
        assert!(text.ends_with("Final sum = 64.0"));
    }

    #[test]
    fn full_array_can_be_hidden() {
        let config = RunConfig {
            show_full_array: false,
            ..RunConfig::new(8)
        };
        assert!(!report(8, 4, config).to_string().contains("Final array"));
    }
}

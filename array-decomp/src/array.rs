//! The coordinator's array arena and the chunks cut from it.
use std::ops::Range;

/// A contiguous piece of the global array, detached from the arena.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub offset: usize,
    pub values: Vec<f64>,
}

impl Chunk {
    pub fn new(offset: usize, values: Vec<f64>) -> Self {
        Chunk { offset, values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// One past the last global index covered by this chunk.
    pub fn end(&self) -> usize {
        self.offset + self.values.len()
    }
}

/// Single owned buffer holding the whole array. Only the coordinator ever
/// holds one; workers only see copies of their chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalArray {
    values: Vec<f64>,
}

impl GlobalArray {
    /// Array of `len` elements where element `i` holds `i + 1`.
    pub fn initialized(len: usize) -> Self {
        GlobalArray {
            values: (0..len).map(|i| (i + 1) as f64).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub fn slice_mut(&mut self, range: Range<usize>) -> &mut [f64] {
        &mut self.values[range]
    }

    /// Plain left-to-right sum of the current contents.
    pub fn naive_sum(&self) -> f64 {
        self.values.iter().sum()
    }

    /// Copy `range` out of the arena.
    pub fn copy_chunk(&self, range: Range<usize>) -> Chunk {
        Chunk::new(range.start, self.values[range].to_vec())
    }

    /// Overwrite the arena at the chunk's offset with its values.
    ///
    /// # Panics
    ///
    /// Panics if the chunk extends past the end of the array.
    pub fn write_back(&mut self, chunk: &Chunk) {
        self.values[chunk.offset..chunk.end()].copy_from_slice(&chunk.values);
    }

    pub fn into_vec(self) -> Vec<f64> {
        self.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_values_are_one_based() {
        let array = GlobalArray::initialized(4);
        assert_eq!(array.as_slice(), &[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(array.naive_sum(), 10.0);
        assert!(!array.is_empty());
        assert!(GlobalArray::initialized(0).is_empty());
    }

    #[test]
    fn copy_and_write_back() {
        let mut array = GlobalArray::initialized(6);
        let mut chunk = array.copy_chunk(2..4);
        assert_eq!(chunk, Chunk::new(2, vec![3.0, 4.0]));

        chunk.values[0] = 30.0;
        // The arena is untouched until the chunk is written back.
        assert_eq!(array.as_slice()[2], 3.0);

        array.write_back(&chunk);
        assert_eq!(array.as_slice(), &[1.0, 2.0, 30.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    #[should_panic]
    fn write_back_out_of_bounds() {
        let mut array = GlobalArray::initialized(4);
        array.write_back(&Chunk::new(3, vec![0.0, 0.0]));
    }
}

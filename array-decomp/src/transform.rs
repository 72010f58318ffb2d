//! The per-element update every participant applies to the chunk it owns.

/// Add each element's global index to it and return the sum of the updated
/// values.
///
/// `values[j]` is the element at global index `offset + j`.
pub fn apply(offset: usize, values: &mut [f64]) -> f64 {
    values
        .iter_mut()
        .enumerate()
        .map(|(j, value)| {
            *value += (offset + j) as f64;
            *value
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uses_global_index() {
        // Second chunk of [1..=12] split in four.
        let mut values = vec![4.0, 5.0, 6.0];
        let sum = apply(3, &mut values);
        assert_eq!(values, vec![7.0, 9.0, 11.0]);
        assert_eq!(sum, 27.0);
    }

    #[test]
    fn leading_chunk() {
        let mut values = vec![1.0, 2.0];
        assert_eq!(apply(0, &mut values), 4.0);
        assert_eq!(values, vec![1.0, 3.0]);
    }

    #[test]
    fn empty_slice() {
        assert_eq!(apply(7, &mut []), 0.0);
    }
}

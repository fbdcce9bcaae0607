use std::cmp;

use super::edge::EdgeID;

/// Reverses the ordering of a float value, such that we take min values from a priority queue.
/// Equal errors fall back to the edge id, keeping collapse order deterministic.
#[derive(Debug, Clone, Copy)]
pub struct QuadricError(pub cmp::Reverse<f64>, pub EdgeID);

impl PartialEq for QuadricError {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == cmp::Ordering::Equal
    }
}

impl PartialOrd for QuadricError {
    fn partial_cmp(&self, other: &Self) -> Option<cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Eq for QuadricError {}

impl Ord for QuadricError {
    fn cmp(&self, other: &Self) -> cmp::Ordering {
        // Errors are checked for NaN on creation
        other
            .error()
            .total_cmp(&self.error())
            .then_with(|| other.1.cmp(&self.1))
    }
}

impl QuadricError {
    pub fn new(error: f64, e: EdgeID) -> Self {
        QuadricError(cmp::Reverse(error), e)
    }

    pub fn error(&self) -> f64 {
        self.0 .0
    }
}

#[cfg(test)]
pub mod test {
    use super::*;

    #[test]
    fn test_smallest_error_first() {
        let mut heap = std::collections::BinaryHeap::new();
        heap.push(QuadricError::new(3.0, EdgeID(0)));
        heap.push(QuadricError::new(0.5, EdgeID(1)));
        heap.push(QuadricError::new(0.5, EdgeID(2)));
        heap.push(QuadricError::new(1.0, EdgeID(3)));

        let order: Vec<_> = std::iter::from_fn(|| heap.pop()).map(|q| q.1).collect();

        assert_eq!(order, vec![EdgeID(1), EdgeID(2), EdgeID(3), EdgeID(0)]);
    }
}

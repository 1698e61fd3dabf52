//! Splitting of the final dataset into output partitions

use std::num::NonZeroUsize;

/// Split `records` into `count` contiguous partitions
///
/// All partitions but the last hold `ceil(len / count)` records, and the last
/// one holds whatever remains. When there are too few records to go around,
/// trailing partitions come out short or empty. Records are neither reordered
/// nor duplicated.
pub fn split<T>(records: &[T], count: NonZeroUsize) -> Vec<&[T]> {
    let len = records.len();
    let factor = len.div_ceil(count.get());
    let bound = |idx: usize| idx.saturating_mul(factor).min(len);
    let mut partitions = (0..count.get() - 1)
        .map(|idx| &records[bound(idx)..bound(idx + 1)])
        .collect::<Vec<_>>();
    partitions.push(&records[bound(count.get() - 1)..]);
    log::debug!(
        "Split {len} records into partitions of sizes {:?}",
        partitions.iter().map(|p| p.len()).collect::<Vec<_>>()
    );
    partitions
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sizes(len: usize, count: usize) -> Vec<usize> {
        let records = (0..len).collect::<Vec<_>>();
        split(&records, NonZeroUsize::new(count).unwrap())
            .iter()
            .map(|p| p.len())
            .collect()
    }

    #[test]
    fn last_partition_takes_the_remainder() {
        assert_eq!(sizes(10, 4), [3, 3, 3, 1]);
        assert_eq!(sizes(12, 4), [3, 3, 3, 3]);
        assert_eq!(sizes(7, 1), [7]);
        assert_eq!(sizes(0, 4), [0, 0, 0, 0]);
    }

    #[test]
    fn small_inputs_leave_trailing_partitions_empty() {
        assert_eq!(sizes(5, 4), [2, 2, 1, 0]);
        assert_eq!(sizes(1, 3), [1, 0, 0]);
    }

    proptest! {
        #[test]
        fn partitions_cover_the_input_in_order(len in 0usize..500, count in 1usize..20) {
            let records = (0..len).collect::<Vec<_>>();
            let partitions = split(&records, NonZeroUsize::new(count).unwrap());
            prop_assert_eq!(partitions.len(), count);
            let rejoined = partitions.concat();
            prop_assert_eq!(&rejoined[..], &records[..]);

            let factor = len.div_ceil(count);
            if (count - 1) * factor <= len {
                for partition in &partitions[..count - 1] {
                    prop_assert_eq!(partition.len(), factor);
                }
                prop_assert_eq!(partitions[count - 1].len(), len - (count - 1) * factor);
            }
        }
    }
}

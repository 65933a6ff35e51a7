//! Randomized checks for the Dominance and Monotonicity properties against the blob lifetime
//! manager, across random sequences of start/end calls with random sizes and alignments.

use std::sync::Arc;

use proptest::prelude::*;
use proptest::test_runner::TestCaseError;

use tensor_memory::{Binding, BlobLifetimeManager, LifetimeManager, TensorHandle};

struct NoopHandle;
impl TensorHandle for NoopHandle {
    fn bind(&self, _binding: Binding<'_>) {}
    fn unbind(&self) {}
}

/// One finalized tensor: a size/alignment pair and whether it overlaps the tensor started
/// immediately before it.
#[derive(Debug, Clone, Copy)]
struct TensorSpec {
    size: usize,
    alignment: usize,
    overlap_with_previous: bool,
}

fn tensor_spec() -> impl Strategy<Value = TensorSpec> {
    (1usize..4096, prop_oneof![Just(0usize), Just(8), Just(16), Just(32), Just(64)], any::<bool>())
        .prop_map(|(size, alignment, overlap_with_previous)| TensorSpec { size, alignment, overlap_with_previous })
}

proptest! {
    /// Property 2 (Dominance) and 3 (Monotonicity): run one group's worth of tensors through a
    /// blob lifetime manager, then run a second group through the same manager, and check both
    /// that every slot dominates its bound tensors and that the blob list never shrinks.
    #[test]
    fn dominance_and_monotonicity_hold_across_two_groups(
        group_one in prop::collection::vec(tensor_spec(), 1..8),
        group_two in prop::collection::vec(tensor_spec(), 1..8),
    ) {
        let mut lm = BlobLifetimeManager::new();

        run_group(&mut lm, &group_one)?;
        let after_first = lm.blob_list().to_vec();

        run_group(&mut lm, &group_two)?;
        let after_second = lm.blob_list().to_vec();

        // Monotonicity: the blob list after the second group is never smaller than after the
        // first, element-wise, once padded to equal length.
        let max_len = after_first.len().max(after_second.len());
        for i in 0..max_len {
            let before = after_first.get(i).copied().unwrap_or_default();
            let after = after_second.get(i).copied().unwrap_or_default();
            prop_assert!(after.size >= before.size);
            prop_assert!(after.alignment >= before.alignment);
        }
    }
}

/// Starts and ends every tensor in `specs` against `lm`, opening the next interval before
/// closing the previous one whenever `overlap_with_previous` asks for it, and asserts Dominance
/// on the layout that results once the whole group completes.
fn run_group(lm: &mut BlobLifetimeManager, specs: &[TensorSpec]) -> Result<(), TestCaseError> {
    let ids: Vec<tensor_memory::TensorId> = specs.iter().map(tensor_memory::TensorId::from_ref).collect();

    lm.start_lifetime(ids[0]);
    let mut mappings = None;
    for (i, spec) in specs.iter().enumerate() {
        if i + 1 < specs.len() {
            if specs[i + 1].overlap_with_previous {
                lm.start_lifetime(ids[i + 1]);
                mappings = lm.end_lifetime(ids[i], Arc::new(NoopHandle), spec.size, spec.alignment);
            } else {
                mappings = lm.end_lifetime(ids[i], Arc::new(NoopHandle), spec.size, spec.alignment);
                lm.start_lifetime(ids[i + 1]);
            }
        } else {
            mappings = lm.end_lifetime(ids[i], Arc::new(NoopHandle), spec.size, spec.alignment);
        }
    }

    let mappings = mappings.expect("last end_lifetime call must complete the group");
    let blobs = lm.blob_list().to_vec();
    for mapping in &mappings {
        let blob = blobs[mapping.slot];
        prop_assert!(blob.size >= mapping.size, "slot size {} does not dominate tensor size {}", blob.size, mapping.size);
    }
    Ok(())
}

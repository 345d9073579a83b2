//! OCC execution must leave the ledger exactly as sequential execution does.

use occ_bench::{
    Executor, OccExecutor, SequentialExecutor, TxError, TxOutcome, Workload, WorkloadConfig,
    COLLECTOR_FLOAT, FEE_COLLECTOR, FEE_DENOM, TRANSFER_DENOMS,
};
use occ_executor::{BalanceStore, SchedulerConfig};

fn workload(num_accounts: usize, conflict_factor: f64, seed: u64) -> Workload {
    Workload::generate(WorkloadConfig {
        num_accounts,
        num_transactions: 120,
        transactions_per_block: 40,
        conflict_factor,
        seed,
        chain_id: 7,
    })
}

fn assert_equivalent(workload: &Workload, occ: &OccExecutor) {
    let (expected, expected_result) = SequentialExecutor::new(occ.verify_signatures)
        .execute(workload.create_store(), workload)
        .unwrap();
    let (actual, actual_result) = occ.execute(workload.create_store(), workload).unwrap();

    assert_eq!(actual.snapshot(), expected.snapshot());
    assert_eq!(actual_result.outcomes, expected_result.outcomes);
    assert_eq!(actual_result.successful, expected_result.successful);
    assert_eq!(actual_result.failed, expected_result.failed);
}

#[test]
fn test_equivalence_across_conflict_levels() {
    for conflict_factor in [0.0, 0.5, 0.9, 1.0] {
        let workload = workload(16, conflict_factor, 42);
        assert_equivalent(&workload, &OccExecutor::new(4, false));
    }
}

#[test]
fn test_equivalence_with_signature_verification() {
    let workload = workload(8, 0.75, 3);
    assert_equivalent(&workload, &OccExecutor::new(3, true));
}

#[test]
fn test_equivalence_with_invalid_signatures() {
    let mut workload = workload(8, 0.75, 4);
    // Break every seventh signature; later transfers from the same sender
    // then fail their nonce check as well.
    for tx in workload.blocks.iter_mut().flatten().step_by(7) {
        tx.amount += 1;
    }

    let occ = OccExecutor::new(4, true);
    assert_equivalent(&workload, &occ);

    let (_, result) = occ.execute(workload.create_store(), &workload).unwrap();
    assert!(result
        .outcomes
        .iter()
        .step_by(7)
        .all(|o| *o == TxOutcome::Rejected(TxError::InvalidSignature)));
}

#[test]
fn test_equivalence_for_worker_counts() {
    let workload = workload(10, 0.8, 99);
    for workers in [0, 1, 2, 8] {
        assert_equivalent(&workload, &OccExecutor::new(workers, false));
    }
}

#[test]
fn test_equivalence_with_synchronous_fallback() {
    let workload = workload(4, 1.0, 17);
    let config = SchedulerConfig::default()
        .with_workers(4)
        .with_max_iterations(2);
    let occ = OccExecutor::with_config(config, false);

    assert_equivalent(&workload, &occ);
}

#[test]
fn test_supply_and_fees() {
    let workload = workload(12, 0.6, 8);
    let before = workload.create_store().snapshot();
    let (store, result) = OccExecutor::new(4, false)
        .execute(workload.create_store(), &workload)
        .unwrap();
    let after = store.snapshot();

    for denom in TRANSFER_DENOMS {
        assert_eq!(before.total_supply(denom), after.total_supply(denom));
    }
    assert_eq!(result.total(), 120);
    assert!(store.balance(&FEE_COLLECTOR, FEE_DENOM) > COLLECTOR_FLOAT);
}

#[test]
fn test_empty_workload() {
    let workload = Workload::generate(WorkloadConfig {
        num_accounts: 5,
        num_transactions: 0,
        ..Default::default()
    });
    let (store, result) = OccExecutor::new(2, true)
        .execute(workload.create_store(), &workload)
        .unwrap();

    assert_eq!(result.total(), 0);
    assert_eq!(store.snapshot(), workload.create_store().snapshot());
}

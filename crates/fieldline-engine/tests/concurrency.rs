//! Cross-call serialization: racing commands must never double-spend
//! inventory or double-decide a step.

use fieldline_engine::{NullEventSink, Orchestrator};
use fieldline_store::{InMemoryLedgerStore, InMemoryRequestStore, LedgerStore};
use fieldline_types::{
    ActivityId, ActorId, ApprovalPolicy, Decision, DepartmentId, ErrorKind, LedgerEntry,
    LedgerKey, LineItem, RequestId, RequestStatus, ResourceId, ResourceKind, SiteId, StepStatus,
};
use std::sync::{Arc, Barrier};
use std::thread;

struct Fixture {
    orchestrator: Arc<Orchestrator>,
    ledger: Arc<InMemoryLedgerStore>,
}

fn make_fixture(policy: ApprovalPolicy) -> Fixture {
    let requests = Arc::new(InMemoryRequestStore::new());
    let ledger = Arc::new(InMemoryLedgerStore::new());
    let orchestrator = Arc::new(Orchestrator::new(
        requests,
        ledger.clone(),
        policy,
        Arc::new(NullEventSink),
    ));
    Fixture {
        orchestrator,
        ledger,
    }
}

fn chain_policy(departments: &[&str]) -> ApprovalPolicy {
    ApprovalPolicy::with_precedence(departments.iter().map(|d| DepartmentId::new(*d)).collect())
}

fn deferred_policy(departments: &[&str]) -> ApprovalPolicy {
    let mut policy = chain_policy(departments);
    policy.auto_allocate = false;
    policy
}

fn cement_key() -> LedgerKey {
    LedgerKey::new(
        ResourceKind::Material,
        ResourceId::new("M1"),
        SiteId::new("site-1"),
    )
}

fn submitted_request(fx: &Fixture, quantity: u64) -> RequestId {
    let request = fx
        .orchestrator
        .create_request(
            ActorId::new("alice"),
            ActivityId::new("act-1"),
            DepartmentId::new("site-ops"),
            SiteId::new("site-1"),
            vec![LineItem::material("M1", quantity)],
        )
        .unwrap();
    fx.orchestrator
        .submit_request_for_approval(&request.id)
        .unwrap();
    request.id
}

fn allocated_total(fx: &Fixture, id: &RequestId) -> u64 {
    fx.orchestrator
        .request_snapshot(id)
        .unwrap()
        .request
        .allocations
        .iter()
        .map(|a| a.quantity)
        .sum()
}

#[test]
fn concurrent_allocations_never_overspend() {
    // One line item wanting 10, exactly 10 available: two racing allocation
    // calls must take 10 in total, never 20.
    let fx = make_fixture(deferred_policy(&["stores"]));
    fx.ledger
        .upsert_entry(LedgerEntry::new(cement_key(), 10))
        .unwrap();
    let id = submitted_request(&fx, 10);
    fx.orchestrator
        .record_approval_decision(&id, 1, Decision::Approve, ActorId::new("bob"), None)
        .unwrap();

    let barrier = Arc::new(Barrier::new(2));
    let mut handles = Vec::new();
    for worker in 0..2 {
        let orchestrator = fx.orchestrator.clone();
        let barrier = barrier.clone();
        let id = id.clone();
        handles.push(thread::spawn(move || {
            barrier.wait();
            orchestrator.trigger_allocation(&id, ActorId::new(format!("worker-{worker}")))
        }));
    }
    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    let total = allocated_total(&fx, &id);
    assert_eq!(total, 10, "the available quantity must be taken exactly once");
    assert_eq!(fx.ledger.get(&cement_key()).unwrap().available(), 0);

    let successes = results.iter().filter(|r| r.is_ok()).count();
    assert!(successes >= 1);
    for result in &results {
        if let Err(err) = result {
            assert!(
                matches!(
                    err.kind(),
                    ErrorKind::InsufficientInventory
                        | ErrorKind::InvalidState
                        | ErrorKind::ConcurrencyConflict
                ),
                "unexpected race error: {err:?}"
            );
        }
    }
}

#[test]
fn approval_racing_manual_retry_spends_once() {
    // Auto-allocation on approval races a manual retry; whichever order the
    // store serializes them in, only 10 units may leave the ledger.
    let fx = make_fixture(chain_policy(&["stores"]));
    fx.ledger
        .upsert_entry(LedgerEntry::new(cement_key(), 10))
        .unwrap();
    let id = submitted_request(&fx, 10);

    let barrier = Arc::new(Barrier::new(2));
    let approver = {
        let orchestrator = fx.orchestrator.clone();
        let barrier = barrier.clone();
        let id = id.clone();
        thread::spawn(move || {
            barrier.wait();
            orchestrator.record_approval_decision(
                &id,
                1,
                Decision::Approve,
                ActorId::new("bob"),
                None,
            )
        })
    };
    let retrier = {
        let orchestrator = fx.orchestrator.clone();
        let barrier = barrier.clone();
        let id = id.clone();
        thread::spawn(move || {
            barrier.wait();
            orchestrator.trigger_allocation(&id, ActorId::new("storekeeper"))
        })
    };

    let approval = approver.join().unwrap();
    let retry = retrier.join().unwrap();

    // Approval itself must commit; a lost allocation race never unwinds it.
    assert!(approval.is_ok(), "approval failed: {approval:?}");
    if let Err(err) = &retry {
        assert!(matches!(
            err.kind(),
            ErrorKind::InvalidState
                | ErrorKind::InsufficientInventory
                | ErrorKind::ConcurrencyConflict
        ));
    }

    assert_eq!(allocated_total(&fx, &id), 10);
    assert_eq!(fx.ledger.get(&cement_key()).unwrap().available(), 0);
    let status = fx.orchestrator.request_snapshot(&id).unwrap().request.status;
    assert_eq!(status, RequestStatus::Allocated);
}

#[test]
fn concurrent_decisions_on_one_step_decide_it_once() {
    let fx = make_fixture(chain_policy(&["stores", "finance"]));
    let id = submitted_request(&fx, 5);

    let barrier = Arc::new(Barrier::new(2));
    let mut handles = Vec::new();
    for approver in ["bob", "carol"] {
        let orchestrator = fx.orchestrator.clone();
        let barrier = barrier.clone();
        let id = id.clone();
        handles.push(thread::spawn(move || {
            barrier.wait();
            orchestrator.record_approval_decision(
                &id,
                1,
                Decision::Approve,
                ActorId::new(approver),
                None,
            )
        }));
    }
    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    let successes = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1, "both racers decided the same step");
    for result in &results {
        if let Err(err) = result {
            assert!(matches!(
                err.kind(),
                ErrorKind::ConcurrencyConflict | ErrorKind::AlreadyDecided
            ));
        }
    }

    let snapshot = fx.orchestrator.request_snapshot(&id).unwrap();
    assert_eq!(snapshot.request.step(1).unwrap().status, StepStatus::Approved);
    assert_eq!(snapshot.current_step_order, Some(2));
    // Only the winner's decision is on the record.
    let decided_by = snapshot.request.step(1).unwrap().decided_by.clone().unwrap();
    assert!(decided_by.0 == "bob" || decided_by.0 == "carol");
}

#[test]
fn cancel_racing_a_decision_resolves_deterministically() {
    let fx = make_fixture(chain_policy(&["stores", "finance"]));
    let id = submitted_request(&fx, 5);

    let barrier = Arc::new(Barrier::new(2));
    let decider = {
        let orchestrator = fx.orchestrator.clone();
        let barrier = barrier.clone();
        let id = id.clone();
        thread::spawn(move || {
            barrier.wait();
            orchestrator.record_approval_decision(
                &id,
                1,
                Decision::Approve,
                ActorId::new("bob"),
                None,
            )
        })
    };
    let canceller = {
        let orchestrator = fx.orchestrator.clone();
        let barrier = barrier.clone();
        let id = id.clone();
        thread::spawn(move || {
            barrier.wait();
            orchestrator.cancel_request(&id, ActorId::new("alice"))
        })
    };

    let decision = decider.join().unwrap();
    let cancel = canceller.join().unwrap();

    // Whichever commits first wins; a loser only ever sees a conflict or an
    // invalid-state error, never a torn aggregate.
    if let Err(err) = &decision {
        assert!(matches!(
            err.kind(),
            ErrorKind::ConcurrencyConflict | ErrorKind::InvalidState
        ));
    }
    if let Err(err) = &cancel {
        assert!(matches!(
            err.kind(),
            ErrorKind::ConcurrencyConflict | ErrorKind::InvalidState
        ));
    }

    let snapshot = fx.orchestrator.request_snapshot(&id).unwrap();
    match snapshot.request.status {
        RequestStatus::Cancelled => {
            // No step may be left pending after a cancel commits.
            assert!(snapshot
                .request
                .steps
                .iter()
                .all(|s| s.status != StepStatus::Pending));
        }
        RequestStatus::PendingApproval => {
            // Decision won and the cancel lost its version race.
            assert!(cancel.is_err());
            assert_eq!(snapshot.request.step(1).unwrap().status, StepStatus::Approved);
        }
        other => panic!("unexpected status after race: {other:?}"),
    }
}

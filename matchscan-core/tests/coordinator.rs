#[path = "support/mod.rs"]
mod support;

use std::sync::Arc;

use chrono::TimeDelta;
use matchscan_contracts::prelude::*;
use matchscan_core::scan::{SCAN_TASK_TYPE, scan_task_id};
use matchscan_core::{InitiateScanResult, ScanError, ScanNotification};
use matchscan_model::{CollectionId, ScanTraits, ScanType};
use support::{Harness, LABEL, MemoryTask, event_start, win_at};

#[tokio::test(start_paused = true)]
async fn initiating_creates_the_task_and_departs() {
    let harness = Harness::new(event_start() - TimeDelta::hours(1), &[&["alice"]]);
    let coordinator = harness.coordinator();

    let first = coordinator
        .initiate_scan(ScanType::Official, &harness.event)
        .await
        .unwrap();
    let second = coordinator
        .initiate_scan(ScanType::Official, &harness.event)
        .await
        .unwrap();

    assert_eq!(first, InitiateScanResult::ScanWasStarted);
    assert_eq!(second, InitiateScanResult::ScanWasAlreadyRunning);
    assert_eq!(harness.tasks.requests(), 1);

    let task = harness.task("Officialspring-ladder");
    assert_eq!(task.task_type_id(), SCAN_TASK_TYPE);
    let traits = ScanTraits::parse_param_string(task.param_string()).unwrap();
    assert_eq!(traits.event_id, harness.event.id);
    assert_eq!(traits.result_collection, CollectionId::official());
    assert_eq!(traits.scan_start, None);

    let initiator = format!("{LABEL}-initiator-Official");
    assert_eq!(
        task.journal().leaves(),
        vec![
            (initiator.clone(), ParticipantState::Departed),
            (initiator, ParticipantState::Departed),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn each_scan_type_gets_its_own_task() {
    let harness = Harness::new(event_start() - TimeDelta::days(1), &[&["alice"]]);
    let coordinator = harness.coordinator();

    for scan_type in ScanType::ALL {
        assert_eq!(
            coordinator
                .initiate_scan(scan_type, &harness.event)
                .await
                .unwrap(),
            InitiateScanResult::ScanWasStarted
        );
    }

    assert_eq!(harness.tasks.requests(), ScanType::ALL.len());
    let manual = harness.task(&scan_task_id(ScanType::Manual, &harness.event.id));
    let traits = ScanTraits::parse_param_string(manual.param_string()).unwrap();
    assert_eq!(traits.scan_type, ScanType::Manual);
    assert_eq!(traits.result_collection.as_str().len(), 32);
    assert!(traits.scan_start.is_some());
}

#[tokio::test(start_paused = true)]
async fn finished_scans_report_already_complete() {
    let start = event_start();
    let harness = Harness::new(start - TimeDelta::days(2), &[&["alice"]]);
    harness
        .provider
        .set_history("alice", vec![win_at(start - TimeDelta::days(3))]);
    let coordinator = harness.coordinator();
    let mut notifications = coordinator.subscribe();

    coordinator
        .initiate_scan(ScanType::TestPass, &harness.event)
        .await
        .unwrap();
    let task = harness.task(&scan_task_id(ScanType::TestPass, &harness.event.id));
    let worker = coordinator
        .create_worker_instance(Arc::new(task.clone()))
        .await
        .unwrap();
    worker.begin();

    loop {
        if let ScanNotification::WorkerFinished { .. } =
            notifications.recv().await.unwrap()
        {
            break;
        }
    }

    assert!(task.is_over());
    assert_eq!(coordinator.active_worker(), None);
    assert_eq!(
        coordinator
            .initiate_scan(ScanType::TestPass, &harness.event)
            .await
            .unwrap(),
        InitiateScanResult::ScanWasAlreadyComplete
    );
}

#[tokio::test(start_paused = true)]
async fn only_one_worker_is_active_at_a_time() {
    let harness = Harness::new(event_start() - TimeDelta::hours(1), &[&["alice"]]);
    let coordinator = harness.coordinator().start_suspended(true);
    coordinator
        .initiate_scan(ScanType::Official, &harness.event)
        .await
        .unwrap();
    let task = harness.task(&scan_task_id(ScanType::Official, &harness.event.id));

    let first = coordinator
        .create_worker_instance(Arc::new(task.clone()))
        .await
        .unwrap();
    assert_eq!(coordinator.active_worker(), Some(first.id()));

    let second = coordinator
        .create_worker_instance(Arc::new(task.clone()))
        .await;
    assert!(matches!(second, Err(ScanError::WorkerAlreadyActive)));

    first.end().await;
    assert_eq!(coordinator.active_worker(), None);

    let replacement = coordinator
        .create_worker_instance(Arc::new(task.clone()))
        .await
        .unwrap();
    assert_ne!(replacement.id(), first.id());
    coordinator.shutdown().await;
    assert_eq!(coordinator.active_worker(), None);
}

#[tokio::test(start_paused = true)]
async fn ending_an_untracked_worker_is_rejected() {
    let harness = Harness::new(event_start() - TimeDelta::hours(1), &[&["alice"]]);
    let coordinator = harness.coordinator().start_suspended(true);
    let other = harness.coordinator().start_suspended(true);
    coordinator
        .initiate_scan(ScanType::Official, &harness.event)
        .await
        .unwrap();
    let task = harness.task(&scan_task_id(ScanType::Official, &harness.event.id));
    let worker = other
        .create_worker_instance(Arc::new(task.clone()))
        .await
        .unwrap();

    let err = coordinator.end_scan(&worker, false, true).unwrap_err();
    assert!(matches!(err, ScanError::WorkerMismatch));

    other.end_scan(&worker, false, true).unwrap();
    assert_eq!(other.active_worker(), None);
}

#[tokio::test(start_paused = true)]
async fn worker_creation_announces_the_scan() {
    let harness = Harness::new(event_start() - TimeDelta::hours(1), &[&["alice"]]);
    let coordinator = harness.coordinator().start_suspended(true);
    let mut notifications = coordinator.subscribe();
    coordinator
        .initiate_scan(ScanType::Official, &harness.event)
        .await
        .unwrap();
    let task = harness.task(&scan_task_id(ScanType::Official, &harness.event.id));

    let worker = coordinator
        .create_worker_instance(Arc::new(task.clone()))
        .await
        .unwrap();

    match notifications.recv().await.unwrap() {
        ScanNotification::ScanStarted { worker: id, traits } => {
            assert_eq!(id, worker.id());
            assert_eq!(traits.scan_type, ScanType::Official);
        }
        other => panic!("unexpected notification {other:?}"),
    }
    assert_eq!(worker.traits().event_id, harness.event.id);
}

#[tokio::test(start_paused = true)]
async fn factory_rejects_foreign_tasks_and_bad_parameters() {
    let harness = Harness::new(event_start() - TimeDelta::hours(1), &[&["alice"]]);
    let coordinator = harness.coordinator();

    let foreign = MemoryTask::new("cleanup", "storageCleanup", "");
    let err = coordinator
        .create_instance(Arc::new(foreign) as Arc<dyn DistributedTask>)
        .await
        .err()
        .unwrap();
    assert!(matches!(err, ContractError::InvalidArgument(_)));

    let garbled = MemoryTask::new("OfficialX", SCAN_TASK_TYPE, "not;enough;fields");
    let err = coordinator
        .create_instance(Arc::new(garbled) as Arc<dyn DistributedTask>)
        .await
        .err()
        .unwrap();
    assert!(matches!(err, ContractError::InvalidArgument(_)));
    assert_eq!(coordinator.active_worker(), None);
}

#[tokio::test(start_paused = true)]
async fn factory_hands_out_startable_workers() {
    let harness = Harness::new(event_start() - TimeDelta::hours(1), &[&["alice"]]);
    let coordinator = harness.coordinator();
    let mut notifications = coordinator.subscribe();
    coordinator
        .initiate_scan(ScanType::Official, &harness.event)
        .await
        .unwrap();
    let task = harness.task(&scan_task_id(ScanType::Official, &harness.event.id));

    let worker = coordinator
        .create_instance(Arc::new(task.clone()) as Arc<dyn DistributedTask>)
        .await
        .unwrap();
    worker.begin_work().await;
    worker.end_work().await;

    let mut ended = false;
    while let Ok(notification) = notifications.try_recv() {
        ended |= matches!(notification, ScanNotification::ScanEnded { .. });
    }
    assert!(ended);
    assert_eq!(coordinator.active_worker(), None);
    assert!(task.journal().heartbeats.load(std::sync::atomic::Ordering::SeqCst) <= 1);
}

use async_trait::async_trait;
use std::io::Write;
use std::sync::Arc;

use clook::elevator::{ElevatorConfig, ElevatorRegistry, Request, CLOOK};
use clook::{ClookError, Config, Controller, Device, DispatchSink, RecordingSink, Workload};
use clook_tests::init_tracing;

/// Sink for a device that has gone away.
struct FailingSink;

#[async_trait]
impl DispatchSink for FailingSink {
    async fn submit(&self, _device: &str, _request: Request) -> clook::Result<()> {
        Err(ClookError::Sink("device offline".to_string()))
    }
}

fn device(name: &str, sink: Arc<dyn DispatchSink>) -> Device {
    let registry = ElevatorRegistry::with_builtin();
    let elevator = registry.create(CLOOK, &ElevatorConfig::default()).unwrap();
    Device::new(name, elevator, sink)
}

#[tokio::test]
async fn test_dispatch_reports_work() {
    init_tracing();
    let sink = Arc::new(RecordingSink::new());
    let sda = device("sda", sink.clone());

    assert!(!sda.dispatch().await.unwrap());
    assert_eq!(sda.head_position().await, None);

    sda.add_request(Request::read(50)).await.unwrap();
    sda.add_request(Request::write(20)).await.unwrap();
    assert!(sda.dispatch().await.unwrap());
    assert_eq!(sda.head_position().await, Some(20));

    sda.add_request(Request::read(10)).await.unwrap();
    assert_eq!(sda.pending_sectors().await, vec![50, 10]);
    assert_eq!(sda.drain().await.unwrap(), 2);
    assert_eq!(sink.sectors("sda").await, vec![20, 50, 10]);

    let records = sink.records().await;
    assert_eq!(records.len(), 3);
    assert!(records.iter().all(|record| record.device == "sda"));
    assert!(sda.shutdown().await.is_ok());
}

#[tokio::test]
async fn test_merge_and_navigation() {
    let sink = Arc::new(RecordingSink::new());
    let sda = device("sda", sink.clone());

    for sector in [30, 10, 20] {
        sda.add_request(Request::read(sector)).await.unwrap();
    }
    let middle = sda.find_pending(20).await.unwrap();
    let first = sda.former(middle).await.unwrap();
    let last = sda.latter(middle).await.unwrap();
    assert_eq!(sda.request(first).await.map(|rq| rq.sector), Some(10));
    assert_eq!(sda.request(last).await.map(|rq| rq.sector), Some(30));

    assert_eq!(sda.merge(middle).await.map(|rq| rq.sector), Some(20));
    assert!(sda.merge(middle).await.is_none());
    assert_eq!(sda.latter(first).await, Some(last));
    assert_eq!(sda.find_pending(20).await, None);
    assert_eq!(sda.stats().await.merged, 1);

    sda.drain().await.unwrap();
    assert_eq!(sink.sectors("sda").await, vec![10, 30]);
}

#[tokio::test]
async fn test_shutdown_with_pending_requests_fails() {
    let sda = device("sda", Arc::new(RecordingSink::new()));
    sda.add_request(Request::write(7)).await.unwrap();

    let err = sda.shutdown().await.unwrap_err();
    assert!(matches!(
        err,
        ClookError::Elevator(clook::elevator::ElevatorError::InvariantViolation { pending: 1 })
    ));
}

#[tokio::test]
async fn test_sink_failure_surfaces() {
    let sda = device("sda", Arc::new(FailingSink));
    sda.add_request(Request::write(42)).await.unwrap();

    let err = sda.dispatch().await.unwrap_err();
    let refused = match err {
        ClookError::Submit { device, request, source } => {
            assert_eq!(device, "sda");
            assert!(matches!(*source, ClookError::Sink(_)));
            request
        }
        other => panic!("unexpected error: {}", other),
    };
    assert_eq!(refused, Request::write(42));
    assert_eq!(sda.pending().await, 0);

    // the caller can put it back in the queue
    sda.add_request(refused).await.unwrap();
    assert_eq!(sda.pending_sectors().await, vec![42]);
    assert!(sda.dispatch().await.is_err());
    assert_eq!(sda.pending().await, 0);
}

#[tokio::test]
async fn test_replay_workload_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "# two sweeps").unwrap();
    writeln!(file, "R 50\nW 20\nR 80\ndispatch\nR 10\nW 60\nmerge 80\nmerge 999").unwrap();

    let workload = Workload::from_file(file.path()).unwrap();
    let sink = Arc::new(RecordingSink::new());
    let controller = Controller::new(Config::default(), &ElevatorRegistry::with_builtin(), sink.clone()).unwrap();

    let summary = controller.replay("sda", &workload).await.unwrap();
    assert_eq!(summary.admitted, 5);
    assert_eq!(summary.merged, 1);
    assert_eq!(summary.dispatched, 4);
    assert_eq!(sink.sectors("sda").await, vec![20, 50, 60, 10]);

    assert!(matches!(
        controller.replay("sdz", &workload).await,
        Err(ClookError::UnknownDevice(_))
    ));
    controller.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_full_queue_is_relieved_by_dispatch() {
    let mut config = Config::default();
    config.queue_depth = 2;
    let sink = Arc::new(RecordingSink::new());
    let controller = Controller::new(config, &ElevatorRegistry::with_builtin(), sink.clone()).unwrap();

    let workload = Workload::parse("R 30\nR 10\nR 20\n").unwrap();
    let summary = controller.replay("sda", &workload).await.unwrap();

    assert_eq!(summary.admitted, 3);
    assert_eq!(summary.throttled, 1);
    assert_eq!(summary.dispatched, 3);
    // 10 went out to make room; 20 then sits ahead of the arm
    assert_eq!(sink.sectors("sda").await, vec![10, 20, 30]);
    controller.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_simulation_keeps_devices_independent() {
    let config = Config::new(vec!["sda".to_string(), "sdb".to_string(), "sdc".to_string()]);
    let sink = Arc::new(RecordingSink::new());
    let controller = Controller::new(config, &ElevatorRegistry::with_builtin(), sink.clone()).unwrap();

    let results = controller.simulate(300, 9).await.unwrap();
    assert_eq!(results.len(), 3);

    for (name, summary) in &results {
        assert_eq!(summary.admitted, summary.dispatched, "{} left work queued", name);
        let device = controller.device(name).unwrap();
        assert_eq!(device.pending().await, 0);

        // each device's own trace: ascending runs broken only by wraps
        let sectors = sink.sectors(name).await;
        let drops = sectors.windows(2).filter(|w| w[1] < w[0]).count() as u64;
        assert_eq!(drops, device.stats().await.wraps);
    }

    let total: usize = results.iter().map(|(_, s)| s.dispatched).sum();
    assert_eq!(sink.len().await, total);
    controller.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_controller_rejects_unknown_elevator() {
    let mut config = Config::default();
    config.elevator = "anticipatory".to_string();
    let result = Controller::new(config, &ElevatorRegistry::with_builtin(), Arc::new(RecordingSink::new()));
    assert!(matches!(
        result,
        Err(ClookError::Elevator(clook::elevator::ElevatorError::UnknownElevator(_)))
    ));
}

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};

use crate::config::ControllerOptions;
use crate::controller_config::{ControllerConfig, ControllerSpec, ManagedKind};
use crate::manager::Manager;
use crate::stop_signal::{StopReason, StopSignal};
use crate::tests::utils::controller_double::{Behavior, ControllerLog, RecordingFactory};

fn controller_config() -> Arc<ControllerConfig> {
    let options = ControllerOptions {
        workers: 4,
        cluster_name: "prod-east".to_owned(),
        annotation_filters: vec!["team=web".to_owned()],
        route53_zone_type: "private".to_owned(),
        route53_txt_owner_id: "blue".to_owned(),
    };
    Arc::new(ControllerConfig::assemble(&options).unwrap())
}

fn start(factory: RecordingFactory) -> (ControllerLog, StopSignal, JoinHandle<eyre::Result<()>>) {
    let log = factory.log.clone();
    let manager = Manager::new(factory, controller_config());
    let stop = StopSignal::new();
    let handle = tokio::spawn({
        let stop = stop.clone();
        async move { manager.run((), stop).await }
    });

    (log, stop, handle)
}

#[tokio::test(start_paused = true)]
async fn should_start_every_controller_with_its_own_slice() {
    let config = controller_config();
    let (log, stop, handle) = start(RecordingFactory::default());

    sleep(Duration::from_secs(1)).await;

    assert_eq!(log.active(), 3);
    let mut started = log.started();
    started.sort();
    assert_eq!(
        started,
        vec![
            ManagedKind::GlobalAccelerator,
            ManagedKind::Route53,
            ManagedKind::EndpointGroupBinding
        ]
    );

    let built = log.built();
    assert_eq!(built, config.specs().to_vec());
    for spec in &built {
        assert_eq!(spec.workers(), 4);
        match spec {
            ControllerSpec::GlobalAccelerator(slice) => {
                assert_eq!(slice, &config.global_accelerator);
                assert_eq!(slice.cluster_name, "prod-east");
            }
            ControllerSpec::Route53(slice) => {
                assert_eq!(slice, &config.route53);
                assert_eq!(slice.txt_owner_id, "blue");
                assert_eq!(slice.annotation_filters["team"], "web");
            }
            ControllerSpec::EndpointGroupBinding(slice) => {
                assert_eq!(slice, &config.endpoint_group_binding);
            }
        }
    }

    stop.signal(StopReason::LeadershipLost);
    handle.await.unwrap().unwrap();

    assert_eq!(log.active(), 0);
    assert!(log
        .stopped()
        .iter()
        .all(|it| it.reason == Some(StopReason::LeadershipLost)));
}

#[tokio::test(start_paused = true)]
async fn should_wait_for_every_controller_to_stop() {
    let factory = RecordingFactory::default()
        .with(
            ManagedKind::GlobalAccelerator,
            Behavior::WaitForStop(Duration::from_secs(1)),
        )
        .with(ManagedKind::Route53, Behavior::WaitForStop(Duration::from_secs(2)))
        .with(
            ManagedKind::EndpointGroupBinding,
            Behavior::WaitForStop(Duration::from_secs(4)),
        );
    let (log, stop, handle) = start(factory);

    sleep(Duration::from_secs(1)).await;
    let stopped_at = Instant::now();
    stop.signal(StopReason::Shutdown);
    handle.await.unwrap().unwrap();

    assert!(stopped_at.elapsed() >= Duration::from_secs(4));
    assert_eq!(log.active(), 0);
    assert_eq!(log.stopped().len(), 3);
    assert!(stop.reason() == Some(StopReason::Shutdown));
}

#[tokio::test(start_paused = true)]
async fn sibling_failure_should_stop_the_others() {
    let factory = RecordingFactory::default()
        .with(ManagedKind::Route53, Behavior::FailAfter(Duration::from_secs(2)))
        .with(
            ManagedKind::EndpointGroupBinding,
            Behavior::WaitForStop(Duration::from_millis(500)),
        );
    let (log, stop, handle) = start(factory);

    let err = handle.await.unwrap().unwrap_err();

    assert_eq!(err.to_string(), "route53 controller failed");
    assert_eq!(stop.reason(), Some(StopReason::ControllerFailed));
    assert_eq!(log.active(), 0);

    let stopped = log.stopped();
    assert_eq!(stopped.len(), 3);
    for sibling in stopped.iter().filter(|it| it.kind != ManagedKind::Route53) {
        assert_eq!(sibling.reason, Some(StopReason::ControllerFailed));
    }
}

#[tokio::test(start_paused = true)]
async fn construction_error_should_abort_before_any_start() {
    let factory = RecordingFactory::default()
        .with(ManagedKind::EndpointGroupBinding, Behavior::FailToBuild);
    let (log, stop, handle) = start(factory);

    let err = handle.await.unwrap().unwrap_err();

    assert_eq!(
        err.to_string(),
        "failed to build endpoint-group-binding controller"
    );
    assert!(log.started().is_empty());
    assert!(!stop.is_signaled());
}

#[tokio::test(start_paused = true)]
async fn early_return_should_end_the_epoch() {
    let factory = RecordingFactory::default()
        .with(ManagedKind::GlobalAccelerator, Behavior::ReturnAfter(Duration::from_secs(1)));
    let (log, stop, handle) = start(factory);

    let err = handle.await.unwrap().unwrap_err();

    assert_eq!(
        err.to_string(),
        "global-accelerator controller stopped unexpectedly"
    );
    assert_eq!(stop.reason(), Some(StopReason::ControllerStopped));
    assert_eq!(log.active(), 0);
}

#[tokio::test(start_paused = true)]
async fn panic_should_end_the_epoch() {
    let factory = RecordingFactory::default()
        .with(ManagedKind::Route53, Behavior::PanicAfter(Duration::from_secs(1)));
    let (log, stop, handle) = start(factory);

    let err = handle.await.unwrap().unwrap_err();

    assert_eq!(err.to_string(), "route53 controller panicked");
    assert_eq!(stop.reason(), Some(StopReason::ControllerFailed));
    assert_eq!(log.active(), 0);
}

#[tokio::test(start_paused = true)]
async fn already_stopped_epoch_should_start_nothing() {
    let factory = RecordingFactory::default();
    let log = factory.log.clone();
    let manager = Manager::new(factory, controller_config());
    let stop = StopSignal::new();
    stop.signal(StopReason::Shutdown);

    manager.run((), stop).await.unwrap();

    assert!(log.started().is_empty());
}

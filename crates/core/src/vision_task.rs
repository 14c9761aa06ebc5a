//! Running-mode dispatch shared by vision tasks
//!
//! [`VisionTaskApi`] owns a task's runner and its [`RunningMode`]. Each of
//! the three submission methods is legal in exactly one mode; calling any
//! other fails with [`Error::ModeViolation`] without touching the runner.

use crate::graph::GraphConfig;
use crate::packet::PacketMap;
use crate::runner::{PacketsCallback, TaskRunner, TaskRunnerFactory};
use crate::running_mode::RunningMode;
use crate::{Error, Result};
use std::sync::atomic::{AtomicBool, Ordering};

/// Mode-checked access to a live runner
///
/// # Lifecycle
///
/// 1. Created by [`VisionTaskApi::create`] with a fixed running mode
/// 2. Active: the mode's submission method is called repeatedly
/// 3. Closed: [`VisionTaskApi::close`] drains the runner; every later call
///    fails with `Error::InvalidUsage`
pub struct VisionTaskApi {
    running_mode: RunningMode,
    graph_config: GraphConfig,
    runner: Box<dyn TaskRunner>,
    closed: AtomicBool,
}

impl VisionTaskApi {
    /// Validate the mode/callback pairing and start a runner
    ///
    /// # Errors
    ///
    /// * `Error::InvalidArgument` - live-stream mode without a callback, or
    ///   a callback in image/video mode
    /// * `Error::Construction` - the graph or runner was rejected
    pub async fn create(
        factory: &dyn TaskRunnerFactory,
        graph_config: GraphConfig,
        running_mode: RunningMode,
        callback: Option<PacketsCallback>,
    ) -> Result<Self> {
        match (running_mode, callback.is_some()) {
            (RunningMode::LiveStream, false) => {
                return Err(Error::InvalidArgument(
                    "The vision task is in live stream mode, a user-defined result callback must be provided."
                        .to_string(),
                ));
            }
            (RunningMode::Image | RunningMode::Video, true) => {
                return Err(Error::InvalidArgument(
                    "The vision task is in image or video mode, a user-defined result callback shouldn't be provided."
                        .to_string(),
                ));
            }
            _ => {}
        }

        graph_config.validate().map_err(Error::into_construction)?;

        let runner = factory
            .create_runner(graph_config.clone(), callback)
            .await
            .map_err(Error::into_construction)?;

        tracing::info!(
            "Vision task created in {} mode with {} graph node(s)",
            running_mode,
            graph_config.nodes.len()
        );

        Ok(Self {
            running_mode,
            graph_config,
            runner,
            closed: AtomicBool::new(false),
        })
    }

    /// Mode fixed at creation
    pub fn running_mode(&self) -> RunningMode {
        self.running_mode
    }

    /// Graph the runner was started with
    pub fn graph_config(&self) -> &GraphConfig {
        &self.graph_config
    }

    /// Whether [`close`](Self::close) has been called
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Submit one image and await its outputs (image mode)
    pub async fn process_image_data(&self, packets: PacketMap) -> Result<PacketMap> {
        self.check_mode(RunningMode::Image, "process_image_data")?;
        self.runner.process(packets).await
    }

    /// Submit one timestamped video frame and await its outputs (video mode)
    pub async fn process_video_data(&self, packets: PacketMap) -> Result<PacketMap> {
        self.check_mode(RunningMode::Video, "process_video_data")?;
        self.runner.process(packets).await
    }

    /// Enqueue one timestamped frame (live-stream mode)
    pub fn send_live_stream_data(&self, packets: PacketMap) -> Result<()> {
        self.check_mode(RunningMode::LiveStream, "send_live_stream_data")?;
        self.runner.send(packets)
    }

    /// Drain and release the runner; idempotent
    pub async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        tracing::info!("Closing {} mode vision task", self.running_mode);
        self.runner.close().await
    }

    fn check_mode(&self, expected: RunningMode, operation: &'static str) -> Result<()> {
        if self.is_closed() {
            return Err(Error::InvalidUsage(format!(
                "{} called on a closed task",
                operation
            )));
        }
        if self.running_mode != expected {
            return Err(Error::ModeViolation {
                operation,
                expected,
                actual: self.running_mode,
            });
        }
        Ok(())
    }
}

impl std::fmt::Debug for VisionTaskApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VisionTaskApi")
            .field("running_mode", &self.running_mode)
            .field("nodes", &self.graph_config.nodes.len())
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::NodeConfig;
    use crate::packet::Packet;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[derive(Default)]
    struct Calls {
        process: usize,
        send: usize,
        close: usize,
    }

    struct CountingRunner {
        calls: Arc<Mutex<Calls>>,
    }

    #[async_trait]
    impl TaskRunner for CountingRunner {
        async fn process(&self, packets: PacketMap) -> Result<PacketMap> {
            self.calls.lock().process += 1;
            Ok(packets)
        }

        fn send(&self, _packets: PacketMap) -> Result<()> {
            self.calls.lock().send += 1;
            Ok(())
        }

        async fn close(&self) -> Result<()> {
            self.calls.lock().close += 1;
            Ok(())
        }
    }

    struct CountingFactory {
        calls: Arc<Mutex<Calls>>,
        fail: bool,
    }

    #[async_trait]
    impl TaskRunnerFactory for CountingFactory {
        async fn create_runner(
            &self,
            _config: GraphConfig,
            _callback: Option<PacketsCallback>,
        ) -> Result<Box<dyn TaskRunner>> {
            if self.fail {
                return Err(Error::Backend("model file is corrupt".to_string()));
            }
            Ok(Box::new(CountingRunner {
                calls: Arc::clone(&self.calls),
            }))
        }
    }

    fn config() -> GraphConfig {
        GraphConfig {
            input_streams: vec!["IN:in".into()],
            output_streams: vec!["OUT:out".into()],
            nodes: vec![NodeConfig {
                id: "task".into(),
                node_type: "Task".into(),
                input_streams: vec!["IN:in".into()],
                output_streams: vec!["OUT:out".into()],
                ..Default::default()
            }],
        }
    }

    fn factory() -> (CountingFactory, Arc<Mutex<Calls>>) {
        let calls = Arc::new(Mutex::new(Calls::default()));
        (
            CountingFactory {
                calls: Arc::clone(&calls),
                fail: false,
            },
            calls,
        )
    }

    fn input() -> PacketMap {
        PacketMap::from([("in".to_string(), Packet::new(1_u8))])
    }

    #[tokio::test]
    async fn test_callback_rules() {
        let (factory, _) = factory();
        let callback: PacketsCallback = Arc::new(|_| {});

        let err = VisionTaskApi::create(&factory, config(), RunningMode::LiveStream, None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));

        for mode in [RunningMode::Image, RunningMode::Video] {
            let err = VisionTaskApi::create(&factory, config(), mode, Some(callback.clone()))
                .await
                .unwrap_err();
            assert!(matches!(err, Error::InvalidArgument(_)));
        }
    }

    #[tokio::test]
    async fn test_construction_failure() {
        let (mut factory, _) = factory();
        factory.fail = true;
        let err = VisionTaskApi::create(&factory, config(), RunningMode::Image, None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Construction(ref m) if m.contains("corrupt")));

        let err = VisionTaskApi::create(&factory, GraphConfig::default(), RunningMode::Image, None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Construction(_)));
    }

    #[tokio::test]
    async fn test_mode_violations_do_not_reach_runner() {
        let (factory, calls) = factory();
        let task = VisionTaskApi::create(&factory, config(), RunningMode::Image, None)
            .await
            .unwrap();

        assert!(matches!(
            task.process_video_data(input()).await,
            Err(Error::ModeViolation { expected: RunningMode::Video, actual: RunningMode::Image, .. })
        ));
        assert!(matches!(
            task.send_live_stream_data(input()),
            Err(Error::ModeViolation { expected: RunningMode::LiveStream, .. })
        ));
        assert_eq!(calls.lock().process, 0);
        assert_eq!(calls.lock().send, 0);

        task.process_image_data(input()).await.unwrap();
        assert_eq!(calls.lock().process, 1);
    }

    #[tokio::test]
    async fn test_close_is_idempotent_and_final() {
        let (factory, calls) = factory();
        let callback: PacketsCallback = Arc::new(|_| {});
        let task = VisionTaskApi::create(&factory, config(), RunningMode::LiveStream, Some(callback))
            .await
            .unwrap();

        task.send_live_stream_data(input()).unwrap();
        task.close().await.unwrap();
        task.close().await.unwrap();
        assert_eq!(calls.lock().close, 1);

        assert!(matches!(
            task.send_live_stream_data(input()),
            Err(Error::InvalidUsage(_))
        ));
        assert_eq!(calls.lock().send, 1);
    }
}

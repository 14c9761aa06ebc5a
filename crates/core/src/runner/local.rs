//! In-process task runner
//!
//! Executes graphs built around a single task node, optionally fronted by a
//! flow limiter, inside the current process. The task node is created from
//! a [`NodeRegistry`]; the flow limiter is implemented by the runner itself.
//!
//! Streaming runners own a worker task that drains submissions in order
//! and invokes the callback, so callbacks never overlap.

use super::{GraphNode, NodeRegistry, PacketsCallback, TaskRunner, TaskRunnerFactory};
use crate::graph::{
    FlowLimiterOptions, GraphConfig, NodeConfig, FLOW_LIMITER_FINISHED_TAG,
    FLOW_LIMITER_NODE_TYPE,
};
use crate::packet::{Packet, PacketMap, Timestamp};
use crate::{Error, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

static RUNNER_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Creates [`LocalTaskRunner`]s backed by a node registry
#[derive(Debug, Clone)]
pub struct LocalRunnerFactory {
    registry: Arc<NodeRegistry>,
}

impl LocalRunnerFactory {
    /// Create a factory resolving node types through `registry`
    pub fn new(registry: Arc<NodeRegistry>) -> Self {
        Self { registry }
    }

    /// Registry used to create task nodes
    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }
}

#[async_trait]
impl TaskRunnerFactory for LocalRunnerFactory {
    async fn create_runner(
        &self,
        config: GraphConfig,
        callback: Option<PacketsCallback>,
    ) -> Result<Box<dyn TaskRunner>> {
        let runner = LocalTaskRunner::start(&config, &self.registry, callback)?;
        Ok(Box::new(runner))
    }
}

/// Task node port bound to a stream
#[derive(Debug, Clone)]
struct Binding {
    tag: String,
    stream: String,
}

/// Graph state shared between the runner and its worker
struct GraphExecution {
    runner_id: String,
    node: Box<dyn GraphNode>,
    inputs: Vec<Binding>,
    outputs: Vec<Binding>,
    last_timestamp: Mutex<Option<Timestamp>>,
}

impl GraphExecution {
    fn build(
        runner_id: String,
        config: &GraphConfig,
        registry: &NodeRegistry,
    ) -> Result<(Self, Option<FlowLimiterOptions>)> {
        config.validate().map_err(Error::into_construction)?;

        let (limiters, tasks): (Vec<&NodeConfig>, Vec<&NodeConfig>) = config
            .nodes
            .iter()
            .partition(|n| n.node_type == FLOW_LIMITER_NODE_TYPE);
        if tasks.len() != 1 || limiters.len() > 1 {
            return Err(Error::Construction(format!(
                "Local runner executes one task node with at most one flow limiter, found {} task node(s) and {} limiter(s)",
                tasks.len(),
                limiters.len()
            )));
        }
        let task = tasks[0];

        let graph_inputs: HashSet<String> = config
            .inputs()
            .map_err(Error::into_construction)?
            .into_iter()
            .map(|s| s.name)
            .collect();

        // throttled stream -> graph input it was admitted from
        let mut throttled: HashMap<String, String> = HashMap::new();
        let mut limiter_options = None;
        if let Some(limiter) = limiters.first() {
            let options: FlowLimiterOptions = if limiter.options.is_null() {
                FlowLimiterOptions::default()
            } else {
                limiter.options_as().map_err(Error::into_construction)?
            };
            if options.max_in_flight == 0 {
                return Err(Error::Construction(
                    "Flow limiter max_in_flight must be at least 1".to_string(),
                ));
            }

            let limiter_inputs = limiter.inputs().map_err(Error::into_construction)?;
            for output in limiter.outputs().map_err(Error::into_construction)? {
                let upstream = limiter_inputs
                    .iter()
                    .find(|s| s.tag == output.tag)
                    .ok_or_else(|| {
                        Error::Construction(format!(
                            "Flow limiter output '{}' has no matching input",
                            output
                        ))
                    })?;
                throttled.insert(output.name, upstream.name.clone());
            }

            let finished = limiter
                .input_for_tag(FLOW_LIMITER_FINISHED_TAG)
                .map_err(Error::into_construction)?
                .ok_or_else(|| {
                    Error::Construction("Flow limiter has no FINISHED input".to_string())
                })?;
            let task_outputs = task.outputs().map_err(Error::into_construction)?;
            if !task_outputs.iter().any(|s| s.name == finished.name) {
                return Err(Error::Construction(format!(
                    "Flow limiter FINISHED stream '{}' is not produced by '{}'",
                    finished.name, task.id
                )));
            }
            limiter_options = Some(options);
        }

        let mut inputs = Vec::new();
        for input in task.inputs().map_err(Error::into_construction)? {
            let stream = if graph_inputs.contains(&input.name) {
                input.name.clone()
            } else if let Some(upstream) = throttled.get(&input.name) {
                upstream.clone()
            } else {
                return Err(Error::Construction(format!(
                    "Input '{}' of '{}' is not fed by a graph input",
                    input, task.id
                )));
            };
            inputs.push(Binding {
                tag: input.tag,
                stream,
            });
        }

        let outputs = task
            .outputs()
            .map_err(Error::into_construction)?
            .into_iter()
            .map(|s| Binding {
                tag: s.tag,
                stream: s.name,
            })
            .collect();

        let node = registry
            .create_node(&task.node_type, &task.options)
            .map_err(Error::into_construction)?;

        Ok((
            Self {
                runner_id,
                node,
                inputs,
                outputs,
                last_timestamp: Mutex::new(None),
            },
            limiter_options,
        ))
    }

    /// Resolve the timestamp of one submission and enforce ordering
    fn admit_timestamp(&self, packets: &PacketMap, allow_implicit: bool) -> Result<Timestamp> {
        if packets.is_empty() {
            return Err(Error::Backend("No input packets provided".to_string()));
        }
        let stamps: HashSet<Timestamp> = packets.values().map(|p| p.timestamp()).collect();
        if stamps.len() > 1 {
            return Err(Error::Backend(
                "Input packets of one submission must share a timestamp".to_string(),
            ));
        }
        let stamp = stamps.into_iter().next().unwrap_or(Timestamp::UNSET);

        let mut last = self.last_timestamp.lock();
        let timestamp = if stamp.is_set() {
            stamp
        } else if allow_implicit {
            last.map_or(Timestamp::new(0), |t| Timestamp::new(t.value() + 1))
        } else {
            return Err(Error::Backend(
                "Input packets must carry a timestamp in streaming mode".to_string(),
            ));
        };

        if let Some(previous) = *last {
            if timestamp <= previous {
                return Err(Error::Backend(format!(
                    "Input timestamp must be monotonically increasing: got {} after {}",
                    timestamp, previous
                )));
            }
        }
        *last = Some(timestamp);
        Ok(timestamp)
    }

    async fn run(&self, mut packets: PacketMap, timestamp: Timestamp) -> Result<PacketMap> {
        let mut node_inputs = HashMap::with_capacity(self.inputs.len());
        for binding in &self.inputs {
            let packet = packets.remove(&binding.stream).ok_or_else(|| {
                Error::Backend(format!("Missing packet for input stream '{}'", binding.stream))
            })?;
            node_inputs.insert(binding.tag.clone(), packet.at(timestamp));
        }

        let mut node_outputs = self.node.process(node_inputs).await?;

        let mut outputs = PacketMap::with_capacity(self.outputs.len());
        for binding in &self.outputs {
            let mut packet = node_outputs.remove(&binding.tag).unwrap_or_else(Packet::empty);
            if !packet.timestamp().is_set() {
                packet = packet.at(timestamp);
            }
            outputs.insert(binding.stream.clone(), packet);
        }
        if !node_outputs.is_empty() {
            tracing::debug!(
                "Runner {} ignoring undeclared outputs {:?} from {}",
                self.runner_id,
                node_outputs.keys().collect::<Vec<_>>(),
                self.node.node_type()
            );
        }
        Ok(outputs)
    }

    fn empty_outputs(&self, timestamp: Timestamp) -> PacketMap {
        self.outputs
            .iter()
            .map(|b| (b.stream.clone(), Packet::empty().at(timestamp)))
            .collect()
    }
}

/// Pending-submission accounting for the flow limiter
///
/// A submission counts from `send` until the task node finishes it, so
/// `capacity` covers the one being processed plus those waiting behind it.
struct Admission {
    capacity: usize,
    pending: AtomicUsize,
}

impl Admission {
    fn new(options: FlowLimiterOptions) -> Self {
        Self {
            capacity: options.max_in_flight.saturating_add(options.max_in_queue),
            pending: AtomicUsize::new(0),
        }
    }

    fn try_admit(&self) -> bool {
        self.pending
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < self.capacity).then_some(n + 1)
            })
            .is_ok()
    }

    fn release(&self) {
        let _ = self
            .pending
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
    }
}

struct Submission {
    packets: PacketMap,
    timestamp: Timestamp,
    admitted: bool,
}

struct LiveStream {
    tx: Mutex<Option<mpsc::UnboundedSender<Submission>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    admission: Option<Arc<Admission>>,
}

/// In-process [`TaskRunner`]
///
/// # Timestamps
///
/// Submissions must carry strictly increasing timestamps. `process` stamps
/// unstamped input with the next implicit tick (previous + 1, starting at
/// 0); `send` requires explicit timestamps.
///
/// # Flow limiting
///
/// When the graph contains a flow limiter, `send` admits at most
/// `max_in_flight + max_in_queue` unfinished submissions; the worker
/// processes them one at a time in order. A submission arriving at capacity
/// is dropped and reported to the callback as a set of empty output packets
/// at its timestamp.
///
/// # Shutdown
///
/// `close` drains every admitted submission. Dropping the runner without
/// closing it aborts the worker and discards what is queued.
pub struct LocalTaskRunner {
    execution: Arc<GraphExecution>,
    live: Option<LiveStream>,
    closed: AtomicBool,
}

impl LocalTaskRunner {
    /// Build and start a runner
    ///
    /// Streaming runners (with a callback) spawn their worker on the
    /// current Tokio runtime.
    pub fn start(
        config: &GraphConfig,
        registry: &NodeRegistry,
        callback: Option<PacketsCallback>,
    ) -> Result<Self> {
        let runner_id = format!("runner_{}", RUNNER_COUNTER.fetch_add(1, Ordering::SeqCst));
        let (execution, limiter) = GraphExecution::build(runner_id.clone(), config, registry)?;
        let execution = Arc::new(execution);

        let live = match callback {
            Some(callback) => {
                let handle = tokio::runtime::Handle::try_current().map_err(|_| {
                    Error::Construction(
                        "Streaming runner must be started inside a Tokio runtime".to_string(),
                    )
                })?;
                let admission = limiter.map(|options| Arc::new(Admission::new(options)));
                let (tx, rx) = mpsc::unbounded_channel();
                let worker = handle.spawn(deliver(
                    Arc::clone(&execution),
                    rx,
                    callback,
                    admission.clone(),
                ));
                Some(LiveStream {
                    tx: Mutex::new(Some(tx)),
                    worker: Mutex::new(Some(worker)),
                    admission,
                })
            }
            None => None,
        };

        tracing::info!(
            "Runner {} started ({} node(s), streaming={}, flow_limited={})",
            runner_id,
            config.nodes.len(),
            live.is_some(),
            limiter.is_some()
        );

        Ok(Self {
            execution,
            live,
            closed: AtomicBool::new(false),
        })
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::InvalidUsage(format!(
                "Runner {} is closed",
                self.execution.runner_id
            )));
        }
        Ok(())
    }
}

async fn deliver(
    execution: Arc<GraphExecution>,
    mut rx: mpsc::UnboundedReceiver<Submission>,
    callback: PacketsCallback,
    admission: Option<Arc<Admission>>,
) {
    while let Some(submission) = rx.recv().await {
        if !submission.admitted {
            callback(Ok(execution.empty_outputs(submission.timestamp)));
            continue;
        }

        let result = execution.run(submission.packets, submission.timestamp).await;
        if let Some(admission) = &admission {
            admission.release();
        }
        if let Err(e) = &result {
            tracing::error!(
                "Runner {} failed at {}: {}",
                execution.runner_id,
                submission.timestamp,
                e
            );
        }
        callback(result);
    }
    tracing::debug!("Runner {} worker drained", execution.runner_id);
}

#[async_trait]
impl TaskRunner for LocalTaskRunner {
    async fn process(&self, packets: PacketMap) -> Result<PacketMap> {
        self.ensure_open()?;
        if self.live.is_some() {
            return Err(Error::InvalidUsage(
                "process() is not available when a result callback is registered".to_string(),
            ));
        }
        let timestamp = self.execution.admit_timestamp(&packets, true)?;
        tracing::debug!("Runner {} processing at {}", self.execution.runner_id, timestamp);
        self.execution.run(packets, timestamp).await
    }

    fn send(&self, packets: PacketMap) -> Result<()> {
        self.ensure_open()?;
        let live = self.live.as_ref().ok_or_else(|| {
            Error::InvalidUsage("send() requires a result callback; use process()".to_string())
        })?;
        let timestamp = self.execution.admit_timestamp(&packets, false)?;

        let admitted = live.admission.as_ref().map_or(true, |a| a.try_admit());
        if !admitted {
            tracing::warn!(
                "Runner {} flow limiter dropped input at {}",
                self.execution.runner_id,
                timestamp
            );
        }

        let tx = live.tx.lock();
        let sent = match tx.as_ref() {
            Some(tx) => tx
                .send(Submission {
                    packets,
                    timestamp,
                    admitted,
                })
                .is_ok(),
            None => false,
        };
        if !sent {
            if admitted {
                if let Some(admission) = &live.admission {
                    admission.release();
                }
            }
            return Err(Error::Backend(format!(
                "Runner {} is no longer accepting input",
                self.execution.runner_id
            )));
        }
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        if let Some(live) = &self.live {
            // Dropping the sender lets the worker drain what is queued and exit.
            live.tx.lock().take();
            let worker = live.worker.lock().take();
            if let Some(worker) = worker {
                worker.await.map_err(|e| {
                    Error::Backend(format!(
                        "Runner {} worker failed: {}",
                        self.execution.runner_id, e
                    ))
                })?;
            }
        }
        tracing::info!("Runner {} closed", self.execution.runner_id);
        Ok(())
    }
}

impl Drop for LocalTaskRunner {
    fn drop(&mut self) {
        self.closed.store(true, Ordering::Release);
        if let Some(live) = &self.live {
            live.tx.lock().take();
            // Without close() nothing is drained; queued submissions are discarded.
            if let Some(worker) = live.worker.lock().take() {
                worker.abort();
            }
        }
    }
}

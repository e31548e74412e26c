// THEORY:
// Clusters share no mutable state: each one gets its own grid, region
// snapshot, oracle, and optimizer, and results are written only to that
// cluster's own nodes. That independence makes scheduling embarrassingly
// parallel, so this module runs one scheduling decision per worker without
// any locking.
//
// Key architectural principles:
// 1.  **Dispatcher + Worker Pool**: tasks enter through one unbounded channel
//     and a dispatcher hands them round-robin to a fixed pool of workers
//     (sized from the machine's core count). Each worker owns its private
//     scheduling stack; nothing crosses worker boundaries but the task and
//     its reply channel.
// 2.  **Deterministic Despite Concurrency**: the optimizer seed for a cluster
//     derives from the base seed and the cluster's index, never from which
//     worker picked the task up or in which order tasks finished. The same
//     input always yields the same schedules.
// 3.  **Ordered Results**: `schedule_clusters` joins the per-cluster futures
//     in input order, so callers get results aligned with their input no
//     matter how execution interleaved.

use crate::error::CoverageError;
use crate::scheduler::{ScheduleLog, SchedulerConfig, SensorNode, SleepScheduler};
use tokio::sync::{mpsc, oneshot};

type ClusterResult = Result<(Vec<SensorNode>, Option<ScheduleLog>), CoverageError>;

/// One cluster's scheduling request, routed to a worker.
struct ClusterTask {
    cluster_index: usize,
    members: Vec<SensorNode>,
    result_sender: oneshot::Sender<ClusterResult>,
}

/// Schedules many independent clusters concurrently, one worker per task.
pub struct ParallelScheduler {
    task_sender: mpsc::UnboundedSender<ClusterTask>,
    workers: Vec<tokio::task::JoinHandle<()>>,
}

impl ParallelScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        let pool_size = num_cpus::get().max(1);
        Self::with_pool_size(config, pool_size)
    }

    pub fn with_pool_size(config: SchedulerConfig, pool_size: usize) -> Self {
        let (task_sender, mut task_receiver) = mpsc::unbounded_channel::<ClusterTask>();

        // Round-robin dispatcher in front of the workers.
        let (worker_senders, worker_receivers): (Vec<_>, Vec<_>) = (0..pool_size)
            .map(|_| mpsc::unbounded_channel::<ClusterTask>())
            .unzip();
        tokio::spawn(async move {
            let mut worker_idx = 0;
            while let Some(task) = task_receiver.recv().await {
                let _ = worker_senders[worker_idx].send(task);
                worker_idx = (worker_idx + 1) % worker_senders.len();
            }
        });

        let mut workers = Vec::with_capacity(pool_size);
        for mut worker_receiver in worker_receivers {
            let worker_config = config.clone();
            workers.push(tokio::spawn(async move {
                while let Some(task) = worker_receiver.recv().await {
                    let result = Self::schedule_one(&worker_config, task.cluster_index, task.members);
                    let _ = task.result_sender.send(result);
                }
            }));
        }

        Self {
            task_sender,
            workers,
        }
    }

    /// Runs one cluster's decision with a seed derived from the cluster
    /// index, so results do not depend on worker assignment.
    fn schedule_one(
        config: &SchedulerConfig,
        cluster_index: usize,
        mut members: Vec<SensorNode>,
    ) -> ClusterResult {
        let mut cluster_config = config.clone();
        cluster_config.optimizer.seed = config
            .optimizer
            .seed
            .wrapping_add(cluster_index as u64);
        let scheduler = SleepScheduler::new(cluster_config);
        let log = scheduler.schedule(&mut members)?;
        Ok((members, log))
    }

    /// Schedules a single cluster on the pool.
    pub async fn schedule_cluster(
        &self,
        cluster_index: usize,
        members: Vec<SensorNode>,
    ) -> ClusterResult {
        let (result_sender, result_receiver) = oneshot::channel();
        let task = ClusterTask {
            cluster_index,
            members,
            result_sender,
        };
        self.task_sender
            .send(task)
            .map_err(|_| CoverageError::WorkerLost)?;
        result_receiver.await.map_err(|_| CoverageError::WorkerLost)?
    }

    /// Schedules every cluster concurrently and returns results in input
    /// order.
    pub async fn schedule_clusters(
        &self,
        clusters: Vec<Vec<SensorNode>>,
    ) -> Result<Vec<(Vec<SensorNode>, Option<ScheduleLog>)>, CoverageError> {
        let futures = clusters
            .into_iter()
            .enumerate()
            .map(|(cluster_index, members)| self.schedule_cluster(cluster_index, members));
        futures::future::try_join_all(futures).await
    }
}

impl Drop for ParallelScheduler {
    fn drop(&mut self) {
        // Workers exit once their channels close; abort covers the case of a
        // runtime that is already shutting down.
        for worker in &self.workers {
            worker.abort();
        }
    }
}

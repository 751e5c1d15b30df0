use std::{
    collections::HashMap,
    future::Future,
    time::{Duration, Instant},
};

use futures::{StreamExt, stream::FuturesUnordered};
use tokio::{
    sync::broadcast,
    task::{AbortHandle, JoinHandle},
    time::timeout,
};
use tracing::{debug, error, info, warn};

/// Lifecycle state of a spawned task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Running,
    Completed,
    Cancelled,
    Panicked,
}

#[derive(Debug)]
pub struct TaskInfo {
    pub name: String,
    pub state: TaskState,
    handle: Option<JoinHandle<()>>,
    abort_handle: AbortHandle,
}

/// Owns the agent's background tasks and stops them together.
///
/// Tasks subscribe to a shared shutdown broadcast. On shutdown the manager
/// broadcasts, waits up to a timeout for tasks to finish on their own, then
/// aborts whatever is still running.
pub struct TaskManager {
    tasks: HashMap<u64, TaskInfo>,
    next_task_id: u64,
    shutdown_tx: broadcast::Sender<()>,
}

impl TaskManager {
    pub fn new() -> Self {
        let (shutdown_tx, _) = broadcast::channel(16);
        Self {
            tasks: HashMap::new(),
            next_task_id: 1,
            shutdown_tx,
        }
    }

    /// A new receiver of the shutdown broadcast.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// Spawns `future` as a tracked task and returns its id.
    pub fn spawn<F>(&mut self, name: &str, future: F) -> u64
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let task_id = self.next_task_id;
        self.next_task_id += 1;

        let handle = tokio::spawn(future);
        let abort_handle = handle.abort_handle();
        self.tasks.insert(
            task_id,
            TaskInfo {
                name: name.to_string(),
                state: TaskState::Running,
                handle: Some(handle),
                abort_handle,
            },
        );

        debug!(
            event.name = "task.spawned",
            task.id = task_id,
            task.name = %name,
            "task spawned and registered"
        );

        task_id
    }

    /// Spawns the future built by `make_future` from a shutdown receiver.
    pub fn spawn_with_shutdown<F, Fut>(&mut self, name: &str, make_future: F) -> u64
    where
        F: FnOnce(broadcast::Receiver<()>) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let future = make_future(self.subscribe());
        self.spawn(name, future)
    }

    /// Number of tasks in `state`.
    pub fn count(&self, state: TaskState) -> usize {
        self.tasks.values().filter(|t| t.state == state).count()
    }

    pub fn get_task_info(&self, task_id: u64) -> Option<&TaskInfo> {
        self.tasks.get(&task_id)
    }

    /// Broadcasts the shutdown signal to every subscribed task.
    pub fn initiate_shutdown(&self) {
        info!(
            event.name = "task_manager.shutdown_initiated",
            active_tasks = self.count(TaskState::Running),
            "broadcasting shutdown signal to all tasks"
        );
        let _ = self.shutdown_tx.send(());
    }

    /// Aborts every task still running.
    pub fn cancel_all_tasks(&mut self) {
        for (task_id, task) in self
            .tasks
            .iter_mut()
            .filter(|(_, task)| task.state == TaskState::Running)
        {
            task.abort_handle.abort();
            task.state = TaskState::Cancelled;
            warn!(
                event.name = "task.cancelled",
                task.id = *task_id,
                task.name = %task.name,
                "task cancelled forcefully"
            );
        }
    }

    /// Signals shutdown and waits up to `timeout_duration` for all tasks.
    pub async fn shutdown_with_timeout(mut self, timeout_duration: Duration) -> ShutdownResult {
        let shutdown_start = Instant::now();
        self.initiate_shutdown();

        if timeout(timeout_duration, self.wait_for_running_tasks())
            .await
            .is_ok()
        {
            let duration = shutdown_start.elapsed();
            info!(
                event.name = "task_manager.shutdown_completed",
                duration_ms = duration.as_millis(),
                "all tasks completed gracefully"
            );
            return ShutdownResult::Graceful {
                duration,
                tasks_completed: self.count(TaskState::Completed),
            };
        }

        warn!(
            event.name = "task_manager.shutdown_timeout",
            timeout_seconds = timeout_duration.as_secs(),
            "graceful shutdown timed out, cancelling remaining tasks"
        );
        self.cancel_all_tasks();

        ShutdownResult::ForcedCancellation {
            duration: shutdown_start.elapsed(),
            tasks_cancelled: self.count(TaskState::Cancelled),
            tasks_completed: self.count(TaskState::Completed),
        }
    }

    async fn wait_for_running_tasks(&mut self) {
        let mut pending: FuturesUnordered<_> = self
            .tasks
            .iter_mut()
            .filter(|(_, task)| task.state == TaskState::Running)
            .filter_map(|(task_id, task)| {
                let task_id = *task_id;
                task.handle
                    .take()
                    .map(|handle| async move { (task_id, handle.await) })
            })
            .collect();

        while let Some((task_id, result)) = pending.next().await {
            let Some(task) = self.tasks.get_mut(&task_id) else {
                continue;
            };
            match result {
                Ok(()) => {
                    task.state = TaskState::Completed;
                    debug!(event.name = "task.completed", task.id = task_id, task.name = %task.name, "task completed successfully");
                }
                Err(e) if e.is_cancelled() => {
                    task.state = TaskState::Cancelled;
                    debug!(event.name = "task.cancelled", task.id = task_id, task.name = %task.name, "task was cancelled");
                }
                Err(e) => {
                    task.state = TaskState::Panicked;
                    error!(event.name = "task.panic", task.id = task_id, task.name = %task.name, error.message = ?e, "task panicked");
                }
            }
        }
    }
}

impl Default for TaskManager {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Debug)]
pub enum ShutdownResult {
    Graceful {
        duration: Duration,
        tasks_completed: usize,
    },
    ForcedCancellation {
        duration: Duration,
        tasks_cancelled: usize,
        tasks_completed: usize,
    },
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    };

    use tokio::time::{Duration, sleep};

    use super::*;

    #[tokio::test]
    async fn test_task_spawning_and_tracking() {
        let mut task_manager = TaskManager::new();

        let task_id = task_manager.spawn("test-task", async {
            sleep(Duration::from_millis(10)).await;
        });

        assert!(task_id > 0);
        assert_eq!(task_manager.count(TaskState::Running), 1);

        let task_info = task_manager.get_task_info(task_id).unwrap();
        assert_eq!(task_info.name, "test-task");
        assert_eq!(task_info.state, TaskState::Running);
    }

    #[tokio::test]
    async fn test_graceful_shutdown() {
        let mut task_manager = TaskManager::new();
        let completed = Arc::new(AtomicBool::new(false));

        let flag = completed.clone();
        task_manager.spawn_with_shutdown("graceful-task", move |mut shutdown_rx| async move {
            tokio::select! {
                _ = sleep(Duration::from_secs(10)) => {}
                _ = shutdown_rx.recv() => {
                    flag.store(true, Ordering::SeqCst);
                }
            }
        });

        let result = task_manager
            .shutdown_with_timeout(Duration::from_secs(1))
            .await;

        match result {
            ShutdownResult::Graceful {
                tasks_completed, ..
            } => {
                assert_eq!(tasks_completed, 1);
                assert!(completed.load(Ordering::SeqCst));
            }
            other => panic!("expected graceful shutdown, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_forced_cancellation() {
        let mut task_manager = TaskManager::new();

        task_manager.spawn("stubborn-task", async {
            sleep(Duration::from_secs(10)).await;
        });

        let result = task_manager
            .shutdown_with_timeout(Duration::from_millis(100))
            .await;

        match result {
            ShutdownResult::ForcedCancellation {
                tasks_cancelled, ..
            } => assert_eq!(tasks_cancelled, 1),
            other => panic!("expected forced cancellation, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_mixed_shutdown_scenarios() {
        let mut task_manager = TaskManager::new();
        let graceful_completed = Arc::new(AtomicUsize::new(0));

        for i in 0..3 {
            let graceful_completed = graceful_completed.clone();
            task_manager.spawn_with_shutdown(&format!("graceful-task-{i}"), move |mut rx| async move {
                tokio::select! {
                    _ = sleep(Duration::from_secs(10)) => {}
                    _ = rx.recv() => {
                        graceful_completed.fetch_add(1, Ordering::SeqCst);
                    }
                }
            });
        }
        for i in 0..2 {
            task_manager.spawn(&format!("stubborn-task-{i}"), async {
                sleep(Duration::from_secs(10)).await;
            });
        }
        assert_eq!(task_manager.count(TaskState::Running), 5);

        let result = task_manager
            .shutdown_with_timeout(Duration::from_millis(200))
            .await;

        match result {
            ShutdownResult::ForcedCancellation {
                tasks_cancelled,
                tasks_completed,
                ..
            } => {
                assert_eq!(tasks_completed, 3);
                assert_eq!(tasks_cancelled, 2);
                assert_eq!(graceful_completed.load(Ordering::SeqCst), 3);
            }
            other => panic!("expected forced cancellation, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_panicked_task_is_reported() {
        let mut task_manager = TaskManager::new();
        let task_id = task_manager.spawn("panicking-task", async {
            panic!("boom");
        });
        assert_eq!(task_manager.count(TaskState::Running), 1);

        let result = task_manager
            .shutdown_with_timeout(Duration::from_secs(1))
            .await;
        assert!(matches!(
            result,
            ShutdownResult::Graceful {
                tasks_completed: 0,
                ..
            }
        ));
        assert!(task_id > 0);
    }
}

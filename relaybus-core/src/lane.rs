//! 投递通道（Lane）
//!
//! 将“在哪个执行上下文里调用消费者”表达为显式的执行器参数：
//! - `TaskLane`：每个投递任务独立 spawn，无上下文亲和（后台通道）；
//! - `SerialLane`：单工作循环逐个执行任务，保证串行次序（UI 亲和通道）。
//!
//! 两者都在构造时捕获当前 tokio 运行时句柄，因此 `post` 可以来自
//! 任意线程，投递仍回到运行时内执行。
//!
use futures_core::future::BoxFuture;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc;

/// 一次投递任务
pub type DeliveryJob = BoxFuture<'static, ()>;

/// 通道执行器：决定投递任务在哪个执行上下文运行
pub trait LaneExecutor: Send + Sync {
    fn execute(&self, job: DeliveryJob);
}

/// 并发执行器：任务间无次序约束
pub struct TaskLane {
    runtime: Handle,
}

impl TaskLane {
    /// 捕获当前运行时句柄（必须在 tokio 运行时内调用）
    pub fn current() -> Self {
        Self {
            runtime: Handle::current(),
        }
    }
}

impl LaneExecutor for TaskLane {
    fn execute(&self, job: DeliveryJob) {
        self.runtime.spawn(job);
    }
}

/// 串行执行器：所有任务进入同一工作循环，逐个 await
///
/// 等价于宿主环境中“单一 UI 线程/消息循环”的投递保证：无论任务
/// 从哪个线程提交，执行都是串行且先进先出的。
pub struct SerialLane {
    tx: mpsc::UnboundedSender<DeliveryJob>,
}

impl SerialLane {
    /// 启动工作循环并返回执行器（必须在 tokio 运行时内调用）
    pub fn current() -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<DeliveryJob>();
        Handle::current().spawn(async move {
            while let Some(job) = rx.recv().await {
                job.await;
            }
        });
        Self { tx }
    }
}

impl LaneExecutor for SerialLane {
    fn execute(&self, job: DeliveryJob) {
        // 工作循环随所有发送端释放而退出；发送失败说明通道已关闭，任务丢弃
        let _ = self.tx.send(job);
    }
}

/// 一对投递通道：后台 + UI 亲和
#[derive(Clone)]
pub struct Lanes {
    pub background: Arc<dyn LaneExecutor>,
    pub ui: Arc<dyn LaneExecutor>,
}

impl Lanes {
    /// 默认通道组合：后台并发执行 + UI 串行执行
    pub fn current() -> Self {
        Self {
            background: Arc::new(TaskLane::current()),
            ui: Arc::new(SerialLane::current()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    // 串行通道保持提交次序
    #[tokio::test(flavor = "multi_thread")]
    async fn test_serial_lane_preserves_order() {
        let lane = SerialLane::current();
        let log = Arc::new(std::sync::Mutex::new(Vec::new()));
        let done = Arc::new(AtomicUsize::new(0));

        for i in 0..16usize {
            let log = log.clone();
            let done = done.clone();
            lane.execute(Box::pin(async move {
                // 人为打乱耗时，验证仍按提交序执行
                tokio::time::sleep(Duration::from_millis((16 - i as u64) % 4)).await;
                log.lock().unwrap().push(i);
                done.fetch_add(1, Ordering::SeqCst);
            }));
        }

        let _ = tokio::time::timeout(Duration::from_secs(2), async {
            while done.load(Ordering::SeqCst) < 16 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await;

        let seen = log.lock().unwrap().clone();
        assert_eq!(seen, (0..16).collect::<Vec<_>>());
    }

    // 并发通道最终执行全部任务
    #[tokio::test(flavor = "multi_thread")]
    async fn test_task_lane_runs_all_jobs() {
        let lane = TaskLane::current();
        let done = Arc::new(AtomicUsize::new(0));

        for _ in 0..8 {
            let done = done.clone();
            lane.execute(Box::pin(async move {
                done.fetch_add(1, Ordering::SeqCst);
            }));
        }

        let _ = tokio::time::timeout(Duration::from_secs(2), async {
            while done.load(Ordering::SeqCst) < 8 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await;
        assert_eq!(done.load(Ordering::SeqCst), 8);
    }
}

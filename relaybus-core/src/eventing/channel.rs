//! 打点广播通道（StampedChannel）
//!
//! 基于 `tokio::sync::broadcast` 的扇出通道，附带保留历史：
//! - `publish`：追加历史并广播，二者在同一把锁下完成；
//! - `subscribe`：在同一把锁下取历史快照并创建接收端。
//!
//! 锁的原子性保证（快照 + 实时流）之间无缝隙也无重复：发布先于
//! 订阅完成的事件只出现在快照里，晚于订阅的只出现在实时流里。
//! 订阅方按自身保存点时间戳过滤，历史因此构成一条“逻辑上无限”
//! 的时间线。
//!
use crate::error::{RelayError, RelayResult};
use crate::record::StampedEvent;
use futures_core::stream::BoxStream;
use futures_util::StreamExt;
use std::sync::Mutex;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

pub(crate) struct StampedChannel {
    tx: broadcast::Sender<StampedEvent>,
    history: Mutex<Vec<StampedEvent>>,
}

impl StampedChannel {
    /// `capacity` 为广播缓冲区容量（落后过多的订阅者会观测到 Lagged）
    pub(crate) fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self {
            tx,
            history: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn publish(&self, event: StampedEvent) {
        let mut history = self.history.lock().expect("channel history lock poisoned");
        history.push(event.clone());
        // 无订阅者时 send 返回错误，视为非致命并忽略
        let _ = self.tx.send(event);
    }

    /// 返回（历史快照, 实时流）
    pub(crate) fn subscribe(
        &self,
    ) -> (Vec<StampedEvent>, BoxStream<'static, RelayResult<StampedEvent>>) {
        let history = self.history.lock().expect("channel history lock poisoned");
        let snapshot = history.clone();
        let rx = self.tx.subscribe();
        let live = BroadcastStream::new(rx)
            .map(|r| r.map_err(|e| RelayError::channel(e.to_string())))
            .boxed();
        (snapshot, live)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{Category, Descriptor, Priority};
    use crate::record::EventRecord;
    use std::sync::Arc;

    fn stamped(seq: u64) -> StampedEvent {
        StampedEvent {
            record: EventRecord::new(
                Arc::new(seq),
                Descriptor::new(Category::Generic, Priority::Normal),
                seq as i64,
            ),
            seq,
        }
    }

    // 订阅前发布的事件只出现在快照中，订阅后的只出现在实时流中
    #[tokio::test(flavor = "multi_thread")]
    async fn test_snapshot_then_live_without_gap_or_duplicate() {
        let channel = StampedChannel::new(16);
        channel.publish(stamped(1));
        channel.publish(stamped(2));

        let (snapshot, mut live) = channel.subscribe();
        assert_eq!(snapshot.iter().map(|e| e.seq).collect::<Vec<_>>(), [1, 2]);

        channel.publish(stamped(3));
        let next = live.next().await.unwrap().unwrap();
        assert_eq!(next.seq, 3);
    }
}

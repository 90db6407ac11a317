// ==========================================
// 仓储履约模拟系统 - 进程内消息总线适配器
// ==========================================
// 职责: 以 tokio mpsc 通道实现 MessageBus trait
// 语义: 单生产者内保序（通道 FIFO）；跨主题不保序；
//       有界通道满载时 publish 等待（对外契约仍是“可能失败”）
// 说明: 每个主题一个通道；消费端在装配期一次性领取接收端
// ==========================================

use crate::engine::events::{
    BusError, BusPayload, MessageBus, TOPIC_INVENTORY_UPDATE, TOPIC_ORDER_PROCESSED,
    TOPIC_ORDER_RECEIVED,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::mpsc;

/// 默认通道容量
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

// ==========================================
// InProcessMessageBus - 进程内总线
// ==========================================
pub struct InProcessMessageBus {
    senders: HashMap<String, mpsc::Sender<BusPayload>>,
    receivers: Mutex<HashMap<String, mpsc::Receiver<BusPayload>>>,
}

impl InProcessMessageBus {
    /// 创建总线并预建三个主题通道
    pub fn new(capacity: usize) -> Self {
        let mut senders = HashMap::new();
        let mut receivers = HashMap::new();
        for topic in [
            TOPIC_ORDER_RECEIVED,
            TOPIC_INVENTORY_UPDATE,
            TOPIC_ORDER_PROCESSED,
        ] {
            let (tx, rx) = mpsc::channel(capacity);
            senders.insert(topic.to_string(), tx);
            receivers.insert(topic.to_string(), rx);
        }
        Self {
            senders,
            receivers: Mutex::new(receivers),
        }
    }

    /// 领取指定主题的接收端（每主题仅可领取一次）
    pub fn take_receiver(&self, topic: &str) -> Option<mpsc::Receiver<BusPayload>> {
        self.receivers
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .remove(topic)
    }
}

impl Default for InProcessMessageBus {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

#[async_trait]
impl MessageBus for InProcessMessageBus {
    async fn publish(&self, topic: &str, payload: BusPayload) -> Result<(), BusError> {
        let sender = self
            .senders
            .get(topic)
            .ok_or_else(|| BusError::UnknownTopic(topic.to_string()))?;
        sender
            .send(payload)
            .await
            .map_err(|_| BusError::ChannelClosed(topic.to_string()))
    }
}

// ==========================================
// 仓储履约模拟系统 - 消息总线契约
// ==========================================
// 职责: 定义总线主题、消息载荷与发布 trait，实现依赖倒置
// 说明: Engine 层定义 trait，应用层提供进程内适配器
// 契约: 发布可能失败（调用方记日志后继续）；投递语义为至少一次，
//       单生产者内保序，跨主题不保序
// ==========================================

use crate::domain::order::OrderLine;
use crate::domain::types::{OrderType, ProcessedStatus};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use thiserror::Error;

// ==========================================
// 主题
// ==========================================

/// 订单释放主题（注入器 → 工作流）
pub const TOPIC_ORDER_RECEIVED: &str = "sim.order.received";
/// 库存变更主题（工作流 → 库存台账）
pub const TOPIC_INVENTORY_UPDATE: &str = "sim.inventory.update";
/// 订单处理结果主题（工作流 → 外部观察者）
pub const TOPIC_ORDER_PROCESSED: &str = "sim.order.processed";

// ==========================================
// 消息载荷
// ==========================================

/// 订单释放消息
///
/// 注入器在订单下单时间到达时发布；行序与种子文件一致
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderReceivedMessage {
    pub order_id: String,
    pub order_type: OrderType,
    pub placed_time: NaiveDateTime, // 下单时间（模拟时间）
    pub due_time: NaiveDateTime,    // 要求交付时间（模拟时间）
    pub customer_id: Option<String>,
    pub lines: Vec<OrderLine>,
    pub sender_id: Option<String>, // 发布方标识
}

/// 库存变更消息
///
/// operation 为字符串操作名（RESERVE/RELEASE/DEDUCT/REPLENISH）；
/// 消费侧解析，未知操作名记日志后跳过
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryUpdateMessage {
    pub sku: String,
    pub quantity_change: Option<i32>,          // 在库量变化（DEDUCT/REPLENISH 使用）
    pub reserved_quantity_change: Option<i32>, // 预占量变化（RESERVE/RELEASE 使用）
    pub operation: String,
    pub order_id: Option<String>, // 关联订单（可选）
}

/// 订单处理结果消息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderProcessedMessage {
    pub order_id: String,
    pub status: ProcessedStatus,
    pub processed_time: NaiveDateTime, // 处理完成时间（模拟时间）
    pub message: String,
}

/// 总线载荷（三类消息的统一包装，便于单一 publish 接口）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BusPayload {
    OrderReceived(OrderReceivedMessage),
    InventoryUpdate(InventoryUpdateMessage),
    OrderProcessed(OrderProcessedMessage),
}

// ==========================================
// 总线错误
// ==========================================

#[derive(Error, Debug)]
pub enum BusError {
    #[error("未知主题: {0}")]
    UnknownTopic(String),

    #[error("主题通道已关闭: {0}")]
    ChannelClosed(String),
}

// ==========================================
// 消息总线 Trait
// ==========================================

/// 消息总线发布接口
///
/// Engine 层定义，应用层实现适配器（进程内 tokio mpsc 版本见 app::bus）
///
/// # 契约
/// - publish 失败由调用方记日志并继续（不做重试）
/// - 至少一次投递；消费端需可安全重入同一消息
#[async_trait]
pub trait MessageBus: Send + Sync {
    /// 向指定主题发布一条消息
    async fn publish(&self, topic: &str, payload: BusPayload) -> Result<(), BusError>;
}

/// 空操作总线
///
/// 用于不需要消息发布的场景（如单元测试）
#[derive(Debug, Clone, Default)]
pub struct NoOpMessageBus;

#[async_trait]
impl MessageBus for NoOpMessageBus {
    async fn publish(&self, topic: &str, _payload: BusPayload) -> Result<(), BusError> {
        tracing::debug!(topic = topic, "NoOpMessageBus: 跳过消息发布");
        Ok(())
    }
}

/// 录制总线
///
/// 记录全部发布的 (主题, 载荷)，用于测试中对发布行为做断言
#[derive(Debug, Default)]
pub struct RecordingBus {
    published: Mutex<Vec<(String, BusPayload)>>,
}

impl RecordingBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// 已发布消息的快照
    pub fn published(&self) -> Vec<(String, BusPayload)> {
        self.published
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    /// 指定主题的已发布消息数
    pub fn count_for_topic(&self, topic: &str) -> usize {
        self.published()
            .iter()
            .filter(|(t, _)| t == topic)
            .count()
    }
}

#[async_trait]
impl MessageBus for RecordingBus {
    async fn publish(&self, topic: &str, payload: BusPayload) -> Result<(), BusError> {
        self.published
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push((topic.to_string(), payload));
        Ok(())
    }
}

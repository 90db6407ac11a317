// ==========================================
// 仓储履约模拟系统 - 订单注入器
// ==========================================
// 职责: 持有按时间排序的待发订单积压队列；
//       每次时钟 tick 释放全部“到期”订单到 order.received 主题
// 说明: 积压队列为组件私有的有序集合（互斥保护），不是全局状态
// 语义: 注入侧发布失败即丢弃（至多一次发射）；之后的投递保障由总线契约承担
// ==========================================

use crate::engine::clock::SimulationClock;
use crate::engine::events::{BusPayload, MessageBus, OrderReceivedMessage, TOPIC_ORDER_RECEIVED};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info};
use uuid::Uuid;

/// 注入器的发布方标识（写入消息 sender_id）
const SENDER_ID: &str = "OrderInjector";

// ==========================================
// OrderInjector - 订单注入器
// ==========================================
pub struct OrderInjector {
    clock: Arc<SimulationClock>,
    bus: Arc<dyn MessageBus>,
    backlog: Mutex<VecDeque<OrderReceivedMessage>>,
}

impl OrderInjector {
    pub fn new(clock: Arc<SimulationClock>, bus: Arc<dyn MessageBus>) -> Self {
        Self {
            clock,
            bus,
            backlog: Mutex::new(VecDeque::new()),
        }
    }

    fn backlog(&self) -> std::sync::MutexGuard<'_, VecDeque<OrderReceivedMessage>> {
        self.backlog.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// 装载订单积压队列
    ///
    /// - 丢弃下单时间落在模拟区间之外的订单
    /// - 按下单时间升序排序后入队
    ///
    /// # 返回
    /// - 实际入队的订单数
    pub fn load_backlog(&self, messages: Vec<OrderReceivedMessage>) -> usize {
        let total = messages.len();
        let mut in_range: Vec<OrderReceivedMessage> = messages
            .into_iter()
            .filter(|m| {
                let keep = self.clock.is_time_in_range(m.placed_time);
                if !keep {
                    debug!(
                        order_id = %m.order_id,
                        placed_time = %m.placed_time,
                        "订单下单时间在模拟区间外，丢弃"
                    );
                }
                keep
            })
            .collect();
        in_range.sort_by(|a, b| a.placed_time.cmp(&b.placed_time));

        let loaded = in_range.len();
        let mut backlog = self.backlog();
        backlog.extend(in_range);

        info!(
            total = total,
            loaded = loaded,
            "订单积压队列装载完成（仅保留模拟区间内订单）"
        );
        loaded
    }

    /// 释放全部到期订单（每次时钟 tick 调用一次，仅在时钟运行期间）
    ///
    /// 到期判定: placed_time <= 当前模拟时间（边界含等于）
    pub async fn release_due(&self) {
        if !self.clock.is_running() {
            return;
        }
        let current = self.clock.current_time();

        // 全量扫描积压队列，切分为“到期/未到期”两部分。
        // 模拟规模下可接受；更大规模可换按时间排序的优先队列，外部行为不变。
        let due: Vec<OrderReceivedMessage> = {
            let mut backlog = self.backlog();
            let mut due = Vec::new();
            let mut remaining = VecDeque::with_capacity(backlog.len());
            while let Some(msg) = backlog.pop_front() {
                if msg.placed_time <= current {
                    due.push(msg);
                } else {
                    remaining.push_back(msg);
                }
            }
            *backlog = remaining;
            due
        };

        for msg in due {
            self.publish_order(msg).await;
        }
    }

    /// 手动注入单笔订单（测试用，绕过积压队列直接发布）
    ///
    /// 调用方未填 order_id 时自动生成
    pub async fn inject_order(&self, mut msg: OrderReceivedMessage) {
        if msg.order_id.trim().is_empty() {
            msg.order_id = Uuid::new_v4().to_string();
        }
        msg.sender_id = Some(SENDER_ID.to_string());
        self.publish_order(msg).await;
    }

    /// 当前积压队列长度
    pub fn backlog_len(&self) -> usize {
        self.backlog().len()
    }

    /// 发布订单到 order.received 主题
    ///
    /// 发布失败只记日志，不重新入队
    async fn publish_order(&self, mut msg: OrderReceivedMessage) {
        if msg.sender_id.is_none() {
            msg.sender_id = Some(SENDER_ID.to_string());
        }
        let order_id = msg.order_id.clone();
        let sim_time = self.clock.format_time(self.clock.current_time());

        match self
            .bus
            .publish(TOPIC_ORDER_RECEIVED, BusPayload::OrderReceived(msg))
            .await
        {
            Ok(()) => {
                info!(sim_time = %sim_time, order_id = %order_id, "订单已释放");
            }
            Err(e) => {
                error!(
                    sim_time = %sim_time,
                    order_id = %order_id,
                    error = %e,
                    "订单发布失败，该订单不再重新入队"
                );
            }
        }
    }
}

// ==========================================
// 仓储履约模拟系统 - 订单工作流
// ==========================================
// 职责: 消费 order.received，驱动订单生命周期状态机，
//       经总线编排库存预占/扣减，发布处理结果
// 状态机: PENDING → RECEIVED → PROCESSING → COMPLETED
//         RECEIVED → CANCELLED（库存不足）
// 说明: 准入检查读取台账当前快照（同步直读），而预占以异步消息发射——
//       两条路径刻意解耦，准入判定不感知在途预占（含同单前序行），
//       并发订单可能同时通过准入。此竞争窗口为协议固有行为，如实保留。
// 红线: 工作流不做重试；库存不足的订单为终态，不重新入队
// ==========================================

use crate::domain::order::Order;
use crate::domain::types::{InventoryOperation, OrderStatus, ProcessedStatus};
use crate::engine::clock::SimulationClock;
use crate::engine::events::{
    BusPayload, InventoryUpdateMessage, MessageBus, OrderProcessedMessage, OrderReceivedMessage,
    TOPIC_INVENTORY_UPDATE, TOPIC_ORDER_PROCESSED,
};
use crate::engine::ledger::InventoryLedger;
use crate::repository::order_repo::OrderRepository;
use crate::repository::RepositoryResult;
use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

// ==========================================
// WorkflowCounters - 处理计数器
// ==========================================

/// 工作流处理计数（收尾汇总用）
#[derive(Debug, Default)]
pub struct WorkflowCounters {
    orders_received: AtomicU64,
    orders_completed: AtomicU64,
    orders_failed: AtomicU64,
    orders_errored: AtomicU64,
}

/// 计数快照
#[derive(Debug, Clone, Copy)]
pub struct CounterSnapshot {
    pub received: u64,
    pub completed: u64,
    pub failed: u64,
    pub errored: u64,
}

impl WorkflowCounters {
    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            received: self.orders_received.load(Ordering::Relaxed),
            completed: self.orders_completed.load(Ordering::Relaxed),
            failed: self.orders_failed.load(Ordering::Relaxed),
            errored: self.orders_errored.load(Ordering::Relaxed),
        }
    }
}

// ==========================================
// OrderWorkflow - 订单工作流
// ==========================================
pub struct OrderWorkflow {
    order_repo: Arc<OrderRepository>,
    ledger: Arc<InventoryLedger>,
    bus: Arc<dyn MessageBus>,
    clock: Arc<SimulationClock>,
    counters: WorkflowCounters,
}

impl OrderWorkflow {
    pub fn new(
        order_repo: Arc<OrderRepository>,
        ledger: Arc<InventoryLedger>,
        bus: Arc<dyn MessageBus>,
        clock: Arc<SimulationClock>,
    ) -> Self {
        Self {
            order_repo,
            ledger,
            bus,
            clock,
            counters: WorkflowCounters::default(),
        }
    }

    /// 处理一条订单释放消息（order.received 消费入口）
    ///
    /// 任何内部失败在此边界捕获并记日志，不向外抛——
    /// 订单停留在最后一次成功落库的状态（可能是 RECEIVED）
    pub async fn handle_order_received(&self, msg: OrderReceivedMessage) {
        self.counters.orders_received.fetch_add(1, Ordering::Relaxed);
        info!(
            order_id = %msg.order_id,
            order_type = %msg.order_type,
            customer_id = ?msg.customer_id,
            lines_count = msg.lines.len(),
            placed_time = %msg.placed_time,
            due_time = %msg.due_time,
            "订单已接收"
        );

        let order_id = msg.order_id.clone();
        if let Err(e) = self.process_message(msg).await {
            self.counters.orders_errored.fetch_add(1, Ordering::Relaxed);
            error!(
                order_id = %order_id,
                sim_time = %self.clock.format_time(self.clock.current_time()),
                error = %e,
                "订单处理异常，保留最后一次落库状态"
            );
        }
    }

    async fn process_message(&self, msg: OrderReceivedMessage) -> anyhow::Result<()> {
        // 1. 物化订单并落库（PENDING 为瞬态，落库前即推进到 RECEIVED）
        let mut order = materialize_order(&msg);
        order.status = OrderStatus::Received;
        let order = self.order_repo.save(&order)?;

        // 2. 准入检查（逐行，同步读快照 + 异步发射预占）
        let admitted = self.check_and_reserve(&order).await?;

        if admitted {
            self.process_order(order).await?;
            self.counters.orders_completed.fetch_add(1, Ordering::Relaxed);
        } else {
            // 库存不足 → 终态 CANCELLED
            let mut order = order;
            order.status = OrderStatus::Cancelled;
            let order = self.order_repo.save(&order)?;

            self.publish_order_processed(
                &order.order_id,
                ProcessedStatus::Failed,
                "Insufficient inventory",
            )
            .await;
            self.counters.orders_failed.fetch_add(1, Ordering::Relaxed);

            warn!(
                order_id = %order.order_id,
                reason = "INSUFFICIENT_INVENTORY",
                lines = %order.lines_summary(),
                sim_time = %self.clock.format_time(self.clock.current_time()),
                "订单履约失败"
            );
        }

        Ok(())
    }

    /// 逐行准入检查并发射预占消息
    ///
    /// - 任一行可用量不足即整单失败（后续行不再检查）
    /// - 此前各行已发射的 RESERVE 不回滚
    /// - 各行判定均基于发射预占前的快照（不叠加同单前序行的预占）
    async fn check_and_reserve(&self, order: &Order) -> anyhow::Result<bool> {
        for line in &order.lines {
            // 快照读取（未知 SKU 在此懒建档）
            let item = self.ledger.get_or_create(&line.sku)?;
            if item.available_quantity() < line.quantity {
                warn!(
                    sim_time = %self.clock.format_time(self.clock.current_time()),
                    order_id = %order.order_id,
                    sku = %line.sku,
                    available = item.available_quantity(),
                    requested = line.quantity,
                    "可用库存不足，订单准入失败"
                );
                return Ok(false);
            }

            // 异步预占（发后不管；实际预占由台账按消息独立应用）
            let update = InventoryUpdateMessage {
                sku: line.sku.clone(),
                quantity_change: None,
                reserved_quantity_change: Some(line.quantity),
                operation: InventoryOperation::Reserve.as_str().to_string(),
                order_id: Some(order.order_id.clone()),
            };
            self.bus
                .publish(TOPIC_INVENTORY_UPDATE, BusPayload::InventoryUpdate(update))
                .await?;
        }
        Ok(true)
    }

    /// 履约已通过准入的订单: PROCESSING → 逐行扣减 → COMPLETED
    async fn process_order(&self, mut order: Order) -> anyhow::Result<()> {
        order.status = OrderStatus::Processing;
        let mut order = self.order_repo.save(&order)?;
        info!(
            order_id = %order.order_id,
            status = %order.status,
            sim_time = %self.clock.format_time(self.clock.current_time()),
            "订单进入履约"
        );

        for line in &order.lines {
            let update = InventoryUpdateMessage {
                sku: line.sku.clone(),
                quantity_change: Some(line.quantity),
                reserved_quantity_change: None,
                operation: InventoryOperation::Deduct.as_str().to_string(),
                order_id: Some(order.order_id.clone()),
            };
            self.bus
                .publish(TOPIC_INVENTORY_UPDATE, BusPayload::InventoryUpdate(update))
                .await?;

            debug!(
                order_id = %order.order_id,
                sku = %line.sku,
                quantity = line.quantity,
                zone = %line.temperature_zone,
                "已发射扣减消息"
            );
        }

        order.status = OrderStatus::Completed;
        let order = self.order_repo.save(&order)?;

        self.publish_order_processed(
            &order.order_id,
            ProcessedStatus::Completed,
            "Order processed successfully",
        )
        .await;

        info!(
            order_id = %order.order_id,
            order_type = %order.order_type,
            customer_id = ?order.customer_id,
            lines = %order.lines_summary(),
            status = %order.status,
            sim_time = %self.clock.format_time(self.clock.current_time()),
            "订单履约完成"
        );
        Ok(())
    }

    /// 发布处理结果消息（发布失败只记日志，不影响订单状态）
    async fn publish_order_processed(&self, order_id: &str, status: ProcessedStatus, message: &str) {
        let processed = OrderProcessedMessage {
            order_id: order_id.to_string(),
            status,
            processed_time: self.clock.current_time(),
            message: message.to_string(),
        };

        match self
            .bus
            .publish(TOPIC_ORDER_PROCESSED, BusPayload::OrderProcessed(processed))
            .await
        {
            Ok(()) => {
                debug!(order_id = %order_id, status = %status, "处理结果已发布");
            }
            Err(e) => {
                error!(
                    order_id = %order_id,
                    status = %status,
                    error = %e,
                    sim_time = %self.clock.format_time(self.clock.current_time()),
                    "处理结果发布失败"
                );
            }
        }
    }

    // ==========================================
    // 查询接口
    // ==========================================

    /// 按订单号查询
    pub fn get_order(&self, order_id: &str) -> RepositoryResult<Option<Order>> {
        self.order_repo.find_by_order_id(order_id)
    }

    /// 查询全部订单
    pub fn get_all_orders(&self) -> RepositoryResult<Vec<Order>> {
        self.order_repo.find_all()
    }

    /// 处理计数快照
    pub fn counters(&self) -> CounterSnapshot {
        self.counters.snapshot()
    }
}

/// 从订单释放消息物化订单实体（状态为瞬态 PENDING）
fn materialize_order(msg: &OrderReceivedMessage) -> Order {
    let now = Utc::now();
    Order {
        order_id: msg.order_id.clone(),
        order_type: msg.order_type,
        status: OrderStatus::Pending,
        placed_time: msg.placed_time,
        due_time: msg.due_time,
        customer_id: msg.customer_id.clone(),
        lines: msg.lines.clone(),
        created_at: now,
        updated_at: now,
    }
}

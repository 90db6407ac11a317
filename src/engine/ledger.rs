// ==========================================
// 仓储履约模拟系统 - 库存台账
// ==========================================
// 职责: 对单个 SKU 应用具名库存操作（RESERVE/RELEASE/DEDUCT/REPLENISH），
//       每次操作后做一次低库存自动补货检查
// 红线: 库存行仅由台账修改；台账消费端单任务串行应用，
//       以此保证同一 SKU 读-改-写不丢更新
// 说明: DEDUCT 在预占覆盖不足时允许把在库量扣成负数——
//       此行为如实保留（不加钳制），由测试固定
// ==========================================

use crate::domain::inventory::InventoryItem;
use crate::domain::types::{InventoryOperation, TemperatureZone};
use crate::engine::events::InventoryUpdateMessage;
use crate::repository::inventory_repo::InventoryItemRepository;
use crate::repository::RepositoryResult;
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

// ==========================================
// InventoryLedger - 库存台账
// ==========================================
pub struct InventoryLedger {
    repo: Arc<InventoryItemRepository>,
    initial_stock: i32,          // 懒建档初始在库量
    low_stock_threshold: i32,    // 懒建档默认低库存阈值
    replenishment_quantity: i32, // 默认补货量（自动补货与缺省 REPLENISH 共用）
}

impl InventoryLedger {
    pub fn new(
        repo: Arc<InventoryItemRepository>,
        initial_stock: i32,
        low_stock_threshold: i32,
        replenishment_quantity: i32,
    ) -> Self {
        Self {
            repo,
            initial_stock,
            low_stock_threshold,
            replenishment_quantity,
        }
    }

    /// 查询库存快照；未知 SKU 会自动建档并落库后返回
    ///
    /// 注意: 这是一个带写副作用的读操作（懒建档），命名上刻意不叫 get
    pub fn get_or_create(&self, sku: &str) -> RepositoryResult<InventoryItem> {
        if let Some(item) = self.repo.find_by_sku(sku)? {
            return Ok(item);
        }

        let now = Utc::now();
        let item = InventoryItem {
            sku: sku.to_string(),
            name: Some(format!("Item {}", sku)),
            quantity: self.initial_stock,
            reserved_quantity: 0,
            temperature_zone: TemperatureZone::Ambient,
            low_stock_threshold: self.low_stock_threshold,
            created_at: now,
            updated_at: now,
        };
        let stored = self.repo.save(&item)?;
        info!(
            sku = %sku,
            initial_stock = self.initial_stock,
            "未知 SKU 自动建档"
        );
        Ok(stored)
    }

    /// 应用一条库存变更消息（台账唯一入口）
    ///
    /// 未知操作名记日志后跳过；任何操作之后都做一次自动补货检查
    pub fn apply_update(&self, msg: &InventoryUpdateMessage) -> RepositoryResult<()> {
        info!(
            sku = %msg.sku,
            operation = %msg.operation,
            order_id = ?msg.order_id,
            "库存台账: 收到库存变更消息"
        );

        let mut item = self.get_or_create(&msg.sku)?;

        match InventoryOperation::parse(&msg.operation) {
            Some(InventoryOperation::Reserve) => {
                self.reserve(&mut item, msg.reserved_quantity_change)?
            }
            Some(InventoryOperation::Release) => {
                self.release(&mut item, msg.reserved_quantity_change)?
            }
            Some(InventoryOperation::Deduct) => self.deduct(&mut item, msg.quantity_change)?,
            Some(InventoryOperation::Replenish) => {
                self.replenish(&mut item, msg.quantity_change)?
            }
            None => {
                warn!(sku = %msg.sku, operation = %msg.operation, "库存台账: 未知操作，跳过");
            }
        }

        // 每条消息处理后做一次（且仅一次）低库存检查
        self.check_and_replenish(&mut item)?;
        Ok(())
    }

    /// 种子数据建档/更新（保留已有行的预占量）
    pub fn seed_item(
        &self,
        sku: &str,
        name: Option<String>,
        quantity: i32,
        temperature_zone: TemperatureZone,
        low_stock_threshold: i32,
    ) -> RepositoryResult<InventoryItem> {
        let item = match self.repo.find_by_sku(sku)? {
            Some(mut existing) => {
                existing.name = name;
                existing.quantity = quantity;
                existing.temperature_zone = temperature_zone;
                existing.low_stock_threshold = low_stock_threshold;
                existing
            }
            None => {
                let now = Utc::now();
                InventoryItem {
                    sku: sku.to_string(),
                    name,
                    quantity,
                    reserved_quantity: 0,
                    temperature_zone,
                    low_stock_threshold,
                    created_at: now,
                    updated_at: now,
                }
            }
        };
        let stored = self.repo.save(&item)?;
        Ok(stored)
    }

    // ==========================================
    // 四类操作
    // ==========================================

    /// RESERVE: 可用量足够时预占；不足时整条丢弃（仅告警，不发补偿信号）
    fn reserve(&self, item: &mut InventoryItem, qty: Option<i32>) -> RepositoryResult<()> {
        let Some(qty) = positive(qty) else {
            return Ok(());
        };

        let available = item.available_quantity();
        if available >= qty {
            item.reserved_quantity += qty;
            *item = self.repo.save(item)?;
            info!(
                sku = %item.sku,
                qty = qty,
                available = item.available_quantity(),
                "库存台账: 预占成功"
            );
        } else {
            warn!(
                sku = %item.sku,
                requested = qty,
                available = available,
                "库存台账: 可用量不足，预占被拒绝"
            );
        }
        Ok(())
    }

    /// RELEASE: 释放预占，钳制到 0，从不拒绝
    fn release(&self, item: &mut InventoryItem, qty: Option<i32>) -> RepositoryResult<()> {
        let Some(qty) = positive(qty) else {
            return Ok(());
        };

        let release_amount = qty.min(item.reserved_quantity);
        item.reserved_quantity -= release_amount;
        *item = self.repo.save(item)?;
        info!(
            sku = %item.sku,
            released = release_amount,
            reserved = item.reserved_quantity,
            "库存台账: 预占已释放"
        );
        Ok(())
    }

    /// DEDUCT: 优先从预占扣，剩余部分扣在库量；在库量可为负
    fn deduct(&self, item: &mut InventoryItem, qty: Option<i32>) -> RepositoryResult<()> {
        let Some(qty) = positive(qty) else {
            return Ok(());
        };

        let from_reserved = qty.min(item.reserved_quantity);
        let from_stock = qty - from_reserved;
        item.reserved_quantity -= from_reserved;
        item.quantity -= from_stock;
        *item = self.repo.save(item)?;
        info!(
            sku = %item.sku,
            qty = qty,
            quantity = item.quantity,
            reserved = item.reserved_quantity,
            "库存台账: 扣减完成"
        );
        Ok(())
    }

    /// REPLENISH: 补货；数量缺省或非正时使用配置的默认补货量
    fn replenish(&self, item: &mut InventoryItem, qty: Option<i32>) -> RepositoryResult<()> {
        let qty = positive(qty).unwrap_or(self.replenishment_quantity);

        item.quantity += qty;
        *item = self.repo.save(item)?;
        info!(
            sku = %item.sku,
            qty = qty,
            quantity = item.quantity,
            "库存台账: 补货完成"
        );
        Ok(())
    }

    /// 低库存自动补货检查（按裸在库量判定，单次触发，不递归）
    fn check_and_replenish(&self, item: &mut InventoryItem) -> RepositoryResult<()> {
        if item.quantity <= item.low_stock_threshold {
            warn!(
                sku = %item.sku,
                quantity = item.quantity,
                threshold = item.low_stock_threshold,
                "库存台账: 触发低库存自动补货"
            );
            self.replenish(item, Some(self.replenishment_quantity))?;
        }
        Ok(())
    }
}

/// 提取正数数量（None 或非正视为缺省）
fn positive(qty: Option<i32>) -> Option<i32> {
    qty.filter(|q| *q > 0)
}

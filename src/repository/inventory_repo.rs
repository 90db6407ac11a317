// ==========================================
// 仓储履约模拟系统 - 库存仓储
// ==========================================
// 职责: 管理 inventory_items 表的单行 upsert 与查询
// 红线: Repository 不含业务逻辑（预占/扣减规则在引擎层）
// ==========================================

use crate::domain::inventory::InventoryItem;
use crate::domain::types::TemperatureZone;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::order_repo::parse_utc_time;
use chrono::Utc;
use rusqlite::{params, Connection, Row};
use std::sync::{Arc, Mutex};

// ==========================================
// InventoryItemRepository - 库存仓储
// ==========================================
pub struct InventoryItemRepository {
    conn: Arc<Mutex<Connection>>,
}

impl InventoryItemRepository {
    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 保存库存行（INSERT OR REPLACE，以 sku 为键的单行 upsert）
    ///
    /// # 返回
    /// - Ok(InventoryItem): 落库后的库存行（updated_at 已刷新）
    pub fn save(&self, item: &InventoryItem) -> RepositoryResult<InventoryItem> {
        let conn = self.get_conn()?;

        let mut stored = item.clone();
        stored.updated_at = Utc::now();

        conn.execute(
            r#"
            INSERT OR REPLACE INTO inventory_items (
                sku, name, quantity, reserved_quantity,
                temperature_zone, low_stock_threshold, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                stored.sku,
                stored.name,
                stored.quantity,
                stored.reserved_quantity,
                stored.temperature_zone.as_str(),
                stored.low_stock_threshold,
                stored.created_at.to_rfc3339(),
                stored.updated_at.to_rfc3339(),
            ],
        )?;

        Ok(stored)
    }

    /// 按 sku 查询库存行
    pub fn find_by_sku(&self, sku: &str) -> RepositoryResult<Option<InventoryItem>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT sku, name, quantity, reserved_quantity,
                   temperature_zone, low_stock_threshold, created_at, updated_at
            FROM inventory_items
            WHERE sku = ?1
            "#,
        )?;

        let mut rows = stmt.query(params![sku])?;
        match rows.next()? {
            Some(row) => Ok(Some(row_to_item(row)?)),
            None => Ok(None),
        }
    }

    /// 查询全部库存行（按 sku 升序）
    pub fn find_all(&self) -> RepositoryResult<Vec<InventoryItem>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT sku, name, quantity, reserved_quantity,
                   temperature_zone, low_stock_threshold, created_at, updated_at
            FROM inventory_items
            ORDER BY sku ASC
            "#,
        )?;

        let mut items = Vec::new();
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            items.push(row_to_item(row)?);
        }
        Ok(items)
    }
}

// ==========================================
// 行映射
// ==========================================

fn row_to_item(row: &Row<'_>) -> RepositoryResult<InventoryItem> {
    let zone_s: String = row.get(4)?;
    let created_s: String = row.get(6)?;
    let updated_s: String = row.get(7)?;

    Ok(InventoryItem {
        sku: row.get(0)?,
        name: row.get(1)?,
        quantity: row.get(2)?,
        reserved_quantity: row.get(3)?,
        // 历史数据中的未知温区统一回落到 AMBIENT
        temperature_zone: TemperatureZone::parse_or_default(&zone_s),
        low_stock_threshold: row.get(5)?,
        created_at: parse_utc_time(&created_s, "created_at")?,
        updated_at: parse_utc_time(&updated_s, "updated_at")?,
    })
}

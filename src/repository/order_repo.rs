// ==========================================
// 仓储履约模拟系统 - 订单仓储
// ==========================================
// 职责: 管理 orders 表的单行 upsert 与查询
// 红线: Repository 不含业务逻辑
// ==========================================

use crate::domain::order::{Order, OrderLine};
use crate::domain::types::{OrderStatus, OrderType};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::{params, Connection, Row};
use std::sync::{Arc, Mutex};

/// 模拟时间的存储格式（ISO 本地时间，与种子文件一致）
pub const SIM_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

// ==========================================
// OrderRepository - 订单仓储
// ==========================================
pub struct OrderRepository {
    conn: Arc<Mutex<Connection>>,
}

impl OrderRepository {
    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 保存订单（INSERT OR REPLACE，以 order_id 为键的单行 upsert）
    ///
    /// # 返回
    /// - Ok(Order): 落库后的订单行（updated_at 已刷新）
    ///
    /// # 说明
    /// - 行明细序列化为 lines_json 列，保持行序
    pub fn save(&self, order: &Order) -> RepositoryResult<Order> {
        let conn = self.get_conn()?;

        let mut stored = order.clone();
        stored.updated_at = Utc::now();

        let lines_json = serde_json::to_string(&stored.lines)?;

        conn.execute(
            r#"
            INSERT OR REPLACE INTO orders (
                order_id, order_type, status, placed_time, due_time,
                customer_id, lines_json, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                stored.order_id,
                stored.order_type.as_str(),
                stored.status.as_str(),
                stored.placed_time.format(SIM_TIME_FORMAT).to_string(),
                stored.due_time.format(SIM_TIME_FORMAT).to_string(),
                stored.customer_id,
                lines_json,
                stored.created_at.to_rfc3339(),
                stored.updated_at.to_rfc3339(),
            ],
        )?;

        Ok(stored)
    }

    /// 按 order_id 查询订单
    pub fn find_by_order_id(&self, order_id: &str) -> RepositoryResult<Option<Order>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT order_id, order_type, status, placed_time, due_time,
                   customer_id, lines_json, created_at, updated_at
            FROM orders
            WHERE order_id = ?1
            "#,
        )?;

        let mut rows = stmt.query(params![order_id])?;
        match rows.next()? {
            Some(row) => Ok(Some(row_to_order(row)?)),
            None => Ok(None),
        }
    }

    /// 查询全部订单（按下单时间升序）
    pub fn find_all(&self) -> RepositoryResult<Vec<Order>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT order_id, order_type, status, placed_time, due_time,
                   customer_id, lines_json, created_at, updated_at
            FROM orders
            ORDER BY placed_time ASC, order_id ASC
            "#,
        )?;

        let mut orders = Vec::new();
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            orders.push(row_to_order(row)?);
        }
        Ok(orders)
    }

    /// 按状态统计订单数（用于收尾汇总）
    pub fn count_by_status(&self, status: OrderStatus) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM orders WHERE status = ?1",
            params![status.as_str()],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

// ==========================================
// 行映射
// ==========================================

fn row_to_order(row: &Row<'_>) -> RepositoryResult<Order> {
    let order_type_s: String = row.get(1)?;
    let status_s: String = row.get(2)?;
    let placed_s: String = row.get(3)?;
    let due_s: String = row.get(4)?;
    let lines_json: String = row.get(6)?;
    let created_s: String = row.get(7)?;
    let updated_s: String = row.get(8)?;

    let lines: Vec<OrderLine> = serde_json::from_str(&lines_json)?;

    Ok(Order {
        order_id: row.get(0)?,
        order_type: OrderType::parse(&order_type_s).ok_or_else(|| {
            RepositoryError::FieldValueError {
                field: "order_type".to_string(),
                message: format!("未知订单类型: {}", order_type_s),
            }
        })?,
        status: OrderStatus::parse(&status_s).ok_or_else(|| RepositoryError::FieldValueError {
            field: "status".to_string(),
            message: format!("未知订单状态: {}", status_s),
        })?,
        placed_time: parse_sim_time(&placed_s, "placed_time")?,
        due_time: parse_sim_time(&due_s, "due_time")?,
        customer_id: row.get(5)?,
        lines,
        created_at: parse_utc_time(&created_s, "created_at")?,
        updated_at: parse_utc_time(&updated_s, "updated_at")?,
    })
}

/// 解析模拟时间列
pub(crate) fn parse_sim_time(s: &str, field: &str) -> RepositoryResult<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, SIM_TIME_FORMAT).map_err(|e| {
        RepositoryError::FieldValueError {
            field: field.to_string(),
            message: format!("时间解析失败 ({}): {}", s, e),
        }
    })
}

/// 解析审计时间列（RFC3339）
pub(crate) fn parse_utc_time(s: &str, field: &str) -> RepositoryResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::FieldValueError {
            field: field.to_string(),
            message: format!("时间解析失败 ({}): {}", s, e),
        })
}

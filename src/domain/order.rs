// ==========================================
// 仓储履约模拟系统 - 订单领域模型
// ==========================================
// 红线: 订单行由工作流独占修改，台账侧只读消息载荷
// 用途: 工作流写入，查询接口只读
// ==========================================

use crate::domain::types::{OrderStatus, OrderType, TemperatureZone};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// OrderLine - 订单行
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub sku: String,                     // 商品 SKU
    pub quantity: i32,                   // 需求数量（> 0）
    pub temperature_zone: TemperatureZone, // 温区
}

// ==========================================
// Order - 订单实体
// ==========================================
// 对齐: orders 表（行明细存 lines_json 列）
// 终态: COMPLETED / CANCELLED，订单从不删除
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    // ===== 主键 =====
    pub order_id: String, // 订单唯一标识

    // ===== 基础信息 =====
    pub order_type: OrderType,       // 订单类型
    pub status: OrderStatus,         // 生命周期状态
    pub placed_time: NaiveDateTime,  // 下单时间（模拟时间）
    pub due_time: NaiveDateTime,     // 要求交付时间（模拟时间）
    pub customer_id: Option<String>, // 客户标识

    // ===== 行明细（顺序即源文件行序）=====
    pub lines: Vec<OrderLine>,

    // ===== 审计字段 =====
    pub created_at: DateTime<Utc>, // 记录创建时间
    pub updated_at: DateTime<Utc>, // 记录更新时间
}

impl Order {
    /// 行明细的 "SKU:数量" 摘要，用于结构化日志
    pub fn lines_summary(&self) -> String {
        self.lines
            .iter()
            .map(|l| format!("{}:{}", l.sku, l.quantity))
            .collect::<Vec<_>>()
            .join(",")
    }
}

// ==========================================
// RawOrderRecord - 订单种子行（导入中间结构体）
// ==========================================
// 用途: CSV 一行一条；同一 order_id 的多行合并为一张多行订单
// 生命周期: 仅在导入流程内
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawOrderRecord {
    #[serde(rename = "ORDER_ID")]
    pub order_id: String,
    #[serde(rename = "ORDER_TYPE")]
    pub order_type: String,
    #[serde(rename = "ORDER_PLACED_TIME")]
    pub order_placed_time: String, // ISO 格式: 2024-01-13T08:30:00
    #[serde(rename = "ORDER_DUE_TIME")]
    pub order_due_time: String,
    #[serde(rename = "CUSTOMER_ID")]
    pub customer_id: String,
    #[serde(rename = "SKU")]
    pub sku: String,
    #[serde(rename = "QUANTITY")]
    pub quantity: i32,
    #[serde(rename = "TEMPERATURE_ZONE", default)]
    pub temperature_zone: String,
}

// ==========================================
// 仓储履约模拟系统 - 库存领域模型
// ==========================================
// 红线: 库存行仅由库存台账修改，工作流只做快照读取
// ==========================================

use crate::domain::types::TemperatureZone;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// InventoryItem - 库存行
// ==========================================
// 对齐: inventory_items 表
// 说明: quantity 按构造非负，但任何路径都不强制——
//       预占覆盖不足时 DEDUCT 允许把 quantity 扣成负数（行为保留，见测试）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryItem {
    // ===== 主键 =====
    pub sku: String, // 商品 SKU

    // ===== 库存状态 =====
    pub name: Option<String>,          // 商品名称
    pub quantity: i32,                 // 在库量
    pub reserved_quantity: i32,        // 预占量
    pub temperature_zone: TemperatureZone, // 存储温区
    pub low_stock_threshold: i32,      // 低库存阈值（触发自动补货）

    // ===== 审计字段 =====
    pub created_at: DateTime<Utc>, // 记录创建时间
    pub updated_at: DateTime<Utc>, // 记录更新时间
}

impl InventoryItem {
    /// 可用量（派生字段）: 在库量 - 预占量
    pub fn available_quantity(&self) -> i32 {
        self.quantity - self.reserved_quantity
    }
}

// ==========================================
// RawInventoryRecord - 库存种子行（导入中间结构体）
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawInventoryRecord {
    #[serde(rename = "SKU")]
    pub sku: String,
    #[serde(rename = "NAME", default)]
    pub name: Option<String>,
    #[serde(rename = "QUANTITY", default)]
    pub quantity: Option<i32>,
    #[serde(rename = "TEMPERATURE_ZONE", default)]
    pub temperature_zone: Option<String>,
    #[serde(rename = "LOW_STOCK_THRESHOLD", default)]
    pub low_stock_threshold: Option<i32>,
}

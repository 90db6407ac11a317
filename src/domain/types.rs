// ==========================================
// 仓储履约模拟系统 - 领域类型定义
// ==========================================
// 序列化格式: SCREAMING_SNAKE_CASE (与消息载荷/数据库一致)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 订单类型 (Order Type)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderType {
    Pickup,   // 到仓自提
    Delivery, // 配送
}

impl OrderType {
    /// 转换为字符串标识
    pub fn as_str(&self) -> &str {
        match self {
            OrderType::Pickup => "PICKUP",
            OrderType::Delivery => "DELIVERY",
        }
    }

    /// 从字符串解析（未知值返回 None）
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PICKUP" => Some(OrderType::Pickup),
            "DELIVERY" => Some(OrderType::Delivery),
            _ => None,
        }
    }
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 订单状态 (Order Status)
// ==========================================
// 状态机: PENDING → RECEIVED → PROCESSING → COMPLETED
//         RECEIVED → CANCELLED
// 红线: 状态只沿生命周期图单向推进，COMPLETED/CANCELLED 为终态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,    // 瞬态（落库前即推进到 RECEIVED）
    Received,   // 已接收
    Processing, // 履约中
    Completed,  // 已完成（终态）
    Cancelled,  // 已取消（终态）
}

impl OrderStatus {
    pub fn as_str(&self) -> &str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Received => "RECEIVED",
            OrderStatus::Processing => "PROCESSING",
            OrderStatus::Completed => "COMPLETED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(OrderStatus::Pending),
            "RECEIVED" => Some(OrderStatus::Received),
            "PROCESSING" => Some(OrderStatus::Processing),
            "COMPLETED" => Some(OrderStatus::Completed),
            "CANCELLED" => Some(OrderStatus::Cancelled),
            _ => None,
        }
    }

    /// 是否为终态
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 温区 (Temperature Zone)
// ==========================================
// 说明: 源数据中温区为自由字符串；解析时未知/空值统一落到 AMBIENT
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TemperatureZone {
    #[default]
    Ambient, // 常温
    Chilled, // 冷藏
    Frozen,  // 冷冻
}

impl TemperatureZone {
    pub fn as_str(&self) -> &str {
        match self {
            TemperatureZone::Ambient => "AMBIENT",
            TemperatureZone::Chilled => "CHILLED",
            TemperatureZone::Frozen => "FROZEN",
        }
    }

    /// 从字符串解析，未知或空值回落到 AMBIENT
    pub fn parse_or_default(s: &str) -> Self {
        match s.trim() {
            "CHILLED" => TemperatureZone::Chilled,
            "FROZEN" => TemperatureZone::Frozen,
            _ => TemperatureZone::Ambient,
        }
    }
}

impl fmt::Display for TemperatureZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 库存操作 (Inventory Operation)
// ==========================================
// 消息载荷中的操作名为字符串；台账消费侧解析，未知操作记日志后跳过
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InventoryOperation {
    Reserve,   // 预占（软占用，降低可用量不减在库量）
    Release,   // 释放预占
    Deduct,    // 扣减（优先走预占，剩余部分扣在库量）
    Replenish, // 补货
}

impl InventoryOperation {
    pub fn as_str(&self) -> &str {
        match self {
            InventoryOperation::Reserve => "RESERVE",
            InventoryOperation::Release => "RELEASE",
            InventoryOperation::Deduct => "DEDUCT",
            InventoryOperation::Replenish => "REPLENISH",
        }
    }

    /// 从操作名解析（未知操作返回 None，由调用方记日志跳过）
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "RESERVE" => Some(InventoryOperation::Reserve),
            "RELEASE" => Some(InventoryOperation::Release),
            "DEDUCT" => Some(InventoryOperation::Deduct),
            "REPLENISH" => Some(InventoryOperation::Replenish),
            _ => None,
        }
    }
}

impl fmt::Display for InventoryOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 处理结果状态 (Processed Status)
// ==========================================
// order.processed 消息中的状态字段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessedStatus {
    Processing, // 履约中
    Completed,  // 成功
    Failed,     // 失败（业务拒绝）
}

impl ProcessedStatus {
    pub fn as_str(&self) -> &str {
        match self {
            ProcessedStatus::Processing => "PROCESSING",
            ProcessedStatus::Completed => "COMPLETED",
            ProcessedStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for ProcessedStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

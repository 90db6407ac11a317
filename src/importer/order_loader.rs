// ==========================================
// 仓储履约模拟系统 - 订单种子装载器
// ==========================================
// 职责: 解析订单种子 CSV → 按 order_id 归组 → 构造订单释放消息
// 说明: 一行一条订单行；同一 order_id 的多行合并为一张多行订单，
//       行序保持文件行序；坏行/坏组记日志后跳过
// ==========================================

use crate::domain::order::{OrderLine, RawOrderRecord};
use crate::domain::types::{OrderType, TemperatureZone};
use crate::engine::events::OrderReceivedMessage;
use crate::importer::error::{ImportError, ImportResult};
use crate::repository::SIM_TIME_FORMAT;
use chrono::NaiveDateTime;
use csv::ReaderBuilder;
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;
use tracing::{info, warn};

// ==========================================
// OrderSeedLoader - 订单种子装载器
// ==========================================
pub struct OrderSeedLoader;

impl OrderSeedLoader {
    /// 解析订单种子 CSV
    ///
    /// 表头: ORDER_ID, ORDER_TYPE, ORDER_PLACED_TIME, ORDER_DUE_TIME,
    ///       CUSTOMER_ID, SKU, QUANTITY, TEMPERATURE_ZONE
    ///
    /// 反序列化失败的行记日志后跳过
    pub fn load_from_csv(path: &Path) -> ImportResult<Vec<RawOrderRecord>> {
        if !path.exists() {
            return Err(ImportError::FileNotFound(path.display().to_string()));
        }
        if let Some(ext) = path.extension() {
            if ext != "csv" {
                return Err(ImportError::UnsupportedFormat(
                    ext.to_string_lossy().to_string(),
                ));
            }
        }

        let file = File::open(path)?;
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(file);

        let mut records = Vec::new();
        for (idx, result) in reader.deserialize::<RawOrderRecord>().enumerate() {
            match result {
                Ok(record) => records.push(record),
                Err(e) => {
                    // 表头占第 1 行，数据从第 2 行起
                    warn!(row = idx + 2, error = %e, "订单种子行解析失败，跳过");
                }
            }
        }

        info!(
            file = %path.display(),
            rows = records.len(),
            "订单种子文件解析完成"
        );
        Ok(records)
    }

    /// 按 order_id 归组并构造订单释放消息
    ///
    /// - 组内首行提供订单头字段，全部行依次转为订单行
    /// - 订单类型未知、时间不可解析的组整组跳过
    /// - 数量非正的行单行跳过；组内全部行被跳过则整组跳过
    pub fn group_into_messages(records: Vec<RawOrderRecord>) -> Vec<OrderReceivedMessage> {
        // 归组时保持首次出现顺序
        let mut group_order: Vec<String> = Vec::new();
        let mut groups: HashMap<String, Vec<RawOrderRecord>> = HashMap::new();
        for record in records {
            let order_id = record.order_id.trim().to_string();
            if order_id.is_empty() {
                warn!("订单种子行缺少 ORDER_ID，跳过");
                continue;
            }
            let bucket = groups.entry(order_id.clone()).or_insert_with(|| {
                group_order.push(order_id.clone());
                Vec::new()
            });
            bucket.push(record);
        }

        let mut messages = Vec::new();
        for order_id in group_order {
            let group = match groups.remove(&order_id) {
                Some(g) if !g.is_empty() => g,
                _ => continue,
            };
            match Self::build_message(&order_id, group) {
                Some(msg) => messages.push(msg),
                None => {
                    warn!(order_id = %order_id, "订单组构造失败，整组跳过");
                }
            }
        }

        info!(orders = messages.len(), "订单释放消息构造完成");
        messages
    }

    /// 由一组种子行构造一条订单释放消息
    fn build_message(order_id: &str, group: Vec<RawOrderRecord>) -> Option<OrderReceivedMessage> {
        let first = &group[0];

        let order_type = match OrderType::parse(first.order_type.trim()) {
            Some(t) => t,
            None => {
                warn!(order_id = %order_id, order_type = %first.order_type, "未知订单类型");
                return None;
            }
        };
        let placed_time = parse_seed_time(&first.order_placed_time)?;
        let due_time = parse_seed_time(&first.order_due_time)?;
        let customer_id = {
            let c = first.customer_id.trim();
            if c.is_empty() { None } else { Some(c.to_string()) }
        };

        let mut lines = Vec::new();
        for record in &group {
            if record.quantity <= 0 {
                warn!(
                    order_id = %order_id,
                    sku = %record.sku,
                    quantity = record.quantity,
                    "订单行数量非正，跳过该行"
                );
                continue;
            }
            lines.push(OrderLine {
                sku: record.sku.trim().to_string(),
                quantity: record.quantity,
                temperature_zone: TemperatureZone::parse_or_default(&record.temperature_zone),
            });
        }
        if lines.is_empty() {
            return None;
        }

        Some(OrderReceivedMessage {
            order_id: order_id.to_string(),
            order_type,
            placed_time,
            due_time,
            customer_id,
            lines,
            sender_id: None, // 注入器发布时统一填写
        })
    }
}

/// 解析种子时间字段（ISO 本地时间）
fn parse_seed_time(s: &str) -> Option<NaiveDateTime> {
    match NaiveDateTime::parse_from_str(s.trim(), SIM_TIME_FORMAT) {
        Ok(t) => Some(t),
        Err(e) => {
            warn!(value = %s, error = %e, "种子时间字段解析失败");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(
        order_id: &str,
        order_type: &str,
        placed: &str,
        sku: &str,
        quantity: i32,
        zone: &str,
    ) -> RawOrderRecord {
        RawOrderRecord {
            order_id: order_id.to_string(),
            order_type: order_type.to_string(),
            order_placed_time: placed.to_string(),
            order_due_time: "2024-01-13T12:00:00".to_string(),
            customer_id: "CUST-1".to_string(),
            sku: sku.to_string(),
            quantity,
            temperature_zone: zone.to_string(),
        }
    }

    #[test]
    fn test_group_merges_rows_preserving_line_order() {
        let records = vec![
            raw("ORD-1", "PICKUP", "2024-01-13T08:30:00", "SKU-A", 2, "AMBIENT"),
            raw("ORD-2", "DELIVERY", "2024-01-13T09:00:00", "SKU-B", 1, ""),
            raw("ORD-1", "PICKUP", "2024-01-13T08:30:00", "SKU-C", 4, "FROZEN"),
        ];

        let messages = OrderSeedLoader::group_into_messages(records);
        assert_eq!(messages.len(), 2);

        let ord1 = &messages[0];
        assert_eq!(ord1.order_id, "ORD-1");
        assert_eq!(ord1.lines.len(), 2);
        assert_eq!(ord1.lines[0].sku, "SKU-A");
        assert_eq!(ord1.lines[1].sku, "SKU-C");
        assert_eq!(ord1.lines[1].temperature_zone, TemperatureZone::Frozen);

        let ord2 = &messages[1];
        assert_eq!(ord2.lines[0].temperature_zone, TemperatureZone::Ambient);
    }

    #[test]
    fn test_unknown_order_type_skips_group() {
        let records = vec![
            raw("ORD-BAD", "TELEPORT", "2024-01-13T08:30:00", "SKU-A", 2, ""),
            raw("ORD-OK", "PICKUP", "2024-01-13T08:30:00", "SKU-B", 1, ""),
        ];
        let messages = OrderSeedLoader::group_into_messages(records);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].order_id, "ORD-OK");
    }

    #[test]
    fn test_bad_time_skips_group() {
        let records = vec![raw("ORD-T", "PICKUP", "13/01/2024 08:30", "SKU-A", 2, "")];
        assert!(OrderSeedLoader::group_into_messages(records).is_empty());
    }

    #[test]
    fn test_nonpositive_quantity_skips_line_only() {
        let records = vec![
            raw("ORD-Q", "PICKUP", "2024-01-13T08:30:00", "SKU-A", 0, ""),
            raw("ORD-Q", "PICKUP", "2024-01-13T08:30:00", "SKU-B", 3, ""),
        ];
        let messages = OrderSeedLoader::group_into_messages(records);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].lines.len(), 1);
        assert_eq!(messages[0].lines[0].sku, "SKU-B");
    }

    #[test]
    fn test_all_lines_invalid_skips_order() {
        let records = vec![raw("ORD-Z", "PICKUP", "2024-01-13T08:30:00", "SKU-A", -1, "")];
        assert!(OrderSeedLoader::group_into_messages(records).is_empty());
    }
}

// ==========================================
// 仓储履约模拟系统 - 库存种子装载器
// ==========================================
// 职责: 解析库存种子 CSV，逐行经库存台账建档
// 说明: 种子文件缺失只告警（未知 SKU 会在引用时懒建档）；
//       缺省字段按默认值补齐
// ==========================================

use crate::domain::inventory::RawInventoryRecord;
use crate::domain::types::TemperatureZone;
use crate::engine::ledger::InventoryLedger;
use crate::importer::error::{ImportError, ImportResult};
use csv::ReaderBuilder;
use std::fs::File;
use std::path::Path;
use tracing::{debug, info, warn};

// ==========================================
// InventorySeedLoader - 库存种子装载器
// ==========================================
pub struct InventorySeedLoader;

impl InventorySeedLoader {
    /// 解析库存种子 CSV
    ///
    /// 表头: SKU, NAME, QUANTITY, TEMPERATURE_ZONE, LOW_STOCK_THRESHOLD
    pub fn load_from_csv(path: &Path) -> ImportResult<Vec<RawInventoryRecord>> {
        if !path.exists() {
            return Err(ImportError::FileNotFound(path.display().to_string()));
        }

        let file = File::open(path)?;
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(file);

        let mut records = Vec::new();
        for (idx, result) in reader.deserialize::<RawInventoryRecord>().enumerate() {
            match result {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!(row = idx + 2, error = %e, "库存种子行解析失败，跳过");
                }
            }
        }

        info!(
            file = %path.display(),
            rows = records.len(),
            "库存种子文件解析完成"
        );
        Ok(records)
    }

    /// 将种子行写入库存台账（缺省字段按默认值补齐）
    ///
    /// # 返回
    /// - 成功建档的 SKU 数
    pub fn seed_ledger(
        records: Vec<RawInventoryRecord>,
        ledger: &InventoryLedger,
        default_quantity: i32,
        default_threshold: i32,
    ) -> usize {
        let mut seeded = 0;
        for record in records {
            let sku = record.sku.trim().to_string();
            if sku.is_empty() {
                warn!("库存种子行缺少 SKU，跳过");
                continue;
            }

            let name = record
                .name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| format!("Item {}", sku));
            let quantity = record.quantity.unwrap_or(default_quantity);
            let zone = record
                .temperature_zone
                .as_deref()
                .map(TemperatureZone::parse_or_default)
                .unwrap_or_default();
            let threshold = record.low_stock_threshold.unwrap_or(default_threshold);

            match ledger.seed_item(&sku, Some(name), quantity, zone, threshold) {
                Ok(_) => {
                    seeded += 1;
                    debug!(sku = %sku, quantity = quantity, zone = %zone, "库存种子建档");
                }
                Err(e) => {
                    warn!(sku = %sku, error = %e, "库存种子建档失败，跳过");
                }
            }
        }

        info!(seeded = seeded, "库存种子装载完成");
        seeded
    }
}

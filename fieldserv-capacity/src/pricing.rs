use crate::model::PricingType;
use fieldserv_shared::EquipmentItem;
use serde::{Deserialize, Serialize};

/// Price constants. Amounts are whole currency units (TWD).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingConfig {
    /// Flat fee for the first maintained unit
    pub maintenance_base_fee: i64,
    /// Fee for each unit beyond the first
    pub maintenance_per_unit_fee: i64,
    /// Repair call-out inside the low-travel-cost region
    pub repair_local_fee: i64,
    /// Repair call-out everywhere else
    pub repair_remote_fee: i64,
    /// Address substrings that mark the low-travel-cost region
    pub local_region_keywords: Vec<String>,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            maintenance_base_fee: 2000,
            maintenance_per_unit_fee: 1000,
            repair_local_fee: 500,
            repair_remote_fee: 1000,
            local_region_keywords: vec!["台北".to_string(), "新北".to_string()],
        }
    }
}

/// Pure, deterministic, total: never fails, no side effects. The output is
/// fixed on the order at creation time and never recomputed.
pub struct PricingCalculator {
    config: PricingConfig,
}

impl PricingCalculator {
    pub fn new(config: PricingConfig) -> Self {
        Self { config }
    }

    pub fn price(
        &self,
        pricing_type: PricingType,
        unit_count: u32,
        equipment: &[EquipmentItem],
        address: &str,
    ) -> i64 {
        match pricing_type {
            PricingType::Equipment => equipment.iter().map(EquipmentItem::line_total).sum(),
            PricingType::UnitCount => {
                self.config.maintenance_base_fee
                    + unit_count.saturating_sub(1) as i64 * self.config.maintenance_per_unit_fee
            }
            PricingType::Location => {
                if self.is_local_region(address) {
                    self.config.repair_local_fee
                } else {
                    self.config.repair_remote_fee
                }
            }
        }
    }

    fn is_local_region(&self, address: &str) -> bool {
        self.config
            .local_region_keywords
            .iter()
            .any(|keyword| address.contains(keyword.as_str()))
    }
}

impl Default for PricingCalculator {
    fn default() -> Self {
        Self::new(PricingConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn equipment_line(unit_price: i64, quantity: u32) -> EquipmentItem {
        EquipmentItem {
            name: "分離式冷氣".to_string(),
            model: "CS-28".to_string(),
            unit_price,
            quantity,
        }
    }

    #[test]
    fn installation_sums_equipment_lines() {
        let calc = PricingCalculator::default();
        let lines = vec![equipment_line(18000, 2), equipment_line(25000, 1)];
        assert_eq!(calc.price(PricingType::Equipment, 3, &lines, "台中市"), 61000);
        // No equipment lines means nothing to charge
        assert_eq!(calc.price(PricingType::Equipment, 3, &[], "台中市"), 0);
    }

    #[test]
    fn maintenance_charges_base_plus_extras() {
        let calc = PricingCalculator::default();
        assert_eq!(calc.price(PricingType::UnitCount, 1, &[], ""), 2000);
        assert_eq!(calc.price(PricingType::UnitCount, 3, &[], ""), 4000);
        // unit_count of zero never goes below the base fee
        assert_eq!(calc.price(PricingType::UnitCount, 0, &[], ""), 2000);
    }

    #[test]
    fn repair_fee_depends_on_region() {
        let calc = PricingCalculator::default();
        assert_eq!(calc.price(PricingType::Location, 1, &[], "台北市中山區"), 500);
        assert_eq!(calc.price(PricingType::Location, 1, &[], "新北市板橋區"), 500);
        assert_eq!(calc.price(PricingType::Location, 1, &[], "高雄市左營區"), 1000);
    }

    #[test]
    fn pricing_is_deterministic() {
        let calc = PricingCalculator::default();
        let first = calc.price(PricingType::UnitCount, 2, &[], "台南市");
        let second = calc.price(PricingType::UnitCount, 2, &[], "台南市");
        assert_eq!(first, second);
        assert_eq!(first, 3000);
    }
}

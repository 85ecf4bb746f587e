//! Sales figures for the back-office insights page.

use std::collections::{BTreeMap, HashMap};

use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::aggregates::order::{Order, OrderLine};

const TOP_PRODUCTS: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductVolume { pub product_id: Uuid, pub name: String, pub volume_m3: Decimal }

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderStats {
    pub order_count: usize,
    pub by_status: BTreeMap<String, usize>,
    pub revenue: Decimal,
    pub average_order_value: Decimal,
    pub volume_by_grade: BTreeMap<String, Decimal>,
    pub top_products: Vec<ProductVolume>,
}

impl OrderStats {
    /// Revenue and volumes only count orders whose payment was captured.
    pub fn from_orders(orders: &[Order], lines: &[OrderLine]) -> Self {
        let mut by_status = BTreeMap::new();
        for o in orders { *by_status.entry(o.status.as_str().to_string()).or_insert(0) += 1; }

        let paid: HashMap<Uuid, &Order> = orders.iter().filter(|o| o.status.counts_as_revenue()).map(|o| (o.id, o)).collect();
        let revenue: Decimal = paid.values().map(|o| o.total).sum();
        let average_order_value = if paid.is_empty() { Decimal::ZERO } else { (revenue / Decimal::from(paid.len())).round_dp(2) };

        let mut volume_by_grade = BTreeMap::new();
        let mut per_product: HashMap<Uuid, ProductVolume> = HashMap::new();
        for line in lines.iter().filter(|l| paid.contains_key(&l.order_id)) {
            *volume_by_grade.entry(line.grade.to_string()).or_insert(Decimal::ZERO) += line.quantity_m3;
            per_product.entry(line.product_id)
                .or_insert_with(|| ProductVolume { product_id: line.product_id, name: line.product_name.clone(), volume_m3: Decimal::ZERO })
                .volume_m3 += line.quantity_m3;
        }
        let mut top_products: Vec<ProductVolume> = per_product.into_values().collect();
        top_products.sort_by(|a, b| b.volume_m3.cmp(&a.volume_m3).then_with(|| a.name.cmp(&b.name)));
        top_products.truncate(TOP_PRODUCTS);

        Self { order_count: orders.len(), by_status, revenue, average_order_value, volume_by_grade, top_products }
    }

    /// Plain-text digest handed to the text model.
    pub fn digest(&self, currency: &str, days: u32) -> String {
        let mut out = format!(
            "Last {days} days: {} orders, revenue {currency} {:.2}, average order {currency} {:.2}.\n",
            self.order_count, self.revenue, self.average_order_value
        );
        let statuses: Vec<String> = self.by_status.iter().map(|(s, n)| format!("{s}={n}")).collect();
        out.push_str(&format!("Orders by status: {}.\n", statuses.join(", ")));
        let grades: Vec<String> = self.volume_by_grade.iter().map(|(g, v)| format!("{g}: {v} m3")).collect();
        out.push_str(&format!("Volume sold by grade: {}.\n", grades.join(", ")));
        for p in &self.top_products { out.push_str(&format!("- {} sold {} m3\n", p.name, p.volume_m3)); }
        out
    }
}

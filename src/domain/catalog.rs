//! Catalog browsing, side-by-side comparison and recommendations.
//!
//! The catalog of a ready-mix plant is a few dozen grades, so everything here
//! works on in-memory slices of already-loaded active products.

use std::cmp::Ordering;
use std::collections::HashSet;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::aggregates::product::Product;
use crate::domain::value_objects::{DeliveryMethod, Grade};
use crate::pagination::{ListParams, PaginatedResponse};

pub const MIN_COMPARE: usize = 2;
pub const MAX_COMPARE: usize = 4;
pub const DEFAULT_RECOMMENDATIONS: usize = 4;
pub const MAX_RECOMMENDATIONS: usize = 12;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder { #[default] Newest, PriceAsc, PriceDesc, StrengthAsc, StrengthDesc, Name }

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductQuery {
    pub search: Option<String>,
    pub grade_class: Option<String>,
    pub min_strength: Option<u16>,
    pub max_strength: Option<u16>,
    pub delivery_method: Option<DeliveryMethod>,
    pub max_price: Option<Decimal>,
    #[serde(default)]
    pub in_stock: bool,
    #[serde(default)]
    pub sort: SortOrder,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl ProductQuery {
    fn method(&self) -> DeliveryMethod { self.delivery_method.unwrap_or_default() }

    fn matches(&self, p: &Product) -> bool {
        let search = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(str::to_lowercase);
        if let Some(term) = search {
            let grade = p.grade.to_string().to_lowercase();
            let in_text = p.name.to_lowercase().contains(&term)
                || p.description.as_deref().is_some_and(|d| d.to_lowercase().contains(&term))
                || p.tags.iter().any(|t| t.to_lowercase() == term);
            if !in_text && grade != term { return false; }
        }
        if let Some(class) = self.grade_class.as_deref().and_then(|c| c.trim().chars().next()) {
            if !p.grade.class().eq_ignore_ascii_case(&class) { return false; }
        }
        let strength = p.grade.strength_mpa();
        if self.min_strength.is_some_and(|min| strength < min) { return false; }
        if self.max_strength.is_some_and(|max| strength > max) { return false; }
        if self.max_price.is_some_and(|max| p.prices.get(self.method()) > max) { return false; }
        if self.in_stock && !p.is_purchasable() { return false; }
        true
    }

    fn compare(&self, a: &Product, b: &Product) -> Ordering {
        let m = self.method();
        match self.sort {
            SortOrder::Newest => b.created_at.cmp(&a.created_at),
            SortOrder::PriceAsc => a.prices.get(m).cmp(&b.prices.get(m)),
            SortOrder::PriceDesc => b.prices.get(m).cmp(&a.prices.get(m)),
            SortOrder::StrengthAsc => a.grade.strength_mpa().cmp(&b.grade.strength_mpa()),
            SortOrder::StrengthDesc => b.grade.strength_mpa().cmp(&a.grade.strength_mpa()),
            SortOrder::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
        }
        .then_with(|| a.name.cmp(&b.name))
    }

    pub fn list_params(&self) -> ListParams { ListParams { page: self.page, per_page: self.per_page } }

    /// Filters, sorts and pages active products.
    pub fn apply(&self, catalog: Vec<Product>) -> PaginatedResponse<Product> {
        let mut hits: Vec<Product> = catalog.into_iter().filter(|p| p.is_active() && self.matches(p)).collect();
        hits.sort_by(|a, b| self.compare(a, b));
        PaginatedResponse::from_vec(hits, &self.list_params())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompareError {
    #[error("compare between 2 and 4 distinct products")]
    WrongCount,
    #[error("product {0} is not available")]
    Missing(Uuid),
}

#[derive(Debug, Serialize)]
pub struct ComparisonRow {
    pub product_id: Uuid,
    pub name: String,
    pub grade: Grade,
    pub prices: crate::domain::aggregates::product::DeliveryPrices,
    pub stock_m3: Decimal,
    pub in_stock: bool,
}

#[derive(Debug, Serialize)]
pub struct Comparison {
    pub rows: Vec<ComparisonRow>,
    pub cheapest_normal: Uuid,
    pub cheapest_pump: Uuid,
    pub cheapest_tremie: Uuid,
    pub strongest: Uuid,
    pub most_stock: Uuid,
}

/// Distinct ids, in request order.
pub fn validate_compare_ids(ids: &[Uuid]) -> Result<Vec<Uuid>, CompareError> {
    let mut seen = HashSet::new();
    let unique: Vec<Uuid> = ids.iter().copied().filter(|id| seen.insert(*id)).collect();
    if !(MIN_COMPARE..=MAX_COMPARE).contains(&unique.len()) { return Err(CompareError::WrongCount); }
    Ok(unique)
}

pub fn compare(ids: &[Uuid], catalog: &[Product]) -> Result<Comparison, CompareError> {
    let ids = validate_compare_ids(ids)?;
    let products = ids.iter()
        .map(|id| catalog.iter().find(|p| p.id == *id && p.is_active()).ok_or(CompareError::Missing(*id)))
        .collect::<Result<Vec<_>, _>>()?;

    let best = |key: &dyn Fn(&Product) -> Decimal, lowest: bool| -> Uuid {
        let pick = products.iter().copied().reduce(|acc, p| {
            let better = if lowest { key(p) < key(acc) } else { key(p) > key(acc) };
            if better { p } else { acc }
        });
        pick.map(|p| p.id).unwrap_or_default()
    };

    Ok(Comparison {
        cheapest_normal: best(&|p: &Product| p.prices.get(DeliveryMethod::Normal), true),
        cheapest_pump: best(&|p: &Product| p.prices.get(DeliveryMethod::Pump), true),
        cheapest_tremie: best(&|p: &Product| p.prices.get(DeliveryMethod::Tremie), true),
        strongest: best(&|p: &Product| Decimal::from(p.grade.strength_mpa()), false),
        most_stock: best(&|p: &Product| p.stock_m3, false),
        rows: products.iter().map(|p| ComparisonRow {
            product_id: p.id, name: p.name.clone(), grade: p.grade, prices: p.prices.clone(),
            stock_m3: p.stock_m3, in_stock: p.is_purchasable(),
        }).collect(),
    })
}

/// Purchasable alternatives ranked by closeness of grade strength, then same
/// grade class, then price.
pub fn recommend<'a>(target: &Product, catalog: &'a [Product], limit: Option<usize>) -> Vec<&'a Product> {
    let limit = limit.unwrap_or(DEFAULT_RECOMMENDATIONS).clamp(1, MAX_RECOMMENDATIONS);
    let mut candidates: Vec<&Product> = catalog.iter().filter(|p| p.id != target.id && p.is_purchasable()).collect();
    let key = |p: &Product| {
        let distance = p.grade.strength_mpa().abs_diff(target.grade.strength_mpa());
        let other_class = p.grade.class() != target.grade.class();
        (distance, other_class, p.prices.price_normal)
    };
    candidates.sort_by(|a, b| key(*a).cmp(&key(*b)).then_with(|| a.name.cmp(&b.name)));
    candidates.truncate(limit);
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::product::sample_product;

    fn catalog() -> Vec<Product> {
        vec![
            sample_product("Ready Mix N20", "N20", 220),
            sample_product("Ready Mix N25", "N25", 230),
            sample_product("Ready Mix N30", "N30", 245),
            sample_product("Sulphate Resistant S30", "S30", 290),
            sample_product("Lean Mix N10", "N10", 180),
        ]
    }

    #[test]
    fn test_filter_and_sort() {
        let q = ProductQuery { grade_class: Some("n".into()), min_strength: Some(20), sort: SortOrder::PriceDesc, ..Default::default() };
        let page = q.apply(catalog());
        let names: Vec<_> = page.data.iter().map(|p| p.grade.to_string()).collect();
        assert_eq!(names, ["N30", "N25", "N20"]);
        assert_eq!(page.total, 3);
    }

    #[test]
    fn test_search_by_grade_and_price_cap() {
        let q = ProductQuery { search: Some("s30".into()), ..Default::default() };
        assert_eq!(q.apply(catalog()).data[0].name, "Sulphate Resistant S30");

        let q = ProductQuery { delivery_method: Some(DeliveryMethod::Pump), max_price: Some(Decimal::new(255, 0)), sort: SortOrder::PriceAsc, ..Default::default() };
        let grades: Vec<_> = q.apply(catalog()).data.iter().map(|p| p.grade.to_string()).collect();
        assert_eq!(grades, ["N10", "N20"]);
    }

    #[test]
    fn test_inactive_products_are_hidden() {
        let mut items = catalog();
        items[0].archive();
        let page = ProductQuery::default().apply(items);
        assert_eq!(page.total, 4);
    }

    #[test]
    fn test_compare() {
        let items = catalog();
        let ids = [items[1].id, items[3].id, items[1].id];
        let cmp = compare(&ids, &items).unwrap();
        assert_eq!(cmp.rows.len(), 2);
        assert_eq!(cmp.cheapest_normal, items[1].id);
        assert_eq!(cmp.strongest, items[3].id);
        assert_eq!(compare(&[items[0].id], &items).unwrap_err(), CompareError::WrongCount);
        let stranger = Uuid::now_v7();
        assert_eq!(compare(&[items[0].id, stranger], &items).unwrap_err(), CompareError::Missing(stranger));
    }

    #[test]
    fn test_recommend_closest_strength_first() {
        let items = catalog();
        let picks = recommend(&items[1], &items, Some(3));
        let grades: Vec<_> = picks.iter().map(|p| p.grade.to_string()).collect();
        // N25 -> N20 and N30 are 5 MPa away, N20 is cheaper; S30 also 5 MPa but other class
        assert_eq!(grades, ["N20", "N30", "S30"]);
    }

    #[test]
    fn test_recommend_skips_out_of_stock() {
        let mut items = catalog();
        items[0].stock_m3 = Decimal::ZERO;
        let picks = recommend(&items[1], &items, None);
        assert!(picks.iter().all(|p| p.id != items[0].id));
        assert_eq!(picks.len(), 3);
    }
}

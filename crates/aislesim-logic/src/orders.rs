//! Orders, demand weights and synthetic order generation.
//!
//! The historical order-frequency catalogue says how often each product
//! category is ordered. It drives two things: the demand weights the layout
//! optimizer sorts zones by, and seeded synthetic order batches for the
//! simulator.
//!
//! ```
//! use aislesim_logic::orders::{generate_orders, OrderCatalogue};
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//!
//! let catalogue = OrderCatalogue::default();
//! let mut rng = StdRng::seed_from_u64(7);
//! let orders = generate_orders(20, &["packaged-food", "toys-games"], &catalogue, &mut rng);
//! assert_eq!(orders.len(), 20);
//! assert_eq!(orders[0].id, 1);
//! ```

use rand::distributions::WeightedIndex;
use rand::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A request to pick one product category and ship it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Order {
    pub id: u32,
    pub category: String,
    /// Display only; routing ignores it.
    #[serde(default)]
    pub product: String,
}

impl Order {
    pub fn new(id: u32, category: impl Into<String>, product: impl Into<String>) -> Self {
        Self {
            id,
            category: category.into(),
            product: product.into(),
        }
    }
}

/// Historical demand for one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryProfile {
    /// Relative order frequency.
    pub frequency: f64,
    #[serde(default, alias = "popular_products")]
    pub popular_products: Vec<String>,
}

impl CategoryProfile {
    pub fn new(frequency: f64, products: &[&str]) -> Self {
        Self {
            frequency,
            popular_products: products.iter().map(|p| p.to_string()).collect(),
        }
    }
}

/// Order-frequency dataset keyed by category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCatalogue {
    #[serde(alias = "order_frequency")]
    pub order_frequency: BTreeMap<String, CategoryProfile>,
}

impl Default for OrderCatalogue {
    fn default() -> Self {
        let entries = [
            ("mobile-phones", 35.0, ["iPhone", "Samsung", "OnePlus"]),
            ("laptops-tablets", 25.0, ["MacBook", "Dell", "iPad"]),
            ("packaged-food", 50.0, ["Chips", "Biscuits", "Snacks"]),
            ("headphones-accessories", 20.0, ["AirPods", "Sony", "Cases"]),
            ("mens-clothing", 15.0, ["T-shirts", "Jeans", "Shirts"]),
            ("toys-games", 12.0, ["Toys", "Games", "Puzzles"]),
            ("pet-supplies", 8.0, ["Pet Food", "Toys", "Beds"]),
            ("kitchen-appliances", 5.0, ["Microwave", "Blender", "Toaster"]),
        ];
        Self {
            order_frequency: entries
                .iter()
                .map(|(name, freq, products)| {
                    (name.to_string(), CategoryProfile::new(*freq, products))
                })
                .collect(),
        }
    }
}

impl OrderCatalogue {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Share of total frequency per category, in percent.
    ///
    /// Empty when the catalogue is empty or its frequencies sum to zero.
    pub fn category_frequencies(&self) -> BTreeMap<String, f64> {
        let total: f64 = self
            .order_frequency
            .values()
            .map(|p| p.frequency.max(0.0))
            .sum();
        if total <= 0.0 {
            return BTreeMap::new();
        }
        self.order_frequency
            .iter()
            .map(|(name, p)| (name.clone(), p.frequency.max(0.0) / total * 100.0))
            .collect()
    }

    /// Raw frequencies as optimizer demand weights.
    pub fn demand_weights(&self) -> DemandWeights {
        DemandWeights::from_pairs(
            self.order_frequency
                .iter()
                .map(|(name, p)| (name.clone(), p.frequency)),
        )
    }

    pub fn profile(&self, category: &str) -> Option<&CategoryProfile> {
        self.order_frequency.get(category)
    }
}

/// Relative demand per category; higher means ordered more often.
///
/// An empty map treats every category as weight 1, and so does a lookup of
/// a category the map does not mention.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DemandWeights(BTreeMap<String, f64>);

impl DemandWeights {
    /// Weight used for categories without an entry.
    pub const DEFAULT_WEIGHT: f64 = 1.0;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        Self(pairs.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Demand observed in an order batch: one unit per order.
    pub fn from_orders(orders: &[Order]) -> Self {
        let mut counts: BTreeMap<String, f64> = BTreeMap::new();
        for order in orders {
            *counts.entry(order.category.clone()).or_default() += 1.0;
        }
        Self(counts)
    }

    pub fn weight(&self, category: &str) -> f64 {
        match self.0.get(category) {
            Some(w) if w.is_finite() && *w >= 0.0 => *w,
            Some(_) => 0.0,
            None => Self::DEFAULT_WEIGHT,
        }
    }
}

/// Generate `count` orders over `available` categories.
///
/// Categories are drawn by catalogue frequency among those that are both
/// available and listed; products come from the category's popular list.
/// When no available category is in the catalogue every category is equally
/// likely and products are named `Product {id}`. Ids run `1..=count`.
pub fn generate_orders<S: AsRef<str>>(
    count: usize,
    available: &[S],
    catalogue: &OrderCatalogue,
    rng: &mut impl Rng,
) -> Vec<Order> {
    if count == 0 || available.is_empty() {
        if count > 0 {
            log::warn!("No categories available, generated no orders");
        }
        return Vec::new();
    }

    let listed: Vec<(&str, &CategoryProfile)> = available
        .iter()
        .map(|c| c.as_ref())
        .filter_map(|c| catalogue.profile(c).map(|p| (c, p)))
        .filter(|(_, p)| p.frequency.is_finite() && p.frequency > 0.0)
        .collect();

    let weighted = if listed.is_empty() {
        None
    } else {
        WeightedIndex::new(listed.iter().map(|(_, p)| p.frequency)).ok()
    };

    let Some(dist) = weighted else {
        log::warn!("No catalogue categories match the layout, using uniform order generation");
        return generate_uniform(count, available, rng);
    };

    (1..=count as u32)
        .map(|id| {
            let (category, profile) = listed[dist.sample(rng)];
            let product = profile
                .popular_products
                .choose(rng)
                .cloned()
                .unwrap_or_else(|| format!("Product {}", id));
            Order::new(id, category, product)
        })
        .collect()
}

fn generate_uniform<S: AsRef<str>>(
    count: usize,
    available: &[S],
    rng: &mut impl Rng,
) -> Vec<Order> {
    (1..=count as u32)
        .map(|id| {
            let category = available[rng.gen_range(0..available.len())].as_ref();
            Order::new(id, category, format!("Product {}", id))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;

    #[test]
    fn test_default_catalogue_has_eight_categories() {
        let catalogue = OrderCatalogue::default();
        assert_eq!(catalogue.order_frequency.len(), 8);
        assert_eq!(catalogue.profile("packaged-food").unwrap().frequency, 50.0);
    }

    #[test]
    fn test_frequencies_sum_to_one_hundred() {
        let shares = OrderCatalogue::default().category_frequencies();
        let total: f64 = shares.values().sum();
        assert!((total - 100.0).abs() < 1e-9, "total {total}");
        assert!(shares["packaged-food"] > shares["kitchen-appliances"]);
    }

    #[test]
    fn test_empty_catalogue_has_no_frequencies() {
        let catalogue = OrderCatalogue {
            order_frequency: BTreeMap::new(),
        };
        assert!(catalogue.category_frequencies().is_empty());
    }

    #[test]
    fn test_catalogue_accepts_snake_case_json() {
        let json = r#"{"order_frequency": {
            "books": {"frequency": 3, "popular_products": ["Novel"]}
        }}"#;
        let catalogue = OrderCatalogue::from_json(json).unwrap();
        let books = catalogue.profile("books").unwrap();
        assert_eq!(books.frequency, 3.0);
        assert_eq!(books.popular_products, vec!["Novel".to_string()]);
    }

    #[test]
    fn test_generation_is_deterministic_per_seed() {
        let catalogue = OrderCatalogue::default();
        let cats = ["mobile-phones", "packaged-food", "pet-supplies"];
        let a = generate_orders(50, &cats, &catalogue, &mut StdRng::seed_from_u64(11));
        let b = generate_orders(50, &cats, &catalogue, &mut StdRng::seed_from_u64(11));
        assert_eq!(a, b);
    }

    #[test]
    fn test_ids_are_sequential_and_categories_available() {
        let catalogue = OrderCatalogue::default();
        let cats = ["toys-games", "mens-clothing"];
        let orders = generate_orders(30, &cats, &catalogue, &mut StdRng::seed_from_u64(3));
        for (i, order) in orders.iter().enumerate() {
            assert_eq!(order.id, i as u32 + 1);
            assert!(cats.contains(&order.category.as_str()));
            let products = &catalogue.profile(&order.category).unwrap().popular_products;
            assert!(products.contains(&order.product));
        }
    }

    #[test]
    fn test_frequent_categories_dominate() {
        let catalogue = OrderCatalogue::default();
        let cats = ["packaged-food", "kitchen-appliances"];
        let orders = generate_orders(2000, &cats, &catalogue, &mut StdRng::seed_from_u64(5));
        let food = orders.iter().filter(|o| o.category == "packaged-food").count();
        // Expected share is 50 / 55 ≈ 91%.
        assert!(food > 1500, "packaged-food drew only {food} of 2000");
    }

    #[test]
    fn test_unknown_categories_fall_back_to_uniform() {
        let catalogue = OrderCatalogue::default();
        let cats = ["widgets", "gadgets"];
        let orders = generate_orders(200, &cats, &catalogue, &mut StdRng::seed_from_u64(9));
        assert_eq!(orders.len(), 200);
        assert_eq!(orders[4].product, "Product 5");
        assert!(orders.iter().any(|o| o.category == "widgets"));
        assert!(orders.iter().any(|o| o.category == "gadgets"));
    }

    #[test]
    fn test_no_categories_no_orders() {
        let catalogue = OrderCatalogue::default();
        let none: [&str; 0] = [];
        let mut rng = StdRng::seed_from_u64(1);
        assert!(generate_orders(10, &none, &catalogue, &mut rng).is_empty());
        assert!(generate_orders(0, &["toys-games"], &catalogue, &mut rng).is_empty());
    }

    #[test]
    fn test_demand_weights_default_to_one() {
        let weights = DemandWeights::new();
        assert_eq!(weights.weight("anything"), 1.0);

        let weights = OrderCatalogue::default().demand_weights();
        assert_eq!(weights.weight("mobile-phones"), 35.0);
        assert_eq!(weights.weight("not-listed"), 1.0);
    }

    #[test]
    fn test_demand_weights_from_orders_count_categories() {
        let orders = vec![
            Order::new(1, "A", "a"),
            Order::new(2, "B", "b"),
            Order::new(3, "A", "a"),
        ];
        let weights = DemandWeights::from_orders(&orders);
        assert_eq!(weights.weight("A"), 2.0);
        assert_eq!(weights.weight("B"), 1.0);
    }

    #[test]
    fn test_invalid_weights_count_as_zero() {
        let weights = DemandWeights::from_pairs([("neg", -4.0), ("nan", f64::NAN)]);
        assert_eq!(weights.weight("neg"), 0.0);
        assert_eq!(weights.weight("nan"), 0.0);
    }
}

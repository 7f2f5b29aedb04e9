//! Default exchange-item catalog, seeded when the table is empty

use carx_core::ItemCategory;

/// Compiled-in description of one seedable catalog item
#[derive(Debug, Clone, Copy)]
pub struct CatalogItem {
    pub id: &'static str,
    pub category: ItemCategory,
    pub name: &'static str,
    pub description: &'static str,
    pub xp_cost: i64,
    /// Structured percent for discount items
    pub discount_percent: Option<i64>,
    pub icon: &'static str,
    pub color: &'static str,
}

/// Items inserted on first start
pub const DEFAULT_EXCHANGE_ITEMS: &[CatalogItem] = &[
    CatalogItem {
        id: "discount_5_service",
        category: ItemCategory::Discount,
        name: "5% Service Discount",
        description: "5% off any service booking",
        xp_cost: 150,
        discount_percent: Some(5),
        icon: "percent",
        color: "#4CAF50",
    },
    CatalogItem {
        id: "badge_supporter",
        category: ItemCategory::Badge,
        name: "Supporter Badge",
        description: "Show your support for the CARX community",
        xp_cost: 200,
        discount_percent: None,
        icon: "award",
        color: "#FF9800",
    },
    CatalogItem {
        id: "discount_10_service",
        category: ItemCategory::Discount,
        name: "10% Service Discount",
        description: "10% off any service booking",
        xp_cost: 280,
        discount_percent: Some(10),
        icon: "percent",
        color: "#43A047",
    },
    CatalogItem {
        id: "free_car_wash",
        category: ItemCategory::Service,
        name: "Free Car Wash",
        description: "One free standard car wash",
        xp_cost: 400,
        discount_percent: None,
        icon: "droplets",
        color: "#2196F3",
    },
    CatalogItem {
        id: "free_diagnostics",
        category: ItemCategory::Service,
        name: "Free Diagnostics",
        description: "One free vehicle diagnostics session",
        xp_cost: 550,
        discount_percent: None,
        icon: "wrench",
        color: "#607D8B",
    },
    CatalogItem {
        id: "premium_month",
        category: ItemCategory::Premium,
        name: "Premium Month",
        description: "One month of premium membership",
        xp_cost: 1200,
        discount_percent: None,
        icon: "crown",
        color: "#9C27B0",
    },
];

//! Selection cart: items with quantities.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: String,
    pub name: String,
    pub price: f64,
    pub quantity: i64,
}

#[derive(Debug, Default)]
pub struct CartStore {
    items: RwLock<Vec<CartItem>>,
}

impl CartStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> Vec<CartItem> {
        self.items.read().clone()
    }

    /// Adds one unit; an item already in the cart gets its quantity bumped.
    pub fn add_item(&self, id: &str, name: &str, price: f64) {
        let mut items = self.items.write();
        match items.iter_mut().find(|item| item.id == id) {
            Some(item) => item.quantity += 1,
            None => items.push(CartItem {
                id: id.to_string(),
                name: name.to_string(),
                price,
                quantity: 1,
            }),
        }
    }

    pub fn remove_item(&self, id: &str) {
        self.items.write().retain(|item| item.id != id);
    }

    /// Sets the quantity; zero or less removes the item.
    pub fn update_quantity(&self, id: &str, quantity: i64) {
        let mut items = self.items.write();
        if quantity <= 0 {
            items.retain(|item| item.id != id);
        } else if let Some(item) = items.iter_mut().find(|item| item.id == id) {
            item.quantity = quantity;
        }
    }

    pub fn clear_cart(&self) {
        self.items.write().clear();
    }

    pub fn item_count(&self) -> i64 {
        self.items.read().iter().map(|item| item.quantity).sum()
    }

    pub fn total_price(&self) -> f64 {
        self.items
            .read()
            .iter()
            .map(|item| item.price * item.quantity as f64)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantities_and_totals() {
        let cart = CartStore::new();
        cart.add_item("cam", "Camera", 120.0);
        cart.add_item("cam", "Camera", 120.0);
        cart.add_item("nvr", "Recorder", 300.5);

        assert_eq!(cart.item_count(), 3);
        assert!((cart.total_price() - 540.5).abs() < f64::EPSILON);

        cart.update_quantity("cam", 5);
        assert_eq!(cart.item_count(), 6);

        cart.update_quantity("nvr", 0);
        assert_eq!(cart.items().len(), 1);

        cart.remove_item("cam");
        assert_eq!(cart.item_count(), 0);
    }

    #[test]
    fn clear_empties_cart() {
        let cart = CartStore::new();
        cart.add_item("cam", "Camera", 1.0);
        cart.clear_cart();
        assert!(cart.items().is_empty());
    }
}

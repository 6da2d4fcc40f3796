//! Global order sequencing.
//!
//! Orders are visited once, in a total order:
//! - priority rank (`Urgent` < `High` < `Normal` < `Low`)
//! - due date, earlier first; orders without a due date go last
//! - order identifier as the final tie-break

use chrono::NaiveDateTime;
use std::cmp::Ordering;

use crate::datetime::parse_optional;
use crate::models::Order;

/// Order priority, most urgent first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Priority {
    Urgent,
    High,
    Normal,
    Low,
}

impl Priority {
    /// Case-insensitive parse; anything unknown is `Normal`.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("urgent") => Self::Urgent,
            Some("high") => Self::High,
            Some("low") => Self::Low,
            _ => Self::Normal,
        }
    }

    /// Title Case label used in output rows.
    pub fn label(self) -> &'static str {
        match self {
            Self::Urgent => "Urgent",
            Self::High => "High",
            Self::Normal => "Normal",
            Self::Low => "Low",
        }
    }
}

/// Sort key for order sequencing.
///
/// Implements `Ord` so orders can be sorted (lower = scheduled first).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderSortKey {
    pub priority: Priority,
    pub due_date: Option<NaiveDateTime>,
    pub order_id: String,
}

impl OrderSortKey {
    pub fn for_order(order: &Order) -> Self {
        Self {
            priority: Priority::parse(order.priority.as_deref()),
            due_date: parse_optional(order.due_date.as_deref()),
            order_id: order.id.clone().unwrap_or_default(),
        }
    }
}

/// Present dates first (earlier wins), missing dates last.
fn cmp_due(a: Option<NaiveDateTime>, b: Option<NaiveDateTime>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

impl Ord for OrderSortKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then(cmp_due(self.due_date, other.due_date))
            .then_with(|| self.order_id.cmp(&other.order_id))
    }
}

impl PartialOrd for OrderSortKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Return the orders in visitation order. The sort is stable, so fully
/// identical keys keep their input order.
pub fn sort_orders(orders: &[Order]) -> Vec<&Order> {
    let mut keyed: Vec<(OrderSortKey, &Order)> = orders
        .iter()
        .map(|o| (OrderSortKey::for_order(o), o))
        .collect();
    keyed.sort_by(|a, b| a.0.cmp(&b.0));
    keyed.into_iter().map(|(_, o)| o).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(id: &str, priority: Option<&str>, due: Option<&str>) -> Order {
        Order {
            id: Some(id.to_string()),
            part_number: "PN".to_string(),
            priority: priority.map(str::to_string),
            due_date: due.map(str::to_string),
            ..Default::default()
        }
    }

    fn ids(sorted: &[&Order]) -> Vec<String> {
        sorted.iter().map(|o| o.id.clone().unwrap()).collect()
    }

    #[test]
    fn test_priority_parse() {
        assert_eq!(Priority::parse(Some(" URGENT ")), Priority::Urgent);
        assert_eq!(Priority::parse(Some("high")), Priority::High);
        assert_eq!(Priority::parse(Some("Low")), Priority::Low);
        assert_eq!(Priority::parse(Some("whenever")), Priority::Normal);
        assert_eq!(Priority::parse(None), Priority::Normal);
        assert_eq!(Priority::parse(Some("urgent")).label(), "Urgent");
    }

    #[test]
    fn test_priority_dominates() {
        let orders = vec![
            order("a", Some("low"), Some("2026-01-01")),
            order("b", Some("urgent"), None),
            order("c", None, None),
            order("d", Some("high"), None),
        ];
        assert_eq!(ids(&sort_orders(&orders)), vec!["b", "d", "c", "a"]);
    }

    #[test]
    fn test_due_date_then_missing_last() {
        let orders = vec![
            order("x", None, None),
            order("y", None, Some("2026-03-10")),
            order("z", None, Some("2026-03-01")),
            order("w", None, Some("not a date")),
        ];
        assert_eq!(ids(&sort_orders(&orders)), vec!["z", "y", "w", "x"]);
    }

    #[test]
    fn test_identifier_breaks_ties() {
        let orders = vec![
            order("o-2", Some("normal"), Some("2026-03-01")),
            order("o-1", Some("Normal"), Some("2026-03-01")),
        ];
        assert_eq!(ids(&sort_orders(&orders)), vec!["o-1", "o-2"]);
    }

    #[test]
    fn test_sort_key_ord() {
        let urgent = OrderSortKey::for_order(&order("b", Some("urgent"), None));
        let low = OrderSortKey::for_order(&order("a", Some("low"), Some("2020-01-01")));
        assert!(urgent < low);
    }
}

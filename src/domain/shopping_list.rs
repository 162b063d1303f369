use chrono::NaiveDate;
use serde::Serialize;
use std::fmt::Write;

/// One aggregated line of a shopping list: the total amount of an
/// ingredient across every recipe in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShoppingListItem {
    pub name: String,
    pub measurement_unit: String,
    pub total_amount: i64,
}

/// Renders the downloadable shopping list.
///
/// The first line is `<header>: DD-MM-YYYY`, followed by one
/// `name (unit) - amount` line per item, each terminated by `\n`.
#[must_use]
pub fn render(header: &str, date: NaiveDate, items: &[ShoppingListItem]) -> String {
    let mut out = String::with_capacity(64 + items.len() * 32);
    let _ = writeln!(out, "{header}: {}", date.format("%d-%m-%Y"));

    for item in items {
        let _ = writeln!(
            out,
            "{} ({}) - {}",
            item.name, item.measurement_unit, item.total_amount
        );
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_header_and_lines() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        let items = vec![
            ShoppingListItem {
                name: "Flour".to_string(),
                measurement_unit: "g".to_string(),
                total_amount: 500,
            },
            ShoppingListItem {
                name: "Salt".to_string(),
                measurement_unit: "g".to_string(),
                total_amount: 15,
            },
        ];

        let text = render("Shopping list for recipes", date, &items);

        assert_eq!(
            text,
            "Shopping list for recipes: 09-03-2024\nFlour (g) - 500\nSalt (g) - 15\n"
        );
    }

    #[test]
    fn header_only_for_no_items() {
        let date = NaiveDate::from_ymd_opt(2025, 12, 31).unwrap();
        assert_eq!(render("List", date, &[]), "List: 31-12-2025\n");
    }
}

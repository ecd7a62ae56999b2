use std::collections::HashMap;

use serde::Serialize;

use super::schema::{CartPart, Uuid};

/// Total amount of one ingredient across every recipe in a cart
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShoppingItem {
    pub ingredient_id: Uuid,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i64,
}

/// Sums amounts per ingredient id. Ingredients sharing a name but not a unit
/// are different rows and stay separate. Output is sorted by name, then unit.
pub fn aggregate(parts: Vec<CartPart>) -> Vec<ShoppingItem> {
    let mut totals: HashMap<Uuid, ShoppingItem> = HashMap::new();

    for part in parts.into_iter() {
        match totals.get_mut(&part.ingredient_id) {
            Some(item) => item.amount += i64::from(part.amount),
            None => {
                totals.insert(
                    part.ingredient_id,
                    ShoppingItem {
                        ingredient_id: part.ingredient_id,
                        name: part.name,
                        measurement_unit: part.measurement_unit,
                        amount: part.amount.into(),
                    },
                );
            }
        }
    }

    let mut items: Vec<ShoppingItem> = totals.into_values().collect();
    items.sort_by(|a, b| {
        a.name
            .cmp(&b.name)
            .then_with(|| a.measurement_unit.cmp(&b.measurement_unit))
            .then_with(|| a.ingredient_id.cmp(&b.ingredient_id))
    });
    items
}

pub fn render(items: &[ShoppingItem]) -> String {
    items
        .iter()
        .map(|item| format!("{} ({}) - {}\n", item.name, item.measurement_unit, item.amount))
        .collect()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn part(ingredient_id: Uuid, name: &str, unit: &str, amount: i32) -> CartPart {
        CartPart {
            ingredient_id,
            name: name.to_string(),
            measurement_unit: unit.to_string(),
            amount,
        }
    }

    #[test]
    fn sums_same_ingredient_across_recipes() {
        let items = aggregate(vec![part(1, "Salt", "g", 5), part(1, "Salt", "g", 3)]);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].amount, 8);
        assert_eq!(render(&items), "Salt (g) - 8\n");
    }

    #[test]
    fn keeps_units_apart() {
        let items = aggregate(vec![part(2, "Flour", "g", 200), part(3, "Flour", "kg", 1)]);
        assert_eq!(render(&items), "Flour (g) - 200\nFlour (kg) - 1\n");
    }

    #[test]
    fn sorts_by_name() {
        let items = aggregate(vec![
            part(4, "Water", "ml", 500),
            part(1, "Salt", "g", 5),
            part(5, "Butter", "g", 50),
            part(1, "Salt", "g", 2),
        ]);
        assert_eq!(
            render(&items),
            "Butter (g) - 50\nSalt (g) - 7\nWater (ml) - 500\n"
        );
    }

    #[test]
    fn totals_do_not_overflow_i32() {
        let items = aggregate(vec![
            part(1, "Rice", "g", i32::MAX),
            part(1, "Rice", "g", i32::MAX),
        ]);
        assert_eq!(items[0].amount, 2 * i64::from(i32::MAX));
    }

    #[test]
    fn empty_cart_renders_nothing() {
        assert_eq!(render(&aggregate(vec![])), "");
    }
}

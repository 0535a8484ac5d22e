//! Stock quantities per variant.
//!
//! The API keys stock by string:
//!
//! - sizeless product: `couleur_<index>`, where `index` is the color's position
//!   among the colors with a non-empty name;
//! - sized product: `<color name, trimmed, lowercased>_<size, lowercased>`.
//!
//! Inside a form, quantities are held in a [`StockTable`] keyed by
//! [`ColorKey`] and optional [`Size`]. Wire keys are produced by
//! [`StockTable::encode`] at submission and parsed by [`StockTable::decode`]
//! on load. Entries whose size-ness does not match the product's current mode
//! are kept and sent as-is: switching between sizeless and sized does not
//! migrate or clear quantities.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{ColorKey, Size};

/// Prefix of sizeless stock keys.
pub const SIZELESS_KEY_PREFIX: &str = "couleur_";

/// Stock mapping as sent to and returned by the API.
pub type WireStock = BTreeMap<String, i64>;

/// Key for a sizeless product's color at `color_index`.
#[must_use]
pub fn sizeless_key(color_index: usize) -> String {
    format!("{SIZELESS_KEY_PREFIX}{color_index}")
}

/// Key for one color × size combination.
#[must_use]
pub fn sized_key(color_name: &str, size: Size) -> String {
    format!(
        "{}_{}",
        color_name.trim().to_lowercase(),
        size.label().to_lowercase()
    )
}

/// Compose the wire key for a stock input.
///
/// `color_index` addresses the colors with a non-empty trimmed name. When
/// `sizes` is empty the product is sizeless and `size` is ignored; otherwise
/// `size` is required. Returns `None` if the index or size does not address
/// an input.
#[must_use]
pub fn compose_key<S: AsRef<str>>(
    colors: &[S],
    sizes: &[Size],
    color_index: usize,
    size: Option<Size>,
) -> Option<String> {
    let name = colors
        .iter()
        .map(|c| c.as_ref().trim())
        .filter(|name| !name.is_empty())
        .nth(color_index)?;

    if sizes.is_empty() {
        return Some(sizeless_key(color_index));
    }
    size.filter(|s| sizes.contains(s))
        .map(|s| sized_key(name, s))
}

/// Current quantity under `key`, `0` when absent.
#[must_use]
pub fn quantity(stock: &WireStock, key: &str) -> i64 {
    stock.get(key).copied().unwrap_or(0)
}

/// Coerce a quantity input. Empty or non-numeric input becomes `0`.
///
/// Negative values are passed through; the server enforces non-negativity.
#[must_use]
pub fn coerce_quantity(input: &str) -> i64 {
    input.trim().parse::<i64>().unwrap_or(0)
}

/// Stable address of one stock quantity inside a form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StockSlot {
    pub color: ColorKey,
    pub size: Option<Size>,
}

impl StockSlot {
    #[must_use]
    pub const fn sizeless(color: ColorKey) -> Self {
        Self { color, size: None }
    }

    #[must_use]
    pub const fn sized(color: ColorKey, size: Size) -> Self {
        Self {
            color,
            size: Some(size),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct StockEntry {
    slot: StockSlot,
    quantity: i64,
}

/// One input of the stock grid, as a form would render it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockCell {
    pub slot: StockSlot,
    pub color_name: String,
    pub wire_key: String,
    pub quantity: i64,
}

/// Stock quantities of a product form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockTable {
    entries: Vec<StockEntry>,
    /// Loaded keys that address no current color. Sent back verbatim.
    unresolved: WireStock,
}

impl StockTable {
    /// Quantity stored for `slot`, `0` when never set.
    #[must_use]
    pub fn get(&self, slot: StockSlot) -> i64 {
        self.entries
            .iter()
            .find(|e| e.slot == slot)
            .map_or(0, |e| e.quantity)
    }

    /// Store a quantity for `slot`, replacing any previous value.
    pub fn set(&mut self, slot: StockSlot, quantity: i64) {
        match self.entries.iter_mut().find(|e| e.slot == slot) {
            Some(entry) => entry.quantity = quantity,
            None => self.entries.push(StockEntry { slot, quantity }),
        }
    }

    /// Store a raw user input for `slot`, coerced with [`coerce_quantity`].
    pub fn set_input(&mut self, slot: StockSlot, input: &str) {
        self.set(slot, coerce_quantity(input));
    }

    /// Drop every quantity attached to `color`.
    pub fn remove_color(&mut self, color: ColorKey) {
        self.entries.retain(|e| e.slot.color != color);
    }

    /// Number of stored quantities, unresolved keys included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len() + self.unresolved.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Inputs for the current colors and sizes, rows by color then size.
    ///
    /// `colors` pairs each color's key with its name, in form order.
    #[must_use]
    pub fn cells(&self, colors: &[(ColorKey, &str)], sizes: &[Size]) -> Vec<StockCell> {
        let mut sizes = sizes.to_vec();
        sizes.sort_unstable();
        sizes.dedup();

        named(colors)
            .enumerate()
            .flat_map(|(index, (key, name))| {
                let slots: Vec<(StockSlot, String)> = if sizes.is_empty() {
                    vec![(StockSlot::sizeless(key), sizeless_key(index))]
                } else {
                    sizes
                        .iter()
                        .map(|&size| (StockSlot::sized(key, size), sized_key(name, size)))
                        .collect()
                };
                slots.into_iter().map(move |(slot, wire_key)| StockCell {
                    slot,
                    color_name: name.to_string(),
                    wire_key,
                    quantity: self.get(slot),
                })
            })
            .collect()
    }

    /// Produce the wire mapping for the current color list.
    ///
    /// Quantities of colors no longer in the list, or whose name is blank,
    /// are left out.
    #[must_use]
    pub fn encode(&self, colors: &[(ColorKey, &str)]) -> WireStock {
        let named: Vec<(ColorKey, &str)> = named(colors).collect();
        let mut wire = self.unresolved.clone();

        for entry in &self.entries {
            let Some((index, (_, name))) = named
                .iter()
                .enumerate()
                .find(|(_, (key, _))| *key == entry.slot.color)
            else {
                continue;
            };
            let key = entry
                .slot
                .size
                .map_or_else(|| sizeless_key(index), |size| sized_key(name, size));
            wire.insert(key, entry.quantity);
        }
        wire
    }

    /// Parse a wire mapping against the loaded color list.
    ///
    /// A key resolves only when re-encoding it would produce the same string,
    /// so that an unedited form encodes back to exactly what was loaded.
    #[must_use]
    pub fn decode(stock: &WireStock, colors: &[(ColorKey, &str)]) -> Self {
        let named: Vec<(ColorKey, &str)> = named(colors).collect();
        let mut table = Self::default();

        for (key, &quantity) in stock {
            match resolve(key, &named) {
                Some(slot) => table.set(slot, quantity),
                None => {
                    table.unresolved.insert(key.clone(), quantity);
                }
            }
        }
        table
    }
}

fn named<'a>(colors: &'a [(ColorKey, &'a str)]) -> impl Iterator<Item = (ColorKey, &'a str)> + 'a {
    colors
        .iter()
        .map(|(key, name)| (*key, name.trim()))
        .filter(|(_, name)| !name.is_empty())
}

fn resolve(key: &str, named: &[(ColorKey, &str)]) -> Option<StockSlot> {
    if let Some(index) = key
        .strip_prefix(SIZELESS_KEY_PREFIX)
        .and_then(|rest| rest.parse::<usize>().ok())
    {
        if let Some((color, _)) = named.get(index) {
            if sizeless_key(index) == key {
                return Some(StockSlot::sizeless(*color));
            }
        }
    }

    let (name, size) = key.rsplit_once('_')?;
    let size: Size = size.parse().ok()?;
    named
        .iter()
        .find(|(_, candidate)| candidate.to_lowercase() == name)
        .filter(|(_, candidate)| sized_key(candidate, size) == key)
        .map(|(color, _)| StockSlot::sized(*color, size))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_compose_sizeless() {
        assert_eq!(compose_key(&["Red"], &[], 0, None).as_deref(), Some("couleur_0"));
    }

    #[test]
    fn test_compose_sized() {
        assert_eq!(
            compose_key(&["Red"], &[Size::M], 0, Some(Size::M)).as_deref(),
            Some("red_m")
        );
    }

    #[test]
    fn test_compose_skips_blank_colors() {
        let colors = ["  ", " Navy Blue ", "Green"];
        assert_eq!(compose_key(&colors, &[], 1, None).as_deref(), Some("couleur_1"));
        assert_eq!(
            compose_key(&colors, &[Size::XL], 0, Some(Size::XL)).as_deref(),
            Some("navy blue_xl")
        );
        assert_eq!(compose_key(&colors, &[], 2, None), None);
    }

    #[test]
    fn test_compose_sized_requires_selected_size() {
        assert_eq!(compose_key(&["Red"], &[Size::M], 0, None), None);
        assert_eq!(compose_key(&["Red"], &[Size::M], 0, Some(Size::L)), None);
    }

    #[test]
    fn test_quantity_lookup_and_coercion() {
        let mut stock = WireStock::new();
        stock.insert("red_m".to_string(), 4);
        assert_eq!(quantity(&stock, "red_m"), 4);
        assert_eq!(quantity(&stock, "red_l"), 0);

        assert_eq!(coerce_quantity(""), 0);
        assert_eq!(coerce_quantity("abc"), 0);
        assert_eq!(coerce_quantity(" 12 "), 12);
        assert_eq!(coerce_quantity("-3"), -3);
    }

    #[test]
    fn test_removed_color_keeps_other_quantities_in_place() {
        let red = ColorKey::generate();
        let blue = ColorKey::generate();
        let mut table = StockTable::default();
        table.set(StockSlot::sizeless(red), 3);
        table.set(StockSlot::sizeless(blue), 8);

        table.remove_color(red);
        let wire = table.encode(&[(blue, "Blue")]);
        assert_eq!(wire.len(), 1);
        assert_eq!(wire.get("couleur_0"), Some(&8));
    }

    #[test]
    fn test_mode_switch_preserves_stale_entries() {
        let red = ColorKey::generate();
        let mut table = StockTable::default();
        table.set_input(StockSlot::sizeless(red), "5");
        table.set_input(StockSlot::sized(red, Size::S), "2");

        let wire = table.encode(&[(red, "Red")]);
        assert_eq!(wire.get("couleur_0"), Some(&5));
        assert_eq!(wire.get("red_s"), Some(&2));

        let cells = table.cells(&[(red, "Red")], &[Size::S, Size::M]);
        let keys: Vec<&str> = cells.iter().map(|c| c.wire_key.as_str()).collect();
        assert_eq!(keys, vec!["red_s", "red_m"]);
        assert_eq!(cells[0].quantity, 2);
        assert_eq!(cells[1].quantity, 0);
    }

    #[test]
    fn test_decode_encode_round_trip() {
        let red = ColorKey::generate();
        let dark = ColorKey::generate();
        let colors = [(red, "Red"), (dark, "Dark_Blue")];

        let mut wire = WireStock::new();
        wire.insert("red_m".to_string(), 4);
        wire.insert("dark_blue_xl".to_string(), 1);
        wire.insert("couleur_1".to_string(), 9);
        wire.insert("ghost_s".to_string(), 2);
        wire.insert("couleur_7".to_string(), 6);

        let table = StockTable::decode(&wire, &colors);
        assert_eq!(table.get(StockSlot::sized(red, Size::M)), 4);
        assert_eq!(table.get(StockSlot::sized(dark, Size::XL)), 1);
        assert_eq!(table.get(StockSlot::sizeless(dark)), 9);
        assert_eq!(table.encode(&colors), wire);
    }

    #[test]
    fn test_non_canonical_keys_pass_through() {
        let red = ColorKey::generate();
        let mut wire = WireStock::new();
        wire.insert("RED_M".to_string(), 4);
        wire.insert("couleur_00".to_string(), 1);

        let table = StockTable::decode(&wire, &[(red, "Red")]);
        assert_eq!(table.get(StockSlot::sized(red, Size::M)), 0);
        assert_eq!(table.encode(&[(red, "Red")]), wire);
    }

    #[test]
    fn test_table_serializes_as_json() {
        let red = ColorKey::generate();
        let mut table = StockTable::default();
        table.set(StockSlot::sized(red, Size::L), 7);
        let json = serde_json::to_string(&table).unwrap();
        let back: StockTable = serde_json::from_str(&json).unwrap();
        assert_eq!(back, table);
    }
}

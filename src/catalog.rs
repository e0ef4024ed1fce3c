use crate::{Error, Result};

/// Plant types offered for selection.
pub const PLANT_TYPES: &[&str] = &[
    "Aloe Vera",
    "Apple Tree",
    "Calathea",
    "Cannabis",
    "Citrus Tree",
    "Corn",
    "Cucumber",
    "Dracaena",
    "Fern",
    "Fiddle Leaf Fig",
    "Grape Vine",
    "Monstera",
    "Orchid",
    "Peace Lily",
    "Pepper Plant",
    "Philodendron",
    "Pothos",
    "Rose",
    "Rubber Plant",
    "Snake Plant",
    "Soybean",
    "Spider Plant",
    "Succulent",
    "Tomato",
    "Wheat",
    "Zucchini",
    "ZZ Plant",
    "Fruit Tree (General)",
    "Houseplant (General)",
    "Vegetable (General)",
    "Other / Unknown",
];

/// Canonical catalog label for `name`, matched case-insensitively.
pub fn lookup(name: &str) -> Option<&'static str> {
    let name = name.trim();
    PLANT_TYPES
        .iter()
        .copied()
        .find(|plant| plant.eq_ignore_ascii_case(name))
}

/// Resolves an optional selection: blank means unspecified, anything else
/// must be a catalog entry.
pub fn resolve(plant_type: Option<&str>) -> Result<Option<&'static str>> {
    match plant_type.map(str::trim).filter(|p| !p.is_empty()) {
        None => Ok(None),
        Some(name) => lookup(name)
            .map(Some)
            .ok_or_else(|| Error::validation(format!("Unknown plant type: {name}"))),
    }
}

//! Built-in material presets.
//!
//! Room-temperature handbook values. Lookups ignore case, spaces and
//! underscores, so `"Stainless Steel"`, `"stainless_steel"` and
//! `"stainlesssteel"` all resolve to the same entry.

use crate::material::Material;
use crate::provider::MaterialError;

/// One preset row: name, rho (kg/m³), k (W/(m·K)), cp (J/(kg·K)).
pub type PresetRow = (&'static str, f64, f64, f64);

const PRESETS: &[PresetRow] = &[
    ("Copper", 8960.0, 401.0, 385.0),
    ("Aluminium", 2700.0, 237.0, 897.0),
    ("Iron", 7874.0, 80.4, 449.0),
    ("Stainless Steel", 8000.0, 16.2, 500.0),
    ("Silver", 10490.0, 429.0, 235.0),
    ("Gold", 19300.0, 318.0, 129.0),
    ("Glass", 2500.0, 1.05, 840.0),
    ("Concrete", 2300.0, 1.7, 880.0),
    ("Water", 997.0, 0.6, 4182.0),
];

fn normalise(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

/// All preset rows in display order.
pub fn presets() -> &'static [PresetRow] {
    PRESETS
}

/// Look up a preset by name.
pub fn lookup(name: &str) -> Result<Material, MaterialError> {
    let key = normalise(name);
    PRESETS
        .iter()
        .find(|(preset, ..)| normalise(preset) == key || (key == "aluminum" && *preset == "Aluminium"))
        .map(|&(preset, rho, k, cp)| Material::new(preset, rho, k, cp))
        .unwrap_or_else(|| Err(MaterialError::NotFound(name.to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_lookup_is_forgiving() {
        let steel = lookup("stainless_steel").unwrap();
        assert_eq!(steel.k(), 16.2);
        assert_eq!(lookup("Stainless Steel").unwrap(), steel);
        assert_eq!(lookup("ALUMINUM").unwrap().rho(), 2700.0);
        assert_eq!(lookup("copper").unwrap(), Material::copper());
    }

    #[test]
    fn test_unknown_preset() {
        assert_eq!(lookup("unobtainium"), Err(MaterialError::NotFound("unobtainium".into())));
    }

    #[test]
    fn test_all_presets_are_valid() {
        for &(name, ..) in presets() {
            let m = lookup(name).unwrap();
            assert!(m.alpha() > 0.0, "{name}");
        }
        // Copper diffusivity is about 1.16e-4 m²/s.
        assert_relative_eq!(Material::copper().alpha(), 1.1625e-4, max_relative = 1e-3);
    }
}

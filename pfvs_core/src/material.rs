//! Material labels and the fixed filament profile table.

use std::fmt;

use pfvs_traits::MaterialLabel;

/// Material parsed from a classifier label.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Material {
    Pla,
    Petg,
    Asa,
    /// Anything the profile table does not know, kept verbatim.
    Unknown(String),
}

impl Material {
    /// Case-insensitive, whitespace-trimmed parse. `PET` aliases `PETG`.
    pub fn parse(label: &str) -> Self {
        let trimmed = label.trim();
        match trimmed.to_ascii_uppercase().as_str() {
            "PLA" => Material::Pla,
            "PETG" | "PET" => Material::Petg,
            "ASA" => Material::Asa,
            _ => Material::Unknown(trimmed.to_string()),
        }
    }

    pub fn from_label(label: &MaterialLabel) -> Self {
        Self::parse(label.as_str())
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Material::Unknown(_))
    }
}

impl fmt::Display for Material {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Material::Pla => f.write_str("PLA"),
            Material::Petg => f.write_str("PETG"),
            Material::Asa => f.write_str("ASA"),
            Material::Unknown(s) => write!(f, "unknown({s})"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilamentProfile {
    pub material: Material,
    /// Nozzle temperature in °C.
    pub print_temp_c: u16,
    /// Bed temperature in °C.
    pub bed_temp_c: u16,
    /// Whether this machine may print the material at all.
    pub printable: bool,
}

/// Immutable lookup table built once at startup.
#[derive(Debug, Clone)]
pub struct ProfileTable {
    profiles: Vec<FilamentProfile>,
}

impl ProfileTable {
    /// The machine's built-in table: only PLA is printable.
    pub fn builtin() -> Self {
        let p = |material, print_temp_c, bed_temp_c, printable| FilamentProfile {
            material,
            print_temp_c,
            bed_temp_c,
            printable,
        };
        Self {
            profiles: vec![
                p(Material::Pla, 210, 60, true),
                p(Material::Petg, 240, 85, false),
                p(Material::Asa, 260, 100, false),
            ],
        }
    }

    /// Unknown materials have no profile; there is no fallback entry.
    pub fn lookup(&self, material: &Material) -> Option<&FilamentProfile> {
        self.profiles.iter().find(|p| &p.material == material)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FilamentProfile> {
        self.profiles.iter()
    }
}

impl Default for ProfileTable {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_trimmed_and_case_insensitive() {
        assert_eq!(Material::parse("  pla\n"), Material::Pla);
        assert_eq!(Material::parse("Pet"), Material::Petg);
        assert_eq!(Material::parse(" nylon "), Material::Unknown("nylon".into()));
    }

    #[test]
    fn unknown_has_no_profile() {
        let table = ProfileTable::builtin();
        assert!(table.lookup(&Material::Unknown("TPU".into())).is_none());
        let pla = table.lookup(&Material::Pla).unwrap();
        assert_eq!((pla.print_temp_c, pla.bed_temp_c, pla.printable), (210, 60, true));
    }
}

//! # Building Registry
//!
//! Resolves a free-text address to at most one [`BuildingRecord`]. The
//! advisory commands only see the [`BuildingRegistry`] trait:
//!
//! - `Ok(Some(record))`: the address resolved, the prompt gets a building section.
//! - `Ok(None)`: no match. Not an error; the analysis proceeds sensor-only.
//! - `Err(_)`: the registry could not be asked (transport, credentials). The
//!   invocation aborts.
//!
//! [`http::DawaBbrRegistry`] is the production adapter. Registry codes are
//! translated to labels through the fixed tables in this module.

use crate::error::Result;
use once_cell::sync::Lazy;
use std::collections::HashMap;

pub mod http;

pub trait BuildingRegistry {
    fn lookup(&self, address: &str) -> Result<Option<BuildingRecord>>;
}

/// A secondary building on the same plot (garage, shed, ...).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuxiliaryStructure {
    pub building_number: Option<u32>,
    pub building_type: String,
    pub year_built: Option<u32>,
    pub area: Option<u32>,
    pub material: String,
}

/// Building facts for one address. Areas are in square metres; a negative
/// area in the registry is stored as `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildingRecord {
    pub address: String,
    pub building_number: Option<u32>,
    pub building_type_code: String,
    pub building_type: String,
    pub year_built: Option<u32>,
    pub renovation_year: Option<u32>,
    pub exterior_material: String,
    pub roof_material: String,
    pub total_area: Option<u32>,
    pub residential_area: Option<u32>,
    pub commercial_area: Option<u32>,
    pub built_area: Option<u32>,
    pub basement_area: Option<u32>,
    pub attic_area: Option<u32>,
    pub floors: Option<u32>,
    pub heating: String,
    pub has_elevator: bool,
    pub coordinate: String,
    pub auxiliary: Vec<AuxiliaryStructure>,
    pub last_updated: String,
}

impl BuildingRecord {
    /// Labelled facts in display order, skipping unknown values.
    pub fn facts(&self) -> Vec<(&'static str, String)> {
        let mut facts = Vec::new();
        let mut text = |label: &'static str, value: &str| {
            if !value.is_empty() {
                facts.push((label, value.to_string()));
            }
        };
        text("Building type", &self.building_type);
        if let Some(year) = self.year_built {
            text("Year built", &year.to_string());
        }
        if let Some(year) = self.renovation_year.filter(|y| Some(*y) != self.year_built) {
            text("Renovated", &year.to_string());
        }
        text("Exterior walls", &self.exterior_material);
        text("Roof", &self.roof_material);

        let areas = [
            ("Total building area", self.total_area),
            ("Residential area", self.residential_area),
            ("Commercial area", self.commercial_area),
            ("Built area", self.built_area),
            ("Basement area", self.basement_area),
            ("Attic area", self.attic_area),
        ];
        for (label, area) in areas {
            if let Some(m2) = area {
                facts.push((label, format!("{} m²", m2)));
            }
        }

        if let Some(floors) = self.floors {
            facts.push(("Floors", floors.to_string()));
        }
        if !self.heating.is_empty() {
            facts.push(("Heating", self.heating.clone()));
        }
        facts.push(("Elevator", if self.has_elevator { "yes" } else { "no" }.to_string()));
        if !self.coordinate.is_empty() {
            facts.push(("Coordinate", self.coordinate.clone()));
        }
        facts
    }

    /// Multi-line human summary for the `building` command.
    pub fn summary(&self) -> String {
        let mut out = format!("{}\n", self.address);
        if let Some(number) = self.building_number {
            out.push_str(&format!("Building #{}\n", number));
        }
        for (label, value) in self.facts() {
            out.push_str(&format!("{}: {}\n", label, value));
        }
        if !self.auxiliary.is_empty() {
            out.push_str(&format!("Additional buildings: {}\n", self.auxiliary.len()));
            for aux in &self.auxiliary {
                let area = aux
                    .area
                    .map(|a| format!("{} m²", a))
                    .unwrap_or_else(|| "? m²".to_string());
                out.push_str(&format!("  - {} ({})\n", aux.building_type, area));
            }
        }
        if !self.last_updated.is_empty() {
            out.push_str(&format!("Registry updated: {}\n", self.last_updated));
        }
        out
    }
}

// --- Code tables ---

static BUILDING_TYPES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("110", "Farmhouse"),
        ("120", "Detached single-family house"),
        ("130", "Semi-detached or linked house"),
        ("140", "Terraced house"),
        ("150", "Apartment block"),
        ("160", "Student residence"),
        ("190", "Other year-round residential building"),
        ("210", "Summer house"),
        ("220", "Other holiday building"),
        ("510", "Office or administration building"),
        ("520", "Retail or service building"),
        ("530", "Industrial or production building"),
        ("540", "Hotel or restaurant"),
        ("550", "Transport or communication building"),
        ("560", "Education or research building"),
        ("570", "Health or social care building"),
        ("580", "Culture or leisure building"),
        ("590", "Other commercial building"),
        ("910", "Garage or carport"),
        ("920", "Shed"),
        ("930", "Greenhouse"),
        ("940", "Other agricultural building"),
    ])
});

static MATERIALS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("1", "Brick"),
        ("2", "Sand-lime brick"),
        ("3", "Lightweight concrete"),
        ("4", "Aerated concrete"),
        ("5", "Concrete"),
        ("6", "Wood"),
        ("7", "Metal"),
        ("8", "Other material"),
        ("9", "Unspecified material"),
        ("10", "Fibre cement (incl. asbestos)"),
        ("11", "Roofing felt"),
        ("12", "Concrete roof tiles"),
        ("13", "Clay tiles"),
        ("14", "Slate"),
        ("15", "Fibre cement roof sheets"),
        ("16", "Plastics"),
        ("17", "Metal roof sheets"),
        ("18", "Glass"),
        ("19", "Other roofing material"),
        ("20", "Thatch"),
    ])
});

static HEATING: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("1", "District or block heating"),
        ("2", "Central heating"),
        ("3", "Solid fuel stoves"),
        ("4", "Heat pump"),
        ("5", "Electric heating"),
        ("6", "Gas radiators"),
        ("7", "Other"),
        ("8", "No heating"),
        ("9", "Unspecified"),
    ])
});

static FLOOR_TYPES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("0", "Regular floor"),
        ("1", "Attic"),
        ("2", "Basement"),
        ("3", "Technical floor"),
    ])
});

fn translate(table: &HashMap<&'static str, &'static str>, code: &str, fallback: &str) -> String {
    if code.is_empty() {
        return String::new();
    }
    table
        .get(code)
        .map(|label| label.to_string())
        .unwrap_or_else(|| format!("{} {}", fallback, code))
}

pub fn building_type_label(code: &str) -> String {
    if code.is_empty() {
        return "Unknown building type".to_string();
    }
    translate(&BUILDING_TYPES, code, "Building type")
}

pub fn material_label(code: &str) -> String {
    translate(&MATERIALS, code, "Material")
}

pub fn heating_label(code: &str) -> String {
    translate(&HEATING, code, "Heating")
}

pub fn floor_type_label(code: &str) -> String {
    translate(&FLOOR_TYPES, code, "Floor type")
}

#[cfg(test)]
pub mod fakes {
    use super::*;
    use crate::error::KlimaError;
    use std::cell::RefCell;

    /// Scripted registry; records the addresses it was asked about.
    pub struct FakeRegistry {
        pub record: Option<BuildingRecord>,
        pub fail: bool,
        pub lookups: RefCell<Vec<String>>,
    }

    impl FakeRegistry {
        pub fn resolving(record: BuildingRecord) -> Self {
            Self {
                record: Some(record),
                fail: false,
                lookups: RefCell::new(Vec::new()),
            }
        }

        pub fn empty() -> Self {
            Self {
                record: None,
                fail: false,
                lookups: RefCell::new(Vec::new()),
            }
        }

        pub fn failing() -> Self {
            Self {
                record: None,
                fail: true,
                lookups: RefCell::new(Vec::new()),
            }
        }
    }

    impl BuildingRegistry for FakeRegistry {
        fn lookup(&self, address: &str) -> Result<Option<BuildingRecord>> {
            self.lookups.borrow_mut().push(address.to_string());
            if self.fail {
                return Err(KlimaError::Registry("registry unreachable".to_string()));
            }
            Ok(self.record.clone().map(|mut r| {
                r.address = address.to_string();
                r
            }))
        }
    }

    pub fn sample_building() -> BuildingRecord {
        BuildingRecord {
            address: "Marievej 2, 4200 Slagelse".to_string(),
            building_number: Some(1),
            building_type_code: "120".to_string(),
            building_type: building_type_label("120"),
            year_built: Some(1962),
            renovation_year: Some(1998),
            exterior_material: material_label("1"),
            roof_material: material_label("13"),
            total_area: Some(142),
            residential_area: Some(128),
            basement_area: Some(60),
            floors: Some(1),
            heating: heating_label("1"),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translates_known_and_unknown_codes() {
        assert_eq!(building_type_label("140"), "Terraced house");
        assert_eq!(building_type_label("999"), "Building type 999");
        assert_eq!(building_type_label(""), "Unknown building type");
        assert_eq!(material_label("13"), "Clay tiles");
        assert_eq!(material_label(""), "");
        assert_eq!(heating_label("4"), "Heat pump");
        assert_eq!(floor_type_label("2"), "Basement");
    }

    #[test]
    fn facts_skip_unknown_values() {
        let record = BuildingRecord {
            address: "Somewhere 1".into(),
            building_type: "Shed".into(),
            year_built: Some(2001),
            renovation_year: Some(2001),
            total_area: Some(12),
            ..Default::default()
        };
        let labels: Vec<&str> = record.facts().iter().map(|(l, _)| *l).collect();
        assert_eq!(labels, vec!["Building type", "Year built", "Total building area", "Elevator"]);
    }

    #[test]
    fn summary_lists_auxiliary_buildings() {
        let mut record = fakes::sample_building();
        record.auxiliary.push(AuxiliaryStructure {
            building_type: "Garage or carport".into(),
            area: Some(24),
            ..Default::default()
        });
        let summary = record.summary();
        assert!(summary.starts_with("Marievej 2, 4200 Slagelse\n"));
        assert!(summary.contains("Renovated: 1998"));
        assert!(summary.contains("  - Garage or carport (24 m²)"));
    }
}

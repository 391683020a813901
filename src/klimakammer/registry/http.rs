use super::{
    building_type_label, floor_type_label, heating_label, material_label, AuxiliaryStructure,
    BuildingRecord, BuildingRegistry,
};
use crate::error::{KlimaError, Result};
use reqwest::blocking::Client;
use serde_json::Value;
use std::time::Duration;

const BASEMENT_FLOOR: &str = "2";
const ATTIC_FLOOR: &str = "1";

/// DAWA address resolution followed by a BBR building query.
pub struct DawaBbrRegistry {
    client: Client,
    dawa_base_url: String,
    bbr_base_url: String,
    username: String,
    password: String,
}

impl DawaBbrRegistry {
    pub fn new(
        dawa_base_url: &str,
        bbr_base_url: &str,
        username: String,
        password: String,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("klimakammer/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| KlimaError::Registry(format!("cannot build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            dawa_base_url: dawa_base_url.trim_end_matches('/').to_string(),
            bbr_base_url: bbr_base_url.trim_end_matches('/').to_string(),
            username,
            password,
        })
    }

    fn get_json(&self, url: &str, query: &[(&str, &str)]) -> Result<Value> {
        let resp = self
            .client
            .get(url)
            .query(query)
            .send()
            .map_err(|e| KlimaError::Registry(format!("request to {} failed: {}", url, e)))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(KlimaError::Registry(format!("{} returned {}", url, status)));
        }
        resp.json::<Value>()
            .map_err(|e| KlimaError::Registry(format!("unreadable response from {}: {}", url, e)))
    }

    /// Free-text address to the DAWA access-address id.
    fn access_address_id(&self, address: &str) -> Result<Option<String>> {
        let caret = address.chars().count().to_string();
        let matches = self.get_json(
            &format!("{}/adresser/autocomplete", self.dawa_base_url),
            &[
                ("q", address),
                ("type", "adresse"),
                ("caretpos", &caret),
                ("fuzzy", "true"),
            ],
        )?;

        let Some(address_id) = matches
            .get(0)
            .and_then(|m| m.pointer("/adresse/id"))
            .and_then(Value::as_str)
        else {
            log::info!("no DAWA match for {:?}", address);
            return Ok(None);
        };

        let detail = self.get_json(&format!("{}/adresser/{}", self.dawa_base_url, address_id), &[])?;
        Ok(detail
            .pointer("/adgangsadresse/id")
            .and_then(Value::as_str)
            .map(str::to_string))
    }
}

impl BuildingRegistry for DawaBbrRegistry {
    fn lookup(&self, address: &str) -> Result<Option<BuildingRecord>> {
        let address = address.trim();
        if address.is_empty() {
            return Ok(None);
        }

        let Some(access_id) = self.access_address_id(address)? else {
            return Ok(None);
        };
        log::debug!("resolved {:?} to access address {}", address, access_id);

        let buildings = self.get_json(
            &format!("{}/BBR/BBRPublic/1/rest/bygning", self.bbr_base_url),
            &[
                ("Husnummer", access_id.as_str()),
                ("username", self.username.as_str()),
                ("password", self.password.as_str()),
                ("Format", "JSON"),
            ],
        )?;

        match buildings.as_array() {
            Some(list) if !list.is_empty() => Ok(Some(parse_buildings(list, address))),
            _ => {
                log::info!("BBR has no buildings for {:?}", address);
                Ok(None)
            }
        }
    }
}

/// Maps a BBR `bygning` response onto a record. The first building is the
/// primary one; the rest become auxiliary structures.
pub fn parse_buildings(buildings: &[Value], address: &str) -> BuildingRecord {
    let Some((primary, rest)) = buildings.split_first() else {
        return BuildingRecord {
            address: address.to_string(),
            ..Default::default()
        };
    };

    let type_code = code(primary, "byg021BygningensAnvendelse");
    let mut record = BuildingRecord {
        address: address.to_string(),
        building_number: count(primary, "byg007Bygningsnummer"),
        building_type: building_type_label(&type_code),
        building_type_code: type_code,
        year_built: count(primary, "byg026Opførelsesår"),
        renovation_year: count(primary, "byg027OmTilbygningsår"),
        exterior_material: material_label(&code(primary, "byg032YdervæggensMateriale")),
        roof_material: material_label(&code(primary, "byg033Tagdækningsmateriale")),
        total_area: count(primary, "byg038SamletBygningsareal"),
        residential_area: count(primary, "byg039BygningensSamledeBoligAreal"),
        commercial_area: count(primary, "byg040BygningensSamledeErhvervsAreal"),
        built_area: count(primary, "byg041BebyggetAreal"),
        floors: count(primary, "byg054AntalEtager"),
        heating: heating_label(&code(primary, "byg056Varmeinstallation")),
        coordinate: code(primary, "byg404Koordinat"),
        last_updated: code(primary, "datafordelerOpdateringstid"),
        ..Default::default()
    };

    for floor in nested(primary, "etageList", "etage") {
        match code(floor, "eta025Etagetype").as_str() {
            BASEMENT_FLOOR => {
                if let Some(area) = count(floor, "eta022Kælderareal") {
                    record.basement_area = Some(area);
                }
            }
            ATTIC_FLOOR => {
                if let Some(area) = count(floor, "eta021ArealAfUdnyttetDelAfTagetage") {
                    record.attic_area = Some(area);
                }
            }
            other => log::trace!("ignoring floor of type {}", floor_type_label(other)),
        }
    }

    record.has_elevator = nested(primary, "opgangList", "opgang")
        .any(|entrance| code(entrance, "opg020Elevator") == "1");

    record.auxiliary = rest
        .iter()
        .map(|b| AuxiliaryStructure {
            building_number: count(b, "byg007Bygningsnummer"),
            building_type: building_type_label(&code(b, "byg021BygningensAnvendelse")),
            year_built: count(b, "byg026Opførelsesår"),
            area: count(b, "byg038SamletBygningsareal"),
            material: material_label(&code(b, "byg032YdervæggensMateriale")),
        })
        .collect();

    record
}

/// Registry codes arrive as strings or bare numbers.
fn code(value: &Value, key: &str) -> String {
    match value.get(key) {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

/// Non-negative integer field. Negative values mean "not applicable".
fn count(value: &Value, key: &str) -> Option<u32> {
    let raw = match value.get(key)? {
        Value::Number(n) => n.as_i64()?,
        Value::String(s) => s.trim().parse::<i64>().ok()?,
        _ => return None,
    };
    u32::try_from(raw).ok()
}

/// Iterates `value[list][*][item]`.
fn nested<'a>(value: &'a Value, list: &str, item: &'a str) -> impl Iterator<Item = &'a Value> {
    value
        .get(list)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(move |entry| entry.get(item))
}

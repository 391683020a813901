use crate::commands::{CmdMessage, CmdResult};
use crate::config::{REGISTRY_PASSWORD_VAR, REGISTRY_USER_VAR};
use crate::error::Result;
use crate::registry::BuildingRegistry;

/// Looks an address up in the registry. A missing registry or an unknown
/// address is a warning; only a failing registry is an `Err`.
pub fn resolve(registry: Option<&dyn BuildingRegistry>, address: &str) -> Result<CmdResult> {
    let mut result = CmdResult::default();

    let Some(registry) = registry else {
        result.add_message(CmdMessage::warning(format!(
            "Building registry is not configured (set {} and {}); continuing with sensor data only.",
            REGISTRY_USER_VAR, REGISTRY_PASSWORD_VAR
        )));
        return Ok(result);
    };

    match registry.lookup(address)? {
        Some(record) => {
            result.add_message(CmdMessage::success(format!(
                "Found building data for {}",
                address
            )));
            Ok(result.with_building(Some(record)))
        }
        None => {
            result.add_message(CmdMessage::warning(format!(
                "No building found for {}; continuing with sensor data only.",
                address
            )));
            Ok(result)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::MessageLevel;
    use crate::error::KlimaError;
    use crate::registry::fakes::{sample_building, FakeRegistry};

    #[test]
    fn resolved_address_carries_the_record() {
        let registry = FakeRegistry::resolving(sample_building());
        let result = resolve(Some(&registry), "Marievej 2").unwrap();

        assert_eq!(result.building.unwrap().address, "Marievej 2");
        assert_eq!(result.messages[0].level, MessageLevel::Success);
    }

    #[test]
    fn no_match_is_a_warning() {
        let registry = FakeRegistry::empty();
        let result = resolve(Some(&registry), "Nowhere 99").unwrap();

        assert!(result.building.is_none());
        assert_eq!(result.messages[0].level, MessageLevel::Warning);
    }

    #[test]
    fn missing_registry_is_a_warning() {
        let result = resolve(None, "Marievej 2").unwrap();
        assert!(result.building.is_none());
        assert!(result.messages[0].content.contains(REGISTRY_USER_VAR));
    }

    #[test]
    fn transport_failure_aborts() {
        let registry = FakeRegistry::failing();
        assert!(matches!(
            resolve(Some(&registry), "Marievej 2"),
            Err(KlimaError::Registry(_))
        ));
    }
}

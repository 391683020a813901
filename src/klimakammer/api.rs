//! # API Facade
//!
//! The API layer is a **thin facade** over the command layer. It is the single
//! entry point for every klimakammer operation, whether it comes from a
//! one-shot subcommand or from the interactive menu.
//!
//! ## Role and Responsibilities
//!
//! The API facade:
//! - **Owns the collaborators**: store, clock, prompt templates and the
//!   optional inference and registry clients
//! - **Dispatches** to the appropriate command function
//! - **Returns structured types** (`Result<CmdResult>`)
//!
//! ## What the API Does NOT Do
//!
//! - **Business logic**: That belongs in `commands/*.rs`
//! - **I/O to the terminal**: No stdout, stderr or process exits
//!
//! ## Advisory Session
//!
//! The address and its resolved building live in an explicit
//! [`AdvisorySession`] value that callers pass in. The facade keeps no
//! per-user state of its own.
//!
//! ## Generic Over DataStore
//!
//! `KlimaApi<S: DataStore>` runs on `FileStore` in production and on
//! `InMemoryStore` in tests.

use crate::clock::{Clock, SystemClock};
use crate::commands::advise::Advisor;
use crate::commands::{self, CmdMessage, CmdResult, KlimaPaths};
use crate::config::OPENAI_KEY_VAR;
use crate::error::{KlimaError, Result};
use crate::inference::InferenceClient;
use crate::prompt::PromptBuilder;
use crate::registry::{BuildingRecord, BuildingRegistry};
use crate::serial::Connector;
use crate::store::DataStore;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

/// Address chosen by the user and what the registry said about it.
#[derive(Debug, Default, Clone)]
pub struct AdvisorySession {
    address: Option<String>,
    building: Option<BuildingRecord>,
    resolved: bool,
}

impl AdvisorySession {
    pub fn new(address: Option<String>) -> Self {
        Self {
            address: address.filter(|a| !a.trim().is_empty()),
            building: None,
            resolved: false,
        }
    }

    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    pub fn building(&self) -> Option<&BuildingRecord> {
        self.building.as_ref()
    }

    fn needs_lookup(&self) -> bool {
        self.address.is_some() && !self.resolved
    }
}

pub struct KlimaApi<S: DataStore> {
    store: S,
    paths: KlimaPaths,
    prompts: PromptBuilder,
    clock: Box<dyn Clock>,
    inference: Option<Box<dyn InferenceClient>>,
    registry: Option<Box<dyn BuildingRegistry>>,
}

impl<S: DataStore> KlimaApi<S> {
    pub fn new(store: S, paths: KlimaPaths) -> Result<Self> {
        Ok(Self {
            store,
            paths,
            prompts: PromptBuilder::new()?,
            clock: Box::new(SystemClock),
            inference: None,
            registry: None,
        })
    }

    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_inference(mut self, inference: Box<dyn InferenceClient>) -> Self {
        self.inference = Some(inference);
        self
    }

    pub fn with_registry(mut self, registry: Box<dyn BuildingRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn paths(&self) -> &KlimaPaths {
        &self.paths
    }

    // --- Acquisition ---

    pub fn read_once<C: Connector>(&mut self, connector: C) -> Result<CmdResult> {
        commands::record::read_once(connector, &mut self.store, &*self.clock)
    }

    pub fn log<C: Connector>(
        &mut self,
        connector: C,
        interval: Duration,
        stop: &AtomicBool,
    ) -> Result<CmdResult> {
        commands::record::log(connector, &mut self.store, &*self.clock, interval, stop)
    }

    // --- Advisory ---

    /// Sets the session address and resolves it. The same address is not
    /// looked up twice unless `force` is set.
    pub fn set_address(
        &self,
        session: &mut AdvisorySession,
        address: &str,
        force: bool,
    ) -> Result<CmdResult> {
        let address = address.trim();
        if address.is_empty() {
            *session = AdvisorySession::default();
            let mut result = CmdResult::default();
            result.add_message(CmdMessage::info("Address cleared; analyses use sensor data only."));
            return Ok(result);
        }

        if !force && session.resolved && session.address() == Some(address) {
            let mut result = CmdResult::default().with_building(session.building.clone());
            result.add_message(CmdMessage::info(format!("Using cached building data for {}", address)));
            return Ok(result);
        }

        let result = commands::building::resolve(self.registry.as_deref(), address)?;
        *session = AdvisorySession {
            address: Some(address.to_string()),
            building: result.building.clone(),
            resolved: true,
        };
        Ok(result)
    }

    fn ensure_resolved(&self, session: &mut AdvisorySession) -> Result<CmdResult> {
        match session.address.clone() {
            Some(address) if session.needs_lookup() => self.set_address(session, &address, false),
            _ => Ok(CmdResult::default()),
        }
    }

    pub fn advise_current(&mut self, session: &mut AdvisorySession) -> Result<CmdResult> {
        let reading = commands::advise::current_reading(&self.store)?;
        let advisor = advisor(&self.inference, &self.prompts, &*self.clock)?;
        let resolved = self.ensure_resolved(session)?;

        let analysis = commands::advise::current(
            &mut self.store,
            &advisor,
            &reading,
            session.address(),
            session.building(),
        )?;
        Ok(resolved.merge(analysis))
    }

    pub fn advise_trend(&mut self, session: &mut AdvisorySession, days: u32) -> Result<CmdResult> {
        let advisor = advisor(&self.inference, &self.prompts, &*self.clock)?;
        let resolved = self.ensure_resolved(session)?;

        let analysis = commands::advise::trend(
            &mut self.store,
            &advisor,
            days,
            session.address(),
            session.building(),
        )?;
        Ok(resolved.merge(analysis))
    }

    pub fn building_details(&self, session: &mut AdvisorySession) -> Result<CmdResult> {
        if session.address.is_none() {
            let mut result = CmdResult::default();
            result.add_message(CmdMessage::warning("No address set."));
            return Ok(result);
        }
        let resolved = self.ensure_resolved(session)?;
        Ok(resolved.with_building(session.building.clone()))
    }

    // --- Store views ---

    pub fn status(&self) -> Result<CmdResult> {
        commands::status::run(&self.store)
    }

    pub fn history(&self, limit: Option<usize>) -> Result<CmdResult> {
        commands::history::run(&self.store, limit)
    }

    pub fn latest_analysis(&self) -> Result<CmdResult> {
        commands::history::latest(&self.store)
    }

    pub fn doctor(&mut self) -> Result<CmdResult> {
        commands::doctor::run(&mut self.store)
    }

    // --- Setup ---

    pub fn init(&self) -> Result<CmdResult> {
        commands::init::run(&self.paths)
    }

    pub fn config(&self, action: commands::config::ConfigAction) -> Result<CmdResult> {
        commands::config::run(&self.paths, action)
    }
}

fn advisor<'a>(
    inference: &'a Option<Box<dyn InferenceClient>>,
    prompts: &'a PromptBuilder,
    clock: &'a dyn Clock,
) -> Result<Advisor<'a>> {
    let inference = inference.as_deref().ok_or_else(|| {
        KlimaError::Config(format!("{} is not set; cannot request an analysis", OPENAI_KEY_VAR))
    })?;
    Ok(Advisor {
        inference,
        prompts,
        clock,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::inference::fakes::ScriptedInference;
    use crate::inference::InferenceError;
    use crate::model::AnalysisKind;
    use crate::registry::fakes::{sample_building, FakeRegistry};
    use crate::store::memory::fixtures::StoreFixture;
    use crate::store::memory::InMemoryStore;
    use chrono::{Local, NaiveDate, TimeZone};
    use std::path::PathBuf;

    fn paths() -> KlimaPaths {
        KlimaPaths {
            data_dir: PathBuf::from("unused"),
        }
    }

    fn store_with_reading() -> InMemoryStore {
        let at = NaiveDate::from_ymd_opt(2025, 6, 3)
            .unwrap()
            .and_hms_opt(18, 0, 0)
            .unwrap();
        StoreFixture::new().with_reading(at, 22.8, 63.5).store
    }

    fn api(store: InMemoryStore) -> KlimaApi<InMemoryStore> {
        KlimaApi::new(store, paths())
            .unwrap()
            .with_clock(Box::new(ManualClock::new(
                Local.with_ymd_and_hms(2025, 6, 3, 18, 30, 0).unwrap(),
            )))
    }

    #[test]
    fn current_without_data_is_no_data() {
        let mut api = api(InMemoryStore::new()).with_inference(Box::new(ScriptedInference::answering("x")));
        let mut session = AdvisorySession::default();

        let err = api.advise_current(&mut session).unwrap_err();
        assert!(matches!(err, KlimaError::NoData(_)));
        assert!(api.store().latest_analysis().unwrap().is_none());
    }

    #[test]
    fn missing_api_key_is_a_config_error() {
        let mut api = api(store_with_reading());
        let mut session = AdvisorySession::default();

        let err = api.advise_current(&mut session).unwrap_err();
        assert!(matches!(err, KlimaError::Config(_)));
    }

    #[test]
    fn registry_no_match_proceeds_sensor_only() {
        let mut api = api(store_with_reading())
            .with_inference(Box::new(ScriptedInference::answering("ventilate")))
            .with_registry(Box::new(FakeRegistry::empty()));
        let mut session = AdvisorySession::new(Some("Nowhere 99".into()));

        let result = api.advise_current(&mut session).unwrap();

        let record = result.analysis.unwrap();
        assert_eq!(record.kind, AnalysisKind::CurrentConditions);
        assert!(!record.prompt.contains("BUILDING INFORMATION"));
        assert!(record.prompt.contains("ADDRESS: Nowhere 99"));
        assert_eq!(session.address(), Some("Nowhere 99"));
        assert!(session.building().is_none());
    }

    #[test]
    fn registry_match_adds_building_section() {
        let mut api = api(store_with_reading())
            .with_inference(Box::new(ScriptedInference::answering("ok")))
            .with_registry(Box::new(FakeRegistry::resolving(sample_building())));
        let mut session = AdvisorySession::new(Some("Marievej 2, 4200 Slagelse".into()));

        let result = api.advise_current(&mut session).unwrap();
        let record = result.analysis.unwrap();
        assert_eq!(record.kind, AnalysisKind::CurrentConditionsRegistry);
        assert!(record.prompt.contains("Year built: 1962"));
    }

    #[test]
    fn registry_failure_aborts_without_archiving() {
        let mut api = api(store_with_reading())
            .with_inference(Box::new(ScriptedInference::answering("unused")))
            .with_registry(Box::new(FakeRegistry::failing()));
        let mut session = AdvisorySession::new(Some("Marievej 2".into()));

        assert!(matches!(
            api.advise_current(&mut session),
            Err(KlimaError::Registry(_))
        ));
        assert!(api.store().list_analyses().unwrap().is_empty());
    }

    #[test]
    fn auth_error_leaves_latest_pointer_unchanged() {
        let at = NaiveDate::from_ymd_opt(2025, 6, 2)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        let store = StoreFixture {
            store: store_with_reading(),
        }
        .with_analysis(at, AnalysisKind::TrendSingleDay, "yesterday")
        .store;
        let mut api = api(store).with_inference(Box::new(ScriptedInference::failing(
            InferenceError::Auth("invalid key".into()),
        )));
        let mut session = AdvisorySession::default();

        assert!(api.advise_current(&mut session).is_err());
        assert_eq!(
            api.store().latest_analysis().unwrap().unwrap().response,
            "yesterday"
        );
    }

    #[test]
    fn same_address_is_served_from_the_session() {
        let api = api(InMemoryStore::new()).with_registry(Box::new(FakeRegistry::resolving(sample_building())));
        let mut session = AdvisorySession::default();

        api.set_address(&mut session, "Marievej 2", false).unwrap();
        let again = api.set_address(&mut session, "Marievej 2", false).unwrap();
        assert!(again.messages[0].content.starts_with("Using cached"));
        assert!(again.building.is_some());

        let forced = api.set_address(&mut session, "Marievej 2", true).unwrap();
        assert!(forced.messages[0].content.starts_with("Found building data"));
    }

    #[test]
    fn trend_uses_session_building() {
        let at = NaiveDate::from_ymd_opt(2025, 6, 3)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        let store = StoreFixture::new().with_series(at, 4).store;
        let mut api = api(store)
            .with_inference(Box::new(ScriptedInference::answering("fine")))
            .with_registry(Box::new(FakeRegistry::resolving(sample_building())));
        let mut session = AdvisorySession::new(Some("Marievej 2".into()));

        let record = api.advise_trend(&mut session, 3).unwrap().analysis.unwrap();
        assert_eq!(record.kind, AnalysisKind::TrendMultiDay);
        assert!(record.prompt.contains("BUILDING INFORMATION FROM THE REGISTRY"));
    }
}

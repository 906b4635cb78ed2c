//! Factory: owns workstations and the shared libraries
//!
//! Wiring is checked by [`Factory::validate`] before anything runs, so a
//! path pointing nowhere surfaces as a [`ConfigurationError`] rather than
//! as lost answers halfway through a cycle.

use crate::error::{ConfigurationError, PipelineError};
use crate::machine::{Delivery, Destination, MachineStats};
use crate::workstation::Workstation;
use af_core::{Batch, OperatorOptions};
use af_interpreter::InstructionLibrary;
use af_program::TypeRegistry;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Default factory name
pub const DEFAULT_FACTORY_NAME: &str = "my_factory";

/// Factory-wide configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FactoryConfig {
    /// Factory name
    pub name: String,
    /// Restrict the instruction library to these names
    pub instruction_names: Option<Vec<String>>,
    /// Restrict the type library to these names
    pub type_names: Option<Vec<String>>,
    /// Settings passed through untouched
    pub extras: BTreeMap<String, serde_json::Value>,
}

impl Default for FactoryConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_FACTORY_NAME.to_string(),
            instruction_names: None,
            type_names: None,
            extras: BTreeMap::new(),
        }
    }
}

impl FactoryConfig {
    /// Create default configuration named `name`
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Restrict instructions
    #[must_use]
    pub fn with_instruction_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.instruction_names = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Restrict literal types
    #[must_use]
    pub fn with_type_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.type_names = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Store an opaque setting
    #[must_use]
    pub fn with_extra(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extras.insert(key.into(), value);
        self
    }
}

/// Read-only throughput snapshot of one machine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowRecord {
    /// Workstation name
    pub workstation: String,
    /// Machine name
    pub machine: String,
    /// Counters at snapshot time
    pub stats: MachineStats,
    /// Answers still queued for the machine
    pub pending: usize,
}

impl FlowRecord {
    /// Emitted-on-path over received
    #[must_use]
    pub fn average_gain(&self, path: &str) -> f64 {
        self.stats.average_gain(path)
    }
}

/// Top-level owner of workstations
#[derive(Debug)]
pub struct Factory {
    config: FactoryConfig,
    workstations: IndexMap<String, Workstation>,
    instructions: Arc<InstructionLibrary>,
    types: Arc<TypeRegistry>,
}

impl Default for Factory {
    fn default() -> Self {
        Self {
            config: FactoryConfig::default(),
            workstations: IndexMap::new(),
            instructions: Arc::new(InstructionLibrary::with_builtins()),
            types: Arc::new(TypeRegistry::with_builtins()),
        }
    }
}

impl Factory {
    /// Create factory with the builtin libraries, restricted as configured
    ///
    /// # Errors
    /// Returns [`ConfigurationError::UnknownLibraryEntry`] if a restriction
    /// names an instruction or type the builtins lack
    pub fn new(config: FactoryConfig) -> Result<Self, ConfigurationError> {
        let mut instructions = InstructionLibrary::with_builtins();
        if let Some(names) = &config.instruction_names {
            instructions = instructions
                .restricted(names)
                .map_err(|e| ConfigurationError::UnknownLibraryEntry(e.to_string()))?;
        }
        let mut types = TypeRegistry::with_builtins();
        if let Some(names) = &config.type_names {
            types = types
                .restricted(names)
                .map_err(|e| ConfigurationError::UnknownLibraryEntry(e.to_string()))?;
        }
        tracing::info!(
            factory = %config.name,
            instructions = instructions.len(),
            types = types.len(),
            "factory created"
        );
        Ok(Self {
            config,
            workstations: IndexMap::new(),
            instructions: Arc::new(instructions),
            types: Arc::new(types),
        })
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.config.name
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &FactoryConfig {
        &self.config
    }

    /// Shared instruction library
    #[inline]
    #[must_use]
    pub fn instruction_library(&self) -> Arc<InstructionLibrary> {
        Arc::clone(&self.instructions)
    }

    /// Shared literal type library
    #[inline]
    #[must_use]
    pub fn type_library(&self) -> Arc<TypeRegistry> {
        Arc::clone(&self.types)
    }

    /// Operator options drawing code from the factory libraries
    #[must_use]
    pub fn operator_options(&self) -> OperatorOptions {
        OperatorOptions::new()
            .with_instruction_names(self.instructions.names())
            .with_type_names(self.types.names())
    }

    /// Add an empty workstation
    ///
    /// # Errors
    /// Returns [`ConfigurationError::DuplicateName`] if the name is taken
    pub fn build_workstation(
        &mut self,
        name: impl Into<String>,
    ) -> Result<&mut Workstation, ConfigurationError> {
        let name = name.into();
        if self.workstations.contains_key(&name) {
            return Err(ConfigurationError::DuplicateName(name));
        }
        Ok(self
            .workstations
            .entry(name.clone())
            .or_insert_with(|| Workstation::new(name)))
    }

    #[must_use]
    pub fn workstation(&self, name: &str) -> Option<&Workstation> {
        self.workstations.get(name)
    }

    /// Look up a workstation for wiring
    pub fn workstation_mut(&mut self, name: &str) -> Option<&mut Workstation> {
        self.workstations.get_mut(name)
    }

    #[must_use]
    pub fn workstation_names(&self) -> Vec<&str> {
        self.workstations.keys().map(String::as_str).collect()
    }

    /// Check every machine's routing
    ///
    /// Every path a stage emits on needs a destination, and every
    /// destination must name an existing workstation and machine.
    ///
    /// # Errors
    /// Returns the first [`ConfigurationError`] found
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        self.workstations
            .values()
            .try_for_each(|workstation| self.validate_workstation(workstation))
    }

    fn validate_workstation(&self, workstation: &Workstation) -> Result<(), ConfigurationError> {
        for machine in workstation.machines() {
            for path in machine.output_paths() {
                let destination =
                    machine
                        .path(&path)
                        .ok_or_else(|| ConfigurationError::UnroutedPath {
                            machine: format!("{}/{}", workstation.name(), machine.name()),
                            path: path.clone(),
                        })?;
                if let Err(err) = self.check_destination(destination) {
                    tracing::warn!(
                        machine = machine.name(),
                        path = %path,
                        destination = %destination,
                        "broken route"
                    );
                    return Err(err);
                }
            }
        }
        Ok(())
    }

    fn check_destination(&self, destination: &Destination) -> Result<(), ConfigurationError> {
        let target = self
            .workstations
            .get(&destination.workstation)
            .ok_or_else(|| ConfigurationError::UnknownWorkstation(destination.workstation.clone()))?;
        match &destination.machine {
            Some(machine) if !target.has_machine(machine) => {
                Err(ConfigurationError::UnknownMachine {
                    workstation: destination.workstation.clone(),
                    machine: machine.clone(),
                })
            }
            _ => Ok(()),
        }
    }

    /// Queue answers at `destination`
    ///
    /// # Errors
    /// Returns [`ConfigurationError`] for an unknown workstation or machine
    pub fn deliver(&self, answers: Batch, destination: &Destination) -> Result<(), ConfigurationError> {
        let target = self
            .workstations
            .get(&destination.workstation)
            .ok_or_else(|| ConfigurationError::UnknownWorkstation(destination.workstation.clone()))?;
        target.receive(answers, destination.machine.as_deref())
    }

    /// All or nothing: a broken destination delivers none of the batches
    fn route(&self, deliveries: Vec<Delivery>) -> Result<(), ConfigurationError> {
        for delivery in &deliveries {
            self.check_destination(&delivery.destination)?;
        }
        for delivery in deliveries {
            self.deliver(delivery.answers, &delivery.destination)?;
        }
        Ok(())
    }

    /// Check one workstation's wiring, run its machines and route what
    /// they emit
    ///
    /// Output of machines that finished before a failing one is still
    /// routed.
    ///
    /// # Errors
    /// Returns a [`ConfigurationError`] before anything runs for an unknown
    /// name or broken wiring, otherwise the first machine failure
    pub fn run_workstation(&mut self, name: &str) -> Result<(), PipelineError> {
        let workstation = self
            .workstations
            .get(name)
            .ok_or_else(|| ConfigurationError::UnknownWorkstation(name.to_string()))?;
        self.validate_workstation(workstation)?;
        self.run_checked(name)
    }

    fn run_checked(&mut self, name: &str) -> Result<(), PipelineError> {
        let workstation = self
            .workstations
            .get_mut(name)
            .ok_or_else(|| ConfigurationError::UnknownWorkstation(name.to_string()))?;
        let mut outbound = Vec::new();
        let result = workstation.run(&mut outbound);
        self.route(outbound)?;
        result
    }

    /// Validate, then run each workstation once in build order
    ///
    /// # Errors
    /// Returns a [`ConfigurationError`] before anything runs if the wiring
    /// is broken, otherwise the first machine failure
    pub fn cycle(&mut self) -> Result<(), PipelineError> {
        self.validate()?;
        let names: Vec<String> = self.workstations.keys().cloned().collect();
        for name in &names {
            self.run_checked(name)?;
        }
        tracing::info!(factory = %self.config.name, workstations = names.len(), "cycle complete");
        Ok(())
    }

    /// Throughput snapshot of every machine, in build order
    #[must_use]
    pub fn flow_report(&self) -> Vec<FlowRecord> {
        self.workstations
            .values()
            .flat_map(|w| {
                w.machines().map(move |m| FlowRecord {
                    workstation: w.name().to_string(),
                    machine: m.name().to_string(),
                    stats: m.stats().clone(),
                    pending: w.pending(m.name()),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::{FnStage, StageOutput};

    fn sink_stage() -> FnStage {
        FnStage::new(["out"], |batch: &mut Batch| {
            let mut out = StageOutput::new();
            out.insert("out".to_string(), std::mem::take(batch));
            Ok(out)
        })
    }

    #[test]
    fn defaults() {
        let factory = Factory::default();
        assert_eq!(factory.name(), DEFAULT_FACTORY_NAME);
        assert!(factory.workstation_names().is_empty());
        assert_eq!(
            factory.instruction_library().len(),
            InstructionLibrary::with_builtins().len()
        );
        assert_eq!(factory.type_library().names(), vec!["int", "float", "bool", "code"]);
    }

    #[test]
    fn libraries_can_be_restricted() {
        let factory = Factory::new(
            FactoryConfig::new("foo")
                .with_instruction_names(["int_add", "exec_noop"])
                .with_type_names(["code", "bool"]),
        )
        .unwrap();
        assert_eq!(factory.instruction_library().names(), vec!["int_add", "exec_noop"]);
        assert_eq!(factory.type_library().names(), vec!["code", "bool"]);

        let options = factory.operator_options();
        assert_eq!(options.type_names, Some(vec!["code".to_string(), "bool".to_string()]));
    }

    #[test]
    fn unknown_library_entry() {
        let err = Factory::new(FactoryConfig::new("foo").with_type_names(["unicorn"])).unwrap_err();
        assert!(matches!(err, ConfigurationError::UnknownLibraryEntry(_)));
    }

    #[test]
    fn extras_pass_through() {
        let config = FactoryConfig::new("bar")
            .with_extra("my_option", serde_json::json!(1))
            .with_extra("my_other_option", serde_json::json!([1, 2, 3]));
        let factory = Factory::new(config.clone()).unwrap();
        assert_eq!(factory.config().extras, config.extras);
    }

    #[test]
    fn duplicate_workstation() {
        let mut factory = Factory::default();
        factory.build_workstation("w").unwrap();
        assert!(factory.build_workstation("w").is_err());
    }

    #[test]
    fn validation_catches_broken_wiring() {
        let mut factory = Factory::default();
        factory
            .build_workstation("w")
            .unwrap()
            .build_machine("m", sink_stage())
            .unwrap();
        assert!(matches!(
            factory.validate(),
            Err(ConfigurationError::UnroutedPath { .. })
        ));

        let machine = factory.workstation_mut("w").unwrap().machine_mut("m").unwrap();
        machine.set_path("out", Destination::workstation("nowhere"));
        assert_eq!(
            factory.validate(),
            Err(ConfigurationError::UnknownWorkstation("nowhere".into()))
        );

        let machine = factory.workstation_mut("w").unwrap().machine_mut("m").unwrap();
        machine.set_path("out", Destination::machine("w", "ghost"));
        assert!(matches!(
            factory.validate(),
            Err(ConfigurationError::UnknownMachine { .. })
        ));

        let machine = factory.workstation_mut("w").unwrap().machine_mut("m").unwrap();
        machine.set_path("out", Destination::workstation("w"));
        assert!(factory.validate().is_ok());
    }

    #[test]
    fn cycle_refuses_broken_wiring() {
        let mut factory = Factory::default();
        factory
            .build_workstation("w")
            .unwrap()
            .build_machine("m", sink_stage())
            .unwrap();
        assert!(factory.cycle().unwrap_err().is_configuration());
    }

    #[test]
    fn single_workstation_run_checks_wiring_first() {
        let mut factory = Factory::default();
        factory
            .build_workstation("w")
            .unwrap()
            .build_machine("m", sink_stage())
            .unwrap()
            .set_path("out", Destination::workstation("nowhere"));
        factory
            .deliver(
                vec![af_core::Answer::parse("do a").unwrap()].into(),
                &Destination::machine("w", "m"),
            )
            .unwrap();

        let err = factory.run_workstation("w").unwrap_err();
        assert!(err.is_configuration());
        let w = factory.workstation("w").unwrap();
        assert_eq!(w.pending("m"), 1);
        assert_eq!(w.machine("m").unwrap().total_answers_in(), 0);
    }

    #[test]
    fn route_delivers_all_or_nothing() {
        let mut factory = Factory::default();
        factory.build_workstation("left").unwrap();
        let batch = || -> Batch { vec![af_core::Answer::parse("do a").unwrap()].into() };
        let deliveries = vec![
            Delivery {
                path: "a".into(),
                destination: Destination::workstation("left"),
                answers: batch(),
            },
            Delivery {
                path: "b".into(),
                destination: Destination::workstation("nowhere"),
                answers: batch(),
            },
        ];
        assert!(factory.route(deliveries).is_err());
        assert_eq!(factory.workstation("left").unwrap().inbox_len(), 0);
    }
}

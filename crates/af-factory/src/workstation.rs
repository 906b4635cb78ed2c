//! Workstations: machines plus the queues they read from
//!
//! Each machine has one pending queue. Answers addressed to the
//! workstation itself collect in its inbox, which no machine drains.
//! Queues sit behind a lock so a scheduler may deliver from another
//! thread while a machine drains its own queue.

use crate::error::{ConfigurationError, PipelineError};
use crate::machine::{Delivery, Machine};
use crate::stages::Stage;
use af_core::Batch;
use indexmap::IndexMap;
use parking_lot::Mutex;

/// Named container of machines and their pending answers
#[derive(Debug)]
pub struct Workstation {
    name: String,
    machines: IndexMap<String, Machine>,
    pending: Mutex<IndexMap<String, Batch>>,
    inbox: Mutex<Batch>,
}

impl Workstation {
    /// Create empty workstation
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            machines: IndexMap::new(),
            pending: Mutex::new(IndexMap::new()),
            inbox: Mutex::new(Batch::new()),
        }
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add a machine running `stage`
    ///
    /// # Errors
    /// Returns [`ConfigurationError::DuplicateName`] if the name is taken
    pub fn build_machine(
        &mut self,
        name: impl Into<String>,
        stage: impl Stage + 'static,
    ) -> Result<&mut Machine, ConfigurationError> {
        let machine = Machine::new(name, self.name.clone(), stage);
        self.add_machine(machine)
    }

    /// Add a prebuilt machine
    ///
    /// # Errors
    /// Returns [`ConfigurationError::DuplicateName`] if the name is taken
    pub fn add_machine(&mut self, machine: Machine) -> Result<&mut Machine, ConfigurationError> {
        let name = machine.name().to_string();
        if self.machines.contains_key(&name) {
            return Err(ConfigurationError::DuplicateName(format!("{}/{name}", self.name)));
        }
        self.pending.lock().insert(name.clone(), Batch::new());
        Ok(self.machines.entry(name).or_insert(machine))
    }

    #[must_use]
    pub fn machine(&self, name: &str) -> Option<&Machine> {
        self.machines.get(name)
    }

    /// Look up a machine for rewiring
    pub fn machine_mut(&mut self, name: &str) -> Option<&mut Machine> {
        self.machines.get_mut(name)
    }

    /// Check if a machine exists
    #[inline]
    #[must_use]
    pub fn has_machine(&self, name: &str) -> bool {
        self.machines.contains_key(name)
    }

    /// Machine names in build order
    #[must_use]
    pub fn machine_names(&self) -> Vec<&str> {
        self.machines.keys().map(String::as_str).collect()
    }

    pub fn machines(&self) -> impl Iterator<Item = &Machine> {
        self.machines.values()
    }

    /// Queue answers for `machine`, or into the inbox when `None`
    ///
    /// # Errors
    /// Returns [`ConfigurationError::UnknownMachine`] for a machine this
    /// workstation does not have
    pub fn receive(&self, answers: Batch, machine: Option<&str>) -> Result<(), ConfigurationError> {
        match machine {
            None => self.inbox.lock().extend(answers),
            Some(name) => {
                let mut pending = self.pending.lock();
                let queue = pending
                    .get_mut(name)
                    .ok_or_else(|| ConfigurationError::UnknownMachine {
                        workstation: self.name.clone(),
                        machine: name.to_string(),
                    })?;
                queue.extend(answers);
            }
        }
        Ok(())
    }

    /// Take everything queued for `machine`
    #[must_use]
    pub fn dump(&self, machine: &str) -> Batch {
        self.pending
            .lock()
            .get_mut(machine)
            .map(std::mem::take)
            .unwrap_or_default()
    }

    /// Take everything in the inbox
    #[must_use]
    pub fn take_inbox(&self) -> Batch {
        std::mem::take(&mut *self.inbox.lock())
    }

    /// Number of answers queued for `machine`
    #[must_use]
    pub fn pending(&self, machine: &str) -> usize {
        self.pending.lock().get(machine).map_or(0, |q| q.len())
    }

    /// Number of answers in the inbox
    #[must_use]
    pub fn inbox_len(&self) -> usize {
        self.inbox.lock().len()
    }

    /// Run one machine on its queue
    ///
    /// # Errors
    /// Returns [`ConfigurationError::UnknownMachine`] for an unknown name,
    /// otherwise whatever [`Machine::process`] returns. A failed run puts
    /// the answers the stage did not forward back at the front of the queue.
    pub fn run_machine(&mut self, name: &str) -> Result<Vec<Delivery>, PipelineError> {
        let Some(machine) = self.machines.get_mut(name) else {
            return Err(ConfigurationError::UnknownMachine {
                workstation: self.name.clone(),
                machine: name.to_string(),
            }
            .into());
        };
        let mut input = self
            .pending
            .lock()
            .get_mut(name)
            .map(std::mem::take)
            .unwrap_or_default();

        let result = machine.process(&mut input);
        if result.is_err() && !input.is_empty() {
            let mut pending = self.pending.lock();
            if let Some(queue) = pending.get_mut(name) {
                let later = std::mem::replace(queue, input);
                queue.extend(later);
            }
        }
        result
    }

    /// Run every machine once in build order
    ///
    /// Deliveries addressed to this workstation are queued immediately, so
    /// a later machine sees what an earlier one emitted. The rest are
    /// pushed onto `outbound` as each machine finishes, which leaves them
    /// there for the caller to route even when a later machine fails.
    ///
    /// # Errors
    /// Stops at the first failing machine; see [`Workstation::run_machine`]
    pub fn run(&mut self, outbound: &mut Vec<Delivery>) -> Result<(), PipelineError> {
        let names: Vec<String> = self.machines.keys().cloned().collect();
        for name in names {
            for delivery in self.run_machine(&name)? {
                let local = delivery.destination.workstation == self.name
                    && delivery
                        .destination
                        .machine
                        .as_deref()
                        .map_or(true, |m| self.has_machine(m));
                if local {
                    self.receive(delivery.answers, delivery.destination.machine.as_deref())?;
                } else {
                    outbound.push(delivery);
                }
            }
        }
        Ok(())
    }
}

//! AF Factory - moving answer batches between stages
//!
//! A [`Factory`] owns [`Workstation`]s; each workstation hosts
//! [`Machine`]s, and each machine wraps a [`Stage`] with a routing table
//! from output path to [`Destination`]. Running a machine drains its
//! queue, processes the batch and queues every output batch at its
//! destination while counting answers in and out per path.
//!
//! # Example
//!
//! ```rust
//! use af_core::ResampleAndClone;
//! use af_factory::prelude::*;
//! use af_test_utils::sample_batch;
//!
//! let mut factory = Factory::default();
//! let breeder = factory.build_workstation("breeder").unwrap();
//! breeder
//!     .build_machine("clone", OperatorStage::new(ResampleAndClone::new()).with_count(8))
//!     .unwrap()
//!     .set_path(PARENTS, Destination::workstation("archive"))
//!     .set_path(CREATED, Destination::workstation("archive"));
//! factory.build_workstation("archive").unwrap();
//!
//! factory
//!     .deliver(sample_batch(), &Destination::machine("breeder", "clone"))
//!     .unwrap();
//! factory.cycle().unwrap();
//!
//! assert_eq!(factory.workstation("archive").unwrap().inbox_len(), 12);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod error;
pub mod factory;
pub mod machine;
pub mod stages;
pub mod workstation;

pub use error::{ConfigurationError, PipelineError};
pub use factory::{Factory, FactoryConfig, FlowRecord, DEFAULT_FACTORY_NAME};
pub use machine::{
    allowed_transitions, validate_transition, Delivery, Destination, Machine, MachineOptions,
    MachineState, MachineStats,
};
pub use stages::{
    BlendingCrossoverStage, EvaluatorStage, FnStage, OperatorStage, Stage, StageOutput, CREATED,
    PARENTS, SCORED,
};
pub use workstation::Workstation;

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for wiring a factory
    pub use crate::{
        ConfigurationError, Destination, Factory, FactoryConfig, Machine, OperatorStage,
        PipelineError, Stage, StageOutput, Workstation, CREATED, PARENTS, SCORED,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

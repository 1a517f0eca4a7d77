pub mod registry;
pub mod runner;
pub mod types;

pub use registry::{UnknownCheck, default_registry, select};
pub use runner::{Runner, SEPARATOR_LINE};
pub use types::{
    Check, CheckContext, CheckDescriptor, CheckError, CheckFactory, CheckResult, CheckState,
    ConstructionError, InvalidTransition, Outcome,
};

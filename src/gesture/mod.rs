pub mod definition;
pub mod detector;
pub mod hold;
pub mod kind;
pub mod predicate;
pub mod stability;
pub mod thresholds;

pub use definition::{validate_definitions, ActionRef, DefinitionError, GestureDefinition, TriggerEvent};
pub use detector::{FrameOutput, GestureDetector};
pub use hold::{DetectionState, HoldOutcome, Status};
pub use kind::GestureKind;
pub use predicate::{evaluate, PredicateError};
pub use stability::StabilityFilter;
pub use thresholds::PredicateThresholds;

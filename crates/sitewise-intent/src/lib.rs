//! Sitewise Intent - Query interpretation
//!
//! Turns a free-text query into a routed intent with extracted parameters,
//! resolves which project it refers to, and validates the parameters a
//! capability needs (back-filling from the loaded project where possible).

pub mod classifier;
pub mod extract;
pub mod resolver;
pub mod router;
pub mod validator;

pub use classifier::{Classification, IntentDefinition, IntentRegistry};
pub use extract::{extract_coordinates, extract_parameters, has_coordinates};
pub use resolver::{ProjectResolver, ResolutionConfidence, ResolutionResult};
pub use router::{IntentRouter, RoutedIntent};
pub use validator::ParameterValidator;

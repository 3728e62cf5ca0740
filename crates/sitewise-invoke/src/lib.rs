//! Sitewise Invoke - Downstream capability, agent, and geocoder ports
//!
//! This crate defines the boundary to the analysis capabilities and the
//! optional intelligent agent, along with HTTP adapter implementations.

pub mod agent;
pub mod capability;
pub mod geocoder;
pub mod ports;

pub use agent::HttpAgent;
pub use capability::{invoke_with_retry, HttpCapabilityInvoker};
pub use geocoder::NominatimGeocoder;
pub use ports::{AgentReply, AgentRequest, CapabilityInvoker, Geocoder, IntelligentAgent};

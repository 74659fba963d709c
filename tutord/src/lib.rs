// The tutor daemon routes free-text questions to subject specialists:
// - Classification of queries into subject labels
// - Handlers and the capabilities they invoke
// - Orchestration and presentation of answers
// - Session storage with one-way failover to memory
// - The service facade and its HTTP transport

pub mod capabilities;
pub mod capability;
pub mod classifier;
pub mod handler;
pub mod http_server;
pub mod intent;
pub mod orchestrator;
pub mod registry;
pub mod service;
pub mod session;
pub mod specialists;

#[cfg(test)]
mod testing;

pub use classifier::{Classifier, GENERAL_LABEL};
pub use handler::{Handler, HandlerDescriptor, HandlerKind, HandlerRef};
pub use orchestrator::{Orchestrator, Routed};
pub use registry::{HandlerRegistry, RegistryError};
pub use service::{ServiceError, TutorService};

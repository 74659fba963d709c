// This crate centralizes the request/response shapes exposed to transports.

pub mod tutor_api; // For transport <-> tutor daemon communication

//! External integrations: appliance API client and report parsers

pub mod api_clients;
pub mod parsers;

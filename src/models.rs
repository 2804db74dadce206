pub mod activities;
pub mod agents;
pub mod auth;
pub mod leads;
pub mod notifications;
pub mod settings;

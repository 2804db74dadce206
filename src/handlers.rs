pub mod activities;
pub mod agents;
pub mod auth;
pub mod jobs;
pub mod leads;
pub mod notifications;

pub mod agent_repo;
pub use agent_repo::AgentRepository;
pub mod lead_repo;
pub use lead_repo::LeadRepository;
pub mod activity_repo;
pub use activity_repo::ActivityRepository;
pub mod notification_repo;
pub use notification_repo::NotificationRepository;
pub mod settings_repo;
pub use settings_repo::SettingsRepository;

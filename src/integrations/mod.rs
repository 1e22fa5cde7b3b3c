// src/integrations/mod.rs
//
// External collaborators behind trait seams: the upstream catalog source,
// the two delivery channels, and the account directory.

pub mod account_directory;
pub mod anilist;
pub mod email;
pub mod upstream;
pub mod webhook;

pub use account_directory::{AccountDirectory, StaticAccountDirectory};
pub use anilist::AniListClient;
pub use email::{EmailDelivery, SmtpConfig, SmtpMailer, UnconfiguredMailer};
pub use upstream::{AiringItem, AiringScheduleSource, AiringWindow, SchedulePage};
pub use webhook::{HttpWebhookDelivery, WebhookDelivery};

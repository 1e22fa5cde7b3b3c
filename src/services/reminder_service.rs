// src/services/reminder_service.rs
//
// Owner-facing reminder management. All invariants are enforced here at
// creation time, so a misconfigured reminder never reaches the dispatch
// engine. The engines themselves never mutate reminders.

use std::sync::Arc;
use uuid::Uuid;

use crate::domain::{validate_reminder, EmailTarget, Reminder};
use crate::error::{AppError, AppResult};
use crate::events::{EventBus, ReminderCreated, ReminderDeleted};
use crate::repositories::{ReminderRepository, ShowRepository};

#[derive(Debug, Clone)]
pub struct CreateReminderRequest {
    pub owner: String,
    pub show_id: Option<Uuid>,
    pub email: Option<EmailTarget>,
    pub webhook_url: Option<String>,
    pub lead_minutes: u32,
}

pub struct ReminderService {
    reminders: Arc<dyn ReminderRepository>,
    shows: Arc<dyn ShowRepository>,
    event_bus: Arc<EventBus>,
}

impl ReminderService {
    pub fn new(
        reminders: Arc<dyn ReminderRepository>,
        shows: Arc<dyn ShowRepository>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            reminders,
            shows,
            event_bus,
        }
    }

    pub fn create_reminder(&self, request: CreateReminderRequest) -> AppResult<Uuid> {
        let reminder = Reminder::new(
            request.owner,
            request.show_id,
            request.email,
            request.webhook_url,
            request.lead_minutes,
        );

        validate_reminder(&reminder).map_err(AppError::Domain)?;

        if let Some(show_id) = reminder.show_id {
            if !self.shows.exists(show_id)? {
                return Err(AppError::NotFound);
            }
        }

        self.reminders.save(&reminder)?;
        self.event_bus
            .emit(ReminderCreated::new(reminder.id, reminder.owner.clone()));

        Ok(reminder.id)
    }

    pub fn delete_reminder(&self, id: Uuid) -> AppResult<()> {
        self.reminders.delete(id)?;
        self.event_bus.emit(ReminderDeleted::new(id));
        Ok(())
    }

    pub fn list_reminders(&self, owner: &str) -> AppResult<Vec<Reminder>> {
        self.reminders.list_by_owner(owner)
    }

    pub fn set_active(&self, id: Uuid, active: bool) -> AppResult<()> {
        self.reminders.set_active(id, active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, initialize_database};
    use crate::domain::Show;
    use crate::repositories::{
        ShowRepository as _, SqliteReminderRepository, SqliteShowRepository,
    };

    fn service() -> (ReminderService, Uuid) {
        let pool = Arc::new(create_test_pool());
        initialize_database(&pool.get().unwrap()).unwrap();

        let show_repo = SqliteShowRepository::new(pool.clone());
        let show = Show::new_local("Show A".to_string());
        show_repo.save(&show).unwrap();

        let service = ReminderService::new(
            Arc::new(SqliteReminderRepository::new(pool.clone())),
            Arc::new(SqliteShowRepository::new(pool)),
            Arc::new(EventBus::new()),
        );
        (service, show.id)
    }

    #[test]
    fn test_create_list_delete() {
        let (service, show_id) = service();

        let id = service
            .create_reminder(CreateReminderRequest {
                owner: "user-1".to_string(),
                show_id: Some(show_id),
                email: Some(EmailTarget::Account),
                webhook_url: None,
                lead_minutes: 60,
            })
            .unwrap();

        assert_eq!(service.list_reminders("user-1").unwrap().len(), 1);

        service.delete_reminder(id).unwrap();
        assert!(service.list_reminders("user-1").unwrap().is_empty());
    }

    #[test]
    fn test_invalid_lead_time_rejected_at_creation() {
        let (service, _) = service();

        let result = service.create_reminder(CreateReminderRequest {
            owner: "user-1".to_string(),
            show_id: None,
            email: Some(EmailTarget::Account),
            webhook_url: None,
            lead_minutes: 2,
        });
        assert!(matches!(result, Err(AppError::Domain(_))));
    }

    #[test]
    fn test_missing_target_rejected_at_creation() {
        let (service, _) = service();

        let result = service.create_reminder(CreateReminderRequest {
            owner: "user-1".to_string(),
            show_id: None,
            email: None,
            webhook_url: None,
            lead_minutes: 60,
        });
        assert!(matches!(result, Err(AppError::Domain(_))));
    }

    #[test]
    fn test_unknown_show_filter_rejected() {
        let (service, _) = service();

        let result = service.create_reminder(CreateReminderRequest {
            owner: "user-1".to_string(),
            show_id: Some(Uuid::new_v4()),
            email: Some(EmailTarget::Account),
            webhook_url: None,
            lead_minutes: 60,
        });
        assert!(matches!(result, Err(AppError::NotFound)));
    }
}

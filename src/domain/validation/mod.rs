mod analysis_job;
mod errors;
mod image_asset;
mod notification;
mod utils;

pub use analysis_job::{AgentType, JobStatus, validate_analysis_job};
pub use errors::{PayloadValidationError, ValidationFailureKind, ValidationResult};
pub use image_asset::{ImageUpload, validate_image_asset};
pub use notification::validate_notification;

use crate::domain::value_objects::{EntityPayload, EntityTable, SyncAction};
use crate::shared::config::ValidationConfig;

/// Checks a queued snapshot before dispatch. Never mutates the payload.
/// Deletes carry no body and always pass.
pub fn validate_entry(
    table: EntityTable,
    action: SyncAction,
    payload: &EntityPayload,
    config: &ValidationConfig,
) -> ValidationResult<()> {
    if action == SyncAction::Delete {
        return Ok(());
    }
    match table {
        EntityTable::AnalysisJobs => validate_analysis_job(payload),
        EntityTable::ImageAssets => {
            validate_image_asset(payload, config.max_image_bytes).map(|_| ())
        }
        EntityTable::Notifications => validate_notification(payload),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deletes_and_plain_tables_skip_validation() {
        let config = ValidationConfig {
            max_image_bytes: 16,
        };
        let empty = EntityPayload::default();
        assert!(validate_entry(EntityTable::Notifications, SyncAction::Delete, &empty, &config).is_ok());
        assert!(validate_entry(EntityTable::Lots, SyncAction::Create, &empty, &config).is_ok());
        assert!(validate_entry(EntityTable::Notifications, SyncAction::Create, &empty, &config).is_err());

        let job = EntityPayload::new(json!({"agentType": "crop_health", "status": "pending"})).unwrap();
        assert!(validate_entry(EntityTable::AnalysisJobs, SyncAction::Update, &job, &config).is_ok());
    }
}

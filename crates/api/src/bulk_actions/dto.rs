//! Client payloads of the bulk actions gateway.

use rebulk_core::commands::{parse_commands, RawCommand};
use rebulk_core::error::CoreError;
use rebulk_core::filter::BulkActionFilter;
use rebulk_core::status::BulkActionType;
use rebulk_core::types::{BulkActionId, DatabaseId};
use serde::Deserialize;

/// Maximum length of a client-chosen bulk action id.
const MAX_ID_LEN: usize = 256;

/// `create` request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBulkActionDto {
    pub id: BulkActionId,
    pub database_id: DatabaseId,
    #[serde(rename = "type")]
    pub action_type: BulkActionType,
    #[serde(default)]
    pub filter: Option<BulkActionFilter>,
    #[serde(default)]
    pub generate_report: bool,
    /// Raw commands of an upload, one per line.
    #[serde(default)]
    pub commands: Option<String>,
}

/// `get` and `abort` requests.
#[derive(Debug, Clone, Deserialize)]
pub struct BulkActionIdDto {
    pub id: BulkActionId,
}

/// A validated `create` request.
#[derive(Debug, Clone)]
pub struct BulkActionRequest {
    pub id: BulkActionId,
    pub database_id: DatabaseId,
    pub action_type: BulkActionType,
    pub filter: BulkActionFilter,
    pub generate_report: bool,
    /// Parsed upload commands; empty for deletes.
    pub commands: Vec<RawCommand>,
}

impl CreateBulkActionDto {
    pub fn validate(self) -> Result<BulkActionRequest, CoreError> {
        let id = self.id.trim().to_string();
        if id.is_empty() || id.len() > MAX_ID_LEN {
            return Err(CoreError::Validation(format!(
                "Bulk action id must be 1 to {MAX_ID_LEN} characters"
            )));
        }

        let filter = self.filter.unwrap_or_default().validated()?;

        let commands = match self.action_type {
            BulkActionType::Delete => Vec::new(),
            BulkActionType::Upload => {
                let commands = parse_commands(self.commands.as_deref().unwrap_or_default())?;
                if commands.is_empty() {
                    return Err(CoreError::Validation(
                        "Upload must contain at least one command".into(),
                    ));
                }
                commands
            }
        };

        Ok(BulkActionRequest {
            id,
            database_id: self.database_id,
            action_type: self.action_type,
            filter,
            generate_report: self.generate_report,
            commands,
        })
    }
}

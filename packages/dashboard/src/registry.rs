//! Rescue team and resource registration forms.

use alert_sphere_alert_models::{RescueTeam, Resource, ResourceStatus, TeamStatus};
use alert_sphere_database::DocumentStore;
use serde::Serialize;

use crate::{Notice, create_record, is_blank};

/// Notice when any text field of a registration form is blank.
pub const FILL_ALL_FIELDS: &str = "Fill all fields!";

/// Notice when a registration could not be stored.
pub const SAVE_FAILED: &str = "Failed to save. Please try again.";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeamForm {
    pub team_name: String,
    pub team_lead: String,
    pub contact: String,
    pub status: TeamStatus,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NewTeam<'a> {
    team_name: &'a str,
    team_lead: &'a str,
    contact: &'a str,
    status: TeamStatus,
}

impl TeamForm {
    /// Registers the team and resets the form.
    ///
    /// # Errors
    ///
    /// * [`Notice::Validation`] if a text field is blank; nothing is
    ///   written and the form is untouched.
    /// * [`Notice::Backend`] if the store write fails.
    pub async fn submit(&mut self, store: &dyn DocumentStore) -> Result<RescueTeam, Notice> {
        if [&self.team_name, &self.team_lead, &self.contact]
            .into_iter()
            .any(|field| is_blank(field))
        {
            return Err(Notice::Validation(FILL_ALL_FIELDS));
        }

        let new = NewTeam {
            team_name: self.team_name.trim(),
            team_lead: self.team_lead.trim(),
            contact: self.contact.trim(),
            status: self.status,
        };
        let team: RescueTeam = create_record(store, &new, SAVE_FAILED).await?;

        log::info!("Registered team {} ({})", team.team_name, team.status);
        *self = Self::default();
        Ok(team)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceForm {
    pub resource_name: String,
    /// Free text such as "200 kits".
    pub quantity: String,
    pub location: String,
    pub status: ResourceStatus,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NewResource<'a> {
    resource_name: &'a str,
    quantity: &'a str,
    location: &'a str,
    status: ResourceStatus,
}

impl ResourceForm {
    /// Registers the resource and resets the form.
    ///
    /// # Errors
    ///
    /// Same as [`TeamForm::submit`].
    pub async fn submit(&mut self, store: &dyn DocumentStore) -> Result<Resource, Notice> {
        if [&self.resource_name, &self.quantity, &self.location]
            .into_iter()
            .any(|field| is_blank(field))
        {
            return Err(Notice::Validation(FILL_ALL_FIELDS));
        }

        let new = NewResource {
            resource_name: self.resource_name.trim(),
            quantity: self.quantity.trim(),
            location: self.location.trim(),
            status: self.status,
        };
        let resource: Resource = create_record(store, &new, SAVE_FAILED).await?;

        log::info!(
            "Registered resource {} ({})",
            resource.resource_name,
            resource.status
        );
        *self = Self::default();
        Ok(resource)
    }
}

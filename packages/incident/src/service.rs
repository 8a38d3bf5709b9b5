//! Incident operations.

use std::sync::Arc;

use flood_watch_auth::{Claims, Operation, authorize};
use flood_watch_database::{incidents, is_valid_id, users};
use flood_watch_incident_models::{
    Incident, IncidentChanges, NewIncident, RescueStep, RescueStepChanges, next_step_number,
    rescue::find_step_mut,
};
use flood_watch_server_models::{
    IncidentListParams, IncidentListResponse, ReportIncidentRequest, RescueStepRequest,
    UpdateIncidentRequest, UpdateRescueStepRequest,
};
use flood_watch_user_models::Role;
use switchy_database::Database;

use crate::{
    ServiceError,
    params::{FieldErrors, INVALID_LOCATION, is_blank, non_empty, parse_list_params, parse_location},
};

const INCIDENT_NOT_FOUND: &str = "Incident not found";
const STEP_NOT_FOUND: &str = "Rescue step not found";
const INVALID_COMMANDER: &str = "Invalid commander identifier.";

/// Incident use cases on top of the incident repository.
pub struct IncidentService {
    db: Arc<dyn Database>,
}

impl IncidentService {
    #[must_use]
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }

    /// Creates an incident reported by the caller.
    ///
    /// `priority` and `status` default to `medium` and `reported`. A
    /// commander may be named at creation by any reporter.
    ///
    /// # Errors
    ///
    /// * [`ServiceError::Validation`] for missing or malformed fields
    /// * [`ServiceError::BadRequest`] if the commander cannot be resolved
    pub async fn report(
        &self,
        claims: &Claims,
        request: ReportIncidentRequest,
    ) -> Result<Incident, ServiceError> {
        authorize(claims, Operation::ReportIncident.allowed_roles())?;

        let mut errors = FieldErrors::default();

        let title = request.title.unwrap_or_default();
        if is_blank(&title) {
            errors.add("title", "Title is required");
        }
        let description = request.description.unwrap_or_default();
        if is_blank(&description) {
            errors.add("description", "Description is required");
        }
        let location = request.location.as_ref().and_then(parse_location);
        if location.is_none() {
            errors.add("location", INVALID_LOCATION);
        }
        let priority = errors.parse("priority", request.priority.as_deref());
        let status = errors.parse("status", request.status.as_deref());

        errors.into_result()?;
        let location = location.ok_or_else(|| ServiceError::BadRequest(INVALID_LOCATION.into()))?;

        let assigned_commander = match non_empty(request.assigned_commander.as_deref()) {
            Some(identifier) => Some(self.require_commander_id(identifier).await?),
            None => None,
        };

        let incident = incidents::insert_incident(
            self.db.as_ref(),
            &NewIncident {
                title,
                description,
                location,
                reported_by: claims.id.clone(),
                priority: priority.unwrap_or_default(),
                status: status.unwrap_or_default(),
                assigned_commander,
                official_instructions: request.official_instructions.unwrap_or_default(),
                team_notes: request.team_notes.unwrap_or_default(),
            },
        )
        .await?;

        log::info!(
            "Incident {} reported by {} ({})",
            incident.id,
            claims.username,
            claims.role
        );

        Ok(incident)
    }

    /// Returns one page of incidents plus paging totals.
    ///
    /// The page and the total are read independently; a write landing
    /// between the two reads can make them disagree slightly.
    ///
    /// # Errors
    ///
    /// * [`ServiceError::Validation`] for unparseable query parameters
    /// * [`ServiceError::BadRequest`] if the commander filter cannot be
    ///   resolved
    pub async fn list(
        &self,
        claims: &Claims,
        params: &IncidentListParams,
    ) -> Result<IncidentListResponse, ServiceError> {
        authorize(claims, Operation::ViewIncidents.allowed_roles())?;

        let parsed = parse_list_params(params)?;
        let mut query = parsed.query;
        if let Some(identifier) = parsed.commander.as_deref() {
            query.filter.assigned_commander = Some(self.require_commander_id(identifier).await?);
        }

        let db = self.db.as_ref();
        let (incidents, total) = tokio::try_join!(
            incidents::query_incidents(db, &query),
            incidents::count_incidents(db, &query.filter),
        )?;

        Ok(IncidentListResponse {
            incidents,
            total_pages: query.pagination.total_pages(total),
            current_page: query.pagination.page,
            total_incidents: total,
        })
    }

    /// Fetches one incident.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotFound`] if it does not exist.
    pub async fn get(&self, claims: &Claims, id: &str) -> Result<Incident, ServiceError> {
        authorize(claims, Operation::ViewIncidents.allowed_roles())?;
        self.load(id).await
    }

    /// Applies a partial update.
    ///
    /// Only fields present in the request change. Reassigning or clearing
    /// the commander needs a coordinator or official. Commanders may only
    /// touch incidents assigned to themselves.
    ///
    /// # Errors
    ///
    /// * [`ServiceError::Forbidden`] if the role does not allow the change
    /// * [`ServiceError::Validation`] for malformed fields
    /// * [`ServiceError::BadRequest`] if the commander cannot be resolved
    /// * [`ServiceError::NotFound`] if the incident does not exist
    pub async fn update(
        &self,
        claims: &Claims,
        id: &str,
        request: UpdateIncidentRequest,
    ) -> Result<Incident, ServiceError> {
        authorize(claims, Operation::UpdateIncident.allowed_roles())?;

        let mut errors = FieldErrors::default();
        let mut changes = IncidentChanges::default();

        if let Some(title) = request.title {
            match title {
                Some(title) if !is_blank(&title) => changes.title = Some(title),
                _ => errors.add("title", "Title cannot be empty"),
            }
        }
        if let Some(description) = request.description {
            match description {
                Some(description) if !is_blank(&description) => {
                    changes.description = Some(description);
                }
                _ => errors.add("description", "Description cannot be empty"),
            }
        }
        if let Some(value) = &request.location {
            changes.location = parse_location(value);
            if changes.location.is_none() {
                errors.add("location", INVALID_LOCATION);
            }
        }
        changes.priority =
            errors.parse_present("priority", request.priority.as_ref().map(Option::as_deref));
        changes.status =
            errors.parse_present("status", request.status.as_ref().map(Option::as_deref));
        changes.official_instructions =
            text_field(&mut errors, "officialInstructions", request.official_instructions);
        changes.team_notes = text_field(&mut errors, "teamNotes", request.team_notes);

        errors.into_result()?;

        if request.assigned_commander.is_some() {
            authorize(claims, Operation::AssignCommander.allowed_roles())
                .map_err(|_| forbidden("You are not authorized to assign commanders."))?;
        }

        let incident = self.load(id).await?;

        if claims.role == Role::Commander && !is_assigned_to(&incident, claims) {
            return Err(forbidden(
                "Commanders may only update incidents assigned to them.",
            ));
        }

        changes.assigned_commander = match request.assigned_commander {
            Some(Some(identifier)) if !identifier.is_empty() => {
                Some(Some(self.require_commander_id(&identifier).await?))
            }
            Some(None) => Some(None),
            // An empty identifier is neither an assignment nor a clear.
            Some(Some(_)) | None => None,
        };

        if !incidents::update_incident(self.db.as_ref(), id, &changes).await? {
            return Err(not_found(INCIDENT_NOT_FOUND));
        }

        log::info!("Incident {id} updated by {} ({})", claims.username, claims.role);

        self.load(id).await
    }

    /// Permanently deletes an incident.
    ///
    /// # Errors
    ///
    /// * [`ServiceError::Forbidden`] unless official or commander
    /// * [`ServiceError::NotFound`] if it does not exist
    pub async fn delete(&self, claims: &Claims, id: &str) -> Result<(), ServiceError> {
        authorize(claims, Operation::DeleteIncident.allowed_roles())?;

        if !incidents::delete_incident(self.db.as_ref(), id).await? {
            return Err(not_found(INCIDENT_NOT_FOUND));
        }

        log::info!("Incident {id} deleted by {} ({})", claims.username, claims.role);

        Ok(())
    }

    /// Appends a rescue step numbered one past the current highest.
    ///
    /// The step list is read, extended, and written back without a lock,
    /// so two concurrent appends to the same incident can pick the same
    /// number and the later write drops the earlier step.
    ///
    /// # Errors
    ///
    /// * [`ServiceError::Forbidden`] unless coordinator or commander
    /// * [`ServiceError::BadRequest`] if the instruction is blank
    /// * [`ServiceError::NotFound`] if the incident does not exist
    pub async fn add_rescue_step(
        &self,
        claims: &Claims,
        id: &str,
        request: RescueStepRequest,
    ) -> Result<Incident, ServiceError> {
        authorize(claims, Operation::AddRescueStep.allowed_roles())?;

        let instruction = request
            .instruction
            .filter(|i| !is_blank(i))
            .ok_or_else(|| {
                ServiceError::BadRequest("Instruction is required for a rescue step.".to_string())
            })?;

        let mut incident = self.load(id).await?;
        let step_number = next_step_number(&incident.rescue_steps);
        incident
            .rescue_steps
            .push(RescueStep::new(step_number, instruction));

        self.save_steps(&incident).await?;

        log::info!("Rescue step {step_number} added to incident {id}");

        Ok(incident)
    }

    /// Updates the instruction and/or completion flag of one step.
    ///
    /// Same read-modify-write race as [`Self::add_rescue_step`].
    ///
    /// # Errors
    ///
    /// * [`ServiceError::Forbidden`] for officials
    /// * [`ServiceError::NotFound`] if the incident or step does not exist
    /// * [`ServiceError::Validation`] if the new instruction is blank
    pub async fn update_rescue_step(
        &self,
        claims: &Claims,
        id: &str,
        step_number: &str,
        request: UpdateRescueStepRequest,
    ) -> Result<Incident, ServiceError> {
        authorize(claims, Operation::UpdateRescueStep.allowed_roles())?;

        let mut incident = self.load(id).await?;

        let step = match step_number.parse::<u32>() {
            Ok(n) => find_step_mut(&mut incident.rescue_steps, n),
            Err(_) => None,
        }
        .ok_or_else(|| not_found(STEP_NOT_FOUND))?;

        let changes = RescueStepChanges {
            instruction: request.instruction,
            is_completed: request.is_completed,
        };
        if changes.instruction.as_deref().is_some_and(is_blank) {
            let mut errors = FieldErrors::default();
            errors.add("instruction", "Instruction cannot be empty");
            errors.into_result()?;
        }
        step.apply(&changes);

        self.save_steps(&incident).await?;

        Ok(incident)
    }

    /// Resolves a commander given as an internal id or a username.
    ///
    /// Id-shaped input is looked up by id only. Anything else is matched
    /// against usernames, ignoring case. Returns `None` if nothing matches.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Database`] if a lookup fails.
    pub async fn resolve_commander_id(
        &self,
        identifier: &str,
    ) -> Result<Option<String>, ServiceError> {
        if identifier.is_empty() {
            return Ok(None);
        }

        let user = if is_valid_id(identifier) {
            users::find_user_by_id(self.db.as_ref(), identifier).await?
        } else {
            users::find_user_by_username_ignore_case(self.db.as_ref(), identifier).await?
        };

        Ok(user.map(|u| u.id))
    }

    async fn require_commander_id(&self, identifier: &str) -> Result<String, ServiceError> {
        self.resolve_commander_id(identifier)
            .await?
            .ok_or_else(|| ServiceError::BadRequest(INVALID_COMMANDER.to_string()))
    }

    async fn load(&self, id: &str) -> Result<Incident, ServiceError> {
        incidents::get_incident(self.db.as_ref(), id)
            .await?
            .ok_or_else(|| not_found(INCIDENT_NOT_FOUND))
    }

    async fn save_steps(&self, incident: &Incident) -> Result<(), ServiceError> {
        if incidents::save_rescue_steps(self.db.as_ref(), &incident.id, &incident.rescue_steps)
            .await?
        {
            Ok(())
        } else {
            Err(not_found(INCIDENT_NOT_FOUND))
        }
    }
}

fn is_assigned_to(incident: &Incident, claims: &Claims) -> bool {
    incident
        .assigned_commander
        .as_ref()
        .is_some_and(|c| c.id == claims.id)
}

fn forbidden(message: &str) -> ServiceError {
    ServiceError::Forbidden(message.to_string())
}

fn not_found(message: &str) -> ServiceError {
    ServiceError::NotFound(message.to_string())
}

/// Free-text update field: any string (including empty) is accepted,
/// `null` is not.
fn text_field(
    errors: &mut FieldErrors,
    field: &str,
    value: Option<Option<String>>,
) -> Option<String> {
    match value? {
        Some(text) => Some(text),
        None => {
            errors.add(field, format!("{field} cannot be null"));
            None
        }
    }
}

//! Appointment use-case service.
//!
//! # Responsibility
//! - Serve paginated, classification-scoped listings with optional search.
//! - Wrap store mutations and report the classification callers should
//!   return to afterwards.
//! - Provide read models for edit forms and classification pickers.
//!
//! # Invariants
//! - Page size comes from construction, never from per-request state.
//! - Blank search input routes to plain classification filtering.
//! - Service APIs never bypass repository validation.

use crate::config::CoreConfig;
use crate::model::appointment::{Appointment, AppointmentId};
use crate::pagination::{normalize_page_number, paginate_stream, PaginationError, PaginationInfo};
use crate::repo::appointment_repo::{AppointmentRepository, RepoError};
use crate::repo::classification_repo::ClassificationRepository;
use crate::search::criteria::SearchCriteria;
use futures::TryStreamExt;
use log::debug;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Service error for appointment and history use-cases.
#[derive(Debug)]
pub enum ServiceError {
    Repo(RepoError),
    Pagination(PaginationError),
    /// Internal consistency mismatch between write and read-back.
    InconsistentState(&'static str),
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Repo(err) => write!(f, "{err}"),
            Self::Pagination(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => {
                write!(f, "inconsistent appointment state: {details}")
            }
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            Self::Pagination(err) => Some(err),
            Self::InconsistentState(_) => None,
        }
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<PaginationError> for ServiceError {
    fn from(value: PaginationError) -> Self {
        Self::Pagination(value)
    }
}

/// Listing view model for one classification page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppointmentListing {
    pub items: Vec<Appointment>,
    pub pagination: PaginationInfo,
    pub current_classification: String,
    /// Normalized search term, `None` when the listing is unfiltered.
    pub search_criteria: Option<String>,
}

/// Classification picker model for one appointment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassificationChoices {
    pub appointment_id: AppointmentId,
    pub current_classification: String,
    /// Registry names in id order.
    pub classifications: Vec<String>,
}

/// Appointment service facade over store and registry repositories.
pub struct AppointmentService<R: AppointmentRepository, C: ClassificationRepository> {
    appointments: R,
    classifications: C,
    page_size: u32,
}

impl<R: AppointmentRepository, C: ClassificationRepository> AppointmentService<R, C> {
    /// Creates a service listing `page_size` appointments per page.
    pub fn new(appointments: R, classifications: C, page_size: u32) -> Self {
        Self {
            appointments,
            classifications,
            page_size,
        }
    }

    /// Creates a service using the configured page size.
    pub fn from_config(appointments: R, classifications: C, config: &CoreConfig) -> Self {
        Self::new(appointments, classifications, config.page_size)
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Lists one page of `classification`, optionally narrowed by `raw_search`.
    ///
    /// `page` defaults to 1; pages past the end are empty.
    pub async fn list_page(
        &self,
        classification: &str,
        raw_search: Option<&str>,
        page: Option<u32>,
    ) -> ServiceResult<AppointmentListing> {
        let criteria = SearchCriteria::from_query(raw_search);
        let stream = match criteria.as_ref() {
            Some(criteria) => self
                .appointments
                .search_appointments_stream(criteria, classification),
            None => self.appointments.filter_appointments_stream(classification),
        };

        let page = paginate_stream(
            stream.map_err(ServiceError::from),
            self.page_size,
            normalize_page_number(page),
        )
        .await?;
        debug!(
            "event=appointment_list module=service status=ok page={} items={} total_items={} search={}",
            page.info.current_page,
            page.items.len(),
            page.info.total_items,
            criteria.is_some()
        );

        Ok(AppointmentListing {
            items: page.items,
            pagination: page.info,
            current_classification: classification.to_string(),
            search_criteria: criteria.map(|value| value.term().to_string()),
        })
    }

    /// Stores a new appointment and returns its classification name.
    pub fn add_appointment(&self, appointment: &Appointment) -> ServiceResult<String> {
        let id = self.appointments.add_appointment(appointment)?;
        self.classification_of(id, "created appointment not found in read-back")
    }

    /// Replaces appointment `id` with `appointment` and returns its
    /// classification name.
    pub fn update_appointment(
        &self,
        id: AppointmentId,
        appointment: &Appointment,
    ) -> ServiceResult<String> {
        let mut target = appointment.clone();
        target.id = id;
        self.appointments.update_appointment(&target)?;
        self.classification_of(id, "updated appointment not found in read-back")
    }

    /// Removes appointment `id`; returns `classification` for the redirect.
    pub fn remove_appointment(
        &self,
        id: AppointmentId,
        classification: &str,
    ) -> ServiceResult<String> {
        self.appointments.remove_by_id(id)?;
        Ok(classification.to_string())
    }

    /// Moves appointment `id` to `classification` and returns the new name.
    pub fn mark_classification(
        &self,
        id: AppointmentId,
        classification: &str,
    ) -> ServiceResult<String> {
        self.appointments.set_classification(id, classification)?;
        self.classification_of(id, "reclassified appointment not found in read-back")
    }

    /// Loads appointment `id` for editing, or an empty form model on miss.
    pub fn load_for_edit(&self, id: AppointmentId) -> ServiceResult<Appointment> {
        Ok(self.appointments.get_appointment(id)?.unwrap_or_default())
    }

    /// Registry names in id order, for navigation.
    pub fn classification_names(&self) -> ServiceResult<Vec<String>> {
        Ok(self
            .classifications
            .get_all_classifications()?
            .into_iter()
            .map(|classification| classification.name)
            .collect())
    }

    /// Picker model listing every classification for one appointment.
    pub fn classification_choices(
        &self,
        appointment_id: AppointmentId,
        current_classification: &str,
    ) -> ServiceResult<ClassificationChoices> {
        Ok(ClassificationChoices {
            appointment_id,
            current_classification: current_classification.to_string(),
            classifications: self.classification_names()?,
        })
    }

    fn classification_of(
        &self,
        id: AppointmentId,
        missing: &'static str,
    ) -> ServiceResult<String> {
        self.appointments
            .get_appointment(id)?
            .and_then(|appointment| appointment.classification.map(|value| value.name))
            .ok_or(ServiceError::InconsistentState(missing))
    }
}

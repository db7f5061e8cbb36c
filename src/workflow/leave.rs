use chrono::{DateTime, NaiveDate, Utc};
use tracing::{info, warn};

use super::{
    CatalogCache, WorkflowError,
    reconcile::{applicable, reconcile_user},
    transition::{approval_step, initial_level, rejection_check},
};
use crate::model::{
    balance::LeaveBalance,
    leave_request::{ApprovalLevel, LeaveRequest, LeaveStatus, inclusive_days},
    leave_type::LeaveType,
    profile::Profile,
    role::Role,
    user::{Account, User},
};
use crate::notify::{Notifier, links, templates};
use crate::store::{Debit, NewAttachment, NewLeaveRequest, Store, StoreResult, Transition};

pub const DEFAULT_REJECTION_REASON: &str = "No reason provided.";

const APPROVED_MESSAGE: &str =
    "Your leave request has been fully approved. See below for your approval letter.";

#[derive(Debug, Clone)]
pub struct LeaveApplication {
    pub leave_type_id: Option<u64>,
    /// Free-text type used when no catalog entry fits.
    pub other_leave_type: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reason: String,
    pub attachments: Vec<NewAttachment>,
}

/// Leave operations for one request scope.
pub struct Workflow<'a, S> {
    store: &'a S,
    catalog: &'a CatalogCache,
    notifier: &'a Notifier,
}

impl<'a, S: Store> Workflow<'a, S> {
    pub fn new(store: &'a S, catalog: &'a CatalogCache, notifier: &'a Notifier) -> Self {
        Self {
            store,
            catalog,
            notifier,
        }
    }

    /// Active leave types the profile may apply for.
    pub async fn applicable_types(&self, profile: &Profile) -> StoreResult<Vec<LeaveType>> {
        let types = self.catalog.active(self.store).await?;
        Ok(applicable(&types, profile.gender).cloned().collect())
    }

    pub async fn reconcile(&self, profile: &Profile) -> StoreResult<u32> {
        let types = self.catalog.active(self.store).await?;
        reconcile_user(self.store, &types, profile).await
    }

    /// Reconciles first, then returns balances for the applicable types.
    pub async fn balances(&self, profile: &Profile) -> StoreResult<Vec<LeaveBalance>> {
        let types = self.catalog.active(self.store).await?;
        reconcile_user(self.store, &types, profile).await?;

        let offered: Vec<u64> = applicable(&types, profile.gender).map(|t| t.id).collect();
        Ok(self
            .store
            .balances(profile.user_id)
            .await?
            .into_iter()
            .filter(|b| offered.contains(&b.leave_type_id))
            .collect())
    }

    pub async fn submit(
        &self,
        applicant: &Account,
        application: LeaveApplication,
        now: DateTime<Utc>,
    ) -> Result<LeaveRequest, WorkflowError> {
        let profile = &applicant.profile;

        if profile.role == Role::Staff && profile.department.is_none() {
            return Err(WorkflowError::DepartmentRequired);
        }
        if application.end_date < application.start_date {
            return Err(WorkflowError::InvalidDateRange);
        }

        let total_days = inclusive_days(application.start_date, application.end_date);
        let other_leave_type = application
            .other_leave_type
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());

        let leave_type = match application.leave_type_id {
            Some(id) => Some(self.offered_type(profile, id).await?),
            None if other_leave_type.is_some() => None,
            None => return Err(WorkflowError::LeaveTypeRequired),
        };

        if let Some(leave_type) = &leave_type {
            self.reconcile(profile).await?;
            let remaining = self
                .store
                .balance(profile.user_id, leave_type.id)
                .await?
                .map_or(0, |b| b.remaining_days);

            if i64::from(total_days) > remaining {
                info!(
                    user_id = profile.user_id,
                    leave_type = %leave_type.name,
                    requested = total_days,
                    remaining,
                    "Leave request exceeds balance"
                );
                return Err(WorkflowError::InsufficientBalance {
                    remaining,
                    leave_type: leave_type.name.clone(),
                });
            }
        }

        let level = initial_level(profile.role);
        let completed = level == ApprovalLevel::Completed;
        let debit = leave_type
            .as_ref()
            .filter(|_| completed)
            .map(|t| Debit {
                user_id: profile.user_id,
                leave_type_id: t.id,
                days: total_days,
            });

        let request = self
            .store
            .insert_leave_request(NewLeaveRequest {
                user_id: profile.user_id,
                leave_type_id: leave_type.as_ref().map(|t| t.id),
                other_leave_type: if leave_type.is_some() {
                    None
                } else {
                    other_leave_type
                },
                start_date: application.start_date,
                end_date: application.end_date,
                reason: application.reason,
                status: if completed {
                    LeaveStatus::Approved
                } else {
                    LeaveStatus::Pending
                },
                approval_level: level,
                ceo_approval_date: completed.then_some(now),
                attachments: application.attachments,
                debit,
            })
            .await?;

        info!(
            request_id = request.id,
            user_id = profile.user_id,
            level = %request.approval_level,
            days = total_days,
            "Leave request submitted"
        );

        let type_name = leave_type.map(|t| t.name);
        self.announce_submission(applicant, &request, type_name).await;

        Ok(request)
    }

    pub async fn approve(
        &self,
        actor: &Account,
        request_id: u64,
        now: DateTime<Utc>,
    ) -> Result<LeaveRequest, WorkflowError> {
        let request = self
            .store
            .find_leave_request(request_id)
            .await?
            .ok_or(WorkflowError::NotFound)?;

        let step = approval_step(request.status, request.approval_level, actor.profile.role)?;

        let debit = request
            .leave_type_id
            .filter(|_| step.completes())
            .map(|leave_type_id| Debit {
                user_id: request.user_id,
                leave_type_id,
                days: request.total_days(),
            });

        let transition = Transition {
            from_level: request.approval_level,
            to_level: step.to,
            status: if step.completes() {
                LeaveStatus::Approved
            } else {
                LeaveStatus::Pending
            },
            stamp: Some((step.stamp, now)),
            rejection_reason: None,
            debit,
        };

        let updated = self.store.apply_transition(request.id, &transition).await?;

        info!(
            request_id = updated.id,
            approver = actor.user.id,
            from = %request.approval_level,
            to = %updated.approval_level,
            "Leave request approved at level"
        );

        self.announce_approval(actor, &updated).await;

        Ok(updated)
    }

    pub async fn reject(
        &self,
        actor: &Account,
        request_id: u64,
        reason: Option<String>,
    ) -> Result<LeaveRequest, WorkflowError> {
        let request = self
            .store
            .find_leave_request(request_id)
            .await?
            .ok_or(WorkflowError::NotFound)?;

        rejection_check(request.status, request.approval_level, actor.profile.role)?;

        let reason = reason
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| DEFAULT_REJECTION_REASON.to_string());

        let transition = Transition {
            from_level: request.approval_level,
            to_level: request.approval_level,
            status: LeaveStatus::Rejected,
            stamp: None,
            rejection_reason: Some(reason.clone()),
            debit: None,
        };

        let updated = self.store.apply_transition(request.id, &transition).await?;

        info!(
            request_id = updated.id,
            approver = actor.user.id,
            level = %updated.approval_level,
            "Leave request rejected"
        );

        let message = format!(
            "Your leave request has been rejected by {}. Reason: {}",
            actor.profile.role, reason
        );
        self.notify_applicant(&updated, &message).await;

        Ok(updated)
    }

    async fn offered_type(&self, profile: &Profile, id: u64) -> Result<LeaveType, WorkflowError> {
        let leave_type = self
            .store
            .find_leave_type(id)
            .await?
            .ok_or(WorkflowError::UnknownLeaveType(id))?;

        if !leave_type.is_active || !leave_type.applies_to(profile.gender) {
            return Err(WorkflowError::LeaveTypeUnavailable(leave_type.name));
        }
        Ok(leave_type)
    }

    async fn announce_submission(&self, applicant: &Account, request: &LeaveRequest, leave_type: Option<String>) {
        let Some(role) = request.approval_level.approver() else {
            // completed on submission
            let leave_type = leave_type
                .or_else(|| request.other_leave_type.clone())
                .unwrap_or_default();
            let letter = templates::approval_letter(applicant, request, &leave_type);
            self.deliver(&applicant.user, APPROVED_MESSAGE, links::DASHBOARD, Some(letter))
                .await;
            return;
        };

        let department = applicant
            .profile
            .department
            .as_deref()
            .filter(|_| role.has_department());
        let message = format!(
            "New leave request from {} requires your approval.",
            applicant.user.full_name()
        );
        self.alert_approver(request, role, department, &message).await;

        let message = format!(
            "Your leave request has been submitted and is pending {} approval.",
            request.approval_level
        );
        self.deliver(&applicant.user, &message, links::DASHBOARD, None).await;
    }

    async fn announce_approval(&self, actor: &Account, request: &LeaveRequest) {
        let applicant = match self.store.find_account(request.user_id).await {
            Ok(Some(applicant)) => applicant,
            Ok(None) => {
                warn!(request_id = request.id, "Applicant no longer exists");
                return;
            }
            Err(e) => {
                warn!(error = %e, request_id = request.id, "Applicant lookup failed");
                return;
            }
        };

        let Some(next) = request.approval_level.approver() else {
            let leave_type = match request.leave_type_id {
                Some(id) => match self.store.find_leave_type(id).await {
                    Ok(found) => found.map(|t| t.name),
                    Err(e) => {
                        warn!(error = %e, request_id = request.id, "Leave type lookup failed");
                        None
                    }
                },
                None => request.other_leave_type.clone(),
            }
            .unwrap_or_default();
            let letter = templates::approval_letter(&applicant, request, &leave_type);
            self.deliver(&applicant.user, APPROVED_MESSAGE, links::DASHBOARD, Some(letter))
                .await;
            return;
        };

        let message = format!(
            "Leave request #{} from {} requires your approval.",
            request.id,
            applicant.user.full_name()
        );
        self.alert_approver(request, next, None, &message).await;

        let message = format!(
            "Your leave request has been approved by {} and is pending {} approval.",
            actor.profile.role, request.approval_level
        );
        self.deliver(&applicant.user, &message, links::DASHBOARD, None).await;
    }

    async fn notify_applicant(&self, request: &LeaveRequest, message: &str) {
        match self.store.find_account(request.user_id).await {
            Ok(Some(applicant)) => {
                self.deliver(&applicant.user, message, links::DASHBOARD, None).await;
            }
            Ok(None) => warn!(request_id = request.id, "Applicant no longer exists"),
            Err(e) => warn!(error = %e, request_id = request.id, "Applicant lookup failed"),
        }
    }

    async fn alert_approver(&self, request: &LeaveRequest, role: Role, department: Option<&str>, message: &str) {
        match self.store.find_approver(role, department).await {
            Ok(Some(approver)) => {
                self.deliver(&approver.user, message, links::APPROVALS, None).await;
            }
            Ok(None) => warn!(
                request_id = request.id,
                role = %role,
                department = ?department,
                "No approver found for leave request"
            ),
            Err(e) => warn!(error = %e, request_id = request.id, role = %role, "Approver lookup failed"),
        }
    }

    /// One notification; a failure is logged and the rest still go out.
    async fn deliver(&self, recipient: &User, message: &str, link: &str, letter: Option<String>) {
        if let Err(e) = self
            .notifier
            .send(self.store, recipient, message, Some(link), letter)
            .await
        {
            warn!(error = %e, user_id = recipient.id, "Notification failed");
        }
    }
}

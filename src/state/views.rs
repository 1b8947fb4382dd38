//! Cook and eater views
//!
//! Both views show data for one selected date. Selecting a date starts a
//! fetch; only the fetch for the latest selection is shown.

use chrono::NaiveDate;
use uuid::Uuid;

use crate::models::{MealSelection, MealStatusRecord, RosterEntry, User};
use crate::services::{MealStatusStore, RosterAggregator};
use crate::state::selection::{FetchOutcome, SelectionGuard, Ticket};
use crate::utils::errors::{MealPlannerError, Result};
use crate::utils::helpers::format_date;
use crate::utils::logging::log_stale_result;

/// Resolve a fetch against its ticket. Errors from stale fetches are dropped
/// along with their results.
fn settle<V: Clone>(
    guard: &SelectionGuard<NaiveDate, V>,
    ticket: &Ticket<NaiveDate>,
    view: &str,
    result: Result<V>,
) -> Result<FetchOutcome<V>> {
    if !guard.is_current(ticket) {
        log_stale_result(view, &format_date(*ticket.key()), ticket.sequence());
        return Ok(FetchOutcome::Discarded);
    }

    let value = result?;
    if guard.complete(ticket, value.clone()) {
        Ok(FetchOutcome::Applied(value))
    } else {
        log_stale_result(view, &format_date(*ticket.key()), ticket.sequence());
        Ok(FetchOutcome::Discarded)
    }
}

/// The cook's roster for a chosen date
pub struct CookView {
    roster: RosterAggregator,
    group_id: Uuid,
    guard: SelectionGuard<NaiveDate, Vec<RosterEntry>>,
}

impl CookView {
    pub fn new(roster: RosterAggregator, group_id: Uuid) -> Self {
        Self {
            roster,
            group_id,
            guard: SelectionGuard::new(),
        }
    }

    pub fn group_id(&self) -> Uuid {
        self.group_id
    }

    /// Select `date` and load its roster
    pub async fn select_date(&self, date: NaiveDate) -> Result<FetchOutcome<Vec<RosterEntry>>> {
        let ticket = self.guard.begin(date);
        let result = self.roster.aggregate(self.group_id, date).await;
        settle(&self.guard, &ticket, "cook", result)
    }

    pub fn selected_date(&self) -> Option<NaiveDate> {
        self.guard.selected()
    }

    pub fn displayed(&self) -> Option<(NaiveDate, Vec<RosterEntry>)> {
        self.guard.displayed()
    }

    /// Tear the view down; fetches still in flight are discarded
    pub fn close(&self) {
        self.guard.close();
    }
}

/// The eater's own meal choices for a chosen date
pub struct EaterView {
    meal_status: MealStatusStore,
    user: User,
    guard: SelectionGuard<NaiveDate, MealSelection>,
}

impl std::fmt::Debug for EaterView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EaterView")
            .field("user", &self.user)
            .field("guard", &self.guard)
            .finish_non_exhaustive()
    }
}

impl EaterView {
    pub fn new(meal_status: MealStatusStore, user: User) -> Self {
        Self {
            meal_status,
            user,
            guard: SelectionGuard::new(),
        }
    }

    pub fn user(&self) -> &User {
        &self.user
    }

    /// Select `date` and load the stored choices for it
    pub async fn select_date(&self, date: NaiveDate) -> Result<FetchOutcome<MealSelection>> {
        let ticket = self.guard.begin(date);
        let result = self
            .meal_status
            .get_status(&self.user.uid, date)
            .await
            .map(|record| record.selection());
        settle(&self.guard, &ticket, "eater", result)
    }

    /// Save choices for the selected date. A load still in flight for that
    /// date is superseded so it cannot overwrite what was just saved.
    pub async fn save(&self, selection: MealSelection) -> Result<MealStatusRecord> {
        let date = self
            .guard
            .selected()
            .ok_or_else(|| MealPlannerError::Validation("Select a date before saving".to_string()))?;

        let ticket = self.guard.begin(date);
        let record = self.meal_status.declare(&self.user, date, selection).await?;
        self.guard.complete(&ticket, record.selection());
        Ok(record)
    }

    pub fn selected_date(&self) -> Option<NaiveDate> {
        self.guard.selected()
    }

    pub fn displayed(&self) -> Option<(NaiveDate, MealSelection)> {
        self.guard.displayed()
    }

    pub fn close(&self) {
        self.guard.close();
    }
}

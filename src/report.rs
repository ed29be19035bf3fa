//! Per-profile status report.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::Serialize;

use crate::domain::{LiftType, Program, WorkoutSession};
use crate::generator::next_lift;
use crate::history::{HistorySummary, relevant_history};
use crate::profile::TrainingProfile;
use crate::progression::{CycleProposal, ProgressionRules, propose_cycle_transition_with};
use crate::schedule::DELOAD_WEEK;

/// Where a lifter stands in their program.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileStatus {
    pub profile_id: String,
    pub name: Option<String>,
    pub program: Program,
    pub cycle: u32,
    pub week: u32,
    pub training_maxes: HashMap<LiftType, f64>,
    pub one_rep_maxes: HashMap<LiftType, f64>,
    /// `None` once every lift is done for the week.
    pub next_lift: Option<LiftType>,
    pub days_since_last_session: Option<i64>,
    pub summary: HistorySummary,
    /// Present during the deload week, when a transition is due.
    pub proposal: Option<CycleProposal>,
}

impl ProfileStatus {
    pub fn from_profile(
        profile: &TrainingProfile,
        history: &[WorkoutSession],
        rules: &ProgressionRules,
        at: DateTime<Utc>,
    ) -> Self {
        let next_lift = next_lift(profile, history).unwrap_or_else(|e| {
            log::warn!("Cannot pick next lift for profile {}: {}", profile.id, e);
            None
        });

        let days_since_last_session = relevant_history(history, &profile.id)
            .map(|s| s.date)
            .max()
            .map(|last| (at - last).num_days().max(0));

        let proposal = (profile.current_week == DELOAD_WEEK)
            .then(|| propose_cycle_transition_with(profile, history, rules));

        Self {
            profile_id: profile.id.clone(),
            name: profile.name.clone(),
            program: profile.selected_program,
            cycle: profile.current_cycle,
            week: profile.current_week,
            training_maxes: profile.training_maxes.clone(),
            one_rep_maxes: profile.one_rep_maxes.clone(),
            next_lift,
            days_since_last_session,
            summary: HistorySummary::from_history(history, &profile.id),
            proposal,
        }
    }
}

/// Builds the status of every profile, in input order.
///
/// Profiles are independent, so they are evaluated in parallel via rayon.
pub fn profile_statuses(
    profiles: &[TrainingProfile],
    history: &[WorkoutSession],
    rules: &ProgressionRules,
    at: DateTime<Utc>,
) -> Vec<ProfileStatus> {
    profiles
        .par_iter()
        .map(|profile| ProfileStatus::from_profile(profile, history, rules, at))
        .collect()
}

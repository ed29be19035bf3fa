//! Domain types for lifts, programs and workout sessions.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Profile id that owns sessions recorded without a `profileId`.
pub const ROOT_PROFILE_ID: &str = "root";

/// Barbell lifts tracked by the program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LiftType {
    #[serde(rename = "Squat")]
    Squat,
    #[serde(rename = "Bench Press")]
    BenchPress,
    #[serde(rename = "Deadlift")]
    Deadlift,
    #[serde(rename = "Overhead Press")]
    OverheadPress,
}

impl LiftType {
    /// Returns all lift variants.
    pub fn all() -> &'static [LiftType] {
        &[
            LiftType::Squat,
            LiftType::BenchPress,
            LiftType::Deadlift,
            LiftType::OverheadPress,
        ]
    }

    /// Returns the display name for the lift.
    pub fn display_name(&self) -> &'static str {
        match self {
            LiftType::Squat => "Squat",
            LiftType::BenchPress => "Bench Press",
            LiftType::Deadlift => "Deadlift",
            LiftType::OverheadPress => "Overhead Press",
        }
    }

    /// Short lowercase identifier used in URLs and on the command line.
    pub fn id(&self) -> &'static str {
        match self {
            LiftType::Squat => "squat",
            LiftType::BenchPress => "bench",
            LiftType::Deadlift => "deadlift",
            LiftType::OverheadPress => "press",
        }
    }

    /// Squat and deadlift progress in larger jumps than the pressing lifts.
    pub fn is_lower_body(&self) -> bool {
        matches!(self, LiftType::Squat | LiftType::Deadlift)
    }
}

impl FromStr for LiftType {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "squat" => Ok(LiftType::Squat),
            "bench" | "bench press" | "benchpress" => Ok(LiftType::BenchPress),
            "deadlift" | "dl" => Ok(LiftType::Deadlift),
            "press" | "ohp" | "overhead press" | "overheadpress" => Ok(LiftType::OverheadPress),
            _ => Err(EngineError::invalid("lift", s)),
        }
    }
}

impl std::fmt::Display for LiftType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Unit system for weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    #[default]
    Lbs,
    Kg,
}

impl Unit {
    /// Smallest practical plate jump for this unit.
    pub fn default_rounding(&self) -> f64 {
        match self {
            Unit::Lbs => 5.0,
            Unit::Kg => 2.5,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Unit::Lbs => "lbs",
            Unit::Kg => "kg",
        }
    }
}

impl FromStr for Unit {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "lbs" | "lb" => Ok(Unit::Lbs),
            "kg" | "kgs" => Ok(Unit::Kg),
            _ => Err(EngineError::invalid("unit", s)),
        }
    }
}

/// Program variant, which decides the shape of supplemental work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Program {
    #[default]
    Original,
    #[serde(rename = "BBB")]
    Bbb,
    #[serde(rename = "FSL")]
    Fsl,
    Beginner,
    #[serde(rename = "BBS")]
    Bbs,
    Monolith,
}

impl Program {
    pub fn all() -> &'static [Program] {
        &[
            Program::Original,
            Program::Bbb,
            Program::Fsl,
            Program::Beginner,
            Program::Bbs,
            Program::Monolith,
        ]
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Program::Original => "Original",
            Program::Bbb => "BBB",
            Program::Fsl => "FSL",
            Program::Beginner => "Beginner",
            Program::Bbs => "BBS",
            Program::Monolith => "Monolith",
        }
    }

    /// Variants locked behind the premium entitlement.
    pub fn requires_premium(&self) -> bool {
        matches!(self, Program::Bbs | Program::Monolith)
    }
}

impl FromStr for Program {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Program::all()
            .iter()
            .copied()
            .find(|p| p.display_name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| EngineError::invalid("program", s))
    }
}

impl std::fmt::Display for Program {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Rule used to move training maxes between cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ProgressionScheme {
    #[default]
    Standard,
    Performance,
}

impl FromStr for ProgressionScheme {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "standard" => Ok(ProgressionScheme::Standard),
            "performance" => Ok(ProgressionScheme::Performance),
            _ => Err(EngineError::invalid("progression scheme", s)),
        }
    }
}

/// A single prescribed or logged set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetData {
    pub reps: u32,
    pub weight: f64,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub is_amrap: bool,
    #[serde(default)]
    pub is_warmup: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_reps: Option<u32>,
}

impl SetData {
    /// Creates an uncompleted working set.
    pub fn prescribed(weight: f64, reps: u32) -> Self {
        Self {
            reps,
            weight,
            completed: false,
            is_amrap: false,
            is_warmup: false,
            actual_reps: None,
        }
    }

    /// Creates an uncompleted warmup set with the rep count pre-filled.
    pub fn warmup(weight: f64, reps: u32) -> Self {
        Self {
            is_warmup: true,
            actual_reps: Some(reps),
            ..Self::prescribed(weight, reps)
        }
    }

    /// Reps actually performed, falling back to the target.
    pub fn performed_reps(&self) -> u32 {
        self.actual_reps.unwrap_or(self.reps)
    }

    /// Weight moved in this set; zero unless completed.
    pub fn volume(&self) -> f64 {
        if self.completed {
            self.weight * f64::from(self.performed_reps())
        } else {
            0.0
        }
    }
}

/// Role of an exercise within a strength session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExerciseType {
    Main,
    Supplemental,
    Assistance,
}

/// A named exercise and its sets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exercise {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ExerciseType,
    #[serde(default)]
    pub sets: Vec<SetData>,
}

impl Exercise {
    pub fn new(name: impl Into<String>, kind: ExerciseType, sets: Vec<SetData>) -> Self {
        Self {
            name: name.into(),
            kind,
            sets,
        }
    }

    /// Iterates over completed sets only.
    pub fn completed_sets(&self) -> impl Iterator<Item = &SetData> {
        self.sets.iter().filter(|s| s.completed)
    }

    /// Total volume of completed work sets (warmups excluded).
    pub fn volume(&self) -> f64 {
        self.sets
            .iter()
            .filter(|s| !s.is_warmup)
            .map(SetData::volume)
            .sum()
    }
}

/// Whether a session trained a barbell lift or conditioning work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionType {
    Strength,
    Conditioning,
}

/// What a session trained. Serialized as the lift name or `"Conditioning"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SessionLift {
    Barbell(LiftType),
    Conditioning,
}

impl TryFrom<String> for SessionLift {
    type Error = EngineError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value.trim().eq_ignore_ascii_case("conditioning") {
            return Ok(SessionLift::Conditioning);
        }
        value.parse().map(SessionLift::Barbell)
    }
}

impl From<SessionLift> for String {
    fn from(lift: SessionLift) -> Self {
        match lift {
            SessionLift::Barbell(lift) => lift.display_name().to_string(),
            SessionLift::Conditioning => "Conditioning".to_string(),
        }
    }
}

/// One prescribed or completed training session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutSession {
    pub id: String,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub title: String,
    pub cycle: u32,
    pub week: u32,
    pub lift: SessionLift,
    #[serde(rename = "type")]
    pub session_type: SessionType,
    #[serde(default)]
    pub exercises: Vec<Exercise>,
    #[serde(default)]
    pub duration_seconds: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl WorkoutSession {
    /// The barbell lift trained, if this is a strength session.
    pub fn strength_lift(&self) -> Option<LiftType> {
        match (self.session_type, self.lift) {
            (SessionType::Strength, SessionLift::Barbell(lift)) => Some(lift),
            _ => None,
        }
    }

    /// Returns the main exercise, if any.
    pub fn main_exercise(&self) -> Option<&Exercise> {
        self.exercises.iter().find(|e| e.kind == ExerciseType::Main)
    }

    pub fn supplemental_exercise(&self) -> Option<&Exercise> {
        self.exercises
            .iter()
            .find(|e| e.kind == ExerciseType::Supplemental)
    }

    pub fn assistance_exercises(&self) -> impl Iterator<Item = &Exercise> {
        self.exercises
            .iter()
            .filter(|e| e.kind == ExerciseType::Assistance)
    }

    /// Total completed volume across all exercises.
    pub fn volume(&self) -> f64 {
        self.exercises.iter().map(Exercise::volume).sum()
    }

    /// Returns true if the session is attributed to the given profile.
    ///
    /// Sessions without a profile id belong to the root profile only.
    pub fn belongs_to(&self, profile_id: &str) -> bool {
        match self.profile_id.as_deref() {
            Some(id) => id == profile_id,
            None => profile_id == ROOT_PROFILE_ID,
        }
    }
}

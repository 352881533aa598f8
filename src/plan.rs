//! Plan payload types.
//!
//! The payload is produced upstream (question flow + language model) and
//! arrives fully resolved as JSON. It is read-only to the export core: every
//! optional field may be absent, and absence never fails deserialization.
//! Only structural requirements are enforced by [`PlanPayload::validate`].

use crate::error::{Error, Result};
use base64::Engine;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashSet;
use std::str::FromStr;

/// A fully resolved HACCP plan, the immutable input of one export request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanPayload {
    /// Stable plan identifier (first storage path segment)
    pub plan_id: String,
    /// Business identity
    pub business: BusinessInfo,
    /// Product description
    pub product: ProductInfo,
    /// Intended use of the product
    pub intended_use: Option<String>,
    /// Intended consumers, including vulnerable groups
    pub intended_consumers: Option<String>,
    /// Process flow, ordered by position
    pub process_steps: Vec<ProcessStep>,
    /// Hazard analysis rows
    pub hazards: Vec<HazardRow>,
    /// Prerequisite programs (sanitation, pest control, training, ...)
    pub prerequisite_programs: Vec<PrerequisiteProgram>,
    /// Critical control points
    pub ccps: Vec<CriticalControlPoint>,
    /// Free-text narrative sections
    pub narrative: Narrative,
    /// Template identifier, resolved by the theme resolver
    pub template_id: Option<String>,
    /// Language code (`en`, `es`)
    pub language: Option<String>,
    /// Whether this export is entitled to an unwatermarked result
    pub entitled: bool,
    /// Optional business logo
    pub logo: Option<Logo>,
    /// Generation date shown on the cover, pinned by the caller
    pub generated_on: Option<String>,
    /// Document version shown in the running footer
    pub document_version: Option<String>,
}

/// Business identity fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusinessInfo {
    /// Legal or trading name
    pub name: String,
    /// Postal address
    pub address: Option<String>,
    /// Registration / license number
    pub registration_number: Option<String>,
    /// Contact person
    pub contact_name: Option<String>,
    /// Contact email or phone
    pub contact: Option<String>,
    /// HACCP team members
    pub team_members: Vec<TeamMember>,
    /// Scope statement of the plan
    pub scope: Option<String>,
}

/// HACCP team member.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TeamMember {
    /// Person name
    pub name: Option<String>,
    /// Role in the team
    pub role: Option<String>,
}

/// Product description fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductInfo {
    /// Product name
    pub name: Option<String>,
    /// Description
    pub description: Option<String>,
    /// Ingredients / composition
    pub composition: Option<String>,
    /// Packaging
    pub packaging: Option<String>,
    /// Shelf life
    pub shelf_life: Option<String>,
    /// Storage conditions
    pub storage: Option<String>,
    /// Distribution method
    pub distribution: Option<String>,
}

/// One step of the process flow.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessStep {
    /// 1-based position, unique and contiguous
    pub position: u32,
    /// Step name
    pub name: String,
    /// Step description
    pub description: Option<String>,
}

/// Hazard category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HazardCategory {
    /// Pathogens, toxins of biological origin
    Biological,
    /// Chemical contaminants
    Chemical,
    /// Foreign bodies
    Physical,
    /// Undeclared allergens
    Allergen,
}

/// Three-value ordinal scale used for severity and likelihood.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    /// Low
    Low,
    /// Medium
    Medium,
    /// High
    High,
}

impl FromStr for HazardCategory {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "biological" | "bio" | "microbiological" | "biológico" | "biologico" => {
                Ok(HazardCategory::Biological)
            },
            "chemical" | "químico" | "quimico" => Ok(HazardCategory::Chemical),
            "physical" | "físico" | "fisico" => Ok(HazardCategory::Physical),
            "allergen" | "allergenic" | "alérgeno" | "alergeno" => Ok(HazardCategory::Allergen),
            other => Err(format!("unknown hazard category '{}'", other)),
        }
    }
}

impl FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" | "l" | "bajo" | "baja" => Ok(Level::Low),
            "medium" | "med" | "m" | "moderate" | "medio" | "media" => Ok(Level::Medium),
            "high" | "h" | "alto" | "alta" => Ok(Level::High),
            other => Err(format!("unknown level '{}'", other)),
        }
    }
}

/// Optional enum field that tolerates casing and aliases. Values that do not
/// parse are treated as absent rather than failing the whole payload.
fn lenient<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr<Err = String>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(serde_json::Value::as_str).and_then(|raw| {
        raw.parse()
            .map_err(|e: String| log::debug!("Ignoring {}", e))
            .ok()
    }))
}

/// One row of the hazard analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HazardRow {
    /// Position of the process step this hazard belongs to
    pub step: u32,
    /// Hazard description
    pub hazard: String,
    /// Hazard category
    #[serde(deserialize_with = "lenient")]
    pub category: Option<HazardCategory>,
    /// Severity
    #[serde(deserialize_with = "lenient")]
    pub severity: Option<Level>,
    /// Likelihood
    #[serde(deserialize_with = "lenient")]
    pub likelihood: Option<Level>,
    /// Whether the hazard is controlled at a critical control point
    pub is_ccp: bool,
    /// Control measure labels
    pub control_measures: Vec<String>,
    /// Free-text description of how the control measures are applied
    pub control_description: Option<String>,
}

/// Prerequisite program.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrerequisiteProgram {
    /// Program name
    pub name: Option<String>,
    /// What the program covers
    pub description: Option<String>,
    /// How often it is applied
    pub frequency: Option<String>,
    /// Responsible person or role
    pub responsible: Option<String>,
}

/// Critical control point.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CriticalControlPoint {
    /// Process step position
    pub step: u32,
    /// Hazard text of the referenced hazard row
    pub hazard: String,
    /// Critical limit
    pub critical_limit: Option<String>,
    /// Monitoring procedure
    pub monitoring: Option<String>,
    /// Monitoring frequency
    pub frequency: Option<String>,
    /// Corrective action
    pub corrective_action: Option<String>,
    /// Verification activity
    pub verification: Option<String>,
    /// Records kept
    pub records: Option<String>,
}

/// Free-text narrative fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Narrative {
    /// Verification activities
    pub verification: Option<String>,
    /// Validation of the plan
    pub validation: Option<String>,
    /// Records and documentation
    pub records: Option<String>,
    /// Review schedule / notes
    pub review: Option<String>,
}

/// Logo image, base64-encoded in JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Logo {
    /// Raw image bytes (PNG or JPEG)
    #[serde(serialize_with = "to_base64", deserialize_with = "from_base64")]
    pub data: Vec<u8>,
}

fn to_base64<S: Serializer>(data: &[u8], serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&base64::engine::general_purpose::STANDARD.encode(data))
}

fn from_base64<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Vec<u8>, D::Error> {
    let encoded = String::deserialize(deserializer)?;
    // Accept data URIs as produced by browser uploads
    let encoded = match encoded.split_once(";base64,") {
        Some((_, rest)) => rest,
        None => encoded.as_str(),
    };
    base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(serde::de::Error::custom)
}

impl PlanPayload {
    /// Parse a payload from JSON bytes.
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Check structural requirements before any generation work.
    ///
    /// Optional narrative content is never checked here; only what the
    /// renderer cannot do without is rejected.
    pub fn validate(&self) -> Result<()> {
        if self.plan_id.trim().is_empty() {
            return Err(Error::MalformedInput("plan_id is required".to_string()));
        }
        if self.business.name.trim().is_empty() {
            return Err(Error::MalformedInput("business.name is required".to_string()));
        }
        if self.process_steps.is_empty() {
            return Err(Error::MalformedInput(
                "at least one process step is required".to_string(),
            ));
        }

        let mut positions: Vec<u32> = self.process_steps.iter().map(|s| s.position).collect();
        positions.sort_unstable();
        for (i, position) in positions.iter().enumerate() {
            if *position != i as u32 + 1 {
                return Err(Error::MalformedInput(format!(
                    "process step positions must be unique and contiguous from 1, found {:?}",
                    positions
                )));
            }
        }
        if let Some(step) = self.process_steps.iter().find(|s| s.name.trim().is_empty()) {
            return Err(Error::MalformedInput(format!(
                "process step {} has no name",
                step.position
            )));
        }

        for (i, row) in self.hazards.iter().enumerate() {
            if !positions.contains(&row.step) {
                return Err(Error::MalformedInput(format!(
                    "hazard row {} references unknown step {}",
                    i + 1,
                    row.step
                )));
            }
        }

        let significant: HashSet<(u32, String)> = self
            .hazards
            .iter()
            .filter(|h| h.is_ccp)
            .map(|h| (h.step, normalize_ref(&h.hazard)))
            .collect();
        for (i, ccp) in self.ccps.iter().enumerate() {
            if !significant.contains(&(ccp.step, normalize_ref(&ccp.hazard))) {
                return Err(Error::MalformedInput(format!(
                    "CCP {} (step {}) does not reference a significant hazard",
                    i + 1,
                    ccp.step
                )));
            }
        }

        Ok(())
    }

    /// Process steps in position order.
    pub fn ordered_steps(&self) -> Vec<&ProcessStep> {
        let mut steps: Vec<&ProcessStep> = self.process_steps.iter().collect();
        steps.sort_by_key(|s| s.position);
        steps
    }

    /// Name of the step at `position`, if any.
    pub fn step_name(&self, position: u32) -> Option<&str> {
        self.process_steps
            .iter()
            .find(|s| s.position == position)
            .map(|s| s.name.as_str())
    }
}

fn normalize_ref(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

use super::errors::{
    PayloadValidationError, ValidationFailureKind, ValidationResult,
};
use super::utils::{number_in_range, require_non_empty_str};
use crate::domain::value_objects::EntityPayload;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgentType {
    PestDetection,
    CropHealth,
    YieldPrediction,
    ImageClassification,
}

impl AgentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentType::PestDetection => "pest_detection",
            AgentType::CropHealth => "crop_health",
            AgentType::YieldPrediction => "yield_prediction",
            AgentType::ImageClassification => "image_classification",
        }
    }
}

impl fmt::Display for AgentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentType {
    type Err = PayloadValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pest_detection" => Ok(AgentType::PestDetection),
            "crop_health" => Ok(AgentType::CropHealth),
            "yield_prediction" => Ok(AgentType::YieldPrediction),
            "image_classification" => Ok(AgentType::ImageClassification),
            other => Err(PayloadValidationError::new(
                ValidationFailureKind::UnknownAgentType,
                format!("unknown agentType: {other}"),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl FromStr for JobStatus {
    type Err = PayloadValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "processing" => Ok(JobStatus::Processing),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            other => Err(PayloadValidationError::invalid(
                "status",
                format_args!("has unsupported value {other}"),
            )),
        }
    }
}

pub fn validate_analysis_job(payload: &EntityPayload) -> ValidationResult<()> {
    let agent: AgentType = require_non_empty_str(payload, "agentType")?.parse()?;
    let status: JobStatus = require_non_empty_str(payload, "status")?.parse()?;

    if let Some(confidence) = payload.get("confidence") {
        if !confidence.is_null() {
            number_in_range(confidence, "confidence", 0.0, 1.0)?;
        }
    }

    match status {
        JobStatus::Completed => {
            let result = payload
                .get("result")
                .filter(|value| !value.is_null())
                .ok_or_else(|| PayloadValidationError::missing("result"))?;
            validate_result_shape(agent, result)
        }
        JobStatus::Failed => {
            require_non_empty_str(payload, "errorMessage")?;
            Ok(())
        }
        JobStatus::Pending | JobStatus::Processing => Ok(()),
    }
}

fn shape_error(agent: AgentType, detail: impl fmt::Display) -> PayloadValidationError {
    PayloadValidationError::new(
        ValidationFailureKind::ResultShape,
        format!("{agent} result {detail}"),
    )
}

fn validate_result_shape(agent: AgentType, result: &Value) -> ValidationResult<()> {
    let result = result
        .as_object()
        .ok_or_else(|| shape_error(agent, "must be an object"))?;

    match agent {
        AgentType::PestDetection => {
            let detections = result
                .get("detections")
                .and_then(Value::as_array)
                .ok_or_else(|| shape_error(agent, "requires a detections array"))?;
            for (index, detection) in detections.iter().enumerate() {
                let label_ok = detection
                    .get("label")
                    .and_then(Value::as_str)
                    .is_some_and(|label| !label.trim().is_empty());
                if !label_ok {
                    return Err(shape_error(
                        agent,
                        format_args!("detection {index} is missing a label"),
                    ));
                }
                let confidence = detection
                    .get("confidence")
                    .ok_or_else(|| {
                        shape_error(agent, format_args!("detection {index} is missing confidence"))
                    })?;
                number_in_range(confidence, "detections.confidence", 0.0, 1.0)
                    .map_err(|err| shape_error(agent, err.message))?;
            }
            Ok(())
        }
        AgentType::CropHealth => {
            let score = result
                .get("healthScore")
                .ok_or_else(|| shape_error(agent, "requires healthScore"))?;
            number_in_range(score, "healthScore", 0.0, 100.0)
                .map_err(|err| shape_error(agent, err.message))?;
            Ok(())
        }
        AgentType::YieldPrediction => {
            let estimated = result
                .get("estimatedYield")
                .ok_or_else(|| shape_error(agent, "requires estimatedYield"))?;
            number_in_range(estimated, "estimatedYield", 0.0, f64::MAX)
                .map_err(|err| shape_error(agent, err.message))?;
            let unit_ok = result
                .get("unit")
                .and_then(Value::as_str)
                .is_some_and(|unit| !unit.trim().is_empty());
            if !unit_ok {
                return Err(shape_error(agent, "requires a unit"));
            }
            Ok(())
        }
        AgentType::ImageClassification => {
            let labels = result
                .get("labels")
                .and_then(Value::as_array)
                .filter(|labels| !labels.is_empty())
                .ok_or_else(|| shape_error(agent, "requires a non-empty labels array"))?;
            if labels.iter().any(|label| !label.is_string()) {
                return Err(shape_error(agent, "labels must all be strings"));
            }
            Ok(())
        }
    }
}

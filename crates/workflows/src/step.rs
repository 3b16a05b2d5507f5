//! Step contract (mechanics only, no business rules).
//!
//! - Steps declare the data aliases they read as a static list
//! - The orchestrator wires one JSON payload per alias into [`StepData`]
//! - [`run_step`] checks the wiring before invoking the step
//!
//! Collaborators are fields on the step value itself, injected at construction.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::{Instrument, debug, info_span};

use storefront_core::ServiceError;

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("step `{step}` is missing input for alias `{alias}`")]
    MissingInput {
        step: &'static str,
        alias: &'static str,
    },

    #[error("step `{step}` received malformed input for alias `{alias}`: {reason}")]
    MalformedInput {
        step: &'static str,
        alias: &'static str,
        reason: String,
    },

    #[error(transparent)]
    Service(#[from] ServiceError),
}

impl WorkflowError {
    /// The underlying service failure, if any.
    pub fn as_service(&self) -> Option<&ServiceError> {
        match self {
            WorkflowError::Service(e) => Some(e),
            _ => None,
        }
    }
}

/// Request-scoped step input, keyed by alias.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepData {
    inputs: BTreeMap<String, JsonValue>,
}

impl StepData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, alias: impl Into<String>, value: JsonValue) -> Self {
        self.inputs.insert(alias.into(), value);
        self
    }

    pub fn contains(&self, alias: &str) -> bool {
        self.inputs.contains_key(alias)
    }

    /// Decode the payload wired under `alias`.
    pub fn get<T: DeserializeOwned>(&self, step: &'static str, alias: &'static str) -> Result<T, WorkflowError> {
        let value = self
            .inputs
            .get(alias)
            .ok_or(WorkflowError::MissingInput { step, alias })?;
        serde_json::from_value(value.clone()).map_err(|e| WorkflowError::MalformedInput {
            step,
            alias,
            reason: e.to_string(),
        })
    }
}

/// One unit of a larger workflow.
#[async_trait]
pub trait WorkflowStep: Send + Sync {
    /// Stable step name (used in logs and errors).
    const NAME: &'static str;

    /// Data aliases this step reads. Static, so orchestrators can validate
    /// wiring before invocation.
    const ALIASES: &'static [&'static str];

    type Output: Serialize + Send;

    async fn invoke(&self, data: &StepData) -> Result<Self::Output, WorkflowError>;
}

/// Validate alias wiring, then invoke the step inside a tracing span.
pub async fn run_step<S: WorkflowStep>(step: &S, data: &StepData) -> Result<S::Output, WorkflowError> {
    if let Some(&alias) = S::ALIASES.iter().find(|a| !data.contains(a)) {
        return Err(WorkflowError::MissingInput { step: S::NAME, alias });
    }

    let span = info_span!("workflow_step", step = S::NAME);
    async {
        let output = step.invoke(data).await?;
        debug!("step completed");
        Ok::<_, WorkflowError>(output)
    }
    .instrument(span)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Greeting {
        name: String,
    }

    struct Greet;

    #[async_trait]
    impl WorkflowStep for Greet {
        const NAME: &'static str = "greet";
        const ALIASES: &'static [&'static str] = &["greeting"];
        type Output = String;

        async fn invoke(&self, data: &StepData) -> Result<String, WorkflowError> {
            let g: Greeting = data.get(Self::NAME, "greeting")?;
            Ok(format!("hello {}", g.name))
        }
    }

    #[tokio::test]
    async fn run_step_invokes_when_wired() {
        let data = StepData::new().with("greeting", json!({"name": "ada"}));
        assert_eq!(run_step(&Greet, &data).await.unwrap(), "hello ada");
    }

    #[tokio::test]
    async fn run_step_rejects_missing_alias() {
        let err = run_step(&Greet, &StepData::new()).await.unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::MissingInput { step: "greet", alias: "greeting" }
        ));
    }

    #[test]
    fn malformed_input_names_the_alias() {
        let data = StepData::new().with("greeting", json!({"name": 7}));
        let err = data.get::<Greeting>("greet", "greeting").unwrap_err();
        assert!(err.to_string().contains("alias `greeting`"));
    }
}

//! Assertion types and builders for verifying step results.

use serde_json::Value as Json;
use strata_mutation::{ConflictKind, MutationOutcome, MutationResult};

use crate::error::{TestError, TestResult};

/// A complete assertion for a step result.
#[derive(Debug, Default)]
pub struct Assertion {
    // Side-effect assertions
    pub created: Option<usize>,
    pub updated: Option<usize>,
    pub deleted: Option<usize>,
    pub linked: Option<usize>,
    pub unlinked: Option<usize>,

    // Response assertions, keyed by JSON pointer into `data`
    pub data: Vec<(String, Json)>,
    pub lengths: Vec<(String, usize)>,
    pub null_data: bool,
    pub unaltered: Vec<(String, Json)>,
    pub count: Option<usize>,
    pub client_mutation_id: Option<Json>,

    // Error assertions
    pub error: Option<String>,
    pub conflict: Option<ConflictKind>,
    pub not_found: bool,
    pub validation: bool,
}

impl Assertion {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn created(mut self, n: usize) -> Self {
        self.created = Some(n);
        self
    }

    pub fn updated(mut self, n: usize) -> Self {
        self.updated = Some(n);
        self
    }

    pub fn deleted(mut self, n: usize) -> Self {
        self.deleted = Some(n);
        self
    }

    pub fn linked(mut self, n: usize) -> Self {
        self.linked = Some(n);
        self
    }

    pub fn unlinked(mut self, n: usize) -> Self {
        self.unlinked = Some(n);
        self
    }

    /// Expect `data` at `pointer` (`/address/city`) to equal `value`.
    pub fn data(mut self, pointer: &str, value: impl Into<Json>) -> Self {
        self.data.push((pointer.to_string(), value.into()));
        self
    }

    /// Expect the array at `pointer` to have `len` elements.
    pub fn len(mut self, pointer: &str, len: usize) -> Self {
        self.lengths.push((pointer.to_string(), len));
        self
    }

    pub fn null_data(mut self) -> Self {
        self.null_data = true;
        self
    }

    pub fn unaltered(mut self, pointer: &str, value: impl Into<Json>) -> Self {
        self.unaltered.push((pointer.to_string(), value.into()));
        self
    }

    pub fn count(mut self, n: usize) -> Self {
        self.count = Some(n);
        self
    }

    pub fn client_mutation_id(mut self, value: impl Into<Json>) -> Self {
        self.client_mutation_id = Some(value.into());
        self
    }

    /// Expect the step to fail with a message containing `text`.
    pub fn error(mut self, text: &str) -> Self {
        self.error = Some(text.to_string());
        self
    }

    pub fn conflict(mut self, kind: ConflictKind) -> Self {
        self.conflict = Some(kind);
        self
    }

    pub fn not_found(mut self) -> Self {
        self.not_found = true;
        self
    }

    pub fn validation(mut self) -> Self {
        self.validation = true;
        self
    }

    fn expects_error(&self) -> bool {
        self.error.is_some() || self.conflict.is_some() || self.not_found || self.validation
    }

    /// Verify the assertion against a result.
    pub fn verify(&self, step: &str, result: &MutationResult<MutationOutcome>) -> TestResult<()> {
        if self.expects_error() {
            let err = match result {
                Err(err) => err,
                Ok(_) => {
                    return Err(TestError::assertion_failed(
                        step,
                        "expected an error, but step succeeded",
                    ))
                }
            };
            let message = err.to_string();
            if let Some(ref text) = self.error {
                if !message.contains(text.as_str()) {
                    return Err(TestError::assertion_failed(
                        step,
                        format!("expected error containing '{}', got: {}", text, message),
                    ));
                }
            }
            if let Some(kind) = self.conflict {
                if err.conflict_kind() != Some(kind) {
                    return Err(TestError::assertion_failed(
                        step,
                        format!("expected {:?} conflict, got: {}", kind, message),
                    ));
                }
            }
            if self.not_found && !err.is_not_found() {
                return Err(TestError::assertion_failed(
                    step,
                    format!("expected not-found error, got: {}", message),
                ));
            }
            if self.validation && !err.is_validation() {
                return Err(TestError::assertion_failed(
                    step,
                    format!("expected validation error, got: {}", message),
                ));
            }
            return Ok(());
        }

        let outcome = result
            .as_ref()
            .map_err(|err| TestError::assertion_failed(step, format!("step failed: {}", err)))?;

        self.verify_effects(step, outcome)?;
        self.verify_response(step, outcome)
    }

    fn verify_effects(&self, step: &str, outcome: &MutationOutcome) -> TestResult<()> {
        let effects = &outcome.effects;
        let checks = [
            ("created", self.created, effects.created.len()),
            ("updated", self.updated, effects.updated.len()),
            ("deleted", self.deleted, effects.deleted.len()),
            ("linked", self.linked, effects.linked.len()),
            ("unlinked", self.unlinked, effects.unlinked.len()),
        ];
        for (label, expected, actual) in checks {
            if let Some(expected) = expected {
                if expected != actual {
                    return Err(TestError::assertion_failed(
                        step,
                        format!("expected {} {}, got {}", expected, label, actual),
                    ));
                }
            }
        }
        Ok(())
    }

    fn verify_response(&self, step: &str, outcome: &MutationOutcome) -> TestResult<()> {
        let response = &outcome.response;

        if self.null_data && !response.data().is_null() {
            return Err(TestError::assertion_failed(
                step,
                format!("expected null data, got {}", response.data()),
            ));
        }

        for (pointer, expected) in &self.data {
            check_pointer(step, "data", response.data(), pointer, expected)?;
        }

        for (pointer, expected_len) in &self.lengths {
            let actual = response
                .data()
                .pointer(pointer)
                .and_then(Json::as_array)
                .map(Vec::len);
            if actual != Some(*expected_len) {
                return Err(TestError::assertion_failed(
                    step,
                    format!(
                        "expected {} elements at data{}, got {:?}",
                        expected_len, pointer, actual
                    ),
                ));
            }
        }

        if !self.unaltered.is_empty() {
            let unaltered = response.unaltered_data().ok_or_else(|| {
                TestError::assertion_failed(step, "expected unalteredData, got none")
            })?;
            for (pointer, expected) in &self.unaltered {
                check_pointer(step, "unalteredData", unaltered, pointer, expected)?;
            }
        }

        if let Some(expected) = self.count {
            if response.count() != Some(expected) {
                return Err(TestError::assertion_failed(
                    step,
                    format!("expected count {}, got {:?}", expected, response.count()),
                ));
            }
        }

        if let Some(ref expected) = self.client_mutation_id {
            if response.client_mutation_id() != Some(expected) {
                return Err(TestError::assertion_failed(
                    step,
                    format!(
                        "expected clientMutationId {}, got {:?}",
                        expected,
                        response.client_mutation_id()
                    ),
                ));
            }
        }

        Ok(())
    }
}

fn check_pointer(step: &str, root: &str, tree: &Json, pointer: &str, expected: &Json) -> TestResult<()> {
    match tree.pointer(pointer) {
        Some(actual) if actual == expected => Ok(()),
        actual => Err(TestError::assertion_failed(
            step,
            format!(
                "{}{} mismatch:\n  expected: {}\n  actual:   {}",
                root,
                pointer,
                expected,
                actual.map(Json::to_string).unwrap_or_else(|| "<missing>".to_string())
            ),
        )),
    }
}

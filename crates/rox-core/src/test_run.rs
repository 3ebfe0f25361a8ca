//! In-memory aggregation of one test run's results.
//!
//! Repeated executions of the same logical test (same effective key and
//! original name) collapse into a single result with summed duration, an
//! AND-combined verdict and an occurrence count.

use crate::annotations::parse_annotations;
use crate::config::Config;
use crate::errors::UsageError;
use chrono::{DateTime, Utc};

/// Optional per-call metadata for [`TestRun::add`].
#[derive(Debug, Clone, Default)]
pub struct ResultOptions {
    pub message: Option<String>,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub tickets: Vec<String>,
}

/// One aggregated test result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestResult {
    pub key: Option<String>,
    /// Display name, annotation markers stripped.
    pub name: String,
    /// Name as received; part of the merge identity.
    pub original_name: String,
    pub passed: bool,
    /// Total duration in milliseconds across all occurrences.
    pub duration: u64,
    pub occurrences: u32,
    pub message: Option<String>,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub tickets: Vec<String>,
}

/// One test run, exclusively owned by the caller.
#[derive(Debug, Clone)]
pub struct TestRun {
    pub config: Config,
    pub project_api_id: Option<String>,
    pub project_version: Option<String>,
    pub uid: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    /// Milliseconds between `start()` and `end()`; absent until `end()`.
    pub duration: Option<i64>,
    /// In call order.
    pub results: Vec<TestResult>,
}

impl TestRun {
    pub fn new(config: Config) -> Self {
        let project = config.project_options();
        Self {
            project_api_id: project.api_id,
            project_version: project.version,
            config,
            uid: None,
            start_time: None,
            end_time: None,
            duration: None,
            results: Vec::new(),
        }
    }

    /// Stamps the start time and stores the resolved run UID, if any.
    pub fn start(&mut self, uid: Option<String>) {
        self.uid = uid;
        self.start_time = Some(Utc::now());
    }

    /// Records one test execution.
    ///
    /// When a result with the same effective key and original name already
    /// exists, the new execution is merged into it and no entry is added.
    pub fn add(
        &mut self,
        key: Option<&str>,
        name: &str,
        passed: bool,
        duration: u64,
        options: ResultOptions,
    ) -> &TestResult {
        let (annotation, stripped_name) = parse_annotations(name);
        let effective_key = key.map(str::to_owned).or_else(|| annotation.key.clone());

        let existing = self
            .results
            .iter()
            .position(|r| r.key == effective_key && r.original_name == name);
        if let Some(index) = existing {
            let result = &mut self.results[index];
            result.occurrences += 1;
            result.duration += duration;
            result.passed = result.passed && passed;
            if let Some(message) = options.message {
                result.message = Some(match result.message.take() {
                    Some(previous) => format!("{previous}\n\n{message}"),
                    None => message,
                });
            }
            return &self.results[index];
        }

        let project = &self.config.project;
        let result = TestResult {
            key: effective_key,
            name: stripped_name,
            original_name: name.to_owned(),
            passed,
            duration,
            occurrences: 1,
            message: options.message,
            category: options
                .category
                .or(annotation.category)
                .or_else(|| project.category.clone()),
            tags: union(options.tags, &annotation.tags, &project.tags),
            tickets: union(options.tickets, &annotation.tickets, &project.tickets),
        };
        self.results.push(result);
        self.results.last().unwrap()
    }

    /// Stamps the end time and computes the run duration.
    pub fn end(&mut self) -> Result<(), UsageError> {
        let start = self.start_time.ok_or(UsageError::EndBeforeStart)?;
        let end = Utc::now();
        self.end_time = Some(end);
        self.duration = Some((end - start).num_milliseconds());
        Ok(())
    }

    /// Appends human-readable problems to `errors`: missing project
    /// identification, an empty run, and key collisions (the same key used
    /// by results with different original names).
    pub fn validate(&self, errors: &mut Vec<String>) {
        if self.project_api_id.is_none() {
            errors.push(
                "Project API ID is not set (set \"project.apiId\" in rox.yml configuration file)"
                    .to_string(),
            );
        }
        if self.project_version.is_none() {
            errors.push(
                "Project version is not set (set \"project.version\" in rox.yml configuration file)"
                    .to_string(),
            );
        }
        if self.results.is_empty() {
            errors.push("No test result to send".to_string());
        }

        // First-appearance order, one error per colliding key.
        let mut by_key: Vec<(&str, Vec<&str>)> = Vec::new();
        for result in &self.results {
            if let Some(key) = result.key.as_deref() {
                match by_key.iter_mut().find(|(k, _)| *k == key) {
                    Some((_, names)) => names.push(&result.name),
                    None => by_key.push((key, vec![&result.name])),
                }
            }
        }
        for (key, names) in by_key {
            if names.len() > 1 {
                let quoted: Vec<String> = names.iter().map(|n| format!("\"{n}\"")).collect();
                errors.push(format!(
                    "Test key \"{key}\" is used by {} results: {}",
                    names.len(),
                    quoted.join(", ")
                ));
            }
        }
    }
}

/// Unions the three metadata sources in order, dropping duplicates.
fn union(base: Vec<String>, second: &[String], third: &[String]) -> Vec<String> {
    let mut values = base;
    for source in [second, third] {
        for value in source {
            if !values.contains(value) {
                values.push(value.clone());
            }
        }
    }
    values
}

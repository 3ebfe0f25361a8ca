//! Compact v1 wire payload.
//!
//! Field names are abbreviated on the wire: `d`uration, `u`id, `r`esults
//! per project (`j` project API id, `v` version, `t` test entries), and
//! per entry `k`ey, `n`ame, `p`assed, `d`uration, `m`essage, `c`ategory,
//! ta`g`s, `t`ickets.

use crate::test_run::{TestResult, TestRun};
use serde::Serialize;

/// Media type of the serialized payload.
pub const MEDIA_TYPE_V1: &str = "application/vnd.lotaris.rox.payload.v1+json";

#[derive(Debug, Clone, Serialize)]
pub struct PayloadV1 {
    pub d: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub u: Option<String>,
    pub r: Vec<ProjectResults>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectResults {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub j: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub v: Option<String>,
    pub t: Vec<ResultEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResultEntry {
    pub k: String,
    pub n: String,
    pub p: bool,
    pub d: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub m: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub c: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub g: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub t: Vec<String>,
}

/// Projects a test run into the v1 payload.
///
/// Pure and recomputed on every call. Results without a key cannot be
/// reported and are dropped.
pub fn serialize_v1(test_run: &TestRun) -> PayloadV1 {
    PayloadV1 {
        d: test_run.duration.unwrap_or_default(),
        u: test_run.uid.clone(),
        r: vec![ProjectResults {
            j: test_run.project_api_id.clone(),
            v: test_run.project_version.clone(),
            t: test_run.results.iter().filter_map(result_entry).collect(),
        }],
    }
}

fn result_entry(result: &TestResult) -> Option<ResultEntry> {
    let key = result.key.clone()?;
    Some(ResultEntry {
        k: key,
        n: result.name.clone(),
        p: result.passed,
        d: average_duration(result.duration, result.occurrences),
        m: result.message.clone(),
        c: result.category.clone(),
        g: result.tags.clone(),
        t: result.tickets.clone(),
    })
}

/// Average duration per occurrence, rounded half-up.
fn average_duration(total: u64, occurrences: u32) -> u64 {
    let n = u64::from(occurrences.max(1));
    (2 * total + n) / (2 * n)
}

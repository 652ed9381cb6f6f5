//! Shape checks for an incoming job request body.
//!
//! Runs before the typed validation in `scaleout_core` so that a malformed
//! body is reported with the key that is wrong rather than a serde message.

use serde_json::{Map, Value};

use scaleout_core::{JobConfig, JobRequest, PipelineError, Result};

const JOB_ID_KEYS: [&str; 1] = ["job_id"];
const DATASET_KEYS: [&str; 2] = ["dataset_reference", "s3_path"];
const SCALE_KEYS: [&str; 2] = ["scale_list", "node_list"];

/// Build a [`JobRequest`] from a raw JSON body. A missing scale list falls
/// back to `default_scales`.
pub fn parse_job_request(body: &Value, default_scales: &[usize]) -> Result<JobRequest> {
    let obj = body
        .as_object()
        .ok_or_else(|| invalid("request body must be a JSON object"))?;

    let job_id = required_string(obj, &JOB_ID_KEYS)?;
    let dataset_reference = required_string(obj, &DATASET_KEYS)?;
    let job_config = parse_job_config(obj)?;

    let scale_list = match lookup(obj, &SCALE_KEYS) {
        Some((key, value)) => parse_scales(key, value)?,
        None => default_scales.to_vec(),
    };

    Ok(JobRequest {
        job_id,
        dataset_reference,
        job_config,
        scale_list,
    })
}

fn parse_job_config(obj: &Map<String, Value>) -> Result<JobConfig> {
    let raw = obj
        .get("job_config")
        .ok_or_else(|| invalid("Missing required key: job_config"))?;
    let config = raw
        .as_object()
        .ok_or_else(|| invalid("job_config must be an object"))?;

    let (Some(job_type), Some(tasks)) = (config.get("type"), config.get("tasks")) else {
        return Err(invalid("job_config must contain 'type' and 'tasks' keys"));
    };
    let job_type = job_type
        .as_str()
        .ok_or_else(|| invalid("job_config.type must be a string"))?;

    let tasks = tasks
        .as_array()
        .filter(|t| !t.is_empty())
        .ok_or_else(|| invalid("job_config.tasks must be a non-empty list"))?
        .iter()
        .map(|t| {
            t.as_str()
                .map(str::to_string)
                .ok_or_else(|| invalid("job_config.tasks must contain only strings"))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(JobConfig {
        job_type: job_type.to_string(),
        tasks,
    })
}

/// First of `keys` present in `obj`, with the key that matched.
fn lookup<'a>(obj: &'a Map<String, Value>, keys: &[&'static str]) -> Option<(&'static str, &'a Value)> {
    keys.iter().find_map(|&k| obj.get(k).map(|v| (k, v)))
}

fn required_string(obj: &Map<String, Value>, keys: &[&'static str]) -> Result<String> {
    let (key, value) =
        lookup(obj, keys).ok_or_else(|| invalid(format!("Missing required key: {}", keys[0])))?;
    match value.as_str() {
        Some(s) if !s.trim().is_empty() => Ok(s.to_string()),
        _ => Err(invalid(format!("{key} must be a non-empty string"))),
    }
}

/// Integers only; range checks happen in `validate_scale_list`.
fn parse_scales(key: &str, value: &Value) -> Result<Vec<usize>> {
    let not_integers = || invalid(format!("{key} must be a list of integers"));
    value
        .as_array()
        .ok_or_else(not_integers)?
        .iter()
        .map(|v| {
            v.as_u64()
                .and_then(|n| usize::try_from(n).ok())
                .ok_or_else(not_integers)
        })
        .collect()
}

fn invalid(message: impl Into<String>) -> PipelineError {
    PipelineError::Validation(message.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const DEFAULTS: &[usize] = &[1, 2, 4, 8];

    fn message(body: Value) -> String {
        match parse_job_request(&body, DEFAULTS) {
            Err(PipelineError::Validation(msg)) => msg,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn accepts_canonical_request() {
        let req = parse_job_request(
            &json!({
                "job_id": "job-1",
                "dataset_reference": "acme/data.csv",
                "job_config": {"type": "descriptive", "tasks": ["row_count"]},
                "scale_list": [1, 3]
            }),
            DEFAULTS,
        )
        .unwrap();
        assert_eq!(req.job_id, "job-1");
        assert_eq!(req.dataset_reference, "acme/data.csv");
        assert_eq!(req.job_config, JobConfig::new("descriptive", &["row_count"]));
        assert_eq!(req.scale_list, vec![1, 3]);
    }

    #[test]
    fn accepts_legacy_key_names() {
        let req = parse_job_request(
            &json!({
                "job_id": "job-1",
                "s3_path": "s3://bucket/acme/data.csv",
                "job_config": {"type": "ml", "tasks": ["kmeans"]},
                "node_list": [2]
            }),
            DEFAULTS,
        )
        .unwrap();
        assert_eq!(req.dataset_reference, "s3://bucket/acme/data.csv");
        assert_eq!(req.scale_list, vec![2]);
    }

    #[test]
    fn missing_scales_use_defaults() {
        let req = parse_job_request(
            &json!({
                "job_id": "j",
                "dataset_reference": "a/b.csv",
                "job_config": {"type": "descriptive", "tasks": ["row_count"]}
            }),
            &[1, 2],
        )
        .unwrap();
        assert_eq!(req.scale_list, vec![1, 2]);
    }

    #[test]
    fn names_the_missing_key() {
        assert_eq!(message(json!({})), "Missing required key: job_id");
        assert_eq!(
            message(json!({"job_id": "j"})),
            "Missing required key: dataset_reference"
        );
        assert_eq!(
            message(json!({"job_id": "j", "dataset_reference": "a/b.csv"})),
            "Missing required key: job_config"
        );
    }

    #[test]
    fn rejects_blank_identifiers() {
        assert_eq!(
            message(json!({"job_id": "  ", "dataset_reference": "a", "job_config": {}})),
            "job_id must be a non-empty string"
        );
        assert_eq!(
            message(json!({"job_id": "j", "s3_path": 7, "job_config": {}})),
            "s3_path must be a non-empty string"
        );
    }

    #[test]
    fn rejects_malformed_job_config() {
        let base = |config: Value| json!({"job_id": "j", "dataset_reference": "a", "job_config": config});
        assert_eq!(message(base(json!([]))), "job_config must be an object");
        assert_eq!(
            message(base(json!({"type": "ml"}))),
            "job_config must contain 'type' and 'tasks' keys"
        );
        assert_eq!(
            message(base(json!({"type": "ml", "tasks": []}))),
            "job_config.tasks must be a non-empty list"
        );
        assert_eq!(
            message(base(json!({"type": "ml", "tasks": ["kmeans", 3]}))),
            "job_config.tasks must contain only strings"
        );
    }

    #[test]
    fn rejects_non_integer_scales() {
        let body = |scales: Value| {
            json!({
                "job_id": "j",
                "dataset_reference": "a",
                "job_config": {"type": "ml", "tasks": ["kmeans"]},
                "node_list": scales
            })
        };
        assert_eq!(message(body(json!("1,2"))), "node_list must be a list of integers");
        assert_eq!(message(body(json!([1, 2.5]))), "node_list must be a list of integers");
        assert_eq!(message(body(json!([-1]))), "node_list must be a list of integers");
    }

    #[test]
    fn rejects_non_object_body() {
        assert_eq!(message(json!([1, 2])), "request body must be a JSON object");
    }
}

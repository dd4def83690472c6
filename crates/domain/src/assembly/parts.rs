//! Normalization of CAD-splitting service responses.
//!
//! The service returns `{ data: { user_id, order_id, original, parts } }`
//! where each part is either a bare storage path or an object carrying
//! `name`, `hierarchy` and `storage_path`. Both shapes become a
//! [`PartSummary`].

use serde::{Deserialize, Serialize};

use super::AssemblyError;

/// Envelope returned by the CAD service.
#[derive(Debug, Clone, Deserialize)]
pub struct SplitResponse {
    pub data: SplitData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SplitData {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub order_id: Option<String>,
    #[serde(default)]
    pub original: Option<String>,
    #[serde(default)]
    pub parts: Vec<RawPart>,
}

/// A part as the CAD service describes it.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawPart {
    Path(String),
    Described {
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        hierarchy: Option<Vec<String>>,
        storage_path: String,
    },
}

/// Uniform description of a split part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartSummary {
    pub name: String,
    pub hierarchy: Vec<String>,
    pub storage_path: String,
}

/// Normalized result of a split.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SplitResult {
    pub original: Option<String>,
    pub parts: Vec<PartSummary>,
}

/// Derives name and hierarchy from the segments of a storage path.
///
/// `bucket/sub/assembly1/partX.step` has name `partX.step` and hierarchy
/// `[bucket, sub, assembly1]`.
pub fn summarize_path(storage_path: &str) -> PartSummary {
    let mut segments: Vec<String> = storage_path
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect();
    let name = segments.pop().unwrap_or_default();

    PartSummary {
        name,
        hierarchy: segments,
        storage_path: storage_path.to_string(),
    }
}

impl RawPart {
    /// Normalizes the part; returns `None` for an empty storage path.
    pub fn into_summary(self) -> Option<PartSummary> {
        match self {
            RawPart::Path(path) => (!path.trim().is_empty()).then(|| summarize_path(&path)),
            RawPart::Described {
                name,
                hierarchy,
                storage_path,
            } => {
                if storage_path.trim().is_empty() {
                    return None;
                }
                let derived = summarize_path(&storage_path);
                Some(PartSummary {
                    name: name.filter(|n| !n.trim().is_empty()).unwrap_or(derived.name),
                    hierarchy: hierarchy
                        .filter(|h| !h.is_empty())
                        .unwrap_or(derived.hierarchy),
                    storage_path,
                })
            }
        }
    }
}

impl From<SplitResponse> for SplitResult {
    fn from(response: SplitResponse) -> Self {
        let SplitData {
            original, parts, ..
        } = response.data;
        SplitResult {
            original,
            parts: parts.into_iter().filter_map(RawPart::into_summary).collect(),
        }
    }
}

/// Parses and normalizes a raw CAD service response body.
pub fn normalize_split_response(body: serde_json::Value) -> Result<SplitResult, AssemblyError> {
    let response: SplitResponse = serde_json::from_value(body)
        .map_err(|e| AssemblyError::MalformedSplitResponse(e.to_string()))?;
    Ok(response.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn bare_path_derives_name_and_hierarchy() {
        let part = summarize_path("bucket/sub/assembly1/partX.step");
        assert_eq!(
            part,
            PartSummary {
                name: "partX.step".to_string(),
                hierarchy: vec![
                    "bucket".to_string(),
                    "sub".to_string(),
                    "assembly1".to_string()
                ],
                storage_path: "bucket/sub/assembly1/partX.step".to_string(),
            }
        );
    }

    #[test]
    fn single_segment_has_empty_hierarchy() {
        let part = summarize_path("part.step");
        assert_eq!(part.name, "part.step");
        assert!(part.hierarchy.is_empty());
    }

    #[test]
    fn normalizes_mixed_shapes() {
        let body = json!({
            "data": {
                "user_id": "u1",
                "order_id": "o1",
                "original": "bucket/model.step",
                "parts": [
                    "bucket/parts/gear.step",
                    {
                        "name": "Housing",
                        "hierarchy": ["Gearbox", "Shell"],
                        "storage_path": "bucket/parts/housing.step"
                    },
                    { "storage_path": "bucket/parts/shaft.step", "hierarchy": [] },
                    ""
                ]
            }
        });

        let result = normalize_split_response(body).unwrap();
        assert_eq!(result.original.as_deref(), Some("bucket/model.step"));
        assert_eq!(result.parts.len(), 3);
        assert_eq!(result.parts[0].name, "gear.step");
        assert_eq!(result.parts[1].name, "Housing");
        assert_eq!(result.parts[1].hierarchy, vec!["Gearbox", "Shell"]);
        assert_eq!(result.parts[2].name, "shaft.step");
        assert_eq!(result.parts[2].hierarchy, vec!["bucket", "parts"]);
    }

    #[test]
    fn missing_envelope_is_malformed() {
        let err = normalize_split_response(json!({ "parts": [] })).unwrap_err();
        assert!(matches!(err, AssemblyError::MalformedSplitResponse(_)));
    }
}

use serde::{Deserialize, Deserializer, Serialize};

use crate::cve::Timestamp;
use crate::error::CvecatError;

/// A CVE JSON 5 record.
///
/// Only the fields a template is likely to want are mapped. Absent and
/// `null` fields decode to their empty value; a field of the wrong JSON type
/// fails the whole decode.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CveRecord {
    #[serde(deserialize_with = "null_default")]
    pub data_type: String,
    #[serde(deserialize_with = "null_default")]
    pub data_version: String,
    #[serde(deserialize_with = "null_default")]
    pub cve_metadata: CveMetadata,
    #[serde(deserialize_with = "null_default")]
    pub containers: Containers,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CveMetadata {
    #[serde(deserialize_with = "null_default")]
    pub cve_id: String,
    #[serde(deserialize_with = "null_default")]
    pub assigner_org_id: String,
    #[serde(deserialize_with = "null_default")]
    pub state: String,
    #[serde(deserialize_with = "null_default")]
    pub assigner_short_name: String,
    pub date_reserved: Option<Timestamp>,
    pub date_published: Option<Timestamp>,
    pub date_updated: Option<Timestamp>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Containers {
    #[serde(deserialize_with = "null_default")]
    pub cna: Cna,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Cna {
    #[serde(deserialize_with = "null_default")]
    pub title: String,
    #[serde(deserialize_with = "null_default")]
    pub provider_metadata: ProviderMetadata,
    #[serde(deserialize_with = "null_default")]
    pub descriptions: Vec<Description>,
    #[serde(deserialize_with = "null_default")]
    pub affected: Vec<Affected>,
    #[serde(deserialize_with = "null_default")]
    pub references: Vec<Reference>,
    #[serde(deserialize_with = "null_default")]
    pub metrics: Vec<Metric>,
    #[serde(deserialize_with = "null_default")]
    pub problem_types: Vec<ProblemType>,
    #[serde(deserialize_with = "null_default")]
    pub source: Disclosure,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProviderMetadata {
    #[serde(deserialize_with = "null_default")]
    pub org_id: String,
    #[serde(deserialize_with = "null_default")]
    pub short_name: String,
    pub date_updated: Option<Timestamp>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Description {
    #[serde(deserialize_with = "null_default")]
    pub lang: String,
    #[serde(deserialize_with = "null_default")]
    pub value: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Affected {
    #[serde(deserialize_with = "null_default")]
    pub vendor: String,
    #[serde(deserialize_with = "null_default")]
    pub product: String,
    #[serde(deserialize_with = "null_default")]
    pub default_status: String,
    #[serde(deserialize_with = "null_default")]
    pub versions: Vec<Version>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Version {
    #[serde(deserialize_with = "null_default")]
    pub version: String,
    #[serde(deserialize_with = "null_default")]
    pub less_than: String,
    #[serde(deserialize_with = "null_default")]
    pub less_than_or_equal: String,
    #[serde(deserialize_with = "null_default")]
    pub status: String,
    #[serde(deserialize_with = "null_default")]
    pub version_type: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Reference {
    #[serde(deserialize_with = "null_default")]
    pub url: String,
    #[serde(deserialize_with = "null_default")]
    pub name: String,
    #[serde(deserialize_with = "null_default")]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Metric {
    #[serde(rename = "cvssV3_0")]
    pub cvss_v3_0: Option<CvssV3>,
    #[serde(rename = "cvssV3_1")]
    pub cvss_v3_1: Option<CvssV3>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CvssV3 {
    #[serde(deserialize_with = "null_default")]
    pub version: String,
    #[serde(deserialize_with = "null_default")]
    pub attack_complexity: String,
    #[serde(deserialize_with = "null_default")]
    pub attack_vector: String,
    #[serde(deserialize_with = "null_default")]
    pub availability_impact: String,
    #[serde(deserialize_with = "null_default")]
    pub confidentiality_impact: String,
    #[serde(deserialize_with = "null_default")]
    pub integrity_impact: String,
    #[serde(deserialize_with = "null_default")]
    pub privileges_required: String,
    #[serde(deserialize_with = "null_default")]
    pub scope: String,
    #[serde(deserialize_with = "null_default")]
    pub user_interaction: String,
    #[serde(deserialize_with = "null_default")]
    pub vector_string: String,
    #[serde(deserialize_with = "null_default")]
    pub base_score: f64,
    #[serde(deserialize_with = "null_default")]
    pub base_severity: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProblemType {
    #[serde(deserialize_with = "null_default")]
    pub descriptions: Vec<ProblemTypeDescription>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProblemTypeDescription {
    #[serde(rename = "type", deserialize_with = "null_default")]
    pub kind: String,
    #[serde(deserialize_with = "null_default")]
    pub lang: String,
    #[serde(deserialize_with = "null_default")]
    pub description: String,
    #[serde(deserialize_with = "null_default")]
    pub cwe_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Disclosure {
    #[serde(deserialize_with = "null_default")]
    pub advisory: String,
    #[serde(deserialize_with = "null_default")]
    pub discovery: String,
}

/// Reads an explicit `null` as the field's empty value.
fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl CveRecord {
    /// Decodes a record body. A record without any description is rejected
    /// even though it is structurally valid.
    pub fn decode(body: &[u8]) -> crate::Result<Self> {
        let record = Self::from_slice(body)?;
        record.validate()?;
        Ok(record)
    }

    pub fn from_slice(body: &[u8]) -> crate::Result<Self> {
        Ok(serde_json::from_slice(body)?)
    }

    pub fn validate(&self) -> crate::Result<()> {
        if self.containers.cna.descriptions.is_empty() {
            return Err(CvecatError::NoDescription);
        }
        Ok(())
    }
}

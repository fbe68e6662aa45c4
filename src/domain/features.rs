//! Feature schema for hepatitis risk prediction.
//!
//! The scaler and the classifier were both fitted on the same 21 columns in a
//! fixed order. Everything entering the pipeline is validated into a
//! [`FeatureVector`] in that order before any arithmetic happens.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

/// Number of model inputs.
pub const FEATURE_COUNT: usize = 21;

/// Feature names in the order the scaler and model were fitted on.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "Age",
    "Sex",
    "Estado_Civil",
    "Ciudad",
    "Steroid",
    "Antivirals",
    "Fatigue",
    "Malaise",
    "Anorexia",
    "Liver_Big",
    "Liver_Firm",
    "Spleen_Palpable",
    "Spiders",
    "Ascites",
    "Varices",
    "Bilirubin",
    "Alk_Phosphate",
    "Sgot",
    "Albumin",
    "Protime",
    "Histology",
];

/// Schema violations raised while reading a raw payload.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchemaError {
    #[error("Missing field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },
}

impl SchemaError {
    /// Name of the offending field.
    #[must_use]
    pub fn field(&self) -> &str {
        match self {
            Self::MissingField(field) | Self::InvalidValue { field, .. } => field,
        }
    }
}

/// A single raw value as handed over by a transport layer.
#[derive(Debug, Clone, Copy)]
pub enum RawField<'a> {
    /// Already numeric (JSON number, typed map).
    Number(f64),
    /// HTML form input; blank means the field was left unanswered.
    FormText(&'a str),
    /// Other text that still needs numeric parsing (JSON string).
    Text(&'a str),
    /// Anything else (JSON null, bool, array, object).
    Unsupported(&'a str),
}

/// Lookup of raw values by feature name.
///
/// Implemented for the map shapes produced by form decoding and JSON bodies.
pub trait RawFeatures {
    fn raw_field(&self, name: &str) -> Option<RawField<'_>>;
}

impl RawFeatures for HashMap<String, String> {
    fn raw_field(&self, name: &str) -> Option<RawField<'_>> {
        self.get(name).map(|v| RawField::FormText(v.as_str()))
    }
}

impl RawFeatures for BTreeMap<String, String> {
    fn raw_field(&self, name: &str) -> Option<RawField<'_>> {
        self.get(name).map(|v| RawField::FormText(v.as_str()))
    }
}

impl RawFeatures for HashMap<String, f64> {
    fn raw_field(&self, name: &str) -> Option<RawField<'_>> {
        self.get(name).copied().map(RawField::Number)
    }
}

impl RawFeatures for BTreeMap<String, f64> {
    fn raw_field(&self, name: &str) -> Option<RawField<'_>> {
        self.get(name).copied().map(RawField::Number)
    }
}

impl RawFeatures for serde_json::Map<String, serde_json::Value> {
    fn raw_field(&self, name: &str) -> Option<RawField<'_>> {
        use serde_json::Value;

        self.get(name).map(|v| match v {
            Value::Number(n) => match n.as_f64() {
                Some(x) => RawField::Number(x),
                None => RawField::Unsupported("number"),
            },
            Value::String(s) => RawField::Text(s.as_str()),
            Value::Null => RawField::Unsupported("null"),
            Value::Bool(true) => RawField::Unsupported("true"),
            Value::Bool(false) => RawField::Unsupported("false"),
            Value::Array(_) => RawField::Unsupported("array"),
            Value::Object(_) => RawField::Unsupported("object"),
        })
    }
}

/// The 21 model inputs in fitted order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeatureVector([f64; FEATURE_COUNT]);

impl FeatureVector {
    /// Validate a raw payload and reorder it into the fitted column order.
    ///
    /// Fields are checked in schema order, so the first missing or invalid
    /// field in that order is the one reported. Keys outside the schema are
    /// ignored.
    ///
    /// # Errors
    /// `SchemaError::MissingField` when a field is absent (or a blank form
    /// input), `SchemaError::InvalidValue` when it is not a finite number.
    pub fn validate_and_order<R: RawFeatures + ?Sized>(raw: &R) -> Result<Self, SchemaError> {
        let mut values = [0.0; FEATURE_COUNT];

        for (slot, name) in values.iter_mut().zip(FEATURE_NAMES) {
            let field = raw
                .raw_field(name)
                .ok_or_else(|| SchemaError::MissingField(name.to_string()))?;
            *slot = parse_field(name, field)?;
        }

        Ok(Self(values))
    }

    /// Build from values already in fitted order.
    ///
    /// # Errors
    /// Returns `SchemaError::InvalidValue` naming the first non-finite value.
    pub fn from_ordered(values: [f64; FEATURE_COUNT]) -> Result<Self, SchemaError> {
        if let Some(i) = values.iter().position(|v| !v.is_finite()) {
            return Err(SchemaError::InvalidValue {
                field: FEATURE_NAMES[i].to_string(),
                value: values[i].to_string(),
            });
        }
        Ok(Self(values))
    }

    #[must_use]
    pub fn as_array(&self) -> &[f64; FEATURE_COUNT] {
        &self.0
    }

    /// Value of a named feature.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<f64> {
        FEATURE_NAMES
            .iter()
            .position(|n| *n == name)
            .map(|i| self.0[i])
    }
}

fn parse_field(name: &str, field: RawField<'_>) -> Result<f64, SchemaError> {
    let invalid = |value: &str| SchemaError::InvalidValue {
        field: name.to_string(),
        value: value.to_string(),
    };

    let value = match field {
        RawField::Number(x) => x,
        RawField::FormText(text) if text.trim().is_empty() => {
            return Err(SchemaError::MissingField(name.to_string()));
        }
        RawField::FormText(text) | RawField::Text(text) => {
            text.trim().parse::<f64>().map_err(|_| invalid(text))?
        }
        RawField::Unsupported(kind) => return Err(invalid(kind)),
    };

    if !value.is_finite() {
        return Err(invalid(&value.to_string()));
    }
    Ok(value)
}

/// A [`FeatureVector`] after the per-feature affine transform.
///
/// Also used directly for synthetic probes that stand in for already-centered
/// data.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaledVector([f64; FEATURE_COUNT]);

impl ScaledVector {
    #[must_use]
    pub fn new(values: [f64; FEATURE_COUNT]) -> Self {
        Self(values)
    }

    #[must_use]
    pub fn as_array(&self) -> &[f64; FEATURE_COUNT] {
        &self.0
    }
}

/// Reference patients used by the diagnostic endpoint and the probe CLI.
pub mod fixtures {
    use super::{FeatureVector, FEATURE_COUNT};

    /// Healthy profile: minimal ordinal values and unremarkable labs.
    #[must_use]
    pub fn normal_patient() -> FeatureVector {
        //          Age   Sex  EC   Ci   Ste  Ant  Fat  Mal  Ano  LB   LF   SP   Spi  Asc  Var
        let values: [f64; FEATURE_COUNT] = [
            30.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0,
            // Bili Alk   Sgot  Alb  Prot  Hist
            1.0, 80.0, 35.0, 4.5, 40.0, 1.0,
        ];
        FeatureVector(values)
    }

    /// Extreme hepatitis profile: every ordinal symptom present, severe labs.
    #[must_use]
    pub fn extreme_patient() -> FeatureVector {
        let values: [f64; FEATURE_COUNT] = [
            65.0, 1.0, 1.0, 1.0, 2.0, 2.0, 2.0, 2.0, 2.0, 2.0, 2.0, 2.0, 2.0, 2.0, 2.0,
            8.5, 200.0, 150.0, 2.0, 25.0, 2.0,
        ];
        FeatureVector(values)
    }

    /// Mixed profile used by the service self-diagnostic.
    #[must_use]
    pub fn reference_patient() -> FeatureVector {
        let values: [f64; FEATURE_COUNT] = [
            45.0, 1.0, 1.0, 1.0, 2.0, 1.0, 2.0, 1.0, 2.0, 2.0, 1.0, 2.0, 1.0, 2.0, 1.0,
            5.5, 180.0, 120.0, 3.0, 35.0, 2.0,
        ];
        FeatureVector(values)
    }
}

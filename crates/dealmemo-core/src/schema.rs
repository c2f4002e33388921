//! Field schema configuration
//!
//! The wizard engine is schema-driven: which fields exist, their display
//! labels, which are long-form, and which are required (unconditionally or
//! conditionally) all come from a versioned `FieldSchema` artifact loaded
//! once at session start. Two variants ship built in; deployments can also
//! supply their own as JSON.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Sentinel accepted in `FieldSpec::default`: resolves to the current date
/// in MM-DD-YYYY form at state construction and on every reset.
pub const TODAY_SENTINEL: &str = "@today";

/// Declarative conditional-requiredness rule: the field carrying this rule
/// is required iff the named companion field currently equals `equals`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequiredIf {
    pub field: String,
    pub equals: String,
}

/// One ordered entry in a field set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub key: String,
    pub label: String,
    /// Unconditionally required (manual fields only).
    #[serde(default)]
    pub required: bool,
    /// Rendered as a multi-line input.
    #[serde(default)]
    pub multiline: bool,
    /// Enumerated values for select-style fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    /// Conditional requiredness; mutually exclusive with `required`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_if: Option<RequiredIf>,
    /// Initial value. `"@today"` resolves to the current date.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    /// Input hint shown by the UI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
}

impl FieldSpec {
    fn text(key: &str, label: &str) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            required: false,
            multiline: false,
            options: None,
            required_if: None,
            default: None,
            placeholder: None,
        }
    }

    fn required(mut self) -> Self {
        self.required = true;
        self
    }

    fn multiline(mut self) -> Self {
        self.multiline = true;
        self
    }

    fn select(mut self, options: &[&str]) -> Self {
        self.options = Some(options.iter().map(|s| s.to_string()).collect());
        self
    }

    fn required_when(mut self, field: &str, equals: &str) -> Self {
        self.required_if = Some(RequiredIf {
            field: field.to_string(),
            equals: equals.to_string(),
        });
        self
    }

    fn default_value(mut self, value: &str) -> Self {
        self.default = Some(value.to_string());
        self
    }

    fn placeholder(mut self, hint: &str) -> Self {
        self.placeholder = Some(hint.to_string());
        self
    }
}

/// Problems found while loading or validating a schema artifact.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("schema version must not be empty")]
    EmptyVersion,
    #[error("schema defines no fields")]
    NoFields,
    #[error("duplicate field key: {0}")]
    DuplicateKey(String),
    #[error("field {field} has both required and required_if")]
    ConflictingRequiredness { field: String },
    #[error("field {field} conditions on unknown manual field {refers}")]
    UnknownConditionField { field: String, refers: String },
    #[error("invalid schema JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// A versioned pair of closed, ordered field sets: one populated by
/// extraction, one entered manually. The two sets are disjoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSchema {
    pub version: String,
    pub extracted: Vec<FieldSpec>,
    pub manual: Vec<FieldSpec>,
}

impl FieldSchema {
    /// Default variant: vendor/contractor contact extraction plus a yes/no
    /// questionnaire with one conditionally required detail field.
    pub fn contractor() -> Self {
        Self {
            version: "contractor-v1".to_string(),
            extracted: vec![
                FieldSpec::text("vendor_name", "Vendor Name"),
                FieldSpec::text("description_of_services", "Description of Services").multiline(),
                FieldSpec::text("total_cost", "Total Cost"),
                FieldSpec::text("payment_terms", "Payment Terms"),
                FieldSpec::text("contract_start_date", "Contract Start Date"),
                FieldSpec::text("contract_end_date", "Contract End Date"),
                FieldSpec::text("contractor_email", "Contractor Email"),
                FieldSpec::text("contractor_phone", "Contractor Phone"),
                FieldSpec::text("contractor_address", "Contractor Address"),
            ],
            manual: vec![
                FieldSpec::text("deal_owner", "Deal Owner")
                    .required()
                    .placeholder("e.g., Jane Smith"),
                FieldSpec::text("department", "Department")
                    .required()
                    .placeholder("e.g., Engineering"),
                FieldSpec::text("business_justification", "Business Justification")
                    .required()
                    .multiline()
                    .placeholder("Explain the business need for this deal..."),
                FieldSpec::text("budget_code", "Budget Code").placeholder("e.g., ENG-2026-001"),
                FieldSpec::text("submission_date", "Submission Date")
                    .required()
                    .default_value(TODAY_SENTINEL),
                FieldSpec::text("budget_contemplated", "Budget Contemplated")
                    .select(&["Yes", "No"]),
                FieldSpec::text("requires_rf_access", "Requires RF Access").select(&["Yes", "No"]),
                FieldSpec::text("contract_team_info_needed", "Contract Team Info Needed")
                    .select(&["Yes", "No"]),
                FieldSpec::text("contract_team_info_details", "Contract Team Info Details")
                    .multiline()
                    .required_when("contract_team_info_needed", "Yes"),
            ],
        }
    }

    /// Alternate variant: SLA/liability/renewal-oriented extraction with
    /// approver and priority manual fields.
    pub fn procurement() -> Self {
        Self {
            version: "procurement-v1".to_string(),
            extracted: vec![
                FieldSpec::text("vendor_name", "Vendor Name"),
                FieldSpec::text("description_of_services", "Description of Services").multiline(),
                FieldSpec::text("total_cost", "Total Cost"),
                FieldSpec::text("payment_terms", "Payment Terms"),
                FieldSpec::text("contract_start_date", "Contract Start Date"),
                FieldSpec::text("contract_end_date", "Contract End Date"),
                FieldSpec::text("contract_type", "Contract Type"),
                FieldSpec::text("renewal_terms", "Renewal Terms"),
                FieldSpec::text("termination_clause", "Termination Clause").multiline(),
                FieldSpec::text("key_deliverables", "Key Deliverables").multiline(),
                FieldSpec::text("sla_terms", "SLA Terms").multiline(),
                FieldSpec::text("confidentiality_terms", "Confidentiality Terms").multiline(),
                FieldSpec::text("liability_cap", "Liability Cap"),
                FieldSpec::text("insurance_requirements", "Insurance Requirements"),
            ],
            manual: vec![
                FieldSpec::text("deal_owner", "Deal Owner")
                    .required()
                    .placeholder("e.g., Jane Smith"),
                FieldSpec::text("department", "Department")
                    .required()
                    .placeholder("e.g., Engineering"),
                FieldSpec::text("business_justification", "Business Justification")
                    .required()
                    .multiline()
                    .placeholder("Explain the business need for this deal..."),
                FieldSpec::text("budget_code", "Budget Code").placeholder("e.g., ENG-2026-001"),
                FieldSpec::text("approver_name", "Approver Name")
                    .required()
                    .placeholder("e.g., John Doe"),
                FieldSpec::text("deal_priority", "Deal Priority")
                    .select(&["Low", "Medium", "High", "Critical"])
                    .default_value("Medium"),
                FieldSpec::text("internal_notes", "Internal Notes")
                    .multiline()
                    .placeholder("Any additional notes for internal use..."),
            ],
        }
    }

    /// Look up a built-in variant by name.
    pub fn by_name(name: &str) -> Option<Self> {
        match name {
            "contractor" => Some(Self::contractor()),
            "procurement" => Some(Self::procurement()),
            _ => None,
        }
    }

    /// Parse and validate a schema artifact from JSON.
    pub fn from_json(json: &str) -> Result<Self, SchemaError> {
        let schema: Self = serde_json::from_str(json)?;
        schema.validate()?;
        Ok(schema)
    }

    /// Structural validation: unique keys across both sets, conditional
    /// rules reference existing manual fields, requiredness not doubled up.
    pub fn validate(&self) -> Result<(), SchemaError> {
        if self.version.trim().is_empty() {
            return Err(SchemaError::EmptyVersion);
        }
        if self.extracted.is_empty() && self.manual.is_empty() {
            return Err(SchemaError::NoFields);
        }

        let mut seen = std::collections::BTreeSet::new();
        for spec in self.extracted.iter().chain(self.manual.iter()) {
            if !seen.insert(spec.key.as_str()) {
                return Err(SchemaError::DuplicateKey(spec.key.clone()));
            }
        }

        for spec in &self.manual {
            if spec.required && spec.required_if.is_some() {
                return Err(SchemaError::ConflictingRequiredness {
                    field: spec.key.clone(),
                });
            }
            if let Some(rule) = &spec.required_if {
                let known = self.manual.iter().any(|s| s.key == rule.field);
                if !known {
                    return Err(SchemaError::UnknownConditionField {
                        field: spec.key.clone(),
                        refers: rule.field.clone(),
                    });
                }
            }
        }

        Ok(())
    }

    pub fn extracted_keys(&self) -> impl Iterator<Item = &str> {
        self.extracted.iter().map(|s| s.key.as_str())
    }

    pub fn manual_keys(&self) -> impl Iterator<Item = &str> {
        self.manual.iter().map(|s| s.key.as_str())
    }

    pub fn has_extracted_key(&self, key: &str) -> bool {
        self.extracted.iter().any(|s| s.key == key)
    }

    pub fn has_manual_key(&self, key: &str) -> bool {
        self.manual.iter().any(|s| s.key == key)
    }

    /// The field used to name generated documents. By convention the first
    /// extracted field identifies the deal counterparty.
    pub fn primary_key(&self) -> Option<&str> {
        self.extracted.first().map(|s| s.key.as_str())
    }

    /// Initial manual values: every key materialized, defaults applied,
    /// `"@today"` resolved against the supplied date string.
    pub fn manual_defaults(&self, today: &str) -> BTreeMap<String, String> {
        self.manual
            .iter()
            .map(|spec| {
                let value = match spec.default.as_deref() {
                    Some(TODAY_SENTINEL) => today.to_string(),
                    Some(other) => other.to_string(),
                    None => String::new(),
                };
                (spec.key.clone(), value)
            })
            .collect()
    }

    /// Rule-table walk: which manual fields are required right now, given
    /// the current values, but empty. Returns display labels in schema
    /// order. Conditional rules are evaluated against `values` at call
    /// time, so this is safe to use as a transition gate.
    pub fn missing_required(&self, values: &BTreeMap<String, String>) -> Vec<String> {
        self.manual
            .iter()
            .filter(|spec| {
                let needed = spec.required
                    || spec.required_if.as_ref().is_some_and(|rule| {
                        values.get(&rule.field).map(String::as_str) == Some(rule.equals.as_str())
                    });
                let empty = values
                    .get(&spec.key)
                    .map(|v| v.trim().is_empty())
                    .unwrap_or(true);
                needed && empty
            })
            .map(|spec| spec.label.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_builtin_variants_validate() {
        FieldSchema::contractor().validate().unwrap();
        FieldSchema::procurement().validate().unwrap();
    }

    #[test]
    fn test_extracted_and_manual_sets_are_disjoint() {
        for schema in [FieldSchema::contractor(), FieldSchema::procurement()] {
            for key in schema.extracted_keys() {
                assert!(!schema.has_manual_key(key), "{} appears in both sets", key);
            }
        }
    }

    #[test]
    fn test_by_name_resolves_variants() {
        assert_eq!(
            FieldSchema::by_name("contractor").unwrap().version,
            "contractor-v1"
        );
        assert_eq!(
            FieldSchema::by_name("procurement").unwrap().version,
            "procurement-v1"
        );
        assert!(FieldSchema::by_name("unknown").is_none());
    }

    #[test]
    fn test_json_round_trip_preserves_order() {
        let schema = FieldSchema::contractor();
        let json = serde_json::to_string(&schema).unwrap();
        let parsed = FieldSchema::from_json(&json).unwrap();
        assert_eq!(parsed, schema);
        let keys: Vec<_> = parsed.extracted_keys().collect();
        assert_eq!(keys[0], "vendor_name");
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let mut schema = FieldSchema::contractor();
        schema.manual.push(FieldSpec::text("vendor_name", "Dup"));
        assert!(matches!(
            schema.validate(),
            Err(SchemaError::DuplicateKey(k)) if k == "vendor_name"
        ));
    }

    #[test]
    fn test_condition_on_unknown_field_rejected() {
        let mut schema = FieldSchema::contractor();
        schema
            .manual
            .push(FieldSpec::text("extra", "Extra").required_when("nonexistent", "Yes"));
        assert!(matches!(
            schema.validate(),
            Err(SchemaError::UnknownConditionField { .. })
        ));
    }

    #[test]
    fn test_required_and_required_if_conflict_rejected() {
        let mut schema = FieldSchema::contractor();
        schema.manual.push(
            FieldSpec::text("extra", "Extra")
                .required()
                .required_when("budget_contemplated", "Yes"),
        );
        assert!(matches!(
            schema.validate(),
            Err(SchemaError::ConflictingRequiredness { .. })
        ));
    }

    #[test]
    fn test_manual_defaults_resolve_today() {
        let schema = FieldSchema::contractor();
        let defaults = schema.manual_defaults("02-28-2026");
        assert_eq!(defaults["submission_date"], "02-28-2026");
        assert_eq!(defaults["deal_owner"], "");
        assert_eq!(defaults.len(), schema.manual.len());
    }

    #[test]
    fn test_static_default_applied() {
        let schema = FieldSchema::procurement();
        let defaults = schema.manual_defaults("02-28-2026");
        assert_eq!(defaults["deal_priority"], "Medium");
    }

    #[test]
    fn test_missing_required_reports_empty_required_fields() {
        let schema = FieldSchema::contractor();
        let values = schema.manual_defaults("02-28-2026");
        let missing = schema.missing_required(&values);
        assert_eq!(
            missing,
            vec!["Deal Owner", "Department", "Business Justification"]
        );
    }

    #[test]
    fn test_conditional_field_required_only_when_companion_is_yes() {
        let schema = FieldSchema::contractor();
        let mut values = schema.manual_defaults("02-28-2026");
        values.insert("deal_owner".into(), "Jane".into());
        values.insert("department".into(), "Eng".into());
        values.insert("business_justification".into(), "Needed".into());

        assert!(schema.missing_required(&values).is_empty());

        values.insert("contract_team_info_needed".into(), "Yes".into());
        assert_eq!(
            schema.missing_required(&values),
            vec!["Contract Team Info Details"]
        );

        values.insert("contract_team_info_details".into(), "Loop in legal".into());
        assert!(schema.missing_required(&values).is_empty());

        values.insert("contract_team_info_needed".into(), "No".into());
        values.insert("contract_team_info_details".into(), String::new());
        assert!(schema.missing_required(&values).is_empty());
    }

    #[test]
    fn test_whitespace_only_counts_as_empty() {
        let schema = FieldSchema::contractor();
        let mut values = schema.manual_defaults("02-28-2026");
        values.insert("deal_owner".into(), "   ".into());
        let missing = schema.missing_required(&values);
        assert!(missing.contains(&"Deal Owner".to_string()));
    }
}

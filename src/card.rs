/*
MIT License

Copyright (c) 2026 Raja Lehtihet and Wael El Oraiby

Permission is hereby granted, free of charge, to any person obtaining a copy
of this software and associated documentation files (the "Software"), to deal
in the Software without restriction, including without limitation the rights
to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
copies of the Software, and to permit persons to whom the Software is
furnished to do so, subject to the following conditions:

The above copyright notice and this permission notice shall be included in all
copies or substantial portions of the Software.

THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
SOFTWARE.
*/

//! Card definitions, card instances and their calculation state.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::check::Verdict;
use crate::constants::{AppConstantId, GlobalConstantId};
use crate::error::CalcError;
use crate::resolver::InputSnapshot;
use crate::value::{Value, ValueType};

id_type!(
    /// Identity of a [`Card`].
    CardId
);
id_type!(
    /// Identity of a [`CardInstance`].
    CardInstanceId
);
id_type!(
    /// Identity of the calculation revision owning an instance.
    RevisionId
);

/// Problems with a card's variable schema.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("invalid variable schema JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("variable '{variable}' has unknown type '{type_name}'")]
    UnknownType { variable: String, type_name: String },
}

/// Problems changing an instance's input bindings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindingError {
    #[error("input '{0}' is not bound to a job constant")]
    NotBound(String),
}

/// Declared input or output variable of a card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableSpec {
    pub name: String,
    pub value_type: ValueType,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub description: String,
    /// Library constant supplying the default value.
    #[serde(default)]
    pub default_constant: Option<AppConstantId>,
}

impl VariableSpec {
    pub fn new(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            value_type,
            unit: String::new(),
            description: String::new(),
            default_constant: None,
        }
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = unit.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_default(mut self, constant: AppConstantId) -> Self {
        self.default_constant = Some(constant);
        self
    }
}

// Stored schema entry: {"name","type","unit","description","appConstantId"}.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawVariable {
    name: String,
    #[serde(rename = "type")]
    type_name: String,
    #[serde(default)]
    unit: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    app_constant_id: Option<i64>,
}

/// Reusable calculation template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub id: CardId,
    pub name: String,
    /// Category such as "Tension Check" or "Beam Design".
    #[serde(default)]
    pub card_type: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Formula source text.
    pub source: String,
    /// Display-only rendering of the formula (MathML).
    #[serde(default)]
    pub rendered_formula: Option<String>,
    #[serde(default)]
    pub inputs: Vec<VariableSpec>,
    #[serde(default)]
    pub outputs: Vec<VariableSpec>,
    #[serde(default)]
    pub design_load_variable: Option<String>,
    #[serde(default)]
    pub capacity_variable: Option<String>,
}

fn default_version() -> String {
    "1.0".to_string()
}

impl Card {
    pub fn new(id: CardId, name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            card_type: String::new(),
            version: default_version(),
            description: None,
            source: source.into(),
            rendered_formula: None,
            inputs: Vec::new(),
            outputs: Vec::new(),
            design_load_variable: None,
            capacity_variable: None,
        }
    }

    pub fn with_inputs(mut self, inputs: Vec<VariableSpec>) -> Self {
        self.inputs = inputs;
        self
    }

    pub fn with_outputs(mut self, outputs: Vec<VariableSpec>) -> Self {
        self.outputs = outputs;
        self
    }

    /// Names the input compared as the design load.
    pub fn with_design_load(mut self, variable: impl Into<String>) -> Self {
        self.design_load_variable = Some(variable.into());
        self
    }

    /// Names the output compared as the capacity.
    pub fn with_capacity(mut self, variable: impl Into<String>) -> Self {
        self.capacity_variable = Some(variable.into());
        self
    }

    /// Parses a stored variable schema: a JSON array of
    /// `{"name", "type", "unit", "description", "appConstantId"}` objects.
    /// An empty object `{}` or blank text is an empty schema.
    pub fn parse_variable_schema(json: &str) -> Result<Vec<VariableSpec>, SchemaError> {
        let trimmed = json.trim();
        if trimmed.is_empty() || trimmed == "{}" {
            return Ok(Vec::new());
        }
        let raw: Vec<RawVariable> = serde_json::from_str(trimmed)?;
        raw.into_iter()
            .map(|var| {
                let value_type = ValueType::from_schema_name(&var.type_name).ok_or_else(|| {
                    SchemaError::UnknownType {
                        variable: var.name.clone(),
                        type_name: var.type_name.clone(),
                    }
                })?;
                Ok(VariableSpec {
                    name: var.name,
                    value_type,
                    unit: var.unit.unwrap_or_default(),
                    description: var.description.unwrap_or_default(),
                    default_constant: var.app_constant_id.map(AppConstantId),
                })
            })
            .collect()
    }

    pub fn input(&self, name: &str) -> Option<&VariableSpec> {
        self.inputs.iter().find(|v| v.name == name)
    }

    pub fn output(&self, name: &str) -> Option<&VariableSpec> {
        self.outputs.iter().find(|v| v.name == name)
    }
}

/// Where one input of an instance takes its value from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputBinding {
    /// Instance-local value.
    Local(Value),
    /// Current value of a job constant.
    Bound(GlobalConstantId),
    /// Bound, but the local value wins; the binding is kept for traceability.
    Overridden {
        constant: GlobalConstantId,
        value: Value,
    },
}

impl InputBinding {
    /// The job constant this input is linked to, overridden or not.
    pub fn constant(&self) -> Option<GlobalConstantId> {
        match self {
            InputBinding::Local(_) => None,
            InputBinding::Bound(id) | InputBinding::Overridden { constant: id, .. } => Some(*id),
        }
    }
}

/// Result of the most recent successful calculation of an instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationRecord {
    /// Inputs as resolved, with provenance.
    pub inputs: InputSnapshot,
    /// Output parameters plus `returnValue`.
    pub outputs: IndexMap<String, Value>,
    pub design_load: Option<f64>,
    pub capacity: Option<f64>,
    pub verdict: Verdict,
    pub calculated_at: DateTime<Utc>,
}

impl CalculationRecord {
    /// Output map rendered as the JSON text persisted with the instance.
    pub fn results_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.outputs)
    }
}

/// Why the most recent calculation of an instance failed.
#[derive(Debug, Clone, PartialEq)]
pub struct CalculationFailure {
    pub card_id: CardId,
    pub instance_id: CardInstanceId,
    pub error: CalcError,
    pub at: DateTime<Utc>,
}

impl CalculationFailure {
    pub fn new(card_id: CardId, instance_id: CardInstanceId, error: CalcError) -> Self {
        Self {
            card_id,
            instance_id,
            error,
            at: Utc::now(),
        }
    }

    /// Whether the card definition itself is broken.
    pub fn is_card_level(&self) -> bool {
        self.error.is_card_level()
    }
}

impl fmt::Display for CalculationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "card {} instance {}: {}",
            self.card_id, self.instance_id, self.error
        )
    }
}

/// One placement of a card within a calculation revision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardInstance {
    pub id: CardInstanceId,
    pub card_id: CardId,
    pub revision_id: RevisionId,
    #[serde(default)]
    pub display_order: i32,
    #[serde(default)]
    pub bindings: IndexMap<String, InputBinding>,
    #[serde(default)]
    pub record: Option<CalculationRecord>,
    #[serde(skip)]
    pub last_failure: Option<CalculationFailure>,
}

impl CardInstance {
    pub fn new(id: CardInstanceId, card_id: CardId, revision_id: RevisionId) -> Self {
        Self {
            id,
            card_id,
            revision_id,
            display_order: 0,
            bindings: IndexMap::new(),
            record: None,
            last_failure: None,
        }
    }

    /// Converts the stored two-map representation: local values, constant
    /// bindings and per-variable override flags.
    ///
    /// A binding with no override flag entry is treated as bound, and a stale
    /// local value next to an unset flag is dropped. A set flag without a
    /// local value leaves the variable unbound, so it resolves from the
    /// schema default.
    pub fn from_legacy_maps(
        id: CardInstanceId,
        card_id: CardId,
        revision_id: RevisionId,
        local_values: IndexMap<String, Value>,
        global_bindings: IndexMap<String, GlobalConstantId>,
        overrides: IndexMap<String, bool>,
    ) -> Self {
        let mut instance = Self::new(id, card_id, revision_id);
        let mut locals = local_values;

        for (name, constant) in global_bindings {
            let overridden = overrides.get(&name).copied().unwrap_or(false);
            let binding = match (overridden, locals.shift_remove(&name)) {
                (true, Some(value)) => InputBinding::Overridden { constant, value },
                (true, None) => continue,
                (false, _) => InputBinding::Bound(constant),
            };
            instance.bindings.insert(name, binding);
        }
        for (name, value) in locals {
            instance.bindings.insert(name, InputBinding::Local(value));
        }
        instance
    }

    /// Sets an instance-local value, replacing any binding.
    pub fn set_local(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.bindings
            .insert(name.into(), InputBinding::Local(value.into()));
    }

    /// Binds an input to a job constant, replacing any local value.
    pub fn bind(&mut self, name: impl Into<String>, constant: GlobalConstantId) {
        self.bindings
            .insert(name.into(), InputBinding::Bound(constant));
    }

    /// Overrides a bound input with a local value, keeping the binding.
    pub fn override_input(
        &mut self,
        name: &str,
        value: impl Into<Value>,
    ) -> Result<(), BindingError> {
        let binding = self
            .bindings
            .get_mut(name)
            .ok_or_else(|| BindingError::NotBound(name.to_string()))?;
        let Some(constant) = binding.constant() else {
            return Err(BindingError::NotBound(name.to_string()));
        };
        *binding = InputBinding::Overridden {
            constant,
            value: value.into(),
        };
        Ok(())
    }

    /// Drops a local override; the input follows its job constant again.
    pub fn clear_override(&mut self, name: &str) -> Result<(), BindingError> {
        let binding = self
            .bindings
            .get_mut(name)
            .ok_or_else(|| BindingError::NotBound(name.to_string()))?;
        let Some(constant) = binding.constant() else {
            return Err(BindingError::NotBound(name.to_string()));
        };
        *binding = InputBinding::Bound(constant);
        Ok(())
    }

    /// Writes a calculation outcome back. Success replaces the record
    /// wholesale; failure leaves the previous record untouched.
    pub fn apply(&mut self, outcome: Result<CalculationRecord, CalculationFailure>) {
        match outcome {
            Ok(record) => {
                self.record = Some(record);
                self.last_failure = None;
            }
            Err(failure) => self.last_failure = Some(failure),
        }
    }

    /// Verdict of the stored record, if any.
    pub fn verdict(&self) -> Option<Verdict> {
        self.record.as_ref().map(|r| r.verdict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOLT_INPUTS: &str = r#"[
  {"name": "boltDia", "type": "double", "unit": "mm", "description": "Bolt diameter"},
  {"name": "tensileStrength", "type": "double", "unit": "MPa", "description": "Bolt tensile strength", "appConstantId": 12},
  {"name": "numberOfBolts", "type": "int", "unit": "", "description": "Number of bolts"},
  {"name": "designLoad", "type": "double", "unit": "kN", "description": "Design tension load"}
]"#;

    #[test]
    fn parses_stored_schema() {
        let vars = Card::parse_variable_schema(BOLT_INPUTS).unwrap();
        assert_eq!(vars.len(), 4);
        assert_eq!(vars[1].default_constant, Some(AppConstantId(12)));
        assert_eq!(vars[1].unit, "MPa");
        assert_eq!(vars[2].value_type, ValueType::Integer);
        assert!(Card::parse_variable_schema("{}").unwrap().is_empty());
    }

    #[test]
    fn schema_rejects_unknown_type() {
        let err = Card::parse_variable_schema(r#"[{"name": "x", "type": "matrix"}]"#).unwrap_err();
        assert!(matches!(err, SchemaError::UnknownType { ref type_name, .. } if type_name == "matrix"));
        assert!(matches!(
            Card::parse_variable_schema("[{"),
            Err(SchemaError::Json(_))
        ));
    }

    #[test]
    fn legacy_maps_default_to_bound() {
        let locals = IndexMap::from([
            ("span".to_string(), Value::Number(6.0)),
            ("fy".to_string(), Value::Number(355.0)),
        ]);
        let bindings = IndexMap::from([
            ("fy".to_string(), GlobalConstantId(1)),
            ("gamma".to_string(), GlobalConstantId(2)),
            ("phi".to_string(), GlobalConstantId(3)),
        ]);
        let overrides = IndexMap::from([("fy".to_string(), true), ("phi".to_string(), true)]);

        let instance = CardInstance::from_legacy_maps(
            CardInstanceId(1),
            CardId(1),
            RevisionId(1),
            locals,
            bindings,
            overrides,
        );

        assert_eq!(
            instance.bindings["fy"],
            InputBinding::Overridden {
                constant: GlobalConstantId(1),
                value: Value::Number(355.0)
            }
        );
        assert_eq!(instance.bindings["gamma"], InputBinding::Bound(GlobalConstantId(2)));
        assert!(!instance.bindings.contains_key("phi"));
        assert_eq!(instance.bindings["span"], InputBinding::Local(Value::Number(6.0)));
    }

    #[test]
    fn legacy_unset_flag_ignores_stale_local() {
        let locals = IndexMap::from([("fy".to_string(), Value::Number(355.0))]);
        let bindings = IndexMap::from([("fy".to_string(), GlobalConstantId(1))]);
        let overrides = IndexMap::from([("fy".to_string(), false)]);

        let instance = CardInstance::from_legacy_maps(
            CardInstanceId(1),
            CardId(1),
            RevisionId(1),
            locals,
            bindings,
            overrides,
        );

        assert_eq!(instance.bindings.len(), 1);
        assert_eq!(instance.bindings["fy"], InputBinding::Bound(GlobalConstantId(1)));
    }

    #[test]
    fn override_round_trip_keeps_constant() {
        let mut instance = CardInstance::new(CardInstanceId(1), CardId(1), RevisionId(1));
        instance.bind("fy", GlobalConstantId(4));
        instance.override_input("fy", 300.0).unwrap();
        assert_eq!(instance.bindings["fy"].constant(), Some(GlobalConstantId(4)));
        instance.clear_override("fy").unwrap();
        assert_eq!(instance.bindings["fy"], InputBinding::Bound(GlobalConstantId(4)));

        instance.set_local("span", 5.0);
        assert_eq!(
            instance.override_input("span", 6.0),
            Err(BindingError::NotBound("span".to_string()))
        );
        assert!(instance.clear_override("missing").is_err());
    }

    #[test]
    fn binding_serialises_tagged() {
        let json = serde_json::to_string(&InputBinding::Overridden {
            constant: GlobalConstantId(3),
            value: Value::Number(1.5),
        })
        .unwrap();
        assert_eq!(json, r#"{"overridden":{"constant":3,"value":1.5}}"#);
    }
}

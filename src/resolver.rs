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

//! Input resolution: binds every input variable of a card from the layered
//! value sources of one instance.
//!
//! Precedence, per variable in schema order:
//!
//! 1. an instance-local value, or an overridden binding's local value;
//! 2. the current value of the bound job constant;
//! 3. the schema default taken from the application constant library.
//!
//! Every value is then coerced to the declared [`ValueType`]. Resolution only
//! reads the store.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::debug;

use crate::card::{Card, CardInstance, InputBinding, VariableSpec};
use crate::constants::{AppConstantId, ConstantStore, GlobalConstantId};
use crate::unit::ResolvedInputs;
use crate::value::{Value, ValueType};

/// A constant reference that no longer resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DanglingRef {
    GlobalConstant(GlobalConstantId),
    AppConstant(AppConstantId),
}

impl fmt::Display for DanglingRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DanglingRef::GlobalConstant(id) => write!(f, "global constant {id}"),
            DanglingRef::AppConstant(id) => write!(f, "application constant {id}"),
        }
    }
}

/// Per-variable resolution failure.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResolutionError {
    #[error("required input '{variable}' has no value")]
    MissingRequiredInput { variable: String },

    #[error("input '{variable}' refers to {reference}, which no longer exists")]
    DanglingBinding {
        variable: String,
        reference: DanglingRef,
    },

    #[error("input '{variable}' expects {expected} but got {actual} value '{value}'")]
    TypeMismatch {
        variable: String,
        expected: ValueType,
        actual: String,
        value: String,
    },
}

/// Where a resolved value came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source")]
pub enum Provenance {
    /// Instance-local value.
    Local,
    /// Local value overriding a retained job-constant binding.
    Override { constant: GlobalConstantId },
    /// Current value of a job constant.
    Global { id: GlobalConstantId, name: String },
    /// Schema default from the constant library.
    Default {
        app_constant: AppConstantId,
        name: String,
    },
}

/// One audited input value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    pub value: Value,
    pub provenance: Provenance,
}

/// Owned copy of the resolved inputs with provenance, stored with the
/// calculation record for audit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InputSnapshot {
    entries: IndexMap<String, SnapshotEntry>,
}

impl InputSnapshot {
    pub fn get(&self, name: &str) -> Option<&SnapshotEntry> {
        self.entries.get(name)
    }

    pub fn value(&self, name: &str) -> Option<&Value> {
        self.entries.get(name).map(|e| &e.value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SnapshotEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Plain name to value map, the shape of the persisted
    /// `LocalVariables` JSON.
    pub fn values(&self) -> IndexMap<String, Value> {
        self.entries
            .iter()
            .map(|(k, e)| (k.clone(), e.value.clone()))
            .collect()
    }
}

/// Inputs ready for execution plus their audit snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub inputs: ResolvedInputs,
    pub snapshot: InputSnapshot,
}

/// Resolves every input variable of `card` for `instance`.
///
/// Stops at the first failing variable in schema order.
pub fn resolve(
    card: &Card,
    instance: &CardInstance,
    store: &ConstantStore,
) -> Result<Resolution, ResolutionError> {
    let mut inputs = ResolvedInputs::new();
    let mut snapshot = InputSnapshot::default();

    for spec in &card.inputs {
        let (raw, provenance) = lookup(spec, instance.bindings.get(&spec.name), store)?;
        let value = raw
            .coerce(spec.value_type)
            .ok_or_else(|| ResolutionError::TypeMismatch {
                variable: spec.name.clone(),
                expected: spec.value_type,
                actual: raw.kind().to_string(),
                value: raw.to_string(),
            })?;
        debug!(
            card = %card.id,
            instance = %instance.id,
            variable = %spec.name,
            value = %value,
            ?provenance,
            "resolved input"
        );
        inputs.insert(spec.name.clone(), value.clone());
        snapshot
            .entries
            .insert(spec.name.clone(), SnapshotEntry { value, provenance });
    }

    Ok(Resolution { inputs, snapshot })
}

fn lookup(
    spec: &VariableSpec,
    binding: Option<&InputBinding>,
    store: &ConstantStore,
) -> Result<(Value, Provenance), ResolutionError> {
    match binding {
        Some(InputBinding::Local(value)) => Ok((value.clone(), Provenance::Local)),
        Some(InputBinding::Overridden { constant, value }) => Ok((
            value.clone(),
            Provenance::Override {
                constant: *constant,
            },
        )),
        Some(InputBinding::Bound(id)) => {
            let constant =
                store
                    .job
                    .get(*id)
                    .ok_or_else(|| ResolutionError::DanglingBinding {
                        variable: spec.name.clone(),
                        reference: DanglingRef::GlobalConstant(*id),
                    })?;
            Ok((
                constant.value.clone(),
                Provenance::Global {
                    id: *id,
                    name: constant.name.clone(),
                },
            ))
        }
        None => {
            let Some(id) = spec.default_constant else {
                return Err(ResolutionError::MissingRequiredInput {
                    variable: spec.name.clone(),
                });
            };
            let constant =
                store
                    .library
                    .get(id)
                    .ok_or_else(|| ResolutionError::DanglingBinding {
                        variable: spec.name.clone(),
                        reference: DanglingRef::AppConstant(id),
                    })?;
            Ok((
                constant.default_value.clone(),
                Provenance::Default {
                    app_constant: id,
                    name: constant.name.clone(),
                },
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::{CardId, CardInstanceId, RevisionId};
    use crate::constants::{AppConstant, GlobalConstant, JobId};

    fn card() -> Card {
        Card::new(CardId(1), "Plate Bending Capacity", "fy = fy;")
            .with_inputs(vec![
                VariableSpec::new("width", ValueType::Number),
                VariableSpec::new("count", ValueType::Integer),
                VariableSpec::new("fy", ValueType::Number).with_default(AppConstantId(3)),
            ])
    }

    fn store() -> ConstantStore {
        let mut store = ConstantStore::for_job(JobId(1));
        store
            .library
            .insert(AppConstant::new(AppConstantId(3), "fy_Grade300", 300.0))
            .unwrap();
        store
            .job
            .insert(GlobalConstant::new(GlobalConstantId(9), JobId(1), "fy_site", 320.0))
            .unwrap();
        store
    }

    fn instance() -> CardInstance {
        let mut instance = CardInstance::new(CardInstanceId(1), CardId(1), RevisionId(1));
        instance.set_local("width", 200.0);
        instance.set_local("count", "4");
        instance
    }

    #[test]
    fn default_fills_unbound_inputs_and_text_coerces() {
        let resolution = resolve(&card(), &instance(), &store()).unwrap();
        assert_eq!(resolution.inputs.get_number("count"), Some(4.0));
        assert_eq!(resolution.inputs.get_number("fy"), Some(300.0));
        assert_eq!(
            resolution.snapshot.get("fy").unwrap().provenance,
            Provenance::Default {
                app_constant: AppConstantId(3),
                name: "fy_Grade300".to_string()
            }
        );
        let names: Vec<_> = resolution.inputs.iter().map(|(k, _)| k).collect();
        assert_eq!(names, ["width", "count", "fy"]);
    }

    #[test]
    fn bound_constant_then_override_precedence() {
        let mut instance = instance();
        instance.bind("fy", GlobalConstantId(9));
        let bound = resolve(&card(), &instance, &store()).unwrap();
        assert_eq!(bound.inputs.get_number("fy"), Some(320.0));

        instance.override_input("fy", 355.0).unwrap();
        let overridden = resolve(&card(), &instance, &store()).unwrap();
        assert_eq!(overridden.inputs.get_number("fy"), Some(355.0));
        assert_eq!(
            overridden.snapshot.get("fy").unwrap().provenance,
            Provenance::Override {
                constant: GlobalConstantId(9)
            }
        );
    }

    #[test]
    fn deleted_global_constant_is_dangling() {
        let mut instance = instance();
        instance.bind("fy", GlobalConstantId(9));
        let mut store = store();
        store.job.remove(GlobalConstantId(9)).unwrap();
        assert_eq!(
            resolve(&card(), &instance, &store),
            Err(ResolutionError::DanglingBinding {
                variable: "fy".to_string(),
                reference: DanglingRef::GlobalConstant(GlobalConstantId(9)),
            })
        );
    }

    #[test]
    fn missing_default_constant_is_dangling() {
        let mut store = store();
        store.remove_app_constant(AppConstantId(3)).unwrap();
        assert!(matches!(
            resolve(&card(), &instance(), &store),
            Err(ResolutionError::DanglingBinding {
                reference: DanglingRef::AppConstant(AppConstantId(3)),
                ..
            })
        ));
    }

    #[test]
    fn unbound_input_without_default_is_missing() {
        let mut instance = instance();
        instance.bindings.shift_remove("width");
        assert_eq!(
            resolve(&card(), &instance, &store()),
            Err(ResolutionError::MissingRequiredInput {
                variable: "width".to_string()
            })
        );
    }

    #[test]
    fn fractional_integer_input_is_type_mismatch() {
        let mut instance = instance();
        instance.set_local("count", 2.5);
        let err = resolve(&card(), &instance, &store()).unwrap_err();
        assert_eq!(
            err,
            ResolutionError::TypeMismatch {
                variable: "count".to_string(),
                expected: ValueType::Integer,
                actual: "number".to_string(),
                value: "2.5".to_string(),
            }
        );
    }

    #[test]
    fn first_failing_variable_in_schema_order_is_reported() {
        let mut instance = CardInstance::new(CardInstanceId(2), CardId(1), RevisionId(1));
        instance.set_local("count", "many");
        assert_eq!(
            resolve(&card(), &instance, &store()),
            Err(ResolutionError::MissingRequiredInput {
                variable: "width".to_string()
            })
        );
    }

    fn legacy_instance(fy_flag: bool, fy_local: Option<f64>) -> CardInstance {
        let mut locals = IndexMap::from([
            ("width".to_string(), Value::Number(200.0)),
            ("count".to_string(), Value::Number(4.0)),
        ]);
        if let Some(fy) = fy_local {
            locals.insert("fy".to_string(), Value::Number(fy));
        }
        CardInstance::from_legacy_maps(
            CardInstanceId(3),
            CardId(1),
            RevisionId(1),
            locals,
            IndexMap::from([("fy".to_string(), GlobalConstantId(9))]),
            IndexMap::from([("fy".to_string(), fy_flag)]),
        )
    }

    #[test]
    fn legacy_unset_flag_uses_global_over_stale_local() {
        let resolution = resolve(&card(), &legacy_instance(false, Some(355.0)), &store()).unwrap();
        assert_eq!(resolution.inputs.get_number("fy"), Some(320.0));
        assert_eq!(
            resolution.snapshot.get("fy").unwrap().provenance,
            Provenance::Global {
                id: GlobalConstantId(9),
                name: "fy_site".to_string()
            }
        );
    }

    #[test]
    fn legacy_set_flag_uses_local_value() {
        let resolution = resolve(&card(), &legacy_instance(true, Some(355.0)), &store()).unwrap();
        assert_eq!(resolution.inputs.get_number("fy"), Some(355.0));
    }

    #[test]
    fn legacy_set_flag_without_local_falls_to_default() {
        let resolution = resolve(&card(), &legacy_instance(true, None), &store()).unwrap();
        assert_eq!(resolution.inputs.get_number("fy"), Some(300.0));
        assert!(matches!(
            resolution.snapshot.get("fy").unwrap().provenance,
            Provenance::Default { .. }
        ));

        let no_default = Card::new(CardId(1), "Plate", "fy = fy;")
            .with_inputs(vec![VariableSpec::new("fy", ValueType::Number)]);
        assert_eq!(
            resolve(&no_default, &legacy_instance(true, None), &store()),
            Err(ResolutionError::MissingRequiredInput {
                variable: "fy".to_string()
            })
        );
    }
}

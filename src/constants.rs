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

//! Application-wide reference constants and job-scoped constants.
//!
//! An [`AppConstant`] is library data (for example a standard's material
//! property). A [`GlobalConstant`] belongs to one job and may be derived from
//! an `AppConstant`, keeping the link for provenance while its value is free
//! to diverge. [`ConstantStore`] is the read-mostly view handed to the
//! resolver.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::value::Value;

id_type!(
    /// Identity of an [`AppConstant`].
    AppConstantId
);
id_type!(
    /// Identity of a [`GlobalConstant`].
    GlobalConstantId
);
id_type!(
    /// Identity of a job.
    JobId
);

/// Constant store failures.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConstantError {
    #[error("a constant named '{name}' already exists")]
    DuplicateName { name: String },

    #[error("constant id {id} is already in use")]
    DuplicateId { id: i64 },

    #[error("application constant {0} does not exist")]
    UnknownAppConstant(AppConstantId),

    #[error("global constant {0} does not exist")]
    UnknownGlobalConstant(GlobalConstantId),

    #[error("application constant {id} is still referenced by {count} job constant(s)")]
    StillReferenced { id: AppConstantId, count: usize },

    #[error("constant belongs to job {found}, expected job {expected}")]
    WrongJob { expected: JobId, found: JobId },
}

/// Application-wide default reference value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConstant {
    pub id: AppConstantId,
    pub name: String,
    pub default_value: Value,
    #[serde(default)]
    pub unit: Option<String>,
    /// Design standard the value comes from (`AS4100`, `AS3600`).
    #[serde(default)]
    pub standard: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl AppConstant {
    /// Creates a constant stamped with the current time.
    pub fn new(id: AppConstantId, name: impl Into<String>, default_value: impl Into<Value>) -> Self {
        let now = Utc::now();
        Self {
            id,
            name: name.into(),
            default_value: default_value.into(),
            unit: None,
            standard: None,
            category: None,
            description: None,
            created_at: now,
            modified_at: now,
        }
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    pub fn with_standard(mut self, standard: impl Into<String>) -> Self {
        self.standard = Some(standard.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Job-scoped named value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalConstant {
    pub id: GlobalConstantId,
    pub job_id: JobId,
    /// Library constant this one was derived from, if any.
    #[serde(default)]
    pub app_constant: Option<AppConstantId>,
    pub name: String,
    pub value: Value,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl GlobalConstant {
    /// Creates a custom job constant with no library link.
    pub fn new(
        id: GlobalConstantId,
        job_id: JobId,
        name: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            job_id,
            app_constant: None,
            name: name.into(),
            value: value.into(),
            unit: None,
            description: None,
            created_at: now,
            modified_at: now,
        }
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }
}

/// The application constant library.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AppConstantLibrary {
    constants: IndexMap<AppConstantId, AppConstant>,
}

impl AppConstantLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a constant; names and ids are unique within the library.
    pub fn insert(&mut self, constant: AppConstant) -> Result<AppConstantId, ConstantError> {
        if self.constants.contains_key(&constant.id) {
            return Err(ConstantError::DuplicateId { id: constant.id.0 });
        }
        if self.get_by_name(&constant.name).is_some() {
            return Err(ConstantError::DuplicateName {
                name: constant.name,
            });
        }
        let id = constant.id;
        self.constants.insert(id, constant);
        Ok(id)
    }

    pub fn get(&self, id: AppConstantId) -> Option<&AppConstant> {
        self.constants.get(&id)
    }

    pub fn get_by_name(&self, name: &str) -> Option<&AppConstant> {
        self.constants.values().find(|c| c.name == name)
    }

    /// Administrative edit of a default value.
    pub fn update_default(
        &mut self,
        id: AppConstantId,
        value: impl Into<Value>,
    ) -> Result<(), ConstantError> {
        let constant = self
            .constants
            .get_mut(&id)
            .ok_or(ConstantError::UnknownAppConstant(id))?;
        constant.default_value = value.into();
        constant.modified_at = Utc::now();
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &AppConstant> {
        self.constants.values()
    }

    pub fn len(&self) -> usize {
        self.constants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constants.is_empty()
    }

    /// Removes a constant unconditionally. [`ConstantStore::remove_app_constant`]
    /// checks job references first.
    pub fn remove(&mut self, id: AppConstantId) -> Result<AppConstant, ConstantError> {
        self.constants
            .shift_remove(&id)
            .ok_or(ConstantError::UnknownAppConstant(id))
    }
}

/// Constants of one job; names are unique per job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConstants {
    job_id: JobId,
    constants: IndexMap<GlobalConstantId, GlobalConstant>,
}

impl JobConstants {
    pub fn new(job_id: JobId) -> Self {
        Self {
            job_id,
            constants: IndexMap::new(),
        }
    }

    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    pub fn insert(&mut self, constant: GlobalConstant) -> Result<GlobalConstantId, ConstantError> {
        if constant.job_id != self.job_id {
            return Err(ConstantError::WrongJob {
                expected: self.job_id,
                found: constant.job_id,
            });
        }
        if self.constants.contains_key(&constant.id) {
            return Err(ConstantError::DuplicateId { id: constant.id.0 });
        }
        if self.get_by_name(&constant.name).is_some() {
            return Err(ConstantError::DuplicateName {
                name: constant.name,
            });
        }
        let id = constant.id;
        self.constants.insert(id, constant);
        Ok(id)
    }

    /// Creates a job constant from a library constant, copying its value,
    /// unit and description and recording the link.
    pub fn derive_from(
        &mut self,
        id: GlobalConstantId,
        app: &AppConstant,
    ) -> Result<GlobalConstantId, ConstantError> {
        let now = Utc::now();
        let constant = GlobalConstant {
            id,
            job_id: self.job_id,
            app_constant: Some(app.id),
            name: app.name.clone(),
            value: app.default_value.clone(),
            unit: app.unit.clone(),
            description: app.description.clone(),
            created_at: now,
            modified_at: now,
        };
        let id = self.insert(constant)?;
        debug!(job = %self.job_id, constant = %id, app_constant = %app.id, "derived job constant");
        Ok(id)
    }

    /// Changes a constant's value. The library link is kept even when the
    /// value no longer matches the library default.
    pub fn set_value(
        &mut self,
        id: GlobalConstantId,
        value: impl Into<Value>,
    ) -> Result<(), ConstantError> {
        let constant = self
            .constants
            .get_mut(&id)
            .ok_or(ConstantError::UnknownGlobalConstant(id))?;
        constant.value = value.into();
        constant.modified_at = Utc::now();
        Ok(())
    }

    pub fn get(&self, id: GlobalConstantId) -> Option<&GlobalConstant> {
        self.constants.get(&id)
    }

    pub fn get_by_name(&self, name: &str) -> Option<&GlobalConstant> {
        self.constants.values().find(|c| c.name == name)
    }

    pub fn remove(&mut self, id: GlobalConstantId) -> Result<GlobalConstant, ConstantError> {
        self.constants
            .shift_remove(&id)
            .ok_or(ConstantError::UnknownGlobalConstant(id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &GlobalConstant> {
        self.constants.values()
    }

    pub fn len(&self) -> usize {
        self.constants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constants.is_empty()
    }

    fn references(&self, app: AppConstantId) -> usize {
        self.constants
            .values()
            .filter(|c| c.app_constant == Some(app))
            .count()
    }
}

/// Library plus the constants of the job being calculated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstantStore {
    pub library: AppConstantLibrary,
    pub job: JobConstants,
}

impl ConstantStore {
    pub fn new(library: AppConstantLibrary, job: JobConstants) -> Self {
        Self { library, job }
    }

    /// Empty store for one job.
    pub fn for_job(job_id: JobId) -> Self {
        Self::new(AppConstantLibrary::new(), JobConstants::new(job_id))
    }

    /// Removes a library constant unless a job constant still derives from it.
    pub fn remove_app_constant(&mut self, id: AppConstantId) -> Result<AppConstant, ConstantError> {
        let count = self.job.references(id);
        if count > 0 {
            return Err(ConstantError::StillReferenced { id, count });
        }
        self.library.remove(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn steel_library() -> AppConstantLibrary {
        let mut library = AppConstantLibrary::new();
        library
            .insert(
                AppConstant::new(AppConstantId(1), "fy_Grade300", 300.0)
                    .with_unit("MPa")
                    .with_standard("AS4100")
                    .with_category("Steel"),
            )
            .unwrap();
        library
    }

    #[test]
    fn library_rejects_duplicate_names() {
        let mut library = steel_library();
        let err = library
            .insert(AppConstant::new(AppConstantId(2), "fy_Grade300", 320.0))
            .unwrap_err();
        assert_eq!(
            err,
            ConstantError::DuplicateName {
                name: "fy_Grade300".to_string()
            }
        );
    }

    #[test]
    fn derived_constant_keeps_provenance_when_value_diverges() {
        let library = steel_library();
        let app = library.get(AppConstantId(1)).unwrap();
        let mut job = JobConstants::new(JobId(7));
        let id = job.derive_from(GlobalConstantId(10), app).unwrap();
        job.set_value(id, 350.0).unwrap();

        let constant = job.get(id).unwrap();
        assert_eq!(constant.app_constant, Some(AppConstantId(1)));
        assert_eq!(constant.value, Value::Number(350.0));
        assert_eq!(constant.unit.as_deref(), Some("MPa"));
        assert_eq!(app.default_value, Value::Number(300.0));
    }

    #[test]
    fn job_names_are_unique_and_job_scoped() {
        let mut job = JobConstants::new(JobId(1));
        job.insert(GlobalConstant::new(GlobalConstantId(1), JobId(1), "gamma", 1.2))
            .unwrap();
        assert!(matches!(
            job.insert(GlobalConstant::new(GlobalConstantId(2), JobId(1), "gamma", 1.5)),
            Err(ConstantError::DuplicateName { .. })
        ));
        assert_eq!(
            job.insert(GlobalConstant::new(GlobalConstantId(3), JobId(2), "phi", 0.9)),
            Err(ConstantError::WrongJob {
                expected: JobId(1),
                found: JobId(2)
            })
        );
    }

    #[test]
    fn referenced_app_constant_cannot_be_removed() {
        let library = steel_library();
        let mut job = JobConstants::new(JobId(1));
        let app = library.get(AppConstantId(1)).unwrap().clone();
        let derived = job.derive_from(GlobalConstantId(5), &app).unwrap();
        let mut store = ConstantStore::new(library, job);

        assert_eq!(
            store.remove_app_constant(AppConstantId(1)),
            Err(ConstantError::StillReferenced {
                id: AppConstantId(1),
                count: 1
            })
        );
        store.job.remove(derived).unwrap();
        assert!(store.remove_app_constant(AppConstantId(1)).is_ok());
        assert!(store.library.is_empty());
    }

    #[test]
    fn update_default_bumps_modified_time() {
        let mut library = steel_library();
        let before = library.get(AppConstantId(1)).unwrap().modified_at;
        library.update_default(AppConstantId(1), 310.0).unwrap();
        let after = library.get(AppConstantId(1)).unwrap();
        assert_eq!(after.default_value, Value::Number(310.0));
        assert!(after.modified_at >= before);
    }
}

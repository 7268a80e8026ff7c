//! Scoped parameter values
//!
//! One table holds every candidate value a parameter can take, keyed by
//! `(plugin, parameter, scope)`. The store makes no precedence decision;
//! callers ask for individual scopes, or for all candidates, and the
//! [`crate::resolver`] applies the precedence policy.
//!
//! Writes (a user saving a credential) race freely against reads (a job
//! resolving parameters): every lookup is an independent, idempotent query.

use crate::models::{ParameterValue, ValueScope};
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use strix_common::{Error, Result};
use uuid::Uuid;

/// Persistent store of scoped parameter values
#[derive(Clone)]
pub struct ParameterStore {
    pool: SqlitePool,
}

impl ParameterStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create or replace the single value for one scope tuple
    ///
    /// At most one value exists per `(plugin, parameter, scope)`; a second
    /// upsert supersedes the first (latest wins, no versioning).
    pub async fn upsert(
        &self,
        scope: ValueScope,
        plugin: &str,
        parameter: &str,
        value: &serde_json::Value,
    ) -> Result<()> {
        let (scope_kind, scope_id) = scope.columns();
        sqlx::query(
            r#"
            INSERT INTO parameter_values (plugin, parameter, scope, scope_id, value, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(plugin, parameter, scope, scope_id) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(plugin)
        .bind(parameter)
        .bind(scope_kind)
        .bind(scope_id)
        .bind(serde_json::to_string(value)?)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Withdraw the value for one scope tuple, if present
    pub async fn delete(&self, scope: ValueScope, plugin: &str, parameter: &str) -> Result<()> {
        let (scope_kind, scope_id) = scope.columns();
        sqlx::query(
            "DELETE FROM parameter_values WHERE plugin = ? AND parameter = ? AND scope = ? AND scope_id = ?",
        )
        .bind(plugin)
        .bind(parameter)
        .bind(scope_kind)
        .bind(scope_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// All candidate values for a parameter, in no guaranteed order
    pub async fn candidates(&self, plugin: &str, parameter: &str) -> Result<Vec<ParameterValue>> {
        let rows = sqlx::query(
            "SELECT plugin, parameter, scope, scope_id, value, updated_at FROM parameter_values WHERE plugin = ? AND parameter = ?",
        )
        .bind(plugin)
        .bind(parameter)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(value_from_row).collect()
    }

    /// The value the given user stored for themselves, if any
    pub async fn user_value(
        &self,
        user: Uuid,
        plugin: &str,
        parameter: &str,
    ) -> Result<Option<serde_json::Value>> {
        self.scoped_value(ValueScope::User { user_id: user }, plugin, parameter)
            .await
    }

    /// The value shared by an organization, if any
    pub async fn org_value(
        &self,
        org: Uuid,
        plugin: &str,
        parameter: &str,
    ) -> Result<Option<serde_json::Value>> {
        self.scoped_value(ValueScope::Organization { org_id: org }, plugin, parameter)
            .await
    }

    /// The system default value, if any
    pub async fn default_value(
        &self,
        plugin: &str,
        parameter: &str,
    ) -> Result<Option<serde_json::Value>> {
        self.scoped_value(ValueScope::Default, plugin, parameter)
            .await
    }

    async fn scoped_value(
        &self,
        scope: ValueScope,
        plugin: &str,
        parameter: &str,
    ) -> Result<Option<serde_json::Value>> {
        let (scope_kind, scope_id) = scope.columns();
        let raw: Option<String> = sqlx::query_scalar(
            "SELECT value FROM parameter_values WHERE plugin = ? AND parameter = ? AND scope = ? AND scope_id = ?",
        )
        .bind(plugin)
        .bind(parameter)
        .bind(scope_kind)
        .bind(scope_id)
        .fetch_optional(&self.pool)
        .await?;

        raw.map(|v| serde_json::from_str(&v).map_err(Error::from))
            .transpose()
    }
}

fn value_from_row(row: sqlx::sqlite::SqliteRow) -> Result<ParameterValue> {
    let scope: String = row.get("scope");
    let scope_id: String = row.get("scope_id");
    let value: String = row.get("value");
    let updated_at: String = row.get("updated_at");

    Ok(ParameterValue {
        plugin: row.get("plugin"),
        parameter: row.get("parameter"),
        scope: ValueScope::from_columns(&scope, &scope_id)
            .ok_or_else(|| Error::Internal(format!("unknown value scope `{scope}`")))?,
        value: serde_json::from_str(&value)?,
        updated_at: DateTime::parse_from_rfc3339(&updated_at)
            .map_err(|e| Error::Internal(format!("bad updated_at: {e}")))?
            .with_timezone(&Utc),
    })
}

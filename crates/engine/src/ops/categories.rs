use std::collections::HashSet;

use chrono::Utc;
use sea_orm::{
    ActiveValue, DatabaseTransaction, QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
    prelude::*,
};

use crate::{
    Category, CategoryScope, EngineError, EntryKind, ResultEngine, categories,
    util::{normalize_category_display, normalize_category_key, require_actor},
};

use super::{Engine, with_tx, with_write_tx};

/// Display name of the category provisioned for cash withdrawals.
const WITHDRAWAL_NAME: &str = "Withdrawal";
/// Keywords matched against `name_norm` when no category is explicitly
/// scoped for withdrawals.
const WITHDRAWAL_KEYWORDS: &[&str] = &["withdrawal", "retiro"];

impl Engine {
    /// Creates a category usable by entries whose kind `scope` allows.
    ///
    /// Names are compared through their normalized key, so `"Café"` and
    /// `"cafe "` are the same category.
    pub async fn create_category(
        &self,
        name: &str,
        scope: CategoryScope,
        actor_id: &str,
    ) -> ResultEngine<Category> {
        let actor_id = require_actor(actor_id)?;
        let display = normalize_category_display(name)?;
        let normalized = normalize_category_key(&display)?;

        with_write_tx!(self, |db_tx| {
            let existing = categories::Entity::find()
                .filter(categories::Column::NameNorm.eq(normalized.clone()))
                .one(&db_tx)
                .await?;
            if existing.is_some() {
                return Err(EngineError::ExistingKey(display.clone()));
            }

            let model = categories::ActiveModel {
                id: ActiveValue::NotSet,
                name: ActiveValue::Set(display.clone()),
                name_norm: ActiveValue::Set(normalized.clone()),
                scope: ActiveValue::Set(scope.as_str().to_string()),
                active: ActiveValue::Set(true),
                created_by: ActiveValue::Set(Some(actor_id.to_string())),
                created_at: ActiveValue::Set(Utc::now()),
            }
            .insert(&db_tx)
            .await?;

            tracing::info!(category_id = model.id, name = %model.name, %scope, "category created");
            Category::try_from(model)
        })
    }

    /// Lists categories ordered by name.
    pub async fn list_categories(&self, only_active: bool) -> ResultEngine<Vec<Category>> {
        with_tx!(self, |db_tx| {
            let mut query = categories::Entity::find().order_by_asc(categories::Column::NameNorm);
            if only_active {
                query = query.filter(categories::Column::Active.eq(true));
            }
            query
                .all(&db_tx)
                .await?
                .into_iter()
                .map(Category::try_from)
                .collect()
        })
    }

    /// Active categories an entry of `kind` may reference.
    pub async fn categories_for(&self, kind: EntryKind) -> ResultEngine<Vec<Category>> {
        let scopes: Vec<&str> = CategoryScope::accepting(kind)
            .iter()
            .map(|scope| scope.as_str())
            .collect();
        with_tx!(self, |db_tx| {
            categories::Entity::find()
                .filter(categories::Column::Active.eq(true))
                .filter(categories::Column::Scope.is_in(scopes.clone()))
                .order_by_asc(categories::Column::NameNorm)
                .all(&db_tx)
                .await?
                .into_iter()
                .map(Category::try_from)
                .collect()
        })
    }

    /// Enables or retires a category. Retired categories keep their entries
    /// but cannot be used for new ones.
    pub async fn set_category_active(&self, category_id: i64, active: bool) -> ResultEngine<Category> {
        with_write_tx!(self, |db_tx| {
            let model = categories::Entity::find_by_id(category_id)
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("category not exists".to_string()))?;

            let mut active_model: categories::ActiveModel = model.into();
            active_model.active = ActiveValue::Set(active);
            let model = active_model.update(&db_tx).await?;
            Category::try_from(model)
        })
    }

    /// Loads a category and checks it can hold an entry of `kind`.
    pub(super) async fn require_category_for(
        &self,
        db_tx: &DatabaseTransaction,
        category_id: i64,
        kind: EntryKind,
    ) -> ResultEngine<Category> {
        let model = categories::Entity::find_by_id(category_id)
            .one(db_tx)
            .await?
            .ok_or_else(|| {
                EngineError::KeyNotFound(format!("category {category_id} not exists"))
            })?;
        let category = Category::try_from(model)?;
        if !category.active {
            return Err(EngineError::CategoryMismatch(format!(
                "category '{}' is not active",
                category.name
            )));
        }
        if !category.scope.allows(kind) {
            return Err(EngineError::CategoryMismatch(format!(
                "category '{}' ({}) does not accept {kind} entries",
                category.name, category.scope
            )));
        }
        Ok(category)
    }

    /// Finds the withdrawal category, provisioning it when missing.
    ///
    /// Lookup order: an active category scoped `withdrawal`, then any active
    /// category whose normalized name contains a withdrawal keyword, then a
    /// new category scoped `withdrawal` under the first free name. Retired
    /// categories are left retired.
    pub(super) async fn resolve_withdrawal_category(
        &self,
        db_tx: &DatabaseTransaction,
        actor_id: &str,
    ) -> ResultEngine<i64> {
        let scope = CategoryScope::Withdrawal;

        if let Some(model) = categories::Entity::find()
            .filter(categories::Column::Scope.eq(scope.as_str()))
            .filter(categories::Column::Active.eq(true))
            .order_by_asc(categories::Column::Id)
            .one(db_tx)
            .await?
        {
            tracing::debug!(category_id = model.id, "withdrawal category found by scope");
            return Ok(model.id);
        }

        for keyword in WITHDRAWAL_KEYWORDS {
            if let Some(model) = categories::Entity::find()
                .filter(categories::Column::NameNorm.contains(*keyword))
                .filter(categories::Column::Active.eq(true))
                .order_by_asc(categories::Column::Id)
                .one(db_tx)
                .await?
            {
                tracing::debug!(category_id = model.id, keyword, "withdrawal category found by name");
                return Ok(model.id);
            }
        }

        let (name, name_norm) = self.free_withdrawal_name(db_tx).await?;
        let model = categories::ActiveModel {
            id: ActiveValue::NotSet,
            name: ActiveValue::Set(name),
            name_norm: ActiveValue::Set(name_norm),
            scope: ActiveValue::Set(scope.as_str().to_string()),
            active: ActiveValue::Set(true),
            created_by: ActiveValue::Set(Some(actor_id.to_string())),
            created_at: ActiveValue::Set(Utc::now()),
        }
        .insert(db_tx)
        .await?;

        tracing::info!(category_id = model.id, "provisioned withdrawal category");
        Ok(model.id)
    }

    /// First of "Withdrawal", "Withdrawal (cash box)", "Withdrawal (cash box
    /// 2)", ... whose normalized key no category holds, retired ones included.
    async fn free_withdrawal_name(
        &self,
        db_tx: &DatabaseTransaction,
    ) -> ResultEngine<(String, String)> {
        let prefix = normalize_category_key(WITHDRAWAL_NAME)?;
        let taken: HashSet<String> = categories::Entity::find()
            .select_only()
            .column(categories::Column::NameNorm)
            .filter(categories::Column::NameNorm.starts_with(prefix))
            .into_tuple::<String>()
            .all(db_tx)
            .await?
            .into_iter()
            .collect();

        let mut attempt = 0_usize;
        loop {
            let name = match attempt {
                0 => WITHDRAWAL_NAME.to_string(),
                1 => format!("{WITHDRAWAL_NAME} (cash box)"),
                n => format!("{WITHDRAWAL_NAME} (cash box {n})"),
            };
            let name_norm = normalize_category_key(&name)?;
            if !taken.contains(&name_norm) {
                return Ok((name, name_norm));
            }
            attempt += 1;
        }
    }
}

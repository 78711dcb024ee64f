//! Product categories.

use fanforge_common::{AppError, AppResult, IdGenerator};
use fanforge_db::entities::category;
use fanforge_db::mutation::CategoryChanges;
use fanforge_db::{Mutation, MutationSet, Store};
use serde::Deserialize;
use tracing::info;
use validator::Validate;

use crate::actor::Actor;
use crate::cascade::now;

/// Input for creating a category.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateCategoryInput {
    #[validate(length(min = 2, max = 64))]
    pub name: String,

    #[validate(length(max = 1024))]
    pub description: Option<String>,
}

/// Input for updating a category. Absent fields are left alone.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateCategoryInput {
    #[validate(length(min = 2, max = 64))]
    pub name: Option<String>,

    #[validate(length(max = 1024))]
    pub description: Option<String>,
}

impl From<UpdateCategoryInput> for CategoryChanges {
    fn from(input: UpdateCategoryInput) -> Self {
        Self {
            name: input.name.map(|n| n.trim().to_string()),
            description: input.description,
        }
    }
}

/// A category with the number of products filed under it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryCount {
    pub category: category::Model,
    pub product_count: u64,
}

#[derive(Clone)]
pub struct CategoryService {
    store: Store,
    id_gen: IdGenerator,
}

impl CategoryService {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self {
            store,
            id_gen: IdGenerator::new(),
        }
    }

    pub async fn list(&self) -> AppResult<Vec<category::Model>> {
        self.store.list_categories().await
    }

    /// Categories by name with their listed product counts.
    pub async fn list_with_counts(&self) -> AppResult<Vec<CategoryCount>> {
        self.counted(true).await
    }

    /// Admins only. Counts every product, deleted and unapproved ones too.
    pub async fn list_for_admin(&self, actor: &Actor) -> AppResult<Vec<CategoryCount>> {
        actor.require_admin()?;
        self.counted(false).await
    }

    async fn counted(&self, listed_only: bool) -> AppResult<Vec<CategoryCount>> {
        let counts = self.store.count_products_by_category(listed_only).await?;
        Ok(self
            .store
            .list_categories()
            .await?
            .into_iter()
            .map(|category| CategoryCount {
                product_count: counts.get(&category.id).copied().unwrap_or(0),
                category,
            })
            .collect())
    }

    pub async fn get(&self, id: &str) -> AppResult<category::Model> {
        self.store
            .find_category(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Category not found".to_string()))
    }

    /// Admins only. Names are unique.
    pub async fn create(
        &self,
        actor: &Actor,
        input: CreateCategoryInput,
    ) -> AppResult<category::Model> {
        actor.require_admin()?;
        input.validate()?;

        let at = now();
        let category = category::Model {
            id: self.id_gen.generate(),
            name: input.name.trim().to_string(),
            description: input.description,
            created_at: at,
        };

        let set = MutationSet::new("create_category", at)
            .with(Mutation::InsertCategory(category.clone()));
        let mut tx = self.store.begin().await?;
        tx.apply(&set).await?;
        tx.commit().await?;

        info!(category_id = %category.id, admin_id = %actor.user_id, "Category created");
        Ok(category)
    }

    /// Admins only. A new name must not belong to another category.
    pub async fn update(
        &self,
        actor: &Actor,
        category_id: &str,
        input: UpdateCategoryInput,
    ) -> AppResult<category::Model> {
        actor.require_admin()?;
        input.validate()?;

        let changes = CategoryChanges::from(input);
        if changes.is_empty() {
            return Err(AppError::BadRequest("No fields to update".to_string()));
        }

        // The guarded update reports a missing category.
        let mut tx = self.store.begin().await?;
        let set = MutationSet::new("update_category", now()).with(Mutation::UpdateCategory {
            category_id: category_id.to_string(),
            changes,
        });
        tx.apply(&set).await?;
        let updated = tx
            .category(category_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Category not found".to_string()))?;
        tx.commit().await?;

        info!(category_id = %category_id, admin_id = %actor.user_id, "Category updated");
        Ok(updated)
    }
}

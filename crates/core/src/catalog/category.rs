//! Navigation categories for catalog items.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::store::{Database, Record};
use crate::text::{normalize_slug, trim_to_none};
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CategoryKind {
    Cruise,
    Ship,
    Hotel,
    Package,
}

impl CategoryKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cruise => "CRUISE",
            Self::Ship => "SHIP",
            Self::Hotel => "HOTEL",
            Self::Package => "PACKAGE",
        }
    }
}

impl std::str::FromStr for CategoryKind {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "cruise" | "cruises" => Ok(Self::Cruise),
            "ship" | "ships" => Ok(Self::Ship),
            "hotel" | "hotels" => Ok(Self::Hotel),
            "package" | "packages" => Ok(Self::Package),
            _ => Err(Error::invalid(format!("Unknown category kind '{}'", value))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: Uuid,
    /// `None` for categories shared by every tenant.
    pub tenant_id: Option<Uuid>,
    pub kind: CategoryKind,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Category {
    /// Shared categories are visible everywhere; unscoped callers see all.
    pub fn visible_in(&self, scope: Option<Uuid>) -> bool {
        match (self.tenant_id, scope) {
            (None, _) | (_, None) => true,
            (Some(owner), Some(scope)) => owner == scope,
        }
    }
}

impl Record for Category {
    const KIND: &'static str = "Category";

    fn id(&self) -> Uuid {
        self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCategory {
    pub kind: CategoryKind,
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub sort_order: Option<i32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub sort_order: Option<i32>,
}

fn ensure_unique_slug(
    category: &Category,
    existing: &std::collections::HashMap<Uuid, Category>,
) -> Result<()> {
    let taken = existing.values().any(|other| {
        other.id != category.id
            && other.kind == category.kind
            && other.tenant_id == category.tenant_id
            && other.slug == category.slug
    });
    if taken {
        return Err(Error::Duplicate(format!(
            "Category with slug '{}' already exists",
            category.slug
        )));
    }
    Ok(())
}

impl Database {
    /// Categories visible in `scope`, ordered for navigation.
    pub async fn list_categories(
        &self,
        scope: Option<Uuid>,
        kind: Option<CategoryKind>,
    ) -> Vec<Category> {
        let mut categories = self
            .categories
            .filter(|c| c.visible_in(scope) && kind.is_none_or(|k| c.kind == k))
            .await;
        categories.sort_by(|a, b| {
            a.sort_order
                .cmp(&b.sort_order)
                .then_with(|| a.name.cmp(&b.name))
        });
        categories
    }

    /// Look up by slug, preferring the tenant's own category over a shared one.
    pub async fn get_category_by_slug(
        &self,
        kind: CategoryKind,
        slug: &str,
        scope: Option<Uuid>,
    ) -> Result<Category> {
        let slug = slug.trim().to_lowercase();
        let mut matches = self
            .categories
            .filter(|c| c.kind == kind && c.slug == slug && c.visible_in(scope))
            .await;
        matches.sort_by_key(|c| c.tenant_id.is_none());
        matches
            .into_iter()
            .next()
            .ok_or_else(|| Error::not_found(Category::KIND, slug))
    }

    pub async fn create_category(
        &self,
        tenant_id: Option<Uuid>,
        new: NewCategory,
    ) -> Result<Category> {
        if let Some(tenant_id) = tenant_id {
            self.tenants.require(tenant_id).await?;
        }
        let name = new.name.trim().to_string();
        if name.is_empty() {
            return Err(Error::invalid("Category name cannot be empty"));
        }
        let now = Utc::now();
        let category = Category {
            id: Uuid::new_v4(),
            tenant_id,
            kind: new.kind,
            slug: normalize_slug(trim_to_none(new.slug).as_deref().unwrap_or(&name))?,
            name,
            description: trim_to_none(new.description),
            icon: trim_to_none(new.icon),
            sort_order: new.sort_order.unwrap_or(0),
            created_at: now,
            updated_at: now,
        };
        let category = self
            .categories
            .insert_checked(category, ensure_unique_slug)
            .await?;
        info!("Created {:?} category {}", category.kind, category.slug);
        Ok(category)
    }

    /// Update a category. With `scope` set, only that tenant's own
    /// categories may be changed.
    pub async fn update_category(
        &self,
        id: Uuid,
        patch: CategoryPatch,
        scope: Option<Uuid>,
    ) -> Result<Category> {
        let slug = patch.slug.as_deref().map(normalize_slug).transpose()?;
        self.categories
            .update(id, |category, existing| {
                if scope.is_some() && category.tenant_id != scope {
                    return Err(Error::not_found(Category::KIND, id));
                }
                if let Some(name) = patch.name {
                    let name = name.trim();
                    if name.is_empty() {
                        return Err(Error::invalid("Category name cannot be empty"));
                    }
                    category.name = name.to_string();
                }
                if let Some(slug) = slug {
                    category.slug = slug;
                }
                if patch.description.is_some() {
                    category.description = trim_to_none(patch.description);
                }
                if patch.icon.is_some() {
                    category.icon = trim_to_none(patch.icon);
                }
                if let Some(sort_order) = patch.sort_order {
                    category.sort_order = sort_order;
                }
                ensure_unique_slug(category, existing)
            })
            .await
    }

    /// Delete a category that no cruise, hotel or package still references.
    pub async fn delete_category(&self, id: Uuid, scope: Option<Uuid>) -> Result<()> {
        let category = self.categories.require(id).await?;
        if scope.is_some() && category.tenant_id != scope {
            return Err(Error::not_found(Category::KIND, id));
        }
        let (cruises, hotels, packages) = tokio::join!(
            self.cruises.count(|c| c.category_id == Some(id)),
            self.hotels.count(|h| h.category_id == Some(id)),
            self.packages.count(|p| p.category_id == Some(id)),
        );
        let referenced = cruises + hotels + packages;
        if referenced > 0 {
            return Err(Error::HasDependents(format!(
                "Cannot delete category '{}' used by {} item(s)",
                category.slug, referenced
            )));
        }
        self.categories.remove(id).await?;
        Ok(())
    }
}

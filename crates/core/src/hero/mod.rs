//! Per-page hero banners.
//!
//! A tenant can override any page's banner; tenant-less entries act as the
//! shared default for tenants that have not.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::store::{Database, Record};
use crate::text::{normalize_slug, trim_to_none};
use crate::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeroContent {
    pub id: Uuid,
    pub tenant_id: Option<Uuid>,
    pub page: String,
    pub title: String,
    pub subtitle: Option<String>,
    pub description: Option<String>,
    pub background_image: Option<String>,
    pub cta_text: Option<String>,
    pub cta_link: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record for HeroContent {
    const KIND: &'static str = "HeroContent";

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

/// Body of `PUT /api/hero/:page`; replaces the whole banner.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeroInput {
    pub title: String,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub background_image: Option<String>,
    #[serde(default)]
    pub cta_text: Option<String>,
    #[serde(default)]
    pub cta_link: Option<String>,
}

fn same_slot(a: &HeroContent, b: &HeroContent) -> bool {
    a.id != b.id && a.tenant_id == b.tenant_id && a.page == b.page
}

impl Database {
    /// Banners visible in `scope`: the tenant's own plus shared pages it
    /// does not override.
    pub async fn list_hero(&self, scope: Option<Uuid>) -> Vec<HeroContent> {
        let entries = self.hero_sections.list().await;
        let Some(tenant_id) = scope else {
            let mut entries = entries;
            entries.sort_by(|a, b| a.page.cmp(&b.page));
            return entries;
        };

        let mut by_page: HashMap<String, HeroContent> = HashMap::new();
        for entry in entries {
            match entry.tenant_id {
                Some(owner) if owner == tenant_id => {
                    by_page.insert(entry.page.clone(), entry);
                }
                None => {
                    by_page.entry(entry.page.clone()).or_insert(entry);
                }
                Some(_) => {}
            }
        }
        let mut entries: Vec<_> = by_page.into_values().collect();
        entries.sort_by(|a, b| a.page.cmp(&b.page));
        entries
    }

    pub async fn get_hero(&self, page: &str, scope: Option<Uuid>) -> Result<HeroContent> {
        let page = normalize_slug(page)?;
        if let Some(tenant_id) = scope {
            if let Some(own) = self
                .hero_sections
                .find(|h| h.tenant_id == Some(tenant_id) && h.page == page)
                .await
            {
                return Ok(own);
            }
        }
        self.hero_sections
            .find(|h| h.tenant_id.is_none() && h.page == page)
            .await
            .ok_or_else(|| Error::not_found(HeroContent::KIND, page))
    }

    /// Create or replace the banner for `(tenant_id, page)`.
    pub async fn upsert_hero(
        &self,
        tenant_id: Option<Uuid>,
        page: &str,
        input: HeroInput,
    ) -> Result<HeroContent> {
        let page = normalize_slug(page)?;
        let title = input.title.trim().to_string();
        if title.is_empty() {
            return Err(Error::invalid("Hero title cannot be empty"));
        }

        let existing = self
            .hero_sections
            .find(|h| h.tenant_id == tenant_id && h.page == page)
            .await;
        let hero = match existing {
            Some(current) => {
                self.hero_sections
                    .update(current.id, |hero, _| {
                        hero.title = title;
                        hero.subtitle = trim_to_none(input.subtitle);
                        hero.description = trim_to_none(input.description);
                        hero.background_image = trim_to_none(input.background_image);
                        hero.cta_text = trim_to_none(input.cta_text);
                        hero.cta_link = trim_to_none(input.cta_link);
                        Ok(())
                    })
                    .await?
            }
            None => {
                let now = Utc::now();
                let hero = HeroContent {
                    id: Uuid::new_v4(),
                    tenant_id,
                    page,
                    title,
                    subtitle: trim_to_none(input.subtitle),
                    description: trim_to_none(input.description),
                    background_image: trim_to_none(input.background_image),
                    cta_text: trim_to_none(input.cta_text),
                    cta_link: trim_to_none(input.cta_link),
                    created_at: now,
                    updated_at: now,
                };
                self.hero_sections
                    .insert_checked(hero, |hero, all| {
                        if all.values().any(|other| same_slot(hero, other)) {
                            return Err(Error::Duplicate(format!(
                                "Hero content for page '{}' already exists",
                                hero.page
                            )));
                        }
                        Ok(())
                    })
                    .await?
            }
        };
        info!("Saved hero content for page '{}'", hero.page);
        Ok(hero)
    }

    /// Delete the banner owned by `tenant_id` (the shared one when `None`).
    pub async fn delete_hero(&self, tenant_id: Option<Uuid>, page: &str) -> Result<()> {
        let page = normalize_slug(page)?;
        let removed = self
            .hero_sections
            .remove_where(|h| h.tenant_id == tenant_id && h.page == page)
            .await?;
        if removed == 0 {
            return Err(Error::not_found(HeroContent::KIND, page));
        }
        Ok(())
    }
}

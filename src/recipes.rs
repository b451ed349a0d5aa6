//! Typed recipe operations over the authenticated gateway.

use reqwest::Method;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::info;

use crate::error::{ClientError, ClientResult};
use crate::gateway::AuthenticatedGateway;
use crate::identity::{SessionStore, ROLE_ADMIN};

pub const RECIPES_PATH: &str = "/api/recipes";
pub const MY_RECIPES_PATH: &str = "/api/recipes/my-recipes";
pub const CATEGORIES_PATH: &str = "/api/recipes/categories";
pub const SEARCH_PATH: &str = "/api/recipes/search/advanced";

/// How many recipes the dashboard lists as recent.
pub const RECENT_LIMIT: usize = 5;

fn null_as_default<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub ingredients: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub instructions: String,
    /// Minutes.
    #[serde(default)]
    pub cooking_time: Option<u32>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub category: String,
    #[serde(default)]
    pub created_by: Option<String>,
}

/// Body of a create or update call.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RecipeDraft {
    pub title: String,
    pub ingredients: Vec<String>,
    pub instructions: String,
    pub cooking_time: u32,
    pub category: String,
}

impl RecipeDraft {
    /// One ingredient per line; surrounding whitespace and blank lines dropped.
    pub fn parse_ingredients(text: &str) -> Vec<String> {
        text.lines().map(str::trim).filter(|l| !l.is_empty()).map(str::to_string).collect()
    }

    pub fn validate(&self) -> ClientResult<()> {
        if self.title.trim().is_empty() {
            return Err(ClientError::validation("Title is required"));
        }
        if self.category.trim().is_empty() {
            return Err(ClientError::validation("Category is required"));
        }
        if !self.ingredients.iter().any(|i| !i.trim().is_empty()) {
            return Err(ClientError::validation("At least one ingredient is required"));
        }
        if self.instructions.trim().is_empty() {
            return Err(ClientError::validation("Instructions are required"));
        }
        if self.cooking_time < 1 {
            return Err(ClientError::validation("Cooking time must be at least 1 minute"));
        }
        Ok(())
    }
}

impl From<&Recipe> for RecipeDraft {
    fn from(r: &Recipe) -> Self {
        Self {
            title: r.title.clone(),
            ingredients: r.ingredients.clone(),
            instructions: r.instructions.clone(),
            cooking_time: r.cooking_time.unwrap_or_default(),
            category: r.category.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchCriteria {
    pub title: Option<String>,
    pub category: Option<String>,
    pub max_cooking_time: Option<u32>,
    pub ingredient: Option<String>,
}

impl SearchCriteria {
    pub fn is_empty(&self) -> bool {
        self.query_string().is_empty()
    }

    /// Only criteria that are set (and not blank) are emitted, in a fixed order.
    pub fn query_string(&self) -> String {
        let mut params: Vec<(&str, String)> = Vec::new();
        let text = |v: &Option<String>| v.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(str::to_string);
        if let Some(t) = text(&self.title) { params.push(("title", t)); }
        if let Some(c) = text(&self.category) { params.push(("category", c)); }
        if let Some(m) = self.max_cooking_time.filter(|m| *m > 0) { params.push(("maxCookingTime", m.to_string())); }
        if let Some(i) = text(&self.ingredient) { params.push(("ingredient", i)); }
        params
            .iter()
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }

    pub fn path(&self) -> String {
        let qs = self.query_string();
        if qs.is_empty() { SEARCH_PATH.to_string() } else { format!("{}?{}", SEARCH_PATH, qs) }
    }
}

fn recipe_path(id: &str) -> String {
    format!("{}/{}", RECIPES_PATH, urlencoding::encode(id))
}

/// Result of the dashboard's three concurrent fetches; each part fails on its own.
#[derive(Debug)]
pub struct Dashboard {
    pub all: ClientResult<Vec<Recipe>>,
    pub mine: ClientResult<Vec<Recipe>>,
    pub categories: ClientResult<Vec<String>>,
}

impl Dashboard {
    pub fn total(&self) -> Option<usize> { self.all.as_ref().ok().map(Vec::len) }
    pub fn mine_count(&self) -> Option<usize> { self.mine.as_ref().ok().map(Vec::len) }
    pub fn category_count(&self) -> Option<usize> { self.categories.as_ref().ok().map(Vec::len) }

    pub fn recent(&self) -> Vec<Recipe> {
        self.all.as_ref().map(|all| recent_recipes(all, RECENT_LIMIT)).unwrap_or_default()
    }

    /// Whether any part was rejected with 401; the session is already gone then.
    pub fn expired(&self) -> bool {
        [self.all.as_ref().err(), self.mine.as_ref().err(), self.categories.as_ref().err()]
            .into_iter()
            .flatten()
            .any(|e| *e == ClientError::SessionExpired)
    }

    /// First failure, for callers that show a single notification.
    pub fn first_error(&self) -> Option<&ClientError> {
        self.all.as_ref().err()
            .or_else(|| self.mine.as_ref().err())
            .or_else(|| self.categories.as_ref().err())
    }
}

#[derive(Debug)]
pub struct AdminOverview {
    pub total_recipes: ClientResult<usize>,
    pub categories: ClientResult<usize>,
}

impl AdminOverview {
    pub fn expired(&self) -> bool {
        [self.total_recipes.as_ref().err(), self.categories.as_ref().err()]
            .into_iter()
            .flatten()
            .any(|e| *e == ClientError::SessionExpired)
    }
}

/// Newest first by id, capped at `limit`.
pub fn recent_recipes(all: &[Recipe], limit: usize) -> Vec<Recipe> {
    let mut sorted: Vec<Recipe> = all.to_vec();
    sorted.sort_by(|a, b| b.id.cmp(&a.id));
    sorted.truncate(limit);
    sorted
}

/// Whether to offer edit/delete for `recipe`. Advisory only; the service decides.
pub fn can_modify(session: &SessionStore, recipe: &Recipe) -> bool {
    if session.has_role(ROLE_ADMIN) {
        return true;
    }
    match (session.username(), recipe.created_by.as_deref()) {
        (Some(me), Some(owner)) => me == owner,
        _ => false,
    }
}

#[derive(Clone)]
pub struct RecipeApi {
    gateway: AuthenticatedGateway,
}

impl RecipeApi {
    pub fn new(gateway: AuthenticatedGateway) -> Self { Self { gateway } }

    pub fn gateway(&self) -> &AuthenticatedGateway { &self.gateway }

    pub async fn list_all(&self) -> ClientResult<Vec<Recipe>> {
        self.gateway.get_json(RECIPES_PATH).await
    }

    pub async fn list_mine(&self) -> ClientResult<Vec<Recipe>> {
        self.gateway.get_json(MY_RECIPES_PATH).await
    }

    pub async fn categories(&self) -> ClientResult<Vec<String>> {
        self.gateway.get_json(CATEGORIES_PATH).await
    }

    pub async fn get(&self, id: &str) -> ClientResult<Recipe> {
        self.gateway.get_json(&recipe_path(id)).await
    }

    pub async fn create(&self, draft: &RecipeDraft) -> ClientResult<Recipe> {
        draft.validate()?;
        let created: Recipe = self.gateway.send_json(RECIPES_PATH, Method::POST, draft).await?;
        info!(target: "recipebox::recipes", id = %created.id, title = %created.title, "recipe created");
        Ok(created)
    }

    pub async fn update(&self, id: &str, draft: &RecipeDraft) -> ClientResult<Recipe> {
        draft.validate()?;
        let updated: Recipe = self.gateway.send_json(&recipe_path(id), Method::PUT, draft).await?;
        info!(target: "recipebox::recipes", id = %id, "recipe updated");
        Ok(updated)
    }

    pub async fn delete(&self, id: &str) -> ClientResult<()> {
        self.gateway.request(&recipe_path(id), Method::DELETE, None).await?;
        info!(target: "recipebox::recipes", id = %id, "recipe deleted");
        Ok(())
    }

    /// Refused locally when no criterion is set.
    pub async fn search(&self, criteria: &SearchCriteria) -> ClientResult<Vec<Recipe>> {
        if criteria.is_empty() {
            return Err(ClientError::validation("Please enter at least one search criterion"));
        }
        self.gateway.get_json(&criteria.path()).await
    }

    pub async fn dashboard(&self) -> Dashboard {
        let (all, mine, categories) = tokio::join!(self.list_all(), self.list_mine(), self.categories());
        Dashboard { all, mine, categories }
    }

    /// Admin counters; refused locally without the administrator role.
    pub async fn admin_overview(&self) -> ClientResult<AdminOverview> {
        if !self.gateway.session().has_role(ROLE_ADMIN) {
            return Err(ClientError::forbidden("You do not have permission to access the admin area"));
        }
        let (all, categories) = tokio::join!(self.list_all(), self.categories());
        Ok(AdminOverview {
            total_recipes: all.map(|v| v.len()),
            categories: categories.map(|v| v.len()),
        })
    }
}

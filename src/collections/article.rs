use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, ModelTrait, QueryOrder, Set};
use serde::{Deserialize, Serialize};

use super::{required_text, retain_matching, REQUIRED};
use crate::entities::{self, article};
use crate::errors::{BlogError, FieldErrors};
use crate::permissions::{self, Action, Actor};
use crate::projection::Project;

const TITLE_MAX_CHARS: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Article {
    pub id: i32,
    pub title: String,
    pub body: String,
    pub author: i32,
    pub category: i32,
    pub created_at: i64,
    pub updated_at: i64,
}

impl From<article::Model> for Article {
    fn from(model: article::Model) -> Self {
        Self {
            id: model.id,
            title: model.title,
            body: model.body,
            author: model.author_id,
            category: model.category_id,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ArticleSummary {
    pub id: i32,
    pub title: String,
    pub author: i32,
}

#[derive(Debug, Serialize)]
pub struct ArticleDetail {
    pub id: i32,
    pub title: String,
    pub body: String,
    pub author: i32,
    pub category: i32,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Project for Article {
    type Reduced = ArticleSummary;
    type Full = ArticleDetail;

    fn reduced(&self) -> ArticleSummary {
        ArticleSummary {
            id: self.id,
            title: self.title.clone(),
            author: self.author,
        }
    }

    fn full(&self) -> ArticleDetail {
        ArticleDetail {
            id: self.id,
            title: self.title.clone(),
            body: self.body.clone(),
            author: self.author,
            category: self.category,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Writable article fields. Any `author` sent by a client is dropped here:
/// authorship always comes from the acting identity.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArticlePayload {
    pub title: Option<String>,
    pub body: Option<String>,
    pub category: Option<i32>,
}

/// Fields that passed validation; `None` means "leave unchanged".
struct CleanArticle {
    title: Option<String>,
    body: Option<String>,
    category: Option<i32>,
}

pub struct Articles<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> Articles<'a> {
    /// Query parameter carrying the title filter.
    pub const FILTER_PARAM: &'static str = "title";

    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn list(&self, filter: Option<&str>) -> Result<Vec<Article>, BlogError> {
        let mut rows = entities::Article::find()
            .order_by_asc(article::Column::Id)
            .all(self.db)
            .await?;
        retain_matching(&mut rows, filter, |model| model.title.as_str());

        Ok(rows.into_iter().map(Article::from).collect())
    }

    pub async fn retrieve(&self, id: i32) -> Result<Article, BlogError> {
        entities::Article::find_by_id(id)
            .one(self.db)
            .await?
            .map(Article::from)
            .ok_or(BlogError::NotFound)
    }

    pub async fn create(
        &self,
        payload: ArticlePayload,
        actor: &Actor,
    ) -> Result<Article, BlogError> {
        permissions::check_article(actor, Action::Create)?;
        let author = actor.require_identity()?;

        let clean = self.validate(payload, false).await?;
        let (Some(title), Some(body), Some(category)) = (clean.title, clean.body, clean.category)
        else {
            return Err(BlogError::Other("validated article is incomplete".into()));
        };

        let now = Utc::now().timestamp();
        let model = article::ActiveModel {
            title: Set(title),
            body: Set(body),
            author_id: Set(author.id),
            category_id: Set(category),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(self.db)
        .await?;

        tracing::info!(
            article_id = model.id,
            author = %author.username,
            "article created"
        );
        Ok(model.into())
    }

    pub async fn update(
        &self,
        id: i32,
        payload: ArticlePayload,
        actor: &Actor,
    ) -> Result<Article, BlogError> {
        self.apply_update(id, payload, actor, Action::Update).await
    }

    pub async fn partial_update(
        &self,
        id: i32,
        payload: ArticlePayload,
        actor: &Actor,
    ) -> Result<Article, BlogError> {
        self.apply_update(id, payload, actor, Action::PartialUpdate).await
    }

    pub async fn delete(&self, id: i32, actor: &Actor) -> Result<(), BlogError> {
        permissions::check_article(actor, Action::Destroy)?;

        let model = entities::Article::find_by_id(id)
            .one(self.db)
            .await?
            .ok_or(BlogError::NotFound)?;
        permissions::check_article_owner(actor, Action::Destroy, model.author_id)?;

        model.delete(self.db).await?;
        tracing::info!(article_id = id, "article deleted");
        Ok(())
    }

    async fn apply_update(
        &self,
        id: i32,
        payload: ArticlePayload,
        actor: &Actor,
        action: Action,
    ) -> Result<Article, BlogError> {
        permissions::check_article(actor, action)?;

        let model = entities::Article::find_by_id(id)
            .one(self.db)
            .await?
            .ok_or(BlogError::NotFound)?;
        permissions::check_article_owner(actor, action, model.author_id)?;

        let clean = self
            .validate(payload, action == Action::PartialUpdate)
            .await?;

        let mut active: article::ActiveModel = model.into();
        if let Some(title) = clean.title {
            active.title = Set(title);
        }
        if let Some(body) = clean.body {
            active.body = Set(body);
        }
        if let Some(category) = clean.category {
            active.category_id = Set(category);
        }
        active.updated_at = Set(Utc::now().timestamp());

        let model = active.update(self.db).await?;
        tracing::info!(article_id = id, "article updated");
        Ok(model.into())
    }

    /// With `partial`, absent fields are skipped instead of required.
    async fn validate(
        &self,
        payload: ArticlePayload,
        partial: bool,
    ) -> Result<CleanArticle, BlogError> {
        let mut errors = FieldErrors::new();

        let title = match (&payload.title, partial) {
            (None, true) => None,
            (title, _) => required_text(&mut errors, "title", title.as_deref(), TITLE_MAX_CHARS),
        };

        let body = match (payload.body, partial) {
            (None, true) => None,
            (None, false) => {
                errors.add("body", REQUIRED);
                None
            }
            (Some(body), _) => Some(body),
        };

        let category = match (payload.category, partial) {
            (None, true) => None,
            (None, false) => {
                errors.add("category", REQUIRED);
                None
            }
            (Some(category_id), _) => {
                if entities::Category::find_by_id(category_id)
                    .one(self.db)
                    .await?
                    .is_some()
                {
                    Some(category_id)
                } else {
                    errors.add(
                        "category",
                        format!("Invalid pk \"{category_id}\" - object does not exist."),
                    );
                    None
                }
            }
        };

        errors.into_result()?;
        Ok(CleanArticle {
            title,
            body,
            category,
        })
    }
}

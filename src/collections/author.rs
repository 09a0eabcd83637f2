use sea_orm::{DatabaseConnection, EntityTrait, QueryOrder};
use serde::Serialize;

use super::retain_matching;
use crate::entities::{self, article, user};
use crate::errors::BlogError;
use crate::projection::Project;

/// Authors are user accounts seen through the blog. The collection is
/// read-only; accounts are managed through user sync and bootstrap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Author {
    pub id: i32,
    pub username: String,
    pub email: Option<String>,
    pub date_joined: i64,
    pub articles: Vec<i32>,
}

impl Author {
    fn from_models(model: user::Model, articles: Vec<article::Model>) -> Self {
        Self {
            id: model.id,
            username: model.username,
            email: model.email,
            date_joined: model.date_joined,
            articles: articles.into_iter().map(|a| a.id).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AuthorSummary {
    pub id: i32,
    pub username: String,
}

#[derive(Debug, Serialize)]
pub struct AuthorDetail {
    pub id: i32,
    pub username: String,
    pub email: Option<String>,
    pub date_joined: i64,
    pub articles: Vec<i32>,
}

impl Project for Author {
    type Reduced = AuthorSummary;
    type Full = AuthorDetail;

    fn reduced(&self) -> AuthorSummary {
        AuthorSummary {
            id: self.id,
            username: self.username.clone(),
        }
    }

    fn full(&self) -> AuthorDetail {
        AuthorDetail {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            date_joined: self.date_joined,
            articles: self.articles.clone(),
        }
    }
}

pub struct Authors<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> Authors<'a> {
    /// Query parameter carrying the username filter.
    pub const FILTER_PARAM: &'static str = "username";

    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn list(&self, filter: Option<&str>) -> Result<Vec<Author>, BlogError> {
        let mut rows = entities::User::find()
            .order_by_asc(user::Column::Id)
            .find_with_related(entities::Article)
            .order_by_asc(article::Column::Id)
            .all(self.db)
            .await?;
        retain_matching(&mut rows, filter, |(model, _)| model.username.as_str());

        Ok(rows
            .into_iter()
            .map(|(model, articles)| Author::from_models(model, articles))
            .collect())
    }

    pub async fn retrieve(&self, id: i32) -> Result<Author, BlogError> {
        entities::User::find_by_id(id)
            .find_with_related(entities::Article)
            .order_by_asc(article::Column::Id)
            .all(self.db)
            .await?
            .into_iter()
            .next()
            .map(|(model, articles)| Author::from_models(model, articles))
            .ok_or(BlogError::NotFound)
    }
}

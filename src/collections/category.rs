use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, ModelTrait,
    QueryFilter, QueryOrder, Set, SqlErr,
};
use serde::{Deserialize, Serialize};

use super::{required_text, retain_matching};
use crate::entities::{self, article, category};
use crate::errors::{BlogError, FieldErrors};
use crate::permissions::{self, Action, Actor};
use crate::projection::Project;

const NAME_MAX_CHARS: usize = 100;
const DUPLICATE_NAME: &str = "category with this name already exists.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub id: i32,
    pub name: String,
    pub articles: Vec<i32>,
}

impl Category {
    fn from_models(model: category::Model, articles: Vec<article::Model>) -> Self {
        Self {
            id: model.id,
            name: model.name,
            articles: articles.into_iter().map(|a| a.id).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CategorySummary {
    pub id: i32,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct CategoryDetail {
    pub id: i32,
    pub name: String,
    pub articles: Vec<i32>,
}

impl Project for Category {
    type Reduced = CategorySummary;
    type Full = CategoryDetail;

    fn reduced(&self) -> CategorySummary {
        CategorySummary {
            id: self.id,
            name: self.name.clone(),
        }
    }

    fn full(&self) -> CategoryDetail {
        CategoryDetail {
            id: self.id,
            name: self.name.clone(),
            articles: self.articles.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CategoryPayload {
    pub name: Option<String>,
}

pub struct Categories<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> Categories<'a> {
    /// Query parameter carrying the name filter.
    pub const FILTER_PARAM: &'static str = "name";

    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn list(&self, filter: Option<&str>) -> Result<Vec<Category>, BlogError> {
        let mut rows = entities::Category::find()
            .order_by_asc(category::Column::Id)
            .find_with_related(entities::Article)
            .order_by_asc(article::Column::Id)
            .all(self.db)
            .await?;
        retain_matching(&mut rows, filter, |(model, _)| model.name.as_str());

        Ok(rows
            .into_iter()
            .map(|(model, articles)| Category::from_models(model, articles))
            .collect())
    }

    pub async fn retrieve(&self, id: i32) -> Result<Category, BlogError> {
        entities::Category::find_by_id(id)
            .find_with_related(entities::Article)
            .order_by_asc(article::Column::Id)
            .all(self.db)
            .await?
            .into_iter()
            .next()
            .map(|(model, articles)| Category::from_models(model, articles))
            .ok_or(BlogError::NotFound)
    }

    pub async fn create(
        &self,
        payload: CategoryPayload,
        actor: &Actor,
    ) -> Result<Category, BlogError> {
        permissions::check_category(actor, Action::Create)?;

        let mut errors = FieldErrors::new();
        let name = required_text(&mut errors, "name", payload.name.as_deref(), NAME_MAX_CHARS);
        if let Some(name) = &name {
            self.check_unique_name(&mut errors, name, None).await?;
        }
        errors.into_result()?;
        let name = name.ok_or(BlogError::Other("validated name missing".into()))?;

        let model = category::ActiveModel {
            name: Set(name),
            ..Default::default()
        }
        .insert(self.db)
        .await
        .map_err(map_unique_violation)?;

        tracing::info!(category_id = model.id, name = %model.name, "category created");
        Ok(Category::from_models(model, Vec::new()))
    }

    pub async fn update(
        &self,
        id: i32,
        payload: CategoryPayload,
        actor: &Actor,
    ) -> Result<Category, BlogError> {
        self.apply_update(id, payload, actor, Action::Update).await
    }

    pub async fn partial_update(
        &self,
        id: i32,
        payload: CategoryPayload,
        actor: &Actor,
    ) -> Result<Category, BlogError> {
        self.apply_update(id, payload, actor, Action::PartialUpdate).await
    }

    pub async fn delete(&self, id: i32, actor: &Actor) -> Result<(), BlogError> {
        permissions::check_category(actor, Action::Destroy)?;

        let model = entities::Category::find_by_id(id)
            .one(self.db)
            .await?
            .ok_or(BlogError::NotFound)?;
        model.delete(self.db).await?;

        tracing::info!(category_id = id, "category deleted");
        Ok(())
    }

    async fn apply_update(
        &self,
        id: i32,
        payload: CategoryPayload,
        actor: &Actor,
        action: Action,
    ) -> Result<Category, BlogError> {
        permissions::check_category(actor, action)?;

        let model = entities::Category::find_by_id(id)
            .one(self.db)
            .await?
            .ok_or(BlogError::NotFound)?;

        let mut errors = FieldErrors::new();
        let name = if action == Action::PartialUpdate && payload.name.is_none() {
            None
        } else {
            required_text(&mut errors, "name", payload.name.as_deref(), NAME_MAX_CHARS)
        };
        if let Some(name) = &name {
            self.check_unique_name(&mut errors, name, Some(id)).await?;
        }
        errors.into_result()?;

        if let Some(name) = name {
            let mut active: category::ActiveModel = model.into();
            active.name = Set(name);
            active.update(self.db).await.map_err(map_unique_violation)?;
            tracing::info!(category_id = id, "category updated");
        }

        self.retrieve(id).await
    }

    async fn check_unique_name(
        &self,
        errors: &mut FieldErrors,
        name: &str,
        exclude_id: Option<i32>,
    ) -> Result<(), BlogError> {
        let mut query = entities::Category::find().filter(category::Column::Name.eq(name));
        if let Some(id) = exclude_id {
            query = query.filter(category::Column::Id.ne(id));
        }
        if query.one(self.db).await?.is_some() {
            errors.add("name", DUPLICATE_NAME);
        }
        Ok(())
    }
}

fn map_unique_violation(err: DbErr) -> BlogError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            BlogError::Validation(FieldErrors::single("name", DUPLICATE_NAME))
        }
        _ => BlogError::Db(err),
    }
}

use blogger::collections::{
    Article, ArticlePayload, Articles, Categories, Category, CategoryPayload,
};
use blogger::permissions::Actor;
use blogger::storage;
use sea_orm::DatabaseConnection;

/// Builder for creating test users
pub struct UserBuilder {
    username: String,
    password: String,
    email: Option<String>,
    staff: bool,
    active: bool,
}

impl UserBuilder {
    pub fn new(username: &str) -> Self {
        Self {
            username: username.to_string(),
            password: "password123".to_string(),
            email: None,
            staff: false,
            active: true,
        }
    }

    pub fn with_password(mut self, password: &str) -> Self {
        self.password = password.to_string();
        self
    }

    pub fn with_email(mut self, email: &str) -> Self {
        self.email = Some(email.to_string());
        self
    }

    pub fn staff(mut self) -> Self {
        self.staff = true;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.active = false;
        self
    }

    pub async fn create(self, db: &DatabaseConnection) -> storage::User {
        let user = storage::create_user(
            db,
            &self.username,
            &self.password,
            self.email.clone(),
            self.staff,
        )
        .await
        .expect("Failed to create test user");

        if !self.active {
            storage::update_user(db, &self.username, false, self.staff, self.email)
                .await
                .expect("Failed to update user flags");

            storage::get_user_by_id(db, user.id)
                .await
                .expect("Failed to get updated user")
                .expect("User not found")
        } else {
            user
        }
    }
}

/// Builder for creating test categories (created as the given staff user)
pub struct CategoryBuilder {
    name: String,
}

impl CategoryBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }

    pub async fn create(self, db: &DatabaseConnection, staff: &storage::User) -> Category {
        Categories::new(db)
            .create(
                CategoryPayload {
                    name: Some(self.name),
                },
                &Actor::User(staff.clone().into()),
            )
            .await
            .expect("Failed to create test category")
    }
}

/// Builder for creating test articles
pub struct ArticleBuilder {
    title: String,
    body: String,
    category: i32,
}

impl ArticleBuilder {
    pub fn new(title: &str, category: &Category) -> Self {
        Self {
            title: title.to_string(),
            body: "Lorem ipsum dolor sit amet.".to_string(),
            category: category.id,
        }
    }

    pub fn with_body(mut self, body: &str) -> Self {
        self.body = body.to_string();
        self
    }

    pub async fn create(self, db: &DatabaseConnection, author: &storage::User) -> Article {
        Articles::new(db)
            .create(
                ArticlePayload {
                    title: Some(self.title),
                    body: Some(self.body),
                    category: Some(self.category),
                },
                &Actor::User(author.clone().into()),
            )
            .await
            .expect("Failed to create test article")
    }
}

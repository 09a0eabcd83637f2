// Each test binary uses a different slice of the helpers
#![allow(dead_code, unused_imports)]

pub mod app;
pub mod builders;
pub mod db;

pub use app::TestApp;
pub use builders::{ArticleBuilder, CategoryBuilder, UserBuilder};
pub use db::TestDb;

pub mod article;
pub mod category;
pub mod session;
pub mod user;

pub use article::Entity as Article;
pub use category::Entity as Category;
pub use session::Entity as Session;
pub use user::Entity as User;

pub mod category;
pub mod newspaper;
pub mod publication;
pub mod report;
pub mod seminar;
pub mod service;
pub mod user;

pub use category::Category;
pub use newspaper::Newspaper;
pub use publication::Publication;
pub use report::{ReportStatus, WhistleblowerReport};
pub use seminar::Seminar;
pub use service::Service;
pub use user::{Role, User};

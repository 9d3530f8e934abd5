pub mod analytics;
pub mod athlete;
pub mod demo_request;
pub mod organization;
pub mod payment;
pub mod spending_limit;
pub mod sport;
pub mod user;

pub use analytics::*;
pub use athlete::*;
pub use demo_request::*;
pub use organization::*;
pub use payment::*;
pub use spending_limit::*;
pub use sport::*;
pub use user::*;

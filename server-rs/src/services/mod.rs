pub mod athlete_import;
pub mod demo_requests;
pub mod equity;
pub mod fallback_store;
pub mod mailer;
pub mod reports;
pub mod spending;
pub mod table_view;
pub mod trends;
pub mod upload;

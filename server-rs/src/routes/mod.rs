pub mod admin;
pub mod analytics;
pub mod athletes;
pub mod auth;
pub mod debug;
pub mod forms;
pub mod health;
pub mod notifications;
pub mod organization;
pub mod payments;
pub mod reports;
pub mod spending_limits;
pub mod sports;
pub mod uploads;

#[cfg(test)]
mod tests;

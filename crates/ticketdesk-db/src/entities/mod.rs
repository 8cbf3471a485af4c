//! Database entities

pub mod ticket;
pub mod user;

pub use ticket::Entity as Ticket;
pub use user::Entity as User;

pub mod prelude {
    pub use super::ticket::Entity as Ticket;
    pub use super::user::Entity as User;
}

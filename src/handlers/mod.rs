pub mod bookings;
pub mod events;
pub mod forms;
pub mod health;

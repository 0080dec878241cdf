pub mod enqueue;
pub mod health;
pub mod poll;

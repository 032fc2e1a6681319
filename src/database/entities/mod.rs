pub mod cities;
pub mod order_categories;
pub mod order_consolidated;
pub mod order_history;
pub mod order_line_items;
pub mod orders;
pub mod person_contacts;
pub mod person_types;
pub mod persons;
pub mod products;
pub mod states;
pub mod units;
pub mod users;

pub use orders::{OrderStatus, OrderType};

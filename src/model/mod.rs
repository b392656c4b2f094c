pub mod absence;
pub mod feedback;
pub mod material;
pub mod order;
pub mod order_line;
pub mod role;
pub mod time_record;
pub mod user;
pub mod vacation;

pub mod business_days;
pub mod db_utils;
pub mod face_descriptor;
pub mod username_index;
pub mod work_time;

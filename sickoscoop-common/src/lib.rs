pub mod local_id;
pub mod model;
pub mod util;

pub mod controller;
pub mod http;
pub mod machine;

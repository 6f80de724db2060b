pub mod client_info;
pub mod csv;
pub mod email;
pub mod html;

pub mod fakes;
pub mod socket_guard;

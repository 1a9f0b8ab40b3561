pub mod ip_location;

pub use ip_location::{HttpIpLocationClient, IpLocationClient, IpLocationError};

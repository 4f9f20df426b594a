pub mod http_remote;

pub use http_remote::HttpRemoteApi;

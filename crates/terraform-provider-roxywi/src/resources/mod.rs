// One module per Roxy-WI resource type.

pub mod backup;
pub mod channel;
pub mod group;
pub mod ha_cluster;
pub mod haproxy;
pub mod letsencrypt;
pub mod nginx;
pub mod server;
pub mod service_installation;
pub mod ssh_credential;
pub mod udp_listener;
pub mod user;
pub mod user_role_binding;

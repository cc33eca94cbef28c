// HAProxy config sections and white/black lists

pub mod backend;
mod blocks;
pub mod defaults;
pub mod frontend;
pub mod global;
pub mod list;
pub mod listen;
pub mod peers;
pub mod userlist;

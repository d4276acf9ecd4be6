pub mod whoami;

pub use whoami::me_get;

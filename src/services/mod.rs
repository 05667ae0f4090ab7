pub mod dvr;
pub mod providers;
pub mod recommend;
pub mod scheduler;

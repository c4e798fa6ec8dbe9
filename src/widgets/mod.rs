pub mod chart;
pub mod controls;
pub mod datatable;
pub mod debug;
pub mod map;
pub mod selector;

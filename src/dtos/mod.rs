pub mod user;
pub mod truck;
pub mod gate;
pub mod weighbridge;
pub mod dock;
pub mod approval;
pub mod register;
pub mod audit;
pub mod report;

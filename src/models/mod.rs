pub mod truck;

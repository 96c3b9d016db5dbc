pub mod protection_loader;

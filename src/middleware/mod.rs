pub mod fragment_scan;

pub mod detection_metrics;

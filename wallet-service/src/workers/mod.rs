pub mod network_monitor;

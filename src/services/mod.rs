pub mod schema_provisioner;
pub mod seed_loader;
pub mod db_report;

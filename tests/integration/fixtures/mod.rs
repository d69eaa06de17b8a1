pub mod table_dir;

pub mod csv_gallery_store;

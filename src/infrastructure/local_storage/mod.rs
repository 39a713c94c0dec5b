pub mod output_files;

pub mod read_through;

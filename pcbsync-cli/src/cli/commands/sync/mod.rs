mod handler;

pub use handler::handle_sync_command;

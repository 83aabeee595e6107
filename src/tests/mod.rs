mod manager;
mod utils;

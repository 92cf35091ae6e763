mod codec;
mod connection;

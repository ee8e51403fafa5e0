mod ack;
mod bcast_write;
mod read;
mod write;
